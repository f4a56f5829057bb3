use crate::cli::parser::Commands;
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::ui::messages::{error, success, warning};
use std::fs;
use std::process::Command;

/// Handle the `config` subcommand
pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Config {
        print_config,
        check,
        edit_config,
        editor,
    } = cmd
    {
        let path = Config::config_file();

        // ---- PRINT CONFIG ----
        if *print_config {
            println!("📄 Current configuration ({}):\n", path.display());
            println!("{}", cfg.to_yaml()?);
        }

        // ---- CHECK CONFIG ----
        if *check {
            if path.exists() {
                let content = fs::read_to_string(&path).map_err(|_| AppError::ConfigLoad)?;
                let missing = Config::missing_fields(&content)?;
                if missing.is_empty() {
                    success("All configuration fields are present.");
                } else {
                    warning(format!(
                        "Missing fields (defaults apply): {}",
                        missing.join(", ")
                    ));
                }
            } else {
                warning(format!(
                    "No configuration file at {}; using defaults (run `init`).",
                    path.display()
                ));
            }

            let problems = cfg.problems();
            if problems.is_empty() {
                success("Configuration values are valid.");
            } else {
                for p in &problems {
                    error(p);
                }
                return Err(AppError::Config(format!("{} invalid value(s)", problems.len())));
            }
        }

        // ---- EDIT CONFIG ----
        if *edit_config {
            let default_editor = std::env::var("EDITOR")
                .or_else(|_| std::env::var("VISUAL"))
                .unwrap_or_else(|_| {
                    if cfg!(target_os = "windows") {
                        "notepad".to_string()
                    } else {
                        "nano".to_string()
                    }
                });

            let editor_to_use = editor.clone().unwrap_or_else(|| default_editor.clone());

            match Command::new(&editor_to_use).arg(&path).status() {
                Ok(s) if s.success() => {
                    success(format!(
                        "Configuration file edited successfully using '{}'",
                        editor_to_use
                    ));
                }
                _ => {
                    warning(format!(
                        "Editor '{}' not available, falling back to '{}'",
                        editor_to_use, default_editor
                    ));

                    match Command::new(&default_editor).arg(&path).status() {
                        Ok(s) if s.success() => success(format!(
                            "Configuration file edited successfully using fallback '{}'",
                            default_editor
                        )),
                        _ => {
                            return Err(AppError::Config(format!(
                                "failed to edit {} with '{}'",
                                path.display(),
                                default_editor
                            )));
                        }
                    }
                }
            }
        }
    }

    Ok(())
}
