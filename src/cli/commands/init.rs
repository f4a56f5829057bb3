use crate::cli::parser::Cli;
use crate::config::Config;
use crate::db::initialize::init_db;
use crate::db::log;
use crate::db::pool::DbPool;
use crate::errors::AppResult;
use crate::ui::messages::{success, warning};
use crate::utils::path::expand_tilde;
use std::fs;

/// Handle the `init` command
///
/// This initializes:
///  - the config directory and file (skipped in test mode)
///  - the mail export directory (skipped in test mode)
///  - the SQLite database and all pending migrations
pub fn handle(cli: &Cli, cfg: &Config) -> AppResult<()> {
    let db_path = Config::init_all(cli.db.clone(), cli.test)?;
    let db_path = db_path.to_string_lossy().to_string();

    println!("⚙️  Initializing rReplyTracker…");
    if !cli.test {
        println!("📄 Config file : {}", Config::config_file().display());

        let mail_dir = expand_tilde(&cfg.mail_dir);
        fs::create_dir_all(&mail_dir)?;
        println!("📬 Mail dir    : {}", mail_dir.display());
    }
    println!("🗄️  Database    : {}", &db_path);

    let pool = DbPool::with_timeout(&db_path, cfg.store_timeout())?;
    init_db(&pool.conn)?;

    success(format!("Database initialized at {}", &db_path));

    // Audit row; failure here is not fatal.
    if let Err(e) = log::ttlog(
        &pool.conn,
        "init",
        "database",
        &format!("Database initialized at {}", &db_path),
    ) {
        warning(format!("Failed to write internal log: {}", e));
    }

    Ok(())
}
