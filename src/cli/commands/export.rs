use crate::cli::commands::open_pool;
use crate::cli::parser::Commands;
use crate::config::Config;
use crate::db::queries;
use crate::errors::AppResult;
use crate::export::ExportLogic;
use crate::export::logic::ExportRequest;
use crate::utils::time::parse_timezone;

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Export {
        what,
        format,
        file,
        range,
        user,
        force,
    } = cmd
    {
        let pool = open_pool(cfg)?;

        let (user_email, tz) = match user {
            Some(u) => {
                let u = queries::require_user(&pool.conn, u)?;
                (Some(u.email), u.schedule.timezone)
            }
            None => (None, parse_timezone(&cfg.default_timezone)?),
        };

        let req = ExportRequest {
            target: *what,
            format: *format,
            file,
            range: range.as_deref(),
            user: user_email.as_deref(),
            force: *force,
        };
        ExportLogic::export(&pool, &req, &tz)?;
    }
    Ok(())
}
