use crate::cli::parser::Commands;
use crate::config::Config;
use crate::db::migrate::{pending_migrations, run_pending_migrations};
use crate::db::pool::DbPool;
use crate::db::stats;
use crate::errors::AppResult;
use crate::utils::colors::{CYAN, GREEN, RED, RESET, YELLOW};

fn step(title: &str) {
    println!("{CYAN}▶ {title}…{RESET}");
}

fn done(msg: &str) {
    println!("{GREEN}✔ {msg}{RESET}");
}

/// `PRAGMA integrity_check` plus the list of migrations not yet applied.
fn check_database(pool: &DbPool) -> AppResult<()> {
    step("Running integrity check");
    let integrity: String = pool
        .conn
        .query_row("PRAGMA integrity_check;", [], |row| row.get(0))?;

    match integrity.as_str() {
        "ok" => done("Integrity check passed."),
        problems => println!("{RED}✘ Integrity check failed:{RESET} {problems}"),
    }

    let pending = pending_migrations(&pool.conn)?;
    if pending.is_empty() {
        done("Schema is up to date.");
    } else {
        println!("{YELLOW}• Pending migrations:{RESET} {}", pending.join(", "));
        println!("  run `db --migrate` to apply them");
    }
    Ok(())
}

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let Commands::Db {
        migrate,
        check,
        vacuum,
        info,
    } = cmd
    else {
        return Ok(());
    };

    // Opened without migrating, so `--check` can still see what is pending.
    let mut pool = DbPool::with_timeout(&cfg.database, cfg.store_timeout())?;

    if *migrate {
        step("Running migrations");
        let n = run_pending_migrations(&pool.conn)?;
        done(&format!("Migration completed ({n} applied)."));
    }

    if *check {
        check_database(&pool)?;
    }

    if *info {
        // Row counts need every table to exist.
        run_pending_migrations(&pool.conn)?;
        stats::print_db_info(&mut pool, &cfg.database)?;
    }

    if *vacuum {
        step("Running VACUUM");
        pool.conn.execute_batch("VACUUM;")?;
        done("Vacuum completed.");
    }

    Ok(())
}
