use crate::db::migrate::run_pending_migrations;
use crate::errors::AppResult;
use rusqlite::Connection;

/// Bring a connection up to the current schema. Safe to call on every open:
/// the tracker tables only come from the versioned migrations.
pub fn init_db(conn: &Connection) -> AppResult<()> {
    let applied = run_pending_migrations(conn)?;
    log::debug!("schema ready ({} migration(s) applied now)", applied);
    Ok(())
}
