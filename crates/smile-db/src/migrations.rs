use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Whitelist DB: running migration v1 (initial schema)");
        // `fid` is the natural key; the primary key constraint is what turns a
        // concurrent second insert into a duplicate instead of a second row.
        conn.execute_batch(
            "
            CREATE TABLE whitelist_entries (
                fid             INTEGER PRIMARY KEY,
                username        TEXT NOT NULL,
                display_name    TEXT,
                pfp_url         TEXT,
                joined_at       TEXT NOT NULL
            );

            CREATE INDEX idx_whitelist_joined_at
                ON whitelist_entries(joined_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    Ok(())
}
