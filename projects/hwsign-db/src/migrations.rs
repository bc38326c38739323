use crate::errors::{DatabaseError, Result};
use rusqlite::{Connection, OptionalExtension};

/// Schema version written by this build
pub const SCHEMA_VERSION: u32 = 1;

/// Initialize the database schema
pub fn apply_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    conn.execute_batch(META_TABLE)?;

    let existing: Option<String> = conn
        .query_row(
            "SELECT val FROM meta WHERE key = 'db_version'",
            [],
            |row| row.get(0),
        )
        .optional()?;

    if let Some(version) = existing {
        let version: u32 = version
            .parse()
            .map_err(|_| DatabaseError::Migration(format!("unreadable schema version: {}", version)))?;
        if version > SCHEMA_VERSION {
            return Err(DatabaseError::Migration(format!(
                "database schema v{} is newer than supported v{}",
                version, SCHEMA_VERSION
            )));
        }
    }

    log::info!("Creating database schema...");
    conn.execute_batch(FULL_SCHEMA)?;
    log::info!("Database schema created successfully");
    Ok(())
}

/// Key/value store for schema metadata and user preferences
const META_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS meta (
    key          TEXT PRIMARY KEY,
    val          TEXT NOT NULL
);
"#;

const FULL_SCHEMA: &str = r#"
-- hwsign Database Schema v1

-- Known addresses and the hardware-wallet path that controls them
CREATE TABLE IF NOT EXISTS address_book (
    address      TEXT PRIMARY KEY,   -- 0x-prefixed lower-case hex
    name         TEXT,
    trezor_derivation_path TEXT,     -- "m/44'/60'/0'/0/0"
    created_at   INTEGER NOT NULL    -- epoch seconds
);

-- Signed transactions keyed by their hash
CREATE TABLE IF NOT EXISTS transactions (
    tx_hash      TEXT PRIMARY KEY,   -- keccak256 of the signed RLP, 0x hex
    chain_id     INTEGER NOT NULL,
    from_address TEXT NOT NULL,
    to_address   TEXT,               -- NULL for contract creation
    value        TEXT NOT NULL,      -- decimal wei
    nonce        TEXT NOT NULL,
    gas_price    TEXT NOT NULL,
    gas_limit    TEXT NOT NULL,
    input        TEXT NOT NULL,      -- 0x hex
    signature_r  TEXT NOT NULL,
    signature_s  TEXT NOT NULL,
    signature_v  INTEGER NOT NULL,
    status       TEXT NOT NULL DEFAULT 'pending',
    created_at   INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_transactions_from ON transactions(from_address);

INSERT OR IGNORE INTO meta (key, val) VALUES ('db_version', '1');
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        apply_migrations(&conn).unwrap();
        apply_migrations(&conn).unwrap();

        let version: String = conn
            .query_row("SELECT val FROM meta WHERE key = 'db_version'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION.to_string());
    }

    #[test]
    fn test_unreadable_version_row_fails() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE meta (key TEXT PRIMARY KEY, val TEXT NOT NULL);
             INSERT INTO meta (key, val) VALUES ('db_version', X'3939');",
        )
        .unwrap();

        assert!(matches!(apply_migrations(&conn), Err(DatabaseError::Sqlite(_))));
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE name = 'transactions'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 0);
    }

    #[test]
    fn test_newer_schema_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        apply_migrations(&conn).unwrap();
        conn.execute("UPDATE meta SET val = '99' WHERE key = 'db_version'", [])
            .unwrap();

        match apply_migrations(&conn) {
            Err(DatabaseError::Migration(msg)) => assert!(msg.contains("v99")),
            other => panic!("expected migration error, got {:?}", other),
        }
    }
}
