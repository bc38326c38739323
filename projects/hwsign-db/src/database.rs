use crate::errors::{DatabaseError, Result};
use crate::migrations::apply_migrations;
use crate::types::{normalize_address, AddressBookEntry, TransactionRecord, TransactionStatus};
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

const TRANSACTION_COLUMNS: &str = "tx_hash, chain_id, from_address, to_address, value, nonce,
    gas_price, gas_limit, input, signature_r, signature_s, signature_v, status, created_at";

/// Main database manager
#[derive(Clone)]
pub struct Database {
    connection: Arc<Mutex<Connection>>,
}

impl Database {
    /// Create a database instance at a specific path
    pub async fn open_at_path(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        log::info!("Opening database at: {:?}", path);

        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )?;

        if let Err(e) = apply_migrations(&conn) {
            log::error!("Failed to apply migrations: {}", e);
            return Err(e);
        }

        log::info!("Database initialized successfully");
        Ok(Database {
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory database instance for testing
    pub async fn new_in_memory() -> Result<Self> {
        log::info!("Creating in-memory database");

        let conn = Connection::open_in_memory()?;

        if let Err(e) = apply_migrations(&conn) {
            log::error!("Failed to apply migrations to in-memory database: {}", e);
            return Err(e);
        }

        Ok(Database {
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// Execute a closure with database connection
    pub async fn with_connection<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> Result<R> + Send,
        R: Send,
    {
        let conn = self.connection.lock().await;
        f(&conn)
    }

    /// Execute a closure inside a SQL transaction; any error rolls the whole unit back
    pub async fn transaction<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> Result<R> + Send,
        R: Send,
    {
        let mut conn = self.connection.lock().await;
        let tx = conn.transaction()?;

        // Dropping `tx` without commit rolls back
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }

    /// Get current UNIX timestamp
    pub fn current_timestamp() -> i64 {
        chrono::Utc::now().timestamp()
    }

    // ========== Address Book Methods ==========

    /// Insert or update an address book entry
    pub async fn upsert_address_book_entry(&self, entry: &AddressBookEntry) -> Result<()> {
        let address = normalize_address(&entry.address);

        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO address_book (address, name, trezor_derivation_path, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(address) DO UPDATE SET
                    name = excluded.name,
                    trezor_derivation_path = excluded.trezor_derivation_path",
                rusqlite::params![
                    address,
                    entry.name,
                    entry.trezor_derivation_path,
                    entry.created_at
                ],
            )?;

            log::info!("Stored address book entry: {}", address);
            Ok(())
        })
        .await
    }

    /// Look up an address book entry by address
    pub async fn get_address_book_entry(&self, address: &str) -> Result<Option<AddressBookEntry>> {
        let address = normalize_address(address);

        self.with_connection(|conn| {
            let entry = conn
                .query_row(
                    "SELECT address, name, trezor_derivation_path, created_at
                     FROM address_book WHERE address = ?1",
                    [&address],
                    row_to_address_book_entry,
                )
                .optional()?;
            Ok(entry)
        })
        .await
    }

    /// List all address book entries
    pub async fn list_address_book(&self) -> Result<Vec<AddressBookEntry>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT address, name, trezor_derivation_path, created_at
                 FROM address_book ORDER BY created_at, address",
            )?;
            let entries = stmt
                .query_map([], row_to_address_book_entry)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(entries)
        })
        .await
    }

    // ========== Transaction Methods ==========

    /// Insert or replace a transaction record keyed by its hash
    pub async fn upsert_transaction(&self, record: &TransactionRecord) -> Result<()> {
        self.with_connection(|conn| upsert_transaction_row(conn, record)).await
    }

    /// Delete a transaction by hash, returning whether a row was removed
    pub async fn delete_transaction_by_hash(&self, tx_hash: &str) -> Result<bool> {
        self.with_connection(|conn| delete_transaction_row(conn, tx_hash)).await
    }

    /// Atomically drop the record under `previous_hash` (if any) and upsert `record`.
    ///
    /// Both statements run inside one SQL transaction: a failure in either
    /// leaves the table exactly as it was.
    pub async fn replace_transaction(
        &self,
        previous_hash: Option<&str>,
        record: &TransactionRecord,
    ) -> Result<()> {
        self.transaction(|conn| {
            if let Some(previous) = previous_hash {
                if delete_transaction_row(conn, previous)? {
                    log::debug!("Removed superseded transaction {}", previous);
                }
            }
            upsert_transaction_row(conn, record)
        })
        .await?;

        log::info!("Stored signed transaction {}", record.tx_hash);
        Ok(())
    }

    /// Fetch a transaction by hash
    pub async fn get_transaction(&self, tx_hash: &str) -> Result<Option<TransactionRecord>> {
        let tx_hash = tx_hash.to_lowercase();

        self.with_connection(|conn| {
            let record = conn
                .query_row(
                    &format!("SELECT {} FROM transactions WHERE tx_hash = ?1", TRANSACTION_COLUMNS),
                    [&tx_hash],
                    row_to_transaction_record,
                )
                .optional()?;
            record.transpose()
        })
        .await
    }

    /// List all transactions, newest first
    pub async fn list_transactions(&self) -> Result<Vec<TransactionRecord>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM transactions ORDER BY created_at DESC, tx_hash",
                TRANSACTION_COLUMNS
            ))?;
            let rows = stmt
                .query_map([], row_to_transaction_record)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.into_iter().collect()
        })
        .await
    }

    /// Count stored transactions
    pub async fn count_transactions(&self) -> Result<u64> {
        self.with_connection(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;
            Ok(count as u64)
        })
        .await
    }

    /// Update the lifecycle status of a stored transaction
    pub async fn set_transaction_status(&self, tx_hash: &str, status: TransactionStatus) -> Result<()> {
        let tx_hash = tx_hash.to_lowercase();

        self.with_connection(|conn| {
            let updated = conn.execute(
                "UPDATE transactions SET status = ?1 WHERE tx_hash = ?2",
                rusqlite::params![status.as_str(), tx_hash],
            )?;

            if updated == 0 {
                return Err(DatabaseError::TransactionNotFound(tx_hash.clone()));
            }

            log::info!("Transaction {} is now {}", tx_hash, status);
            Ok(())
        })
        .await
    }

    // ========== Preferences Methods ==========

    /// Set user preference
    pub async fn set_preference(&self, key: &str, value: &str) -> Result<()> {
        let pref_key = format!("pref_{}", key);

        self.with_connection(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO meta (key, val) VALUES (?1, ?2)",
                rusqlite::params![pref_key, value],
            )?;
            Ok(())
        })
        .await
    }

    /// Get user preference
    pub async fn get_preference(&self, key: &str) -> Result<Option<String>> {
        let pref_key = format!("pref_{}", key);

        self.with_connection(|conn| {
            let result = conn
                .query_row("SELECT val FROM meta WHERE key = ?1", [pref_key], |row| row.get(0))
                .optional()?;
            Ok(result)
        })
        .await
    }
}

fn upsert_transaction_row(conn: &Connection, record: &TransactionRecord) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO transactions ({})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
             ON CONFLICT(tx_hash) DO UPDATE SET
                chain_id = excluded.chain_id,
                from_address = excluded.from_address,
                to_address = excluded.to_address,
                value = excluded.value,
                nonce = excluded.nonce,
                gas_price = excluded.gas_price,
                gas_limit = excluded.gas_limit,
                input = excluded.input,
                signature_r = excluded.signature_r,
                signature_s = excluded.signature_s,
                signature_v = excluded.signature_v,
                status = excluded.status",
            TRANSACTION_COLUMNS
        ),
        rusqlite::params![
            record.tx_hash.to_lowercase(),
            record.chain_id as i64,
            normalize_address(&record.from_address),
            record.to_address.as_deref().map(normalize_address),
            record.value,
            record.nonce,
            record.gas_price,
            record.gas_limit,
            record.input,
            record.signature_r,
            record.signature_s,
            record.signature_v,
            record.status.as_str(),
            record.created_at
        ],
    )?;
    Ok(())
}

fn delete_transaction_row(conn: &Connection, tx_hash: &str) -> Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM transactions WHERE tx_hash = ?1",
        [tx_hash.to_lowercase()],
    )?;
    Ok(deleted > 0)
}

fn row_to_address_book_entry(row: &Row<'_>) -> rusqlite::Result<AddressBookEntry> {
    Ok(AddressBookEntry {
        address: row.get(0)?,
        name: row.get(1)?,
        trezor_derivation_path: row.get(2)?,
        created_at: row.get(3)?,
    })
}

// Status parsing happens outside rusqlite so a bad value surfaces as InvalidData
fn row_to_transaction_record(row: &Row<'_>) -> rusqlite::Result<Result<TransactionRecord>> {
    let status: String = row.get(12)?;
    let status = match status.parse::<TransactionStatus>() {
        Ok(status) => status,
        Err(e) => return Ok(Err(e)),
    };
    let chain_id: i64 = row.get(1)?;

    Ok(Ok(TransactionRecord {
        tx_hash: row.get(0)?,
        chain_id: chain_id as u64,
        from_address: row.get(2)?,
        to_address: row.get(3)?,
        value: row.get(4)?,
        nonce: row.get(5)?,
        gas_price: row.get(6)?,
        gas_limit: row.get(7)?,
        input: row.get(8)?,
        signature_r: row.get(9)?,
        signature_s: row.get(10)?,
        signature_v: row.get(11)?,
        status,
        created_at: row.get(13)?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_record(hash: &str) -> TransactionRecord {
        TransactionRecord {
            tx_hash: hash.to_string(),
            chain_id: 1,
            from_address: "0x8ba1f109551bD432803012645Ac136ddd64DBA72".to_string(),
            to_address: Some("0xabc0000000000000000000000000000000000001".to_string()),
            value: "1000".to_string(),
            nonce: "5".to_string(),
            gas_price: "20".to_string(),
            gas_limit: "21000".to_string(),
            input: "0x".to_string(),
            signature_r: "0x01".to_string(),
            signature_s: "0x02".to_string(),
            signature_v: 37,
            status: TransactionStatus::Pending,
            created_at: Database::current_timestamp(),
        }
    }

    #[tokio::test]
    async fn test_file_database_persists_across_opens() {
        let _ = env_logger::try_init();
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let db = Database::open_at_path(db_path.clone()).await.unwrap();
        db.upsert_transaction(&sample_record("0x0b")).await.unwrap();
        db.set_preference("chain_id", "5").await.unwrap();
        drop(db);

        let reopened = Database::open_at_path(db_path).await.unwrap();
        assert!(reopened.get_transaction("0x0b").await.unwrap().is_some());
        assert_eq!(reopened.get_preference("chain_id").await.unwrap().as_deref(), Some("5"));
    }

    #[tokio::test]
    async fn test_transaction_round_trip() {
        let _ = env_logger::try_init();
        let db = Database::new_in_memory().await.unwrap();

        let record = sample_record("0xAAAA");
        db.upsert_transaction(&record).await.unwrap();

        let stored = db.get_transaction("0xaaaa").await.unwrap().unwrap();
        assert_eq!(stored.tx_hash, "0xaaaa");
        assert_eq!(stored.from_address, "0x8ba1f109551bd432803012645ac136ddd64dba72");
        assert_eq!(stored.signature_v, 37);
        assert_eq!(stored.status, TransactionStatus::Pending);
    }

    #[tokio::test]
    async fn test_replace_transaction_removes_previous() {
        let _ = env_logger::try_init();
        let db = Database::new_in_memory().await.unwrap();

        db.upsert_transaction(&sample_record("0x01")).await.unwrap();
        db.replace_transaction(Some("0x01"), &sample_record("0x02"))
            .await
            .unwrap();

        assert!(db.get_transaction("0x01").await.unwrap().is_none());
        assert!(db.get_transaction("0x02").await.unwrap().is_some());
        assert_eq!(db.count_transactions().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_set_transaction_status() {
        let db = Database::new_in_memory().await.unwrap();
        db.upsert_transaction(&sample_record("0x03")).await.unwrap();

        db.set_transaction_status("0x03", TransactionStatus::Relayed)
            .await
            .unwrap();
        let stored = db.get_transaction("0x03").await.unwrap().unwrap();
        assert_eq!(stored.status, TransactionStatus::Relayed);

        assert!(matches!(
            db.set_transaction_status("0x04", TransactionStatus::Failed).await,
            Err(DatabaseError::TransactionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_preferences() {
        let db = Database::new_in_memory().await.unwrap();
        assert_eq!(db.get_preference("chain_id").await.unwrap(), None);

        db.set_preference("chain_id", "5").await.unwrap();
        assert_eq!(db.get_preference("chain_id").await.unwrap(), Some("5".to_string()));
    }
}
