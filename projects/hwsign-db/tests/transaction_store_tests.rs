#[cfg(test)]
mod transaction_store_tests {
    use hwsign_db::{AddressBookEntry, Database, DatabaseError, TransactionRecord, TransactionStatus};

    fn record(hash: &str, nonce: u64) -> TransactionRecord {
        TransactionRecord {
            tx_hash: hash.to_string(),
            chain_id: 1,
            from_address: "0x8ba1f109551bd432803012645ac136ddd64dba72".to_string(),
            to_address: Some("0xabc0000000000000000000000000000000000001".to_string()),
            value: "1000".to_string(),
            nonce: nonce.to_string(),
            gas_price: "20".to_string(),
            gas_limit: "21000".to_string(),
            input: "0x".to_string(),
            signature_r: "0x1c".to_string(),
            signature_s: "0x2d".to_string(),
            signature_v: 37,
            status: TransactionStatus::Pending,
            created_at: Database::current_timestamp(),
        }
    }

    #[tokio::test]
    async fn test_address_book_lookup_is_case_insensitive() {
        let db = Database::new_in_memory().await.expect("Failed to create in-memory database");

        db.upsert_address_book_entry(&AddressBookEntry {
            address: "0x8BA1F109551BD432803012645AC136DDD64DBA72".to_string(),
            name: Some("hardware".to_string()),
            trezor_derivation_path: Some("m/44'/60'/0'/0/0".to_string()),
            created_at: Database::current_timestamp(),
        })
        .await
        .expect("Failed to store entry");

        let entry = db
            .get_address_book_entry("0x8ba1f109551bd432803012645ac136ddd64dba72")
            .await
            .expect("Lookup failed")
            .expect("Entry missing");
        assert_eq!(entry.trezor_derivation_path.as_deref(), Some("m/44'/60'/0'/0/0"));
        assert_eq!(entry.name.as_deref(), Some("hardware"));
        assert_eq!(db.list_address_book().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_address_book_update_overwrites_path() {
        let db = Database::new_in_memory().await.expect("Failed to create in-memory database");
        let address = "0x0000000000000000000000000000000000000042";

        let mut entry = AddressBookEntry {
            address: address.to_string(),
            name: None,
            trezor_derivation_path: None,
            created_at: Database::current_timestamp(),
        };
        db.upsert_address_book_entry(&entry).await.unwrap();
        assert!(db
            .get_address_book_entry(address)
            .await
            .unwrap()
            .unwrap()
            .trezor_derivation_path
            .is_none());

        entry.trezor_derivation_path = Some("m/44'/60'/0'/0/7".to_string());
        db.upsert_address_book_entry(&entry).await.unwrap();
        let stored = db.get_address_book_entry(address).await.unwrap().unwrap();
        assert_eq!(stored.trezor_derivation_path.as_deref(), Some("m/44'/60'/0'/0/7"));
    }

    #[tokio::test]
    async fn test_replace_without_previous_hash_inserts() {
        let db = Database::new_in_memory().await.unwrap();

        db.replace_transaction(None, &record("0xbeef", 1)).await.unwrap();
        assert_eq!(db.count_transactions().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_replace_rolls_back_when_insert_fails() {
        let db = Database::new_in_memory().await.unwrap();
        db.upsert_transaction(&record("0x0100", 1)).await.unwrap();

        db.with_connection(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER reject_inserts BEFORE INSERT ON transactions
                 BEGIN SELECT RAISE(ABORT, 'injected failure'); END;",
            )?;
            Ok(())
        })
        .await
        .unwrap();

        let result = db.replace_transaction(Some("0x0100"), &record("0x0200", 1)).await;
        assert!(matches!(result, Err(DatabaseError::Sqlite(_))));

        // The delete ran first but was rolled back with the failed insert
        assert!(db.get_transaction("0x0100").await.unwrap().is_some());
        assert!(db.get_transaction("0x0200").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_transactions_returns_all_records() {
        let db = Database::new_in_memory().await.unwrap();
        db.upsert_transaction(&record("0x01", 1)).await.unwrap();
        db.upsert_transaction(&record("0x02", 2)).await.unwrap();

        let all = db.list_transactions().await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().any(|r| r.nonce == "2"));

        assert!(db.delete_transaction_by_hash("0x01").await.unwrap());
        assert!(!db.delete_transaction_by_hash("0x01").await.unwrap());
        assert_eq!(db.count_transactions().await.unwrap(), 1);
    }
}
