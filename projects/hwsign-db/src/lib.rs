pub mod database;
pub mod migrations;
pub mod types;
pub mod errors;

// Re-export main types and the database
pub use database::Database;
pub use types::*;
pub use errors::DatabaseError;

use std::path::PathBuf;

/// Get the default database path
pub fn get_database_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".hwsign")
        .join("hwsign.db")
}
