//! Database module: models and schema for persistent storage.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows and the sync status machine
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)
//! - `sqlite.rs`: the credential store and the collaborator lookups it needs

pub mod models;
pub mod schema;
pub mod sqlite;

pub use models::{AppUser, LinkedAccount, SpotifyCredential, SyncStatus};
pub use schema::SQLITE_INIT;
pub use sqlite::{CredentialStore, SqlitePool};
