//! Diary item store with an append-only change log for incremental sync.
//!
//! Every mutation of a user's dated items writes the item table and the
//! change log in one transaction; clients page through the log by id.

pub mod config;
pub mod db;
pub mod models;
pub mod server;
pub mod store;
pub mod sync;

pub use config::Config;
pub use db::StorageError;
pub use models::{Item, ItemChange, OperationType, SearchParams, User};
pub use store::{ChangeReceipt, Storage};
pub use sync::{SyncLimits, SyncPage, SyncReader};
