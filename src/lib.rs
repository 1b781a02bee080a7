//! Acervo Catalog Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod catalog_store;
pub mod config;
pub mod search;
pub mod server;
pub mod sqlite_persistence;
pub mod user;

// Re-export commonly used types for convenience
pub use catalog_store::{CatalogStore, SqliteCatalogStore};
pub use search::CatalogSearch;
pub use server::{run_server, RequestsLoggingLevel, ServerConfig};
pub use user::{SqliteUserStore, UserManager, UserRole, UserStore};
