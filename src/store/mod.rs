//! Persistence layer — per-user agent state keyed by `(user_id, key)`.

pub mod libsql_backend;
pub mod memory;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use memory::MemoryStore;
pub use traits::StateStore;
