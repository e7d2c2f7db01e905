//! Storage backends for derived signals and the daily market summary.

pub mod memory;
pub mod sqlite;

pub use memory::MemorySignalStore;
pub use sqlite::SqliteSignalStore;
