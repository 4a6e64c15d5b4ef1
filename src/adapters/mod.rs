// Adapters layer: concrete implementations of the domain ports.

pub mod identity;
pub mod memory;
pub mod postgrest;

pub use identity::{SessionIdentity, StaticIdentity};
pub use memory::{DirectorySnapshot, MemoryDirectory};
pub use postgrest::PostgrestDirectory;
