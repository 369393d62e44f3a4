//! Token persistence adapters.

mod file_tokens;
mod memory;

pub use file_tokens::FileTokenPersistence;
pub use memory::InMemoryTokenPersistence;
