pub use backend::MemoryBackend;
pub use table::MemoryTable;

mod backend;
mod table;
