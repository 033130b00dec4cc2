mod disabled;
mod memory;

pub use disabled::DisabledCache;
pub use memory::MemoryCache;
