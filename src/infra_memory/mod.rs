mod session_store_memory;
mod user_lookup_memory;

pub use session_store_memory::*;
pub use user_lookup_memory::*;
