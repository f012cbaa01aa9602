// store

mod session_store;

pub use session_store::*;

// lookup

mod user_lookup;

pub use user_lookup::*;

mod clock;

pub use clock::*;
