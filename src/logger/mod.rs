//! Tracing setup: a bootstrap subscriber at `info` (or `RUST_LOG`), whose
//! filter is swapped for the configured one once settings are loaded.

mod logger;
pub use logger::*;

pub use tracing::{debug, error, info, trace, warn};
