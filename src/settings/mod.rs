//! Process settings: a TOML file chosen on the command line, overlaid with
//! `CENSUS_AUTH__*` environment variables.

mod cli;
pub use clap::Parser;
pub use cli::*;

mod settings;
pub use settings::*;
