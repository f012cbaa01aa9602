mod user_lookup_mysql;

pub use user_lookup_mysql::*;
