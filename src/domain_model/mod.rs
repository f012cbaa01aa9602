mod session_key;
mod token;
mod user;

pub use session_key::*;
pub use token::*;
pub use user::*;
