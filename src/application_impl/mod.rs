mod argon2_hasher;
mod authorization_gate;
mod jwt_codec;
mod token_lifecycle;

pub use argon2_hasher::*;
pub use authorization_gate::*;
pub use jwt_codec::*;
pub use token_lifecycle::*;
