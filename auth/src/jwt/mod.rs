pub mod claims;
pub mod errors;
pub mod handler;

pub use claims::Audience;
pub use claims::Claims;
pub use claims::TokenKind;
pub use claims::SELF_AUDIENCE;
pub use errors::JwtError;
pub use handler::JwtHandler;
