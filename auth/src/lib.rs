//! Authentication utilities library
//!
//! Provides the credential primitives of the credential service:
//! - Password hashing (Argon2id)
//! - Signed, self-describing tokens (HS256 JWT) for access, refresh and app secrets
//! - Authentication coordination under one immutable configuration
//!
//! Persistence and revocation live in the service; tokens produced here are
//! stateless and verify on their own.
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::new();
//! let hash = hasher.hash("my_password").unwrap();
//! let is_valid = hasher.verify("my_password", &hash).unwrap();
//! assert!(is_valid);
//! ```
//!
//! ## Issuing and Verifying Tokens
//! ```
//! use auth::{Audience, Authenticator, TokenKind, TokenSettings};
//! use chrono::Duration;
//!
//! let settings = TokenSettings::new(
//!     "secret_key_at_least_32_bytes_long!",
//!     "credential-service",
//!     Duration::minutes(15),
//!     Duration::days(30),
//!     Duration::days(365),
//! );
//! let auth = Authenticator::new(settings);
//!
//! // Register: hash password
//! let hash = auth.hash_password("password123").unwrap();
//!
//! // Login: verify password, then sign an access token
//! auth.authenticate("password123", Some(&hash)).unwrap();
//! let issued = auth.issue(TokenKind::Access, "user123", Audience::SelfIssued).unwrap();
//!
//! // Validate token
//! let claims = auth.verify_kind(&issued.token, TokenKind::Access).unwrap();
//! assert_eq!(claims.sub, "user123");
//! ```

pub mod authenticator;
pub mod jwt;
pub mod password;
pub mod settings;

// Re-export commonly used items
pub use authenticator::AuthenticationError;
pub use authenticator::Authenticator;
pub use authenticator::IssuedToken;
pub use jwt::Audience;
pub use jwt::Claims;
pub use jwt::JwtError;
pub use jwt::JwtHandler;
pub use jwt::TokenKind;
pub use jwt::SELF_AUDIENCE;
pub use password::PasswordError;
pub use password::PasswordHasher;
pub use settings::TokenSettings;
