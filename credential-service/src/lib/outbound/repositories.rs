pub mod app;
pub mod memory;
pub mod token;
pub mod user;

pub use app::PostgresAppRepository;
pub use memory::InMemoryCredentialStore;
pub use token::PostgresTokenRepository;
pub use user::PostgresUserRepository;
