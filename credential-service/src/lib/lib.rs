pub mod config;
pub mod domain;
pub mod inbound;
pub mod outbound;

pub use domain::app;
pub use domain::token;
pub use domain::user;
pub use outbound::repositories;
