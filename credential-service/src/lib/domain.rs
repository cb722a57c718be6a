pub mod app;
pub mod token;
pub mod user;
