pub mod connection;
pub mod user;
