pub mod handlers;
pub mod proxy;
