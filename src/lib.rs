pub mod config;
pub mod conversations;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod tax;
pub mod transcript;
pub mod websocket;
