pub mod auth;
pub mod cli;
pub mod config;
pub mod publisher;
pub mod push;
pub mod server;
pub mod sink;
pub mod transform;
