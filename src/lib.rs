pub mod commands;
pub mod config;
pub mod discord;
pub mod error;
pub mod http_server;
pub mod overwrites;
pub mod platform;
pub mod reply;
pub mod web_apis;

#[cfg(test)]
mod testing;
