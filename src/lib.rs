pub mod auth;
pub mod config;
pub mod expand;
pub mod level;
pub mod prefs;
pub mod render;
pub mod search;
pub mod server;
pub mod store;
