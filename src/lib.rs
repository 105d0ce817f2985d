pub mod client;
pub mod config;
pub mod dream_entry;
pub mod dream_state;
pub mod server;
pub mod session;
pub mod stats;
pub mod storage;
pub mod ui;
