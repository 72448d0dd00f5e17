//! Mocha core library: backend API client, chat state store, connection
//! monitor, model directory, configuration, and the UI bundle asset server
//! shared by the CLI and desktop applications.

pub mod api;
pub mod assets;
pub mod config;
pub mod models;
pub mod monitor;
pub mod session;
pub mod store;
