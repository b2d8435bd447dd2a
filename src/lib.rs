pub mod api;
pub mod cli;
pub mod commands;
pub mod core;
pub mod server;

pub use api::{Error, LibraryService, Result, ServiceState};
