//! Public surface of the library engine.

pub mod error;
pub mod service;

pub use error::{Error, Result};
pub use service::{LibraryService, ServiceState};
