pub mod baseline;
pub mod config;
pub mod domain;
pub mod error;
pub mod io;
pub mod journey;
pub mod manual;
pub mod milestone;
pub mod paths;
pub mod progress;
pub mod requirements;
pub mod store;
pub mod types;

pub use error::{RelishError, Result};
