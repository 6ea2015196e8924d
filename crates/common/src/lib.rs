//! Shared primitives for the Kickoff API client workspace

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
