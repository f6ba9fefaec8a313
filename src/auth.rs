//! Credential models: redacted secrets and refresh-grant token responses.

pub mod secret;
pub mod token;

pub use secret::*;
pub use token::*;
