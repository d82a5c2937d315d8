//! Token secrets and the credential pair persisted for the logged-in session.

pub mod credentials;
pub mod secret;

pub use credentials::*;
pub use secret::*;
