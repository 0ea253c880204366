//! Authentication module for the task-board API
//!
//! The backend issues a short-lived access token and a rotating refresh
//! token. Tokens are cached in the credentials file, inspected locally for
//! expiry, and refreshed through a single-flight coordinator shared by
//! every outgoing request.

pub mod inspect;
pub mod navigator;
pub mod refresh;
pub mod session;
pub mod tokens;

pub use navigator::SessionNavigator;
