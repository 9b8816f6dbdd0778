pub mod auth;

pub use auth::{authenticate, AuthUser, Authenticator};
