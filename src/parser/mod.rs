pub mod auth;

pub use auth::{parse_auth_line, AuthLineParser};
