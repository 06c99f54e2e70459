pub mod middleware;
pub mod session;
pub mod token;

pub use session::{ApiKeySessionVerifier, SessionVerifier};
pub use token::{HmacTokenService, TokenService};
