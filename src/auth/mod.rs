//! Credentials-based sign-in with stateless signed session tokens.
//!
//! Flow: the sign-in form posts a username and password, [`authorize`]
//! checks them against the `users` table, [`SessionKeys::issue`] mints a
//! token carrying the identity and role, and every later request rebuilds
//! a [`Session`] from that token. Nothing is stored server-side.

mod credentials;
mod password;
mod session;
mod token;

pub use credentials::{authorize, AuthUser, Credentials};
pub use password::{hash_password, verify_password};
pub use session::{
    extract_token, removal_cookie, safe_callback, session_cookie, sign_in_url, Session,
    SessionUser, SignInRedirect,
};
pub use token::{SessionClaims, SessionKeys};

/// The one route that initiates sign-in; visitors without a session are
/// redirected here.
pub const SIGN_IN_PATH: &str = "/auth/signin";
