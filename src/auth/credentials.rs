//! Username/password verification against the `users` table.

use serde::{Deserialize, Serialize};

use super::password::verify_password;
use crate::db::{users, DbPool, User};

/// Submitted sign-in form. `username` is matched against the email column.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Identity established by a successful sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
        }
    }
}

/// Check credentials and return the matching identity.
///
/// `Ok(None)` covers both an unknown username and a wrong password. Only
/// database failures are errors.
pub async fn authorize(
    pool: &DbPool,
    credentials: &Credentials,
) -> Result<Option<AuthUser>, sqlx::Error> {
    let user = match users::find_by_email(pool, &credentials.username).await? {
        Some(user) => user,
        None => {
            tracing::debug!("Sign-in rejected: unknown username");
            return Ok(None);
        }
    };

    if !verify_password(&credentials.password, &user.password) {
        tracing::debug!(user_id = %user.id, "Sign-in rejected: password mismatch");
        return Ok(None);
    }

    Ok(Some(AuthUser::from(user)))
}
