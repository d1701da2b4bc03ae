//! Auth Session Store
//!
//! Holds the signed-in user and session token. The token is persisted under
//! `sessionToken` so a later process can pick the session up again.
//!
//! Any `Unauthorized` answer clears the local auth state; the caller is then
//! expected to ask the user to log in again.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::api::{ApiClient, RegisterRequest, Role, User};
use crate::error::{ClientError, Result};
use crate::storage::{KeyValueStore, SESSION_TOKEN_KEY};

/// Current authentication state
pub struct AuthSession {
    api: ApiClient,
    store: Arc<dyn KeyValueStore>,
    user: Option<User>,
}

impl AuthSession {
    pub fn new(api: ApiClient, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            api,
            store,
            user: None,
        }
    }

    /// Shared API client (carries the installed token)
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Restore a persisted session
    ///
    /// Returns the user if a stored token is still valid. An expired token is
    /// removed; other failures leave it in place for the next attempt.
    pub async fn load(&mut self) -> Result<Option<User>> {
        let Some(token) = self.store.get(SESSION_TOKEN_KEY)? else {
            debug!("No stored session token");
            return Ok(None);
        };

        self.api.set_token(Some(token)).await;
        match self.api.me().await {
            Ok(user) => {
                debug!("Restored session for {}", user.email);
                self.user = Some(user.clone());
                Ok(Some(user))
            }
            Err(e) => {
                let e = self.handle_error(e).await;
                if e.is_auth_failure() {
                    Ok(None)
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Log in and persist the token
    pub async fn login(&mut self, email: &str, password: &str) -> Result<User> {
        let auth = self.api.login(email, password).await?;
        self.install(auth.token, auth.user).await
    }

    /// Create an account and sign in
    pub async fn register(&mut self, name: &str, email: &str, password: &str) -> Result<User> {
        let request = RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        let auth = self.api.register(&request).await?;
        self.install(auth.token, auth.user).await
    }

    async fn install(&mut self, token: String, user: User) -> Result<User> {
        self.store.set(SESSION_TOKEN_KEY, &token)?;
        self.api.set_token(Some(token)).await;
        info!("Signed in as {} ({})", user.email, user.role);
        self.user = Some(user.clone());
        Ok(user)
    }

    /// Log out on the server (best effort) and always clear local state
    pub async fn logout(&mut self) -> Result<()> {
        if self.api.token().await.is_none() {
            if let Some(token) = self.store.get(SESSION_TOKEN_KEY)? {
                self.api.set_token(Some(token)).await;
            }
        }
        if self.api.token().await.is_some() {
            if let Err(e) = self.api.logout().await {
                warn!("Server logout failed, clearing local session anyway: {}", e);
            }
        }
        self.clear().await
    }

    /// Forget the token and user
    pub async fn clear(&mut self) -> Result<()> {
        self.user = None;
        self.api.set_token(None).await;
        self.store.remove(SESSION_TOKEN_KEY)
    }

    /// Clear local auth state if `err` means the session is gone
    ///
    /// Returns the error for the caller to report.
    pub async fn handle_error(&mut self, err: ClientError) -> ClientError {
        if err.is_auth_failure() {
            info!("Session token rejected, clearing local session");
            if let Err(clear_err) = self.clear().await {
                warn!("Failed to clear session state: {}", clear_err);
            }
        }
        err
    }

    pub fn current_user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Role of the signed-in user; anonymous sessions count as `User`
    pub fn role(&self) -> Role {
        self.user.as_ref().map(|u| u.role).unwrap_or_default()
    }

    pub fn is_admin(&self) -> bool {
        self.role().is_admin()
    }
}
