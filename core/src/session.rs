//! Who is using the app and which page they are on.
//!
//! A [`SessionContext`] is a value: each transition consumes a reference and
//! returns the next context, so callers decide when (and whether) to persist it.

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Which form the logged-out screen is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthView {
    #[default]
    Login,
    Signup,
    ForgotPassword,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AuthState {
    LoggedOut { view: AuthView },
    Authenticating { username: String },
    LoggedIn { username: String },
}

impl AuthState {
    fn name(&self) -> &'static str {
        match self {
            Self::LoggedOut { .. } => "logged out",
            Self::Authenticating { .. } => "authenticating",
            Self::LoggedIn { .. } => "logged in",
        }
    }
}

impl Default for AuthState {
    fn default() -> Self {
        Self::LoggedOut {
            view: AuthView::Login,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    #[default]
    Dashboard,
    AddWeight,
    Analytics,
    Profile,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionContext {
    pub auth: AuthState,
    #[serde(default)]
    pub page: Page,
}

impl SessionContext {
    /// Logged out, on the login form.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-user mode: logged in as `user` without credentials.
    #[must_use]
    pub fn anonymous(user: &str) -> Self {
        Self {
            auth: AuthState::LoggedIn {
                username: user.to_string(),
            },
            page: Page::Dashboard,
        }
    }

    fn invalid(&self, action: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            state: self.auth.name(),
            action,
        }
    }

    pub fn show(&self, view: AuthView) -> Result<Self, SessionError> {
        match self.auth {
            AuthState::LoggedOut { .. } => Ok(Self {
                auth: AuthState::LoggedOut { view },
                page: self.page,
            }),
            _ => Err(self.invalid("switch auth form")),
        }
    }

    pub fn begin_login(&self, username: &str) -> Result<Self, SessionError> {
        match self.auth {
            AuthState::LoggedOut { .. } => Ok(Self {
                auth: AuthState::Authenticating {
                    username: username.to_string(),
                },
                page: self.page,
            }),
            _ => Err(self.invalid("log in")),
        }
    }

    /// Completes a login started with [`begin_login`](Self::begin_login).
    /// A failed attempt lands back on the login form.
    pub fn finish_login(&self, success: bool) -> Result<Self, SessionError> {
        let AuthState::Authenticating { ref username } = self.auth else {
            return Err(self.invalid("finish login"));
        };
        let auth = if success {
            AuthState::LoggedIn {
                username: username.clone(),
            }
        } else {
            AuthState::default()
        };
        Ok(Self {
            auth,
            page: Page::Dashboard,
        })
    }

    #[must_use]
    pub fn logout(&self) -> Self {
        Self::new()
    }

    pub fn navigate(&self, page: Page) -> Result<Self, SessionError> {
        match self.auth {
            AuthState::LoggedIn { .. } => Ok(Self {
                auth: self.auth.clone(),
                page,
            }),
            _ => Err(self.invalid("navigate")),
        }
    }

    #[must_use]
    pub fn user(&self) -> Option<&str> {
        match &self.auth {
            AuthState::LoggedIn { username } => Some(username),
            _ => None,
        }
    }

    pub fn require_user(&self) -> Result<&str, SessionError> {
        self.user().ok_or(SessionError::NotLoggedIn)
    }
}
