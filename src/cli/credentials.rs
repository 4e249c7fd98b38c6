//! API credential sources

use std::fmt;

/// Environment variable holding the API login
pub const LOGIN_ENV: &str = "DATAFORSEO_LOGIN";

/// Environment variable holding the API password
pub const PASSWORD_ENV: &str = "DATAFORSEO_PASSWORD";

/// Where credentials came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// `DATAFORSEO_LOGIN` / `DATAFORSEO_PASSWORD`
    Environment,
    /// Supplied directly, e.g. on the command line
    Local,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Environment => write!(f, "environment"),
            CredentialSource::Local => write!(f, "local"),
        }
    }
}

/// API login and password
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// API login
    pub username: String,
    /// API password
    pub password: String,
    /// Origin of the pair
    pub source: CredentialSource,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

impl Credentials {
    /// Explicitly supplied credentials
    pub fn local(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            source: CredentialSource::Local,
        }
    }

    /// Credentials from the environment; `None` unless both variables are set and non-empty
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Some(Self {
            username: read(LOGIN_ENV)?,
            password: read(PASSWORD_ENV)?,
            source: CredentialSource::Environment,
        })
    }

    /// Flags win when both are given, then the environment
    pub fn resolve(login: Option<&str>, password: Option<&str>) -> Option<Self> {
        match (login, password) {
            (Some(login), Some(password)) if !login.is_empty() && !password.is_empty() => {
                Some(Self::local(login, password))
            }
            _ => Self::from_env(),
        }
    }
}
