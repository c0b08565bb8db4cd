use std::fmt;

/// Bearer token for the backend. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Returns `None` for blank tokens.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        let trimmed = token.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Single source of the current session, consulted before every request.
pub trait SessionProvider: Send + Sync {
    fn credential(&self) -> Option<Credential>;

    fn is_signed_in(&self) -> bool {
        self.credential().is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticSession {
    credential: Option<Credential>,
}

impl StaticSession {
    pub fn signed_in(token: impl Into<String>) -> Self {
        Self {
            credential: Credential::new(token),
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }
}

impl SessionProvider for StaticSession {
    fn credential(&self) -> Option<Credential> {
        self.credential.clone()
    }
}

/// Reads the token from an environment variable on every request, so a
/// refreshed token is picked up without restarting.
#[derive(Debug, Clone)]
pub struct EnvSession {
    var: String,
}

impl EnvSession {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    pub fn var(&self) -> &str {
        &self.var
    }
}

impl SessionProvider for EnvSession {
    fn credential(&self) -> Option<Credential> {
        std::env::var(&self.var).ok().and_then(Credential::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_token_is_no_credential() {
        assert!(Credential::new("  ").is_none());
        assert!(!StaticSession::signed_in("").is_signed_in());
        assert!(!StaticSession::signed_out().is_signed_in());
    }

    #[test]
    fn debug_output_hides_token() {
        let credential = Credential::new("secret-token").unwrap();
        assert_eq!(format!("{credential:?}"), "Credential(***)");
        assert_eq!(credential.token(), "secret-token");
    }

    #[test]
    fn env_session_without_variable_is_signed_out() {
        let session = EnvSession::new("TRACKER_TEST_TOKEN_THAT_IS_NEVER_SET");
        assert!(session.credential().is_none());
    }
}
