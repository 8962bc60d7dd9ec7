//! Session state for the single active connection

use crate::{Error, Result};

/// Connect-time credentials
///
/// All three fields are mandatory; validation happens before any network
/// call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Database to open the session against
    pub database: String,
    /// User name
    pub user: String,
    /// Password
    pub password: String,
}

impl Credentials {
    /// Create credentials
    pub fn new(
        database: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            database: database.into(),
            user: user.into(),
            password: password.into(),
        }
    }

    /// Reject blank mandatory fields
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("database", &self.database),
            ("user", &self.user),
            ("password", &self.password),
        ] {
            if value.trim().is_empty() {
                return Err(Error::invalid_argument(format!("{name} must not be blank")));
            }
        }
        Ok(())
    }
}

/// Connected/disconnected state and the fields of the active session
///
/// While disconnected every field other than `connected` is `None`; the
/// transition methods uphold this.
#[derive(Debug, Default)]
pub struct Session {
    connected: bool,
    database: Option<String>,
    user: Option<String>,
    password: Option<String>,
    server_version: Option<String>,
}

/// Snapshot of a connected session, handed to guarded operations
#[derive(Debug, Clone)]
pub struct ActiveSession {
    /// Database the session is bound to
    pub database: String,
    /// Session user
    pub user: String,
    /// Session password
    pub password: String,
    /// Negotiated (or baseline) server version
    pub server_version: String,
}

impl Session {
    /// Create a disconnected session
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a session is currently open
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Transition to `Connected`, storing the active fields
    pub fn open(&mut self, credentials: Credentials, server_version: String) {
        self.database = Some(credentials.database);
        self.user = Some(credentials.user);
        self.password = Some(credentials.password);
        self.server_version = Some(server_version);
        self.connected = true;
    }

    /// Transition to `Disconnected`, clearing every field
    pub fn close(&mut self) {
        self.connected = false;
        self.database = None;
        self.user = None;
        self.password = None;
        self.server_version = None;
    }

    /// Snapshot the active session, or `None` while disconnected
    pub fn snapshot(&self) -> Option<ActiveSession> {
        if !self.connected {
            return None;
        }
        Some(ActiveSession {
            database: self.database.clone()?,
            user: self.user.clone()?,
            password: self.password.clone()?,
            server_version: self.server_version.clone()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_disconnected() {
        let session = Session::new();
        assert!(!session.is_connected());
        assert!(session.snapshot().is_none());
    }

    #[test]
    fn test_open_then_close() {
        let mut session = Session::new();
        session.open(Credentials::new("demo", "admin", "admin"), "1.4.0".to_string());
        assert!(session.is_connected());

        let active = session.snapshot().unwrap();
        assert_eq!(active.database, "demo");
        assert_eq!(active.server_version, "1.4.0");

        session.close();
        assert!(!session.is_connected());
        assert!(session.snapshot().is_none());
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut session = Session::new();
        session.close();
        session.close();
        assert!(!session.is_connected());
    }

    #[test]
    fn test_blank_credentials_rejected() {
        assert!(Credentials::new("", "admin", "admin").validate().is_err());
        assert!(Credentials::new("demo", " ", "admin").validate().is_err());
        assert!(Credentials::new("demo", "admin", "").validate().is_err());
        assert!(Credentials::new("demo", "admin", "admin").validate().is_ok());
    }
}
