/// Who is signed in
///
/// A [`Session`] is an explicit value handed to every task operation; there is
/// no global "current user". [`SessionContext`] is the slot a front end keeps
/// for its one signed-in user. Neither is persisted.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    username: String,
}

impl Session {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

/// Holds at most one session for the running process
#[derive(Debug, Default)]
pub struct SessionContext {
    current: Option<Session>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces whatever session was active
    pub fn sign_in(&mut self, session: Session) {
        self.current = Some(session);
    }

    /// Clears the session, returning the one that was active
    pub fn sign_out(&mut self) -> Option<Session> {
        self.current.take()
    }

    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.current.is_some()
    }
}
