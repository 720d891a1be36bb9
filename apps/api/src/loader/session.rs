//! Session and writer identity.
//!
//! The writer is the site owner: the one account allowed to read targets and
//! drafts from the remote store. This check only gates which queries the
//! loader issues; row-level policies in the store remain the real guard.

use async_trait::async_trait;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionUser {
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub user: Option<SessionUser>,
}

impl Session {
    pub fn for_email(email: impl Into<String>) -> Self {
        Self {
            user: Some(SessionUser {
                email: Some(email.into()),
            }),
        }
    }

    pub fn email(&self) -> Option<&str> {
        self.user.as_ref()?.email.as_deref()
    }
}

/// Supplies the current session, if any. Chosen by the composition root.
#[async_trait]
pub trait SessionSource: Send + Sync {
    async fn current(&self) -> Option<Session>;
}

/// A session fixed at startup (or none at all).
pub struct FixedSession(pub Option<Session>);

#[async_trait]
impl SessionSource for FixedSession {
    async fn current(&self) -> Option<Session> {
        self.0.clone()
    }
}

#[derive(Debug, Clone, Default)]
pub struct WriterPolicy {
    writer_email: String,
}

impl WriterPolicy {
    pub fn new(writer_email: impl Into<String>) -> Self {
        Self {
            writer_email: writer_email.into().trim().to_string(),
        }
    }

    /// Case-insensitive match against the configured address. An unset
    /// address never matches.
    pub fn is_writer(&self, session: Option<&Session>) -> bool {
        if self.writer_email.is_empty() {
            return false;
        }
        session
            .and_then(Session::email)
            .map_or(false, |email| email.to_lowercase() == self.writer_email.to_lowercase())
    }
}
