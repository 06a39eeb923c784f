use crate::model::user::User;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};
use thiserror::Error;

/// A login pair known to the client, with the profile it signs in as.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct Credential {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

impl Credential {
    #[must_use]
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            display_name: display_name.into(),
        }
    }

    /// Exact, case-sensitive comparison of both halves of the pair.
    #[must_use]
    pub fn matches(&self, email: &str, password: &str) -> bool {
        self.email == email && self.password == password
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("email", &self.email)
            .field("password", &"[redacted]")
            .field("display_name", &self.display_name)
            .finish()
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct Session {
    user: Option<User>,
}

impl Session {
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn authenticated(user: User) -> Self {
        Self { user: Some(user) }
    }

    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

/// The persisted form of a [`Session`].
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub user: Option<User>,
    pub is_authenticated: bool,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum InvalidSessionSnapshotError {
    #[error("Snapshot is marked authenticated but has no user")]
    MissingUser,
    #[error("Snapshot has a user but is not marked authenticated")]
    UnexpectedUser,
}

impl From<&Session> for SessionSnapshot {
    fn from(value: &Session) -> Self {
        Self {
            user: value.user.clone(),
            is_authenticated: value.is_authenticated(),
        }
    }
}

impl TryFrom<SessionSnapshot> for Session {
    type Error = InvalidSessionSnapshotError;

    fn try_from(value: SessionSnapshot) -> Result<Self, Self::Error> {
        match (value.user, value.is_authenticated) {
            (Some(user), true) => Ok(Self::authenticated(user)),
            (None, false) => Ok(Self::anonymous()),
            (None, true) => Err(InvalidSessionSnapshotError::MissingUser),
            (Some(_), false) => Err(InvalidSessionSnapshotError::UnexpectedUser),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{
        auth::{Credential, InvalidSessionSnapshotError, Session, SessionSnapshot},
        user::User,
    };

    #[test]
    fn credential_matching_is_exact() {
        let credential = Credential::new("demo@example.com", "password123", "Demo User");

        assert!(credential.matches("demo@example.com", "password123"));
        assert!(!credential.matches("Demo@example.com", "password123"));
        assert!(!credential.matches("demo@example.com", "Password123"));
        assert!(!credential.matches("", ""));
    }

    #[test]
    fn credential_debug_redacts_password() {
        let credential = Credential::new("demo@example.com", "password123", "Demo User");
        let debug = format!("{credential:?}");

        assert!(debug.contains("demo@example.com"));
        assert!(!debug.contains("password123"));
    }

    #[test]
    fn snapshot_round_trip() {
        let session = Session::authenticated(User::new_session_user("a@b.co", "A"));
        let json = serde_json::to_string(&SessionSnapshot::from(&session)).unwrap();

        assert!(json.contains(r#""isAuthenticated":true"#));

        let snapshot: SessionSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(Session::try_from(snapshot).unwrap(), session);
    }

    #[test]
    fn inconsistent_snapshots_are_rejected() {
        let missing_user: SessionSnapshot =
            serde_json::from_str(r#"{"user":null,"isAuthenticated":true}"#).unwrap();
        assert_eq!(
            Session::try_from(missing_user),
            Err(InvalidSessionSnapshotError::MissingUser)
        );

        let unexpected_user = SessionSnapshot {
            user: Some(User::new_session_user("a@b.co", "A")),
            is_authenticated: false,
        };
        assert_eq!(
            Session::try_from(unexpected_user),
            Err(InvalidSessionSnapshotError::UnexpectedUser)
        );
    }

    #[test]
    fn anonymous_snapshot_decodes() {
        let snapshot: SessionSnapshot =
            serde_json::from_str(r#"{"user":null,"isAuthenticated":false}"#).unwrap();
        assert_eq!(Session::try_from(snapshot).unwrap(), Session::anonymous());
    }
}
