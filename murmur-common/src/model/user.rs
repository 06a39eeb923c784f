use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub const USER_ID_BYTES: usize = 9;
pub const DEFAULT_AVATAR_URL: &str = "https://randomuser.me/api/portraits/men/79.jpg";

/// Opaque per-session user id. Never derived from the email or name.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    #[must_use]
    pub fn generate_random() -> Self {
        let bytes: [u8; USER_ID_BYTES] = rand::random();
        Self(BASE64_URL_SAFE_NO_PAD.encode(bytes))
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl User {
    /// A user freshly synthesized for a new session.
    #[must_use]
    pub fn new_session_user(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: UserId::generate_random(),
            email: email.into(),
            name: name.into(),
            avatar: Some(DEFAULT_AVATAR_URL.to_owned()),
        }
    }
}
