use crate::model::{Id, user::User};
use time::UtcDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct Author {
    pub name: String,
    pub avatar: Option<String>,
}

impl Author {
    #[must_use]
    pub fn new(name: impl Into<String>, avatar: Option<&str>) -> Self {
        Self {
            name: name.into(),
            avatar: avatar.map(str::to_owned),
        }
    }
}

// Published posts carry only the display name of the session user.
impl From<&User> for Author {
    fn from(value: &User) -> Self {
        Self {
            name: value.name.clone(),
            avatar: None,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub author: Author,
    /// Sanitized HTML produced by the editor.
    pub content: String,
    pub created_at: UtcDateTime,
    pub likes: u32,
    pub comments: u32,
    pub shares: u32,
    pub emoji: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct CreatePost {
    pub author: Author,
    pub content: String,
    pub emoji: String,
}

impl Post {
    #[must_use]
    pub fn new(id: Id<PostMarker>, created_at: UtcDateTime, post: CreatePost) -> Self {
        Self {
            id,
            author: post.author,
            content: post.content,
            created_at,
            likes: 0,
            comments: 0,
            shares: 0,
            emoji: post.emoji,
        }
    }
}
