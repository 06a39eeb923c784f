use crate::guard::{AuthGuard, Feature, Gated, Notice};
use murmur_common::{
    model::{
        Id, MurmurSnowflakeGenerator,
        post::{Author, CreatePost, Post, PostMarker},
    },
    snowflake::{ClientId, SnowflakeTimestampError},
};
use parking_lot::Mutex;
use std::{
    fmt::{Debug, Formatter},
    sync::Arc,
};
use thiserror::Error;
use time::{Duration, UtcDateTime};
use tracing::debug;

const DEMO_CONTENT: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit, sed do \
eiusmod tempor incididunt ut labore et dolore magna aliqua. Ut enim ad minim veniam, quis nostrud \
exercitation ullamco laboris nisi ut aliquip ex ea commodo consequat.";
const DEMO_AGE: Duration = Duration::minutes(5);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum Interaction {
    Like,
    Comment,
    Share,
}

impl From<Interaction> for Feature {
    fn from(value: Interaction) -> Self {
        match value {
            Interaction::Like => Feature::Like,
            Interaction::Comment => Feature::Comment,
            Interaction::Share => Feature::Share,
        }
    }
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Post by id not found: {0}")]
    PostByIdNotFound(Id<PostMarker>),
    #[error(transparent)]
    Snowflake(#[from] SnowflakeTimestampError),
}

/// The in-memory feed, newest post first.
///
/// Cloning yields another handle to the same feed.
#[derive(Clone)]
pub struct FeedStore {
    inner: Arc<FeedInner>,
}

struct FeedInner {
    posts: Mutex<Vec<Post>>,
    snowflake_generator: Mutex<MurmurSnowflakeGenerator>,
}

impl FeedStore {
    #[must_use]
    pub fn new(client_id: ClientId) -> Self {
        Self {
            inner: Arc::new(FeedInner {
                posts: Mutex::new(Vec::new()),
                snowflake_generator: Mutex::new(MurmurSnowflakeGenerator::new(client_id)),
            }),
        }
    }

    /// Replaces the whole feed.
    pub fn seed(&self, posts: Vec<Post>) {
        debug!(posts = posts.len(), "Seeding feed");
        *self.inner.posts.lock() = posts;
    }

    pub fn seed_demo(&self) -> Result<(), FeedError> {
        let posts = demo_posts(
            &mut self.inner.snowflake_generator.lock(),
            UtcDateTime::now(),
        )?;
        self.seed(posts);
        Ok(())
    }

    pub fn prepend(&self, post: CreatePost) -> Result<Post, FeedError> {
        let created_at = UtcDateTime::now();
        let id = self
            .inner
            .snowflake_generator
            .lock()
            .generate_at(created_at)?;

        let post = Post::new(id.into(), created_at, post);
        self.inner.posts.lock().insert(0, post.clone());
        debug!(post_id = %post.id, "Prepended post");

        Ok(post)
    }

    #[must_use]
    pub fn list(&self) -> Vec<Post> {
        self.inner.posts.lock().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.posts.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.posts.lock().is_empty()
    }

    #[must_use]
    pub fn get(&self, id: Id<PostMarker>) -> Option<Post> {
        self.inner
            .posts
            .lock()
            .iter()
            .find(|post| post.id == id)
            .cloned()
    }

    /// Like, comment or share. None of them are implemented, so counters never change.
    pub fn interact(
        &self,
        guard: &AuthGuard,
        post_id: Id<PostMarker>,
        interaction: Interaction,
    ) -> Result<Gated<Notice>, FeedError> {
        if self.get(post_id).is_none() {
            return Err(FeedError::PostByIdNotFound(post_id));
        }

        debug!(%post_id, ?interaction, "Post interaction");
        Ok(guard.stub(interaction.into()))
    }
}

impl Debug for FeedStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedStore")
            .field("posts", &self.len())
            .finish_non_exhaustive()
    }
}

/// The three posts a fresh client starts with, all five minutes old.
pub fn demo_posts(
    generator: &mut MurmurSnowflakeGenerator,
    now: UtcDateTime,
) -> Result<Vec<Post>, SnowflakeTimestampError> {
    let created_at = now - DEMO_AGE;
    let seeds = [
        ("Theresa Webb", "men/79", 24, 5, 2, "😊"),
        ("John Doe", "men/72", 18, 8, 3, "😎"),
        ("Jane Doe", "men/74", 42, 12, 7, "🥳"),
    ];

    // Oldest id last, so the newest-first list is also ordered by id.
    let mut posts = Vec::with_capacity(seeds.len());
    for (name, portrait, likes, comments, shares, emoji) in seeds.into_iter().rev() {
        let id = generator.generate_at(created_at)?;
        let avatar = format!("https://randomuser.me/api/portraits/{portrait}.jpg");

        posts.push(Post {
            likes,
            comments,
            shares,
            ..Post::new(
                id.into(),
                created_at,
                CreatePost {
                    author: Author::new(name, Some(&avatar)),
                    content: DEMO_CONTENT.to_owned(),
                    emoji: emoji.to_owned(),
                },
            )
        });
    }
    posts.reverse();

    Ok(posts)
}

#[cfg(test)]
mod tests {
    use crate::{
        feed::{DEMO_AGE, FeedError, FeedStore, Interaction, demo_posts},
        guard::{AuthGuard, Feature, Gated, Notice},
        testing,
    };
    use murmur_common::{
        model::{
            Id, MurmurSnowflakeGenerator,
            post::{Author, CreatePost},
        },
        snowflake::ClientId,
    };
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };
    use time::UtcDateTime;

    fn draft(content: &str) -> CreatePost {
        CreatePost {
            author: Author::new("Ada", None),
            content: content.to_owned(),
            emoji: "😊".to_owned(),
        }
    }

    #[test]
    fn demo_posts_match_the_seed() {
        let now = UtcDateTime::now();
        let posts =
            demo_posts(&mut MurmurSnowflakeGenerator::new(ClientId::default()), now).unwrap();

        let summary: Vec<_> = posts
            .iter()
            .map(|post| {
                (
                    post.author.name.as_str(),
                    post.likes,
                    post.comments,
                    post.shares,
                    post.emoji.as_str(),
                )
            })
            .collect();
        assert_eq!(
            summary,
            [
                ("Theresa Webb", 24, 5, 2, "😊"),
                ("John Doe", 18, 8, 3, "😎"),
                ("Jane Doe", 42, 12, 7, "🥳"),
            ]
        );
        assert!(posts.iter().all(|post| post.created_at == now - DEMO_AGE));
        assert!(posts.windows(2).all(|pair| pair[0].id > pair[1].id));
        assert_eq!(
            posts[1].author.avatar.as_deref(),
            Some("https://randomuser.me/api/portraits/men/72.jpg")
        );
    }

    #[test]
    fn prepend_puts_newest_first() {
        let feed = FeedStore::new(ClientId::default());
        feed.seed_demo().unwrap();

        let first = feed.prepend(draft("<p>one</p>")).unwrap();
        let second = feed.prepend(draft("<p>two</p>")).unwrap();

        let posts = feed.list();
        assert_eq!(posts.len(), 5);
        assert_eq!(posts[0], second);
        assert_eq!(posts[1], first);
        assert!(second.id > first.id);
        assert_eq!((first.likes, first.comments, first.shares), (0, 0, 0));
        assert_eq!(feed.get(first.id), Some(first));
    }

    #[test]
    fn seed_replaces_everything() {
        let feed = FeedStore::new(ClientId::default());
        feed.prepend(draft("<p>gone</p>")).unwrap();

        feed.seed_demo().unwrap();
        assert_eq!(feed.len(), 3);

        feed.seed(Vec::new());
        assert!(feed.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn interactions_are_gated_stubs() {
        let prompts = Arc::new(AtomicUsize::new(0));
        let guard = AuthGuard::new(testing::session(), {
            let prompts = Arc::clone(&prompts);
            move || {
                prompts.fetch_add(1, Ordering::SeqCst);
            }
        });
        let feed = FeedStore::new(ClientId::default());
        feed.seed_demo().unwrap();
        let before = feed.list();
        let id = before[2].id;

        assert_eq!(
            feed.interact(&guard, id, Interaction::Comment).unwrap(),
            Gated::AuthRequired
        );
        assert_eq!(prompts.load(Ordering::SeqCst), 1);

        guard
            .session()
            .login("demo@example.com", "password123")
            .await
            .unwrap();
        for (interaction, feature) in [
            (Interaction::Like, Feature::Like),
            (Interaction::Comment, Feature::Comment),
            (Interaction::Share, Feature::Share),
        ] {
            assert_eq!(
                feed.interact(&guard, id, interaction).unwrap(),
                Gated::Allowed(Notice::NotImplemented(feature))
            );
        }

        assert_eq!(feed.list(), before);
        assert_eq!(prompts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn interacting_with_unknown_post() {
        let guard = AuthGuard::new(testing::session(), || {});
        let feed = FeedStore::new(ClientId::default());

        assert!(matches!(
            feed.interact(&guard, Id::from(42_u64), Interaction::Like),
            Err(FeedError::PostByIdNotFound(_))
        ));
    }
}
