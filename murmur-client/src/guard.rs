use crate::session::SessionManager;
use murmur_common::model::user::User;
use std::{
    fmt::{Debug, Display, Formatter},
    sync::Arc,
};
use tracing::{debug, info};

/// Invoked whenever an action needs a session the caller does not have.
pub type AuthRequiredCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum Gated<T> {
    Allowed(T),
    AuthRequired,
}

impl<T> Gated<T> {
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Gated::Allowed(_))
    }

    #[must_use]
    pub fn allowed(self) -> Option<T> {
        match self {
            Gated::Allowed(value) => Some(value),
            Gated::AuthRequired => None,
        }
    }
}

/// Affordances that are offered but have no implementation yet.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum Feature {
    Attachment,
    VoiceMessage,
    Photo,
    Like,
    Comment,
    Share,
}

impl Feature {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Feature::Attachment => "Add attachment",
            Feature::VoiceMessage => "Voice message",
            Feature::Photo => "Add photo",
            Feature::Like => "Like",
            Feature::Comment => "Comment",
            Feature::Share => "Share",
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum Notice {
    NotImplemented(Feature),
}

impl Display for Notice {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::NotImplemented(_) => f.write_str("Function not implemented"),
        }
    }
}

/// Runs actions only for an authenticated session and asks for authentication otherwise.
#[derive(Clone)]
pub struct AuthGuard {
    session: SessionManager,
    on_auth_required: AuthRequiredCallback,
}

impl AuthGuard {
    #[must_use]
    pub fn new(session: SessionManager, on_auth_required: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            session,
            on_auth_required: Arc::new(on_auth_required),
        }
    }

    #[must_use]
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// The session user, or `None` after invoking the callback exactly once.
    #[must_use]
    pub fn require(&self) -> Option<User> {
        let user = self.session.user();
        if user.is_none() {
            debug!("Action requires authentication");
            (self.on_auth_required)();
        }
        user
    }

    pub fn gate<T>(&self, action: impl FnOnce(User) -> T) -> Gated<T> {
        match self.require() {
            Some(user) => Gated::Allowed(action(user)),
            None => Gated::AuthRequired,
        }
    }

    /// Gate for an affordance without an implementation: authenticated callers get a notice.
    pub fn stub(&self, feature: Feature) -> Gated<Notice> {
        self.gate(|_| {
            info!(feature = feature.label(), "Function not implemented");
            Notice::NotImplemented(feature)
        })
    }
}

impl Debug for AuthGuard {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGuard")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        guard::{AuthGuard, Feature, Gated, Notice},
        testing,
    };
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    fn counting_guard() -> (AuthGuard, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let guard = AuthGuard::new(testing::session(), {
            let calls = Arc::clone(&calls);
            move || {
                calls.fetch_add(1, Ordering::SeqCst);
            }
        });
        (guard, calls)
    }

    #[test]
    fn denies_and_prompts_without_session() {
        let (guard, calls) = counting_guard();
        let mut ran = false;

        let result = guard.gate(|_| ran = true);

        assert_eq!(result, Gated::AuthRequired);
        assert!(!ran);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn runs_action_with_session_user() {
        let (guard, calls) = counting_guard();
        guard
            .session()
            .login("test@user.com", "testpass")
            .await
            .unwrap();

        let result = guard.gate(|user| user.name);

        assert_eq!(result, Gated::Allowed("Test User".to_owned()));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stubs_are_gated_like_everything_else() {
        let (guard, calls) = counting_guard();

        for feature in [Feature::Attachment, Feature::VoiceMessage, Feature::Photo] {
            assert_eq!(guard.stub(feature), Gated::AuthRequired);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        guard
            .session()
            .login("demo@example.com", "password123")
            .await
            .unwrap();
        let notice = guard.stub(Feature::Photo).allowed().unwrap();
        assert_eq!(notice, Notice::NotImplemented(Feature::Photo));
        assert_eq!(notice.to_string(), "Function not implemented");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
