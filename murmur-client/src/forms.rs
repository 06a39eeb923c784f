//! Login and signup forms shown in the authentication dialog.

use crate::{
    dialog::{DialogController, DialogMode, ElementId},
    session::{SessionError, SessionManager},
};
use parking_lot::Mutex;
use regex::{Regex, RegexBuilder};
use std::{
    collections::BTreeMap,
    fmt::{Debug, Formatter},
    sync::{Arc, LazyLock},
};
use thiserror::Error;
use tracing::{debug, warn};

pub const MIN_NAME_CHARS: usize = 2;
pub const MIN_PASSWORD_CHARS: usize = 6;

pub const LOGIN_REJECTED: &str = "Invalid email or password";
pub const SIGNUP_REJECTED: &str = "Failed to create account. Please try again.";
pub const REQUEST_FAILED: &str = "An error occurred. Please try again.";

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"^[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}$")
        .case_insensitive(true)
        .build()
        .expect("email pattern is valid")
});

pub const LOGIN_FOCUS_ORDER: [&str; 4] = ["email", "password", "submit", "switch-to-signup"];
pub const SIGNUP_FOCUS_ORDER: [&str; 5] =
    ["name", "email", "password", "submit", "switch-to-login"];

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum Field {
    Name,
    Email,
    Password,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum FieldError {
    #[error("Email or username is required")]
    EmailOrUsernameRequired,
    #[error("Email is required")]
    EmailRequired,
    #[error("Invalid email address")]
    InvalidEmail,
    #[error("Password is required")]
    PasswordRequired,
    #[error("Password must be at least 6 characters")]
    PasswordTooShort,
    #[error("Name is required")]
    NameRequired,
    #[error("Name must be at least 2 characters")]
    NameTooShort,
}

pub type FieldErrors = BTreeMap<Field, FieldError>;

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct FormStatus {
    pub is_loading: bool,
    /// Form-level message shown above the submit button.
    pub error: Option<String>,
    pub field_errors: FieldErrors,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum SubmitOutcome {
    /// Validation failed; the session was not consulted.
    Invalid(FieldErrors),
    /// A submission is already in flight.
    Busy,
    Rejected,
    Failed,
    /// The dialog closed; focus goes back to the element that opened it, if any.
    Succeeded { restore_focus: Option<ElementId> },
}

fn validate_password(password: &str, errors: &mut FieldErrors) {
    if password.is_empty() {
        errors.insert(Field::Password, FieldError::PasswordRequired);
    } else if password.chars().count() < MIN_PASSWORD_CHARS {
        errors.insert(Field::Password, FieldError::PasswordTooShort);
    }
}

#[must_use]
pub fn validate_login(email: &str, password: &str) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if email.is_empty() {
        errors.insert(Field::Email, FieldError::EmailOrUsernameRequired);
    }
    validate_password(password, &mut errors);
    errors
}

#[must_use]
pub fn validate_signup(name: &str, email: &str, password: &str) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if name.is_empty() {
        errors.insert(Field::Name, FieldError::NameRequired);
    } else if name.chars().count() < MIN_NAME_CHARS {
        errors.insert(Field::Name, FieldError::NameTooShort);
    }
    if email.is_empty() {
        errors.insert(Field::Email, FieldError::EmailRequired);
    } else if !EMAIL_PATTERN.is_match(email) {
        errors.insert(Field::Email, FieldError::InvalidEmail);
    }
    validate_password(password, &mut errors);
    errors
}

#[derive(Debug, Default)]
struct FormState {
    status: FormStatus,
    /// Bumped on every reset; a request started under an older value no longer owns the form.
    generation: u64,
}

/// Shared submission flow of both forms.
#[derive(Clone)]
struct FormCore {
    session: SessionManager,
    dialog: DialogController,
    state: Arc<Mutex<FormState>>,
}

impl FormCore {
    fn new(session: SessionManager, dialog: DialogController) -> Self {
        Self {
            session,
            dialog,
            state: Arc::new(Mutex::new(FormState::default())),
        }
    }

    /// Moves to loading and returns the current generation, unless validation
    /// failed or a submission is in flight.
    fn begin(&self, field_errors: FieldErrors) -> Result<u64, SubmitOutcome> {
        let mut state = self.state.lock();
        if state.status.is_loading {
            return Err(SubmitOutcome::Busy);
        }
        if !field_errors.is_empty() {
            state.status.field_errors.clone_from(&field_errors);
            return Err(SubmitOutcome::Invalid(field_errors));
        }

        state.status.field_errors.clear();
        state.status.error = None;
        state.status.is_loading = true;
        Ok(state.generation)
    }

    fn finish(
        &self,
        generation: u64,
        result: Result<bool, SessionError>,
        rejected_message: &str,
    ) -> SubmitOutcome {
        let outcome = match result {
            Ok(true) => None,
            Ok(false) => Some((SubmitOutcome::Rejected, rejected_message)),
            Err(err) => {
                warn!(error = %err, "Authentication request failed");
                Some((SubmitOutcome::Failed, REQUEST_FAILED))
            }
        };

        let mut state = self.state.lock();
        state.status.is_loading = false;
        let stale = state.generation != generation;
        if stale {
            debug!("Form was reset while the request was in flight");
        }
        match outcome {
            Some((outcome, message)) => {
                if !stale {
                    state.status.error = Some(message.to_owned());
                }
                outcome
            }
            None if stale => SubmitOutcome::Succeeded {
                restore_focus: None,
            },
            None => {
                drop(state);
                SubmitOutcome::Succeeded {
                    restore_focus: self.dialog.close(),
                }
            }
        }
    }

    fn status(&self) -> FormStatus {
        self.state.lock().status.clone()
    }

    /// Clears messages; an in-flight request keeps the form loading.
    fn reset(&self) {
        let mut state = self.state.lock();
        state.status.error = None;
        state.status.field_errors.clear();
        state.generation += 1;
    }
}

#[derive(Clone)]
pub struct LoginForm {
    core: FormCore,
}

impl LoginForm {
    #[must_use]
    pub fn new(session: SessionManager, dialog: DialogController) -> Self {
        Self {
            core: FormCore::new(session, dialog),
        }
    }

    pub async fn submit(&self, email: &str, password: &str) -> SubmitOutcome {
        let generation = match self.core.begin(validate_login(email, password)) {
            Ok(generation) => generation,
            Err(outcome) => return outcome,
        };
        debug!(email, "Submitting login");

        let result = self.core.session.login(email, password).await;
        self.core.finish(generation, result, LOGIN_REJECTED)
    }

    #[must_use]
    pub fn status(&self) -> FormStatus {
        self.core.status()
    }
}

#[derive(Clone)]
pub struct SignupForm {
    core: FormCore,
}

impl SignupForm {
    #[must_use]
    pub fn new(session: SessionManager, dialog: DialogController) -> Self {
        Self {
            core: FormCore::new(session, dialog),
        }
    }

    pub async fn submit(&self, name: &str, email: &str, password: &str) -> SubmitOutcome {
        let generation = match self.core.begin(validate_signup(name, email, password)) {
            Ok(generation) => generation,
            Err(outcome) => return outcome,
        };
        debug!(email, "Submitting signup");

        let result = self.core.session.signup(name, email, password).await;
        self.core.finish(generation, result, SIGNUP_REJECTED)
    }

    #[must_use]
    pub fn status(&self) -> FormStatus {
        self.core.status()
    }
}

/// The dialog together with both forms, wired to one session.
#[derive(Clone)]
pub struct AuthDialog {
    dialog: DialogController,
    login: LoginForm,
    signup: SignupForm,
}

impl AuthDialog {
    #[must_use]
    pub fn new(session: SessionManager) -> Self {
        let dialog = DialogController::new();
        dialog.set_focus_order(
            DialogMode::Login,
            LOGIN_FOCUS_ORDER.into_iter().map(ElementId::new).collect(),
        );
        dialog.set_focus_order(
            DialogMode::Signup,
            SIGNUP_FOCUS_ORDER.into_iter().map(ElementId::new).collect(),
        );

        Self {
            login: LoginForm::new(session.clone(), dialog.clone()),
            signup: SignupForm::new(session, dialog.clone()),
            dialog,
        }
    }

    #[must_use]
    pub fn dialog(&self) -> &DialogController {
        &self.dialog
    }

    #[must_use]
    pub fn login(&self) -> &LoginForm {
        &self.login
    }

    #[must_use]
    pub fn signup(&self) -> &SignupForm {
        &self.signup
    }

    /// Opens in `mode` with fresh forms.
    pub fn open(&self, mode: DialogMode) -> Option<ElementId> {
        self.reset_forms();
        self.dialog.open_from_page(mode)
    }

    pub fn switch_mode(&self) -> Option<ElementId> {
        self.reset_forms();
        self.dialog.switch_mode()
    }

    /// The callback for [`crate::guard::AuthGuard`]: opens the dialog on the login form.
    #[must_use]
    pub fn prompt(&self) -> impl Fn() + Send + Sync + 'static {
        let this = self.clone();
        move || {
            if !this.dialog.is_open() {
                this.open(DialogMode::Login);
            }
        }
    }

    fn reset_forms(&self) {
        self.login.core.reset();
        self.signup.core.reset();
    }
}

impl Debug for AuthDialog {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthDialog")
            .field("dialog", &self.dialog.state())
            .field("login", &self.login.status())
            .field("signup", &self.signup.status())
            .finish()
    }
}
