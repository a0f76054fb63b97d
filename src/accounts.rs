use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::ErrorKind;
use crate::inventory::DEFAULT_MAX_WRITE_RETRIES;
use crate::models::User;
use crate::session::Session;
use crate::storage::{self, KeyValueStore, StorageError};
use crate::utils;
use crate::validation;

pub const USERS_KEY: &str = "users";
pub const CURRENT_USER_KEY: &str = "currentUser";
pub const SESSION_TOKEN_KEY: &str = "es_token";

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("invalid email {0:?}: use a gmail.com, gmail.in or gmail.org address")]
    InvalidEmail(String),
    #[error("password must be at least 6 characters long")]
    PasswordTooShort,
    #[error("{0} is already registered")]
    Duplicate(String),
    #[error("no account found for {0}")]
    NotFound(String),
    #[error("incorrect password")]
    IncorrectPassword,
    #[error("accounts changed concurrently {0} times in a row; giving up")]
    Conflict(u32),
    #[error("failed to encode accounts: {0}")]
    Encode(serde_json::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl AccountError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingField(_)
            | Self::InvalidEmail(_)
            | Self::PasswordTooShort
            | Self::IncorrectPassword => ErrorKind::Validation,
            Self::Duplicate(_) => ErrorKind::Duplicate,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Encode(_) | Self::Storage(_) => ErrorKind::Storage,
        }
    }
}

pub type Result<T> = std::result::Result<T, AccountError>;

/// Demo accounts and the signed-in user, kept in the same key-value store as
/// the events.
pub struct AccountStore<S> {
    store: S,
}

impl<S: KeyValueStore> AccountStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn sign_up(&self, name: &str, email: &str, password: &str) -> Result<Session> {
        let name = validation::required(name).ok_or(AccountError::MissingField("name"))?;
        let email = validation::required(email).ok_or(AccountError::MissingField("email"))?;
        if password.trim().is_empty() {
            return Err(AccountError::MissingField("password"));
        }
        if !validation::is_gmail_address(email) {
            return Err(AccountError::InvalidEmail(email.to_string()));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AccountError::PasswordTooShort);
        }

        let password_sha256 = hash_password(password);
        let user = self.mutate_users(|users| {
            if users.iter().any(|user| user.email.eq_ignore_ascii_case(email)) {
                return Err(AccountError::Duplicate(email.to_string()));
            }
            let user = User {
                id: utils::next_id(users.iter().map(|user| user.id)),
                name: name.to_string(),
                email: email.to_string(),
                password_sha256: Some(password_sha256.clone()),
                password: None,
            };
            users.push(user.clone());
            Ok(user)
        })?;

        info!(user_id = user.id, "account registered");
        self.start_session(&user)
    }

    pub fn login(&self, email: &str, password: &str) -> Result<Session> {
        let email = validation::required(email).ok_or(AccountError::MissingField("email"))?;
        if password.trim().is_empty() {
            return Err(AccountError::MissingField("password"));
        }
        if !validation::is_gmail_address(email) {
            return Err(AccountError::InvalidEmail(email.to_string()));
        }

        let user = self
            .users()?
            .into_iter()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .ok_or_else(|| AccountError::NotFound(email.to_string()))?;
        let user = match check_password(&user, password) {
            PasswordCheck::Mismatch => {
                debug!(user_id = user.id, "login rejected");
                return Err(AccountError::IncorrectPassword);
            }
            PasswordCheck::Hashed => user,
            PasswordCheck::Legacy => self.rehash(user.id, password)?,
        };

        info!(user_id = user.id, "signed in");
        self.start_session(&user)
    }

    /// Replaces a clear-text password with its digest after a successful login.
    fn rehash(&self, id: i64, password: &str) -> Result<User> {
        let password_sha256 = hash_password(password);
        let user = self.mutate_users(|users| {
            let user = users
                .iter_mut()
                .find(|user| user.id == id)
                .ok_or_else(|| AccountError::NotFound(id.to_string()))?;
            user.password_sha256 = Some(password_sha256.clone());
            user.password = None;
            Ok(user.clone())
        })?;
        info!(user_id = id, "clear-text password replaced by digest");
        Ok(user)
    }

    pub fn logout(&self) -> Result<()> {
        self.store.remove(SESSION_TOKEN_KEY)?;
        self.store.remove(CURRENT_USER_KEY)?;
        Ok(())
    }

    pub fn users(&self) -> Result<Vec<User>> {
        let snapshot = storage::read_collection(&self.store, USERS_KEY)?;
        if let Some(err) = snapshot.corruption {
            warn!("stored users are corrupt, treating as empty: {err}");
        }
        Ok(snapshot.items)
    }

    pub fn current_user(&self) -> Result<Option<User>> {
        let Some(stored) = self.store.get(CURRENT_USER_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str(&stored.value) {
            Ok(user) => Ok(Some(user)),
            Err(err) => {
                warn!("stored current user is corrupt, ignoring: {err}");
                Ok(None)
            }
        }
    }

    /// The session carried by the stored token, if it still decodes.
    pub fn current_session(&self) -> Result<Option<Session>> {
        Ok(self
            .store
            .get(SESSION_TOKEN_KEY)?
            .and_then(|stored| Session::from_token(&stored.value)))
    }

    fn start_session(&self, user: &User) -> Result<Session> {
        let session = Session::for_email(&user.email, Some(&user.name));
        let current = serde_json::to_string(user).map_err(AccountError::Encode)?;
        self.overwrite(CURRENT_USER_KEY, &current)?;
        self.overwrite(SESSION_TOKEN_KEY, &session.to_token())?;
        Ok(session)
    }

    /// Last-writer-wins write for single-value keys.
    fn overwrite(&self, key: &str, value: &str) -> Result<()> {
        for _ in 0..=DEFAULT_MAX_WRITE_RETRIES {
            let version = self.store.get(key)?.map(|stored| stored.version);
            if self.store.compare_and_swap(key, version, value)? {
                return Ok(());
            }
        }
        Err(AccountError::Conflict(DEFAULT_MAX_WRITE_RETRIES + 1))
    }

    fn mutate_users<T, F>(&self, mut apply: F) -> Result<T>
    where
        F: FnMut(&mut Vec<User>) -> Result<T>,
    {
        for attempt in 0..=DEFAULT_MAX_WRITE_RETRIES {
            let mut snapshot = storage::read_collection::<User, _>(&self.store, USERS_KEY)?;
            if let Some(err) = &snapshot.corruption {
                warn!("stored users are corrupt, rewriting from empty: {err}");
            }
            let mut users = std::mem::take(&mut snapshot.items);
            let outcome = apply(&mut users)?;
            let payload = snapshot.encode(&users).map_err(AccountError::Encode)?;
            if self
                .store
                .compare_and_swap(USERS_KEY, snapshot.version, &payload)?
            {
                return Ok(outcome);
            }
            debug!(attempt, "users changed underneath, retrying");
        }
        Err(AccountError::Conflict(DEFAULT_MAX_WRITE_RETRIES + 1))
    }
}

enum PasswordCheck {
    Hashed,
    Legacy,
    Mismatch,
}

fn check_password(user: &User, password: &str) -> PasswordCheck {
    match (&user.password_sha256, &user.password) {
        (Some(stored), _) if *stored == hash_password(password) => PasswordCheck::Hashed,
        (None, Some(clear)) if clear == password => PasswordCheck::Legacy,
        _ => PasswordCheck::Mismatch,
    }
}

fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}
