use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ErrorKind;

const TOKEN_PREFIX: &str = "mock";
const TOKEN_SIGNATURE: &str = "sig";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("sign in first")]
    NotSignedIn,
    #[error("{0} is not an organizer")]
    Forbidden(String),
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Forbidden
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Organizer,
    User,
}

/// The single rule deciding who may create, edit and delete events.
pub fn role_for_email(email: &str) -> Role {
    if email.trim().to_ascii_lowercase().ends_with(".org") {
        Role::Organizer
    } else {
        Role::User
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub email: String,
    pub role: Role,
    pub name: String,
}

impl Session {
    /// Builds a session for `email`; without a name the local part is used.
    pub fn for_email(email: &str, name: Option<&str>) -> Self {
        let email = email.trim();
        let name = name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| email.split('@').next().unwrap_or(email));
        Self {
            email: email.to_string(),
            role: role_for_email(email),
            name: name.to_string(),
        }
    }

    pub fn can_manage_events(&self) -> bool {
        self.role == Role::Organizer
    }

    /// `mock.<base64 json>.sig`: unsigned, readable and forgeable by anyone.
    /// Demo only.
    pub fn to_token(&self) -> String {
        // Serializing a struct of strings cannot fail.
        let payload = serde_json::to_vec(self).unwrap_or_default();
        format!("{TOKEN_PREFIX}.{}.{TOKEN_SIGNATURE}", STANDARD.encode(payload))
    }

    /// Decodes a token produced by [`Session::to_token`]. Anything malformed
    /// yields `None`.
    pub fn from_token(token: &str) -> Option<Self> {
        let mut parts = token.trim().split('.');
        let (Some(TOKEN_PREFIX), Some(payload), Some(_)) = (parts.next(), parts.next(), parts.next())
        else {
            return None;
        };
        let bytes = STANDARD.decode(payload).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

/// Gate for organizer-only operations.
pub fn require_organizer(session: Option<&Session>) -> Result<&Session, SessionError> {
    let session = session.ok_or(SessionError::NotSignedIn)?;
    if session.can_manage_events() {
        Ok(session)
    } else {
        Err(SessionError::Forbidden(session.email.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn organizer_rule() {
        assert_eq!(role_for_email("events@gmail.org"), Role::Organizer);
        assert_eq!(role_for_email("Team@GMAIL.ORG "), Role::Organizer);
        assert_eq!(role_for_email("george@gmail.com"), Role::User);
        assert_eq!(role_for_email("org.lead@gmail.com"), Role::User);
    }

    #[test]
    fn name_defaults_to_local_part() {
        let session = Session::for_email("priya@gmail.in", None);
        assert_eq!(session.name, "priya");
        assert_eq!(session.role, Role::User);

        let named = Session::for_email("priya@gmail.org", Some("Priya S"));
        assert_eq!(named.name, "Priya S");
        assert!(named.can_manage_events());
    }

    #[test]
    fn token_round_trip() {
        let session = Session::for_email("host@gmail.org", Some("Host"));
        let token = session.to_token();
        assert!(token.starts_with("mock."));
        assert!(token.ends_with(".sig"));
        assert_eq!(Session::from_token(&token), Some(session));
    }

    #[test]
    fn garbage_tokens_decode_to_none() {
        assert_eq!(Session::from_token(""), None);
        assert_eq!(Session::from_token("mock"), None);
        assert_eq!(Session::from_token("jwt.e30=.sig"), None);
        assert_eq!(Session::from_token("mock.!!!.sig"), None);
        assert_eq!(Session::from_token("mock.e30=.sig"), None);
    }

    #[test]
    fn organizer_gate() {
        let host = Session::for_email("host@gmail.org", None);
        let guest = Session::for_email("guest@gmail.com", None);
        assert!(require_organizer(Some(&host)).is_ok());
        assert!(matches!(
            require_organizer(Some(&guest)),
            Err(SessionError::Forbidden(_))
        ));
        assert!(matches!(
            require_organizer(None),
            Err(SessionError::NotSignedIn)
        ));
    }
}
