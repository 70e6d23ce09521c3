use crate::model::Id;
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;

pub const EMAIL_MAX_LEN: usize = 254;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct UserMarker;

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct User {
    pub id: Id<UserMarker>,
    pub email: Email,
    pub is_superuser: bool,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
pub struct RegisterUser {
    pub email: Email,
    pub password: String,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct Email(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The email address is invalid: {0}")]
pub struct InvalidEmailError(String);

impl Email {
    pub fn new(email: String) -> Result<Self, InvalidEmailError> {
        let well_formed = email.chars().count() <= EMAIL_MAX_LEN
            && email
                .split_once('@')
                .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));

        if well_formed {
            Ok(Email(email))
        } else {
            Err(InvalidEmailError(email))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl<'de> Deserialize<'de> for Email {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        Email::new(inner).map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"Email"))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::user::Email;

    #[test]
    fn accepts_plausible_addresses() {
        assert!(Email::new("reader@example.com".into()).is_ok());
        assert!(Email::new("a.b+c@mail.example.org".into()).is_ok());
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(Email::new(String::new()).is_err());
        assert!(Email::new("no-at-sign".into()).is_err());
        assert!(Email::new("@example.com".into()).is_err());
        assert!(Email::new("user@nodot".into()).is_err());
    }

    #[test]
    fn rejects_overlong_addresses() {
        let local = "a".repeat(250);
        assert!(Email::new(format!("{local}@example.com")).is_err());
    }
}
