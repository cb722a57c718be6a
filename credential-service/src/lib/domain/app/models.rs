use std::fmt;

use chrono::DateTime;
use chrono::Utc;
use url::Url;
use uuid::Uuid;

use crate::app::errors::AppNameError;
use crate::app::errors::CallbackUrlError;
use crate::user::models::UserId;

/// Third-party application registered to obtain tokens on behalf of users.
///
/// The secret is a signed app token minted at creation and never changed.
#[derive(Debug, Clone, PartialEq)]
pub struct App {
    pub id: AppId,
    pub name: AppName,
    pub callback: CallbackUrl,
    pub secret: String,
    /// `None` for legacy apps registered without an owner.
    pub owner: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl App {
    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        self.owner.as_ref() == Some(user_id)
    }
}

/// Public app identifier handed to clients as `client_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AppId(String);

impl AppId {
    /// Mint a new time-sortable app id (UUID v7, simple hex form).
    pub fn generate() -> Self {
        Self(Uuid::now_v7().simple().to_string())
    }

    /// Wrap an app id received from a client or read from storage.
    ///
    /// No format check: unknown ids simply fail lookup.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Display name of an app
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppName(String);

impl AppName {
    const MAX_LENGTH: usize = 64;

    /// # Errors
    /// * `Empty` - Name is blank
    /// * `TooLong` - Name longer than 64 characters
    pub fn new(name: String) -> Result<Self, AppNameError> {
        let name = name.trim().to_string();
        let length = name.chars().count();
        if length == 0 {
            return Err(AppNameError::Empty);
        }
        if length > Self::MAX_LENGTH {
            return Err(AppNameError::TooLong {
                max: Self::MAX_LENGTH,
                actual: length,
            });
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Absolute http(s) URL the user agent is sent back to with a code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackUrl(Url);

impl CallbackUrl {
    /// # Errors
    /// * `Malformed` - Not a parseable absolute URL
    /// * `UnsupportedScheme` - Not an http or https URL
    /// * `MissingHost` - No host to redirect to
    /// * `Fragment` - Carries a `#fragment`, which would swallow the code
    pub fn new(url: String) -> Result<Self, CallbackUrlError> {
        let url = Url::parse(&url)?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(CallbackUrlError::UnsupportedScheme);
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(CallbackUrlError::MissingHost);
        }
        if url.fragment().is_some() {
            return Err(CallbackUrlError::Fragment);
        }

        Ok(Self(url))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Callback URL with `code` appended as a query parameter.
    pub fn with_code(&self, code: &str) -> String {
        let mut url = self.0.clone();
        url.query_pairs_mut().append_pair("code", code);
        url.into()
    }
}

/// Command to register a new app with domain types
#[derive(Debug)]
pub struct CreateAppCommand {
    pub name: AppName,
    pub callback: CallbackUrl,
    pub owner: UserId,
}

impl CreateAppCommand {
    pub fn new(name: AppName, callback: CallbackUrl, owner: UserId) -> Self {
        Self {
            name,
            callback,
            owner,
        }
    }
}
