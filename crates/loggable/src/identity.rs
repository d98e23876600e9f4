//! Who is recorded as the author of each log entry.
//!
//! Either an explicit name, or a provider object that exposes one of three
//! capabilities. Capabilities are tried in a fixed order:
//! `user_identifier`, then `username`, then `display_name`.

use crate::error::{LoggableError, Result};

/// Something that can tell the engine who the current user is.
///
/// Implement whichever capability the user type has; the others default to
/// `None`.
pub trait IdentityProvider {
    /// Stable user identifier (preferred).
    fn user_identifier(&self) -> Option<String> {
        None
    }

    /// Legacy login name.
    fn username(&self) -> Option<String> {
        None
    }

    /// String form of the user object.
    fn display_name(&self) -> Option<String> {
        None
    }
}

/// The configured identity source.
pub enum IdentitySource {
    Name(String),
    Provider(Box<dyn IdentityProvider>),
}

impl IdentitySource {
    pub fn provider(provider: impl IdentityProvider + 'static) -> Self {
        IdentitySource::Provider(Box::new(provider))
    }

    /// Normalize to the name recorded on entries.
    pub fn resolve(&self) -> Result<String> {
        match self {
            IdentitySource::Name(name) => Ok(name.clone()),
            IdentitySource::Provider(provider) => provider
                .user_identifier()
                .or_else(|| provider.username())
                .or_else(|| provider.display_name())
                .ok_or_else(|| {
                    LoggableError::InvalidConfiguration(
                        "identity must be a name, or a provider exposing a user identifier, \
                         username, or display name"
                            .to_string(),
                    )
                }),
        }
    }
}

impl From<&str> for IdentitySource {
    fn from(name: &str) -> Self {
        IdentitySource::Name(name.to_string())
    }
}

impl From<String> for IdentitySource {
    fn from(name: String) -> Self {
        IdentitySource::Name(name)
    }
}

impl std::fmt::Debug for IdentitySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentitySource::Name(name) => f.debug_tuple("Name").field(name).finish(),
            IdentitySource::Provider(_) => f.write_str("Provider(..)"),
        }
    }
}
