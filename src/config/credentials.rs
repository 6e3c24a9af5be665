// src/config/credentials.rs
use std::env;
use std::fmt;

pub const ENV_ACCESS_KEY: &str = "PA_API_KEY";
pub const ENV_SECRET_KEY: &str = "PA_API_SECRET";
pub const ENV_PARTNER_TAG: &str = "PARTNER_TAG";

/// Catalog API credentials. Read from the environment only, never from the
/// config file. Blank values are treated as absent.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CatalogCredentials {
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub partner_tag: Option<String>,
}

impl CatalogCredentials {
    pub fn new(
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        partner_tag: impl Into<String>,
    ) -> Self {
        Self {
            access_key: non_blank(access_key.into()),
            secret_key: non_blank(secret_key.into()),
            partner_tag: non_blank(partner_tag.into()),
        }
    }

    pub fn from_env() -> Self {
        Self {
            access_key: env::var(ENV_ACCESS_KEY).ok().and_then(non_blank),
            secret_key: env::var(ENV_SECRET_KEY).ok().and_then(non_blank),
            partner_tag: env::var(ENV_PARTNER_TAG).ok().and_then(non_blank),
        }
    }

    pub fn partner_tag(&self) -> Option<&str> {
        self.partner_tag.as_deref()
    }

    /// Names of the environment variables that are still missing.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.access_key.is_none() {
            out.push(ENV_ACCESS_KEY);
        }
        if self.secret_key.is_none() {
            out.push(ENV_SECRET_KEY);
        }
        if self.partner_tag.is_none() {
            out.push(ENV_PARTNER_TAG);
        }
        out
    }
}

// Never print the secret.
impl fmt::Debug for CatalogCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogCredentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "***"))
            .field("partner_tag", &self.partner_tag)
            .finish()
    }
}

fn non_blank(s: String) -> Option<String> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}
