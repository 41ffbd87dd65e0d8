//! The client environment record and everything derived from it.
//!
//! One record per process. It is built at startup from a profile default,
//! per-field `APP_*` overrides or a JSON file, validated, then installed
//! and only ever read afterwards.

use std::{fmt, fs, path::Path, sync::OnceLock};

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::EnvironmentError;

pub const PRODUCTION_KEY: &str = "APP_PRODUCTION";
pub const API_SERVER_URL_KEY: &str = "APP_API_SERVER_URL";
pub const AUTH0_URL_KEY: &str = "APP_AUTH0_URL";
pub const AUTH0_AUDIENCE_KEY: &str = "APP_AUTH0_AUDIENCE";
pub const AUTH0_CLIENT_ID_KEY: &str = "APP_AUTH0_CLIENT_ID";
pub const AUTH0_CALLBACK_URL_KEY: &str = "APP_AUTH0_CALLBACK_URL";

const AUTH0_HOST_SUFFIX: &str = ".auth0.com";

static INSTALLED: OnceLock<Environment> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Development,
    Production,
}

impl Profile {
    pub fn from_production_flag(production: bool) -> Self {
        if production {
            Self::Production
        } else {
            Self::Development
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => f.write_str("development"),
            Self::Production => f.write_str("production"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Environment {
    pub production: bool,
    pub api_server_url: String,
    pub auth0: Auth0Settings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Auth0Settings {
    /// Tenant prefix, e.g. `sumesh-fsnd.jp` for `sumesh-fsnd.jp.auth0.com`.
    pub url: String,
    pub audience: String,
    pub client_id: String,
    #[serde(rename = "callbackURL")]
    pub callback_url: String,
}

impl Environment {
    /// Values for a local Flask API on :5000 and the Ionic app on :8100.
    pub fn development() -> Self {
        Self {
            production: false,
            api_server_url: "http://localhost:5000".to_string(),
            auth0: Auth0Settings {
                url: "sumesh-fsnd.jp".to_string(),
                audience: "http://localhost:5000".to_string(),
                client_id: "DhRvadhaE9GP6HLqwZOFWV77bRAWW3sK".to_string(),
                callback_url: "http://localhost:8100".to_string(),
            },
        }
    }

    /// Placeholders. A production deployment overrides every field.
    pub fn production() -> Self {
        Self {
            production: true,
            api_server_url: "https://api.example.com".to_string(),
            auth0: Auth0Settings {
                url: "your-tenant".to_string(),
                audience: "https://api.example.com".to_string(),
                client_id: "your-client-id".to_string(),
                callback_url: "https://app.example.com".to_string(),
            },
        }
    }

    pub fn for_profile(profile: Profile) -> Self {
        match profile {
            Profile::Development => Self::development(),
            Profile::Production => Self::production(),
        }
    }

    pub fn profile(&self) -> Profile {
        Profile::from_production_flag(self.production)
    }

    pub fn from_env() -> Result<Self, EnvironmentError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Seeds from the profile named by `APP_PRODUCTION` and applies the
    /// per-field overrides. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, EnvironmentError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| -> Option<String> {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let production = match read(PRODUCTION_KEY) {
            Some(value) => parse_flag(PRODUCTION_KEY, &value)?,
            None => false,
        };
        let mut env = Self::for_profile(Profile::from_production_flag(production));

        let overrides: [(&str, &mut String); 5] = [
            (API_SERVER_URL_KEY, &mut env.api_server_url),
            (AUTH0_URL_KEY, &mut env.auth0.url),
            (AUTH0_AUDIENCE_KEY, &mut env.auth0.audience),
            (AUTH0_CLIENT_ID_KEY, &mut env.auth0.client_id),
            (AUTH0_CALLBACK_URL_KEY, &mut env.auth0.callback_url),
        ];
        for (key, slot) in overrides {
            if let Some(value) = read(key) {
                debug!(key, "environment field overridden");
                *slot = value;
            }
        }

        Ok(env)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, EnvironmentError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, EnvironmentError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| EnvironmentError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "environment loaded from file");
        Self::from_json_str(&raw)
    }

    pub fn to_json(&self) -> Result<String, EnvironmentError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), EnvironmentError> {
        check_http_url("apiServerUrl", &self.api_server_url)?;
        self.auth0.validate()
    }

    /// Joins `path` onto `apiServerUrl` with exactly one `/` between them.
    pub fn api_url(&self, path: &str) -> String {
        if path.is_empty() {
            return self.api_server_url.clone();
        }
        format!(
            "{}/{}",
            self.api_server_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl Auth0Settings {
    pub fn validate(&self) -> Result<(), EnvironmentError> {
        if self.url.trim().is_empty() {
            return Err(EnvironmentError::Empty { field: "auth0.url" });
        }
        if self.client_id.trim().is_empty() {
            return Err(EnvironmentError::Empty {
                field: "auth0.clientId",
            });
        }
        if self
            .url
            .chars()
            .any(|c| matches!(c, '/' | '?' | '#' | ':' | '@') || c.is_whitespace())
        {
            return Err(EnvironmentError::InvalidUrl {
                field: "auth0.url",
                value: self.url.clone(),
                reason: "expected a bare tenant host".to_string(),
            });
        }
        check_http_url("auth0.audience", &self.audience)?;
        check_http_url("auth0.callbackURL", &self.callback_url)?;
        self.tenant_url("/")?;
        Ok(())
    }

    pub fn domain(&self) -> String {
        let prefix = self.url.trim_end_matches('/');
        if prefix.to_ascii_lowercase().ends_with(AUTH0_HOST_SUFFIX) {
            prefix.to_string()
        } else {
            format!("{prefix}{AUTH0_HOST_SUFFIX}")
        }
    }

    pub fn issuer(&self) -> String {
        format!("https://{}/", self.domain())
    }

    pub fn jwks_url(&self) -> String {
        format!("https://{}/.well-known/jwks.json", self.domain())
    }

    /// Implicit-flow authorize link; the provider redirects back to
    /// `callbackURL` followed by `callback_path`.
    pub fn login_url(&self, callback_path: &str) -> Result<Url, EnvironmentError> {
        let mut link = self.tenant_url("/authorize")?;
        link.query_pairs_mut()
            .append_pair("audience", &self.audience)
            .append_pair("response_type", "token")
            .append_pair("client_id", &self.client_id)
            .append_pair(
                "redirect_uri",
                &format!("{}{}", self.callback_url, callback_path),
            );
        Ok(link)
    }

    pub fn logout_url(&self) -> Result<Url, EnvironmentError> {
        let mut link = self.tenant_url("/v2/logout")?;
        link.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("returnTo", &self.callback_url);
        Ok(link)
    }

    /// Fails unless the built url lands on the tenant host itself.
    fn tenant_url(&self, path: &str) -> Result<Url, EnvironmentError> {
        let domain = self.domain();
        let invalid = |reason: String| EnvironmentError::InvalidUrl {
            field: "auth0.url",
            value: self.url.clone(),
            reason,
        };
        let link = Url::parse(&format!("https://{domain}{path}"))
            .map_err(|err| invalid(err.to_string()))?;
        match link.host_str() {
            Some(host) if host.eq_ignore_ascii_case(&domain) => Ok(link),
            other => Err(invalid(format!(
                "resolves to host {:?} instead of {domain}",
                other.unwrap_or_default()
            ))),
        }
    }
}

/// Stores the process-wide record. Only the first call succeeds.
pub fn install(env: Environment) -> Result<&'static Environment, EnvironmentError> {
    let mut fresh = false;
    let installed = INSTALLED.get_or_init(|| {
        fresh = true;
        env
    });
    if fresh {
        Ok(installed)
    } else {
        Err(EnvironmentError::AlreadyInstalled)
    }
}

pub fn current() -> Option<&'static Environment> {
    INSTALLED.get()
}

fn parse_flag(key: &str, value: &str) -> Result<bool, EnvironmentError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(EnvironmentError::InvalidFlag {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn check_http_url(field: &'static str, value: &str) -> Result<(), EnvironmentError> {
    let invalid = |reason: String| EnvironmentError::InvalidUrl {
        field,
        value: value.to_string(),
        reason,
    };
    let parsed = Url::parse(value).map_err(|err| invalid(err.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", parsed.scheme())));
    }
    if parsed.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    Ok(())
}
