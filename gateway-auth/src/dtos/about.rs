use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthenticationMode {
    /// The gateway checks a username/password itself.
    Password,
    /// The gateway redirects to an external identity provider.
    External,
}

impl std::str::FromStr for AuthenticationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "password" => Ok(AuthenticationMode::Password),
            "external" => Ok(AuthenticationMode::External),
            _ => Err(format!("Invalid authentication mode: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AboutAuthenticationProvider {
    pub provider: String,
    pub mode: AuthenticationMode,
    pub links: BTreeMap<String, String>,
    pub confirmation_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AboutAuthenticationLinks {
    pub whoami: String,
    pub apikey: String,
    pub refresh_session: String,
    pub revoke_session: String,
    pub logout: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AboutAuthentication {
    pub required: bool,
    pub providers: Vec<AboutAuthenticationProvider>,
    pub links: Option<AboutAuthenticationLinks>,
}

/// Discovery document describing what the server supports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct About {
    pub api_version: u32,
    pub library_version: String,
    pub formats: BTreeMap<String, Vec<String>>,
    pub aliases: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    pub queries: Vec<String>,
    pub authentication: AboutAuthentication,
    pub links: BTreeMap<String, String>,
    pub meta: serde_json::Value,
}
