//! Assembly of the `About` discovery document.

use std::collections::BTreeMap;

use serde_json::json;

use crate::config::{DiscoveryConfig, ProviderConfig};
use crate::dtos::{
    About, AboutAuthentication, AboutAuthenticationLinks, AboutAuthenticationProvider,
    AuthenticationMode,
};

fn provider_links(base: &str, provider: &ProviderConfig) -> BTreeMap<String, String> {
    let endpoint = match provider.mode {
        AuthenticationMode::Password => "token",
        AuthenticationMode::External => "authorize",
    };
    BTreeMap::from([(
        "auth_endpoint".to_string(),
        format!("{}/auth/provider/{}/{}", base, provider.provider, endpoint),
    )])
}

impl About {
    /// Build the discovery document served at the API root `base_url`.
    pub fn assemble(settings: &DiscoveryConfig, base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        let authentication = &settings.authentication;

        let providers: Vec<AboutAuthenticationProvider> = authentication
            .providers
            .iter()
            .map(|p| AboutAuthenticationProvider {
                provider: p.provider.clone(),
                mode: p.mode,
                links: provider_links(base, p),
                confirmation_message: p.confirmation_message.clone(),
            })
            .collect();

        // Session endpoints are advertised only when some provider can open a session.
        let links = (!providers.is_empty()).then(|| AboutAuthenticationLinks {
            whoami: format!("{}/auth/whoami", base),
            apikey: format!("{}/auth/apikey", base),
            refresh_session: format!("{}/auth/session/refresh", base),
            revoke_session: format!("{}/auth/session/revoke/{{session_id}}", base),
            logout: format!("{}/auth/logout", base),
        });

        let root_path = base
            .split_once("://")
            .and_then(|(_, rest)| rest.find('/').map(|i| rest[i..].to_string()))
            .unwrap_or_default();

        About {
            api_version: settings.api_version,
            library_version: settings.library_version.clone(),
            formats: settings.formats.clone(),
            aliases: settings.aliases.clone(),
            queries: settings.queries.clone(),
            authentication: AboutAuthentication {
                required: authentication.required,
                providers,
                links,
            },
            links: BTreeMap::from([
                ("self".to_string(), base.to_string()),
                ("documentation".to_string(), format!("{}/docs", base)),
            ]),
            meta: json!({ "root_path": root_path }),
        }
    }
}
