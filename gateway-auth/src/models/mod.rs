pub mod api_key;
pub mod identity;
pub mod principal;
pub mod role;
pub mod session;

pub use api_key::{generate_secret, ApiKey, ApiKeyWithSecret, StoredApiKey, INHERIT_SCOPE};
pub use identity::Identity;
pub use principal::{AllowedScopes, Credential, Principal, PrincipalType, StoredPrincipal};
pub use role::{Role, RoleRegistry};
pub use session::{Session, StoredSession};
