//! OAuth credential access: secure store adapters, token refresh and lifecycle.

pub mod keychain;
pub mod refresh;
pub mod store;
pub mod token;
pub mod types;

pub use refresh::{OAuthRefresher, RefreshError, TokenExchanger};
pub use store::{FileStore, SecretStore, SystemStore};
pub use token::TokenService;
pub use types::{Credential, CredentialBlob, RefreshedToken, ResolvedToken};
