pub mod credentials;
pub mod identity_client;

pub use credentials::{CognitoCredentialExchange, CredentialExchange, TemporaryCredentials};
pub use identity_client::{IdentityClient, TokenSet};
