pub mod auth;
pub mod secret_masker;

pub use auth::{GoogleServiceAccountAuth, ServiceAccountKey, build_http_client};
pub use secret_masker::SecretMasker;
