//! Masking of credentials in log lines
//!
//! Secrets stay wrapped in [`SecretString`] everywhere; the masker is the
//! last line before text reaches the build log, replacing any registered
//! secret that leaked into an error message.

use secrecy::{ExposeSecret, SecretString};

/// Secrets shorter than this are not searched for
const MIN_SECRET_LEN: usize = 8;

/// Replaces registered secrets in text with a short masked form
#[derive(Default)]
pub struct SecretMasker {
    secrets: Vec<SecretString>,
}

impl std::fmt::Debug for SecretMasker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretMasker")
            .field("secrets", &self.secrets.len())
            .finish()
    }
}

impl SecretMasker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a secret; every line of a multi-line secret is registered too
    pub fn register(&mut self, secret: &SecretString) {
        let value = secret.expose_secret().trim();
        if value.chars().count() < MIN_SECRET_LEN {
            return;
        }

        self.secrets.push(SecretString::new(value.into()));
        if value.contains('\n') {
            for line in value.lines().map(str::trim) {
                if line.chars().count() >= MIN_SECRET_LEN && !line.starts_with("-----") {
                    self.secrets.push(SecretString::new(line.into()));
                }
            }
        }
    }

    /// Masks a token for safe logging
    ///
    /// Shows only the first 3 and last 3 characters. Tokens shorter than 10
    /// characters are fully masked as "****".
    pub fn mask_token(token: &str) -> String {
        let chars: Vec<char> = token.chars().collect();
        if chars.len() < 10 {
            return "****".to_string();
        }

        let prefix: String = chars[..3].iter().collect();
        let suffix: String = chars[chars.len() - 3..].iter().collect();
        format!("{}...{}", prefix, suffix)
    }

    /// Mask every registered secret found in `text`
    pub fn mask(&self, text: &str) -> String {
        let mut masked = text.to_string();
        // Longest first, so a whole key is replaced before its lines
        let mut secrets: Vec<&str> = self.secrets.iter().map(|s| s.expose_secret()).collect();
        secrets.sort_by_key(|s| std::cmp::Reverse(s.len()));

        for secret in secrets {
            if masked.contains(secret) {
                masked = masked.replace(secret, &Self::mask_token(secret));
            }
        }
        masked
    }
}
