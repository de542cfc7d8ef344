// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Secret service interface

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the secret service
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("decryption failed: {0}")]
    Decrypt(String),
    #[error("encryption failed: {0}")]
    Encrypt(String),
}

/// Encrypts and decrypts credential material.
///
/// The vault itself is external; deployments without one use
/// [`PlainSecrets`], which stores secrets as-is.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get_password(&self, ciphertext: &str) -> Result<String, SecretError>;
    async fn encrypt_password(&self, plaintext: &str) -> Result<String, SecretError>;
}

/// Pass-through secret store for deployments without encryption at rest.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainSecrets;

#[async_trait]
impl SecretStore for PlainSecrets {
    async fn get_password(&self, ciphertext: &str) -> Result<String, SecretError> {
        Ok(ciphertext.to_string())
    }

    async fn encrypt_password(&self, plaintext: &str) -> Result<String, SecretError> {
        Ok(plaintext.to_string())
    }
}

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeSecrets;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{SecretError, SecretStore};
    use async_trait::async_trait;

    /// Reversible "encryption" for tests: prefixes plaintext with `enc:`.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct FakeSecrets;

    #[async_trait]
    impl SecretStore for FakeSecrets {
        async fn get_password(&self, ciphertext: &str) -> Result<String, SecretError> {
            Ok(ciphertext
                .strip_prefix("enc:")
                .unwrap_or(ciphertext)
                .to_string())
        }

        async fn encrypt_password(&self, plaintext: &str) -> Result<String, SecretError> {
            Ok(format!("enc:{plaintext}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn plain_secrets_pass_through() {
        let secrets = PlainSecrets;
        assert_eq!(secrets.get_password("s3cret").await.unwrap(), "s3cret");
        assert_eq!(secrets.encrypt_password("s3cret").await.unwrap(), "s3cret");
    }

    #[tokio::test]
    async fn fake_secrets_round_trip() {
        let secrets = FakeSecrets;
        let cipher = secrets.encrypt_password("s3cret").await.unwrap();
        assert_eq!(cipher, "enc:s3cret");
        assert_eq!(secrets.get_password(&cipher).await.unwrap(), "s3cret");
    }
}
