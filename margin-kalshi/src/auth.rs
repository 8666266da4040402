//! RSA-PSS request signing for the Kalshi trading API
//!
//! Every authenticated request carries a signature over
//! `timestamp_ms + method + path`, where the path is stripped of any query
//! string before signing. Query exclusion is a protocol requirement of the
//! API, not a simplification.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::Utc;
use rsa::{
    pkcs1::DecodeRsaPrivateKey, pkcs8::DecodePrivateKey, traits::PublicKeyParts, Pss,
    RsaPrivateKey,
};
use sha2::{Digest, Sha256};
use tracing::debug;

use margin_core::config::key_id_prefix;

use crate::error::KalshiError;

/// Holds the API credential for the process lifetime and signs outbound
/// requests. The private key is loaded once and never logged.
pub struct RequestSigner {
    key_id: String,
    private_key: RsaPrivateKey,
}

impl RequestSigner {
    /// Load the signing key from a PEM file (PKCS#8, falling back to PKCS#1)
    pub fn from_pem_file(
        key_id: impl Into<String>,
        path: impl AsRef<Path>,
    ) -> Result<Self, KalshiError> {
        let pem = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            KalshiError::Signing(format!("failed to read private key file: {e}"))
        })?;
        Self::new(key_id, &pem)
    }

    /// Build a signer from PEM-encoded key material
    pub fn new(key_id: impl Into<String>, pem: &str) -> Result<Self, KalshiError> {
        let key_id = key_id.into();
        let private_key = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| KalshiError::Signing(format!("failed to load private key: {e}")))?;

        debug!(key_id_prefix = %key_id_prefix(&key_id), "kalshi signing key loaded");

        Ok(Self {
            key_id,
            private_key,
        })
    }

    /// Build a signer from an already-parsed key (used by tests)
    pub fn from_key(key_id: impl Into<String>, private_key: RsaPrivateKey) -> Self {
        Self {
            key_id: key_id.into(),
            private_key,
        }
    }

    /// The access key identifier sent with each request
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Sign `timestamp_ms + method + path_without_query`, returning the
    /// base64-encoded RSA-PSS signature.
    ///
    /// The message is hashed with SHA-256 and the digest signed with
    /// MGF1(SHA-256) and maximum salt length.
    pub fn sign(&self, method: &str, path: &str, timestamp_ms: i64) -> Result<String, KalshiError> {
        let clean_path = path.split('?').next().unwrap_or(path);
        let message = format!("{timestamp_ms}{method}{clean_path}");
        let digest = Sha256::digest(message.as_bytes());

        let padding = Pss::new_with_salt::<Sha256>(self.max_salt_len());
        let mut rng = rand::thread_rng();
        let signature = self
            .private_key
            .sign_with_rng(&mut rng, padding, &digest)
            .map_err(|e| KalshiError::Signing(format!("RSA-PSS signing failed: {e}")))?;

        Ok(BASE64.encode(signature))
    }

    /// Authentication headers for one outbound call
    ///
    /// A fresh wall-clock timestamp is generated per call; reusing a signed
    /// timestamp is a protocol violation.
    pub fn auth_headers(
        &self,
        method: &str,
        path: &str,
    ) -> Result<Vec<(&'static str, String)>, KalshiError> {
        let timestamp_ms = Utc::now().timestamp_millis();
        let signature = self.sign(method, path, timestamp_ms)?;

        Ok(vec![
            ("X-ACCESS-KEY", self.key_id.clone()),
            ("X-ACCESS-SIGNATURE", signature),
            ("X-ACCESS-TIMESTAMP", timestamp_ms.to_string()),
            ("Content-Type", "application/json".to_string()),
        ])
    }

    /// Maximum PSS salt length for this key: emLen - hLen - 2
    fn max_salt_len(&self) -> usize {
        self.private_key.size() - Sha256::output_size() - 2
    }
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("key_id_prefix", &key_id_prefix(&self.key_id))
            .finish()
    }
}
