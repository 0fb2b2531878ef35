//! Signing and verifying requests.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::components::RequestComponents;
use super::Rfc9421Error;
use crate::config::{DEFAULT_MAX_SIGNATURE_AGE_SECS, HTTP_SIGNATURE_LABEL, HTTP_SIGNATURE_NONCE_LENGTH};
use crate::crypto::hash::sha256_hex;
use crate::crypto::keys::{AgentPublicKey, AgentSignature};
use crate::identity::AgentIdentity;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSignatureConfig {
    /// Freshness window, in seconds, either side of `now`.
    pub max_age_secs: u64,
    /// Random bytes per nonce before base64.
    pub nonce_length: usize,
}

impl Default for HttpSignatureConfig {
    fn default() -> Self {
        Self {
            max_age_secs: DEFAULT_MAX_SIGNATURE_AGE_SECS,
            nonce_length: HTTP_SIGNATURE_NONCE_LENGTH,
        }
    }
}

// ---------------------------------------------------------------------------
// SignedHttpMessage
// ---------------------------------------------------------------------------

/// Header values to attach to the outgoing request, plus the parameters
/// the verifier needs to rebuild the signature base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedHttpMessage {
    /// `Signature-Input` header value: `sig1=(...);created=..;nonce="..";keyid=".."`.
    pub signature_input: String,
    /// `Signature` header value: `sig1=:<base64>:`.
    pub signature: String,
    pub nonce: String,
    /// Unix seconds.
    pub created: i64,
    pub key_id: String,
}

impl SignedHttpMessage {
    pub fn headers(&self) -> [(&'static str, &str); 2] {
        [
            ("Signature-Input", self.signature_input.as_str()),
            ("Signature", self.signature.as_str()),
        ]
    }
}

// ---------------------------------------------------------------------------
// Signer
// ---------------------------------------------------------------------------

pub struct HttpMessageSigner {
    identity: AgentIdentity,
    key_id: String,
    nonce_length: usize,
}

impl HttpMessageSigner {
    pub fn new(identity: AgentIdentity, key_id: impl Into<String>) -> Self {
        Self::with_config(identity, key_id, &HttpSignatureConfig::default())
    }

    pub fn with_config(identity: AgentIdentity, key_id: impl Into<String>, config: &HttpSignatureConfig) -> Self {
        Self {
            identity,
            key_id: key_id.into(),
            nonce_length: config.nonce_length,
        }
    }

    /// Use the signer's DID as key id.
    pub fn from_identity(identity: AgentIdentity) -> Self {
        let key_id = identity.did().to_string();
        Self::new(identity, key_id)
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn sign(&self, components: &RequestComponents) -> Result<SignedHttpMessage, Rfc9421Error> {
        self.sign_at(components, Utc::now().timestamp())
    }

    /// Sign with an explicit `created` (Unix seconds).
    pub fn sign_at(&self, components: &RequestComponents, created: i64) -> Result<SignedHttpMessage, Rfc9421Error> {
        if self.key_id.is_empty() {
            return Err(Rfc9421Error::InvalidKeyId("empty"));
        }
        if self.key_id.contains(['"', '\\', '\r', '\n']) {
            return Err(Rfc9421Error::InvalidKeyId("contains forbidden characters"));
        }

        let mut nonce_bytes = vec![0u8; self.nonce_length];
        OsRng
            .try_fill_bytes(&mut nonce_bytes)
            .map_err(|_| Rfc9421Error::NonceGeneration)?;
        let nonce = STANDARD.encode(&nonce_bytes);

        let params = components.signature_params(created, &nonce, &self.key_id);
        let base = components.signature_base(&params)?;
        let signature = self.identity.sign(base.as_bytes())?;

        debug!(
            key_id = %self.key_id,
            method = components.method(),
            path = components.path(),
            created,
            "http message signed"
        );

        Ok(SignedHttpMessage {
            signature_input: format!("{}={}", HTTP_SIGNATURE_LABEL, params),
            signature: format!("{}=:{}:", HTTP_SIGNATURE_LABEL, STANDARD.encode(signature.as_bytes())),
            nonce,
            created,
            key_id: self.key_id.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Verifier
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct HttpMessageVerifier {
    max_age_secs: u64,
}

impl Default for HttpMessageVerifier {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SIGNATURE_AGE_SECS)
    }
}

impl HttpMessageVerifier {
    pub fn new(max_age_secs: u64) -> Self {
        Self { max_age_secs }
    }

    pub fn with_config(config: &HttpSignatureConfig) -> Self {
        Self::new(config.max_age_secs)
    }

    pub fn max_age_secs(&self) -> u64 {
        self.max_age_secs
    }

    pub fn verify(&self, components: &RequestComponents, message: &SignedHttpMessage, public_key: &AgentPublicKey) -> bool {
        self.verify_at(components, message, public_key, Utc::now().timestamp())
    }

    /// Verify against an explicit clock (Unix seconds). Checks, cheapest
    /// first: freshness, components, signature-input, signature.
    pub fn verify_at(
        &self,
        components: &RequestComponents,
        message: &SignedHttpMessage,
        public_key: &AgentPublicKey,
        now: i64,
    ) -> bool {
        let age = now.abs_diff(message.created);
        if age > self.max_age_secs {
            debug!(key_id = %message.key_id, age, max_age = self.max_age_secs, "http signature outside freshness window");
            return false;
        }

        let params = components.signature_params(message.created, &message.nonce, &message.key_id);
        let expected_input = format!("{}={}", HTTP_SIGNATURE_LABEL, params);
        if message.signature_input != expected_input {
            debug!(key_id = %message.key_id, "signature-input does not match request components");
            return false;
        }

        let Ok(base) = components.signature_base(&params) else {
            return false;
        };
        let Some(signature) = decode_signature_header(&message.signature) else {
            return false;
        };

        let ok = public_key.verify(base.as_bytes(), &signature);
        debug!(key_id = %message.key_id, base_sha256 = %sha256_hex(base.as_bytes()), ok, "http signature checked");
        ok
    }
}

/// `sig1=:<base64>:` → signature bytes.
fn decode_signature_header(header: &str) -> Option<AgentSignature> {
    let encoded = header
        .strip_prefix(HTTP_SIGNATURE_LABEL)?
        .strip_prefix("=:")?
        .strip_suffix(':')?;
    let bytes = STANDARD.decode(encoded).ok()?;
    AgentSignature::try_from_slice(&bytes).ok()
}
