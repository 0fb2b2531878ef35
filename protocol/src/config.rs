//! # Protocol Configuration & Constants
//!
//! Every tunable default and wire constant lives here. Structs that carry
//! runtime configuration (`ConsensusConfig`, `HttpSignatureConfig`) build
//! their `Default` impls from these values, so there is exactly one place
//! to look when a number needs to change.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// Version suffix of every canonical domain tag. Bump on any change to a
/// canonical field list; old signatures stop verifying.
pub const CANONICAL_VERSION: u8 = 1;

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// Ed25519 secret key (seed) length in bytes.
pub const SIGNING_KEY_LENGTH: usize = 32;

/// Ed25519 public key length in bytes.
pub const VERIFYING_KEY_LENGTH: usize = 32;

/// Ed25519 signature length in bytes.
pub const SIGNATURE_LENGTH: usize = 64;

/// Hex length of a signature as stored on a mandate.
pub const SIGNATURE_HEX_LENGTH: usize = SIGNATURE_LENGTH * 2;

/// Multicodec prefix for an Ed25519 public key (`0xed01`, varint encoded).
pub const ED25519_MULTICODEC: [u8; 2] = [0xed, 0x01];

/// DID method prefix for identifiers derived from a public key.
pub const DID_KEY_PREFIX: &str = "did:key:";

// ---------------------------------------------------------------------------
// Mandates
// ---------------------------------------------------------------------------

/// ISO 4217 currency codes are exactly three letters.
pub const CURRENCY_CODE_LENGTH: usize = 3;

/// Default lifetime of a freshly built mandate.
pub const DEFAULT_MANDATE_TTL: Duration = Duration::from_secs(60 * 60);

// ---------------------------------------------------------------------------
// Consensus
// ---------------------------------------------------------------------------

/// Default fraction of affirmative votes required for approval.
pub const DEFAULT_CONSENSUS_THRESHOLD: f64 = 0.67;

/// Default minimum pool size.
pub const DEFAULT_MIN_AGENTS: usize = 3;

/// Default maximum pool size (arena capacity).
pub const DEFAULT_MAX_AGENTS: usize = 10;

/// Default per-agent verification timeout. Zero disables the timer.
pub const DEFAULT_AGENT_TIMEOUT_MS: u64 = 5_000;

// ---------------------------------------------------------------------------
// HTTP Message Signatures
// ---------------------------------------------------------------------------

/// Default freshness window for signed HTTP messages, in seconds.
pub const DEFAULT_MAX_SIGNATURE_AGE_SECS: u64 = 300;

/// Random nonce length for each signed HTTP message, in bytes.
pub const HTTP_SIGNATURE_NONCE_LENGTH: usize = 16;

/// Label used in the `Signature` and `Signature-Input` dictionaries.
pub const HTTP_SIGNATURE_LABEL: &str = "sig1";

/// Digest algorithm prefix for `Content-Digest`.
pub const CONTENT_DIGEST_ALGORITHM: &str = "sha-256";
