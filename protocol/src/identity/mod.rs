//! # Identity Module
//!
//! Every signer in the protocol (a mandate holder, a verification agent, an
//! HTTP client) is an Ed25519 keypair named by a `did:key` identifier.
//!
//! 1. **Agent** — key material, signing and verification.
//! 2. **DID** — the registry-free identifier derived from the public key.

pub mod agent;
pub mod did;

pub use agent::{AgentIdentity, IdentityError};
pub use did::{derive_did, is_did_key};
