// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Mandate Protocol — Core Library
//!
//! A payment-mandate authorization engine. A holder issues a bounded
//! spending authorization (a *mandate*), signs it with an Ed25519 identity,
//! and a pool of independent verifier agents decides by vote whether the
//! signature holds, so a few broken or dishonest verifiers cannot approve a
//! forgery or block a legitimate payment.
//!
//! ## Architecture
//!
//! - **crypto** — Ed25519 key/signature wrappers and SHA-256.
//! - **identity** — agent keypairs and their `did:key` identifiers.
//! - **mandate** — Intent, Cart and Payment mandates, canonical encoding,
//!   signing and structural validation.
//! - **consensus** — Byzantine-tolerant multi-agent signature verification.
//! - **rfc9421** — HTTP message signatures with a replay window.
//! - **revocation** — process-scoped revocation records.
//! - **authorization** — the execution guard that combines all of the above.
//! - **error**, **config**, **logging**, **metrics** — the plumbing.
//!
//! ## Flow
//!
//! ```text
//! build mandate ─► sign ─► VerificationSystem::verify_mandate ─► ExecutionGuard ─► executor
//!                                                                   ▲
//!                                                     RevocationStore┘
//! ```
//!
//! ## Boundaries
//!
//! 1. Nothing here executes a payment or persists a mandate.
//! 2. A failed verification is `false`, never an error.
//! 3. Structural validity and cryptographic validity are separate checks.
//! 4. No nonce cache: replay inside the freshness window is the caller's job.

pub mod authorization;
pub mod config;
pub mod consensus;
pub mod crypto;
pub mod error;
pub mod identity;
pub mod logging;
pub mod mandate;
pub mod metrics;
pub mod revocation;
pub mod rfc9421;

pub use error::{ErrorCode, ProtocolError};
