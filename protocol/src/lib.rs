// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Conway Transaction Builder: Core Library
//!
//! Builds Cardano Conway-era transactions offline: derive keys from a
//! mnemonic, assemble certificates, votes, and governance proposals, price
//! the result under the linear fee model, balance it with change, and emit
//! the exact bytes the chain expects.
//!
//! Nothing here touches the network. Chain state (which UTxOs exist, which
//! DReps are registered) is the caller's concern, and so is signing.
//!
//! ## Architecture
//!
//! - **config** - Protocol parameters and format constants. Always explicit.
//! - **crypto** - Blake2b hashing and CIP-1852 key derivation.
//! - **primitives** - Hashes, credentials, amounts, and addresses.
//! - **governance** - Certificates, DReps, votes, and proposals.
//! - **transaction** - Builder, fee calculator, and serializer.
//! - **logging** - `tracing` subscriber setup for hosts that want it.
//! - **error** - The single [`LedgerError`](error::LedgerError) type.
//!
//! ## Design Philosophy
//!
//! 1. No implicit protocol parameters. The wrong deposit is a rejected tx.
//! 2. Deposits are checked when an item is created, not at build time.
//! 3. Encoding is canonical, so a fee estimated once stays valid.
//! 4. If it touches lovelace, it has tests.

pub mod config;
pub mod crypto;
pub mod error;
pub mod governance;
pub mod logging;
pub mod primitives;
pub mod transaction;
