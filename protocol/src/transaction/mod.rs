//! # Transaction Module
//!
//! Construction, pricing, and serialization of Conway-era transactions.
//!
//! ## Architecture
//!
//! ```text
//! types.rs      - Inputs, outputs, body, witness set, transaction
//! metadata.rs   - Auxiliary metadata and its body hash
//! fees.rs       - Linear fee model and minimum output value
//! builder.rs    - Fluent TransactionBuilder with change balancing
//! serializer.rs - Canonical CBOR bytes, hex, and a JSON inspection form
//! ```
//!
//! ## Lifecycle
//!
//! 1. **Assemble** inputs, outputs, certificates, votes, and proposals on a
//!    [`TransactionBuilder`].
//! 2. **Balance** with [`TransactionBuilder::add_change_if_needed`].
//! 3. **Build** the immutable [`Transaction`]. The builder is finalized.
//! 4. **Serialize** with [`to_hex`] for submission tooling, or
//!    [`to_structured`] for logs.
//!
//! Signing happens elsewhere. The fee already accounts for the witnesses the
//! signer will attach.

pub mod builder;
pub mod fees;
pub mod metadata;
pub mod serializer;
pub mod types;

pub use builder::TransactionBuilder;
pub use fees::{estimate_fee, min_ada_required, min_fee, transaction_size, LinearFee};
pub use metadata::{AuxiliaryData, Metadatum};
pub use serializer::{
    from_canonical_bytes, from_hex, to_canonical_bytes, to_hex, to_json_pretty, to_structured,
};
pub use types::{
    Transaction, TransactionBody, TransactionInput, TransactionOutput, VkeyWitness, WitnessSet,
};
