//! Project domain model shared by the codec, import utilities and storage.
//!
//! # Responsibility
//! - Define the serde shape of a saved block program (the manifest).
//! - Describe how media asset references map to on-disk paths.
//!
//! # Invariants
//! - Every asset reference resolves to a path below an asset root.
//! - Unknown manifest keys survive a load/save cycle untouched.

pub mod asset;
pub mod project;
