//! # wecare-domain
//!
//! Pure domain model for the We-Care patient registry.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error taxonomy, timestamps
//! - Define **Patients** (registered records with a status lifecycle)
//! - Define **Credentials** (the operator login seeded at bootstrap)
//! - Define **Sync events** (mutation notifications exchanged between contexts)
//! - Contain all invariant enforcement and domain logic
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod credential;
pub mod event;
pub mod patient;
