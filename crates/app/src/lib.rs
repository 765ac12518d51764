//! # wecare-app
//!
//! Application layer — use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `PatientRepository`: transactional insert/update/delete/list of patients
//!   - `CredentialRepository`: credential lookup
//!   - `SyncPublisher`: broadcast of mutation notifications
//! - Define **driving/inbound ports** as use-case structs:
//!   - `PatientService`: register, update, delete, list
//!   - `AuthService`: login check
//! - Provide **in-process infrastructure** that doesn't need IO:
//!   - `SyncBus`: named cross-context broadcast channel
//!   - `ListCache`: debounced, bus-driven patient list
//!
//! ## Dependency rule
//! Depends on `wecare-domain` only (plus `tokio::sync` for channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod list_cache;
pub mod outcome;
pub mod ports;
pub mod services;
pub mod sync_bus;
