//! Sync events: notifications that a patient mutation has been committed.
//!
//! Events are exchanged between independent contexts over the sync bus. They
//! carry only enough to tell receivers that their view is stale; receivers
//! re-fetch instead of applying the payload.

use serde::{Deserialize, Serialize};

use crate::id::PatientId;

/// Mutation notification as it appears on the wire.
///
/// Serialized as `{"type": "PATIENT_UPDATED", "patientId": 3}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncEvent {
    PatientRegistered,
    PatientUpdated {
        #[serde(rename = "patientId")]
        patient_id: PatientId,
    },
    PatientDeleted {
        #[serde(rename = "patientId")]
        patient_id: PatientId,
    },
}

impl SyncEvent {
    /// The patient this event is about, when known.
    #[must_use]
    pub fn patient_id(&self) -> Option<PatientId> {
        match self {
            Self::PatientRegistered => None,
            Self::PatientUpdated { patient_id } | Self::PatientDeleted { patient_id } => {
                Some(*patient_id)
            }
        }
    }
}
