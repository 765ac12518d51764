//! Storage port — repository traits for persistence.
//!
//! Every mutating method is expected to be atomic: either all of its
//! statements commit or none do.

use std::future::Future;

use wecare_domain::credential::Credential;
use wecare_domain::error::WeCareError;
use wecare_domain::id::PatientId;
use wecare_domain::patient::{NewPatient, Patient};
use wecare_domain::time::Timestamp;

/// Repository for [`Patient`] records.
pub trait PatientRepository {
    /// Insert a new patient with status `Pending`, stamped with `registered_at`.
    /// Returns the storage-assigned id.
    fn insert(
        &self,
        input: NewPatient,
        registered_at: Timestamp,
    ) -> impl Future<Output = Result<PatientId, WeCareError>> + Send;

    /// Overwrite the mutable fields of the row matching `patient.id`.
    /// The stored registration date is kept. Returns `false` when no row matched.
    fn update(&self, patient: Patient) -> impl Future<Output = Result<bool, WeCareError>> + Send;

    /// Remove the row matching `id`. Returns whether a row existed.
    fn delete(&self, id: PatientId) -> impl Future<Output = Result<bool, WeCareError>> + Send;

    /// Every stored patient in insertion order.
    fn get_all(&self) -> impl Future<Output = Result<Vec<Patient>, WeCareError>> + Send;
}

/// Read access to login [`Credential`]s.
pub trait CredentialRepository {
    /// Look up the credential registered for `email`.
    fn find_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<Credential>, WeCareError>> + Send;
}

impl<T: PatientRepository + Send + Sync> PatientRepository for std::sync::Arc<T> {
    fn insert(
        &self,
        input: NewPatient,
        registered_at: Timestamp,
    ) -> impl Future<Output = Result<PatientId, WeCareError>> + Send {
        (**self).insert(input, registered_at)
    }

    fn update(&self, patient: Patient) -> impl Future<Output = Result<bool, WeCareError>> + Send {
        (**self).update(patient)
    }

    fn delete(&self, id: PatientId) -> impl Future<Output = Result<bool, WeCareError>> + Send {
        (**self).delete(id)
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<Patient>, WeCareError>> + Send {
        (**self).get_all()
    }
}
