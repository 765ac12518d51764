//! Patient service — the command layer the UI talks to.
//!
//! Mutations go to the repository (which owns the transaction) and, once
//! committed, are announced on the sync bus so other contexts re-fetch.
//! Writes surface every failure; the read path degrades to an empty list
//! plus an error message.

use wecare_domain::error::WeCareError;
use wecare_domain::event::SyncEvent;
use wecare_domain::id::PatientId;
use wecare_domain::patient::{NewPatient, Patient};
use wecare_domain::time::now;

use crate::outcome::Outcome;
use crate::ports::{PatientRepository, SyncPublisher};

/// Application service for patient registration and maintenance.
pub struct PatientService<R, P> {
    repo: R,
    publisher: P,
}

impl<R, P> PatientService<R, P>
where
    R: PatientRepository,
    P: SyncPublisher,
{
    /// Create a new service backed by the given repository and bus.
    pub fn new(repo: R, publisher: P) -> Self {
        Self { repo, publisher }
    }

    /// Register a new patient with status `Pending`, registered now.
    ///
    /// The input is trusted: required fields are checked when the
    /// [`NewPatient`] is built.
    ///
    /// # Errors
    ///
    /// Returns [`WeCareError::Persistence`] when the insert is rejected
    /// (its transaction is rolled back).
    pub async fn register(&self, input: NewPatient) -> Result<PatientId, WeCareError> {
        let id = self.repo.insert(input, now()).await?;
        tracing::info!(%id, "patient registered");
        self.notify(SyncEvent::PatientRegistered).await;
        Ok(id)
    }

    /// Overwrite the mutable fields of an existing patient.
    ///
    /// Returns `false` when no patient has `patient.id`; nothing is
    /// published in that case.
    ///
    /// # Errors
    ///
    /// Returns [`WeCareError::Persistence`] when the update is rejected.
    pub async fn update(&self, patient: Patient) -> Result<bool, WeCareError> {
        let id = patient.id;
        let updated = self.repo.update(patient).await?;
        if updated {
            tracing::info!(%id, "patient updated");
            self.notify(SyncEvent::PatientUpdated { patient_id: id }).await;
        } else {
            tracing::debug!(%id, "update matched no patient");
        }
        Ok(updated)
    }

    /// Hard-delete a patient. Returns whether the patient existed.
    ///
    /// # Errors
    ///
    /// Returns [`WeCareError::Persistence`] when the delete is rejected.
    pub async fn delete(&self, id: PatientId) -> Result<bool, WeCareError> {
        let deleted = self.repo.delete(id).await?;
        if deleted {
            tracing::info!(%id, "patient deleted");
            self.notify(SyncEvent::PatientDeleted { patient_id: id }).await;
        } else {
            tracing::debug!(%id, "delete matched no patient");
        }
        Ok(deleted)
    }

    /// Every patient in insertion order.
    ///
    /// Never fails: a read error yields an empty list and the error message.
    pub async fn list(&self) -> Outcome<Vec<Patient>> {
        match self.repo.get_all().await {
            Ok(patients) => Outcome::ok(patients),
            Err(err) => {
                let outcome = Outcome::failed(&err);
                tracing::warn!(error = outcome.error.as_deref(), "failed to fetch patients");
                outcome
            }
        }
    }

    async fn notify(&self, event: SyncEvent) {
        // The mutation is already committed; a lost notification only delays
        // other contexts until their next refresh.
        if let Err(err) = self.publisher.publish(event).await {
            tracing::warn!(error = %err.message(), ?event, "failed to publish sync event");
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::future::Future;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use chrono::NaiveDate;
    use wecare_domain::patient::PatientStatus;
    use wecare_domain::time::{Timestamp, start_of_day};

    #[derive(Debug)]
    struct Boom;

    impl std::fmt::Display for Boom {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("engine exploded")
        }
    }

    impl std::error::Error for Boom {}

    #[derive(Default)]
    pub(crate) struct InMemoryPatientRepo {
        rows: Mutex<Vec<Patient>>,
        next_id: Mutex<i64>,
        pub(crate) fail: AtomicBool,
        pub(crate) stall: AtomicBool,
        pub(crate) reads: AtomicUsize,
    }

    impl InMemoryPatientRepo {
        fn check(&self) -> Result<(), WeCareError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(WeCareError::Persistence(Box::new(Boom)));
            }
            Ok(())
        }
    }

    impl PatientRepository for InMemoryPatientRepo {
        fn insert(
            &self,
            input: NewPatient,
            registered_at: Timestamp,
        ) -> impl Future<Output = Result<PatientId, WeCareError>> + Send {
            let result = self.check().map(|()| {
                let mut next = self.next_id.lock().unwrap();
                *next += 1;
                let id = PatientId::new(*next);
                self.rows.lock().unwrap().push(Patient {
                    id,
                    name: input.full_name,
                    email: input.email,
                    phone: input.phone,
                    dob: start_of_day(input.dob),
                    gender: input.gender,
                    address: input.address,
                    medical_history: input.medical_history,
                    status: PatientStatus::Pending,
                    registered_date: start_of_day(registered_at.date_naive()),
                });
                id
            });
            async { result }
        }

        fn update(
            &self,
            patient: Patient,
        ) -> impl Future<Output = Result<bool, WeCareError>> + Send {
            let result = self.check().map(|()| {
                let mut rows = self.rows.lock().unwrap();
                match rows.iter_mut().find(|row| row.id == patient.id) {
                    Some(row) => {
                        let registered_date = row.registered_date;
                        *row = Patient {
                            registered_date,
                            ..patient
                        };
                        true
                    }
                    None => false,
                }
            });
            async { result }
        }

        fn delete(&self, id: PatientId) -> impl Future<Output = Result<bool, WeCareError>> + Send {
            let result = self.check().map(|()| {
                let mut rows = self.rows.lock().unwrap();
                let before = rows.len();
                rows.retain(|row| row.id != id);
                rows.len() != before
            });
            async { result }
        }

        fn get_all(&self) -> impl Future<Output = Result<Vec<Patient>, WeCareError>> + Send {
            self.reads.fetch_add(1, Ordering::SeqCst);
            let result = self.check().map(|()| self.rows.lock().unwrap().clone());
            let stall = self.stall.load(Ordering::SeqCst);
            async move {
                if stall {
                    std::future::pending::<()>().await;
                }
                result
            }
        }
    }

    #[derive(Default)]
    pub(crate) struct RecordingPublisher {
        pub(crate) events: Mutex<Vec<SyncEvent>>,
    }

    impl SyncPublisher for RecordingPublisher {
        fn publish(
            &self,
            event: SyncEvent,
        ) -> impl Future<Output = Result<(), WeCareError>> + Send {
            self.events.lock().unwrap().push(event);
            async { Ok(()) }
        }
    }

    type Service = PatientService<InMemoryPatientRepo, RecordingPublisher>;

    fn make_service() -> Service {
        PatientService::new(InMemoryPatientRepo::default(), RecordingPublisher::default())
    }

    pub(crate) fn jane() -> NewPatient {
        NewPatient::builder()
            .full_name("Jane Roe")
            .email("jane@x.com")
            .phone("5551234567")
            .dob(NaiveDate::from_ymd_opt(1990, 2, 1).unwrap())
            .build()
            .unwrap()
    }

    fn published(svc: &Service) -> Vec<SyncEvent> {
        svc.publisher.events.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn should_register_pending_patient_and_publish() {
        let svc = make_service();

        let id = svc.register(jane()).await.unwrap();

        let listed = svc.list().await;
        assert!(!listed.is_err());
        assert_eq!(listed.value.len(), 1);
        assert_eq!(listed.value[0].id, id);
        assert_eq!(listed.value[0].status, PatientStatus::Pending);
        assert_eq!(
            listed.value[0].registered_date.date_naive(),
            now().date_naive()
        );
        assert_eq!(published(&svc), vec![SyncEvent::PatientRegistered]);
    }

    #[tokio::test]
    async fn should_publish_update_only_when_row_matched() {
        let svc = make_service();
        let id = svc.register(jane()).await.unwrap();
        let mut patient = svc.list().await.value.remove(0);

        patient.status = PatientStatus::Active;
        assert!(svc.update(patient.clone()).await.unwrap());

        patient.id = PatientId::new(999);
        assert!(!svc.update(patient).await.unwrap());

        assert_eq!(
            published(&svc),
            vec![
                SyncEvent::PatientRegistered,
                SyncEvent::PatientUpdated { patient_id: id },
            ]
        );
    }

    #[tokio::test]
    async fn should_report_whether_deleted_patient_existed() {
        let svc = make_service();
        let id = svc.register(jane()).await.unwrap();

        assert!(svc.delete(id).await.unwrap());
        assert!(!svc.delete(id).await.unwrap());
        assert!(svc.list().await.value.is_empty());
        assert_eq!(published(&svc).len(), 2);
    }

    #[tokio::test]
    async fn should_surface_write_failure_without_publishing() {
        let svc = make_service();
        svc.repo.fail.store(true, Ordering::SeqCst);

        let result = svc.register(jane()).await;

        assert!(matches!(result, Err(WeCareError::Persistence(_))));
        assert!(published(&svc).is_empty());
    }

    #[tokio::test]
    async fn should_degrade_read_failure_to_empty_list_with_message() {
        let svc = make_service();
        svc.register(jane()).await.unwrap();
        svc.repo.fail.store(true, Ordering::SeqCst);

        let listed = svc.list().await;

        assert!(listed.value.is_empty());
        assert_eq!(
            listed.error.as_deref(),
            Some("persistence error: engine exploded")
        );
    }
}
