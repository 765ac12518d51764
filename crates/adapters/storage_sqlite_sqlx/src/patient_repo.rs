//! `SQLite` implementation of [`PatientRepository`].

use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use wecare_app::ports::PatientRepository;
use wecare_domain::error::WeCareError;
use wecare_domain::id::PatientId;
use wecare_domain::patient::{NewPatient, Patient, PatientStatus};
use wecare_domain::time::{Timestamp, format_date};

use crate::connection::ConnectionManager;
use crate::error::StorageError;
use crate::value::{Row, Value};

/// Wrapper for converting engine rows into domain [`Patient`].
struct Wrapper(Patient);

impl TryFrom<&Row> for Wrapper {
    type Error = StorageError;

    fn try_from(row: &Row) -> Result<Self, Self::Error> {
        let status = row.text("status")?;
        let status = PatientStatus::from_str(&status)
            .map_err(|err| StorageError::decode("status", err.to_string()))?;

        Ok(Self(Patient {
            id: PatientId::new(row.integer("id")?),
            name: row.text("name")?,
            email: row.text("email")?,
            phone: row.text("phone")?,
            dob: row.timestamp("dob")?,
            gender: row.optional_text("gender")?,
            address: row.optional_text("address")?,
            medical_history: row.optional_text("medical_history")?,
            status,
            registered_date: row.timestamp("registered_date")?,
        }))
    }
}

const INSERT: &str = "INSERT INTO patients \
    (name, email, phone, dob, gender, address, medical_history, status, registered_date) \
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)";
const LAST_ID: &str = "SELECT last_insert_rowid() AS id";
const EXISTS: &str = "SELECT 1 AS found FROM patients WHERE id = ?";
const UPDATE: &str = "UPDATE patients SET name = ?, email = ?, phone = ?, dob = ?, gender = ?, \
    address = ?, medical_history = ?, status = ? WHERE id = ?";
const DELETE_BY_ID: &str = "DELETE FROM patients WHERE id = ?";
const SELECT_ALL: &str = "SELECT id, name, email, phone, dob, gender, address, medical_history, \
    status, registered_date FROM patients ORDER BY id";

/// `SQLite`-backed patient repository.
///
/// Every mutation runs in its own transaction. The engine queues
/// transactions one behind the other, so two mutations never overlap on the
/// shared connection, even when a caller gives up on one mid-flight.
pub struct SqlitePatientRepository {
    manager: Arc<ConnectionManager>,
}

impl SqlitePatientRepository {
    /// Create a new repository on top of the given manager.
    #[must_use]
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }
}

impl PatientRepository for SqlitePatientRepository {
    fn insert(
        &self,
        input: NewPatient,
        registered_at: Timestamp,
    ) -> impl Future<Output = Result<PatientId, WeCareError>> + Send {
        let params = vec![
            Value::from(input.full_name),
            Value::from(input.email),
            Value::from(input.phone),
            Value::from(format_date(input.dob)),
            Value::from(input.gender),
            Value::from(input.address),
            Value::from(input.medical_history),
            Value::from(PatientStatus::Pending.as_str()),
            Value::from(format_date(registered_at.date_naive())),
        ];
        async move {
            let connection = self
                .manager
                .get_connection()
                .await
                .map_err(StorageError::from)?;

            let id = connection
                .transaction(|tx| async move {
                    tx.query(INSERT, params).await?;
                    let result = tx.query(LAST_ID, Vec::new()).await?;
                    result
                        .first()
                        .ok_or_else(|| StorageError::decode("id", "no id returned"))?
                        .integer("id")
                })
                .await?;

            Ok(PatientId::new(id))
        }
    }

    fn update(&self, patient: Patient) -> impl Future<Output = Result<bool, WeCareError>> + Send {
        let id = Value::from(patient.id.get());
        let params = vec![
            Value::from(patient.name),
            Value::from(patient.email),
            Value::from(patient.phone),
            Value::from(format_date(patient.dob.date_naive())),
            Value::from(patient.gender),
            Value::from(patient.address),
            Value::from(patient.medical_history),
            Value::from(patient.status.as_str()),
            id.clone(),
        ];
        async move {
            let connection = self
                .manager
                .get_connection()
                .await
                .map_err(StorageError::from)?;

            let updated = connection
                .transaction(|tx| async move {
                    let existing = tx.query(EXISTS, vec![id]).await?;
                    if existing.rows.is_empty() {
                        return Ok(false);
                    }
                    tx.query(UPDATE, params).await?;
                    Ok::<_, StorageError>(true)
                })
                .await?;

            Ok(updated)
        }
    }

    fn delete(&self, id: PatientId) -> impl Future<Output = Result<bool, WeCareError>> + Send {
        async move {
            let connection = self
                .manager
                .get_connection()
                .await
                .map_err(StorageError::from)?;

            let deleted = connection
                .transaction(move |tx| async move {
                    let result = tx.query(DELETE_BY_ID, vec![Value::from(id.get())]).await?;
                    Ok::<_, StorageError>(result.rows_affected > 0)
                })
                .await?;

            Ok(deleted)
        }
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<Patient>, WeCareError>> + Send {
        async move {
            let result = self.manager.query(SELECT_ALL, Vec::new()).await?;
            let patients = result
                .rows
                .iter()
                .map(|row| Wrapper::try_from(row).map(|w| w.0))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(patients)
        }
    }
}
