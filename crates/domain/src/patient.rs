//! Patient — a registered person and the status of their registration.
//!
//! A patient is created by registration with [`PatientStatus::Pending`],
//! overwritten field by field on update, and hard-deleted. The identifier and
//! the registration date never change after insertion.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, WeCareError};
use crate::id::PatientId;
use crate::time::Timestamp;

/// Registration lifecycle state of a [`Patient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatientStatus {
    Active,
    Pending,
    Inactive,
}

impl PatientStatus {
    /// Stored text representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Pending => "Pending",
            Self::Inactive => "Inactive",
        }
    }
}

impl fmt::Display for PatientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatientStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(Self::Active),
            "Pending" => Ok(Self::Pending),
            "Inactive" => Ok(Self::Inactive),
            other => Err(ValidationError::UnknownStatus(other.to_string())),
        }
    }
}

/// A stored patient record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: PatientId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub dob: Timestamp,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub medical_history: Option<String>,
    pub status: PatientStatus,
    pub registered_date: Timestamp,
}

/// Validated input of the registration form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPatient {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub dob: NaiveDate,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub medical_history: Option<String>,
}

impl NewPatient {
    /// Create a builder for constructing a [`NewPatient`].
    #[must_use]
    pub fn builder() -> NewPatientBuilder {
        NewPatientBuilder::default()
    }
}

/// Step-by-step builder for [`NewPatient`].
///
/// Blank optional fields are dropped so they are stored as `NULL`.
#[derive(Debug, Default)]
pub struct NewPatientBuilder {
    full_name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    dob: Option<NaiveDate>,
    gender: Option<String>,
    address: Option<String>,
    medical_history: Option<String>,
}

impl NewPatientBuilder {
    #[must_use]
    pub fn full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }

    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    #[must_use]
    pub fn dob(mut self, dob: NaiveDate) -> Self {
        self.dob = Some(dob);
        self
    }

    #[must_use]
    pub fn gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = non_blank(gender.into());
        self
    }

    #[must_use]
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = non_blank(address.into());
        self
    }

    #[must_use]
    pub fn medical_history(mut self, medical_history: impl Into<String>) -> Self {
        self.medical_history = non_blank(medical_history.into());
        self
    }

    /// Consume the builder, validate, and return a [`NewPatient`].
    ///
    /// # Errors
    ///
    /// Returns [`WeCareError::Validation`] if a required field is missing
    /// or blank.
    pub fn build(self) -> Result<NewPatient, WeCareError> {
        let full_name = required(self.full_name, ValidationError::EmptyName)?;
        let email = required(self.email, ValidationError::EmptyEmail)?;
        let phone = required(self.phone, ValidationError::EmptyPhone)?;
        let dob = self.dob.ok_or(ValidationError::MissingDateOfBirth)?;

        Ok(NewPatient {
            full_name,
            email,
            phone,
            dob,
            gender: self.gender,
            address: self.address,
            medical_history: self.medical_history,
        })
    }
}

fn required(value: Option<String>, err: ValidationError) -> Result<String, ValidationError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(err),
    }
}

fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
