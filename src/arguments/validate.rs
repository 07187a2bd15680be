//! Presence checks for transition arguments.
//!
//! Uses Stillwater's `Validation` so every missing argument is reported in a
//! single pass instead of stopping at the first one.

use super::{ArgumentDescriptor, RawArguments};
use crate::error::ControlError;
use serde_json::Value;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use thiserror::Error;

/// A problem with the arguments supplied for an event.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ArgumentViolation {
    #[error("Mandatory argument '{name}' was not supplied")]
    MissingMandatory { name: String },
}

/// Check that every mandatory argument has a non-null value.
pub fn check_mandatory(
    descriptors: &[ArgumentDescriptor],
    raw: &RawArguments,
) -> Validation<(), NonEmptyVec<ArgumentViolation>> {
    let checks: Vec<Validation<(), NonEmptyVec<ArgumentViolation>>> = descriptors
        .iter()
        .filter(|d| d.is_mandatory())
        .map(|d| match raw.get(&d.name) {
            None | Some(Value::Null) => Validation::fail(ArgumentViolation::MissingMandatory {
                name: d.name.clone(),
            }),
            Some(_) => Validation::success(()),
        })
        .collect();

    if checks.is_empty() {
        return Validation::success(());
    }
    Validation::all_vec(checks).map(|_| ())
}

impl From<NonEmptyVec<ArgumentViolation>> for ControlError {
    fn from(violations: NonEmptyVec<ArgumentViolation>) -> Self {
        ControlError::MissingMandatoryArguments(
            violations
                .iter()
                .map(|v| match v {
                    ArgumentViolation::MissingMandatory { name } => name.clone(),
                })
                .collect(),
        )
    }
}
