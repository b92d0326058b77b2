//! Request extractors that validate before any handler code runs.
//!
//! Schema and rule failures become `AppError::Validation` with a
//! `{field, message}` list whose field names match the camelCase wire keys.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use validator::{Validate, ValidationError, ValidationErrors};

use opsledger_core::totals::MONEY_SCALE;
use opsledger_shared::{AppError, FieldError};

use crate::error::ApiError;

/// JSON body that passed `serde` and `validator` checks.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError(AppError::validation(rejection.body_text())))?;
        value.validate().map_err(validation_error)?;
        Ok(Self(value))
    }
}

/// Query string that passed `serde` and `validator` checks.
#[derive(Debug, Clone)]
pub struct ValidatedQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError(AppError::validation(rejection.body_text())))?;
        value.validate().map_err(validation_error)?;
        Ok(Self(value))
    }
}

/// Flattens `ValidationErrors` into a sorted field list.
#[must_use]
pub fn validation_error(errors: ValidationErrors) -> ApiError {
    let mut fields: Vec<FieldError> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            let field = camel_case(&field);
            errs.iter()
                .map(move |e| FieldError::new(field.clone(), describe(e)))
        })
        .collect();
    fields.sort_by(|a, b| a.field.cmp(&b.field));

    let message = fields
        .first()
        .map_or_else(|| "invalid request".to_string(), |f| format!("{}: {}", f.field, f.message));
    ApiError(AppError::Validation {
        message,
        errors: fields,
    })
}

fn describe(error: &ValidationError) -> String {
    error
        .message
        .as_ref()
        .map_or_else(|| format!("failed {} check", error.code), ToString::to_string)
}

/// `rejection_reason` -> `rejectionReason`.
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Deserializes a field so that a missing key and an explicit `null` differ.
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`:
/// missing gives `None`, `null` gives `Some(None)`.
///
/// # Errors
///
/// Propagates the inner deserializer's error.
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn money_error(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(message.into())
}

/// Amount strictly above zero with at most four decimal places.
///
/// # Errors
///
/// Returns a `ValidationError` describing the failed rule.
pub fn positive_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount <= Decimal::ZERO {
        return Err(money_error("range", "must be greater than 0"));
    }
    check_scale(*amount)
}

/// Amount at or above zero with at most four decimal places.
///
/// # Errors
///
/// Returns a `ValidationError` describing the failed rule.
pub fn non_negative_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount < Decimal::ZERO {
        return Err(money_error("range", "must not be negative"));
    }
    check_scale(*amount)
}

fn check_scale(amount: Decimal) -> Result<(), ValidationError> {
    if amount.normalize().scale() > MONEY_SCALE {
        return Err(money_error("scale", "has too many decimal places"));
    }
    Ok(())
}

/// Text with at least one non-whitespace character.
///
/// # Errors
///
/// Returns a `ValidationError` when the text is blank.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("must not be empty".into()));
    }
    Ok(())
}
