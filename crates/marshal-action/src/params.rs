//! Typed parameter sets, one per routable `(type, target)` pair.
//!
//! Each set is extracted from the raw parameter bag in a single validation
//! step before any handler touches the record store.

use serde_json::Value;

use marshal_core::types::RecordId;

use crate::error::ParamError;

/// The raw parameter bag of an action.
pub type Params = serde_json::Map<String, Value>;

/// Parameters of `database/update_status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateStatusParams {
    pub record_id: RecordId,
    pub status: String,
}

impl TryFrom<&Params> for UpdateStatusParams {
    type Error = ParamError;

    fn try_from(params: &Params) -> Result<Self, Self::Error> {
        Ok(Self {
            record_id: record_id(params)?,
            status: string(params, "status")?,
        })
    }
}

/// Parameters of `database/add_tag` and of the `tag` family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagParams {
    pub record_id: RecordId,
    pub tag: String,
}

impl TryFrom<&Params> for TagParams {
    type Error = ParamError;

    fn try_from(params: &Params) -> Result<Self, Self::Error> {
        Ok(Self {
            record_id: record_id(params)?,
            tag: string(params, "tag")?,
        })
    }
}

/// Parameters of the `notification` family.
///
/// Channel-specific parameters (`to`, `url`) stay in the raw bag and are
/// checked by the channel sender.
#[derive(Debug, Clone, PartialEq)]
pub struct NotifyParams {
    pub record_id: RecordId,
    pub channel: String,
    pub message: String,
    pub extra: Params,
}

impl TryFrom<&Params> for NotifyParams {
    type Error = ParamError;

    fn try_from(params: &Params) -> Result<Self, Self::Error> {
        Ok(Self {
            record_id: record_id(params)?,
            channel: string(params, "channel")?,
            message: string(params, "message")?,
            extra: params.clone(),
        })
    }
}

/// Extract the subject record identifier.
///
/// Accepts JSON integers and integral floats, since the analysis service
/// emits every number as a float.
pub fn record_id(params: &Params) -> Result<RecordId, ParamError> {
    const FIELD: &str = "record_id";
    const EXPECTED: &str = "a non-negative integer";

    let number = match params.get(FIELD) {
        None | Some(Value::Null) => return Err(ParamError::Missing(FIELD)),
        Some(Value::Number(n)) => n,
        Some(_) => {
            return Err(ParamError::WrongKind {
                field: FIELD,
                expected: EXPECTED,
            })
        }
    };

    match integral(number) {
        Some(id) if id >= 0 => Ok(RecordId(id)),
        _ => Err(ParamError::WrongKind {
            field: FIELD,
            expected: EXPECTED,
        }),
    }
}

/// A JSON number as an integer, accepting integral floats such as `3.0`.
pub(crate) fn integral(number: &serde_json::Number) -> Option<i64> {
    number.as_i64().or_else(|| {
        number
            .as_f64()
            .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() <= i64::MAX as f64)
            .map(|f| f as i64)
    })
}

/// Extract a required non-empty string parameter.
pub fn string(params: &Params, field: &'static str) -> Result<String, ParamError> {
    match params.get(field) {
        None | Some(Value::Null) => Err(ParamError::Missing(field)),
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        Some(_) => Err(ParamError::WrongKind {
            field,
            expected: "a non-empty string",
        }),
    }
}

/// Extract an optional string parameter, ignoring values of other kinds.
pub fn optional_string<'a>(params: &'a Params, field: &str) -> Option<&'a str> {
    params
        .get(field)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
}
