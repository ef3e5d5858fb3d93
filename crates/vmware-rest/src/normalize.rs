//! Response normalization across vSphere API generations.
//!
//! Pre-7.0.2 endpoints (`/rest/...`) wrap every payload in `{"value": ...}`;
//! newer ones (`/api/...`) return it bare, and `create` may answer with only
//! the new identifier as a JSON string. Every shape is classified once into a
//! [`ResponseShape`] instead of being inspected ad hoc.

use crate::error::{VmwareError, VmwareResult};
use crate::payload::Operation;
use crate::transport::RestResponse;

use serde_json::{Map, Value};

/// The ways a vSphere response body can be laid out.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseShape {
    /// No body (e.g. 204) or JSON `null`
    Empty,
    /// Legacy `{"value": ...}` wrapper
    Envelope(Value),
    /// Bare identifier string, as returned by newer `create` calls
    Identifier(String),
    /// Bare object
    Object(Map<String, Value>),
    /// Lists and scalars
    Other(Value),
}

impl ResponseShape {
    pub fn classify(body: Option<Value>) -> Self {
        match body {
            None | Some(Value::Null) => Self::Empty,
            Some(Value::String(s)) => Self::Identifier(s),
            Some(Value::Object(mut m)) if m.len() == 1 && m.contains_key("value") => {
                Self::Envelope(m.remove("value").unwrap_or(Value::Null))
            }
            Some(Value::Object(m)) => Self::Object(m),
            Some(other) => Self::Other(other),
        }
    }

    /// Unwrapped payload. An empty body becomes an empty object.
    pub fn into_value(self) -> Value {
        match self {
            Self::Empty => Value::Object(Map::new()),
            Self::Envelope(v) | Self::Other(v) => v,
            Self::Identifier(s) => Value::String(s),
            Self::Object(m) => Value::Object(m),
        }
    }

    /// Identifier of a freshly created object.
    ///
    /// Bare strings and `{"value": "id"}` carry it directly; full objects only
    /// under `id_field`.
    pub fn identifier(&self, id_field: &str) -> Option<String> {
        let object_id = |m: &Map<String, Value>| {
            m.get(id_field).and_then(Value::as_str).map(str::to_string)
        };
        match self {
            Self::Identifier(s) => Some(s.clone()),
            Self::Envelope(Value::String(s)) => Some(s.clone()),
            Self::Envelope(Value::Object(m)) | Self::Object(m) => object_id(m),
            _ => None,
        }
    }
}

/// Unwrapped value plus whether the call changed anything.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub value: Value,
    pub changed: bool,
}

/// Normalize a raw body for `op`.
///
/// `get`/`list` never report a change; mutating operations report one iff the
/// status is accepted and the raw body carries no `error` key. `create` is
/// accepted on 200/201 only, `update`/`delete` on any 2xx.
pub fn normalize(op: Operation, status: u16, body: Option<Value>) -> Normalized {
    let accepted = accepts(op, status) && !has_error_key(body.as_ref());
    let changed = !op.is_read_only() && accepted;
    Normalized {
        value: ResponseShape::classify(body).into_value(),
        changed,
    }
}

fn accepts(op: Operation, status: u16) -> bool {
    match op {
        Operation::Create => matches!(status, 200 | 201),
        _ => (200..300).contains(&status),
    }
}

fn has_error_key(body: Option<&Value>) -> bool {
    matches!(body, Some(Value::Object(m)) if m.contains_key("error"))
}

/// Turn statuses that end the run into errors.
///
/// Carve-outs: `delete` on 404 means the object is already gone. A 500 on
/// `create` is reported as a server error.
pub fn check_status(op: Operation, resp: &RestResponse) -> VmwareResult<()> {
    if resp.is_success() {
        return Ok(());
    }
    match (op, resp.status) {
        (Operation::Delete, 404) => Ok(()),
        (Operation::Create, 500) => Err(VmwareError::server(resp.status, resp.text.clone())),
        (_, status) => Err(VmwareError::api(status, resp.text.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VmwareErrorKind;
    use serde_json::json;

    #[test]
    fn envelope_and_bare_object_normalize_identically() {
        let object = json!({"name": "pool1", "cpu_allocation": {"limit": -1}});
        let wrapped = normalize(Operation::Get, 200, Some(json!({"value": object.clone()})));
        let bare = normalize(Operation::Get, 200, Some(object.clone()));
        assert_eq!(wrapped, bare);
        assert_eq!(bare.value, object);
        assert!(!bare.changed);
    }

    #[test]
    fn object_with_value_field_among_others_is_not_an_envelope() {
        let body = json!({"value": 3, "name": "x"});
        assert_eq!(
            ResponseShape::classify(Some(body.clone())),
            ResponseShape::Object(body.as_object().cloned().unwrap())
        );
    }

    #[test]
    fn create_identifier_from_every_shape() {
        let shapes = [
            json!("resgroup-42"),
            json!({"value": "resgroup-42"}),
            json!({"resource_pool": "resgroup-42", "name": "pool1"}),
            json!({"value": {"resource_pool": "resgroup-42"}}),
        ];
        for body in shapes {
            assert_eq!(
                ResponseShape::classify(Some(body.clone())).identifier("resource_pool"),
                Some("resgroup-42".to_string()),
                "shape {body}"
            );
        }
        assert_eq!(ResponseShape::Empty.identifier("resource_pool"), None);
    }

    #[test]
    fn full_object_without_id_field_has_no_identifier() {
        let bodies = [
            json!({"name": "pool1", "parent": "rp-0"}),
            json!({"value": {"name": "pool1", "parent": "rp-0"}}),
        ];
        for body in bodies {
            assert_eq!(
                ResponseShape::classify(Some(body.clone())).identifier("resource_pool"),
                None,
                "shape {body}"
            );
        }
    }

    #[test]
    fn create_changes_only_on_200_or_201() {
        assert!(normalize(Operation::Create, 200, Some(json!({"value": "resgroup-1"}))).changed);
        assert!(!normalize(Operation::Create, 202, Some(json!("resgroup-1"))).changed);
        assert!(!normalize(Operation::Create, 204, None).changed);
        assert!(normalize(Operation::Update, 204, None).changed);
    }

    #[test]
    fn mutating_operations_change_only_when_accepted() {
        assert!(normalize(Operation::Create, 201, Some(json!("resgroup-42"))).changed);
        assert!(normalize(Operation::Delete, 204, None).changed);
        assert!(!normalize(Operation::Delete, 404, None).changed);
        assert!(!normalize(Operation::Update, 200, Some(json!({"error": "nope"}))).changed);
        assert!(!normalize(Operation::List, 200, Some(json!([]))).changed);
    }

    #[test]
    fn empty_body_becomes_empty_object() {
        let n = normalize(Operation::Delete, 204, None);
        assert_eq!(n.value, json!({}));
    }

    #[test]
    fn check_status_carve_outs() {
        assert!(check_status(Operation::Delete, &RestResponse::empty(404)).is_ok());

        let err = check_status(
            Operation::Create,
            &RestResponse::json(500, json!({"error_type": "INTERNAL"})),
        )
        .unwrap_err();
        assert_eq!(err.kind, VmwareErrorKind::ServerError(500));
        assert!(err.message.contains("INTERNAL"));

        let err = check_status(Operation::Get, &RestResponse::empty(404)).unwrap_err();
        assert_eq!(err.kind, VmwareErrorKind::ApiError(404));
    }
}
