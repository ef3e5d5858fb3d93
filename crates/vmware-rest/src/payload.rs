//! Declarative field-mapping tables and the pure renderer that applies them.
//!
//! Each resource declares, per [`Operation`], which desired-state fields feed
//! the query string, the JSON body and the URL path. Body destinations may be
//! nested with `/` (`"spec/bus"` puts `bus` under `body.spec.bus`).

use crate::error::{VmwareError, VmwareResult};
use crate::types::DesiredState;

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// Operations a resource may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Update,
    Delete,
    Get,
    List,
}

impl Operation {
    /// Read-only operations never report a change.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::Get | Self::List)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Get => "get",
            Self::List => "list",
        };
        f.write_str(s)
    }
}

/// `(input field, destination)` pairs for one operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct OperationFormat {
    pub query: &'static [(&'static str, &'static str)],
    pub body: &'static [(&'static str, &'static str)],
    pub path: &'static [(&'static str, &'static str)],
}

impl OperationFormat {
    pub const EMPTY: Self = Self { query: &[], body: &[], path: &[] };
}

/// Per-operation formats of one resource. `None` means unsupported.
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadFormat {
    pub create: Option<OperationFormat>,
    pub update: Option<OperationFormat>,
    pub delete: Option<OperationFormat>,
    pub get: Option<OperationFormat>,
    pub list: Option<OperationFormat>,
}

impl PayloadFormat {
    pub fn for_operation(&self, op: Operation) -> Option<&OperationFormat> {
        match op {
            Operation::Create => self.create.as_ref(),
            Operation::Update => self.update.as_ref(),
            Operation::Delete => self.delete.as_ref(),
            Operation::Get => self.get.as_ref(),
            Operation::List => self.list.as_ref(),
        }
    }

    pub fn supports(&self, op: Operation) -> bool {
        self.for_operation(op).is_some()
    }
}

/// Query, body and path values rendered for one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedPayload {
    pub query: Vec<(String, String)>,
    pub body: Map<String, Value>,
    pub path: HashMap<String, String>,
}

impl RenderedPayload {
    /// Body with nothing to send: no keys, or only empty nested wrappers
    /// such as `{"spec": {}}`.
    pub fn body_is_empty(&self) -> bool {
        self.body
            .values()
            .all(|v| matches!(v, Value::Object(m) if m.is_empty()))
    }
}

/// Apply `format` to `desired`. Unsupplied fields are skipped, never sent as null.
pub fn render(format: &OperationFormat, desired: &DesiredState) -> RenderedPayload {
    let mut out = RenderedPayload::default();

    for (field, param) in format.query {
        match desired.get(field) {
            Some(Value::Array(items)) => {
                for item in items.iter().filter(|v| !v.is_null()) {
                    out.query.push((param.to_string(), scalar_text(item)));
                }
            }
            Some(v) => out.query.push((param.to_string(), scalar_text(v))),
            None => {}
        }
    }

    for (field, dest) in format.body {
        if let Some(v) = desired.get(field) {
            set_nested(&mut out.body, dest, v.clone());
        }
    }

    for (field, slot) in format.path {
        if let Some(v) = desired.get(field) {
            out.path.insert(slot.to_string(), scalar_text(v));
        }
    }

    out
}

fn scalar_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn set_nested(body: &mut Map<String, Value>, dest: &str, value: Value) {
    let mut parts = dest.split('/').filter(|p| !p.is_empty()).peekable();
    let mut cursor = body;
    while let Some(part) = parts.next() {
        if parts.peek().is_none() {
            cursor.insert(part.to_string(), value);
            return;
        }
        let slot = cursor
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        let Value::Object(next) = slot else { return };
        cursor = next;
    }
}

/// Substitute `{slot}` placeholders in `template`; an unfilled slot is an error.
/// Values are percent-encoded as a single path segment.
pub fn render_path(template: &str, values: &HashMap<String, String>) -> VmwareResult<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let end = rest[start..]
            .find('}')
            .map(|e| start + e)
            .ok_or_else(|| VmwareError::url(format!("Unterminated placeholder in {template}")))?;
        let slot = &rest[start + 1..end];
        let value = values
            .get(slot)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| VmwareError::url(format!("Missing value for {{{slot}}} in {template}")))?;
        out.push_str(&encode_segment(value)?);
        rest = &rest[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn encode_segment(value: &str) -> VmwareResult<String> {
    if matches!(value, "." | "..") {
        return Err(VmwareError::url(format!("Invalid path segment: {value}")));
    }
    let mut scratch = url::Url::parse("http://segment.invalid/")?;
    scratch
        .path_segments_mut()
        .map_err(|_| VmwareError::url("Cannot encode path segment"))?
        .clear()
        .push(value);
    Ok(scratch.path().trim_start_matches('/').to_string())
}

/// Join base, rendered path and query pairs into an absolute URL.
pub fn build_url(base: &str, path: &str, query: &[(String, String)]) -> VmwareResult<String> {
    let mut url = url::Url::parse(&format!("{}{}", base.trim_end_matches('/'), path))?;
    if !query.is_empty() {
        url.query_pairs_mut()
            .extend_pairs(query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }
    Ok(url.to_string())
}
