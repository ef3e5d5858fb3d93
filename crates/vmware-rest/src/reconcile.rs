//! Generic reconciliation of desired vs. observed state.
//!
//! `apply` walks resolve → compare / create → submit → normalize for any
//! [`ResourceDescriptor`]. Every HTTP call is awaited before the next one is
//! issued; nothing here guards against a concurrent writer on the same object.

use crate::error::{VmwareError, VmwareResult};
use crate::normalize::{check_status, normalize, ResponseShape};
use crate::payload::{build_url, render, render_path, Operation, OperationFormat, RenderedPayload};
use crate::resource::ResourceDescriptor;
use crate::transport::{RestRequest, RestTransport};
use crate::types::{DesiredMode, DesiredState, OperationResult};

use serde_json::{Map, Value};

/// What to do when a uniqueness lookup matches more than one object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AmbiguityPolicy {
    /// Behave as if nothing matched (the object may then be created again).
    #[default]
    TreatAsNotFound,
    /// Abort with an `AmbiguousMatch` error.
    Fail,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileOptions {
    pub on_ambiguous: AmbiguityPolicy,
}

/// An existing object located on the server.
#[derive(Debug, Clone)]
struct Resolved {
    id: String,
    value: Value,
    status: u16,
}

/// Reconciles one resource type through a transport.
pub struct Reconciler<'a, T: RestTransport + ?Sized> {
    transport: &'a T,
    descriptor: &'a ResourceDescriptor,
    options: ReconcileOptions,
}

impl<'a, T: RestTransport + ?Sized> Reconciler<'a, T> {
    pub fn new(transport: &'a T, descriptor: &'a ResourceDescriptor) -> Self {
        Self {
            transport,
            descriptor,
            options: ReconcileOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ReconcileOptions) -> Self {
        self.options = options;
        self
    }

    /// Drive the object toward `mode`, issuing only the calls needed.
    pub async fn apply(&self, desired: &DesiredState, mode: DesiredMode) -> VmwareResult<OperationResult> {
        match mode {
            DesiredMode::Present => self.ensure_present(desired).await,
            DesiredMode::Absent => self.ensure_absent(desired).await,
        }
    }

    /// Read-only fetch: the item when its identifier is supplied, the list otherwise.
    pub async fn info(&self, desired: &DesiredState) -> VmwareResult<OperationResult> {
        let id = desired.get_str(self.descriptor.id_field).map(str::to_string);
        let (op, url) = match id {
            Some(ref id) => {
                let payload = render(self.require(Operation::Get)?, desired);
                (Operation::Get, self.item_url(&payload, id)?)
            }
            None => {
                let payload = render(self.require(Operation::List)?, desired);
                (Operation::List, self.collection_url(&payload)?)
            }
        };

        let resp = self.transport.request(RestRequest::get(url)).await?;
        check_status(op, &resp)?;
        let n = normalize(op, resp.status, resp.json_body()?);
        Ok(OperationResult::unchanged(id, n.value, Some(resp.status)))
    }

    // ── present ─────────────────────────────────────────────────────

    async fn ensure_present(&self, desired: &DesiredState) -> VmwareResult<OperationResult> {
        match self.resolve(desired).await? {
            Some(found) if self.descriptor.supports(Operation::Update) => {
                self.update(desired, found).await
            }
            Some(found) => Ok(OperationResult::unchanged(
                Some(found.id),
                found.value,
                Some(found.status),
            )),
            None => self.create(desired).await,
        }
    }

    async fn resolve(&self, desired: &DesiredState) -> VmwareResult<Option<Resolved>> {
        if let Some(id) = desired.get_str(self.descriptor.id_field) {
            if let Some(found) = self.fetch(desired, id).await? {
                return Ok(Some(found));
            }
        }
        self.lookup(desired).await
    }

    async fn create(&self, desired: &DesiredState) -> VmwareResult<OperationResult> {
        let payload = render(self.require(Operation::Create)?, desired);
        let url = self.collection_url(&payload)?;

        log::debug!("creating {}", self.descriptor.name);
        let resp = self
            .transport
            .request(RestRequest::post(url, Value::Object(payload.body)))
            .await?;
        check_status(Operation::Create, &resp)?;

        let body = resp.json_body()?;
        let returned_id = ResponseShape::classify(body.clone()).identifier(self.descriptor.id_field);
        let mut n = normalize(Operation::Create, resp.status, body);

        let id = if n.changed {
            returned_id
        } else {
            log::warn!("{} create not accepted (status {})", self.descriptor.name, resp.status);
            None
        };
        match id {
            Some(ref id) => match self.fetch(desired, id).await? {
                Some(created) => n.value = created.value,
                None => log::warn!("{} {id} created but could not be fetched back", self.descriptor.name),
            },
            None if n.changed => {
                log::warn!("{} created but the response carries no {}", self.descriptor.name, self.descriptor.id_field)
            }
            None => {}
        }

        Ok(OperationResult {
            id,
            value: n.value,
            changed: n.changed,
            status: Some(resp.status),
        })
    }

    async fn update(&self, desired: &DesiredState, found: Resolved) -> VmwareResult<OperationResult> {
        let format = self.require(Operation::Update)?;
        let mut payload = render(format, desired);
        prune_unchanged(format, desired, &found.value, &mut payload.body);

        if payload.body_is_empty() {
            log::debug!("{} {} already up to date", self.descriptor.name, found.id);
            return Ok(OperationResult::unchanged(
                Some(found.id),
                found.value,
                Some(found.status),
            ));
        }

        let url = self.item_url(&payload, &found.id)?;
        log::debug!("updating {} {}", self.descriptor.name, found.id);
        let resp = self
            .transport
            .request(RestRequest::patch(url, Value::Object(payload.body)))
            .await?;
        check_status(Operation::Update, &resp)?;

        let body = resp.json_body()?;
        let no_content = body.is_none() && resp.status == 204;
        let mut n = normalize(Operation::Update, resp.status, body);
        if no_content {
            if let Some(after) = self.fetch(desired, &found.id).await? {
                n.value = after.value;
            }
        }

        Ok(OperationResult {
            id: Some(found.id),
            value: n.value,
            changed: n.changed,
            status: Some(resp.status),
        })
    }

    // ── absent ──────────────────────────────────────────────────────

    async fn ensure_absent(&self, desired: &DesiredState) -> VmwareResult<OperationResult> {
        let id = match desired.get_str(self.descriptor.id_field) {
            Some(id) => Some(id.to_string()),
            None => self.lookup(desired).await?.map(|found| found.id),
        };
        let Some(id) = id else {
            log::debug!("{} already absent", self.descriptor.name);
            return Ok(OperationResult::unchanged(None, Value::Object(Map::new()), None));
        };

        let payload = render(self.require(Operation::Delete)?, desired);
        let url = self.item_url(&payload, &id)?;
        log::debug!("deleting {} {id}", self.descriptor.name);
        let resp = self.transport.request(RestRequest::delete(url)).await?;
        check_status(Operation::Delete, &resp)?;

        let n = normalize(Operation::Delete, resp.status, resp.json_body()?);
        Ok(OperationResult {
            id: Some(id),
            value: n.value,
            changed: n.changed,
            status: Some(resp.status),
        })
    }

    // ── lookups ─────────────────────────────────────────────────────

    /// GET one object by identifier; anything but 200 means "not there".
    async fn fetch(&self, desired: &DesiredState, id: &str) -> VmwareResult<Option<Resolved>> {
        let format = self.descriptor.format(Operation::Get).unwrap_or(&OperationFormat::EMPTY);
        let payload = render(format, desired);
        let url = self.item_url(&payload, id)?;

        let resp = self.transport.request(RestRequest::get(url)).await?;
        if resp.status != 200 {
            log::debug!("{} {id} not found (status {})", self.descriptor.name, resp.status);
            return Ok(None);
        }
        let n = normalize(Operation::Get, resp.status, resp.json_body()?);
        Ok(Some(Resolved {
            id: id.to_string(),
            value: n.value,
            status: resp.status,
        }))
    }

    /// Find the object through its uniqueness keys. Only an exact single
    /// match resolves.
    async fn lookup(&self, desired: &DesiredState) -> VmwareResult<Option<Resolved>> {
        let keys = self.descriptor.lookup;
        if keys.is_empty() || !keys.iter().all(|(field, _)| desired.is_supplied(field)) {
            return Ok(None);
        }

        let list_path = self
            .descriptor
            .format(Operation::List)
            .map(|f| f.path)
            .unwrap_or_default();
        let filter = OperationFormat { query: keys, body: &[], path: list_path };
        let payload = render(&filter, desired);
        let url = self.collection_url(&payload)?;

        let resp = self.transport.request(RestRequest::get(url)).await?;
        check_status(Operation::List, &resp)?;
        let listed = normalize(Operation::List, resp.status, resp.json_body()?).value;

        let candidates: Vec<&Map<String, Value>> = listed
            .as_array()
            .map(|items| items.iter().filter_map(Value::as_object).collect())
            .unwrap_or_default();
        let matching: Vec<&Map<String, Value>> = candidates
            .into_iter()
            .filter(|c| {
                keys.iter().all(|(field, _)| match (c.get(*field), desired.get(field)) {
                    (Some(have), Some(want)) if !want.is_array() => have == want,
                    _ => true,
                })
            })
            .collect();

        match matching.as_slice() {
            [] => Ok(None),
            [only] => {
                let Some(id) = only.get(self.descriptor.id_field).and_then(Value::as_str) else {
                    log::warn!("{} lookup result has no {}", self.descriptor.name, self.descriptor.id_field);
                    return Ok(None);
                };
                self.fetch(desired, id).await
            }
            many => match self.options.on_ambiguous {
                AmbiguityPolicy::TreatAsNotFound => {
                    log::warn!(
                        "{} lookup matched {} objects; treating as not found",
                        self.descriptor.name,
                        many.len()
                    );
                    Ok(None)
                }
                AmbiguityPolicy::Fail => Err(VmwareError::ambiguous(format!(
                    "{} lookup matched {} objects",
                    self.descriptor.name,
                    many.len()
                ))),
            },
        }
    }

    // ── helpers ─────────────────────────────────────────────────────

    fn require(&self, op: Operation) -> VmwareResult<&'a OperationFormat> {
        let descriptor: &'a ResourceDescriptor = self.descriptor;
        descriptor
            .format(op)
            .ok_or_else(|| VmwareError::unsupported(format!("{} does not support {op}", self.descriptor.name)))
    }

    fn collection_url(&self, payload: &RenderedPayload) -> VmwareResult<String> {
        let path = render_path(self.descriptor.collection_path, &payload.path)?;
        build_url(self.transport.base_url(), &path, &payload.query)
    }

    fn item_url(&self, payload: &RenderedPayload, id: &str) -> VmwareResult<String> {
        let mut values = payload.path.clone();
        values.insert(self.descriptor.id_field.to_string(), id.to_string());
        let path = render_path(self.descriptor.item_path, &values)?;
        build_url(self.transport.base_url(), &path, &payload.query)
    }
}

/// Drop every body field whose desired value already matches the observed
/// object. Observed objects are flat, so each field is compared under its
/// input name even when its body destination is nested (`spec/sharing`).
fn prune_unchanged(
    format: &OperationFormat,
    desired: &DesiredState,
    observed: &Value,
    body: &mut Map<String, Value>,
) {
    for (field, dest) in format.body {
        let Some(want) = desired.get(field) else { continue };
        let empty = matches!(want, Value::Object(m) if m.is_empty());
        let same = observed.get(*field).is_some_and(|have| matches_observed(want, have));
        if empty || same {
            remove_nested(body, dest);
        }
    }
}

/// Deep comparison where a desired object matches when every key it sets
/// matches; keys it leaves out are not compared.
fn matches_observed(want: &Value, have: &Value) -> bool {
    match (want, have) {
        (Value::Object(w), Value::Object(h)) => w
            .iter()
            .all(|(k, v)| h.get(k).map_or(v.is_null(), |hv| matches_observed(v, hv))),
        (Value::Number(w), Value::Number(h)) => w == h || w.as_f64() == h.as_f64(),
        _ => want == have,
    }
}

fn remove_nested(body: &mut Map<String, Value>, dest: &str) {
    let parts: Vec<&str> = dest.split('/').filter(|p| !p.is_empty()).collect();
    let Some((leaf, parents)) = parts.split_last() else { return };
    let mut cursor = body;
    for part in parents {
        let Some(Value::Object(next)) = cursor.get_mut(*part) else { return };
        cursor = next;
    }
    cursor.remove(*leaf);
}
