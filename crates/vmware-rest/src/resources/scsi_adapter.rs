//! Virtual SCSI adapters of a VM (`/rest/vcenter/vm/{vm}/hardware/adapter/scsi`).
//!
//! Legacy endpoint: responses come wrapped in `{"value": ...}` and write
//! bodies go under `spec`.

use crate::error::VmwareResult;
use crate::payload::{OperationFormat, PayloadFormat};
use crate::reconcile::{ReconcileOptions, Reconciler};
use crate::resource::ResourceDescriptor;
use crate::transport::RestTransport;
use crate::types::{DesiredMode, DesiredState, OperationResult};

use serde::{Deserialize, Serialize};

const BY_VM: &[(&str, &str)] = &[("vm", "vm")];
const BY_ADAPTER: &[(&str, &str)] = &[("vm", "vm"), ("adapter", "adapter")];

pub const SCSI_ADAPTER: ResourceDescriptor = ResourceDescriptor {
    name: "SCSI adapter",
    collection_path: "/rest/vcenter/vm/{vm}/hardware/adapter/scsi",
    item_path: "/rest/vcenter/vm/{vm}/hardware/adapter/scsi/{adapter}",
    id_field: "adapter",
    lookup: &[],
    formats: PayloadFormat {
        create: Some(OperationFormat {
            query: &[],
            body: &[
                ("bus", "spec/bus"),
                ("pci_slot_number", "spec/pci_slot_number"),
                ("sharing", "spec/sharing"),
                ("type", "spec/type"),
            ],
            path: BY_VM,
        }),
        update: Some(OperationFormat {
            query: &[],
            body: &[("sharing", "spec/sharing")],
            path: BY_ADAPTER,
        }),
        delete: Some(OperationFormat {
            query: &[],
            body: &[],
            path: BY_ADAPTER,
        }),
        get: Some(OperationFormat {
            query: &[],
            body: &[],
            path: BY_ADAPTER,
        }),
        list: Some(OperationFormat {
            query: &[],
            body: &[],
            path: BY_VM,
        }),
    },
};

/// Bus sharing mode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ScsiSharing {
    #[serde(rename = "NONE")]
    NoSharing,
    #[serde(rename = "VIRTUAL")]
    Virtual,
    #[serde(rename = "PHYSICAL")]
    Physical,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScsiAdapterType {
    Buslogic,
    Lsilogic,
    Lsilogicsas,
    Pvscsi,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScsiAdapterInfoParams {
    /// VM moid (e.g. "vm-42")
    pub vm: String,
    /// Adapter key; lists every adapter of the VM when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapter: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScsiAdapterParams {
    pub vm: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bus: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pci_slot_number: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sharing: Option<ScsiSharing>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub adapter_type: Option<ScsiAdapterType>,
    #[serde(default)]
    pub state: DesiredMode,
}

pub async fn info<T: RestTransport + ?Sized>(
    transport: &T,
    params: &ScsiAdapterInfoParams,
) -> VmwareResult<OperationResult> {
    let desired = DesiredState::from_params(params)?;
    Reconciler::new(transport, &SCSI_ADAPTER).info(&desired).await
}

/// Add, reconfigure or remove an adapter. Adapters have no natural key, so
/// without `adapter` a present run always adds a new one.
pub async fn reconcile<T: RestTransport + ?Sized>(
    transport: &T,
    params: &ScsiAdapterParams,
    options: ReconcileOptions,
) -> VmwareResult<OperationResult> {
    let desired = DesiredState::from_params(params)?;
    Reconciler::new(transport, &SCSI_ADAPTER)
        .with_options(options)
        .apply(&desired, params.state)
        .await
}
