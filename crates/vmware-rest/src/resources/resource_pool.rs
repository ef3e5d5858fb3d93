//! Resource pools (`/api/vcenter/resource-pool`).

use crate::error::VmwareResult;
use crate::payload::{OperationFormat, PayloadFormat};
use crate::reconcile::{ReconcileOptions, Reconciler};
use crate::resource::ResourceDescriptor;
use crate::transport::RestTransport;
use crate::types::{DesiredMode, DesiredState, OperationResult};

use serde::{Deserialize, Serialize};

const ALLOCATION_BODY: &[(&str, &str)] = &[
    ("cpu_allocation", "cpu_allocation"),
    ("memory_allocation", "memory_allocation"),
    ("name", "name"),
];

const BY_ID: &[(&str, &str)] = &[("resource_pool", "resource_pool")];

pub const RESOURCE_POOL: ResourceDescriptor = ResourceDescriptor {
    name: "resource pool",
    collection_path: "/api/vcenter/resource-pool",
    item_path: "/api/vcenter/resource-pool/{resource_pool}",
    id_field: "resource_pool",
    lookup: &[("name", "names"), ("parent", "parent_resource_pools")],
    formats: PayloadFormat {
        create: Some(OperationFormat {
            query: &[],
            body: &[
                ("cpu_allocation", "cpu_allocation"),
                ("memory_allocation", "memory_allocation"),
                ("name", "name"),
                ("parent", "parent"),
            ],
            path: &[],
        }),
        update: Some(OperationFormat {
            query: &[],
            body: ALLOCATION_BODY,
            path: BY_ID,
        }),
        delete: Some(OperationFormat {
            query: &[],
            body: &[],
            path: BY_ID,
        }),
        get: Some(OperationFormat {
            query: &[],
            body: &[],
            path: BY_ID,
        }),
        list: Some(OperationFormat {
            query: &[
                ("clusters", "clusters"),
                ("datacenters", "datacenters"),
                ("hosts", "hosts"),
                ("names", "names"),
                ("parent_resource_pools", "parent_resource_pools"),
                ("resource_pools", "resource_pools"),
            ],
            body: &[],
            path: &[],
        }),
    },
};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Parameters
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum SharesLevel {
    Custom,
    High,
    Low,
    Normal,
}

/// Relative weight under contention.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Shares {
    pub level: SharesLevel,
    /// Only meaningful with `level = CUSTOM`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shares: Option<i64>,
}

/// CPU (MHz) or memory (MB) allocation of a pool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResourceAllocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expandable_reservation: Option<bool>,
    /// `-1` means unlimited
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shares: Option<Shares>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourcePoolParams {
    /// Pool name, needed to create
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Parent pool moid, needed to create
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Pool moid (e.g. "resgroup-42")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_pool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_allocation: Option<ResourceAllocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_allocation: Option<ResourceAllocation>,
    #[serde(default)]
    pub state: DesiredMode,
}

/// Filters for listing pools; `resource_pool` fetches one pool instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourcePoolInfoParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_pool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub names: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_resource_pools: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datacenters: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clusters: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosts: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_pools: Option<Vec<String>>,
}

/// Create, update or delete a pool according to `params.state`.
pub async fn reconcile<T: RestTransport + ?Sized>(
    transport: &T,
    params: &ResourcePoolParams,
    options: ReconcileOptions,
) -> VmwareResult<OperationResult> {
    let desired = DesiredState::from_params(params)?;
    Reconciler::new(transport, &RESOURCE_POOL)
        .with_options(options)
        .apply(&desired, params.state)
        .await
}

pub async fn info<T: RestTransport + ?Sized>(
    transport: &T,
    params: &ResourcePoolInfoParams,
) -> VmwareResult<OperationResult> {
    let desired = DesiredState::from_params(params)?;
    Reconciler::new(transport, &RESOURCE_POOL).info(&desired).await
}
