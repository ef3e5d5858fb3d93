//! Per-resource descriptors and typed parameter sets.
//!
//! - **resource_pool** - `/api/vcenter/resource-pool` (create / update / delete / info)
//! - **scsi_adapter** - `/rest/vcenter/vm/{vm}/hardware/adapter/scsi` (info, plus
//!   create / update / delete)

pub mod resource_pool;
pub mod scsi_adapter;
