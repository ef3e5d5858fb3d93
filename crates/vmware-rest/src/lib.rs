//! # vmware-rest: declarative vCenter resources over the vSphere REST API
//!
//! Reconciles a desired state (present / absent plus field values) against
//! what a vCenter reports, issuing only the GET / POST / PATCH / DELETE calls
//! needed, and reports whether anything changed.
//!
//! ## Modules
//!
//! - **types**: connection config, desired state, operation results
//! - **error**: crate-specific error types
//! - **transport**: request / response types and the `RestTransport` seam
//! - **vsphere**: vSphere REST API HTTP client with session-based auth
//! - **payload**: per-operation field-mapping tables and the renderer
//! - **normalize**: response shape detection and change reporting
//! - **resource**: static resource descriptors
//! - **reconcile**: the generic resolve / compare / submit state machine
//! - **resources**: resource pools and VM SCSI adapters
//! - **service**: aggregate facade + shared state alias

pub mod types;
pub mod error;
pub mod transport;
pub mod vsphere;
pub mod payload;
pub mod normalize;
pub mod resource;
pub mod reconcile;
pub mod resources;
pub mod service;
