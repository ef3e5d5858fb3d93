//! Static description of a vCenter resource type.

use crate::payload::{Operation, OperationFormat, PayloadFormat};

/// Everything the reconciler needs to know about one resource type.
#[derive(Debug, Clone, Copy)]
pub struct ResourceDescriptor {
    /// Human-readable name used in messages and logs
    pub name: &'static str,
    /// Collection endpoint (list / create), e.g. `/api/vcenter/resource-pool`
    pub collection_path: &'static str,
    /// Item endpoint (get / update / delete); contains `{id_field}`
    pub item_path: &'static str,
    /// Desired-state field holding the server-assigned identifier
    pub id_field: &'static str,
    /// Uniqueness key set as `(field, list filter)` pairs. Empty when the
    /// resource can only be addressed by identifier.
    pub lookup: &'static [(&'static str, &'static str)],
    pub formats: PayloadFormat,
}

impl ResourceDescriptor {
    pub fn format(&self, op: Operation) -> Option<&OperationFormat> {
        self.formats.for_operation(op)
    }

    pub fn supports(&self, op: Operation) -> bool {
        self.formats.supports(op)
    }
}
