//! Aggregate service façade for the crate.
//!
//! `VmwareRestService` owns the `VsphereClient` and exposes every resource
//! operation behind one connection. Hosts share it as
//! `VmwareRestServiceState = Arc<Mutex<VmwareRestService>>`.

use crate::error::{VmwareError, VmwareResult};
use crate::reconcile::ReconcileOptions;
use crate::resources::resource_pool::{self, ResourcePoolInfoParams, ResourcePoolParams};
use crate::resources::scsi_adapter::{self, ScsiAdapterInfoParams, ScsiAdapterParams};
use crate::types::*;
use crate::vsphere::VsphereClient;

use std::sync::Arc;
use tokio::sync::Mutex;

/// Thread-safe handle shared by the host.
pub type VmwareRestServiceState = Arc<Mutex<VmwareRestService>>;

/// Top-level service holding the vCenter session.
#[derive(Default)]
pub struct VmwareRestService {
    client: Option<VsphereClient>,
    options: ReconcileOptions,
}

impl VmwareRestService {
    /// Create a new (disconnected) service.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: ReconcileOptions) -> Self {
        self.options = options;
        self
    }

    pub fn into_state(self) -> VmwareRestServiceState {
        Arc::new(Mutex::new(self))
    }

    /// Whether we have an active vSphere session.
    pub fn is_connected(&self) -> bool {
        self.client
            .as_ref()
            .map(|c| c.is_connected())
            .unwrap_or(false)
    }

    fn require_client(&self) -> VmwareResult<&VsphereClient> {
        self.client
            .as_ref()
            .filter(|c| c.is_connected())
            .ok_or_else(|| VmwareError::connection("Not connected to vCenter. Call connect first."))
    }

    // ── Connection ──────────────────────────────────────────────────

    /// Connect to a vCenter. Unset parameters come from `VMWARE_*`.
    pub async fn connect(&mut self, config: ConnectionConfig) -> VmwareResult<VsphereSession> {
        let config = config.with_env_fallback()?;
        let client = VsphereClient::new(&config)?;
        self.connect_client(client).await
    }

    /// Log in with an already-built client and keep it.
    pub async fn connect_client(&mut self, mut client: VsphereClient) -> VmwareResult<VsphereSession> {
        if let Some(mut previous) = self.client.take() {
            previous.logout().await?;
        }
        let session_id = client.login().await?;
        let config = client.config();
        let session = VsphereSession {
            hostname: config.hostname.clone(),
            username: config.username.clone(),
            session_id,
            connected_at: chrono::Utc::now().to_rfc3339(),
        };
        log::info!("connected to {} as {}", session.hostname, session.username);
        self.client = Some(client);
        Ok(session)
    }

    /// Disconnect from vCenter.
    pub async fn disconnect(&mut self) -> VmwareResult<()> {
        if let Some(ref mut client) = self.client {
            client.logout().await?;
        }
        self.client = None;
        Ok(())
    }

    /// Check if the session is still valid.
    pub async fn check_session(&self) -> VmwareResult<bool> {
        if let Some(ref client) = self.client {
            client.check_session().await
        } else {
            Ok(false)
        }
    }

    /// Get current config (without password).
    pub fn get_config(&self) -> Option<ConnectionConfigSafe> {
        self.client.as_ref().map(|c| {
            let cfg = c.config();
            ConnectionConfigSafe {
                hostname: cfg.hostname.clone(),
                port: cfg.port,
                username: cfg.username.clone(),
                validate_certs: cfg.verifies_certs(),
            }
        })
    }

    // ── Resource pools ──────────────────────────────────────────────

    pub async fn resource_pool(&self, params: &ResourcePoolParams) -> VmwareResult<OperationResult> {
        let c = self.require_client()?;
        resource_pool::reconcile(c, params, self.options).await
    }

    pub async fn resource_pool_info(
        &self,
        params: &ResourcePoolInfoParams,
    ) -> VmwareResult<OperationResult> {
        let c = self.require_client()?;
        resource_pool::info(c, params).await
    }

    // ── SCSI adapters ───────────────────────────────────────────────

    pub async fn scsi_adapter(&self, params: &ScsiAdapterParams) -> VmwareResult<OperationResult> {
        let c = self.require_client()?;
        scsi_adapter::reconcile(c, params, self.options).await
    }

    pub async fn scsi_adapter_info(
        &self,
        params: &ScsiAdapterInfoParams,
    ) -> VmwareResult<OperationResult> {
        let c = self.require_client()?;
        scsi_adapter::info(c, params).await
    }
}
