//! Shared types for vSphere REST reconciliation.

use crate::error::{VmwareError, VmwareResult};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::time::Duration;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Connection / Config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub const ENV_HOST: &str = "VMWARE_HOST";
pub const ENV_USER: &str = "VMWARE_USER";
pub const ENV_PASSWORD: &str = "VMWARE_PASSWORD";
pub const ENV_VALIDATE_CERTS: &str = "VMWARE_VALIDATE_CERTS";
pub const ENV_LOG_FILE: &str = "VMWARE_REST_LOG_FILE";
pub const ENV_SESSION_TIMEOUT: &str = "VMWARE_SESSION_TIMEOUT";

/// Default end-to-end timeout for one HTTP exchange.
pub const DEFAULT_SESSION_TIMEOUT_SECS: f64 = 300.0;

/// Connection parameters for a vCenter.
///
/// Accepts both the short field names and the `vcenter_*` names used by task
/// parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// vCenter hostname / IP (e.g. "vcenter.lab.local")
    #[serde(default, alias = "vcenter_hostname")]
    pub hostname: String,
    /// Port (default 443)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Username (e.g. "administrator@vsphere.local")
    #[serde(default, alias = "vcenter_username")]
    pub username: String,
    /// Password
    #[serde(default, alias = "vcenter_password")]
    pub password: String,
    /// Verify the server TLS certificate (default true)
    #[serde(default, alias = "vcenter_validate_certs")]
    pub validate_certs: Option<bool>,
    /// Where the host records HTTP interactions, if anywhere
    #[serde(default, alias = "vcenter_rest_log_file")]
    pub log_file: Option<PathBuf>,
    /// Seconds allowed for connect + send + receive of one request
    #[serde(default)]
    pub session_timeout: Option<f64>,
}

fn default_port() -> u16 { 443 }

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            hostname: String::new(),
            port: 443,
            username: String::new(),
            password: String::new(),
            validate_certs: None,
            log_file: None,
            session_timeout: None,
        }
    }
}

impl ConnectionConfig {
    /// Build a config purely from the `VMWARE_*` environment variables.
    pub fn from_env() -> VmwareResult<Self> {
        Self::default().with_env_fallback()
    }

    /// Fill every unset field from its `VMWARE_*` environment variable.
    pub fn with_env_fallback(self) -> VmwareResult<Self> {
        self.with_fallback(|key| std::env::var(key).ok())
    }

    /// Fill every unset field from `lookup`. Values already present win.
    pub fn with_fallback<F>(mut self, lookup: F) -> VmwareResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.hostname.is_empty() {
            self.hostname = lookup(ENV_HOST).unwrap_or_default();
        }
        if self.username.is_empty() {
            self.username = lookup(ENV_USER).unwrap_or_default();
        }
        if self.password.is_empty() {
            self.password = lookup(ENV_PASSWORD).unwrap_or_default();
        }
        if self.validate_certs.is_none() {
            if let Some(raw) = lookup(ENV_VALIDATE_CERTS) {
                let flag = parse_bool(&raw).ok_or_else(|| {
                    VmwareError::configuration(format!("{ENV_VALIDATE_CERTS} is not a boolean: {raw}"))
                })?;
                self.validate_certs = Some(flag);
            }
        }
        if self.log_file.is_none() {
            self.log_file = lookup(ENV_LOG_FILE).map(PathBuf::from);
        }
        if self.session_timeout.is_none() {
            if let Some(raw) = lookup(ENV_SESSION_TIMEOUT) {
                let secs = raw.trim().parse::<f64>().map_err(|_| {
                    VmwareError::configuration(format!("{ENV_SESSION_TIMEOUT} is not a number: {raw}"))
                })?;
                self.session_timeout = Some(secs);
            }
        }
        Ok(self)
    }

    /// Reject configs that cannot possibly open a session.
    pub fn validate(&self) -> VmwareResult<()> {
        if self.hostname.trim().is_empty() {
            return Err(VmwareError::configuration("vcenter_hostname cannot be empty"));
        }
        if self.username.is_empty() {
            return Err(VmwareError::configuration("vcenter_username cannot be empty"));
        }
        if self.password.is_empty() {
            return Err(VmwareError::configuration("vcenter_password cannot be empty"));
        }
        self.timeout()?;
        Ok(())
    }

    /// Whether the server certificate must be trusted.
    pub fn verifies_certs(&self) -> bool {
        self.validate_certs.unwrap_or(true)
    }

    /// End-to-end timeout applied to every request. Must be a positive
    /// number of seconds that fits in a `Duration`.
    pub fn timeout(&self) -> VmwareResult<Duration> {
        let secs = self.session_timeout.unwrap_or(DEFAULT_SESSION_TIMEOUT_SECS);
        if secs <= 0.0 {
            return Err(invalid_timeout(secs));
        }
        Duration::try_from_secs_f64(secs).map_err(|_| invalid_timeout(secs))
    }
}

fn invalid_timeout(secs: f64) -> VmwareError {
    VmwareError::configuration(format!(
        "session_timeout must be a positive number of seconds, got {secs}"
    ))
}

// Accepted boolean spellings.
fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "y" | "t" => Some(true),
        "0" | "false" | "no" | "off" | "n" | "f" => Some(false),
        _ => None,
    }
}

/// Same as `ConnectionConfig` but without the password.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfigSafe {
    pub hostname: String,
    pub port: u16,
    pub username: String,
    pub validate_certs: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Session
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Tracks an active vSphere API session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VsphereSession {
    pub hostname: String,
    pub username: String,
    pub session_id: String,
    pub connected_at: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Desired / Observed state
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Whether the target object should exist after reconciliation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DesiredMode {
    #[default]
    Present,
    Absent,
}

/// Caller-supplied field values.
///
/// A missing key and an explicit `null` both mean "not supplied"; `false`,
/// `0` and `""` are supplied values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DesiredState(Map<String, Value>);

impl DesiredState {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Serialize typed parameters into a desired state.
    pub fn from_params<P: Serialize>(params: &P) -> VmwareResult<Self> {
        match serde_json::to_value(params)? {
            Value::Object(map) => Ok(Self(map)),
            other => Err(VmwareError::parse(format!(
                "parameters must serialize to an object, got {other}"
            ))),
        }
    }

    /// Supplied value for `field`, treating `null` as absent.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field).filter(|v| !v.is_null())
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    pub fn is_supplied(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) {
        self.0.insert(field.into(), value);
    }

    pub fn with(mut self, field: impl Into<String>, value: Value) -> Self {
        self.insert(field, value);
        self
    }
}

impl From<Map<String, Value>> for DesiredState {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Uniform outcome of one reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationResult {
    /// Server-assigned moid, when the object is known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub value: Value,
    pub changed: bool,
    /// HTTP status of the last request, for diagnostics
    #[serde(skip)]
    pub status: Option<u16>,
}

impl OperationResult {
    pub fn unchanged(id: Option<String>, value: Value, status: Option<u16>) -> Self {
        Self { id, value, changed: false, status }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn fallback_fills_missing_fields_only() {
        let cfg = ConnectionConfig {
            hostname: "vc.task.local".into(),
            ..Default::default()
        }
        .with_fallback(env(&[
            (ENV_HOST, "vc.env.local"),
            (ENV_USER, "admin"),
            (ENV_PASSWORD, "secret"),
            (ENV_VALIDATE_CERTS, "no"),
            (ENV_SESSION_TIMEOUT, "12.5"),
        ]))
        .unwrap();

        assert_eq!(cfg.hostname, "vc.task.local");
        assert_eq!(cfg.username, "admin");
        assert_eq!(cfg.password, "secret");
        assert!(!cfg.verifies_certs());
        assert_eq!(cfg.timeout().unwrap(), Duration::from_millis(12_500));
        cfg.validate().unwrap();
    }

    #[test]
    fn invalid_timeout_env_is_a_configuration_error() {
        let err = ConnectionConfig::default()
            .with_fallback(env(&[(ENV_SESSION_TIMEOUT, "soon")]))
            .unwrap_err();
        assert_eq!(err.kind, crate::error::VmwareErrorKind::ConfigurationError);
    }

    #[test]
    fn oversized_timeout_is_a_configuration_error() {
        let cfg = ConnectionConfig {
            hostname: "vc".into(),
            username: "admin".into(),
            password: "secret".into(),
            ..Default::default()
        }
        .with_fallback(env(&[(ENV_SESSION_TIMEOUT, "1e300")]))
        .unwrap();

        let err = cfg.validate().unwrap_err();
        assert_eq!(err.kind, crate::error::VmwareErrorKind::ConfigurationError);
        assert!(err.message.contains("session_timeout"));
        assert!(cfg.timeout().is_err());
    }

    #[test]
    fn non_positive_or_nan_timeout_is_rejected() {
        for secs in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let cfg = ConnectionConfig {
                session_timeout: Some(secs),
                ..Default::default()
            };
            assert!(cfg.timeout().is_err(), "timeout {secs}");
        }
    }

    #[test]
    fn validate_rejects_empty_credentials() {
        let cfg = ConnectionConfig {
            hostname: "vc".into(),
            username: "admin".into(),
            ..Default::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.message.contains("vcenter_password"));
    }

    #[test]
    fn config_accepts_task_parameter_names() {
        let cfg: ConnectionConfig = serde_json::from_value(json!({
            "vcenter_hostname": "vc",
            "vcenter_username": "u",
            "vcenter_password": "p",
            "vcenter_validate_certs": false,
            "session_timeout": 30.0
        }))
        .unwrap();
        assert_eq!(cfg.hostname, "vc");
        assert!(!cfg.verifies_certs());
        assert_eq!(cfg.port, 443);
        assert_eq!(cfg.timeout().unwrap(), Duration::from_secs(30));
    }

    #[test]
    fn task_validate_certs_wins_over_env() {
        let cfg = ConnectionConfig {
            validate_certs: Some(true),
            ..Default::default()
        }
        .with_fallback(env(&[(ENV_VALIDATE_CERTS, "false")]))
        .unwrap();
        assert!(cfg.verifies_certs());
    }

    #[test]
    fn default_timeout_is_five_minutes() {
        let cfg = ConnectionConfig::default();
        assert_eq!(cfg.timeout().unwrap(), Duration::from_secs(300));
        assert!(cfg.verifies_certs());
    }

    #[test]
    fn null_is_not_supplied_but_false_is() {
        let state = DesiredState::new()
            .with("name", Value::Null)
            .with("expandable", json!(false))
            .with("limit", json!(0));
        assert!(!state.is_supplied("name"));
        assert_eq!(state.get("expandable"), Some(&json!(false)));
        assert_eq!(state.get("limit"), Some(&json!(0)));
    }
}
