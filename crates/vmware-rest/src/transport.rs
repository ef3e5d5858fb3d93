//! The HTTP seam between the reconciler and a vCenter.
//!
//! Transport failures (connect, timeout) come back as `Err`; every HTTP status,
//! including 4xx / 5xx, comes back as `Ok(RestResponse)` so the caller decides
//! which statuses are acceptable.

use crate::error::{VmwareError, VmwareResult};

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

/// Verbs used against the vSphere REST API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// One outbound request. `url` is absolute.
#[derive(Debug, Clone, PartialEq)]
pub struct RestRequest {
    pub method: HttpMethod,
    pub url: String,
    pub body: Option<Value>,
}

impl RestRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self { method: HttpMethod::Get, url: url.into(), body: None }
    }

    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self { method: HttpMethod::Post, url: url.into(), body: Some(body) }
    }

    pub fn patch(url: impl Into<String>, body: Value) -> Self {
        Self { method: HttpMethod::Patch, url: url.into(), body: Some(body) }
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self { method: HttpMethod::Delete, url: url.into(), body: None }
    }
}

/// Raw response: status, content type and body text.
#[derive(Debug, Clone, PartialEq)]
pub struct RestResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub text: String,
}

impl RestResponse {
    /// JSON response helper, mostly for fakes.
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            content_type: Some("application/json".into()),
            text: body.to_string(),
        }
    }

    /// Empty-bodied response (e.g. 204 No Content).
    pub fn empty(status: u16) -> Self {
        Self { status, content_type: None, text: String::new() }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.trim_start().starts_with("application/json"))
            .unwrap_or(false)
    }

    /// Parsed JSON body; `None` when the body is empty or not declared JSON.
    pub fn json_body(&self) -> VmwareResult<Option<Value>> {
        if !self.is_json() || self.text.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&self.text).map(Some).map_err(|e| {
            let head: String = self.text.chars().take(500).collect();
            VmwareError::parse(format!("JSON parse error: {e}; body: {head}"))
        })
    }
}

/// Anything that can carry a request to a vCenter and bring back the response.
#[async_trait]
pub trait RestTransport: Send + Sync {
    /// Scheme + authority prefix, e.g. `https://vcenter.lab.local`.
    fn base_url(&self) -> &str;

    async fn request(&self, req: RestRequest) -> VmwareResult<RestResponse>;
}

#[cfg(test)]
pub(crate) mod fake {
    //! Scripted in-memory transport used by the reconciler tests.

    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    pub const BASE: &str = "https://vcenter.test";

    /// Replays queued responses in order and records every request.
    #[derive(Default)]
    pub struct ScriptedTransport {
        replies: Mutex<VecDeque<VmwareResult<RestResponse>>>,
        seen: Mutex<Vec<RestRequest>>,
    }

    impl ScriptedTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reply(self, resp: RestResponse) -> Self {
            self.replies.lock().unwrap().push_back(Ok(resp));
            self
        }

        pub fn fail(self, err: VmwareError) -> Self {
            self.replies.lock().unwrap().push_back(Err(err));
            self
        }

        pub fn requests(&self) -> Vec<RestRequest> {
            self.seen.lock().unwrap().clone()
        }

        pub fn methods(&self) -> Vec<HttpMethod> {
            self.requests().iter().map(|r| r.method).collect()
        }

        pub fn remaining(&self) -> usize {
            self.replies.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl RestTransport for ScriptedTransport {
        fn base_url(&self) -> &str {
            BASE
        }

        async fn request(&self, req: RestRequest) -> VmwareResult<RestResponse> {
            let what = format!("{} {}", req.method, req.url);
            self.seen.lock().unwrap().push(req);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| panic!("unexpected request: {what}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_body_requires_json_content_type() {
        let resp = RestResponse {
            status: 200,
            content_type: Some("text/plain".into()),
            text: "{\"a\":1}".into(),
        };
        assert_eq!(resp.json_body().unwrap(), None);

        let resp = RestResponse {
            status: 200,
            content_type: Some("application/json; charset=utf-8".into()),
            text: "{\"a\":1}".into(),
        };
        assert_eq!(resp.json_body().unwrap(), Some(json!({"a": 1})));
    }

    #[test]
    fn empty_body_is_none() {
        assert_eq!(RestResponse::empty(204).json_body().unwrap(), None);
        assert!(RestResponse::empty(204).is_success());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let resp = RestResponse {
            status: 200,
            content_type: Some("application/json".into()),
            text: "{not json".into(),
        };
        let err = resp.json_body().unwrap_err();
        assert_eq!(err.kind, crate::error::VmwareErrorKind::ParseError);
    }
}
