//! The collection-server HTTP contract.
//!
//! Four endpoints, all plain text:
//!
//! - `POST /check-in-handler/` form `password`, `deviceName` — the exact body
//!   `"Already checked in"` is a sentinel; any other 2xx text means accepted.
//! - `POST /sensor-handler/` form `password`, `timeStamp` — comma-separated
//!   directive list.
//! - `POST /reload-csv/` multipart `password`, `fileName`, `uploadFile` —
//!   post-outage bulk re-sync; the response body is ignored.
//! - `GET /device-status-handler/?deviceName=` — comma-separated directives.
//!
//! [`ServerApi`] is the seam the state machine is tested through;
//! [`HttpServer`] is the production implementation. Every request carries a
//! bounded timeout so a stalled server reads as a connection failure.

use std::time::Duration;

use watchpost_core::types::DeviceName;

use crate::directive::{parse_directives, DirectiveSet};
use crate::error::SyncError;

/// Exact sentinel body from the check-in handler.
pub const ALREADY_CHECKED_IN: &str = "Already checked in";

/// Result of a check-in attempt that reached the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckInOutcome {
    /// The server registered (or re-registered) this device name.
    Accepted,
    /// The name is taken; the device continues purely locally.
    AlreadyCheckedIn,
}

/// What the sync client needs from the remote server.
pub trait ServerApi {
    fn check_in(&self, name: &DeviceName, password: &str) -> Result<CheckInOutcome, SyncError>;

    /// Post one sensor timestamp (`name,date,time,movement`); returns the
    /// directives the server answered with.
    fn post_sample(&self, password: &str, time_stamp: &str) -> Result<DirectiveSet, SyncError>;

    /// Bulk re-upload of the full active ledger after a reconnection.
    fn upload_ledger(
        &self,
        password: &str,
        file_name: &str,
        content: &str,
    ) -> Result<(), SyncError>;

    /// Poll for directives while not recording.
    fn device_status(&self, name: &DeviceName) -> Result<DirectiveSet, SyncError>;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// Blocking HTTP client over the server contract.
pub struct HttpServer {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpServer {
    /// `base_url` is `http(s)://host:port`; `timeout` bounds every request
    /// (connect and read) — the recommended default is the poll interval.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        // A zero poll interval must not mean "no timeout".
        let timeout = timeout.max(Duration::from_secs(1));
        Self {
            base_url: base_url.into(),
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn read_body(endpoint: &str, response: ureq::Response) -> Result<String, SyncError> {
        response.into_string().map_err(|e| SyncError::Response {
            endpoint: endpoint.to_string(),
            source: e,
        })
    }
}

impl ServerApi for HttpServer {
    fn check_in(&self, name: &DeviceName, password: &str) -> Result<CheckInOutcome, SyncError> {
        let endpoint = self.url("/check-in-handler/");
        let response = self
            .agent
            .post(&endpoint)
            .send_form(&[("password", password), ("deviceName", &name.0)])
            .map_err(|e| request_err(&endpoint, e))?;
        let body = Self::read_body(&endpoint, response)?;
        if body.trim() == ALREADY_CHECKED_IN {
            Ok(CheckInOutcome::AlreadyCheckedIn)
        } else {
            Ok(CheckInOutcome::Accepted)
        }
    }

    fn post_sample(&self, password: &str, time_stamp: &str) -> Result<DirectiveSet, SyncError> {
        let endpoint = self.url("/sensor-handler/");
        let response = self
            .agent
            .post(&endpoint)
            .send_form(&[("password", password), ("timeStamp", time_stamp)])
            .map_err(|e| request_err(&endpoint, e))?;
        let body = Self::read_body(&endpoint, response)?;
        Ok(parse_directives(&body))
    }

    fn upload_ledger(
        &self,
        password: &str,
        file_name: &str,
        content: &str,
    ) -> Result<(), SyncError> {
        let endpoint = self.url("/reload-csv/");
        let boundary = format!("----watchpost-{:016x}", rand::random::<u64>());
        let body = multipart_body(&boundary, password, file_name, content);
        self.agent
            .post(&endpoint)
            .set(
                "Content-Type",
                &format!("multipart/form-data; boundary={boundary}"),
            )
            .send_bytes(body.as_bytes())
            .map_err(|e| request_err(&endpoint, e))?;
        // Response body is ignored by the state machine.
        Ok(())
    }

    fn device_status(&self, name: &DeviceName) -> Result<DirectiveSet, SyncError> {
        let endpoint = self.url("/device-status-handler/");
        let response = self
            .agent
            .get(&endpoint)
            .query("deviceName", &name.0)
            .call()
            .map_err(|e| request_err(&endpoint, e))?;
        let body = Self::read_body(&endpoint, response)?;
        Ok(parse_directives(&body))
    }
}

fn request_err(endpoint: &str, source: ureq::Error) -> SyncError {
    SyncError::Request {
        endpoint: endpoint.to_string(),
        source: Box::new(source),
    }
}

/// Encode the three-part `multipart/form-data` body for `/reload-csv/`.
fn multipart_body(boundary: &str, password: &str, file_name: &str, content: &str) -> String {
    let mut body = String::new();
    body.push_str(&format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"password\"\r\n\r\n{password}\r\n"
    ));
    body.push_str(&format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"fileName\"\r\n\r\n{file_name}\r\n"
    ));
    body.push_str(&format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"uploadFile\"; \
         filename=\"{file_name}\"\r\nContent-Type: text/csv\r\n\r\n{content}\r\n"
    ));
    body.push_str(&format!("--{boundary}--\r\n"));
    body
}
