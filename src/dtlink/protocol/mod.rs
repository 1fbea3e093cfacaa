//! # Remote Store Protocol
//!
//! The sync client talks to the store through the [`Transport`] trait: hand it a
//! [`Request`], get back a [`Response`] or a [`TransportError`]. Two implementations exist:
//!
//! - [`http::HttpTransport`]: the real thing, over HTTP with a client-side timeout
//! - [`memory::MemoryRemote`]: an in-process store with the same contract, for tests
//!
//! ## Endpoints
//!
//! ```text
//! GET  /document/{id}               fetch        200 body | 401 | 403 | 404 | 5xx
//! POST /document                    create       200 "{id}"
//! POST /document/{id}?rev={n}       update       200 "{id}:{hash}" or "{id}" | 401 | 409
//! ```
//!
//! ## Headers
//!
//! | Header                 | Meaning                                         |
//! |------------------------|-------------------------------------------------|
//! | `X-Dt-Password`        | Password presented to read or write             |
//! | `X-Dt-Open-Password`   | Open password to set with this update           |
//! | `X-Dt-Modify-Password` | Modify password to set with this update         |
//! | `X-Dt-Revision`        | Revision this update will become                |
//! | `Content-Encoding`     | `gzip` when the body was compressed             |

pub mod http;
pub mod memory;
pub mod status;

use std::fmt;
use thiserror::Error;

pub const HEADER_PASSWORD: &str = "X-Dt-Password";
pub const HEADER_OPEN_PASSWORD: &str = "X-Dt-Open-Password";
pub const HEADER_MODIFY_PASSWORD: &str = "X-Dt-Modify-Password";
pub const HEADER_REVISION: &str = "X-Dt-Revision";
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
pub const HEADER_CONTENT_ENCODING: &str = "Content-Encoding";

const SECRET_HEADERS: [&str; 3] = [HEADER_PASSWORD, HEADER_OPEN_PASSWORD, HEADER_MODIFY_PASSWORD];

pub fn document_path(id: Option<&str>) -> String {
    match id {
        Some(id) => format!("/document/{}", id),
        None => "/document".to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Request {
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    /// Adds the header only when a value is given.
    pub fn header_opt(self, name: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.header(name, v),
            None => self,
        }
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Header lookup, case-insensitive.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: Vec<(&str, &str)> = self
            .headers
            .iter()
            .map(|(k, v)| {
                if SECRET_HEADERS.iter().any(|s| k.eq_ignore_ascii_case(s)) {
                    (k.as_str(), "<redacted>")
                } else {
                    (k.as_str(), v.as_str())
                }
            })
            .collect();
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("headers", &headers)
            .field("body_len", &self.body.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    /// Reason phrase as supplied by the transport, if any.
    pub reason: Option<String>,
    pub body: String,
}

impl Response {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            reason: None,
            body: body.into(),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The transport's reason phrase, or the standard one for the status code.
    pub fn reason_phrase(&self) -> String {
        match &self.reason {
            Some(r) if !r.trim().is_empty() => r.clone(),
            _ => status::reason_phrase(self.status).to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Request Timed Out")]
    Timeout,
    #[error("Network Error: {0}")]
    Network(String),
}

pub trait Transport {
    fn send(&self, request: &Request) -> Result<Response, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: &Request) -> Result<Response, TransportError> {
        (**self).send(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let req = Request::post(document_path(Some("abc")))
            .query("rev", 3)
            .header(HEADER_REVISION, "3")
            .header_opt(HEADER_PASSWORD, None)
            .body(b"{}".to_vec());
        assert_eq!(req.path, "/document/abc");
        assert_eq!(req.query_value("rev"), Some("3"));
        assert_eq!(req.header_value("x-dt-revision"), Some("3"));
        assert_eq!(req.header_value(HEADER_PASSWORD), None);
    }

    #[test]
    fn test_debug_redacts_passwords() {
        let req = Request::get("/document/abc").header(HEADER_PASSWORD, "hunter2");
        let printed = format!("{:?}", req);
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("X-Dt-Password"));
    }

    #[test]
    fn test_reason_phrase_fallback() {
        assert_eq!(Response::new(413, "").reason_phrase(), "Request Entity Too Large");
        assert_eq!(
            Response::new(500, "").with_reason("Boom").reason_phrase(),
            "Boom"
        );
        assert_eq!(Response::new(500, "").with_reason("").reason_phrase(), "Internal Server Error");
    }
}
