use super::{Method, Request, Response, Transport, TransportError};
use crate::error::{DtError, Result};
use reqwest::blocking::Client;
use reqwest::Url;
use std::time::Duration;
use tracing::debug;

/// Blocking HTTP transport. Every request is bounded by the configured timeout.
pub struct HttpTransport {
    client: Client,
    base: Url,
}

impl HttpTransport {
    pub fn new(server_url: &str, timeout: Duration) -> Result<Self> {
        let mut base = Url::parse(server_url)
            .map_err(|e| DtError::Config(format!("Invalid server URL '{}': {}", server_url, e)))?;
        // join() replaces the last path segment unless the base ends with '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("dtlink/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DtError::Transport(e.to_string()))?;

        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url_for(&self, request: &Request) -> std::result::Result<Url, TransportError> {
        let mut url = self
            .base
            .join(request.path.trim_start_matches('/'))
            .map_err(|e| TransportError::Network(e.to_string()))?;
        if !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in &request.query {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &Request) -> std::result::Result<Response, TransportError> {
        let url = self.url_for(request)?;
        debug!(method = %request.method, %url, "sending request");

        let mut builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url).body(request.body.clone()),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        let reason = status.canonical_reason().map(str::to_string);
        let body = response.text().map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Network(e.to_string())
            }
        })?;
        debug!(status = status.as_u16(), bytes = body.len(), "response received");

        Ok(Response {
            status: status.as_u16(),
            reason,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_building() {
        let transport = HttpTransport::new("https://dt.example.com/jfx", Duration::from_secs(1)).unwrap();
        assert_eq!(transport.base_url().as_str(), "https://dt.example.com/jfx/");

        let req = Request::post("/document/abc").query("rev", 2);
        let url = transport.url_for(&req).unwrap();
        assert_eq!(url.as_str(), "https://dt.example.com/jfx/document/abc?rev=2");

        let url = transport.url_for(&Request::get("/document/abc")).unwrap();
        assert_eq!(url.as_str(), "https://dt.example.com/jfx/document/abc");
    }

    #[test]
    fn test_invalid_server_url() {
        assert!(matches!(
            HttpTransport::new("not a url", Duration::from_secs(1)),
            Err(DtError::Config(_))
        ));
    }
}
