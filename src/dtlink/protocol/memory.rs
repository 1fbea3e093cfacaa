//! In-memory remote store.
//!
//! Implements the store's side of the protocol well enough to drive the sync client without
//! a network: id assignment, revision checks, open/modify password gating, gzip request
//! bodies, and the stored YAML document format. Faults can be queued to simulate a dead
//! network or an arbitrary HTTP status.

use super::status::reason_phrase;
use super::{
    Method, Request, Response, Transport, TransportError, HEADER_CONTENT_ENCODING,
    HEADER_MODIFY_PASSWORD, HEADER_OPEN_PASSWORD, HEADER_PASSWORD, HEADER_REVISION,
};
use crate::codec::export::{write_dt_block, ExportStyle};
use crate::codec::link::validate_remote_id;
use crate::codec::wire::WirePayload;
use crate::model::DataTemplate;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use flate2::read::GzDecoder;
use sha2::{Digest, Sha256};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::io::Read;
use tracing::debug;
use uuid::Uuid;

/// A failure to produce instead of handling the next request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    Timeout,
    Network,
    Status(u16),
}

#[derive(Debug, Clone)]
struct StoredDocument {
    body: String,
    revision: u64,
    open_hash: Option<String>,
    modify_hash: Option<String>,
}

/// Uses `RefCell` since the sync client is single-threaded and `Transport::send` takes `&self`.
#[derive(Default)]
pub struct MemoryRemote {
    documents: RefCell<HashMap<String, StoredDocument>>,
    requests: RefCell<Vec<Request>>,
    faults: RefCell<VecDeque<Fault>>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a fault for the next request. Faults are consumed in order.
    pub fn inject(&self, fault: Fault) {
        self.faults.borrow_mut().push_back(fault);
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.borrow().clone()
    }

    pub fn last_request(&self) -> Option<Request> {
        self.requests.borrow().last().cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.documents.borrow().contains_key(id)
    }

    pub fn revision(&self, id: &str) -> Option<u64> {
        self.documents.borrow().get(id).map(|d| d.revision)
    }

    /// The stored YAML, exactly as a fetch would return it.
    pub fn document(&self, id: &str) -> Option<String> {
        self.documents.borrow().get(id).map(|d| d.body.clone())
    }

    /// Stores a document directly, bypassing the protocol.
    pub fn seed(
        &self,
        id: &str,
        dt: &DataTemplate,
        revision: u64,
        open: Option<&str>,
        modify: Option<&str>,
    ) {
        let open_hash = open.map(|p| password_hash(id, p));
        let modify_hash = modify.map(|p| password_hash(id, p));
        let doc = build_document(dt, revision, open_hash, modify_hash);
        self.documents.borrow_mut().insert(id.to_string(), doc);
    }

    /// Simulates another client saving a new revision.
    pub fn bump_revision(&self, id: &str) -> Option<u64> {
        let mut documents = self.documents.borrow_mut();
        let doc = documents.get_mut(id)?;
        doc.revision += 1;
        doc.body = doc
            .body
            .replacen(&format!("\nrevision: {}\n", doc.revision - 1), &format!("\nrevision: {}\n", doc.revision), 1);
        Some(doc.revision)
    }

    fn handle(&self, request: &Request) -> Response {
        let id = match request.path.strip_prefix("/document") {
            Some("") => None,
            Some(rest) => match rest.strip_prefix('/') {
                Some(id) if validate_remote_id(id).is_ok() => Some(id.to_string()),
                _ => return status_response(404),
            },
            None => return status_response(404),
        };

        match (request.method, id) {
            (Method::Get, Some(id)) => self.handle_fetch(&id, request),
            (Method::Get, None) => status_response(404),
            (Method::Post, id) => self.handle_write(id, request),
        }
    }

    fn handle_fetch(&self, id: &str, request: &Request) -> Response {
        let documents = self.documents.borrow();
        let Some(doc) = documents.get(id) else {
            return status_response(404);
        };

        if let Some(open_hash) = &doc.open_hash {
            let Some(presented) = request.header_value(HEADER_PASSWORD) else {
                return status_response(401);
            };
            let presented = password_hash(id, presented);
            let accepted = presented == *open_hash || doc.modify_hash.as_ref() == Some(&presented);
            if !accepted {
                return status_response(403);
            }
        }

        Response::new(200, doc.body.clone()).with_reason("OK")
    }

    fn handle_write(&self, id: Option<String>, request: &Request) -> Response {
        let payload = match read_body(request) {
            Some(payload) => payload,
            None => return status_response(400),
        };
        let dt = match WirePayload::from_json(&payload).and_then(|p| p.decode()) {
            Ok(dt) => dt,
            Err(_) => return status_response(400),
        };
        let revision = match request.header_value(HEADER_REVISION) {
            Some(value) => match value.trim().parse::<u64>() {
                Ok(rev) => rev,
                Err(_) => return status_response(400),
            },
            None => 1,
        };

        let is_create = id.is_none();
        let id = id.unwrap_or_else(new_id);
        let mut documents = self.documents.borrow_mut();

        let (mut open_hash, mut modify_hash) = (None, None);
        if let Some(existing) = documents.get(&id) {
            // the revision is only checked for callers allowed to modify
            if let Some(gate) = existing.modify_hash.as_ref().or(existing.open_hash.as_ref()) {
                match request.header_value(HEADER_PASSWORD) {
                    Some(p) if password_hash(&id, p) == *gate => {}
                    _ => return status_response(401),
                }
            }
            if revision <= existing.revision {
                return status_response(409);
            }
            open_hash = existing.open_hash.clone();
            modify_hash = existing.modify_hash.clone();
        }

        let new_open = request.header_value(HEADER_OPEN_PASSWORD);
        let new_modify = request.header_value(HEADER_MODIFY_PASSWORD);
        if new_open.is_some() || new_modify.is_some() {
            open_hash = new_open.map(|p| password_hash(&id, p));
            modify_hash = new_modify.map(|p| password_hash(&id, p));
        }

        let doc = build_document(&dt, revision, open_hash, modify_hash);
        let hash = document_hash(&doc.body);
        debug!(%id, revision, "stored document");
        documents.insert(id.clone(), doc);

        let body = if is_create {
            format!("{}\r\n", id)
        } else {
            format!("{}:{}\r\n", id, hash)
        };
        Response::new(200, body).with_reason("OK")
    }
}

impl Transport for MemoryRemote {
    fn send(&self, request: &Request) -> Result<Response, TransportError> {
        self.requests.borrow_mut().push(request.clone());

        let fault = self.faults.borrow_mut().pop_front();
        match fault {
            Some(Fault::Timeout) => Err(TransportError::Timeout),
            Some(Fault::Network) => Err(TransportError::Network("connection refused".to_string())),
            Some(Fault::Status(status)) => Ok(status_response(status)),
            None => Ok(self.handle(request)),
        }
    }
}

fn status_response(status: u16) -> Response {
    Response::new(status, format!("{} {}\r\n", status, reason_phrase(status)))
}

fn read_body(request: &Request) -> Option<String> {
    let gzipped = request
        .header_value(HEADER_CONTENT_ENCODING)
        .is_some_and(|v| v.eq_ignore_ascii_case("gzip"));
    if gzipped {
        let mut text = String::new();
        GzDecoder::new(request.body.as_slice())
            .read_to_string(&mut text)
            .ok()?;
        Some(text)
    } else {
        String::from_utf8(request.body.clone()).ok()
    }
}

fn build_document(
    dt: &DataTemplate,
    revision: u64,
    open_hash: Option<String>,
    modify_hash: Option<String>,
) -> StoredDocument {
    let mut body = String::new();
    write_dt_block(&mut body, dt, ExportStyle::Plain);
    body.push_str(&format!("\nrevision: {}\n", revision));
    let hash = format!("{:x}", Sha256::digest(body.as_bytes()));
    body.push_str(&format!("dt_hash: \"{}\"\n", hash));
    if let Some(h) = &open_hash {
        body.push_str(&format!("dt_password: \"{}\"\n", h));
    }
    if let Some(h) = &modify_hash {
        body.push_str(&format!("dt_mpassword: \"{}\"\n", h));
    }
    body.push_str(&format!("updated: \"{}\"\n", Utc::now().timestamp()));

    StoredDocument {
        body,
        revision,
        open_hash,
        modify_hash,
    }
}

fn document_hash(body: &str) -> String {
    body.lines()
        .find_map(|l| l.strip_prefix("dt_hash: "))
        .map(|h| h.trim_matches('"').to_string())
        .unwrap_or_default()
}

fn password_hash(id: &str, password: &str) -> String {
    format!("{:x}", Sha256::digest(format!("{}:{}", id, password).as_bytes()))
}

/// Twelve url-safe characters.
fn new_id() -> String {
    let digest = Sha256::digest(Uuid::new_v4().as_bytes());
    URL_SAFE_NO_PAD.encode(&digest[..9])
}
