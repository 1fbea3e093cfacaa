//! # Sync Protocol Client
//!
//! Drives fetch, create and update exchanges between a [`Session`] and the remote store.
//!
//! ```text
//! Unsaved -> Loading -> { Loaded, AccessDenied, NotFound, Error }
//!         -> Saving  -> { Saved, Conflict, AccessDenied, Error }
//! ```
//!
//! ## Passwords
//!
//! A 401 is never an immediate failure: the client hands back a prompt value
//! ([`FetchOutcome::PasswordRequired`] / [`SaveOutcome::PasswordRequired`]) and the caller
//! answers it through [`SyncClient::fetch_with_password`] / [`SyncClient::resume_update`].
//! Answering with nothing (or whitespace) abandons the operation.
//!
//! A fetch that is refused *after* a password was presented (401 again, or 403) ends the
//! load as `AccessDenied` without asking again.
//!
//! ## Conflicts
//!
//! Updates carry the revision they would create. If the store already has that revision or
//! later it answers 409, and the client reports [`DtError::Conflict`] without touching the
//! session's revision. Overwriting is a separate, explicitly confirmed step
//! ([`SyncClient::request_overwrite`] / [`SyncClient::overwrite`]).
//!
//! ## Stale Responses
//!
//! Fetches are split into [`SyncClient::begin_fetch`] and [`SyncClient::apply_fetch`] so a
//! caller driving them asynchronously can let a newer load supersede an older one; a
//! superseded response yields [`FetchOutcome::Discarded`].

use crate::codec::link::validate_remote_id;
use crate::codec::remote::RemoteDocument;
use crate::codec::wire::WirePayload;
use crate::decision::Pending;
use crate::error::{DtError, Result, ValidationError};
use crate::passwords::prompt_answer;
use crate::protocol::{
    document_path, Request, Response, Transport, TransportError, HEADER_CONTENT_ENCODING,
    HEADER_CONTENT_TYPE, HEADER_MODIFY_PASSWORD, HEADER_OPEN_PASSWORD, HEADER_PASSWORD,
    HEADER_REVISION,
};
use crate::session::{LoadTicket, SaveTicket, Session, SyncState};
use chrono::{DateTime, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use tracing::{debug, info, warn};

pub const DEFAULT_COMPRESS_THRESHOLD: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    pub id: String,
    pub revision: u64,
    pub updated: Option<DateTime<Utc>>,
    pub protected: bool,
}

/// The store wants a password before it will return the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordPrompt {
    ticket: LoadTicket,
}

impl PasswordPrompt {
    pub fn id(&self) -> &str {
        &self.ticket.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Loaded(LoadSummary),
    PasswordRequired(PasswordPrompt),
    /// The session moved on to another load; nothing was applied.
    Discarded,
}

/// A fetch that has been started but whose response has not been applied.
#[derive(Debug, Clone)]
pub struct PendingFetch {
    ticket: LoadTicket,
    request: Request,
    password: Option<String>,
}

impl PendingFetch {
    pub fn id(&self) -> &str {
        &self.ticket.id
    }
}

/// The store wants a (different) password before it will accept the update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePrompt {
    ticket: SaveTicket,
    revision: u64,
    /// A password was presented and refused.
    pub rejected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Created { id: String },
    Updated { id: String, revision: u64 },
    /// Nothing changed since the last save; no request was sent.
    NoChanges,
    PasswordRequired(UpdatePrompt),
    /// A password prompt was abandoned; the session is unchanged.
    NotUpdated,
    Discarded,
}

/// Confirmed intent to overwrite a later remote revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overwrite {
    pub id: String,
}

pub struct SyncClient<T: Transport> {
    transport: T,
    compress_threshold: usize,
}

impl<T: Transport> SyncClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            compress_threshold: DEFAULT_COMPRESS_THRESHOLD,
        }
    }

    /// Request bodies larger than `bytes` are gzip-compressed.
    pub fn with_compress_threshold(mut self, bytes: usize) -> Self {
        self.compress_threshold = bytes;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // --- fetch ---

    pub fn fetch(&self, session: &mut Session, id: &str) -> Result<FetchOutcome> {
        let pending = self.begin_fetch(session, id)?;
        let result = self.transport.send(&pending.request);
        self.apply_fetch(session, pending, result)
    }

    /// Starts a load: bumps the session generation and builds the request.
    pub fn begin_fetch(&self, session: &mut Session, id: &str) -> Result<PendingFetch> {
        validate_remote_id(id)?;
        // credentials only belong to the document they were accepted for
        let password = if session.remote_id() == Some(id) {
            session.fetch_credential().map(str::to_string)
        } else {
            None
        };
        let ticket = session.begin_load(id);
        Ok(PendingFetch {
            request: fetch_request(id, password.as_deref()),
            ticket,
            password,
        })
    }

    /// Sends a started fetch. Does not touch any session.
    pub fn send_fetch(&self, pending: &PendingFetch) -> std::result::Result<Response, TransportError> {
        self.transport.send(&pending.request)
    }

    pub fn apply_fetch(
        &self,
        session: &mut Session,
        pending: PendingFetch,
        result: std::result::Result<Response, TransportError>,
    ) -> Result<FetchOutcome> {
        let PendingFetch {
            ticket, password, ..
        } = pending;

        if !session.is_current(ticket.generation) {
            warn!(id = %ticket.id, "fetch superseded by a newer load");
            return Ok(FetchOutcome::Discarded);
        }

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                session.abort_load(&ticket, SyncState::Error);
                return Err(DtError::Transport(e.to_string()));
            }
        };
        debug!(id = %ticket.id, status = response.status, "fetch response");

        match response.status {
            200 => {
                let doc = match RemoteDocument::parse(&response.body) {
                    Ok(doc) => doc,
                    Err(e) => {
                        session.abort_load(&ticket, SyncState::Error);
                        return Err(e.into());
                    }
                };
                let summary = LoadSummary {
                    id: ticket.id.clone(),
                    revision: doc.revision.unwrap_or(1),
                    updated: doc.updated,
                    protected: doc.protected,
                };
                session.complete_load(&ticket, doc, password);
                Ok(FetchOutcome::Loaded(summary))
            }
            401 if password.is_none() => {
                info!(id = %ticket.id, "password required to open");
                Ok(FetchOutcome::PasswordRequired(PasswordPrompt { ticket }))
            }
            401 => {
                session.abort_load(&ticket, SyncState::AccessDenied);
                Err(DtError::Unauthorized)
            }
            403 => {
                session.abort_load(&ticket, SyncState::AccessDenied);
                Err(DtError::Forbidden)
            }
            404 => {
                session.abort_load(&ticket, SyncState::NotFound);
                Err(DtError::NotFound(ticket.id.clone()))
            }
            status => {
                session.abort_load(&ticket, SyncState::Error);
                Err(DtError::Http {
                    status,
                    reason: response.reason_phrase(),
                })
            }
        }
    }

    /// Answers a fetch password prompt. `None` or a blank answer abandons the load.
    pub fn fetch_with_password(
        &self,
        session: &mut Session,
        prompt: PasswordPrompt,
        answer: Option<String>,
    ) -> Result<FetchOutcome> {
        let ticket = prompt.ticket;
        let Some(password) = prompt_answer(answer) else {
            if session.abort_load(&ticket, SyncState::AccessDenied) {
                info!(id = %ticket.id, "load abandoned at password prompt");
                return Err(DtError::Unauthorized);
            }
            return Ok(FetchOutcome::Discarded);
        };

        let pending = PendingFetch {
            request: fetch_request(&ticket.id, Some(&password)),
            ticket,
            password: Some(password),
        };
        if !session.is_current(pending.ticket.generation) {
            return Ok(FetchOutcome::Discarded);
        }
        let result = self.transport.send(&pending.request);
        self.apply_fetch(session, pending, result)
    }

    // --- create / update ---

    /// Creates a remote copy when there is none, otherwise updates it.
    pub fn save(&self, session: &mut Session) -> Result<SaveOutcome> {
        if session.is_unsaved() {
            self.create(session)
        } else {
            self.update(session)
        }
    }

    pub fn create(&self, session: &mut Session) -> Result<SaveOutcome> {
        let request = self.write_request(session, None)?;
        let ticket = session.begin_save();
        let response = self.send_save(session, ticket, &request)?;

        if response.status != 200 {
            return Err(self.save_failure(session, ticket, response, None));
        }

        let (id, hash) = parse_write_response(&response.body)?;
        if !session.complete_create(ticket, id.clone(), hash) {
            return Ok(SaveOutcome::Discarded);
        }
        Ok(SaveOutcome::Created { id })
    }

    /// Updates the existing remote copy. Never touches the network when nothing changed.
    pub fn update(&self, session: &mut Session) -> Result<SaveOutcome> {
        if session.is_unsaved() {
            return Err(ValidationError::NoRemoteCopy.into());
        }
        if !session.is_dirty() {
            debug!("update skipped, session not dirty");
            return Ok(SaveOutcome::NoChanges);
        }

        let password = session.update_credential().map(str::to_string);
        let revision = session.revision() + 1;
        let ticket = session.begin_save();
        self.send_update(session, ticket, revision, password)
    }

    /// Answers an update password prompt. `None` or a blank answer drops the update.
    pub fn resume_update(
        &self,
        session: &mut Session,
        prompt: UpdatePrompt,
        answer: Option<String>,
    ) -> Result<SaveOutcome> {
        if !session.is_current(prompt.ticket.generation) {
            return Ok(SaveOutcome::Discarded);
        }
        match prompt_answer(answer) {
            Some(password) => {
                self.send_update(session, prompt.ticket, prompt.revision, Some(password))
            }
            None => {
                session.mark_state(prompt.ticket, prompt.ticket.prior);
                info!("update abandoned at password prompt");
                Ok(SaveOutcome::NotUpdated)
            }
        }
    }

    /// Asks the user to confirm overwriting after a conflict.
    pub fn request_overwrite(
        &self,
        session: &Session,
    ) -> std::result::Result<Pending<Overwrite>, ValidationError> {
        let id = session.remote_id().ok_or(ValidationError::NoRemoteCopy)?;
        if session.state() != SyncState::Conflict {
            return Err(ValidationError::NoConflict);
        }
        Ok(Pending::new(
            "Remote DataTemplate is a Later Revision. Overwrite it with your version?",
            Overwrite { id: id.to_string() },
        ))
    }

    /// Overwrites a later remote revision: reads the remote revision (without applying any
    /// content) and retries the update one past it.
    pub fn overwrite(&self, session: &mut Session, pending: Pending<Overwrite>) -> Result<SaveOutcome> {
        let id = pending.action.id;
        if session.remote_id() != Some(id.as_str()) {
            return Err(ValidationError::NoConflict.into());
        }

        let password = session.fetch_credential().map(str::to_string);
        let response = self
            .transport
            .send(&fetch_request(&id, password.as_deref()))
            .map_err(|e| DtError::Transport(e.to_string()))?;
        let remote_revision = match response.status {
            200 => RemoteDocument::parse(&response.body)?.revision.unwrap_or(1),
            401 => return Err(DtError::Unauthorized),
            403 => return Err(DtError::Forbidden),
            404 => return Err(DtError::NotFound(id)),
            status => {
                return Err(DtError::Http {
                    status,
                    reason: response.reason_phrase(),
                })
            }
        };

        warn!(%id, remote_revision, "overwriting later remote revision");
        let password = session.update_credential().map(str::to_string);
        let ticket = session.begin_save();
        self.send_update(session, ticket, remote_revision + 1, password)
    }

    fn send_update(
        &self,
        session: &mut Session,
        ticket: SaveTicket,
        revision: u64,
        password: Option<String>,
    ) -> Result<SaveOutcome> {
        let id = session
            .remote_id()
            .map(str::to_string)
            .ok_or(ValidationError::NoRemoteCopy)?;

        let mut request = self
            .write_request(session, Some(&id))?
            .query("rev", revision)
            .header(HEADER_REVISION, revision.to_string())
            .header_opt(HEADER_PASSWORD, password.as_deref());
        if let Some(protection) = session.pending_protection() {
            request = request
                .header_opt(HEADER_OPEN_PASSWORD, protection.open())
                .header_opt(HEADER_MODIFY_PASSWORD, protection.modify());
        }

        let response = self.send_save(session, ticket, &request)?;
        match response.status {
            200 => {
                let (_, hash) = parse_write_response(&response.body)?;
                if !session.complete_update(ticket, revision, hash, password) {
                    return Ok(SaveOutcome::Discarded);
                }
                Ok(SaveOutcome::Updated { id, revision })
            }
            401 => {
                info!(%id, "password required to update");
                Ok(SaveOutcome::PasswordRequired(UpdatePrompt {
                    ticket,
                    revision,
                    rejected: password.is_some(),
                }))
            }
            _ => Err(self.save_failure(session, ticket, response, Some(&id))),
        }
    }

    fn send_save(&self, session: &mut Session, ticket: SaveTicket, request: &Request) -> Result<Response> {
        self.transport.send(request).map_err(|e| {
            session.mark_state(ticket, SyncState::Error);
            DtError::Transport(e.to_string())
        })
    }

    fn save_failure(
        &self,
        session: &mut Session,
        ticket: SaveTicket,
        response: Response,
        id: Option<&str>,
    ) -> DtError {
        match response.status {
            409 => {
                session.mark_state(ticket, SyncState::Conflict);
                warn!(local_revision = session.revision(), "remote DataTemplate is a later revision");
                DtError::Conflict {
                    local_revision: session.revision(),
                }
            }
            401 => {
                session.mark_state(ticket, SyncState::AccessDenied);
                DtError::Unauthorized
            }
            403 => {
                session.mark_state(ticket, SyncState::AccessDenied);
                DtError::Forbidden
            }
            404 if id.is_some() => {
                session.mark_state(ticket, SyncState::NotFound);
                DtError::NotFound(id.map(str::to_string).unwrap_or_default())
            }
            status => {
                session.mark_state(ticket, SyncState::Error);
                DtError::Http {
                    status,
                    reason: response.reason_phrase(),
                }
            }
        }
    }

    fn write_request(&self, session: &Session, id: Option<&str>) -> Result<Request> {
        let json = WirePayload::encode(&session.snapshot()).to_json()?;
        let request = Request::post(document_path(id)).header(HEADER_CONTENT_TYPE, "application/json");

        if json.len() > self.compress_threshold {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(json.as_bytes())?;
            let body = encoder.finish()?;
            debug!(raw = json.len(), compressed = body.len(), "request body compressed");
            Ok(request.header(HEADER_CONTENT_ENCODING, "gzip").body(body))
        } else {
            Ok(request.body(json.into_bytes()))
        }
    }
}

fn fetch_request(id: &str, password: Option<&str>) -> Request {
    Request::get(document_path(Some(id))).header_opt(HEADER_PASSWORD, password)
}

/// `"{id}:{hash}"` or just `"{id}"`, possibly with a trailing newline.
fn parse_write_response(body: &str) -> Result<(String, Option<String>)> {
    let body = body.trim();
    let (id, hash) = match body.split_once(':') {
        Some((id, hash)) => (id, Some(hash.to_string()).filter(|h| !h.is_empty())),
        None => (body, None),
    };
    validate_remote_id(id)?;
    Ok((id.to_string(), hash))
}
