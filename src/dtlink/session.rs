//! # Session Model
//!
//! A [`Session`] is everything one editing instance knows: the dataset registry, the live
//! editor content of the active dataset, the shared template, and the bookkeeping needed to
//! keep a remote copy in sync (id, content hash, revision, credentials, dirty flag).
//!
//! ## Live Editor Content
//!
//! The registry holds the *stored* buffers of every dataset. The active dataset's current
//! text lives in the session's editor pair and is only written back into the registry when
//! the user switches away from it (or when [`Session::snapshot`] is taken). This mirrors how
//! an editor widget owns its text until asked for it.
//!
//! ## Generations
//!
//! Every load, and every pasted DataTemplate, bumps [`Session::generation`]. Network
//! completions carry the generation they were started under; a completion for an older
//! generation is dropped without touching the session.
//!
//! ## Dirty Tracking
//!
//! `dirty` is set by any change to a buffer, the template, or the dataset set, and cleared
//! only by a confirmed remote write (or by adopting a freshly fetched document).

use crate::codec::remote::RemoteDocument;
use crate::decision::{Decision, Pending};
use crate::error::ValidationError;
use crate::model::{BufferPair, DataTemplate};
use crate::passwords::ProtectRequest;
use crate::registry::{DatasetIndex, DatasetRegistry, Removal};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Where the session stands with respect to its remote copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    #[default]
    Unsaved,
    Loading,
    Loaded,
    AccessDenied,
    NotFound,
    Error,
    Saving,
    Saved,
    Conflict,
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SyncState::Unsaved => "unsaved",
            SyncState::Loading => "loading",
            SyncState::Loaded => "loaded",
            SyncState::AccessDenied => "access denied",
            SyncState::NotFound => "not found",
            SyncState::Error => "error",
            SyncState::Saving => "saving",
            SyncState::Saved => "saved",
            SyncState::Conflict => "conflict",
        };
        write!(f, "{}", s)
    }
}

/// What the user may do with the remote copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub can_update: bool,
    /// Only offered when the remote copy has no password yet.
    pub can_protect: bool,
}

/// Deferred removal of a non-blank dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveDataset {
    pub name: String,
}

/// Everything a presentation layer needs to draw the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub datasets: DatasetIndex,
    pub buffers: BufferPair,
    pub template: String,
    pub remote_id: Option<String>,
    pub revision: u64,
    pub updated: Option<DateTime<Utc>>,
    pub state: SyncState,
    pub dirty: bool,
    pub capabilities: Capabilities,
}

/// What a local copy remembers about its remote counterpart between runs.
///
/// Passwords are never part of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRecord {
    pub id: String,
    pub revision: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default)]
    pub protected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LoadTicket {
    pub(crate) generation: u64,
    pub(crate) id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SaveTicket {
    pub(crate) generation: u64,
    /// State to return to if the save is abandoned.
    pub(crate) prior: SyncState,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    registry: DatasetRegistry,
    editor: BufferPair,
    template: String,
    remote_id: Option<String>,
    content_hash: Option<String>,
    revision: u64,
    open_password: Option<String>,
    modify_password: Option<String>,
    pending_protection: Option<ProtectRequest>,
    dirty: bool,
    state: SyncState,
    capabilities: Capabilities,
    generation: u64,
    location: Option<String>,
    updated: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// A local, never-synced session holding `dt`. Not dirty.
    pub fn from_template(dt: DataTemplate) -> Self {
        let mut session = Self::new();
        session.adopt(dt);
        session
    }

    /// Local content that was never synced. Dirty from the start.
    pub fn unsaved(dt: DataTemplate) -> Self {
        let mut session = Self::from_template(dt);
        session.dirty = true;
        session
    }

    /// A session for content that was synced with `record` before. `dirty` says whether it
    /// changed since.
    pub fn linked(dt: DataTemplate, record: SyncRecord, dirty: bool) -> Self {
        let mut session = Self::from_template(dt);
        session.location = Some(record.id.clone());
        session.remote_id = Some(record.id);
        session.content_hash = record.hash;
        session.revision = record.revision;
        session.updated = record.updated;
        session.capabilities = Capabilities {
            can_update: true,
            can_protect: !record.protected,
        };
        session.state = SyncState::Loaded;
        session.dirty = dirty;
        session
    }

    /// `None` while the session has no remote copy.
    pub fn sync_record(&self) -> Option<SyncRecord> {
        let id = self.remote_id.clone()?;
        Some(SyncRecord {
            id,
            revision: self.revision,
            hash: self.content_hash.clone(),
            protected: !self.capabilities.can_protect,
            updated: self.updated,
        })
    }

    pub fn registry(&self) -> &DatasetRegistry {
        &self.registry
    }

    pub fn active_dataset_name(&self) -> &str {
        self.registry.active_name()
    }

    /// Live content of the active dataset.
    pub fn editor(&self) -> &BufferPair {
        &self.editor
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn remote_id(&self) -> Option<&str> {
        self.remote_id.as_deref()
    }

    pub fn content_hash(&self) -> Option<&str> {
        self.content_hash.as_deref()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn updated(&self) -> Option<DateTime<Utc>> {
        self.updated
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// No remote copy exists yet.
    pub fn is_unsaved(&self) -> bool {
        self.remote_id.is_none()
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The remote id the user is currently pointed at (the `?dt=` part of a link).
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// Write access was granted with a password.
    pub fn has_modify_access(&self) -> bool {
        self.modify_password.as_deref().is_some_and(|p| !p.is_empty())
    }

    pub fn pending_protection(&self) -> Option<&ProtectRequest> {
        self.pending_protection.as_ref()
    }

    pub fn edit_data(&mut self, text: impl Into<String>) {
        let text = text.into();
        if self.editor.data != text {
            self.editor.data = text;
            self.touch();
        }
    }

    pub fn edit_vars(&mut self, text: impl Into<String>) {
        let text = text.into();
        if self.editor.vars != text {
            self.editor.vars = text;
            self.touch();
        }
    }

    pub fn edit_template(&mut self, text: impl Into<String>) {
        let text = text.into();
        if self.template != text {
            self.template = text;
            self.touch();
        }
    }

    /// Adds an empty dataset and makes it active, keeping the current edits.
    pub fn add_dataset(&mut self, name: &str) -> Result<(), ValidationError> {
        self.registry.add(name)?;
        let live = self.editor.clone();
        self.editor = self.registry.switch_active(name, Some(live))?.clone();
        self.touch();
        debug!(dataset = name, "dataset added");
        Ok(())
    }

    /// Removes a dataset, asking first when it holds any content.
    pub fn remove_dataset(
        &mut self,
        name: &str,
    ) -> Result<Decision<Removal, RemoveDataset>, ValidationError> {
        let blank = if name == self.registry.active_name() {
            self.editor.is_blank()
        } else {
            self.registry
                .get(name)
                .ok_or_else(|| ValidationError::UnknownDataset(name.to_string()))?
                .buffers
                .is_blank()
        };
        if self.registry.len() == 1 {
            return Err(ValidationError::LastDatasetRemaining);
        }

        if blank {
            self.remove_now(name).map(Decision::Done)
        } else {
            Ok(Decision::confirm(
                format!("Are you sure Data Set '{}' should be deleted?", name),
                RemoveDataset {
                    name: name.to_string(),
                },
            ))
        }
    }

    pub fn confirm_remove(
        &mut self,
        pending: Pending<RemoveDataset>,
    ) -> Result<Removal, ValidationError> {
        self.remove_now(&pending.action.name)
    }

    fn remove_now(&mut self, name: &str) -> Result<Removal, ValidationError> {
        if name == self.registry.active_name() {
            let live = self.editor.clone();
            if let Some(dataset) = self.registry.get_mut(name) {
                dataset.buffers = live;
            }
        }
        let removal = self.registry.remove(name)?;
        if removal.active_changed {
            self.editor = self.registry.active().buffers.clone();
        }
        self.touch();
        debug!(dataset = name, "dataset removed");
        Ok(removal)
    }

    /// Makes `name` active. With `persist_current`, the live edits are written back into the
    /// previously active dataset first; without it they are discarded.
    pub fn switch_dataset(&mut self, name: &str, persist_current: bool) -> Result<(), ValidationError> {
        let live = persist_current.then(|| self.editor.clone());
        self.editor = self.registry.switch_active(name, live)?.clone();
        Ok(())
    }

    /// The full DataTemplate including live edits, ready to encode.
    pub fn snapshot(&self) -> DataTemplate {
        let mut registry = self.registry.clone();
        let active = registry.active_name().to_string();
        if let Some(dataset) = registry.get_mut(&active) {
            dataset.buffers = self.editor.clone();
        }
        DataTemplate::new(registry, self.template.clone())
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            datasets: self.registry.rebuild_index(),
            buffers: self.editor.clone(),
            template: self.template.clone(),
            remote_id: self.remote_id.clone(),
            revision: self.revision,
            updated: self.updated,
            state: self.state,
            dirty: self.dirty,
            capabilities: self.capabilities,
        }
    }

    /// Replaces the session with a pasted DataTemplate, asking first if there are unsaved edits.
    pub fn paste(&mut self, dt: DataTemplate) -> Decision<(), DataTemplate> {
        if self.dirty {
            return Decision::confirm(
                "Unsaved changes will be lost. Replace with the pasted DataTemplate?",
                dt,
            );
        }
        self.apply_pasted(dt);
        Decision::Done(())
    }

    pub fn confirm_paste(&mut self, pending: Pending<DataTemplate>) {
        self.apply_pasted(pending.action);
    }

    /// Pasted content has no remote identity and has not been saved anywhere.
    pub fn apply_pasted(&mut self, dt: DataTemplate) {
        self.reset_identity();
        self.generation += 1;
        self.adopt(dt);
        self.dirty = true;
        info!(generation = self.generation, "pasted DataTemplate applied");
    }

    /// Queues passwords to be set with the next update.
    pub fn protect(&mut self, request: ProtectRequest) -> Result<(), ValidationError> {
        if self.remote_id.is_none() {
            return Err(ValidationError::NoRemoteCopy);
        }
        if !self.capabilities.can_protect {
            return Err(ValidationError::ProtectUnavailable);
        }
        self.pending_protection = Some(request);
        self.open_password = None;
        self.modify_password = None;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        if !self.dirty {
            debug!("session marked dirty");
        }
        self.dirty = true;
    }

    fn adopt(&mut self, dt: DataTemplate) {
        self.editor = dt.registry.active().buffers.clone();
        self.registry = dt.registry;
        self.template = dt.template;
    }

    fn reset_identity(&mut self) {
        self.remote_id = None;
        self.content_hash = None;
        self.revision = 0;
        self.open_password = None;
        self.modify_password = None;
        self.pending_protection = None;
        self.location = None;
        self.updated = None;
        self.state = SyncState::Unsaved;
        self.capabilities = Capabilities::default();
    }

    // Hooks driven by the sync client.

    pub(crate) fn fetch_credential(&self) -> Option<&str> {
        self.open_password
            .as_deref()
            .or(self.modify_password.as_deref())
    }

    pub(crate) fn update_credential(&self) -> Option<&str> {
        self.modify_password
            .as_deref()
            .or(self.open_password.as_deref())
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    pub(crate) fn begin_load(&mut self, id: &str) -> LoadTicket {
        self.generation += 1;
        self.location = Some(id.to_string());
        self.state = SyncState::Loading;
        debug!(id, generation = self.generation, "load started");
        LoadTicket {
            generation: self.generation,
            id: id.to_string(),
        }
    }

    /// Adopts a fetched document. Returns false (and changes nothing) for a stale ticket.
    pub(crate) fn complete_load(
        &mut self,
        ticket: &LoadTicket,
        doc: RemoteDocument,
        password: Option<String>,
    ) -> bool {
        if !self.is_current(ticket.generation) {
            warn!(id = %ticket.id, "dropping stale fetch response");
            return false;
        }
        self.adopt(doc.template);
        self.remote_id = Some(ticket.id.clone());
        self.location = Some(ticket.id.clone());
        self.content_hash = Some(doc.dt_hash);
        self.revision = doc.revision.unwrap_or(1);
        self.updated = doc.updated;
        self.open_password = password;
        self.modify_password = None;
        self.pending_protection = None;
        self.capabilities = Capabilities {
            can_update: true,
            can_protect: !doc.protected,
        };
        self.dirty = false;
        self.state = SyncState::Loaded;
        info!(id = %ticket.id, revision = self.revision, "DataTemplate loaded");
        true
    }

    /// Gives up on a load: the location points back at whatever was loaded before, and no
    /// document data is touched.
    pub(crate) fn abort_load(&mut self, ticket: &LoadTicket, state: SyncState) -> bool {
        if !self.is_current(ticket.generation) {
            warn!(id = %ticket.id, "dropping stale fetch failure");
            return false;
        }
        self.location = self.remote_id.clone();
        self.state = state;
        info!(id = %ticket.id, %state, "load aborted");
        true
    }

    pub(crate) fn begin_save(&mut self) -> SaveTicket {
        let prior = self.state;
        self.state = SyncState::Saving;
        SaveTicket {
            generation: self.generation,
            prior,
        }
    }

    pub(crate) fn complete_create(&mut self, ticket: SaveTicket, id: String, hash: Option<String>) -> bool {
        if !self.is_current(ticket.generation) {
            warn!(%id, "dropping stale create response");
            return false;
        }
        info!(%id, "remote copy created");
        self.location = Some(id.clone());
        self.remote_id = Some(id);
        self.content_hash = hash;
        self.revision = 1;
        self.updated = Some(Utc::now());
        self.capabilities = Capabilities {
            can_update: true,
            can_protect: true,
        };
        self.dirty = false;
        self.state = SyncState::Saved;
        true
    }

    /// Records a successful update to `revision`. `presented` is the password the update was
    /// sent with.
    pub(crate) fn complete_update(
        &mut self,
        ticket: SaveTicket,
        revision: u64,
        hash: Option<String>,
        presented: Option<String>,
    ) -> bool {
        if !self.is_current(ticket.generation) {
            warn!("dropping stale update response");
            return false;
        }
        self.revision = revision;
        if let Some(protection) = self.pending_protection.take() {
            let (open, modify) = protection.into_parts();
            self.capabilities.can_protect = false;
            self.open_password = open;
            self.modify_password = modify;
        } else if presented.is_some() && self.update_credential() != presented.as_deref() {
            self.modify_password = presented;
        }
        if hash.is_some() {
            self.content_hash = hash;
        }
        self.updated = Some(Utc::now());
        self.dirty = false;
        self.state = SyncState::Saved;
        info!(revision = self.revision, "remote copy updated");
        true
    }

    pub(crate) fn mark_state(&mut self, ticket: SaveTicket, state: SyncState) {
        if self.is_current(ticket.generation) {
            self.state = state;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lab_session() -> Session {
        let mut session = Session::from_template(DataTemplate::single("h1,h2\nx,y", "", "{{ h1 }}"));
        session.add_dataset("Lab").unwrap();
        session
    }

    #[test]
    fn test_from_template_is_clean() {
        let session = Session::from_template(DataTemplate::single("a", "b", "c"));
        assert!(!session.is_dirty());
        assert!(session.is_unsaved());
        assert_eq!(session.state(), SyncState::Unsaved);
        assert_eq!(session.editor(), &BufferPair::new("a", "b"));
    }

    #[test]
    fn test_edits_mark_dirty_only_on_change() {
        let mut session = Session::from_template(DataTemplate::single("a", "", "t"));
        session.edit_data("a");
        session.edit_template("t");
        assert!(!session.is_dirty());

        session.edit_vars("x: 1");
        assert!(session.is_dirty());
    }

    #[test]
    fn test_add_dataset_switches_and_keeps_edits() {
        let mut session = Session::new();
        session.edit_data("a,b\n1,2");
        session.add_dataset("Lab-1").unwrap();

        assert_eq!(session.active_dataset_name(), "Lab-1");
        assert!(session.editor().is_blank());
        assert_eq!(
            session.registry().get("Default").unwrap().buffers.data,
            "a,b\n1,2"
        );
        assert!(session.is_dirty());
    }

    #[test]
    fn test_switch_without_persist_drops_edits() {
        let mut session = lab_session();
        session.edit_data("scratch");
        session.switch_dataset("Default", false).unwrap();
        assert_eq!(session.editor().data, "h1,h2\nx,y");
        session.switch_dataset("Lab", true).unwrap();
        assert!(session.editor().is_blank());
    }

    #[test]
    fn test_remove_blank_dataset_needs_no_confirmation() {
        let mut session = lab_session();
        let decision = session.remove_dataset("Lab").unwrap();
        assert!(decision.is_done());
        assert_eq!(session.active_dataset_name(), "Default");
        assert_eq!(session.editor().data, "h1,h2\nx,y");
    }

    #[test]
    fn test_remove_nonblank_dataset_asks_first() {
        let mut session = lab_session();
        session.edit_data("only,here");

        let pending = session.remove_dataset("Lab").unwrap().pending().unwrap();
        assert!(pending.prompt.contains("Lab"));
        assert!(session.registry().contains("Lab"));

        let removal = session.confirm_remove(pending).unwrap();
        assert_eq!(removal.dataset.buffers.data, "only,here");
        assert!(!session.registry().contains("Lab"));
    }

    #[test]
    fn test_remove_last_dataset_rejected() {
        let mut session = Session::new();
        assert_eq!(
            session.remove_dataset("Default"),
            Err(ValidationError::LastDatasetRemaining)
        );
    }

    #[test]
    fn test_snapshot_includes_live_edits() {
        let mut session = lab_session();
        session.edit_vars("site: lab");
        let dt = session.snapshot();
        assert_eq!(dt.registry.get("Lab").unwrap().buffers.vars, "site: lab");
        assert_eq!(dt.registry.active_name(), "Lab");
        // the session's own registry is untouched
        assert_eq!(session.registry().get("Lab").unwrap().buffers.vars, "");
    }

    #[test]
    fn test_paste_over_dirty_session_asks_first() {
        let mut session = Session::new();
        session.edit_template("{{ x }}");

        let pasted = DataTemplate::single("p", "", "pasted");
        let pending = session.paste(pasted).pending().unwrap();
        assert_eq!(session.template(), "{{ x }}");

        let before = session.generation();
        session.confirm_paste(pending);
        assert_eq!(session.template(), "pasted");
        assert_eq!(session.generation(), before + 1);
        assert!(session.is_dirty());
        assert!(session.is_unsaved());
    }

    #[test]
    fn test_protect_requires_remote_copy() {
        let mut session = Session::new();
        let req = ProtectRequest::new(Some("pw".into()), None).unwrap();
        assert_eq!(session.protect(req), Err(ValidationError::NoRemoteCopy));
    }

    #[test]
    fn test_view_reflects_state() {
        let session = lab_session();
        let view = session.view();
        assert_eq!(view.datasets.names, vec!["Default", "Lab"]);
        assert_eq!(view.datasets.active, "Lab");
        assert!(view.dirty);
        assert_eq!(view.state, SyncState::Unsaved);
    }

    #[test]
    fn test_linked_session_round_trips_record() {
        let record = SyncRecord {
            id: "abc123".into(),
            revision: 4,
            hash: Some("f00".into()),
            protected: true,
            updated: None,
        };
        let session = Session::linked(DataTemplate::single("a", "", "t"), record.clone(), false);
        assert_eq!(session.remote_id(), Some("abc123"));
        assert_eq!(session.revision(), 4);
        assert!(!session.capabilities().can_protect);
        assert!(!session.is_dirty());
        assert_eq!(session.sync_record(), Some(record));
        assert_eq!(Session::new().sync_record(), None);
    }

    #[test]
    fn test_stale_load_ticket_is_dropped() {
        let mut session = Session::new();
        let first = session.begin_load("aaaa");
        let _second = session.begin_load("bbbb");
        assert!(!session.abort_load(&first, SyncState::NotFound));
        assert_eq!(session.state(), SyncState::Loading);
        assert_eq!(session.location(), Some("bbbb"));
    }
}
