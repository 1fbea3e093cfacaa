//! # dtlink Architecture
//!
//! dtlink is a **UI-agnostic DataTemplate library**. A DataTemplate is one or more named
//! datasets (tabular data plus YAML variables) sharing a single rendering template. The
//! library owns the editing session, the text encodings, and the protocol used to keep a
//! remote copy behind a shareable link in sync. The `dtlink` binary is just one client.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (main.rs, args.rs)                               │
//! │  - Parses arguments, prompts for passwords, prints status   │
//! │  - The ONLY place that knows about stdout/stderr/exit codes │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs) + Command Layer (commands/*.rs)         │
//! │  - One entry point per user action                          │
//! │  - Returns `CmdResult` with leveled status messages         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Sync Layer (sync.rs, protocol/)                            │
//! │  - Fetch / create / update state machine                    │
//! │  - Abstract `Transport` trait                               │
//! │  - HttpTransport (production), MemoryRemote (testing)       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Model + Codec Layer (session.rs, registry/, codec/, csv.rs) │
//! │  - Session state, dataset registry, encodings               │
//! │  - Pure data in, pure data out                              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Principle: One Session Object
//!
//! All editing state lives in a single [`session::Session`] value that is passed to every
//! operation. There are no globals. Operations that would need a user confirmation return a
//! [`decision::Decision`] instead of blocking, and network responses are matched against the
//! session's generation token so a late answer for an abandoned load is dropped.
//!
//! ## Testing Strategy
//!
//! 1. **Model and codecs**: unit tests next to the code.
//! 2. **Sync**: driven against [`protocol::memory::MemoryRemote`], which emulates the
//!    server contract (revisions, passwords, conflicts) without a network.
//! 3. **CLI**: `tests/` runs the binary with `assert_cmd`.
//!
//! ## Module Overview
//!
//! - [`api`]: The API facade, entry point for all operations
//! - [`commands`]: Business logic for each user action
//! - [`session`]: The editing session and its sync bookkeeping
//! - [`registry`]: Ordered, named datasets and name validation
//! - [`model`]: Core data types (`BufferPair`, `Dataset`, `DataTemplate`)
//! - [`codec`]: Wire payloads, render payloads, portable export, deep links
//! - [`sync`]: Fetch/create/update protocol client
//! - [`protocol`]: Transport abstraction, HTTP and in-memory implementations
//! - [`passwords`]: Open/modify password entry and confirmation
//! - [`csv`]: Delimiter sniffing for the data preview
//! - [`decision`]: Pending user decisions
//! - [`workfile`]: Local working copies with their link record
//! - [`config`]: Configuration management
//! - [`clipboard`]: Cross-platform clipboard support
//! - [`error`]: Error types

pub mod api;
pub mod clipboard;
pub mod codec;
pub mod commands;
pub mod config;
pub mod csv;
pub mod decision;
pub mod error;
pub mod model;
pub mod passwords;
pub mod protocol;
pub mod registry;
pub mod session;
pub mod sync;
pub mod workfile;
