//! Payload for the external rendering engine.
//!
//! Only the active dataset is rendered. Blank and comment lines are stripped from the data
//! here, and nowhere else, so what is stored stays exactly what was typed.

use super::{encode_field, expand_tabs, filter_data_rows};
use crate::error::ValidationError;
use crate::session::Session;
use serde::Serialize;

const VAULT_MARKER: &str = "$ANSIBLE_VAULT;";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderPayload {
    pub data: String,
    pub vars: String,
    pub template: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub dataset: String,
    #[serde(skip)]
    vaulted: bool,
}

impl RenderPayload {
    pub fn build(session: &Session) -> Result<Self, ValidationError> {
        if session.template().is_empty() {
            return Err(ValidationError::EmptyTemplate);
        }

        let editor = session.editor();
        let data = filter_data_rows(&expand_leading_tabs(&editor.data));
        if data.lines().count() == 1 {
            return Err(ValidationError::NotEnoughDataRows);
        }

        let vars = expand_tabs(&editor.vars);
        Ok(Self {
            data: encode_field(&data),
            vaulted: vars.contains(VAULT_MARKER),
            vars: encode_field(&vars),
            template: encode_field(&expand_tabs(session.template())),
            id: session.remote_id().map(str::to_string),
            dataset: session.active_dataset_name().to_string(),
        })
    }

    /// The variables contain vaulted values; the engine will need a vault password.
    pub fn needs_vault_password(&self) -> bool {
        self.vaulted
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Leading tabs count as two spaces each, so column alignment survives rendering.
fn expand_leading_tabs(data: &str) -> String {
    data.lines()
        .map(|line| {
            let body = line.trim_start_matches([' ', '\t']);
            let indent = &line[..line.len() - body.len()];
            let width: usize = indent.chars().map(|c| if c == '\t' { 2 } else { 1 }).sum();
            format!("{}{}", " ".repeat(width), body)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
