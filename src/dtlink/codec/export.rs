//! Portable DataTemplate document.
//!
//! The format is plain YAML so it survives email, chat and version control:
//!
//! ```text
//! # dtlink DataTemplate
//!
//! ---
//! dt:
//!   data: |2
//!     h1,h2
//!     x,y
//!
//!   vars: ""
//!
//!   template: |2
//!     {{ h1 }}
//! ```
//!
//! With more than one dataset (or a single one not named `Default`) the `data`/`vars` pairs
//! move under `dt.datasets."<name>"` and are indented four more columns. Trailing whitespace
//! of each field is dropped.
//!
//! [`ExportStyle::Html`] additionally escapes `& < > " '` so the document can be dropped into
//! a hosted HTML view verbatim. Such output is for display and is not read back.

use crate::error::EncodingError;
use crate::model::{BufferPair, DataTemplate, Dataset};
use crate::registry::DatasetRegistry;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Literal lines every portable document carries; used as the fast paste check.
pub const EXPORT_MARKER: &str = "---\ndt:\n";

const HEADER: &str = "# dtlink DataTemplate\n\n";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportStyle {
    #[default]
    Plain,
    Html,
}

impl std::str::FromStr for ExportStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "plain" => Ok(ExportStyle::Plain),
            "html" => Ok(ExportStyle::Html),
            other => Err(format!("Unknown export style: {} (expected plain or html)", other)),
        }
    }
}

impl std::fmt::Display for ExportStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportStyle::Plain => write!(f, "plain"),
            ExportStyle::Html => write!(f, "html"),
        }
    }
}

pub fn export(dt: &DataTemplate, style: ExportStyle) -> String {
    let mut out = String::from(HEADER);
    write_dt_block(&mut out, dt, style);
    out
}

/// Cheap check before attempting a full parse.
pub fn looks_like_export(text: &str) -> bool {
    text.contains(EXPORT_MARKER)
}

/// Parses a portable document. Anything structurally off is rejected as a whole.
pub fn parse(text: &str) -> Result<DataTemplate, EncodingError> {
    if !looks_like_export(text) {
        return Err(EncodingError::Malformed(
            "not a DataTemplate document (missing '---' / 'dt:' header)".to_string(),
        ));
    }
    let doc: ExportDocument =
        serde_yaml::from_str(text).map_err(|e| EncodingError::Malformed(e.to_string()))?;
    doc.dt.into_template()
}

/// Writes the `---` / `dt:` block, without the comment header.
pub(crate) fn write_dt_block(out: &mut String, dt: &DataTemplate, style: ExportStyle) {
    out.push_str(EXPORT_MARKER);

    if dt.is_single_form() {
        let buffers = &dt.registry.active().buffers;
        write_field(out, "data", &buffers.data, 2, style);
        out.push('\n');
        write_field(out, "vars", &buffers.vars, 2, style);
        out.push('\n');
    } else {
        out.push_str("  datasets:\n");
        for ds in dt.registry.iter() {
            let _ = writeln!(out, "    \"{}\":", ds.name);
            write_field(out, "data", &ds.buffers.data, 6, style);
            out.push('\n');
            write_field(out, "vars", &ds.buffers.vars, 6, style);
            out.push('\n');
        }
    }

    write_field(out, "template", &dt.template, 2, style);
}

fn write_field(out: &mut String, key: &str, text: &str, indent: usize, style: ExportStyle) {
    let pad = " ".repeat(indent);
    let text = text.trim_end();
    if text.is_empty() {
        let _ = writeln!(out, "{}{}: \"\"", pad, key);
        return;
    }

    if !fits_block_scalar(text) {
        let quoted = quote_scalar(text);
        let quoted = match style {
            ExportStyle::Plain => quoted,
            ExportStyle::Html => escape_html(&quoted),
        };
        let _ = writeln!(out, "{}{}: {}", pad, key, quoted);
        return;
    }

    let _ = writeln!(out, "{}{}: |2", pad, key);
    let body_pad = " ".repeat(indent + 2);
    for line in text.lines() {
        let line = match style {
            ExportStyle::Plain => line.to_string(),
            ExportStyle::Html => escape_html(line),
        };
        let _ = writeln!(out, "{}{}", body_pad, line);
    }
}

/// Literal blocks carry printable text only. Carriage returns, other control characters and
/// the YAML line separators would be lost or rejected on the way back in.
fn fits_block_scalar(text: &str) -> bool {
    !text.chars().any(|c| {
        (c.is_control() && c != '\n' && c != '\t')
            || matches!(c, '\u{2028}' | '\u{2029}' | '\u{feff}')
    })
}

/// A YAML double-quoted scalar on one line, with every non-printable character escaped.
fn quote_scalar(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for c in text.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c if c.is_control() || matches!(c, '\u{2028}' | '\u{2029}' | '\u{feff}') => {
                let _ = write!(quoted, "\\u{:04X}", c as u32);
            }
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[derive(Debug, Deserialize)]
struct ExportDocument {
    dt: PlainTemplate,
}

/// The `dt:` mapping with fields as plain text.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct PlainTemplate {
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    vars: Option<String>,
    #[serde(default)]
    template: Option<String>,
    #[serde(default)]
    datasets: Option<IndexMap<String, PlainDataset>>,
}

#[derive(Debug, Default, Deserialize)]
struct PlainDataset {
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    vars: Option<String>,
}

impl PlainTemplate {
    pub(crate) fn into_template(self) -> Result<DataTemplate, EncodingError> {
        let template = unclip(self.template);

        match self.datasets {
            Some(map) => {
                let datasets = map
                    .into_iter()
                    .map(|(name, ds)| Dataset::new(name, BufferPair::new(unclip(ds.data), unclip(ds.vars))))
                    .collect();
                let registry = DatasetRegistry::from_datasets(datasets)
                    .map_err(|e| EncodingError::Malformed(e.to_string()))?;
                Ok(DataTemplate::new(registry, template))
            }
            None => Ok(DataTemplate::single(
                unclip(self.data),
                unclip(self.vars),
                template,
            )),
        }
    }
}

/// Block scalars keep one final newline; the writer never emits one.
fn unclip(field: Option<String>) -> String {
    let mut text = field.unwrap_or_default();
    if text.ends_with('\n') {
        text.pop();
    }
    text
}
