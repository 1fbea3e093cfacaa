//! The JSON payload sent to the remote store.
//!
//! Single form applies when the only dataset is `Default`:
//!
//! ```json
//! { "data": "<b64>", "template": "<b64>", "vars": "<b64>" }
//! ```
//!
//! Otherwise the multi form keeps datasets in registry order:
//!
//! ```json
//! { "template": "<b64>", "datasets": { "Lab-1": { "data": "<b64>", "vars": "<b64>" } } }
//! ```
//!
//! Tabs in `template` and `vars` are expanded to two spaces before encoding. `data` is stored
//! as typed.

use super::{decode_field, encode_field, expand_tabs};
use crate::error::EncodingError;
use crate::model::{BufferPair, DataTemplate, Dataset};
use crate::registry::DatasetRegistry;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WirePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vars: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datasets: Option<IndexMap<String, WireDataset>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireDataset {
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub vars: String,
}

impl WirePayload {
    pub fn encode(dt: &DataTemplate) -> Self {
        let template = Some(encode_field(&expand_tabs(&dt.template)));

        if dt.is_single_form() {
            let buffers = &dt.registry.active().buffers;
            return Self {
                data: Some(encode_field(&buffers.data)),
                template,
                vars: Some(encode_field(&expand_tabs(&buffers.vars))),
                datasets: None,
            };
        }

        let datasets = dt
            .registry
            .iter()
            .map(|ds| {
                (
                    ds.name.clone(),
                    WireDataset {
                        data: encode_field(&ds.buffers.data),
                        vars: encode_field(&expand_tabs(&ds.buffers.vars)),
                    },
                )
            })
            .collect();

        Self {
            data: None,
            template,
            vars: None,
            datasets: Some(datasets),
        }
    }

    /// Rebuilds a DataTemplate. With `datasets`, the registry comes entirely from the map and
    /// its first key is active; otherwise a single `Default` dataset is filled from the
    /// top-level fields.
    pub fn decode(&self) -> Result<DataTemplate, EncodingError> {
        let template = decode_field(self.template.as_deref().unwrap_or_default(), "template")?;

        let registry = match &self.datasets {
            Some(map) => {
                let mut datasets = Vec::with_capacity(map.len());
                for (name, ds) in map {
                    let buffers = BufferPair::new(
                        decode_field(&ds.data, &format!("{}.data", name))?,
                        decode_field(&ds.vars, &format!("{}.vars", name))?,
                    );
                    datasets.push(Dataset::new(name.clone(), buffers));
                }
                DatasetRegistry::from_datasets(datasets)
                    .map_err(|e| EncodingError::Malformed(e.to_string()))?
            }
            None => {
                return Ok(DataTemplate::single(
                    decode_field(self.data.as_deref().unwrap_or_default(), "data")?,
                    decode_field(self.vars.as_deref().unwrap_or_default(), "vars")?,
                    template,
                ));
            }
        };

        Ok(DataTemplate::new(registry, template))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, EncodingError> {
        serde_json::from_str(json).map_err(|e| EncodingError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_form_round_trip() {
        let dt = DataTemplate::single("h1,h2\nx,y", "", "{{h1}}");
        let payload = WirePayload::encode(&dt);
        assert!(payload.datasets.is_none());
        assert!(payload.data.is_some());

        let json = payload.to_json().unwrap();
        let decoded = WirePayload::from_json(&json).unwrap().decode().unwrap();
        assert_eq!(decoded, dt);
    }

    #[test]
    fn test_multi_form_round_trip_keeps_order() {
        let mut dt = DataTemplate::single("a,b\n1,2", "x: 1", "{{ a }}");
        dt.registry.add("Zeta").unwrap();
        dt.registry.add("Alpha").unwrap();
        dt.registry.get_mut("Alpha").unwrap().buffers = BufferPair::new("# note\nc,d\n3,4", "y: 2");

        let payload = WirePayload::encode(&dt);
        assert!(payload.data.is_none());
        let names: Vec<_> = payload.datasets.as_ref().unwrap().keys().cloned().collect();
        assert_eq!(names, vec!["Default", "Zeta", "Alpha"]);

        let decoded = WirePayload::from_json(&payload.to_json().unwrap())
            .unwrap()
            .decode()
            .unwrap();
        assert_eq!(decoded.registry.names(), vec!["Default", "Zeta", "Alpha"]);
        assert_eq!(decoded.registry.active_name(), "Default");
        assert_eq!(
            decoded.registry.get("Alpha").unwrap().buffers,
            BufferPair::new("# note\nc,d\n3,4", "y: 2")
        );
        assert_eq!(decoded.template, "{{ a }}");
    }

    #[test]
    fn test_single_non_default_dataset_uses_multi_form() {
        let mut registry = DatasetRegistry::new();
        registry.add("Only").unwrap();
        registry.remove("Default").unwrap();
        let dt = DataTemplate::new(registry, "t");
        let payload = WirePayload::encode(&dt);
        assert!(payload.datasets.is_some());
        assert_eq!(payload.decode().unwrap().registry.active_name(), "Only");
    }

    #[test]
    fn test_tabs_expanded_in_template_and_vars_only() {
        let dt = DataTemplate::single("a\tb\n1\t2", "k:\n\tv: 1", "{%\tif %}");
        let decoded = WirePayload::encode(&dt).decode().unwrap();
        let buffers = &decoded.registry.active().buffers;
        assert_eq!(buffers.data, "a\tb\n1\t2");
        assert_eq!(buffers.vars, "k:\n  v: 1");
        assert_eq!(decoded.template, "{%  if %}");
    }

    #[test]
    fn test_missing_fields_decode_empty() {
        let decoded = WirePayload::from_json("{}").unwrap().decode().unwrap();
        assert_eq!(decoded, DataTemplate::single("", "", ""));
    }

    #[test]
    fn test_bad_dataset_name_is_malformed() {
        let json = r#"{"template":"","datasets":{"9lives":{"data":"","vars":""}}}"#;
        let err = WirePayload::from_json(json).unwrap().decode().unwrap_err();
        assert!(matches!(err, EncodingError::Malformed(_)));
    }

    #[test]
    fn test_empty_dataset_map_is_malformed() {
        let json = r#"{"template":"","datasets":{}}"#;
        let err = WirePayload::from_json(json).unwrap().decode().unwrap_err();
        assert!(matches!(err, EncodingError::Malformed(_)));
    }

    #[test]
    fn test_bad_base64_is_bad_encoding() {
        let json = r#"{"data":"%%%","template":""}"#;
        let err = WirePayload::from_json(json).unwrap().decode().unwrap_err();
        assert!(matches!(err, EncodingError::BadEncoding(_)));
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        assert!(matches!(
            WirePayload::from_json("{not json"),
            Err(EncodingError::Malformed(_))
        ));
    }
}
