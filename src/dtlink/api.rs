//! # API Facade
//!
//! The API layer is a **thin facade** over the command layer. It is the single entry point
//! for all dtlink operations, whatever the UI.
//!
//! ## Role and Responsibilities
//!
//! The API facade:
//! - **Dispatches** to the appropriate command function
//! - **Supplies context** the commands need (sync client, link base, config directory)
//! - **Returns structured types** (`Result<CmdResult>`)
//!
//! ## What the API Does NOT Do
//!
//! - **Business logic**: That belongs in `commands/*.rs`
//! - **I/O with the user**: No stdout or stderr. Questions go through a [`Prompter`]
//! - **Presentation concerns**: Returns data structures, not formatted tables
//!
//! ## Generic Over Transport
//!
//! `DtApi<T: Transport>` is generic over how requests reach the store:
//! - Production: `DtApi<HttpTransport>`
//! - Testing: `DtApi<MemoryRemote>`

use crate::commands;
use crate::config::DtConfig;
use crate::error::Result;
use crate::passwords::ProtectRequest;
use crate::protocol::Transport;
use crate::sync::SyncClient;
use std::path::{Path, PathBuf};

/// The main API facade for dtlink operations.
///
/// All UI clients (CLI, editor plugins, etc.) should interact through this API.
pub struct DtApi<T: Transport> {
    client: SyncClient<T>,
    config: DtConfig,
    config_dir: PathBuf,
}

impl<T: Transport> DtApi<T> {
    pub fn new(transport: T, config: DtConfig, config_dir: PathBuf) -> Self {
        let client = SyncClient::new(transport).with_compress_threshold(config.compress_threshold);
        Self {
            client,
            config,
            config_dir,
        }
    }

    pub fn pull(
        &self,
        id: &str,
        output: &Path,
        prompter: &mut dyn Prompter,
    ) -> Result<CmdResult> {
        commands::pull::run(&self.client, prompter, id, output)
    }

    pub fn open(
        &self,
        link: &str,
        output: &Path,
        prompter: &mut dyn Prompter,
    ) -> Result<CmdResult> {
        commands::open::run(&self.client, prompter, link, output)
    }

    pub fn push(
        &self,
        path: &Path,
        options: PushOptions,
        prompter: &mut dyn Prompter,
    ) -> Result<CmdResult> {
        commands::push::run(&self.client, prompter, path, self.config.link_base(), options)
    }

    pub fn protect(
        &self,
        path: &Path,
        request: ProtectRequest,
        prompter: &mut dyn Prompter,
    ) -> Result<CmdResult> {
        commands::protect::run(&self.client, prompter, path, request)
    }

    pub fn list_datasets(&self, path: &Path) -> Result<CmdResult> {
        commands::dataset::list(path)
    }

    pub fn add_dataset(&self, path: &Path, name: &str) -> Result<CmdResult> {
        commands::dataset::add(path, name)
    }

    pub fn remove_dataset(
        &self,
        path: &Path,
        name: &str,
        prompter: &mut dyn Prompter,
    ) -> Result<CmdResult> {
        commands::dataset::remove(path, name, prompter)
    }

    pub fn preview(&self, path: &Path, dataset: Option<&str>) -> Result<CmdResult> {
        commands::preview::run(path, dataset)
    }

    pub fn render_payload(&self, path: &Path, dataset: Option<&str>) -> Result<CmdResult> {
        commands::preview::render(path, dataset)
    }

    pub fn link(&self, path: &Path) -> Result<CmdResult> {
        commands::link::run(path, self.config.link_base())
    }

    pub fn paste(
        &self,
        text: &str,
        output: &Path,
        prompter: &mut dyn Prompter,
    ) -> Result<CmdResult> {
        commands::paste::run(text, output, prompter)
    }

    pub fn export(&self, path: &Path, format: ExportFormat) -> Result<CmdResult> {
        commands::export::run(path, format)
    }

    pub fn config(&self, action: ConfigAction) -> Result<CmdResult> {
        commands::config::run(&self.config_dir, action)
    }

    pub fn settings(&self) -> &DtConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        self.client.transport()
    }
}

pub use crate::commands::config::ConfigAction;
pub use crate::commands::export::ExportFormat;
pub use crate::commands::push::PushOptions;
pub use crate::commands::{CmdMessage, CmdResult, MessageLevel, NoPrompt, Prompter};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::export::ExportStyle;
    use crate::commands::testing::Scripted;
    use crate::model::DataTemplate;
    use crate::protocol::memory::MemoryRemote;
    use crate::workfile::WorkingCopy;
    use tempfile::tempdir;

    fn api(dir: &Path) -> DtApi<MemoryRemote> {
        let mut config = DtConfig::default();
        config.link_base = Some("https://share.example.com/".into());
        DtApi::new(MemoryRemote::new(), config, dir.join("config"))
    }

    #[test]
    fn test_push_uses_link_base() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.yml");
        WorkingCopy::new(DataTemplate::single("", "", "t")).save(&path).unwrap();
        let api = api(dir.path());

        let result = api.push(&path, PushOptions::default(), &mut NoPrompt).unwrap();
        assert!(result
            .output
            .unwrap()
            .starts_with("https://share.example.com/?dt="));
        assert_eq!(api.transport().request_count(), 1);
    }

    #[test]
    fn test_pull_then_edit_cycle() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.yml");
        let api = api(dir.path());
        api.transport()
            .seed("doc1", &DataTemplate::single("a\n1", "", "t"), 1, None, None);

        api.pull("doc1", &path, &mut Scripted::default()).unwrap();
        api.add_dataset(&path, "Lab").unwrap();
        let result = api.push(&path, PushOptions::default(), &mut NoPrompt).unwrap();
        assert_eq!(result.messages[0].content, "Link Updated (revision 2)");

        let exported = api
            .export(&path, ExportFormat::Document(ExportStyle::Plain))
            .unwrap()
            .output
            .unwrap();
        assert!(exported.contains("  datasets:\n"));
    }

    #[test]
    fn test_config_goes_to_config_dir() {
        let dir = tempdir().unwrap();
        let api = api(dir.path());
        api.config(ConfigAction::Set("export-style".into(), "html".into()))
            .unwrap();
        assert!(dir.path().join("config").join("config.json").exists());
    }
}
