use crate::config::DtConfig;
use crate::csv::CsvPreview;
use crate::session::SessionView;

pub mod config;
pub mod dataset;
pub mod export;
pub mod helpers;
pub mod link;
pub mod open;
pub mod paste;
pub mod preview;
pub mod protect;
pub mod pull;
pub mod push;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct CmdResult {
    /// Session state after the command, for status lines and dataset listings.
    pub view: Option<SessionView>,
    pub preview: Option<CsvPreview>,
    /// Text meant for stdout as-is (a link, an export, a payload).
    pub output: Option<String>,
    pub config: Option<DtConfig>,
    pub messages: Vec<CmdMessage>,
}

impl CmdResult {
    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn with_view(mut self, view: SessionView) -> Self {
        self.view = Some(view);
        self
    }

    pub fn with_preview(mut self, preview: CsvPreview) -> Self {
        self.preview = Some(preview);
        self
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_config(mut self, config: DtConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(|m| m.level == MessageLevel::Error)
    }
}

/// How commands ask the user for passwords and confirmations.
///
/// Commands never talk to the terminal themselves; the CLI supplies an implementation.
pub trait Prompter {
    /// `None` (or a blank answer) means the user gave up.
    fn password(&mut self, prompt: &str) -> Option<String>;

    fn confirm(&mut self, prompt: &str) -> bool;
}

/// Answers nothing and declines everything. For non-interactive runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPrompt;

impl Prompter for NoPrompt {
    fn password(&mut self, _prompt: &str) -> Option<String> {
        None
    }

    fn confirm(&mut self, _prompt: &str) -> bool {
        false
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Prompter;
    use std::collections::VecDeque;

    /// Replays canned answers and records every question asked.
    #[derive(Debug, Default)]
    pub struct Scripted {
        pub passwords: VecDeque<Option<String>>,
        pub confirms: VecDeque<bool>,
        pub asked: Vec<String>,
    }

    impl Scripted {
        pub fn passwords(answers: &[&str]) -> Self {
            Self {
                passwords: answers.iter().map(|a| Some(a.to_string())).collect(),
                ..Self::default()
            }
        }

        pub fn confirms(answers: &[bool]) -> Self {
            Self {
                confirms: answers.iter().copied().collect(),
                ..Self::default()
            }
        }
    }

    impl Prompter for Scripted {
        fn password(&mut self, prompt: &str) -> Option<String> {
            self.asked.push(prompt.to_string());
            self.passwords.pop_front().flatten()
        }

        fn confirm(&mut self, prompt: &str) -> bool {
            self.asked.push(prompt.to_string());
            self.confirms.pop_front().unwrap_or(false)
        }
    }
}
