use crate::error::{DtError, Result};
use std::io::Write;
use std::process::{Command, Stdio};

/// Copies text to the system clipboard by piping it into the platform's clipboard tool.
/// - macOS: pbcopy
/// - Linux: xclip, falling back to xsel, then wl-copy
/// - Windows: clip.exe
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let candidates = clipboard_commands();
    if candidates.is_empty() {
        return Err(DtError::Clipboard(
            "Clipboard not supported on this platform".to_string(),
        ));
    }

    let mut last_error = String::new();
    for (program, args) in candidates {
        match pipe_into(program, args, text) {
            Ok(()) => return Ok(()),
            Err(e) => last_error = e,
        }
    }
    Err(DtError::Clipboard(last_error))
}

#[cfg(target_os = "macos")]
fn clipboard_commands() -> &'static [(&'static str, &'static [&'static str])] {
    &[("pbcopy", &[])]
}

#[cfg(target_os = "linux")]
fn clipboard_commands() -> &'static [(&'static str, &'static [&'static str])] {
    &[
        ("xclip", &["-selection", "clipboard"]),
        ("xsel", &["--clipboard", "--input"]),
        ("wl-copy", &[]),
    ]
}

#[cfg(target_os = "windows")]
fn clipboard_commands() -> &'static [(&'static str, &'static [&'static str])] {
    &[("clip", &[])]
}

#[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
fn clipboard_commands() -> &'static [(&'static str, &'static [&'static str])] {
    &[]
}

fn pipe_into(program: &str, args: &[&str], text: &str) -> std::result::Result<(), String> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .spawn()
        .map_err(|e| format!("Failed to spawn {}: {}", program, e))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(text.as_bytes())
            .map_err(|e| format!("Failed to write to {}: {}", program, e))?;
    }

    let status = child
        .wait()
        .map_err(|e| format!("Failed to wait for {}: {}", program, e))?;
    if status.success() {
        Ok(())
    } else {
        Err(format!("{} exited with {}", program, status))
    }
}

/// A working copy on the clipboard keeps its header comment but loses trailing blank lines.
pub fn format_for_clipboard(text: &str) -> String {
    let mut out = text.trim_end().to_string();
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_for_clipboard() {
        assert_eq!(format_for_clipboard("---\ndt:\n  vars: \"\"\n\n\n"), "---\ndt:\n  vars: \"\"\n");
        assert_eq!(format_for_clipboard("x"), "x\n");
    }

    #[test]
    fn test_missing_tool_is_reported() {
        let err = pipe_into("dtlink-no-such-clipboard-tool", &[], "x").unwrap_err();
        assert!(err.contains("dtlink-no-such-clipboard-tool"));
    }
}
