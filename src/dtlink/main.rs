use chrono::{DateTime, Utc};
use clap::Parser;
use colored::*;
use console::Term;
use directories::ProjectDirs;
use dtlink::api::{
    CmdMessage, CmdResult, ConfigAction, DtApi, ExportFormat, MessageLevel, NoPrompt, Prompter,
    PushOptions,
};
use dtlink::clipboard::{copy_to_clipboard, format_for_clipboard};
use dtlink::codec::export::ExportStyle;
use dtlink::config::{DtConfig, KEYS};
use dtlink::csv::CsvPreview;
use dtlink::error::{DtError, Result};
use dtlink::passwords::ProtectRequest;
use dtlink::protocol::http::HttpTransport;
use dtlink::session::SessionView;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use unicode_width::UnicodeWidthStr;

mod args;
use args::{Cli, Commands, DatasetAction};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

struct AppContext {
    api: DtApi<HttpTransport>,
    prompter: Box<dyn Prompter>,
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let mut ctx = init_context(&cli)?;

    match cli.command {
        Commands::Pull { id, output } => handle_pull(&mut ctx, &id, output),
        Commands::Push { file, new, force } => handle_push(&mut ctx, file, new, force),
        Commands::Protect { file } => handle_protect(&mut ctx, file),
        Commands::Dataset { action } => handle_dataset(&mut ctx, action),
        Commands::Preview { file, dataset } => handle_preview(&ctx, file, dataset),
        Commands::Render { file, dataset } => handle_render(&ctx, file, dataset),
        Commands::Link { file } => handle_link(&ctx, file),
        Commands::Open { link, output } => handle_open(&mut ctx, &link, output),
        Commands::Paste { output, from } => handle_paste(&mut ctx, output, from),
        Commands::Export {
            file,
            html,
            wire,
            clipboard,
        } => handle_export(&ctx, file, html, wire, clipboard),
        Commands::Config { key, value } => handle_config(&ctx, key, value),
    }
}

/// `DTLINK_LOG` takes a full filter directive; `-v` alone means debug for this crate.
fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_env("DTLINK_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "dtlink=debug" } else { "warn" })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn config_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("DTLINK_CONFIG_DIR") {
        return Ok(PathBuf::from(dir));
    }
    ProjectDirs::from("io", "dtlink", "dtlink")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| DtError::Config("Could not determine config dir".to_string()))
}

fn init_context(cli: &Cli) -> Result<AppContext> {
    let config_dir = config_dir()?;
    let server = cli
        .server
        .clone()
        .or_else(|| std::env::var("DTLINK_SERVER").ok());
    let config = DtConfig::load(&config_dir)
        .unwrap_or_default()
        .with_server_override(server);

    let transport = HttpTransport::new(&config.server_url, config.timeout())?;
    let api = DtApi::new(transport, config, config_dir);

    let prompter: Box<dyn Prompter> = if cli.no_input {
        Box::new(NoPrompt)
    } else {
        Box::new(TermPrompter::new())
    };
    Ok(AppContext { api, prompter })
}

/// Asks on the controlling terminal. Without one, every question is declined.
struct TermPrompter {
    term: Term,
}

impl TermPrompter {
    fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }

    fn ask(&self, prompt: &str, secret: bool) -> Option<String> {
        if !self.term.is_term() {
            return None;
        }
        self.term.write_str(&format!("{}: ", prompt)).ok()?;
        if secret {
            self.term.read_secure_line().ok()
        } else {
            self.term.read_line().ok()
        }
    }
}

impl Prompter for TermPrompter {
    fn password(&mut self, prompt: &str) -> Option<String> {
        self.ask(prompt, true)
    }

    fn confirm(&mut self, prompt: &str) -> bool {
        self.ask(&format!("{} [y/N]", prompt), false)
            .map(|answer| matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
            .unwrap_or(false)
    }
}

fn handle_pull(ctx: &mut AppContext, id: &str, output: PathBuf) -> Result<()> {
    let result = ctx.api.pull(id, &output, ctx.prompter.as_mut())?;
    print_result(&result);
    Ok(())
}

fn handle_open(ctx: &mut AppContext, link: &str, output: PathBuf) -> Result<()> {
    let result = ctx.api.open(link, &output, ctx.prompter.as_mut())?;
    print_result(&result);
    Ok(())
}

fn handle_push(ctx: &mut AppContext, file: PathBuf, new_link: bool, force: bool) -> Result<()> {
    let options = PushOptions { new_link, force };
    let result = ctx.api.push(&file, options, ctx.prompter.as_mut())?;
    print_result(&result);
    Ok(())
}

fn handle_protect(ctx: &mut AppContext, file: PathBuf) -> Result<()> {
    let term = Term::stderr();
    if !term.is_term() {
        return Err(DtError::Config(
            "Setting passwords needs an interactive terminal".to_string(),
        ));
    }
    println!("{}", "Leave a password empty to not set it.".dimmed());
    let open = read_password_pair(&term, "Open password")?;
    let modify = read_password_pair(&term, "Modify password")?;
    let request = ProtectRequest::from_entries(
        (open.0.as_str(), open.1.as_str()),
        (modify.0.as_str(), modify.1.as_str()),
    )?;

    let result = ctx.api.protect(&file, request, ctx.prompter.as_mut())?;
    print_result(&result);
    Ok(())
}

fn read_password_pair(term: &Term, label: &str) -> Result<(String, String)> {
    term.write_str(&format!("{}: ", label))?;
    let entry = term.read_secure_line()?;
    if entry.is_empty() {
        return Ok((String::new(), String::new()));
    }
    term.write_str(&format!("{} (again): ", label))?;
    let confirmation = term.read_secure_line()?;
    Ok((entry, confirmation))
}

fn handle_dataset(ctx: &mut AppContext, action: DatasetAction) -> Result<()> {
    let result = match action {
        DatasetAction::List { file } => {
            let result = ctx.api.list_datasets(&file)?;
            if let Some(view) = &result.view {
                print_datasets(view);
            }
            print_messages(&result.messages);
            return Ok(());
        }
        DatasetAction::Add { file, name } => ctx.api.add_dataset(&file, &name)?,
        DatasetAction::Remove { file, name } => {
            ctx.api.remove_dataset(&file, &name, ctx.prompter.as_mut())?
        }
    };
    print_messages(&result.messages);
    Ok(())
}

fn handle_preview(ctx: &AppContext, file: PathBuf, dataset: Option<String>) -> Result<()> {
    let result = ctx.api.preview(&file, dataset.as_deref())?;
    if let Some(preview) = &result.preview {
        print_preview(preview);
    }
    print_messages(&result.messages);
    Ok(())
}

fn handle_render(ctx: &AppContext, file: PathBuf, dataset: Option<String>) -> Result<()> {
    let result = ctx.api.render_payload(&file, dataset.as_deref())?;
    print_output(&result);
    print_messages(&result.messages);
    Ok(())
}

fn handle_link(ctx: &AppContext, file: PathBuf) -> Result<()> {
    let result = ctx.api.link(&file)?;
    print_output(&result);
    print_messages(&result.messages);
    Ok(())
}

fn handle_paste(ctx: &mut AppContext, output: PathBuf, from: Option<PathBuf>) -> Result<()> {
    let text = match from {
        Some(path) => std::fs::read_to_string(path)?,
        None => std::io::read_to_string(std::io::stdin())?,
    };
    let result = ctx.api.paste(&text, &output, ctx.prompter.as_mut())?;
    print_result(&result);
    Ok(())
}

fn handle_export(
    ctx: &AppContext,
    file: PathBuf,
    html: bool,
    wire: bool,
    clipboard: bool,
) -> Result<()> {
    let format = if wire {
        ExportFormat::Wire
    } else if html {
        ExportFormat::Document(ExportStyle::Html)
    } else {
        ExportFormat::Document(ctx.api.settings().export_style)
    };
    let result = ctx.api.export(&file, format)?;

    if clipboard {
        if let Some(text) = &result.output {
            copy_to_clipboard(&format_for_clipboard(text))?;
            print_messages(&[CmdMessage::success("Copied to clipboard")]);
        }
    } else {
        print_output(&result);
    }
    Ok(())
}

fn handle_config(ctx: &AppContext, key: Option<String>, value: Option<String>) -> Result<()> {
    let action = match (key, value) {
        (None, _) => ConfigAction::ShowAll,
        (Some(k), None) => ConfigAction::ShowKey(k),
        (Some(k), Some(v)) => ConfigAction::Set(k, v),
    };

    let result = ctx.api.config(action)?;
    if result.messages.is_empty() {
        if let Some(config) = &result.config {
            for key in KEYS {
                println!("{} = {}", key, config.get(key).unwrap_or_default());
            }
        }
    }
    print_messages(&result.messages);
    Ok(())
}

fn print_result(result: &CmdResult) {
    print_messages(&result.messages);
    if let Some(view) = &result.view {
        print_status(view);
    }
    print_output(result);
}

fn print_output(result: &CmdResult) {
    if let Some(output) = &result.output {
        println!("{}", output.trim_end());
    }
}

fn print_messages(messages: &[CmdMessage]) {
    for message in messages {
        match message.level {
            MessageLevel::Info => println!("{}", message.content.dimmed()),
            MessageLevel::Success => println!("{}", message.content.green()),
            MessageLevel::Warning => println!("{}", message.content.yellow()),
            MessageLevel::Error => println!("{}", message.content.red()),
        }
    }
}

fn print_status(view: &SessionView) {
    if view.remote_id.is_none() {
        return;
    }
    let mut line = format!("Revision {}", view.revision);
    if let Some(updated) = view.updated {
        line.push_str(&format!(" / Updated {}", format_time_ago(updated)));
    }
    println!("{}", line.dimmed());
}

fn print_datasets(view: &SessionView) {
    for name in &view.datasets.names {
        if *name == view.datasets.active {
            println!("* {}", name.bold());
        } else {
            println!("  {}", name);
        }
    }
}

const MAX_CELL_WIDTH: usize = 32;

fn print_preview(preview: &CsvPreview) {
    let columns = preview.header.len();
    let mut widths: Vec<usize> = preview.header.iter().map(|h| h.width()).collect();
    for row in &preview.rows {
        for (i, cell) in row.cells.iter().take(columns).enumerate() {
            widths[i] = widths[i].max(cell.width());
        }
    }
    for w in widths.iter_mut() {
        *w = (*w).min(MAX_CELL_WIDTH);
    }

    let header = format_row(&preview.header, &widths);
    println!("{}", header.bold());
    println!(
        "{}",
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-")
            .dimmed()
    );
    for row in &preview.rows {
        let line = format_row(&row.cells, &widths);
        if row.mismatched {
            println!("{}  {}", line.red(), format!("({} fields)", row.field_count).dimmed());
        } else {
            println!("{}", line);
        }
    }
}

fn format_row(cells: &[String], widths: &[usize]) -> String {
    widths
        .iter()
        .enumerate()
        .map(|(i, width)| {
            let cell = truncate_to_width(cells.get(i).map(String::as_str).unwrap_or(""), *width);
            let padding = width.saturating_sub(cell.width());
            format!("{}{}", cell, " ".repeat(padding))
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

fn truncate_to_width(s: &str, max_width: usize) -> String {
    use unicode_width::UnicodeWidthChar;

    if s.width() <= max_width {
        return s.to_string();
    }
    let mut result = String::new();
    let mut current_width = 0;
    for c in s.chars() {
        let char_width = c.width().unwrap_or(0);
        if current_width + char_width > max_width.saturating_sub(1) {
            break;
        }
        result.push(c);
        current_width += char_width;
    }
    result.push('…');
    result
}

fn format_time_ago(timestamp: DateTime<Utc>) -> String {
    let duration = Utc::now().signed_duration_since(timestamp);
    timeago::Formatter::new().convert(duration.to_std().unwrap_or_default())
}
