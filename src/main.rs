//! Narkdown - slash commands for markdown editing.
//!
//! Reads editing events from stdin, one per line, and applies them to a
//! markdown file:
//!
//! ```bash
//! printf 'type /h2\nkey enter\ntype Title\nsave\n' | narkdown notes.md
//! narkdown --plain notes.md < script.txt
//! narkdown --list-commands
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use crossterm::event::KeyCode;
use tokio::io::{AsyncBufReadExt, BufReader};

use narkdown::catalog::Catalog;
use narkdown::config::{
    ConfigFlags, EolMode, TableSize, clear_config_flags, global_config_path, load_config_flags,
    local_override_path, parse_flag_tokens, save_config_flags,
};
use narkdown::editor::PlainEditor;
use narkdown::sync::{
    ExternalDocument, HostCommand, HostShell, HostSide, InputEvent, MemoryStateStore, SessionHandle,
    SurfaceView, channels, normalize, run_host, run_surface, to_line_ending,
};

/// Slash commands for markdown, in plain or structured editing mode
#[derive(Parser, Debug)]
#[command(name = "narkdown", version, about, long_about = None)]
struct Cli {
    /// Markdown file to edit (created on save if missing)
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Reload the file when another program changes it
    #[arg(short, long)]
    watch: bool,

    /// Edit as plain text instead of through the structured surface
    #[arg(long)]
    plain: bool,

    /// Line endings to write
    #[arg(long, value_enum)]
    eol: Option<EolMode>,

    /// JSON command catalog to use instead of the builtin one
    #[arg(long, value_name = "PATH")]
    commands: Option<PathBuf>,

    /// Size of inserted tables
    #[arg(long, value_name = "ROWSxCOLS")]
    table_size: Option<TableSize>,

    /// Print the command catalog as JSON and exit
    #[arg(long)]
    list_commands: bool,

    /// Save current command-line flags as defaults
    #[arg(long)]
    save: bool,

    /// Clear saved defaults
    #[arg(long)]
    clear: bool,
}

/// One line of the input script.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ScriptEvent {
    Type(String),
    Key(KeyCode),
    Pick(usize),
    Paste(String),
    Scroll(usize),
    ToggleTask,
    Save,
    Show,
    Commands,
}

fn parse_key(name: &str) -> Option<KeyCode> {
    Some(match name {
        "enter" => KeyCode::Enter,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "esc" => KeyCode::Esc,
        "backspace" => KeyCode::Backspace,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        _ => return None,
    })
}

/// Parse a script line. Blank lines and `#` comments yield `None`.
fn parse_event(line: &str) -> Result<Option<ScriptEvent>> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() || line.trim_start().starts_with('#') {
        return Ok(None);
    }
    let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));
    let event = match verb {
        "type" => ScriptEvent::Type(unescape(rest)),
        "paste" => ScriptEvent::Paste(unescape(rest)),
        "key" => ScriptEvent::Key(
            parse_key(rest.trim()).with_context(|| format!("unknown key {:?}", rest.trim()))?,
        ),
        "pick" => ScriptEvent::Pick(rest.trim().parse().context("pick needs an index")?),
        "scroll" => ScriptEvent::Scroll(rest.trim().parse().context("scroll needs a line")?),
        "toggle-task" => ScriptEvent::ToggleTask,
        "save" => ScriptEvent::Save,
        "show" => ScriptEvent::Show,
        "commands" => ScriptEvent::Commands,
        other => bail!("unknown event {other:?}"),
    };
    Ok(Some(event))
}

/// `\n` and `\\` escapes, so one script line can carry several lines.
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(ch);
        }
    }
    out
}

/// Errors go to stderr; the clipboard is whatever the script last pasted.
#[derive(Debug, Default)]
struct ConsoleShell {
    clipboard: Option<String>,
}

impl HostShell for ConsoleShell {
    fn show_error(&mut self, message: &str) {
        eprintln!("error: {message}");
    }

    fn clipboard_text(&mut self) -> Option<String> {
        self.clipboard.take()
    }

    fn set_clipboard(&mut self, text: String) {
        self.clipboard = Some(text);
    }
}

fn print_surface(view: &SurfaceView) {
    println!("{}", view.text);
    if !view.menu.is_empty() {
        let items: Vec<String> = view
            .menu
            .iter()
            .enumerate()
            .map(|(i, trigger)| {
                if Some(i) == view.selected {
                    format!("[{trigger}]")
                } else {
                    trigger.clone()
                }
            })
            .collect();
        println!("menu: {}", items.join(" "));
    }
}

async fn drive(handle: SessionHandle, catalog: Catalog) -> Result<()> {
    // Input waits for the opening handshake.
    handle.settle().await?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        let Some(event) = parse_event(&line)? else {
            continue;
        };
        tracing::debug!(?event, "script event");
        match event {
            ScriptEvent::Type(text) => handle.input(InputEvent::Text(text)).await?,
            ScriptEvent::Key(key) => handle.input(InputEvent::Key(key)).await?,
            ScriptEvent::Pick(index) => handle.input(InputEvent::Pick(index)).await?,
            ScriptEvent::Paste(text) => {
                handle.host(HostCommand::SetClipboard(text)).await?;
                handle.input(InputEvent::PlainPaste).await?;
            }
            ScriptEvent::Scroll(line) => handle.host(HostCommand::Scroll(line)).await?,
            ScriptEvent::ToggleTask => {
                tracing::warn!("toggle-task is a plain-mode command, ignored");
            }
            ScriptEvent::Save => handle.host(HostCommand::Save).await?,
            ScriptEvent::Show => print_surface(&handle.surface_view().await?),
            ScriptEvent::Commands => {
                for command in catalog.commands() {
                    println!("{:<12} {}", command.trigger, command.description);
                }
            }
        }
    }

    if handle.host_view().await?.dirty {
        handle.host(HostCommand::Save).await?;
    }
    print!("{}", handle.host_view().await?.text);
    Ok(())
}

async fn run_structured(document: ExternalDocument, catalog: Catalog, flags: &ConfigFlags) -> Result<()> {
    let mut host = HostSide::new(document, catalog.clone(), ConsoleShell::default());
    if flags.watch {
        host.watch().context("Failed to watch file")?;
    }
    let (handle, surface_ends, host_ends) = channels();
    let (surface, _host, driven) = tokio::join!(
        run_surface(flags.surface_options(), MemoryStateStore::default(), surface_ends),
        run_host(host, host_ends),
        drive(handle, catalog),
    );
    driven?;
    if surface?.is_none() {
        bail!("structured editor unavailable");
    }
    Ok(())
}

fn run_plain(mut document: ExternalDocument, catalog: Catalog) -> Result<()> {
    let mut editor = PlainEditor::new(&normalize(&document.text()), catalog);
    let save = |editor: &mut PlainEditor, document: &mut ExternalDocument| -> Result<()> {
        document.replace_all(&to_line_ending(&editor.text(), document.eol()));
        document.save()?;
        editor.buffer_mut().mark_clean();
        Ok(())
    };

    for line in std::io::stdin().lines() {
        let line = line.context("Failed to read input")?;
        let Some(event) = parse_event(&line)? else {
            continue;
        };
        tracing::debug!(?event, "script event");
        match event {
            ScriptEvent::Type(text) => {
                for expansion in editor.type_text(&text) {
                    tracing::debug!(trigger = %expansion.trigger, "expanded");
                }
            }
            ScriptEvent::Key(key) => editor.handle_key(key),
            ScriptEvent::Pick(index) => {
                if !editor.insert_trigger(index) {
                    tracing::warn!(index, "no such command");
                }
            }
            ScriptEvent::Paste(text) => editor.paste(&text),
            ScriptEvent::Scroll(_) => {}
            ScriptEvent::ToggleTask => {
                editor.toggle_task();
            }
            ScriptEvent::Save => save(&mut editor, &mut document)?,
            ScriptEvent::Show => println!("{}", editor.text()),
            ScriptEvent::Commands => {
                for item in editor.completions() {
                    println!("{:<12} {}", item.label, item.detail);
                }
            }
        }
    }

    if editor.buffer().is_dirty() {
        save(&mut editor, &mut document)?;
    }
    print!("{}", to_line_ending(&editor.text(), document.eol()));
    Ok(())
}

fn main() -> Result<()> {
    // Logs go to stderr; stdout carries session output.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let raw_args = std::env::args().collect::<Vec<_>>();
    let cli = Cli::parse();
    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = parse_flag_tokens(&raw_args);

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    let effective = file_flags.union(&cli_flags);

    let catalog = match &effective.commands {
        Some(path) => Catalog::load(path)?,
        None => Catalog::builtin(),
    };

    if cli.list_commands {
        let json = serde_json::to_string_pretty(&catalog).context("Failed to encode catalog")?;
        println!("{json}");
        return Ok(());
    }

    let Some(file) = cli.file else {
        if cli.save || cli.clear {
            return Ok(());
        }
        bail!("No file given");
    };

    let eol = effective.eol.and_then(EolMode::line_ending);
    let document = ExternalDocument::open(&file, eol)
        .with_context(|| format!("Failed to open {}", file.display()))?;

    if effective.plain {
        return run_plain(document, catalog);
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("Failed to start runtime")?;
    runtime.block_on(run_structured(document, catalog, &effective))
}
