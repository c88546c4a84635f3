//! Saved defaults: CLI flags stored one per line in a global file and an
//! optional local `.narkdownrc`.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result, bail};

use crate::surface::{MAX_TABLE_SIZE, SurfaceOptions};
use crate::sync::LineEnding;

/// Line endings written to the external document.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EolMode {
    /// Keep whatever the file already uses.
    Auto,
    Lf,
    Crlf,
}

impl EolMode {
    pub const fn line_ending(self) -> Option<LineEnding> {
        match self {
            Self::Auto => None,
            Self::Lf => Some(LineEnding::Lf),
            Self::Crlf => Some(LineEnding::CrLf),
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Lf => "lf",
            Self::Crlf => "crlf",
        }
    }
}

/// Size of an inserted table, written `ROWSxCOLS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSize {
    pub rows: usize,
    pub columns: usize,
}

impl FromStr for TableSize {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let Some((rows, columns)) = s.split_once(['x', 'X']) else {
            bail!("expected ROWSxCOLS, got {s:?}");
        };
        let rows: usize = rows.trim().parse().with_context(|| format!("bad row count in {s:?}"))?;
        let columns: usize = columns
            .trim()
            .parse()
            .with_context(|| format!("bad column count in {s:?}"))?;
        let range = 1..=MAX_TABLE_SIZE;
        if !range.contains(&rows) || !range.contains(&columns) {
            bail!("table size {s} is outside 1..={MAX_TABLE_SIZE}");
        }
        Ok(Self { rows, columns })
    }
}

impl fmt::Display for TableSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.columns)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigFlags {
    pub watch: bool,
    pub plain: bool,
    pub eol: Option<EolMode>,
    pub commands: Option<PathBuf>,
    pub table_size: Option<TableSize>,
}

impl ConfigFlags {
    /// Merge `other` over `self`: switches are or'ed, values in `other` win.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            watch: self.watch || other.watch,
            plain: self.plain || other.plain,
            eol: other.eol.or(self.eol),
            commands: other.commands.clone().or_else(|| self.commands.clone()),
            table_size: other.table_size.or(self.table_size),
        }
    }

    pub fn surface_options(&self) -> SurfaceOptions {
        self.table_size.map_or_else(SurfaceOptions::default, |size| SurfaceOptions {
            table_rows: size.rows,
            table_columns: size.columns,
        })
    }
}

pub fn global_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("narkdown").join("config");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("narkdown")
                .join("config");
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("narkdown").join("config");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(".config").join("narkdown").join("config");
        }
    }

    local_override_path()
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(".narkdownrc")
}

/// Read flags from `path`. A missing file holds no flags.
///
/// # Errors
/// Returns an error if the file exists but cannot be read.
pub fn load_config_flags(path: &Path) -> Result<ConfigFlags> {
    if !path.exists() {
        return Ok(ConfigFlags::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let tokens = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(|line| line.split_whitespace().map(ToOwned::to_owned))
        .collect::<Vec<_>>();
    Ok(parse_flag_tokens(&tokens))
}

/// # Errors
/// Returns an error if the file or its directory cannot be written.
pub fn save_config_flags(path: &Path, flags: &ConfigFlags) -> Result<()> {
    let mut lines = vec!["# narkdown defaults (saved with --save)".to_string()];
    if flags.watch {
        lines.push("--watch".to_string());
    }
    if flags.plain {
        lines.push("--plain".to_string());
    }
    if let Some(eol) = flags.eol {
        lines.push(format!("--eol {}", eol.as_str()));
    }
    if let Some(commands) = &flags.commands {
        lines.push(format!("--commands {}", commands.display()));
    }
    if let Some(size) = flags.table_size {
        lines.push(format!("--table-size {size}"));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    fs::write(path, format!("{}\n", lines.join("\n")))
        .with_context(|| format!("Failed to write config {}", path.display()))
}

/// # Errors
/// Returns an error if the file exists but cannot be removed.
pub fn clear_config_flags(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Pick the known flags out of `tokens`. Unknown tokens and bad values are
/// skipped.
pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].as_str();
        let (name, inline) = match token.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (token, None),
        };
        let takes_value = matches!(name, "--eol" | "--commands" | "--table-size");
        let value = if takes_value && inline.is_none() {
            i += 1;
            tokens.get(i).map(String::as_str)
        } else {
            inline
        };
        match (name, value) {
            ("--watch", None) => flags.watch = true,
            ("--plain", None) => flags.plain = true,
            ("--eol", Some(v)) => flags.eol = parse_eol(v),
            ("--commands", Some(v)) => flags.commands = Some(PathBuf::from(v)),
            ("--table-size", Some(v)) => match v.parse() {
                Ok(size) => flags.table_size = Some(size),
                Err(e) => tracing::warn!(error = %e, "ignoring saved --table-size"),
            },
            _ => {}
        }
        i += 1;
    }
    flags
}

fn parse_eol(s: &str) -> Option<EolMode> {
    match s {
        "auto" => Some(EolMode::Auto),
        "lf" => Some(EolMode::Lf),
        "crlf" => Some(EolMode::Crlf),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn tokens(args: &[&str]) -> Vec<String> {
        args.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_parse_flag_tokens_extracts_known_flags() {
        let flags = parse_flag_tokens(&tokens(&[
            "narkdown",
            "--watch",
            "--plain",
            "--eol",
            "crlf",
            "--commands=cmds.json",
            "--table-size",
            "3x4",
            "notes.md",
        ]));
        assert!(flags.watch);
        assert!(flags.plain);
        assert_eq!(flags.eol, Some(EolMode::Crlf));
        assert_eq!(flags.commands, Some(PathBuf::from("cmds.json")));
        assert_eq!(flags.table_size, Some(TableSize { rows: 3, columns: 4 }));
    }

    #[test]
    fn test_bad_values_are_skipped() {
        let flags = parse_flag_tokens(&tokens(&["--eol", "mac", "--table-size=0x2", "--watch"]));
        assert_eq!(flags.eol, None);
        assert_eq!(flags.table_size, None);
        assert!(flags.watch);
    }

    #[test]
    fn test_table_size_parse() {
        assert_eq!("2X5".parse::<TableSize>().unwrap(), TableSize { rows: 2, columns: 5 });
        assert!("21x2".parse::<TableSize>().is_err());
        assert!("2by2".parse::<TableSize>().is_err());
        assert_eq!(TableSize { rows: 4, columns: 3 }.to_string(), "4x3");
    }

    #[test]
    fn test_config_union_prefers_later_values() {
        let file = ConfigFlags {
            watch: true,
            eol: Some(EolMode::Lf),
            ..ConfigFlags::default()
        };
        let cli = ConfigFlags {
            plain: true,
            eol: Some(EolMode::Crlf),
            ..ConfigFlags::default()
        };
        let merged = file.union(&cli);
        assert!(merged.watch);
        assert!(merged.plain);
        assert_eq!(merged.eol, Some(EolMode::Crlf));
    }

    #[test]
    fn test_surface_options_from_table_size() {
        let flags = ConfigFlags {
            table_size: Some(TableSize { rows: 3, columns: 5 }),
            ..ConfigFlags::default()
        };
        let options = flags.surface_options();
        assert_eq!((options.table_rows, options.table_columns), (3, 5));
        assert_eq!(ConfigFlags::default().surface_options(), SurfaceOptions::default());
    }

    #[test]
    fn test_save_load_and_clear_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(".narkdownrc");
        let flags = ConfigFlags {
            watch: true,
            plain: true,
            eol: Some(EolMode::Auto),
            commands: Some(PathBuf::from("cmds.json")),
            table_size: Some(TableSize { rows: 2, columns: 3 }),
        };

        save_config_flags(&path, &flags).unwrap();
        assert_eq!(load_config_flags(&path).unwrap(), flags);

        clear_config_flags(&path).unwrap();
        assert!(!path.exists());
        assert_eq!(load_config_flags(&path).unwrap(), ConfigFlags::default());
    }

    #[test]
    fn test_eol_mode_maps_to_line_ending() {
        assert_eq!(EolMode::Auto.line_ending(), None);
        assert_eq!(EolMode::Crlf.line_ending(), Some(LineEnding::CrLf));
    }
}
