//! External mirroring tool strategy.
//!
//! Folders declared with `copy_method = "mirror"` are handed to robocopy
//! (Windows) or rsync instead of the built-in engine. Only folder-scope
//! exclusions are forwarded, as plain names/wildcards understood by the tool.

use crate::config::FolderEntry;
use crate::rules::RuleKind;
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MirrorTool {
    Robocopy,
    Rsync,
}

impl MirrorTool {
    pub fn platform_default() -> Self {
        if cfg!(windows) {
            MirrorTool::Robocopy
        } else {
            MirrorTool::Rsync
        }
    }

    pub fn program(self) -> &'static str {
        match self {
            MirrorTool::Robocopy => "robocopy",
            MirrorTool::Rsync => "rsync",
        }
    }

    /// Robocopy reports copies/extras with codes 1-7; 8 and above are failures.
    pub fn is_success(self, code: i32) -> bool {
        match self {
            MirrorTool::Robocopy => (0..8).contains(&code),
            MirrorTool::Rsync => code == 0,
        }
    }
}

#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: &'static str,
        source: std::io::Error,
    },

    #[error("{program} exited with {}", exit_description(.code))]
    Failed {
        program: &'static str,
        code: Option<i32>,
        output: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct MirrorReport {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub command_line: String,
    /// False in dry-run mode, where the tool is not started.
    pub ran: bool,
    pub exit_code: Option<i32>,
    pub output: String,
    pub elapsed: Duration,
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {code}"),
        None => "a signal".to_string(),
    }
}

/// Arguments for mirroring `source` into `dest`.
pub fn build_args(
    tool: MirrorTool,
    source: &Path,
    dest: &Path,
    folder: &FolderEntry,
    no_delete: bool,
) -> Vec<OsString> {
    let excluded = |kind: RuleKind| {
        folder
            .exclude
            .iter()
            .filter(move |rule| rule.kind == kind)
            .map(|rule| rule.expression.clone())
    };
    let mut args: Vec<OsString> = Vec::new();

    match tool {
        MirrorTool::Robocopy => {
            args.push(source.into());
            args.push(dest.into());
            args.extend(["/NJH", "/NP", "/NDL", "/S"].map(OsString::from));
            if !no_delete {
                args.push("/MIR".into());
            }
            let folders: Vec<_> = excluded(RuleKind::Folder).collect();
            if !folders.is_empty() {
                args.push("/XD".into());
                args.extend(folders.into_iter().map(OsString::from));
            }
            let files: Vec<_> = excluded(RuleKind::File).collect();
            if !files.is_empty() {
                args.push("/XF".into());
                args.extend(files.into_iter().map(OsString::from));
            }
            if let Some(levels) = folder.levels {
                args.push(format!("/LEV:{levels}").into());
            }
        }
        MirrorTool::Rsync => {
            args.push("-rt".into());
            if !no_delete {
                args.push("--delete".into());
            }
            for pattern in excluded(RuleKind::Folder) {
                args.push(format!("--exclude={pattern}/").into());
            }
            for pattern in excluded(RuleKind::File) {
                args.push(format!("--exclude={pattern}").into());
            }
            if let Some(levels) = folder.levels {
                // rsync has no depth flag; keep files up to `levels` deep
                let depth = "*/".repeat(levels);
                args.push(format!("--exclude=/{depth}*").into());
            }
            args.push(trailing_slash(source));
            args.push(trailing_slash(dest));
        }
    }

    args
}

fn trailing_slash(path: &Path) -> OsString {
    let mut s = path.as_os_str().to_os_string();
    if !path.to_string_lossy().ends_with('/') {
        s.push("/");
    }
    s
}

/// Render a command line for display.
pub fn command_line(tool: MirrorTool, args: &[OsString]) -> String {
    std::iter::once(tool.program().to_string())
        .chain(args.iter().map(|a| {
            let a = a.to_string_lossy();
            if a.contains(' ') {
                format!("\"{a}\"")
            } else {
                a.into_owned()
            }
        }))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Mirror one folder with the external tool, blocking until it exits.
///
/// With `run == false` the command is only built and reported.
pub fn run_mirror(
    tool: MirrorTool,
    source: &Path,
    dest: &Path,
    folder: &FolderEntry,
    no_delete: bool,
    run: bool,
) -> Result<MirrorReport, MirrorError> {
    let args = build_args(tool, source, dest, folder, no_delete);
    let line = command_line(tool, &args);
    debug!("Mirror command: {}", line);

    let mut report = MirrorReport {
        source: source.to_path_buf(),
        destination: dest.to_path_buf(),
        command_line: line,
        ran: false,
        exit_code: None,
        output: String::new(),
        elapsed: Duration::ZERO,
    };
    if !run {
        return Ok(report);
    }

    let started = Instant::now();
    let output = Command::new(tool.program())
        .args(&args)
        .output()
        .map_err(|source| MirrorError::Spawn {
            program: tool.program(),
            source,
        })?;
    report.elapsed = started.elapsed();
    report.ran = true;
    report.exit_code = output.status.code();
    report.output = tidy_output(&String::from_utf8_lossy(&output.stdout));

    match report.exit_code {
        Some(code) if tool.is_success(code) => {
            info!("{} finished for {} in {:?}", tool.program(), source.display(), report.elapsed);
            Ok(report)
        }
        code => Err(MirrorError::Failed {
            program: tool.program(),
            code,
            output: report.output,
        }),
    }
}

/// Drop blank lines and robocopy's start/end timestamp lines.
fn tidy_output(raw: &str) -> String {
    raw.lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .filter(|line| {
            let t = line.trim_start();
            !(t.starts_with("Started :") || t.starts_with("Ended :") || t.starts_with("Times :"))
        })
        .collect::<Vec<_>>()
        .join("\n")
}
