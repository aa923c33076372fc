// Copyright 2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Command line handling for the extraction tool.

use log::debug;
use std::ffi::OsString;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::extract::{self, ExtractionMode};

pub use crate::extract::exit_code_for;


const PROG: &str = "woffextract";
const EXIT_USAGE: u8 = 1;

#[derive(Debug, PartialEq, Eq)]
pub struct Config {
    pub mode: ExtractionMode,
    pub file_path: PathBuf,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Help,
    Extract(Config),
}

/// Non-fatal problems found while reading the flags.
#[derive(Debug, PartialEq, Eq)]
pub enum Note {
    Unknown(String),
    Ignored { rejected: char, active: char },
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Note::Unknown(option) => write!(f, "unknown option {} ignored", option),
            Note::Ignored { rejected, active } => {
                write!(f, "option -{} ignored (already using -{})", rejected, active)
            }
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgError {
    #[error("expected exactly one WOFF file, got {0}")]
    FileCount(usize),
}

/// Resolves the flags into a command. The first mode flag wins; later ones
/// and unknown flags are recorded in `notes`.
pub fn read_args(
    args: impl Iterator<Item = OsString>,
    notes: &mut Vec<Note>,
) -> Result<Command, ArgError> {
    let mut mode: Option<(ExtractionMode, char)> = None;
    let mut file_paths = Vec::new();
    let mut read_options = true;

    for arg in args {
        // Paths need not be UTF-8; flags always are.
        let arg = match arg.into_string() {
            Ok(arg) if read_options && arg.len() > 1 && arg.starts_with('-') => arg,
            Ok(path) => {
                file_paths.push(PathBuf::from(path));
                continue;
            }
            Err(path) => {
                file_paths.push(PathBuf::from(path));
                continue;
            }
        };
        if arg == "--" {
            read_options = false;
            continue;
        }
        if arg.starts_with("--") {
            notes.push(Note::Unknown(arg));
            continue;
        }
        for flag in arg.chars().skip(1) {
            match (flag, ExtractionMode::from_flag(flag)) {
                ('h' | '?', _) => return Ok(Command::Help),
                (_, Some(selected)) => match mode {
                    Some((_, active)) => notes.push(Note::Ignored { rejected: flag, active }),
                    None => mode = Some((selected, flag)),
                },
                (_, None) => notes.push(Note::Unknown(format!("-{}", flag))),
            }
        }
    }

    if file_paths.len() != 1 {
        return Err(ArgError::FileCount(file_paths.len()));
    }
    Ok(Command::Extract(Config {
        mode: mode.map(|(mode, _)| mode).unwrap_or_default(),
        file_path: file_paths.remove(0),
    }))
}

fn print_usage<E: Write>(stderr: &mut E, prog: &str) {
    let _ = write!(stderr, include_str!("usage.in"), PROG = prog);
}

/// Runs the tool over `args` (program name first) and returns the exit code.
pub fn run<I, O, E>(args: I, stdout: &mut O, stderr: &mut E) -> u8
where
    I: IntoIterator<Item = OsString>,
    O: Write,
    E: Write,
{
    let mut args = args.into_iter();
    let prog = args.next();
    let prog = prog
        .as_deref()
        .and_then(|p| Path::new(p).file_name())
        .and_then(|p| p.to_str())
        .unwrap_or(PROG);

    let mut notes = Vec::new();
    let command = read_args(args, &mut notes);
    for note in &notes {
        let _ = writeln!(stderr, "# {}", note);
    }

    let config = match command {
        Ok(Command::Extract(config)) => config,
        Ok(Command::Help) => {
            print_usage(stderr, prog);
            return 0;
        }
        Err(error) => {
            debug!("{}", error);
            print_usage(stderr, prog);
            return EXIT_USAGE;
        }
    };

    match extract::run_extraction(&config.file_path, config.mode, stdout, stderr) {
        Ok(()) => 0,
        Err(fatal) => {
            debug!("{}", fatal);
            let _ = fatal.report(stderr);
            fatal.exit_code()
        }
    }
}
