// Copyright 2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Loading a WOFF file, routing it to one decoder entry point and writing
//! the result out.

use log::debug;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::decode::{self, Extraction};
use crate::status::Status;

/// Which block of the WOFF file goes to the output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExtractionMode {
    #[default]
    FullFont,
    Version,
    Metadata,
    PrivateData,
}

impl ExtractionMode {
    pub fn from_flag(flag: char) -> Option<ExtractionMode> {
        match flag {
            'v' => Some(ExtractionMode::Version),
            'm' => Some(ExtractionMode::Metadata),
            'p' => Some(ExtractionMode::PrivateData),
            _ => None,
        }
    }

    /// The decoder entry point for this mode.
    pub fn decoder(self) -> fn(&[u8]) -> Extraction {
        match self {
            ExtractionMode::FullFont => decode::decode_font,
            ExtractionMode::Version => decode::extract_version,
            ExtractionMode::Metadata => decode::extract_metadata,
            ExtractionMode::PrivateData => decode::extract_private_data,
        }
    }

    /// Written in place of the block when the file does not carry one.
    pub fn placeholder(self) -> &'static str {
        match self {
            ExtractionMode::FullFont => "<!-- No OpenType font data available. -->",
            ExtractionMode::Version => "<!-- No WOFF version available. -->",
            ExtractionMode::Metadata => "<!-- No WOFF metadata available. -->",
            ExtractionMode::PrivateData => "<!-- No WOFF private data available. -->",
        }
    }

    fn noun(self) -> &'static str {
        match self {
            ExtractionMode::FullFont => "font data",
            ExtractionMode::Version => "version",
            ExtractionMode::Metadata => "metadata",
            ExtractionMode::PrivateData => "private data",
        }
    }
}

/// Conditions that end the run. Each maps to a process exit code.
///
/// Users see `Decode` through `Status::print`; its `Display` goes to the log.
#[derive(Debug, Error)]
pub enum Fatal {
    #[error("unable to open file {}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("seek failure")]
    Seek(#[source] io::Error),
    #[error("malloc failure ({0} bytes)")]
    Alloc(u64),
    #[error("file read failure")]
    Read(#[source] io::Error),
    #[error("error writing {} to output", .0.noun())]
    Write(ExtractionMode, #[source] io::Error),
    #[error("decoder failure {0:?}")]
    Decode(Status),
}

impl Fatal {
    pub fn exit_code(&self) -> u8 {
        match self {
            Fatal::Decode(status) => exit_code_for(*status).unwrap_or(2),
            _ => 2,
        }
    }

    /// Writes the one-line diagnostic for this condition.
    pub fn report<E: Write>(&self, stderr: &mut E) -> io::Result<()> {
        match self {
            Fatal::Decode(status) => status.print(stderr, "### "),
            _ => writeln!(stderr, "# fatal error: {}", self),
        }
    }
}

/// The exit code for a decoder status, if the status ends the run.
pub fn exit_code_for(status: Status) -> Option<u8> {
    status.is_failure().then(|| status.exit_code())
}

/// Reads the whole file into a buffer of exactly its length.
pub fn load_file(path: &Path) -> Result<Vec<u8>, Fatal> {
    let mut file =
        File::open(path).map_err(|source| Fatal::Open { path: path.to_owned(), source })?;

    let length = file.seek(SeekFrom::End(0)).map_err(Fatal::Seek)?;
    file.seek(SeekFrom::Start(0)).map_err(Fatal::Seek)?;

    let size = usize::try_from(length).map_err(|_| Fatal::Alloc(length))?;
    let mut data = Vec::new();
    data.try_reserve_exact(size).map_err(|_| Fatal::Alloc(length))?;
    data.resize(size, 0);
    file.read_exact(&mut data).map_err(Fatal::Read)?;

    debug!("loaded {} bytes from {}", size, path.display());
    Ok(data)
}

/// Passes the status through, or turns a failure into `Fatal::Decode`.
/// Warnings are written to `stderr` and do not stop the run.
pub fn check_status<E: Write>(status: Status, stderr: &mut E) -> Result<(), Fatal> {
    if status.is_failure() {
        return Err(Fatal::Decode(status));
    }
    if status.is_warning() {
        let _ = status.print(stderr, "### ");
    }
    Ok(())
}

/// Writes the block verbatim, or the mode's placeholder line when absent.
pub fn write_output<O: Write>(
    mode: ExtractionMode,
    data: Option<&[u8]>,
    stdout: &mut O,
) -> Result<(), Fatal> {
    let result = match data {
        Some(bytes) if !bytes.is_empty() => stdout.write_all(bytes),
        _ => writeln!(stdout, "{}", mode.placeholder()),
    };
    result.and_then(|_| stdout.flush()).map_err(|e| Fatal::Write(mode, e))
}

/// Load, decode, report, write. Both buffers are dropped on every return.
pub fn run_extraction<O, E>(
    path: &Path,
    mode: ExtractionMode,
    stdout: &mut O,
    stderr: &mut E,
) -> Result<(), Fatal>
where
    O: Write,
    E: Write,
{
    let woff = load_file(path)?;

    debug!("extracting {:?}", mode);
    let Extraction { data, status } = (mode.decoder())(&woff);
    check_status(status, stderr)?;

    write_output(mode, data.as_deref(), stdout)
}
