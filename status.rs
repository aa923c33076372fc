// Copyright 2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Decoder status codes.
//!
//! A status is a 32-bit value: the low byte holds at most one failure code,
//! the bits above it are independent warning flags.

use std::fmt;
use std::io::{self, Write};
use thiserror::Error;

const FAILURE_MASK: u32 = 0xff;

/// Fatal decoding conditions. The discriminant is the status low byte.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[repr(u8)]
pub enum DecodeError {
    #[error("out of memory")]
    OutOfMemory = 1,
    #[error("invalid input font")]
    Invalid = 2,
    #[error("zlib decompression failure")]
    CompressionFailure = 3,
    #[error("incorrect WOFF file signature")]
    BadSignature = 4,
    #[error("buffer too small")]
    BufferTooSmall = 5,
    #[error("bad parameter to WOFF function")]
    BadParameter = 6,
    #[error("incorrect table directory order")]
    IllegalOrder = 7,
}

impl DecodeError {
    pub fn from_code(code: u8) -> Option<DecodeError> {
        use DecodeError::*;
        Some(match code {
            1 => OutOfMemory,
            2 => Invalid,
            3 => CompressionFailure,
            4 => BadSignature,
            5 => BufferTooSmall,
            6 => BadParameter,
            7 => IllegalOrder,
            _ => return None,
        })
    }
}

/// Non-fatal conditions, in flag order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum Warning {
    UnknownVersion = 0x0100,
    ChecksumMismatch = 0x0200,
    MisalignedTable = 0x0400,
    TrailingData = 0x0800,
    UnpaddedTable = 0x1000,
    RemovedDsig = 0x2000,
}

impl Warning {
    pub const ALL: [Warning; 6] = [
        Warning::UnknownVersion,
        Warning::ChecksumMismatch,
        Warning::MisalignedTable,
        Warning::TrailingData,
        Warning::UnpaddedTable,
        Warning::RemovedDsig,
    ];

    fn message(self) -> &'static str {
        match self {
            Warning::UnknownVersion => "unrecognized sfnt version",
            Warning::ChecksumMismatch => "checksum mismatch (corrected)",
            Warning::MisalignedTable => "misaligned font table",
            Warning::TrailingData => "extraneous input data discarded",
            Warning::UnpaddedTable => "final table not correctly padded",
            Warning::RemovedDsig => "digital signature (DSIG) table removed",
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Status(pub u32);

impl Status {
    pub const OK: Status = Status(0);

    pub fn is_failure(self) -> bool {
        self.0 & FAILURE_MASK != 0
    }

    pub fn is_warning(self) -> bool {
        self.0 & !FAILURE_MASK != 0
    }

    /// The failure byte, which the front-end hands back to the shell.
    pub fn exit_code(self) -> u8 {
        (self.0 & FAILURE_MASK) as u8
    }

    pub fn error(self) -> Option<DecodeError> {
        DecodeError::from_code(self.exit_code())
    }

    pub fn has(self, warning: Warning) -> bool {
        self.0 & warning as u32 != 0
    }

    pub fn warn(&mut self, warning: Warning) {
        self.0 |= warning as u32;
    }

    pub fn warnings(self) -> impl Iterator<Item = Warning> {
        Warning::ALL.into_iter().filter(move |w| self.has(*w))
    }

    /// Keeps the warnings gathered so far and records `error` as the failure.
    pub fn fail(self, error: DecodeError) -> Status {
        Status((self.0 & !FAILURE_MASK) | error as u32)
    }

    /// Writes one line per condition, each starting with `prefix`.
    pub fn print<W: Write>(self, out: &mut W, prefix: &str) -> io::Result<()> {
        if self.is_failure() {
            match self.error() {
                Some(error) => writeln!(out, "{}ERROR: {}", prefix, error)?,
                None => writeln!(out, "{}ERROR: unknown error", prefix)?,
            }
        }
        for warning in self.warnings() {
            writeln!(out, "{}WARNING: {}", prefix, warning)?;
        }
        Ok(())
    }
}

impl From<DecodeError> for Status {
    fn from(error: DecodeError) -> Status {
        Status(error as u32)
    }
}
