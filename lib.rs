// Copyright 2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A pure-Rust WOFF decoder and the block extraction front-end built on it.
//!
//! The decoder (`decode`) turns a WOFF file held in memory into one of its
//! blocks: the reconstructed OpenType font, the header version, the XML
//! metadata or the private data. Each entry point reports a [`Status`]
//! that separates fatal failures from warnings.
//!
//! The `cli` and `extract` modules drive the decoder from the command line.
//!
//! See the WOFF spec: `http://people.mozilla.org/~jkew/woff/woff-spec-latest.html`

pub mod cli;
pub mod decode;
pub mod extract;
pub mod status;

pub use decode::{
    decode_font, extract_metadata, extract_private_data, extract_version, font_version,
    Extraction, Version,
};
pub use status::{DecodeError, Status, Warning};
