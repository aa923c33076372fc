// Copyright 2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! WOFF container decoding.
//!
//! Every entry point validates the whole container first, then pulls out one
//! block. See the WOFF spec: `http://people.mozilla.org/~jkew/woff/woff-spec-latest.html`

use byteorder::{BigEndian, ByteOrder, ReadBytesExt, WriteBytesExt};
use flate2::read::ZlibDecoder;
use log::{debug, trace};
use std::fmt;
use std::io::{Cursor, Read};

use crate::status::{DecodeError, Status, Warning};

const WOFF_SIGNATURE: u32 = 0x774f_4646;
const WOFF_HEADER_SIZE: u64 = 44;
const WOFF_DIRECTORY_ENTRY_SIZE: u64 = 20;
const OTF_HEADER_SIZE: u32 = 12;
const OTF_DIRECTORY_ENTRY_SIZE: u32 = 16;

const FLAVOR_TRUETYPE: u32 = 0x0001_0000;
const FLAVOR_CFF: u32 = 0x4f54_544f; // 'OTTO'
const FLAVOR_APPLE: u32 = 0x7472_7565; // 'true'

const TAG_HEAD: u32 = 0x6865_6164;
const HEAD_ADJUSTMENT_OFFSET: usize = 8;
const CHECKSUM_MAGIC: u32 = 0xb1b0_afba;

/// "WOFF Header", http://people.mozilla.org/~jkew/woff/woff-spec-latest.html
struct WoffHeader {
    signature: u32,
    flavor: u32,
    length: u32,
    num_tables: u16,
    reserved: u16,
    total_sfnt_size: u32,
    major_version: u16,
    minor_version: u16,
    meta_offset: u32,
    meta_length: u32,
    meta_orig_length: u32,
    priv_offset: u32,
    priv_length: u32,
}

struct OtfHeader {
    flavor: u32,
    num_tables: u16,
    search_range: u16,
    entry_selector: u16,
    range_shift: u16,
}

/// "WOFF TableDirectoryEntry", http://people.mozilla.org/~jkew/woff/woff-spec-latest.html
struct WoffTableDirectoryEntry {
    tag: u32,
    offset: u32,
    comp_length: u32,
    orig_length: u32,
    orig_checksum: u32,
}

struct OtfTableDirectoryEntry {
    tag: u32,
    checksum: u32,
    offset: u32,
    orig_length: u32,
}

/// The outcome of one extraction: the block, if any, and the decoder status.
///
/// `data` is `None` whenever `status` is a failure, and also when the
/// requested block is simply not present in the file.
#[derive(Debug, PartialEq, Eq)]
pub struct Extraction {
    pub data: Option<Vec<u8>>,
    pub status: Status,
}

impl Extraction {
    fn failed(status: Status) -> Extraction {
        Extraction { data: None, status }
    }
}

/// The font version recorded in the WOFF header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Version {
    pub major: u16,
    pub minor: u16,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// A validated container. `data` is cut to the length the header declares.
struct Container<'a> {
    data: &'a [u8],
    header: WoffHeader,
    tables: Vec<WoffTableDirectoryEntry>,
}

impl<'a> Container<'a> {
    fn block(&self, offset: u32, length: u32) -> &'a [u8] {
        let data = self.data;
        &data[offset as usize..offset as usize + length as usize]
    }

    fn metadata(&self) -> Option<&'a [u8]> {
        let header = &self.header;
        block_present(header.meta_offset, header.meta_length)
            .then(|| self.block(header.meta_offset, header.meta_length))
    }

    fn private_data(&self) -> Option<&'a [u8]> {
        let header = &self.header;
        block_present(header.priv_offset, header.priv_length)
            .then(|| self.block(header.priv_offset, header.priv_length))
    }
}

fn block_present(offset: u32, length: u32) -> bool {
    offset != 0 && length != 0
}

fn invalid<E>(_: E) -> DecodeError {
    DecodeError::Invalid
}

fn padded(length: u64) -> u64 {
    (length + 3) & !3
}

fn read_header(reader: &mut Cursor<&[u8]>) -> Result<WoffHeader, DecodeError> {
    Ok(WoffHeader {
        signature: reader.read_u32::<BigEndian>().map_err(invalid)?,
        flavor: reader.read_u32::<BigEndian>().map_err(invalid)?,
        length: reader.read_u32::<BigEndian>().map_err(invalid)?,
        num_tables: reader.read_u16::<BigEndian>().map_err(invalid)?,
        reserved: reader.read_u16::<BigEndian>().map_err(invalid)?,
        total_sfnt_size: reader.read_u32::<BigEndian>().map_err(invalid)?,
        major_version: reader.read_u16::<BigEndian>().map_err(invalid)?,
        minor_version: reader.read_u16::<BigEndian>().map_err(invalid)?,
        meta_offset: reader.read_u32::<BigEndian>().map_err(invalid)?,
        meta_length: reader.read_u32::<BigEndian>().map_err(invalid)?,
        meta_orig_length: reader.read_u32::<BigEndian>().map_err(invalid)?,
        priv_offset: reader.read_u32::<BigEndian>().map_err(invalid)?,
        priv_length: reader.read_u32::<BigEndian>().map_err(invalid)?,
    })
}

fn read_directory_entry(
    reader: &mut Cursor<&[u8]>,
) -> Result<WoffTableDirectoryEntry, DecodeError> {
    Ok(WoffTableDirectoryEntry {
        tag: reader.read_u32::<BigEndian>().map_err(invalid)?,
        offset: reader.read_u32::<BigEndian>().map_err(invalid)?,
        comp_length: reader.read_u32::<BigEndian>().map_err(invalid)?,
        orig_length: reader.read_u32::<BigEndian>().map_err(invalid)?,
        orig_checksum: reader.read_u32::<BigEndian>().map_err(invalid)?,
    })
}

/// Checks the header, the table directory and the extent of every block.
fn sanity_check<'a>(woff: &'a [u8], status: &mut Status) -> Result<Container<'a>, DecodeError> {
    if (woff.len() as u64) < WOFF_HEADER_SIZE {
        return Err(DecodeError::Invalid);
    }

    let mut reader = Cursor::new(woff);
    let header = read_header(&mut reader)?;
    if header.signature != WOFF_SIGNATURE {
        return Err(DecodeError::BadSignature);
    }

    let length = header.length as u64;
    if length > woff.len() as u64 {
        return Err(DecodeError::Invalid);
    }
    if length < woff.len() as u64 {
        status.warn(Warning::TrailingData);
    }
    if header.reserved != 0 {
        return Err(DecodeError::Invalid);
    }
    if !matches!(header.flavor, FLAVOR_TRUETYPE | FLAVOR_CFF | FLAVOR_APPLE) {
        status.warn(Warning::UnknownVersion);
    }

    let directory_end = WOFF_HEADER_SIZE + WOFF_DIRECTORY_ENTRY_SIZE * header.num_tables as u64;
    if directory_end > length {
        return Err(DecodeError::Invalid);
    }

    let mut tables: Vec<WoffTableDirectoryEntry> = Vec::with_capacity(header.num_tables as usize);
    for _ in 0..header.num_tables {
        let entry = read_directory_entry(&mut reader)?;
        if tables.last().map_or(false, |previous| entry.tag <= previous.tag) {
            return Err(DecodeError::IllegalOrder);
        }
        let end = entry.offset as u64 + entry.comp_length as u64;
        if (entry.offset as u64) < directory_end
            || end > length
            || entry.comp_length > entry.orig_length
        {
            return Err(DecodeError::Invalid);
        }
        if entry.offset % 4 != 0 {
            status.warn(Warning::MisalignedTable);
        }
        tables.push(entry);
    }

    // (start, end, is a font table) for every block, to catch overlaps.
    let mut extents: Vec<(u64, u64, bool)> = tables
        .iter()
        .map(|t| (t.offset as u64, t.offset as u64 + t.comp_length as u64, true))
        .collect();

    if block_present(header.meta_offset, header.meta_length) {
        let start = header.meta_offset as u64;
        let end = start + header.meta_length as u64;
        if start < directory_end || end > length || header.meta_orig_length == 0 {
            return Err(DecodeError::Invalid);
        }
        extents.push((start, end, false));
    }
    if block_present(header.priv_offset, header.priv_length) {
        let start = header.priv_offset as u64;
        let end = start + header.priv_length as u64;
        if start < directory_end || end > length {
            return Err(DecodeError::Invalid);
        }
        extents.push((start, end, false));
    }

    extents.sort_unstable();
    for pair in extents.windows(2) {
        if pair[1].0 < pair[0].1 {
            return Err(DecodeError::Invalid);
        }
    }
    if let Some(&(_, end, true)) = extents.last() {
        if padded(end) != length {
            status.warn(Warning::UnpaddedTable);
        }
    }

    trace!(
        "woff container: flavor {:#010x}, {} tables, {} bytes",
        header.flavor,
        header.num_tables,
        length
    );

    Ok(Container { data: &woff[..length as usize], header, tables })
}

/// Validates `woff`, then runs `extract` against it, folding any failure into
/// the returned status.
fn extract_with<F>(woff: &[u8], extract: F) -> Extraction
where
    F: FnOnce(&Container<'_>, &mut Status) -> Result<Option<Vec<u8>>, DecodeError>,
{
    let mut status = Status::OK;
    let result =
        sanity_check(woff, &mut status).and_then(|container| extract(&container, &mut status));
    match result {
        Ok(data) => Extraction { data, status },
        Err(error) => {
            debug!("woff decode failed: {}", error);
            Extraction::failed(status.fail(error))
        }
    }
}

fn inflate(compressed: &[u8], orig_length: u32) -> Result<Vec<u8>, DecodeError> {
    let mut inflated = Vec::new();
    inflated
        .try_reserve_exact(orig_length as usize)
        .map_err(|_| DecodeError::OutOfMemory)?;
    // One byte of slack so an over-long stream is caught rather than cut.
    ZlibDecoder::new(compressed)
        .take(orig_length as u64 + 1)
        .read_to_end(&mut inflated)
        .map_err(|_| DecodeError::CompressionFailure)?;
    if inflated.len() != orig_length as usize {
        return Err(DecodeError::CompressionFailure);
    }
    Ok(inflated)
}

/// Sums the data as big-endian 32-bit words, zero-padding the tail.
pub fn checksum(data: &[u8]) -> u32 {
    data.chunks(4).fold(0u32, |sum, chunk| {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        sum.wrapping_add(BigEndian::read_u32(&word))
    })
}

fn table_checksum(tag: u32, data: &[u8]) -> u32 {
    if tag == TAG_HEAD && data.len() >= HEAD_ADJUSTMENT_OFFSET + 4 {
        let mut head = data.to_vec();
        head[HEAD_ADJUSTMENT_OFFSET..HEAD_ADJUSTMENT_OFFSET + 4].fill(0);
        checksum(&head)
    } else {
        checksum(data)
    }
}

// Hacker's Delight.
fn previous_power_of_two(x: u16) -> u16 {
    if x == 0 {
        0
    } else {
        1 << (15 - x.leading_zeros())
    }
}

fn write_font(
    container: &Container<'_>,
    status: &mut Status,
) -> Result<Option<Vec<u8>>, DecodeError> {
    fn out_of_memory<E>(_: E) -> DecodeError {
        DecodeError::OutOfMemory
    }

    let woff_header = &container.header;
    let woff_table_directory_entries = &container.tables;

    let num_tables_previous_power_of_two = previous_power_of_two(woff_header.num_tables);
    let otf_search_range = num_tables_previous_power_of_two.wrapping_mul(16);
    let otf_header = OtfHeader {
        flavor: woff_header.flavor,
        num_tables: woff_header.num_tables,
        search_range: otf_search_range,
        entry_selector: if num_tables_previous_power_of_two == 0 {
            0
        } else {
            num_tables_previous_power_of_two.trailing_zeros() as u16
        },
        range_shift: woff_header.num_tables.wrapping_mul(16).wrapping_sub(otf_search_range),
    };

    // Table data goes out in the order it sits in the WOFF file.
    let mut data_order: Vec<usize> = (0..woff_table_directory_entries.len()).collect();
    data_order.sort_by_key(|&i| woff_table_directory_entries[i].offset);

    let mut decoded = Vec::with_capacity(woff_table_directory_entries.len());
    for woff_table_directory_entry in woff_table_directory_entries {
        let compressed = container.block(
            woff_table_directory_entry.offset,
            woff_table_directory_entry.comp_length,
        );
        let orig_length = woff_table_directory_entry.orig_length;
        let table = if woff_table_directory_entry.comp_length < orig_length {
            inflate(compressed, orig_length)?
        } else {
            compressed.to_vec()
        };
        decoded.push(table);
    }

    let mut otf_offsets = vec![0u32; woff_table_directory_entries.len()];
    let mut otf_offset = OTF_HEADER_SIZE as u64
        + OTF_DIRECTORY_ENTRY_SIZE as u64 * woff_table_directory_entries.len() as u64;
    for &i in &data_order {
        otf_offsets[i] = u32::try_from(otf_offset).map_err(invalid)?;
        otf_offset = padded(otf_offset + woff_table_directory_entries[i].orig_length as u64);
    }
    let otf_length = usize::try_from(otf_offset).map_err(invalid)?;

    let mut corrected = false;
    let mut otf_table_directory_entries = Vec::with_capacity(woff_table_directory_entries.len());
    for ((woff_table_directory_entry, table), &offset) in woff_table_directory_entries
        .iter()
        .zip(&decoded)
        .zip(&otf_offsets)
    {
        let computed = table_checksum(woff_table_directory_entry.tag, table);
        if computed != woff_table_directory_entry.orig_checksum {
            debug!(
                "checksum mismatch in table {:#010x}: stored {:#010x}, computed {:#010x}",
                woff_table_directory_entry.tag, woff_table_directory_entry.orig_checksum, computed
            );
            status.warn(Warning::ChecksumMismatch);
            corrected = true;
        }
        otf_table_directory_entries.push(OtfTableDirectoryEntry {
            tag: woff_table_directory_entry.tag,
            checksum: computed,
            offset,
            orig_length: woff_table_directory_entry.orig_length,
        });
    }

    let mut otf = Vec::new();
    otf.try_reserve_exact(otf_length.max(woff_header.total_sfnt_size as usize))
        .map_err(out_of_memory)?;

    otf.write_u32::<BigEndian>(otf_header.flavor).map_err(out_of_memory)?;
    otf.write_u16::<BigEndian>(otf_header.num_tables).map_err(out_of_memory)?;
    otf.write_u16::<BigEndian>(otf_header.search_range).map_err(out_of_memory)?;
    otf.write_u16::<BigEndian>(otf_header.entry_selector).map_err(out_of_memory)?;
    otf.write_u16::<BigEndian>(otf_header.range_shift).map_err(out_of_memory)?;

    for otf_table_directory_entry in &otf_table_directory_entries {
        otf.write_u32::<BigEndian>(otf_table_directory_entry.tag).map_err(out_of_memory)?;
        otf.write_u32::<BigEndian>(otf_table_directory_entry.checksum).map_err(out_of_memory)?;
        otf.write_u32::<BigEndian>(otf_table_directory_entry.offset).map_err(out_of_memory)?;
        otf.write_u32::<BigEndian>(otf_table_directory_entry.orig_length).map_err(out_of_memory)?;
    }

    for &i in &data_order {
        debug_assert_eq!(otf_table_directory_entries[i].offset as usize, otf.len());
        otf.extend_from_slice(&decoded[i]);
        otf.resize(padded(otf.len() as u64) as usize, 0);
        trace!(
            "table {:#010x}: {} -> {} bytes",
            woff_table_directory_entries[i].tag,
            woff_table_directory_entries[i].comp_length,
            woff_table_directory_entries[i].orig_length
        );
    }

    if corrected {
        let head = otf_table_directory_entries.iter().find(|entry| {
            entry.tag == TAG_HEAD && entry.orig_length as usize >= HEAD_ADJUSTMENT_OFFSET + 4
        });
        if let Some(head) = head {
            let at = head.offset as usize + HEAD_ADJUSTMENT_OFFSET;
            otf[at..at + 4].fill(0);
            let adjustment = CHECKSUM_MAGIC.wrapping_sub(checksum(&otf));
            BigEndian::write_u32(&mut otf[at..at + 4], adjustment);
        }
    }

    debug!("reconstructed {} byte font from {} tables", otf.len(), otf_header.num_tables);
    Ok(Some(otf))
}

/// Rebuilds the OpenType font held in a WOFF file.
pub fn decode_font(woff: &[u8]) -> Extraction {
    extract_with(woff, write_font)
}

/// Reads the font version from the WOFF header.
pub fn font_version(woff: &[u8]) -> (Option<Version>, Status) {
    let mut status = Status::OK;
    match sanity_check(woff, &mut status) {
        Ok(container) => {
            let header = &container.header;
            let version = Version { major: header.major_version, minor: header.minor_version };
            (Some(version), status)
        }
        Err(error) => (None, status.fail(error)),
    }
}

/// The font version as a line of text, `"<major>.<minor>\n"`.
pub fn extract_version(woff: &[u8]) -> Extraction {
    match font_version(woff) {
        (Some(version), status) => {
            Extraction { data: Some(format!("{}\n", version).into_bytes()), status }
        }
        (None, status) => Extraction::failed(status),
    }
}

/// Inflates the XML metadata block. Absent metadata gives `data: None`.
pub fn extract_metadata(woff: &[u8]) -> Extraction {
    extract_with(woff, |container, _| match container.metadata() {
        Some(compressed) => inflate(compressed, container.header.meta_orig_length).map(Some),
        None => Ok(None),
    })
}

/// Copies out the private data block. Absent private data gives `data: None`.
pub fn extract_private_data(woff: &[u8]) -> Extraction {
    extract_with(woff, |container, _| Ok(container.private_data().map(<[u8]>::to_vec)))
}
