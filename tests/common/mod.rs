/* Any copyright is dedicated to the Public Domain.
 * http://creativecommons.org/publicdomain/zero/1.0/ */

//! Synthesised WOFF files for the integration tests.

#![allow(dead_code)]

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write;

pub const TRUETYPE: u32 = 0x0001_0000;
pub const HEADER_SIZE: usize = 44;
pub const DIRECTORY_ENTRY_SIZE: usize = 20;

pub struct Table {
    pub tag: [u8; 4],
    pub data: Vec<u8>,
    pub compress: bool,
    pub bad_checksum: bool,
}

pub struct Woff {
    pub flavor: u32,
    pub major: u16,
    pub minor: u16,
    pub tables: Vec<Table>,
    pub metadata: Option<Vec<u8>>,
    pub private: Option<Vec<u8>>,
    pub sort_tables: bool,
    pub pad_final_block: bool,
}

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn padded(length: usize) -> usize {
    (length + 3) & !3
}

pub fn table_checksum(tag: &[u8; 4], data: &[u8]) -> u32 {
    let mut data = data.to_vec();
    if tag == b"head" && data.len() >= 12 {
        data[8..12].fill(0);
    }
    woff::decode::checksum(&data)
}

/// A `head` table with a recognisable body. Long enough to hold
/// `checkSumAdjustment` at offset 8.
pub fn head_table() -> Vec<u8> {
    let mut head = vec![0u8; 54];
    head[..4].copy_from_slice(&[0, 1, 0, 0]);
    head[8..12].copy_from_slice(&[0x12, 0x34, 0x56, 0x78]);
    head[12..16].copy_from_slice(&[0x5f, 0x0f, 0x3c, 0xf5]);
    head
}

/// Repetitive data that zlib shrinks well.
pub fn compressible(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| seed.wrapping_add((i % 7) as u8)).collect()
}

impl Woff {
    pub fn new() -> Woff {
        Woff {
            flavor: TRUETYPE,
            major: 1,
            minor: 0,
            tables: Vec::new(),
            metadata: None,
            private: None,
            sort_tables: true,
            pad_final_block: true,
        }
    }

    pub fn table(mut self, tag: &[u8; 4], data: Vec<u8>, compress: bool) -> Woff {
        self.tables.push(Table { tag: *tag, data, compress, bad_checksum: false });
        self
    }

    pub fn sample() -> Woff {
        Woff::new()
            .table(b"OS/2", compressible(96, 3), false)
            .table(b"cmap", compressible(262, 40), true)
            .table(b"glyf", compressible(1001, 7), true)
            .table(b"head", head_table(), false)
            .table(b"name", b"Sample Font Regular".to_vec(), false)
    }

    pub fn metadata(mut self, xml: &[u8]) -> Woff {
        self.metadata = Some(xml.to_vec());
        self
    }

    pub fn private(mut self, data: &[u8]) -> Woff {
        self.private = Some(data.to_vec());
        self
    }

    pub fn version(mut self, major: u16, minor: u16) -> Woff {
        self.major = major;
        self.minor = minor;
        self
    }

    pub fn bad_checksum(mut self, tag: &[u8; 4]) -> Woff {
        for table in &mut self.tables {
            if &table.tag == tag {
                table.bad_checksum = true;
            }
        }
        self
    }

    /// The size of the OpenType font these tables decode to.
    pub fn sfnt_size(&self) -> usize {
        12 + 16 * self.tables.len()
            + self.tables.iter().map(|t| padded(t.data.len())).sum::<usize>()
    }

    pub fn build(&self) -> Vec<u8> {
        let mut tables: Vec<&Table> = self.tables.iter().collect();
        if self.sort_tables {
            tables.sort_by_key(|t| t.tag);
        }

        let mut body = Vec::new();
        let mut directory = Vec::new();
        let mut offset = HEADER_SIZE + DIRECTORY_ENTRY_SIZE * tables.len();
        let mut unpadded_end = offset;

        for table in &tables {
            let compressed = zlib(&table.data);
            let stored = if table.compress && compressed.len() < table.data.len() {
                compressed
            } else {
                table.data.clone()
            };
            let mut checksum = table_checksum(&table.tag, &table.data);
            if table.bad_checksum {
                checksum ^= 0xdead_beef;
            }

            directory.write_all(&table.tag).unwrap();
            directory.write_u32::<BigEndian>(offset as u32).unwrap();
            directory.write_u32::<BigEndian>(stored.len() as u32).unwrap();
            directory.write_u32::<BigEndian>(table.data.len() as u32).unwrap();
            directory.write_u32::<BigEndian>(checksum).unwrap();

            body.extend_from_slice(&stored);
            unpadded_end = offset + stored.len();
            offset = padded(unpadded_end);
            body.resize(offset - HEADER_SIZE - DIRECTORY_ENTRY_SIZE * tables.len(), 0);
        }

        let mut meta = (0, 0, 0);
        if let Some(xml) = &self.metadata {
            let compressed = zlib(xml);
            meta = (offset as u32, compressed.len() as u32, xml.len() as u32);
            body.extend_from_slice(&compressed);
            unpadded_end = offset + compressed.len();
            offset = padded(unpadded_end);
            body.resize(offset - HEADER_SIZE - DIRECTORY_ENTRY_SIZE * tables.len(), 0);
        }

        let mut private = (0, 0);
        if let Some(data) = &self.private {
            private = (offset as u32, data.len() as u32);
            body.extend_from_slice(data);
            offset += data.len();
            unpadded_end = offset;
        }

        let length = if self.pad_final_block { offset } else { unpadded_end };
        body.truncate(length - HEADER_SIZE - DIRECTORY_ENTRY_SIZE * tables.len());

        let mut woff = Vec::new();
        woff.write_all(b"wOFF").unwrap();
        woff.write_u32::<BigEndian>(self.flavor).unwrap();
        woff.write_u32::<BigEndian>(length as u32).unwrap();
        woff.write_u16::<BigEndian>(tables.len() as u16).unwrap();
        woff.write_u16::<BigEndian>(0).unwrap();
        woff.write_u32::<BigEndian>(self.sfnt_size() as u32).unwrap();
        woff.write_u16::<BigEndian>(self.major).unwrap();
        woff.write_u16::<BigEndian>(self.minor).unwrap();
        woff.write_u32::<BigEndian>(meta.0).unwrap();
        woff.write_u32::<BigEndian>(meta.1).unwrap();
        woff.write_u32::<BigEndian>(meta.2).unwrap();
        woff.write_u32::<BigEndian>(private.0).unwrap();
        woff.write_u32::<BigEndian>(private.1).unwrap();
        woff.extend_from_slice(&directory);
        woff.extend_from_slice(&body);
        assert_eq!(woff.len(), length);
        woff
    }
}

/// Overwrites a big-endian `u32` field of a built file.
pub fn patch_u32(woff: &mut [u8], at: usize, value: u32) {
    BigEndian::write_u32(&mut woff[at..at + 4], value);
}

pub fn read_u32(data: &[u8], at: usize) -> u32 {
    BigEndian::read_u32(&data[at..at + 4])
}

/// Field offset of table `index`'s directory entry; `field` counts words.
pub fn directory_field(index: usize, field: usize) -> usize {
    HEADER_SIZE + DIRECTORY_ENTRY_SIZE * index + 4 * field
}

/// A parsed sfnt table directory entry: (tag, checksum, offset, length).
pub fn sfnt_directory(otf: &[u8]) -> Vec<([u8; 4], u32, u32, u32)> {
    let num_tables = BigEndian::read_u16(&otf[4..6]) as usize;
    (0..num_tables)
        .map(|i| {
            let at = 12 + 16 * i;
            let mut tag = [0u8; 4];
            tag.copy_from_slice(&otf[at..at + 4]);
            (tag, read_u32(otf, at + 4), read_u32(otf, at + 8), read_u32(otf, at + 12))
        })
        .collect()
}
