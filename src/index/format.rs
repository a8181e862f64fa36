//! Binary encoding of [`ClassSummaryIndex`].
//!
//! Layout (all integers big-endian):
//!
//! ```text
//! magic    "JXDX"
//! version  u8
//! count    u32
//! class*   name, access u16, major u16, minor u16,
//!          has_super u8, [super], interface_count u16, interface*
//! crc32    u32 over every preceding byte
//! ```
//!
//! Strings are a `u16` byte length followed by UTF-8. Classes are written in
//! name order, so equal indices always encode to equal bytes.

use crate::{Error, Result};

use super::IndexWriter;
use super::classfile::{ClassSummary, ClassSummaryIndex};

/// Leading magic bytes of a serialized index.
pub const INDEX_MAGIC: [u8; 4] = *b"JXDX";

/// Current format version.
pub const INDEX_VERSION: u8 = 1;

/// Deterministic writer for [`ClassSummaryIndex`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryIndexWriter;

impl IndexWriter<ClassSummaryIndex> for BinaryIndexWriter {
    fn write(&self, index: &ClassSummaryIndex) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(16 + index.len() * 48);
        out.extend_from_slice(&INDEX_MAGIC);
        out.push(INDEX_VERSION);
        let count = u32::try_from(index.len())
            .map_err(|_| Error::InvalidIndex(format!("too many classes: {}", index.len())))?;
        out.extend_from_slice(&count.to_be_bytes());

        for class in index.classes() {
            put_str(&mut out, &class.name)?;
            out.extend_from_slice(&class.access_flags.to_be_bytes());
            out.extend_from_slice(&class.major_version.to_be_bytes());
            out.extend_from_slice(&class.minor_version.to_be_bytes());
            match &class.super_name {
                Some(name) => {
                    out.push(1);
                    put_str(&mut out, name)?;
                }
                None => out.push(0),
            }
            let interfaces = u16::try_from(class.interfaces.len()).map_err(|_| {
                Error::InvalidIndex(format!("too many interfaces on {}", class.name))
            })?;
            out.extend_from_slice(&interfaces.to_be_bytes());
            for interface in &class.interfaces {
                put_str(&mut out, interface)?;
            }
        }

        let crc = crc32fast::hash(&out);
        out.extend_from_slice(&crc.to_be_bytes());
        Ok(out)
    }
}

/// Decodes bytes produced by [`BinaryIndexWriter`].
///
/// # Errors
///
/// Returns [`Error::InvalidIndex`] for a wrong magic, unknown version, CRC
/// mismatch, truncation or trailing garbage.
pub fn read_index(bytes: &[u8]) -> Result<ClassSummaryIndex> {
    if bytes.len() < INDEX_MAGIC.len() + 1 + 4 + 4 {
        return Err(Error::InvalidIndex("index too short".into()));
    }
    let (body, trailer) = bytes.split_at(bytes.len() - 4);
    let expected = u32::from_be_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    let actual = crc32fast::hash(body);
    if expected != actual {
        return Err(Error::InvalidIndex(format!(
            "checksum mismatch: expected {expected:#010x}, got {actual:#010x}"
        )));
    }

    let mut cursor = Cursor { data: body, pos: 0 };
    if cursor.take(4)? != INDEX_MAGIC {
        return Err(Error::InvalidIndex("bad magic".into()));
    }
    let version = cursor.u8()?;
    if version != INDEX_VERSION {
        return Err(Error::InvalidIndex(format!("unsupported version {version}")));
    }

    let count = cursor.u32()? as usize;
    let mut classes = Vec::with_capacity(count.min(body.len()));
    for _ in 0..count {
        let name = cursor.string()?;
        let access_flags = cursor.u16()?;
        let major_version = cursor.u16()?;
        let minor_version = cursor.u16()?;
        let super_name = match cursor.u8()? {
            0 => None,
            1 => Some(cursor.string()?),
            flag => return Err(Error::InvalidIndex(format!("bad super flag {flag}"))),
        };
        let interface_count = cursor.u16()?;
        let mut interfaces = Vec::with_capacity(interface_count as usize);
        for _ in 0..interface_count {
            interfaces.push(cursor.string()?);
        }
        classes.push(ClassSummary {
            name,
            super_name,
            interfaces,
            access_flags,
            major_version,
            minor_version,
        });
    }

    if cursor.pos != body.len() {
        return Err(Error::InvalidIndex(format!(
            "{} trailing bytes",
            body.len() - cursor.pos
        )));
    }
    Ok(ClassSummaryIndex::new(classes))
}

fn put_str(out: &mut Vec<u8>, value: &str) -> Result<()> {
    let len = u16::try_from(value.len())
        .map_err(|_| Error::InvalidIndex(format!("string too long: {} bytes", value.len())))?;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(value.as_bytes());
    Ok(())
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| Error::InvalidIndex("unexpected end of index".into()))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn string(&mut self) -> Result<String> {
        let len = self.u16()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| Error::InvalidIndex(format!("invalid UTF-8 in index: {e}")))
    }
}
