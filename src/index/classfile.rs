//! Default indexer: per-class header summaries.
//!
//! Only the class-file header is decoded: version, constant pool, access
//! flags, this/super class and implemented interfaces. Fields, methods and
//! attributes are left unread.

use std::io::Read;

use thiserror::Error;

use super::Indexer;

const CLASS_MAGIC: u32 = 0xCAFE_BABE;

/// Errors raised while decoding a class file header.
#[derive(Debug, Error)]
pub enum ClassParseError {
    /// The class file ended before the header was complete.
    #[error("unexpected end of class file")]
    UnexpectedEof,
    /// The first four bytes are not `0xCAFEBABE`.
    #[error("invalid class file magic header")]
    InvalidMagic,
    /// The constant pool contains an unknown tag.
    #[error("unsupported constant pool tag {tag}")]
    UnsupportedConstant {
        /// The offending tag.
        tag: u8,
    },
    /// A constant pool reference points at the wrong kind of constant.
    #[error("invalid constant pool index {index}")]
    InvalidConstantIndex {
        /// The offending index.
        index: u16,
    },
    /// A class name constant is not valid modified UTF-8.
    #[error("invalid modified UTF-8 in constant pool entry {index}")]
    InvalidUtf8 {
        /// The offending constant pool index.
        index: u16,
    },
    /// Reading the class stream failed.
    #[error("could not read class file: {0}")]
    Io(#[from] std::io::Error),
}

/// Header summary of one class.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClassSummary {
    /// Binary name with `/` separators, e.g. `com/example/Foo`.
    pub name: String,
    /// Super class name, `None` for `java/lang/Object` and module descriptors.
    pub super_name: Option<String>,
    /// Implemented interfaces in declaration order.
    pub interfaces: Vec<String>,
    /// Class access flags.
    pub access_flags: u16,
    /// Class file major version.
    pub major_version: u16,
    /// Class file minor version.
    pub minor_version: u16,
}

impl ClassSummary {
    /// Returns the package part of the binary name, `""` for the default package.
    pub fn package(&self) -> &str {
        self.name.rsplit_once('/').map(|(pkg, _)| pkg).unwrap_or("")
    }
}

/// The finished index of [`ClassSummaryIndexer`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassSummaryIndex {
    classes: Vec<ClassSummary>,
}

impl ClassSummaryIndex {
    /// Creates an index from summaries, sorting them by name.
    pub fn new(mut classes: Vec<ClassSummary>) -> Self {
        classes.sort();
        Self { classes }
    }

    /// Returns the summaries sorted by name.
    pub fn classes(&self) -> &[ClassSummary] {
        &self.classes
    }

    /// Returns the number of classes.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Returns `true` if no class was indexed.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Finds a class by binary name.
    pub fn get(&self, name: &str) -> Option<&ClassSummary> {
        self.classes
            .binary_search_by(|c| c.name.as_str().cmp(name))
            .ok()
            .map(|i| &self.classes[i])
    }
}

/// Indexer that records a [`ClassSummary`] per class file.
///
/// The result does not depend on the order in which class files are offered.
#[derive(Debug, Default)]
pub struct ClassSummaryIndexer {
    classes: Vec<ClassSummary>,
    buffer: Vec<u8>,
}

impl Indexer for ClassSummaryIndexer {
    type Index = ClassSummaryIndex;
    type Error = ClassParseError;

    fn index(&mut self, class_file: &mut dyn Read) -> Result<(), ClassParseError> {
        self.buffer.clear();
        class_file.read_to_end(&mut self.buffer)?;
        let summary = parse_class_header(&self.buffer)?;
        self.classes.push(summary);
        Ok(())
    }

    fn complete(self) -> ClassSummaryIndex {
        ClassSummaryIndex::new(self.classes)
    }
}

/// Decodes the header of a class file.
pub fn parse_class_header(bytes: &[u8]) -> Result<ClassSummary, ClassParseError> {
    let mut reader = ClassReader::new(bytes);
    if reader.read_u4()? != CLASS_MAGIC {
        return Err(ClassParseError::InvalidMagic);
    }
    let minor_version = reader.read_u2()?;
    let major_version = reader.read_u2()?;
    let pool = ConstantPool::parse(&mut reader)?;

    let access_flags = reader.read_u2()?;
    let this_class = reader.read_u2()?;
    let super_class = reader.read_u2()?;

    let interfaces_count = reader.read_u2()?;
    let mut interfaces = Vec::with_capacity(interfaces_count as usize);
    for _ in 0..interfaces_count {
        interfaces.push(pool.class_name(reader.read_u2()?)?);
    }

    let super_name = match super_class {
        0 => None,
        index => Some(pool.class_name(index)?),
    };

    Ok(ClassSummary {
        name: pool.class_name(this_class)?,
        super_name,
        interfaces,
        access_flags,
        major_version,
        minor_version,
    })
}

#[derive(Debug, Clone)]
enum Constant<'a> {
    Utf8(&'a [u8]),
    Class { name_index: u16 },
    Other,
    Unusable,
}

struct ConstantPool<'a> {
    entries: Vec<Constant<'a>>,
}

impl<'a> ConstantPool<'a> {
    fn parse(reader: &mut ClassReader<'a>) -> Result<Self, ClassParseError> {
        let count = reader.read_u2()? as usize;
        let mut entries = Vec::with_capacity(count);
        entries.push(Constant::Unusable); // index 0 unused

        let mut index = 1;
        while index < count {
            let tag = reader.read_u1()?;
            let entry = match tag {
                1 => {
                    let length = reader.read_u2()? as usize;
                    // Decoded on demand, only class names are ever read.
                    Constant::Utf8(reader.read_slice(length)?)
                }
                7 => Constant::Class {
                    name_index: reader.read_u2()?,
                },
                3 | 4 | 9 | 10 | 11 | 12 | 17 | 18 => {
                    reader.skip(4)?;
                    Constant::Other
                }
                5 | 6 => {
                    // Long and double take two slots.
                    reader.skip(8)?;
                    entries.push(Constant::Other);
                    index += 1;
                    Constant::Unusable
                }
                8 | 16 | 19 | 20 => {
                    reader.skip(2)?;
                    Constant::Other
                }
                15 => {
                    reader.skip(3)?;
                    Constant::Other
                }
                other => return Err(ClassParseError::UnsupportedConstant { tag: other }),
            };
            entries.push(entry);
            index += 1;
        }

        Ok(Self { entries })
    }

    fn utf8(&self, index: u16) -> Result<String, ClassParseError> {
        match self.entries.get(index as usize) {
            Some(Constant::Utf8(bytes)) => {
                decode_modified_utf8(bytes).ok_or(ClassParseError::InvalidUtf8 { index })
            }
            _ => Err(ClassParseError::InvalidConstantIndex { index }),
        }
    }

    fn class_name(&self, index: u16) -> Result<String, ClassParseError> {
        match self.entries.get(index as usize) {
            Some(Constant::Class { name_index }) => self.utf8(*name_index),
            _ => Err(ClassParseError::InvalidConstantIndex { index }),
        }
    }
}

/// Decodes the JVM's modified UTF-8: `NUL` as `C0 80`, supplementary
/// characters as two encoded surrogates, no four-byte forms.
fn decode_modified_utf8(bytes: &[u8]) -> Option<String> {
    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        let continuation = |k: usize| {
            bytes
                .get(i + k)
                .filter(|c| *c & 0xC0 == 0x80)
                .map(|c| u16::from(*c & 0x3F))
        };
        match b {
            0x01..=0x7F => {
                units.push(u16::from(b));
                i += 1;
            }
            0xC0..=0xDF => {
                units.push((u16::from(b & 0x1F) << 6) | continuation(1)?);
                i += 2;
            }
            0xE0..=0xEF => {
                units.push(
                    (u16::from(b & 0x0F) << 12) | (continuation(1)? << 6) | continuation(2)?,
                );
                i += 3;
            }
            _ => return None,
        }
    }
    char::decode_utf16(units).collect::<Result<String, _>>().ok()
}

struct ClassReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ClassReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn read_slice(&mut self, len: usize) -> Result<&'a [u8], ClassParseError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or(ClassParseError::UnexpectedEof)?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn skip(&mut self, len: usize) -> Result<(), ClassParseError> {
        self.read_slice(len).map(|_| ())
    }

    fn read_u1(&mut self) -> Result<u8, ClassParseError> {
        Ok(self.read_slice(1)?[0])
    }

    fn read_u2(&mut self) -> Result<u16, ClassParseError> {
        let b = self.read_slice(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn read_u4(&mut self) -> Result<u32, ClassParseError> {
        let b = self.read_slice(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}

#[cfg(test)]
/// Assembles a minimal class file: `name extends super implements interfaces`.
pub(crate) fn class_bytes(name: &str, super_name: Option<&str>, interfaces: &[&str]) -> Vec<u8> {
    class_bytes_with_strings(name, super_name, interfaces, &[])
}

#[cfg(test)]
/// Like [`class_bytes`], with extra raw `CONSTANT_Utf8` entries appended to the pool.
pub(crate) fn class_bytes_with_strings(
    name: &str,
    super_name: Option<&str>,
    interfaces: &[&str],
    strings: &[&[u8]],
) -> Vec<u8> {
    let mut pool: Vec<Vec<u8>> = Vec::new();
    let utf8 = |raw: &[u8]| -> Vec<u8> {
        let mut entry = vec![1u8];
        entry.extend_from_slice(&(raw.len() as u16).to_be_bytes());
        entry.extend_from_slice(raw);
        entry
    };
    let add_class = |pool: &mut Vec<Vec<u8>>, n: &str| -> u16 {
        pool.push(utf8(n.as_bytes()));
        let utf8_index = pool.len() as u16;
        let mut class = vec![7u8];
        class.extend_from_slice(&utf8_index.to_be_bytes());
        pool.push(class);
        pool.len() as u16
    };
    let this_index = add_class(&mut pool, name);
    let super_index = super_name.map(|s| add_class(&mut pool, s)).unwrap_or(0);
    let interface_indices: Vec<u16> =
        interfaces.iter().map(|i| add_class(&mut pool, *i)).collect();
    pool.extend(strings.iter().map(|raw| utf8(raw)));

    let mut out = Vec::new();
    out.extend_from_slice(&CLASS_MAGIC.to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes());
    out.extend_from_slice(&61u16.to_be_bytes());
    out.extend_from_slice(&((pool.len() + 1) as u16).to_be_bytes());
    for constant in &pool {
        out.extend_from_slice(constant);
    }
    out.extend_from_slice(&0x0021u16.to_be_bytes());
    out.extend_from_slice(&this_index.to_be_bytes());
    out.extend_from_slice(&super_index.to_be_bytes());
    out.extend_from_slice(&(interface_indices.len() as u16).to_be_bytes());
    for index in interface_indices {
        out.extend_from_slice(&index.to_be_bytes());
    }
    // fields, methods, attributes
    out.extend_from_slice(&[0, 0, 0, 0, 0, 0]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header() {
        let bytes = class_bytes("com/X", Some("java/lang/Object"), &["java/io/Serializable"]);
        let summary = parse_class_header(&bytes).unwrap();
        assert_eq!(summary.name, "com/X");
        assert_eq!(summary.super_name.as_deref(), Some("java/lang/Object"));
        assert_eq!(summary.interfaces, ["java/io/Serializable"]);
        assert_eq!(summary.major_version, 61);
        assert_eq!(summary.access_flags, 0x0021);
        assert_eq!(summary.package(), "com");
    }

    #[test]
    fn test_no_super_class() {
        let bytes = class_bytes("module-info", None, &[]);
        let summary = parse_class_header(&bytes).unwrap();
        assert!(summary.super_name.is_none());
        assert_eq!(summary.package(), "");
    }

    // "a\0b" and U+1F600 as javac encodes them
    const NUL_STRING: &[u8] = &[b'a', 0xC0, 0x80, b'b'];
    const EMOJI_STRING: &[u8] = &[0xED, 0xA0, 0xBD, 0xED, 0xB8, 0x80];

    #[test]
    fn test_modified_utf8_string_constants() {
        let bytes = class_bytes_with_strings(
            "com/Z",
            Some("java/lang/Object"),
            &[],
            &[NUL_STRING, EMOJI_STRING],
        );
        let summary = parse_class_header(&bytes).unwrap();
        assert_eq!(summary.name, "com/Z");

        let mut indexer = ClassSummaryIndexer::default();
        indexer.index(&mut bytes.as_slice()).unwrap();
        assert_eq!(indexer.complete().len(), 1);
    }

    #[test]
    fn test_unreadable_constant_is_ignored() {
        // Not even modified UTF-8, but never referenced
        let bytes = class_bytes_with_strings("com/Z", None, &[], &[&[0xF0, 0x9F, 0x98, 0x80]]);
        assert_eq!(parse_class_header(&bytes).unwrap().name, "com/Z");
    }

    #[test]
    fn test_decode_modified_utf8() {
        assert_eq!(decode_modified_utf8(NUL_STRING).as_deref(), Some("a\0b"));
        assert_eq!(decode_modified_utf8(EMOJI_STRING).as_deref(), Some("\u{1F600}"));
        assert_eq!(
            decode_modified_utf8("caf\u{e9}/\u{4e2d}".as_bytes()).as_deref(),
            Some("caf\u{e9}/\u{4e2d}")
        );
        // Raw NUL, four-byte form, truncated sequence, lone surrogate
        assert!(decode_modified_utf8(&[0x00]).is_none());
        assert!(decode_modified_utf8(&[0xF0, 0x9F, 0x98, 0x80]).is_none());
        assert!(decode_modified_utf8(&[0xC3]).is_none());
        assert!(decode_modified_utf8(&[0xED, 0xA0, 0xBD]).is_none());
    }

    #[test]
    fn test_invalid_class_name_encoding() {
        let mut bytes = class_bytes("com/X", None, &[]);
        // First pool entry is the this-class name; corrupt its first byte
        bytes[13] = 0xFF;
        assert!(matches!(
            parse_class_header(&bytes),
            Err(ClassParseError::InvalidUtf8 { index: 1 })
        ));
    }

    #[test]
    fn test_invalid_magic() {
        assert!(matches!(
            parse_class_header(b"\x00\x00\x00\x00\x00\x00\x00\x00"),
            Err(ClassParseError::InvalidMagic)
        ));
    }

    #[test]
    fn test_truncated() {
        let bytes = class_bytes("com/X", Some("java/lang/Object"), &[]);
        assert!(matches!(
            parse_class_header(&bytes[..12]),
            Err(ClassParseError::UnexpectedEof)
        ));
    }

    #[test]
    fn test_index_is_order_independent() {
        let a = class_bytes("a/A", Some("java/lang/Object"), &[]);
        let b = class_bytes("b/B", Some("a/A"), &[]);

        let mut first = ClassSummaryIndexer::default();
        first.index(&mut a.as_slice()).unwrap();
        first.index(&mut b.as_slice()).unwrap();

        let mut second = ClassSummaryIndexer::default();
        second.index(&mut b.as_slice()).unwrap();
        second.index(&mut a.as_slice()).unwrap();

        let first = first.complete();
        assert_eq!(first, second.complete());
        assert_eq!(first.len(), 2);
        assert_eq!(first.get("b/B").unwrap().super_name.as_deref(), Some("a/A"));
        assert!(first.get("c/C").is_none());
    }
}
