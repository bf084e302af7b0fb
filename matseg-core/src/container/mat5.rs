//! `Mat5Container`: reader for Level 5 MAT-files (MATLAB v5 through v7).
//!
//! ## Layout
//!
//! ```text
//! ┌──────────────────────────── 128-byte header ─────────────────────────────┐
//! │ descriptive text (116) │ subsystem offset (8) │ version (2) │ "IM"/"MI" (2) │
//! └──────────────────────────────────────────────────────────────────────────┘
//! data element*   = tag (type u32, byte count u32) + payload, padded to 8 bytes
//!                 | small tag (count u16 << 16 | type u16) + 4-byte payload
//! miCOMPRESSED    = zlib stream inflating to one miMATRIX element (no padding)
//! miMATRIX        = flags, dimensions, name, class-specific sub-elements
//! ```
//!
//! Each top-level `miMATRIX` is one record. Struct variables expose their
//! fields at element 0; any other variable is a record with no fields.
//! Only real `double` arrays are decoded; every other class is reported as
//! [`Field::Unsupported`].
//!
//! The whole file is read on `open`; MAT-files of recorded segments are at
//! most a few hundred megabytes and are consumed in full anyway.

use std::borrow::Cow;
use std::io::Read;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use flate2::read::ZlibDecoder;
use tracing::debug;

use super::{Container, Field, Record};
use crate::error::{Result, SegmentError};

const HEADER_LEN: usize = 128;
const VERSION_5: u16 = 0x0100;
/// Subsystem offset written by tools that leave the field blank.
const BLANK_SUBSYSTEM_OFFSET: u64 = 0x2020_2020_2020_2020;

// Data element types.
const MI_INT8: u32 = 1;
const MI_UINT8: u32 = 2;
const MI_INT16: u32 = 3;
const MI_UINT16: u32 = 4;
const MI_INT32: u32 = 5;
const MI_UINT32: u32 = 6;
const MI_SINGLE: u32 = 7;
const MI_DOUBLE: u32 = 9;
const MI_INT64: u32 = 12;
const MI_UINT64: u32 = 13;
const MI_MATRIX: u32 = 14;
const MI_COMPRESSED: u32 = 15;

// Array classes.
const MX_CELL: u8 = 1;
const MX_STRUCT: u8 = 2;
const MX_OBJECT: u8 = 3;
const MX_CHAR: u8 = 4;
const MX_SPARSE: u8 = 5;
const MX_DOUBLE: u8 = 6;
const MX_SINGLE: u8 = 7;
const MX_INT8: u8 = 8;
const MX_UINT8: u8 = 9;
const MX_INT16: u8 = 10;
const MX_UINT16: u8 = 11;
const MX_INT32: u8 = 12;
const MX_UINT32: u8 = 13;
const MX_INT64: u8 = 14;
const MX_UINT64: u8 = 15;

const FLAG_COMPLEX: u32 = 0x0800;
const FLAG_LOGICAL: u32 = 0x0200;

fn class_name(class: u8) -> &'static str {
    match class {
        MX_CELL => "cell",
        MX_STRUCT => "struct",
        MX_OBJECT => "object",
        MX_CHAR => "char",
        MX_SPARSE => "sparse",
        MX_DOUBLE => "double",
        MX_SINGLE => "single",
        MX_INT8 => "int8",
        MX_UINT8 => "uint8",
        MX_INT16 => "int16",
        MX_UINT16 => "uint16",
        MX_INT32 => "int32",
        MX_UINT32 => "uint32",
        MX_INT64 => "int64",
        MX_UINT64 => "uint64",
        _ => "unknown",
    }
}

fn malformed(reason: impl Into<String>) -> SegmentError {
    SegmentError::ContainerRead(reason.into())
}

// ---------------------------------------------------------------------------
// Byte order
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endian {
    Little,
    Big,
}

impl Endian {
    fn u16(self, bytes: &[u8]) -> u16 {
        match self {
            Endian::Little => LittleEndian::read_u16(bytes),
            Endian::Big => BigEndian::read_u16(bytes),
        }
    }

    fn u32(self, bytes: &[u8]) -> u32 {
        match self {
            Endian::Little => LittleEndian::read_u32(bytes),
            Endian::Big => BigEndian::read_u32(bytes),
        }
    }

    fn u64(self, bytes: &[u8]) -> u64 {
        match self {
            Endian::Little => LittleEndian::read_u64(bytes),
            Endian::Big => BigEndian::read_u64(bytes),
        }
    }

    fn i32(self, bytes: &[u8]) -> i32 {
        match self {
            Endian::Little => LittleEndian::read_i32(bytes),
            Endian::Big => BigEndian::read_i32(bytes),
        }
    }

    /// Widen a numeric payload of `data_type` to `f64`.
    fn numeric(self, data_type: u32, bytes: &[u8]) -> Result<Vec<f64>> {
        match self {
            Endian::Little => numeric_to_f64::<LittleEndian>(data_type, bytes),
            Endian::Big => numeric_to_f64::<BigEndian>(data_type, bytes),
        }
    }
}

fn numeric_width(data_type: u32) -> Option<usize> {
    match data_type {
        MI_INT8 | MI_UINT8 => Some(1),
        MI_INT16 | MI_UINT16 => Some(2),
        MI_INT32 | MI_UINT32 | MI_SINGLE => Some(4),
        MI_DOUBLE | MI_INT64 | MI_UINT64 => Some(8),
        _ => None,
    }
}

fn numeric_to_f64<B: ByteOrder>(data_type: u32, bytes: &[u8]) -> Result<Vec<f64>> {
    let width = numeric_width(data_type)
        .ok_or_else(|| malformed(format!("data type {data_type} is not numeric")))?;
    if bytes.len() % width != 0 {
        return Err(malformed(format!(
            "{} bytes is not a whole number of {width}-byte values",
            bytes.len()
        )));
    }

    let chunks = bytes.chunks_exact(width);
    let values = match data_type {
        MI_INT8 => bytes.iter().map(|&b| b as i8 as f64).collect(),
        MI_UINT8 => bytes.iter().map(|&b| b as f64).collect(),
        MI_INT16 => chunks.map(|c| B::read_i16(c) as f64).collect(),
        MI_UINT16 => chunks.map(|c| B::read_u16(c) as f64).collect(),
        MI_INT32 => chunks.map(|c| B::read_i32(c) as f64).collect(),
        MI_UINT32 => chunks.map(|c| B::read_u32(c) as f64).collect(),
        MI_SINGLE => chunks.map(|c| B::read_f32(c) as f64).collect(),
        MI_DOUBLE => chunks.map(B::read_f64).collect(),
        MI_INT64 => chunks.map(|c| B::read_i64(c) as f64).collect(),
        MI_UINT64 => chunks.map(|c| B::read_u64(c) as f64).collect(),
        _ => unreachable!("width already checked"),
    };
    Ok(values)
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Header {
    endian: Endian,
    /// Absolute offset of the subsystem data element, if any.
    subsystem_offset: Option<usize>,
}

fn parse_header(bytes: &[u8]) -> std::result::Result<Header, String> {
    if bytes.len() < HEADER_LEN {
        return Err(format!(
            "{} bytes is shorter than a MAT-file header",
            bytes.len()
        ));
    }

    let endian = match &bytes[126..128] {
        b"IM" => Endian::Little,
        b"MI" => Endian::Big,
        _ => return Err("missing MAT-file endian indicator".into()),
    };

    let version = endian.u16(&bytes[124..126]);
    if version != VERSION_5 {
        if bytes.starts_with(b"MATLAB 7.3") {
            return Err("v7.3 (HDF5) MAT-files are not supported".into());
        }
        return Err(format!("unsupported MAT-file version {version:#06x}"));
    }

    let offset = endian.u64(&bytes[116..124]);
    let subsystem_offset = match offset {
        0 | BLANK_SUBSYSTEM_OFFSET => None,
        n => usize::try_from(n).ok(),
    };

    Ok(Header {
        endian,
        subsystem_offset,
    })
}

// ---------------------------------------------------------------------------
// Data elements
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Element<'a> {
    data_type: u32,
    data: &'a [u8],
}

/// Sequential tag reader over a byte slice.
struct ElementReader<'a> {
    buf: &'a [u8],
    pos: usize,
    endian: Endian,
}

impl<'a> ElementReader<'a> {
    fn new(buf: &'a [u8], endian: Endian) -> Self {
        Self::at(buf, 0, endian)
    }

    fn at(buf: &'a [u8], pos: usize, endian: Endian) -> Self {
        Self { buf, pos, endian }
    }

    fn next_element(&mut self) -> Result<Option<Element<'a>>> {
        if self.pos >= self.buf.len() {
            return Ok(None);
        }
        let rest = &self.buf[self.pos..];
        if rest.len() < 8 {
            return Err(malformed(format!("truncated tag at offset {}", self.pos)));
        }

        let word = self.endian.u32(&rest[..4]);
        let small_len = (word >> 16) as usize;
        if small_len != 0 {
            if small_len > 4 {
                return Err(malformed(format!(
                    "small element at offset {} claims {small_len} bytes",
                    self.pos
                )));
            }
            self.pos += 8;
            return Ok(Some(Element {
                data_type: word & 0xffff,
                data: &rest[4..4 + small_len],
            }));
        }

        let data_type = word;
        let len = self.endian.u32(&rest[4..8]) as usize;
        let end = 8usize
            .checked_add(len)
            .filter(|&end| end <= rest.len())
            .ok_or_else(|| {
                malformed(format!(
                    "element at offset {} claims {len} bytes, {} remain",
                    self.pos,
                    rest.len() - 8
                ))
            })?;

        let advance = if data_type == MI_COMPRESSED {
            end
        } else {
            8 + len.next_multiple_of(8)
        };
        self.pos = (self.pos + advance).min(self.buf.len());

        Ok(Some(Element {
            data_type,
            data: &rest[8..end],
        }))
    }

    fn expect_element(&mut self, what: &str) -> Result<Element<'a>> {
        self.next_element()?
            .ok_or_else(|| malformed(format!("array ended before its {what}")))
    }
}

// ---------------------------------------------------------------------------
// Arrays
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct ArrayHeader {
    class: u8,
    complex: bool,
    logical: bool,
    dims: Vec<usize>,
    name: String,
}

impl ArrayHeader {
    /// MATLAB's `M × N`: N-d arrays fold trailing dimensions into columns.
    fn shape(&self) -> Result<(usize, usize)> {
        match self.dims.split_first() {
            Some((&rows, rest)) => Ok((rows, self.product(rest)?)),
            None => Ok((0, 0)),
        }
    }

    fn element_count(&self) -> Result<usize> {
        self.product(&self.dims)
    }

    fn product(&self, dims: &[usize]) -> Result<usize> {
        dims.iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| {
                malformed(format!(
                    "array `{}` dimensions {:?} overflow the address space",
                    self.name, self.dims
                ))
            })
    }
}

fn read_array_header(reader: &mut ElementReader<'_>) -> Result<ArrayHeader> {
    let endian = reader.endian;

    let flags = reader.expect_element("array flags")?;
    if flags.data.len() < 4 {
        return Err(malformed("array flags shorter than 4 bytes"));
    }
    let word = endian.u32(&flags.data[..4]);

    let dims = reader.expect_element("dimensions")?;
    if dims.data_type != MI_INT32 || dims.data.len() % 4 != 0 {
        return Err(malformed("dimensions are not an int32 array"));
    }
    let dims = dims
        .data
        .chunks_exact(4)
        .map(|c| {
            usize::try_from(endian.i32(c)).map_err(|_| malformed("negative array dimension"))
        })
        .collect::<Result<Vec<_>>>()?;

    let name = reader.expect_element("name")?;

    Ok(ArrayHeader {
        class: (word & 0xff) as u8,
        complex: word & FLAG_COMPLEX != 0,
        logical: word & FLAG_LOGICAL != 0,
        dims,
        name: String::from_utf8_lossy(name.data).into_owned(),
    })
}

/// Decoded value of one struct field.
#[derive(Debug, Clone, PartialEq)]
enum FieldValue {
    Double {
        rows: usize,
        cols: usize,
        values: Vec<f64>,
    },
    Unsupported(&'static str),
}

/// Parse the payload of an `miMATRIX` element used as a field value.
fn parse_field_value(data: &[u8], endian: Endian) -> Result<FieldValue> {
    // `[]` may be written as an element with no payload at all.
    if data.is_empty() {
        return Ok(FieldValue::Double {
            rows: 0,
            cols: 0,
            values: Vec::new(),
        });
    }

    let mut reader = ElementReader::new(data, endian);
    let header = read_array_header(&mut reader)?;

    if header.logical {
        return Ok(FieldValue::Unsupported("logical"));
    }
    match header.class {
        MX_DOUBLE if header.complex => Ok(FieldValue::Unsupported("complex double")),
        MX_DOUBLE => {
            let real = reader.expect_element("real part")?;
            let values = endian.numeric(real.data_type, real.data)?;
            let (rows, cols) = header.shape()?;
            Ok(FieldValue::Double { rows, cols, values })
        }
        other => Ok(FieldValue::Unsupported(class_name(other))),
    }
}

/// One top-level variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Mat5Record {
    name: String,
    fields: Vec<(String, Option<FieldValue>)>,
}

impl Record for Mat5Record {
    fn name(&self) -> &str {
        &self.name
    }

    fn field_count(&self) -> usize {
        self.fields.len()
    }

    fn field_name(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(|(name, _)| name.as_str())
    }

    fn field_by_name(&self, name: &str) -> Option<Field<'_>> {
        let (_, value) = self.fields.iter().find(|(field, _)| field == name)?;
        value.as_ref().map(|value| match value {
            FieldValue::Double { rows, cols, values } => Field::Double {
                rows: *rows,
                cols: *cols,
                values,
            },
            FieldValue::Unsupported(class) => Field::Unsupported { class },
        })
    }
}

/// Parse the payload of a top-level `miMATRIX` element.
fn parse_record(data: &[u8], endian: Endian) -> Result<Mat5Record> {
    if data.is_empty() {
        return Ok(Mat5Record {
            name: String::new(),
            fields: Vec::new(),
        });
    }

    let mut reader = ElementReader::new(data, endian);
    let header = read_array_header(&mut reader)?;

    if header.class != MX_STRUCT {
        debug!(
            variable = %header.name,
            class = class_name(header.class),
            "variable is not a struct; exposing no fields"
        );
        return Ok(Mat5Record {
            name: header.name,
            fields: Vec::new(),
        });
    }

    let name_len = reader.expect_element("field name length")?;
    if name_len.data.len() < 4 {
        return Err(malformed("field name length shorter than 4 bytes"));
    }
    let name_len = usize::try_from(endian.i32(&name_len.data[..4]))
        .map_err(|_| malformed("negative field name length"))?;

    let names = reader.expect_element("field names")?;
    let mut fields: Vec<(String, Option<FieldValue>)> = if name_len == 0 {
        Vec::new()
    } else {
        names
            .data
            .chunks(name_len)
            .map(|chunk| {
                let end = chunk.iter().position(|&b| b == 0).unwrap_or(chunk.len());
                (String::from_utf8_lossy(&chunk[..end]).into_owned(), None)
            })
            .collect()
    };

    // Field values of element 0 follow in field order; later elements of a
    // struct array are not exposed.
    if header.element_count()? > 0 {
        for (field, value) in fields.iter_mut() {
            let element = reader.expect_element("struct field value")?;
            if element.data_type != MI_MATRIX {
                return Err(malformed(format!(
                    "field `{field}` is stored as data type {}, expected miMATRIX",
                    element.data_type
                )));
            }
            *value = Some(parse_field_value(element.data, endian)?);
        }
    }

    Ok(Mat5Record {
        name: header.name,
        fields,
    })
}

/// The `miMATRIX` payload behind a top-level element, inflating
/// `miCOMPRESSED` wrappers. `None` for anything that is not a variable.
fn top_level_array(element: Element<'_>, endian: Endian) -> Result<Option<Cow<'_, [u8]>>> {
    match element.data_type {
        MI_MATRIX => Ok(Some(Cow::Borrowed(element.data))),
        MI_COMPRESSED => {
            let inflated = inflate(element.data)?;
            let inner = ElementReader::new(&inflated, endian)
                .next_element()?
                .ok_or_else(|| malformed("compressed element is empty"))?;
            Ok((inner.data_type == MI_MATRIX).then(|| Cow::Owned(inner.data.to_vec())))
        }
        _ => Ok(None),
    }
}

fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    ZlibDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| malformed(format!("inflating compressed element: {e}")))?;
    Ok(out)
}

// ---------------------------------------------------------------------------
// Container
// ---------------------------------------------------------------------------

struct OpenFile {
    bytes: Vec<u8>,
    header: Header,
    /// Absolute offset of the next unread top-level element.
    cursor: usize,
}

impl OpenFile {
    fn is_subsystem(&self, offset: usize) -> bool {
        self.header.subsystem_offset == Some(offset)
    }
}

/// Level 5 MAT-file container. `source_id` is a filesystem path.
#[derive(Default)]
pub struct Mat5Container {
    open: Option<OpenFile>,
}

impl Mat5Container {
    pub fn new() -> Self {
        Self::default()
    }

    fn file(&self) -> Result<&OpenFile> {
        self.open
            .as_ref()
            .ok_or_else(|| malformed("no MAT-file is open"))
    }
}

impl std::fmt::Debug for Mat5Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mat5Container")
            .field("open", &self.open.is_some())
            .finish()
    }
}

impl Container for Mat5Container {
    type Record = Mat5Record;

    fn open(&mut self, source_id: &str) -> Result<()> {
        let bytes = std::fs::read(source_id)
            .map_err(|e| SegmentError::container_open(source_id, e.to_string()))?;
        let header =
            parse_header(&bytes).map_err(|reason| SegmentError::container_open(source_id, reason))?;

        debug!(
            source = source_id,
            bytes = bytes.len(),
            big_endian = header.endian == Endian::Big,
            "MAT-file opened"
        );
        self.open = Some(OpenFile {
            bytes,
            header,
            cursor: HEADER_LEN,
        });
        Ok(())
    }

    fn record_count(&mut self) -> Result<usize> {
        let file = self.file()?;
        let mut reader = ElementReader::at(&file.bytes, HEADER_LEN, file.header.endian);
        let mut count = 0;
        loop {
            let offset = reader.pos;
            match reader.next_element()? {
                None => break,
                Some(_) if file.is_subsystem(offset) => {}
                Some(element) => {
                    if top_level_array(element, file.header.endian)?.is_some() {
                        count += 1;
                    }
                }
            }
        }
        Ok(count)
    }

    fn next_record(&mut self) -> Result<Mat5Record> {
        let file = self.file()?;
        let endian = file.header.endian;
        let mut reader = ElementReader::at(&file.bytes, file.cursor, endian);

        let record = loop {
            let offset = reader.pos;
            let element = reader
                .next_element()?
                .ok_or_else(|| malformed("no record left in MAT-file"))?;

            if file.is_subsystem(offset) {
                debug!(offset, "skipping subsystem data");
                continue;
            }
            match top_level_array(element, endian)? {
                Some(payload) => break parse_record(&payload, endian)?,
                None => debug!(offset, data_type = element.data_type, "skipping top-level element"),
            }
        };

        let cursor = reader.pos;
        if let Some(file) = self.open.as_mut() {
            file.cursor = cursor;
        }
        Ok(record)
    }

    fn close(&mut self) {
        if self.open.take().is_some() {
            debug!("MAT-file closed");
        }
    }
}
