//! Binary NVRAM backup images.
//!
//! ## Layout
//!
//! ```text
//! offset 0..5   magic "DD-WRT"
//! offset 6..7   record count, u16 little-endian
//! offset 8..    records:
//!                 u8        name length N
//!                 N bytes   name
//!                 u16 LE    value length V
//!                 V bytes   value
//! ```
//!
//! Multi-byte integers are little-endian on every host.
//!
//! [`read`] and [`write`] convert whole images. [`ImageWriter`] streams
//! records to a seekable sink and patches the record count when finished.

mod writer;

use crate::error::{Error, RecordField, Result};
use crate::record::{Record, MAX_NAME_LEN, MAX_RECORDS, MAX_VALUE_LEN};
use bytes::{Buf, BufMut, BytesMut};
use std::path::Path;
use tracing::{debug, trace};

pub use writer::ImageWriter;

/// Tag at the start of every image
pub const MAGIC: &[u8; 6] = b"DD-WRT";

/// Magic plus the record count
pub const HEADER_LEN: usize = 8;

/// Offset of the record count inside the header
pub const COUNT_OFFSET: u64 = 6;

/// Smallest possible record: both length prefixes, empty name and value
const MIN_RECORD_LEN: usize = 3;

/// Parse a complete image.
///
/// Either every declared record is returned or the image is rejected; a
/// truncated image never yields a partial list.
pub fn read(data: &[u8]) -> Result<Vec<Record>> {
    if data.len() < HEADER_LEN {
        return Err(Error::header(format!(
            "image is {} bytes, shorter than the {}-byte header",
            data.len(),
            HEADER_LEN
        )));
    }
    if &data[..MAGIC.len()] != MAGIC {
        return Err(Error::header("magic tag mismatch, not a DD-WRT NVRAM backup"));
    }

    let mut buf = &data[MAGIC.len()..];
    let count = buf.get_u16_le();
    let available = buf.remaining();

    if count as usize * MIN_RECORD_LEN > available {
        return Err(Error::ImplausibleRecordCount { count, available });
    }

    debug!("Reading {} records from {} byte image", count, data.len());

    let mut records = Vec::with_capacity(count as usize);
    for index in 1..=count as usize {
        let record = read_record(&mut buf, data.len(), index)?;
        trace!("Read record {}: {}", index, record);
        records.push(record);
    }

    if buf.has_remaining() {
        debug!("Ignoring {} trailing bytes after the last record", buf.remaining());
    }

    Ok(records)
}

fn read_record(buf: &mut &[u8], total: usize, record: usize) -> Result<Record> {
    ensure(buf, total, record, RecordField::NameLength, 1)?;
    let name_len = buf.get_u8() as usize;
    let name = take(buf, total, record, RecordField::Name, name_len)?;

    ensure(buf, total, record, RecordField::ValueLength, 2)?;
    let value_len = buf.get_u16_le() as usize;
    let value = take(buf, total, record, RecordField::Value, value_len)?;

    Ok(Record { name, value })
}

fn take(buf: &mut &[u8], total: usize, record: usize, field: RecordField, len: usize) -> Result<Vec<u8>> {
    ensure(buf, total, record, field, len)?;
    let bytes = buf[..len].to_vec();
    buf.advance(len);
    Ok(bytes)
}

fn ensure(buf: &[u8], total: usize, record: usize, field: RecordField, needed: usize) -> Result<()> {
    if buf.len() < needed {
        return Err(Error::TruncatedRecord {
            record,
            field,
            offset: total - buf.len(),
            needed,
            available: buf.len(),
        });
    }
    Ok(())
}

/// Check that a record fits the format's length fields
pub fn validate_record(record: &Record) -> Result<()> {
    if record.name.len() > MAX_NAME_LEN {
        return Err(Error::NameTooLong {
            len: record.name.len(),
            max: MAX_NAME_LEN,
        });
    }
    if record.value.len() > MAX_VALUE_LEN {
        return Err(Error::ValueTooLong {
            name: record.name_lossy(),
            len: record.value.len(),
            max: MAX_VALUE_LEN,
        });
    }
    Ok(())
}

/// Append one already-validated record
fn put_record(out: &mut impl BufMut, record: &Record) {
    out.put_u8(record.name.len() as u8);
    out.put_slice(&record.name);
    out.put_u16_le(record.value.len() as u16);
    out.put_slice(&record.value);
}

/// Serialize a complete image.
///
/// All records are validated before anything is emitted.
pub fn write(records: &[Record]) -> Result<Vec<u8>> {
    if records.len() > MAX_RECORDS {
        return Err(Error::TooManyRecords { max: MAX_RECORDS });
    }
    for record in records {
        validate_record(record)?;
    }

    let body_len: usize = records.iter().map(Record::encoded_len).sum();
    let mut out = BytesMut::with_capacity(HEADER_LEN + body_len);
    out.put_slice(MAGIC);
    out.put_u16_le(records.len() as u16);
    for record in records {
        put_record(&mut out, record);
    }

    debug!("Wrote {} records, {} bytes", records.len(), out.len());
    Ok(out.to_vec())
}

/// Read and parse an image file
pub fn read_file(path: impl AsRef<Path>) -> Result<Vec<Record>> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| Error::file_read(path, e))?;
    read(&data)
}

/// Serialize `records` and write them to `path`
pub fn write_file(path: impl AsRef<Path>, records: &[Record]) -> Result<()> {
    let path = path.as_ref();
    let data = write(records)?;
    std::fs::write(path, data).map_err(|e| Error::file_write(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn image(count: u16, body: &[u8]) -> Vec<u8> {
        let mut data = MAGIC.to_vec();
        data.extend_from_slice(&count.to_le_bytes());
        data.extend_from_slice(body);
        data
    }

    #[test]
    fn test_write_layout() {
        let records = vec![Record::new("wl_ssid", b"MyNet\x01".to_vec())];
        let data = write(&records).unwrap();
        let mut expected = b"DD-WRT\x01\x00\x07wl_ssid\x06\x00".to_vec();
        expected.extend_from_slice(b"MyNet\x01");
        assert_eq!(data, expected);
    }

    #[test]
    fn test_little_endian_lengths() {
        let value = vec![b'v'; 0x0102];
        let data = write(&[Record::new("n", value)]).unwrap();
        assert_eq!(&data[6..8], &[0x01, 0x00]);
        assert_eq!(&data[10..12], &[0x02, 0x01]);
    }

    #[test]
    fn test_empty_image() {
        let data = write(&[]).unwrap();
        assert_eq!(data, b"DD-WRT\x00\x00");
        assert!(read(&data).unwrap().is_empty());
    }

    #[test]
    fn test_read_round_trip() {
        let records = vec![
            Record::new("lan_ipaddr", "192.168.1.1"),
            Record::new("", ""),
            Record::new("blob", vec![0u8, 0xFF, b'\n', b'\\', 0x80]),
        ];
        assert_eq!(read(&write(&records).unwrap()).unwrap(), records);
    }

    #[test]
    fn test_bad_magic() {
        let err = read(b"DD-WRX\x00\x00").unwrap_err();
        assert!(err.is_header_error());
    }

    #[test]
    fn test_short_header() {
        let err = read(b"DD-WR").unwrap_err();
        assert!(matches!(err, Error::Header { .. }));
    }

    #[test]
    fn test_implausible_count() {
        let err = read(&image(10, &[0, 0, 0])).unwrap_err();
        assert!(matches!(
            err,
            Error::ImplausibleRecordCount {
                count: 10,
                available: 3
            }
        ));
    }

    #[test]
    fn test_truncated_value() {
        let mut body = vec![1, b'n', 100, 0];
        body.extend_from_slice(&[b'x'; 50]);
        let err = read(&image(1, &body)).unwrap_err();
        match err {
            Error::TruncatedRecord {
                record,
                field,
                offset,
                needed,
                available,
            } => {
                assert_eq!(record, 1);
                assert_eq!(field, RecordField::Value);
                assert_eq!(offset, 12);
                assert_eq!(needed, 100);
                assert_eq!(available, 50);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_truncated_second_record_discards_first() {
        let body = [1, b'a', 1, 0, b'1', 5, b'b'];
        let err = read(&image(2, &body)).unwrap_err();
        assert!(matches!(
            err,
            Error::TruncatedRecord {
                record: 2,
                field: RecordField::Name,
                ..
            }
        ));
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let mut data = write(&[Record::new("a", "1")]).unwrap();
        data.extend_from_slice(b"junk");
        assert_eq!(read(&data).unwrap(), vec![Record::new("a", "1")]);
    }

    #[test]
    fn test_name_too_long() {
        let err = write(&[Record::new(vec![b'n'; 300], "v")]).unwrap_err();
        assert!(matches!(err, Error::NameTooLong { len: 300, max: 255 }));
    }

    #[test]
    fn test_limits_are_inclusive() {
        let records = vec![Record::new(vec![b'n'; 255], vec![0u8; 65535])];
        assert_eq!(read(&write(&records).unwrap()).unwrap(), records);

        let err = write(&[Record::new("big", vec![0u8; 65536])]).unwrap_err();
        assert!(matches!(err, Error::ValueTooLong { len: 65536, .. }));
    }

    #[test]
    fn test_too_many_records() {
        let records = vec![Record::default(); MAX_RECORDS + 1];
        assert!(matches!(
            write(&records).unwrap_err(),
            Error::TooManyRecords { .. }
        ));
    }
}
