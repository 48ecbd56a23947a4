//! Streaming image output.

use super::{put_record, validate_record, COUNT_OFFSET, MAGIC};
use crate::error::{Error, Result};
use crate::record::{Record, MAX_RECORDS};
use std::io::{Seek, SeekFrom, Write};
use tracing::{debug, trace};

/// Writes records to a seekable sink one at a time.
///
/// The header goes out immediately with a zero record count, which
/// [`ImageWriter::finish`] overwrites once the real count is known. The bytes
/// produced are identical to [`super::write`] for the same records.
///
/// An I/O error while writing a record may leave part of it in the sink.
/// The writer is poisoned from then on: later [`ImageWriter::push`] and
/// [`ImageWriter::finish`] calls fail with [`Error::WriterPoisoned`] instead
/// of patching a count that no longer matches the stream.
///
/// ```
/// use nvram_core::{image, ImageWriter, Record};
/// use std::io::Cursor;
///
/// let mut writer = ImageWriter::new(Cursor::new(Vec::new()))?;
/// writer.push(&Record::new("wl_ssid", "MyNet"))?;
/// let data = writer.finish()?.into_inner();
///
/// assert_eq!(data, image::write(&[Record::new("wl_ssid", "MyNet")])?);
/// # Ok::<(), nvram_core::Error>(())
/// ```
#[derive(Debug)]
pub struct ImageWriter<W: Write + Seek> {
    inner: W,
    start: u64,
    count: usize,
    scratch: Vec<u8>,
    poisoned: bool,
}

impl<W: Write + Seek> ImageWriter<W> {
    /// Writes the header at the current position of `inner`
    pub fn new(mut inner: W) -> Result<Self> {
        let start = inner.stream_position()?;
        inner.write_all(MAGIC)?;
        inner.write_all(&[0, 0])?;
        Ok(Self {
            inner,
            start,
            count: 0,
            scratch: Vec::new(),
            poisoned: false,
        })
    }

    /// Number of records written so far
    pub fn count(&self) -> usize {
        self.count
    }

    /// Append one record.
    ///
    /// An oversized record is rejected before any of its bytes are written,
    /// so the stream stays well formed and later records can still follow.
    pub fn push(&mut self, record: &Record) -> Result<()> {
        if self.poisoned {
            return Err(Error::WriterPoisoned);
        }
        if self.count >= MAX_RECORDS {
            return Err(Error::TooManyRecords { max: MAX_RECORDS });
        }
        validate_record(record)?;

        self.scratch.clear();
        put_record(&mut self.scratch, record);
        self.poisoned = true;
        self.inner.write_all(&self.scratch)?;
        self.poisoned = false;
        self.count += 1;

        trace!("Streamed record {}: {}", self.count, record);
        Ok(())
    }

    /// Patch the record count into the header and hand back the sink,
    /// positioned at the end of the image.
    pub fn finish(mut self) -> Result<W> {
        if self.poisoned {
            return Err(Error::WriterPoisoned);
        }
        let end = self.inner.stream_position()?;
        self.inner.seek(SeekFrom::Start(self.start + COUNT_OFFSET))?;
        self.inner.write_all(&(self.count as u16).to_le_bytes())?;
        self.inner.seek(SeekFrom::Start(end))?;
        self.inner.flush()?;

        debug!("Finished image with {} records", self.count);
        Ok(self.inner)
    }
}
