//! Checksummed LZ4 block framing.
//!
//! Each block on the wire is
//!
//! ```text
//! [16B CityHash128][0x82][i32 LE compressed size + 9][i32 LE uncompressed size][LZ4 block]
//! ```
//!
//! The checksum covers the 9 header bytes and the payload and is verified
//! before anything is decompressed.

use std::io::{self, Read, Write};

use tracing::{debug, trace};

use super::cityhash;
use crate::error::{WireError, WireResult};

/// Magic byte identifying an LZ4 block.
pub const MAGIC: u8 = 0x82;
/// Magic plus the two size fields.
pub const HEADER_LEN: usize = 9;
pub const CHECKSUM_LEN: usize = 16;
/// Largest block a reader accepts unless configured otherwise.
pub const DEFAULT_MAX_BLOCK_SIZE: usize = 1 << 30;
/// Plaintext bytes per block emitted by [`FrameWriter`].
pub const DEFAULT_WRITE_BLOCK_SIZE: usize = 1 << 20;

/// A failure remembered so that later reads keep failing the same way.
#[derive(Debug, Clone)]
enum Failure {
    Frame(String),
    Io(io::ErrorKind, String),
}

impl Failure {
    fn of(err: &WireError) -> Self {
        match err {
            WireError::Io(io) => Failure::Io(io.kind(), io.to_string()),
            other => Failure::Frame(other.to_string()),
        }
    }

    fn to_io(&self) -> io::Error {
        match self {
            Failure::Frame(message) => {
                WireError::frame(format!("stream closed after earlier failure: {message}")).into_io()
            }
            Failure::Io(kind, message) => io::Error::new(*kind, message.clone()),
        }
    }
}

/// Decodes a stream of compressed blocks and serves the plaintext through
/// [`Read`].
///
/// Once a block fails to decode the reader is closed: the source is dropped
/// and every later read fails.
pub struct FrameReader<R> {
    inner: Option<R>,
    block: Vec<u8>,
    pos: usize,
    max_block_size: usize,
    blocks_read: u64,
    failure: Option<Failure>,
}

impl<R: Read> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_max_block_size(inner, DEFAULT_MAX_BLOCK_SIZE)
    }

    /// Reject blocks whose compressed or uncompressed size exceeds `max`.
    pub fn with_max_block_size(inner: R, max: usize) -> Self {
        Self {
            inner: Some(inner),
            block: Vec::new(),
            pos: 0,
            max_block_size: max,
            blocks_read: 0,
            failure: None,
        }
    }

    /// Blocks decoded so far.
    pub fn blocks_read(&self) -> u64 {
        self.blocks_read
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    /// Drop the source. Calling this again does nothing.
    pub fn close(&mut self) {
        if self.inner.take().is_some() {
            trace!(blocks = self.blocks_read, "frame reader closed");
        }
        self.block = Vec::new();
        self.pos = 0;
    }

    /// Decode the next block into the buffer. `Ok(false)` at a clean end of
    /// stream.
    fn next_block(&mut self) -> WireResult<bool> {
        let max = self.max_block_size;
        let Some(inner) = self.inner.as_mut() else {
            return Err(WireError::frame("read from a closed stream"));
        };

        let mut checksum = [0u8; CHECKSUM_LEN];
        match read_full(inner, &mut checksum)? {
            0 => return Ok(false),
            CHECKSUM_LEN => {}
            n => {
                return Err(WireError::frame(format!(
                    "short read: {n} of {CHECKSUM_LEN} checksum bytes"
                )));
            }
        }

        let mut header = [0u8; HEADER_LEN];
        let n = read_full(inner, &mut header)?;
        if n < HEADER_LEN {
            return Err(WireError::frame(format!(
                "short read: {n} of {HEADER_LEN} header bytes"
            )));
        }
        if header[0] != MAGIC {
            return Err(WireError::frame(format!(
                "bad magic 0x{:02x}, expected 0x{MAGIC:02x}",
                header[0]
            )));
        }

        let compressed = i32::from_le_bytes([header[1], header[2], header[3], header[4]]);
        let uncompressed = i32::from_le_bytes([header[5], header[6], header[7], header[8]]);
        if compressed < HEADER_LEN as i32 {
            return Err(WireError::frame(format!(
                "compressed size {compressed} is smaller than the block header"
            )));
        }
        if uncompressed < 0 {
            return Err(WireError::frame(format!(
                "negative uncompressed size {uncompressed}"
            )));
        }
        let payload_len = compressed as usize - HEADER_LEN;
        let uncompressed = uncompressed as usize;
        if payload_len > max || uncompressed > max {
            return Err(WireError::frame(format!(
                "block of {uncompressed} bytes ({payload_len} compressed) exceeds the {max} byte limit"
            )));
        }

        // Grows with what actually arrives, so a lying size field cannot force
        // a huge allocation before the short read is noticed.
        let mut body = Vec::with_capacity(HEADER_LEN + payload_len.min(64 * 1024));
        body.extend_from_slice(&header);
        let got = inner.take(payload_len as u64).read_to_end(&mut body)?;
        if got < payload_len {
            return Err(WireError::frame(format!(
                "short read: {got} of {payload_len} payload bytes"
            )));
        }

        if cityhash::checksum(&body) != checksum {
            return Err(WireError::frame("corrupted data: checksum mismatch"));
        }

        self.block.clear();
        self.block.resize(uncompressed, 0);
        let written = lz4_flex::block::decompress_into(&body[HEADER_LEN..], &mut self.block)
            .map_err(|e| WireError::frame(format!("LZ4 decompression failed: {e}")))?;
        if written != uncompressed {
            return Err(WireError::frame(format!(
                "block decompressed to {written} bytes, header says {uncompressed}"
            )));
        }

        self.pos = 0;
        self.blocks_read += 1;
        trace!(
            block = self.blocks_read,
            compressed = payload_len,
            uncompressed,
            "decoded block"
        );
        Ok(true)
    }

    fn fail(&mut self, err: &WireError) {
        debug!(error = %err, blocks = self.blocks_read, "frame stream failed");
        self.failure = Some(Failure::of(err));
        self.close();
    }
}

impl<R: Read> Read for FrameReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(failure) = &self.failure {
            return Err(failure.to_io());
        }
        if buf.is_empty() {
            return Ok(0);
        }

        while self.pos == self.block.len() {
            match self.next_block() {
                Ok(true) => {}
                Ok(false) => return Ok(0),
                Err(err) => {
                    self.fail(&err);
                    return Err(err.into_io());
                }
            }
        }

        let n = buf.len().min(self.block.len() - self.pos);
        buf[..n].copy_from_slice(&self.block[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Fill `buf` unless the source ends first; returns the bytes read.
fn read_full<R: Read>(inner: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match inner.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Compress `plain` into one complete block, checksum included.
pub fn encode_block(plain: &[u8]) -> WireResult<Vec<u8>> {
    let payload = lz4_flex::block::compress(plain);
    let compressed = i32::try_from(payload.len() + HEADER_LEN)
        .map_err(|_| WireError::frame("block too large to encode"))?;
    let uncompressed =
        i32::try_from(plain.len()).map_err(|_| WireError::frame("block too large to encode"))?;

    let mut out = Vec::with_capacity(CHECKSUM_LEN + HEADER_LEN + payload.len());
    out.extend_from_slice(&[0u8; CHECKSUM_LEN]);
    out.push(MAGIC);
    out.extend_from_slice(&compressed.to_le_bytes());
    out.extend_from_slice(&uncompressed.to_le_bytes());
    out.extend_from_slice(&payload);

    let checksum = cityhash::checksum(&out[CHECKSUM_LEN..]);
    out[..CHECKSUM_LEN].copy_from_slice(&checksum);
    Ok(out)
}

/// Buffers plaintext and writes it out as blocks of at most `block_size`
/// bytes. Call [`finish`](Self::finish) to emit the last partial block.
pub struct FrameWriter<W: Write> {
    inner: W,
    buf: Vec<u8>,
    block_size: usize,
    blocks_written: u64,
}

impl<W: Write> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self::with_block_size(inner, DEFAULT_WRITE_BLOCK_SIZE)
    }

    pub fn with_block_size(inner: W, block_size: usize) -> Self {
        Self {
            inner,
            buf: Vec::new(),
            block_size: block_size.max(1),
            blocks_written: 0,
        }
    }

    pub fn blocks_written(&self) -> u64 {
        self.blocks_written
    }

    fn emit(&mut self, len: usize) -> io::Result<()> {
        let block = encode_block(&self.buf[..len]).map_err(WireError::into_io)?;
        self.inner.write_all(&block)?;
        self.buf.drain(..len);
        self.blocks_written += 1;
        Ok(())
    }

    /// Write any buffered plaintext and return the sink.
    pub fn finish(mut self) -> WireResult<W> {
        self.flush().map_err(WireError::from_io)?;
        debug!(blocks = self.blocks_written, "frame writer finished");
        Ok(self.inner)
    }
}

impl<W: Write> Write for FrameWriter<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        while self.buf.len() >= self.block_size {
            self.emit(self.block_size)?;
        }
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.buf.is_empty() {
            self.emit(self.buf.len())?;
        }
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn plaintext(n: usize) -> Vec<u8> {
        (0..n).map(|i| b"id\tvalue\n1\tnull\n"[i % 16]).collect()
    }

    fn decode_all(bytes: &[u8]) -> WireResult<Vec<u8>> {
        let mut out = Vec::new();
        FrameReader::new(bytes)
            .read_to_end(&mut out)
            .map_err(WireError::from_io)?;
        Ok(out)
    }

    fn expect_frame_error(bytes: &[u8]) -> String {
        match decode_all(bytes) {
            Err(WireError::FrameDecode(message)) => message,
            other => panic!("expected a frame error, got {other:?}"),
        }
    }

    #[test]
    fn test_single_block_decodes_exactly() {
        let plain = plaintext(1000);
        let block = encode_block(&plain).unwrap();
        assert_eq!(block[CHECKSUM_LEN], MAGIC);
        let uncompressed = i32::from_le_bytes(block[21..25].try_into().unwrap());
        assert_eq!(uncompressed as usize, plain.len());
        assert_eq!(decode_all(&block).unwrap(), plain);
    }

    #[test]
    fn test_multiple_blocks_through_writer() {
        let plain = plaintext(2500);
        let mut writer = FrameWriter::with_block_size(Vec::new(), 1000);
        writer.write_all(&plain).unwrap();
        assert_eq!(writer.blocks_written(), 2);
        let bytes = writer.finish().unwrap();

        let mut reader = FrameReader::new(bytes.as_slice());
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, plain);
        assert_eq!(reader.blocks_read(), 3);
    }

    #[test]
    fn test_empty_stream_is_empty() {
        assert_eq!(decode_all(&[]).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_every_payload_bit_flip_is_caught_by_checksum() {
        let block = encode_block(&plaintext(64)).unwrap();
        for byte in CHECKSUM_LEN + HEADER_LEN..block.len() {
            for bit in 0..8 {
                let mut corrupt = block.clone();
                corrupt[byte] ^= 1 << bit;
                let message = expect_frame_error(&corrupt);
                assert!(message.contains("checksum"), "byte {byte} bit {bit}: {message}");
            }
        }
    }

    #[test]
    fn test_every_bit_flip_anywhere_fails() {
        let block = encode_block(&plaintext(40)).unwrap();
        for byte in 0..block.len() {
            for bit in 0..8 {
                let mut corrupt = block.clone();
                corrupt[byte] ^= 1 << bit;
                expect_frame_error(&corrupt);
            }
        }
    }

    #[test]
    fn test_bad_magic() {
        let mut block = encode_block(b"abc").unwrap();
        block[CHECKSUM_LEN] = 0x02;
        assert!(expect_frame_error(&block).contains("bad magic"));
    }

    #[test]
    fn test_truncated_block_is_short_read() {
        let block = encode_block(&plaintext(100)).unwrap();
        for cut in [5, CHECKSUM_LEN + 3, block.len() - 1] {
            assert!(expect_frame_error(&block[..cut]).contains("short read"), "cut at {cut}");
        }
    }

    #[test]
    fn test_size_limits() {
        let mut block = encode_block(b"abc").unwrap();
        block[17..21].copy_from_slice(&3i32.to_le_bytes());
        assert!(expect_frame_error(&block).contains("smaller than the block header"));

        let block = encode_block(&plaintext(100)).unwrap();
        let mut reader = FrameReader::with_max_block_size(block.as_slice(), 10);
        let err = reader.read_to_end(&mut Vec::new()).unwrap_err();
        assert!(err.to_string().contains("exceeds"));
    }

    #[test]
    fn test_failure_is_sticky() {
        let mut bytes = encode_block(b"first").unwrap();
        let mut second = encode_block(b"second").unwrap();
        second[0] ^= 0xff;
        bytes.extend_from_slice(&second);
        bytes.extend_from_slice(&encode_block(b"third").unwrap());

        let mut reader = FrameReader::new(bytes.as_slice());
        let mut buf = [0u8; 64];
        assert_eq!(reader.read(&mut buf).unwrap(), 5);
        assert_eq!(&buf[..5], b"first");
        assert!(reader.read(&mut buf).is_err());
        assert!(reader.is_closed());
        let err = WireError::from_io(reader.read(&mut buf).unwrap_err());
        assert!(matches!(err, WireError::FrameDecode(_)));
    }

    #[test]
    fn test_close_is_idempotent() {
        let block = encode_block(b"abc").unwrap();
        let mut reader = FrameReader::new(block.as_slice());
        reader.close();
        reader.close();
        assert!(reader.is_closed());
        assert!(reader.read(&mut [0u8; 4]).is_err());
    }
}
