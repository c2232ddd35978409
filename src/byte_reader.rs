//! Buffered byte source for the marker parser and the entropy decoder.

use std::io::{ErrorKind, Read};

use crate::error::{JpegError, Result};
use crate::jpeg_marker_code::JPEG_MARKER_START_BYTE;

const BUFFER_SIZE: usize = 4096;

/// Number of bytes kept in front of a refill so that a marker read speculatively by
/// [`ByteReader::read_stuffed_byte`] can always be pushed back.
const UNREAD_CAPACITY: usize = 2;

/// A byte of entropy-coded data with byte stuffing undone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntropyByte {
    Data(u8),
    /// A marker follows: the entropy-coded segment has ended.
    Marker,
}

pub struct ByteReader<R> {
    source: R,
    buffer: Box<[u8]>,
    position: usize,
    end: usize,
    unreadable: usize,
}

impl<R: Read> ByteReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            source,
            buffer: vec![0u8; BUFFER_SIZE].into_boxed_slice(),
            position: 0,
            end: 0,
            unreadable: 0,
        }
    }

    /// Refills the buffer once it has been drained. The last two bytes are retained at the
    /// front of the buffer so that they can still be unread afterwards.
    fn fill(&mut self) -> Result<()> {
        debug_assert_eq!(self.position, self.end);
        if self.end > UNREAD_CAPACITY && self.end == self.buffer.len() {
            self.buffer
                .copy_within(self.end - UNREAD_CAPACITY..self.end, 0);
            self.position = UNREAD_CAPACITY;
            self.end = UNREAD_CAPACITY;
        }

        loop {
            match self.source.read(&mut self.buffer[self.end..]) {
                Ok(0) => return Err(JpegError::UnexpectedEof),
                Ok(count) => {
                    self.end += count;
                    return Ok(());
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                    return Err(JpegError::UnexpectedEof);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        while self.position == self.end {
            self.fill()?;
        }
        let byte = self.buffer[self.position];
        self.position += 1;
        self.unreadable = 0;
        Ok(byte)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let b1 = self.read_byte()?;
        let b2 = self.read_byte()?;
        Ok(u16::from_be_bytes([b1, b2]))
    }

    /// Fills `destination` completely or fails with [`JpegError::UnexpectedEof`].
    pub fn read_full(&mut self, destination: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < destination.len() {
            if self.position == self.end {
                self.fill()?;
            }
            let count = (destination.len() - filled).min(self.end - self.position);
            destination[filled..filled + count]
                .copy_from_slice(&self.buffer[self.position..self.position + count]);
            self.position += count;
            filled += count;
        }
        self.unreadable = 0;
        Ok(())
    }

    pub fn read_vec(&mut self, count: usize) -> Result<Vec<u8>> {
        let mut bytes = vec![0u8; count];
        self.read_full(&mut bytes)?;
        Ok(bytes)
    }

    pub fn skip(&mut self, mut count: usize) -> Result<()> {
        while count > 0 {
            if self.position == self.end {
                self.fill()?;
            }
            let step = count.min(self.end - self.position);
            self.position += step;
            count -= step;
        }
        self.unreadable = 0;
        Ok(())
    }

    /// Reads one byte of entropy-coded data.
    ///
    /// `0xFF 0x00` yields the data byte `0xFF`. `0xFF` followed by anything else is the start of
    /// a marker; both bytes stay consumed until [`ByteReader::unread_stuffed_byte`] is called.
    pub fn read_stuffed_byte(&mut self) -> Result<EntropyByte> {
        let byte = self.read_byte()?;
        self.unreadable = 1;
        if byte != JPEG_MARKER_START_BYTE {
            return Ok(EntropyByte::Data(byte));
        }

        let next = self.read_byte()?;
        self.unreadable = 2;
        if next == 0x00 {
            Ok(EntropyByte::Data(JPEG_MARKER_START_BYTE))
        } else {
            Ok(EntropyByte::Marker)
        }
    }

    /// Pushes back the bytes consumed by the last [`ByteReader::read_stuffed_byte`] call.
    pub fn unread_stuffed_byte(&mut self) {
        self.position -= self.unreadable;
        self.unreadable = 0;
    }
}
