//! MSB-first bit reader over entropy-coded segments.

use std::io::Read;

use crate::byte_reader::{ByteReader, EntropyByte};
use crate::error::{JpegError, Result};

/// Reads bits from an entropy-coded segment, undoing `FF00` byte stuffing.
///
/// Reaching a marker (or the end of the input) does not fail: the marker bytes are pushed back
/// into the byte source, and zero bits are supplied until [`JpegBitReader::reset`] is called.
/// The caller finds the marker again once the scan is over.
pub struct JpegBitReader<'a, R> {
    reader: &'a mut ByteReader<R>,
    accumulator: u32,
    // Mask of the next unread bit inside `accumulator`, zero when `bits_in_buffer` is zero.
    mask: u32,
    bits_in_buffer: u32,
    marker_hit: bool,
}

impl<'a, R: Read> JpegBitReader<'a, R> {
    pub fn new(reader: &'a mut ByteReader<R>) -> Self {
        Self {
            reader,
            accumulator: 0,
            mask: 0,
            bits_in_buffer: 0,
            marker_hit: false,
        }
    }

    /// Whether the end of the entropy-coded segment has been reached.
    pub fn marker_hit(&self) -> bool {
        self.marker_hit
    }

    pub fn bits_in_buffer(&self) -> u32 {
        self.bits_in_buffer
    }

    /// Guarantees at least `count` (at most 16) buffered bits.
    pub fn ensure_bits(&mut self, count: u32) -> Result<()> {
        debug_assert!(count <= 16);
        while self.bits_in_buffer < count {
            let byte = if self.marker_hit {
                0
            } else {
                match self.reader.read_stuffed_byte() {
                    Ok(EntropyByte::Data(byte)) => byte,
                    Ok(EntropyByte::Marker) => {
                        self.reader.unread_stuffed_byte();
                        self.marker_hit = true;
                        0
                    }
                    Err(JpegError::UnexpectedEof) => {
                        self.marker_hit = true;
                        0
                    }
                    Err(e) => return Err(e),
                }
            };
            self.accumulator = (self.accumulator << 8) | u32::from(byte);
            self.bits_in_buffer += 8;
            self.mask = if self.mask == 0 { 1 << 7 } else { self.mask << 8 };
        }
        Ok(())
    }

    pub fn decode_bit(&mut self) -> Result<bool> {
        if self.bits_in_buffer == 0 {
            self.ensure_bits(1)?;
        }
        let bit = self.accumulator & self.mask != 0;
        self.bits_in_buffer -= 1;
        self.mask >>= 1;
        Ok(bit)
    }

    pub fn decode_bits(&mut self, count: u32) -> Result<u32> {
        if count == 0 {
            return Ok(0);
        }
        if self.bits_in_buffer < count {
            self.ensure_bits(count)?;
        }
        let value = self.peek(count);
        self.consume(count);
        Ok(value)
    }

    /// Reads `size` magnitude bits and sign-extends them as in Figure F.12 (EXTEND).
    pub fn receive_extend(&mut self, size: u8) -> Result<i32> {
        if size == 0 {
            return Ok(0);
        }
        let size = u32::from(size);
        let value = self.decode_bits(size)? as i32;
        if value < 1 << (size - 1) {
            Ok(value - (1 << size) + 1)
        } else {
            Ok(value)
        }
    }

    /// Returns the next `count` buffered bits without consuming them.
    pub(crate) fn peek(&self, count: u32) -> u32 {
        debug_assert!(count <= self.bits_in_buffer);
        (self.accumulator >> (self.bits_in_buffer - count)) & ((1 << count) - 1)
    }

    pub(crate) fn consume(&mut self, count: u32) {
        debug_assert!(count <= self.bits_in_buffer);
        self.bits_in_buffer -= count;
        self.mask >>= count;
    }

    /// Discards buffered bits ahead of a restart marker.
    pub fn reset(&mut self) {
        self.accumulator = 0;
        self.mask = 0;
        self.bits_in_buffer = 0;
        self.marker_hit = false;
    }

    pub fn byte_reader(&mut self) -> &mut ByteReader<R> {
        self.reader
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_bits_msb_first() {
        let mut bytes = ByteReader::new(&[0b1010_0000, 0b1111_0000][..]);
        let mut bits = JpegBitReader::new(&mut bytes);
        assert!(bits.decode_bit().unwrap());
        assert!(!bits.decode_bit().unwrap());
        assert_eq!(bits.decode_bits(3).unwrap(), 0b100);
        assert_eq!(bits.decode_bits(7).unwrap(), 0b000_1111);
    }

    #[test]
    fn test_stuffed_ff_is_data() {
        let mut bytes = ByteReader::new(&[0xFF, 0x00, 0x80][..]);
        let mut bits = JpegBitReader::new(&mut bytes);
        assert_eq!(bits.decode_bits(8).unwrap(), 0xFF);
        assert!(bits.decode_bit().unwrap());
        assert!(!bits.marker_hit());
    }

    #[test]
    fn test_marker_supplies_zero_bits() {
        let mut bytes = ByteReader::new(&[0xAA, 0xFF, 0xD9][..]);
        {
            let mut bits = JpegBitReader::new(&mut bytes);
            assert_eq!(bits.decode_bits(8).unwrap(), 0xAA);
            assert_eq!(bits.decode_bits(16).unwrap(), 0);
            assert!(bits.marker_hit());
        }
        assert_eq!(bytes.read_u16().unwrap(), 0xFFD9);
    }

    #[test]
    fn test_receive_extend() {
        // Category 3: 000..011 are negative, 100..111 positive.
        let mut bytes = ByteReader::new(&[0b0001_1100, 0b1111_1110][..]);
        let mut bits = JpegBitReader::new(&mut bytes);
        assert_eq!(bits.receive_extend(3).unwrap(), -7);
        assert_eq!(bits.receive_extend(3).unwrap(), 7);
        assert_eq!(bits.receive_extend(0).unwrap(), 0);
        assert_eq!(bits.receive_extend(1).unwrap(), -1);
        // 0b0111_1111 lies in the lower half of category 8.
        assert_eq!(bits.receive_extend(8).unwrap(), -128);
    }
}
