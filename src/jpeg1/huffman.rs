//! Huffman decoding tables (ITU T.81 Annex C and F.2.2.3).
//! Codes of up to 8 bits are resolved with a single lookup, longer ones bit by bit.

use std::fmt;
use std::io::Read;

use crate::constants::{LUT_BITS, MAXIMUM_CODE_LENGTH, MAXIMUM_HUFFMAN_VALUES, MAXIMUM_TH};
use crate::error::{FormatError, Result};
use crate::jpeg1::bit_reader::JpegBitReader;

/// Standard JPEG DC luminance Huffman table lengths (Table K.3).
pub const STD_LUMINANCE_DC_LENGTHS: [u8; 16] = [0, 1, 5, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0];

/// Standard JPEG DC chrominance Huffman table lengths (Table K.4).
pub const STD_CHROMINANCE_DC_LENGTHS: [u8; 16] = [0, 3, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0];

/// DC tables of both kinds carry the categories 0 to 11.
pub const STD_DC_VALUES: [u8; 12] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];

/// Standard JPEG AC luminance Huffman table lengths (Table K.5).
pub const STD_LUMINANCE_AC_LENGTHS: [u8; 16] = [0, 2, 1, 3, 3, 2, 4, 3, 5, 5, 4, 4, 0, 0, 1, 125];

#[rustfmt::skip]
pub const STD_LUMINANCE_AC_VALUES: [u8; 162] = [
    0x01, 0x02, 0x03, 0x00, 0x04, 0x11, 0x05, 0x12,
    0x21, 0x31, 0x41, 0x06, 0x13, 0x51, 0x61, 0x07,
    0x22, 0x71, 0x14, 0x32, 0x81, 0x91, 0xa1, 0x08,
    0x23, 0x42, 0xb1, 0xc1, 0x15, 0x52, 0xd1, 0xf0,
    0x24, 0x33, 0x62, 0x72, 0x82, 0x09, 0x0a, 0x16,
    0x17, 0x18, 0x19, 0x1a, 0x25, 0x26, 0x27, 0x28,
    0x29, 0x2a, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39,
    0x3a, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49,
    0x4a, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59,
    0x5a, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68, 0x69,
    0x6a, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78, 0x79,
    0x7a, 0x83, 0x84, 0x85, 0x86, 0x87, 0x88, 0x89,
    0x8a, 0x92, 0x93, 0x94, 0x95, 0x96, 0x97, 0x98,
    0x99, 0x9a, 0xa2, 0xa3, 0xa4, 0xa5, 0xa6, 0xa7,
    0xa8, 0xa9, 0xaa, 0xb2, 0xb3, 0xb4, 0xb5, 0xb6,
    0xb7, 0xb8, 0xb9, 0xba, 0xc2, 0xc3, 0xc4, 0xc5,
    0xc6, 0xc7, 0xc8, 0xc9, 0xca, 0xd2, 0xd3, 0xd4,
    0xd5, 0xd6, 0xd7, 0xd8, 0xd9, 0xda, 0xe1, 0xe2,
    0xe3, 0xe4, 0xe5, 0xe6, 0xe7, 0xe8, 0xe9, 0xea,
    0xf1, 0xf2, 0xf3, 0xf4, 0xf5, 0xf6, 0xf7, 0xf8,
    0xf9, 0xfa,
];

/// Standard JPEG AC chrominance Huffman table lengths (Table K.6).
pub const STD_CHROMINANCE_AC_LENGTHS: [u8; 16] = [0, 2, 1, 2, 4, 4, 3, 4, 7, 5, 4, 4, 0, 1, 2, 119];

#[rustfmt::skip]
pub const STD_CHROMINANCE_AC_VALUES: [u8; 162] = [
    0x00, 0x01, 0x02, 0x03, 0x11, 0x04, 0x05, 0x21,
    0x31, 0x06, 0x12, 0x41, 0x51, 0x07, 0x61, 0x71,
    0x13, 0x22, 0x32, 0x81, 0x08, 0x14, 0x42, 0x91,
    0xa1, 0xb1, 0xc1, 0x09, 0x23, 0x33, 0x52, 0xf0,
    0x15, 0x62, 0x72, 0xd1, 0x0a, 0x16, 0x24, 0x34,
    0xe1, 0x25, 0xf1, 0x17, 0x18, 0x19, 0x1a, 0x26,
    0x27, 0x28, 0x29, 0x2a, 0x35, 0x36, 0x37, 0x38,
    0x39, 0x3a, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48,
    0x49, 0x4a, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58,
    0x59, 0x5a, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68,
    0x69, 0x6a, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78,
    0x79, 0x7a, 0x82, 0x83, 0x84, 0x85, 0x86, 0x87,
    0x88, 0x89, 0x8a, 0x92, 0x93, 0x94, 0x95, 0x96,
    0x97, 0x98, 0x99, 0x9a, 0xa2, 0xa3, 0xa4, 0xa5,
    0xa6, 0xa7, 0xa8, 0xa9, 0xaa, 0xb2, 0xb3, 0xb4,
    0xb5, 0xb6, 0xb7, 0xb8, 0xb9, 0xba, 0xc2, 0xc3,
    0xc4, 0xc5, 0xc6, 0xc7, 0xc8, 0xc9, 0xca, 0xd2,
    0xd3, 0xd4, 0xd5, 0xd6, 0xd7, 0xd8, 0xd9, 0xda,
    0xe2, 0xe3, 0xe4, 0xe5, 0xe6, 0xe7, 0xe8, 0xe9,
    0xea, 0xf2, 0xf3, 0xf4, 0xf5, 0xf6, 0xf7, 0xf8,
    0xf9, 0xfa,
];

/// A canonical Huffman table as defined by a DHT segment.
#[derive(Clone)]
pub struct HuffmanTable {
    lengths: [u8; MAXIMUM_CODE_LENGTH],
    values: [u8; MAXIMUM_HUFFMAN_VALUES],
    length: usize,
    // Indexed by the next 8 bits of the stream: (value << 8) | (code length + 1), zero when
    // the code is longer than 8 bits.
    lut: [u16; 1 << LUT_BITS],
    // Per code length, -1 when no code has that length.
    min_code: [i32; MAXIMUM_CODE_LENGTH],
    max_code: [i32; MAXIMUM_CODE_LENGTH],
    val_ptr: [i32; MAXIMUM_CODE_LENGTH],
}

impl HuffmanTable {
    /// Builds a table from JPEG DHT lengths and values.
    pub fn build(lengths: &[u8; MAXIMUM_CODE_LENGTH], values: &[u8]) -> Result<Self, FormatError> {
        let total: usize = lengths.iter().map(|&n| usize::from(n)).sum();
        if total == 0 || total > MAXIMUM_HUFFMAN_VALUES || values.len() != total {
            return Err(FormatError::HuffmanTableInvalid);
        }

        let mut table = Self {
            lengths: *lengths,
            values: [0; MAXIMUM_HUFFMAN_VALUES],
            length: total,
            lut: [0; 1 << LUT_BITS],
            min_code: [-1; MAXIMUM_CODE_LENGTH],
            max_code: [-1; MAXIMUM_CODE_LENGTH],
            val_ptr: [-1; MAXIMUM_CODE_LENGTH],
        };
        table.values[..total].copy_from_slice(values);

        let mut code = 0i32;
        let mut index = 0i32;
        for (i, &count) in lengths.iter().enumerate() {
            let count = i32::from(count);
            if count > 0 {
                // Codes of length i + 1 must fit in i + 1 bits.
                if code + count > 1 << (i + 1) {
                    return Err(FormatError::HuffmanTableInvalid);
                }

                if i < LUT_BITS as usize {
                    let spread = LUT_BITS as usize - 1 - i;
                    for j in 0..count {
                        let value = u16::from(values[(index + j) as usize]);
                        let entry = (value << 8) | (i as u16 + 2);
                        let base = ((code + j) as usize) << spread;
                        table.lut[base..base + (1 << spread)].fill(entry);
                    }
                }

                table.min_code[i] = code;
                table.val_ptr[i] = index;
                code += count;
                index += count;
                table.max_code[i] = code - 1;
            }
            code <<= 1;
        }

        Ok(table)
    }

    pub fn standard_luminance_dc() -> Result<Self, FormatError> {
        Self::standard(&STD_LUMINANCE_DC_LENGTHS, &STD_DC_VALUES)
    }

    pub fn standard_chrominance_dc() -> Result<Self, FormatError> {
        Self::standard(&STD_CHROMINANCE_DC_LENGTHS, &STD_DC_VALUES)
    }

    pub fn standard_luminance_ac() -> Result<Self, FormatError> {
        Self::standard(&STD_LUMINANCE_AC_LENGTHS, &STD_LUMINANCE_AC_VALUES)
    }

    pub fn standard_chrominance_ac() -> Result<Self, FormatError> {
        Self::standard(&STD_CHROMINANCE_AC_LENGTHS, &STD_CHROMINANCE_AC_VALUES)
    }

    fn standard(lengths: &[u8; MAXIMUM_CODE_LENGTH], values: &[u8]) -> Result<Self, FormatError> {
        Self::build(lengths, values)
    }

    /// Number of codes in the table.
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Lists every `(code length, code, value)` in canonical order.
    pub fn codes(&self) -> Vec<(u8, u16, u8)> {
        let mut codes = Vec::with_capacity(self.length);
        for (i, &count) in self.lengths.iter().enumerate() {
            for j in 0..i32::from(count) {
                let code = (self.min_code[i] + j) as u16;
                let value = self.values[(self.val_ptr[i] + j) as usize];
                codes.push((i as u8 + 1, code, value));
            }
        }
        codes
    }

    /// Decodes the next symbol from the bit reader.
    pub fn decode<R: Read>(&self, reader: &mut JpegBitReader<'_, R>) -> Result<u8> {
        if reader.bits_in_buffer() < LUT_BITS {
            reader.ensure_bits(LUT_BITS)?;
        }
        let entry = self.lut[reader.peek(LUT_BITS) as usize];
        if entry != 0 {
            reader.consume(u32::from(entry & 0xFF) - 1);
            return Ok((entry >> 8) as u8);
        }

        let mut code = 0i32;
        for i in 0..MAXIMUM_CODE_LENGTH {
            code |= i32::from(reader.decode_bit()?);
            if code <= self.max_code[i] {
                return Ok(self.values[(self.val_ptr[i] + code - self.min_code[i]) as usize]);
            }
            code <<= 1;
        }
        Err(FormatError::BadHuffmanCode.into())
    }
}

impl fmt::Debug for HuffmanTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (bits, code, value) in self.codes() {
            let bits = usize::from(bits);
            writeln!(f, "{bits} {code:0bits$b} -> {value:02x}")?;
        }
        Ok(())
    }
}

/// Table class Tc of a DHT segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableClass {
    Dc = 0,
    Ac = 1,
}

/// The Huffman tables currently installed, indexed by class and destination.
#[derive(Clone, Default)]
pub struct HuffmanTables {
    tables: [[Option<HuffmanTable>; MAXIMUM_TH as usize + 1]; 2],
}

impl HuffmanTables {
    pub fn get(&self, class: TableClass, destination: u8) -> Option<&HuffmanTable> {
        self.tables[class as usize]
            .get(usize::from(destination))
            .and_then(Option::as_ref)
    }

    pub fn set(&mut self, class: TableClass, destination: u8, table: HuffmanTable) {
        self.tables[class as usize][usize::from(destination)] = Some(table);
    }

    pub fn is_empty(&self) -> bool {
        self.tables.iter().flatten().all(Option::is_none)
    }

    /// Installs the Annex K tables. Motion-JPEG frames omit their DHT segments and rely on
    /// these.
    pub fn install_standard_tables(&mut self) -> Result<(), FormatError> {
        self.set(TableClass::Dc, 0, HuffmanTable::standard_luminance_dc()?);
        self.set(TableClass::Ac, 0, HuffmanTable::standard_luminance_ac()?);
        self.set(TableClass::Dc, 1, HuffmanTable::standard_chrominance_dc()?);
        self.set(TableClass::Ac, 1, HuffmanTable::standard_chrominance_ac()?);
        Ok(())
    }
}
