//! Block-wise LZSS used for compressed members of the disc archive.
//!
//! The input is split into 0x1000-byte blocks, each an MSB-first bit stream.
//! A set flag bit is followed by an 8-bit literal. A clear flag bit is
//! followed by an 8-bit dictionary position (zero ends the block) and a
//! 4-bit count; `count + 2` bytes are copied out of the 256-byte ring
//! dictionary. The dictionary persists across blocks but its write cursor
//! restarts at 1 for every block.

use crate::error::{Error, Result};

/// Compressed block size.
pub const BLOCK_SIZE: usize = 0x1000;
const DICTIONARY_SIZE: usize = 0x100;
const MIN_MATCH: usize = 2;

/// MSB-first bit reader over the whole compressed buffer.
struct BitReader<'a> {
    data: &'a [u8],
    bit: usize,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8], byte: usize) -> Self {
        Self { data, bit: byte * 8 }
    }

    fn byte_offset(&self) -> usize {
        self.bit / 8
    }

    fn read_bits(&mut self, count: usize) -> Result<u8> {
        let mut value = 0u8;
        for _ in 0..count {
            let byte = self.byte_offset();
            let Some(&b) = self.data.get(byte) else {
                return Err(Error::UnexpectedEof {
                    offset: byte,
                    wanted: 1,
                    available: 0,
                });
            };
            let bit = (b >> (7 - self.bit % 8)) & 1;
            value = (value << 1) | bit;
            self.bit += 1;
        }
        Ok(value)
    }
}

/// Decompress `compressed` into exactly `output_size` bytes.
///
/// Output the stream does not reach is left zeroed.
///
/// # Errors
/// [`Error::LzssOverrun`] if a copy would write past `output_size`, and
/// [`Error::UnexpectedEof`] if a block runs out of input.
pub fn decompress(compressed: &[u8], output_size: usize) -> Result<Vec<u8>> {
    let mut output = vec![0u8; output_size];
    let mut dictionary = [0u8; DICTIONARY_SIZE];
    let mut dst = 0usize;

    for block_start in (0..compressed.len()).step_by(BLOCK_SIZE) {
        let mut reader = BitReader::new(compressed, block_start);
        let mut cursor = 1usize;

        while dst < output_size {
            let literal = reader.read_bits(1)? == 1;
            let value = reader.read_bits(8)?;
            if literal {
                output[dst] = value;
                dst += 1;
                dictionary[cursor] = value;
                cursor = (cursor + 1) % DICTIONARY_SIZE;
                continue;
            }
            if value == 0 {
                break;
            }

            let count = reader.read_bits(4)? as usize + MIN_MATCH;
            if dst + count > output_size {
                return Err(Error::LzssOverrun {
                    offset: reader.byte_offset(),
                    expected: output_size,
                });
            }
            let mut position = value as usize;
            for _ in 0..count {
                let b = dictionary[position];
                output[dst] = b;
                dst += 1;
                dictionary[cursor] = b;
                cursor = (cursor + 1) % DICTIONARY_SIZE;
                position = (position + 1) % DICTIONARY_SIZE;
            }
        }
    }

    tracing::debug!("LZSS: {} -> {} bytes ({dst} written)", compressed.len(), output_size);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    // 1 'A' | 1 'B' | 0 pos=1 count=0 | 0 pos=0
    const ABAB: [u8; 5] = [0xA0, 0xD0, 0x80, 0x20, 0x00];

    #[test]
    fn test_literals_and_back_reference() {
        assert_eq!(decompress(&ABAB, 4).unwrap(), b"ABAB");
    }

    #[test]
    fn test_end_of_block_leaves_zeroes() {
        assert_eq!(decompress(&ABAB, 8).unwrap(), b"ABAB\0\0\0\0");
    }

    #[test]
    fn test_overrun_is_rejected() {
        let err = decompress(&ABAB, 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedContainer);
        assert!(matches!(err, Error::LzssOverrun { expected: 3, .. }));
    }

    #[test]
    fn test_truncated_stream() {
        let err = decompress(&ABAB[..2], 4).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Truncated);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(decompress(&[], 3).unwrap(), vec![0, 0, 0]);
    }

    #[test]
    fn test_second_block_restarts_dictionary_cursor() {
        // Block 0: literal 'A' then end of block. Block 1: literal 'B' lands
        // at position 1 again, then copy 2 from position 1.
        let mut data = vec![0u8; BLOCK_SIZE];
        data[..3].copy_from_slice(&[0xA0, 0x80, 0x00]);
        data.extend_from_slice(&[0xA1, 0x00, 0x40, 0x00]);
        assert_eq!(decompress(&data, 4).unwrap(), b"ABBB");
    }
}
