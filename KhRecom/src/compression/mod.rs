//! Compression utilities

pub mod lzss;

use crate::error::Result;

/// Decompress an LZSS-compressed disc archive member.
///
/// # Errors
/// Returns an error if the stream is truncated or overruns `output_size`.
pub fn decompress(data: &[u8], output_size: usize) -> Result<Vec<u8>> {
    lzss::decompress(data, output_size)
}
