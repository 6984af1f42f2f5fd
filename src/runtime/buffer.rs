//! Owned byte container
//!
//! Memory-safe buffer for data moving through the chunked read and
//! write paths. Supports fixed-size allocation, slicing, exact-length
//! concatenation, and decoding with a named text encoding.

use base64::Engine;

/// Named text encodings understood by [`OwnedBuffer::decode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Strict UTF-8; invalid sequences are an error.
    Utf8,
    /// UTF-8 with U+FFFD replacement for invalid sequences.
    Utf8Lossy,
    /// One byte per code point (ISO-8859-1).
    Latin1,
    /// Lowercase hexadecimal digits.
    Hex,
    /// Standard base64 with padding.
    Base64,
}

/// Memory-safe buffer that owns its data.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OwnedBuffer {
    data: Vec<u8>,
}

impl OwnedBuffer {
    /// Create a new empty buffer.
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Create a buffer of `size` zero bytes.
    pub fn zeroed(size: usize) -> Self {
        Self {
            data: vec![0u8; size],
        }
    }

    /// Create a buffer from a Vec.
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Create a buffer from a slice (copies data).
    pub fn from_slice(data: &[u8]) -> Self {
        Self {
            data: data.to_vec(),
        }
    }

    /// Get the length of the buffer.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the buffer as a slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Get the buffer as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consume the buffer and return the underlying Vec.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Append data to the buffer.
    pub fn extend(&mut self, data: &[u8]) {
        self.data.extend_from_slice(data);
    }

    /// Truncate the buffer to `len` bytes.
    pub fn truncate(&mut self, len: usize) {
        self.data.truncate(len);
    }

    /// Copy `src` into the buffer starting at `offset`.
    ///
    /// The buffer must already be large enough; the chunked reader
    /// pre-sizes it from the stat result.
    pub fn write_at(&mut self, offset: usize, src: &[u8]) {
        self.data[offset..offset + src.len()].copy_from_slice(src);
    }

    /// Copy out a sub-buffer of up to `len` bytes starting at `start`.
    /// Out-of-range bounds clamp to the buffer's length.
    pub fn slice(&self, start: usize, len: usize) -> OwnedBuffer {
        let start = start.min(self.data.len());
        let end = start.saturating_add(len).min(self.data.len());
        OwnedBuffer::from_slice(&self.data[start..end])
    }

    /// Concatenate `chunks` into a single buffer of exactly `total` bytes.
    ///
    /// Bytes beyond `total` are dropped; the chunked reader uses the
    /// cumulative transfer count as the exact length.
    pub fn concat(chunks: &[OwnedBuffer], total: usize) -> OwnedBuffer {
        let mut data = Vec::with_capacity(total);
        for chunk in chunks {
            let remaining = total - data.len();
            if remaining == 0 {
                break;
            }
            let take = chunk.len().min(remaining);
            data.extend_from_slice(&chunk.as_slice()[..take]);
        }
        OwnedBuffer { data }
    }

    /// Decode the buffer with a named text encoding.
    pub fn decode(&self, encoding: Encoding) -> Result<String, String> {
        match encoding {
            Encoding::Utf8 => String::from_utf8(self.data.clone())
                .map_err(|e| format!("invalid utf-8: {}", e)),
            Encoding::Utf8Lossy => Ok(String::from_utf8_lossy(&self.data).into_owned()),
            Encoding::Latin1 => Ok(self.data.iter().map(|&b| b as char).collect()),
            Encoding::Hex => Ok(hex::encode(&self.data)),
            Encoding::Base64 => Ok(base64::engine::general_purpose::STANDARD.encode(&self.data)),
        }
    }
}

impl From<Vec<u8>> for OwnedBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self::from_vec(data)
    }
}

impl From<&[u8]> for OwnedBuffer {
    fn from(data: &[u8]) -> Self {
        Self::from_slice(data)
    }
}

impl AsRef<[u8]> for OwnedBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl std::ops::Deref for OwnedBuffer {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeroed_and_write_at() {
        let mut buf = OwnedBuffer::zeroed(8);
        assert_eq!(buf.len(), 8);
        buf.write_at(2, b"abc");
        assert_eq!(buf.as_slice(), b"\0\0abc\0\0\0");
    }

    #[test]
    fn test_slice_clamps_bounds() {
        let buf = OwnedBuffer::from_slice(b"abcdef");
        assert_eq!(buf.slice(2, 3).as_slice(), b"cde");
        assert_eq!(buf.slice(4, 10).as_slice(), b"ef");
        assert!(buf.slice(9, 2).is_empty());
    }

    #[test]
    fn test_concat_exact_length() {
        let chunks = vec![
            OwnedBuffer::from_slice(b"hello "),
            OwnedBuffer::from_slice(b"world!!"),
        ];
        let joined = OwnedBuffer::concat(&chunks, 11);
        assert_eq!(joined.as_slice(), b"hello world");

        // Total larger than available data keeps what exists.
        let joined = OwnedBuffer::concat(&chunks, 64);
        assert_eq!(joined.as_slice(), b"hello world!!");
    }

    #[test]
    fn test_decode_encodings() {
        let buf = OwnedBuffer::from_slice(b"hi");
        assert_eq!(buf.decode(Encoding::Utf8).unwrap(), "hi");
        assert_eq!(buf.decode(Encoding::Hex).unwrap(), "6869");
        assert_eq!(buf.decode(Encoding::Base64).unwrap(), "aGk=");

        let latin = OwnedBuffer::from_slice(&[0xe9]);
        assert_eq!(latin.decode(Encoding::Latin1).unwrap(), "é");
        assert!(latin.decode(Encoding::Utf8).is_err());
        assert_eq!(latin.decode(Encoding::Utf8Lossy).unwrap(), "\u{fffd}");
    }
}
