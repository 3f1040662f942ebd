//! Bounds-checked cursor over a command body.
//!
//! All multi-byte reads are big-endian, matching the wire protocol. Every
//! read returns `None` when the body is too short so interpreters can turn
//! truncation into a `MalformedPayload` instead of panicking.

/// Byte cursor positioned at offset 0 of a command body.
#[derive(Debug)]
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_u8(&mut self) -> Option<u8> {
        let val = *self.bytes.get(self.offset)?;
        self.offset += 1;
        Some(val)
    }

    pub fn read_i8(&mut self) -> Option<i8> {
        self.read_u8().map(|v| v as i8)
    }

    pub fn read_u16(&mut self) -> Option<u16> {
        let val = u16::from_be_bytes(
            self.bytes
                .get(self.offset..self.offset + 2)?
                .try_into()
                .ok()?,
        );
        self.offset += 2;
        Some(val)
    }

    pub fn read_i16(&mut self) -> Option<i16> {
        self.read_u16().map(|v| v as i16)
    }

    pub fn read_u32(&mut self) -> Option<u32> {
        let val = u32::from_be_bytes(
            self.bytes
                .get(self.offset..self.offset + 4)?
                .try_into()
                .ok()?,
        );
        self.offset += 4;
        Some(val)
    }

    pub fn read_u64(&mut self) -> Option<u64> {
        let val = u64::from_be_bytes(
            self.bytes
                .get(self.offset..self.offset + 8)?
                .try_into()
                .ok()?,
        );
        self.offset += 8;
        Some(val)
    }

    /// Exactly `len` raw bytes.
    pub fn read_bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        let val = self.bytes.get(self.offset..self.offset + len)?;
        self.offset += len;
        Some(val)
    }

    /// A string with a one-byte length prefix.
    pub fn read_string8(&mut self) -> Option<String> {
        let len = self.read_u8()? as usize;
        let bytes = self.read_bytes(len)?;
        Some(String::from_utf8_lossy(bytes).to_string())
    }

    /// A string with a two-byte length prefix.
    pub fn read_string16(&mut self) -> Option<String> {
        let len = self.read_u16()? as usize;
        let bytes = self.read_bytes(len)?;
        Some(String::from_utf8_lossy(bytes).to_string())
    }

    /// Everything left in the body, consuming it.
    pub fn rest(&mut self) -> &'a [u8] {
        let val = &self.bytes[self.offset..];
        self.offset = self.bytes.len();
        val
    }

    /// The remaining body as lossy UTF-8, consuming it.
    pub fn rest_str(&mut self) -> String {
        String::from_utf8_lossy(self.rest()).to_string()
    }
}
