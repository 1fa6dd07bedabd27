use crate::core::errors::LedgerError;
use base64::engine::general_purpose;
use base64::Engine;

/// Types with a canonical XDR encoding.
pub trait WriteXdr {
    fn write_xdr(&self, w: &mut XdrWriter) -> Result<(), LedgerError>;

    fn to_xdr(&self) -> Result<Vec<u8>, LedgerError> {
        let mut w = XdrWriter::new();
        self.write_xdr(&mut w)?;
        Ok(w.into_inner())
    }

    fn to_xdr_base64(&self) -> Result<String, LedgerError> {
        Ok(general_purpose::STANDARD.encode(self.to_xdr()?))
    }
}

pub trait ReadXdr: Sized {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, LedgerError>;

    /// Decode a complete value; trailing bytes are an error.
    fn from_xdr(bytes: &[u8]) -> Result<Self, LedgerError> {
        let mut r = XdrReader::new(bytes);
        let value = Self::read_xdr(&mut r)?;
        r.finish()?;
        Ok(value)
    }

    fn from_xdr_base64(encoded: &str) -> Result<Self, LedgerError> {
        let bytes = general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| LedgerError::EncodingError(format!("invalid base64: {}", e)))?;
        Self::from_xdr(&bytes)
    }
}

#[derive(Debug, Default)]
pub struct XdrWriter {
    buf: Vec<u8>,
}

impl XdrWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_bool(&mut self, v: bool) {
        self.write_u32(u32::from(v));
    }

    fn pad(&mut self, len: usize) {
        let rem = len % 4;
        if rem != 0 {
            self.buf.extend(std::iter::repeat(0u8).take(4 - rem));
        }
    }

    /// Fixed-length opaque data.
    pub fn write_fixed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
        self.pad(bytes.len());
    }

    /// Variable-length opaque data bounded by `max`.
    pub fn write_var(&mut self, bytes: &[u8], max: usize) -> Result<(), LedgerError> {
        if bytes.len() > max {
            return Err(LedgerError::EncodingError(format!(
                "opaque of {} bytes exceeds limit {}",
                bytes.len(),
                max
            )));
        }
        self.write_u32(bytes.len() as u32);
        self.write_fixed(bytes);
        Ok(())
    }

    pub fn write_string(&mut self, s: &str, max: usize) -> Result<(), LedgerError> {
        self.write_var(s.as_bytes(), max)
    }

    pub fn write_option<T, F>(&mut self, value: Option<&T>, f: F) -> Result<(), LedgerError>
    where
        F: FnOnce(&mut Self, &T) -> Result<(), LedgerError>,
    {
        match value {
            Some(v) => {
                self.write_bool(true);
                f(self, v)
            }
            None => {
                self.write_bool(false);
                Ok(())
            }
        }
    }

    pub fn write_array<T: WriteXdr>(&mut self, items: &[T], max: usize) -> Result<(), LedgerError> {
        if items.len() > max {
            return Err(LedgerError::EncodingError(format!(
                "array of {} items exceeds limit {}",
                items.len(),
                max
            )));
        }
        self.write_u32(items.len() as u32);
        for item in items {
            item.write_xdr(self)?;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct XdrReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> XdrReader<'a> {
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], LedgerError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| LedgerError::EncodingError("unexpected end of XDR input".to_string()))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], LedgerError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_u32(&mut self) -> Result<u32, LedgerError> {
        Ok(u32::from_be_bytes(self.take_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, LedgerError> {
        Ok(i32::from_be_bytes(self.take_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, LedgerError> {
        Ok(u64::from_be_bytes(self.take_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64, LedgerError> {
        Ok(i64::from_be_bytes(self.take_array()?))
    }

    pub fn read_bool(&mut self) -> Result<bool, LedgerError> {
        match self.read_u32()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(LedgerError::EncodingError(format!("invalid bool {}", other))),
        }
    }

    fn skip_padding(&mut self, len: usize) -> Result<(), LedgerError> {
        let rem = len % 4;
        if rem != 0 && self.take(4 - rem)?.iter().any(|b| *b != 0) {
            return Err(LedgerError::EncodingError("non-zero XDR padding".to_string()));
        }
        Ok(())
    }

    pub fn read_fixed<const N: usize>(&mut self) -> Result<[u8; N], LedgerError> {
        let out = self.take_array::<N>()?;
        self.skip_padding(N)?;
        Ok(out)
    }

    pub fn read_var(&mut self, max: usize) -> Result<Vec<u8>, LedgerError> {
        let len = self.read_u32()? as usize;
        if len > max {
            return Err(LedgerError::EncodingError(format!(
                "opaque of {} bytes exceeds limit {}",
                len, max
            )));
        }
        let out = self.take(len)?.to_vec();
        self.skip_padding(len)?;
        Ok(out)
    }

    pub fn read_string(&mut self, max: usize) -> Result<String, LedgerError> {
        let bytes = self.read_var(max)?;
        String::from_utf8(bytes)
            .map_err(|e| LedgerError::EncodingError(format!("invalid utf-8 string: {}", e)))
    }

    pub fn read_option<T, F>(&mut self, f: F) -> Result<Option<T>, LedgerError>
    where
        F: FnOnce(&mut Self) -> Result<T, LedgerError>,
    {
        if self.read_bool()? {
            f(self).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn read_array<T: ReadXdr>(&mut self, max: usize) -> Result<Vec<T>, LedgerError> {
        let len = self.read_u32()? as usize;
        if len > max {
            return Err(LedgerError::EncodingError(format!(
                "array of {} items exceeds limit {}",
                len, max
            )));
        }
        (0..len).map(|_| T::read_xdr(self)).collect()
    }

    pub fn finish(&self) -> Result<(), LedgerError> {
        if self.pos == self.bytes.len() {
            Ok(())
        } else {
            Err(LedgerError::EncodingError(format!(
                "{} trailing bytes after XDR value",
                self.bytes.len() - self.pos
            )))
        }
    }
}
