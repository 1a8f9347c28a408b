use std::borrow::Cow;
use std::str;

use crate::error::DecodeError;

/// A protobuf byte buffer meant for reading.
///
/// Example usage:
///
/// ```
/// use std::borrow::Cow;
/// let mut bb = dynaproto_schema::ByteBuffer::new(&[5, 65, 108, 105, 99, 101, 172, 2]);
/// assert_eq!(bb.read_string(), Ok(Cow::Borrowed("Alice")));
/// assert_eq!(bb.read_var_uint32(), Ok(300));
/// ```
///
pub struct ByteBuffer<'a> {
    data: &'a [u8],
    index: usize,
}

impl<'a> ByteBuffer<'a> {
    /// Create a new ByteBuffer that wraps the provided byte slice. The lifetime
    /// of the returned ByteBuffer must not outlive the lifetime of the byte
    /// slice.
    pub fn new(data: &[u8]) -> ByteBuffer {
        ByteBuffer { data, index: 0 }
    }

    /// Retrieves the underlying byte slice.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Retrieves the current index into the underlying byte slice. This starts
    /// off as 0 and ends up as `self.data().len()` when everything has been
    /// read.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The number of unread bytes left in the buffer.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.index
    }

    /// Try to read a byte starting at the current index.
    pub fn read_byte(&mut self) -> Result<u8, DecodeError> {
        if self.index >= self.data.len() {
            Err(DecodeError::UnexpectedEof)
        } else {
            let value = self.data[self.index];
            self.index += 1;
            Ok(value)
        }
    }

    /// Try to read `len` raw bytes starting at the current index.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if self.index + len > self.data.len() {
            Err(DecodeError::TruncatedPayload {
                declared: len,
                remaining: self.remaining(),
            })
        } else {
            let value = &self.data[self.index..self.index + len];
            self.index += len;
            Ok(value)
        }
    }

    /// Try to read a base-128 varint starting at the current index. Up to ten
    /// bytes are consumed so that 64-bit encodings produced by other protobuf
    /// implementations (sign-extended negative int32 values in particular)
    /// still decode.
    pub fn read_var_uint64(&mut self) -> Result<u64, DecodeError> {
        let mut shift: u8 = 0;
        let mut result: u64 = 0;

        loop {
            let byte = self.read_byte()?;
            if shift < 63 {
                result |= ((byte & 127) as u64) << shift;
            } else {
                result |= ((byte & 1) as u64) << shift;
            }
            shift += 7;

            if (byte & 128) == 0 {
                return Ok(result);
            }
            if shift >= 70 {
                return Err(DecodeError::MalformedVarint);
            }
        }
    }

    /// Try to read a varint and truncate it to 32 bits.
    pub fn read_var_uint32(&mut self) -> Result<u32, DecodeError> {
        Ok(self.read_var_uint64()? as u32)
    }

    /// Try to read a zigzag-encoded signed 32-bit integer starting at the
    /// current index.
    pub fn read_var_sint32(&mut self) -> Result<i32, DecodeError> {
        let value = self.read_var_uint32()?;
        Ok(((value >> 1) as i32) ^ -((value & 1) as i32))
    }

    /// Try to read 4 little-endian bytes as an unsigned 32-bit integer.
    pub fn read_fixed32(&mut self) -> Result<u32, DecodeError> {
        if self.remaining() < 4 {
            return Err(DecodeError::UnexpectedEof);
        }
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.data[self.index..self.index + 4]);
        self.index += 4;
        Ok(u32::from_le_bytes(bytes))
    }

    /// Try to read 8 little-endian bytes as an unsigned 64-bit integer.
    pub fn read_fixed64(&mut self) -> Result<u64, DecodeError> {
        if self.remaining() < 8 {
            return Err(DecodeError::UnexpectedEof);
        }
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.data[self.index..self.index + 8]);
        self.index += 8;
        Ok(u64::from_le_bytes(bytes))
    }

    /// Try to read a 32-bit float stored as 4 little-endian bytes.
    pub fn read_float(&mut self) -> Result<f32, DecodeError> {
        Ok(f32::from_bits(self.read_fixed32()?))
    }

    /// Try to read a 64-bit float stored as 8 little-endian bytes.
    pub fn read_double(&mut self) -> Result<f64, DecodeError> {
        Ok(f64::from_bits(self.read_fixed64()?))
    }

    /// Try to read a length-prefixed UTF-8 string starting at the current
    /// index. This string is returned as a slice so it just aliases the
    /// underlying memory.
    pub fn read_string(&mut self) -> Result<Cow<'a, str>, DecodeError> {
        let len = self.read_var_uint32()? as usize;
        let bytes = self.read_bytes(len)?;
        str::from_utf8(bytes)
            .map(Cow::Borrowed)
            .map_err(|_| DecodeError::InvalidUtf8)
    }
}

#[test]
fn read_byte() {
    let read = |bytes| ByteBuffer::new(bytes).read_byte();
    assert_eq!(read(&[]), Err(DecodeError::UnexpectedEof));
    assert_eq!(read(&[0]), Ok(0));
    assert_eq!(read(&[254]), Ok(254));
    assert_eq!(read(&[255]), Ok(255));
}

#[test]
fn read_bytes() {
    let mut bb = ByteBuffer::new(&[1, 2, 3, 4, 5]);
    assert_eq!(bb.read_bytes(3), Ok(vec![1, 2, 3].as_slice()));
    assert_eq!(bb.read_bytes(2), Ok(vec![4, 5].as_slice()));
    assert_eq!(
        bb.read_bytes(1),
        Err(DecodeError::TruncatedPayload {
            declared: 1,
            remaining: 0
        })
    );
}

#[test]
fn read_var_uint32() {
    let read = |bytes| ByteBuffer::new(bytes).read_var_uint32();
    assert_eq!(read(&[]), Err(DecodeError::UnexpectedEof));
    assert_eq!(read(&[0]), Ok(0));
    assert_eq!(read(&[1]), Ok(1));
    assert_eq!(read(&[127]), Ok(127));
    assert_eq!(read(&[128]), Err(DecodeError::UnexpectedEof));
    assert_eq!(read(&[128, 1]), Ok(128));
    assert_eq!(read(&[172, 2]), Ok(300));
    assert_eq!(read(&[255, 255, 255, 255, 15]), Ok(4294967295));
    // A sign-extended int32 from a standard encoder truncates cleanly.
    assert_eq!(
        read(&[255, 255, 255, 255, 255, 255, 255, 255, 255, 1]),
        Ok(4294967295)
    );
    // Ten continuation bytes never terminate a varint.
    assert_eq!(
        read(&[128, 128, 128, 128, 128, 128, 128, 128, 128, 128, 1]),
        Err(DecodeError::MalformedVarint)
    );
}

#[test]
fn read_var_sint32() {
    let read = |bytes| ByteBuffer::new(bytes).read_var_sint32();
    assert_eq!(read(&[]), Err(DecodeError::UnexpectedEof));
    assert_eq!(read(&[0]), Ok(0));
    assert_eq!(read(&[1]), Ok(-1));
    assert_eq!(read(&[2]), Ok(1));
    assert_eq!(read(&[3]), Ok(-2));
    assert_eq!(read(&[4]), Ok(2));
    assert_eq!(read(&[254, 255, 255, 255, 15]), Ok(2147483647));
    assert_eq!(read(&[255, 255, 255, 255, 15]), Ok(-2147483648));
}

#[test]
fn read_fixed() {
    assert_eq!(ByteBuffer::new(&[1, 0, 0, 0]).read_fixed32(), Ok(1));
    assert_eq!(
        ByteBuffer::new(&[0x78, 0x56, 0x34, 0x12]).read_fixed32(),
        Ok(0x12345678)
    );
    assert_eq!(
        ByteBuffer::new(&[1, 0, 0]).read_fixed32(),
        Err(DecodeError::UnexpectedEof)
    );
    assert_eq!(
        ByteBuffer::new(&[1, 0, 0, 0, 0, 0, 0, 0]).read_fixed64(),
        Ok(1)
    );
    assert_eq!(
        ByteBuffer::new(&[1, 0, 0, 0, 0, 0, 0]).read_fixed64(),
        Err(DecodeError::UnexpectedEof)
    );
}

#[test]
fn read_float_and_double() {
    assert_eq!(ByteBuffer::new(&[0, 0, 0, 63]).read_float(), Ok(0.5));
    assert_eq!(
        ByteBuffer::new(&[0, 0, 0, 0, 0, 0, 224, 63]).read_double(),
        Ok(0.5)
    );
}

#[test]
fn read_string() {
    let read = |bytes| ByteBuffer::new(bytes).read_string();
    assert_eq!(read(&[0]), Ok(Cow::Borrowed("")));
    assert_eq!(read(&[1, 97]), Ok(Cow::Borrowed("a")));
    assert_eq!(read(&[3, 97, 98, 99]), Ok(Cow::Borrowed("abc")));
    assert_eq!(read(&[4, 240, 159, 141, 149]), Ok(Cow::Borrowed("🍕")));
    assert_eq!(
        read(&[5, 65, 108, 105, 99]),
        Err(DecodeError::TruncatedPayload {
            declared: 5,
            remaining: 4
        })
    );
    assert_eq!(read(&[2, 237, 160]), Err(DecodeError::InvalidUtf8));
}

#[test]
fn read_sequence() {
    let mut bb = ByteBuffer::new(&[5, 65, 108, 105, 99, 101, 30, 59, 0, 0, 0]);
    assert_eq!(bb.read_string(), Ok(Cow::Borrowed("Alice")));
    assert_eq!(bb.read_var_uint32(), Ok(30));
    assert_eq!(bb.read_fixed32(), Ok(59));
    assert_eq!(bb.remaining(), 0);
}

/// A protobuf byte buffer meant for writing.
///
/// Example usage:
///
/// ```
/// let mut bb = dynaproto_schema::ByteBufferMut::new();
/// bb.write_string("Alice");
/// bb.write_var_uint32(300);
/// assert_eq!(bb.data(), [5, 65, 108, 105, 99, 101, 172, 2]);
/// ```
///
pub struct ByteBufferMut {
    data: Vec<u8>,
}

impl ByteBufferMut {
    /// Creates an empty ByteBufferMut ready for writing.
    pub fn new() -> ByteBufferMut {
        ByteBufferMut { data: vec![] }
    }

    /// Consumes this buffer and returns the underlying backing store. Use this
    /// to get the data out when you're done writing to the buffer.
    pub fn data(self) -> Vec<u8> {
        self.data
    }

    /// Returns the number of bytes written so far.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Write a byte to the end of the buffer.
    pub fn write_byte(&mut self, value: u8) {
        self.data.push(value);
    }

    /// Write a raw byte slice to the end of the buffer.
    pub fn write_bytes(&mut self, value: &[u8]) {
        self.data.extend_from_slice(value);
    }

    /// Write a base-128 varint to the end of the buffer.
    pub fn write_var_uint32(&mut self, mut value: u32) {
        loop {
            let byte = value as u8 & 127;
            value >>= 7;

            if value == 0 {
                self.write_byte(byte);
                return;
            }

            self.write_byte(byte | 128);
        }
    }

    /// Write a zigzag-encoded signed 32-bit integer to the end of the buffer.
    pub fn write_var_sint32(&mut self, value: i32) {
        self.write_var_uint32(((value << 1) ^ (value >> 31)) as u32);
    }

    /// Write an unsigned 32-bit integer as 4 little-endian bytes.
    pub fn write_fixed32(&mut self, value: u32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    /// Write an unsigned 64-bit integer as 8 little-endian bytes.
    pub fn write_fixed64(&mut self, value: u64) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a 32-bit float as 4 little-endian bytes.
    pub fn write_float(&mut self, value: f32) {
        self.write_fixed32(value.to_bits());
    }

    /// Write a 64-bit float as 8 little-endian bytes.
    pub fn write_double(&mut self, value: f64) {
        self.write_fixed64(value.to_bits());
    }

    /// Write a UTF-8 string, prefixed with its byte length, to the end of the
    /// buffer.
    pub fn write_string(&mut self, value: &str) {
        self.write_var_uint32(value.len() as u32);
        self.data.extend_from_slice(value.as_bytes());
    }

    /// Write a field tag: `(field_id << 3) | wire_type`, varint-encoded.
    pub fn write_tag(&mut self, field_id: u32, wire_type: u8) {
        self.write_var_uint32((field_id << 3) | wire_type as u32);
    }
}

#[cfg(test)]
fn write_once(cb: fn(&mut ByteBufferMut)) -> Vec<u8> {
    let mut bb = ByteBufferMut::new();
    cb(&mut bb);
    bb.data()
}

#[test]
fn write_var_uint32() {
    assert_eq!(write_once(|bb| bb.write_var_uint32(0)), [0]);
    assert_eq!(write_once(|bb| bb.write_var_uint32(1)), [1]);
    assert_eq!(write_once(|bb| bb.write_var_uint32(127)), [127]);
    assert_eq!(write_once(|bb| bb.write_var_uint32(128)), [128, 1]);
    assert_eq!(write_once(|bb| bb.write_var_uint32(300)), [172, 2]);
    assert_eq!(write_once(|bb| bb.write_var_uint32(16384)), [128, 128, 1]);
    assert_eq!(
        write_once(|bb| bb.write_var_uint32(4294967295)),
        [255, 255, 255, 255, 15]
    );
}

#[test]
fn write_var_sint32() {
    assert_eq!(write_once(|bb| bb.write_var_sint32(0)), [0]);
    assert_eq!(write_once(|bb| bb.write_var_sint32(-1)), [1]);
    assert_eq!(write_once(|bb| bb.write_var_sint32(1)), [2]);
    assert_eq!(write_once(|bb| bb.write_var_sint32(-2)), [3]);
    assert_eq!(write_once(|bb| bb.write_var_sint32(2)), [4]);
    assert_eq!(
        write_once(|bb| bb.write_var_sint32(2147483647)),
        [254, 255, 255, 255, 15]
    );
    assert_eq!(
        write_once(|bb| bb.write_var_sint32(-2147483648)),
        [255, 255, 255, 255, 15]
    );
}

#[test]
fn write_fixed() {
    assert_eq!(write_once(|bb| bb.write_fixed32(1)), [1, 0, 0, 0]);
    assert_eq!(
        write_once(|bb| bb.write_fixed32(0x12345678)),
        [0x78, 0x56, 0x34, 0x12]
    );
    assert_eq!(
        write_once(|bb| bb.write_fixed64(1)),
        [1, 0, 0, 0, 0, 0, 0, 0]
    );
}

#[test]
fn write_float_and_double() {
    assert_eq!(write_once(|bb| bb.write_float(0.5)), [0, 0, 0, 63]);
    assert_eq!(
        write_once(|bb| bb.write_double(0.5)),
        [0, 0, 0, 0, 0, 0, 224, 63]
    );
}

#[test]
fn write_string() {
    assert_eq!(write_once(|bb| bb.write_string("")), [0]);
    assert_eq!(write_once(|bb| bb.write_string("a")), [1, 97]);
    assert_eq!(write_once(|bb| bb.write_string("abc")), [3, 97, 98, 99]);
    assert_eq!(
        write_once(|bb| bb.write_string("🍕")),
        [4, 240, 159, 141, 149]
    );
}

#[test]
fn write_tag() {
    assert_eq!(write_once(|bb| bb.write_tag(1, 2)), [0x0A]);
    assert_eq!(write_once(|bb| bb.write_tag(2, 0)), [0x10]);
    assert_eq!(write_once(|bb| bb.write_tag(16, 5)), [0x85, 1]);
    assert_eq!(
        write_once(|bb| bb.write_tag((1 << 29) - 1, 0)),
        [248, 255, 255, 255, 15]
    );
}

#[test]
fn varint_round_trip_is_minimal() {
    for &(value, len) in &[
        (0u32, 1usize),
        (127, 1),
        (128, 2),
        (16383, 2),
        (16384, 3),
        (2097151, 3),
        (2097152, 4),
        (268435455, 4),
        (268435456, 5),
        (4294967295, 5),
    ] {
        let mut bb = ByteBufferMut::new();
        bb.write_var_uint32(value);
        let bytes = bb.data();
        assert_eq!(bytes.len(), len, "length for {}", value);
        assert_eq!(ByteBuffer::new(&bytes).read_var_uint32(), Ok(value));
    }
}
