// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Byte-level reader/writer with CDR alignment and selectable byte order.
//!
//! Every fixed-width access aligns to `min(size, max_alignment)` relative to
//! the current alignment origin before touching the buffer. The writer is
//! generic over a [`Sink`] so that the size computation runs the exact same
//! code path as encoding, only counting bytes.

use crate::config::Endianness;
use crate::error::{DynamicError, Result};
use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// Destination of encoded bytes.
pub trait Sink {
    fn len(&self) -> usize;
    fn put(&mut self, bytes: &[u8]);
    fn put_zeros(&mut self, count: usize);
    /// Overwrite already written bytes (length back-fill).
    fn patch(&mut self, at: usize, bytes: &[u8]);
    /// Empty sink of the same kind.
    fn detached(&self) -> Self
    where
        Self: Sized;
    /// Append everything written to a detached sink.
    fn append(&mut self, other: Self)
    where
        Self: Sized;
}

impl Sink for Vec<u8> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn put(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }

    fn put_zeros(&mut self, count: usize) {
        self.resize(Vec::len(self) + count, 0);
    }

    fn patch(&mut self, at: usize, bytes: &[u8]) {
        self[at..at + bytes.len()].copy_from_slice(bytes);
    }

    fn detached(&self) -> Self {
        Vec::new()
    }

    fn append(&mut self, other: Self) {
        self.extend_from_slice(&other);
    }
}

/// Sink that only counts bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SizeCounter {
    len: usize,
}

impl SizeCounter {
    pub fn starting_at(position: usize) -> Self {
        Self { len: position }
    }
}

impl Sink for SizeCounter {
    fn len(&self) -> usize {
        self.len
    }

    fn put(&mut self, bytes: &[u8]) {
        self.len += bytes.len();
    }

    fn put_zeros(&mut self, count: usize) {
        self.len += count;
    }

    fn patch(&mut self, _at: usize, _bytes: &[u8]) {}

    fn detached(&self) -> Self {
        Self::default()
    }

    fn append(&mut self, other: Self) {
        self.len += other.len;
    }
}

/// Padding needed to bring `offset` to a multiple of `alignment`.
#[inline]
pub fn padding_for(offset: usize, alignment: usize) -> usize {
    if alignment <= 1 {
        return 0;
    }
    (alignment - offset % alignment) % alignment
}

macro_rules! impl_write {
    ($name:ident, $type:ty, $size:expr, $method:ident) => {
        pub fn $name(&mut self, value: $type) {
            self.align($size);
            let mut bytes = [0u8; $size];
            match self.endianness {
                Endianness::Little => LittleEndian::$method(&mut bytes, value),
                Endianness::Big => BigEndian::$method(&mut bytes, value),
            }
            self.sink.put(&bytes);
        }
    };
}

macro_rules! impl_read {
    ($name:ident, $type:ty, $size:expr, $method:ident) => {
        pub fn $name(&mut self) -> Result<$type> {
            self.align($size)?;
            let bytes = self.read_bytes($size)?;
            Ok(match self.endianness {
                Endianness::Little => LittleEndian::$method(bytes),
                Endianness::Big => BigEndian::$method(bytes),
            })
        }
    };
}

/// CDR writer over a [`Sink`].
#[derive(Debug)]
pub struct ByteWriter<S: Sink = Vec<u8>> {
    sink: S,
    endianness: Endianness,
    max_align: usize,
    origin: usize,
}

impl ByteWriter<Vec<u8>> {
    pub fn new(endianness: Endianness, max_align: usize) -> Self {
        Self::with_sink(Vec::new(), endianness, max_align)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.sink
    }
}

impl ByteWriter<SizeCounter> {
    /// Counting writer positioned at `position` with origin `origin`.
    pub fn counter(endianness: Endianness, max_align: usize, position: usize, origin: usize) -> Self {
        Self {
            sink: SizeCounter::starting_at(position),
            endianness,
            max_align,
            origin,
        }
    }
}

impl<S: Sink> ByteWriter<S> {
    pub fn with_sink(sink: S, endianness: Endianness, max_align: usize) -> Self {
        Self {
            sink,
            endianness,
            max_align,
            origin: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.sink.len()
    }

    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    pub fn max_align(&self) -> usize {
        self.max_align
    }

    pub fn origin(&self) -> usize {
        self.origin
    }

    /// Move the alignment origin, returning the previous one.
    pub fn set_origin(&mut self, origin: usize) -> usize {
        std::mem::replace(&mut self.origin, origin)
    }

    pub fn align(&mut self, alignment: usize) {
        let alignment = alignment.min(self.max_align);
        let pad = padding_for(self.position() - self.origin, alignment);
        if pad > 0 {
            self.sink.put_zeros(pad);
        }
    }

    pub fn write_u8(&mut self, value: u8) {
        self.sink.put(&[value]);
    }

    pub fn write_i8(&mut self, value: i8) {
        self.sink.put(&[value as u8]);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_u8(u8::from(value));
    }

    impl_write!(write_u16, u16, 2, write_u16);
    impl_write!(write_i16, i16, 2, write_i16);
    impl_write!(write_u32, u32, 4, write_u32);
    impl_write!(write_i32, i32, 4, write_i32);
    impl_write!(write_u64, u64, 8, write_u64);
    impl_write!(write_i64, i64, 8, write_i64);
    impl_write!(write_f32, f32, 4, write_f32);
    impl_write!(write_f64, f64, 8, write_f64);

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.sink.put(bytes);
    }

    /// Align to 4 and write a zero u32 to be back-filled; returns its position.
    pub fn reserve_u32(&mut self) -> usize {
        self.align(4);
        let at = self.position();
        self.sink.put_zeros(4);
        at
    }

    pub fn patch_u32(&mut self, at: usize, value: u32) {
        let mut bytes = [0u8; 4];
        match self.endianness {
            Endianness::Little => LittleEndian::write_u32(&mut bytes, value),
            Endianness::Big => BigEndian::write_u32(&mut bytes, value),
        }
        self.sink.patch(at, &bytes);
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Writer of the same kind starting at offset 0, alignment origin
    /// included, for payloads whose length must precede them.
    pub fn detached(&self) -> Self {
        Self::with_sink(self.sink.detached(), self.endianness, self.max_align)
    }

    /// Append the bytes of a detached writer as they are.
    pub fn append(&mut self, other: Self) {
        self.sink.append(other.sink);
    }
}

/// CDR reader over a borrowed buffer.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    buffer: &'a [u8],
    offset: usize,
    origin: usize,
    endianness: Endianness,
    max_align: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buffer: &'a [u8], endianness: Endianness, max_align: usize) -> Self {
        Self {
            buffer,
            offset: 0,
            origin: 0,
            endianness,
            max_align,
        }
    }

    pub fn position(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.offset)
    }

    pub fn max_align(&self) -> usize {
        self.max_align
    }

    pub fn set_origin(&mut self, origin: usize) -> usize {
        std::mem::replace(&mut self.origin, origin)
    }

    /// Reader over the same bytes that cannot read past `end`.
    pub fn limited(&self, end: usize) -> Result<ByteReader<'a>> {
        if end > self.buffer.len() || end < self.offset {
            return Err(DynamicError::malformed(
                self.offset,
                format!("block end {} outside buffer of {} bytes", end, self.buffer.len()),
            ));
        }
        Ok(ByteReader {
            buffer: &self.buffer[..end],
            ..self.clone()
        })
    }

    /// Jump forward to `position`, which must lie inside the buffer.
    pub fn seek(&mut self, position: usize) -> Result<()> {
        if position > self.buffer.len() || position < self.offset {
            return Err(DynamicError::malformed(
                self.offset,
                format!("cannot seek to {}", position),
            ));
        }
        self.offset = position;
        Ok(())
    }

    pub fn align(&mut self, alignment: usize) -> Result<()> {
        let alignment = alignment.min(self.max_align);
        let pad = padding_for(self.offset - self.origin, alignment);
        if pad > self.remaining() {
            return Err(DynamicError::malformed(self.offset, "unexpected end of buffer"));
        }
        self.offset += pad;
        Ok(())
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        if count > self.remaining() {
            return Err(DynamicError::malformed(
                self.offset,
                format!("unexpected end of buffer (need {}, have {})", count, self.remaining()),
            ));
        }
        let bytes = &self.buffer[self.offset..self.offset + count];
        self.offset += count;
        Ok(bytes)
    }

    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.read_bytes(count).map(|_| ())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        let at = self.offset;
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(DynamicError::malformed(at, format!("invalid boolean {}", other))),
        }
    }

    impl_read!(read_u16, u16, 2, read_u16);
    impl_read!(read_i16, i16, 2, read_i16);
    impl_read!(read_u32, u32, 4, read_u32);
    impl_read!(read_i32, i32, 4, read_i32);
    impl_read!(read_u64, u64, 8, read_u64);
    impl_read!(read_i64, i64, 8, read_i64);
    impl_read!(read_f32, f32, 4, read_f32);
    impl_read!(read_f64, f64, 8, read_f64);

    /// Read a u32 at the current (4-aligned) position without consuming it.
    pub fn peek_u32(&self) -> Result<u32> {
        self.clone().read_u32()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alignment_capped_by_representation() {
        let mut xcdr2 = ByteWriter::new(Endianness::Little, 4);
        xcdr2.write_u8(1);
        xcdr2.write_f64(1.0);
        assert_eq!(xcdr2.position(), 12);

        let mut xcdr1 = ByteWriter::new(Endianness::Little, 8);
        xcdr1.write_u8(1);
        xcdr1.write_f64(1.0);
        assert_eq!(xcdr1.position(), 16);
    }

    #[test]
    fn test_byte_order() {
        let mut le = ByteWriter::new(Endianness::Little, 4);
        le.write_u32(0x0102_0304);
        assert_eq!(le.into_bytes(), vec![4, 3, 2, 1]);

        let mut be = ByteWriter::new(Endianness::Big, 4);
        be.write_u32(0x0102_0304);
        assert_eq!(be.into_bytes(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_counter_matches_writer() {
        fn fill<S: Sink>(w: &mut ByteWriter<S>) {
            w.write_u8(7);
            let at = w.reserve_u32();
            w.write_u16(9);
            w.write_u64(3);
            let len = (w.position() - at - 4) as u32;
            w.patch_u32(at, len);
        }
        let mut bytes = ByteWriter::new(Endianness::Big, 8);
        fill(&mut bytes);
        let mut count = ByteWriter::counter(Endianness::Big, 8, 0, 0);
        fill(&mut count);
        assert_eq!(count.position(), bytes.into_bytes().len());
    }

    #[test]
    fn test_origin_resets_alignment() {
        let mut w = ByteWriter::new(Endianness::Little, 8);
        w.write_u8(1);
        w.write_u8(2);
        let previous = w.set_origin(2);
        w.write_u16(3);
        assert_eq!(w.position(), 4);
        w.set_origin(previous);
        w.write_u32(4);
        assert_eq!(w.position(), 8);
    }

    #[test]
    fn test_detached_payload_aligns_from_its_start() {
        let mut w = ByteWriter::new(Endianness::Little, 8);
        w.write_u8(1);
        let mut payload = w.detached();
        payload.write_u8(2);
        payload.write_f64(0.0);
        assert_eq!(payload.position(), 16);
        w.append(payload);
        assert_eq!(w.position(), 17);

        let mut count = ByteWriter::counter(Endianness::Little, 8, 1, 0);
        let mut payload = count.detached();
        payload.write_u8(2);
        payload.write_f64(0.0);
        count.append(payload);
        assert_eq!(count.position(), 17);
    }

    #[test]
    fn test_reader_bounds() {
        let bytes = [1u8, 0, 0, 0, 2];
        let mut r = ByteReader::new(&bytes, Endianness::Little, 4);
        assert_eq!(r.read_u32().unwrap(), 1);
        assert!(matches!(
            r.read_u32(),
            Err(DynamicError::MalformedHeader { offset: 4, .. })
        ));

        let r = ByteReader::new(&bytes, Endianness::Little, 4);
        let mut limited = r.limited(2).unwrap();
        assert!(limited.read_u32().is_err());
        assert!(r.limited(6).is_err());
    }

    #[test]
    fn test_read_bool_rejects_garbage() {
        let mut r = ByteReader::new(&[2], Endianness::Little, 4);
        assert!(r.read_bool().is_err());
    }
}
