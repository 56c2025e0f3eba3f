//! Byte-layout descriptors for the fixed-size records found on the wire.
//!
//! All multi-byte values are little-endian. Each record type declares its fields once as
//! `const` [Field]s and groups them into a [Layout] whose consistency (fields contiguous,
//! widths summing to the record size) is checked at compile time via [Layout::check].

/// Primitive type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    F32,
    /// Opaque run of bytes, or an array of values read elsewhere.
    Bytes(usize),
}

impl Kind {
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            Kind::U8 | Kind::I8 => 1,
            Kind::U16 | Kind::I16 => 2,
            Kind::U32 | Kind::I32 | Kind::F32 => 4,
            Kind::Bytes(n) => n,
        }
    }
}

/// A named field at a fixed offset within a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub offset: usize,
    pub kind: Kind,
}

impl Field {
    #[must_use]
    pub const fn new(name: &'static str, offset: usize, kind: Kind) -> Self {
        Self { name, offset, kind }
    }

    #[must_use]
    pub const fn width(&self) -> usize {
        self.kind.width()
    }

    /// Offset of the first byte after this field.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.offset + self.kind.width()
    }

    // Callers check the record length against the owning layout before reading fields,
    // so slicing here cannot go out of bounds for a record of the right size.
    fn array<const N: usize>(&self, dat: &[u8]) -> [u8; N] {
        debug_assert_eq!(N, self.width(), "field {} read with wrong width", self.name);
        let mut buf = [0u8; N];
        buf.copy_from_slice(&dat[self.offset..self.offset + N]);
        buf
    }

    #[must_use]
    pub fn u8(&self, dat: &[u8]) -> u8 {
        dat[self.offset]
    }

    #[must_use]
    pub fn i8(&self, dat: &[u8]) -> i8 {
        i8::from_le_bytes(self.array(dat))
    }

    #[must_use]
    pub fn u16(&self, dat: &[u8]) -> u16 {
        u16::from_le_bytes(self.array(dat))
    }

    #[must_use]
    pub fn i16(&self, dat: &[u8]) -> i16 {
        i16::from_le_bytes(self.array(dat))
    }

    #[must_use]
    pub fn u32(&self, dat: &[u8]) -> u32 {
        u32::from_le_bytes(self.array(dat))
    }

    #[must_use]
    pub fn i32(&self, dat: &[u8]) -> i32 {
        i32::from_le_bytes(self.array(dat))
    }

    #[must_use]
    pub fn f32(&self, dat: &[u8]) -> f32 {
        f32::from_le_bytes(self.array(dat))
    }

    /// `count` consecutive f32 values starting at this field.
    #[must_use]
    pub fn f32s(&self, dat: &[u8], count: usize) -> Vec<f32> {
        dat[self.offset..self.offset + count * 4]
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    /// Write `bytes` (already little-endian) into this field.
    pub fn put(&self, dat: &mut [u8], bytes: &[u8]) {
        debug_assert_eq!(bytes.len(), self.width(), "field {} written with wrong width", self.name);
        dat[self.offset..self.offset + bytes.len()].copy_from_slice(bytes);
    }
}

/// The complete field layout of one record type.
#[derive(Debug, Clone, Copy)]
pub struct Layout {
    pub name: &'static str,
    pub size: usize,
    pub fields: &'static [Field],
}

impl Layout {
    #[must_use]
    pub const fn new(name: &'static str, size: usize, fields: &'static [Field]) -> Self {
        Self { name, size, fields }
    }

    /// Validate the layout. Intended for `const` contexts where a failure is a compile
    /// error.
    ///
    /// # Panics
    /// If fields are not contiguous from offset 0 or do not add up to `size`.
    pub const fn check(&self) {
        let mut offset = 0;
        let mut i = 0;
        while i < self.fields.len() {
            if self.fields[i].offset != offset {
                panic!("layout fields must be contiguous");
            }
            offset = self.fields[i].end();
            i += 1;
        }
        if offset != self.size {
            panic!("layout fields do not add up to layout size");
        }
    }

    /// Number of whole records in `len` bytes and the number of bytes left over.
    #[must_use]
    pub const fn records_in(&self, len: usize) -> (usize, usize) {
        (len / self.size, len % self.size)
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: Field = Field::new("a", 0, Kind::U16);
    const B: Field = Field::new("b", 2, Kind::F32);
    const C: Field = Field::new("c", 6, Kind::I8);
    const LAYOUT: Layout = Layout::new("test", 7, &[A, B, C]);
    const _: () = LAYOUT.check();

    #[test]
    fn reads_little_endian_fields() {
        let mut dat = vec![0u8; LAYOUT.size];
        A.put(&mut dat, &0x1234u16.to_le_bytes());
        B.put(&mut dat, &1.5f32.to_le_bytes());
        C.put(&mut dat, &(-3i8).to_le_bytes());

        assert_eq!(dat[..2], [0x34, 0x12]);
        assert_eq!(A.u16(&dat), 0x1234);
        assert_eq!(B.f32(&dat), 1.5);
        assert_eq!(C.i8(&dat), -3);
    }

    #[test]
    fn records_in_reports_leftover() {
        assert_eq!(LAYOUT.records_in(15), (2, 1));
        assert_eq!(LAYOUT.records_in(0), (0, 0));
    }

    #[test]
    fn field_lookup_by_name() {
        assert_eq!(LAYOUT.field("b"), Some(&B));
        assert!(LAYOUT.field("nope").is_none());
    }

    #[test]
    #[should_panic(expected = "contiguous")]
    fn check_rejects_gaps() {
        const GAP: &[Field] = &[A, Field::new("x", 4, Kind::U32)];
        Layout::new("gap", 8, GAP).check();
    }

    #[test]
    #[should_panic(expected = "add up")]
    fn check_rejects_wrong_size() {
        Layout::new("short", 10, &[A, B]).check();
    }
}
