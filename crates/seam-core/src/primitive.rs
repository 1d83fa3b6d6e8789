//! Fixed-width scalars passed by value.
//!
//! Scalars cross the boundary bit-for-bit with no conversion. Range safety is
//! a property of the declared parameter width, never a runtime check.

use std::ffi::c_char;
use std::fmt;

/// The scalar classes a boundary signature can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Bool,
    CChar,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 12] = [
        PrimitiveKind::U8,
        PrimitiveKind::U16,
        PrimitiveKind::U32,
        PrimitiveKind::U64,
        PrimitiveKind::I8,
        PrimitiveKind::I16,
        PrimitiveKind::I32,
        PrimitiveKind::I64,
        PrimitiveKind::F32,
        PrimitiveKind::F64,
        PrimitiveKind::Bool,
        PrimitiveKind::CChar,
    ];

    /// Size in bytes. Natural alignment equals the size for every kind.
    pub fn size_bytes(self) -> u64 {
        match self {
            PrimitiveKind::U8 | PrimitiveKind::I8 | PrimitiveKind::Bool | PrimitiveKind::CChar => 1,
            PrimitiveKind::U16 | PrimitiveKind::I16 => 2,
            PrimitiveKind::U32 | PrimitiveKind::I32 | PrimitiveKind::F32 => 4,
            PrimitiveKind::U64 | PrimitiveKind::I64 | PrimitiveKind::F64 => 8,
        }
    }

    pub fn bits(self) -> u32 {
        self.size_bytes() as u32 * 8
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            PrimitiveKind::I8
                | PrimitiveKind::I16
                | PrimitiveKind::I32
                | PrimitiveKind::I64
                | PrimitiveKind::F32
                | PrimitiveKind::F64
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, PrimitiveKind::F32 | PrimitiveKind::F64)
    }

    /// The name used in signature strings (`"u32"`, `"bool"`, `"c_char"`).
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::U8 => "u8",
            PrimitiveKind::U16 => "u16",
            PrimitiveKind::U32 => "u32",
            PrimitiveKind::U64 => "u64",
            PrimitiveKind::I8 => "i8",
            PrimitiveKind::I16 => "i16",
            PrimitiveKind::I32 => "i32",
            PrimitiveKind::I64 => "i64",
            PrimitiveKind::F32 => "f32",
            PrimitiveKind::F64 => "f64",
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::CChar => "c_char",
        }
    }

    /// Inverse of [`PrimitiveKind::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Scalar types that cross the boundary by value.
pub trait Primitive:
    sealed::Sealed + Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static
{
    const KIND: PrimitiveKind;
}

macro_rules! primitive {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}
            impl Primitive for $ty {
                const KIND: PrimitiveKind = PrimitiveKind::$kind;
            }
        )*
    };
}

primitive! {
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
    Bool => Bool,
    CChar => CChar,
}

/// A boolean with a fixed one-byte representation.
///
/// `1` is true and `0` is false. Any other byte reads as false rather than
/// producing an invalid Rust `bool`.
#[repr(transparent)]
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Bool {
    value: u8,
}

impl Bool {
    pub const TRUE: Bool = Bool { value: 1 };
    pub const FALSE: Bool = Bool { value: 0 };

    pub fn from_raw(value: u8) -> Self {
        Bool { value }
    }

    pub fn raw(self) -> u8 {
        self.value
    }

    pub fn is(self) -> bool {
        self.value == 1
    }
}

impl From<bool> for Bool {
    fn from(value: bool) -> Self {
        Bool { value: value as u8 }
    }
}

impl From<Bool> for bool {
    fn from(value: Bool) -> Self {
        value.is()
    }
}

impl fmt::Debug for Bool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.is())
    }
}

/// A single C character.
#[repr(transparent)]
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CChar(pub c_char);

impl CChar {
    pub fn from_ascii(ch: u8) -> Self {
        CChar(ch as c_char)
    }

    pub fn as_byte(self) -> u8 {
        self.0 as u8
    }
}

impl fmt::Debug for CChar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_byte() as char)
    }
}
