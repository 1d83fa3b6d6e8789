//! Scalar echo exports.

use seam_core::{Bool, CChar};

macro_rules! echo {
    ($($name:ident: $ty:ty),* $(,)?) => {
        $(
            #[no_mangle]
            pub extern "C" fn $name(value: $ty) -> $ty {
                value
            }
        )*
    };
}

echo!(
    echo_u8: u8,
    echo_u16: u16,
    echo_u32: u32,
    echo_u64: u64,
    echo_i8: i8,
    echo_i16: i16,
    echo_i32: i32,
    echo_i64: i64,
    echo_f32: f32,
    echo_f64: f64,
    echo_bool: Bool,
    echo_c_char: CChar,
);

/// Logical negation across the boundary.
#[no_mangle]
pub extern "C" fn bool_not(value: Bool) -> Bool {
    Bool::from(!value.is())
}
