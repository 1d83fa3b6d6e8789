//! Buffer view exports.

use seam_callback::callback;
use seam_core::{Slice, SliceMut};

use crate::types::Vec3f32;

callback!(
    /// Receives the caller's mutable view for the duration of the call.
    pub SliceCallback(data: SliceMut<'_, u8>)
);
callback!(
    /// Reduces a view to one byte.
    pub ByteCallback(data: Slice<'_, u8>) -> u8
);

/// Element count, saturating at `u32::MAX`.
#[no_mangle]
pub extern "C" fn slice_len(data: Slice<'_, u32>) -> u32 {
    u32::try_from(data.len()).unwrap_or(u32::MAX)
}

/// Element at `index`, or the zero vector when out of range.
#[no_mangle]
pub extern "C" fn slice_vec3_at(data: Slice<'_, Vec3f32>, index: u32) -> Vec3f32 {
    data.get(u64::from(index)).copied().unwrap_or_default()
}

#[no_mangle]
pub extern "C" fn slice_fill(mut data: SliceMut<'_, u8>, value: u8) {
    data.as_slice_mut().fill(value);
}

#[no_mangle]
pub extern "C" fn slice_with_callback(data: SliceMut<'_, u8>, callback: SliceCallback) {
    callback.call(data);
}

#[no_mangle]
pub extern "C" fn slice_first_via_callback(data: Slice<'_, u8>, callback: ByteCallback) -> u8 {
    callback.call(data)
}
