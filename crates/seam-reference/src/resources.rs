//! Owned buffer and string exports.
//!
//! Every resource returned here carries the core allocator's destructor; the
//! caller releases it exactly once, either by handing it back or by running
//! the destructor itself.

use seam_core::guard;
use seam_core::{OwnedBuffer, OwnedString, ResultEnvelope, Slice};

use crate::types::ErrorCode;

#[no_mangle]
pub extern "C" fn buffer_from_slice(data: Slice<'_, u8>) -> OwnedBuffer {
    OwnedBuffer::from_slice(data.as_slice())
}

#[no_mangle]
pub extern "C" fn buffer_release(buffer: OwnedBuffer) {
    buffer.release();
}

/// Consumes `text` and returns it upper-cased.
#[no_mangle]
pub extern "C" fn string_upper(text: OwnedString) -> OwnedString {
    OwnedString::from(text.as_str().to_uppercase())
}

/// Build a string from caller bytes; invalid UTF-8 is `Err(Fail)`.
#[no_mangle]
pub extern "C" fn seam_string_create(bytes: Slice<'_, u8>) -> ResultEnvelope<OwnedString, ErrorCode> {
    guard::boundary("seam_string_create", || {
        OwnedString::from_utf8(bytes.as_slice()).map_err(|error| {
            tracing::debug!(%error, "rejected string bytes");
            ErrorCode::Fail
        })
    })
}

#[no_mangle]
pub extern "C" fn seam_string_destroy(text: OwnedString) {
    text.release();
}
