//! Owned buffers and strings.
//!
//! An owned resource is `{ptr, len, capacity, release}` where `release` is
//! the destructor of the allocator that produced the memory. Whichever side
//! ends up holding the resource calls that destructor exactly once; memory is
//! never freed by a foreign allocator.
//!
//! On the Rust side [`OwnedBuffer`] and [`OwnedString`] release on drop. Both
//! are `#[repr(transparent)]` over [`RawBuffer`], so they can be passed and
//! returned by value in `extern "C"` signatures and ownership moves with them.

use std::ffi::CStr;
use std::fmt;
use std::mem::ManuallyDrop;
use std::ptr;

use crate::error::{CoreError, Result};
use crate::ledger;
use crate::protocol::{self, ProtocolViolation};
use crate::view::Slice;

/// Destructor carried by every owned resource.
pub type ReleaseFn = unsafe extern "C" fn(ptr: *mut u8, len: u64, capacity: u64);

/// C layout of an owned resource in transit.
///
/// A `RawBuffer` is inert: forgetting it leaks, copying it and releasing both
/// copies is a double release.
#[repr(C)]
#[derive(Debug)]
pub struct RawBuffer {
    pub ptr: *mut u8,
    pub len: u64,
    pub capacity: u64,
    pub release: Option<ReleaseFn>,
}

impl RawBuffer {
    /// A resource with nothing to release.
    pub const fn null() -> Self {
        RawBuffer {
            ptr: ptr::null_mut(),
            len: 0,
            capacity: 0,
            release: None,
        }
    }

    /// Run the carried destructor.
    ///
    /// # Safety
    ///
    /// `self` must describe memory produced by the allocator its `release`
    /// belongs to, and must not have been released before.
    pub unsafe fn release(self) {
        if let Some(release) = self.release {
            release(self.ptr, self.len, self.capacity);
        }
    }
}

/// Destructor of the core allocator.
unsafe extern "C" fn release_core(ptr: *mut u8, len: u64, capacity: u64) {
    if !ledger::record_release(ptr as usize) {
        protocol::report(ProtocolViolation::DoubleRelease {
            resource: "buffer",
            address: ptr as usize,
        });
        return;
    }
    drop(Vec::from_raw_parts(ptr, len as usize, capacity as usize));
}

fn is_core(raw: &RawBuffer) -> bool {
    raw.release == Some(release_core as ReleaseFn)
}

/// Hand a vector's memory to the core allocator's bookkeeping.
fn allocate(bytes: Vec<u8>, len: usize) -> RawBuffer {
    let mut bytes = ManuallyDrop::new(bytes);
    let raw = RawBuffer {
        ptr: bytes.as_mut_ptr(),
        len: len as u64,
        capacity: bytes.capacity() as u64,
        release: Some(release_core),
    };
    ledger::record_alloc(raw.ptr as usize);
    raw
}

/// Byte buffer owned by whichever side currently holds it.
#[repr(transparent)]
pub struct OwnedBuffer {
    raw: RawBuffer,
}

unsafe impl Send for OwnedBuffer {}
unsafe impl Sync for OwnedBuffer {}

impl OwnedBuffer {
    /// Copy `bytes` into a new buffer from the core allocator.
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self::from_vec(bytes.to_vec())
    }

    /// Take over a vector's allocation.
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        let len = bytes.len();
        OwnedBuffer {
            raw: allocate(bytes, len),
        }
    }

    /// A zero-length buffer. Releasing it is still required.
    pub fn empty() -> Self {
        Self::from_vec(Vec::new())
    }

    /// Take ownership of a buffer in transit.
    ///
    /// # Safety
    ///
    /// `raw` must come from [`OwnedBuffer::into_raw`] or from a producer that
    /// honors the same layout, and must not be released elsewhere.
    pub unsafe fn from_raw(raw: RawBuffer) -> Self {
        OwnedBuffer { raw }
    }

    /// Give up ownership for transfer across the boundary.
    pub fn into_raw(self) -> RawBuffer {
        let this = ManuallyDrop::new(self);
        unsafe { ptr::read(&this.raw) }
    }

    pub fn as_slice(&self) -> &[u8] {
        if self.raw.ptr.is_null() {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.raw.ptr, self.raw.len as usize) }
    }

    /// A view valid while the buffer is held.
    pub fn view(&self) -> Slice<'_, u8> {
        Slice::new(self.as_slice())
    }

    pub fn len(&self) -> usize {
        self.raw.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.raw.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.raw.capacity as usize
    }

    /// Whether the memory came from this crate's allocator.
    pub fn is_core_allocated(&self) -> bool {
        is_core(&self.raw)
    }

    /// Release now. Equivalent to dropping.
    pub fn release(self) {
        drop(self)
    }

    /// Convert into a `Vec`, copying when the memory is foreign.
    pub fn into_vec(self) -> Vec<u8> {
        if !self.is_core_allocated() {
            return self.as_slice().to_vec();
        }
        let raw = self.into_raw();
        if !ledger::record_release(raw.ptr as usize) {
            protocol::fatal(ProtocolViolation::UseAfterRelease {
                resource: "buffer",
                address: raw.ptr as usize,
            });
        }
        unsafe { Vec::from_raw_parts(raw.ptr, raw.len as usize, raw.capacity as usize) }
    }
}

impl Drop for OwnedBuffer {
    fn drop(&mut self) {
        let raw = std::mem::replace(&mut self.raw, RawBuffer::null());
        unsafe { raw.release() }
    }
}

impl Clone for OwnedBuffer {
    fn clone(&self) -> Self {
        Self::from_slice(self.as_slice())
    }
}

impl PartialEq for OwnedBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for OwnedBuffer {}

impl std::hash::Hash for OwnedBuffer {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.as_slice().hash(state)
    }
}

impl fmt::Debug for OwnedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedBuffer")
            .field("len", &self.raw.len)
            .field("capacity", &self.raw.capacity)
            .finish()
    }
}

impl From<Vec<u8>> for OwnedBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_vec(bytes)
    }
}

impl From<&[u8]> for OwnedBuffer {
    fn from(bytes: &[u8]) -> Self {
        Self::from_slice(bytes)
    }
}

/// UTF-8 string owned by whichever side currently holds it.
///
/// The encoding is validated once, at construction. Strings are not
/// NUL-terminated unless built with [`OwnedString::with_nul`].
#[repr(transparent)]
pub struct OwnedString {
    raw: RawBuffer,
}

unsafe impl Send for OwnedString {}
unsafe impl Sync for OwnedString {}

impl OwnedString {
    pub fn new(text: &str) -> Self {
        Self::from_exact(text.as_bytes().to_vec(), text.len())
    }

    /// Validate `bytes` as UTF-8 and copy them into a new string.
    pub fn from_utf8(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)?;
        Ok(Self::new(text))
    }

    /// Copy `text` and append a NUL terminator that the length excludes.
    pub fn with_nul(text: &str) -> Result<Self> {
        if let Some(position) = text.bytes().position(|b| b == 0) {
            return Err(CoreError::InteriorNul { position });
        }
        let mut bytes = Vec::with_capacity(text.len() + 1);
        bytes.extend_from_slice(text.as_bytes());
        bytes.push(0);
        Ok(Self::from_exact(bytes, text.len()))
    }

    // Capacity equals the initialized length, so the terminator check in
    // `as_c_str` never reads uninitialized memory.
    fn from_exact(bytes: Vec<u8>, len: usize) -> Self {
        let bytes = Vec::from(bytes.into_boxed_slice());
        OwnedString {
            raw: allocate(bytes, len),
        }
    }

    /// Take ownership of a string in transit, validating its encoding.
    ///
    /// Invalid UTF-8 releases the memory and produces no string.
    ///
    /// # Safety
    ///
    /// Same contract as [`OwnedBuffer::from_raw`].
    pub unsafe fn from_raw(raw: RawBuffer) -> Result<Self> {
        let candidate = OwnedString { raw };
        std::str::from_utf8(candidate.bytes())?;
        Ok(candidate)
    }

    pub fn into_raw(self) -> RawBuffer {
        let this = ManuallyDrop::new(self);
        unsafe { ptr::read(&this.raw) }
    }

    fn bytes(&self) -> &[u8] {
        if self.raw.ptr.is_null() {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.raw.ptr, self.raw.len as usize) }
    }

    pub fn as_str(&self) -> &str {
        unsafe { std::str::from_utf8_unchecked(self.bytes()) }
    }

    pub fn len(&self) -> usize {
        self.raw.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.raw.len == 0
    }

    pub fn is_nul_terminated(&self) -> bool {
        is_core(&self.raw)
            && self.raw.capacity == self.raw.len + 1
            && unsafe { *self.raw.ptr.add(self.raw.len as usize) } == 0
    }

    /// The string as a C string, if it was built with a terminator.
    pub fn as_c_str(&self) -> Option<&CStr> {
        if !self.is_nul_terminated() {
            return None;
        }
        let with_nul = unsafe { std::slice::from_raw_parts(self.raw.ptr, self.raw.len as usize + 1) };
        CStr::from_bytes_with_nul(with_nul).ok()
    }

    pub fn release(self) {
        drop(self)
    }
}

impl Drop for OwnedString {
    fn drop(&mut self) {
        let raw = std::mem::replace(&mut self.raw, RawBuffer::null());
        unsafe { raw.release() }
    }
}

impl Clone for OwnedString {
    fn clone(&self) -> Self {
        Self::new(self.as_str())
    }
}

impl PartialEq for OwnedString {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for OwnedString {}

impl PartialEq<str> for OwnedString {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for OwnedString {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl std::hash::Hash for OwnedString {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.as_str().hash(state)
    }
}

impl fmt::Debug for OwnedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl fmt::Display for OwnedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for OwnedString {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for OwnedString {
    fn from(text: String) -> Self {
        let len = text.len();
        Self::from_exact(text.into_bytes(), len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::thread_balance;

    #[test]
    fn from_slice_then_release_is_neutral() {
        let before = thread_balance();
        let buffer = OwnedBuffer::from_slice(&[1, 2, 3]);
        assert_eq!(buffer.as_slice(), &[1, 2, 3]);
        buffer.release();
        assert_eq!(thread_balance().since(before).outstanding(), 0);
    }

    #[test]
    fn empty_buffer_still_needs_release() {
        let before = thread_balance();
        let buffer = OwnedBuffer::empty();
        assert!(buffer.is_empty());
        assert_eq!(thread_balance().since(before).allocations, 1);
        drop(buffer);
        assert_eq!(thread_balance().since(before).outstanding(), 0);
    }

    #[test]
    fn raw_round_trip_keeps_ownership() {
        let before = thread_balance();
        let raw = OwnedBuffer::from_vec(vec![5; 10]).into_raw();
        assert_eq!(raw.len, 10);
        assert!(raw.release.is_some());
        let back = unsafe { OwnedBuffer::from_raw(raw) };
        assert_eq!(back.len(), 10);
        drop(back);
        assert_eq!(thread_balance().since(before).outstanding(), 0);
    }

    #[test]
    fn into_vec_reclaims_core_memory() {
        let before = thread_balance();
        let bytes = OwnedBuffer::from_slice(b"abc").into_vec();
        assert_eq!(bytes, b"abc");
        assert_eq!(thread_balance().since(before).outstanding(), 0);
    }

    #[test]
    fn double_release_is_reported_in_harness() {
        let raw = OwnedString::new("twice").into_raw();
        let address = raw.ptr as usize;
        let (len, capacity) = (raw.len, raw.capacity);
        // A foreign caller holding a stale copy of the same string.
        let stale = RawBuffer {
            ptr: address as *mut u8,
            len,
            capacity,
            release: raw.release,
        };
        let ((), violations) = protocol::capture(|| unsafe {
            raw.release();
            // Occupy the freed block so no live allocation can take its address.
            let sentinel = Vec::<u8>::with_capacity(capacity as usize);
            stale.release();
            drop(sentinel);
        });
        assert_eq!(
            violations,
            vec![ProtocolViolation::DoubleRelease {
                resource: "buffer",
                address,
            }]
        );
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let err = OwnedString::from_utf8(&[0x66, 0xff, 0x66]).unwrap_err();
        assert!(matches!(err, CoreError::Encoding(_)));
    }

    #[test]
    fn foreign_raw_with_bad_encoding_is_released() {
        let before = thread_balance();
        let raw = OwnedBuffer::from_slice(&[0xc3, 0x28]).into_raw();
        let result = unsafe { OwnedString::from_raw(raw) };
        assert!(result.is_err());
        assert_eq!(thread_balance().since(before).outstanding(), 0);
    }

    #[test]
    fn nul_terminator_is_opt_in() {
        let plain = OwnedString::new("hello");
        assert!(!plain.is_nul_terminated());
        assert!(plain.as_c_str().is_none());

        let terminated = OwnedString::with_nul("hello").unwrap();
        assert_eq!(terminated.len(), 5);
        assert_eq!(terminated.as_str(), "hello");
        assert_eq!(terminated.as_c_str().unwrap().to_bytes(), b"hello");
    }

    #[test]
    fn interior_nul_is_rejected() {
        let err = OwnedString::with_nul("a\0b").unwrap_err();
        assert!(matches!(err, CoreError::InteriorNul { position: 1 }));
    }

    #[test]
    fn strings_compare_by_content() {
        let a = OwnedString::from(String::from("hello world"));
        let b = a.clone();
        assert_eq!(a, b);
        assert_eq!(a, "hello world");
        assert_eq!(a.to_string(), "hello world");
    }
}
