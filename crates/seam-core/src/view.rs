//! Non-owning views over contiguous memory.
//!
//! A view is `{pointer, length}` in C layout. It never owns, never resizes,
//! and is valid for the duration of the call it is passed to unless the
//! owner documents it as persistent. A mutable view has exclusive write
//! access for the call; aliasing two mutable views over the same memory is
//! the caller's responsibility to prevent.

use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::ptr;

use crate::error::{CoreError, Result};

/// Read-only view of `len` elements of `T`.
#[repr(C)]
pub struct Slice<'a, T> {
    ptr: *const T,
    len: u64,
    _marker: PhantomData<&'a [T]>,
}

// Views are plain `{ptr, len}` pairs regardless of `T`.
impl<T> Clone for Slice<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Slice<'_, T> {}

unsafe impl<T: Sync> Send for Slice<'_, T> {}
unsafe impl<T: Sync> Sync for Slice<'_, T> {}

impl<'a, T> Slice<'a, T> {
    /// View a Rust slice.
    pub fn new(data: &'a [T]) -> Self {
        Slice {
            ptr: data.as_ptr(),
            len: data.len() as u64,
            _marker: PhantomData,
        }
    }

    /// The empty view (null pointer, length 0).
    pub fn empty() -> Self {
        Slice {
            ptr: ptr::null(),
            len: 0,
            _marker: PhantomData,
        }
    }

    /// Build a view from a pointer and a length asserted by the producer.
    ///
    /// A null pointer with length 0 is the empty view; a null pointer with a
    /// non-zero length is rejected.
    ///
    /// # Safety
    ///
    /// If `ptr` is non-null it must point to `len` initialized elements that
    /// stay valid and unmodified for `'a`.
    pub unsafe fn from_raw_parts(ptr: *const T, len: u64) -> Result<Self> {
        if ptr.is_null() && len != 0 {
            return Err(CoreError::NullView { length: len });
        }
        Ok(Slice {
            ptr,
            len,
            _marker: PhantomData,
        })
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_ptr(&self) -> *const T {
        self.ptr
    }

    pub fn as_slice(&self) -> &'a [T] {
        if self.ptr.is_null() {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.ptr, self.len as usize) }
    }

    /// Bounds-checked element access.
    pub fn get(&self, index: u64) -> Result<&'a T> {
        if index >= self.len {
            return Err(CoreError::IndexOutOfRange {
                index,
                length: self.len,
            });
        }
        Ok(&self.as_slice()[index as usize])
    }

    pub fn copy_to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.as_slice().to_vec()
    }
}

impl<T> Default for Slice<'_, T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> Deref for Slice<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<'a, T> From<&'a [T]> for Slice<'a, T> {
    fn from(data: &'a [T]) -> Self {
        Slice::new(data)
    }
}

impl<'a, T> From<&'a Vec<T>> for Slice<'a, T> {
    fn from(data: &'a Vec<T>) -> Self {
        Slice::new(data)
    }
}

impl<'a, T, const N: usize> From<&'a [T; N]> for Slice<'a, T> {
    fn from(data: &'a [T; N]) -> Self {
        Slice::new(data)
    }
}

impl<T: fmt::Debug> fmt::Debug for Slice<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

/// Mutable view of `len` elements of `T`.
#[repr(C)]
pub struct SliceMut<'a, T> {
    ptr: *mut T,
    len: u64,
    _marker: PhantomData<&'a mut [T]>,
}

unsafe impl<T: Send> Send for SliceMut<'_, T> {}
unsafe impl<T: Sync> Sync for SliceMut<'_, T> {}

impl<'a, T> SliceMut<'a, T> {
    pub fn new(data: &'a mut [T]) -> Self {
        SliceMut {
            ptr: data.as_mut_ptr(),
            len: data.len() as u64,
            _marker: PhantomData,
        }
    }

    pub fn empty() -> Self {
        SliceMut {
            ptr: ptr::null_mut(),
            len: 0,
            _marker: PhantomData,
        }
    }

    /// # Safety
    ///
    /// If `ptr` is non-null it must point to `len` initialized elements that
    /// nothing else reads or writes for `'a`.
    pub unsafe fn from_raw_parts(ptr: *mut T, len: u64) -> Result<Self> {
        if ptr.is_null() && len != 0 {
            return Err(CoreError::NullView { length: len });
        }
        Ok(SliceMut {
            ptr,
            len,
            _marker: PhantomData,
        })
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[T] {
        if self.ptr.is_null() {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.ptr, self.len as usize) }
    }

    pub fn as_slice_mut(&mut self) -> &mut [T] {
        if self.ptr.is_null() {
            return &mut [];
        }
        unsafe { std::slice::from_raw_parts_mut(self.ptr, self.len as usize) }
    }

    pub fn get(&self, index: u64) -> Result<&T> {
        self.check(index)?;
        Ok(&self.as_slice()[index as usize])
    }

    pub fn get_mut(&mut self, index: u64) -> Result<&mut T> {
        self.check(index)?;
        Ok(&mut self.as_slice_mut()[index as usize])
    }

    pub fn set(&mut self, index: u64, value: T) -> Result<()> {
        *self.get_mut(index)? = value;
        Ok(())
    }

    /// Reborrow as a read-only view for the lifetime of `&self`.
    pub fn as_view(&self) -> Slice<'_, T> {
        Slice::new(self.as_slice())
    }

    fn check(&self, index: u64) -> Result<()> {
        if index >= self.len {
            return Err(CoreError::IndexOutOfRange {
                index,
                length: self.len,
            });
        }
        Ok(())
    }
}

impl<T> Default for SliceMut<'_, T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> Deref for SliceMut<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T> DerefMut for SliceMut<'_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_slice_mut()
    }
}

impl<'a, T> From<&'a mut [T]> for SliceMut<'a, T> {
    fn from(data: &'a mut [T]) -> Self {
        SliceMut::new(data)
    }
}

impl<'a, T> From<&'a mut Vec<T>> for SliceMut<'a, T> {
    fn from(data: &'a mut Vec<T>) -> Self {
        SliceMut::new(data)
    }
}

impl<T: fmt::Debug> fmt::Debug for SliceMut<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

/// View `len` elements starting at `ptr`. See [`Slice::from_raw_parts`].
///
/// # Safety
///
/// Same contract as [`Slice::from_raw_parts`].
pub unsafe fn view<'a, T>(ptr: *const T, len: u64) -> Result<Slice<'a, T>> {
    Slice::from_raw_parts(ptr, len)
}

/// Mutable counterpart of [`view`].
///
/// # Safety
///
/// Same contract as [`SliceMut::from_raw_parts`].
pub unsafe fn view_mut<'a, T>(ptr: *mut T, len: u64) -> Result<SliceMut<'a, T>> {
    SliceMut::from_raw_parts(ptr, len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_checks_bounds() {
        let data = [1u32, 2, 3];
        let view = Slice::new(&data);
        assert_eq!(*view.get(2).unwrap(), 3);
        match view.get(3) {
            Err(CoreError::IndexOutOfRange { index, length }) => {
                assert_eq!(index, 3);
                assert_eq!(length, 3);
            }
            other => panic!("expected IndexOutOfRange, got {other:?}"),
        }
    }

    #[test]
    fn null_with_zero_length_is_empty() {
        let view = unsafe { Slice::<u8>::from_raw_parts(ptr::null(), 0) }.unwrap();
        assert!(view.is_empty());
        assert_eq!(view.as_slice(), &[] as &[u8]);
        assert!(matches!(view.get(0), Err(CoreError::IndexOutOfRange { .. })));
    }

    #[test]
    fn null_with_length_is_rejected() {
        let err = unsafe { view::<u8>(ptr::null(), 4) }.unwrap_err();
        assert!(matches!(err, CoreError::NullView { length: 4 }));
        let err = unsafe { view_mut::<u8>(ptr::null_mut(), 1) }.unwrap_err();
        assert!(matches!(err, CoreError::NullView { length: 1 }));
    }

    #[test]
    fn mutable_view_writes_through() {
        let mut data = vec![0u8; 4];
        {
            let mut view = SliceMut::from(&mut data);
            view.set(1, 9).unwrap();
            view[3] = 7;
            assert!(view.set(4, 1).is_err());
            assert_eq!(view.as_view().copy_to_vec(), vec![0, 9, 0, 7]);
        }
        assert_eq!(data, vec![0, 9, 0, 7]);
    }

    #[test]
    fn view_layout_is_pointer_and_length() {
        assert_eq!(
            std::mem::size_of::<Slice<'_, u8>>(),
            std::mem::size_of::<*const u8>() + std::mem::size_of::<u64>()
        );
        assert_eq!(std::mem::size_of::<SliceMut<'_, u8>>(), std::mem::size_of::<Slice<'_, u8>>());
    }

    #[test]
    fn large_view_keeps_length() {
        let data = vec![0u16; 100_000];
        let view = Slice::from(&data);
        assert_eq!(view.len(), 100_000);
        assert_eq!(view.iter().count(), 100_000);
    }
}
