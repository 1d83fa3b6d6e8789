//! Tagged envelopes for fallible and optional outcomes.
//!
//! Errors never cross the boundary as unwinding. A fallible export returns a
//! [`ResultEnvelope`] and an optional one an [`OptionEnvelope`]: a `u32`
//! discriminant followed by the payload, in C layout.
//!
//! | Envelope         | 0      | 1         |
//! |------------------|--------|-----------|
//! | `ResultEnvelope` | `Ok`   | `Err`     |
//! | `OptionEnvelope` | `None` | `Some`    |
//!
//! Any other discriminant is [`ProtocolViolation::UnknownDiscriminant`],
//! never a recognized `Err`. [`ResultEnvelope::decode`] surfaces it as a
//! value; the convenience conversions treat it as fatal.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::mem::{ManuallyDrop, MaybeUninit};

use crate::error::CoreError;
use crate::protocol::{self, ProtocolViolation};

pub const TAG_OK: u32 = 0;
pub const TAG_ERR: u32 = 1;
pub const TAG_NONE: u32 = 0;
pub const TAG_SOME: u32 = 1;

/// Error types that can absorb failures raised outside their own domain.
///
/// Implementors reserve a value for a caller-side panic caught at a boundary
/// guard and one for a null pointer where a value was required.
pub trait BoundaryError: Sized {
    const PANIC: Self;
    const NULL: Self;
}

/// Error types returned bare as a status code, with a success value.
pub trait StatusCode: BoundaryError + PartialEq {
    const SUCCESS: Self;

    fn is_success(&self) -> bool {
        *self == Self::SUCCESS
    }
}

/// Unwrapping the variant an envelope does not hold.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("called unwrap on a `{variant}` envelope")]
pub struct UnwrapError<P> {
    pub variant: &'static str,
    pub payload: P,
}

impl<P: fmt::Debug> From<UnwrapError<P>> for CoreError {
    fn from(err: UnwrapError<P>) -> Self {
        CoreError::Unwrap {
            detail: format!("{err} holding {:?}", err.payload),
        }
    }
}

#[repr(C)]
union ResultPayload<T, E> {
    ok: ManuallyDrop<T>,
    err: ManuallyDrop<E>,
}

/// `Ok(T)` or `Err(E)` with an explicit `u32` discriminant.
#[repr(C)]
pub struct ResultEnvelope<T, E> {
    tag: u32,
    payload: ResultPayload<T, E>,
}

impl<T, E> ResultEnvelope<T, E> {
    pub fn ok(value: T) -> Self {
        ResultEnvelope {
            tag: TAG_OK,
            payload: ResultPayload {
                ok: ManuallyDrop::new(value),
            },
        }
    }

    pub fn err(error: E) -> Self {
        ResultEnvelope {
            tag: TAG_ERR,
            payload: ResultPayload {
                err: ManuallyDrop::new(error),
            },
        }
    }

    /// The raw discriminant.
    pub fn tag(&self) -> u32 {
        self.tag
    }

    /// Borrow the outcome, or report an unknown discriminant.
    pub fn as_result(&self) -> Result<Result<&T, &E>, ProtocolViolation> {
        unsafe {
            match self.tag {
                TAG_OK => Ok(Ok(&*self.payload.ok)),
                TAG_ERR => Ok(Err(&*self.payload.err)),
                tag => Err(unknown("ResultEnvelope", tag)),
            }
        }
    }

    /// Take the outcome, or report an unknown discriminant.
    ///
    /// On a violation the payload is leaked, since its type is unknown.
    pub fn decode(self) -> Result<Result<T, E>, ProtocolViolation> {
        let mut this = ManuallyDrop::new(self);
        unsafe {
            match this.tag {
                TAG_OK => Ok(Ok(ManuallyDrop::take(&mut this.payload.ok))),
                TAG_ERR => Ok(Err(ManuallyDrop::take(&mut this.payload.err))),
                tag => Err(unknown("ResultEnvelope", tag)),
            }
        }
    }

    #[track_caller]
    pub fn into_result(self) -> Result<T, E> {
        self.decode().unwrap_or_else(|violation| protocol::fatal(violation))
    }

    #[track_caller]
    pub fn view(&self) -> Result<&T, &E> {
        self.as_result().unwrap_or_else(|violation| protocol::fatal(violation))
    }

    pub fn is_ok(&self) -> bool {
        self.view().is_ok()
    }

    pub fn is_err(&self) -> bool {
        self.view().is_err()
    }

    /// Take the `Ok` value, or return the error in an [`UnwrapError`].
    pub fn try_unwrap(self) -> Result<T, UnwrapError<E>> {
        self.into_result().map_err(|payload| UnwrapError {
            variant: "Err",
            payload,
        })
    }

    /// Take the `Err` value, or return the success value in an [`UnwrapError`].
    pub fn try_unwrap_err(self) -> Result<E, UnwrapError<T>> {
        match self.into_result() {
            Ok(payload) => Err(UnwrapError {
                variant: "Ok",
                payload,
            }),
            Err(error) => Ok(error),
        }
    }

    #[track_caller]
    pub fn unwrap(self) -> T
    where
        E: fmt::Debug,
    {
        match self.try_unwrap() {
            Ok(value) => value,
            Err(err) => panic!("{err}: {:?}", err.payload),
        }
    }

    #[track_caller]
    pub fn unwrap_err(self) -> E
    where
        T: fmt::Debug,
    {
        match self.try_unwrap_err() {
            Ok(error) => error,
            Err(err) => panic!("{err}: {:?}", err.payload),
        }
    }

    /// Build an envelope with an arbitrary discriminant and an `Ok` payload.
    ///
    /// # Safety
    ///
    /// With `tag` equal to [`TAG_ERR`] the payload is read as `E`; that is
    /// only sound when `T` and `E` share a representation.
    #[doc(hidden)]
    pub unsafe fn with_raw_tag(tag: u32, value: T) -> Self {
        let mut envelope = Self::ok(value);
        envelope.tag = tag;
        envelope
    }
}

impl<T, E> Drop for ResultEnvelope<T, E> {
    fn drop(&mut self) {
        unsafe {
            match self.tag {
                TAG_OK => ManuallyDrop::drop(&mut self.payload.ok),
                TAG_ERR => ManuallyDrop::drop(&mut self.payload.err),
                tag => tracing::error!(tag, "dropping ResultEnvelope with unknown discriminant"),
            }
        }
    }
}

impl<T, E> From<Result<T, E>> for ResultEnvelope<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::ok(value),
            Err(error) => Self::err(error),
        }
    }
}

impl<T, E> From<ResultEnvelope<T, E>> for Result<T, E> {
    fn from(envelope: ResultEnvelope<T, E>) -> Self {
        envelope.into_result()
    }
}

impl<T: Clone, E: Clone> Clone for ResultEnvelope<T, E> {
    fn clone(&self) -> Self {
        match self.view() {
            Ok(value) => Self::ok(value.clone()),
            Err(error) => Self::err(error.clone()),
        }
    }
}

impl<T: PartialEq, E: PartialEq> PartialEq for ResultEnvelope<T, E> {
    fn eq(&self, other: &Self) -> bool {
        self.view() == other.view()
    }
}

impl<T: Eq, E: Eq> Eq for ResultEnvelope<T, E> {}

impl<T: Hash, E: Hash> Hash for ResultEnvelope<T, E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tag.hash(state);
        match self.view() {
            Ok(value) => value.hash(state),
            Err(error) => error.hash(state),
        }
    }
}

impl<T: fmt::Debug, E: fmt::Debug> fmt::Debug for ResultEnvelope<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_result() {
            Ok(Ok(value)) => f.debug_tuple("Ok").field(value).finish(),
            Ok(Err(error)) => f.debug_tuple("Err").field(error).finish(),
            Err(_) => write!(f, "Invalid({})", self.tag),
        }
    }
}

/// `Some(T)` or `None` with an explicit `u32` discriminant.
#[repr(C)]
pub struct OptionEnvelope<T> {
    tag: u32,
    value: MaybeUninit<T>,
}

impl<T> OptionEnvelope<T> {
    pub fn some(value: T) -> Self {
        OptionEnvelope {
            tag: TAG_SOME,
            value: MaybeUninit::new(value),
        }
    }

    pub fn none() -> Self {
        OptionEnvelope {
            tag: TAG_NONE,
            value: MaybeUninit::uninit(),
        }
    }

    pub fn tag(&self) -> u32 {
        self.tag
    }

    pub fn as_option(&self) -> Result<Option<&T>, ProtocolViolation> {
        match self.tag {
            TAG_SOME => Ok(Some(unsafe { self.value.assume_init_ref() })),
            TAG_NONE => Ok(None),
            tag => Err(unknown("OptionEnvelope", tag)),
        }
    }

    pub fn decode(self) -> Result<Option<T>, ProtocolViolation> {
        let this = ManuallyDrop::new(self);
        match this.tag {
            TAG_SOME => Ok(Some(unsafe { this.value.assume_init_read() })),
            TAG_NONE => Ok(None),
            tag => Err(unknown("OptionEnvelope", tag)),
        }
    }

    #[track_caller]
    pub fn into_option(self) -> Option<T> {
        self.decode().unwrap_or_else(|violation| protocol::fatal(violation))
    }

    #[track_caller]
    pub fn view(&self) -> Option<&T> {
        self.as_option().unwrap_or_else(|violation| protocol::fatal(violation))
    }

    pub fn is_some(&self) -> bool {
        self.view().is_some()
    }

    pub fn is_none(&self) -> bool {
        self.view().is_none()
    }

    pub fn try_unwrap(self) -> Result<T, UnwrapError<()>> {
        self.into_option().ok_or(UnwrapError {
            variant: "None",
            payload: (),
        })
    }

    #[track_caller]
    pub fn unwrap(self) -> T {
        match self.try_unwrap() {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    /// # Safety
    ///
    /// With `tag` equal to [`TAG_SOME`] the value slot is read, so a value
    /// must be present for that tag to be sound.
    #[doc(hidden)]
    pub unsafe fn with_raw_tag(tag: u32) -> Self {
        OptionEnvelope {
            tag,
            value: MaybeUninit::uninit(),
        }
    }
}

impl<T> Drop for OptionEnvelope<T> {
    fn drop(&mut self) {
        match self.tag {
            TAG_SOME => unsafe { self.value.assume_init_drop() },
            TAG_NONE => {}
            tag => tracing::error!(tag, "dropping OptionEnvelope with unknown discriminant"),
        }
    }
}

impl<T> Default for OptionEnvelope<T> {
    fn default() -> Self {
        Self::none()
    }
}

impl<T> From<Option<T>> for OptionEnvelope<T> {
    fn from(option: Option<T>) -> Self {
        match option {
            Some(value) => Self::some(value),
            None => Self::none(),
        }
    }
}

impl<T> From<OptionEnvelope<T>> for Option<T> {
    fn from(envelope: OptionEnvelope<T>) -> Self {
        envelope.into_option()
    }
}

impl<T: Clone> Clone for OptionEnvelope<T> {
    fn clone(&self) -> Self {
        self.view().cloned().into()
    }
}

impl<T: PartialEq> PartialEq for OptionEnvelope<T> {
    fn eq(&self, other: &Self) -> bool {
        self.view() == other.view()
    }
}

impl<T: Eq> Eq for OptionEnvelope<T> {}

impl<T: Hash> Hash for OptionEnvelope<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.view().hash(state)
    }
}

impl<T: fmt::Debug> fmt::Debug for OptionEnvelope<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_option() {
            Ok(Some(value)) => f.debug_tuple("Some").field(value).finish(),
            Ok(None) => f.write_str("None"),
            Err(_) => write!(f, "Invalid({})", self.tag),
        }
    }
}

fn unknown(envelope: &'static str, tag: u32) -> ProtocolViolation {
    ProtocolViolation::UnknownDiscriminant { envelope, tag }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::collections::HashSet;

    use crate::owned::OwnedString;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[repr(u32)]
    enum Code {
        Ok = 0,
        Null = 100,
        Panic = 200,
        Fail = 300,
    }

    impl BoundaryError for Code {
        const PANIC: Self = Code::Panic;
        const NULL: Self = Code::Null;
    }

    impl StatusCode for Code {
        const SUCCESS: Self = Code::Ok;
    }

    fn hash_of<H: Hash>(value: &H) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn result_tags() {
        assert_eq!(ResultEnvelope::<u32, Code>::ok(1).tag(), TAG_OK);
        assert_eq!(ResultEnvelope::<u32, Code>::err(Code::Fail).tag(), TAG_ERR);
        assert_eq!(OptionEnvelope::some(3u8).tag(), TAG_SOME);
        assert_eq!(OptionEnvelope::<u8>::none().tag(), TAG_NONE);
    }

    #[test]
    fn decode_known_variants() {
        let ok: ResultEnvelope<u32, Code> = Ok(123).into();
        assert_eq!(ok.decode(), Ok(Ok(123)));
        let err: ResultEnvelope<u32, Code> = Err(Code::Fail).into();
        assert_eq!(err.decode(), Ok(Err(Code::Fail)));
    }

    #[test]
    fn unknown_discriminant_is_a_violation_not_an_err() {
        let bad = unsafe { ResultEnvelope::<u32, u32>::with_raw_tag(7, 0) };
        assert_eq!(
            bad.as_result(),
            Err(ProtocolViolation::UnknownDiscriminant {
                envelope: "ResultEnvelope",
                tag: 7,
            })
        );
        assert!(bad.decode().is_err());

        let bad = unsafe { OptionEnvelope::<u32>::with_raw_tag(2) };
        assert!(matches!(
            bad.decode(),
            Err(ProtocolViolation::UnknownDiscriminant { tag: 2, .. })
        ));
    }

    #[test]
    fn into_result_on_unknown_discriminant_is_fatal() {
        let payload = std::panic::catch_unwind(|| {
            let bad = unsafe { ResultEnvelope::<u32, u32>::with_raw_tag(9, 0) };
            let _ = bad.into_result();
        })
        .unwrap_err();
        assert_eq!(
            payload.downcast_ref::<crate::protocol::FatalViolation>().map(|v| &v.0),
            Some(&ProtocolViolation::UnknownDiscriminant {
                envelope: "ResultEnvelope",
                tag: 9,
            })
        );
    }

    #[test]
    fn equality_and_hash_are_structural() {
        let a: ResultEnvelope<u32, Code> = ResultEnvelope::ok(5);
        let b: ResultEnvelope<u32, Code> = ResultEnvelope::ok(5);
        let c: ResultEnvelope<u32, Code> = ResultEnvelope::err(Code::Fail);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(hash_of(&a), hash_of(&b));

        let set: HashSet<OptionEnvelope<u8>> =
            [OptionEnvelope::some(1), OptionEnvelope::some(1), OptionEnvelope::none()]
                .into_iter()
                .collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn unwrap_wrong_variant_keeps_payload() {
        let err: ResultEnvelope<u32, Code> = ResultEnvelope::err(Code::Fail);
        let unwrap = err.try_unwrap().unwrap_err();
        assert_eq!(unwrap.variant, "Err");
        assert_eq!(unwrap.payload, Code::Fail);

        let ok: ResultEnvelope<u32, Code> = ResultEnvelope::ok(9);
        assert_eq!(ok.try_unwrap_err().unwrap_err().payload, 9);

        let none = OptionEnvelope::<u32>::none();
        assert_eq!(none.try_unwrap().unwrap_err().variant, "None");

        let core: CoreError = UnwrapError { variant: "Err", payload: Code::Fail }.into();
        assert!(core.to_string().contains("Fail"));
    }

    #[test]
    #[should_panic(expected = "called unwrap on a `Err` envelope")]
    fn unwrap_err_variant_panics() {
        ResultEnvelope::<u32, Code>::err(Code::Panic).unwrap();
    }

    #[test]
    fn owned_payloads_are_dropped_once() {
        let before = crate::ledger::thread_balance();
        {
            let ok: ResultEnvelope<OwnedString, Code> = ResultEnvelope::ok(OwnedString::new("hi"));
            let copy = ok.clone();
            assert_eq!(copy.unwrap(), "hi");
            let some = OptionEnvelope::some(OwnedString::new("there"));
            assert!(some.is_some());
        }
        assert_eq!(crate::ledger::thread_balance().since(before).outstanding(), 0);
    }

    #[test]
    fn status_codes() {
        assert!(Code::SUCCESS.is_success());
        assert!(!Code::PANIC.is_success());
        assert_eq!(Code::NULL as u32, 100);
    }

    #[test]
    fn debug_output() {
        let ok: ResultEnvelope<u32, Code> = ResultEnvelope::ok(1);
        assert_eq!(format!("{ok:?}"), "Ok(1)");
        assert_eq!(format!("{:?}", OptionEnvelope::<u8>::none()), "None");
    }
}
