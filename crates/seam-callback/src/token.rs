//! C-compatible callback tokens.
//!
//! A token is `{fn, context, release}`: the function the native side calls,
//! an opaque context passed back on every call, and an optional destructor
//! for that context. [`callback!`](crate::callback) declares one token type
//! per callback signature.

use std::ffi::c_void;

/// Operations shared by every type declared with [`callback!`](crate::callback).
///
/// # Safety
///
/// Implementors must be `#[repr(C)]` `{fn, context, release}` triples whose
/// `release`, when present, frees `context`.
pub unsafe trait CallbackToken: Copy + Send + Sync {
    fn context(&self) -> *const c_void;

    fn is_null(&self) -> bool;

    /// Run the carried context destructor, if any.
    ///
    /// # Safety
    ///
    /// The context must not have been released and no invocation may be
    /// running or start afterwards.
    unsafe fn release_context(&self);
}

/// Declare a callback token type.
///
/// ```ignore
/// callback!(pub ValueCallback(value: u32) -> u32);
///
/// let registration = ValueCallback::register(|value| value + 1);
/// assert_eq!(registration.call(1), 2);
/// ```
///
/// The return type decides the failure discipline (see
/// [`CallbackReturn`](crate::CallbackReturn)): envelope and status-code
/// returns are checked, raw values are unchecked.
#[macro_export]
macro_rules! callback {
    ($(#[$meta:meta])* $vis:vis $name:ident($($arg:ident: $ty:ty),* $(,)?)) => {
        $crate::callback!($(#[$meta])* $vis $name($($arg: $ty),*) -> ());
    };
    ($(#[$meta:meta])* $vis:vis $name:ident($($arg:ident: $ty:ty),* $(,)?) -> $ret:ty) => {
        $(#[$meta])*
        #[repr(C)]
        #[derive(Clone, Copy)]
        $vis struct $name {
            callback: ::std::option::Option<
                unsafe extern "C" fn($($ty,)* *const ::std::ffi::c_void) -> $ret,
            >,
            context: *const ::std::ffi::c_void,
            release: ::std::option::Option<unsafe extern "C" fn(*const ::std::ffi::c_void)>,
        }

        unsafe impl ::std::marker::Send for $name {}
        unsafe impl ::std::marker::Sync for $name {}

        impl $name {
            /// A token with no function; calling it is a protocol violation.
            pub const fn null() -> Self {
                $name {
                    callback: ::std::option::Option::None,
                    context: ::std::ptr::null(),
                    release: ::std::option::Option::None,
                }
            }

            /// Wrap a foreign function pointer and its context.
            ///
            /// # Safety
            ///
            /// `callback` must be callable with `context` from any thread for
            /// as long as the token is in use, and `release`, if given, must
            /// free `context`.
            pub const unsafe fn from_fn(
                callback: unsafe extern "C" fn($($ty,)* *const ::std::ffi::c_void) -> $ret,
                context: *const ::std::ffi::c_void,
                release: ::std::option::Option<unsafe extern "C" fn(*const ::std::ffi::c_void)>,
            ) -> Self {
                $name {
                    callback: ::std::option::Option::Some(callback),
                    context,
                    release,
                }
            }

            /// Register a closure under the configured unchecked-failure policy.
            pub fn register<F>(closure: F) -> $crate::Registration<Self>
            where
                F: Fn($($ty),*) -> $ret + Send + Sync + 'static,
            {
                Self::register_with_policy(closure, $crate::default_policy())
            }

            /// Register a closure with an explicit unchecked-failure policy.
            pub fn register_with_policy<F>(
                closure: F,
                policy: $crate::__core::UncheckedFailurePolicy,
            ) -> $crate::Registration<Self>
            where
                F: Fn($($ty),*) -> $ret + Send + Sync + 'static,
            {
                unsafe extern "C" fn trampoline<F: Fn($($ty),*) -> $ret>(
                    $($arg: $ty,)*
                    context: *const ::std::ffi::c_void,
                ) -> $ret {
                    let context = $crate::Context::<F>::from_raw(context);
                    context.invoke(stringify!($name), move || (context.closure())($($arg),*))
                }

                unsafe extern "C" fn release<F>(context: *const ::std::ffi::c_void) {
                    $crate::Context::<F>::release(context)
                }

                let (context, tracker) = $crate::Context::into_raw(closure, policy);
                let token = $name {
                    callback: ::std::option::Option::Some(trampoline::<F>),
                    context,
                    release: ::std::option::Option::Some(release::<F>),
                };
                unsafe { $crate::Registration::new(token, tracker) }
            }

            pub fn is_null(&self) -> bool {
                self.callback.is_none()
            }

            /// Invoke the callback. Invoking a null token is fatal.
            pub fn call(&self, $($arg: $ty),*) -> $ret {
                match self.callback {
                    ::std::option::Option::Some(callback) => unsafe { callback($($arg,)* self.context) },
                    ::std::option::Option::None => $crate::__core::protocol::fatal(
                        $crate::__core::ProtocolViolation::NullCallback,
                    ),
                }
            }

            /// Invoke the callback, or return `None` for a null token.
            pub fn try_call(&self, $($arg: $ty),*) -> ::std::option::Option<$ret> {
                self.callback
                    .map(|callback| unsafe { callback($($arg,)* self.context) })
            }

            /// Release the context through the carried destructor.
            ///
            /// # Safety
            ///
            /// See [`CallbackToken::release_context`]($crate::CallbackToken::release_context).
            pub unsafe fn release(self) {
                <Self as $crate::CallbackToken>::release_context(&self)
            }
        }

        unsafe impl $crate::CallbackToken for $name {
            fn context(&self) -> *const ::std::ffi::c_void {
                self.context
            }

            fn is_null(&self) -> bool {
                self.callback.is_none()
            }

            unsafe fn release_context(&self) {
                if let ::std::option::Option::Some(release) = self.release {
                    release(self.context)
                }
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("callback", &self.callback.map(|c| c as *const ()))
                    .field("context", &self.context)
                    .finish()
            }
        }
    };
}
