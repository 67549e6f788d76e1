//! Propagation macros.
//!
//! All of them expand to an early `return Err(..)` from the enclosing
//! function, whose error type must be constructible from [`crate::Error`].
//! Locations are the macro call site and messages are the source text of
//! the checked expression.
//!
//! The `sc3a_*` variants are assertion checks that only run when
//! [`crate::DEBUG_CHECKS`] is true; otherwise the condition is not
//! evaluated and the check costs nothing. The `sc3e_*` variants are always
//! active.

/// Returns a fatal error if `cond` is false. Debug checks only.
#[macro_export]
macro_rules! sc3a_check {
    ($cond:expr $(,)?) => {
        if $crate::DEBUG_CHECKS && !($cond) {
            return ::core::result::Result::Err(::core::convert::Into::into(
                $crate::Error::new_fatal(file!(), line!(), stringify!($cond)),
            ));
        }
    };
}

/// Propagates an error from `f` as fatal. Debug checks only; `f` is not
/// evaluated otherwise.
#[macro_export]
macro_rules! sc3a_stack {
    ($f:expr $(,)?) => {
        if $crate::DEBUG_CHECKS {
            if let ::core::result::Result::Err(cause) = $f {
                return ::core::result::Result::Err(::core::convert::Into::into(
                    $crate::Error::new_stack(cause, file!(), line!(), stringify!($f)),
                ));
            }
        }
    };
}

/// Evaluates `f`, yielding its success value, or wraps its error as fatal
/// at this site and returns it.
#[macro_export]
macro_rules! sc3e {
    ($f:expr $(,)?) => {
        match $f {
            ::core::result::Result::Ok(value) => value,
            ::core::result::Result::Err(cause) => {
                return ::core::result::Result::Err(::core::convert::Into::into(
                    $crate::Error::new_stack(cause, file!(), line!(), stringify!($f)),
                ));
            }
        }
    };
}

/// Returns a fatal error if `cond` is false.
#[macro_export]
macro_rules! sc3e_demand {
    ($cond:expr $(,)?) => {
        if !($cond) {
            return ::core::result::Result::Err(::core::convert::Into::into(
                $crate::Error::new_fatal(file!(), line!(), stringify!($cond)),
            ));
        }
    };
}

/// Returns a fatal error unless `r >= 0`.
#[macro_export]
macro_rules! sc3e_nonneg {
    ($r:expr $(,)?) => {
        $crate::sc3e_demand!(($r) >= 0)
    };
}

/// Returns a fatal `"Unreachable: <s>"` error.
#[macro_export]
macro_rules! sc3e_unreach {
    ($s:expr $(,)?) => {
        return ::core::result::Result::Err(::core::convert::Into::into(
            $crate::Error::new_fatal(file!(), line!(), &::std::format!("Unreachable: {}", $s)),
        ))
    };
}

/// Stores the error of `f`, wrapped with inherited severity, into the
/// `Option<Error>` place `slot`; clears `slot` if `f` succeeds. Does not
/// return.
#[macro_export]
macro_rules! sc3e_set {
    ($slot:expr, $f:expr $(,)?) => {
        $slot = match $f {
            ::core::result::Result::Ok(_) => ::core::option::Option::None,
            ::core::result::Result::Err(cause) => ::core::option::Option::Some(
                $crate::Error::new_inherit(cause, file!(), line!(), stringify!($f)),
            ),
        }
    };
}

/// Like [`sc3e_set!`] but only if `slot` holds no error yet. The first error
/// wins; `f` is not evaluated once `slot` is taken.
#[macro_export]
macro_rules! sc3e_null_set {
    ($slot:expr, $f:expr $(,)?) => {
        if $slot.is_none() {
            $crate::sc3e_set!($slot, $f);
        }
    };
}
