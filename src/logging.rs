#![allow(unused_macros)]

//! Logging shims. With the `logging` feature the macros forward to the `log` crate,
//! without it they only type-check their arguments and compile to nothing.

macro_rules! debug {
    (target: $target:expr, $($arg:tt)+) => (
        #[cfg(feature = "logging")]
        log::debug!(target: $target, $($arg)+);
        #[cfg(not(feature = "logging"))]
        { if false { let _ = ($target, format_args!($($arg)+)); } }
    );
    ($($arg:tt)+) => (
        #[cfg(feature = "logging")]
        log::debug!($($arg)+);
        #[cfg(not(feature = "logging"))]
        { if false { let _ = format_args!($($arg)+); } }
    )
}

macro_rules! trace {
    (target: $target:expr, $($arg:tt)+) => (
        #[cfg(feature = "logging")]
        log::trace!(target: $target, $($arg)+);
        #[cfg(not(feature = "logging"))]
        { if false { let _ = ($target, format_args!($($arg)+)); } }
    );
    ($($arg:tt)+) => (
        #[cfg(feature = "logging")]
        log::trace!($($arg)+);
        #[cfg(not(feature = "logging"))]
        { if false { let _ = format_args!($($arg)+); } }
    )
}
