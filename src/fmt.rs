//! Logging shim.
//!
//! Forwards to `defmt` on target, to `log` for host tools, and expands to
//! nothing in plain host test builds.  Arguments must implement both
//! `defmt::Format` and `core::fmt::Display`, so only `{}` placeholders are
//! used.

#![macro_use]
#![allow(unused_macros)]

macro_rules! log_impl {
    ($level:ident, $s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "defmt")]
            ::defmt::$level!($s $(, $x)*);
            #[cfg(all(feature = "log", not(feature = "defmt")))]
            ::log::$level!($s $(, $x)*);
            #[cfg(not(any(feature = "log", feature = "defmt")))]
            let _ = ($( & $x ),*);
        }
    };
}

macro_rules! trace {
    ($($arg:tt)*) => { log_impl!(trace, $($arg)*) };
}

macro_rules! debug {
    ($($arg:tt)*) => { log_impl!(debug, $($arg)*) };
}

macro_rules! info {
    ($($arg:tt)*) => { log_impl!(info, $($arg)*) };
}

macro_rules! warn {
    ($($arg:tt)*) => { log_impl!(warn, $($arg)*) };
}

macro_rules! error {
    ($($arg:tt)*) => { log_impl!(error, $($arg)*) };
}
