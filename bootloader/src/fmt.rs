// SPDX-License-Identifier: GPL-3.0-or-later

//! Diagnostics shim: `defmt` on target builds, `log` on host builds,
//! compiled out when neither feature is enabled. Diagnostic output is
//! never a trust boundary.

#![allow(unused_imports)]

#[cfg(feature = "defmt")]
pub(crate) use defmt::{debug, error, info, warn};

#[cfg(all(feature = "log", not(feature = "defmt")))]
pub(crate) use log::{debug, error, info, warn};

#[cfg(not(any(feature = "defmt", feature = "log")))]
mod noop {
    macro_rules! debug {
        ($s:literal $(, $x:expr)* $(,)?) => {{ let _ = ($( & $x ),*); }};
    }
    macro_rules! error {
        ($s:literal $(, $x:expr)* $(,)?) => {{ let _ = ($( & $x ),*); }};
    }
    macro_rules! info {
        ($s:literal $(, $x:expr)* $(,)?) => {{ let _ = ($( & $x ),*); }};
    }
    macro_rules! warning {
        ($s:literal $(, $x:expr)* $(,)?) => {{ let _ = ($( & $x ),*); }};
    }
    pub(crate) use {debug, error, info, warning as warn};
}

#[cfg(not(any(feature = "defmt", feature = "log")))]
pub(crate) use noop::{debug, error, info, warn};
