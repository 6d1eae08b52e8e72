// SPDX-License-Identifier: GPL-3.0-or-later

//! Session error kinds. Every one of them is fatal to the current
//! session: the device signals `ERROR` on the host channel where a frame
//! exchange is in progress and then requests a full reset. There is no
//! local recovery or retry.

use core::fmt;

pub type Result<T> = core::result::Result<T, Error>;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// Declared or decrypted image size exceeds the supported maximum.
    Oversize,
    /// Bad start marker, malformed frame or inconsistent blob structure.
    Framing,
    /// A frame would push the write cursor past the declared blob size.
    BufferOverrun,
    /// Session tag did not verify; the blob is discarded undisclosed.
    Authentication,
    /// Update announces a version older than the installed one.
    Rollback,
    /// Non-volatile erase or program operation failed.
    Program,
    /// Read-back after programming did not match the source bytes.
    Verify,
    /// No firmware installed; nothing to boot.
    NoFirmware,
    /// Serial channel read or write failed mid-session.
    Serial,
}

impl Error {
    /// Short diagnostic name, for the debug channel.
    pub fn as_str(&self) -> &'static str {
        match self {
            Error::Oversize => "oversize",
            Error::Framing => "framing",
            Error::BufferOverrun => "buffer overrun",
            Error::Authentication => "authentication",
            Error::Rollback => "rollback",
            Error::Program => "program",
            Error::Verify => "verify",
            Error::NoFirmware => "no firmware",
            Error::Serial => "serial",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
