// SPDX-License-Identifier: GPL-3.0-or-later

//! The persisted metadata record and the anti-rollback policy.
//!
//! The record is a single flash word `[version:u16-LE][size:u16-LE]` on
//! its own reserved page. The all-erased word means "no firmware
//! installed yet"; any other value is a committed record. The stored
//! version is the only persisted trust anchor against downgrades.

use crate::error::{Error, Result};

/// Installed-firmware record, one flash word.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Metadata {
    pub version: u16,
    /// Firmware image size in bytes, release message excluded.
    pub size: u16,
}

impl Metadata {
    pub const ENCODED_SIZE: usize = 4;

    /// Decodes a metadata word read from flash. `None` for the factory
    /// (all-bits-set) state.
    pub fn from_bytes(raw: [u8; Self::ENCODED_SIZE]) -> Option<Self> {
        if raw == [0xFF; Self::ENCODED_SIZE] {
            return None;
        }
        Some(Metadata {
            version: u16::from_le_bytes([raw[0], raw[1]]),
            size: u16::from_le_bytes([raw[2], raw[3]]),
        })
    }

    pub fn to_bytes(self) -> [u8; Self::ENCODED_SIZE] {
        let v = self.version.to_le_bytes();
        let s = self.size.to_le_bytes();
        [v[0], v[1], s[0], s[1]]
    }
}

/// Anti-rollback policy knobs.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RollbackPolicy {
    /// Accept version-0 images without a rollback check. Such an image is
    /// an unversioned debug build: it is installed but the stored version
    /// stays at its previous value, so it never lowers the floor for
    /// later updates. This is a deliberate downgrade vector for
    /// development workflows; ship with it disabled if that is not
    /// acceptable.
    pub allow_debug_firmware: bool,
}

impl Default for RollbackPolicy {
    fn default() -> Self {
        RollbackPolicy {
            allow_debug_firmware: true,
        }
    }
}

/// Gates an update by version and decides which version gets persisted.
///
/// * version 0 (policy permitting): accepted, inherits the installed
///   version;
/// * anything older than the installed version: [`Error::Rollback`];
/// * otherwise: accepted, the announced version is persisted. With no
///   record installed there is no floor and any version is accepted.
pub fn check_rollback(
    installed: Option<Metadata>,
    new_version: u16,
    policy: RollbackPolicy,
) -> Result<u16> {
    let old_version = installed.map(|m| m.version);
    if new_version == 0 {
        if policy.allow_debug_firmware {
            return Ok(old_version.unwrap_or(0));
        }
        return Err(Error::Rollback);
    }
    match old_version {
        Some(old) if new_version < old => Err(Error::Rollback),
        _ => Ok(new_version),
    }
}
