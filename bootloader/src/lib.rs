// SPDX-License-Identifier: GPL-3.0-or-later

//! Portable secure-bootloader core.
//!
//! Receives a firmware image over a serial link as a sequence of
//! integrity-checked frames, authenticates and decrypts the accumulated
//! blob, gates it against the anti-rollback policy, programs it into
//! non-volatile memory with read-back verification and finally hands
//! control to it.
//!
//! The crate is hardware-agnostic: the serial channel is any blocking
//! [`embedded_io`] `Read + Write`, non-volatile memory is any
//! [`embedded_storage`] `NorFlash`, and reset/jump are the two traits in
//! [`hardware`]. Board bring-up (UART driver, clocks, the actual vector
//! jump) lives outside this crate.

#![cfg_attr(not(test), no_std)]

pub(crate) mod fmt;

pub mod boot;
pub mod crypto;
pub mod dispatcher;
pub mod error;
pub mod flash;
pub mod hardware;
pub mod image;
pub mod metadata;
pub mod receiver;
pub mod update;

pub use boot::boot_firmware;
pub use crypto::UpdateKeys;
pub use dispatcher::{Dispatcher, State};
pub use error::{Error, Result};
pub use flash::{FlashLayout, NonVolatileStore};
pub use hardware::{BootJump, SystemReset};
pub use metadata::{Metadata, RollbackPolicy};
pub use update::load_firmware;

/// Fixed-capacity buffer holding one session's ciphertext.
///
/// Owned by the dispatcher and lent to each update session; the session
/// clears it on entry, so no bytes survive from one session to the next.
pub type BlobBuffer = heapless::Vec<u8, { consts::MAX_BLOB_SIZE }>;
