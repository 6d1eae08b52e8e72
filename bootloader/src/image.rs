// SPDX-License-Identifier: GPL-3.0-or-later

//! Field extraction from the decrypted update blob.
//!
//! Plaintext layout:
//! `[version:u16-LE][fw_size:u16-LE][message:message_size][firmware:fw_size]`
//! with the message carrying its own NUL terminator. Only runs on
//! authenticated bytes; failures here mean the producer and device
//! disagree on the format, which is fatal like everything else.

use crate::error::{Error, Result};

const FIELDS_SIZE: usize = 4;

/// A validated update image, borrowed out of the session blob buffer.
#[derive(Debug, PartialEq, Eq)]
pub struct UpdateImage<'a> {
    /// Announced firmware version; 0 marks an unversioned debug build.
    pub version: u16,
    pub firmware: &'a [u8],
    /// Release message, NUL terminator included.
    pub message: &'a [u8],
}

/// Splits the plaintext into its fields and checks every declared length
/// against what was actually received.
pub fn parse_image(plain: &[u8], message_size: usize) -> Result<UpdateImage<'_>> {
    if plain.len() < FIELDS_SIZE {
        return Err(Error::Framing);
    }
    let version = u16::from_le_bytes([plain[0], plain[1]]);
    let fw_size = u16::from_le_bytes([plain[2], plain[3]]) as usize;

    if fw_size == 0 {
        return Err(Error::Framing);
    }
    if fw_size > consts::MAX_FIRMWARE_SIZE {
        return Err(Error::Oversize);
    }
    if message_size == 0 || message_size > consts::MAX_MESSAGE_SIZE {
        return Err(Error::Oversize);
    }
    if FIELDS_SIZE + message_size + fw_size != plain.len() {
        return Err(Error::Framing);
    }

    let message = &plain[FIELDS_SIZE..FIELDS_SIZE + message_size];
    if message[message_size - 1] != 0 {
        return Err(Error::Framing);
    }
    let firmware = &plain[FIELDS_SIZE + message_size..];

    Ok(UpdateImage {
        version,
        firmware,
        message,
    })
}
