// SPDX-License-Identifier: GPL-3.0-or-later

//! Host to bootloader update protocol.
//! The host tool drives the session; the device answers with single status
//! bytes. Defines the command bytes, per-frame status codes and the fixed
//! binary encodings of the session and frame headers.

#![no_std]

/// Command byte starting an update session.
pub const CMD_UPDATE: u8 = b'U';
/// Command byte handing control to the installed firmware.
pub const CMD_BOOT: u8 = b'B';

/// Start marker expected at the head of every data frame.
pub const FRAME_START_MARKER: u16 = 1;

/// AES-CBC initialisation vector length in bytes.
pub const IV_SIZE: usize = 16;
/// HMAC-SHA256 session tag length in bytes.
pub const TAG_SIZE: usize = 32;
/// SHA-256 per-frame transport digest length in bytes.
pub const FRAME_DIGEST_SIZE: usize = 32;

/// Encoded session header length: `blob_size`, `message_size`, IV, tag.
pub const SESSION_HEADER_SIZE: usize = 2 + 2 + IV_SIZE + TAG_SIZE;
/// Encoded frame header length: start marker plus frame length.
pub const FRAME_HEADER_SIZE: usize = 4;

/// Top-level commands the dispatcher understands.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Receive, authenticate and install a new firmware image.
    Update,
    /// Print the release message and jump to the installed firmware.
    Boot,
}

impl Command {
    /// Decodes a raw command byte. Unknown bytes are ignored by the
    /// dispatcher, hence `None` rather than an error.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            CMD_UPDATE => Some(Command::Update),
            CMD_BOOT => Some(Command::Boot),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Command::Update => CMD_UPDATE,
            Command::Boot => CMD_BOOT,
        }
    }
}

/// Single-byte status sent to the host after each protocol step.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    /// Step accepted, host may continue.
    Ok = 0x00,
    /// Step rejected; the session is abandoned and the device resets.
    Error = 0x01,
}

impl Status {
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

/// Clear-text header opening an update session.
///
/// `tag` authenticates `iv || ciphertext` for the whole session; the frame
/// digests underneath it are transport checks only.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionHeader {
    /// Total ciphertext length announced up front, in bytes.
    pub blob_size: u16,
    /// Release-message length, NUL terminator included.
    pub message_size: u16,
    /// AES-CBC initialisation vector.
    pub iv: [u8; IV_SIZE],
    /// HMAC-SHA256 over the IV and the full ciphertext.
    pub tag: [u8; TAG_SIZE],
}

impl SessionHeader {
    /// Decodes the wire form: `blob_size:u16-LE`, `message_size:u16-LE`,
    /// IV, tag.
    pub fn from_bytes(raw: &[u8; SESSION_HEADER_SIZE]) -> Self {
        let mut iv = [0u8; IV_SIZE];
        iv.copy_from_slice(&raw[4..4 + IV_SIZE]);
        let mut tag = [0u8; TAG_SIZE];
        tag.copy_from_slice(&raw[4 + IV_SIZE..]);
        SessionHeader {
            blob_size: u16::from_le_bytes([raw[0], raw[1]]),
            message_size: u16::from_le_bytes([raw[2], raw[3]]),
            iv,
            tag,
        }
    }

    /// Encodes the header for sending; inverse of [`Self::from_bytes`].
    pub fn to_bytes(&self) -> [u8; SESSION_HEADER_SIZE] {
        let mut raw = [0u8; SESSION_HEADER_SIZE];
        raw[0..2].copy_from_slice(&self.blob_size.to_le_bytes());
        raw[2..4].copy_from_slice(&self.message_size.to_le_bytes());
        raw[4..4 + IV_SIZE].copy_from_slice(&self.iv);
        raw[4 + IV_SIZE..].copy_from_slice(&self.tag);
        raw
    }
}

/// Header of one data frame.
///
/// The start marker is little-endian; the frame length is big-endian, as
/// produced by the host tool. A zero length with a valid marker terminates
/// the transfer.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    pub marker: u16,
    pub length: u16,
}

impl FrameHeader {
    pub fn from_bytes(raw: &[u8; FRAME_HEADER_SIZE]) -> Self {
        FrameHeader {
            marker: u16::from_le_bytes([raw[0], raw[1]]),
            length: u16::from_be_bytes([raw[2], raw[3]]),
        }
    }

    pub fn to_bytes(&self) -> [u8; FRAME_HEADER_SIZE] {
        let mut raw = [0u8; FRAME_HEADER_SIZE];
        raw[0..2].copy_from_slice(&self.marker.to_le_bytes());
        raw[2..4].copy_from_slice(&self.length.to_be_bytes());
        raw
    }

    /// True when this header closes the frame sequence.
    pub fn is_terminator(&self) -> bool {
        self.marker == FRAME_START_MARKER && self.length == 0
    }
}
