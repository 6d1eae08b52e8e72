// SPDX-License-Identifier: GPL-3.0-or-later

#![no_std]

//! Memory-layout and capacity constants shared by the bootloader core and
//! host-side tooling. All offsets are relative to the base of the internal
//! non-volatile memory.

/// Size of one flash page in bytes.
/// Pages are the erase granularity: a page must be erased (all bits set)
/// before any of its bytes can be programmed.
pub const FLASH_PAGE_SIZE: usize = 1024;

/// Native write granularity of the flash in bytes (one 32-bit word).
/// Program operations not ending on a word boundary are padded with the
/// erased value `0xFF` up to the next word.
pub const FLASH_WORD_SIZE: usize = 4;

/// Offset of the metadata page.
/// The metadata record `{version, size}` occupies the first word of this
/// page; the page is dedicated to metadata so that rewriting it never
/// touches firmware bytes.
pub const METADATA_OFFSET: u32 = 0xFC00;

/// Offset of the installed firmware image.
/// Immediately follows the metadata page. The release message is stored
/// directly past the image bytes, sharing the image's last page when it
/// fits.
pub const FIRMWARE_OFFSET: u32 = 0x1_0000;

/// Maximum accepted firmware image size in bytes.
/// Enforced on the decrypted image before anything is programmed, and
/// bounds the firmware region together with the trailing release message.
pub const MAX_FIRMWARE_SIZE: usize = 15_000;

/// Maximum release-message length in bytes, NUL terminator included.
/// Kept within one flash page so the message spills over into at most one
/// page past the image.
pub const MAX_MESSAGE_SIZE: usize = 1024;

/// Capacity of the in-RAM update blob buffer in bytes.
/// Must hold the largest ciphertext a session may declare: image fields,
/// release message and firmware, rounded up to the cipher block size.
pub const MAX_BLOB_SIZE: usize = 16 * 1024;

/// Byte value of erased flash. Also used as programming fill.
pub const FLASH_ERASED: u8 = 0xFF;
