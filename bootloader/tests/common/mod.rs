// SPDX-License-Identifier: GPL-3.0-or-later

//! In-memory doubles for the four hardware seams: NOR flash with
//! injectable faults, a scripted serial endpoint, and panicking
//! reset/jump hooks so diverging paths can be observed from tests.

#![allow(dead_code)]

use bootloader::{BootJump, FlashLayout, SystemReset, UpdateKeys};
use embedded_storage::nor_flash::{
    ErrorType, NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash,
};

pub const PAGE: usize = 1024;
pub const WORD: usize = 4;
/// One metadata page followed by the firmware region.
pub const FLASH_SIZE: usize = PAGE + 16 * 1024;

/// Layout used by the whole suite: metadata on page zero, firmware
/// starting on the next page.
pub fn test_layout() -> FlashLayout {
    FlashLayout {
        metadata_offset: 0,
        firmware_offset: PAGE as u32,
        firmware_capacity: 16 * 1024,
    }
}

pub fn test_keys() -> UpdateKeys {
    UpdateKeys {
        cipher: [0x42; 32],
        auth: [0x69; 32],
    }
}

#[derive(Debug)]
pub struct MemFlashError;

impl NorFlashError for MemFlashError {
    fn kind(&self) -> NorFlashErrorKind {
        NorFlashErrorKind::Other
    }
}

/// NOR flash emulation: bits only clear on write, pages only set on
/// erase. Write faults and silent corruption are injectable.
pub struct MemFlash {
    pub mem: [u8; FLASH_SIZE],
    /// Count of successful program operations, erases excluded.
    pub writes: usize,
    /// Fail every write once this many have succeeded.
    pub fail_writes_after: Option<usize>,
    /// Flip a bit in the next written word, after it hits the array.
    pub corrupt_next_write: bool,
}

impl MemFlash {
    pub fn new() -> Self {
        MemFlash {
            mem: [0xFF; FLASH_SIZE],
            writes: 0,
            fail_writes_after: None,
            corrupt_next_write: false,
        }
    }
}

impl ErrorType for MemFlash {
    type Error = MemFlashError;
}

impl ReadNorFlash for MemFlash {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let start = offset as usize;
        let end = start + bytes.len();
        if end > FLASH_SIZE {
            return Err(MemFlashError);
        }
        bytes.copy_from_slice(&self.mem[start..end]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        FLASH_SIZE
    }
}

impl NorFlash for MemFlash {
    const WRITE_SIZE: usize = WORD;
    const ERASE_SIZE: usize = PAGE;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        let (from, to) = (from as usize, to as usize);
        if from % PAGE != 0 || to % PAGE != 0 || from > to || to > FLASH_SIZE {
            return Err(MemFlashError);
        }
        self.mem[from..to].fill(0xFF);
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        let start = offset as usize;
        let end = start + bytes.len();
        if start % WORD != 0 || bytes.len() % WORD != 0 || end > FLASH_SIZE {
            return Err(MemFlashError);
        }
        if let Some(limit) = self.fail_writes_after {
            if self.writes >= limit {
                return Err(MemFlashError);
            }
        }
        for (dst, src) in self.mem[start..end].iter_mut().zip(bytes) {
            // NOR semantics: programming can only clear bits.
            *dst &= *src;
        }
        if self.corrupt_next_write {
            self.corrupt_next_write = false;
            self.mem[start] ^= 0x01;
        }
        self.writes += 1;
        Ok(())
    }
}

/// Scripted serial endpoint: reads serve the canned input, writes are
/// captured for inspection.
pub struct ScriptedSerial {
    pub input: Vec<u8>,
    pub cursor: usize,
    pub output: Vec<u8>,
}

impl ScriptedSerial {
    pub fn new(input: Vec<u8>) -> Self {
        ScriptedSerial {
            input,
            cursor: 0,
            output: Vec::new(),
        }
    }
}

impl embedded_io::ErrorType for ScriptedSerial {
    type Error = embedded_io::ErrorKind;
}

impl embedded_io::Read for ScriptedSerial {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let left = &self.input[self.cursor..];
        if left.is_empty() {
            // The real channel blocks forever; tests end the script.
            return Err(embedded_io::ErrorKind::BrokenPipe);
        }
        let n = buf.len().min(left.len());
        buf[..n].copy_from_slice(&left[..n]);
        self.cursor += n;
        Ok(n)
    }
}

impl embedded_io::Write for ScriptedSerial {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.output.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Reset line double: diverges by panicking so tests can observe it.
pub struct PanicReset;

impl SystemReset for PanicReset {
    fn reset(&mut self) -> ! {
        panic!("device reset");
    }
}

/// Jump double: diverges by panicking, carrying the target offset.
pub struct PanicJump;

impl BootJump for PanicJump {
    unsafe fn jump(&mut self, offset: u32) -> ! {
        panic!("jump to {offset:#x}");
    }
}

/// Builds the plaintext blob the host tool would encrypt:
/// `[version][fw_size][message][firmware]`.
pub fn build_plaintext(version: u16, message: &[u8], firmware: &[u8]) -> Vec<u8> {
    let mut plain = Vec::new();
    plain.extend_from_slice(&version.to_le_bytes());
    plain.extend_from_slice(&(firmware.len() as u16).to_le_bytes());
    plain.extend_from_slice(message);
    plain.extend_from_slice(firmware);
    plain
}

/// Encrypts, tags and frames a full update session as it appears on the
/// wire, command byte excluded. Payloads are chunked like the host tool
/// does.
pub fn build_update_wire(
    version: u16,
    message: &[u8],
    firmware: &[u8],
    keys: &UpdateKeys,
) -> Vec<u8> {
    use bootloader::crypto::{frame_digest, seal_blob};
    use host_protocol::{FrameHeader, SessionHeader, FRAME_START_MARKER};

    let iv = [0xA7; host_protocol::IV_SIZE];
    let plain = build_plaintext(version, message, firmware);
    let mut ciphertext = vec![0u8; plain.len() + 16];
    let (blob_len, tag) = seal_blob(&plain, &iv, keys, &mut ciphertext).unwrap();
    ciphertext.truncate(blob_len);

    let mut wire = SessionHeader {
        blob_size: blob_len as u16,
        message_size: message.len() as u16,
        iv,
        tag,
    }
    .to_bytes()
    .to_vec();

    for chunk in ciphertext.chunks(256) {
        wire.extend_from_slice(
            &FrameHeader {
                marker: FRAME_START_MARKER,
                length: chunk.len() as u16,
            }
            .to_bytes(),
        );
        wire.extend_from_slice(chunk);
        wire.extend_from_slice(&frame_digest(chunk));
    }
    wire.extend_from_slice(
        &FrameHeader {
            marker: FRAME_START_MARKER,
            length: 0,
        }
        .to_bytes(),
    );
    wire
}

/// Message extracted from a caught panic, whichever payload type it used.
pub fn panic_message(err: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = err.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else {
        String::from("<non-string panic>")
    }
}
