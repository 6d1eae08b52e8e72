// SPDX-License-Identifier: GPL-3.0-or-later

//! Non-volatile memory access: page-granular erase/program/verify over
//! any [`NorFlash`], plus the fixed metadata/firmware layout on top of
//! it.
//!
//! Programming discipline: erase the whole page first (the medium only
//! clears bits via erase), write in native word granularity padding the
//! final partial word with the erased value, then read the region back
//! and compare byte for byte. A mismatch is fatal; worn or corrupt flash
//! is never silently accepted.

use embedded_storage::nor_flash::NorFlash;

use crate::error::{Error, Result};
use crate::fmt::{debug, info};
use crate::metadata::Metadata;

/// Largest write granularity the padding buffer supports.
const MAX_WRITE_WORD: usize = 8;

/// Offsets of the reserved regions within the flash device.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlashLayout {
    /// Page holding the metadata record. Dedicated: nothing else lives on
    /// this page, so rewriting it never touches firmware bytes.
    pub metadata_offset: u32,
    /// First byte of the firmware image region.
    pub firmware_offset: u32,
    /// Bytes reserved for the image plus its trailing release message.
    pub firmware_capacity: u32,
}

impl FlashLayout {
    /// The production layout from the `consts` crate.
    pub const fn device() -> Self {
        const CAPACITY: usize = {
            let total = consts::MAX_FIRMWARE_SIZE + consts::MAX_MESSAGE_SIZE;
            let page = consts::FLASH_PAGE_SIZE;
            ((total + page - 1) / page) * page
        };
        FlashLayout {
            metadata_offset: consts::METADATA_OFFSET,
            firmware_offset: consts::FIRMWARE_OFFSET,
            firmware_capacity: CAPACITY as u32,
        }
    }
}

/// The single owner of all non-volatile writes.
///
/// Wraps the raw flash driver with the layout above; the rest of the core
/// never sees a flash address, only metadata records and image bytes.
pub struct NonVolatileStore<F> {
    flash: F,
    layout: FlashLayout,
}

impl<F: NorFlash> NonVolatileStore<F> {
    pub fn new(flash: F, layout: FlashLayout) -> Self {
        debug_assert!(layout.metadata_offset % F::ERASE_SIZE as u32 == 0);
        debug_assert!(layout.firmware_offset % F::ERASE_SIZE as u32 == 0);
        debug_assert!(F::ERASE_SIZE <= consts::FLASH_PAGE_SIZE);
        debug_assert!(F::WRITE_SIZE <= MAX_WRITE_WORD);
        NonVolatileStore { flash, layout }
    }

    pub fn layout(&self) -> &FlashLayout {
        &self.layout
    }

    /// Access to the underlying driver, for board bring-up paths that
    /// need the raw device (and for test inspection).
    pub fn flash_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    /// Reads the metadata record. `None` while the page is in its factory
    /// (all-bits-set) state, i.e. no firmware has ever been installed.
    pub fn read_metadata(&mut self) -> Result<Option<Metadata>> {
        let mut raw = [0u8; Metadata::ENCODED_SIZE];
        self.flash
            .read(self.layout.metadata_offset, &mut raw)
            .map_err(|_| Error::Program)?;
        Ok(Metadata::from_bytes(raw))
    }

    /// Commits a metadata record: one erase of the dedicated page and a
    /// single aligned word write, verified by read-back.
    pub fn write_metadata(&mut self, meta: Metadata) -> Result<()> {
        info!(
            "committing metadata version={} size={}",
            meta.version, meta.size
        );
        self.program_page(self.layout.metadata_offset, &meta.to_bytes())
    }

    /// Erases the page at `offset` and programs `data` into its head.
    ///
    /// `offset` must be page-aligned and `data` at most one page. A
    /// trailing partial word is padded with `0xFF` rather than left
    /// indeterminate. Fails with [`Error::Verify`] if the read-back does
    /// not match.
    pub fn program_page(&mut self, offset: u32, data: &[u8]) -> Result<()> {
        let page = F::ERASE_SIZE;
        if offset % page as u32 != 0 || data.len() > page {
            return Err(Error::Program);
        }
        debug!("programming page at {:#x}, {} bytes", offset, data.len());
        self.flash
            .erase(offset, offset + page as u32)
            .map_err(|_| Error::Program)?;

        let full = data.len() - data.len() % F::WRITE_SIZE;
        if full > 0 {
            self.flash
                .write(offset, &data[..full])
                .map_err(|_| Error::Program)?;
        }
        if full < data.len() {
            let mut word = [consts::FLASH_ERASED; MAX_WRITE_WORD];
            word[..data.len() - full].copy_from_slice(&data[full..]);
            self.flash
                .write(offset + full as u32, &word[..F::WRITE_SIZE])
                .map_err(|_| Error::Program)?;
        }
        self.verify(offset, data)
    }

    /// Reads raw bytes back out of the store.
    pub fn read_back(&mut self, offset: u32, buf: &mut [u8]) -> Result<()> {
        self.flash.read(offset, buf).map_err(|_| Error::Program)
    }

    /// Byte-exact comparison of a just-programmed region against its
    /// source, padding included.
    fn verify(&mut self, offset: u32, data: &[u8]) -> Result<()> {
        let written = data.len().div_ceil(F::WRITE_SIZE) * F::WRITE_SIZE;
        let mut chunk = [0u8; 64];
        let mut pos = 0;
        while pos < written {
            let n = (written - pos).min(chunk.len());
            self.flash
                .read(offset + pos as u32, &mut chunk[..n])
                .map_err(|_| Error::Program)?;
            for (i, got) in chunk[..n].iter().enumerate() {
                let want = data
                    .get(pos + i)
                    .copied()
                    .unwrap_or(consts::FLASH_ERASED);
                if *got != want {
                    return Err(Error::Verify);
                }
            }
            pos += n;
        }
        Ok(())
    }

    /// Programs a firmware image and its release message into the
    /// firmware region.
    ///
    /// The message is placed directly after the image bytes: when the
    /// image leaves room in its last page the two share that page (staged
    /// together so the page is only erased once), otherwise the message
    /// starts on the next page. It never overlaps another page's firmware
    /// bytes.
    pub fn install_image(&mut self, firmware: &[u8], message: &[u8]) -> Result<()> {
        let page = F::ERASE_SIZE;
        let total = firmware.len() + message.len();
        if total.div_ceil(page) * page > self.layout.firmware_capacity as usize {
            return Err(Error::Oversize);
        }

        let base = self.layout.firmware_offset;
        let full_pages = firmware.len() / page;
        for i in 0..full_pages {
            self.program_page(
                base + (i * page) as u32,
                &firmware[i * page..(i + 1) * page],
            )?;
        }

        let rem = firmware.len() % page;
        let mut next = base + (full_pages * page) as u32;
        let mut msg = message;
        if rem > 0 {
            let mut staging = [consts::FLASH_ERASED; consts::FLASH_PAGE_SIZE];
            let fit = msg.len().min(page - rem);
            staging[..rem].copy_from_slice(&firmware[full_pages * page..]);
            staging[rem..rem + fit].copy_from_slice(&msg[..fit]);
            self.program_page(next, &staging[..rem + fit])?;
            msg = &msg[fit..];
            next += page as u32;
        }
        while !msg.is_empty() {
            let n = msg.len().min(page);
            self.program_page(next, &msg[..n])?;
            msg = &msg[n..];
            next += page as u32;
        }
        info!("installed {} firmware bytes", firmware.len());
        Ok(())
    }

    /// Reads the NUL-terminated release message stored just past an
    /// installed image of `size` bytes. Returns the message without its
    /// terminator.
    pub fn release_message<'a>(&mut self, size: u16, buf: &'a mut [u8]) -> Result<&'a [u8]> {
        let offset = self.layout.firmware_offset + size as u32;
        let avail = self
            .layout
            .firmware_capacity
            .saturating_sub(size as u32) as usize;
        let n = buf.len().min(avail);
        if n == 0 {
            return Err(Error::Framing);
        }
        self.read_back(offset, &mut buf[..n])?;
        let end = buf[..n]
            .iter()
            .position(|&b| b == 0)
            .ok_or(Error::Framing)?;
        Ok(&buf[..end])
    }
}
