// SPDX-License-Identifier: GPL-3.0-or-later

//! Boot launcher: locate the installed image, emit its release message on
//! the debug channel, hand over the processor.

use core::convert::Infallible;

use embedded_io::Write;
use embedded_storage::nor_flash::NorFlash;

use crate::error::{Error, Result};
use crate::flash::NonVolatileStore;
use crate::fmt::info;
use crate::hardware::BootJump;

/// Boots the installed firmware. Never returns on success.
///
/// The release message sits at `firmware_offset + size` as committed by
/// the last update; it is printed on the (non-authenticated) debug
/// channel only. Booting out of an unprovisioned store is refused: there
/// is nothing to jump into but erased flash.
pub fn boot_firmware<F, D, J>(
    store: &mut NonVolatileStore<F>,
    debug: &mut D,
    jump: &mut J,
) -> Result<Infallible>
where
    F: NorFlash,
    D: Write,
    J: BootJump,
{
    let meta = store.read_metadata()?.ok_or(Error::NoFirmware)?;
    info!(
        "booting firmware version {} ({} bytes)",
        meta.version, meta.size
    );

    let mut buf = [0u8; consts::MAX_MESSAGE_SIZE];
    let message = store.release_message(meta.size, &mut buf)?;
    let _ = debug.write_all(message);
    let _ = debug.write_all(b"\r\n");
    let _ = debug.flush();

    let entry = store.layout().firmware_offset;
    // One-way door from here.
    unsafe { jump.jump(entry) }
}
