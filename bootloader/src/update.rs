// SPDX-License-Identifier: GPL-3.0-or-later

//! The update orchestrator: receive, authenticate, gate, program.
//!
//! Ordering is the whole point here. Nothing touches flash until the blob
//! has authenticated and the version has passed the rollback gate; the
//! metadata word is committed before the first firmware byte so that a
//! crash in between is detectable on the next boot (stored size/version
//! will not match the old image). That one-word-then-image sequence is an
//! explicit non-atomicity, not an accident.

use embedded_io::{Read, Write};
use embedded_storage::nor_flash::NorFlash;
use host_protocol::Status;

use crate::crypto::{open_blob, UpdateKeys};
use crate::error::{Error, Result};
use crate::flash::NonVolatileStore;
use crate::fmt::{info, warn};
use crate::image::parse_image;
use crate::metadata::{check_rollback, Metadata, RollbackPolicy};
use crate::receiver::receive_blob;
use crate::BlobBuffer;

/// Runs one complete update session.
///
/// On failure the `ERROR` status has already been put on the wire and the
/// returned error says why; the caller owns the mandatory reset. `blob`
/// is session-scoped scratch: cleared on entry, meaningless after return.
pub fn load_firmware<S, F>(
    serial: &mut S,
    store: &mut NonVolatileStore<F>,
    keys: &UpdateKeys,
    policy: RollbackPolicy,
    blob: &mut BlobBuffer,
) -> Result<()>
where
    S: Read + Write,
    F: NorFlash,
{
    match run_session(serial, store, keys, policy, blob) {
        Ok(()) => Ok(()),
        Err(err) => {
            warn!("update session failed: {}", err.as_str());
            // Best effort; the device resets either way.
            let _ = serial.write_all(&[Status::Error.as_byte()]);
            Err(err)
        }
    }
}

fn run_session<S, F>(
    serial: &mut S,
    store: &mut NonVolatileStore<F>,
    keys: &UpdateKeys,
    policy: RollbackPolicy,
    blob: &mut BlobBuffer,
) -> Result<()>
where
    S: Read + Write,
    F: NorFlash,
{
    let header = receive_blob(serial, blob)?;

    let plain_len = open_blob(blob, &header.iv, &header.tag, keys)?;
    let image = parse_image(&blob[..plain_len], header.message_size as usize)?;

    let installed = store.read_metadata()?;
    let store_version = check_rollback(installed, image.version, policy)?;
    info!(
        "image authenticated: version {} ({} bytes), storing version {}",
        image.version,
        image.firmware.len(),
        store_version
    );

    if image.firmware.len() > u16::MAX as usize {
        return Err(Error::Oversize);
    }
    store.write_metadata(Metadata {
        version: store_version,
        size: image.firmware.len() as u16,
    })?;
    store.install_image(image.firmware, image.message)?;

    info!("firmware installed");
    Ok(())
}
