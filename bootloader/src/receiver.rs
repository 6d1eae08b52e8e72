// SPDX-License-Identifier: GPL-3.0-or-later

//! Frame protocol receiver: turns the serial byte stream into one
//! contiguous ciphertext blob of a size announced up front.
//!
//! Session shape: clear session header, then data frames of
//! `marker / length / payload / SHA-256 digest`, closed by a zero-length
//! frame. Every accepted frame is acknowledged with `OK`; any failure is
//! reported upward and ends the session (the dispatcher signals `ERROR`
//! and resets). Size bounds are enforced before the buffer is touched,
//! and the write cursor is checked before every append, never after.

use embedded_io::{Read, Write};
use host_protocol::{
    FrameHeader, SessionHeader, Status, FRAME_DIGEST_SIZE, FRAME_HEADER_SIZE, FRAME_START_MARKER,
    SESSION_HEADER_SIZE,
};

use crate::crypto::{frame_digest, CIPHER_BLOCK_SIZE};
use crate::error::{Error, Result};
use crate::fmt::{debug, info};
use crate::BlobBuffer;

fn read_exact<S: Read>(serial: &mut S, buf: &mut [u8]) -> Result<()> {
    serial.read_exact(buf).map_err(|_| Error::Serial)
}

fn ack<S: Write>(serial: &mut S, status: Status) -> Result<()> {
    serial
        .write_all(&[status.as_byte()])
        .map_err(|_| Error::Serial)
}

/// Receives one session's ciphertext into `blob`.
///
/// `blob` is cleared on entry; on success it holds exactly
/// `header.blob_size` bytes and the validated header is returned. On any
/// error the buffer contents are meaningless and the session must be
/// abandoned.
pub fn receive_blob<S>(serial: &mut S, blob: &mut BlobBuffer) -> Result<SessionHeader>
where
    S: Read + Write,
{
    blob.clear();

    let mut raw = [0u8; SESSION_HEADER_SIZE];
    read_exact(serial, &mut raw)?;
    let header = SessionHeader::from_bytes(&raw);

    // Bounds come first: nothing is buffered or indexed until the
    // declared size has been checked against the compile-time capacity.
    let blob_size = header.blob_size as usize;
    if blob_size > blob.capacity() {
        return Err(Error::Oversize);
    }
    if blob_size == 0 || blob_size % CIPHER_BLOCK_SIZE != 0 {
        return Err(Error::Framing);
    }
    if header.message_size == 0 || header.message_size as usize > consts::MAX_MESSAGE_SIZE {
        return Err(Error::Oversize);
    }
    info!(
        "update session: {} ciphertext bytes, {} byte message",
        header.blob_size, header.message_size
    );
    ack(serial, Status::Ok)?;

    loop {
        let mut raw = [0u8; FRAME_HEADER_SIZE];
        read_exact(serial, &mut raw)?;
        let frame = FrameHeader::from_bytes(&raw);

        if frame.marker != FRAME_START_MARKER {
            return Err(Error::Framing);
        }
        if frame.length == 0 {
            ack(serial, Status::Ok)?;
            break;
        }

        let length = frame.length as usize;
        // Cursor discipline: checked against the declared size before the
        // payload is read, so an overlong transfer never reaches the
        // buffer.
        if blob.len() + length > blob_size {
            return Err(Error::BufferOverrun);
        }

        let start = blob.len();
        blob.resize(start + length, 0)
            .map_err(|_| Error::BufferOverrun)?;
        read_exact(serial, &mut blob[start..])?;

        let mut digest = [0u8; FRAME_DIGEST_SIZE];
        read_exact(serial, &mut digest)?;
        if frame_digest(&blob[start..]) != digest {
            return Err(Error::Framing);
        }
        debug!("frame accepted, cursor at {}", blob.len());
        ack(serial, Status::Ok)?;
    }

    if blob.len() != blob_size {
        return Err(Error::Framing);
    }
    info!("transfer complete, {} bytes received", blob.len());
    Ok(header)
}
