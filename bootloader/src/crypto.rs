// SPDX-License-Identifier: GPL-3.0-or-later

//! Authenticated decryption of the update blob: Encrypt-then-MAC with
//! AES-256-CBC under an HMAC-SHA256 tag over `iv || ciphertext`, plus the
//! unkeyed SHA-256 transport digest carried by each frame.
//!
//! Verification fails closed: plaintext is only ever produced after the
//! session tag has verified, so a forged blob is discarded without a
//! single decrypted byte leaving this module.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use host_protocol::{FRAME_DIGEST_SIZE, IV_SIZE, TAG_SIZE};

type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// AES block size; the blob ciphertext is always a multiple of this.
pub const CIPHER_BLOCK_SIZE: usize = 16;

/// Pre-provisioned symmetric key material. Provisioning itself is out of
/// scope; the board integration hands these in at startup.
pub struct UpdateKeys {
    /// AES-256 key for the blob cipher.
    pub cipher: [u8; 32],
    /// HMAC-SHA256 key for the session tag.
    pub auth: [u8; 32],
}

/// Verifies the session tag and decrypts the blob in place.
///
/// The tag comparison runs through [`Mac::verify_slice`], which compares
/// in constant time; this is the last line of defense against forged
/// updates. Returns the unpadded plaintext length on success. On any
/// failure the buffer contents are untrusted and must be discarded by the
/// caller.
pub fn open_blob(
    blob: &mut [u8],
    iv: &[u8; IV_SIZE],
    tag: &[u8; TAG_SIZE],
    keys: &UpdateKeys,
) -> Result<usize> {
    if blob.is_empty() || blob.len() % CIPHER_BLOCK_SIZE != 0 {
        return Err(Error::Framing);
    }
    let mut mac = HmacSha256::new_from_slice(&keys.auth).map_err(|_| Error::Authentication)?;
    mac.update(iv);
    mac.update(blob);
    mac.verify_slice(tag).map_err(|_| Error::Authentication)?;

    let dec =
        Aes256CbcDec::new_from_slices(&keys.cipher, iv).map_err(|_| Error::Authentication)?;
    let plain = dec
        .decrypt_padded_mut::<Pkcs7>(blob)
        .map_err(|_| Error::Authentication)?;
    Ok(plain.len())
}

/// Inverse of [`open_blob`]: pads and encrypts `plaintext` into `out` and
/// returns the ciphertext length and session tag. Used by host-side
/// tooling to produce the update stream, and by the test suite.
pub fn seal_blob(
    plaintext: &[u8],
    iv: &[u8; IV_SIZE],
    keys: &UpdateKeys,
    out: &mut [u8],
) -> Result<(usize, [u8; TAG_SIZE])> {
    let enc =
        Aes256CbcEnc::new_from_slices(&keys.cipher, iv).map_err(|_| Error::Authentication)?;
    let ciphertext = enc
        .encrypt_padded_b2b_mut::<Pkcs7>(plaintext, out)
        .map_err(|_| Error::BufferOverrun)?;
    let len = ciphertext.len();

    let mut mac = HmacSha256::new_from_slice(&keys.auth).map_err(|_| Error::Authentication)?;
    mac.update(iv);
    mac.update(ciphertext);
    let tag = mac.finalize().into_bytes().into();
    Ok((len, tag))
}

/// SHA-256 transport digest protecting a single frame payload.
pub fn frame_digest(payload: &[u8]) -> [u8; FRAME_DIGEST_SIZE] {
    Sha256::digest(payload).into()
}
