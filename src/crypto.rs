//! Event payload decryption
//!
//! Replays recorded with file version 6 or later may set the encrypted flag
//! in the file header, in which case every event and checkpoint payload is
//! AES-256 in ECB mode with PKCS#7 padding, keyed by the `encryption_key`
//! array stored in the header.

use aes::cipher::{generic_array::GenericArray, BlockDecrypt, KeyInit};
use aes::Aes256;

use crate::error::{Error, Result};

/// AES block size in bytes
pub const BLOCK_SIZE: usize = 16;

/// Decrypt an event payload and strip its PKCS#7 padding
pub fn decrypt_aes_ecb(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }

    if !data.len().is_multiple_of(BLOCK_SIZE) {
        return Err(Error::Decryption(format!(
            "Data length {} is not a multiple of {}",
            data.len(),
            BLOCK_SIZE
        )));
    }

    let cipher = Aes256::new_from_slice(key)
        .map_err(|_| Error::Decryption(format!("Invalid key length {}", key.len())))?;

    let mut buffer = data.to_vec();
    for block in buffer.chunks_exact_mut(BLOCK_SIZE) {
        cipher.decrypt_block(GenericArray::from_mut_slice(block));
    }

    strip_pkcs7(&mut buffer)?;
    Ok(buffer)
}

fn strip_pkcs7(buffer: &mut Vec<u8>) -> Result<()> {
    let pad = match buffer.last() {
        Some(&pad) => pad as usize,
        None => return Ok(()),
    };
    let valid = (1..=BLOCK_SIZE).contains(&pad)
        && pad <= buffer.len()
        && buffer[buffer.len() - pad..].iter().all(|&b| b as usize == pad);
    if !valid {
        return Err(Error::Decryption("Invalid PKCS#7 padding".to_string()));
    }
    buffer.truncate(buffer.len() - pad);
    Ok(())
}

/// Encrypt with AES-256-ECB and PKCS#7 padding, the inverse of
/// [`decrypt_aes_ecb`]; used to build encrypted fixtures
#[cfg(test)]
pub(crate) fn encrypt_aes_ecb(key: &[u8], data: &[u8]) -> Vec<u8> {
    use aes::cipher::BlockEncrypt;

    let cipher = Aes256::new_from_slice(key).unwrap();
    let pad = BLOCK_SIZE - data.len() % BLOCK_SIZE;
    let mut buffer = data.to_vec();
    buffer.extend(std::iter::repeat(pad as u8).take(pad));
    for block in buffer.chunks_exact_mut(BLOCK_SIZE) {
        cipher.encrypt_block(GenericArray::from_mut_slice(block));
    }
    buffer
}
