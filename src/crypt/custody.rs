//-
// Copyright (c) 2024, Jason Lingle
//
// This file is part of Mailbridge.
//
// Mailbridge is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Mailbridge is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for
// more details.
//
// You should have received a copy of the GNU General Public License along with
// Mailbridge. If not, see <http://www.gnu.org/licenses/>.

//! Custody of the user's password between host login and webmail login.
//!
//! At host login time, a fresh passphrase and RSA key pair are generated. The
//! password is encrypted with the public key, which is then thrown away. The
//! private key is exported as a PEM file locked with the passphrase and kept
//! in the server-side host session, while the passphrase and the ciphertext
//! are handed to the browser as cookies.
//!
//! Recovering the password thus requires the session store *and* the cookie
//! jar: the session alone yields only a locked key, the cookies alone only a
//! ciphertext and the key to a lock nobody holds.
//!
//! Every failure in here is reported as `Error::Crypto`. Callers are expected
//! to treat it as "cannot log in" rather than anything more specific.

use std::fmt;

use openssl::{
    pkey::{Private, Public},
    rsa::{Padding, Rsa},
    symm::Cipher,
};
use rand::{rngs::OsRng, Rng};
use secstr::SecStr;

use crate::support::error::Error;

/// Default RSA key size for the one-time key pairs.
pub const RSA_BITS: u32 = 2048;
/// Smallest key size accepted from configuration. A 1024-bit key carries
/// passwords of up to 86 bytes.
pub const MIN_RSA_BITS: u32 = 1024;
/// Largest key size accepted from configuration.
pub const MAX_RSA_BITS: u32 = 8192;
/// Bytes of randomness behind each passphrase.
const TOKEN_BYTES: usize = 32;
/// Space consumed by OAEP (SHA-1) padding within one RSA block.
const OAEP_OVERHEAD: usize = 42;

/// A plaintext password.
///
/// The bytes live in memory that is locked from paging where possible and
/// zeroed on drop. `Debug` does not reveal the content.
#[derive(Clone, PartialEq)]
pub struct Password(SecStr);

impl Password {
    pub fn new(password: String) -> Self {
        Password(SecStr::new(password.into_bytes()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.unsecure()
    }

    /// Copy the password out as a `String`, for handing to the HTTP form
    /// encoder.
    ///
    /// The copy is ordinary heap memory and is not zeroed when dropped. Only
    /// build it immediately before the request that carries it, and let it
    /// drop with that request.
    pub fn to_form_value(&self) -> String {
        String::from_utf8_lossy(self.0.unsecure()).into_owned()
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Password(..)")
    }
}

/// The random unlocking secret for a private key.
#[derive(Clone, PartialEq)]
pub struct Passphrase(SecStr);

impl Passphrase {
    /// Wrap a passphrase as received back from the browser.
    pub fn from_cookie(value: String) -> Self {
        Passphrase(SecStr::new(value.into_bytes()))
    }

    /// The value to place in the passphrase cookie.
    pub fn to_cookie_value(&self) -> String {
        String::from_utf8_lossy(self.0.unsecure()).into_owned()
    }

    fn as_bytes(&self) -> &[u8] {
        self.0.unsecure()
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Passphrase(..)")
    }
}

/// A freshly generated key pair.
///
/// `private_key` is the PEM of the private key, encrypted with the passphrase
/// that was given to `generate_key_pair`. It is safe to store server-side
/// without further protection. `public_key` is an unprotected PEM.
pub struct KeyPair {
    pub public_key: String,
    pub private_key: String,
}

/// Generate a cryptographically secure random passphrase.
///
/// The result carries 256 bits of entropy, encoded as unpadded URL-safe
/// base64 so that it can be used as a cookie value as-is.
pub fn generate_token() -> Passphrase {
    let bytes: [u8; TOKEN_BYTES] = OsRng.gen();
    Passphrase(SecStr::new(
        base64::encode_config(&bytes[..], base64::URL_SAFE_NO_PAD).into_bytes(),
    ))
}

/// Generate a `RSA_BITS`-bit key pair whose private half is locked with
/// `passphrase`.
pub fn generate_key_pair(passphrase: &Passphrase) -> Result<KeyPair, Error> {
    generate_key_pair_with_bits(passphrase, RSA_BITS)
}

pub fn generate_key_pair_with_bits(
    passphrase: &Passphrase,
    bits: u32,
) -> Result<KeyPair, Error> {
    let rsa = Rsa::generate(bits)
        .map_err(|_| Error::Crypto("key generation failed"))?;
    export_key_pair(&rsa, passphrase)
}

pub(crate) fn export_key_pair(
    rsa: &Rsa<Private>,
    passphrase: &Passphrase,
) -> Result<KeyPair, Error> {
    let private_key = rsa
        .private_key_to_pem_passphrase(
            // AEAD ciphers aren't supported here
            Cipher::aes_256_cbc(),
            passphrase.as_bytes(),
        )
        .map_err(|_| Error::Crypto("private key export failed"))?;
    let public_key = rsa
        .public_key_to_pem()
        .map_err(|_| Error::Crypto("public key export failed"))?;

    Ok(KeyPair {
        public_key: pem_to_string(public_key)?,
        private_key: pem_to_string(private_key)?,
    })
}

/// Encrypt `plaintext` for the holder of the private half of `public_key`.
///
/// Returns the base64 of the ciphertext. Passwords longer than what a single
/// OAEP block can carry (214 bytes for a 2048-bit key) are rejected.
pub fn public_encrypt(
    plaintext: &Password,
    public_key: &str,
) -> Result<String, Error> {
    let rsa: Rsa<Public> = Rsa::public_key_from_pem(public_key.as_bytes())
        .map_err(|_| Error::Crypto("malformed public key"))?;

    let block_size = rsa.size() as usize;
    if plaintext.as_bytes().len() > block_size.saturating_sub(OAEP_OVERHEAD) {
        return Err(Error::Crypto("password too long for key"));
    }

    let mut ciphertext = vec![0u8; block_size];
    let len = rsa
        .public_encrypt(
            plaintext.as_bytes(),
            &mut ciphertext,
            Padding::PKCS1_OAEP,
        )
        .map_err(|_| Error::Crypto("encryption failed"))?;
    ciphertext.truncate(len);

    Ok(base64::encode(&ciphertext))
}

/// Recover the plaintext produced by `public_encrypt`.
///
/// `encrypted_private_key` is first unlocked with `passphrase`, then used to
/// decrypt `ciphertext`. Every way this can go wrong collapses into
/// `Error::Crypto`.
pub fn private_decrypt(
    ciphertext: &str,
    encrypted_private_key: &str,
    passphrase: &Passphrase,
) -> Result<Password, Error> {
    let ciphertext = base64::decode(ciphertext.trim())
        .map_err(|_| Error::Crypto("ciphertext is not base64"))?;
    let rsa = Rsa::private_key_from_pem_passphrase(
        encrypted_private_key.as_bytes(),
        passphrase.as_bytes(),
    )
    .map_err(|_| Error::Crypto("wrong passphrase or corrupt private key"))?;

    if ciphertext.len() != rsa.size() as usize {
        return Err(Error::Crypto("ciphertext does not match key"));
    }

    let mut plaintext = SecStr::new(vec![0u8; rsa.size() as usize]);
    let len = rsa
        .private_decrypt(
            &ciphertext,
            plaintext.unsecure_mut(),
            Padding::PKCS1_OAEP,
        )
        .map_err(|_| Error::Crypto("ciphertext does not match key"))?;

    let plaintext = &plaintext.unsecure()[..len];
    match std::str::from_utf8(plaintext) {
        Ok(s) => Ok(Password::new(s.to_owned())),
        Err(_) => Err(Error::Crypto("decrypted password is not UTF-8")),
    }
}

fn pem_to_string(pem: Vec<u8>) -> Result<String, Error> {
    String::from_utf8(pem).map_err(|_| Error::Crypto("PEM is not ASCII"))
}
