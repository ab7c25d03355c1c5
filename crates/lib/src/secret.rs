//! Secret material for generated pseudonyms.
//!
//! Generated pseudonyms get a random password that nobody knows; users sign
//! in through SSO or reset it. Only its Argon2id hash is stored.

use argon2::{
    Argon2,
    password_hash::{PasswordHasher, SaltString, rand_core},
};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::RngCore;
use zeroize::Zeroize;

use crate::Result;
use crate::reconcile::ReconcileError;

/// Number of random bytes in a generated password.
pub const PASSWORD_BYTES: usize = 24;

/// A hashed password ready to be stored on a pseudonym.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecretMaterial {
    /// Argon2id hash in PHC format.
    pub crypted_password: String,
    /// The salt embedded in the hash, kept alongside it the way the store expects.
    pub password_salt: String,
}

/// Generate a random password and hash it.
///
/// The plaintext is zeroized before returning.
pub fn generate() -> Result<SecretMaterial> {
    let mut bytes = [0u8; PASSWORD_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    let mut password = Base64UrlUnpadded::encode_string(&bytes);
    bytes.zeroize();

    let material = hash_password(&password);
    password.zeroize();
    material
}

/// Hash a password using Argon2id with a fresh salt.
pub fn hash_password(password: impl AsRef<str>) -> Result<SecretMaterial> {
    let salt = SaltString::generate(&mut rand_core::OsRng);

    let crypted_password = Argon2::default()
        .hash_password(password.as_ref().as_bytes(), &salt)
        .map_err(|e| ReconcileError::SecretGeneration {
            reason: format!("Password hashing failed: {e}"),
        })?
        .to_string();

    Ok(SecretMaterial {
        crypted_password,
        password_salt: salt.as_str().to_string(),
    })
}
