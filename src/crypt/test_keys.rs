use lazy_static::lazy_static;
use openssl::pkey::Private;
use openssl::rsa::Rsa;

use super::custody::{export_key_pair, generate_token, KeyPair, Passphrase};

lazy_static! {
    pub static ref RSA1024A: Rsa<Private> = Rsa::generate(1024).unwrap();
    /// Passphrase locking `TEST_PAIR`.
    pub static ref TEST_PASSPHRASE: Passphrase = generate_token();
    /// `RSA1024A` exported the way host login exports fresh pairs.
    pub static ref TEST_PAIR: KeyPair =
        export_key_pair(&RSA1024A, &TEST_PASSPHRASE).unwrap();
}
