// Copyright (c) 2024 The Smartlog Connector Authors
//
// SPDX-License-Identifier: Apache-2.0
//

pub mod rsa {
    use anyhow::{Context, Result};
    use base64::{engine::general_purpose::STANDARD, Engine};
    use strum::{AsRefStr, EnumString};

    #[cfg(feature = "openssl")]
    pub use crate::native::rsa::*;

    #[cfg(all(feature = "rust-crypto", not(feature = "openssl")))]
    pub use crate::rust::rsa::*;

    /// Definations of different Padding mode for encryption. Refer to
    /// <https://datatracker.ietf.org/doc/html/rfc7518#section-4.1> for
    /// more information.
    ///
    /// Envelope keys are wrapped with `PKCS1v15`, which is what every
    /// stored message uses.
    #[derive(EnumString, AsRefStr, Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub enum PaddingMode {
        #[strum(serialize = "RSA-OAEP")]
        OAEP,

        #[default]
        #[strum(serialize = "RSA1_5")]
        PKCS1v15,
    }

    pub const RSA_PUBKEY_LENGTH: usize = 2048;

    pub const RSA_KTY: &str = "RSA";

    impl RSAPublicKey {
        /// The form in which an organisation registers its key on the
        /// Keystore contract: base64 of the SubjectPublicKeyInfo DER.
        pub fn to_base64(&self) -> Result<String> {
            Ok(STANDARD.encode(self.to_spki_der()?))
        }

        pub fn from_base64(encoded: &str) -> Result<Self> {
            let der = STANDARD
                .decode(encoded.trim())
                .context("registered public key is not valid base64")?;
            Self::from_spki_der(&der)
        }
    }
}
