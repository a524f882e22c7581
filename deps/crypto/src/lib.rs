// Copyright (c) 2024 The Smartlog Connector Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! # Crypto
//!
//! Primitives behind the multi-recipient message envelope stored on the
//! ledger. A message body is encrypted once with a fresh AES-128-CBC key and
//! that key is wrapped with the RSA public key of every recipient
//! organisation.
//!
//! Features select the underlying implementation:
//! - `rust-crypto`: Use purely rust.
//! - `openssl`: Use openssl. If `rust-crypto` and `openssl` are both
//!   enabled, use `openssl`.
//!
//! ## Components
//!
//! - `symmetric`: content key and AES-128-CBC en/decryption
//! - `rsa`: RSA key pair and public key used to wrap content keys
//! - `envelope`: base64 helpers that produce the on-ledger representation
//! - `keyfile`: `public.key` / `private.key` DER files of an organisation

#[cfg(feature = "openssl")]
mod native;
#[cfg(all(feature = "rust-crypto", not(feature = "openssl")))]
mod rust;

mod symmetric;
pub use symmetric::*;

mod asymmetric;
pub use asymmetric::*;

mod envelope;
pub use envelope::*;

mod keyfile;
pub use keyfile::*;

pub mod rand;
