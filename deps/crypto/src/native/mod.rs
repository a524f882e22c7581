// Copyright (c) 2024 The Smartlog Connector Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! Crypto suites implemented by openssl

pub mod aes128cbc;
pub mod rsa;
