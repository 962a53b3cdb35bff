// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Random credential generation.
//!
//! Generated values are alphanumeric only. They end up on a `helm --set-string`
//! command line, where `,`, `=`, `\` and quotes carry meaning.

use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::SecretString;

const LOWERCASE_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Generate a fresh alphanumeric password of `len` characters.
pub fn generate_password(len: usize) -> SecretString {
	let value: String = rand::thread_rng()
		.sample_iter(&Alphanumeric)
		.take(len)
		.map(char::from)
		.collect();
	SecretString::new(value)
}

/// Generate a non-secret lowercase alphanumeric token, usable inside DNS labels.
pub fn random_lowercase_token(len: usize) -> String {
	let mut rng = rand::thread_rng();
	(0..len)
		.map(|_| {
			let idx = rng.gen_range(0..LOWERCASE_ALPHABET.len());
			LOWERCASE_ALPHABET[idx] as char
		})
		.collect()
}
