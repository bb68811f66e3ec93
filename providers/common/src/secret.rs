// Copyright (C) identityd contributors.
// This file is part of identityd.

// identityd is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// identityd is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

// You should have received a copy of the GNU General Public License
// along with identityd.  If not, see <http://www.gnu.org/licenses/>.

//! Wipe-on-drop buffers for authentication tokens.

use std::fmt;

use zeroize::Zeroize;

/// A byte buffer holding an authentication token or another secret.
///
/// The contents are overwritten before the memory is released, and the
/// `Debug` impl never prints them.
#[derive(Default)]
pub struct SecretBuf(Vec<u8>);

impl SecretBuf {
	pub fn new(bytes: Vec<u8>) -> Self {
		SecretBuf(bytes)
	}

	pub fn as_bytes(&self) -> &[u8] {
		&self.0
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl Clone for SecretBuf {
	fn clone(&self) -> Self {
		SecretBuf(self.0.clone())
	}
}

impl From<Vec<u8>> for SecretBuf {
	fn from(bytes: Vec<u8>) -> Self {
		SecretBuf(bytes)
	}
}

impl From<&[u8]> for SecretBuf {
	fn from(bytes: &[u8]) -> Self {
		SecretBuf(bytes.to_vec())
	}
}

impl From<&str> for SecretBuf {
	fn from(text: &str) -> Self {
		SecretBuf(text.as_bytes().to_vec())
	}
}

impl Drop for SecretBuf {
	fn drop(&mut self) {
		self.0.zeroize();
	}
}

impl fmt::Debug for SecretBuf {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "SecretBuf({} bytes)", self.0.len())
	}
}
