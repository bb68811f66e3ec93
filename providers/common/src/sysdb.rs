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

//! Seam to the local cache ("system database").
//!
//! The cache itself is persistence owned by the daemon; the providers
//! only drive the operations below.

use async_trait::async_trait;

use crate::error::SysdbError;
use crate::secret::SecretBuf;

/// Attribute under which a user's Kerberos principal is cached.
pub const SYSDB_UPN: &str = "userPrincipalName";

#[async_trait(?Send)]
pub trait Sysdb {
	/// Looks up one attribute of a user, returning one value per matching
	/// cache entry. A present entry without the attribute yields `None` in
	/// that slot.
	async fn user_attr(&self, user: &str, attr: &str)
		-> Result<Vec<Option<String>>, SysdbError>;

	/// Stores a verified credential for offline authentication. The
	/// implementation owns hashing and persistence; the buffer is wiped
	/// when dropped on either side.
	async fn cache_password(&self, user: &str, password: SecretBuf) -> Result<(), SysdbError>;

	/// Upserts a user entry fetched from the remote directory.
	async fn store_user(&self, name: &str, attrs: &[(String, String)])
		-> Result<(), SysdbError>;

	/// Upserts a group entry fetched from the remote directory.
	async fn store_group(&self, name: &str, attrs: &[(String, String)])
		-> Result<(), SysdbError>;

	/// Replaces the cached group memberships of a user.
	async fn store_memberships(&self, user: &str, groups: &[String])
		-> Result<(), SysdbError>;
}
