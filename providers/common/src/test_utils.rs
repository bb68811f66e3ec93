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

//! In-memory collaborator doubles for provider tests.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::SysdbError;
use crate::secret::SecretBuf;
use crate::sysdb::Sysdb;

/// In-memory stand-in for the system database.
///
/// Rows are kept as a list rather than a map so that tests can model the
/// "search returned more than one entry" anomaly.
#[derive(Default)]
pub struct MemorySysdb {
	users: RefCell<Vec<(String, HashMap<String, String>)>>,
	groups: RefCell<Vec<(String, HashMap<String, String>)>>,
	memberships: RefCell<Vec<(String, Vec<String>)>>,
	cached_passwords: RefCell<Vec<(String, Vec<u8>)>>,
	fail_password_cache: Cell<bool>,
}

impl MemorySysdb {
	pub fn new() -> Self {
		MemorySysdb::default()
	}

	pub fn add_user(&self, name: &str, attrs: &[(&str, &str)]) {
		let attrs = attrs
			.iter()
			.map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
			.collect();
		self.users.borrow_mut().push((name.to_owned(), attrs));
	}

	/// Makes every subsequent `cache_password` call fail.
	pub fn fail_password_cache(&self) {
		self.fail_password_cache.set(true);
	}

	pub fn cached_passwords(&self) -> Vec<(String, Vec<u8>)> {
		self.cached_passwords.borrow().clone()
	}

	pub fn stored_user_names(&self) -> Vec<String> {
		self.users.borrow().iter().map(|(name, _)| name.clone()).collect()
	}
}

#[async_trait(?Send)]
impl Sysdb for MemorySysdb {
	async fn user_attr(
		&self,
		user: &str,
		attr: &str,
	) -> Result<Vec<Option<String>>, SysdbError> {
		Ok(self
			.users
			.borrow()
			.iter()
			.filter(|(name, _)| name == user)
			.map(|(_, attrs)| attrs.get(attr).cloned())
			.collect())
	}

	async fn cache_password(&self, user: &str, password: SecretBuf) -> Result<(), SysdbError> {
		if self.fail_password_cache.get() {
			return Err(SysdbError::Operation("injected failure".to_owned()));
		}
		self.cached_passwords
			.borrow_mut()
			.push((user.to_owned(), password.as_bytes().to_vec()));
		Ok(())
	}

	async fn store_user(
		&self,
		name: &str,
		attrs: &[(String, String)],
	) -> Result<(), SysdbError> {
		self.users
			.borrow_mut()
			.push((name.to_owned(), attrs.iter().cloned().collect()));
		Ok(())
	}

	async fn store_group(
		&self,
		name: &str,
		attrs: &[(String, String)],
	) -> Result<(), SysdbError> {
		self.groups
			.borrow_mut()
			.push((name.to_owned(), attrs.iter().cloned().collect()));
		Ok(())
	}

	async fn store_memberships(
		&self,
		user: &str,
		groups: &[String],
	) -> Result<(), SysdbError> {
		self.memberships
			.borrow_mut()
			.push((user.to_owned(), groups.to_vec()));
		Ok(())
	}
}
