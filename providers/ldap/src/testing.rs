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

//! Scripted directory doubles shared by the provider tests.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use identityd_provider_common::test_utils::MemorySysdb;
use identityd_provider_common::{AccountRequest, AttrType, ConfDb, DomainInfo, EntryType,
	FilterType, OfflineState, SecretBuf, Sysdb};

use crate::client::{BindOutcome, DirError, DirectoryClient, DirectoryHandle};
use crate::options::{DirOptions, TlsReqCert};
use crate::LdapProvider;

/// Observable state of the scripted directory server.
pub(crate) struct ScriptedDirectory {
	pub connected: Cell<bool>,
	pub bind_outcome: Cell<BindOutcome>,
	pub fail_connect: Cell<bool>,
	pub fail_users: Cell<bool>,
	pub fail_groups: Cell<bool>,
	/// Time a user search takes before answering.
	pub user_delay: Cell<Option<Duration>>,
	pub user_timestamps: RefCell<VecDeque<Option<String>>>,
	pub group_timestamps: RefCell<VecDeque<Option<String>>>,
	pub connects: Cell<usize>,
	pub binds: Cell<usize>,
	pub user_filters: RefCell<Vec<String>>,
	pub group_filters: RefCell<Vec<String>>,
	pub user_attrs: RefCell<Vec<Vec<String>>>,
	pub initgroups_for: RefCell<Vec<String>>,
	pub tls_modes: RefCell<Vec<TlsReqCert>>,
}

impl Default for ScriptedDirectory {
	fn default() -> Self {
		ScriptedDirectory {
			connected: Cell::new(false),
			bind_outcome: Cell::new(BindOutcome::Success),
			fail_connect: Cell::new(false),
			fail_users: Cell::new(false),
			fail_groups: Cell::new(false),
			user_delay: Cell::new(None),
			user_timestamps: RefCell::new(VecDeque::new()),
			group_timestamps: RefCell::new(VecDeque::new()),
			connects: Cell::new(0),
			binds: Cell::new(0),
			user_filters: RefCell::new(Vec::new()),
			group_filters: RefCell::new(Vec::new()),
			user_attrs: RefCell::new(Vec::new()),
			initgroups_for: RefCell::new(Vec::new()),
			tls_modes: RefCell::new(Vec::new()),
		}
	}
}

pub(crate) struct ScriptedClient(pub Rc<ScriptedDirectory>);

#[async_trait(?Send)]
impl DirectoryClient for ScriptedClient {
	fn set_tls_require_cert(&self, mode: TlsReqCert) -> Result<(), DirError> {
		self.0.tls_modes.borrow_mut().push(mode);
		Ok(())
	}

	async fn connect(
		&self,
		_opts: &DirOptions,
		_use_start_tls: bool,
	) -> Result<Rc<dyn DirectoryHandle>, DirError> {
		self.0.connects.set(self.0.connects.get() + 1);
		if self.0.fail_connect.get() {
			return Err(DirError::Connect("scripted failure".to_owned()));
		}
		self.0.connected.set(true);
		Ok(Rc::new(ScriptedHandle(self.0.clone())))
	}
}

struct ScriptedHandle(Rc<ScriptedDirectory>);

#[async_trait(?Send)]
impl DirectoryHandle for ScriptedHandle {
	fn is_connected(&self) -> bool {
		self.0.connected.get()
	}

	async fn simple_bind(
		&self,
		_bind_dn: Option<&str>,
		_authtok: Option<&SecretBuf>,
	) -> Result<BindOutcome, DirError> {
		self.0.binds.set(self.0.binds.get() + 1);
		Ok(self.0.bind_outcome.get())
	}

	async fn get_users(
		&self,
		_sysdb: &dyn Sysdb,
		attrs: &[String],
		filter: &str,
	) -> Result<Option<String>, DirError> {
		if let Some(delay) = self.0.user_delay.get() {
			tokio::time::sleep(delay).await;
		}
		self.0.user_filters.borrow_mut().push(filter.to_owned());
		self.0.user_attrs.borrow_mut().push(attrs.to_vec());
		if self.0.fail_users.get() {
			return Err(DirError::Search("scripted failure".to_owned()));
		}
		Ok(self.0.user_timestamps.borrow_mut().pop_front().flatten())
	}

	async fn get_groups(
		&self,
		_sysdb: &dyn Sysdb,
		_attrs: &[String],
		filter: &str,
	) -> Result<Option<String>, DirError> {
		self.0.group_filters.borrow_mut().push(filter.to_owned());
		if self.0.fail_groups.get() {
			return Err(DirError::Search("scripted failure".to_owned()));
		}
		Ok(self.0.group_timestamps.borrow_mut().pop_front().flatten())
	}

	async fn get_initgroups(
		&self,
		_sysdb: &dyn Sysdb,
		name: &str,
		_attrs: &[String],
	) -> Result<(), DirError> {
		self.0.initgroups_for.borrow_mut().push(name.to_owned());
		Ok(())
	}
}

/// A provider wired to a fresh scripted directory, with default options.
pub(crate) fn scripted(enumerate: bool) -> (Rc<ScriptedDirectory>, Rc<LdapProvider>) {
	let dir = Rc::new(ScriptedDirectory::default());
	let opts = DirOptions::from_confdb(&ConfDb::new()).unwrap();
	let offline = Rc::new(OfflineState::new(opts.offline_timeout));
	let domain = DomainInfo {
		name: "example".to_owned(),
		cache_credentials: false,
		enumerate,
	};

	let provider = LdapProvider::init(
		opts,
		&domain,
		offline,
		Rc::new(MemorySysdb::new()),
		Rc::new(ScriptedClient(dir.clone())),
	)
	.unwrap();

	(dir, provider)
}

pub(crate) fn user_request(value: &str) -> AccountRequest {
	AccountRequest {
		entry_type: EntryType::User,
		filter_type: FilterType::Name,
		attr_type: AttrType::Core,
		filter_value: value.to_owned(),
	}
}
