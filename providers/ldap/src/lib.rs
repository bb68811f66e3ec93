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

//! Directory identity provider for identityd.
//!
//! Serves user, group and initgroups lookups over a single authenticated
//! directory connection, and keeps the local cache warm with a periodic
//! full-enumeration sweep driven by modification-timestamp watermarks.

pub mod client;
pub mod options;

mod conn;
mod enumerate;
mod id;

#[cfg(test)]
mod testing;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use async_trait::async_trait;
use identityd_provider_common::{
	AccountInfoProvider, AccountRequest, BackendError, DomainInfo, InitError, OfflineState,
	OnlineStatus, Sysdb,
};
use tokio::time::Instant;

use client::{DirectoryClient, DirectoryHandle};
use options::DirOptions;

const LOG_TARGET: &str = "identityd::ldap";

/// The directory identity backend module.
pub struct LdapProvider {
	opts: DirOptions,
	client: Rc<dyn DirectoryClient>,
	sysdb: Rc<dyn Sysdb>,
	offline: Rc<OfflineState>,
	/// The single live directory handle, if any.
	handle: RefCell<Option<Rc<dyn DirectoryHandle>>>,
	/// When the current enumeration iteration started.
	last_run: Cell<Option<Instant>>,
	max_user_timestamp: RefCell<Option<String>>,
	max_group_timestamp: RefCell<Option<String>>,
}

impl LdapProvider {
	/// Module init. Applies the global TLS option and, for enumerating
	/// domains, installs the sweep task on the backend event loop; the
	/// first sweep runs immediately. Must run inside a local task
	/// context — failing to install the sweep is fatal at startup.
	pub fn init(
		opts: DirOptions,
		domain: &DomainInfo,
		offline: Rc<OfflineState>,
		sysdb: Rc<dyn Sysdb>,
		client: Rc<dyn DirectoryClient>,
	) -> Result<Rc<Self>, InitError> {
		if let Some(mode) = opts.tls_reqcert {
			client
				.set_tls_require_cert(mode)
				.map_err(|err| InitError::TlsOption(err.to_string()))?;
		}

		let provider = Rc::new(LdapProvider {
			opts,
			client,
			sysdb,
			offline,
			handle: RefCell::new(None),
			last_run: Cell::new(None),
			max_user_timestamp: RefCell::new(None),
			max_group_timestamp: RefCell::new(None),
		});

		if domain.enumerate {
			enumerate::spawn(provider.clone());
		}

		Ok(provider)
	}
}

#[async_trait(?Send)]
impl AccountInfoProvider for LdapProvider {
	async fn account_handler(&self, req: &AccountRequest) -> Result<(), BackendError> {
		self.get_account_info(req).await
	}

	fn check_online(&self) -> OnlineStatus {
		if self.offline.is_offline() {
			OnlineStatus::Offline
		} else {
			OnlineStatus::Online
		}
	}

	async fn finalize(&self) {
		// nothing to tear down; the directory handle drops with the provider
	}
}

#[cfg(test)]
mod tests {
	use std::rc::Rc;

	use identityd_provider_common::test_utils::MemorySysdb;
	use identityd_provider_common::{ConfDb, DomainInfo, OfflineState};

	use crate::options::{DirOptions, TlsReqCert};
	use crate::testing::{ScriptedClient, ScriptedDirectory};
	use crate::LdapProvider;

	#[test]
	fn init_applies_the_global_tls_option_before_any_connect() {
		let dir = Rc::new(ScriptedDirectory::default());
		let mut opts = DirOptions::from_confdb(&ConfDb::new()).unwrap();
		opts.tls_reqcert = Some(TlsReqCert::Demand);
		let offline = Rc::new(OfflineState::new(opts.offline_timeout));
		let domain = DomainInfo {
			name: "example".to_owned(),
			cache_credentials: false,
			enumerate: false,
		};

		LdapProvider::init(
			opts,
			&domain,
			offline,
			Rc::new(MemorySysdb::new()),
			Rc::new(ScriptedClient(dir.clone())),
		)
		.unwrap();

		assert_eq!(dir.tls_modes.borrow().as_slice(), [TlsReqCert::Demand]);
		assert_eq!(dir.connects.get(), 0);
	}
}
