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

//! Kerberos authentication provider for identityd.
//!
//! PAM authenticate and change-password requests are serviced by a
//! short-lived helper process that owns all Kerberos library interaction.
//! The provider resolves the user principal from the local cache, spawns
//! the helper de-privileged to the target user, ships the request over a
//! pipe and maps the helper's reply back onto the PAM carrier. The
//! request state machine lives in `auth`.

mod auth;
mod child;
pub mod protocol;
mod transport;

pub use child::{spawn_reaper, ChildError, ChildExchange, HelperExchange};

use std::env;
use std::path::PathBuf;
use std::rc::Rc;

use async_trait::async_trait;
use identityd_provider_common::{
	AuthProvider, ConfDb, DomainInfo, InitError, OfflineState, PamData, Sysdb,
};
use tracing::debug;

const LOG_TARGET: &str = "identityd::krb5";

/// Environment variables exported for the helper and the PAM stack.
pub const SSSD_KDC: &str = "SSSD_KDC";
pub const SSSD_REALM: &str = "SSSD_REALM";
pub const SSSD_KRB5_CHANGEPW_PRINCIPLE: &str = "SSSD_KRB5_CHANGEPW_PRINCIPLE";

/// Configuration keys consumed at init.
pub const CONFDB_KRB5_KDCIP: &str = "krb5KDCIP";
pub const CONFDB_KRB5_REALM: &str = "krb5REALM";
pub const CONFDB_KRB5_TRY_SIMPLE_UPN: &str = "krb5try_simple_upn";
pub const CONFDB_KRB5_CHANGEPW_PRINCIPLE: &str = "krb5changepw_principle";
pub const CONFDB_KRB5_CHILD_PATH: &str = "krb5child_path";

const DEFAULT_CHANGEPW_PRINCIPAL: &str = "kadmin/changepw";
const DEFAULT_CHILD_PATH: &str = "/usr/libexec/identityd/krb5_child";

/// The Kerberos auth backend module.
pub struct Krb5Provider {
	realm: Option<String>,
	kdcip: Option<String>,
	changepw_principal: String,
	try_simple_upn: bool,
	cache_credentials: bool,
	offline: Rc<OfflineState>,
	sysdb: Rc<dyn Sysdb>,
	exchange: Box<dyn ChildExchange>,
}

impl std::fmt::Debug for Krb5Provider {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Krb5Provider")
			.field("realm", &self.realm)
			.field("kdcip", &self.kdcip)
			.field("changepw_principal", &self.changepw_principal)
			.field("try_simple_upn", &self.try_simple_upn)
			.field("cache_credentials", &self.cache_credentials)
			.finish_non_exhaustive()
	}
}

impl Krb5Provider {
	/// Module init. Reads the provider configuration, exports the helper
	/// environment and registers the child reaper, so it must run inside
	/// the backend event loop.
	pub fn init(
		conf: &ConfDb,
		domain: &DomainInfo,
		offline: Rc<OfflineState>,
		sysdb: Rc<dyn Sysdb>,
	) -> Result<Self, InitError> {
		let kdcip = conf.get_string(CONFDB_KRB5_KDCIP, None);
		match &kdcip {
			Some(value) => env::set_var(SSSD_KDC, value),
			None => debug!(
				target: LOG_TARGET,
				"missing {CONFDB_KRB5_KDCIP}, authentication might fail"
			),
		}

		let realm = conf.get_string(CONFDB_KRB5_REALM, None);
		match &realm {
			Some(value) => env::set_var(SSSD_REALM, value),
			None => debug!(
				target: LOG_TARGET,
				"missing {CONFDB_KRB5_REALM}, authentication might fail"
			),
		}

		let try_simple_upn = conf.get_bool(CONFDB_KRB5_TRY_SIMPLE_UPN, false)?;

		let mut changepw_principal = conf
			.get_string(CONFDB_KRB5_CHANGEPW_PRINCIPLE, Some(DEFAULT_CHANGEPW_PRINCIPAL))
			.unwrap_or_else(|| DEFAULT_CHANGEPW_PRINCIPAL.to_owned());
		if !changepw_principal.contains('@') {
			if let Some(realm) = &realm {
				changepw_principal = format!("{changepw_principal}@{realm}");
			}
		}
		env::set_var(SSSD_KRB5_CHANGEPW_PRINCIPLE, &changepw_principal);

		let helper_path = conf
			.get_string(CONFDB_KRB5_CHILD_PATH, Some(DEFAULT_CHILD_PATH))
			.unwrap_or_else(|| DEFAULT_CHILD_PATH.to_owned());

		child::spawn_reaper().map_err(|err| InitError::EventLoop(err.to_string()))?;

		Ok(Krb5Provider {
			realm,
			kdcip,
			changepw_principal,
			try_simple_upn,
			cache_credentials: domain.cache_credentials,
			offline,
			sysdb,
			exchange: Box::new(HelperExchange::new(PathBuf::from(helper_path))),
		})
	}

	/// The change-password principal, realm suffix included.
	pub fn changepw_principal(&self) -> &str {
		&self.changepw_principal
	}
}

#[async_trait(?Send)]
impl AuthProvider for Krb5Provider {
	async fn pam_handler(&self, pd: &mut PamData) {
		self.handle_pam(pd).await
	}
}
