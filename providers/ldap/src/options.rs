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

//! Directory provider options and attribute maps.

use std::time::Duration;

use identityd_provider_common::{ConfDb, InitError, SecretBuf};

/// Configuration keys consumed at init.
pub const CONFDB_LDAP_URI: &str = "ldap_uri";
pub const CONFDB_LDAP_DEFAULT_BIND_DN: &str = "ldap_default_bind_dn";
pub const CONFDB_LDAP_DEFAULT_AUTHTOK_TYPE: &str = "ldap_default_authtok_type";
pub const CONFDB_LDAP_DEFAULT_AUTHTOK: &str = "ldap_default_authtok";
pub const CONFDB_LDAP_OFFLINE_TIMEOUT: &str = "ldap_offline_timeout";
pub const CONFDB_LDAP_ENUM_REFRESH_TIMEOUT: &str = "ldap_enum_refresh_timeout";
pub const CONFDB_LDAP_USE_START_TLS: &str = "ldap_id_use_start_tls";
pub const CONFDB_LDAP_TLS_REQCERT: &str = "tls_reqcert";

const DEFAULT_URI: &str = "ldap://localhost";
const DEFAULT_OFFLINE_TIMEOUT: u64 = 60;
const DEFAULT_ENUM_REFRESH_TIMEOUT: u64 = 300;

/// Certificate-checking strictness, set as a global library option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsReqCert {
	Never,
	Allow,
	Try,
	Demand,
	Hard,
}

impl TlsReqCert {
	fn parse(value: &str) -> Option<Self> {
		match value.to_ascii_lowercase().as_str() {
			"never" => Some(TlsReqCert::Never),
			"allow" => Some(TlsReqCert::Allow),
			"try" => Some(TlsReqCert::Try),
			"demand" => Some(TlsReqCert::Demand),
			"hard" => Some(TlsReqCert::Hard),
			_ => None,
		}
	}
}

/// Attribute map for one entry class. The fixed fields are the attributes
/// the core builds filters from; `extra` holds the rest of the mapped
/// set, `None` marking attributes the deployment does not expose.
#[derive(Debug, Clone)]
pub struct AttrMap {
	pub object_class: String,
	pub name: String,
	pub id_number: String,
	pub modify_timestamp: String,
	pub extra: Vec<Option<String>>,
}

impl AttrMap {
	pub fn user_defaults() -> Self {
		AttrMap {
			object_class: "posixAccount".to_owned(),
			name: "uid".to_owned(),
			id_number: "uidNumber".to_owned(),
			modify_timestamp: "modifyTimestamp".to_owned(),
			extra: vec![
				Some("gidNumber".to_owned()),
				Some("gecos".to_owned()),
				Some("homeDirectory".to_owned()),
				Some("loginShell".to_owned()),
				Some("userPrincipalName".to_owned()),
			],
		}
	}

	pub fn group_defaults() -> Self {
		AttrMap {
			object_class: "posixGroup".to_owned(),
			name: "cn".to_owned(),
			id_number: "gidNumber".to_owned(),
			modify_timestamp: "modifyTimestamp".to_owned(),
			extra: vec![Some("memberUid".to_owned())],
		}
	}

	/// The attribute list for an outbound search: the literal
	/// `objectClass` first, then the mapped names in map order.
	pub fn request_attrs(&self) -> Vec<String> {
		let mut attrs = Vec::with_capacity(4 + self.extra.len());
		attrs.push("objectClass".to_owned());
		attrs.push(self.name.clone());
		attrs.push(self.id_number.clone());
		attrs.push(self.modify_timestamp.clone());
		attrs.extend(self.extra.iter().flatten().cloned());
		attrs
	}
}

/// Everything the directory provider is configured with.
#[derive(Debug, Clone)]
pub struct DirOptions {
	pub uri: String,
	pub default_bind_dn: Option<String>,
	pub default_authtok_type: Option<String>,
	pub default_authtok: Option<SecretBuf>,
	pub offline_timeout: Duration,
	pub enum_refresh_timeout: Duration,
	pub use_start_tls: bool,
	pub tls_reqcert: Option<TlsReqCert>,
	pub user_map: AttrMap,
	pub group_map: AttrMap,
}

impl DirOptions {
	pub fn from_confdb(conf: &ConfDb) -> Result<Self, InitError> {
		let tls_reqcert = match conf.get_string(CONFDB_LDAP_TLS_REQCERT, None) {
			None => None,
			Some(value) => Some(TlsReqCert::parse(&value).ok_or(InitError::InvalidOption {
				key: CONFDB_LDAP_TLS_REQCERT.to_owned(),
				value,
			})?),
		};

		Ok(DirOptions {
			uri: conf
				.get_string(CONFDB_LDAP_URI, Some(DEFAULT_URI))
				.unwrap_or_else(|| DEFAULT_URI.to_owned()),
			default_bind_dn: conf.get_string(CONFDB_LDAP_DEFAULT_BIND_DN, None),
			default_authtok_type: conf.get_string(CONFDB_LDAP_DEFAULT_AUTHTOK_TYPE, None),
			default_authtok: conf
				.get_string(CONFDB_LDAP_DEFAULT_AUTHTOK, None)
				.map(|tok| SecretBuf::from(tok.as_str())),
			offline_timeout: Duration::from_secs(
				conf.get_u64(CONFDB_LDAP_OFFLINE_TIMEOUT, DEFAULT_OFFLINE_TIMEOUT)?,
			),
			enum_refresh_timeout: Duration::from_secs(
				conf.get_u64(CONFDB_LDAP_ENUM_REFRESH_TIMEOUT, DEFAULT_ENUM_REFRESH_TIMEOUT)?,
			),
			use_start_tls: conf.get_bool(CONFDB_LDAP_USE_START_TLS, false)?,
			tls_reqcert,
			user_map: AttrMap::user_defaults(),
			group_map: AttrMap::group_defaults(),
		})
	}
}
