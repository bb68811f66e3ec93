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

//! The PAM request state machine.
//!
//! One request walks received → principal resolution → helper exchange →
//! reply dispatch → optional credential caching. Any internal failure
//! jumps straight to completion with `PAM_SYSTEM_ERR`; on a successful
//! round-trip the helper's status, never ours, is what the client sees.

use identityd_provider_common::{
	PamCommand, PamData, PamStatus, ResponseKind, SecretBuf, SYSDB_UPN,
};
use tracing::{debug, warn};

use crate::protocol::{self, ChildReply};
use crate::{Krb5Provider, LOG_TARGET, SSSD_KDC, SSSD_REALM};

impl Krb5Provider {
	pub(crate) async fn handle_pam(&self, pd: &mut PamData) {
		if self.offline.is_offline() {
			debug!(target: LOG_TARGET, "backend is marked offline, retry later");
			pd.status = PamStatus::AUTHINFO_UNAVAIL;
			return;
		}

		if pd.cmd != PamCommand::Authenticate && pd.cmd != PamCommand::Chauthtok {
			debug!(target: LOG_TARGET, "pam task {:?} is not handled here", pd.cmd);
			pd.status = PamStatus::SUCCESS;
			return;
		}

		let upn = match self.resolve_upn(&pd.user).await {
			Some(upn) => upn,
			None => {
				debug!(target: LOG_TARGET, "cannot determine principal for [{}]", pd.user);
				pd.status = PamStatus::SYSTEM_ERR;
				return;
			},
		};
		pd.upn = Some(upn.clone());

		let newauthtok = match pd.cmd {
			PamCommand::Chauthtok => Some(pd.newauthtok.as_bytes()),
			_ => None,
		};
		let frame = protocol::encode_request(pd.cmd, &upn, pd.authtok.as_bytes(), newauthtok);

		let raw = match self.exchange.exchange(frame.as_bytes(), pd.uid, pd.gid).await {
			Ok(raw) => raw,
			Err(err) => {
				warn!(target: LOG_TARGET, "helper exchange failed: {err}");
				pd.status = PamStatus::SYSTEM_ERR;
				return;
			},
		};

		let reply = match protocol::parse_reply(&raw) {
			Ok(reply) => reply,
			Err(err) => {
				warn!(target: LOG_TARGET, "bad helper reply: {err}");
				pd.status = PamStatus::SYSTEM_ERR;
				return;
			},
		};

		self.dispatch_reply(pd, reply).await;
	}

	async fn dispatch_reply(&self, pd: &mut PamData, reply: ChildReply) {
		debug!(
			target: LOG_TARGET,
			"helper response [{}][{}][{}]",
			reply.status,
			reply.kind.0,
			reply.payload.len()
		);

		pd.status = PamStatus(reply.status);
		pd.add_response(reply.kind, reply.payload);

		if pd.status == PamStatus::AUTHINFO_UNAVAIL {
			debug!(target: LOG_TARGET, "helper could not reach the KDC, marking backend offline");
			self.offline.mark_offline();
			return;
		}

		if pd.status == PamStatus::SUCCESS && pd.cmd == PamCommand::Authenticate {
			let realm = self.realm.as_deref().unwrap_or_default();
			let kdcip = self.kdcip.as_deref().unwrap_or_default();
			pd.add_response(ResponseKind::ENV_ITEM, format!("{SSSD_REALM}={realm}").into_bytes());
			pd.add_response(ResponseKind::ENV_ITEM, format!("{SSSD_KDC}={kdcip}").into_bytes());
		}

		if pd.status == PamStatus::SUCCESS && self.cache_credentials {
			let password = if pd.cmd == PamCommand::Chauthtok {
				SecretBuf::from(pd.newauthtok.as_bytes())
			} else {
				SecretBuf::from(pd.authtok.as_bytes())
			};
			if let Err(err) = self.sysdb.cache_password(&pd.user, password).await {
				// not fatal, but offline auth will not work
				warn!(
					target: LOG_TARGET,
					"failed to cache password for [{}]: {err}", pd.user
				);
			}
		}
	}

	/// Resolves the user principal: the cached attribute when present and
	/// non-empty, otherwise `user@realm` when the domain opts in.
	async fn resolve_upn(&self, user: &str) -> Option<String> {
		let mut rows = match self.sysdb.user_attr(user, SYSDB_UPN).await {
			Ok(rows) => rows,
			Err(err) => {
				debug!(
					target: LOG_TARGET,
					"cache search for the principal of [{user}] failed: {err}"
				);
				return None;
			},
		};

		let stored = match rows.len() {
			0 => {
				debug!(target: LOG_TARGET, "no principal for [{user}] found");
				None
			},
			1 => rows.pop().flatten(),
			_ => {
				warn!(
					target: LOG_TARGET,
					"a user search by name ([{user}]) returned more than one result"
				);
				None
			},
		};

		match stored {
			Some(upn) if !upn.is_empty() => Some(upn),
			_ if self.try_simple_upn => self.realm.as_ref().map(|realm| {
				let upn = format!("{user}@{realm}");
				debug!(target: LOG_TARGET, "using simple principal [{upn}]");
				upn
			}),
			_ => None,
		}
	}
}
