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

//! Connection manager: at most one live authenticated handle, lazily
//! re-established with a bind step when the old one went away.

use std::rc::Rc;

use identityd_provider_common::BackendError;
use tracing::debug;

use crate::client::{BindOutcome, DirectoryHandle};
use crate::{LdapProvider, LOG_TARGET};

impl LdapProvider {
	/// Returns a live bound handle, connecting and binding first if the
	/// current one is gone or dead.
	pub(crate) async fn ensure_connection(
		&self,
	) -> Result<Rc<dyn DirectoryHandle>, BackendError> {
		if let Some(handle) = self.live_handle() {
			return Ok(handle);
		}

		// release any stale handle before reconnecting
		if self.handle.borrow_mut().take().is_some() {
			debug!(target: LOG_TARGET, "dropping a dead directory handle");
		}

		let handle = self.client.connect(&self.opts, self.opts.use_start_tls).await?;
		match handle
			.simple_bind(
				self.opts.default_bind_dn.as_deref(),
				self.opts.default_authtok.as_ref(),
			)
			.await?
		{
			BindOutcome::Success => {},
			BindOutcome::InvalidCredentials => return Err(BackendError::PermissionDenied),
		}

		// last connect wins; a handle raced in by a concurrent caller is
		// simply replaced and released
		*self.handle.borrow_mut() = Some(handle.clone());
		Ok(handle)
	}

	fn live_handle(&self) -> Option<Rc<dyn DirectoryHandle>> {
		self.handle
			.borrow()
			.as_ref()
			.filter(|handle| handle.is_connected())
			.cloned()
	}
}

#[cfg(test)]
mod tests {
	use assert_matches::assert_matches;
	use identityd_provider_common::BackendError;

	use crate::client::BindOutcome;
	use crate::testing::{scripted, user_request};

	#[tokio::test]
	async fn one_connection_is_bound_and_reused() {
		let (dir, provider) = scripted(false);

		provider.get_account_info(&user_request("alice")).await.unwrap();
		provider.get_account_info(&user_request("bob")).await.unwrap();

		assert_eq!(dir.connects.get(), 1);
		assert_eq!(dir.binds.get(), 1);
	}

	#[tokio::test]
	async fn a_dead_handle_is_replaced_before_the_next_query() {
		let (dir, provider) = scripted(false);

		provider.get_account_info(&user_request("alice")).await.unwrap();
		dir.connected.set(false);
		provider.get_account_info(&user_request("bob")).await.unwrap();

		assert_eq!(dir.connects.get(), 2);
		assert_eq!(dir.binds.get(), 2);
	}

	#[tokio::test]
	async fn a_failed_bind_is_a_permission_error_and_keeps_no_handle() {
		let (dir, provider) = scripted(false);
		dir.bind_outcome.set(BindOutcome::InvalidCredentials);

		let err = provider.get_account_info(&user_request("alice")).await.unwrap_err();

		assert_matches!(err, BackendError::PermissionDenied);
		assert!(provider.handle.borrow().is_none());
		assert_eq!(dir.user_filters.borrow().len(), 0);
	}

	#[tokio::test]
	async fn a_connect_failure_is_reported_as_a_directory_error() {
		let (dir, provider) = scripted(false);
		dir.fail_connect.set(true);

		let err = provider.get_account_info(&user_request("alice")).await.unwrap_err();

		assert_matches!(err, BackendError::Directory(_));
		assert!(provider.handle.borrow().is_none());
	}
}
