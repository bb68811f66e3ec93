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

//! The operations a backend module surfaces to the dispatcher.

use async_trait::async_trait;

use crate::error::BackendError;
use crate::pam::PamData;
use crate::request::AccountRequest;

/// The reported connectivity of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnlineStatus {
	Online,
	Offline,
}

/// The handler op of an authentication module.
#[async_trait(?Send)]
pub trait AuthProvider {
	/// Handles one PAM request, mutating `pd` in place.
	///
	/// Completion of the returned future is the request's completion
	/// callback, and it happens exactly once per request.
	async fn pam_handler(&self, pd: &mut PamData);
}

/// The ops table of an identity module.
#[async_trait(?Send)]
pub trait AccountInfoProvider {
	/// Handles one account-information request.
	async fn account_handler(&self, req: &AccountRequest) -> Result<(), BackendError>;

	/// Reports the backend's offline state.
	fn check_online(&self) -> OnlineStatus;

	/// Teardown hook.
	async fn finalize(&self) {}
}
