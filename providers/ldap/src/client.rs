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

//! Seam to the directory wire client.
//!
//! The protocol client (connect, bind, search) lives outside this crate;
//! the provider only drives the operations below. Search operations write
//! the fetched entries straight into the local cache and report the
//! highest modification timestamp they saw.

use std::rc::Rc;

use async_trait::async_trait;
use identityd_provider_common::{BackendError, SecretBuf, Sysdb};
use thiserror::Error;

use crate::options::{DirOptions, TlsReqCert};

#[derive(Debug, Error)]
pub enum DirError {
	#[error("connection failed: {0}")]
	Connect(String),
	#[error("authentication failed")]
	AuthFailed,
	#[error("search failed: {0}")]
	Search(String),
	#[error("global option rejected: {0}")]
	Option(String),
}

impl From<DirError> for BackendError {
	fn from(err: DirError) -> Self {
		match err {
			DirError::AuthFailed => BackendError::PermissionDenied,
			other => BackendError::Directory(other.to_string()),
		}
	}
}

/// Outcome of a simple bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindOutcome {
	Success,
	InvalidCredentials,
}

/// Factory for directory connections.
#[async_trait(?Send)]
pub trait DirectoryClient {
	/// Applies the certificate-checking mode as a global library option.
	/// Has to happen before the first connect, since the TLS context is
	/// initialized from it.
	fn set_tls_require_cert(&self, mode: TlsReqCert) -> Result<(), DirError>;

	/// Opens a connection to the configured directory, optionally
	/// negotiating STARTTLS before anything else.
	async fn connect(
		&self,
		opts: &DirOptions,
		use_start_tls: bool,
	) -> Result<Rc<dyn DirectoryHandle>, DirError>;
}

/// One live directory connection.
#[async_trait(?Send)]
pub trait DirectoryHandle {
	/// Whether the connection is still usable.
	fn is_connected(&self) -> bool;

	async fn simple_bind(
		&self,
		bind_dn: Option<&str>,
		authtok: Option<&SecretBuf>,
	) -> Result<BindOutcome, DirError>;

	/// Fetches the users matching `filter` into the cache; returns the
	/// highest modification timestamp among them, if any matched.
	async fn get_users(
		&self,
		sysdb: &dyn Sysdb,
		attrs: &[String],
		filter: &str,
	) -> Result<Option<String>, DirError>;

	/// Group counterpart of [`Self::get_users`].
	async fn get_groups(
		&self,
		sysdb: &dyn Sysdb,
		attrs: &[String],
		filter: &str,
	) -> Result<Option<String>, DirError>;

	/// Resolves the group memberships of one user into the cache.
	async fn get_initgroups(
		&self,
		sysdb: &dyn Sysdb,
		name: &str,
		attrs: &[String],
	) -> Result<(), DirError>;
}
