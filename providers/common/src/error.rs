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

//! Error taxonomy of the backend core.

use thiserror::Error;

/// A failed local-cache operation.
#[derive(Debug, Error)]
pub enum SysdbError {
	#[error("no such entry")]
	NotFound,
	#[error("cache operation failed: {0}")]
	Operation(String),
}

/// Why a backend request failed.
///
/// `RetryLater` is the "offline" answer: the requester should not retry
/// before the offline window elapses.
#[derive(Debug, Error)]
pub enum BackendError {
	#[error("backend is offline, retry later")]
	RetryLater,
	#[error("permission denied")]
	PermissionDenied,
	#[error("invalid request: {0}")]
	InvalidRequest(&'static str),
	#[error(transparent)]
	Database(#[from] SysdbError),
	#[error("directory operation failed: {0}")]
	Directory(String),
	#[error(transparent)]
	Io(#[from] std::io::Error),
}

/// A fatal condition while bringing a provider up.
#[derive(Debug, Error)]
pub enum InitError {
	#[error("invalid value for {key}: {value:?}")]
	InvalidOption { key: String, value: String },
	#[error("failed to apply global TLS option: {0}")]
	TlsOption(String),
	#[error("failed to register with the event loop: {0}")]
	EventLoop(String),
}
