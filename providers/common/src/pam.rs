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

//! The PAM request carrier passed between the dispatcher and the auth
//! provider.

use std::fmt;

use crate::secret::SecretBuf;

/// The PAM task a request asks the auth provider to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PamCommand {
	Authenticate,
	Setcred,
	AcctMgmt,
	OpenSession,
	CloseSession,
	Chauthtok,
}

impl PamCommand {
	pub fn to_wire(self) -> u32 {
		match self {
			PamCommand::Authenticate => 1,
			PamCommand::Setcred => 2,
			PamCommand::AcctMgmt => 3,
			PamCommand::OpenSession => 4,
			PamCommand::CloseSession => 5,
			PamCommand::Chauthtok => 6,
		}
	}

	pub fn from_wire(value: u32) -> Option<Self> {
		match value {
			1 => Some(PamCommand::Authenticate),
			2 => Some(PamCommand::Setcred),
			3 => Some(PamCommand::AcctMgmt),
			4 => Some(PamCommand::OpenSession),
			5 => Some(PamCommand::CloseSession),
			6 => Some(PamCommand::Chauthtok),
			_ => None,
		}
	}
}

/// A PAM result code.
///
/// Open newtype rather than an enum: the helper's status field travels to
/// the client verbatim, including codes this daemon does not know about.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PamStatus(pub i32);

impl PamStatus {
	pub const SUCCESS: PamStatus = PamStatus(0);
	pub const SYSTEM_ERR: PamStatus = PamStatus(4);
	pub const PERM_DENIED: PamStatus = PamStatus(6);
	pub const AUTHINFO_UNAVAIL: PamStatus = PamStatus(9);
	pub const AUTHTOK_ERR: PamStatus = PamStatus(20);
}

impl fmt::Debug for PamStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match *self {
			PamStatus::SUCCESS => write!(f, "PAM_SUCCESS"),
			PamStatus::SYSTEM_ERR => write!(f, "PAM_SYSTEM_ERR"),
			PamStatus::PERM_DENIED => write!(f, "PAM_PERM_DENIED"),
			PamStatus::AUTHINFO_UNAVAIL => write!(f, "PAM_AUTHINFO_UNAVAIL"),
			PamStatus::AUTHTOK_ERR => write!(f, "PAM_AUTHTOK_ERR"),
			PamStatus(other) => write!(f, "PamStatus({})", other),
		}
	}
}

impl fmt::Display for PamStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(self, f)
	}
}

/// The type tag of a response item, as used on the helper wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseKind(pub i32);

impl ResponseKind {
	pub const USER_INFO: ResponseKind = ResponseKind(1);
	pub const ENV_ITEM: ResponseKind = ResponseKind(2);
}

/// One item to surface to the PAM conversation.
#[derive(Debug, PartialEq, Eq)]
pub struct ResponseItem {
	pub kind: ResponseKind,
	pub data: Vec<u8>,
}

/// One in-flight PAM request.
///
/// The auth provider mutates `status`, `upn` and `responses` in place;
/// everything else is filled in by the dispatcher before the handler runs.
#[derive(Debug)]
pub struct PamData {
	pub cmd: PamCommand,
	pub user: String,
	/// The resolved user principal, once known.
	pub upn: Option<String>,
	pub authtok: SecretBuf,
	pub newauthtok: SecretBuf,
	pub uid: u32,
	pub gid: u32,
	pub status: PamStatus,
	pub responses: Vec<ResponseItem>,
}

impl PamData {
	pub fn new(cmd: PamCommand, user: &str) -> Self {
		PamData {
			cmd,
			user: user.to_owned(),
			upn: None,
			authtok: SecretBuf::default(),
			newauthtok: SecretBuf::default(),
			uid: 0,
			gid: 0,
			status: PamStatus::SYSTEM_ERR,
			responses: Vec::new(),
		}
	}

	pub fn add_response(&mut self, kind: ResponseKind, data: Vec<u8>) {
		self.responses.push(ResponseItem { kind, data });
	}
}
