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

//! Wire format shared with the `krb5_child` helper.
//!
//! Request (parent to helper), packed little-endian 32-bit fields:
//!
//! `cmd | upn_len | upn | authtok_len | authtok [| newauthtok_len | newauthtok]`
//!
//! with the trailing pair present exactly when `cmd` is a change-password.
//!
//! Reply (helper to parent): `status | msg_type | msg_len | payload`.
//! A well-formed reply carries exactly `msg_len` payload bytes after the
//! twelve-byte header.

use identityd_provider_common::{PamCommand, ResponseKind, SecretBuf};
use thiserror::Error;

/// Agreed upper bound on a helper reply.
pub const MAX_CHILD_MSG_SIZE: usize = 256 * 1024;

/// Byte length of the fixed reply header.
pub const REPLY_HEADER_LEN: usize = 3 * 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
	#[error("message too short ({0} bytes)")]
	TooShort(usize),
	#[error("message format error: header says {expected} payload bytes, got {actual}")]
	LengthMismatch { expected: usize, actual: usize },
	#[error("negative payload length")]
	NegativeLength,
	#[error("truncated field at offset {0}")]
	Truncated(usize),
	#[error("unknown command {0}")]
	UnknownCommand(u32),
	#[error("principal is not valid utf-8")]
	InvalidPrincipal,
	#[error("{0} trailing bytes after request")]
	TrailingBytes(usize),
}

/// Serialises one helper request. The buffer carries the tokens, so it is
/// returned wipe-on-drop.
pub fn encode_request(
	cmd: PamCommand,
	upn: &str,
	authtok: &[u8],
	newauthtok: Option<&[u8]>,
) -> SecretBuf {
	debug_assert_eq!(cmd == PamCommand::Chauthtok, newauthtok.is_some());

	let trailer = newauthtok.map_or(0, |tok| 4 + tok.len());
	let mut buf = Vec::with_capacity(3 * 4 + upn.len() + authtok.len() + trailer);

	buf.extend_from_slice(&cmd.to_wire().to_le_bytes());
	buf.extend_from_slice(&(upn.len() as u32).to_le_bytes());
	buf.extend_from_slice(upn.as_bytes());
	buf.extend_from_slice(&(authtok.len() as u32).to_le_bytes());
	buf.extend_from_slice(authtok);
	if let Some(tok) = newauthtok {
		buf.extend_from_slice(&(tok.len() as u32).to_le_bytes());
		buf.extend_from_slice(tok);
	}

	SecretBuf::new(buf)
}

/// A decoded helper request, as the helper side of the protocol sees it.
#[derive(Debug)]
pub struct HelperRequest {
	pub cmd: PamCommand,
	pub upn: String,
	pub authtok: SecretBuf,
	pub newauthtok: Option<SecretBuf>,
}

/// Parses one helper request, the inverse of [`encode_request`].
pub fn decode_request(buf: &[u8]) -> Result<HelperRequest, ProtocolError> {
	let mut reader = Reader { buf, pos: 0 };

	let cmd = reader.read_u32()?;
	let cmd = PamCommand::from_wire(cmd).ok_or(ProtocolError::UnknownCommand(cmd))?;
	let upn = reader.read_field()?;
	let upn = String::from_utf8(upn).map_err(|_| ProtocolError::InvalidPrincipal)?;
	let authtok = SecretBuf::new(reader.read_field()?);
	let newauthtok = if cmd == PamCommand::Chauthtok {
		Some(SecretBuf::new(reader.read_field()?))
	} else {
		None
	};

	let trailing = buf.len() - reader.pos;
	if trailing != 0 {
		return Err(ProtocolError::TrailingBytes(trailing));
	}

	Ok(HelperRequest { cmd, upn, authtok, newauthtok })
}

/// One parsed helper reply.
#[derive(Debug)]
pub struct ChildReply {
	pub status: i32,
	pub kind: ResponseKind,
	pub payload: Vec<u8>,
}

/// Validates and splits one helper reply.
pub fn parse_reply(buf: &[u8]) -> Result<ChildReply, ProtocolError> {
	if buf.len() < REPLY_HEADER_LEN {
		return Err(ProtocolError::TooShort(buf.len()));
	}

	let status = i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
	let kind = i32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
	let msg_len = i32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]);

	if msg_len < 0 {
		return Err(ProtocolError::NegativeLength);
	}
	let expected = msg_len as usize;
	let actual = buf.len() - REPLY_HEADER_LEN;
	if expected != actual {
		return Err(ProtocolError::LengthMismatch { expected, actual });
	}

	Ok(ChildReply {
		status,
		kind: ResponseKind(kind),
		payload: buf[REPLY_HEADER_LEN..].to_vec(),
	})
}

struct Reader<'a> {
	buf: &'a [u8],
	pos: usize,
}

impl<'a> Reader<'a> {
	fn read_u32(&mut self) -> Result<u32, ProtocolError> {
		let bytes = self.take(4)?;
		Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
	}

	fn read_field(&mut self) -> Result<Vec<u8>, ProtocolError> {
		let len = self.read_u32()? as usize;
		Ok(self.take(len)?.to_vec())
	}

	fn take(&mut self, len: usize) -> Result<&'a [u8], ProtocolError> {
		if self.pos + len > self.buf.len() {
			return Err(ProtocolError::Truncated(self.pos));
		}
		let bytes = &self.buf[self.pos..self.pos + len];
		self.pos += len;
		Ok(bytes)
	}
}
