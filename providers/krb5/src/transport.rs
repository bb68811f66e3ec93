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

//! One-shot framed transport over the helper's stdio pipes.
//!
//! The transport never retries; callers classify failures.

use std::io;
use std::os::fd::{AsRawFd, OwnedFd};

use nix::errno::Errno;
use tokio::io::unix::AsyncFd;

use crate::child::ChildError;
use crate::protocol::MAX_CHILD_MSG_SIZE;

/// Writes the whole outbound frame in one best-effort write, then closes
/// the endpoint to signal end-of-input to the helper.
pub(crate) fn write_frame(fd: OwnedFd, frame: &[u8]) -> Result<(), ChildError> {
	let written = nix::unistd::write(fd.as_raw_fd(), frame)
		.map_err(|errno| ChildError::Io(io::Error::from_raw_os_error(errno as i32)))?;
	if written != frame.len() {
		return Err(ChildError::ShortWrite { written, expected: frame.len() });
	}
	Ok(())
	// `fd` drops here, closing the write end
}

/// Collects the helper's reply.
///
/// The read end is non-blocking and registered with the event loop; each
/// readiness notification performs a single read, with `EAGAIN` and
/// `EINTR` yielding back to the scheduler. The helper emits its whole
/// reply and exits, so accumulation ends at EOF; anything past the agreed
/// maximum message size is a transport error.
pub(crate) async fn read_reply(fd: OwnedFd) -> Result<Vec<u8>, ChildError> {
	let afd = AsyncFd::new(fd)?;
	let mut reply = Vec::new();
	let mut chunk = [0u8; 4096];

	loop {
		let mut guard = afd.readable().await?;
		match nix::unistd::read(afd.get_ref().as_raw_fd(), &mut chunk) {
			Ok(0) => return Ok(reply),
			Ok(n) => {
				reply.extend_from_slice(&chunk[..n]);
				if reply.len() > MAX_CHILD_MSG_SIZE {
					return Err(ChildError::ReplyTooLarge(reply.len()));
				}
			},
			Err(Errno::EAGAIN) => guard.clear_ready(),
			Err(Errno::EINTR) => {},
			Err(errno) =>
				return Err(ChildError::Io(io::Error::from_raw_os_error(errno as i32))),
		}
	}
}

#[cfg(test)]
mod tests {
	use std::os::fd::FromRawFd;

	use assert_matches::assert_matches;

	use super::*;

	fn pipe_pair() -> (OwnedFd, OwnedFd) {
		let (read_fd, write_fd) = nix::unistd::pipe().unwrap();
		// SAFETY: fresh fds owned by this test.
		let (read_fd, write_fd) =
			unsafe { (OwnedFd::from_raw_fd(read_fd), OwnedFd::from_raw_fd(write_fd)) };
		crate::child::set_nonblocking(read_fd.as_raw_fd()).unwrap();
		(read_fd, write_fd)
	}

	#[tokio::test]
	async fn a_written_frame_is_read_back_until_eof() {
		let (read_fd, write_fd) = pipe_pair();
		write_frame(write_fd, b"one framed message").unwrap();
		let reply = read_reply(read_fd).await.unwrap();
		assert_eq!(reply, b"one framed message");
	}

	#[tokio::test]
	async fn an_empty_reply_is_just_eof() {
		let (read_fd, write_fd) = pipe_pair();
		drop(write_fd);
		let reply = read_reply(read_fd).await.unwrap();
		assert!(reply.is_empty());
	}

	#[tokio::test]
	async fn writing_to_a_closed_pipe_fails() {
		let (read_fd, write_fd) = pipe_pair();
		drop(read_fd);
		assert_matches!(write_frame(write_fd, b"x"), Err(ChildError::Io(_)));
	}
}
