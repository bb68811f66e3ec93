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

//! Helper-process lifecycle: fork, privilege drop, exec and reaping.

use std::ffi::{CStr, CString};
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, OFlag};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{
	chdir, close, dup2, execv, fork, pipe, setegid, seteuid, setgid, setuid, ForkResult, Gid,
	Pid, Uid,
};
use thiserror::Error;
use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{transport, LOG_TARGET};

/// A failed helper round-trip.
#[derive(Debug, Error)]
pub enum ChildError {
	#[error("failed to spawn helper: {0}")]
	Spawn(String),
	#[error("short write to helper ({written} of {expected} bytes)")]
	ShortWrite { written: usize, expected: usize },
	#[error("helper reply exceeded {0} bytes")]
	ReplyTooLarge(usize),
	#[error(transparent)]
	Io(#[from] io::Error),
}

/// One helper round-trip: spawn the helper as the target user, ship the
/// request frame, collect the raw reply.
///
/// This is the seam between the request state machine and the process
/// plumbing; tests script it, production uses [`HelperExchange`].
#[async_trait(?Send)]
pub trait ChildExchange {
	async fn exchange(&self, frame: &[u8], uid: u32, gid: u32) -> Result<Vec<u8>, ChildError>;
}

/// Production exchange: forks the configured helper binary, de-privileged
/// to the target user, and speaks the pipe transport to it.
pub struct HelperExchange {
	helper_path: PathBuf,
}

impl HelperExchange {
	pub fn new(helper_path: PathBuf) -> Self {
		HelperExchange { helper_path }
	}
}

#[async_trait(?Send)]
impl ChildExchange for HelperExchange {
	async fn exchange(&self, frame: &[u8], uid: u32, gid: u32) -> Result<Vec<u8>, ChildError> {
		let pipes = fork_child(&self.helper_path, Uid::from_raw(uid), Gid::from_raw(gid))?;
		let ChildPipes { pid, read_fd, write_fd } = pipes;

		transport::write_frame(write_fd, frame)?;
		let reply = transport::read_reply(read_fd).await?;

		debug!(target: LOG_TARGET, "helper [{pid}] replied with {} bytes", reply.len());
		Ok(reply)
	}
}

/// The parent's view of a spawned helper. Both endpoints close when this
/// is consumed or dropped.
struct ChildPipes {
	pid: Pid,
	read_fd: OwnedFd,
	write_fd: OwnedFd,
}

fn fork_child(helper: &Path, uid: Uid, gid: Gid) -> Result<ChildPipes, ChildError> {
	let helper_c = CString::new(helper.as_os_str().as_bytes())
		.map_err(|_| ChildError::Spawn("helper path contains a NUL byte".to_owned()))?;

	let (to_child_read, to_child_write) = pipe().map_err(spawn_err)?;
	let (from_child_read, from_child_write) = match pipe() {
		Ok(fds) => fds,
		Err(errno) => {
			let _ = close(to_child_read);
			let _ = close(to_child_write);
			return Err(spawn_err(errno));
		},
	};

	// SAFETY: the backend is single-threaded, and the child only performs
	// async-signal-safe work before exec.
	let fork_result = unsafe { fork() };

	match fork_result {
		Err(errno) => {
			for fd in [to_child_read, to_child_write, from_child_read, from_child_write] {
				let _ = close(fd);
			}
			Err(spawn_err(errno))
		},
		Ok(ForkResult::Child) => run_child(
			&helper_c,
			uid,
			gid,
			to_child_read,
			from_child_write,
			to_child_write,
			from_child_read,
		),
		Ok(ForkResult::Parent { child }) => {
			// SAFETY: fresh pipe fds owned by this function alone.
			let read_fd = unsafe { OwnedFd::from_raw_fd(from_child_read) };
			let write_fd = unsafe { OwnedFd::from_raw_fd(to_child_write) };
			let _ = close(to_child_read);
			let _ = close(from_child_write);
			set_nonblocking(read_fd.as_raw_fd()).map_err(spawn_err)?;
			set_nonblocking(write_fd.as_raw_fd()).map_err(spawn_err)?;
			debug!(target: LOG_TARGET, "spawned helper [{child}]");
			Ok(ChildPipes { pid: child, read_fd, write_fd })
		},
	}
}

/// Child-side setup between fork and exec. Never returns; any failure
/// exits non-zero, which the parent observes as a truncated reply. Only
/// async-signal-safe calls are allowed here, hence `_exit`.
fn run_child(
	helper: &CStr,
	uid: Uid,
	gid: Gid,
	stdin_fd: RawFd,
	stdout_fd: RawFd,
	unused_write: RawFd,
	unused_read: RawFd,
) -> ! {
	if chdir("/tmp").is_err() {
		unsafe { libc::_exit(1) };
	}
	if become_user(uid, gid).is_err() {
		unsafe { libc::_exit(1) };
	}

	let _ = close(unused_write);
	if dup2(stdin_fd, libc::STDIN_FILENO).is_err() {
		unsafe { libc::_exit(1) };
	}
	let _ = close(unused_read);
	if dup2(stdout_fd, libc::STDOUT_FILENO).is_err() {
		unsafe { libc::_exit(1) };
	}

	let _ = execv(helper, &[helper]);
	unsafe { libc::_exit(127) }
}

/// Drops group then user identity, for both the real and effective ids.
fn become_user(uid: Uid, gid: Gid) -> nix::Result<()> {
	setgid(gid)?;
	setuid(uid)?;
	setegid(gid)?;
	seteuid(uid)?;
	Ok(())
}

pub(crate) fn set_nonblocking(fd: RawFd) -> nix::Result<()> {
	let flags = fcntl(fd, FcntlArg::F_GETFL)?;
	let flags = OFlag::from_bits_truncate(flags) | OFlag::O_NONBLOCK;
	fcntl(fd, FcntlArg::F_SETFL(flags))?;
	Ok(())
}

fn spawn_err(errno: Errno) -> ChildError {
	ChildError::Spawn(errno.to_string())
}

/// Registers the process-wide child reaper with the event loop.
///
/// Every helper this backend spawns is reaped here; the per-request code
/// never waits on its child, it observes failures through the transport.
pub fn spawn_reaper() -> io::Result<JoinHandle<()>> {
	let mut sigchld = signal(SignalKind::child())?;
	Ok(tokio::spawn(async move {
		while sigchld.recv().await.is_some() {
			reap_exited();
		}
	}))
}

/// Collects every child that has exited, logging their wait status.
fn reap_exited() {
	loop {
		match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
			Ok(WaitStatus::Exited(pid, 0)) => {
				debug!(target: LOG_TARGET, "helper [{pid}] exited cleanly");
			},
			Ok(WaitStatus::Exited(pid, status)) => {
				warn!(target: LOG_TARGET, "helper [{pid}] failed with status {status}");
			},
			Ok(WaitStatus::Signaled(pid, sig, _)) => {
				warn!(target: LOG_TARGET, "helper [{pid}] was killed by signal {sig}");
			},
			Ok(WaitStatus::StillAlive) => break,
			Ok(_) => break,
			Err(Errno::ECHILD) => break,
			Err(Errno::EINTR) => continue,
			Err(errno) => {
				warn!(target: LOG_TARGET, "waitpid failed: {errno}");
				break;
			},
		}
	}
}
