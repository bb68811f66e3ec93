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

//! The per-backend offline mark.
//!
//! There is exactly one of these per backend; every provider of the
//! backend consults and sets the same instance, so an auth failure also
//! short-circuits identity lookups until the window elapses.

use std::cell::Cell;
use std::time::{Duration, Instant};

pub struct OfflineState {
	offline: Cell<bool>,
	went_offline: Cell<Option<Instant>>,
	offline_timeout: Duration,
}

impl OfflineState {
	pub fn new(offline_timeout: Duration) -> Self {
		OfflineState {
			offline: Cell::new(false),
			went_offline: Cell::new(None),
			offline_timeout,
		}
	}

	/// Marks the backend offline as of now.
	pub fn mark_offline(&self) {
		self.mark_offline_at(Instant::now());
	}

	/// Marks the backend offline as of `when`.
	pub fn mark_offline_at(&self, when: Instant) {
		self.offline.set(true);
		self.went_offline.set(Some(when));
	}

	/// Whether remote operations should currently be skipped.
	///
	/// The flag is not cleared when the window elapses; it is merely
	/// reported as false, and the next failure stamps a fresh
	/// `went_offline`.
	pub fn is_offline(&self) -> bool {
		match self.went_offline.get() {
			Some(went_offline) if went_offline.elapsed() <= self.offline_timeout =>
				self.offline.get(),
			_ => false,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn fresh_state_is_online() {
		let state = OfflineState::new(Duration::from_secs(60));
		assert!(!state.is_offline());
	}

	#[test]
	fn marked_state_is_offline_within_the_window() {
		let state = OfflineState::new(Duration::from_secs(60));
		state.mark_offline();
		assert!(state.is_offline());
	}

	#[test]
	fn the_mark_expires_after_the_window() {
		let state = OfflineState::new(Duration::from_secs(60));
		let past = Instant::now()
			.checked_sub(Duration::from_secs(70))
			.expect("system uptime is longer than the offline window");
		state.mark_offline_at(past);
		assert!(!state.is_offline());
	}

	#[test]
	fn a_fresh_failure_rearms_an_expired_mark() {
		let state = OfflineState::new(Duration::from_secs(60));
		let past = Instant::now()
			.checked_sub(Duration::from_secs(70))
			.expect("system uptime is longer than the offline window");
		state.mark_offline_at(past);
		assert!(!state.is_offline());
		state.mark_offline();
		assert!(state.is_offline());
	}
}
