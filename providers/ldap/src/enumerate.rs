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

//! The periodic full-enumeration sweep.
//!
//! One self-rescheduling task per enumerating domain. Every iteration
//! refreshes users then groups, each phase narrowed to entries strictly
//! newer than the watermark left by the last successful pass. A run that
//! outlives `enum_refresh_timeout` is abandoned outright, and both
//! timeouts and failures reschedule the next attempt a full interval from
//! now rather than from the iteration start.

use std::rc::Rc;

use identityd_provider_common::BackendError;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, warn};

use crate::options::AttrMap;
use crate::{LdapProvider, LOG_TARGET};

pub(crate) fn spawn(provider: Rc<LdapProvider>) -> JoinHandle<()> {
	tokio::task::spawn_local(enumeration_loop(provider))
}

async fn enumeration_loop(provider: Rc<LdapProvider>) {
	let refresh = provider.opts.enum_refresh_timeout;
	let mut next_run = Instant::now();

	loop {
		time::sleep_until(next_run).await;

		provider.last_run.set(Some(Instant::now()));

		// if an iteration takes this long, either we enumerate too
		// frequently or something went seriously wrong; dropping the
		// in-flight future releases everything it held
		match time::timeout(refresh, provider.enumerate_once()).await {
			// steady cadence from the recorded start of this run
			Ok(Ok(())) => {
				next_run = provider
					.last_run
					.get()
					.map_or_else(Instant::now, |last_run| last_run + refresh);
			},
			Ok(Err(err)) => {
				warn!(target: LOG_TARGET, "enumeration failed, retrying later: {err}");
				next_run = Instant::now() + refresh;
			},
			Err(_) => {
				warn!(
					target: LOG_TARGET,
					"enumeration timed out, timeout too small? ({}s)",
					refresh.as_secs()
				);
				next_run = Instant::now() + refresh;
			},
		}
	}
}

impl LdapProvider {
	/// One iteration: users, then groups.
	async fn enumerate_once(&self) -> Result<(), BackendError> {
		self.enum_users().await?;
		self.enum_groups().await?;
		Ok(())
	}

	async fn enum_users(&self) -> Result<(), BackendError> {
		let map = &self.opts.user_map;
		let filter = {
			let watermark = self.max_user_timestamp.borrow();
			sweep_filter(map, watermark.as_deref())
		};
		let attrs = map.request_attrs();

		let handle = self.ensure_connection().await?;
		let timestamp = handle.get_users(self.sysdb.as_ref(), &attrs, &filter).await?;

		if let Some(timestamp) = timestamp {
			debug!(target: LOG_TARGET, "users highest timestamp: [{timestamp}]");
			*self.max_user_timestamp.borrow_mut() = Some(timestamp);
		}
		Ok(())
	}

	async fn enum_groups(&self) -> Result<(), BackendError> {
		let map = &self.opts.group_map;
		let filter = {
			let watermark = self.max_group_timestamp.borrow();
			sweep_filter(map, watermark.as_deref())
		};
		let attrs = map.request_attrs();

		let handle = self.ensure_connection().await?;
		let timestamp = handle.get_groups(self.sysdb.as_ref(), &attrs, &filter).await?;

		if let Some(timestamp) = timestamp {
			debug!(target: LOG_TARGET, "groups highest timestamp: [{timestamp}]");
			*self.max_group_timestamp.borrow_mut() = Some(timestamp);
		}
		Ok(())
	}
}

/// Full sweep without a watermark; with one, only entries strictly newer
/// than it.
fn sweep_filter(map: &AttrMap, watermark: Option<&str>) -> String {
	match watermark {
		Some(ts) => format!(
			"(&({}=*)(objectclass={})({}>={})(!({}={})))",
			map.name, map.object_class, map.modify_timestamp, ts, map.modify_timestamp, ts
		),
		None => format!("(&({}=*)(objectclass={}))", map.name, map.object_class),
	}
}
