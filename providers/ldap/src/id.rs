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

//! Account-information dispatch: classify the request, build the filter,
//! make sure we are connected, hand the query to the directory client.

use identityd_provider_common::{
	AccountRequest, AttrType, BackendError, EntryType, FilterType,
};
use tracing::debug;

use crate::options::AttrMap;
use crate::{LdapProvider, LOG_TARGET};

impl LdapProvider {
	pub(crate) async fn get_account_info(
		&self,
		req: &AccountRequest,
	) -> Result<(), BackendError> {
		if self.offline.is_offline() {
			debug!(target: LOG_TARGET, "backend is offline, request should be retried later");
			return Err(BackendError::RetryLater);
		}

		match req.entry_type {
			EntryType::User => {
				// enumerations on demand are served from the cache
				if req.filter_value == "*" {
					return Ok(());
				}
				self.users_get(&req.filter_value, req.filter_type).await
			},
			EntryType::Group => {
				if req.filter_value == "*" {
					return Ok(());
				}
				self.groups_get(&req.filter_value, req.filter_type).await
			},
			EntryType::Initgroups => {
				if req.filter_type != FilterType::Name {
					return Err(BackendError::InvalidRequest("invalid filter type"));
				}
				if req.attr_type != AttrType::Core {
					return Err(BackendError::InvalidRequest("invalid attr type"));
				}
				if req.filter_value.contains('*') {
					return Err(BackendError::InvalidRequest("invalid filter value"));
				}
				self.groups_by_user(&req.filter_value).await
			},
		}
	}

	async fn users_get(
		&self,
		value: &str,
		filter_type: FilterType,
	) -> Result<(), BackendError> {
		let map = &self.opts.user_map;
		let filter = lookup_filter(map, filter_type, value);
		let attrs = map.request_attrs();

		let handle = self.ensure_connection().await?;
		handle.get_users(self.sysdb.as_ref(), &attrs, &filter).await?;
		Ok(())
	}

	async fn groups_get(
		&self,
		value: &str,
		filter_type: FilterType,
	) -> Result<(), BackendError> {
		let map = &self.opts.group_map;
		let filter = lookup_filter(map, filter_type, value);
		let attrs = map.request_attrs();

		let handle = self.ensure_connection().await?;
		handle.get_groups(self.sysdb.as_ref(), &attrs, &filter).await?;
		Ok(())
	}

	async fn groups_by_user(&self, name: &str) -> Result<(), BackendError> {
		let attrs = self.opts.group_map.request_attrs();

		let handle = self.ensure_connection().await?;
		handle.get_initgroups(self.sysdb.as_ref(), name, &attrs).await?;
		Ok(())
	}
}

/// Point-lookup filter for one entry of the mapped class.
fn lookup_filter(map: &AttrMap, filter_type: FilterType, value: &str) -> String {
	let attr_name = match filter_type {
		FilterType::Name => &map.name,
		FilterType::IdNum => &map.id_number,
	};
	format!("(&({}={})(objectclass={}))", attr_name, value, map.object_class)
}
