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

//! The account-information request carrier and the per-domain record.

/// What kind of entry an account request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
	User,
	Group,
	/// The groups a user is a member of.
	Initgroups,
}

/// How `filter_value` selects the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
	Name,
	IdNum,
}

/// Which attribute set the requester needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrType {
	Core,
	All,
}

/// One account-information request from the dispatcher.
#[derive(Debug, Clone)]
pub struct AccountRequest {
	pub entry_type: EntryType,
	pub filter_type: FilterType,
	pub attr_type: AttrType,
	pub filter_value: String,
}

/// The slice of the domain record the providers consume.
#[derive(Debug, Clone)]
pub struct DomainInfo {
	pub name: String,
	/// Cache successful credentials for offline authentication.
	pub cache_credentials: bool,
	/// Run the periodic full-enumeration sweep.
	pub enumerate: bool,
}
