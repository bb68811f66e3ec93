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

//! Building blocks shared by the identityd backend providers.
//!
//! The dispatcher hands every backend module a configuration handle, a
//! local-cache handle and the per-backend offline state; the provider
//! crates implement the operation traits defined here on top of those.

pub mod confdb;
pub mod error;
pub mod module;
pub mod offline;
pub mod pam;
pub mod request;
pub mod secret;
pub mod sysdb;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use confdb::ConfDb;
pub use error::{BackendError, InitError, SysdbError};
pub use module::{AccountInfoProvider, AuthProvider, OnlineStatus};
pub use offline::OfflineState;
pub use pam::{PamCommand, PamData, PamStatus, ResponseItem, ResponseKind};
pub use request::{AccountRequest, AttrType, DomainInfo, EntryType, FilterType};
pub use secret::SecretBuf;
pub use sysdb::{Sysdb, SYSDB_UPN};
