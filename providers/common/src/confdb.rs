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

//! View of the daemon configuration database for one backend.

use std::collections::HashMap;

use crate::error::InitError;

/// Key/value configuration handed to a provider at init.
#[derive(Debug, Default, Clone)]
pub struct ConfDb {
	values: HashMap<String, String>,
}

impl ConfDb {
	pub fn new() -> Self {
		ConfDb::default()
	}

	pub fn set(&mut self, key: &str, value: &str) -> &mut Self {
		self.values.insert(key.to_owned(), value.to_owned());
		self
	}

	pub fn get_string(&self, key: &str, default: Option<&str>) -> Option<String> {
		self.values
			.get(key)
			.cloned()
			.or_else(|| default.map(str::to_owned))
	}

	pub fn get_bool(&self, key: &str, default: bool) -> Result<bool, InitError> {
		match self.values.get(key) {
			None => Ok(default),
			Some(value) => match value.to_ascii_lowercase().as_str() {
				"true" => Ok(true),
				"false" => Ok(false),
				_ => Err(InitError::InvalidOption {
					key: key.to_owned(),
					value: value.clone(),
				}),
			},
		}
	}

	pub fn get_u64(&self, key: &str, default: u64) -> Result<u64, InitError> {
		match self.values.get(key) {
			None => Ok(default),
			Some(value) => value.parse().map_err(|_| InitError::InvalidOption {
				key: key.to_owned(),
				value: value.clone(),
			}),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn string_lookup_falls_back_to_the_default() {
		let mut conf = ConfDb::new();
		conf.set("a", "x");
		assert_eq!(conf.get_string("a", None).as_deref(), Some("x"));
		assert_eq!(conf.get_string("b", Some("y")).as_deref(), Some("y"));
		assert_eq!(conf.get_string("b", None), None);
	}

	#[test]
	fn bool_lookup_rejects_junk() {
		let mut conf = ConfDb::new();
		conf.set("flag", "TRUE").set("junk", "yes");
		assert_eq!(conf.get_bool("flag", false).unwrap(), true);
		assert_eq!(conf.get_bool("missing", true).unwrap(), true);
		assert!(conf.get_bool("junk", false).is_err());
	}

	#[test]
	fn numeric_lookup_rejects_junk() {
		let mut conf = ConfDb::new();
		conf.set("t", "300").set("junk", "5s");
		assert_eq!(conf.get_u64("t", 60).unwrap(), 300);
		assert_eq!(conf.get_u64("missing", 60).unwrap(), 60);
		assert!(conf.get_u64("junk", 60).is_err());
	}
}
