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

//! End-to-end tests that fork and exec a real helper stand-in.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use identityd_provider_common::test_utils::MemorySysdb;
use identityd_provider_common::{
	AuthProvider, ConfDb, DomainInfo, OfflineState, PamCommand, PamData, PamStatus,
	ResponseKind, SecretBuf, SYSDB_UPN,
};
use identityd_provider_krb5::{
	ChildExchange, HelperExchange, Krb5Provider, CONFDB_KRB5_CHILD_PATH, CONFDB_KRB5_KDCIP,
	CONFDB_KRB5_REALM,
};
use tempfile::TempDir;

fn current_ids() -> (u32, u32) {
	(nix::unistd::Uid::current().as_raw(), nix::unistd::Gid::current().as_raw())
}

/// Writes an executable shell script to stand in for the helper binary.
fn write_helper(dir: &TempDir, body: &str) -> PathBuf {
	let path = dir.path().join("krb5_child");
	fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
	fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
	path
}

#[tokio::test]
async fn cat_echoes_the_request_frame() {
	let (uid, gid) = current_ids();
	let exchange = HelperExchange::new(PathBuf::from("/bin/cat"));

	let frame = b"one framed request".to_vec();
	let reply = exchange.exchange(&frame, uid, gid).await.unwrap();

	assert_eq!(reply, frame);
}

#[tokio::test]
async fn a_helper_that_dies_silently_yields_an_empty_reply() {
	let dir = TempDir::new().unwrap();
	let helper = write_helper(&dir, "cat >/dev/null\nexit 1");
	let (uid, gid) = current_ids();
	let exchange = HelperExchange::new(helper);

	let reply = exchange.exchange(b"request", uid, gid).await.unwrap();

	assert!(reply.is_empty());
}

#[tokio::test]
async fn a_scripted_helper_drives_the_full_state_machine() {
	let dir = TempDir::new().unwrap();
	// consume the request, then emit status=0, type=1, len=5, "hello"
	let helper = write_helper(
		&dir,
		"cat >/dev/null\nprintf '\\000\\000\\000\\000\\001\\000\\000\\000\\005\\000\\000\\000hello'",
	);

	let mut conf = ConfDb::new();
	conf.set(CONFDB_KRB5_REALM, "EXAMPLE.COM")
		.set(CONFDB_KRB5_KDCIP, "10.1.2.3")
		.set(CONFDB_KRB5_CHILD_PATH, helper.to_str().unwrap());
	let domain = DomainInfo {
		name: "example".to_owned(),
		cache_credentials: false,
		enumerate: false,
	};
	let sysdb = MemorySysdb::new();
	sysdb.add_user("alice", &[(SYSDB_UPN, "alice@EXAMPLE.COM")]);

	let provider = Krb5Provider::init(
		&conf,
		&domain,
		Rc::new(OfflineState::new(Duration::from_secs(60))),
		Rc::new(sysdb),
	)
	.unwrap();

	let (uid, gid) = current_ids();
	let mut pd = PamData::new(PamCommand::Authenticate, "alice");
	pd.authtok = SecretBuf::from("secret");
	pd.uid = uid;
	pd.gid = gid;

	provider.pam_handler(&mut pd).await;

	assert_eq!(pd.status, PamStatus::SUCCESS);
	assert_eq!(pd.responses.len(), 3);
	assert_eq!(pd.responses[0].kind, ResponseKind::USER_INFO);
	assert_eq!(pd.responses[0].data, b"hello");
	assert_eq!(pd.responses[1].data, b"SSSD_REALM=EXAMPLE.COM");
	assert_eq!(pd.responses[2].data, b"SSSD_KDC=10.1.2.3");
}

#[tokio::test]
async fn a_truncating_helper_is_a_system_error() {
	let dir = TempDir::new().unwrap();
	// an incomplete header: three bytes and out
	let helper = write_helper(&dir, "cat >/dev/null\nprintf 'abc'");

	let mut conf = ConfDb::new();
	conf.set(CONFDB_KRB5_REALM, "EXAMPLE.COM")
		.set(CONFDB_KRB5_CHILD_PATH, helper.to_str().unwrap());
	let domain = DomainInfo {
		name: "example".to_owned(),
		cache_credentials: false,
		enumerate: false,
	};
	let sysdb = MemorySysdb::new();
	sysdb.add_user("alice", &[(SYSDB_UPN, "alice@EXAMPLE.COM")]);

	let provider = Krb5Provider::init(
		&conf,
		&domain,
		Rc::new(OfflineState::new(Duration::from_secs(60))),
		Rc::new(sysdb),
	)
	.unwrap();

	let (uid, gid) = current_ids();
	let mut pd = PamData::new(PamCommand::Authenticate, "alice");
	pd.authtok = SecretBuf::from("secret");
	pd.uid = uid;
	pd.gid = gid;

	provider.pam_handler(&mut pd).await;

	assert_eq!(pd.status, PamStatus::SYSTEM_ERR);
}
