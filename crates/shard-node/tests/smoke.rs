//! End-to-end smoke test for shard-node: runs a one-shot scan subcommand
//! against a fresh data directory and checks it exits cleanly and leaves
//! a usable database behind.
//!
//! Run with:
//!   cargo test -p shard-node --test smoke

use std::path::PathBuf;
use std::process::Command;

struct DataDirGuard(PathBuf);

impl Drop for DataDirGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

#[test]
fn scan_heartbeat_runs_cleanly_against_a_fresh_data_dir() {
    let data_dir = std::env::temp_dir().join(format!("shard_node_smoke_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&data_dir);
    let _guard = DataDirGuard(data_dir.clone());

    let bin = env!("CARGO_BIN_EXE_shard-node");
    let status = Command::new(bin)
        .args(["--data-dir", data_dir.to_str().unwrap(), "scan-heartbeat"])
        .status()
        .expect("failed to spawn shard-node");

    assert!(status.success(), "scan-heartbeat should exit successfully on an empty shard");
    assert!(data_dir.exists(), "scan-heartbeat should have created the data directory");
}

#[test]
fn configure_account_runs_cleanly_without_a_root_config_url() {
    let data_dir = std::env::temp_dir().join(format!("shard_node_smoke_configure_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&data_dir);
    let _guard = DataDirGuard(data_dir.clone());

    let bin = env!("CARGO_BIN_EXE_shard-node");
    let status = Command::new(bin)
        .args(["--data-dir", data_dir.to_str().unwrap(), "configure-account", "1", "2"])
        .status()
        .expect("failed to spawn shard-node");

    assert!(status.success(), "configure-account should exit successfully with no fetch URL configured");
}

#[test]
fn flush_outbox_runs_cleanly_against_a_fresh_data_dir() {
    let data_dir = std::env::temp_dir().join(format!("shard_node_smoke_flush_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&data_dir);
    let _guard = DataDirGuard(data_dir.clone());

    let bin = env!("CARGO_BIN_EXE_shard-node");
    let status = Command::new(bin)
        .args(["--data-dir", data_dir.to_str().unwrap(), "flush-outbox"])
        .status()
        .expect("failed to spawn shard-node");

    assert!(status.success(), "flush-outbox should exit successfully with an empty outbox");
}
