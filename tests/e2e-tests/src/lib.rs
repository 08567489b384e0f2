// E2E test framework for exewarden
//
// The binaries must be built first (`cargo build --workspace`); the tests are
// `#[ignore]`d so a plain `cargo test` does not depend on that.

pub mod http;
pub mod server;

pub use server::{ExewardenWrapper, TestConfigOptions};

use std::env;
use std::path::PathBuf;

fn target_dir() -> PathBuf {
    let mut path = env::current_exe()
        .expect("Failed to get current exe path")
        .parent()
        .expect("Failed to get parent dir")
        .to_path_buf();

    // If we're in deps/, go up one level
    if path.ends_with("deps") {
        path.pop();
    }
    path
}

fn binary_path(name: &str) -> PathBuf {
    let mut path = target_dir();

    #[cfg(windows)]
    path.push(format!("{}.exe", name));

    #[cfg(not(windows))]
    path.push(name);

    if !path.exists() {
        panic!("{} binary not found at: {}", name, path.display());
    }
    path
}

/// Path to the exewarden binary
pub fn get_exewarden_path() -> PathBuf {
    binary_path("exewarden")
}

/// Path to the testexe binary
pub fn get_testexe_path() -> PathBuf {
    binary_path("testexe")
}

/// Create a fresh test directory under target/tmp
pub fn create_test_dir(test_name: &str) -> PathBuf {
    let temp_dir = target_dir()
        .join("..")
        .join("tmp")
        .join(format!("e2e-test-{}", test_name));

    if temp_dir.exists() {
        std::fs::remove_dir_all(&temp_dir).ok();
    }
    std::fs::create_dir_all(&temp_dir).expect("Failed to create test directory");
    temp_dir
}

/// Clean up test directory
pub fn cleanup_test_dir(dir: &PathBuf) {
    if dir.exists() {
        std::fs::remove_dir_all(dir).ok();
    }
}

/// A free localhost port (released before returning)
pub fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .and_then(|l| l.local_addr())
        .map(|a| a.port())
        .expect("Failed to find a free port")
}
