//! Start, observe and stop testexe through the HTTP API.

use e2e_tests::{
    cleanup_test_dir, create_test_dir, get_exewarden_path, get_testexe_path, ExewardenWrapper,
    TestConfigOptions,
};
use std::time::Duration;

fn launch(name: &str, options: TestConfigOptions) -> ExewardenWrapper {
    let test_dir = create_test_dir(name);
    ExewardenWrapper::start(&get_exewarden_path(), &get_testexe_path(), &test_dir, options)
        .expect("exewarden failed to start")
}

#[test]
#[ignore = "needs the workspace binaries; run after `cargo build --workspace`"]
fn test_graceful_stop() {
    let mut server = launch("graceful-stop", TestConfigOptions::default());

    let initial = server.status().unwrap();
    assert_eq!(initial["is_running"], false);
    assert_eq!(initial["last_error"], "No error recorded yet.");

    let started = server.start_program().unwrap();
    assert_eq!(started["status"], "success");
    assert_eq!(started["message"], "Program started.");

    let again = server.start_program().unwrap();
    assert_eq!(again["message"], "A program is already running.");

    let status = server
        .wait_for_status(
            |s| ExewardenWrapper::logs(s).iter().any(|l| l == "ready"),
            Duration::from_secs(10),
        )
        .unwrap();
    let logs = ExewardenWrapper::logs(&status);
    assert!(logs[0].starts_with("Starting executable: "));
    assert_eq!(logs[1], "line 1");
    assert_eq!(status["is_running"], true);

    let stopped = server.stop_program().unwrap();
    assert_eq!(stopped["message"], "Program stopped.");

    let status = server.status().unwrap();
    assert_eq!(status["is_running"], false);
    assert_eq!(
        ExewardenWrapper::logs(&status).last().map(String::as_str),
        Some("[SYSTEM] Program stopped by user.")
    );
    assert_eq!(server.stop_program().unwrap()["message"], "already stopped");

    server.shutdown().unwrap();
    cleanup_test_dir(&server.test_dir);
}

#[test]
#[ignore = "needs the workspace binaries; run after `cargo build --workspace`"]
fn test_crash_report() {
    let options = TestConfigOptions {
        testexe_args: vec![
            "--lines".to_string(),
            "20".to_string(),
            "--exit-code".to_string(),
            "3".to_string(),
        ],
        ..TestConfigOptions::default()
    };
    let mut server = launch("crash-report", options);

    server.start_program().unwrap();
    let status = server
        .wait_for_status(|s| s["is_running"] == false, Duration::from_secs(10))
        .unwrap();

    let last_error = status["last_error"].as_str().unwrap_or_default();
    assert!(last_error.starts_with("Crash detected (code 3)."));
    assert!(last_error.contains("line 6"));
    assert!(last_error.ends_with("line 20"));
    assert!(!last_error.contains("line 5\n"));

    server.shutdown().unwrap();
    cleanup_test_dir(&server.test_dir);
}

#[cfg(unix)]
#[test]
#[ignore = "needs the workspace binaries; run after `cargo build --workspace`"]
fn test_forced_stop() {
    let options = TestConfigOptions {
        testexe_args: vec!["--run-forever".to_string(), "--ignore-sigterm".to_string()],
        graceful_timeout_ms: 300,
        ..TestConfigOptions::default()
    };
    let mut server = launch("forced-stop", options);

    server.start_program().unwrap();
    server
        .wait_for_status(
            |s| ExewardenWrapper::logs(s).iter().any(|l| l == "ready"),
            Duration::from_secs(10),
        )
        .unwrap();

    assert_eq!(server.stop_program().unwrap()["status"], "success");

    let logs = ExewardenWrapper::logs(&server.status().unwrap());
    assert!(logs.iter().any(|l| l == "[SYSTEM] Process exited with code: -9"));

    server.shutdown().unwrap();
    cleanup_test_dir(&server.test_dir);
}

#[test]
#[ignore = "needs the workspace binaries; run after `cargo build --workspace`"]
fn test_shutdown_stops_child() {
    let mut server = launch("shutdown-stops-child", TestConfigOptions::default());

    server.start_program().unwrap();
    server
        .wait_for_status(|s| s["is_running"] == true, Duration::from_secs(10))
        .unwrap();

    server.shutdown().unwrap();

    let log = std::fs::read_to_string(server.test_dir.join("exe_logs.txt")).unwrap();
    assert!(log.contains("[SYSTEM] Program stopped by user."));
    cleanup_test_dir(&server.test_dir);
}
