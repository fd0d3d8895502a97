//! Exit codes of the `nodectl` binary.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

mod common;

fn nodectl(project: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_nodectl"));
    cmd.env_remove("RUST_LOG").arg("--project-dir").arg(project);
    cmd
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> ExitStatus {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait().unwrap() {
            return status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            panic!("nodectl did not exit within {:?}", timeout);
        }
        thread::sleep(Duration::from_millis(50));
    }
}

/// Forward stderr lines of `child` to a channel.
fn stderr_lines(child: &mut Child) -> mpsc::Receiver<String> {
    let stderr = child.stderr.take().unwrap();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in BufReader::new(stderr).lines().map_while(Result::ok) {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

#[test]
fn test_missing_configuration_exits_one() {
    let project = tempfile::tempdir().unwrap();

    let output = nodectl(project.path()).args(["node", "start"]).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_malformed_configuration_exits_one() {
    let project = common::project_with_config(b"{");

    let output = nodectl(project.path()).args(["node", "start"]).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_bad_settings_file_exits_one() {
    let project = common::project_with_config(common::LOCAL_CONFIG.as_bytes());
    let settings = project.path().join("nodectl.toml");
    fs::write(&settings, "[shutdown\nidle_shutdown_secs = ").unwrap();

    let output = nodectl(project.path())
        .arg("--settings")
        .arg(&settings)
        .args(["node", "start"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_idle_shutdown_exits_zero() {
    let project = common::project_with_config(common::LOCAL_CONFIG.as_bytes());

    let mut child = nodectl(project.path())
        .args(["node", "start", "--idle-shutdown-seconds", "1"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let status = wait_with_timeout(&mut child, Duration::from_secs(15));
    assert_eq!(status.code(), Some(0));
}

#[cfg(unix)]
#[test]
fn test_sigterm_exits_zero() {
    let project = common::project_with_config(common::LOCAL_CONFIG.as_bytes());

    let mut child = nodectl(project.path())
        .args(["node", "start"])
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    let lines = stderr_lines(&mut child);

    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match lines.recv_timeout(remaining) {
            Ok(line) if line.contains("Node listening") => break,
            Ok(_) => continue,
            Err(e) => {
                let _ = child.kill();
                panic!("node never started listening: {}", e);
            }
        }
    }

    let killed = Command::new("kill")
        .args(["-TERM", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(killed.success());

    let status = wait_with_timeout(&mut child, Duration::from_secs(15));
    assert_eq!(status.code(), Some(0));
}

#[test]
fn test_url_prints_url_and_newline() {
    let project = common::project_with_config(common::LOCAL_CONFIG.as_bytes());

    let output = nodectl(project.path()).args(["node", "url"]).output().unwrap();

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(String::from_utf8(output.stdout).unwrap(), "https://api.example.com/\n");
}

#[test]
fn test_url_without_configuration_exits_one() {
    let project = tempfile::tempdir().unwrap();

    let output = nodectl(project.path()).args(["node", "url"]).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
}
