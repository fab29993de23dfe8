//! CLI integration tests

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::TempDir;

/// Helper function to get the htstore binary path
fn htstore_bin() -> PathBuf {
    // Use CARGO_BIN_EXE_htstore if available (set by cargo test)
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_htstore") {
        return PathBuf::from(path);
    }
    // Fallback to the built binary in target/debug
    PathBuf::from("./target/debug/htstore")
}

/// Helper to run the CLI against `file` with optional stdin input
fn run_htstore(file: &Path, args: &[&str], stdin_input: Option<&str>) -> TestResult {
    let mut cmd = Command::new(htstore_bin());
    cmd.arg("--file").arg(file).args(["--cost", "4"]).args(args);
    cmd.env_remove("HTSTORE_FILE").env_remove("RUST_LOG");

    let output = if let Some(input) = stdin_input {
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd.spawn().expect("Failed to spawn htstore");

        if let Some(mut stdin) = child.stdin.take() {
            let _ = stdin.write_all(input.as_bytes());
            let _ = stdin.flush();
        }

        child.wait_with_output().expect("Failed to read output")
    } else {
        cmd.output().expect("Failed to execute htstore")
    };

    TestResult {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        success: output.status.success(),
    }
}

struct TestResult {
    stdout: String,
    stderr: String,
    success: bool,
}

fn create_test_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

fn verify(file: &Path, username: &str, password: &str) -> bool {
    htstore::CredentialStore::open(file)
        .verify_user(username, password)
        .unwrap()
}

#[test]
fn test_cli_add_user() {
    let dir = create_test_dir();
    let file_path = dir.path().join("test.htpasswd");

    let result = run_htstore(&file_path, &["add", "alice", "--password"], Some("testpass123"));

    assert!(result.success, "stderr: {}", result.stderr);
    assert!(result.stdout.contains("alice"));
    assert!(verify(&file_path, "alice", "testpass123"));

    let content = std::fs::read_to_string(&file_path).unwrap();
    assert!(content.starts_with("alice:$2b$04$"), "got: {content}");
}

#[test]
fn test_cli_add_duplicate_user() {
    let dir = create_test_dir();
    let file_path = dir.path().join("test.htpasswd");

    run_htstore(&file_path, &["add", "alice", "--password"], Some("testpass123"));
    let result = run_htstore(&file_path, &["add", "alice", "--password"], Some("testpass456"));

    assert!(!result.success, "Should fail when adding duplicate user");
    assert!(result.stderr.contains("already exists"), "stderr: {}", result.stderr);
    assert!(verify(&file_path, "alice", "testpass123"));
}

#[test]
fn test_cli_add_forced() {
    let dir = create_test_dir();
    let file_path = dir.path().join("test.htpasswd");

    run_htstore(&file_path, &["add", "alice", "--password"], Some("testpass123"));
    let result = run_htstore(
        &file_path,
        &["add", "alice", "--force", "--password"],
        Some("testpass456"),
    );

    assert!(result.success, "stderr: {}", result.stderr);
    assert!(verify(&file_path, "alice", "testpass456"));
}

#[test]
fn test_cli_add_unsupported_method() {
    let dir = create_test_dir();
    let file_path = dir.path().join("test.htpasswd");

    let result = run_htstore(
        &file_path,
        &["add", "alice", "--method", "sha1", "--password"],
        Some("testpass123"),
    );

    assert!(!result.success);
    assert!(result.stderr.contains("Unsupported hash method"), "stderr: {}", result.stderr);
    assert!(!file_path.exists());
}

#[test]
fn test_cli_find_and_list() {
    let dir = create_test_dir();
    let file_path = dir.path().join("test.htpasswd");

    for (user, pass) in [("alice", "pass1"), ("bob", "pass2"), ("charlie", "pass3")] {
        run_htstore(&file_path, &["add", user, "--password"], Some(pass));
    }

    let result = run_htstore(&file_path, &["list"], None);
    assert!(result.success, "stderr: {}", result.stderr);
    assert_eq!(result.stdout, "alice\nbob\ncharlie\n");

    let result = run_htstore(&file_path, &["list", "--raw"], None);
    assert!(result.success, "stderr: {}", result.stderr);
    assert_eq!(result.stdout.lines().count(), 3);
    assert!(result.stdout.lines().all(|line| line.contains(":$2b$")));

    let result = run_htstore(&file_path, &["find", "bob"], None);
    assert!(result.success, "stderr: {}", result.stderr);
    assert!(result.stdout.starts_with("bob:$2b$04$"));

    let result = run_htstore(&file_path, &["find", "dave"], None);
    assert!(!result.success);
    assert!(result.stderr.contains("not found"));
}

#[test]
fn test_cli_list_missing_file() {
    let dir = create_test_dir();
    let file_path = dir.path().join("nofile");

    let result = run_htstore(&file_path, &["list"], None);
    assert!(result.success, "stderr: {}", result.stderr);
    assert!(result.stdout.is_empty());
    assert!(!file_path.exists());
}

#[test]
fn test_cli_verify_password() {
    let dir = create_test_dir();
    let file_path = dir.path().join("test.htpasswd");

    run_htstore(&file_path, &["add", "alice", "--password"], Some("correctpass"));

    let result = run_htstore(&file_path, &["verify", "alice", "--password"], Some("correctpass"));
    assert!(result.success, "stderr: {}", result.stderr);
    assert!(result.stdout.contains("password correct"));

    let result = run_htstore(&file_path, &["verify", "alice", "--password"], Some("wrongpass"));
    assert!(!result.success);
    assert!(result.stderr.contains("incorrect"));

    let result = run_htstore(&file_path, &["verify", "nobody", "--password"], Some("pass"));
    assert!(!result.success);
    assert!(result.stderr.contains("does not exist"));
}

#[test]
fn test_cli_passwd() {
    let dir = create_test_dir();
    let file_path = dir.path().join("test.htpasswd");

    run_htstore(&file_path, &["add", "alice", "--password"], Some("oldpass"));

    let result = run_htstore(
        &file_path,
        &["passwd", "alice", "--password"],
        Some("oldpass\nnewpass\n"),
    );
    assert!(result.success, "stderr: {}", result.stderr);
    assert!(verify(&file_path, "alice", "newpass"));
    assert!(!verify(&file_path, "alice", "oldpass"));
}

#[test]
fn test_cli_passwd_wrong_current_password() {
    let dir = create_test_dir();
    let file_path = dir.path().join("test.htpasswd");

    run_htstore(&file_path, &["add", "alice", "--password"], Some("oldpass"));

    let result = run_htstore(
        &file_path,
        &["passwd", "alice", "--password"],
        Some("wrong\nnewpass\n"),
    );
    assert!(!result.success);
    assert!(result.stderr.contains("Invalid credentials"), "stderr: {}", result.stderr);
    assert!(verify(&file_path, "alice", "oldpass"));
}

#[test]
fn test_cli_passwd_forced() {
    let dir = create_test_dir();
    let file_path = dir.path().join("test.htpasswd");

    run_htstore(&file_path, &["add", "alice", "--password"], Some("oldpass"));

    let result = run_htstore(
        &file_path,
        &["passwd", "alice", "--force", "--password"],
        Some("newpass\n"),
    );
    assert!(result.success, "stderr: {}", result.stderr);
    assert!(verify(&file_path, "alice", "newpass"));
}

#[test]
fn test_cli_passwd_missing_user_and_file() {
    let dir = create_test_dir();
    let file_path = dir.path().join("test.htpasswd");

    let result = run_htstore(
        &file_path,
        &["passwd", "alice", "--password"],
        Some("oldpass\nnewpass\n"),
    );
    assert!(!result.success);
    assert!(result.stderr.contains("does not exist"), "stderr: {}", result.stderr);

    run_htstore(&file_path, &["add", "bob", "--password"], Some("pass"));
    let result = run_htstore(
        &file_path,
        &["passwd", "alice", "--password"],
        Some("oldpass\nnewpass\n"),
    );
    assert!(!result.success);
    assert!(result.stderr.contains("does not exist"), "stderr: {}", result.stderr);
}

#[test]
fn test_cli_remove_user() {
    let dir = create_test_dir();
    let file_path = dir.path().join("test.htpasswd");

    run_htstore(&file_path, &["add", "alice", "--password"], Some("pass"));
    run_htstore(&file_path, &["add", "bob", "--password"], Some("pass"));

    let result = run_htstore(&file_path, &["remove", "alice"], None);
    assert!(result.success, "stderr: {}", result.stderr);
    assert_eq!(result.stdout, "Deleting user alice\n");

    let users = htstore::CredentialStore::open(&file_path).find_all().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].username, "bob");
}

#[test]
fn test_cli_remove_is_idempotent() {
    let dir = create_test_dir();
    let file_path = dir.path().join("test.htpasswd");

    run_htstore(&file_path, &["add", "alice", "--password"], Some("pass"));
    let result = run_htstore(&file_path, &["remove", "nonexistent"], None);
    assert!(result.success, "stderr: {}", result.stderr);
    assert_eq!(result.stdout, "User nonexistent not found, nothing to delete\n");

    let missing = dir.path().join("nofile");
    let result = run_htstore(&missing, &["remove", "alice"], None);
    assert!(result.success, "stderr: {}", result.stderr);
    assert!(result.stdout.contains("nothing to delete"));
    assert!(!missing.exists());
}

#[test]
fn test_cli_line() {
    let dir = create_test_dir();
    let file_path = dir.path().join("test.htpasswd");

    let result = run_htstore(&file_path, &["line", "bob", "--password"], Some("pass123"));
    assert!(result.success, "stderr: {}", result.stderr);

    let line = result.stdout.trim_end();
    let (username, hash) = line.split_once(':').unwrap();
    assert_eq!(username, "bob");
    assert_ne!(hash, "pass123");
    assert!(htstore::verify_password("pass123", hash, None).unwrap());
    assert!(!file_path.exists());
}

#[test]
fn test_cli_comments_preserved() {
    let dir = create_test_dir();
    let file_path = dir.path().join("test.htpasswd");

    {
        let mut file = std::fs::File::create(&file_path).unwrap();
        writeln!(file, "# Comment line 1").unwrap();
        writeln!(file, "# Comment line 2").unwrap();
        writeln!(file, "alice:$2b$12$testhash").unwrap();
    }

    run_htstore(&file_path, &["add", "bob", "--password"], Some("pass456"));

    let content = std::fs::read_to_string(&file_path).unwrap();
    assert!(content.starts_with("# Comment line 1\n# Comment line 2\nalice:$2b$12$testhash\nbob:"));
}
