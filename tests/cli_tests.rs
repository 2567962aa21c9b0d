use std::process::Command;
use tempfile::TempDir;

#[test]
fn failure_is_reported_on_stderr_with_logging_disabled() {
    let project = TempDir::new().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_cpd"))
        .env("RUST_LOG", "off")
        .args(["bundle", "windows", "--base", "v1.0.0", "--project-root"])
        .arg(project.path())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("错误: "), "stderr: {stderr}");
    assert!(stderr.contains("windows"), "stderr: {stderr}");
}
