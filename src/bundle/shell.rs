use std::path::Path;
use std::process::{Command, Output};

use crate::error::{DiffError, Result};

/// 执行外部命令并捕获输出，非零退出时把 stdout/stderr 原样放进错误
pub fn run(command: &mut Command, tool: &str) -> Result<Output> {
    log::debug!("$ {:?}", command);

    let output = command.output().map_err(|e| DiffError::ExternalTool {
        tool: tool.to_string(),
        status: "无法启动".to_string(),
        stdout: String::new(),
        stderr: e.to_string(),
    })?;

    if !output.status.success() {
        return Err(DiffError::ExternalTool {
            tool: tool.to_string(),
            status: output.status.to_string(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    Ok(output)
}

/// 通过系统 shell 执行一整行命令，例如 `yarn install`
pub fn run_line(line: &str, cwd: &Path) -> Result<Output> {
    let mut command = shell_command(line);
    command.current_dir(cwd);
    run(&mut command, line)
}

fn shell_command(line: &str) -> Command {
    if cfg!(windows) {
        let mut command = Command::new("cmd");
        command.arg("/C").arg(line);
        command
    } else {
        let mut command = Command::new("sh");
        command.arg("-c").arg(line);
        command
    }
}

/// 命令的标准输出，去掉首尾空白
pub fn stdout_string(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn captures_output_of_failing_command() {
        let err = run_line("echo compiling; echo broken >&2; exit 3", Path::new(".")).unwrap_err();

        match err {
            DiffError::ExternalTool { stdout, stderr, .. } => {
                assert_eq!(stdout, "compiling\n");
                assert_eq!(stderr, "broken\n");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn returns_stdout_on_success() {
        let output = run_line("echo abc123", Path::new(".")).unwrap();
        assert_eq!(stdout_string(&output), "abc123");
    }
}
