use std::ffi::OsStr;
use std::path::Path;
use std::process::Command;

use crate::bundle::run_command;
use crate::error::Result;

/// 发布所需的附加信息，原样传给发布工具
#[derive(Debug, Clone)]
pub struct ReleaseArgs {
    /// 发布工具，默认 `appcenter`
    pub publisher: String,
    pub app: String,
    pub target_binary_version: String,
    pub deployment_name: String,
    pub description: Option<String>,
    pub mandatory: bool,
    pub disabled: bool,
    pub rollout: Option<String>,
    pub private_key_path: Option<String>,
    pub disable_duplicate_release_error: bool,
}

impl Default for ReleaseArgs {
    fn default() -> Self {
        Self {
            publisher: "appcenter".to_string(),
            app: String::new(),
            target_binary_version: String::new(),
            deployment_name: "Staging".to_string(),
            description: None,
            mandatory: false,
            disabled: false,
            rollout: None,
            private_key_path: None,
            disable_duplicate_release_error: true,
        }
    }
}

/// 构造 `<publisher> codepush release ...` 命令
pub fn release_command(args: &ReleaseArgs, output_dir: &Path) -> Command {
    let mut command = Command::new(&args.publisher);
    command
        .args(["codepush", "release"])
        .arg("-a")
        .arg(&args.app)
        .arg("-c")
        .arg(output_dir)
        .arg("-t")
        .arg(&args.target_binary_version)
        .arg("-d")
        .arg(&args.deployment_name);

    if let Some(description) = &args.description {
        command.arg("--description").arg(description);
    }
    if args.mandatory {
        command.arg("--mandatory");
    }
    if args.disabled {
        command.arg("--disabled");
    }
    if let Some(rollout) = &args.rollout {
        command.arg("--rollout").arg(rollout);
    }
    if let Some(key) = &args.private_key_path {
        command.arg("--private-key-path").arg(key);
    }
    if args.disable_duplicate_release_error {
        command.arg("--disable-duplicate-release-error");
    }
    command
}

pub fn release(args: &ReleaseArgs, output_dir: &Path) -> Result<()> {
    let mut command = release_command(args, output_dir);
    let rendered: Vec<_> = command.get_args().map(OsStr::to_string_lossy).collect();
    log::info!("发布: {} {}", args.publisher, rendered.join(" "));
    run_command(&mut command, &args.publisher).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_release_arguments() {
        let args = ReleaseArgs {
            app: "org/app-ios".to_string(),
            target_binary_version: "1.4.0".to_string(),
            description: Some("fix icons".to_string()),
            mandatory: true,
            rollout: Some("25".to_string()),
            ..Default::default()
        };

        let command = release_command(&args, Path::new("/tmp/out"));
        let argv: Vec<_> = command
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(command.get_program(), "appcenter");
        assert_eq!(
            argv,
            vec![
                "codepush",
                "release",
                "-a",
                "org/app-ios",
                "-c",
                "/tmp/out",
                "-t",
                "1.4.0",
                "-d",
                "Staging",
                "--description",
                "fix icons",
                "--mandatory",
                "--rollout",
                "25",
                "--disable-duplicate-release-error",
            ]
        );
    }
}
