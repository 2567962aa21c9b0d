use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::bundle::{BASELINE_CACHE_ENV, BundleArgs};
use crate::release::ReleaseArgs;

/// 资源差分的热更新打包工具
#[derive(Parser)]
#[command(name = "cpd")]
#[command(about = "只发布变化过的资源的热更新打包工具", long_about = None)]
pub struct Cli {
    /// 输出更详细的日志 (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 对比基线修订打包当前修订，剔除未变化的资源
    Bundle {
        #[command(flatten)]
        bundle: BundleOpts,
        /// 将最终产物打包为 tar.gz
        #[arg(long)]
        archive: Option<PathBuf>,
    },
    /// 只构建并缓存基线资源哈希
    Baseline {
        #[command(flatten)]
        bundle: BundleOpts,
    },
    /// 打包并调用发布工具上传
    Release {
        #[command(flatten)]
        bundle: BundleOpts,
        #[command(flatten)]
        release: ReleaseOpts,
    },
}

#[derive(Args, Debug, Clone)]
pub struct BundleOpts {
    /// 目标平台 (ios / android)
    #[arg(value_name = "PLATFORM")]
    pub platform: String,
    /// 基线修订（上一次发布的提交、分支或标签）
    #[arg(long)]
    pub base: String,
    /// 项目根目录，默认当前目录
    #[arg(long)]
    pub project_root: Option<PathBuf>,
    #[arg(short, long)]
    pub entry_file: Option<PathBuf>,
    #[arg(short, long)]
    pub bundle_name: Option<String>,
    #[arg(short, long, alias = "output-path")]
    pub output_dir: Option<PathBuf>,
    #[arg(short, long)]
    pub sourcemap_output: Option<PathBuf>,
    /// 依赖安装命令，默认根据锁文件推断
    #[arg(long, alias = "npm")]
    pub reinstall_command: Option<String>,
    /// 是否使用 Hermes 编译字节码
    #[arg(long)]
    pub use_hermes: Option<bool>,
    #[arg(long)]
    pub development: bool,
    /// 资源扩展名，覆盖 metro.config.json 中的 assetExts
    #[arg(long, value_delimiter = ',')]
    pub asset_exts: Vec<String>,
    /// 基线哈希缓存路径
    #[arg(long, env = BASELINE_CACHE_ENV)]
    pub baseline_cache: Option<PathBuf>,
    /// 忽略已有的基线缓存
    #[arg(long)]
    pub fresh_baseline: bool,
    /// 随应用打包的资源清单路径
    #[arg(long)]
    pub manifest_path: Option<PathBuf>,
    /// 切换修订前执行 git fetch origin
    #[arg(long)]
    pub fetch: bool,
    #[arg(long = "extra-bundler-option", allow_hyphen_values = true)]
    pub extra_bundler_options: Vec<String>,
    #[arg(long = "extra-hermes-flag", allow_hyphen_values = true)]
    pub extra_hermes_flags: Vec<String>,
}

impl From<BundleOpts> for BundleArgs {
    fn from(opts: BundleOpts) -> Self {
        BundleArgs {
            platform: opts.platform,
            base: opts.base,
            project_root: opts.project_root,
            entry_file: opts.entry_file,
            bundle_name: opts.bundle_name,
            output_dir: opts.output_dir,
            sourcemap_output: opts.sourcemap_output,
            reinstall_command: opts.reinstall_command,
            use_bytecode: opts.use_hermes,
            development: opts.development,
            asset_exts: opts.asset_exts,
            baseline_cache: opts.baseline_cache,
            fresh_baseline: opts.fresh_baseline,
            manifest_path: opts.manifest_path,
            extra_bundler_options: opts.extra_bundler_options,
            extra_bytecode_flags: opts.extra_hermes_flags,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ReleaseOpts {
    /// 发布工具
    #[arg(long, default_value = "appcenter")]
    pub publisher: String,
    #[arg(short, long)]
    pub app: String,
    #[arg(short, long)]
    pub target_binary_version: String,
    #[arg(short, long, default_value = "Staging")]
    pub deployment_name: String,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(short, long)]
    pub mandatory: bool,
    #[arg(short = 'x', long)]
    pub disabled: bool,
    #[arg(short, long)]
    pub rollout: Option<String>,
    #[arg(short = 'k', long)]
    pub private_key_path: Option<String>,
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub disable_duplicate_release_error: bool,
}

impl From<ReleaseOpts> for ReleaseArgs {
    fn from(opts: ReleaseOpts) -> Self {
        ReleaseArgs {
            publisher: opts.publisher,
            app: opts.app,
            target_binary_version: opts.target_binary_version,
            deployment_name: opts.deployment_name,
            description: opts.description,
            mandatory: opts.mandatory,
            disabled: opts.disabled,
            rollout: opts.rollout,
            private_key_path: opts.private_key_path,
            disable_duplicate_release_error: opts.disable_duplicate_release_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_bundle_command() {
        let cli = Cli::try_parse_from([
            "cpd",
            "bundle",
            "ios",
            "--base",
            "v1.2.0",
            "--asset-exts",
            "png,jpg",
            "--use-hermes",
            "false",
            "--extra-bundler-option",
            "--minify=false",
        ])
        .unwrap();

        let Commands::Bundle { bundle, archive } = cli.command else {
            panic!("expected bundle command");
        };
        let args = BundleArgs::from(bundle);
        assert_eq!(args.platform, "ios");
        assert_eq!(args.base, "v1.2.0");
        assert_eq!(args.asset_exts, vec!["png", "jpg"]);
        assert_eq!(args.use_bytecode, Some(false));
        assert_eq!(args.extra_bundler_options, vec!["--minify=false"]);
        assert!(archive.is_none());
    }
}
