use anyhow::{Context, Result};
use clap::Parser;
use std::process;

use code_push_diff::bundle::{
    BundleArgs, BundleOutcome, BundlerConfig, GitSnapshot, Hermes, PipelineContext, ReactNativeCli,
    ShellInstaller, Toolchain, pack_payload,
};
use code_push_diff::cli::{BundleOpts, Cli, Commands};
use code_push_diff::release::release;

fn init_logging(verbose: u8) {
    let log_filter = match verbose {
        0 => "info",
        1 => "info,code_push_diff=debug",
        _ => "trace",
    };
    let log_env = env_logger::Env::default().default_filter_or(log_filter);

    env_logger::Builder::from_env(log_env)
        .format_module_path(false)
        .format_timestamp(None)
        .format_indent(Some(8))
        .init();
}

/// 解析配置并构造流程上下文，配置错误在任何破坏性步骤之前返回
fn with_pipeline<T>(
    opts: BundleOpts,
    body: impl FnOnce(PipelineContext<'_>) -> Result<T>,
) -> Result<T> {
    let fetch = opts.fetch;
    let config = BundlerConfig::resolve(BundleArgs::from(opts))?;

    let mut snapshot = GitSnapshot::new(&config.project_root).with_fetch(fetch);
    let toolchain = Toolchain {
        compiler: &ReactNativeCli,
        bytecode: &Hermes,
        installer: &ShellInstaller,
    };

    body(PipelineContext::new(config, &mut snapshot, toolchain))
}

fn report(outcome: &BundleOutcome) {
    println!("产物目录: {}", outcome.output.output_dir.display());
    println!("  bundle: {}", outcome.output.bundle_path.display());
    println!("  sourcemap: {}", outcome.output.sourcemap.display());
    println!(
        "  变化资源: {} 个, 剔除资源: {} 个{}",
        outcome.changed.len(),
        outcome.stripped.len(),
        if outcome.baseline_from_cache { " (基线来自缓存)" } else { "" }
    );
    println!("  差异报告: {}", outcome.changed_manifest_path.display());
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Bundle { bundle, archive } => {
            let outcome = with_pipeline(bundle, |ctx| Ok(ctx.run()?))?;
            report(&outcome);

            if let Some(archive) = archive {
                pack_payload(&outcome.output.output_dir, &archive)
                    .with_context(|| format!("无法生成压缩包: {}", archive.display()))?;
                println!("压缩包已生成: {}", archive.display());
            }
        }
        Commands::Baseline { bundle } => {
            let outcome = with_pipeline(bundle, |ctx| Ok(ctx.prepare_baseline()?))?;
            println!(
                "基线哈希{}: {} ({} 个资源)",
                if outcome.from_cache { "已存在" } else { "已写入" },
                outcome.cache_path.display(),
                outcome.hashes.len()
            );
        }
        Commands::Release { bundle, release: release_opts } => {
            let outcome = with_pipeline(bundle, |ctx| Ok(ctx.run()?))?;
            report(&outcome);

            release(&release_opts.into(), &outcome.output.output_dir).context("发布失败")?;
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli) {
        if let Some(diff_err) = err.downcast_ref::<code_push_diff::DiffError>()
            && diff_err.is_cache_error()
        {
            log::warn!("基线缓存不可用，可使用 --fresh-baseline 重新构建基线");
        }
        eprintln!("错误: {:#}", err);
        process::exit(1);
    }
}
