mod compiler;
mod config;
mod payload;
mod pipeline;
mod shell;
mod snapshot;

pub use compiler::{
    BuildOutput, BundleCompiler, BytecodeCompiler, BytecodeRequest, CompileRequest, Hermes,
    PackageInstaller, ReactNativeCli, ShellInstaller,
};
pub use config::{
    BASELINE_CACHE_ENV, BundleArgs, BundlerConfig, PROJECT_CONFIG_FILE, Platform, ProjectConfig,
    install_node_modules_command,
};
pub use payload::pack_payload;
pub use pipeline::{
    BUILD_MARKER, BaselineOutcome, BundleOutcome, CHANGED_ASSETS_FILE, Pass, PipelineContext, Stage,
    Toolchain,
};
pub use shell::{run as run_command, run_line};
pub use snapshot::{GitSnapshot, HeadRef, SourceSnapshot, WorktreeLock, with_checkout};
