use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use super::compiler::{
    BuildOutput, BundleCompiler, BytecodeCompiler, BytecodeRequest, CompileRequest,
    PackageInstaller,
};
use super::config::BundlerConfig;
use super::snapshot::{SourceSnapshot, WorktreeLock, with_checkout};
use crate::assets::{HashIndex, build_index, changed_assets, scale_map, strip_unchanged, unchanged_assets};
use crate::error::{DiffError, Result};
use crate::metadata::{
    AssetManifest, BaselineCache, ChangedAssetsManifest, ManifestSlot, load_cached_baseline,
    write_baseline_cache,
};
use crate::utils::{recreate_dir, sanitize_revision};

/// 差异报告文件名，写在构建目录中（不随产物发布）
pub const CHANGED_ASSETS_FILE: &str = "changed_assets.json";

/// 构建目录中的标记文件，只有带标记的目录才会被当作过期构建清理
pub const BUILD_MARKER: &str = ".code-push-diff-build";

/// 当前修订的两次编译
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// 仅用于计算清单
    Probe,
    /// 嵌入清单、最终发布的产物
    Final,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    CheckBaselineCache,
    CheckoutBaseline,
    CompileBaseline,
    HashBaseline,
    PersistBaselineHashes,
    RestoreWorktree,
    CompileCurrent(Pass),
    HashCurrent(Pass),
    EmbedManifest,
    StripUnchanged,
    EmitManifest,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::CheckBaselineCache => "check-baseline-cache",
            Stage::CheckoutBaseline => "checkout-baseline",
            Stage::CompileBaseline => "compile-baseline",
            Stage::HashBaseline => "hash-baseline",
            Stage::PersistBaselineHashes => "persist-baseline-hashes",
            Stage::RestoreWorktree => "restore-worktree",
            Stage::CompileCurrent(Pass::Probe) => "compile-current (probe)",
            Stage::CompileCurrent(Pass::Final) => "compile-current",
            Stage::HashCurrent(Pass::Probe) => "hash-current (probe)",
            Stage::HashCurrent(Pass::Final) => "hash-current",
            Stage::EmbedManifest => "embed-manifest",
            Stage::StripUnchanged => "strip-unchanged",
            Stage::EmitManifest => "emit-manifest",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// 打包器、字节码编译器与依赖安装
#[derive(Clone, Copy)]
pub struct Toolchain<'a> {
    pub compiler: &'a dyn BundleCompiler,
    pub bytecode: &'a dyn BytecodeCompiler,
    pub installer: &'a dyn PackageInstaller,
}

/// 一次流程运行的全部状态，构造一次后贯穿每个步骤
pub struct PipelineContext<'a> {
    config: BundlerConfig,
    snapshot: &'a mut dyn SourceSnapshot,
    toolchain: Toolchain<'a>,
    stages: Vec<Stage>,
}

/// 基线准备的结果
#[derive(Debug)]
pub struct BaselineOutcome {
    pub hashes: HashIndex,
    pub from_cache: bool,
    pub cache_path: PathBuf,
    pub stages: Vec<Stage>,
}

/// 完整打包的结果
#[derive(Debug)]
pub struct BundleOutcome {
    pub output: BuildOutput,
    pub build_dir: PathBuf,
    pub changed: ChangedAssetsManifest,
    pub changed_manifest_path: PathBuf,
    pub manifest: AssetManifest,
    pub manifest_path: PathBuf,
    pub stripped: Vec<String>,
    pub baseline_from_cache: bool,
    pub stages: Vec<Stage>,
}

impl<'a> PipelineContext<'a> {
    pub fn new(
        config: BundlerConfig,
        snapshot: &'a mut dyn SourceSnapshot,
        toolchain: Toolchain<'a>,
    ) -> Self {
        Self {
            config,
            snapshot,
            toolchain,
            stages: Vec::new(),
        }
    }

    pub fn config(&self) -> &BundlerConfig {
        &self.config
    }

    /// 只准备基线哈希缓存（CI 中单独的准备阶段）
    pub fn prepare_baseline(mut self) -> Result<BaselineOutcome> {
        let _lock = WorktreeLock::acquire(&self.config.project_root)?;
        let (hashes, from_cache) = self.baseline()?;

        self.enter(Stage::Done);
        Ok(BaselineOutcome {
            hashes,
            from_cache,
            cache_path: self.config.baseline_cache.clone(),
            stages: self.stages,
        })
    }

    /// 完整流程：基线 -> 当前修订 -> 剔除未变化资源 -> 写出清单
    ///
    /// 任何一步失败时工作目录都会恢复，清单文件重置为空对象。
    pub fn run(mut self) -> Result<BundleOutcome> {
        let _lock = WorktreeLock::acquire(&self.config.project_root)?;
        let mut slot = ManifestSlot::claim(&self.config.manifest_path)?;
        fs::create_dir_all(&self.config.output_dir).map_err(DiffError::io(&self.config.output_dir))?;

        let current = self.snapshot.current_revision()?;
        let keep = [sanitize_revision(&current), sanitize_revision(&self.config.base)];
        for stale in prune_stale_builds(&self.config.output_dir, &keep)? {
            log::debug!("删除过期构建目录 {}", stale.display());
        }
        let (baseline, baseline_from_cache) = self.baseline()?;

        log::info!("打包当前修订 {}", current);
        self.enter(Stage::CompileCurrent(Pass::Probe));
        let probe = compile(&self.config, self.toolchain, &current, false)?;
        self.enter(Stage::HashCurrent(Pass::Probe));
        let probe_hashes = build_index(&probe.output_dir, &self.config.asset_exts)?;

        self.enter(Stage::EmbedManifest);
        let manifest = AssetManifest(scale_map(self.config.platform, &probe_hashes, &baseline));
        slot.write(&manifest)?;

        self.enter(Stage::CompileCurrent(Pass::Final));
        let output = compile(&self.config, self.toolchain, &current, true)?;
        self.enter(Stage::HashCurrent(Pass::Final));
        let hashes = build_index(&output.output_dir, &self.config.asset_exts)?;
        ensure_same_unchanged(&probe_hashes, &hashes, &baseline)?;

        self.enter(Stage::StripUnchanged);
        let stripped = strip_unchanged(&output.output_dir, &hashes, &baseline)?;
        log::info!("剔除 {} 个未变化资源", stripped.len());

        self.enter(Stage::EmitManifest);
        let build_dir = self.config.build_dir(&current);
        let changed = ChangedAssetsManifest(changed_assets(&hashes, &baseline));
        let changed_manifest_path = build_dir.join(CHANGED_ASSETS_FILE);
        changed.write(&changed_manifest_path)?;
        let manifest_path = slot.path().to_path_buf();
        slot.commit();

        self.enter(Stage::Done);
        Ok(BundleOutcome {
            output,
            build_dir,
            changed,
            changed_manifest_path,
            manifest,
            manifest_path,
            stripped,
            baseline_from_cache,
            stages: self.stages,
        })
    }

    /// 读取缓存，缺失时切换到基线修订编译并计算哈希
    fn baseline(&mut self) -> Result<(HashIndex, bool)> {
        self.enter(Stage::CheckBaselineCache);
        let config = &self.config;

        if config.fresh_baseline {
            log::info!("忽略基线缓存，重新构建");
        } else if let Some(hashes) =
            load_cached_baseline(&config.baseline_cache, &config.base, config.platform)?
        {
            log::info!(
                "使用基线缓存 {} ({} 个资源)",
                config.baseline_cache.display(),
                hashes.len()
            );
            return Ok((hashes, true));
        }

        let Self {
            config,
            snapshot,
            toolchain,
            stages,
        } = self;

        enter(stages, Stage::CheckoutBaseline);
        let result = with_checkout(&mut **snapshot, &config.base, || {
            log::info!("打包基线 {}", config.base);
            enter(stages, Stage::CompileBaseline);
            let output = compile(config, *toolchain, &config.base, false)?;

            enter(stages, Stage::HashBaseline);
            let hashes = build_index(&output.output_dir, &config.asset_exts)?;

            enter(stages, Stage::PersistBaselineHashes);
            let cache = BaselineCache::new(config.base.clone(), config.platform, hashes);
            write_baseline_cache(&config.baseline_cache, &cache)?;
            Ok(cache.hashes)
        });
        enter(stages, Stage::RestoreWorktree);

        result.map(|hashes| (hashes, false))
    }

    fn enter(&mut self, stage: Stage) {
        enter(&mut self.stages, stage);
    }
}

fn enter(stages: &mut Vec<Stage>, stage: Stage) {
    log::info!("[{}]", stage);
    stages.push(stage);
}

/// 清空构建目录、安装依赖并编译；`finalize` 时执行字节码编译
fn compile(
    config: &BundlerConfig,
    toolchain: Toolchain<'_>,
    revision: &str,
    finalize: bool,
) -> Result<BuildOutput> {
    let build_dir = config.build_dir(revision);
    recreate_dir(&build_dir)?;
    let marker = build_dir.join(BUILD_MARKER);
    fs::write(&marker, revision).map_err(DiffError::io(&marker))?;

    let output_dir = build_dir.join("output");
    fs::create_dir_all(&output_dir).map_err(DiffError::io(&output_dir))?;

    let sourcemap = match &config.sourcemap_output {
        Some(path) if finalize => path.clone(),
        _ => build_dir
            .join("sourcemap")
            .join(format!("{}.map", config.bundle_name)),
    };
    if let Some(parent) = sourcemap.parent() {
        fs::create_dir_all(parent).map_err(DiffError::io(parent))?;
    }

    toolchain.installer.install(config)?;

    let output = toolchain.compiler.compile(&CompileRequest {
        project_root: &config.project_root,
        platform: config.platform,
        entry_file: &config.entry_file,
        bundle_name: &config.bundle_name,
        output_dir: &output_dir,
        sourcemap_output: &sourcemap,
        development: config.development,
        extra_options: &config.extra_bundler_options,
    })?;

    if finalize && config.use_bytecode {
        toolchain.bytecode.compile(&BytecodeRequest {
            project_root: &config.project_root,
            bundle_name: &config.bundle_name,
            output_dir: &output.output_dir,
            sourcemap: &output.sourcemap,
            extra_flags: &config.extra_bytecode_flags,
        })?;
    }

    Ok(output)
}

/// 删除输出目录下其他修订留下的构建目录，没有标记的目录不会被触碰
fn prune_stale_builds(output_dir: &Path, keep: &[String]) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(output_dir).map_err(DiffError::io(output_dir))?;
    let mut removed = Vec::new();

    for entry in entries {
        let path = entry.map_err(DiffError::io(output_dir))?.path();
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        if keep.contains(&name) || !path.join(BUILD_MARKER).is_file() {
            continue;
        }
        fs::remove_dir_all(&path).map_err(DiffError::io(&path))?;
        removed.push(path);
    }

    Ok(removed)
}

/// 最终产物与探测产物的未变化资源必须一致，否则清单与产物不符
fn ensure_same_unchanged(probe: &HashIndex, last: &HashIndex, baseline: &HashIndex) -> Result<()> {
    let collect = |index: &HashIndex| -> BTreeSet<String> {
        unchanged_assets(index, baseline)
            .into_iter()
            .map(|(path, _)| path.to_string())
            .collect()
    };
    let before = collect(probe);
    let after = collect(last);

    if before == after {
        return Ok(());
    }
    Err(DiffError::NonDeterministicBuild {
        paths: before.symmetric_difference(&after).cloned().collect(),
    })
}
