use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::config::{BundlerConfig, Platform};
use super::shell;
use crate::error::{DiffError, Result};

/// 一次编译的产物
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutput {
    pub output_dir: PathBuf,
    pub bundle_path: PathBuf,
    pub sourcemap: PathBuf,
}

/// 交给打包器的参数
#[derive(Debug, Clone)]
pub struct CompileRequest<'a> {
    pub project_root: &'a Path,
    pub platform: Platform,
    pub entry_file: &'a Path,
    pub bundle_name: &'a str,
    pub output_dir: &'a Path,
    pub sourcemap_output: &'a Path,
    pub development: bool,
    pub extra_options: &'a [String],
}

/// 交给字节码编译器的参数
#[derive(Debug, Clone)]
pub struct BytecodeRequest<'a> {
    pub project_root: &'a Path,
    pub bundle_name: &'a str,
    pub output_dir: &'a Path,
    pub sourcemap: &'a Path,
    pub extra_flags: &'a [String],
}

/// 把源码树编译成 bundle + 资源 + sourcemap
pub trait BundleCompiler {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<BuildOutput>;
}

/// 原地把 bundle 编译为字节码并合成 sourcemap
pub trait BytecodeCompiler {
    fn compile(&self, request: &BytecodeRequest<'_>) -> Result<()>;
}

/// 每次编译前重新安装依赖
pub trait PackageInstaller {
    fn install(&self, config: &BundlerConfig) -> Result<()>;
}

/// 调用 `node_modules/.bin/react-native bundle`
#[derive(Debug, Default, Clone, Copy)]
pub struct ReactNativeCli;

impl BundleCompiler for ReactNativeCli {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<BuildOutput> {
        let bundle_path = request.output_dir.join(request.bundle_name);

        let mut command = Command::new(node_bin(request.project_root, "react-native"));
        command
            .current_dir(request.project_root)
            .arg("bundle")
            .arg(format!("--platform={}", request.platform))
            .arg(format!("--entry-file={}", request.entry_file.display()))
            .arg(format!("--dev={}", request.development))
            .arg(format!("--bundle-output={}", bundle_path.display()))
            .arg(format!("--sourcemap-output={}", request.sourcemap_output.display()))
            .arg(format!("--assets-dest={}", request.output_dir.display()))
            .arg("--reset-cache")
            .args(request.extra_options);
        shell::run(&mut command, "react-native bundle")?;

        Ok(BuildOutput {
            output_dir: request.output_dir.to_path_buf(),
            bundle_path,
            sourcemap: request.sourcemap_output.to_path_buf(),
        })
    }
}

/// Hermes 字节码编译器
#[derive(Debug, Default, Clone, Copy)]
pub struct Hermes;

impl Hermes {
    fn hermesc(project_root: &Path) -> Result<PathBuf> {
        let os_dir = if cfg!(target_os = "macos") {
            "osx-bin"
        } else if cfg!(windows) {
            "win64-bin"
        } else {
            "linux64-bin"
        };
        let exe = if cfg!(windows) { "hermesc.exe" } else { "hermesc" };

        let candidates = [
            project_root
                .join("node_modules/react-native/sdks/hermesc")
                .join(os_dir)
                .join(exe),
            project_root.join("node_modules/hermes-engine").join(os_dir).join(exe),
        ];
        candidates
            .into_iter()
            .find(|path| path.is_file())
            .ok_or_else(|| DiffError::Configuration("找不到 hermesc，请确认已安装依赖".to_string()))
    }
}

impl BytecodeCompiler for Hermes {
    fn compile(&self, request: &BytecodeRequest<'_>) -> Result<()> {
        let hermesc = Self::hermesc(request.project_root)?;
        let bundle = request.output_dir.join(request.bundle_name);
        let hbc = request.output_dir.join(format!("{}.hbc", request.bundle_name));
        let emit_sourcemap = request.sourcemap.is_file();

        let mut command = Command::new(hermesc);
        command
            .current_dir(request.project_root)
            .arg("-emit-binary")
            .arg("-out")
            .arg(&hbc)
            .arg(&bundle)
            .args(request.extra_flags);
        if emit_sourcemap {
            command.arg("-output-source-map");
        }
        shell::run(&mut command, "hermesc")?;

        fs::rename(&hbc, &bundle).map_err(DiffError::io(&hbc))?;

        if !emit_sourcemap {
            return Ok(());
        }

        // hermesc 输出 <bundle>.hbc.map，与打包器的 sourcemap 合成为一个文件
        let hbc_map = request
            .output_dir
            .join(format!("{}.hbc.map", request.bundle_name));
        let packager_map = request.sourcemap.with_extension("packager.map");
        fs::rename(request.sourcemap, &packager_map).map_err(DiffError::io(request.sourcemap))?;

        let mut compose = Command::new("node");
        compose
            .current_dir(request.project_root)
            .arg(
                request
                    .project_root
                    .join("node_modules/react-native/scripts/compose-source-maps.js"),
            )
            .arg(&packager_map)
            .arg(&hbc_map)
            .arg("-o")
            .arg(request.sourcemap);
        shell::run(&mut compose, "compose-source-maps")?;

        fs::remove_file(&hbc_map).map_err(DiffError::io(&hbc_map))?;
        fs::remove_file(&packager_map).map_err(DiffError::io(&packager_map))?;
        Ok(())
    }
}

/// 通过 shell 执行配置中的安装命令
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellInstaller;

impl PackageInstaller for ShellInstaller {
    fn install(&self, config: &BundlerConfig) -> Result<()> {
        log::info!("使用 `{}` 安装依赖", config.reinstall_command);
        shell::run_line(&config.reinstall_command, &config.project_root).map(|_| ())
    }
}

fn node_bin(project_root: &Path, name: &str) -> PathBuf {
    let file = if cfg!(windows) {
        format!("{}.cmd", name)
    } else {
        name.to_string()
    };
    project_root.join("node_modules").join(".bin").join(file)
}
