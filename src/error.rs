use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DiffError>;

/// 差分打包流程中的错误
#[derive(Error, Debug)]
pub enum DiffError {
    #[error("文件读写失败 {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// 外部工具以非零状态退出，附带其原始输出
    #[error("`{tool}` 执行失败 ({status})\n{stdout}{stderr}")]
    ExternalTool {
        tool: String,
        status: String,
        stdout: String,
        stderr: String,
    },

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("无法序列化或解析 {}: {message}", path.display())]
    Serialization { path: PathBuf, message: String },

    #[error("文件不存在: {}", .0.display())]
    NotFound(PathBuf),

    #[error("工作目录 {} 正被另一个进程使用", .0.display())]
    WorktreeBusy(PathBuf),

    #[error("两次编译产出的资源不一致: {}", paths.join(", "))]
    NonDeterministicBuild { paths: Vec<String> },
}

impl DiffError {
    pub fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> DiffError {
        let path = path.into();
        move |source| DiffError::Io { path, source }
    }

    pub fn serialization(path: &Path, err: impl ToString) -> DiffError {
        DiffError::Serialization {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    /// 缓存缺失或损坏，调用方可以选择重新构建基线
    pub fn is_cache_error(&self) -> bool {
        matches!(
            self,
            DiffError::Serialization { .. } | DiffError::NotFound(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_tool_display_includes_captured_output() {
        let err = DiffError::ExternalTool {
            tool: "react-native bundle".to_string(),
            status: "exit status: 1".to_string(),
            stdout: "bundling...\n".to_string(),
            stderr: "SyntaxError: index.js\n".to_string(),
        };

        assert_eq!(
            err.to_string(),
            "`react-native bundle` 执行失败 (exit status: 1)\nbundling...\nSyntaxError: index.js\n"
        );
    }

    #[test]
    fn cache_errors_are_distinguished() {
        assert!(DiffError::NotFound(PathBuf::from("cache.toml")).is_cache_error());
        assert!(DiffError::serialization(Path::new("cache.toml"), "bad").is_cache_error());
        assert!(!DiffError::Configuration("no platform".into()).is_cache_error());
    }
}
