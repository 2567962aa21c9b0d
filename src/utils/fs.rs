use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{DiffError, Result};

/// 递归列出目录下所有普通文件，返回 (绝对路径, 相对路径)
///
/// 遍历出错时立即失败，不返回部分结果。
pub fn list_files(dir: &Path) -> Result<Vec<(PathBuf, String)>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            DiffError::Io {
                path,
                source: e.into(),
            }
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path
            .strip_prefix(dir)
            .map_err(|_| DiffError::Configuration(format!("无法获取相对路径: {:?}", path)))?;
        files.push((path.to_path_buf(), to_slash(relative)));
    }

    Ok(files)
}

/// 相对路径统一使用 `/` 分隔，保证清单跨平台一致
pub fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// 文件扩展名（区分大小写，不含前导点）
pub fn extension(path: &str) -> Option<&str> {
    let file_name = path.rsplit('/').next()?;
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() { None } else { Some(ext) }
}

/// 删除并重新创建目录，保证不残留上一次运行的文件
pub fn recreate_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir).map_err(DiffError::io(dir))?;
    }
    fs::create_dir_all(dir).map_err(DiffError::io(dir))
}

/// 删除文件后向上清理空目录，直到 `root` 为止
pub fn prune_empty_parents(file: &Path, root: &Path) {
    let mut current = file.parent();
    while let Some(dir) = current {
        if dir == root || !dir.starts_with(root) {
            break;
        }
        // 目录非空时失败，直接停止
        if fs::remove_dir(dir).is_err() {
            break;
        }
        current = dir.parent();
    }
}

/// 将修订号转换为可用作目录名的形式
pub fn sanitize_revision(revision: &str) -> String {
    revision
        .chars()
        .map(|c| if matches!(c, '.' | '/' | '\\' | ':') { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_case_sensitive_and_skips_dotfiles() {
        assert_eq!(extension("assets/icon@2x.png"), Some("png"));
        assert_eq!(extension("assets/ICON.PNG"), Some("PNG"));
        assert_eq!(extension("assets/.hidden"), None);
        assert_eq!(extension("assets/README"), None);
        assert_eq!(extension("a.b/file"), None);
    }

    #[test]
    fn sanitize_revision_replaces_separators() {
        assert_eq!(sanitize_revision("origin/release.1"), "origin_release_1");
        assert_eq!(sanitize_revision("3f2a9c1"), "3f2a9c1");
    }
}
