use fs2::FileExt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::Command;

use super::shell;
use crate::error::{DiffError, Result};
use crate::utils::hash_str;

/// 工作目录的版本切换
pub trait SourceSnapshot {
    fn current_revision(&mut self) -> Result<String>;
    /// 以分离头指针方式切换到 `revision`
    fn checkout(&mut self, revision: &str) -> Result<()>;
    /// 回到切换前的分支
    fn restore_previous(&mut self) -> Result<()>;
}

/// 切换前 HEAD 所在的位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadRef {
    Branch(String),
    /// 分离头指针，记录提交哈希
    Detached(String),
}

/// 基于 git 命令行的实现
#[derive(Debug, Clone)]
pub struct GitSnapshot {
    root: PathBuf,
    fetch: bool,
    previous: Option<HeadRef>,
}

impl GitSnapshot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            fetch: false,
            previous: None,
        }
    }

    /// 切换前先执行 `git fetch origin`
    pub fn with_fetch(mut self, fetch: bool) -> Self {
        self.fetch = fetch;
        self
    }

    fn git(&self, args: &[&str]) -> Result<String> {
        let mut command = Command::new("git");
        command.current_dir(&self.root).args(args);
        let output = shell::run(&mut command, &format!("git {}", args.join(" ")))?;
        Ok(shell::stdout_string(&output))
    }

    /// 当前所在分支；CI 中常见的分离头指针返回提交哈希
    pub fn head_ref(&self) -> Result<HeadRef> {
        match self.git(&["symbolic-ref", "-q", "--short", "HEAD"]) {
            Ok(branch) if !branch.is_empty() => Ok(HeadRef::Branch(branch)),
            _ => self.git(&["rev-parse", "HEAD"]).map(HeadRef::Detached),
        }
    }
}

impl SourceSnapshot for GitSnapshot {
    fn current_revision(&mut self) -> Result<String> {
        self.git(&["rev-parse", "HEAD"])
    }

    fn checkout(&mut self, revision: &str) -> Result<()> {
        if self.fetch {
            self.git(&["fetch", "origin"])?;
        }
        let previous = self.head_ref()?;
        log::info!("切换到 {}", revision);
        self.git(&["checkout", "--detach", revision])?;
        self.previous = Some(previous);
        Ok(())
    }

    fn restore_previous(&mut self) -> Result<()> {
        let Some(previous) = self.previous.take() else {
            return Err(DiffError::Configuration(
                "没有记录切换前的修订，无法恢复工作目录".to_string(),
            ));
        };
        match &previous {
            HeadRef::Branch(branch) => {
                log::info!("恢复到分支 {}", branch);
                self.git(&["checkout", branch.as_str()])?;
            }
            HeadRef::Detached(commit) => {
                log::info!("恢复到提交 {}", commit);
                self.git(&["checkout", "--detach", commit.as_str()])?;
            }
        }
        Ok(())
    }
}

/// 切换到 `revision` 执行 `body`，无论成功与否都会恢复工作目录
///
/// `body` 的错误优先返回；恢复失败只在 `body` 成功时作为错误返回。
pub fn with_checkout<S, T, F>(snapshot: &mut S, revision: &str, body: F) -> Result<T>
where
    S: SourceSnapshot + ?Sized,
    F: FnOnce() -> Result<T>,
{
    snapshot.checkout(revision)?;
    let result = body();
    let restored = snapshot.restore_previous();

    match (result, restored) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(restore_err)) => {
            log::error!("恢复工作目录失败: {}", restore_err);
            Err(e)
        }
    }
}

/// 同一工作目录同时只允许一个流程运行
///
/// 锁文件位于临时目录，文件名由项目路径的哈希决定；释放于 drop。
#[derive(Debug)]
pub struct WorktreeLock {
    file: File,
    path: PathBuf,
}

impl WorktreeLock {
    pub fn acquire(project_root: &Path) -> Result<Self> {
        let key = project_root
            .canonicalize()
            .unwrap_or_else(|_| project_root.to_path_buf());
        let dir = std::env::temp_dir().join("code-push-diff-locks");
        fs::create_dir_all(&dir).map_err(DiffError::io(&dir))?;

        let path = dir.join(format!("{}.lock", &hash_str(&key.to_string_lossy())[..16]));
        let file = File::create(&path).map_err(DiffError::io(&path))?;
        file.try_lock_exclusive()
            .map_err(|_| DiffError::WorktreeBusy(project_root.to_path_buf()))?;

        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorktreeLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
        fail_restore: bool,
    }

    impl SourceSnapshot for Recorder {
        fn current_revision(&mut self) -> Result<String> {
            Ok("head".to_string())
        }

        fn checkout(&mut self, revision: &str) -> Result<()> {
            self.events.push(format!("checkout {revision}"));
            Ok(())
        }

        fn restore_previous(&mut self) -> Result<()> {
            self.events.push("restore".to_string());
            if self.fail_restore {
                return Err(DiffError::Configuration("restore failed".to_string()));
            }
            Ok(())
        }
    }

    #[test]
    fn restores_after_failing_body() {
        let mut snapshot = Recorder::default();

        let result: Result<()> = with_checkout(&mut snapshot, "v1", || {
            Err(DiffError::Configuration("compile failed".to_string()))
        });

        assert!(matches!(result, Err(DiffError::Configuration(m)) if m == "compile failed"));
        assert_eq!(snapshot.events, vec!["checkout v1", "restore"]);
    }

    #[test]
    fn restore_failure_surfaces_when_body_succeeds() {
        let mut snapshot = Recorder {
            fail_restore: true,
            ..Default::default()
        };

        let result = with_checkout(&mut snapshot, "v1", || Ok(42));

        assert!(matches!(result, Err(DiffError::Configuration(m)) if m == "restore failed"));
    }

    fn git(root: &Path, args: &[&str]) -> String {
        let mut command = Command::new("git");
        command
            .current_dir(root)
            .args(["-c", "user.name=ci", "-c", "user.email=ci@example.com"])
            .args(["-c", "commit.gpgsign=false"])
            .args(args);
        let output = shell::run(&mut command, "git").unwrap();
        shell::stdout_string(&output)
    }

    fn repo_with_two_commits() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        git(dir.path(), &["init", "-q"]);
        git(dir.path(), &["commit", "-q", "--allow-empty", "-m", "one"]);
        git(dir.path(), &["checkout", "-q", "-b", "work"]);
        git(dir.path(), &["commit", "-q", "--allow-empty", "-m", "two"]);
        dir
    }

    #[test]
    fn restores_detached_head_to_same_commit() {
        let repo = repo_with_two_commits();
        let head = git(repo.path(), &["rev-parse", "HEAD"]);
        git(repo.path(), &["checkout", "-q", "--detach", "HEAD"]);

        let mut snapshot = GitSnapshot::new(repo.path());
        let seen = with_checkout(&mut snapshot, "HEAD~1", || {
            Ok(git(repo.path(), &["rev-parse", "HEAD"]))
        })
        .unwrap();

        assert_ne!(seen, head);
        assert_eq!(git(repo.path(), &["rev-parse", "HEAD"]), head);
        assert_eq!(
            snapshot.head_ref().unwrap(),
            HeadRef::Detached(head.clone())
        );
    }

    #[test]
    fn restores_branch_after_failing_body() {
        let repo = repo_with_two_commits();

        let mut snapshot = GitSnapshot::new(repo.path());
        let result: Result<()> = with_checkout(&mut snapshot, "HEAD~1", || {
            Err(DiffError::Configuration("compile failed".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(
            snapshot.head_ref().unwrap(),
            HeadRef::Branch("work".to_string())
        );
    }

    #[test]
    fn second_lock_on_same_tree_is_refused() {
        let dir = tempfile::tempdir().unwrap();

        let first = WorktreeLock::acquire(dir.path()).unwrap();
        let second = WorktreeLock::acquire(dir.path());
        assert!(matches!(second, Err(DiffError::WorktreeBusy(_))));

        drop(first);
        assert!(WorktreeLock::acquire(dir.path()).is_ok());
    }
}
