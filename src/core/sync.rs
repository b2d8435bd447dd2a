//! Git synchronization: subprocess client and reconcile state machine.
//!
//! The coordinator is the only component allowed to invoke the
//! revision-control client. Every invocation runs under a deadline and
//! reports success, a distinct timeout, or an exit-code failure with the
//! captured stderr.

use crate::api::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tracing::{info, warn};

/// Deadline for mutating git invocations.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(10);
/// Deadline for the `status --porcelain` probe.
const STATUS_DEADLINE: Duration = Duration::from_secs(5);
/// Deadline for the cheap `remote -v` probe.
const PROBE_DEADLINE: Duration = Duration::from_secs(3);

/// Captured output of a successful subprocess run.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// The sole form of external invocation: arguments, working directory and
/// a deadline in, output or a typed failure out.
#[async_trait]
pub trait GitRunner: Send + Sync {
    async fn run(&self, args: &[&str], cwd: &Path, deadline: Duration) -> Result<CommandOutput>;
}

/// Runs the real `git` binary via `tokio::process`.
pub struct SubprocessRunner {
    program: String,
}

impl SubprocessRunner {
    pub fn new() -> Self {
        SubprocessRunner {
            program: "git".to_string(),
        }
    }

    #[cfg(test)]
    fn with_program(program: &str) -> Self {
        SubprocessRunner {
            program: program.to_string(),
        }
    }
}

impl Default for SubprocessRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GitRunner for SubprocessRunner {
    async fn run(&self, args: &[&str], cwd: &Path, deadline: Duration) -> Result<CommandOutput> {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let command = args.join(" ");
        match tokio::time::timeout(deadline, cmd.output()).await {
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout).to_string();
                let stderr = String::from_utf8_lossy(&output.stderr).to_string();
                if output.status.success() {
                    Ok(CommandOutput { stdout, stderr })
                } else {
                    let detail = if stderr.trim().is_empty() { stdout } else { stderr };
                    Err(Error::Subprocess {
                        command,
                        stderr: detail.trim().to_string(),
                    })
                }
            }
            Ok(Err(err)) => Err(Error::Io(err)),
            Err(_) => Err(Error::Timeout {
                command,
                seconds: deadline.as_secs(),
            }),
        }
    }
}

/// Keeps the on-disk library in rough sync with its remote mirror.
pub struct GitSync {
    base_dir: PathBuf,
    enabled: AtomicBool,
    allow_reset: bool,
    runner: Box<dyn GitRunner>,
}

impl GitSync {
    pub fn new(base_dir: impl Into<PathBuf>, allow_reset: bool) -> Self {
        GitSync {
            base_dir: base_dir.into(),
            enabled: AtomicBool::new(false),
            allow_reset,
            runner: Box::new(SubprocessRunner::new()),
        }
    }

    /// Replace the subprocess seam, for tests.
    pub fn with_runner(
        base_dir: impl Into<PathBuf>,
        allow_reset: bool,
        runner: Box<dyn GitRunner>,
    ) -> Self {
        GitSync {
            base_dir: base_dir.into(),
            enabled: AtomicBool::new(false),
            allow_reset,
            runner,
        }
    }

    /// Probe the working copy and enable sync when it has a remote.
    ///
    /// Not an error when the root is not a repository; sync simply stays
    /// disabled and every operation becomes a no-op.
    pub async fn initialize(&self) {
        if !self.is_git_initialized() || !self.has_remote().await {
            self.enabled.store(false, Ordering::SeqCst);
            return;
        }
        self.enabled.store(true, Ordering::SeqCst);
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst) && self.is_git_initialized()
    }

    fn is_git_initialized(&self) -> bool {
        self.base_dir.join(".git").exists()
    }

    async fn has_remote(&self) -> bool {
        match self.run(&["remote", "-v"], PROBE_DEADLINE).await {
            Ok(output) => !output.stdout.trim().is_empty(),
            Err(_) => false,
        }
    }

    async fn run(&self, args: &[&str], deadline: Duration) -> Result<CommandOutput> {
        self.runner.run(args, &self.base_dir, deadline).await
    }

    async fn git(&self, args: &[&str]) -> Result<CommandOutput> {
        self.run(args, DEFAULT_DEADLINE).await
    }

    /// Human-readable sync status for the adapters.
    pub async fn status(&self) -> String {
        if !self.is_git_initialized() {
            return "Git not initialized".to_string();
        }
        if !self.has_remote().await {
            return "No remote configured".to_string();
        }
        if !self.enabled.load(Ordering::SeqCst) {
            return "Git sync disabled".to_string();
        }

        let output = match self
            .run(&["status", "--porcelain", "--branch"], STATUS_DEADLINE)
            .await
        {
            Ok(output) => output,
            Err(Error::Timeout { .. }) => return "Git status timeout".to_string(),
            Err(_) => return "Git status unknown".to_string(),
        };

        let mut lines = output.stdout.lines();
        if let Some(branch_line) = lines.next() {
            if branch_line.contains("[ahead") {
                return "Changes need to be pushed".to_string();
            }
            if branch_line.contains("[behind") {
                return "Remote has new changes".to_string();
            }
        }
        if lines.next().is_some() {
            return "Uncommitted changes".to_string();
        }
        "In sync".to_string()
    }

    /// Pull state: fetch, and fast-forward when strictly behind. Divergence
    /// and conflicts route into the reconcile states.
    pub async fn pull_changes(&self) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }

        self.git(&["fetch", "origin"]).await?;

        if !self.is_behind_remote().await? {
            return Ok(());
        }

        let branch = self.current_branch().await;
        match self.git(&["pull", "origin", &branch]).await {
            Ok(_) => Ok(()),
            Err(err) => self.handle_pull_conflict(err).await,
        }
    }

    /// Full push-sync cycle: pull, stage, commit, push. Called after every
    /// successful mutation; failures are non-fatal for the mutation.
    pub async fn sync_changes(&self, reason: &str) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }

        if let Err(err) = self.pull_changes().await {
            warn!("failed to pull remote changes before sync: {}", err);
        }

        self.git(&["add", "-A"]).await?;

        if !self.has_changes_to_commit().await? {
            return Ok(());
        }

        let message = format!("{} - {}", reason, Utc::now().format("%Y-%m-%d %H:%M:%S"));
        self.git(&["commit", "-m", &message]).await?;

        self.push_with_retry().await
    }

    /// `diff --cached --quiet` exits non-zero exactly when the index holds
    /// staged changes.
    async fn has_changes_to_commit(&self) -> Result<bool> {
        match self.git(&["diff", "--cached", "--quiet"]).await {
            Ok(_) => Ok(false),
            Err(Error::Subprocess { .. }) => Ok(true),
            Err(err) => Err(err),
        }
    }

    /// Push state: one pull-and-retry on a non-fast-forward rejection; a
    /// second rejection is terminal.
    async fn push_with_retry(&self) -> Result<()> {
        let branch = self.current_branch().await;
        let first = match self.git(&["push", "origin", &branch]).await {
            Ok(_) => return Ok(()),
            Err(err) => err,
        };

        let rejected = matches!(
            &first,
            Error::Subprocess { stderr, .. }
                if stderr.contains("rejected") || stderr.contains("non-fast-forward")
        );
        if !rejected {
            return Err(first);
        }

        info!("push rejected, pulling and retrying once");
        if let Err(pull_err) = self.pull_changes().await {
            return Err(Error::Subprocess {
                command: "push".to_string(),
                stderr: format!("push failed and pull failed: push={}, pull={}", first, pull_err),
            });
        }

        let branch = self.current_branch().await;
        match self.git(&["push", "origin", &branch]).await {
            Ok(_) => Ok(()),
            Err(retry_err) => Err(Error::Subprocess {
                command: "push".to_string(),
                stderr: format!(
                    "push failed after pull: original={}, retry={}",
                    first, retry_err
                ),
            }),
        }
    }

    /// Reconcile state: merge preferring local, then rebase, then a hard
    /// reset onto the remote as the explicit last resort.
    async fn handle_pull_conflict(&self, pull_err: Error) -> Result<()> {
        let detail = pull_err.to_string();

        if detail.contains("divergent") || detail.contains("diverged") {
            info!("divergent branches detected, attempting merge strategy");
            let branch = self.current_branch().await;
            if self
                .git(&[
                    "pull",
                    "--strategy=recursive",
                    "--strategy-option=ours",
                    "origin",
                    &branch,
                ])
                .await
                .is_ok()
            {
                return Ok(());
            }

            info!("merge failed, attempting rebase");
            if self
                .git(&["pull", "--rebase", "origin", &branch])
                .await
                .is_ok()
            {
                return Ok(());
            }

            if !self.allow_reset {
                return Err(Error::Conflict(
                    "merge and rebase both failed and hard reset is disabled".to_string(),
                ));
            }
            warn!("merge and rebase both failed, hard-resetting to remote state");
            return self.reset_to_remote().await;
        }

        if detail.contains("conflict") || detail.contains("CONFLICT") {
            info!("merge conflicts detected, resolving with remote versions");
            return self.resolve_conflicts().await;
        }

        Err(pull_err)
    }

    /// ResolveConflicts state: take the remote side of every conflicted
    /// file, stage it, and finalize the merge.
    async fn resolve_conflicts(&self) -> Result<()> {
        let output = self
            .git(&["diff", "--name-only", "--diff-filter=U"])
            .await?;
        let files: Vec<&str> = output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        if files.is_empty() {
            return Err(Error::Conflict("no conflicted files found".to_string()));
        }

        for file in &files {
            self.git(&["checkout", "--theirs", file]).await?;
            self.git(&["add", file]).await?;
        }

        self.git(&["commit", "--no-edit"]).await?;
        info!("resolved conflicts in {} file(s), keeping remote versions", files.len());
        Ok(())
    }

    /// Nuclear option: discard local state in favor of the remote branch.
    async fn reset_to_remote(&self) -> Result<()> {
        let branch = self.current_branch().await;
        self.git(&["fetch", "origin"]).await?;
        self.git(&["reset", "--hard", &format!("origin/{}", branch)])
            .await?;
        warn!("local branch hard-reset to origin/{}", branch);
        Ok(())
    }

    async fn current_branch(&self) -> String {
        match self.run(&["branch", "--show-current"], PROBE_DEADLINE).await {
            Ok(output) => {
                let branch = output.stdout.trim().to_string();
                if branch.is_empty() {
                    "main".to_string()
                } else {
                    branch
                }
            }
            Err(_) => "main".to_string(),
        }
    }

    /// True when the local head is strictly behind the remote branch.
    async fn is_behind_remote(&self) -> Result<bool> {
        let branch = self.current_branch().await;
        let remote = match self
            .run(&["rev-parse", &format!("origin/{}", branch)], PROBE_DEADLINE)
            .await
        {
            Ok(output) => output.stdout.trim().to_string(),
            // Remote branch may not exist yet.
            Err(_) => return Ok(false),
        };

        let local = self
            .run(&["rev-parse", "HEAD"], PROBE_DEADLINE)
            .await?
            .stdout
            .trim()
            .to_string();

        if remote == local {
            return Ok(false);
        }
        match self
            .git(&["merge-base", "--is-ancestor", &local, &remote])
            .await
        {
            Ok(_) => Ok(true),
            Err(Error::Subprocess { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Periodic pull loop. Each tick runs a pull-only cycle behind the
    /// service's mutation gate; every error class is logged once.
    pub async fn background_sync(
        self: Arc<Self>,
        interval: Duration,
        gate: Arc<Mutex<()>>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        if interval.is_zero() || !self.is_enabled() {
            return;
        }

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await; // first tick fires immediately; skip it

        let mut reported: HashSet<&'static str> = HashSet::new();
        loop {
            tokio::select! {
                _ = shutdown.changed() => return,
                _ = ticker.tick() => {
                    let _guard = gate.lock().await;
                    if let Err(err) = self.pull_changes().await {
                        let class = error_class(&err);
                        if reported.insert(class) {
                            warn!("background sync ({}): {}", class, err);
                        }
                    } else {
                        reported.clear();
                    }
                }
            }
        }
    }
}

fn error_class(err: &Error) -> &'static str {
    match err {
        Error::NotFound(_) => "not-found",
        Error::Parse(_) => "parse",
        Error::ExprParse { .. } => "expr-parse",
        Error::Validation(_) => "validation",
        Error::Io(_) => "io",
        Error::Subprocess { .. } => "subprocess",
        Error::Timeout { .. } => "timeout",
        Error::Conflict(_) => "conflict",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use tempfile::TempDir;

    enum Step {
        Ok(&'static str, &'static str),
        Fail(&'static str, &'static str),
        Timeout(&'static str),
    }

    impl Step {
        fn expected(&self) -> &'static str {
            match self {
                Step::Ok(cmd, _) | Step::Fail(cmd, _) | Step::Timeout(cmd) => cmd,
            }
        }
    }

    /// Plays back a fixed script of git invocations, panicking on any
    /// deviation from the expected order.
    struct ScriptedRunner {
        script: StdMutex<VecDeque<Step>>,
        calls: Arc<StdMutex<Vec<String>>>,
    }

    impl ScriptedRunner {
        fn new(script: Vec<Step>) -> (Self, Arc<StdMutex<Vec<String>>>) {
            let calls = Arc::new(StdMutex::new(Vec::new()));
            let runner = ScriptedRunner {
                script: StdMutex::new(script.into()),
                calls: Arc::clone(&calls),
            };
            (runner, calls)
        }
    }

    #[async_trait]
    impl GitRunner for ScriptedRunner {
        async fn run(
            &self,
            args: &[&str],
            _cwd: &Path,
            deadline: Duration,
        ) -> Result<CommandOutput> {
            let subcommand = args[0].to_string();
            self.calls.lock().unwrap().push(args.join(" "));
            let step = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| panic!("unexpected extra git call: {}", args.join(" ")));
            assert_eq!(
                step.expected(),
                subcommand,
                "unexpected call order: got 'git {}'",
                args.join(" ")
            );
            match step {
                Step::Ok(_, stdout) => Ok(CommandOutput {
                    stdout: stdout.to_string(),
                    stderr: String::new(),
                }),
                Step::Fail(_, stderr) => Err(Error::Subprocess {
                    command: args.join(" "),
                    stderr: stderr.to_string(),
                }),
                Step::Timeout(_) => Err(Error::Timeout {
                    command: args.join(" "),
                    seconds: deadline.as_secs(),
                }),
            }
        }
    }

    fn enabled_sync(script: Vec<Step>) -> (GitSync, Arc<StdMutex<Vec<String>>>, TempDir) {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        let (runner, calls) = ScriptedRunner::new(script);
        let sync = GitSync::with_runner(dir.path(), true, Box::new(runner));
        sync.enable();
        (sync, calls, dir)
    }

    // pull_changes with nothing to fast-forward: fetch, branch probe,
    // missing remote branch short-circuits.
    fn quiet_pull_steps() -> Vec<Step> {
        vec![
            Step::Ok("fetch", ""),
            Step::Ok("branch", "main\n"),
            Step::Fail("rev-parse", "unknown revision"),
        ]
    }

    #[tokio::test]
    async fn push_retries_once_after_rejection() {
        let mut script = quiet_pull_steps();
        script.extend([
            Step::Ok("add", ""),
            Step::Fail("diff", ""), // staged delta present
            Step::Ok("commit", ""),
            Step::Ok("branch", "main\n"),
            Step::Fail("push", "! [rejected] main -> main (non-fast-forward)"),
        ]);
        script.extend(quiet_pull_steps());
        script.extend([Step::Ok("branch", "main\n"), Step::Ok("push", "")]);

        let (sync, calls, _dir) = enabled_sync(script);
        sync.sync_changes("edit prompt").await.unwrap();

        let pushes = calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with("push"))
            .count();
        assert_eq!(pushes, 2);
    }

    #[tokio::test]
    async fn second_rejection_is_terminal() {
        let mut script = quiet_pull_steps();
        script.extend([
            Step::Ok("add", ""),
            Step::Fail("diff", ""),
            Step::Ok("commit", ""),
            Step::Ok("branch", "main\n"),
            Step::Fail("push", "! [rejected] main -> main (non-fast-forward)"),
        ]);
        script.extend(quiet_pull_steps());
        script.extend([
            Step::Ok("branch", "main\n"),
            Step::Fail("push", "! [rejected] main -> main (non-fast-forward)"),
        ]);

        let (sync, _calls, _dir) = enabled_sync(script);
        let err = sync.sync_changes("edit prompt").await.unwrap_err();
        assert!(err.to_string().contains("push failed after pull"), "{err}");
    }

    #[tokio::test]
    async fn no_staged_delta_skips_commit_and_push() {
        let mut script = quiet_pull_steps();
        script.extend([Step::Ok("add", ""), Step::Ok("diff", "")]);

        let (sync, calls, _dir) = enabled_sync(script);
        sync.sync_changes("edit prompt").await.unwrap();

        let recorded = calls.lock().unwrap().clone();
        assert!(!recorded.iter().any(|c| c.starts_with("commit")));
        assert!(!recorded.iter().any(|c| c.starts_with("push")));
    }

    #[tokio::test]
    async fn conflicted_files_resolve_remote_wins() {
        let script = vec![
            Step::Ok("fetch", ""),
            Step::Ok("branch", "main\n"),
            Step::Ok("rev-parse", "abc\n"),
            Step::Ok("rev-parse", "def\n"),
            Step::Ok("merge-base", ""), // strictly behind
            Step::Ok("branch", "main\n"),
            Step::Fail("pull", "CONFLICT (content): merge conflict in prompts/a.md"),
            Step::Ok("diff", "prompts/a.md\n"),
            Step::Ok("checkout", ""),
            Step::Ok("add", ""),
            Step::Ok("commit", ""),
        ];

        let (sync, calls, _dir) = enabled_sync(script);
        sync.pull_changes().await.unwrap();

        let recorded = calls.lock().unwrap().clone();
        assert!(recorded.contains(&"checkout --theirs prompts/a.md".to_string()));
        assert!(recorded.contains(&"commit --no-edit".to_string()));
    }

    #[tokio::test]
    async fn divergence_with_reset_disabled_is_conflict() {
        let script = vec![
            Step::Ok("fetch", ""),
            Step::Ok("branch", "main\n"),
            Step::Ok("rev-parse", "abc\n"),
            Step::Ok("rev-parse", "def\n"),
            Step::Ok("merge-base", ""),
            Step::Ok("branch", "main\n"),
            Step::Fail("pull", "hint: You have divergent branches"),
            Step::Ok("branch", "main\n"),
            Step::Fail("pull", "merge failed"),
            Step::Fail("pull", "rebase failed"),
        ];

        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        let (runner, _calls) = ScriptedRunner::new(script);
        let sync = GitSync::with_runner(dir.path(), false, Box::new(runner));
        sync.enable();

        let err = sync.pull_changes().await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)), "{err}");
    }

    #[tokio::test]
    async fn timeout_is_distinct_from_subprocess_failure() {
        let script = vec![Step::Timeout("fetch")];
        let (sync, _calls, _dir) = enabled_sync(script);
        let err = sync.pull_changes().await.unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }), "{err}");
    }

    #[tokio::test]
    async fn disabled_sync_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let (runner, _calls) = ScriptedRunner::new(vec![]);
        let sync = GitSync::with_runner(dir.path(), true, Box::new(runner));
        sync.sync_changes("edit prompt").await.unwrap();
        sync.pull_changes().await.unwrap();
    }

    #[tokio::test]
    async fn real_subprocess_deadline_maps_to_timeout() {
        let dir = TempDir::new().unwrap();
        let runner = SubprocessRunner::with_program("sleep");
        let err = runner
            .run(&["5"], dir.path(), Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }), "{err}");
    }
}
