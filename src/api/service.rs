//! The library service: the single orchestrator behind every adapter.
//!
//! One instance is constructed at startup from environment and flags and
//! handed to the UI, CLI and HTTP adapters. Reads are served from the
//! prompt cache; mutations are serialized behind a single gate, reload the
//! cache before returning, and hand the change to the sync coordinator as
//! a best-effort follow-up.

use super::error::{Error, Result};
use crate::core::boolean::BooleanExpr;
use crate::core::cache::PromptCache;
use crate::core::config::Config;
use crate::core::models::{Message, Prompt, SavedSearch, Template, ARCHIVE_TAG};
use crate::core::renderer::Renderer;
use crate::core::search::FuzzySearcher;
use crate::core::storage::Storage;
use crate::core::sync::GitSync;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::warn;

/// Lifecycle of the service's in-memory view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// No enumeration has run yet.
    Uninitialized,
    /// A background enumeration is in flight; reads see the empty snapshot.
    Loading,
    /// The cache mirrors the last full enumeration.
    Ready,
}

/// Business logic for prompt management, shared by all entry points.
pub struct LibraryService {
    storage: Storage,
    config: Config,
    cache: PromptCache,
    write_gate: Arc<Mutex<()>>,
    sync: Arc<GitSync>,
    loader: StdMutex<Option<JoinHandle<Result<Vec<Prompt>>>>>,
}

impl LibraryService {
    /// Build a service rooted at `$POCKET_PROMPT_DIR` (or `~/.pocket-prompt`).
    pub fn new() -> Result<Self> {
        let storage = Storage::from_env()?;
        Self::with_storage(storage)
    }

    /// Build a service over an explicit root directory.
    pub fn with_root(root: impl Into<PathBuf>) -> Result<Self> {
        Self::with_storage(Storage::new(root))
    }

    fn with_storage(storage: Storage) -> Result<Self> {
        let config = Config::load(storage.root())?;
        let sync = Arc::new(GitSync::new(storage.root(), config.sync.allow_reset));
        Ok(LibraryService {
            storage,
            config,
            cache: PromptCache::new(),
            write_gate: Arc::new(Mutex::new(())),
            sync,
            loader: StdMutex::new(None),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn root(&self) -> &std::path::Path {
        self.storage.root()
    }

    /// Create the on-disk library skeleton. Idempotent.
    pub fn init_library(&self) -> Result<()> {
        self.storage.init_library()
    }

    pub fn state(&self) -> ServiceState {
        if self.cache.is_populated() {
            ServiceState::Ready
        } else if self.loader.lock().expect("loader lock poisoned").is_some() {
            ServiceState::Loading
        } else {
            ServiceState::Uninitialized
        }
    }

    /// Start filling the cache on a background task.
    ///
    /// The UI calls this before its first frame and observes completion
    /// through [`poll_loaded`](Self::poll_loaded); reads issued while the
    /// load is in flight return the empty snapshot.
    pub fn load_prompts_async(&self) {
        let mut slot = self.loader.lock().expect("loader lock poisoned");
        if slot.is_some() || self.cache.is_populated() {
            return;
        }
        let storage = Storage::new(self.storage.root());
        *slot = Some(tokio::task::spawn_blocking(move || storage.list_prompts()));
    }

    /// Non-blocking completion check for [`load_prompts_async`](Self::load_prompts_async).
    ///
    /// Returns `None` while the load is still running, and the enumeration
    /// result exactly once when it finishes.
    pub async fn poll_loaded(&self) -> Option<Result<Vec<Prompt>>> {
        let handle = {
            let mut slot = self.loader.lock().expect("loader lock poisoned");
            if slot.as_ref().is_some_and(|task| task.is_finished()) {
                slot.take()
            } else {
                None
            }
        }?;
        match handle.await {
            Ok(Ok(prompts)) => {
                self.cache.replace(prompts.clone());
                Some(Ok(prompts))
            }
            Ok(Err(err)) => Some(Err(err)),
            Err(err) => Some(Err(Error::Io(std::io::Error::other(err)))),
        }
    }

    /// Refill the cache from disk unless it is already populated or a
    /// background load is in flight (reads then see the empty snapshot).
    fn ensure_snapshot(&self) -> Result<()> {
        if self.cache.is_populated() {
            return Ok(());
        }
        if self.loader.lock().expect("loader lock poisoned").is_some() {
            return Ok(());
        }
        self.reload_cache()?;
        Ok(())
    }

    fn reload_cache(&self) -> Result<Vec<Prompt>> {
        let prompts = self.storage.list_prompts()?;
        self.cache.replace(prompts.clone());
        Ok(prompts)
    }

    /// All live (non-archived) prompts.
    pub fn list_prompts(&self) -> Result<Vec<Prompt>> {
        self.ensure_snapshot()?;
        Ok(self.cache.active().unwrap_or_default())
    }

    /// All archived prior versions.
    pub fn list_archived_prompts(&self) -> Result<Vec<Prompt>> {
        self.ensure_snapshot()?;
        Ok(self.cache.archived().unwrap_or_default())
    }

    /// Fuzzy search over active prompts; an empty query lists everything.
    pub fn search_prompts(&self, query: &str) -> Result<Vec<Prompt>> {
        let prompts = self.list_prompts()?;
        Ok(FuzzySearcher::new().search(query, prompts))
    }

    /// Active prompts satisfying a boolean tag expression.
    pub fn search_boolean(&self, expr: &BooleanExpr) -> Result<Vec<Prompt>> {
        Ok(self
            .list_prompts()?
            .into_iter()
            .filter(|p| expr.matches(&p.tags))
            .collect())
    }

    /// Fetch one live prompt by identifier.
    pub fn get_prompt(&self, id: &str) -> Result<Prompt> {
        self.list_prompts()?
            .into_iter()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Active prompts carrying the exact tag.
    pub fn filter_by_tag(&self, tag: &str) -> Result<Vec<Prompt>> {
        Ok(self
            .list_prompts()?
            .into_iter()
            .filter(|p| p.tags.iter().any(|t| t == tag))
            .collect())
    }

    /// Every distinct tag on active prompts, sorted.
    pub fn get_all_tags(&self) -> Result<Vec<String>> {
        let mut tags: Vec<String> = self
            .list_prompts()?
            .into_iter()
            .flat_map(|p| p.tags)
            .collect();
        tags.sort();
        tags.dedup();
        Ok(tags)
    }

    /// Create a new prompt: stamp timestamps, assign the default path, and
    /// persist it.
    pub async fn create_prompt(&self, mut prompt: Prompt) -> Result<Prompt> {
        let _guard = self.write_gate.lock().await;
        self.create_locked(&mut prompt)?;
        self.sync_after_write("Create prompt").await;
        Ok(prompt)
    }

    /// Update an existing prompt, archiving the prior version first and
    /// bumping the live copy's patch version.
    pub async fn update_prompt(&self, mut prompt: Prompt) -> Result<Prompt> {
        let _guard = self.write_gate.lock().await;
        self.update_locked(&mut prompt)?;
        self.sync_after_write("Update prompt").await;
        Ok(prompt)
    }

    /// Create or update by identifier.
    pub async fn save_prompt(&self, mut prompt: Prompt) -> Result<Prompt> {
        let _guard = self.write_gate.lock().await;
        let exists = self
            .reload_cache()?
            .iter()
            .any(|p| !p.is_archived() && p.id == prompt.id);
        if exists {
            self.update_locked(&mut prompt)?;
        } else {
            self.create_locked(&mut prompt)?;
        }
        self.sync_after_write("Save prompt").await;
        Ok(prompt)
    }

    /// Delete the live prompt file. Archived copies are not purged.
    pub async fn delete_prompt(&self, id: &str) -> Result<()> {
        let _guard = self.write_gate.lock().await;
        let prompt = self
            .reload_cache()?
            .into_iter()
            .find(|p| !p.is_archived() && p.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        self.storage.delete_prompt(&prompt)?;
        self.reload_cache()?;
        self.sync_after_write("Delete prompt").await;
        Ok(())
    }

    fn create_locked(&self, prompt: &mut Prompt) -> Result<()> {
        validate_id(&prompt.id)?;
        if self
            .reload_cache()?
            .iter()
            .any(|p| !p.is_archived() && p.id == prompt.id)
        {
            return Err(Error::Validation(format!(
                "prompt '{}' already exists",
                prompt.id
            )));
        }

        let now = Utc::now();
        prompt.created_at = now;
        prompt.updated_at = now;
        if prompt.version.is_empty() {
            prompt.version = "1.0.0".to_string();
        }
        if prompt.file_path.as_os_str().is_empty() {
            prompt.file_path = PathBuf::from("prompts").join(format!("{}.md", prompt.id));
        }

        self.storage.save_prompt(prompt)?;
        self.reload_cache()?;
        Ok(())
    }

    fn update_locked(&self, prompt: &mut Prompt) -> Result<()> {
        let existing = self
            .reload_cache()?
            .into_iter()
            .find(|p| !p.is_archived() && p.id == prompt.id)
            .ok_or_else(|| Error::NotFound(prompt.id.clone()))?;

        self.archive_prior_version(&existing)?;

        prompt.version = bump_patch(&existing.version);
        prompt.created_at = existing.created_at;
        prompt.updated_at = Utc::now();
        if prompt.file_path.as_os_str().is_empty() {
            prompt.file_path = existing.file_path.clone();
        }

        self.storage.save_prompt(prompt)?;
        self.reload_cache()?;
        Ok(())
    }

    /// Clone the live copy under a versioned filename with the `archive`
    /// tag appended.
    fn archive_prior_version(&self, prompt: &Prompt) -> Result<()> {
        let mut archived = prompt.clone();
        if !archived.is_archived() {
            archived.tags.push(ARCHIVE_TAG.to_string());
        }
        archived.file_path =
            PathBuf::from("prompts").join(format!("{}-v{}.md", prompt.id, prompt.version));
        self.storage.save_prompt(&archived)
    }

    /// All templates, enumerated from disk.
    pub fn list_templates(&self) -> Result<Vec<Template>> {
        self.storage.list_templates()
    }

    /// Fetch one template by identifier.
    pub fn get_template(&self, id: &str) -> Result<Template> {
        self.list_templates()?
            .into_iter()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Create or update a template. Templates carry no archival history.
    pub async fn save_template(&self, mut template: Template) -> Result<Template> {
        let _guard = self.write_gate.lock().await;
        validate_id(&template.id)?;
        if template.file_path.as_os_str().is_empty() {
            template.file_path = PathBuf::from("templates").join(format!("{}.md", template.id));
        }
        let now = Utc::now();
        match self.get_template(&template.id) {
            Ok(existing) => {
                template.created_at = existing.created_at;
                template.updated_at = now;
            }
            Err(Error::NotFound(_)) => {
                template.created_at = now;
                template.updated_at = now;
                if template.version.is_empty() {
                    template.version = "1.0.0".to_string();
                }
            }
            Err(err) => return Err(err),
        }
        self.storage.save_template(&template)?;
        self.sync_after_write("Save template").await;
        Ok(template)
    }

    /// Every persisted saved search.
    pub fn list_saved_searches(&self) -> Result<Vec<SavedSearch>> {
        self.storage.list_saved_searches()
    }

    /// Fetch one saved search by name.
    pub fn get_saved_search(&self, name: &str) -> Result<SavedSearch> {
        self.list_saved_searches()?
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    /// Persist a saved search, replacing any previous one with that name.
    pub async fn save_saved_search(&self, search: SavedSearch) -> Result<()> {
        let _guard = self.write_gate.lock().await;
        self.storage.save_saved_search(&search)?;
        self.sync_after_write("Save search").await;
        Ok(())
    }

    /// Delete a saved search by name.
    pub async fn delete_saved_search(&self, name: &str) -> Result<()> {
        let _guard = self.write_gate.lock().await;
        self.storage.delete_saved_search(name)?;
        self.sync_after_write("Delete search").await;
        Ok(())
    }

    /// Run a saved search: evaluate its expression, and when it carries a
    /// free-text filter, intersect with the fuzzy result for that text.
    pub fn execute_saved_search(&self, name: &str) -> Result<Vec<Prompt>> {
        let search = self.get_saved_search(name)?;
        let matched = self.search_boolean(&search.expression)?;
        if search.text_query.is_empty() {
            return Ok(matched);
        }
        let fuzzy = self.search_prompts(&search.text_query)?;
        Ok(fuzzy
            .into_iter()
            .filter(|p| matched.iter().any(|m| m.id == p.id))
            .collect())
    }

    fn template_for(&self, prompt: &Prompt) -> Option<Template> {
        prompt
            .template_ref
            .as_deref()
            .and_then(|id| self.get_template(id).ok())
    }

    /// Render a prompt to plain text, resolving its template reference.
    pub fn render_text(&self, id: &str, bindings: &HashMap<String, Value>) -> Result<String> {
        let prompt = self.get_prompt(id)?;
        let template = self.template_for(&prompt);
        Renderer::new(&prompt, template.as_ref()).render_text(bindings)
    }

    /// Render a prompt to the messages shape.
    pub fn render_messages(
        &self,
        id: &str,
        bindings: &HashMap<String, Value>,
    ) -> Result<Vec<Message>> {
        let prompt = self.get_prompt(id)?;
        let template = self.template_for(&prompt);
        Renderer::new(&prompt, template.as_ref()).render_messages(bindings)
    }

    /// Render a prompt to the messages shape as pretty JSON.
    pub fn render_json(&self, id: &str, bindings: &HashMap<String, Value>) -> Result<String> {
        let prompt = self.get_prompt(id)?;
        let template = self.template_for(&prompt);
        Renderer::new(&prompt, template.as_ref()).render_json(bindings)
    }

    /// Probe the working copy and enable sync when a remote is configured.
    pub async fn initialize_sync(&self) {
        self.sync.initialize().await;
    }

    pub fn enable_sync(&self) {
        self.sync.enable();
    }

    pub fn disable_sync(&self) {
        self.sync.disable();
    }

    /// Human-readable sync status.
    pub async fn sync_status(&self) -> String {
        self.sync.status().await
    }

    /// Manual full sync cycle, serialized with mutations.
    pub async fn sync_now(&self, reason: &str) -> Result<()> {
        let _guard = self.write_gate.lock().await;
        self.sync.sync_changes(reason).await
    }

    /// Manual pull-only cycle, serialized with mutations.
    pub async fn pull_now(&self) -> Result<()> {
        let _guard = self.write_gate.lock().await;
        self.sync.pull_changes().await
    }

    /// Spawn the periodic pull loop; returns its handle. The loop honors
    /// the shutdown signal and exits cleanly.
    pub fn start_background_sync(
        &self,
        interval: Option<Duration>,
        shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let interval = interval
            .unwrap_or_else(|| Duration::from_secs(self.config.sync.interval_minutes * 60));
        let sync = Arc::clone(&self.sync);
        let gate = Arc::clone(&self.write_gate);
        tokio::spawn(sync.background_sync(interval, gate, shutdown))
    }

    /// Best-effort post-mutation push cycle. The local write is the source
    /// of truth; a failed sync never fails the mutation.
    async fn sync_after_write(&self, reason: &str) {
        if let Err(err) = self.sync.sync_changes(reason).await {
            warn!("sync after mutation failed (local write kept): {}", err);
        }
    }
}

/// Identifiers become file names; keep them to a safe character set.
fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(Error::Validation("identifier must not be empty".to_string()));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(Error::Validation(format!(
            "invalid identifier '{}': use letters, digits, '-' and '_'",
            id
        )));
    }
    Ok(())
}

/// Increment the patch component of `X.Y.Z`; non-semver input falls back
/// to appending `.1`, and an empty version starts at `1.0.0`.
fn bump_patch(version: &str) -> String {
    if version.is_empty() {
        return "1.0.0".to_string();
    }
    let parts: Vec<&str> = version.split('.').collect();
    if parts.len() == 3 {
        if let Ok(patch) = parts[2].parse::<u64>() {
            return format!("{}.{}.{}", parts[0], parts[1], patch + 1);
        }
    }
    format!("{}.1", version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bump_patch_increments_third_component() {
        assert_eq!(bump_patch("1.2.3"), "1.2.4");
        assert_eq!(bump_patch("0.0.9"), "0.0.10");
    }

    #[test]
    fn bump_patch_falls_back_on_non_semver() {
        assert_eq!(bump_patch("7"), "7.1");
        assert_eq!(bump_patch("1.2"), "1.2.1");
        assert_eq!(bump_patch("1.2.x"), "1.2.x.1");
        assert_eq!(bump_patch(""), "1.0.0");
    }

    #[test]
    fn identifiers_are_restricted() {
        assert!(validate_id("code-review_2").is_ok());
        assert!(validate_id("").is_err());
        assert!(validate_id("has space").is_err());
        assert!(validate_id("../escape").is_err());
    }
}
