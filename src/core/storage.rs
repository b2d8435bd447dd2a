//! File-system store for prompts, templates and saved searches.
//!
//! Artifacts are Markdown files with a YAML frontmatter block under the
//! library root. The root defaults to `~/.pocket-prompt` and can be
//! overridden with `POCKET_PROMPT_DIR`.

use super::models::{Prompt, SavedSearch, Template};
use super::utils::{ensure_dir, slugify};
use crate::api::{Error, Result};
use sha2::{Digest, Sha256};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Environment variable overriding the library root.
pub const ROOT_ENV: &str = "POCKET_PROMPT_DIR";

/// Name of the private metadata area under the root.
const META_DIR: &str = ".pocket-prompt";

/// Translates between artifact values and files under the library root.
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    /// Create a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Storage { root: root.into() }
    }

    /// Create a store rooted at `$POCKET_PROMPT_DIR`, falling back to
    /// `$HOME/.pocket-prompt`.
    pub fn from_env() -> Result<Self> {
        if let Ok(dir) = env::var(ROOT_ENV) {
            if !dir.is_empty() {
                return Ok(Storage::new(dir));
            }
        }
        let home = env::var("HOME")
            .map_err(|_| Error::Validation("unable to determine HOME directory".to_string()))?;
        Ok(Storage::new(PathBuf::from(home).join(META_DIR)))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn prompts_dir(&self) -> PathBuf {
        self.root.join("prompts")
    }

    fn templates_dir(&self) -> PathBuf {
        self.root.join("templates")
    }

    fn saved_searches_dir(&self) -> PathBuf {
        self.root.join(META_DIR).join("saved_searches")
    }

    /// Create the directory skeleton. Idempotent.
    pub fn init_library(&self) -> Result<()> {
        for dir in [
            self.root.clone(),
            self.prompts_dir(),
            self.templates_dir(),
            self.root.join("packs"),
            self.root.join(META_DIR),
            self.root.join(META_DIR).join("cache"),
            self.saved_searches_dir(),
        ] {
            ensure_dir(&dir)?;
        }
        Ok(())
    }

    /// Read and parse a single prompt file at a root-relative path.
    pub fn load_prompt(&self, path: &Path) -> Result<Prompt> {
        let full_path = self.root.join(path);
        let bytes = fs::read(&full_path)?;
        let source = String::from_utf8_lossy(&bytes);
        let (frontmatter, body) = split_frontmatter(&source)
            .ok_or_else(|| Error::Parse(format!("{}: missing frontmatter delimiter", path.display())))?;

        let mut prompt: Prompt = serde_yaml::from_str(frontmatter)?;
        prompt.content = body;
        prompt.file_path = path.to_path_buf();
        prompt.content_hash = content_hash(&bytes);
        Ok(prompt)
    }

    /// Serialize a prompt to frontmatter + body and write it atomically.
    pub fn save_prompt(&self, prompt: &Prompt) -> Result<()> {
        let frontmatter = serde_yaml::to_string(prompt)?;
        let full_path = self.root.join(&prompt.file_path);
        self.write_artifact(&full_path, &frontmatter, &prompt.content)
    }

    /// Remove a prompt file. Fails when the file is absent.
    pub fn delete_prompt(&self, prompt: &Prompt) -> Result<()> {
        let full_path = self.root.join(&prompt.file_path);
        if !full_path.exists() {
            return Err(Error::NotFound(prompt.file_path.display().to_string()));
        }
        fs::remove_file(&full_path)?;
        Ok(())
    }

    /// Walk `prompts/` recursively, parsing every `*.md` file.
    ///
    /// A file that fails to parse is logged and skipped; enumeration only
    /// fails on directory-level errors.
    pub fn list_prompts(&self) -> Result<Vec<Prompt>> {
        self.walk_markdown(&self.prompts_dir(), |rel| self.load_prompt(rel))
    }

    /// Read and parse a single template file at a root-relative path.
    pub fn load_template(&self, path: &Path) -> Result<Template> {
        let full_path = self.root.join(path);
        let bytes = fs::read(&full_path)?;
        let source = String::from_utf8_lossy(&bytes);
        let (frontmatter, body) = split_frontmatter(&source)
            .ok_or_else(|| Error::Parse(format!("{}: missing frontmatter delimiter", path.display())))?;

        let mut template: Template = serde_yaml::from_str(frontmatter)?;
        template.content = body;
        template.file_path = path.to_path_buf();
        Ok(template)
    }

    /// Serialize a template and write it atomically.
    pub fn save_template(&self, template: &Template) -> Result<()> {
        let frontmatter = serde_yaml::to_string(template)?;
        let full_path = self.root.join(&template.file_path);
        self.write_artifact(&full_path, &frontmatter, &template.content)
    }

    /// Walk `templates/` recursively, parsing every `*.md` file.
    pub fn list_templates(&self) -> Result<Vec<Template>> {
        self.walk_markdown(&self.templates_dir(), |rel| self.load_template(rel))
    }

    /// Enumerate every persisted saved search.
    pub fn list_saved_searches(&self) -> Result<Vec<SavedSearch>> {
        let dir = self.saved_searches_dir();
        let mut searches = Vec::new();
        if !dir.exists() {
            return Ok(searches);
        }
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let data = fs::read_to_string(&path)?;
            match serde_json::from_str::<SavedSearch>(&data) {
                Ok(search) => searches.push(search),
                Err(err) => warn!("skipping saved search {}: {}", path.display(), err),
            }
        }
        searches.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(searches)
    }

    /// Persist a saved search, replacing any existing one with the same name.
    pub fn save_saved_search(&self, search: &SavedSearch) -> Result<()> {
        if search.name.trim().is_empty() {
            return Err(Error::Validation("saved search name must not be empty".to_string()));
        }
        let dir = self.saved_searches_dir();
        ensure_dir(&dir)?;
        let path = dir.join(format!("{}.json", slugify(&search.name)));
        let data = serde_json::to_string_pretty(search)?;
        write_atomic(&path, data.as_bytes())?;
        Ok(())
    }

    /// Delete a saved search by name.
    pub fn delete_saved_search(&self, name: &str) -> Result<()> {
        let path = self
            .saved_searches_dir()
            .join(format!("{}.json", slugify(name)));
        if !path.exists() {
            return Err(Error::NotFound(name.to_string()));
        }
        fs::remove_file(&path)?;
        Ok(())
    }

    fn write_artifact(&self, full_path: &Path, frontmatter: &str, content: &str) -> Result<()> {
        if let Some(dir) = full_path.parent() {
            ensure_dir(dir)?;
        }
        let mut out = String::with_capacity(frontmatter.len() + content.len() + 16);
        out.push_str("---\n");
        out.push_str(frontmatter);
        out.push_str("---\n");
        let body = content.trim();
        if !body.is_empty() {
            out.push('\n');
            out.push_str(body);
        }
        write_atomic(full_path, out.as_bytes())
    }

    fn walk_markdown<T, F>(&self, dir: &Path, load: F) -> Result<Vec<T>>
    where
        F: Fn(&Path) -> Result<T>,
    {
        let mut entries = Vec::new();
        if !dir.exists() {
            return Ok(entries);
        }
        for entry in walkdir::WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| Error::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if entry.path().extension().and_then(|s| s.to_str()) != Some("md") {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(&self.root)
                .unwrap_or(entry.path())
                .to_path_buf();
            match load(&rel) {
                Ok(artifact) => entries.push(artifact),
                Err(err) => warn!("failed to load {}: {}", rel.display(), err),
            }
        }
        Ok(entries)
    }
}

/// Split a frontmatter file into its YAML header and trimmed body.
///
/// The file must start with a `---` line; the header runs to the next
/// `---` line and the remainder is the body.
fn split_frontmatter(source: &str) -> Option<(&str, String)> {
    let mut lines = source.split_inclusive('\n');
    let first = lines.next()?;
    if first.trim_end() != "---" {
        return None;
    }
    let header_start = first.len();
    let mut offset = header_start;
    for line in lines {
        if line.trim_end() == "---" {
            let header = &source[header_start..offset];
            let body = source[offset + line.len()..].trim().to_string();
            return Some((header, body));
        }
        offset += line.len();
    }
    None
}

/// SHA-256 hex digest of the raw file bytes.
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Write via a temporary sibling and rename, so concurrent readers never
/// observe a half-written file.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::Validation(format!("invalid path: {}", path.display())))?;
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{Variable, VariableType};
    use chrono::Utc;
    use tempfile::TempDir;

    fn sample_prompt() -> Prompt {
        let now = Utc::now();
        Prompt {
            id: "code-review".to_string(),
            version: "1.0.0".to_string(),
            title: "Code Review".to_string(),
            description: "Review a diff".to_string(),
            tags: vec!["dev".to_string(), "review".to_string()],
            variables: vec![Variable {
                name: "language".to_string(),
                var_type: VariableType::String,
                description: "Language of the diff".to_string(),
                default: Some(serde_json::json!("rust")),
                required: false,
                options: vec![],
            }],
            template_ref: None,
            created_at: now,
            updated_at: now,
            content: "Review the following diff:\n\n{{diff}}".to_string(),
            file_path: PathBuf::from("prompts/code-review.md"),
            content_hash: String::new(),
        }
    }

    #[test]
    fn prompt_round_trips_through_file() {
        let dir = TempDir::new().unwrap();
        let store = Storage::new(dir.path());
        store.init_library().unwrap();

        let prompt = sample_prompt();
        store.save_prompt(&prompt).unwrap();
        let loaded = store.load_prompt(Path::new("prompts/code-review.md")).unwrap();

        assert_eq!(loaded.id, prompt.id);
        assert_eq!(loaded.version, prompt.version);
        assert_eq!(loaded.title, prompt.title);
        assert_eq!(loaded.description, prompt.description);
        assert_eq!(loaded.tags, prompt.tags);
        assert_eq!(loaded.variables, prompt.variables);
        assert_eq!(loaded.content, prompt.content);
        assert!(!loaded.content_hash.is_empty());
    }

    #[test]
    fn hash_is_pure_across_reads() {
        let dir = TempDir::new().unwrap();
        let store = Storage::new(dir.path());
        store.init_library().unwrap();
        store.save_prompt(&sample_prompt()).unwrap();

        let first = store.load_prompt(Path::new("prompts/code-review.md")).unwrap();
        let second = store.load_prompt(Path::new("prompts/code-review.md")).unwrap();
        assert_eq!(first.content_hash, second.content_hash);
    }

    #[test]
    fn saving_unchanged_prompt_is_bytewise_identical() {
        let dir = TempDir::new().unwrap();
        let store = Storage::new(dir.path());
        store.init_library().unwrap();

        let prompt = sample_prompt();
        store.save_prompt(&prompt).unwrap();
        let before = fs::read(dir.path().join("prompts/code-review.md")).unwrap();

        let reloaded = store.load_prompt(Path::new("prompts/code-review.md")).unwrap();
        store.save_prompt(&reloaded).unwrap();
        let after = fs::read(dir.path().join("prompts/code-review.md")).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn init_library_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = Storage::new(dir.path());
        store.init_library().unwrap();
        store.init_library().unwrap();
        assert!(dir.path().join("prompts").is_dir());
        assert!(dir.path().join("templates").is_dir());
        assert!(dir.path().join("packs").is_dir());
        assert!(dir.path().join(".pocket-prompt/saved_searches").is_dir());
    }

    #[test]
    fn enumeration_skips_unparseable_files() {
        let dir = TempDir::new().unwrap();
        let store = Storage::new(dir.path());
        store.init_library().unwrap();
        store.save_prompt(&sample_prompt()).unwrap();
        fs::write(dir.path().join("prompts/broken.md"), "no frontmatter here").unwrap();

        let prompts = store.list_prompts().unwrap();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].id, "code-review");
    }

    #[test]
    fn delete_missing_prompt_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = Storage::new(dir.path());
        store.init_library().unwrap();
        let prompt = sample_prompt();
        assert!(matches!(store.delete_prompt(&prompt), Err(Error::NotFound(_))));
    }

    #[test]
    fn saved_search_round_trips() {
        use crate::core::boolean::BooleanExpr;
        let dir = TempDir::new().unwrap();
        let store = Storage::new(dir.path());
        store.init_library().unwrap();

        let search = SavedSearch {
            name: "ai work".to_string(),
            expression: BooleanExpr::and(vec![
                BooleanExpr::tag("ai"),
                BooleanExpr::not(BooleanExpr::tag("draft")),
            ]),
            text_query: "analysis".to_string(),
        };
        store.save_saved_search(&search).unwrap();

        let listed = store.list_saved_searches().unwrap();
        assert_eq!(listed, vec![search]);

        store.delete_saved_search("ai work").unwrap();
        assert!(store.list_saved_searches().unwrap().is_empty());
        assert!(matches!(
            store.delete_saved_search("ai work"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn template_round_trips_through_file() {
        use crate::core::models::Slot;
        let dir = TempDir::new().unwrap();
        let store = Storage::new(dir.path());
        store.init_library().unwrap();

        let now = Utc::now();
        let template = Template {
            id: "analysis".to_string(),
            version: "1.0.0".to_string(),
            name: "Analysis scaffold".to_string(),
            description: "Role preamble plus content".to_string(),
            slots: vec![Slot {
                name: "role".to_string(),
                description: "Persona".to_string(),
                required: true,
                default: None,
            }],
            created_at: now,
            updated_at: now,
            content: "You are {{role}}.\n{{content}}".to_string(),
            file_path: PathBuf::from("templates/analysis.md"),
        };
        store.save_template(&template).unwrap();

        let loaded = store.load_template(Path::new("templates/analysis.md")).unwrap();
        assert_eq!(loaded.id, template.id);
        assert_eq!(loaded.name, template.name);
        assert_eq!(loaded.slots, template.slots);
        assert_eq!(loaded.content, template.content);
    }
}
