//! In-memory snapshot of the last full prompt enumeration.

use super::models::Prompt;
use std::sync::RwLock;

/// Memoization layer shared by every library-service caller.
///
/// Reads clone the current snapshot; mutations replace it wholesale. The
/// cache never touches disk and holds no state of its own beyond the last
/// enumeration result.
#[derive(Default)]
pub struct PromptCache {
    snapshot: RwLock<Option<Vec<Prompt>>>,
}

impl PromptCache {
    pub fn new() -> Self {
        PromptCache::default()
    }

    /// True once a full enumeration has been stored.
    pub fn is_populated(&self) -> bool {
        self.snapshot.read().expect("cache lock poisoned").is_some()
    }

    /// The full cached set, or `None` when not yet populated.
    pub fn all(&self) -> Option<Vec<Prompt>> {
        self.snapshot.read().expect("cache lock poisoned").clone()
    }

    /// Prompts without the `archive` tag, in enumeration order.
    pub fn active(&self) -> Option<Vec<Prompt>> {
        self.all()
            .map(|prompts| prompts.into_iter().filter(|p| !p.is_archived()).collect())
    }

    /// Prompts carrying the `archive` tag.
    pub fn archived(&self) -> Option<Vec<Prompt>> {
        self.all()
            .map(|prompts| prompts.into_iter().filter(|p| p.is_archived()).collect())
    }

    /// Replace the snapshot with a fresh enumeration result.
    pub fn replace(&self, prompts: Vec<Prompt>) {
        *self.snapshot.write().expect("cache lock poisoned") = Some(prompts);
    }
}
