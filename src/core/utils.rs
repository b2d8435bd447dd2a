use crate::api::Result;
use std::fs;
use std::path::Path;

/// Ensure directory exists.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Turn a saved-search name into a safe file stem.
pub fn slugify(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_replaces_unsafe_characters() {
        assert_eq!(slugify("My AI Search!"), "my-ai-search-");
        assert_eq!(slugify("plain_name-1"), "plain_name-1");
    }
}
