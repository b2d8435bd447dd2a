use crate::api::LibraryService;
use crate::cli::{Cmd, OutputFormat};
use crate::core::models::Prompt;
use serde_json::Value;
use std::collections::HashMap;

pub mod archive;
pub mod copy;
pub mod create;
pub mod delete;
pub mod edit;
pub mod get;
pub mod git;
pub mod interactive;
pub mod list;
pub mod render;
pub mod search;
pub mod search_saved;
pub mod tags;
pub mod templates;

/// Dispatches the parsed command to the appropriate handler.
pub async fn dispatch(command: Cmd, svc: &LibraryService) -> Result<(), String> {
    match command {
        Cmd::List {
            tag,
            archived,
            format,
        } => list::run(svc, tag.as_deref(), archived, format),
        Cmd::Search {
            query,
            boolean,
            format,
        } => search::run(svc, &query, boolean, format),
        Cmd::Get { id, format } => get::run(svc, &id, format),
        Cmd::Create {
            id,
            title,
            description,
            content,
            template,
            tags,
            stdin,
        } => create::run(svc, &id, title, description, content, template, tags, stdin).await,
        Cmd::Edit {
            id,
            title,
            description,
            content,
            template,
            tags,
            add_tags,
            remove_tags,
        } => {
            edit::run(
                svc,
                &id,
                title,
                description,
                content,
                template,
                tags,
                &add_tags,
                &remove_tags,
            )
            .await
        }
        Cmd::Delete { id, force } => delete::run(svc, &id, force).await,
        Cmd::Copy { id, format, vars } => copy::run(svc, &id, format, &vars),
        Cmd::Render { id, format, vars } => render::run(svc, &id, format, &vars),
        Cmd::Templates { id } => templates::run(svc, id.as_deref()),
        Cmd::Tags => tags::run(svc),
        Cmd::Archive { format } => archive::run(svc, format),
        Cmd::SearchSaved(sub) => search_saved::run(svc, sub).await,
        Cmd::Git(sub) => git::run(svc, sub).await,
        Cmd::Interactive => interactive::run(svc).await,
    }
}

/// Parse repeated `--var name=value` flags into render bindings.
pub(crate) fn parse_vars(vars: &[String]) -> Result<HashMap<String, Value>, String> {
    let mut map = HashMap::new();
    for var in vars {
        let (name, value) = var
            .split_once('=')
            .ok_or_else(|| format!("invalid --var '{}': expected name=value", var))?;
        map.insert(
            name.trim().to_string(),
            Value::String(value.trim().to_string()),
        );
    }
    Ok(map)
}

/// JSON view of a prompt for `--format json`, including the body the
/// frontmatter serializer keeps out of band.
pub(crate) fn prompt_json(prompt: &Prompt) -> Value {
    serde_json::json!({
        "id": prompt.id,
        "version": prompt.version,
        "title": prompt.title,
        "description": prompt.description,
        "tags": prompt.tags,
        "template": prompt.template_ref,
        "created_at": prompt.created_at,
        "updated_at": prompt.updated_at,
        "content": prompt.content,
        "file_path": prompt.file_path,
        "content_hash": prompt.content_hash,
    })
}

/// Render a prompt list in one of the CLI output formats.
pub(crate) fn format_prompts(prompts: &[Prompt], format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Json => {
            let values: Vec<Value> = prompts.iter().map(prompt_json).collect();
            serde_json::to_string_pretty(&values).map_err(|e| e.to_string())
        }
        OutputFormat::Ids => Ok(prompts
            .iter()
            .map(|p| p.id.as_str())
            .collect::<Vec<_>>()
            .join("\n")),
        OutputFormat::Table => {
            let mut lines = Vec::with_capacity(prompts.len() + 2);
            lines.push(format!(
                "{:<20} {:<30} {:<15} {}",
                "ID", "Title", "Version", "Updated"
            ));
            lines.push("-".repeat(80));
            for p in prompts {
                let mut title = p.title.clone();
                if title.chars().count() > 30 {
                    title = format!("{}...", title.chars().take(27).collect::<String>());
                }
                lines.push(format!(
                    "{:<20} {:<30} {:<15} {}",
                    p.id,
                    title,
                    p.version,
                    p.updated_at.format("%Y-%m-%d")
                ));
            }
            Ok(lines.join("\n"))
        }
        OutputFormat::Default => {
            let mut blocks = Vec::with_capacity(prompts.len());
            for p in prompts {
                let mut block = format!("{} - {}", p.id, p.title);
                if !p.description.is_empty() {
                    block.push_str(&format!("\n  {}", p.description));
                }
                if !p.tags.is_empty() {
                    block.push_str(&format!("\n  Tags: {}", p.tags.join(", ")));
                }
                blocks.push(block);
            }
            Ok(blocks.join("\n\n"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_vars_accepts_pairs_and_rejects_bare_words() {
        let parsed = parse_vars(&["name=John".to_string(), "age=30".to_string()]).unwrap();
        assert_eq!(parsed["name"], Value::String("John".to_string()));
        assert_eq!(parsed["age"], Value::String("30".to_string()));
        assert!(parse_vars(&["oops".to_string()]).is_err());
    }
}
