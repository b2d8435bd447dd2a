use crate::api::LibraryService;
use crate::core::models::Prompt;
use chrono::Utc;
use console::style;
use std::io::Read;
use std::path::PathBuf;

/// Create a new prompt from flags, optionally reading the body from stdin.
#[allow(clippy::too_many_arguments)]
pub async fn run(
    svc: &LibraryService,
    id: &str,
    title: Option<String>,
    description: Option<String>,
    content: Option<String>,
    template: Option<String>,
    tags: Vec<String>,
    stdin: bool,
) -> Result<(), String> {
    let content = if stdin {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| format!("failed to read stdin: {}", e))?;
        buf
    } else {
        content.unwrap_or_default()
    };

    let now = Utc::now();
    let prompt = Prompt {
        id: id.to_string(),
        version: "1.0.0".to_string(),
        title: title.unwrap_or_default(),
        description: description.unwrap_or_default(),
        tags: tags.into_iter().map(|t| t.trim().to_string()).collect(),
        variables: vec![],
        template_ref: template,
        created_at: now,
        updated_at: now,
        content,
        file_path: PathBuf::new(),
        content_hash: String::new(),
    };

    svc.create_prompt(prompt).await.map_err(|e| e.to_string())?;
    println!("{} Created prompt: {}", style("•").green().bold(), id);
    Ok(())
}
