use crate::api::LibraryService;
use console::style;

/// Apply flag overrides to an existing prompt and save it through the
/// archiving update path.
#[allow(clippy::too_many_arguments)]
pub async fn run(
    svc: &LibraryService,
    id: &str,
    title: Option<String>,
    description: Option<String>,
    content: Option<String>,
    template: Option<String>,
    tags: Option<Vec<String>>,
    add_tags: &[String],
    remove_tags: &[String],
) -> Result<(), String> {
    let mut prompt = svc.get_prompt(id).map_err(|e| e.to_string())?;

    if let Some(title) = title {
        prompt.title = title;
    }
    if let Some(description) = description {
        prompt.description = description;
    }
    if let Some(content) = content {
        prompt.content = content;
    }
    if let Some(template) = template {
        prompt.template_ref = if template.is_empty() {
            None
        } else {
            Some(template)
        };
    }
    if let Some(tags) = tags {
        prompt.tags = tags.into_iter().map(|t| t.trim().to_string()).collect();
    }
    for tag in add_tags {
        let tag = tag.trim();
        if !prompt.tags.iter().any(|t| t == tag) {
            prompt.tags.push(tag.to_string());
        }
    }
    for tag in remove_tags {
        let tag = tag.trim();
        prompt.tags.retain(|t| t != tag);
    }

    svc.update_prompt(prompt).await.map_err(|e| e.to_string())?;
    println!("{} Updated prompt: {}", style("•").green().bold(), id);
    Ok(())
}
