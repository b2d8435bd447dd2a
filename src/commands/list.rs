use super::format_prompts;
use crate::api::LibraryService;
use crate::cli::OutputFormat;
use console::style;

/// List prompts, optionally filtered by tag or restricted to archives.
pub fn run(
    svc: &LibraryService,
    tag: Option<&str>,
    archived: bool,
    format: OutputFormat,
) -> Result<(), String> {
    let prompts = if archived {
        svc.list_archived_prompts()
    } else if let Some(tag) = tag {
        svc.filter_by_tag(tag)
    } else {
        svc.list_prompts()
    }
    .map_err(|e| e.to_string())?;

    if prompts.is_empty() && format == OutputFormat::Default {
        println!("{}", style("No saved prompts").green().bold());
        return Ok(());
    }
    println!("{}", format_prompts(&prompts, format)?);
    Ok(())
}
