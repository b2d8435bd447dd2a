use super::format_prompts;
use crate::api::LibraryService;
use crate::cli::OutputFormat;
use console::style;

/// List archived prior versions.
pub fn run(svc: &LibraryService, format: OutputFormat) -> Result<(), String> {
    let prompts = svc.list_archived_prompts().map_err(|e| e.to_string())?;
    if prompts.is_empty() && format == OutputFormat::Default {
        println!("{}", style("No archived prompts").green().bold());
        return Ok(());
    }
    println!("{}", format_prompts(&prompts, format)?);
    Ok(())
}
