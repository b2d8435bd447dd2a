use super::format_prompts;
use crate::api::LibraryService;
use crate::cli::OutputFormat;
use crate::core::boolean;
use console::style;

/// Search prompts by fuzzy text, or by boolean tag expression with `-b`.
pub fn run(
    svc: &LibraryService,
    query: &str,
    boolean: bool,
    format: OutputFormat,
) -> Result<(), String> {
    let prompts = if boolean {
        let expr = boolean::parse(query).map_err(|e| e.to_string())?;
        svc.search_boolean(&expr)
    } else {
        svc.search_prompts(query)
    }
    .map_err(|e| e.to_string())?;

    if prompts.is_empty() && format == OutputFormat::Default {
        println!("{}", style("No match").yellow());
        return Ok(());
    }
    println!("{}", format_prompts(&prompts, format)?);
    Ok(())
}
