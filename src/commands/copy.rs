use super::parse_vars;
use crate::api::LibraryService;
use crate::cli::RenderFormat;
use crate::core::clipboard;
use console::style;

/// Render a prompt and copy the result to the system clipboard.
pub fn run(
    svc: &LibraryService,
    id: &str,
    format: RenderFormat,
    vars: &[String],
) -> Result<(), String> {
    let bindings = parse_vars(vars)?;
    let content = match format {
        RenderFormat::Json => svc.render_json(id, &bindings),
        RenderFormat::Text => svc.render_text(id, &bindings),
    }
    .map_err(|e| e.to_string())?;

    clipboard::copy(&content).map_err(|e| e.to_string())?;
    println!(
        "{} Copied prompt '{}' to clipboard",
        style("•").green().bold(),
        id
    );
    Ok(())
}
