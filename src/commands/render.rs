use super::parse_vars;
use crate::api::LibraryService;
use crate::cli::RenderFormat;

/// Render a prompt with variable substitution and print it to stdout.
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

    println!("{}", content);
    Ok(())
}
