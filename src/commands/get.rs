use super::prompt_json;
use crate::api::LibraryService;
use crate::cli::OutputFormat;

/// Show a single prompt.
pub fn run(svc: &LibraryService, id: &str, format: OutputFormat) -> Result<(), String> {
    let prompt = svc.get_prompt(id).map_err(|e| e.to_string())?;

    match format {
        OutputFormat::Json => {
            let json =
                serde_json::to_string_pretty(&prompt_json(&prompt)).map_err(|e| e.to_string())?;
            println!("{}", json);
        }
        OutputFormat::Ids => println!("{}", prompt.id),
        _ => {
            println!("ID: {}", prompt.id);
            println!("Title: {}", prompt.title);
            println!("Version: {}", prompt.version);
            if !prompt.description.is_empty() {
                println!("Description: {}", prompt.description);
            }
            if !prompt.tags.is_empty() {
                println!("Tags: {}", prompt.tags.join(", "));
            }
            if let Some(template) = &prompt.template_ref {
                println!("Template: {}", template);
            }
            println!("Created: {}", prompt.created_at.format("%Y-%m-%d %H:%M"));
            println!("Updated: {}", prompt.updated_at.format("%Y-%m-%d %H:%M"));
            println!("\nContent:\n{}", prompt.content);
        }
    }
    Ok(())
}
