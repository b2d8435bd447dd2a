use crate::api::LibraryService;
use console::style;

/// List templates, or show one in detail when an ID is given.
pub fn run(svc: &LibraryService, id: Option<&str>) -> Result<(), String> {
    let Some(id) = id else {
        let templates = svc.list_templates().map_err(|e| e.to_string())?;
        if templates.is_empty() {
            println!("{}", style("No templates").green().bold());
            return Ok(());
        }
        for t in templates {
            println!("{} - {}", t.id, t.name);
            if !t.description.is_empty() {
                println!("  {}", t.description);
            }
            println!();
        }
        return Ok(());
    };

    let template = svc.get_template(id).map_err(|e| e.to_string())?;
    println!("ID: {}", template.id);
    println!("Name: {}", template.name);
    if !template.description.is_empty() {
        println!("Description: {}", template.description);
    }
    println!("Created: {}", template.created_at.format("%Y-%m-%d %H:%M"));
    println!("Updated: {}", template.updated_at.format("%Y-%m-%d %H:%M"));
    println!("\nContent:\n{}", template.content);

    if !template.slots.is_empty() {
        println!("\nSlots:");
        for slot in &template.slots {
            let mut line = format!("  {}", slot.name);
            if slot.required {
                line.push_str(" [required]");
            }
            if let Some(default) = &slot.default {
                line.push_str(&format!(" [default: {}]", default));
            }
            if !slot.description.is_empty() {
                line.push_str(&format!(" - {}", slot.description));
            }
            println!("{}", line);
        }
    }
    Ok(())
}
