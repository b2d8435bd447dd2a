use crate::api::LibraryService;
use console::style;
use dialoguer::Confirm;

/// Delete a prompt, confirming first unless `--force` is given.
pub async fn run(svc: &LibraryService, id: &str, force: bool) -> Result<(), String> {
    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete prompt '{}'?", id))
            .default(false)
            .interact()
            .map_err(|e| format!("input error: {}", e))?;
        if !confirmed {
            println!("Cancelled");
            return Ok(());
        }
    }

    svc.delete_prompt(id).await.map_err(|e| e.to_string())?;
    println!("{} Deleted prompt: {}", style("•").green().bold(), id);
    Ok(())
}
