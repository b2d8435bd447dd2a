use super::format_prompts;
use crate::api::LibraryService;
use crate::cli::{OutputFormat, SavedCmd};
use crate::core::boolean;
use crate::core::models::SavedSearch;
use console::style;

/// Saved-search management: list, run, save, delete.
pub async fn run(svc: &LibraryService, cmd: SavedCmd) -> Result<(), String> {
    match cmd {
        SavedCmd::List => {
            let searches = svc.list_saved_searches().map_err(|e| e.to_string())?;
            if searches.is_empty() {
                println!("{}", style("No saved searches").green().bold());
                return Ok(());
            }
            for search in searches {
                let mut line = format!("{}: {}", search.name, search.expression);
                if !search.text_query.is_empty() {
                    line.push_str(&format!(" [text: {}]", search.text_query));
                }
                println!("{}", line);
            }
            Ok(())
        }
        SavedCmd::Run { name } => {
            let prompts = svc.execute_saved_search(&name).map_err(|e| e.to_string())?;
            if prompts.is_empty() {
                println!("{}", style("No match").yellow());
                return Ok(());
            }
            println!("{}", format_prompts(&prompts, OutputFormat::Default)?);
            Ok(())
        }
        SavedCmd::Save { name, expr, text } => {
            let expression = boolean::parse(&expr).map_err(|e| e.to_string())?;
            let search = SavedSearch {
                name: name.clone(),
                expression,
                text_query: text.unwrap_or_default(),
            };
            svc.save_saved_search(search)
                .await
                .map_err(|e| e.to_string())?;
            println!("{} Saved search: {}", style("•").green().bold(), name);
            Ok(())
        }
        SavedCmd::Delete { name } => {
            svc.delete_saved_search(&name)
                .await
                .map_err(|e| e.to_string())?;
            println!("{} Deleted search: {}", style("•").green().bold(), name);
            Ok(())
        }
    }
}
