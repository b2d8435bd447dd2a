use crate::api::LibraryService;

/// Print every distinct tag, one per line.
pub fn run(svc: &LibraryService) -> Result<(), String> {
    for tag in svc.get_all_tags().map_err(|e| e.to_string())? {
        println!("{}", tag);
    }
    Ok(())
}
