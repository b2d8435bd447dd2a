use crate::api::LibraryService;
use crate::cli::GitCmd;
use console::style;

/// Git synchronization status and manual triggers.
pub async fn run(svc: &LibraryService, cmd: GitCmd) -> Result<(), String> {
    match cmd {
        GitCmd::Status => {
            println!("Git sync status: {}", svc.sync_status().await);
            Ok(())
        }
        GitCmd::Enable => {
            svc.enable_sync();
            println!("Git sync enabled");
            Ok(())
        }
        GitCmd::Disable => {
            svc.disable_sync();
            println!("Git sync disabled");
            Ok(())
        }
        GitCmd::Sync => {
            svc.sync_now("Manual sync").await.map_err(|e| e.to_string())?;
            println!("{} Synced with remote", style("•").green().bold());
            Ok(())
        }
        GitCmd::Pull => {
            svc.pull_now().await.map_err(|e| e.to_string())?;
            println!("{} Pulled remote changes", style("•").green().bold());
            Ok(())
        }
    }
}
