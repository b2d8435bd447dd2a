use crate::api::LibraryService;
use crate::cli::{Cli, Cmd};
use crate::commands::dispatch;
use clap::Parser;
use console::style;
use dialoguer::Input;
use std::future::Future;
use std::pin::Pin;

/// Run the CLI in interactive REPL mode.
///
/// Prompt loading starts in the background before the first prompt is
/// shown; completion is observed between commands with a non-blocking
/// poll, so the first frame never waits on disk enumeration.
pub async fn run(svc: &LibraryService) -> Result<(), String> {
    println!("Entering interactive mode. Type 'exit' or 'quit' to leave.");
    svc.load_prompts_async();

    loop {
        if let Some(result) = svc.poll_loaded().await {
            match result {
                Ok(prompts) => println!(
                    "{} Loaded {} prompts",
                    style("•").green().bold(),
                    prompts.len()
                ),
                Err(err) => eprintln!("• Failed to load prompts: {}", err),
            }
        }

        let input: String = Input::new()
            .with_prompt(format!("{}", style("pp >").blue().bold()))
            .allow_empty(true)
            .interact_text()
            .map_err(|e| format!("input error: {}", e))?;

        let input = input.trim();
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            break;
        }
        if input.is_empty() {
            continue;
        }

        let args = match shell_words::split(input) {
            Ok(args) => args,
            Err(e) => {
                eprintln!("• Error parsing command: {}", e);
                continue;
            }
        };

        let full_args = std::iter::once("pocket-prompt".to_string()).chain(args);
        match Cli::try_parse_from(full_args) {
            Ok(cli) => match cli.command {
                Some(Cmd::Interactive) | None => {
                    eprintln!("• Already in interactive mode");
                }
                Some(command) => {
                    // Boxed to break the async recursion through dispatch.
                    let fut: Pin<Box<dyn Future<Output = Result<(), String>> + '_>> =
                        Box::pin(dispatch(command, svc));
                    if let Err(e) = fut.await {
                        eprintln!("• {}", e);
                    }
                }
            },
            Err(e) => {
                e.print().unwrap_or(());
            }
        }
    }
    Ok(())
}
