//! Defines the command-line interface structure using clap.

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "pocket-prompt",
    version,
    about = "Terminal-based AI prompt management"
)]
pub struct Cli {
    /// Initialize a new prompt library
    #[arg(long)]
    pub init: bool,

    /// Start the local HTTP API server
    #[arg(long)]
    pub serve: bool,

    /// Port for the HTTP server
    #[arg(long)]
    pub port: Option<u16>,

    /// Git sync interval in minutes (0 to disable)
    #[arg(long)]
    pub sync_interval: Option<u64>,

    /// Disable periodic git synchronization
    #[arg(long)]
    pub no_git_sync: bool,

    /// With no command, an interactive session starts
    #[command(subcommand)]
    pub command: Option<Cmd>,
}

#[derive(Subcommand)]
pub enum Cmd {
    /// List prompts
    List {
        #[arg(long, short = 't', help = "Filter by tag")]
        tag: Option<String>,
        #[arg(long, short = 'a', help = "Show archived prompts")]
        archived: bool,
        #[arg(long, short = 'f', value_enum, default_value_t)]
        format: OutputFormat,
    },
    /// Search prompts by fuzzy text or boolean tag expression
    Search {
        query: String,
        #[arg(long, short = 'b', help = "Treat the query as a boolean expression")]
        boolean: bool,
        #[arg(long, short = 'f', value_enum, default_value_t)]
        format: OutputFormat,
    },
    /// Show a specific prompt by ID
    Get {
        id: String,
        #[arg(long, short = 'f', value_enum, default_value_t)]
        format: OutputFormat,
    },
    /// Create a new prompt
    Create {
        id: String,
        #[arg(long, help = "Prompt title")]
        title: Option<String>,
        #[arg(long, help = "One-line description")]
        description: Option<String>,
        #[arg(long, help = "Prompt body")]
        content: Option<String>,
        #[arg(long, help = "Template to reference")]
        template: Option<String>,
        #[arg(long, value_delimiter = ',', help = "Comma-separated tags")]
        tags: Vec<String>,
        #[arg(long, help = "Read the body from stdin")]
        stdin: bool,
    },
    /// Edit an existing prompt (the prior version is archived)
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        template: Option<String>,
        #[arg(long, value_delimiter = ',', help = "Replace the tag list")]
        tags: Option<Vec<String>>,
        #[arg(long = "add-tag", help = "Add a tag")]
        add_tags: Vec<String>,
        #[arg(long = "remove-tag", help = "Remove a tag")]
        remove_tags: Vec<String>,
    },
    /// Delete a prompt by ID
    Delete {
        id: String,
        #[arg(long, short = 'f', help = "Skip the confirmation prompt")]
        force: bool,
    },
    /// Render a prompt and copy it to the clipboard
    Copy {
        id: String,
        #[arg(long, short = 'f', value_enum, default_value_t)]
        format: RenderFormat,
        #[arg(long = "var", help = "Variable assignments in key=value format")]
        vars: Vec<String>,
    },
    /// Render a prompt with variable substitution
    Render {
        id: String,
        #[arg(long, short = 'f', value_enum, default_value_t)]
        format: RenderFormat,
        #[arg(long = "var", help = "Variable assignments in key=value format")]
        vars: Vec<String>,
    },
    /// List templates, or show one by ID
    Templates { id: Option<String> },
    /// List all tags
    Tags,
    /// List archived prompts
    Archive {
        #[arg(long, short = 'f', value_enum, default_value_t)]
        format: OutputFormat,
    },
    /// Manage saved searches
    #[command(subcommand, name = "search-saved")]
    SearchSaved(SavedCmd),
    /// Git synchronization status and controls
    #[command(subcommand)]
    Git(GitCmd),
    /// Start an interactive session (REPL)
    Interactive,
}

#[derive(Subcommand)]
pub enum SavedCmd {
    /// List saved searches
    List,
    /// Execute a saved search by name
    Run { name: String },
    /// Save a boolean + text query under a name
    Save {
        name: String,
        #[arg(help = "Boolean expression, e.g. '(ai AND analysis) OR writing'")]
        expr: String,
        #[arg(long, help = "Free-text filter ANDed with the expression")]
        text: Option<String>,
    },
    /// Delete a saved search by name
    Delete { name: String },
}

#[derive(Subcommand)]
pub enum GitCmd {
    /// Show sync status
    Status,
    /// Enable git sync
    Enable,
    /// Disable git sync
    Disable,
    /// Run a full pull + commit + push cycle now
    Sync,
    /// Pull remote changes now
    Pull,
}

/// Output formats for prompt listings.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Default,
    Json,
    Ids,
    Table,
}

/// Output shapes for rendered prompts.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderFormat {
    #[default]
    Text,
    Json,
}
