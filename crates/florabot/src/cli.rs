use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "florabot")]
#[command(author, version, about = "Multi-tenant Telegram bot platform for flower shops", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the webhook server and background tasks
    Run {
        /// Bind address override (default from BIND_ADDR)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Purge sessions idle longer than the inactivity window
    SweepSessions {
        /// Override the inactivity window, in hours
        #[arg(long)]
        older_than_hours: Option<u64>,

        /// Only report how many sessions would be purged
        #[arg(long)]
        dry_run: bool,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
