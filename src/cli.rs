// src/cli.rs
// =============================================================================
// Command-line flags, parsed with clap's derive API.
//
// The normal way to run job-digest is with no flags at all: it becomes a
// long-running daemon configured entirely from the environment. The flags
// exist for operating it by hand.
// =============================================================================

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "job-digest",
    version,
    about = "Scrapes job listings on a schedule and emails a digest",
    long_about = "job-digest loads a job-search results page, extracts the listings on it \
                  and emails them as an HTML digest - once at startup and then on a fixed \
                  interval. Configuration comes from the environment (or a .env file)."
)]
pub struct Cli {
    /// Run the pipeline a single time, wait for the send to finish, then exit
    #[arg(long)]
    pub once: bool,

    /// Build the digest but log the email instead of sending it
    ///
    /// Mailjet credentials are not needed in this mode.
    #[arg(long)]
    pub dry_run: bool,

    /// Override RUN_INTERVAL_SECS
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_secs: Option<u64>,
}
