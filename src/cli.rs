// src/cli.rs

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line interface options for mail-harness.
#[derive(Parser, Debug)]
#[command(
    name = "mail-harness",
    version,
    about = "Verify notification emails through a mail-capture service",
    long_about = None
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Mail-capture service base URL
    #[arg(short = 'I', long, env = "INBUCKET_URL")]
    pub inbucket_url: Option<String>,

    /// Endpoint that triggers notifications in the system under test
    #[arg(short = 'N', long, env = "NOTIFIER_URL")]
    pub notifier_url: Option<String>,

    /// Directory holding the golden fixtures (default: tests/fixtures/golden)
    #[arg(short, long)]
    pub golden_dir: Option<PathBuf>,

    #[arg(short, long, help = "turn on debug logging")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Trigger each notification and verify its delivery
    Run {
        /// Only run kinds matching these globs (e.g. "mfa-*")
        #[arg(long = "only")]
        only: Vec<String>,

        /// Run scenarios concurrently; requires distinct mailboxes
        #[arg(long)]
        parallel: bool,

        /// Give each scenario its own {local}-{kind}@{domain} mailbox
        #[arg(long)]
        unique_recipients: bool,

        /// Treat unconfirmed delivery as a failure
        #[arg(long)]
        strict: bool,
    },

    /// Verify an already-delivered message without resetting or triggering
    Check {
        /// Notification kind, e.g. change-username
        #[arg(long)]
        kind: String,

        /// Recipient address (defaults to the configured recipient)
        #[arg(long)]
        address: Option<String>,
    },

    /// Purge mailboxes
    Reset {
        #[arg(required = true)]
        addresses: Vec<String>,
    },

    /// Print the messages held for an address
    List { address: String },
}
