// src/main.rs

use clap::Parser;
use env_logger::Builder;
use eyre::{eyre, Result};
use log::{debug, info, LevelFilter};

use mail_harness::cfg::config::{resolve_config, Config};
use mail_harness::cfg::policy::OnExhausted;
use mail_harness::client_ops::{MailboxClient, RealClock};
use mail_harness::inbucket::InbucketClient;
use mail_harness::notification::NotificationKind;
use mail_harness::notifier::{UnconfiguredNotifier, WebhookNotifier};
use mail_harness::scenario::{filter_by_kind, RunSummary, ScenarioDriver, ScenarioReport};

mod cli;

use cli::{Cli, Command};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder = Builder::new();
    builder.parse_default_env();
    if cli.debug {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.try_init().ok();

    let mut config = resolve_config(cli.config.as_deref())?;
    if let Some(url) = cli.inbucket_url {
        config.inbucket_url = Some(url);
    }
    if let Some(url) = cli.notifier_url {
        config.notifier_url = Some(url);
    }
    if let Some(dir) = cli.golden_dir {
        config.golden_dir = dir;
    }

    let base_url = config.inbucket_base_url();
    debug!("Using mail-capture service at {}", base_url);
    let mailbox = InbucketClient::new(&base_url, config.request_timeout);

    match cli.command {
        Command::Run {
            only,
            parallel,
            unique_recipients,
            strict,
        } => {
            if unique_recipients {
                config.unique_recipients = true;
            }
            if strict {
                config.on_exhausted = OnExhausted::Fail;
            }
            run(&config, mailbox, &only, parallel)
        }
        Command::Check { kind, address } => {
            let kind: NotificationKind = kind
                .parse()
                .map_err(|_| eyre!("Unknown notification kind '{}'", kind))?;
            let scenario = config.scenario_for(kind, address.as_deref());
            let driver = ScenarioDriver::new(mailbox, UnconfiguredNotifier, RealClock, config.driver_settings());
            finish(vec![driver.verify_delivered(&scenario)])
        }
        Command::Reset { addresses } => {
            for address in &addresses {
                mailbox.reset(address)?;
                println!("reset {}", address);
            }
            Ok(())
        }
        Command::List { address } => {
            let summaries = mailbox.list(&address)?;
            for summary in &summaries {
                println!("{}\t{}\t{}", summary.id, summary.to.join(", "), summary.subject);
            }
            info!("{} message(s) for {}", summaries.len(), address);
            Ok(())
        }
    }
}

fn run(config: &Config, mailbox: InbucketClient, only: &[String], parallel: bool) -> Result<()> {
    let notifier_url = config
        .notifier_url
        .as_deref()
        .ok_or_else(|| eyre!("No notifier URL configured; set notifier-url or --notifier-url"))?;
    let notifier = WebhookNotifier::new(notifier_url, config.request_timeout);

    let scenarios = filter_by_kind(config.scenarios(), only)?;
    if scenarios.is_empty() {
        return Err(eyre!("No scenarios match {:?}", only));
    }
    info!("Running {} scenario(s)", scenarios.len());

    let driver = ScenarioDriver::new(mailbox, notifier, RealClock, config.driver_settings());
    let reports = if parallel {
        driver.run_all(&scenarios)?
    } else {
        driver.run_sequential(&scenarios)
    };
    finish(reports)
}

fn finish(reports: Vec<ScenarioReport>) -> Result<()> {
    for report in &reports {
        println!("{}", report);
    }
    let summary = RunSummary::of(&reports);
    println!("{}", summary);
    if summary.has_failures() {
        return Err(eyre!("{} scenario(s) failed", summary.failed));
    }
    Ok(())
}
