#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod output;

use std::process;

use anyhow::Context;
use communitee_webhook::reqwest::ReqwestTransport;
use communitee_webhook::{WebhookAction, WebhookDispatcher, WebhookPayload, WebhookTarget};

use crate::config::{Cli, Command};
use crate::output::{ErrorDocument, EXIT_FAILURE, bulk_report, exit_code, to_json};

// Tracing target constants
pub const TRACING_TARGET_STARTUP: &str = "communitee_cli::startup";
pub const TRACING_TARGET_CONFIG: &str = "communitee_cli::config";
pub const TRACING_TARGET_COMMAND: &str = "communitee_cli::command";

#[tokio::main]
async fn main() {
    let cli = Cli::init();
    Cli::init_tracing();

    let Err(error) = run(cli).await else {
        process::exit(0);
    };

    process::exit(report_error(&error));
}

/// Main application entry point.
async fn run(cli: Cli) -> anyhow::Result<()> {
    cli.log();
    cli.validate()?;

    let transport = ReqwestTransport::new(cli.http.clone()).context("failed to create transport")?;
    let dispatcher = WebhookDispatcher::new(transport, cli.dispatch.clone());

    match cli.command {
        Command::Run { url } => dispatch_one(&dispatcher, &url, WebhookAction::Run).await,
        Command::Stop { url } => dispatch_one(&dispatcher, &url, WebhookAction::Stop).await,
        Command::Send { url, payload } => send(&dispatcher, &url, &payload).await,
        Command::Bulk { action, urls } => bulk(&dispatcher, action, &urls).await,
    }
}

/// Sends a run/stop action to a single webhook.
async fn dispatch_one(
    dispatcher: &WebhookDispatcher,
    url: &str,
    action: WebhookAction,
) -> anyhow::Result<()> {
    let result = dispatcher.dispatch_raw(url, action).await?;
    println!("{}", to_json(&result)?);
    Ok(())
}

/// Sends a caller-supplied JSON object to a single webhook.
async fn send(dispatcher: &WebhookDispatcher, url: &str, payload: &str) -> anyhow::Result<()> {
    let target = WebhookTarget::parse(url)?;
    let value: serde_json::Value = serde_json::from_str(payload).map_err(|err| {
        communitee_webhook::Error::validation()
            .with_message(format!("Invalid --payload JSON: {err}"))
            .with_source(err)
    })?;
    let payload = WebhookPayload::from_value(value)?;

    let result = dispatcher.dispatch_with_retry(&target, payload).await?;
    println!("{}", to_json(&result)?);
    Ok(())
}

/// Sends one action to several webhooks and prints a report for all of them.
///
/// Every URL is validated before any request is sent.
async fn bulk(
    dispatcher: &WebhookDispatcher,
    action: WebhookAction,
    urls: &[String],
) -> anyhow::Result<()> {
    let targets = urls
        .iter()
        .map(|url| WebhookTarget::parse(url))
        .collect::<communitee_webhook::Result<Vec<_>>>()?;

    let results = dispatcher.dispatch_bulk(&targets, action).await;
    println!("{}", to_json(&bulk_report(&targets, &results))?);

    let failed = results.iter().filter(|result| result.is_err()).count();
    tracing::info!(
        target: TRACING_TARGET_COMMAND,
        action = %action,
        total = results.len(),
        failed,
        "Bulk dispatch finished"
    );

    if failed > 0 {
        anyhow::bail!("{failed} of {} bulk dispatches failed", results.len());
    }
    Ok(())
}

/// Writes the error to stderr and returns the process exit code.
fn report_error(error: &anyhow::Error) -> i32 {
    let Some(dispatch_error) = error.downcast_ref::<communitee_webhook::Error>() else {
        tracing::error!(
            target: TRACING_TARGET_COMMAND,
            error = %error,
            "command failed"
        );
        eprintln!("Error: {error:#}");
        return EXIT_FAILURE;
    };

    match to_json(&ErrorDocument::from(dispatch_error)) {
        Ok(document) => eprintln!("{document}"),
        Err(_) => eprintln!("Error: {error:#}"),
    }

    exit_code(dispatch_error)
}
