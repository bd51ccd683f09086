//! CES API CLI binary.
//!
//! A command-line interface for listing and traversing CES entities.

use std::process::ExitCode;

use cesapi::cli::{resolve_options, Cli, Command, Selection};
use cesapi::output::PrettyPrint;
use cesapi::{CesClient, Invocation, Registry, RowCollection};
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if matches!(cli.command, Command::Kinds) {
        let registry = Registry::ces();
        return match output(&registry, &registry, cli.json) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: {e}");
                ExitCode::FAILURE
            }
        };
    }

    let client = match cli
        .credentials()
        .and_then(|(url, token)| CesClient::new(token, url))
    {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Hint: Set CES_API_URL and CES_API_KEY environment variables");
            return ExitCode::FAILURE;
        }
    };

    match run(&client, cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(client: &CesClient, cli: Cli) -> cesapi::Result<()> {
    match cli.command {
        Command::Kinds => {
            let registry: &Registry = client.registry();
            output(registry, registry, cli.json)
        }
        Command::List { kind, selection } => {
            let rows = start(client, &kind, &selection).await?;
            output(&rows, &rows, cli.json)
        }
        Command::Traverse {
            kind,
            names,
            selection,
            concurrency,
            tag_source_rows,
            deadline,
        } => {
            let rows = start(client, &kind, &selection).await?;
            let options = resolve_options(concurrency, tag_source_rows, deadline);
            let result = client
                .dispatcher()
                .traverse(&rows, &names, client, &options)
                .await?;
            match &result {
                Invocation::Related(collection) => output(collection, &result, cli.json),
                Invocation::Column(column) => output(column, &result, cli.json),
            }
        }
    }
}

async fn start(client: &CesClient, kind: &str, selection: &Selection) -> cesapi::Result<RowCollection> {
    let filters = selection.filter_set()?;
    client.list(kind, &selection.query(), &filters).await
}

fn output<J: Serialize + ?Sized, P: PrettyPrint + ?Sized>(
    data: &J,
    display: &P,
    json: bool,
) -> cesapi::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(data)?);
    } else {
        println!("{}", display.pretty_print());
    }
    Ok(())
}
