use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use monizze_export::{CsvExporter, run_export};
use monizze_fetch::{HistoryPages, HttpPageSource};
use monizze_ingest::Normalizer;
use std::path::PathBuf;
use std::process::ExitCode;

mod auth;
mod config;
mod state;

const INTERRUPTED: u8 = 130;

#[derive(Parser, Debug)]
#[command(
    name = "monizze",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("MONIZZE_BUILD_SHA"), ")"),
    about = "Export your Monizze voucher history to CSV"
)]
struct Cli {
    /// Debug logging for the export pipeline (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the full transaction history and write it as CSV
    Export(ExportArgs),

    /// Manage the stored bearer token
    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },

    /// Manage ~/.monizze/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Args, Debug)]
struct ExportArgs {
    /// Destination CSV (default: [export].output from config)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Bearer token (default: $MONIZZE_TOKEN, then the stored token)
    #[arg(long)]
    token: Option<String>,

    #[arg(long)]
    base_url: Option<String>,

    #[arg(long)]
    page_size: Option<u32>,

    /// Give up when the history has not ended after this many pages
    #[arg(long)]
    max_pages: Option<usize>,

    /// Quote every field
    #[arg(long)]
    quote_all: bool,
}

#[derive(Subcommand, Debug)]
enum AuthCommand {
    /// Prompt for a bearer token and store it in ~/.monizze/auth.json
    PasteToken,

    /// Delete the stored token
    Clear,

    /// Show where the token will come from
    Status,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write the default config if none exists
    Init,

    /// Print the effective config
    Show,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let outcome = tokio::select! {
        res = run(cli.command) => res,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("interrupted; nothing was written");
            return ExitCode::from(INTERRUPTED);
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "info,monizze=debug,monizze_core=debug,monizze_ingest=debug,monizze_fetch=debug,monizze_export=debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

/// Pipeline failures keep their own code; everything else is 1.
fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<monizze_core::Error>()
        .and_then(|e| u8::try_from(e.exit_code()).ok())
        .unwrap_or(1)
}

async fn run(command: Command) -> Result<()> {
    match command {
        Command::Export(args) => export(args).await?,

        Command::Auth { command } => match command {
            AuthCommand::PasteToken => auth::paste_token()?,
            AuthCommand::Clear => auth::clear_token()?,
            AuthCommand::Status => auth::status()?,
        },

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => config::show_config()?,
        },
    }

    Ok(())
}

async fn export(args: ExportArgs) -> Result<()> {
    let mut cfg = config::load_config()?;
    if let Some(url) = args.base_url {
        cfg.api.base_url = url;
    }
    if let Some(n) = args.page_size {
        cfg.api.page_size = n;
    }
    if let Some(n) = args.max_pages {
        cfg.api.max_pages = n;
    }
    let dest = args.out.unwrap_or_else(|| cfg.export.output.clone());
    let exporter = CsvExporter::new(args.quote_all || cfg.export.quote_all);

    let token = auth::resolve_token(args.token)?;
    let fetch = cfg.fetch_config();
    log::info!("fetching history from {}", fetch.endpoint());

    let source = HttpPageSource::new(&token, &fetch)?;
    let pages = HistoryPages::with_max_pages(source, cfg.api.max_pages);
    let summary = run_export(pages, &Normalizer::new(), &exporter, &dest)
        .await
        .with_context(|| format!("exporting to {}", dest.display()))?;

    println!(
        "Fetched {} pages ({} entries, {} repeats dropped)",
        summary.pages, summary.entries, summary.duplicates
    );
    println!("Wrote {} transactions to {}", summary.rows, summary.path.display());
    Ok(())
}
