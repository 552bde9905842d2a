mod commands;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use doc_compare::{ReportError, UnifyError};
use doc_compare_client::ClientError;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "doc-compare")]
#[command(about = "Align two revisions of a document and report where they disagree")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Align two texts chapter by chapter")]
    Unify {
        #[arg(help = "Source revision (.docx or UTF-8 text)")]
        left: PathBuf,
        #[arg(help = "Edited revision (.docx or UTF-8 text)")]
        right: PathBuf,
        #[arg(long, help = "Maximum split threshold")]
        threshold: Option<f64>,
        #[arg(long, value_name = "DIR", help = "Write left.txt and right.txt into this directory")]
        out_dir: Option<PathBuf>,
        #[arg(
            long,
            value_name = "DIR",
            help = "Write per-pass chapter snapshots into this directory"
        )]
        dump_dir: Option<PathBuf>,
        #[arg(long, short, value_enum, default_value = "text", help = "Output format")]
        format: OutputFormat,
    },
    #[command(about = "Render the disagreement protocol as .docx")]
    Report {
        #[arg(help = "Source revision (.docx or UTF-8 text)")]
        left: PathBuf,
        #[arg(help = "Edited revision (.docx or UTF-8 text)")]
        right: PathBuf,
        #[arg(
            long,
            default_value_t = 0,
            help = "Drop rows with at most this many changed characters"
        )]
        count_error: usize,
        #[arg(long, help = "Merge unnumbered paragraphs into the preceding clause")]
        group: bool,
        #[arg(long, help = "Align both texts before comparing")]
        unify: bool,
        #[arg(long, help = "Maximum split threshold used with --unify")]
        threshold: Option<f64>,
        #[arg(long, short, default_value = "data.docx", help = "Output file")]
        output: PathBuf,
    },
    #[command(about = "Print the text of a .docx document")]
    Extract {
        #[arg(help = "Path to the document")]
        path: PathBuf,
    },
    #[command(about = "Run upload, unify and report against a doc-compare server")]
    Remote {
        #[arg(help = "Source document")]
        source: PathBuf,
        #[arg(help = "Edited document")]
        edited: PathBuf,
        #[arg(long, help = "Server base URL (defaults to DOC_COMPARE_SERVER_URL)")]
        server: Option<String>,
        #[arg(long, default_value_t = 200.0, help = "Maximum split threshold")]
        threshold: f64,
        #[arg(
            long,
            default_value_t = 0,
            help = "Drop rows with at most this many changed characters"
        )]
        count_error: usize,
        #[arg(long, help = "Merge unnumbered paragraphs into the preceding clause")]
        group: bool,
        #[arg(long, help = "Skip the unify step")]
        no_unify: bool,
        #[arg(long, short, default_value = "data.docx", help = "Output file")]
        output: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Unify {
            left,
            right,
            threshold,
            out_dir,
            dump_dir,
            format,
        } => commands::unify::run(&left, &right, threshold, out_dir, dump_dir, format),
        Commands::Report {
            left,
            right,
            count_error,
            group,
            unify,
            threshold,
            output,
        } => commands::report::run(&left, &right, count_error, group, unify, threshold, &output),
        Commands::Extract { path } => commands::extract::run(&path),
        Commands::Remote {
            source,
            edited,
            server,
            threshold,
            count_error,
            group,
            no_unify,
            output,
        } => commands::remote::run(commands::remote::RemoteArgs {
            source,
            edited,
            server,
            threshold,
            count_error,
            group,
            unify: !no_unify,
            output,
        }),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            exit_code_for_error(&e)
        }
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();
}

fn exit_code_for_error(err: &anyhow::Error) -> ExitCode {
    if is_internal_error(err) {
        ExitCode::from(3)
    } else {
        ExitCode::from(2)
    }
}

fn is_internal_error(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        if let Some(unify_err) = cause.downcast_ref::<UnifyError>() {
            return !matches!(
                unify_err,
                UnifyError::InvalidThreshold { .. }
                    | UnifyError::EmptySide { .. }
                    | UnifyError::Config(_)
            );
        }
        if let Some(client_err) = cause.downcast_ref::<ClientError>() {
            return matches!(client_err, ClientError::Server { status, .. } if *status >= 500);
        }
        cause.is::<ReportError>()
    })
}
