use anyhow::{Context, Result};
use doc_compare_client::{ClientConfig, CompareClient, Session};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

pub struct RemoteArgs {
    pub source: PathBuf,
    pub edited: PathBuf,
    pub server: Option<String>,
    pub threshold: f64,
    pub count_error: usize,
    pub group: bool,
    pub unify: bool,
    pub output: PathBuf,
}

pub fn run(args: RemoteArgs) -> Result<ExitCode> {
    let mut config = ClientConfig::from_env().context("Failed to read client configuration")?;
    if let Some(server) = args.server.as_deref() {
        config.base_url = server.to_string();
    }
    let client = CompareClient::new(config).context("Failed to initialize client")?;
    let session = Session::new(client);
    session.update(|view| {
        view.threshold = args.threshold;
        view.count_error = args.count_error;
        view.group_paragraph = args.group;
        view.source_name = display_name(&args.source);
        view.edited_name = display_name(&args.edited);
    })?;

    let result = compare(&session, &args);
    session.close();
    let bytes = result?;

    std::fs::write(&args.output, &bytes)
        .with_context(|| format!("Failed to write report: {}", args.output.display()))?;
    println!("Report written: {} ({} bytes)", args.output.display(), bytes.len());
    Ok(ExitCode::from(0))
}

fn compare(session: &Session, args: &RemoteArgs) -> Result<Vec<u8>> {
    session
        .load_source(&args.source)
        .with_context(|| format!("Failed to upload {}", args.source.display()))?;
    session
        .load_edited(&args.edited)
        .with_context(|| format!("Failed to upload {}", args.edited.display()))?;
    if args.unify {
        session.unify().context("Unify request failed")?;
        info!("texts unified on the server");
    }
    let bytes = session.download_report().context("Report request failed")?;
    Ok(bytes)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
