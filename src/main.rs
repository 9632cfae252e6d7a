//! shift - bulk move of files and folders between SharePoint sites.
//!
//! Usage:
//!   shift move --item ID:KIND:PATH --dest PATH   Move items into a folder
//!   shift jobs [--logs]                          List unfinished copy jobs
//!   shift resume [JOB_ID]                        Track unfinished copy jobs again
//!   shift clear                                  Forget unfinished copy jobs
//!   shift --help                                 Show help

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Local;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{bail, eyre, Result, WrapErr};
use futures::future::join_all;
use humansize::{format_size, BINARY};
use shift_core::{ConflictPolicy, Destination, MoveRequest, ShiftConfig, Site};
use shift_ops::{
    log_channel, DirectMoveReport, FileStore, JobRegistry, KeyValueStore, LogRecord, MoveDetail,
    MoveLog, Orchestrator,
};
use shift_sharepoint::SharePointClient;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

const SUPPORT_HINT: &str =
    "Please refresh and try again, or contact support if the problem persists.";

#[derive(Parser)]
#[command(
    name = "shift",
    version,
    about = "Bulk move of files and folders between SharePoint sites",
    long_about = "shift moves a selection of files and folders into a destination folder, \
                  on the same site or another one.\n\n\
                  Folders are merged into existing folders of the same name; everything else \
                  is handed to server-side copy jobs, which are tracked until they finish."
)]
struct Cli {
    /// Site the selected items live on
    #[arg(long, env = "SHIFT_SITE_URL", global = true)]
    site: Option<String>,

    /// Bearer token for the REST API
    #[arg(long, env = "SHIFT_ACCESS_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Show engine diagnostics on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Move items into a destination folder
    Move {
        /// Item to move, as ID:KIND:PATH (KIND is `file` or `folder`)
        #[arg(short, long = "item", required = true)]
        items: Vec<ItemArg>,

        /// Destination site (defaults to the source site)
        #[arg(long)]
        dest_site: Option<String>,

        /// Server-relative path of the destination folder
        #[arg(short, long)]
        dest: String,

        /// What to do when the destination already has an object of the same name
        #[arg(long, default_value = "fail")]
        conflict: ConflictPolicy,

        /// New name for the moved item (single item only)
        #[arg(long)]
        rename: Option<String>,
    },

    /// List copy jobs that have not finished
    Jobs {
        /// Fetch and print each job's current log
        #[arg(short, long)]
        logs: bool,
    },

    /// Track unfinished copy jobs until they end
    Resume {
        /// Only resume this job
        job_id: Option<String>,
    },

    /// Forget every unfinished copy job
    Clear,
}

/// A selected item given on the command line.
#[derive(Debug, Clone)]
struct ItemArg {
    id: String,
    is_file: bool,
    path: String,
}

impl FromStr for ItemArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(id), Some(kind), Some(path)) if !id.is_empty() && path.starts_with('/') => {
                let is_file = match kind {
                    "file" => true,
                    "folder" => false,
                    other => {
                        return Err(format!(
                            "unknown item kind '{other}', expected 'file' or 'folder'"
                        ));
                    }
                };
                Ok(Self {
                    id: id.to_string(),
                    is_file,
                    path: path.to_string(),
                })
            }
            _ => Err(
                "expected ID:KIND:PATH, e.g. 0b5c:folder:/sites/hr/Shared Documents/Plans".into(),
            ),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = cli.config.clone().unwrap_or_else(ShiftConfig::default_path);
    let config = ShiftConfig::load(&config_path)
        .wrap_err_with(|| format!("Failed to load {}", config_path.display()))?;
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(config.data_dir()));

    match cli.command {
        Command::Move {
            ref items,
            ref dest_site,
            ref dest,
            conflict,
            ref rename,
        } => {
            let source = source_site(&cli, &config)?;
            let dest_site = match dest_site {
                Some(url) => Site::parse(url)?,
                None => source.clone(),
            };
            if rename.is_some() && items.len() != 1 {
                bail!("--rename can only be used with a single --item");
            }

            let requests: Vec<MoveRequest> = items
                .iter()
                .map(|item| {
                    let request = MoveRequest::new(
                        item.id.clone(),
                        item.is_file,
                        source.clone(),
                        item.path.clone(),
                        Destination::new(dest_site.clone(), dest.clone()),
                    )
                    .with_conflict_policy(conflict);
                    match rename {
                        Some(name) => request.with_rename(name.clone()),
                        None => request,
                    }
                })
                .collect();

            let orchestrator = orchestrator(&cli, store, &config)?;
            run_move(&orchestrator, &requests).await?;
        }
        Command::Jobs { logs } => {
            if logs {
                let orchestrator = orchestrator(&cli, store, &config)?;
                run_jobs(orchestrator.jobs().registry(), Some(&orchestrator)).await?;
            } else {
                run_jobs(&JobRegistry::new(store), None).await?;
            }
        }
        Command::Resume { ref job_id } => {
            let orchestrator = orchestrator(&cli, store, &config)?;
            run_resume(&orchestrator, job_id.as_deref()).await?;
        }
        Command::Clear => {
            let removed = JobRegistry::new(store).clear().await?;
            println!("Forgot {removed} unfinished job(s).");
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn source_site(cli: &Cli, config: &ShiftConfig) -> Result<Site> {
    let url = cli
        .site
        .clone()
        .or_else(|| config.site_url.clone())
        .ok_or_else(|| eyre!("No site given; pass --site or set SHIFT_SITE_URL"))?;
    Ok(Site::parse(&url)?)
}

fn orchestrator(
    cli: &Cli,
    store: Arc<dyn KeyValueStore>,
    config: &ShiftConfig,
) -> Result<Orchestrator> {
    let token = cli
        .token
        .as_deref()
        .ok_or_else(|| eyre!("No access token; pass --token or set SHIFT_ACCESS_TOKEN"))?;
    let client = SharePointClient::new(token).wrap_err("Failed to create HTTP client")?;
    Ok(Orchestrator::new(Arc::new(client), store, config))
}

/// Print log records as they arrive. Resolves to the last line printed.
fn spawn_renderer(mut rx: UnboundedReceiver<LogRecord>) -> JoinHandle<Option<String>> {
    tokio::spawn(async move {
        let mut last = None;
        while let Some(record) = rx.recv().await {
            let line = match record.event.percentage() {
                Some(pct) => format!("{record} ({pct:.0}%)"),
                None => record.to_string(),
            };
            println!("{line}");
            last = Some(line);
        }
        last
    })
}

/// Close the log channel and wait for the renderer to drain it.
async fn finish_rendering(log: MoveLog, renderer: JoinHandle<Option<String>>) -> Option<String> {
    drop(log);
    renderer.await.ok().flatten()
}

fn report_failure(last_line: Option<String>) {
    eprintln!();
    eprintln!("{SUPPORT_HINT}");
    if let Some(line) = last_line {
        eprintln!("Last message: {line}");
    }
}

/// Move the selected items and render progress.
async fn run_move(orchestrator: &Orchestrator, requests: &[MoveRequest]) -> Result<()> {
    let (log, rx) = log_channel();
    let renderer = spawn_renderer(rx);

    let result = orchestrator.move_selection(requests, &log).await;
    let last_line = finish_rendering(log, renderer).await;

    match result {
        Ok(outcomes) => {
            println!();
            println!("{}", "─".repeat(60));
            for outcome in &outcomes {
                println!(" {}  {}", outcome.source_path, describe_outcome(&outcome.detail));
            }
            println!(" {} item(s) moved", outcomes.len());
            println!("{}", "─".repeat(60));
            Ok(())
        }
        Err(e) => {
            report_failure(last_line);
            Err(e).wrap_err("Move failed")
        }
    }
}

fn describe_outcome(detail: &MoveDetail) -> String {
    match detail {
        MoveDetail::Direct(report @ DirectMoveReport::File { .. }) => {
            format!("-> {}", report.destination_path())
        }
        MoveDetail::Direct(report) => format!(
            "-> {} ({} file(s), source folder removed)",
            report.destination_path(),
            report.file_count()
        ),
        MoveDetail::Merged(outcomes) => format!("merged ({} entries)", outcomes.len()),
        MoveDetail::CopyJob(_) => "moved by copy job".to_string(),
    }
}

/// List persisted jobs, optionally with their current logs.
async fn run_jobs(registry: &JobRegistry, orchestrator: Option<&Orchestrator>) -> Result<()> {
    let entries = registry.entries().await?;
    if entries.is_empty() {
        println!("No unfinished copy jobs.");
        return Ok(());
    }

    println!();
    println!("{}", "─".repeat(70));
    println!(" {} unfinished copy job(s)", entries.len());
    println!("{}", "─".repeat(70));

    for entry in &entries {
        println!();
        println!(
            " {}  submitted {}",
            entry.job_id(),
            entry
                .submitted_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
        );
        println!("   site: {}", entry.site.url());
        for uri in &entry.request.export_object_uris {
            println!("   from: {uri}");
        }
        println!("   to:   {}", entry.request.destination_uri);

        let Some(orchestrator) = orchestrator else {
            continue;
        };
        match orchestrator.jobs().snapshot(entry).await {
            Ok(records) if records.is_empty() => println!("   (no log records yet)"),
            Ok(records) => {
                for record in records {
                    let mut line = format!("   {}", record.event);
                    if let Some(time) = &record.time {
                        line.push_str(&format!(" at {time}"));
                    }
                    if let Some(objects) = record.objects_processed {
                        line.push_str(&format!(", {objects} objects"));
                    }
                    if let Some(bytes) = record.bytes_processed {
                        line.push_str(&format!(", {}", format_size(bytes, BINARY)));
                    }
                    if let Some(message) = &record.message {
                        line.push_str(&format!(": {message}"));
                    }
                    println!("{line}");
                }
            }
            Err(e) => println!("   could not fetch log: {e}"),
        }
    }
    println!();

    Ok(())
}

/// Poll persisted jobs until they end.
async fn run_resume(orchestrator: &Orchestrator, job_id: Option<&str>) -> Result<()> {
    let entries: Vec<_> = orchestrator
        .jobs()
        .registry()
        .entries()
        .await?
        .into_iter()
        .filter(|entry| job_id.is_none_or(|id| entry.job_id() == id))
        .collect();

    if entries.is_empty() {
        match job_id {
            Some(id) => bail!("No unfinished copy job with id {id}"),
            None => {
                println!("No unfinished copy jobs.");
                return Ok(());
            }
        }
    }

    let (log, rx) = log_channel();
    let renderer = spawn_renderer(rx);

    let results = join_all(entries.iter().map(|entry| {
        let job_log = log.for_item(entry.job_id().to_string());
        async move { orchestrator.jobs().resume(entry, &job_log).await }
    }))
    .await;

    let failed = results.iter().filter(|r| r.is_err()).count();
    match results.into_iter().find_map(|r| r.err()) {
        None => {
            log.complete(format!("{} job(s) finished", entries.len()));
            finish_rendering(log, renderer).await;
            Ok(())
        }
        Some(first) => {
            log.fatal(first.to_string());
            let last_line = finish_rendering(log, renderer).await;
            report_failure(last_line);
            Err(first).wrap_err(format!("{failed} of {} job(s) failed", entries.len()))
        }
    }
}
