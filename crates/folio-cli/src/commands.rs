use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use bytes::Bytes;
use colored::Colorize;
use serde_json::json;

use folio_core::{
    Folio, FolioConfig, MediaBlob, MediaKind, ProjectId, ProjectRecord, Session, SessionChange,
    Timestamp,
};

use crate::cli::*;

const CONFIG_FILE: &str = "folio.toml";

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref(), cli.data_dir.as_deref())?;
    let format = cli.format;

    if let Command::Config(args) = &cli.command {
        return cmd_config(&config, args, format).await;
    }

    let folio = Folio::open(&config).await?;
    let started = folio.start().await;

    match cli.command {
        Command::Login => {
            let change = folio.sign_in().await?;
            report_session(&change, format)
        }
        Command::Guest => {
            let change = folio.enter_guest().await?;
            report_session(&change, format)
        }
        Command::Logout => {
            let change = folio.sign_out().await?;
            report_session(&change, format)
        }
        Command::Whoami => report_session(&started, format),
        Command::List(args) => {
            require_projects(&started)?;
            cmd_list(&folio, args, format)
        }
        Command::Add(args) => {
            require_session(&started)?;
            cmd_add(&folio, args, format).await
        }
        Command::Rm(args) => {
            require_session(&started)?;
            cmd_rm(&folio, args).await
        }
        Command::Media(args) => {
            require_projects(&started)?;
            cmd_media(&folio, args, format).await
        }
        Command::Config(_) => Ok(()),
    }
}

/// Resolve the configuration: an explicit `--config` file, else
/// `<data-dir>/folio.toml` when present, else defaults. `--data-dir` always
/// wins over the file's `data_dir`.
pub fn load_config(path: Option<&Path>, data_dir: Option<&Path>) -> anyhow::Result<FolioConfig> {
    let mut config = match path {
        Some(path) => FolioConfig::load(path)?,
        None => {
            let dir = data_dir
                .map(Path::to_path_buf)
                .unwrap_or_else(|| FolioConfig::default().data_dir);
            let candidate = dir.join(CONFIG_FILE);
            if candidate.is_file() {
                FolioConfig::load(&candidate)?
            } else {
                FolioConfig::default()
            }
        }
    };
    if let Some(dir) = data_dir {
        config.data_dir = dir.to_path_buf();
    }
    Ok(config)
}

fn require_session(started: &SessionChange) -> anyhow::Result<()> {
    if started.session.is_signed_out() {
        bail!("not signed in; run `folio login` or `folio guest` first");
    }
    Ok(())
}

fn require_projects(started: &SessionChange) -> anyhow::Result<()> {
    require_session(started)?;
    if let Some(e) = &started.load_error {
        bail!("could not load projects: {e}");
    }
    Ok(())
}

// ---- Session ----

fn report_session(change: &SessionChange, format: OutputFormat) -> anyhow::Result<()> {
    let session = &change.session;
    match format {
        OutputFormat::Json => {
            let out = json!({
                "state": session.label(),
                "display_name": session.display_name(),
                "namespace": session.namespace().map(|ns| ns.storage_key()),
                "load_error": change.load_error.as_ref().map(ToString::to_string),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            match session {
                Session::SignedOut => println!("{}", "Signed out.".dimmed()),
                Session::Guest => println!(
                    "{} {} — projects are stored on this device only",
                    "●".yellow(),
                    session.display_name().unwrap_or_default().bold()
                ),
                Session::Authenticated(profile) => {
                    let name = profile.display_name.bold();
                    println!("{} Signed in as {}", "✓".green().bold(), name);
                    if let Some(email) = &profile.email {
                        println!("  Email: {}", email);
                    }
                    println!("  User: {}", profile.user_id.as_str().cyan());
                }
            }
            if let Some(e) = &change.load_error {
                eprintln!("{} projects unavailable: {}", "warning:".yellow().bold(), e);
            }
        }
    }
    Ok(())
}

// ---- Projects ----

fn cmd_list(folio: &Folio, args: ListArgs, format: OutputFormat) -> anyhow::Result<()> {
    let mut projects = folio.projects();
    if let Some(limit) = args.limit {
        projects.truncate(limit);
    }

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&projects)?);
        return Ok(());
    }

    if projects.is_empty() {
        println!("No projects yet. Create one with `folio add --title <title>`.");
        return Ok(());
    }
    for record in &projects {
        print_record(record);
    }
    Ok(())
}

fn print_record(record: &ProjectRecord) {
    println!(
        "{}  {}  {}",
        record.id.as_str().yellow(),
        format_date(record.created_at).dimmed(),
        record.title.bold()
    );
    println!("  {}", kind_label(record.media_kind()).cyan());
    if !record.description.is_empty() {
        println!("  {}", record.description);
    }
}

async fn cmd_add(folio: &Folio, args: AddArgs, format: OutputFormat) -> anyhow::Result<()> {
    let file = match &args.file {
        Some(path) => {
            let data = tokio::fs::read(path)
                .await
                .with_context(|| format!("cannot read {}", path.display()))?;
            let media_type = args
                .media_type
                .clone()
                .unwrap_or_else(|| guess_media_type(path).to_string());
            Some(MediaBlob::new(media_type, Bytes::from(data)))
        }
        None => None,
    };

    let record = folio.create(&args.title, &args.desc, file).await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&record)?),
        OutputFormat::Text => {
            println!("{} Created project {}", "✓".green().bold(), record.id.as_str().yellow());
            println!("  Title: {}", record.title);
            println!("  Media: {}", kind_label(record.media_kind()).cyan());
        }
    }
    Ok(())
}

async fn cmd_rm(folio: &Folio, args: RmArgs) -> anyhow::Result<()> {
    for raw in &args.ids {
        let id = ProjectId::new(raw.as_str())?;
        if folio.delete(&id).await? {
            println!("{} Deleted project {}", "✓".green(), id.as_str().yellow());
        } else {
            println!("No project {}", id.as_str().yellow());
        }
    }
    Ok(())
}

async fn cmd_media(folio: &Folio, args: MediaArgs, format: OutputFormat) -> anyhow::Result<()> {
    let id = ProjectId::new(args.id.as_str())?;
    let Some(blob) = folio.media_for(&id).await else {
        bail!("no media available for project {id}");
    };

    if let Some(out) = &args.out {
        tokio::fs::write(out, &blob.data)
            .await
            .with_context(|| format!("cannot write {}", out.display()))?;
    }

    match format {
        OutputFormat::Json => {
            let out = json!({
                "id": id.as_str(),
                "type": blob.media_type,
                "kind": blob.kind().as_str(),
                "bytes": blob.len(),
                "written_to": args.out.as_ref().map(|p| p.display().to_string()),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            println!(
                "{} ({}, {} bytes)",
                kind_label(blob.kind()).cyan(),
                blob.media_type,
                blob.len()
            );
            if let Some(out) = &args.out {
                println!("{} Wrote {}", "✓".green(), out.display());
            }
        }
    }
    Ok(())
}

// ---- Config ----

async fn cmd_config(
    config: &FolioConfig,
    args: &ConfigArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    if args.init {
        let path: PathBuf = config.data_dir.join(CONFIG_FILE);
        if path.exists() {
            bail!("{} already exists", path.display());
        }
        tokio::fs::create_dir_all(&config.data_dir).await?;
        tokio::fs::write(&path, config.to_toml_string()?).await?;
        println!("{} Wrote {}", "✓".green().bold(), path.display());
        return Ok(());
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
        OutputFormat::Text => print!("{}", config.to_toml_string()?),
    }
    Ok(())
}

// ---- Helpers ----

fn kind_label(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::None => "text only",
        MediaKind::Image => "image",
        MediaKind::Video => "video",
        MediaKind::OtherBinary => "file",
    }
}

fn format_date(ts: Timestamp) -> String {
    i64::try_from(ts.as_millis())
        .ok()
        .and_then(chrono::DateTime::<chrono::Utc>::from_timestamp_millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| ts.to_string())
}

/// Media type for a file, from its extension.
pub fn guess_media_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}
