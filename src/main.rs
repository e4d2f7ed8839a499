//! hashzip - reversibly perturb media checksums and zip/unzip selections.
//!
//! Usage:
//!   hashzip modify-hash [PATHS]...    Append the marker to every enabled media file
//!   hashzip restore-hash [PATHS]...   Strip the marker again
//!   hashzip zip [PATHS]...            Compress the selection into one archive
//!   hashzip unzip [PATHS]...          Extract the selected zip files
//!
//! With no PATHS, paths are read one per line from stdin.

mod logging;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result};

use hashzip_app::{CommandKind, CommandSummary, Commands, Selection, TerminalSurface};
use hashzip_core::{DigestMethod, MediaKind, RemovalMode, Settings};

#[derive(Parser)]
#[command(
    name = "hashzip",
    version,
    about = "Reversibly change media checksums and zip/unzip file selections",
    long_about = "hashzip appends a short marker to media files so their checksum changes, \
                  strips it again on request, and wraps the system zip/unzip tools for \
                  whole selections."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Settings file (defaults to <config dir>/hashzip/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Append the marker to media files
    ModifyHash(HashArgs),

    /// Remove the marker from media files
    RestoreHash(HashArgs),

    /// Compress the selection into one zip archive
    Zip(ArchiveArgs),

    /// Extract the selected zip archives into a new directory
    Unzip(ArchiveArgs),
}

#[derive(Args)]
struct HashArgs {
    /// Files and directories to process
    paths: Vec<PathBuf>,

    /// Enable a media kind (video, audio, image); repeatable
    #[arg(long, value_name = "KIND")]
    enable: Vec<MediaKind>,

    /// Disable a media kind; repeatable
    #[arg(long, value_name = "KIND")]
    disable: Vec<MediaKind>,

    /// Marker text to append or strip
    #[arg(long)]
    marker: Option<String>,

    /// How restore-hash strips the marker (trailing, last-line)
    #[arg(long)]
    removal_mode: Option<RemovalMode>,

    /// Checksum shown in the report (md5, blake3, external)
    #[arg(long)]
    digest: Option<DigestMethod>,

    /// Program used by `--digest external`
    #[arg(long)]
    digest_program: Option<PathBuf>,

    /// Leave checksums out of the report
    #[arg(long)]
    no_digest: bool,
}

#[derive(Args)]
struct ArchiveArgs {
    /// Files and directories to process
    paths: Vec<PathBuf>,

    /// Archive password (overrides the settings file)
    #[arg(short, long)]
    password: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();
    logging::init(cli.verbose);

    let mut settings = load_settings(cli.config.as_ref())?;
    let (kind, paths) = match cli.command {
        Command::ModifyHash(args) => {
            (CommandKind::ModifyHash, apply_hash_args(&mut settings, args)?)
        }
        Command::RestoreHash(args) => {
            (CommandKind::RestoreHash, apply_hash_args(&mut settings, args)?)
        }
        Command::Zip(args) => {
            (CommandKind::ZipCompress, apply_archive_args(&mut settings, args))
        }
        Command::Unzip(args) => {
            (CommandKind::ZipDecompress, apply_archive_args(&mut settings, args))
        }
    };
    let selection = read_selection(paths)?;

    let commands = Commands::new(settings);
    let summary = match cli.format {
        OutputFormat::Text => {
            let mut surface = TerminalSurface::stdout();
            commands.run(kind, &selection, &mut surface).await
        }
        OutputFormat::Json => {
            let mut surface = TerminalSurface::new(std::io::sink());
            let summary = commands.run(kind, &selection, &mut surface).await;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            summary
        }
    };

    Ok(exit_code(&summary))
}

fn load_settings(explicit: Option<&PathBuf>) -> Result<Settings> {
    match explicit.cloned().or_else(Settings::default_path) {
        Some(path) => Settings::load(&path)
            .with_context(|| format!("Invalid settings file {}", path.display())),
        None => Ok(Settings::default()),
    }
}

fn apply_hash_args(settings: &mut Settings, args: HashArgs) -> Result<Vec<PathBuf>> {
    for kind in args.enable {
        set_kind(settings, kind, true);
    }
    for kind in args.disable {
        set_kind(settings, kind, false);
    }
    if let Some(marker) = args.marker {
        settings.marker = marker;
    }
    if let Some(mode) = args.removal_mode {
        settings.removal_mode = mode;
    }
    if let Some(digest) = args.digest {
        settings.digest = digest;
    }
    if args.digest_program.is_some() {
        settings.digest_program = args.digest_program;
    }
    if args.no_digest {
        settings.show_digest_log = false;
    }
    settings.check().context("Invalid options")?;
    Ok(args.paths)
}

fn apply_archive_args(settings: &mut Settings, args: ArchiveArgs) -> Vec<PathBuf> {
    if let Some(password) = args.password {
        settings.archive_password = password;
    }
    args.paths
}

fn set_kind(settings: &mut Settings, kind: MediaKind, on: bool) {
    match kind {
        MediaKind::Video => settings.enable_video = on,
        MediaKind::Audio => settings.enable_audio = on,
        MediaKind::Image => settings.enable_image = on,
    }
}

/// Paths from the command line, or stdin when none are given and it is piped.
fn read_selection(paths: Vec<PathBuf>) -> Result<Selection> {
    if !paths.is_empty() {
        return Ok(Selection::new(paths));
    }
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        return Ok(Selection::default());
    }
    Selection::from_reader(stdin.lock()).context("Failed to read paths from stdin")
}

fn exit_code(summary: &CommandSummary) -> ExitCode {
    if summary.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
