//! CLI entry point for `mhtml-split`.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use memmap2::Mmap;

use mhtml_split::config::{self, Config};
use mhtml_split::export::files::{write_files, ExportOptions};
use mhtml_split::{MhtmlError, MhtmlParser, ParserOptions, SplitFile};

/// Split MHTML web archives into standalone files with working links.
#[derive(Parser)]
#[command(name = "mhtml-split", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// MHTML file to convert into the default output directory
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract every part of an archive into a directory
    Convert {
        path: PathBuf,
        /// Output directory (defaults to the configured one, or ./out)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
        /// Skip parts larger than this many bytes
        #[arg(long, value_name = "BYTES")]
        max_file_size: Option<usize>,
        /// Fail instead of replacing files that already exist
        #[arg(long)]
        no_overwrite: bool,
        /// Also write manifest.json into the output directory
        #[arg(long)]
        manifest: bool,
    },
    /// List the parts of an archive without writing anything
    List {
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

/// Flags of the `convert` command.
struct ConvertArgs {
    output: Option<PathBuf>,
    json: bool,
    max_file_size: Option<usize>,
    no_overwrite: bool,
    manifest: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = config::load_config();

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Some(Commands::Convert {
            path,
            output,
            json,
            max_file_size,
            no_overwrite,
            manifest,
        }) => cmd_convert(
            &path,
            ConvertArgs {
                output,
                json,
                max_file_size,
                no_overwrite,
                manifest,
            },
            &config,
        ),
        Some(Commands::List { path, json }) => cmd_list(&path, json, &config),
        Some(Commands::Completions { shell }) => cmd_completions(shell),
        Some(Commands::Manpage) => cmd_manpage(),
        None => match cli.file {
            Some(path) => cmd_convert(
                &path,
                ConvertArgs {
                    output: None,
                    json: false,
                    max_file_size: None,
                    no_overwrite: false,
                    manifest: false,
                },
                &config,
            ),
            None => {
                Cli::command().print_help()?;
                Ok(())
            }
        },
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    // Try to set up file logging
    let log_path = config::log_file_path(config);
    let log_dir = config::cache_dir(config);
    if let (Some(file_name), Ok(())) = (log_path.file_name(), std::fs::create_dir_all(&log_dir)) {
        let file_appender = tracing_appender::rolling::never(&log_dir, file_name);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mhtml-split", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

/// Memory-map the archive at `path`.
fn map_archive(path: &Path) -> anyhow::Result<Mmap> {
    if !path.exists() {
        return Err(MhtmlError::FileNotFound(path.to_path_buf()).into());
    }
    let file = File::open(path).map_err(|e| MhtmlError::io(path, e))?;
    if file.metadata()?.len() == 0 {
        anyhow::bail!("{}: file is empty", path.display());
    }
    // SAFETY: the mapping is only read, and only while this command runs.
    let mmap = unsafe { Mmap::map(&file) }.map_err(|e| MhtmlError::io(path, e))?;
    Ok(mmap)
}

/// Convert an archive and write the resulting files.
fn cmd_convert(path: &Path, args: ConvertArgs, config: &Config) -> anyhow::Result<()> {
    let archive = map_archive(path)?;

    let mut options = ParserOptions::from_config(config);
    if let Some(max) = args.max_file_size {
        options = options.with_max_file_size(max);
    }
    let mut export_options = ExportOptions::from_config(config);
    export_options.overwrite &= !args.no_overwrite;
    export_options.write_manifest |= args.manifest;

    let output_dir = args
        .output
        .unwrap_or_else(|| config::default_output_dir(config));

    let start = Instant::now();
    let files = MhtmlParser::new(options).parse(&archive)?.rewrite().spit();

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Writing [{bar:40.cyan/blue}] {pos}/{len}")
            .expect("valid template")
            .progress_chars("#>-"),
    );
    let paths = write_files(&files, &output_dir, &export_options, &|current, total| {
        pb.set_length(total as u64);
        pb.set_position(current as u64);
    })?;
    pb.finish_and_clear();
    let elapsed = start.elapsed();

    if args.json {
        print_convert_json(path, &output_dir, &files, &paths)?;
    } else {
        print_convert_summary(path, archive.len(), &output_dir, &files, elapsed);
    }
    Ok(())
}

/// Parse an archive and list its parts.
fn cmd_list(path: &Path, json: bool, config: &Config) -> anyhow::Result<()> {
    let archive = map_archive(path)?;
    let options = ParserOptions::from_config(config);
    let rewrite_fn = options.rewrite_fn.clone();

    let mut parser = MhtmlParser::new(options);
    parser.parse(&archive)?;

    if json {
        let parts: Vec<serde_json::Value> = parser
            .parts()
            .iter()
            .map(|part| {
                serde_json::json!({
                    "filename": rewrite_fn(part.name_source()),
                    "location": part.location,
                    "id": part.id,
                    "type": part.mime_type,
                    "encoding": part.transfer_encoding,
                    "size": part.body.len(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&parts)?);
        return Ok(());
    }

    use humansize::{format_size, BINARY};

    println!(
        "{:<40} {:<24} {:<18} {:>10}",
        "FILENAME", "TYPE", "ENCODING", "SIZE"
    );
    println!("{}", "─".repeat(95));
    for part in parser.parts() {
        println!(
            "{:<40} {:<24} {:<18} {:>10}",
            truncate(&rewrite_fn(part.name_source()), 40),
            truncate(part.mime_type.as_deref().unwrap_or("-"), 24),
            if part.transfer_encoding.is_empty() {
                "-"
            } else {
                part.transfer_encoding.as_str()
            },
            format_size(part.body.len(), BINARY),
        );
    }
    println!();
    println!("  {} part(s)", parser.parts().len());
    Ok(())
}

fn print_convert_summary(
    path: &Path,
    archive_size: usize,
    output_dir: &Path,
    files: &[SplitFile],
    elapsed: std::time::Duration,
) {
    use humansize::{format_size, BINARY};

    let written: usize = files.iter().map(|f| f.content.len()).sum();

    println!();
    println!("  {:<20} {}", "Archive", path.display());
    println!("  {:<20} {}", "Archive size", format_size(archive_size, BINARY));
    println!("  {:<20} {}", "Output directory", output_dir.display());
    println!("  {:<20} {}", "Files written", files.len());
    println!("  {:<20} {}", "Bytes written", format_size(written, BINARY));
    println!("  {:<20} {:.2?}", "Elapsed", elapsed);
    println!();
}

fn print_convert_json(
    path: &Path,
    output_dir: &Path,
    files: &[SplitFile],
    paths: &[PathBuf],
) -> anyhow::Result<()> {
    let files_json: Vec<serde_json::Value> = files
        .iter()
        .zip(paths)
        .map(|(file, written)| {
            serde_json::json!({
                "filename": file.filename,
                "type": file.mime_type,
                "size": file.content.len(),
                "path": written.to_string_lossy(),
            })
        })
        .collect();

    let output = serde_json::json!({
        "input": path.to_string_lossy(),
        "output_dir": output_dir.to_string_lossy(),
        "files": files_json,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Truncate to `max` characters, marking the cut with `…`.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}
