//! mergeview command-line tool.
//!
//! Displays merge conflicts as sections, resolves them by choosing a side per
//! conflict, lists the conflicts of a repository merge, and generates /
//! validates configuration files.

mod style;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use mergeview_core::config::EngineConfig;
use mergeview_core::conflict::file::DEFAULT_FILE_MODE;
use mergeview_core::conflict::{ConflictFile, FileCollection, ParserLimits, ResolutionMap, Side};
use mergeview_core::merge::GitMergeEngine;

const DEFAULT_CONFIG_PATH: &str = "./mergeview.toml";

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// mergeview command-line tool.
#[derive(Parser, Debug)]
#[command(
    name = "mergeview",
    version,
    about = "Inspect and resolve merge conflicts section by section"
)]
struct Cli {
    /// Path to the TOML configuration file. Defaults are used when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, overriding the configured `log_level`.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the conflict sections of a file containing conflict markers.
    Show {
        /// File with conflict markers.
        file: PathBuf,

        /// Label after `<<<<<<<`. Defaults to the configured label.
        #[arg(long)]
        ours: Option<String>,

        /// Label after `>>>>>>>`. Defaults to the configured label.
        #[arg(long)]
        theirs: Option<String>,

        /// Print the sections as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Resolve every conflict of a file and write the result.
    Resolve {
        /// File with conflict markers.
        file: PathBuf,

        /// Side for one section, as `ID=ours` or `ID=theirs`.
        #[arg(long = "pick", value_parser = parse_pick)]
        picks: Vec<(String, Side)>,

        /// Side for every section not named by `--pick`.
        #[arg(long)]
        all: Option<Side>,

        /// Label after `<<<<<<<`. Defaults to the configured label.
        #[arg(long)]
        ours: Option<String>,

        /// Label after `>>>>>>>`. Defaults to the configured label.
        #[arg(long)]
        theirs: Option<String>,

        /// Output path. Writes to stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the conflicts of merging `target` into `source` in a repository.
    Repo {
        /// Path to the Git repository.
        path: PathBuf,

        /// Revision receiving the merge ("ours").
        #[arg(long)]
        source: String,

        /// Revision being merged ("theirs").
        #[arg(long)]
        target: String,

        /// Print the collection as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        output: PathBuf,
    },

    /// Validate a configuration file.
    Validate,
}

fn parse_pick(s: &str) -> Result<(String, Side), String> {
    let (id, side) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid pick '{s}': expected ID=ours or ID=theirs"))?;
    if id.is_empty() {
        return Err(format!("invalid pick '{s}': missing section ID"));
    }
    Ok((id.to_string(), side.parse()?))
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { output } => {
            init_logging(cli.log_level.as_deref().unwrap_or("warn"));
            cmd_init(&output)
        }
        Commands::Validate => {
            init_logging(cli.log_level.as_deref().unwrap_or("warn"));
            let path = cli
                .config
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
            cmd_validate(&path)
        }
        command => {
            let config = load_config(cli.config.as_deref())?;
            init_logging(cli.log_level.as_deref().unwrap_or(&config.log_level));
            run_with_config(&config, command)
        }
    }
}

fn run_with_config(config: &EngineConfig, command: Commands) -> Result<()> {
    match command {
        Commands::Show {
            file,
            ours,
            theirs,
            json,
        } => {
            let conflict = read_conflict_file(config, &file, ours, theirs)?;
            cmd_show(&conflict, json)
        }
        Commands::Resolve {
            file,
            picks,
            all,
            ours,
            theirs,
            output,
        } => {
            let conflict = read_conflict_file(config, &file, ours, theirs)?;
            cmd_resolve(&conflict, picks, all, output.as_deref())
        }
        Commands::Repo {
            path,
            source,
            target,
            json,
        } => cmd_repo(config, &path, &source, &target, json),
        Commands::Init { output } => cmd_init(&output),
        Commands::Validate => anyhow::bail!("validate does not take a loaded configuration"),
    }
}

fn init_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => {
            EngineConfig::load_and_validate(path).context("failed to load configuration file")
        }
        None => Ok(EngineConfig::default()),
    }
}

fn read_conflict_file(
    config: &EngineConfig,
    path: &Path,
    ours: Option<String>,
    theirs: Option<String>,
) -> Result<ConflictFile> {
    let our_label = ours.unwrap_or_else(|| config.labels.ours.clone());
    let their_label = theirs.unwrap_or_else(|| config.labels.theirs.clone());

    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let limits = ParserLimits::from(&config.parser);
    let display_path = path.display().to_string();
    let file = ConflictFile::from_bytes(bytes, our_label, their_label, &limits)
        .with_context(|| format!("cannot parse {}", display_path))?
        .with_paths(display_path.clone(), display_path, DEFAULT_FILE_MODE)
        .with_context_radius(config.sections.context_radius);
    debug!(path = %file.our_path(), "loaded conflict file");
    Ok(file)
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn cmd_show(file: &ConflictFile, json: bool) -> Result<()> {
    if json {
        let out = serde_json::to_string_pretty(&file.view())
            .context("failed to serialize sections")?;
        println!("{}", out);
        return Ok(());
    }

    if !file.has_conflicts() {
        println!("{}", style::success("No conflicts"));
        return Ok(());
    }

    println!(
        "{}",
        style::header(&format!(
            "{} ({} conflict(s))",
            file.our_path(),
            file.conflict_ids().len()
        ))
    );
    println!();

    for section in file.sections() {
        if let Some(id) = &section.id {
            println!("{}", style::dim(&format!("── conflict {}", id)));
        }
        for line in &section.lines {
            println!("{}", style::line(line));
        }
    }
    println!();

    Ok(())
}

/// Combine explicit picks with a fallback side for the remaining sections.
fn build_resolution(
    file: &ConflictFile,
    picks: Vec<(String, Side)>,
    all: Option<Side>,
) -> ResolutionMap {
    let mut resolution = ResolutionMap::new();
    if let Some(side) = all {
        for id in file.conflict_ids() {
            resolution.insert(id.to_string(), side);
        }
    }
    resolution.extend(picks);
    resolution
}

fn cmd_resolve(
    file: &ConflictFile,
    picks: Vec<(String, Side)>,
    all: Option<Side>,
    output: Option<&Path>,
) -> Result<()> {
    let resolution = build_resolution(file, picks, all);
    let content = file
        .resolve(&resolution)
        .with_context(|| format!("cannot resolve {}", file.our_path()))?;

    match output {
        Some(path) => {
            std::fs::write(path, format!("{content}\n"))
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!(
                "{}",
                style::success(&format!(
                    "Resolved {} section(s), written to {}",
                    resolution.len(),
                    path.display()
                ))
            );
        }
        None => println!("{}", content),
    }

    Ok(())
}

fn cmd_repo(
    config: &EngineConfig,
    path: &Path,
    source: &str,
    target: &str,
    json: bool,
) -> Result<()> {
    let engine =
        GitMergeEngine::open(path, source, target).context("failed to open Git repository")?;
    let limits = ParserLimits::from(&config.parser);
    let collection = FileCollection::new(
        &engine,
        source,
        target,
        config.sections.context_radius,
        &limits,
    )
    .context("failed to collect conflicts")?;

    if json {
        let out = serde_json::to_string_pretty(&collection.view())
            .context("failed to serialize conflicts")?;
        println!("{}", out);
        return Ok(());
    }

    if collection.files().is_empty() && collection.excluded().is_empty() {
        println!();
        println!("{}", style::success("Merge has no conflicts"));
        println!();
        return Ok(());
    }

    println!();
    println!(
        "{}",
        style::header(&format!(
            "Conflicts merging '{}' into '{}' ({})",
            target,
            source,
            collection.files().len()
        ))
    );
    println!();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["File", "Mode", "Sections", "Conflicts"]);

    for file in collection.files() {
        table.add_row(vec![
            Cell::new(file.our_path()),
            Cell::new(format!("{:o}", file.our_mode())),
            Cell::new(file.sections().len()),
            Cell::new(file.conflict_ids().len()),
        ]);
    }

    println!("{}", table);

    for path in collection.excluded() {
        println!(
            "{}",
            style::warn(&format!("{} is missing a side and cannot be shown", path))
        );
    }

    println!();
    println!("{}", style::dim("Commit message:"));
    println!("{}", collection.default_commit_message());
    println!();

    Ok(())
}

fn cmd_init(output: &Path) -> Result<()> {
    if output.exists() {
        anyhow::bail!(
            "file already exists: {}. Use a different path or remove the existing file.",
            output.display()
        );
    }

    let body = EngineConfig::default()
        .to_toml()
        .context("failed to render default configuration")?;
    let contents = format!("# mergeview configuration\n\n{body}");
    std::fs::write(output, contents).context("failed to write config file")?;

    println!("Default configuration written to {}", output.display());
    println!();
    println!("Next steps:");
    println!("  1. Adjust the context radius and marker labels");
    println!(
        "  2. Validate with: mergeview validate --config {}",
        output.display()
    );

    Ok(())
}

fn cmd_validate(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {}", config_path.display());
    println!();

    let config =
        EngineConfig::load_from_file(config_path).context("failed to parse configuration")?;
    println!("{}", style::success("TOML structure is valid"));

    match config.validate() {
        Ok(()) => println!("{}", style::success("All fields are valid")),
        Err(e) => {
            println!("{}", style::error(&format!("Validation error: {}", e)));
            anyhow::bail!("configuration validation failed");
        }
    }

    let max_size = match config.parser.max_file_size {
        0 => "unlimited".to_string(),
        n => format!("{} bytes", n),
    };

    println!();
    println!("Configuration summary:");
    println!("  Log level      : {}", config.log_level);
    println!("  Context radius : {}", config.sections.context_radius);
    println!("  Max file size  : {}", max_size);
    println!("  Reject binary  : {}", config.parser.reject_binary);
    println!("  Ours label     : {}", config.labels.ours);
    println!("  Theirs label   : {}", config.labels.theirs);
    println!();
    println!("Configuration is valid.");

    Ok(())
}
