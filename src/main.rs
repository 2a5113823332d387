use clap::Parser;
use colored::*;
use eyre::{Context, Result, bail};
use log::info;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use lrometa::diagnostics::{Diagnostic, Severity, dedupe};
use lrometa::document::{LoadedDocument, load_file};
use lrometa::graph::TypeGraph;
use lrometa::lro::{MetadataCache, MetadataReport, extract_lro_states};

mod cli;
mod config;

use cli::Cli;
use cli::commands::Commands;
use config::{Config, OutputFormat};

fn setup_logging() -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lrometa")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("lrometa.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    let mut builder = env_logger::Builder::from_default_env();
    if std::env::var_os("RUST_LOG").is_none() {
        // the configured level narrows this later through log::set_max_level
        builder.filter_level(log::LevelFilter::Trace);
    }
    builder.target(env_logger::Target::Pipe(target)).init();
    if std::env::var_os("RUST_LOG").is_none() {
        log::set_max_level(log::LevelFilter::Info);
    }

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn apply_log_level(config: &Config) {
    if std::env::var_os("RUST_LOG").is_some() {
        return;
    }
    let Some(level) = config.log_level.as_deref() else {
        return;
    };
    match level.parse::<log::LevelFilter>() {
        Ok(filter) => log::set_max_level(filter),
        Err(_) => log::warn!("Ignoring unknown log level: {}", level),
    }
}

/// Expand glob patterns; a pattern matching nothing is kept as a literal path
fn expand_paths(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for pattern in patterns {
        let mut matched = false;
        for entry in glob::glob(pattern).context(format!("Invalid glob pattern: {}", pattern))? {
            let path = entry.context("Failed to read glob entry")?;
            if !paths.contains(&path) {
                paths.push(path);
            }
            matched = true;
        }
        if !matched {
            paths.push(PathBuf::from(pattern));
        }
    }
    Ok(paths)
}

fn load(path: &Path, config: &Config) -> Result<(LoadedDocument, Vec<Diagnostic>)> {
    let names = config.engine_options().names;
    let loaded = load_file(path, &names).context(format!("Failed to load {}", path.display()))?;
    Ok(loaded.into_parts())
}

fn print_diagnostics(source: &Path, diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        let severity = match diagnostic.severity {
            Severity::Error => "error".red().bold(),
            Severity::Warning => "warning".yellow().bold(),
        };
        eprintln!(
            "{}: {} {} ({}): {}",
            source.display().to_string().dimmed(),
            severity,
            diagnostic.code.as_str().cyan(),
            diagnostic.target,
            diagnostic.message
        );
    }
}

fn render<T: Serialize>(value: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(value).context("Failed to render JSON"),
        OutputFormat::Yaml => serde_yaml::to_string(value).context("Failed to render YAML"),
    }
}

fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Analyze {
            paths,
            operation,
            format,
        } => handle_analyze_command(
            paths,
            operation.as_deref(),
            format.unwrap_or(config.output.format),
            config,
        ),
        Commands::States { path, type_name } => handle_states_command(path, type_name, config),
        Commands::Check { paths } => handle_check_command(paths, config),
    }
}

fn handle_analyze_command(
    patterns: &[String],
    operation: Option<&str>,
    format: OutputFormat,
    config: &Config,
) -> Result<()> {
    let options = config.engine_options();
    let mut reports = Vec::new();

    for path in expand_paths(patterns)? {
        info!("Analyzing {}", path.display());
        let (loaded, mut diagnostics) = load(&path, config)?;
        let engine = loaded.engine(options.clone());
        let cache = config
            .engine
            .memoize
            .then(|| MetadataCache::new(loaded.fingerprint.clone()));

        let operations = match operation {
            Some(name) => match loaded.graph.find_operation(name) {
                Some(op) => vec![op],
                None => bail!("Operation '{}' not found in {}", name, path.display()),
            },
            None => loaded.graph.operations(),
        };

        for op in operations {
            let result = match &cache {
                Some(cache) => cache.get_or_compute(&engine, op),
                None => engine.get_lro_metadata(op),
            };
            let (metadata, found) = result.into_parts();
            diagnostics.extend(found);
            if let Some(metadata) = metadata {
                reports.push(MetadataReport::from_metadata(&loaded.graph, &metadata));
            } else if operation.is_some() {
                let name = loaded.graph.operation(op).qualified_name();
                println!("{} is not long-running", name.cyan());
            }
        }

        if config.output.show_diagnostics {
            print_diagnostics(&path, &dedupe(diagnostics));
        }
    }

    if !reports.is_empty() {
        println!("{}", render(&reports, format)?);
    }
    Ok(())
}

fn handle_states_command(path: &Path, type_name: &str, config: &Config) -> Result<()> {
    let (loaded, diagnostics) = load(path, config)?;
    let Some(ty) = loaded.graph.lookup_type(type_name) else {
        bail!("Type '{}' not found in {}", type_name, path.display());
    };
    let (states, found) = extract_lro_states(&loaded.graph, &loaded.annotations, &ty).into_parts();

    if config.output.show_diagnostics {
        let mut all = diagnostics;
        all.extend(found);
        print_diagnostics(path, &dedupe(all));
    }
    match states {
        Some(states) => println!("{}", render(&states, config.output.format)?),
        None => bail!("'{}' has no valid long-running operation states", type_name),
    }
    Ok(())
}

fn handle_check_command(patterns: &[String], config: &Config) -> Result<()> {
    let options = config.engine_options();
    let mut errors = 0;
    let mut warnings = 0;

    for path in expand_paths(patterns)? {
        let (loaded, mut diagnostics) = load(&path, config)?;
        let (_, found) = loaded.engine(options.clone()).analyze_all().into_parts();
        diagnostics.extend(found);
        let diagnostics = dedupe(diagnostics);

        errors += diagnostics.iter().filter(|d| d.is_error()).count();
        warnings += diagnostics.iter().filter(|d| !d.is_error()).count();
        print_diagnostics(&path, &diagnostics);
    }

    let summary = format!("{} error(s), {} warning(s)", errors, warnings);
    if errors > 0 {
        bail!(summary);
    }
    println!("{}", summary.green());
    Ok(())
}

fn main() -> Result<()> {
    // Setup logging first
    setup_logging().context("Failed to setup logging")?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    apply_log_level(&config);
    colored::control::set_override(config.output.color);

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config).context("Application failed")?;

    Ok(())
}
