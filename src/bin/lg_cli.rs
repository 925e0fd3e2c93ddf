//! LG Command Line Interface
//!
//! Check, list and render LG template files.
//!
//! # Usage
//!
//! ```bash
//! # Parse + static checks
//! lg_cli check templates/
//!
//! # Render one template
//! lg_cli eval greetings.lg --template Greeting --scope '{"name": "Ada"}' --seed 7
//!
//! # List templates with their parameters
//! lg_cli list templates/ --format json
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;

use lg_core::{parse_lg_named, validate_files, Diagnostic, Severity};
use lg_engine::{EngineConfig, TemplateEngine, TemplateLoader};

#[derive(Parser)]
#[command(name = "lg_cli")]
#[command(version = "0.1.0")]
#[command(about = "Check, list and evaluate LG template files")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, short = 'o', global = true, default_value = "text", value_enum)]
    format: OutputFormat,

    /// YAML engine configuration (template paths, duplicate policy, seed)
    #[arg(long, short, global = true, env = "LG_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse files and report diagnostics
    Check {
        /// .lg files or directories (defaults to configured paths)
        files: Vec<PathBuf>,
    },

    /// Render a template
    Eval {
        /// .lg files or directories (defaults to configured paths)
        files: Vec<PathBuf>,

        /// Template to render
        #[arg(short, long)]
        template: String,

        /// Scope as JSON
        #[arg(short, long, default_value = "{}")]
        scope: String,

        /// Seed for alternative selection
        #[arg(long)]
        seed: Option<u64>,
    },

    /// List templates and their parameters
    List {
        /// .lg files or directories (defaults to configured paths)
        files: Vec<PathBuf>,
    },
}

// =============================================================================
// MAIN
// =============================================================================

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = cli.format;

    let result = match cli.command {
        Commands::Check { files } => cmd_check(config(cli.config, files), format),
        Commands::Eval {
            files,
            template,
            scope,
            seed,
        } => cmd_eval(config(cli.config, files), &template, &scope, seed, format),
        Commands::List { files } => cmd_list(config(cli.config, files), format),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            if format == OutputFormat::Json {
                println!("{}", serde_json::json!({ "error": format!("{:#}", e) }));
            } else {
                eprintln!("{}: {:#}", "error".red().bold(), e);
            }
            ExitCode::FAILURE
        }
    }
}

/// Configuration file and environment, with command-line files taking precedence
fn config(path: Option<PathBuf>, files: Vec<PathBuf>) -> Result<EngineConfig> {
    let mut config = EngineConfig::load(path.as_deref())?;
    if !files.is_empty() {
        config.template_paths = files;
    }
    if config.template_paths.is_empty() {
        anyhow::bail!("no template files given (pass paths or set LG_TEMPLATE_PATH)");
    }
    Ok(config)
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

fn cmd_check(config: Result<EngineConfig>, format: OutputFormat) -> Result<bool> {
    let config = config?;
    let paths = TemplateLoader::new(&config.template_paths).files()?;

    let mut parsed = Vec::new();
    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    for path in &paths {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        match parse_lg_named(&source, &path.display().to_string()) {
            Ok(file) => parsed.push(file),
            Err(e) => diagnostics.push(Diagnostic::from(&e)),
        }
    }
    let validation = validate_files(&parsed);
    diagnostics.extend(validation.diagnostics);

    let errors = diagnostics.iter().filter(|d| d.is_error()).count();
    let warnings = diagnostics.iter().filter(|d| d.is_warning()).count();

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "valid": errors == 0,
                "files": paths.len(),
                "templates": validation.stats.template_count,
                "errors": errors,
                "warnings": warnings,
                "diagnostics": diagnostics,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            for diagnostic in &diagnostics {
                let label = match diagnostic.severity {
                    Severity::Error => "error".red().bold(),
                    Severity::Warning => "warning".yellow().bold(),
                    Severity::Hint => "hint".cyan(),
                };
                match &diagnostic.span {
                    Some(span) => println!("{}: {} [{}]", label, diagnostic.message, span),
                    None => println!("{}: {}", label, diagnostic.message),
                }
            }
            if errors == 0 {
                println!(
                    "{} {} template(s) in {} file(s), {} warning(s)",
                    "OK".green().bold(),
                    validation.stats.template_count,
                    paths.len(),
                    warnings
                );
            } else {
                println!("{} {} error(s)", "FAILED".red().bold(), errors);
            }
        }
    }

    Ok(errors == 0)
}

fn cmd_eval(
    config: Result<EngineConfig>,
    template: &str,
    scope: &str,
    seed: Option<u64>,
    format: OutputFormat,
) -> Result<bool> {
    let mut config = config?;
    if seed.is_some() {
        config.random_seed = seed;
    }
    let scope: serde_json::Value =
        serde_json::from_str(scope).context("--scope must be valid JSON")?;

    let engine = TemplateEngine::from_config(&config)?;
    let text = engine.evaluate(template, scope)?;

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({ "template": template, "text": text })
        ),
        OutputFormat::Text => println!("{}", text),
    }
    Ok(true)
}

fn cmd_list(config: Result<EngineConfig>, format: OutputFormat) -> Result<bool> {
    let engine = TemplateEngine::from_config(&config?)?;
    let registry = engine.registry();

    let entries: Vec<(&str, &[String])> = registry
        .names()
        .filter_map(|name| {
            registry
                .parameters(name.as_str())
                .map(|params| (name.as_str(), params))
        })
        .collect();

    match format {
        OutputFormat::Json => {
            let output: Vec<_> = entries
                .iter()
                .map(|(name, params)| serde_json::json!({ "name": name, "parameters": params }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            for (name, params) in &entries {
                if params.is_empty() {
                    println!("{}", name.bold());
                } else {
                    println!("{}({})", name.bold(), params.join(", "));
                }
            }
        }
    }
    Ok(true)
}
