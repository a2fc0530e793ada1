//! ngxconf - inspect and rewrite nginx-style configuration files
//!
//! This is the main entry point for the ngxconf CLI.

use anyhow::Context;
use ariadne::{Color, Config, IndexType, Label, Report, ReportKind, Source};
use clap::{Parser, Subcommand};
use ngxconf_syntax::{
    FlatAdapter, JsonAdapter, Node, OptionsLoader, RenderOptions, Renderer, SyntaxError,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// ngxconf - parse, check and reformat nginx-style configuration
#[derive(Parser)]
#[command(name = "ngxconf")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Render options file (.toml or .json)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that a configuration file parses
    Check {
        /// Path to the configuration file
        config: PathBuf,
    },

    /// Print the AST of a configuration file as JSON
    Parse {
        /// Path to the configuration file
        config: PathBuf,

        /// Emit the flat list shape instead of tagged nodes
        #[arg(long)]
        flat: bool,
    },

    /// Reformat a configuration file
    Fmt {
        /// Path to the configuration file
        config: PathBuf,

        /// Spaces per nesting level
        #[arg(long)]
        indent: Option<usize>,

        /// Rewrite the file in place instead of printing
        #[arg(short, long)]
        write: bool,
    },

    /// Render a JSON AST back into configuration text
    Render {
        /// Path to the JSON AST
        ast: PathBuf,

        /// Read the flat list shape instead of tagged nodes
        #[arg(long)]
        flat: bool,

        /// Spaces per nesting level
        #[arg(long)]
        indent: Option<usize>,
    },

    /// Show version information
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays clean for rendered output
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    if cli.verbose {
        tracing::info!("Verbose mode enabled");
    }

    match cli.command {
        Commands::Check { config } => {
            tracing::info!("Checking config: {}", config.display());
            let source = read_source(&config)?;
            let nodes = parse_or_exit(&config, &source);
            tracing::debug!(nodes = nodes.len(), "config parsed");
            println!("{}: ok", config.display());
        }

        Commands::Parse { config, flat } => {
            let source = read_source(&config)?;
            let nodes = parse_or_exit(&config, &source);
            let json = if flat {
                FlatAdapter::serialize(&nodes)?
            } else {
                JsonAdapter::serialize(&nodes)?
            };
            println!("{}", json);
        }

        Commands::Fmt {
            config,
            indent,
            write,
        } => {
            let renderer = Renderer::new(render_options(cli.settings.as_deref(), indent)?);
            let source = read_source(&config)?;
            let nodes = parse_or_exit(&config, &source);

            if write {
                let mut out = Vec::new();
                renderer.write_to(&nodes, &mut out)?;
                std::fs::write(&config, out)
                    .with_context(|| format!("failed to write {}", config.display()))?;
                tracing::info!("Reformatted {}", config.display());
            } else {
                renderer.write_to(&nodes, std::io::stdout().lock())?;
            }
        }

        Commands::Render { ast, flat, indent } => {
            let renderer = Renderer::new(render_options(cli.settings.as_deref(), indent)?);
            let input = read_source(&ast)?;
            let nodes: Vec<Node> = if flat {
                FlatAdapter::parse(&input)?
            } else {
                JsonAdapter::parse(&input)?
            };
            renderer.write_to(&nodes, std::io::stdout().lock())?;
        }

        Commands::Version => {
            println!("ngxconf v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

fn read_source(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Settings file first, then `--indent` on top
fn render_options(settings: Option<&Path>, indent: Option<usize>) -> anyhow::Result<RenderOptions> {
    let mut options = match settings {
        Some(path) => OptionsLoader::load(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => RenderOptions::default(),
    };
    if let Some(indent) = indent {
        options.indent = indent;
    }
    options.validate().context("invalid render options")?;
    tracing::debug!(indent = options.indent, "render options");
    Ok(options)
}

fn parse_or_exit(path: &Path, source: &str) -> Vec<Node> {
    match ngxconf_syntax::parse(source) {
        Ok(nodes) => nodes,
        Err(e) => {
            report_syntax_error(path, source, &e);
            std::process::exit(1);
        }
    }
}

fn report_syntax_error(path: &Path, source: &str, err: &SyntaxError) {
    let name = path.display().to_string();
    // End-of-input errors point at the last byte
    let span = err.span();
    let last = source.len().saturating_sub(1);
    let span = span.start.min(last)..span.end.min(source.len());
    let (line, col) = err.line_col(source);

    let printed = Report::build(ReportKind::Error, (name.as_str(), span.clone()))
        .with_config(Config::default().with_index_type(IndexType::Byte))
        .with_message(format!("syntax error at {}:{}:{}", name, line, col))
        .with_label(
            Label::new((name.as_str(), span))
                .with_message(err.to_string())
                .with_color(Color::Red),
        )
        .finish()
        .eprint((name.as_str(), Source::from(source.to_string())));

    if let Err(e) = printed {
        tracing::warn!("failed to print diagnostic: {}", e);
        eprintln!("{}:{}:{}: {}", name, line, col, err);
    }
}
