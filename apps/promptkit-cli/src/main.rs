//! promptkit CLI
//!
//! Command-line front end for promptkit: render template manifests and chat
//! histories for a given model, and list the models the registry knows.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use promptkit::{Args, Chat, Message, RegistryConfig, Role, TemplateManifest, filters, registry};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// promptkit - model-aware prompt templates
#[derive(Parser)]
#[command(name = "promptkit", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// TOML file with extra model entries for the registry
    #[arg(long, global = true, value_name = "FILE")]
    models: Option<PathBuf>,
}

/// Available promptkit commands
#[derive(Subcommand)]
enum Commands {
    /// Render a template manifest
    ///
    /// Positional VALUES bind to the manifest's parameters in order;
    /// `--arg NAME=VALUE` binds by name.
    Render {
        /// Path to the template manifest (TOML)
        manifest: PathBuf,

        /// Positional argument values
        values: Vec<String>,

        /// Keyword argument, repeatable
        #[arg(short, long = "arg", value_name = "NAME=VALUE")]
        args: Vec<String>,

        /// Model to render for
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Render a chat history
    ///
    /// Each MESSAGE is written `ROLE:CONTENT`, e.g. `user:Hello`.
    Chat {
        /// Model whose delimiters are used
        #[arg(short, long)]
        model: String,

        /// Opening system message
        #[arg(short, long)]
        system: Option<String>,

        /// Leave system messages out of the rendered output
        #[arg(long, conflicts_with = "last")]
        drop_system: bool,

        /// Render only the last N non-system messages
        #[arg(long, value_name = "N")]
        last: Option<usize>,

        /// Messages in conversation order
        messages: Vec<String>,
    },

    /// List registered models
    Models,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize tracing subscriber
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        error!("Command failed: {:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Initialize tracing subscriber for structured logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = if verbose {
        EnvFilter::new("promptkit=debug,promptkit_cli=debug")
    } else {
        EnvFilter::new("promptkit=info,promptkit_cli=info")
    };

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    if let Some(path) = &cli.models {
        load_models(path)?;
    }

    match cli.command {
        Commands::Render {
            manifest,
            values,
            args,
            model,
        } => run_render(&manifest, values, &args, model.as_deref()),
        Commands::Chat {
            model,
            system,
            drop_system,
            last,
            messages,
        } => run_chat(&model, system, drop_system, last, &messages),
        Commands::Models => run_models(),
    }
}

/// Register the models of a registry config file
fn load_models(path: &Path) -> Result<()> {
    let config = RegistryConfig::load(path)
        .with_context(|| format!("Failed to load model registry from {}", path.display()))?;
    info!("Registering {} models from {}", config.models.len(), path.display());
    registry::register_config(&config);
    Ok(())
}

/// Run the render command
fn run_render(
    manifest: &Path,
    values: Vec<String>,
    kwargs: &[String],
    model: Option<&str>,
) -> Result<()> {
    let template = TemplateManifest::load(manifest)
        .and_then(|m| m.to_template())
        .with_context(|| format!("Failed to load template from {}", manifest.display()))?;

    let mut args = Args::new();
    for value in values {
        args = args.arg(value);
    }
    for kwarg in kwargs {
        let (name, value) = parse_pair(kwarg, '=')?;
        args = args.kwarg(name, value);
    }

    let rendered = match model {
        Some(model) => {
            let bound = template.for_model(model)?;
            let tokens = bound.tokens();
            debug!(
                "Rendering {} for {} (bos={:?}, eos={:?})",
                template.name(),
                bound.model(),
                tokens.bos,
                tokens.eos
            );
            bound.render(&args)?
        }
        None => template.render(&args)?,
    };

    println!("{rendered}");
    Ok(())
}

/// Run the chat command
fn run_chat(
    model: &str,
    system: Option<String>,
    drop_system: bool,
    last: Option<usize>,
    messages: &[String],
) -> Result<()> {
    let mut chat = match system {
        Some(system) => Chat::with_system(system),
        None => Chat::new(),
    };

    for message in messages {
        let (role, content) = parse_pair(message, ':')?;
        chat += Message::new(Role::from(role), content);
    }

    if drop_system {
        chat.set_filter(filters::drop_role(Role::System));
    } else if let Some(n) = last {
        chat.set_filter(filters::last(n));
    }

    println!("{}", chat.render(model)?);
    Ok(())
}

/// Run the models command
fn run_models() -> Result<()> {
    for model in registry::models() {
        println!("{model}");
    }
    Ok(())
}

/// Split `input` at the first `sep`
fn parse_pair(input: &str, sep: char) -> Result<(&str, &str)> {
    match input.split_once(sep) {
        Some((key, value)) if !key.is_empty() => Ok((key, value)),
        _ => bail!("expected KEY{sep}VALUE, got `{input}`"),
    }
}
