//! galaxy-objects CLI Entry Point
//!
//! Offline inspection of exported workflows and a few server-side listings.
//!
//! # Usage
//!
//! ```bash
//! # Show the steps of a workflow in dependency order (no server needed)
//! galaxy-objects inspect paste_columns.ga
//!
//! # List objects on a server
//! galaxy-objects list histories --url https://usegalaxy.org --api-key KEY
//! galaxy-objects list workflows --published
//!
//! # Upload a workflow
//! galaxy-objects import paste_columns.ga
//! ```

use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use colored::Colorize;
use log::{error, info};

use galaxy_objects::client::{GalaxyConfig, GalaxyInstance};
use galaxy_objects::workflow::parser::load_workflow;
use galaxy_objects::wrappers::{Preview, Wrapped};
use galaxy_objects::{APP_NAME, VERSION};

/// What the user asked for.
#[derive(Debug, PartialEq)]
enum Command {
    Inspect(PathBuf),
    List(Resource),
    Import(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Resource {
    Libraries,
    Histories,
    Workflows,
}

impl Resource {
    fn parse(s: &str) -> Result<Self, String> {
        match s {
            "libraries" => Ok(Resource::Libraries),
            "histories" => Ok(Resource::Histories),
            "workflows" => Ok(Resource::Workflows),
            other => Err(format!(
                "Unknown resource '{}' (expected libraries, histories or workflows)",
                other
            )),
        }
    }
}

/// Command-line configuration parsed from arguments.
#[derive(Debug)]
struct Config {
    command: Command,
    url: Option<String>,
    api_key: Option<String>,
    config_path: Option<PathBuf>,
    deleted: bool,
    published: bool,
    verbose: bool,
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: galaxy-objects [OPTIONS] <COMMAND> <ARG>");
    println!();
    println!("Commands:");
    println!("  inspect <FILE.ga>   Show the steps of a workflow in dependency order");
    println!("  list <RESOURCE>     List libraries, histories or workflows");
    println!("  import <FILE.ga>    Upload a workflow to the server");
    println!();
    println!("Options:");
    println!("  --url URL           Galaxy server (default: $GALAXY_URL)");
    println!("  --api-key KEY       API key (default: $GALAXY_API_KEY)");
    println!("  --config PATH       YAML configuration file");
    println!("  --deleted           List deleted libraries or histories");
    println!("  --published         List published workflows");
    println!("  --verbose           Enable debug logging");
    println!("  --help              Show this help message");
    println!("  --version           Show version information");
}

/// Parses command-line arguments into a Config struct.
fn parse_arguments(args: &[String]) -> Result<Config, String> {
    let mut positional: Vec<String> = Vec::new();
    let mut url = None;
    let mut api_key = None;
    let mut config_path = None;
    let mut deleted = false;
    let mut published = false;
    let mut verbose = false;
    let mut i = 1; // Skip program name

    while i < args.len() {
        let arg = &args[i];

        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("{} {}", APP_NAME, VERSION);
                std::process::exit(0);
            }
            "--deleted" => deleted = true,
            "--published" => published = true,
            "--verbose" | "-v" => verbose = true,
            "--url" | "--api-key" | "--config" => {
                i += 1;
                let value = args
                    .get(i)
                    .ok_or_else(|| format!("{} requires an argument", arg))?
                    .clone();
                match arg.as_str() {
                    "--url" => url = Some(value),
                    "--api-key" => api_key = Some(value),
                    _ => config_path = Some(PathBuf::from(value)),
                }
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            _ => positional.push(arg.clone()),
        }
        i += 1;
    }

    let command = match positional.as_slice() {
        [cmd, arg] if cmd == "inspect" => Command::Inspect(PathBuf::from(arg)),
        [cmd, arg] if cmd == "import" => Command::Import(PathBuf::from(arg)),
        [cmd, arg] if cmd == "list" => Command::List(Resource::parse(arg)?),
        [] => return Err("No command given".to_string()),
        [cmd, ..] if matches!(cmd.as_str(), "inspect" | "import" | "list") => {
            return Err(format!("'{}' takes exactly one argument", cmd));
        }
        [cmd, ..] => return Err(format!("Unknown command: {}", cmd)),
    };

    Ok(Config {
        command,
        url,
        api_key,
        config_path,
        deleted,
        published,
        verbose,
    })
}

/// Resolves server settings: flags, then config file, then environment.
fn connect(config: &Config) -> Result<GalaxyInstance, Box<dyn std::error::Error>> {
    let mut settings = match (&config.config_path, &config.url, &config.api_key) {
        (Some(path), _, _) => GalaxyConfig::load(path)?,
        (None, Some(url), Some(key)) => GalaxyConfig::new(url.clone(), key.clone()),
        _ => GalaxyConfig::discover()?,
    };
    if let Some(url) = &config.url {
        settings.url = url.clone();
    }
    if let Some(key) = &config.api_key {
        settings.api_key = key.clone();
    }
    info!("Connecting to {}", settings.url);
    Ok(GalaxyInstance::new(settings)?)
}

fn inspect(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let workflow = load_workflow(path)?;
    let order = workflow.dag().sorted_step_ids()?;

    println!(
        "{} {}",
        "Workflow:".bold(),
        workflow.name().unwrap_or("<unnamed>")
    );
    println!("Inputs: {}", workflow.inputs().join(", "));
    println!();
    for id in &order {
        let Some(step) = workflow.step(id) else {
            continue;
        };
        let label = step
            .tool_id()
            .or_else(|| step.name())
            .unwrap_or("<unnamed>");
        let upstream: Vec<String> = step.input_steps().into_values().collect();
        if upstream.is_empty() {
            println!("  {:>4}  {}", id.cyan(), label);
        } else {
            println!("  {:>4}  {}  <- {}", id.cyan(), label, upstream.join(", "));
        }
    }
    let isolated = workflow
        .steps()
        .iter()
        .filter(|s| !order.contains(&s.step_id()))
        .count();
    if isolated > 0 {
        println!();
        println!("{} unconnected step(s)", isolated);
    }
    Ok(())
}

fn print_previews(previews: &[Preview]) {
    if previews.is_empty() {
        println!("{}", "(none)".dimmed());
    }
    for preview in previews {
        let name = preview.name().unwrap_or("<unnamed>");
        let flag = if preview.deleted() {
            " [deleted]".red().to_string()
        } else if preview.published() {
            " [published]".green().to_string()
        } else {
            String::new()
        };
        println!("{}  {}{}", preview.id().unwrap_or("?").cyan(), name, flag);
    }
}

/// Main application entry point.
async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    setup_logging(config.verbose);

    match &config.command {
        Command::Inspect(path) => inspect(path)?,
        Command::List(resource) => {
            let gi = connect(&config)?;
            let previews = match resource {
                Resource::Libraries => gi.libraries().get_previews(config.deleted).await?,
                Resource::Histories => gi.histories().get_previews(config.deleted).await?,
                Resource::Workflows => gi.workflows().get_previews(config.published).await?,
            };
            print_previews(&previews);
        }
        Command::Import(path) => {
            let workflow = load_workflow(path)?;
            let gi = connect(&config)?;
            let stored = gi.workflows().import_new(workflow).await.map_err(|e| {
                error!("Import failed: {}", e);
                e
            })?;
            println!(
                "{} {} ({})",
                "Imported".green(),
                stored.name().unwrap_or("<unnamed>"),
                stored.id().unwrap_or("?")
            );
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    let config = match parse_arguments(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", "Error:".red(), e);
            eprintln!();
            print_usage();
            return ExitCode::from(2);
        }
    };

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("{} {}", "Error:".red(), e);
            ExitCode::FAILURE
        }
    }
}
