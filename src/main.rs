//! daki CLI: free-text search over the DAKI knowledge graph.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use rayon::prelude::*;

use daki_kg::config::ConnectorConfig;
use daki_kg::connector::GraphDbConnector;
use daki_kg::error::{ConnectorError, ConnectorResult};
use daki_kg::extract::{EntityLabels, SearchOutcome};
use daki_kg::local::LocalStoreTransport;

/// Environment variable overriding the configured endpoint.
const ENDPOINT_ENV: &str = "GRAPHDB_ENDPOINT";

/// Shorter input is not sent to the store.
const MIN_QUERY_CHARS: usize = 2;

#[derive(Parser)]
#[command(name = "daki", version, about = "Search drugs and adverse events in the DAKI knowledge graph")]
struct Cli {
    /// SPARQL endpoint URL (overrides GRAPHDB_ENDPOINT and the config file).
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Connector config file (TOML). Defaults to $XDG_CONFIG_HOME/daki-kg/config.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the .sparql query templates.
    #[arg(long, global = true)]
    templates_dir: Option<PathBuf>,

    /// Request timeout in seconds (0 disables the overall timeout).
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Query a local Turtle file instead of a remote endpoint.
    #[arg(long, global = true)]
    local: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search drugs (or adverse events) by label.
    Search {
        /// Free-text search term.
        text: String,

        /// Label language: en or nl.
        #[arg(long, default_value = "en")]
        lang: String,

        /// Search adverse events (skos:prefLabel) instead of drugs.
        #[arg(long, conflicts_with = "legacy")]
        ades: bool,

        /// Use the legacy description search (ignores --lang).
        #[arg(long)]
        legacy: bool,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Check whether the endpoint is reachable.
    Alive,

    /// Search every line of a file concurrently.
    Batch {
        /// File with one search term per line.
        file: PathBuf,

        /// Label language: en or nl.
        #[arg(long, default_value = "en")]
        lang: String,

        /// Search adverse events instead of drugs.
        #[arg(long)]
        ades: bool,
    },

    /// Interactive search session with session tracking.
    Shell,
}

/// What a search runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Drugs,
    AdverseEvents,
    Legacy,
}

impl Target {
    fn from_flags(ades: bool, legacy: bool) -> Self {
        match (ades, legacy) {
            (_, true) => Target::Legacy,
            (true, false) => Target::AdverseEvents,
            (false, false) => Target::Drugs,
        }
    }

    fn search(
        self,
        connector: &GraphDbConnector,
        text: &str,
        lang: &str,
    ) -> ConnectorResult<SearchOutcome> {
        match self {
            Target::Drugs => connector.search_entities(text, lang),
            Target::AdverseEvents => connector.search_adverse_events(text, lang),
            Target::Legacy => connector.search_entities_legacy(text),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Target::Drugs => "drugs",
            Target::AdverseEvents => "adverse events",
            Target::Legacy => "descriptions (legacy)",
        }
    }
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    let connector = build_connector(config, cli.local.as_deref())?;

    match cli.command {
        Commands::Search {
            text,
            lang,
            ades,
            legacy,
            json,
        } => {
            let text = text.trim();
            if text.chars().count() < MIN_QUERY_CHARS {
                println!("Type at least {MIN_QUERY_CHARS} characters to search.");
                return Ok(());
            }

            let outcome = Target::from_flags(ades, legacy).search(&connector, text, &lang)?;

            if json {
                let json = serde_json::to_string_pretty(&outcome).into_diagnostic()?;
                println!("{json}");
            } else {
                print_outcome(&outcome);
            }
        }

        Commands::Alive => {
            if connector.is_alive()? {
                println!("{} is reachable.", connector.endpoint());
            } else {
                println!("Cannot reach GraphDB at {}.", connector.endpoint());
                std::process::exit(1);
            }
        }

        Commands::Batch { file, lang, ades } => {
            let content = std::fs::read_to_string(&file).into_diagnostic()?;
            let terms: Vec<&str> = content
                .lines()
                .map(str::trim)
                .filter(|t| t.chars().count() >= MIN_QUERY_CHARS)
                .collect();
            let target = Target::from_flags(ades, false);

            let results: Vec<(&str, ConnectorResult<SearchOutcome>)> = terms
                .par_iter()
                .map(|term| (*term, target.search(&connector, term, &lang)))
                .collect();

            for (term, result) in &results {
                println!("== {term}");
                match result {
                    Ok(outcome) => print_outcome(outcome),
                    Err(e) => println!("{}", describe_error(e, connector.endpoint())),
                }
            }
            println!(
                "\nSearched {} term(s); {} distinct id(s) seen this session.",
                results.len(),
                connector.session().len()
            );
        }

        Commands::Shell => run_shell(&connector).into_diagnostic()?,
    }

    Ok(())
}

/// Merge flags, environment, config file, and defaults (in that precedence).
fn resolve_config(cli: &Cli) -> Result<ConnectorConfig> {
    let mut config = match &cli.config {
        Some(path) => ConnectorConfig::load(path)?,
        None => match ConnectorConfig::default_path().filter(|p| p.is_file()) {
            Some(path) => ConnectorConfig::load(&path)?,
            None => ConnectorConfig::default(),
        },
    };

    if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
        if !endpoint.trim().is_empty() {
            config.endpoint = endpoint.trim().to_string();
        }
    }
    if let Some(endpoint) = &cli.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(dir) = &cli.templates_dir {
        config.templates_dir = dir.clone();
    }
    if let Some(secs) = cli.timeout {
        config.timeout_secs = secs;
    }
    Ok(config)
}

fn build_connector(
    config: ConnectorConfig,
    local: Option<&std::path::Path>,
) -> Result<GraphDbConnector> {
    match local {
        Some(path) => {
            let transport = LocalStoreTransport::from_turtle_file(path)?;
            tracing::info!(triples = transport.len()?, "loaded local store");
            Ok(GraphDbConnector::with_transport(config, Box::new(transport)))
        }
        None => Ok(GraphDbConnector::new(config)),
    }
}

fn print_outcome(outcome: &SearchOutcome) {
    match outcome {
        SearchOutcome::Found(labels) => {
            println!("{} hit(s)", labels.len());
            print_table(labels);
        }
        SearchOutcome::NoMatches => println!("{outcome}"),
    }
}

fn print_table(labels: &EntityLabels) {
    let width = labels
        .ids()
        .map(|id| id.chars().count())
        .max()
        .unwrap_or(0)
        .max("id".len());
    println!("  {:<width$}  label", "id");
    for (id, label) in labels.iter() {
        println!("  {id:<width$}  {label}");
    }
}

/// One-line, user-facing rendering of a search failure.
fn describe_error(err: &ConnectorError, endpoint: &str) -> String {
    match err {
        ConnectorError::ConnectionFailed { message, .. } => {
            format!("Cannot reach GraphDB at `{endpoint}`: {message}")
        }
        ConnectorError::MalformedQuery { .. } => format!("Query error: {err}"),
        other => format!("Error: {other}"),
    }
}

const SHELL_HELP: &str = "\
Type a search term, or a command:
  :drugs        search drugs by rdfs:label (default)
  :ades         search adverse events by skos:prefLabel
  :legacy       search drug descriptions (legacy query)
  :lang <code>  set the label language (en, nl)
  :seen         list ids surfaced this session
  :clear        forget ids surfaced this session
  :alive        check the endpoint
  :quit         leave";

fn run_shell(connector: &GraphDbConnector) -> std::io::Result<()> {
    let mut target = Target::Drugs;
    let mut lang = String::from("en");
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    println!("Connected to {}.", connector.endpoint());
    println!("{SHELL_HELP}");

    loop {
        write!(stdout, "{} [{lang}]> ", target.name())?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();

        match input.split_once(' ').unwrap_or((input, "")) {
            ("", _) => continue,
            (":quit" | ":q", _) => break,
            (":help" | ":h", _) => println!("{SHELL_HELP}"),
            (":drugs", _) => target = Target::Drugs,
            (":ades", _) => target = Target::AdverseEvents,
            (":legacy", _) => target = Target::Legacy,
            (":lang", code) => match daki_kg::sanitize::validate_language(code) {
                Ok(valid) => lang = valid.to_string(),
                Err(e) => println!("{e}"),
            },
            (":seen", _) => {
                let ids = connector.session().snapshot();
                println!("{} id(s) seen this session", ids.len());
                for id in ids {
                    println!("  {id}");
                }
            }
            (":clear", _) => {
                connector.clear_session();
                println!("Session cleared.");
            }
            (":alive", _) => match connector.is_alive() {
                Ok(true) => println!("{} is reachable.", connector.endpoint()),
                Ok(false) => println!("Cannot reach GraphDB at `{}`.", connector.endpoint()),
                Err(e) => println!("{}", describe_error(&e, connector.endpoint())),
            },
            (cmd, _) if cmd.starts_with(':') => println!("Unknown command {cmd}. Try :help."),
            _ if input.chars().count() < MIN_QUERY_CHARS => {
                println!("Type at least {MIN_QUERY_CHARS} characters to search.")
            }
            _ => match target.search(connector, input, &lang) {
                Ok(outcome) => print_outcome(&outcome),
                Err(e) => println!("{}", describe_error(&e, connector.endpoint())),
            },
        }
    }

    Ok(())
}
