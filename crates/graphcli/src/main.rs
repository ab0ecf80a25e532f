use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use graphcore::{GraphDefinition, MemoryStore, RunStatus, StateMap};
use graphruntime::{validate_graph, GraphEngine, ToolRegistry};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

#[derive(Parser)]
#[command(name = "graphflow")]
#[command(about = "Workflow-graph engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a graph definition file
    Validate {
        /// Path to graph definition JSON file
        file: PathBuf,
    },

    /// Run a graph definition with the demo tools
    Run {
        /// Path to graph definition JSON file
        file: PathBuf,

        /// Initial state as a JSON object
        #[arg(short, long)]
        input: Option<String>,

        /// Suppress streamed log lines
        #[arg(short, long)]
        quiet: bool,
    },

    /// List the demo tools available to `run`
    Tools,

    /// Write an example graph definition
    Init {
        /// Output file path
        #[arg(short, long, default_value = "graph.json")]
        output: PathBuf,
    },
}

/// Tools registered for CLI runs: enough to exercise a definition
/// without wiring real handlers.
fn demo_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    // merges `meta.values` into the state
    registry.register_blocking("set", |_state: &StateMap, meta: &StateMap| {
        Ok(meta.get("values").and_then(|v| v.as_object()).cloned())
    });
    // sleeps `meta.ms` milliseconds on the worker pool
    registry.register_blocking("delay", |_state: &StateMap, meta: &StateMap| {
        let ms = meta.get("ms").and_then(|v| v.as_u64()).unwrap_or(100);
        std::thread::sleep(Duration::from_millis(ms));
        Ok(None)
    });
    registry
}

fn load_definition(path: &PathBuf) -> Result<GraphDefinition> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn parse_initial_state(input: Option<String>) -> Result<StateMap> {
    let Some(input) = input else {
        return Ok(StateMap::new());
    };
    let value: serde_json::Value =
        serde_json::from_str(&input).context("parsing --input as JSON")?;
    match value.as_object() {
        Some(map) => Ok(map.clone()),
        None => bail!("--input must be a JSON object"),
    }
}

async fn run_command(file: PathBuf, input: Option<String>, quiet: bool) -> Result<()> {
    let definition = load_definition(&file)?;
    let initial_state = parse_initial_state(input)?;

    let engine = Arc::new(GraphEngine::new(
        Arc::new(MemoryStore::new()),
        Arc::new(demo_registry()),
    ));

    let graph_id = engine.create_graph(definition).await?;
    let run_id = engine.spawn_run(graph_id, initial_state).await?;
    let mut logs = engine.broadcaster().subscribe(run_id);
    tracing::info!(%graph_id, %run_id, "run scheduled");
    println!("run_id: {run_id}");

    loop {
        match tokio::time::timeout(Duration::from_millis(200), logs.recv()).await {
            Ok(Ok(line)) => {
                if !quiet {
                    println!("{line}");
                }
                if line == "RUN_COMPLETE" || line.starts_with("ERR:") {
                    break;
                }
            }
            Ok(Err(RecvError::Lagged(n))) => {
                eprintln!("(log stream lagged, {n} lines skipped)");
            }
            Ok(Err(RecvError::Closed)) => break,
            Err(_) => {
                // no line recently; fall back to the lookup path
                if let Some(record) = engine.get_run(run_id).await {
                    if record.status.is_terminal() {
                        break;
                    }
                }
            }
        }
    }

    let record = engine
        .get_run(run_id)
        .await
        .context("run vanished from engine")?;
    println!("status: {}", record.status);
    println!(
        "state: {}",
        serde_json::to_string_pretty(&record.state.data)?
    );
    if record.status == RunStatus::Failed {
        std::process::exit(1);
    }
    Ok(())
}

fn example_definition() -> serde_json::Value {
    serde_json::json!({
        "nodes": [
            {"name": "seed", "func": "set", "meta": {"values": {"count": 3}}},
            {"name": "pause", "func": "delay", "meta": {"ms": 50}},
            {"name": "finish", "func": "set", "meta": {"values": {"done": true}}}
        ],
        "edges": {
            "seed": [
                {"next": "pause", "cond": {"key": "count", "op": ">", "value": 1}},
                {"next": "finish"}
            ],
            "pause": [{"next": "finish"}],
            "finish": [{}]
        },
        "start_node": "seed",
        "max_visits": 100
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { file } => {
            let definition = load_definition(&file)?;
            validate_graph(&definition)?;
            println!(
                "OK: {} nodes, start node '{}'",
                definition.nodes.len(),
                definition.resolved_start().unwrap_or_default()
            );
        }

        Commands::Run { file, input, quiet } => {
            run_command(file, input, quiet).await?;
        }

        Commands::Tools => {
            let registry = demo_registry();
            let mut names = registry.tool_names();
            names.sort();
            for name in names {
                println!("{name}");
            }
        }

        Commands::Init { output } => {
            let body = serde_json::to_string_pretty(&example_definition())?;
            std::fs::write(&output, body)
                .with_context(|| format!("writing {}", output.display()))?;
            println!("Wrote example graph to {}", output.display());
        }
    }

    Ok(())
}
