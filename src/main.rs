use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use knotwork_engine::{
  CommandExecutor, CommandExecutorConfig, ExecutionCoordinator, ReactiveWatchLayer, RunOutcome,
  RunReport, SharedGraph, Variables,
};
use knotwork_graph::{ExecutionStatus, Flow, GraphModel};
use knotwork_store::{EnvironmentStore, FlowStore, FsEnvironmentStore, FsFlowStore};

/// Knotwork - run node graphs against an external executor
#[derive(Parser)]
#[command(name = "knotwork")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.knotwork)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a flow once and print per-node results
  Run(RunArgs),

  /// Validate a flow and summarize its shape
  Check {
    /// Flow file, or the name of a saved flow
    flow: String,
  },

  /// Manage the environment passed to every run
  Env {
    #[command(subcommand)]
    action: EnvAction,
  },

  /// Manage saved flows
  Flows {
    #[command(subcommand)]
    action: FlowsAction,
  },
}

#[derive(Args)]
struct RunArgs {
  /// Flow file, or the name of a saved flow
  flow: String,

  /// Runner program that executes the flow
  #[arg(long, env = "KNOTWORK_EXECUTOR")]
  executor: PathBuf,

  /// Extra argument for the runner (repeatable)
  #[arg(long = "executor-arg", allow_hyphen_values = true)]
  executor_args: Vec<String>,

  /// Give up on the runner after this many milliseconds
  #[arg(long)]
  timeout_ms: Option<u64>,

  /// Save the annotated flow under this name afterwards
  #[arg(long)]
  save: Option<String>,

  /// Print the full run report as JSON
  #[arg(long)]
  json: bool,
}

#[derive(Subcommand)]
enum EnvAction {
  /// Print every variable
  List,
  /// Set a variable
  Set { key: String, value: String },
  /// Remove a variable
  Unset { key: String },
}

#[derive(Subcommand)]
enum FlowsAction {
  /// List saved flows
  List,
  /// Validate a flow file and save it
  Import {
    file: PathBuf,
    /// Name to save under (default: the file name)
    #[arg(long)]
    name: Option<String>,
  },
  /// Print a saved flow
  Show { name: String },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("knotwork=info,warn")),
    )
    .with_target(false)
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".knotwork"),
  };

  let Some(command) = cli.command else {
    println!("knotwork - use --help to see available commands");
    return Ok(());
  };

  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async {
    match command {
      Commands::Run(args) => run_flow(args, &data_dir).await,
      Commands::Check { flow } => check_flow(&flow, &data_dir).await,
      Commands::Env { action } => env_command(action, &data_dir).await,
      Commands::Flows { action } => flows_command(action, &data_dir).await,
    }
  })
}

fn flow_store(data_dir: &Path) -> FsFlowStore {
  FsFlowStore::new(data_dir.join("flows"))
}

/// Read a flow from a file path, falling back to the saved flows.
async fn load_flow(flow: &str, data_dir: &Path) -> Result<Flow> {
  let path = Path::new(flow);
  if tokio::fs::metadata(path).await.is_ok_and(|m| m.is_file()) {
    let content = tokio::fs::read_to_string(path)
      .await
      .with_context(|| format!("failed to read flow file: {}", path.display()))?;
    return serde_json::from_str(&content)
      .with_context(|| format!("failed to parse flow file: {}", path.display()));
  }

  flow_store(data_dir)
    .load_flow(flow)
    .await
    .with_context(|| format!("failed to load flow '{}'", flow))
}

async fn run_flow(args: RunArgs, data_dir: &Path) -> Result<()> {
  let flow = load_flow(&args.flow, data_dir).await?;
  let model = GraphModel::from_flow(flow).context("flow is not a valid graph")?;
  eprintln!(
    "Loaded flow with {} nodes and {} edges",
    model.nodes().len(),
    model.edges().len()
  );

  let env = FsEnvironmentStore::new(data_dir)
    .load_environment()
    .await
    .context("failed to load environment")?;

  let mut config = CommandExecutorConfig::new(args.executor);
  config.args = args.executor_args;
  config.timeout = args.timeout_ms.map(Duration::from_millis);

  let coordinator = ExecutionCoordinator::new(
    SharedGraph::new(model),
    Arc::new(CommandExecutor::new(config)),
    Variables::new(),
  );

  // Dropping the run future kills the runner process.
  let report = tokio::select! {
    report = coordinator.run(&env) => report.context("run failed")?,
    _ = tokio::signal::ctrl_c() => bail!("interrupted"),
  };

  let graph = coordinator.graph().snapshot().await;
  if args.json {
    println!("{}", serde_json::to_string_pretty(&report)?);
  } else {
    print_report(&graph, &report);
    let variables = coordinator.variables().snapshot();
    if !variables.is_empty() {
      println!(
        "\nvariables: {}",
        serde_json::to_string_pretty(&variables)?
      );
    }
  }

  if let Some(name) = args.save {
    flow_store(data_dir)
      .save_flow(&name, &graph.to_flow())
      .await
      .with_context(|| format!("failed to save flow '{}'", name))?;
    eprintln!("Saved flow: {}", name);
  }

  if let RunOutcome::PartialFailure { failed, .. } = &report.outcome {
    bail!("{} node(s) failed", failed.len());
  }
  Ok(())
}

fn print_report(graph: &GraphModel, report: &RunReport) {
  eprintln!("Run {}", report.run_id);

  for node in graph.nodes() {
    let Some(result) = report.response.results.get(&node.id) else {
      println!("{:<20} {:<8} -", node.id, "-");
      continue;
    };
    let detail = match (&result.error, &result.output) {
      (Some(error), _) => error.clone(),
      (None, output) => output.to_string(),
    };
    println!("{:<20} {:<8} {}", node.id, status_label(result.status), detail);
  }

  for overwrite in &report.propagation.overwritten {
    eprintln!(
      "note: '{}' was written by edge '{}' and then by edge '{}'",
      overwrite.target, overwrite.replaced_edge, overwrite.winning_edge
    );
  }

  match &report.outcome {
    RunOutcome::AllSucceeded => println!("\nall nodes succeeded"),
    RunOutcome::PartialFailure { first_error, .. } => println!("\nfailed: {}", first_error),
  }
}

fn status_label(status: ExecutionStatus) -> &'static str {
  match status {
    ExecutionStatus::Success => "success",
    ExecutionStatus::Error => "error",
    ExecutionStatus::Skipped => "skipped",
  }
}

async fn check_flow(flow: &str, data_dir: &Path) -> Result<()> {
  let flow = load_flow(flow, data_dir).await?;
  let model = GraphModel::from_flow(flow).context("flow is not a valid graph")?;
  let topology = model.topology();

  println!("nodes:        {}", model.nodes().len());
  println!("edges:        {}", model.edges().len());
  println!("entry points: {}", topology.entry_points().join(", "));

  let mut joins: Vec<&str> = topology.join_points().iter().map(String::as_str).collect();
  joins.sort();
  if !joins.is_empty() {
    println!("join points:  {} (last declared edge wins)", joins.join(", "));
  }

  let layer = ReactiveWatchLayer::default();
  let watched: Vec<&str> = model
    .nodes()
    .iter()
    .filter(|n| layer.watches(n.kind()))
    .map(|n| n.id.as_str())
    .collect();
  if !watched.is_empty() {
    println!("reactive:     {}", watched.join(", "));
  }

  for edge in model.edges() {
    let Some(source) = model.node(&edge.source) else {
      continue;
    };
    if !source.kind().handle_set().declares(edge.source_handle()) {
      println!(
        "warning: edge '{}' uses handle '{}' which {} does not declare; it never fires",
        edge.id,
        edge.source_handle().unwrap_or_default(),
        source.kind()
      );
    }
  }

  Ok(())
}

async fn env_command(action: EnvAction, data_dir: &Path) -> Result<()> {
  let store = FsEnvironmentStore::new(data_dir);
  let mut env = store
    .load_environment()
    .await
    .context("failed to load environment")?;

  match action {
    EnvAction::List => {
      let mut keys: Vec<&String> = env.keys().collect();
      keys.sort();
      for key in keys {
        println!("{}={}", key, env[key]);
      }
      return Ok(());
    }
    EnvAction::Set { key, value } => {
      env.insert(key, value);
    }
    EnvAction::Unset { key } => {
      if env.remove(&key).is_none() {
        eprintln!("'{}' is not set", key);
        return Ok(());
      }
    }
  }

  store
    .save_environment(&env)
    .await
    .context("failed to save environment")
}

async fn flows_command(action: FlowsAction, data_dir: &Path) -> Result<()> {
  let store = flow_store(data_dir);

  match action {
    FlowsAction::List => {
      for name in store.list_flows().await.context("failed to list flows")? {
        println!("{}", name);
      }
    }
    FlowsAction::Import { file, name } => {
      let content = tokio::fs::read_to_string(&file)
        .await
        .with_context(|| format!("failed to read flow file: {}", file.display()))?;
      let flow: Flow = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse flow file: {}", file.display()))?;
      let flow = GraphModel::from_flow(flow)
        .context("flow is not a valid graph")?
        .to_flow();

      let name = match name {
        Some(name) => name,
        None => file
          .file_name()
          .and_then(|n| n.to_str())
          .map(str::to_string)
          .context("flow file has no usable name")?,
      };
      store
        .save_flow(&name, &flow)
        .await
        .with_context(|| format!("failed to save flow '{}'", name))?;
      eprintln!("Saved flow: {}", name);
    }
    FlowsAction::Show { name } => {
      let flow = store
        .load_flow(&name)
        .await
        .with_context(|| format!("failed to load flow '{}'", name))?;
      println!("{}", serde_json::to_string_pretty(&flow)?);
    }
  }

  Ok(())
}
