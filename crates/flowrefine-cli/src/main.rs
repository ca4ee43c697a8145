use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use flowrefine_core::{Config, Diagnostic, Endpoint, Graph, Inventory, Layer, MigrationReport, NodeId, Severity};
use flowrefine_engine::{Analysis, WorkflowAnalyzer};
use flowrefine_formula::{FunctionRegistry, Transpiler};

const DEFAULT_CONFIG: &str = "flowrefine.toml";

/// FlowRefine - workflow migration planning for layered SQL models
#[derive(Parser)]
#[command(name = "flowrefine")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: flowrefine.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a layered execution plan for a workflow graph
    Plan {
        /// Workflow graph in JSON form
        graph: PathBuf,

        /// Output file for the migration report
        #[arg(short, long, default_value = "report.json")]
        output: PathBuf,

        /// Print the SQL hint of every step
        #[arg(long)]
        hints: bool,
    },

    /// Show source-to-target lineage paths
    Lineage {
        /// Workflow graph in JSON form
        graph: PathBuf,
    },

    /// Convert a single formula expression to Trino SQL
    Convert {
        /// Formula expression, e.g. 'IIF([A] > 1, "x", "y")'
        expression: String,
    },

    /// Write a config file with default settings
    InitConfig {
        /// Where to write the config
        #[arg(default_value = DEFAULT_CONFIG)]
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    let config = load_config(cli.config.as_deref(), cli.verbose)?;

    match cli.command {
        Commands::Plan { graph, output, hints } => plan_command(&config, &graph, &output, hints, cli.verbose),
        Commands::Lineage { graph } => lineage_command(&config, &graph),
        Commands::Convert { expression } => convert_command(&config, &expression),
        Commands::InitConfig { path } => init_config_command(&path),
    }
}

fn load_config(path: Option<&Path>, verbose: bool) -> Result<Config> {
    if let Some(path) = path {
        return Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()));
    }

    let default_path = Path::new(DEFAULT_CONFIG);
    if default_path.exists() {
        return Ok(Config::from_file(default_path)?);
    }

    if verbose {
        eprintln!("{}", "No config file found, using defaults".yellow());
    }
    Ok(Config::default())
}

fn load_graph(path: &Path, verbose: bool) -> Result<Graph> {
    if verbose {
        eprintln!("{} {}", "Loading workflow graph from:".cyan(), path.display());
    }

    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let graph = Graph::from_json(&json)
        .with_context(|| format!("Invalid workflow graph in {}", path.display()))?;

    tracing::info!(nodes = graph.nodes().len(), edges = graph.edges().len(), "Loaded graph");
    Ok(graph)
}

fn workflow_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "workflow".to_string())
}

/// Plan command - order, classify and hint every tool
fn plan_command(config: &Config, graph_path: &Path, output: &Path, hints: bool, verbose: bool) -> Result<()> {
    let graph = load_graph(graph_path, verbose)?;

    if verbose {
        eprintln!("{}", "Analyzing workflow...".cyan());
    }

    let analysis = WorkflowAnalyzer::new(&graph, config).analyze()?;
    print_plan(&graph, &analysis, hints);

    let report = analysis.into_report(workflow_name(graph_path));
    report
        .save_to_file(output)
        .with_context(|| format!("Failed to write report to {}", output.display()))?;

    if verbose {
        eprintln!("{} {}", "Report saved to:".green(), output.display());
    }

    print_report_summary(&report);

    if report.has_errors() {
        std::process::exit(1);
    }

    Ok(())
}

fn print_plan(graph: &Graph, analysis: &Analysis, hints: bool) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Execution Plan".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    for step in &analysis.steps {
        let layer = match step.layer {
            Layer::Bronze => step.layer.as_str().yellow(),
            Layer::Silver => step.layer.as_str().white(),
            Layer::Gold => step.layer.as_str().bright_yellow().bold(),
        };
        println!("  {:>3}. [{}] {} (tool {})", step.order, layer, step.description, step.node_id);

        if hints {
            if let Some(hint) = &step.sql_hint {
                for line in hint.lines() {
                    println!("       {}", line.dimmed());
                }
            }
        }
    }

    println!();
    println!("{}", "Suggested models:".bold());
    for (layer, ids) in &analysis.layers {
        let names: Vec<String> = ids
            .iter()
            .filter_map(|id| graph.node(*id))
            .map(|node| format!("{}{}", layer.model_prefix(), node.id))
            .collect();
        if names.is_empty() {
            continue;
        }
        println!("  {:<7} {}", format!("{}:", layer), names.join(", "));
    }

    print_inventory(&analysis.inventory);
}

fn print_inventory(inventory: &Inventory) {
    if inventory.is_empty() {
        return;
    }

    println!();
    println!("{}", "Sources:".bold());
    for source in &inventory.sources {
        print_endpoint(source);
    }

    println!("{}", "Targets:".bold());
    for target in &inventory.targets {
        print_endpoint(target);
    }
}

fn print_endpoint(endpoint: &Endpoint) {
    println!(
        "  {} [{}] {} (tool {})",
        "•".cyan(),
        endpoint.kind.as_str().cyan(),
        endpoint.location.as_deref().unwrap_or("N/A"),
        endpoint.node_id
    );
    if let Some(connection) = &endpoint.connection {
        println!("      {}", connection.dimmed());
    }
}

fn print_report_summary(report: &MigrationReport) {
    println!();
    println!("{}", "Summary:".bold());
    println!("  Steps:    {}", report.summary.steps);

    if report.summary.errors > 0 {
        println!("  Errors:   {}", format!("{}", report.summary.errors).red().bold());
    } else {
        println!("  Errors:   {}", format!("{}", report.summary.errors).green());
    }

    if report.summary.warnings > 0 {
        println!("  Warnings: {}", format!("{}", report.summary.warnings).yellow());
    } else {
        println!("  Warnings: {}", format!("{}", report.summary.warnings).green());
    }

    println!("  Info:     {}", report.summary.info);
    println!();

    if report.diagnostics.is_empty() {
        println!("{}", "✓ Nothing needs manual review".green().bold());
        return;
    }

    println!(
        "{} {}",
        "Tools needing review:".bold(),
        report.summary.tools_needing_review
    );
    for diag in &report.diagnostics {
        print_diagnostic(diag);
    }
}

fn print_diagnostic(diag: &Diagnostic) {
    let severity = match diag.severity {
        Severity::Error => "ERROR".red().bold(),
        Severity::Warn => "WARN".yellow().bold(),
        Severity::Info => "INFO".cyan(),
    };

    println!("  [{}] {}: {}", severity, diag.code, diag.message);

    if let Some(location) = &diag.location {
        match (location.node_id, &location.field) {
            (Some(node_id), Some(field)) => println!("    at tool {} field {}", node_id, field),
            (Some(node_id), None) => println!("    at tool {}", node_id),
            _ => {}
        }
    }
}

/// Lineage command - list every source-to-target path
fn lineage_command(config: &Config, graph_path: &Path) -> Result<()> {
    let graph = load_graph(graph_path, false)?;
    let analysis = WorkflowAnalyzer::new(&graph, config).analyze()?;

    let name = |id: NodeId| {
        graph
            .node(id)
            .map(|node| node.display_name())
            .unwrap_or_else(|| id.to_string())
    };

    if analysis.lineage.lineages.is_empty() {
        println!("{}", "No source reaches a target".yellow());
        return Ok(());
    }

    for lineage in &analysis.lineage.lineages {
        let path: Vec<String> = lineage.path.iter().map(|id| id.to_string()).collect();
        println!(
            "{} {} {}: {}",
            name(lineage.source).green(),
            "->".dimmed(),
            name(lineage.target).green(),
            path.join(" -> ")
        );
    }

    for (source, target) in &analysis.lineage.truncated {
        println!(
            "{} paths from tool {} to tool {} capped at {}",
            "⚠".yellow(),
            source,
            target,
            config.lineage.max_paths
        );
    }

    Ok(())
}

/// Convert command - transpile one expression
fn convert_command(config: &Config, expression: &str) -> Result<()> {
    let mut transpiler = Transpiler::new(FunctionRegistry::shared_trino(), config.transpiler.clone());
    let sql = transpiler.convert(expression);

    println!("{}", sql);
    for diag in transpiler.diagnostics() {
        let severity = config.severity.get_severity(diag.code, diag.severity);
        eprintln!("{} {}", format!("{}:", severity).yellow(), diag);
    }

    Ok(())
}

/// Init-config command - write defaults to disk
fn init_config_command(path: &Path) -> Result<()> {
    if path.exists() {
        anyhow::bail!("{} already exists", path.display());
    }

    Config::default().save_to_file(path)?;
    eprintln!("{} {}", "Config written to:".green(), path.display());
    Ok(())
}
