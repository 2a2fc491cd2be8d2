//! Canvas Wire - Entry Point
//!
//! Mounts a saved canvas and functionality descriptor, runs the
//! functionality once against the configured inference backend and prints
//! what ended up in the output component.

use canvas_wire::canvas::{ElementSpec, Surface};
use canvas_wire::core::config::RuntimeConfig;
use canvas_wire::core::error::{Result, WireError};
use canvas_wire::descriptor::FunctionalityDescriptor;
use canvas_wire::executor::{Executor, FunctionalityRuntime};
use canvas_wire::llm::backend_from_config;
use canvas_wire::pending::PendingOperationStore;
use canvas_wire::table::TableData;

use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use tokio::runtime::Runtime;

/// Run one AI-wired functionality headlessly
#[derive(Parser, Debug)]
#[command(name = "canvas-wire")]
#[command(about = "Resolve a functionality's bindings, call the backend and write the output")]
struct Args {
    /// Element tree JSON (array of element specs)
    #[arg(long)]
    canvas: PathBuf,

    /// Functionality descriptor JSON
    #[arg(long)]
    descriptor: PathBuf,

    /// Runtime configuration TOML
    #[arg(long)]
    config: Option<PathBuf>,

    /// Fire the trigger instead of executing directly
    #[arg(long)]
    click: bool,

    /// Output format: json or text
    #[arg(long, default_value = "text")]
    format: String,
}

/// JSON output structure
#[derive(Serialize)]
struct RunResult {
    execution_id: String,
    outcome: String,
    delivery: Option<String>,
    phases: Vec<String>,
    output_text: Option<String>,
    output_table: Option<TableData>,
    output_status: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("canvas_wire=info")),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => RuntimeConfig::load(path)?,
        None => RuntimeConfig::new(),
    };
    let specs: Vec<ElementSpec> = serde_json::from_str(&std::fs::read_to_string(&args.canvas)?)?;
    let descriptor = FunctionalityDescriptor::from_json(&std::fs::read_to_string(&args.descriptor)?)?;
    let output_id = descriptor.require_output()?.to_string();

    let rt = Runtime::new()?;
    let result = rt.block_on(async {
        let backend = backend_from_config(&config.backend)?;
        let surface = Surface::new(&specs);
        let executor = Executor::new(backend, PendingOperationStore::new(), surface.clone(), config);

        let mut runtime = FunctionalityRuntime::mount(executor, descriptor);
        let report = if args.click {
            let mut reports = runtime.take_reports();
            runtime.descriptor().require_trigger()?;
            let trigger = runtime.trigger_id().unwrap_or_default().to_string();
            let fired = surface.triggers().dispatch(&trigger);
            tracing::debug!("Trigger '{}' reached {} listeners", trigger, fired);
            match reports.as_mut() {
                Some(reports) if fired > 0 => reports.recv().await,
                _ => None,
            }
        } else {
            Some(runtime.run().await)
        };
        runtime.teardown();

        let state = surface.state();
        let result = report.map(|report| RunResult {
            execution_id: report.id.to_string(),
            outcome: format!("{:?}", report.outcome),
            delivery: report.delivery.map(|d| format!("{:?}", d)),
            phases: report.trail.phases().iter().map(|p| format!("{:?}", p)).collect(),
            output_text: state.text(&output_id).map(str::to_string),
            output_table: state.table(&output_id).cloned(),
            output_status: state.status(&output_id).map(str::to_string),
        });
        Ok::<_, WireError>(result)
    })?;

    let Some(result) = result else {
        tracing::warn!("Trigger did not start an execution");
        return Ok(());
    };

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("Execution {}: {}", result.execution_id, result.outcome);
    if let Some(text) = result.output_text.as_ref().or(result.output_status.as_ref()) {
        println!("\n{}", text);
    }
    if let Some(table) = &result.output_table {
        println!("\n{}", table.headers.join(" | "));
        for row in &table.rows {
            println!("{}", row.join(" | "));
        }
    }
    Ok(())
}
