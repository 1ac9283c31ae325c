//! proactnaming CLI
//!
//! # Usage
//!
//! ```bash
//! export PROACTNAMING_HOST=https://naming.example.net
//! export PROACTNAMING_APIKEY=...
//!
//! # Preview the names the manifest would produce
//! proactnaming --manifest names.yaml plan
//!
//! # Refresh, plan and apply
//! proactnaming --manifest names.yaml --state names.state.json apply
//!
//! # Look up a generated name by id
//! proactnaming show-name --id 42
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use proactnaming_provider::{
    generated_name, resource_types, ApplyReport, ChangeAction, Diagnostic, Engine, FileStateStore,
    Manifest, Plan, ProcessEnv, ProviderContext, RefreshReport, Value,
};
use tracing::debug;

#[derive(Parser)]
#[command(name = "proactnaming")]
#[command(about = "Manage generated resource names in the Azure Naming Tool", long_about = None)]
struct Cli {
    /// Manifest declaring the provider settings and resources
    #[arg(short, long, global = true, default_value = "proactnaming.yaml")]
    manifest: PathBuf,

    /// State file
    #[arg(short, long, global = true, default_value = "proactnaming.state.json")]
    state: PathBuf,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show what apply would change, with previewed names
    Plan,

    /// Refresh state, then create, replace or delete names
    Apply,

    /// Re-read every stored name from the naming tool
    Refresh,

    /// Delete every stored name
    Destroy,

    /// Look up one generated name by id
    ShowName {
        #[arg(long)]
        id: i64,
    },

    /// List the naming tool's resource types
    ResourceTypes,
}

fn setup_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("proactnaming=debug,proactnaming_provider=debug,proactnaming_client=debug,info")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_manifest(path: &Path, required: bool) -> anyhow::Result<Manifest> {
    if !required && !path.exists() {
        debug!(path = %path.display(), "no manifest; using environment only");
        return Ok(Manifest::from_yaml_str("version: 1\n")?);
    }
    Manifest::from_yaml(path).with_context(|| format!("loading manifest {}", path.display()))
}

fn print_diagnostics<'a>(diagnostics: impl IntoIterator<Item = &'a Diagnostic>) {
    for diagnostic in diagnostics {
        eprintln!("{}", diagnostic);
    }
}

fn print_plan(plan: &Plan) {
    for change in &plan.changes {
        let name = match &change.planned_name {
            Value::Known(name) => name.as_str(),
            Value::Unknown => "(known after apply)",
            Value::Null => "",
        };
        match &change.action {
            ChangeAction::Create => println!("  + {} => {}", change.address, name),
            ChangeAction::Replace { fields } => {
                let fields: Vec<_> = fields.iter().map(|f| f.as_str()).collect();
                println!(
                    "-/+ {} {} => {} (forces replacement: {})",
                    change.address,
                    change.current_name.as_deref().unwrap_or_default(),
                    name,
                    fields.join(", ")
                );
            }
            ChangeAction::Delete => println!(
                "  - {} {}",
                change.address,
                change.current_name.as_deref().unwrap_or_default()
            ),
            ChangeAction::NoOp => {}
        }
    }
    let summary = plan.summary();
    println!(
        "Plan: {} to add, {} to replace, {} to destroy, {} unchanged.",
        summary.create, summary.replace, summary.delete, summary.unchanged
    );
    print_diagnostics(plan.diagnostics());
}

fn finish_apply(report: ApplyReport) -> anyhow::Result<()> {
    for applied in &report.applied {
        match (&applied.record_id, &applied.resolved_name) {
            (Some(id), Some(name)) => {
                println!("{} ({}): {} [{}]", applied.address, applied.action.as_str(), name, id)
            }
            _ => println!("{} ({})", applied.address, applied.action.as_str()),
        }
    }
    print_diagnostics(&report.diagnostics);
    for failure in &report.failures {
        eprintln!("Error: {}: {}", failure.address, failure.error);
    }
    if !report.is_success() {
        bail!("{} resource(s) failed", report.failures.len());
    }
    Ok(())
}

fn finish_refresh(report: &RefreshReport) -> anyhow::Result<()> {
    for (address, changed) in &report.current {
        println!("{}: {}", address, if *changed { "updated" } else { "unchanged" });
    }
    for address in &report.vanished {
        println!("{}: removed from state", address);
    }
    print_diagnostics(&report.diagnostics);
    for failure in &report.failures {
        eprintln!("Error: {}: {}", failure.address, failure.error);
    }
    if !report.failures.is_empty() {
        bail!("{} resource(s) could not be refreshed", report.failures.len());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    let needs_manifest = matches!(
        cli.command,
        Commands::Plan | Commands::Apply | Commands::Refresh | Commands::Destroy
    );
    let manifest = load_manifest(&cli.manifest, needs_manifest)?;
    let context = ProviderContext::configure(&manifest.provider, &ProcessEnv)?;
    let engine = Engine::new(context.clone(), Arc::new(FileStateStore::new(&cli.state)));

    match cli.command {
        Commands::Plan => {
            let plan = engine.plan(&manifest.desired()).await?;
            print_plan(&plan);
        }
        Commands::Apply => {
            finish_refresh(&engine.refresh().await?)?;
            let plan = engine.plan(&manifest.desired()).await?;
            print_plan(&plan);
            if plan.has_changes() {
                finish_apply(engine.apply(&plan).await?)?;
            }
        }
        Commands::Refresh => {
            finish_refresh(&engine.refresh().await?)?;
        }
        Commands::Destroy => {
            finish_apply(engine.destroy_all().await?)?;
        }
        Commands::ShowName { id } => {
            let listing = generated_name(&context, id).await?;
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
        Commands::ResourceTypes => {
            let types = resource_types(&context).await?;
            println!("{}", serde_json::to_string_pretty(&types)?);
        }
    }

    Ok(())
}
