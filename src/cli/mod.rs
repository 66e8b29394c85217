//! Command-line interface for eventscape.
//!
//! Provides commands for generating a scene from an event description,
//! previewing the plan, listing templates and showing configuration.

use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use crate::config;
use crate::domain::{EventOrchestrationParameters, OrchestrationResult, TemplateId};

/// eventscape - Culture-aware event scene orchestration
#[derive(Parser, Debug)]
#[command(name = "eventscape")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a scene from an event description
    Generate {
        /// Parameters file, JSON or YAML (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Write the result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Show framework, zones and strategy without generating
    Plan {
        /// Parameters file, JSON or YAML (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Include the per-template parameter records
        #[arg(long)]
        records: bool,
    },

    /// List registered templates and their relationships
    Templates,

    /// Show resolved configuration (debug)
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Yaml,
    /// Human-readable report only
    Summary,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Generate {
                input,
                output,
                format,
                pretty,
            } => generate(input, output, format, pretty).await,
            Commands::Plan { input, records } => plan(input, records),
            Commands::Templates => list_templates(),
            Commands::Config => show_config(),
        }
    }
}

/// Read the raw parameters from a file or piped stdin
fn read_input(input_file: Option<&Path>) -> Result<String> {
    let input = if let Some(path) = input_file {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file: {}", path.display()))?
    } else if !io::stdin().is_terminal() {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        buffer
    } else {
        anyhow::bail!("No input provided. Use --input <file> or pipe to stdin");
    };

    if input.trim().is_empty() {
        anyhow::bail!("Input is empty");
    }
    Ok(input)
}

/// Parse JSON or YAML parameters; YAML when the file says so or the text
/// does not look like a JSON object
pub fn parse_params(raw: &str, path: Option<&Path>) -> Result<EventOrchestrationParameters> {
    let yaml_ext = path
        .and_then(|p| p.extension())
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

    if !yaml_ext && raw.trim_start().starts_with('{') {
        serde_json::from_str(raw).context("Failed to parse event parameters as JSON")
    } else {
        serde_yaml::from_str(raw).context("Failed to parse event parameters as YAML")
    }
}

fn load_params(input: Option<PathBuf>) -> Result<EventOrchestrationParameters> {
    let raw = read_input(input.as_deref())?;
    parse_params(&raw, input.as_deref())
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    if pretty {
        serde_json::to_string_pretty(value).context("Failed to serialize output")
    } else {
        serde_json::to_string(value).context("Failed to serialize output")
    }
}

/// Generate a scene and write it out
async fn generate(
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    format: OutputFormat,
    pretty: bool,
) -> Result<()> {
    let params = load_params(input)?;
    let orchestrator = config::config()?.orchestrator()?;

    let result = orchestrator
        .run(&params)
        .await
        .context("Orchestration failed")?;

    let rendered = match format {
        OutputFormat::Json => to_json(&result, pretty)?,
        OutputFormat::Yaml => serde_yaml::to_string(&result).context("Failed to serialize output")?,
        OutputFormat::Summary => summary(&result),
    };

    match output {
        Some(path) => {
            std::fs::write(&path, rendered)
                .with_context(|| format!("Failed to write output: {}", path.display()))?;
            eprintln!("{}", summary(&result));
            eprintln!("[Scene written to {}]", path.display());
        }
        None => {
            println!("{}", rendered);
            if format != OutputFormat::Summary {
                eprintln!("\n[Run {} completed in {}ms]", result.run_id, result.metadata.generation_time_ms);
            }
        }
    }

    Ok(())
}

/// Human-readable report of a run
pub fn summary(result: &OrchestrationResult) -> String {
    let scores = &result.metadata.scores;
    let mut out = String::new();

    out.push_str(&format!("Run: {}\n", result.run_id));
    out.push_str(&format!("Components ({}):", result.metadata.template_count));
    for template in result.components.keys() {
        out.push_str(&format!(" {}", template));
    }
    out.push('\n');
    out.push_str("\nScores:\n");
    for (name, value) in [
        ("Cultural authenticity", scores.cultural_authenticity),
        ("Accessibility", scores.accessibility),
        ("Sustainability", scores.sustainability),
        ("Experience", scores.experience),
        ("Spatial efficiency", scores.spatial_efficiency),
        ("Technical integration", scores.technical_integration),
    ] {
        out.push_str(&format!("  {:<22} {:>5.1}\n", name, value));
    }
    out.push_str(&format!(
        "  {:<22} {:>5.1}%\n",
        "Budget utilization",
        result.metadata.budget_utilization * 100.0
    ));

    if !result.recommendations.is_empty() {
        out.push_str("\nRecommendations:\n");
        for rec in &result.recommendations {
            out.push_str(&format!("  {}\n", rec));
        }
    }
    if !result.cultural_notes.is_empty() {
        out.push_str("\nCultural notes:\n");
        for note in &result.cultural_notes {
            out.push_str(&format!("  {}\n", note));
        }
    }
    if !result.notes.is_empty() {
        out.push_str("\nNotes:\n");
        for note in &result.notes {
            out.push_str(&format!("  {}\n", note));
        }
    }
    out
}

/// Print phases 1–4 of a run
fn plan(input: Option<PathBuf>, records: bool) -> Result<()> {
    let params = load_params(input)?;
    let orchestrator = config::config()?.orchestrator()?;
    let preview = orchestrator.preview(&params).context("Planning failed")?;

    println!("Culture: {} ({})", preview.framework.primary, preview.framework.fusion.compatibility);
    println!(
        "Usable area: {:.0} m2, zoned {:.0} m2",
        preview.plan.usable_area_m2, preview.plan.allocated_area_m2
    );
    println!();
    println!("{:<14} {:>9} {:>9}", "ZONE", "AREA m2", "CAPACITY");
    println!("{}", "-".repeat(34));
    for zone in &preview.plan.zones {
        println!("{:<14} {:>9.1} {:>9}", zone.purpose.to_string(), zone.area_m2, zone.capacity);
    }

    println!();
    println!("{:<13} {:<9} {:>8} {:>12}", "TEMPLATE", "KIND", "PRIORITY", "ALLOCATION");
    println!("{}", "-".repeat(45));
    for template in preview.strategy.selected() {
        let kind = if preview.strategy.is_required(template) {
            "required"
        } else {
            "optional"
        };
        println!(
            "{:<13} {:<9} {:>8} {:>12.2}",
            template.as_str(),
            kind,
            preview.strategy.priority_of(template),
            preview.strategy.allocation_of(template).unwrap_or(0.0)
        );
    }
    println!("Contingency: {:.2} {}", preview.strategy.contingency, params.budget.currency);

    for advisory in &preview.plan.advisories {
        println!("! {}", advisory);
    }

    if records {
        println!();
        println!("{}", to_json(&preview.records, true)?);
    }
    Ok(())
}

/// List templates and the relationship graph
fn list_templates() -> Result<()> {
    let orchestrator = config::config()?.orchestrator()?;
    let registry = orchestrator.registry();

    println!("{:<13} {:<10} {:<9} {:<8}", "TEMPLATE", "CATEGORY", "FALLBACK", "MOVABLE");
    println!("{}", "-".repeat(43));
    for template in TemplateId::ASSEMBLY_ORDER {
        if !registry.contains(template) {
            continue;
        }
        println!(
            "{:<13} {:<10} {:<9} {:<8}",
            template.as_str(),
            template.category().to_string(),
            if registry.has_fallback(template) { "yes" } else { "no" },
            if template.is_movable() { "yes" } else { "no" }
        );
    }

    println!();
    println!("Relationships:");
    for edge in orchestrator.graph().edges() {
        println!("  {}", edge);
    }
    Ok(())
}

fn show_config() -> Result<()> {
    let cfg = config::config()?;
    let limits = &cfg.settings.limits;

    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Limits:");
    println!("  Max workers:        {}", limits.max_workers);
    println!("  Generator timeout:  {}ms", limits.generator_timeout_ms);
    println!("  Run timeout:        {}s", limits.run_timeout_seconds);
    println!("  Contingency:        {:.0}%", limits.contingency_share() * 100.0);
    println!("  Min edge strength:  {}", limits.min_edge_strength);
    println!();
    println!("Scoring thresholds:");
    println!("  Cultural:           {}", cfg.settings.scoring.cultural);
    println!("  Accessibility:      {}", cfg.settings.scoring.accessibility);
    println!("  Sustainability:     {}", cfg.settings.scoring.sustainability);
    println!();
    println!("Retry: {} attempt(s), {}ms initial delay", cfg.settings.retry.max_attempts, cfg.settings.retry.initial_delay_ms);
    if !cfg.settings.non_critical.is_empty() {
        let names: Vec<&str> = cfg.settings.non_critical.iter().map(|t| t.as_str()).collect();
        println!("Non-critical: {}", names.join(", "));
    }
    if !cfg.compatibility.is_empty() {
        println!();
        println!("Compatibility overrides:");
        for o in &cfg.compatibility {
            println!("  {} + {}: {}", o.cultures.0, o.cultures.1, o.level);
        }
    }
    Ok(())
}
