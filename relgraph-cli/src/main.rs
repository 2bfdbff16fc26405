// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::{Context, Result};
use clap::Parser;
use relgraph_core::{Pipeline, PipelineConfig, RecordPolicy};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Lay out a relation graph from knowledge-base query results", long_about = None)]
struct Args {
    /// JSON file holding the relation entries returned by the upstream query
    #[arg(short, long)]
    filename: PathBuf,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Where to write the laid-out graph (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Statement type to keep (overrides config file)
    #[arg(long, env = "RELGRAPH_STATEMENT_TYPE")]
    statement_type: Option<String>,

    /// Seed for community detection and placement (overrides config file)
    #[arg(long, env = "RELGRAPH_SEED")]
    seed: Option<u64>,

    /// Fail on the first malformed record instead of skipping it
    #[arg(long)]
    strict: bool,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

/// Apply CLI overrides on top of the loaded configuration
fn apply_overrides(args: &Args, mut config: PipelineConfig) -> PipelineConfig {
    if let Some(kind) = &args.statement_type {
        config.statement_type = kind.clone().into();
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if args.strict {
        config.invalid_records = RecordPolicy::Abort;
    }
    config
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relgraph=info,relgraph_core=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // Load configuration
    let config = apply_overrides(&args, PipelineConfig::load(args.config.clone())?);

    let reader = BufReader::new(
        File::open(&args.filename)
            .with_context(|| format!("failed to open {}", args.filename.display()))?,
    );
    let records: serde_json::Value = serde_json::from_reader(reader)
        .with_context(|| format!("failed to parse {}", args.filename.display()))?;

    tracing::info!(
        "Building {} graph from {:?}",
        config.statement_type,
        args.filename
    );

    let output = Pipeline::new(config)
        .run_json(&records)
        .context("relation graph pipeline failed")?;

    let report = &output.report;
    tracing::info!(
        seen = report.records_seen,
        accepted = report.records_accepted,
        dropped = report.records_dropped,
        rejected = report.rejected.len(),
        nodes = report.graph.node_count,
        edges = report.graph.edge_count,
        communities = output.partition.len(),
        converged = report.layout.converged,
        "Layout complete"
    );

    let snapshot = output.snapshot();
    let mut writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(std::io::stdout().lock())),
    };

    if args.pretty {
        serde_json::to_writer_pretty(&mut writer, &snapshot)?;
    } else {
        serde_json::to_writer(&mut writer, &snapshot)?;
    }
    writeln!(writer)?;
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use relgraph_core::StatementType;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_overrides() {
        let args = Args::try_parse_from([
            "relgraph",
            "-f",
            "relations.json",
            "--statement-type",
            "Inhibition",
            "--seed",
            "3",
            "--strict",
        ])
        .unwrap();
        assert_eq!(args.filename, PathBuf::from("relations.json"));
        assert_eq!(args.statement_type.as_deref(), Some("Inhibition"));
        assert_eq!(args.seed, Some(3));
        assert!(args.strict);
        assert!(args.output.is_none());
    }

    #[test]
    fn test_apply_overrides() {
        let args = Args::try_parse_from([
            "relgraph",
            "-f",
            "relations.json",
            "--statement-type",
            "Inhibition",
            "--seed",
            "3",
            "--strict",
        ])
        .unwrap();
        let config = apply_overrides(&args, PipelineConfig::default());
        assert_eq!(config.statement_type, StatementType::Inhibition);
        assert_eq!(config.seed, 3);
        assert_eq!(config.invalid_records, RecordPolicy::Abort);
    }

    #[test]
    fn test_no_overrides_keeps_config() {
        let args = Args::try_parse_from(["relgraph", "--filename", "relations.json"]).unwrap();
        let base = PipelineConfig {
            seed: 11,
            statement_type: StatementType::Activation,
            ..PipelineConfig::default()
        };
        let config = apply_overrides(&args, base);
        assert_eq!(config.seed, 11);
        assert_eq!(config.statement_type, StatementType::Activation);
        assert_eq!(config.invalid_records, RecordPolicy::Skip);
    }
}
