use anyhow::{Context, Result};
use bench_metrics::{MetricsConfig, MetricsError, MetricsReport, ResultsFile};
use chrono::Utc;
use clap::Parser;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Parser)]
#[command(
    name = "bench-metrics",
    version,
    about = "Average reward, pass^k and failure sources for a benchmark results file"
)]
struct Cli {
    /// JSON array of trial records
    results: PathBuf,
    /// YAML file with engine options (reward_policy, max_k)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Emit a single JSON envelope on stdout
    #[arg(long)]
    json: bool,
    /// Print the diagnostics of every unexplained failure after the report
    #[arg(long)]
    show_unknown: bool,
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let json_mode = cli.json;
    match run(&cli) {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(err) => {
            if json_mode {
                emit_json(&error_payload(&err));
                std::process::exit(1);
            }
            Err(err)
        }
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> Result<String> {
    let config = load_config(cli.config.as_deref())?;
    debug!(
        reward_policy = config.reward_policy.as_str(),
        max_k = ?config.max_k,
        "loaded metrics config"
    );
    let results = bench_metrics::load_results(&cli.results)?;
    let report = bench_metrics::compute_metrics_with(&results.records, &config)?;

    if cli.json {
        let mut payload = metrics_envelope(&results, &config, &report)?;
        if cli.show_unknown {
            payload["unknown_failures"] = serde_json::to_value(&report.unknown_failures)?;
        }
        return Ok(serde_json::to_string(&payload)?);
    }

    let mut out = bench_metrics::render_report(&report)?;
    out.push('\n');
    out.push_str(&format!(
        "records: {}  tasks: {}  trials: {}  failures: {}\n",
        report.num_records,
        report.num_tasks,
        report.num_trials,
        report.total_failures()
    ));
    out.push_str(&format!("input_digest: {}", results.digest));
    if cli.show_unknown {
        out.push_str(&render_unknown(&report)?);
    }
    Ok(out)
}

fn load_config(path: Option<&Path>) -> Result<MetricsConfig> {
    match path {
        Some(p) => MetricsConfig::load(p)
            .with_context(|| format!("loading metrics config {}", p.display())),
        None => Ok(MetricsConfig::default()),
    }
}

fn metrics_envelope(
    results: &ResultsFile,
    config: &MetricsConfig,
    report: &MetricsReport,
) -> Result<Value> {
    Ok(json!({
        "ok": true,
        "command": "metrics",
        "generated_at": Utc::now().to_rfc3339(),
        "input": {
            "path": results.path.display().to_string(),
            "digest": results.digest,
            "records": report.num_records,
            "tasks": report.num_tasks,
            "trials": report.num_trials
        },
        "config": {
            "reward_policy": config.reward_policy.as_str(),
            "max_k": config.max_k
        },
        "metrics": serde_json::to_value(report)?
    }))
}

fn render_unknown(report: &MetricsReport) -> Result<String> {
    let mut out = String::new();
    for failure in &report.unknown_failures {
        out.push_str(&format!(
            "\n\nunknown failure: record {} task {} trial {}\n",
            failure.index, failure.task_id, failure.trial
        ));
        match &failure.info {
            Some(info) => out.push_str(&serde_json::to_string_pretty(info)?),
            None => out.push_str("<no info>"),
        }
    }
    Ok(out)
}

fn emit_json(value: &Value) {
    match serde_json::to_string(value) {
        Ok(s) => println!("{}", s),
        Err(_) => println!(
            "{{\"ok\":false,\"error\":{{\"code\":\"serialization_error\",\"message\":\"failed to serialize JSON payload\",\"details\":{{}}}}}}"
        ),
    }
}

fn json_error(code: &str, message: String, details: Value) -> Value {
    json!({
        "ok": false,
        "error": {
            "code": code,
            "message": message,
            "details": details
        }
    })
}

fn error_payload(err: &anyhow::Error) -> Value {
    match err.downcast_ref::<MetricsError>() {
        Some(MetricsError::MalformedRecord { index, reason }) => json_error(
            "malformed_record",
            err.to_string(),
            json!({ "index": index, "reason": reason }),
        ),
        Some(MetricsError::NonBinaryReward {
            index,
            task_id,
            reward,
        }) => json_error(
            "non_binary_reward",
            err.to_string(),
            json!({ "index": index, "task_id": task_id, "reward": reward }),
        ),
        Some(metrics_err) => json_error(metrics_err.code(), format!("{:#}", err), json!({})),
        None => json_error("command_failed", format!("{:#}", err), json!({})),
    }
}
