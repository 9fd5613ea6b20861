use crate::{
    config::Config,
    metrics::{MetricCatalog, MetricDef},
    pipeline::Pipeline,
    source::{routed::RoutedSource, TextSource},
    stats,
    table::LabTable,
    util::{ensure_dir, job_id, looks_like_url, now_rfc3339},
};
use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "labtab")]
#[command(about = "Lab report digitizer: blood-test metrics from report text into a dated table")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./labtab.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct SelectArgs {
    /// Metric to extract, by name or label (repeatable). Defaults to `selection.metrics`.
    #[arg(long = "metric")]
    pub metrics: Vec<String>,

    #[arg(long, conflicts_with = "metrics")]
    pub all_metrics: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Doctor {},
    Metrics {},
    Extract {
        #[arg(long)]
        input: PathBuf,
        #[command(flatten)]
        select: SelectArgs,
    },
    Run {
        #[arg(long, required = true)]
        input: Vec<PathBuf>,
        #[arg(long)]
        out_dir: Option<PathBuf>,
        #[command(flatten)]
        select: SelectArgs,
    },
    Correlate {
        #[arg(long)]
        table: PathBuf,
        #[arg(long)]
        x: String,
        #[arg(long)]
        y: String,
        #[arg(long)]
        explain: bool,
    },
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg = match resolve_config_path(args.config.as_deref()) {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };

    match &args.cmd {
        Command::Doctor {} => {
            let log_path = resolve_log_path(&cfg, None);
            let _guard = init_logging(&args, &cfg, log_path.as_deref())?;
            doctor(&cfg)
        }
        Command::Metrics {} => {
            let _guard = init_logging(&args, &cfg, None)?;
            list_metrics(&cfg)
        }
        Command::Extract { input, select } => {
            let log_path = resolve_log_path(&cfg, None);
            let _guard = init_logging(&args, &cfg, log_path.as_deref())?;
            extract(&cfg, input, select)
        }
        Command::Run {
            input,
            out_dir,
            select,
        } => run(&args, &cfg, input, out_dir.as_deref(), select),
        Command::Correlate {
            table,
            x,
            y,
            explain,
        } => {
            let _guard = init_logging(&args, &cfg, None)?;
            correlate(table, x, y, *explain)
        }
    }
}

fn resolve_config_path(user: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = user {
        return Some(p.to_path_buf());
    }
    ["labtab.toml", "labtab.example.toml"]
        .into_iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries command output; logs go to stderr.
    let console_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    // A second dispatch in the same process keeps the first subscriber.
    if tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .is_err()
    {
        debug!("logging already initialized");
    }

    Ok(guard)
}

fn selected_metrics(cfg: &Config, select: &SelectArgs) -> Result<Vec<MetricDef>> {
    let catalog = MetricCatalog::new(cfg.catalog());
    if select.all_metrics {
        return Ok(catalog.all().to_vec());
    }
    let names = if select.metrics.is_empty() {
        &cfg.selection.metrics
    } else {
        &select.metrics
    };
    let picked = catalog.resolve(names)?;
    if picked.is_empty() {
        bail!("no metrics selected");
    }
    Ok(picked)
}

fn doctor(cfg: &Config) -> Result<()> {
    let source = RoutedSource::new(cfg);
    let diag = source.doctor()?;
    println!("{}", serde_json::to_string_pretty(&diag)?);
    Ok(())
}

fn list_metrics(cfg: &Config) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "selected": cfg.selection.metrics,
            "catalog": cfg.catalog(),
        }))?
    );
    Ok(())
}

fn extract(cfg: &Config, input: &Path, select: &SelectArgs) -> Result<()> {
    validate_input(cfg, input)?;
    let metrics = selected_metrics(cfg, select)?;
    let pipeline = Pipeline::new(cfg, metrics, RoutedSource::new(cfg));
    let fx = pipeline.extract_file(input)?;
    println!("{}", serde_json::to_string_pretty(&fx)?);
    Ok(())
}

fn correlate(table_path: &Path, x: &str, y: &str, explain: bool) -> Result<()> {
    let raw = std::fs::read_to_string(table_path)
        .with_context(|| format!("reading table: {}", table_path.display()))?;
    let table: LabTable = serde_json::from_str(&raw)
        .with_context(|| format!("parsing table JSON: {}", table_path.display()))?;

    if explain {
        println!("{}", stats::METHOD_NOTES);
    }

    let res = stats::pearson(&table, x, y)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "x": res.x,
            "y": res.y,
            "n": res.n,
            "pearson_r": round_to(res.r, 4),
            "p_value": round_to(res.p_value, 6),
        }))?
    );
    Ok(())
}

fn round_to(v: f64, places: i32) -> f64 {
    let f = 10f64.powi(places);
    (v * f).round() / f
}

fn run(
    args: &Args,
    cfg: &Config,
    inputs: &[PathBuf],
    out_override: Option<&Path>,
    select: &SelectArgs,
) -> Result<()> {
    let source = RoutedSource::new(cfg);
    let files = collect_inputs(cfg, &source, inputs)?;
    if files.is_empty() {
        bail!("no report files found in the given inputs");
    }
    let metrics = selected_metrics(cfg, select)?;

    let names: Vec<String> = metrics.iter().map(|m| m.name.clone()).collect();
    let id = job_id(
        &format!("{}\nmetrics={}", cfg.normalized_for_hash(), names.join(",")),
        &files,
        cfg.security.max_input_file_bytes,
    );

    let out_root = out_override
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(&cfg.paths.out_dir));
    let job_dir = out_root.join(&id);

    if job_dir.exists() && !cfg.global.overwrite_existing {
        return Err(anyhow!(
            "job_dir already exists and overwrite_existing=false: {}",
            job_dir.display()
        ));
    }

    let final_dir = job_dir.join("final");
    ensure_dir(&final_dir)?;
    ensure_dir(&job_dir.join("logs"))?;

    let log_path = resolve_log_path(cfg, Some(&job_dir));
    let _guard = init_logging(args, cfg, log_path.as_deref())?;

    info!(
        "job_id={id} job={} files={} metrics={:?} out={}",
        cfg.global.job_name,
        files.len(),
        names,
        job_dir.display()
    );

    if cfg.debug.dump_effective_config {
        let raw = toml::to_string(cfg).unwrap_or_default();
        std::fs::write(job_dir.join("effective-config.toml"), raw)?;
    }

    let pipeline = Pipeline::new(cfg, metrics, source);

    let started = now_rfc3339();
    let result = pipeline.run(&files)?;

    if result.table.is_empty() {
        warn!("no data extracted");
    }

    let status = if result.report.failed == 0 { "ok" } else { "partial" };

    let out = &cfg.output;
    if out.write_csv {
        std::fs::write(
            final_dir.join(&out.csv_filename),
            result.table.to_csv(&out.date_format)?,
        )?;
    }
    if out.write_markdown {
        std::fs::write(
            final_dir.join(&out.markdown_filename),
            result.table.to_markdown(&out.date_format)?,
        )?;
    }
    if out.write_json {
        std::fs::write(
            final_dir.join(&out.json_filename),
            serde_json::to_string_pretty(&result.table)?,
        )?;
    }
    if out.write_series {
        std::fs::write(
            final_dir.join(&out.series_filename),
            serde_json::to_string_pretty(&result.table.series())?,
        )?;
    }
    if out.write_debug {
        std::fs::write(
            final_dir.join(&out.debug_filename),
            result.debug.to_csv(&out.date_format)?,
        )?;
    }
    if out.write_report_json {
        std::fs::write(
            final_dir.join(&out.report_filename),
            serde_json::to_string_pretty(&result.report)?,
        )?;
    }

    if out.write_index_json {
        let index = serde_json::json!({
            "job_id": id,
            "started": started,
            "finished": now_rfc3339(),
            "metrics": names,
            "table_csv": format!("final/{}", out.csv_filename),
            "table_markdown": format!("final/{}", out.markdown_filename),
            "table_json": format!("final/{}", out.json_filename),
            "series": format!("final/{}", out.series_filename),
            "debug": format!("final/{}", out.debug_filename),
            "report": format!("final/{}", out.report_filename),
            "processed": result.report.processed,
            "failed": result.report.failed,
            "status": status,
        });
        std::fs::write(job_dir.join("index.json"), serde_json::to_string_pretty(&index)?)?;
    }

    if cfg.global.print_summary {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "job_id": id,
                "job_dir": job_dir,
                "processed": result.report.processed,
                "failed": result.report.failed,
                "rows": result.table.rows.len(),
                "columns": result.table.columns(),
                "status": status,
            }))?
        );
    }

    Ok(())
}

fn collect_inputs(cfg: &Config, source: &RoutedSource, inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = std::fs::read_dir(input)
                .with_context(|| format!("listing {}", input.display()))?
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && source.accepts(p))
                .filter(|p| !source.is_sidecar(p))
                .collect();
            found.sort();
            files.extend(found);
            continue;
        }
        if cfg.security.reject_url_inputs && looks_like_url(&input.display().to_string()) {
            bail!("URL inputs are disabled: {}", input.display());
        }
        // Missing or unsupported files fail on their own inside the pipeline.
        files.push(input.clone());
    }
    Ok(files)
}

fn validate_input(cfg: &Config, input: &Path) -> Result<()> {
    let input_str = input.display().to_string();

    if cfg.security.reject_url_inputs && looks_like_url(&input_str) {
        return Err(anyhow!("URL inputs are disabled: {input_str}"));
    }

    if !input.exists() {
        return Err(anyhow!("input does not exist: {}", input.display()));
    }

    Ok(())
}

fn resolve_log_path(cfg: &Config, job_dir: Option<&Path>) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }

    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }

    if let Some(job_dir) = job_dir {
        return Some(job_dir.join("logs").join("labtab.log"));
    }

    Some(PathBuf::from(&cfg.paths.out_dir).join("labtab.log"))
}
