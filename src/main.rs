use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process;

use mobylette::bucket::ChartLimit;
use mobylette::chart::{render_charts, ChartStyle, SvgChartWriter};
use mobylette::config::Config;
use mobylette::dedup::AggregateOptions;
use mobylette::display::DisplayManager;
use mobylette::file_discovery::FileDiscovery;
use mobylette::filter::EventFilter;
use mobylette::logging;
use mobylette::models::{CountMode, GroupMode};
use mobylette::report::write_csv_file;
use mobylette::timestamp_parser::TimestampParser;
use mobylette::ModuleUsageAnalyzer;

#[derive(Parser)]
#[command(name = "mobylette")]
#[command(about = "Parses Lmod usage logs for `module load` entries, writes a CSV report and SVG bar charts")]
#[command(version)]
struct Cli {
    /// Count modules loaded by distinct users or in distinct jobs
    #[arg(long, value_enum, default_value_t = CountMode::Jobs)]
    uniq: CountMode,

    /// Group counts by module category or by the first directory of the module path
    #[arg(long, value_enum)]
    group: Option<GroupMode>,

    /// Ignore loads before this date (yyyymmdd, yyyymmddhhmmss or yyyymmddThhmmss)
    #[arg(long, value_name = "DATE")]
    start: Option<String>,

    /// Ignore loads after this date (same formats as --start)
    #[arg(long, value_name = "DATE")]
    end: Option<String>,

    /// Only count these modules, given as name/version
    #[arg(long, num_args = 1.., value_name = "MODULE")]
    module: Vec<String>,

    /// Spread the ranking over at most this many charts
    #[arg(long, conflicts_with = "max_rows")]
    max_charts: Option<usize>,

    /// Put about this many rows on each chart
    #[arg(long)]
    max_rows: Option<usize>,

    /// Worker threads (0 = one per core)
    #[arg(long)]
    cpus: Option<usize>,

    /// Bar color as six hex digits, without '#'
    #[arg(long, value_name = "RRGGBB")]
    chart_color: Option<String>,

    /// Configuration file to use instead of the search path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding the Lmod logs
    #[arg(long)]
    log_path: Option<PathBuf>,

    /// CSV report path
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Print the counts as JSON instead of a summary table
    #[arg(long)]
    json: bool,

    /// List at most this many modules per group in the summary table
    #[arg(long, value_name = "N")]
    top: Option<usize>,

    /// Do not write SVG charts
    #[arg(long)]
    no_charts: bool,

    /// Leave out unreadable log files instead of aborting
    #[arg(long)]
    skip_unreadable: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Log files to read; when empty the configured log path is searched
    files: Vec<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(e) = run(cli) {
        handle_error(e, json);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    apply_cli_overrides(&mut config, &cli);
    config.validate()?;

    let _guard = logging::init_logging(&config.logging, cli.verbose);
    let span = logging::run_span();
    let _enter = span.enter();

    // Boundary checks come before any log file is opened.
    let chart_limit = resolve_chart_limit(&cli, &config)?;
    let start = cli.start.as_deref().map(TimestampParser::to_epoch).transpose()?;
    let end = cli.end.as_deref().map(TimestampParser::to_epoch).transpose()?;
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            anyhow::bail!("--start must not be after --end");
        }
    }

    let options = AggregateOptions {
        count_mode: cli.uniq,
        group_mode: cli.group.unwrap_or_default(),
        filter: EventFilter::new()
            .with_modules(cli.module.iter().cloned())
            .with_start(start)
            .with_end(end),
    };

    let files = if cli.files.is_empty() {
        let discovery = FileDiscovery::new(config.cluster.clone());
        discovery
            .discover_log_files()?
            .into_iter()
            .filter(|file| discovery.should_include_file(file, start))
            .collect()
    } else {
        cli.files.clone()
    };
    if files.is_empty() {
        anyhow::bail!("No log files found under {}", config.cluster.log_path.display());
    }

    let analyzer = ModuleUsageAnalyzer::new(options, config.processing.cpus, cli.skip_unreadable)?;
    let summary = analyzer.analyze(&files)?;

    write_csv_file(&summary.counts, &config.output.csv_file)?;

    if config.chart.enabled && !cli.no_charts {
        std::fs::create_dir_all(&config.chart.output_dir).with_context(|| {
            format!("Failed to create chart directory {}", config.chart.output_dir.display())
        })?;
        let style = ChartStyle {
            title: chart_title(&config, &cli),
            x_label: format!("Number of distinct {}", summary.counts.count_mode.noun()),
            color: config.chart.color.clone(),
        };
        let mut writer = SvgChartWriter::new(config.chart.output_dir.clone(), style);
        let pages = render_charts(&summary.counts, chart_limit, &mut writer)?;
        tracing::info!(charts = pages, "Rendered charts");
    }

    DisplayManager::new(config.output.json_pretty).display_counts(
        &summary.counts,
        summary.files_scanned,
        cli.top,
        cli.json,
    );
    if !summary.files_failed.is_empty() && !cli.json {
        eprintln!("Warning: {} log file(s) could not be read", summary.files_failed.len());
    }
    Ok(())
}

fn apply_cli_overrides(config: &mut Config, cli: &Cli) {
    if let Some(cpus) = cli.cpus {
        config.processing.cpus = cpus;
    }
    if let Some(color) = &cli.chart_color {
        config.chart.color = color.trim_start_matches('#').to_string();
    }
    if let Some(log_path) = &cli.log_path {
        config.cluster.log_path = log_path.clone();
    }
    if let Some(csv) = &cli.csv {
        config.output.csv_file = csv.clone();
    }
}

/// Command-line limits win over the config file; within one source only one may be set.
fn resolve_chart_limit(cli: &Cli, config: &Config) -> Result<ChartLimit> {
    let limit = match (cli.max_charts, cli.max_rows) {
        (None, None) => match config.chart.max_charts {
            Some(charts) => ChartLimit::from_options(Some(charts), None)?,
            None => ChartLimit::from_options(None, Some(config.chart.max_rows))?,
        },
        (charts, rows) => ChartLimit::from_options(charts, rows)?,
    };
    Ok(limit)
}

fn chart_title(config: &Config, cli: &Cli) -> String {
    let mut title = match &config.cluster.name {
        Some(name) => format!("{}: modules by distinct {}", name, cli.uniq.noun()),
        None => format!("Modules by distinct {}", cli.uniq.noun()),
    };
    match (&cli.start, &cli.end) {
        (Some(start), Some(end)) => title.push_str(&format!(" ({} - {})", start, end)),
        (Some(start), None) => title.push_str(&format!(" (since {})", start)),
        (None, Some(end)) => title.push_str(&format!(" (until {})", end)),
        (None, None) => {}
    }
    title
}

fn handle_error(e: anyhow::Error, json: bool) -> ! {
    if json {
        println!("{}", serde_json::json!({ "error": format!("{:#}", e) }));
    } else {
        eprintln!("Error: {:#}", e);
    }
    process::exit(1);
}
