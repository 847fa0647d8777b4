//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::svg_chart_adapter::SvgChartAdapter;
use crate::adapters::table_csv;
use crate::domain::analysis::{run_analysis, Analysis, AnalysisConfig};
use crate::domain::config_validation::{parse_date, validate_analysis_config, validate_data_config};
use crate::domain::derived::correlation::CorrelationMatrix;
use crate::domain::derived::Derived;
use crate::domain::error::StockError;
use crate::domain::ohlcv::PriceField;
use crate::domain::table::ColumnSummary;
use crate::domain::universe::{acquire, normalize_symbol, parse_symbols, UniverseError};
use crate::ports::chart_port::ChartPort;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

#[derive(Parser, Debug)]
#[command(name = "stockseries", about = "Stock price time-series analysis")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Acquire bars for each symbol and write one CSV per symbol
    Fetch {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Build price and derived tables, correlations and charts
    Analyze {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(short, long)]
        window: Option<usize>,
        #[arg(long)]
        no_charts: bool,
    },
    /// Show data range for symbol(s)
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Fetch {
            config,
            symbol,
            output,
        } => run_fetch(&config, symbol.as_deref(), output.as_deref()),
        Command::Analyze {
            config,
            output,
            window,
            no_charts,
        } => run_analyze(&config, output.as_deref(), window, no_charts),
        Command::Info { config, symbol } => run_info(&config, symbol.as_deref()),
        Command::Validate { config } => run_validate(&config),
    }
}

fn fail(err: &StockError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    info!("loading config from {}", path.display());
    FileConfigAdapter::from_file(path).map_err(|e| fail(&e))
}

pub fn build_analysis_config(config: &dyn ConfigPort) -> Result<AnalysisConfig, StockError> {
    let start_date = parse_date(config.get_string("data", "start_date").as_deref(), "start_date")?;
    let end_date = parse_date(config.get_string("data", "end_date").as_deref(), "end_date")?;

    let price_field = match config.get_string("data", "price_field") {
        Some(value) => PriceField::parse(&value).ok_or_else(|| StockError::ConfigInvalid {
            section: "data".into(),
            key: "price_field".into(),
            reason: format!("unknown price field {:?}", value),
        })?,
        None => PriceField::AdjClose,
    };

    let window = config.get_int("analysis", "window", 20);
    if window < 1 {
        return Err(StockError::ConfigInvalid {
            section: "analysis".into(),
            key: "window".into(),
            reason: "window must be at least 1".into(),
        });
    }

    Ok(AnalysisConfig {
        start_date,
        end_date,
        price_field,
        window: window as usize,
        forward_fill: config.get_bool("analysis", "forward_fill", true),
        strict_history: config.get_bool("analysis", "strict_history", false),
    })
}

pub fn resolve_symbols(
    symbol_override: Option<&str>,
    config: &dyn ConfigPort,
) -> Result<Vec<String>, StockError> {
    let invalid = |e: UniverseError| StockError::ConfigInvalid {
        section: "data".into(),
        key: "symbols".into(),
        reason: e.to_string(),
    };
    if let Some(s) = symbol_override {
        return normalize_symbol(s).map(|symbol| vec![symbol]).map_err(invalid);
    }
    let symbols = config.require_string("data", "symbols")?;
    parse_symbols(&symbols).map_err(invalid)
}

/// Data source named by `[data] source`.
pub fn build_data_port(config: &dyn ConfigPort) -> Result<Box<dyn DataPort>, StockError> {
    let source = config
        .get_string("data", "source")
        .unwrap_or_else(|| "csv".to_string())
        .to_lowercase();

    match source.as_str() {
        "csv" => {
            let dir = config.require_string("data", "csv_dir")?;
            info!("reading CSV data from {}", dir);
            Ok(Box::new(CsvAdapter::new(PathBuf::from(dir))))
        }
        #[cfg(feature = "remote")]
        "yahoo" => {
            use crate::adapters::yahoo_adapter::YahooAdapter;
            let adapter = match config.get_string("data", "base_url") {
                Some(url) => YahooAdapter::with_url(&url)?,
                None => YahooAdapter::new()?,
            };
            Ok(Box::new(adapter))
        }
        #[cfg(not(feature = "remote"))]
        "yahoo" => Err(StockError::Provider {
            reason: "remote feature is required for source = yahoo".into(),
        }),
        other => Err(StockError::ConfigInvalid {
            section: "data".into(),
            key: "source".into(),
            reason: format!("unknown source {:?}", other),
        }),
    }
}

fn run_fetch(config_path: &Path, symbol: Option<&str>, output: Option<&Path>) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    if let Err(e) = validate_data_config(&config) {
        return fail(&e);
    }

    let result = fetch_from_config(&config, symbol, output);

    match result {
        Ok(written) => {
            for (symbol, bars, path) in &written {
                println!("{}: {} bars -> {}", symbol, bars, path.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn fetch_from_config(
    config: &dyn ConfigPort,
    symbol: Option<&str>,
    output: Option<&Path>,
) -> Result<Vec<(String, usize, PathBuf)>, StockError> {
    let analysis_config = build_analysis_config(config)?;
    let symbols = resolve_symbols(symbol, config)?;
    let data_port = build_data_port(config)?;
    let output_dir = fetch_output_dir(config, output)?;
    run_fetch_pipeline(data_port.as_ref(), &symbols, &analysis_config, &output_dir)
}

/// `--output`, else `[data] csv_dir`, else `data`. A CSV source is never
/// written back into its own directory.
pub fn fetch_output_dir(
    config: &dyn ConfigPort,
    output: Option<&Path>,
) -> Result<PathBuf, StockError> {
    let csv_dir = config.get_string("data", "csv_dir").map(PathBuf::from);
    let output_dir = output
        .map(Path::to_path_buf)
        .or_else(|| csv_dir.clone())
        .unwrap_or_else(|| PathBuf::from("data"));

    let source = config
        .get_string("data", "source")
        .unwrap_or_else(|| "csv".to_string())
        .to_lowercase();
    if let (true, Some(csv_dir)) = (source == "csv", csv_dir) {
        if same_dir(&csv_dir, &output_dir) {
            return Err(StockError::ConfigInvalid {
                section: "data".into(),
                key: "csv_dir".into(),
                reason: format!(
                    "fetch would overwrite the source files in {}; pass --output",
                    csv_dir.display()
                ),
            });
        }
    }
    Ok(output_dir)
}

fn same_dir(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Acquire every symbol and write `<SYMBOL>.csv` under `output_dir`.
/// Returns `(symbol, bar count, path)` for each file written.
pub fn run_fetch_pipeline(
    data_port: &dyn DataPort,
    symbols: &[String],
    config: &AnalysisConfig,
    output_dir: &Path,
) -> Result<Vec<(String, usize, PathBuf)>, StockError> {
    info!(
        "fetching {} symbols, {} to {}",
        symbols.len(),
        config.start_date,
        config.end_date
    );
    let acquired = acquire(data_port, symbols, config.start_date, config.end_date)?;

    let writer = CsvAdapter::new(output_dir.to_path_buf());
    let mut written = Vec::with_capacity(acquired.data.len());
    for sd in &acquired.data {
        let path = writer.write_bars(&sd.symbol, &sd.bars)?;
        written.push((sd.symbol.clone(), sd.bars.len(), path));
    }
    Ok(written)
}

fn run_analyze(
    config_path: &Path,
    output: Option<&Path>,
    window: Option<usize>,
    no_charts: bool,
) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    if let Err(e) = validate_data_config(&config) {
        return fail(&e);
    }
    if window.is_none() {
        if let Err(e) = validate_analysis_config(&config) {
            return fail(&e);
        }
    }

    let result = analyze_from_config(&config, output, window, no_charts);

    match result {
        Ok(analysis) => {
            println!("=== Prices ===");
            print_summary(&analysis.price_summary);
            println!("\n=== Returns ===");
            print_summary(&analysis.returns_summary);
            println!("\n=== Correlation of Returns ===");
            print_correlation(&analysis.correlation);
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn analyze_from_config(
    config: &dyn ConfigPort,
    output: Option<&Path>,
    window: Option<usize>,
    no_charts: bool,
) -> Result<Analysis, StockError> {
    let mut analysis_config = build_analysis_config(config)?;
    match window {
        Some(0) => {
            return Err(StockError::ConfigInvalid {
                section: "analysis".into(),
                key: "window".into(),
                reason: "window must be at least 1".into(),
            });
        }
        Some(w) => analysis_config.window = w,
        None => {}
    }
    let symbols = resolve_symbols(None, config)?;
    let data_port = build_data_port(config)?;
    let output_dir = output
        .map(Path::to_path_buf)
        .or_else(|| config.get_string("output", "dir").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("out"));

    let charts = SvgChartAdapter::new();
    let chart_port: Option<&dyn ChartPort> =
        if !no_charts && config.get_bool("output", "charts", true) {
            Some(&charts)
        } else {
            None
        };

    run_analyze_pipeline(
        data_port.as_ref(),
        chart_port,
        &symbols,
        &analysis_config,
        &output_dir,
    )
}

/// Acquire, analyze and write `prices.csv`, `derived.csv`, `correlation.csv`
/// under `output_dir`, plus charts when a chart port is given.
pub fn run_analyze_pipeline(
    data_port: &dyn DataPort,
    chart_port: Option<&dyn ChartPort>,
    symbols: &[String],
    config: &AnalysisConfig,
    output_dir: &Path,
) -> Result<Analysis, StockError> {
    // Stage 1: Acquire
    info!(
        "acquiring {} symbols, {} to {}",
        symbols.len(),
        config.start_date,
        config.end_date
    );
    let acquired = acquire(data_port, symbols, config.start_date, config.end_date)?;
    if !acquired.skipped.is_empty() {
        warn!("skipped symbols: {}", acquired.skipped.join(", "));
    }

    // Stage 2: Assemble and derive
    info!(
        "analyzing {} (window {}, forward fill {})",
        config.price_field.column_name(),
        config.window,
        config.forward_fill
    );
    let analysis = run_analysis(&acquired.data, config)?;

    // Stage 3: Tables
    table_csv::write_table(&output_dir.join("prices.csv"), &analysis.prices)?;
    table_csv::write_table(&output_dir.join("derived.csv"), &analysis.derived)?;
    table_csv::write_correlation(&output_dir.join("correlation.csv"), &analysis.correlation)?;
    info!("tables written to {}", output_dir.display());

    // Stage 4: Charts
    if let Some(charts) = chart_port {
        write_charts(charts, &analysis, config, output_dir)?;
    }

    Ok(analysis)
}

fn write_charts(
    charts: &dyn ChartPort,
    analysis: &Analysis,
    config: &AnalysisConfig,
    output_dir: &Path,
) -> Result<(), StockError> {
    let symbols = analysis.prices.column_names();

    charts.line_chart(
        &analysis.prices,
        &symbols,
        &format!("{} prices", config.price_field.column_name()),
        &output_dir.join("prices.svg"),
    )?;

    let ma = Derived::MovingAverage(config.window);
    for &symbol in &symbols {
        let ma_column = ma.column_name(symbol);
        charts.line_chart(
            &analysis.derived,
            &[symbol, ma_column.as_str()],
            &format!("{} with {}", symbol, ma),
            &output_dir.join(format!("{}_sma.svg", symbol)),
        )?;
    }

    if let [first, second, ..] = symbols.as_slice() {
        let x = analysis.returns.series(first)?;
        let y = analysis.returns.series(second)?;
        charts.scatter_chart(
            &x,
            &y,
            &format!("{} vs {} returns", first, second),
            &output_dir.join("returns_scatter.svg"),
        )?;
    }

    charts.heatmap(
        &analysis.correlation,
        "Correlation of returns",
        &output_dir.join("correlation.svg"),
    )
}

fn fmt_opt(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.4}", v),
        None => "-".to_string(),
    }
}

fn print_summary(summary: &[ColumnSummary]) {
    println!(
        "{:<12} {:>6} {:>12} {:>12} {:>12} {:>12}",
        "column", "count", "mean", "std", "min", "max"
    );
    for s in summary {
        println!(
            "{:<12} {:>6} {:>12} {:>12} {:>12} {:>12}",
            s.name,
            s.count,
            fmt_opt(s.mean),
            fmt_opt(s.std),
            fmt_opt(s.min),
            fmt_opt(s.max),
        );
    }
}

fn print_correlation(matrix: &CorrelationMatrix) {
    let mut header = format!("{:<12}", "");
    for name in matrix.names() {
        header.push_str(&format!(" {:>10}", name));
    }
    println!("{}", header);
    for (name, row) in matrix.rows() {
        let mut line = format!("{:<12}", name);
        for value in row {
            line.push_str(&format!(" {:>10}", fmt_opt(*value)));
        }
        println!("{}", line);
    }
}

fn run_info(config_path: &Path, symbol: Option<&str>) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let data_port = match build_data_port(&config) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };
    // Without a symbol list, report everything the source holds.
    let symbols = if symbol.is_none() && config.get_string("data", "symbols").is_none() {
        data_port.list_symbols()
    } else {
        resolve_symbols(symbol, &config)
    };
    let symbols = match symbols {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    for s in &symbols {
        match data_port.get_data_range(s) {
            Ok(Some((first, last, count))) => {
                println!("{}: {} bars, {} to {}", s, count, first, last);
            }
            Ok(None) => eprintln!("{}: no data found", s),
            Err(e) => eprintln!("error querying {}: {}", s, e),
        }
    }
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    if let Err(e) = validate_data_config(&config) {
        return fail(&e);
    }
    if let Err(e) = validate_analysis_config(&config) {
        return fail(&e);
    }

    let analysis_config = match build_analysis_config(&config) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let symbols = match resolve_symbols(None, &config) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    println!("symbols:        {}", symbols.join(", "));
    println!(
        "range:          {} to {}",
        analysis_config.start_date, analysis_config.end_date
    );
    println!("price field:    {}", analysis_config.price_field.column_name());
    println!("window:         {}", analysis_config.window);
    println!("forward fill:   {}", analysis_config.forward_fill);
    println!("strict history: {}", analysis_config.strict_history);
    println!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
[data]
source = csv
csv_dir = data
symbols = aapl, msft
start_date = 2020-01-01
end_date = 2020-12-31
price_field = close

[analysis]
window = 5
forward_fill = false
"#;

    fn config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn analysis_config_from_ini() {
        let c = build_analysis_config(&config(CONFIG)).unwrap();
        assert_eq!(c.price_field, PriceField::Close);
        assert_eq!(c.window, 5);
        assert!(!c.forward_fill);
        assert!(!c.strict_history);
        assert_eq!(c.start_date.to_string(), "2020-01-01");
    }

    #[test]
    fn analysis_config_defaults() {
        let c = build_analysis_config(&config(
            "[data]\nstart_date = 2020-01-01\nend_date = 2020-02-01\n",
        ))
        .unwrap();
        assert_eq!(c.price_field, PriceField::AdjClose);
        assert_eq!(c.window, 20);
        assert!(c.forward_fill);
    }

    #[test]
    fn analysis_config_missing_date() {
        let err = build_analysis_config(&config("[data]\nend_date = 2020-02-01\n")).unwrap_err();
        assert!(matches!(err, StockError::ConfigMissing { key, .. } if key == "start_date"));
    }

    #[test]
    fn symbols_from_config_are_uppercased() {
        let symbols = resolve_symbols(None, &config(CONFIG)).unwrap();
        assert_eq!(symbols, vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn symbol_override_wins() {
        let symbols = resolve_symbols(Some("goog"), &config(CONFIG)).unwrap();
        assert_eq!(symbols, vec!["GOOG"]);
    }

    #[test]
    fn symbol_override_rejects_paths() {
        let err = resolve_symbols(Some("../etc/x"), &config(CONFIG)).unwrap_err();
        assert!(matches!(err, StockError::ConfigInvalid { key, .. } if key == "symbols"));
    }

    #[test]
    fn fetch_output_defaults_to_csv_dir_for_remote_source() {
        let c = config(&CONFIG.replace("source = csv", "source = yahoo"));
        assert_eq!(fetch_output_dir(&c, None).unwrap(), PathBuf::from("data"));
    }

    #[test]
    fn fetch_refuses_to_overwrite_csv_source() {
        let c = config(CONFIG);
        let err = fetch_output_dir(&c, None).unwrap_err();
        assert!(matches!(err, StockError::ConfigInvalid { key, .. } if key == "csv_dir"));
        let err = fetch_output_dir(&c, Some(Path::new("data"))).unwrap_err();
        assert!(matches!(err, StockError::ConfigInvalid { .. }));
        assert_eq!(
            fetch_output_dir(&c, Some(Path::new("copy"))).unwrap(),
            PathBuf::from("copy")
        );
    }

    #[test]
    fn unknown_source_is_config_error() {
        let c = config(&CONFIG.replace("source = csv", "source = ftp"));
        let err = build_data_port(&c).err().unwrap();
        assert!(matches!(err, StockError::ConfigInvalid { key, .. } if key == "source"));
    }

    #[test]
    fn csv_source_needs_dir() {
        let c = config(&CONFIG.replace("csv_dir = data\n", ""));
        let err = build_data_port(&c).err().unwrap();
        assert!(matches!(err, StockError::ConfigMissing { key, .. } if key == "csv_dir"));
    }

    #[test]
    fn cli_parses_analyze() {
        let cli = Cli::try_parse_from([
            "stockseries",
            "analyze",
            "--config",
            "c.ini",
            "--window",
            "10",
            "--no-charts",
        ])
        .unwrap();
        match cli.command {
            Command::Analyze {
                window, no_charts, ..
            } => {
                assert_eq!(window, Some(10));
                assert!(no_charts);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
