use anyhow::{Context, Result};
use clap::Parser;
use frontera::cli::{Cli, OutputFormat};
use frontera::complexity::compute_complexity;
use frontera::config::FronteraConfig;
use frontera::coordinator::{analyze, verify_determinism};
use frontera::decomposition::Decomposition;
use frontera::report::{render_text, JsonReport, ReportOptions};
use frontera::trace::TraceSet;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; `--debug` raises the level to TRACE
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Load the config file (if any) and apply command line overrides
fn load_config(args: &Cli) -> Result<FronteraConfig> {
    let mut config = match &args.config {
        Some(path) => FronteraConfig::from_toml_file(path)?,
        None => FronteraConfig::default(),
    };
    args.apply(&mut config);
    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let config = load_config(&args)?;
    let options = config.analysis_options()?;

    let decomposition = Decomposition::from_json_file(&args.decomposition)
        .context("Cannot build decomposition model")?;
    let traces = TraceSet::from_json_file(&args.traces).context("Cannot load access traces")?;

    let analysis = if args.verify_determinism {
        verify_determinism(&decomposition, &traces, &options)?
    } else {
        analyze(&decomposition, &traces, &options)?
    };

    let complexity = config
        .report
        .complexity
        .then(|| compute_complexity(&decomposition, &analysis, options.execution));

    let report_options = ReportOptions {
        skip_empty: config.report.skip_empty,
        explain: config.report.explain,
    };

    let rendered = match config.report.format {
        OutputFormat::Json => {
            let mut report = JsonReport::new(&analysis, report_options);
            if let Some(complexity) = complexity {
                report.set_complexity(complexity);
            }
            let mut json = report.to_json()?;
            json.push('\n');
            json
        }
        OutputFormat::Text => render_text(&analysis, complexity.as_ref(), report_options),
    };

    match &args.output {
        Some(path) => std::fs::write(path, rendered)
            .with_context(|| format!("Failed to write report to {}", path.display()))?,
        None => print!("{}", rendered),
    }

    Ok(())
}
