use wafburst::*;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use wafburst::i18n::Language;
use wafburst::limiter::RateScope;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Target URL (http:// or https://)
    url: String,

    /// Number of concurrent workers
    #[arg(short, long, default_value_t = 10)]
    threads: usize,

    /// Duration of the test in seconds
    #[arg(short, long, default_value_t = 10)]
    duration: u64,

    /// Requests per second, 0 for unlimited
    #[arg(short, long, default_value_t = 0)]
    rate_limit: u32,

    /// Whether the rate limit applies to each worker or to the whole pool
    #[arg(long, value_enum, default_value_t = Scope::PerWorker)]
    rate_scope: Scope,

    /// GET parameter sets (.json list of objects, or .txt with one value per line)
    #[arg(short, long)]
    params: Option<PathBuf>,

    /// Extra request headers (.json object)
    #[arg(short = 'H', long)]
    headers: Option<PathBuf>,

    /// Report language
    #[arg(long, value_enum, default_value_t = Lang::EnUs)]
    lang: Lang,

    /// Directory for the report, CSV and charts
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Scope {
    PerWorker,
    Global,
}

impl From<Scope> for RateScope {
    fn from(scope: Scope) -> Self {
        match scope {
            Scope::PerWorker => RateScope::PerWorker,
            Scope::Global => RateScope::Global,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Lang {
    EnUs,
    ZhTw,
}

impl From<Lang> for Language {
    fn from(lang: Lang) -> Self {
        match lang {
            Lang::EnUs => Language::EnUs,
            Lang::ZhTw => Language::ZhTw,
        }
    }
}

fn seconds_to_hms(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let seconds = seconds % 60;

    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = RunConfig::new(
        &args.url,
        args.threads,
        args.duration,
        args.rate_limit,
        args.params.as_deref(),
        args.headers.as_deref(),
    )?
    .with_rate_scope(args.rate_scope.into());

    let issuer = Arc::new(HttpIssuer::new(config.headers())?);

    let sty = ProgressStyle::with_template("{spinner} [{elapsed_precise}/{msg}] {bar:40.cyan/blue} {percent}%")?;
    let pb = ProgressBar::new(config.duration_secs() * 10);
    pb.set_style(sty);
    pb.set_message(seconds_to_hms(config.duration_secs()));

    // The bar counts tenths of a second.
    let bar = pb.clone();
    let on_progress = move |elapsed: f64, _total: f64| {
        bar.set_position((elapsed * 10.0) as u64);
        false
    };

    let record = run(&config, issuer, Some(Box::new(on_progress))).await?;
    pb.finish();

    let artifacts = ReportBuilder::new(&args.output_dir)
        .language(args.lang.into())
        .generate(&record)?;

    let stats = &artifacts.statistics;
    println!("{}", style("Test complete").green().bold());
    println!("total requests:    {}", stats.total);
    println!(
        "successful (200):  {} ({:.2}%)",
        style(stats.success).green(),
        stats.percent(stats.success)
    );
    println!(
        "blocked (403):     {} ({:.2}%)",
        style(stats.blocked).yellow(),
        stats.percent(stats.blocked)
    );
    println!(
        "errors:            {} ({:.2}%)",
        style(stats.error).red(),
        stats.percent(stats.error)
    );
    println!("other responses:   {} ({:.2}%)", stats.other, stats.percent(stats.other));
    println!("average latency:   {:.2}ms", stats.avg_latency_ms);
    println!("report written to {}", artifacts.report.display());

    Ok(())
}
