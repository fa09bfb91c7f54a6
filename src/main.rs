use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use kodegen_tools_goalscrape::{
    CancellationToken, CrawlConfig, CrawlOutput, LogSink, SchedulerBuilder,
    StaticCredentialProvider,
};

/// Crawl a site toward a goal and stop when enough has been found.
#[derive(Parser, Debug)]
#[command(name = "goalscrape", version, about)]
struct Cli {
    /// Start URL
    url: String,

    /// What the crawl is looking for, in plain words
    #[arg(short, long)]
    goal: String,

    /// Maximum pages to commit
    #[arg(long)]
    max_pages: Option<usize>,

    /// Maximum link depth from the start URL
    #[arg(long)]
    max_depth: Option<u32>,

    /// Maximum scheduler cycles
    #[arg(long)]
    max_steps: Option<u32>,

    /// Wall-clock budget in seconds
    #[arg(long)]
    max_seconds: Option<u64>,

    /// Minimum predicted link value worth queueing
    #[arg(long)]
    min_value: Option<f64>,

    /// Concurrent page workers
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Follow links into subdomains of the start host
    #[arg(long)]
    subdomains: bool,

    /// Glob patterns of URLs to skip (repeatable)
    #[arg(long = "exclude")]
    excluded: Vec<String>,

    /// Visit only one URL per host+path, ignoring query strings
    #[arg(long)]
    similar_paths: bool,

    /// Bearer token offered when a site asks for credentials
    #[arg(long)]
    bearer_token: Option<String>,

    /// Print the full output as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = crawl_config(&cli)?;

    let mut scheduler = SchedulerBuilder::new(config).event_sink(Arc::new(LogSink));
    if let Some(token) = &cli.bearer_token {
        scheduler = scheduler.auth_provider(Arc::new(StaticCredentialProvider::bearer(token)));
    }
    let scheduler = scheduler.build().context("failed to set up crawler")?;

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Ctrl-C received, finishing in-flight pages");
            ctrl_c_cancel.cancel();
        }
    });

    let output = scheduler.run(cancel).await;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("failed to serialize output")?
        );
    } else {
        print_summary(&output);
    }
    Ok(())
}

/// Config from the command line. Omitted flags keep the library defaults.
fn crawl_config(cli: &Cli) -> Result<CrawlConfig> {
    let mut builder = CrawlConfig::builder()
        .base_url(&cli.url)
        .goal(&cli.goal)
        .allow_subdomains(cli.subdomains)
        .skip_similar_paths(cli.similar_paths);
    if let Some(pages) = cli.max_pages {
        builder = builder.max_pages(pages);
    }
    if let Some(depth) = cli.max_depth {
        builder = builder.max_depth(depth);
    }
    if let Some(steps) = cli.max_steps {
        builder = builder.max_steps(steps);
    }
    if let Some(seconds) = cli.max_seconds {
        builder = builder.max_wall_clock(Duration::from_secs(seconds));
    }
    if let Some(threshold) = cli.min_value {
        builder = builder.min_expected_value_to_enqueue(threshold);
    }
    if let Some(workers) = cli.concurrency {
        builder = builder.concurrency(workers);
    }
    if !cli.excluded.is_empty() {
        builder = builder.excluded_patterns(cli.excluded.clone());
    }
    builder.build().context("invalid crawl configuration")
}

fn print_summary(output: &CrawlOutput) {
    let s = &output.summary;
    println!("Completion:     {}", s.completion_reason);
    println!("Pages scraped:  {}", s.pages_scraped);
    println!("Failed URLs:    {}", s.failed_urls);
    println!("Steps taken:    {}", s.steps_taken);
    println!("Content size:   {} bytes", s.total_content_size);
    println!("Goal completion {:.0}%", s.goal_completion * 100.0);
    println!("Coverage:       {:.0}%", s.coverage_score * 100.0);
    println!("Elapsed:        {:.1}s", s.execution_time.as_secs_f64());

    if !output.pages.is_empty() {
        println!();
        for page in &output.pages {
            println!(
                "  [{}] {:.2} {} {}",
                page.depth, page.metrics.relevance, page.url, page.title
            );
        }
    }
}
