mod echo;

use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;
use clap::Parser;
use distill_core::pipeline::{LinkPolicy, Pipeline, PipelineConfig};
use distill_core::siteconfig::ResolverConfig;
use distill_core::FetchConfig;
use owo_colors::OwoColorize;

use echo::{print_banner, print_error, print_info, print_step, print_success};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Output format for the extracted article
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Html,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "html" => Ok(Self::Html),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid format: {}. Valid options: html, json", s)),
        }
    }
}

fn parse_link_policy(s: &str) -> Result<LinkPolicy, String> {
    match s.to_lowercase().as_str() {
        "preserve" => Ok(LinkPolicy::Preserve),
        "footnotes" => Ok(LinkPolicy::Footnotes),
        "remove" => Ok(LinkPolicy::Remove),
        _ => Err(format!(
            "Invalid link policy: {}. Valid options: preserve, footnotes, remove",
            s
        )),
    }
}

/// Turn a web URL into a clean, readable article
#[derive(Parser, Debug)]
#[command(name = "distill")]
#[command(version)]
#[command(about = "Turn a web URL into a clean, readable article", long_about = None)]
struct Args {
    /// URL to fetch and extract
    #[arg(value_name = "URL")]
    url: String,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Output format (html, json)
    #[arg(short, long, default_value = "html", value_name = "FORMAT")]
    format: OutputFormat,

    /// Site rule directory (repeatable)
    #[arg(long, value_name = "DIR")]
    config_dir: Vec<PathBuf>,

    /// Link policy (preserve, footnotes, remove)
    #[arg(long, default_value = "preserve", value_parser = parse_link_policy, value_name = "POLICY")]
    links: LinkPolicy,

    /// HTTP timeout in seconds
    #[arg(long, default_value = "30", value_name = "SECS")]
    timeout: u64,

    /// Custom User-Agent for HTTP requests
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,

    /// Keep relative URLs in the content
    #[arg(long)]
    no_rewrite: bool,

    /// Do not follow next-page links
    #[arg(long)]
    no_multipage: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "distill_core=debug".into()),
            )
            .with_writer(std::io::stderr)
            .init();
        print_banner();
        print_info("Debug logging enabled");
        eprintln!();
    }

    let mut fetch = FetchConfig {
        timeout: args.timeout,
        ..Default::default()
    };
    if let Some(user_agent) = args.user_agent {
        fetch.user_agent = user_agent;
    }

    let config = PipelineConfig {
        debug: args.verbose,
        rewrite_relative_urls: !args.no_rewrite,
        multipage: !args.no_multipage,
        content_links: args.links,
        fetch,
        resolver: ResolverConfig {
            directories: args.config_dir,
            ..Default::default()
        },
        ..Default::default()
    };

    if args.verbose {
        print_step(1, 3, &format!("Fetching {}", args.url.bright_white().underline()));
    }

    let pipeline = Pipeline::new(config).context("Failed to build pipeline")?;
    let article = match pipeline.fetch_content(&args.url).await {
        Ok(article) => article,
        Err(err) => {
            print_error(&format!("{err}"));
            std::process::exit(1);
        }
    };

    if args.verbose {
        print_step(2, 3, "Extraction finished");
        if !article.title.is_empty() {
            eprintln!("  {} {}", "Title:".dimmed(), article.title.bright_white());
        }
        if let Some(language) = &article.language {
            eprintln!("  {} {}", "Language:".dimmed(), language.bright_white());
        }
        eprintln!("  {} {}", "Status:".dimmed(), article.status.to_string().bright_white());
        eprintln!();
    }

    let output = match args.format {
        OutputFormat::Html => article.html.clone(),
        OutputFormat::Json => {
            serde_json::to_string_pretty(&article).context("Failed to serialize article")?
        }
    };

    if args.verbose {
        print_step(3, 3, "Writing output");
    }

    match &args.output {
        Some(path) => {
            fs::write(path, &output)
                .with_context(|| format!("Failed to write file: {}", path.display()))?;
            if args.verbose {
                print_success(&format!("Written to {}", path.display()));
            }
        }
        None => println!("{output}"),
    }

    Ok(())
}
