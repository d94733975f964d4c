//! hybrid-retrieval - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use hybrid_retrieval::{
    channels::{ElasticsearchChannel, QdrantChannel, RetrievalChannel},
    cli::{Args, Commands, OutputFormat, Verbosity},
    scoring::{EffectivenessScorer, OllamaJudge},
    strategy::{RetrievalService, StrategyKind},
    HybridConfig, Query, RetrievalResult,
};
use std::env;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_env("HYBRID_RETRIEVAL_LOG")
        .unwrap_or_else(|_| EnvFilter::new(verbosity.log_filter()));

    let format = env::var("HYBRID_RETRIEVAL_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbosity());

    match &args.command {
        Commands::Search {
            query,
            collection,
            top_k,
            strategy,
            json,
        } => {
            let format = if *json { OutputFormat::Json } else { OutputFormat::Table };
            run_search(&args, query, collection, *top_k, *strategy, format).await?;
        }
        Commands::Config { init } => {
            if *init {
                init_config(&args)?;
            } else {
                show_config(&args)?;
            }
        }
    }

    Ok(())
}

async fn run_search(
    args: &Args,
    text: &str,
    collection: &str,
    top_k: usize,
    strategy: StrategyKind,
    format: OutputFormat,
) -> Result<()> {
    let config = Arc::new(HybridConfig::load(args.config.clone()).context("Failed to load configuration")?);
    let query = Query::new(text)?;

    let dense: Arc<dyn RetrievalChannel> =
        Arc::new(QdrantChannel::from_config(&config.dense).context("Failed to set up dense channel")?);

    let (sparse, scorer) = match strategy {
        StrategyKind::Dense => (None, None),
        StrategyKind::Hybrid => {
            let sparse: Arc<dyn RetrievalChannel> = Arc::new(
                ElasticsearchChannel::from_config(&config.sparse)
                    .context("Failed to set up sparse channel")?,
            );

            let scorer = if config.retrieval.use_dynamic_tuning {
                let judge = OllamaJudge::from_config(&config.judge)?;
                if !judge.health_check().await? {
                    eprintln!(
                        "{} judge at {} is not responding; alpha will fall back to {}",
                        "warning:".yellow().bold(),
                        judge.base_url(),
                        config.weights.dense_weight_default
                    );
                }
                Some(EffectivenessScorer::from_config(Arc::new(judge), &config))
            } else {
                None
            };

            (Some(sparse), scorer)
        }
    };

    let service = RetrievalService::new(strategy, dense, sparse, scorer, Arc::clone(&config))?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let results = service
        .retrieve_with_cancel(&query, collection, top_k, &cancel)
        .await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        OutputFormat::Table => print_results(&query, &results),
    }

    Ok(())
}

fn print_results(query: &Query, results: &[RetrievalResult]) {
    if results.is_empty() {
        println!("{}", "No results.".yellow());
        return;
    }

    let first = &results[0];
    println!(
        "{} {}  {} {}  {} {:.3}",
        "query:".bold(),
        query,
        "method:".bold(),
        first.retrieval_method.to_string().cyan(),
        "alpha:".bold(),
        first.alpha
    );
    println!();

    for (position, result) in results.iter().enumerate() {
        println!(
            "{:>3}. {}  {:.4}  {}",
            position + 1,
            result.doc_id.green().bold(),
            result.combined_score,
            format!(
                "(dense {:.3} @{}, sparse {:.3} @{})",
                result.dense_score,
                rank_label(result.dense_rank),
                result.sparse_score,
                rank_label(result.sparse_rank)
            )
            .dimmed()
        );
        println!("     {}", snippet(&result.text, 120));
    }
}

fn rank_label(rank: Option<usize>) -> String {
    rank.map(|r| (r + 1).to_string()).unwrap_or_else(|| "-".to_string())
}

fn snippet(text: &str, max_chars: usize) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let cut: String = flat.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

fn show_config(args: &Args) -> Result<()> {
    let config = HybridConfig::load(args.config.clone())?;
    let source = args
        .config
        .clone()
        .or_else(|| HybridConfig::default_path().filter(|p| p.exists()))
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "built-in defaults".to_string());

    println!("{} {}", "# source:".dimmed(), source.dimmed());
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

fn init_config(args: &Args) -> Result<()> {
    let path = args
        .config
        .clone()
        .or_else(HybridConfig::default_path)
        .context("Could not determine a config path; pass one with --config")?;

    if path.exists() {
        anyhow::bail!("Refusing to overwrite existing config at {}", path.display());
    }

    HybridConfig::default().save(&path)?;
    println!("{} {}", "Wrote default configuration to".green(), path.display());
    Ok(())
}
