use clap::{Args, Parser, Subcommand};
use epicast_cli::config::{FileConfig, CONFIG_ENV};
use epicast_core::{Error, IndexRow, LinkResolver};
use epicast_local::classify::Classifier;
use epicast_local::compose::{self, DateOrder};
use epicast_local::papers::{self, CrossrefResolver, PubmedResolver};
use epicast_local::pipeline::Pipeline;
use epicast_local::rewrite::UrlRewriteRules;
use epicast_local::{feed, ranking, textprep, LocalFetcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_OUT_DIR: &str = "data";

#[derive(Parser, Debug)]
#[command(name = "epicast")]
#[command(about = "Podcast feed → classified episode dataset", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch the feed and write `index.json` plus `episodes/<slug>.json`.
    Build(BuildCmd),
    /// Convert a streaming-ranking CSV export into `ranking.json`.
    Rank(RankCmd),
    /// Classify one title offline and print the result as JSON.
    Classify(ClassifyCmd),
    /// Print version information.
    Version(VersionCmd),
}

#[derive(Args, Debug)]
struct BuildCmd {
    /// Config file (default: ./epicast.toml when present).
    #[arg(long, env = CONFIG_ENV)]
    config: Option<PathBuf>,
    /// RSS feed URL.
    #[arg(long, env = "EPICAST_FEED_URL")]
    feed_url: Option<String>,
    /// Feed request timeout.
    #[arg(long)]
    feed_timeout_ms: Option<u64>,
    /// Largest feed document accepted.
    #[arg(long)]
    feed_max_bytes: Option<u64>,
    /// Output directory.
    #[arg(long, env = "EPICAST_OUT_DIR")]
    out_dir: Option<PathBuf>,
    /// Skip Crossref/PubMed lookups (paper links stay empty).
    #[arg(long)]
    no_lookups: bool,
    /// Per-lookup timeout.
    #[arg(long)]
    lookup_timeout_ms: Option<u64>,
    /// Feed items processed at once. Output order does not depend on it.
    #[arg(long)]
    concurrency: Option<usize>,
    /// Index order: raw (pubDate string, descending) or calendar (newest first).
    #[arg(long)]
    date_order: Option<DateOrder>,
    /// Delete `episodes/*.json` for episodes no longer in the feed.
    #[arg(long)]
    prune_orphans: bool,
    #[arg(long, env = "EPICAST_CROSSREF_ENDPOINT")]
    crossref_endpoint: Option<String>,
    #[arg(long, env = "EPICAST_PUBMED_ENDPOINT")]
    pubmed_endpoint: Option<String>,
}

#[derive(Args, Debug)]
struct RankCmd {
    /// Ranking CSV export.
    #[arg(long)]
    input: PathBuf,
    #[arg(long, env = CONFIG_ENV)]
    config: Option<PathBuf>,
    /// Output directory (default: the configured output dir, else `data`).
    #[arg(long, env = "EPICAST_OUT_DIR")]
    out_dir: Option<PathBuf>,
    /// Index to join against (default: `<out-dir>/index.json` when present).
    #[arg(long)]
    index: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ClassifyCmd {
    #[arg(long)]
    title: String,
}

#[derive(Args, Debug)]
struct VersionCmd {
    /// Output format: json (default) or text.
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

/// Settings for one build after flags, env, file and defaults have been merged.
#[derive(Debug)]
struct BuildSettings {
    feed_url: String,
    feed_timeout_ms: u64,
    feed_max_bytes: u64,
    out_dir: PathBuf,
    lookups: bool,
    lookup_timeout: Duration,
    concurrency: usize,
    date_order: DateOrder,
    prune_orphans: bool,
    crossref_endpoint: String,
    pubmed_endpoint: String,
    rewrite: UrlRewriteRules,
}

fn resolve_build(args: BuildCmd, file: FileConfig) -> anyhow::Result<BuildSettings> {
    let date_order = match args.date_order {
        Some(d) => d,
        None => match file.output.date_order.as_deref() {
            Some(s) => s.parse()?,
            None => DateOrder::default(),
        },
    };
    let feed_url = args
        .feed_url
        .or(file.feed.url.clone())
        .unwrap_or_else(|| feed::DEFAULT_FEED_URL.to_string());
    if feed_url.trim().is_empty() {
        return Err(Error::NotConfigured("feed url is empty".to_string()).into());
    }
    Ok(BuildSettings {
        feed_url,
        feed_timeout_ms: args
            .feed_timeout_ms
            .or(file.feed.timeout_ms)
            .unwrap_or(feed::DEFAULT_FEED_TIMEOUT_MS),
        feed_max_bytes: args
            .feed_max_bytes
            .or(file.feed.max_bytes)
            .unwrap_or(feed::DEFAULT_FEED_MAX_BYTES),
        out_dir: args
            .out_dir
            .or(file.output.dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUT_DIR)),
        lookups: !args.no_lookups && file.lookups.enabled.unwrap_or(true),
        lookup_timeout: Duration::from_millis(
            args.lookup_timeout_ms
                .or(file.lookups.timeout_ms)
                .unwrap_or(papers::DEFAULT_LOOKUP_TIMEOUT_MS),
        ),
        concurrency: args
            .concurrency
            .or(file.lookups.concurrency)
            .unwrap_or(1)
            .max(1),
        date_order,
        prune_orphans: args.prune_orphans || file.output.prune_orphans.unwrap_or(false),
        crossref_endpoint: args
            .crossref_endpoint
            .or(file.lookups.crossref_endpoint.clone())
            .unwrap_or_else(|| papers::DEFAULT_CROSSREF_ENDPOINT.to_string()),
        pubmed_endpoint: args
            .pubmed_endpoint
            .or(file.lookups.pubmed_endpoint.clone())
            .unwrap_or_else(|| papers::DEFAULT_PUBMED_ENDPOINT.to_string()),
        rewrite: UrlRewriteRules::new(file.domain_rules()),
    })
}

fn load_config(explicit: Option<&Path>) -> anyhow::Result<FileConfig> {
    let cwd = std::env::current_dir()?;
    Ok(FileConfig::load(explicit, &cwd)?)
}

async fn run_build(args: BuildCmd) -> anyhow::Result<()> {
    let file = load_config(args.config.as_deref())?;
    let s = resolve_build(args, file)?;

    let fetcher = LocalFetcher::new()?;
    let items = feed::fetch_feed(&fetcher, &s.feed_url, s.feed_timeout_ms, s.feed_max_bytes).await?;

    let classifier = Arc::new(Classifier::builtin()?);
    let mut pipeline = Pipeline::new(classifier.clone())
        .with_rewrite(s.rewrite.clone())
        .with_concurrency(s.concurrency);
    if s.lookups {
        let crossref: Arc<dyn LinkResolver> = Arc::new(
            CrossrefResolver::new(fetcher.client(), classifier)
                .with_endpoint(s.crossref_endpoint.clone())
                .with_timeout(s.lookup_timeout),
        );
        let pubmed: Arc<dyn LinkResolver> = Arc::new(
            PubmedResolver::new(fetcher.client())
                .with_endpoint(s.pubmed_endpoint.clone())
                .with_timeout(s.lookup_timeout),
        );
        pipeline = pipeline
            .with_paper_resolver(crossref)
            .with_pubmed_resolver(pubmed);
    } else {
        tracing::info!("lookups disabled");
    }

    let records = pipeline.run(&items).await;
    let out = compose::write_outputs(&s.out_dir, &records, s.date_order, s.prune_orphans)?;

    let v = serde_json::json!({
        "schema_version": 1,
        "kind": "build",
        "ok": true,
        "feed_url": s.feed_url,
        "items": items.len(),
        "index_path": out.index_path.display().to_string(),
        "episodes_written": out.episodes_written,
        "orphans_removed": out.orphans_removed.len(),
        "paper_urls": records.iter().filter(|r| r.paper_url.is_some()).count(),
        "pubmed_urls": records.iter().filter(|r| r.pubmed_url.is_some()).count(),
    });
    println!("{v}");
    Ok(())
}

/// Index rows from a previous build, or `None` when there is nothing usable to join against.
fn read_index(path: &Path) -> Option<Vec<IndexRow>> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "no index; ranking rows left unlinked");
            return None;
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "index unreadable");
            return None;
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(rows) => Some(rows),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "index is not valid JSON");
            None
        }
    }
}

fn run_rank(args: RankCmd) -> anyhow::Result<()> {
    let file = load_config(args.config.as_deref())?;
    let out_dir = args
        .out_dir
        .or(file.output.dir)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUT_DIR));
    let index_path = args
        .index
        .unwrap_or_else(|| out_dir.join(compose::INDEX_FILE));

    let mut rows = ranking::ingest(&args.input);
    let mut linked = 0usize;
    if let Some(index) = read_index(&index_path) {
        ranking::link_to_index(&mut rows, &index);
        linked = rows.iter().filter(|r| r.slug.is_some()).count();
    }

    let path = out_dir.join(ranking::RANKING_FILE);
    compose::write_json_atomic(&path, &rows)?;
    tracing::info!(path = %path.display(), rows = rows.len(), linked, "ranking written");

    let v = serde_json::json!({
        "schema_version": 1,
        "kind": "rank",
        "ok": true,
        "path": path.display().to_string(),
        "rows": rows.len(),
        "linked": linked,
    });
    println!("{v}");
    Ok(())
}

fn run_classify(args: ClassifyCmd) -> anyhow::Result<()> {
    let classifier = Classifier::builtin()?;
    let c = classifier.classify(&args.title);
    let mut v = serde_json::json!({
        "schema_version": 1,
        "kind": "classify",
        "ok": true,
        "title": textprep::normalize(&args.title),
    });
    if let (Some(obj), serde_json::Value::Object(fields)) =
        (v.as_object_mut(), serde_json::to_value(&c)?)
    {
        obj.extend(fields);
    }
    println!("{v}");
    Ok(())
}

/// `KEY=VALUE` lines from `EPICAST_ENV_FILE`. Never overrides the process environment and never
/// logs values.
fn load_env_file() {
    let Ok(p) = std::env::var("EPICAST_ENV_FILE") else {
        return;
    };
    let p = p.trim();
    if p.is_empty() {
        return;
    }
    let Ok(txt) = std::fs::read_to_string(p) else {
        return;
    };
    for raw in txt.lines() {
        let s = raw.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        let Some((k, v)) = s.split_once('=') else {
            continue;
        };
        let k = k.trim();
        if k.is_empty() {
            continue;
        }
        if std::env::var_os(k).is_none() {
            std::env::set_var(k, v.trim());
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = std::env::var("EPICAST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .and_then(|s| EnvFilter::try_new(s).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env_file();
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Commands::Build(args) => run_build(args).await?,
        Commands::Rank(args) => run_rank(args)?,
        Commands::Classify(args) => run_classify(args)?,
        Commands::Version(args) => {
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "version",
                "ok": true,
                "name": "epicast",
                "version": env!("CARGO_PKG_VERSION"),
            });
            match args.output.to_ascii_lowercase().as_str() {
                "text" => println!("epicast {}", env!("CARGO_PKG_VERSION")),
                _ => println!("{v}"),
            }
        }
    }
    Ok(())
}
