use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeSet;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;
use url::Url;
use webtree_core::report::{self, RenderOptions, TreeStyle};
use webtree_core::stats::{TreeStats, Validation};
use webtree_core::store::TreeStore;
use webtree_scanner::links::normalize_url;
use webtree_scanner::{
    Crawler, DomainFilter, HttpFetcher, LinkExtractor, PageFetcher, TreeExpander, WebsiteNode,
};

// Logging and terminal helpers

/// Routes log lines around the active spinner so they never tear it.
#[derive(Clone)]
pub struct ProgressWriter(ProgressBar);

impl Write for ProgressWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.suspend(|| io::stderr().write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

impl<'a> MakeWriter<'a> for ProgressWriter {
    type Writer = ProgressWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Install the fmt subscriber. `RUST_LOG` wins over the default level.
pub fn init_tracing(quiet: bool, progress: &ProgressBar) {
    let default_level = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(ProgressWriter(progress.clone()))
        .try_init();
}

pub fn print_banner() {
    println!("{}", "═".repeat(60).bright_blue().bold());
    println!(
        "{}  {}",
        "  WEBTREE".bright_white().bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  {}", "bounded web-content trees for question generation".dimmed());
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn start_spinner(progress: &ProgressBar, quiet: bool, msg: String) {
    if quiet {
        return;
    }
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        progress.set_style(style);
    }
    progress.enable_steady_tick(Duration::from_millis(100));
    progress.set_message(msg);
}

// Argument helpers

/// Expand a leading `~` in a user supplied path.
pub fn resolve_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

pub fn seconds(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
}

/// Link extraction settings shared by `crawl`.
pub fn build_link_extractor(
    filter_meaningful: bool,
    allow_all: bool,
    domain_csv: &Path,
    top_n: usize,
) -> Result<LinkExtractor> {
    let domains = if allow_all {
        DomainFilter::AllowAll
    } else {
        DomainFilter::from_csv(domain_csv, top_n)
            .with_context(|| format!("Failed to load top domains from {}", domain_csv.display()))?
    };
    Ok(LinkExtractor::new()
        .with_filter_meaningful(filter_meaningful)
        .with_domain_filter(domains))
}

/// Which way `expand` grows the chosen node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandMode {
    Width(usize),
    Depth(usize),
}

impl ExpandMode {
    pub fn from_flags(width: Option<usize>, depth: Option<usize>) -> Result<Self> {
        match (width, depth) {
            (Some(n), None) => Ok(ExpandMode::Width(n)),
            (None, Some(n)) => Ok(ExpandMode::Depth(n)),
            (Some(_), Some(_)) => bail!("Cannot specify both --width and --depth"),
            (None, None) => bail!("Must specify either --width or --depth"),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExpandMode::Width(_) => "width",
            ExpandMode::Depth(_) => "depth",
        }
    }
}

// Operations behind the subcommands

/// Crawl `url` and persist the tree at `output`.
pub fn crawl_to_file<F: PageFetcher>(
    crawler: &mut Crawler<F>,
    url: &str,
    max_depth: usize,
    max_children: usize,
    delay: Duration,
    output: &Path,
) -> Result<WebsiteNode> {
    let tree = crawler.crawl_tree(url, max_depth, max_children, delay);
    TreeStore::new(output)
        .save(&tree)
        .with_context(|| format!("Failed to save tree to {}", output.display()))?;
    Ok(tree)
}

/// Result of growing one node of a stored tree.
#[derive(Debug)]
pub struct ExpandOutcome {
    pub node_url: String,
    pub added: usize,
    pub new_urls: BTreeSet<String>,
    pub tree: WebsiteNode,
    /// Whether the tree was written to the output path.
    pub saved: bool,
}

/// Grow the node at `url` inside `tree`. The URL is tried as given and then
/// in normalized form.
pub fn expand_in_tree<F: PageFetcher>(
    tree: &mut WebsiteNode,
    url: &str,
    mode: ExpandMode,
    max_children: usize,
    expander: &TreeExpander<F>,
) -> Result<(String, usize, BTreeSet<String>)> {
    let target = if tree.find_by_url(url).is_some() {
        url.to_string()
    } else {
        normalize_url(url)
    };
    let node = tree
        .find_by_url_mut(&target)
        .with_context(|| format!("Node with URL {} not found in tree", url))?;

    let (added, new_urls) = match mode {
        ExpandMode::Width(n) => expander.expand_width(node, n),
        ExpandMode::Depth(n) => expander.expand_depth(node, n, max_children),
    };
    Ok((target, added, new_urls))
}

/// Load `input`, expand one node and save to `output` when anything was added.
pub fn expand_file<F: PageFetcher>(
    input: &Path,
    output: &Path,
    url: &str,
    mode: ExpandMode,
    max_children: usize,
    expander: &TreeExpander<F>,
) -> Result<ExpandOutcome> {
    let mut tree = TreeStore::new(input)
        .load()
        .with_context(|| format!("Failed to load tree from {}", input.display()))?;

    let (node_url, added, new_urls) = expand_in_tree(&mut tree, url, mode, max_children, expander)?;
    let saved = added > 0;
    if saved {
        TreeStore::new(output)
            .save(&tree)
            .with_context(|| format!("Failed to save tree to {}", output.display()))?;
    }

    Ok(ExpandOutcome {
        node_url,
        added,
        new_urls,
        tree,
        saved,
    })
}

pub fn validate_file(path: &Path, min_depth: usize, min_width: usize) -> Result<(TreeStats, Validation)> {
    let tree = TreeStore::new(path)
        .load()
        .with_context(|| format!("Failed to load tree from {}", path.display()))?;
    let stats = TreeStats::collect(&tree);
    let validation = stats.validate(min_depth, min_width);
    Ok((stats, validation))
}

// Subcommand handlers

pub fn handle_crawl(args: &ArgMatches, progress: &ProgressBar, quiet: bool) -> Result<()> {
    let url = args.get_one::<Url>("URL").context("A URL to crawl is required")?;
    let max_depth = *args.get_one::<usize>("max-depth").unwrap_or(&2);
    let max_children = *args.get_one::<usize>("max-children").unwrap_or(&10);
    let delay = seconds(*args.get_one::<f64>("delay").unwrap_or(&1.0));
    let timeout = Duration::from_secs(*args.get_one::<u64>("timeout").unwrap_or(&10));
    let output = resolve_path(args.get_one::<String>("output").map_or("data/website_tree.json", String::as_str));
    let domain_csv = resolve_path(args.get_one::<String>("moz-csv").map_or("data/moz_websites.csv", String::as_str));
    let top_n = *args.get_one::<usize>("top-n").unwrap_or(&100);

    let links = build_link_extractor(
        !args.get_flag("no-filter"),
        !args.get_flag("no-allow-all"),
        &domain_csv,
        top_n,
    )?;
    let fetcher = HttpFetcher::with_timeout(timeout).context("Failed to build HTTP client")?;
    let mut crawler = Crawler::new(fetcher)
        .with_link_extractor(links)
        .with_random_sampling(!args.get_flag("no-random-sampling"));
    if let Some(seed) = args.get_one::<u64>("seed") {
        crawler = crawler.with_seed(*seed);
    }

    if !quiet {
        println!("\n{} {}", "Crawling".bright_cyan().bold(), url.as_str().bright_white());
        println!("Max depth: {}  Max children: {}  Delay: {:.1}s", max_depth, max_children, delay.as_secs_f64());
    }
    start_spinner(progress, quiet, format!("Crawling {}", url));

    let result = crawl_to_file(&mut crawler, url.as_str(), max_depth, max_children, delay, &output);
    progress.finish_and_clear();
    let tree = result?;

    let total = tree.node_count();
    let crawled = tree.crawled_count();
    println!("\n{} Crawl complete!", "✓".green().bold());
    println!("  Total nodes:   {}", total);
    println!("  Crawled nodes: {}", crawled.to_string().green());
    println!("  Failed nodes:  {}", (total - crawled).to_string().red());
    println!("  Saved to:      {}", output.display().to_string().bright_white());
    Ok(())
}

pub fn handle_expand(args: &ArgMatches, progress: &ProgressBar, quiet: bool) -> Result<()> {
    let input_raw = args.get_one::<PathBuf>("FILE").context("A tree file is required")?;
    let input = resolve_path(&input_raw.to_string_lossy());

    if args.get_flag("list-nodes") {
        let tree = TreeStore::new(&input).load()?;
        print!("{}", report::render_by_depth(&tree, None));
        return Ok(());
    }

    let url = args
        .get_one::<String>("url")
        .context("--url is required when expanding")?;
    let mode = ExpandMode::from_flags(
        args.get_one::<usize>("width").copied(),
        args.get_one::<usize>("depth").copied(),
    )?;
    let max_children = *args.get_one::<usize>("max-children").unwrap_or(&10);
    let delay = seconds(*args.get_one::<f64>("delay").unwrap_or(&1.0));
    let timeout = Duration::from_secs(*args.get_one::<u64>("timeout").unwrap_or(&10));
    let output = args
        .get_one::<String>("output")
        .map(|p| resolve_path(p))
        .unwrap_or_else(|| input.clone());

    let fetcher = HttpFetcher::with_timeout(timeout).context("Failed to build HTTP client")?;
    let expander = TreeExpander::new(fetcher).with_delay(delay);

    info!("Expanding {} of {}", mode.label(), url);
    start_spinner(progress, quiet, format!("Expanding {} of {}", mode.label(), url));
    let result = expand_file(&input, &output, url, mode, max_children, &expander);
    progress.finish_and_clear();
    let outcome = result?;

    if !outcome.saved {
        println!("\n{} No nodes were added", "⚠".yellow().bold());
        return Ok(());
    }

    print!(
        "\n{}",
        report::render_expansion_summary(mode.label(), &outcome.node_url, &outcome.new_urls)
    );
    if !quiet {
        let options = RenderOptions {
            highlight: outcome.new_urls.clone(),
            ..Default::default()
        };
        if let Some(node) = outcome.tree.find_by_url(&outcome.node_url) {
            print!("{}", report::render_clustered(node, &options));
        }
    }
    println!(
        "\n{} Added {} nodes, saved to {}",
        "✓".green().bold(),
        outcome.added,
        output.display().to_string().bright_white()
    );
    Ok(())
}

pub fn handle_show(args: &ArgMatches) -> Result<()> {
    let path = args.get_one::<PathBuf>("FILE").context("A tree file is required")?;
    let path = resolve_path(&path.to_string_lossy());
    let style_name = args.get_one::<String>("style").map_or("summary", String::as_str);
    let style = TreeStyle::from_str(style_name).with_context(|| format!("Unknown style {}", style_name))?;

    let tree = TreeStore::new(&path)
        .load()
        .with_context(|| format!("Failed to load tree from {}", path.display()))?;
    let options = RenderOptions {
        max_depth: args.get_one::<usize>("max-depth").copied(),
        show_expandability: args.get_flag("expandability"),
        ..Default::default()
    };

    print!("{}", report::render(&tree, style, &options));
    if args.get_flag("relationships") {
        print!("\n{}", report::render_relationship_distribution(&tree, options.max_depth));
    }
    Ok(())
}

/// Returns whether the tree passed.
pub fn handle_validate(args: &ArgMatches) -> Result<bool> {
    let path = args.get_one::<PathBuf>("FILE").context("A tree file is required")?;
    let path = resolve_path(&path.to_string_lossy());
    let min_depth = *args.get_one::<usize>("min-depth").unwrap_or(&3);
    let min_width = *args.get_one::<usize>("min-width").unwrap_or(&2);

    let (stats, validation) = validate_file(&path, min_depth, min_width)?;
    print!("{}", report::render_stats(&stats, Some(&validation)));

    if validation.valid {
        println!("{} {}", "✓".green().bold(), validation.reason);
    } else {
        println!("{} {}", "✗".red().bold(), validation.reason);
    }
    Ok(validation.valid)
}
