use crate::extract::{extract_content, extract_metadata};
use crate::fetcher::PageFetcher;
use crate::links::{LinkExtractor, normalize_url};
use crate::tree::WebsiteNode;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use scraper::Html;
use std::collections::HashSet;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const ALREADY_VISITED: &str = "Already visited";

/// Fetch `node.url` and fill in its page fields.
///
/// On failure the node becomes an error leaf and `None` is returned; on
/// success the parsed document is handed back for link extraction.
pub(crate) fn populate_node<F: PageFetcher>(fetcher: &F, node: &mut WebsiteNode) -> Option<Html> {
    match fetcher.fetch(&node.url) {
        Ok(document) => {
            let (title, description) = extract_metadata(&document);
            let content = extract_content(&document);
            node.mark_crawled(title, description, content);
            Some(document)
        }
        Err(e) => {
            warn!("Error fetching {}: {}", node.url, e);
            node.mark_failed(e.to_string());
            None
        }
    }
}

/// Depth- and width-bounded, depth-first tree builder.
///
/// The visited set belongs to the crawler instance: a URL is fetched at most
/// once per crawler, and later occurrences become "Already visited" leaves.
pub struct Crawler<F: PageFetcher> {
    fetcher: F,
    links: LinkExtractor,
    visited: HashSet<String>,
    random_sampling: bool,
    rng: StdRng,
}

impl<F: PageFetcher> Crawler<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            links: LinkExtractor::new(),
            visited: HashSet::new(),
            random_sampling: true,
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn with_link_extractor(mut self, links: LinkExtractor) -> Self {
        self.links = links;
        self
    }

    pub fn with_random_sampling(mut self, random_sampling: bool) -> Self {
        self.random_sampling = random_sampling;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Start from a pre-seeded visited set.
    pub fn with_visited(mut self, visited: HashSet<String>) -> Self {
        self.visited = visited;
        self
    }

    pub fn visited(&self) -> &HashSet<String> {
        &self.visited
    }

    /// Build a tree rooted at `root_url`.
    ///
    /// Nodes deeper than `max_depth` are never created, each node gets at most
    /// `max_children` children, and `delay` is slept between sibling fetches.
    pub fn crawl_tree(
        &mut self,
        root_url: &str,
        max_depth: usize,
        max_children: usize,
        delay: Duration,
    ) -> WebsiteNode {
        info!(
            "Starting crawl of {} (max depth {}, max children {})",
            root_url, max_depth, max_children
        );

        let mut root = WebsiteNode::new(normalize_url(root_url), 0);
        self.crawl_node(&mut root, max_depth, max_children, delay);

        info!(
            "Crawl complete. {} nodes, {} crawled",
            root.node_count(),
            root.crawled_count()
        );
        root
    }

    fn crawl_node(
        &mut self,
        node: &mut WebsiteNode,
        max_depth: usize,
        max_children: usize,
        delay: Duration,
    ) {
        if self.visited.contains(&node.url) {
            debug!("Skipping already visited: {}", node.url);
            node.mark_failed(ALREADY_VISITED);
            return;
        }

        // Marked before recursing so siblings never fetch the same target.
        self.visited.insert(node.url.clone());
        info!("Crawling [{}]: {}", node.depth, node.url);

        let Some(document) = populate_node(&self.fetcher, node) else {
            return;
        };

        if node.depth >= max_depth {
            debug!("Max depth reached at {}", node.url);
            return;
        }

        node.link_contexts = self.links.extract_links(&document, &node.url);
        drop(document);

        let available: Vec<_> = node
            .link_contexts
            .iter()
            .filter(|link| !self.visited.contains(&link.url))
            .collect();

        let selected: Vec<_> = if self.random_sampling && available.len() > max_children {
            available
                .choose_multiple(&mut self.rng, max_children)
                .map(|link| WebsiteNode::from_link(link, node.depth))
                .collect()
        } else {
            available
                .iter()
                .take(max_children)
                .map(|link| WebsiteNode::from_link(link, node.depth))
                .collect()
        };

        debug!(
            "{} links on {}, {} available, creating {} children",
            node.link_contexts.len(),
            node.url,
            available.len(),
            selected.len()
        );

        for (i, mut child) in selected.into_iter().enumerate() {
            if i > 0 && !delay.is_zero() {
                thread::sleep(delay);
            }
            self.crawl_node(&mut child, max_depth, max_children, delay);
            node.children.push(child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::{HttpFetcher, MemoryFetcher};
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    const FILLER: &str = "Coffee is one of the most widely consumed beverages, with a long and varied history.";

    fn page(title: &str, links: &[(&str, &str)]) -> String {
        let anchors: String = links
            .iter()
            .map(|(href, text)| {
                format!(
                    r#"<p>Further reading for curious readers follows: <a href="{}">{}</a> covers it well.</p>"#,
                    href, text
                )
            })
            .collect();
        format!(
            "<html><head><title>{}</title></head><body><article><p>{}</p>{}</article></body></html>",
            title, FILLER, anchors
        )
    }

    fn site() -> MemoryFetcher {
        MemoryFetcher::new()
            .with_page(
                "https://coffee.test/",
                page(
                    "Coffee",
                    &[
                        ("/beans", "Coffee bean types"),
                        ("/brewing", "Brewing at home guide"),
                        ("/history", "History of the coffeehouse"),
                    ],
                ),
            )
            .with_page(
                "https://coffee.test/beans",
                page("Beans", &[("/arabica", "Arabica plant facts"), ("/brewing", "Brewing at home guide")]),
            )
            .with_page("https://coffee.test/brewing", page("Brewing", &[("/beans", "Coffee bean types")]))
            .with_page("https://coffee.test/history", page("History", &[]))
            .with_page("https://coffee.test/arabica", page("Arabica", &[]))
    }

    fn assert_depths(node: &WebsiteNode, max_depth: usize) {
        assert!(node.depth <= max_depth);
        for child in &node.children {
            assert_eq!(child.depth, node.depth + 1);
            assert_depths(child, max_depth);
        }
    }

    #[test]
    fn test_depth_invariant_and_bound() {
        let fetcher = site();
        let mut crawler = Crawler::new(&fetcher).with_random_sampling(false);
        let root = crawler.crawl_tree("https://coffee.test/#top", 2, 10, Duration::ZERO);

        assert_eq!(root.url, "https://coffee.test/");
        assert_eq!(root.depth, 0);
        assert_depths(&root, 2);
        assert_eq!(root.children.len(), 3);
    }

    #[test]
    fn test_max_depth_zero_only_crawls_root() {
        let fetcher = site();
        let mut crawler = Crawler::new(&fetcher);
        let root = crawler.crawl_tree("https://coffee.test/", 0, 10, Duration::ZERO);

        assert!(root.crawled);
        assert!(root.children.is_empty());
        assert!(root.link_contexts.is_empty());
        assert_eq!(fetcher.total_hits(), 1);
    }

    #[test]
    fn test_each_url_fetched_once() {
        let fetcher = site();
        let mut crawler = Crawler::new(&fetcher).with_random_sampling(false);
        let root = crawler.crawl_tree("https://coffee.test/", 3, 10, Duration::ZERO);

        for url in ["https://coffee.test/", "https://coffee.test/beans", "https://coffee.test/brewing"] {
            assert_eq!(fetcher.hits(url), 1, "{} fetched more than once", url);
        }
        // /brewing is reached first through /beans (depth-first), so the
        // root's own /brewing child is left as an "Already visited" leaf.
        let beans = &root.children[0];
        let nested: Vec<&str> = beans.children.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(nested, vec!["https://coffee.test/arabica", "https://coffee.test/brewing"]);
        assert!(beans.children[1].crawled);
        assert_eq!(root.children[1].url, "https://coffee.test/brewing");
        assert_eq!(root.children[1].error.as_deref(), Some(ALREADY_VISITED));
    }

    #[test]
    fn test_preseeded_visited_set_marks_duplicates() {
        let fetcher = site();
        let visited: HashSet<String> = ["https://coffee.test/".to_string()].into();
        let mut crawler = Crawler::new(&fetcher).with_visited(visited);
        let root = crawler.crawl_tree("https://coffee.test/", 2, 10, Duration::ZERO);

        assert!(!root.crawled);
        assert_eq!(root.error.as_deref(), Some(ALREADY_VISITED));
        assert_eq!(fetcher.total_hits(), 0);
    }

    #[test]
    fn test_children_limited_and_seeded_sampling_is_deterministic() {
        let fetcher = site();
        let urls = |seed| {
            let mut crawler = Crawler::new(&fetcher).with_seed(seed);
            let root = crawler.crawl_tree("https://coffee.test/", 1, 2, Duration::ZERO);
            assert_eq!(root.children.len(), 2);
            root.children.iter().map(|c| c.url.clone()).collect::<Vec<_>>()
        };
        assert_eq!(urls(7), urls(7));
    }

    #[test]
    fn test_ordered_prefix_without_sampling() {
        let fetcher = site();
        let mut crawler = Crawler::new(&fetcher).with_random_sampling(false);
        let root = crawler.crawl_tree("https://coffee.test/", 1, 2, Duration::ZERO);
        let urls: Vec<&str> = root.children.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(urls, vec!["https://coffee.test/beans", "https://coffee.test/brewing"]);
        assert_eq!(
            root.children[0].relationship_cluster.as_deref(),
            Some("types/varieties")
        );
    }

    #[test]
    fn test_fetch_failure_becomes_error_leaf() {
        let fetcher = MemoryFetcher::new().with_page(
            "https://coffee.test/",
            page("Coffee", &[("/gone", "A page that vanished")]),
        );
        let mut crawler = Crawler::new(&fetcher);
        let root = crawler.crawl_tree("https://coffee.test/", 2, 10, Duration::ZERO);

        let gone = &root.children[0];
        assert!(!gone.crawled);
        assert!(gone.error.as_deref().unwrap().starts_with("Request error"));
        assert!(gone.content.is_none() && gone.title.is_none());
    }

    #[tokio::test]
    async fn test_crawl_over_http() {
        let mock_server = MockServer::start().await;
        let uri = mock_server.uri();

        let root_html = page(
            "Root",
            &[
                (&format!("{}/page1", uri), "First coffee article"),
                (&format!("{}/page2", uri), "Second coffee article"),
            ],
        );
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(root_html, "text/html"),
            )
            .mount(&mock_server)
            .await;

        for p in ["/page1", "/page2"] {
            Mock::given(method("GET"))
                .and(path(p))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_raw(page("Leaf", &[]), "text/html"),
                )
                .mount(&mock_server)
                .await;
        }

        let root = tokio::task::spawn_blocking(move || {
            let fetcher = HttpFetcher::new().unwrap();
            let mut crawler = Crawler::new(fetcher).with_random_sampling(false);
            crawler.crawl_tree(&uri, 1, 10, Duration::from_millis(10))
        })
        .await
        .unwrap();

        assert!(root.crawled);
        assert_eq!(root.title.as_deref(), Some("Root"));
        assert_eq!(root.children.len(), 2);
        assert!(root.children.iter().all(|c| c.crawled && c.depth == 1));
    }
}
