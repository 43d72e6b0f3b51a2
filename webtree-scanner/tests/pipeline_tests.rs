// Crawl a site, then keep growing the tree the way a navigator would

use std::collections::HashSet;
use std::time::Duration;
use webtree_scanner::{Crawler, LinkExtractor, MemoryFetcher, TreeExpander, WebsiteNode};

const TOPICS: &[&str] = &[
    "Espresso brewing guide",
    "Arabica bean origins",
    "Coffee roasting process",
    "History of coffeehouses",
    "Decaffeination methods explained",
    "Cold brew preparation steps",
];

/// Every page links to the next four topics, wrapping around.
fn coffee_site() -> MemoryFetcher {
    let mut fetcher = MemoryFetcher::new();
    for i in 0..=TOPICS.len() {
        let url = if i == 0 {
            "https://coffee.test/".to_string()
        } else {
            format!("https://coffee.test/t{}", i)
        };
        let links: String = (1..=4)
            .map(|k| (i + k - 1) % TOPICS.len())
            .map(|t| {
                format!(
                    r#"<p>Readers interested in more detail can continue with <a href="/t{}">{}</a> next.</p>"#,
                    t + 1,
                    TOPICS[t]
                )
            })
            .collect();
        let html = format!(
            "<html><head><title>Page {}</title><meta name=\"description\" content=\"Coffee page number {}\"></head>\
             <body><article><p>Coffee is a beverage brewed from roasted seeds of the coffee plant.</p>{}</article></body></html>",
            i, i, links
        );
        fetcher.insert(url, "text/html", html);
    }
    fetcher
}

fn assert_depths_consistent(node: &WebsiteNode) {
    for child in &node.children {
        assert_eq!(child.depth, node.depth + 1, "bad depth below {}", node.url);
        assert_depths_consistent(child);
    }
}

fn max_children(node: &WebsiteNode) -> usize {
    node.children
        .iter()
        .map(max_children)
        .max()
        .unwrap_or(0)
        .max(node.children.len())
}

#[test]
fn test_crawl_respects_bounds() {
    let mut crawler = Crawler::new(coffee_site()).with_seed(3);
    let tree = crawler.crawl_tree("https://coffee.test/", 2, 3, Duration::ZERO);

    assert_depths_consistent(&tree);
    assert!(tree.max_depth() <= 2);
    assert!(max_children(&tree) <= 3);
    assert_eq!(crawler.visited().len(), tree.crawled_count());

    // No URL is crawled successfully twice.
    let mut seen = HashSet::new();
    tree.visit(&mut |n| {
        if n.crawled {
            assert!(seen.insert(n.url.clone()), "{} crawled twice", n.url);
        }
    });
}

#[test]
fn test_crawl_then_expand_depth_and_width() {
    let mut crawler = Crawler::new(coffee_site()).with_random_sampling(false);
    let mut tree = crawler.crawl_tree("https://coffee.test/", 1, 2, Duration::ZERO);
    assert_eq!(tree.max_depth(), 1);
    assert_eq!(tree.children.len(), 2);

    let expander = TreeExpander::new(coffee_site()).with_delay(Duration::ZERO);

    let (added, new_urls) = expander.expand_depth(&mut tree, 1, 2);
    // t1 and t2 each gain two children; t3 is added under both.
    assert_eq!(added, 4);
    assert_eq!(new_urls.len(), 3);
    assert_eq!(tree.max_depth(), 2);
    assert_depths_consistent(&tree);

    let before = tree.children.len();
    let (added, new_urls) = expander.expand_width(&mut tree, 2);
    assert_eq!(added, 2);
    assert_eq!(tree.children.len(), before + 2);
    for url in &new_urls {
        assert!(tree.children.iter().any(|c| &c.url == url));
    }
    assert_depths_consistent(&tree);
}

#[test]
fn test_unfiltered_extractor_keeps_more_links() {
    let filtered = Crawler::new(coffee_site())
        .with_random_sampling(false)
        .crawl_tree("https://coffee.test/", 1, 10, Duration::ZERO);
    let unfiltered = Crawler::new(coffee_site())
        .with_link_extractor(LinkExtractor::new().with_filter_meaningful(false))
        .with_random_sampling(false)
        .crawl_tree("https://coffee.test/", 1, 10, Duration::ZERO);

    assert_eq!(filtered.link_contexts.len(), 4);
    assert!(unfiltered.link_contexts.len() >= filtered.link_contexts.len());
}

#[test]
fn test_tree_survives_json() {
    let mut crawler = Crawler::new(coffee_site()).with_seed(9);
    let tree = crawler.crawl_tree("https://coffee.test/", 1, 2, Duration::ZERO);

    let json = serde_json::to_string_pretty(&tree).unwrap();
    let back: WebsiteNode = serde_json::from_str(&json).unwrap();
    assert_eq!(back, tree);
}
