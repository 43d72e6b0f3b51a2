use crate::crawler::populate_node;
use crate::fetcher::PageFetcher;
use crate::links::LinkExtractor;
use crate::tree::{LinkContext, WebsiteNode};
use std::collections::BTreeSet;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Grows an existing tree in place.
///
/// Unlike [`Crawler`](crate::crawler::Crawler) there is no visited set here:
/// a URL that already lives elsewhere in the tree is fetched again when it
/// becomes a child of a new branch. Duplicates are only checked against the
/// children of the node being expanded.
pub struct TreeExpander<F: PageFetcher> {
    fetcher: F,
    links: LinkExtractor,
    delay: Duration,
}

impl<F: PageFetcher> TreeExpander<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            links: LinkExtractor::new(),
            delay: Duration::from_secs(1),
        }
    }

    pub fn with_link_extractor(mut self, links: LinkExtractor) -> Self {
        self.links = links;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Append up to `additional` children to `node` from links it does not
    /// link to yet.
    ///
    /// Returns the number of children added and their URLs. Nothing happens
    /// when `node` was never crawled or every link is already a child.
    pub fn expand_width(&self, node: &mut WebsiteNode, additional: usize) -> (usize, BTreeSet<String>) {
        let mut new_urls = BTreeSet::new();

        if !node.crawled {
            warn!("Node {} was not successfully crawled, cannot expand width", node.url);
            return (0, new_urls);
        }

        let candidates = unused_links(node, additional);
        info!(
            "Expanding width of {} ({} children, {} links, {} candidates)",
            node.url,
            node.children.len(),
            node.link_contexts.len(),
            candidates.len()
        );
        if candidates.is_empty() {
            info!("No more links available to expand width of {}", node.url);
            return (0, new_urls);
        }

        for (i, link) in candidates.iter().enumerate() {
            if i > 0 {
                self.pause();
            }
            let child = self.fetch_child(link, node.depth);
            new_urls.insert(child.url.clone());
            node.children.push(child);
        }

        info!("Added {} children, {} now has {}", new_urls.len(), node.url, node.children.len());
        (candidates.len(), new_urls)
    }

    /// Grow the subtree under `node` by `extra_levels` below its current
    /// deepest node, topping every visited node up to
    /// `max_children_per_node` children.
    ///
    /// Returns the number of nodes added and their URLs.
    pub fn expand_depth(
        &self,
        node: &mut WebsiteNode,
        extra_levels: usize,
        max_children_per_node: usize,
    ) -> (usize, BTreeSet<String>) {
        let mut new_urls = BTreeSet::new();

        if !node.crawled {
            warn!("Node {} was not successfully crawled, cannot expand depth", node.url);
            return (0, new_urls);
        }

        let current_max = node.max_depth();
        let target_depth = current_max + extra_levels;
        info!(
            "Expanding depth from {} (depth {}, subtree max {}, target {})",
            node.url, node.depth, current_max, target_depth
        );

        let initial_count = node.node_count();
        self.grow(node, target_depth, max_children_per_node, &mut new_urls);
        let added = node.node_count() - initial_count;

        info!("Added {} nodes below {}", added, node.url);
        (added, new_urls)
    }

    fn grow(
        &self,
        parent: &mut WebsiteNode,
        target_depth: usize,
        max_children: usize,
        new_urls: &mut BTreeSet<String>,
    ) {
        if parent.depth >= target_depth {
            return;
        }

        // Leaves crawled at the old max depth never had their links extracted.
        if parent.crawled && parent.link_contexts.is_empty() {
            debug!("Re-fetching {} to extract links", parent.url);
            match self.fetcher.fetch(&parent.url) {
                Ok(document) => {
                    parent.link_contexts = self.links.extract_links(&document, &parent.url);
                    debug!("Found {} links on {}", parent.link_contexts.len(), parent.url);
                }
                Err(e) => warn!("Error re-fetching {}: {}", parent.url, e),
            }
        }

        let needed = max_children.saturating_sub(parent.children.len());
        if needed > 0 {
            let candidates = unused_links(parent, needed);
            if !candidates.is_empty() {
                debug!("Adding {} children to {}", candidates.len(), parent.url);
            }
            for link in &candidates {
                if !parent.children.is_empty() {
                    self.pause();
                }
                let child = self.fetch_child(link, parent.depth);
                new_urls.insert(child.url.clone());
                parent.children.push(child);
            }
        }

        for child in &mut parent.children {
            self.grow(child, target_depth, max_children, new_urls);
        }
    }

    /// Fetch one new child, links included, without recursing.
    fn fetch_child(&self, link: &LinkContext, parent_depth: usize) -> WebsiteNode {
        let mut child = WebsiteNode::from_link(link, parent_depth);
        debug!("Crawling {}", child.url);
        if let Some(document) = populate_node(&self.fetcher, &mut child) {
            child.link_contexts = self.links.extract_links(&document, &child.url);
        }
        child
    }

    fn pause(&self) {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
    }
}

/// First `limit` links of `node` whose URL is not already one of its children.
fn unused_links(node: &WebsiteNode, limit: usize) -> Vec<LinkContext> {
    let existing = node.child_urls();
    node.link_contexts
        .iter()
        .filter(|link| !existing.contains(link.url.as_str()))
        .take(limit)
        .cloned()
        .collect()
}
