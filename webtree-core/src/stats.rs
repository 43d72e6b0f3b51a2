// Tree statistics, quality validation and expansion headroom

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use webtree_scanner::WebsiteNode;

pub const DEFAULT_MIN_DEPTH: usize = 3;
pub const DEFAULT_MIN_WIDTH: usize = 2;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TreeStats {
    pub max_depth: usize,
    pub total_nodes: usize,
    pub crawled_nodes: usize,
    pub failed_nodes: usize,
    pub nodes_by_depth: BTreeMap<usize, usize>,
    /// Smallest child count among nodes with children, per depth.
    pub min_width_at_depth: BTreeMap<usize, usize>,
    pub max_width_at_depth: BTreeMap<usize, usize>,
    /// Mean number of nodes per populated depth.
    pub avg_width: f64,
}

impl TreeStats {
    /// Depth is measured by position from `root`, not the stored `depth`.
    pub fn collect(root: &WebsiteNode) -> Self {
        let mut stats = TreeStats::default();
        stats.traverse(root, 0);

        if !stats.nodes_by_depth.is_empty() {
            stats.avg_width = stats.total_nodes as f64 / stats.nodes_by_depth.len() as f64;
        }
        stats
    }

    fn traverse(&mut self, node: &WebsiteNode, depth: usize) {
        self.total_nodes += 1;
        self.max_depth = self.max_depth.max(depth);
        if node.crawled {
            self.crawled_nodes += 1;
        } else {
            self.failed_nodes += 1;
        }
        *self.nodes_by_depth.entry(depth).or_insert(0) += 1;

        if node.children.is_empty() {
            return;
        }
        let width = node.children.len();
        self.min_width_at_depth
            .entry(depth)
            .and_modify(|w| *w = (*w).min(width))
            .or_insert(width);
        self.max_width_at_depth
            .entry(depth)
            .and_modify(|w| *w = (*w).max(width))
            .or_insert(width);

        for child in &node.children {
            self.traverse(child, depth + 1);
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_nodes == 0 {
            0.0
        } else {
            self.crawled_nodes as f64 / self.total_nodes as f64
        }
    }

    /// Check the tree against the quality bar used for benchmark trees.
    pub fn validate(&self, min_depth: usize, min_width: usize) -> Validation {
        if self.max_depth < min_depth {
            return Validation::invalid(format!(
                "Tree depth {} is less than minimum {}",
                self.max_depth, min_depth
            ));
        }

        // Leaf level excluded
        let wide_enough = (0..self.max_depth)
            .filter_map(|d| self.min_width_at_depth.get(&d))
            .any(|&w| w >= min_width);
        if !wide_enough {
            return Validation::invalid(format!(
                "Tree does not have sufficient width (min {} children at any level)",
                min_width
            ));
        }

        if self.success_rate() < 0.5 {
            return Validation::invalid(format!(
                "Too many failed crawls ({}/{})",
                self.failed_nodes, self.total_nodes
            ));
        }

        if self.total_nodes < min_depth + min_width {
            return Validation::invalid(format!("Tree has too few nodes ({})", self.total_nodes));
        }

        Validation {
            valid: true,
            reason: "Tree meets quality criteria".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    pub valid: bool,
    pub reason: String,
}

impl Validation {
    fn invalid(reason: String) -> Self {
        Self { valid: false, reason }
    }
}

/// How much a single node could still grow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expandability {
    /// Links on the page that are not children yet.
    pub width_available: usize,
    /// Crawled children that carry links of their own.
    pub children_with_links: usize,
    pub children: usize,
    pub links: usize,
}

impl Expandability {
    pub fn of(node: &WebsiteNode) -> Self {
        let existing = node.child_urls();
        Self {
            width_available: node
                .link_contexts
                .iter()
                .filter(|l| !existing.contains(l.url.as_str()))
                .count(),
            children_with_links: node
                .children
                .iter()
                .filter(|c| c.crawled && !c.link_contexts.is_empty())
                .count(),
            children: node.children.len(),
            links: node.link_contexts.len(),
        }
    }

    pub fn can_widen(&self) -> bool {
        self.width_available > 0
    }

    pub fn can_deepen(&self) -> bool {
        self.children_with_links > 0
    }

    /// No children yet, but there are links to create some from.
    pub fn needs_width_first(&self) -> bool {
        self.children == 0 && self.links > 0
    }

    pub fn describe(&self) -> String {
        let width = if self.can_widen() {
            format!("Width: yes, {} more children possible", self.width_available)
        } else if self.links > self.children {
            "Width: no, links already children".to_string()
        } else {
            "Width: no, no more links".to_string()
        };

        let depth = if self.children > 0 {
            if self.can_deepen() {
                format!(
                    "Depth: yes, {}/{} children have links",
                    self.children_with_links, self.children
                )
            } else {
                "Depth: no, children are leaf nodes".to_string()
            }
        } else if self.needs_width_first() {
            "Depth: partial, need width first".to_string()
        } else {
            "Depth: no, no links".to_string()
        };

        format!("{} | {}", width, depth)
    }
}
