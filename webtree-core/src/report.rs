// Text renderings of website trees

use crate::stats::{Expandability, TreeStats, Validation};
use std::collections::{BTreeMap, BTreeSet};
use webtree_scanner::WebsiteNode;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";
const THIN_RULE: &str = "────────────────────────────────────────────────────────────────────────────────";

pub const UNCATEGORIZED: &str = "uncategorized";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeStyle {
    Summary,
    Clustered,
    Depth,
    Stats,
}

impl TreeStyle {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "summary" | "compact" => Some(TreeStyle::Summary),
            "clustered" | "cluster" => Some(TreeStyle::Clustered),
            "depth" => Some(TreeStyle::Depth),
            "stats" => Some(TreeStyle::Stats),
            _ => None,
        }
    }
}

/// Options shared by the tree renderers.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Nodes deeper than this (by stored depth) are omitted.
    pub max_depth: Option<usize>,
    pub show_expandability: bool,
    /// URLs to highlight with `*` markers.
    pub highlight: BTreeSet<String>,
}

pub fn render(root: &WebsiteNode, style: TreeStyle, options: &RenderOptions) -> String {
    match style {
        TreeStyle::Summary => render_summary(root, options),
        TreeStyle::Clustered => render_clustered(root, options),
        TreeStyle::Depth => render_by_depth(root, options.max_depth),
        TreeStyle::Stats => {
            let stats = TreeStats::collect(root);
            render_stats(&stats, None)
        }
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        format!("{}...", text.chars().take(max).collect::<String>())
    } else {
        text.to_string()
    }
}

fn status(node: &WebsiteNode) -> &'static str {
    if node.crawled { "✓" } else { "✗" }
}

fn within(node: &WebsiteNode, max_depth: Option<usize>) -> bool {
    max_depth.is_none_or(|max| node.depth <= max)
}

fn mark(node: &WebsiteNode, options: &RenderOptions, text: String) -> String {
    if options.highlight.contains(&node.url) {
        format!("*** {} ***", text)
    } else {
        text
    }
}

/// Compact tree: one line per node plus title, error and link count.
pub fn render_summary(root: &WebsiteNode, options: &RenderOptions) -> String {
    let mut out = String::new();
    summary_node(root, "", true, options, &mut out);
    out
}

fn summary_node(node: &WebsiteNode, prefix: &str, is_last: bool, options: &RenderOptions, out: &mut String) {
    if !within(node, options.max_depth) {
        return;
    }
    let connector = if is_last { "└── " } else { "├── " };
    let extension = if is_last { "    " } else { "│   " };

    let line = mark(node, options, format!("[{}] {}", status(node), node.domain));
    out.push_str(&format!("{}{}{}\n", prefix, connector, line));
    if let Some(title) = &node.title {
        out.push_str(&format!("{}{}    Title: {}\n", prefix, extension, truncate(title, 50)));
    }
    if let Some(error) = &node.error {
        out.push_str(&format!("{}{}    Error: {}\n", prefix, extension, error));
    }
    if !node.link_contexts.is_empty() {
        out.push_str(&format!("{}{}    Links found: {}\n", prefix, extension, node.link_contexts.len()));
    }
    if options.show_expandability && node.crawled {
        out.push_str(&format!("{}{}    {}\n", prefix, extension, Expandability::of(node).describe()));
    }

    let child_prefix = format!("{}{}", prefix, extension);
    for (i, child) in node.children.iter().enumerate() {
        summary_node(child, &child_prefix, i == node.children.len() - 1, options, out);
    }
}

/// Children grouped under the relationship that led to them.
pub fn render_clustered(root: &WebsiteNode, options: &RenderOptions) -> String {
    let mut out = String::new();
    clustered_node(root, "", true, options, &mut out);
    out
}

fn cluster_of(node: &WebsiteNode) -> &str {
    node.relationship_cluster.as_deref().unwrap_or(UNCATEGORIZED)
}

fn clustered_node(node: &WebsiteNode, prefix: &str, is_last: bool, options: &RenderOptions, out: &mut String) {
    if !within(node, options.max_depth) {
        return;
    }
    let connector = if is_last { "└── " } else { "├── " };
    let extension = if is_last { "    " } else { "│   " };

    let line = mark(node, options, format!("[{}] {}", status(node), node.domain));
    out.push_str(&format!("{}{}{}\n", prefix, connector, line));
    if let Some(title) = &node.title {
        out.push_str(&format!("{}{}    Title: {}\n", prefix, extension, truncate(title, 60)));
    }
    if node.crawled {
        out.push_str(&format!(
            "{}{}    {} children, {} links\n",
            prefix,
            extension,
            node.children.len(),
            node.link_contexts.len()
        ));
    }
    if options.show_expandability && node.crawled {
        out.push_str(&format!("{}{}    {}\n", prefix, extension, Expandability::of(node).describe()));
    }

    let mut clusters: BTreeMap<&str, Vec<&WebsiteNode>> = BTreeMap::new();
    for child in &node.children {
        clusters.entry(cluster_of(child)).or_default().push(child);
    }

    let count = clusters.len();
    for (idx, (name, children)) in clusters.into_iter().enumerate() {
        let last_cluster = idx == count - 1;
        let cluster_connector = if last_cluster { "└─" } else { "├─" };
        let cluster_extension = if last_cluster { "  " } else { "│ " };

        let new_count = children
            .iter()
            .filter(|c| options.highlight.contains(&c.url))
            .count();
        let new_marker = if new_count > 0 {
            format!(" ({} new)", new_count)
        } else {
            String::new()
        };
        out.push_str(&format!(
            "{}{}{} [{}] ({}){}\n",
            prefix,
            extension,
            cluster_connector,
            name,
            children.len(),
            new_marker
        ));

        let child_prefix = format!("{}{}{}   ", prefix, extension, cluster_extension);
        for (i, child) in children.iter().enumerate() {
            clustered_node(child, &child_prefix, i == children.len() - 1, options, out);
        }
    }
}

fn nodes_by_depth(root: &WebsiteNode, max_depth: Option<usize>) -> BTreeMap<usize, Vec<&WebsiteNode>> {
    fn collect<'a>(
        node: &'a WebsiteNode,
        max_depth: Option<usize>,
        acc: &mut BTreeMap<usize, Vec<&'a WebsiteNode>>,
    ) {
        if !within(node, max_depth) {
            return;
        }
        acc.entry(node.depth).or_default().push(node);
        for child in &node.children {
            collect(child, max_depth, acc);
        }
    }

    let mut acc = BTreeMap::new();
    collect(root, max_depth, &mut acc);
    acc
}

/// All nodes listed level by level.
pub fn render_by_depth(root: &WebsiteNode, max_depth: Option<usize>) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\nTREE ORGANIZED BY DEPTH\n{}\n", RULE, RULE));

    for (depth, nodes) in nodes_by_depth(root, max_depth) {
        out.push_str(&format!("\n{}\nDEPTH {} ({} nodes)\n{}\n", THIN_RULE, depth, nodes.len(), THIN_RULE));
        for (i, node) in nodes.iter().enumerate() {
            out.push_str(&format!("\n  [{}] [{}] {}\n", i + 1, status(node), node.domain));
            if let Some(title) = &node.title {
                out.push_str(&format!("      Title: {}\n", truncate(title, 70)));
            }
            if node.crawled {
                out.push_str(&format!(
                    "      Stats: {} children, {} links found\n",
                    node.children.len(),
                    node.link_contexts.len()
                ));
            }
            if let Some(error) = &node.error {
                out.push_str(&format!("      Error: {}\n", truncate(error, 100)));
            }
        }
    }
    out
}

/// Share of each relationship cluster per depth, root level excluded.
pub fn render_relationship_distribution(root: &WebsiteNode, max_depth: Option<usize>) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\nRELATIONSHIP CLUSTERS SUMMARY\n{}\n", RULE, RULE));

    for (depth, nodes) in nodes_by_depth(root, max_depth) {
        if depth == 0 {
            continue;
        }
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for node in &nodes {
            *counts.entry(cluster_of(node)).or_insert(0) += 1;
        }
        let mut sorted: Vec<_> = counts.into_iter().collect();
        sorted.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));

        out.push_str(&format!(
            "\n{}\nDEPTH {} - Relationship Distribution ({} nodes)\n{}\n",
            THIN_RULE,
            depth,
            nodes.len(),
            THIN_RULE
        ));
        for (cluster, count) in sorted {
            let percentage = count as f64 / nodes.len() as f64 * 100.0;
            let bar = "█".repeat((percentage / 2.0) as usize);
            out.push_str(&format!("  {:.<30} {:>3} ({:>5.1}%) {}\n", cluster, count, percentage, bar));
        }
    }
    out
}

pub fn render_stats(stats: &TreeStats, validation: Option<&Validation>) -> String {
    let mut out = String::new();
    out.push_str("=== Tree Statistics ===\n");
    out.push_str(&format!("Max Depth:     {}\n", stats.max_depth));
    out.push_str(&format!("Total Nodes:   {}\n", stats.total_nodes));
    out.push_str(&format!("Crawled Nodes: {}\n", stats.crawled_nodes));
    out.push_str(&format!("Failed Nodes:  {}\n", stats.failed_nodes));
    out.push_str(&format!("Success Rate:  {:.1}%\n", stats.success_rate() * 100.0));
    out.push_str(&format!("Average Width: {:.2}\n", stats.avg_width));
    out.push_str("\nNodes per depth:\n");
    for (depth, count) in &stats.nodes_by_depth {
        let width = match (
            stats.min_width_at_depth.get(depth),
            stats.max_width_at_depth.get(depth),
        ) {
            (Some(min), Some(max)) => format!(" (width: {}-{})", min, max),
            _ => String::new(),
        };
        out.push_str(&format!("  Depth {}: {} nodes{}\n", depth, count, width));
    }

    if let Some(validation) = validation {
        let verdict = if validation.valid { "VALID" } else { "INVALID" };
        out.push_str(&format!("\nVerdict: {} ({})\n", verdict, validation.reason));
    }
    out
}

/// What a width or depth expansion added, newest URLs sorted.
pub fn render_expansion_summary(kind: &str, node_url: &str, new_urls: &BTreeSet<String>) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\nEXPANSION SUMMARY\n{}\n", RULE, RULE));
    out.push_str(&format!("Expansion Type: {}\n", kind.to_uppercase()));
    out.push_str(&format!("Expanded Node:  {}\n", node_url));
    out.push_str(&format!("Total New Nodes: {}\n", new_urls.len()));
    if !new_urls.is_empty() {
        out.push_str("\nNewly Added URLs:\n");
        for (i, url) in new_urls.iter().enumerate() {
            out.push_str(&format!("  {}. {}\n", i + 1, url));
        }
    }
    out.push_str(&format!("{}\n", RULE));
    out
}
