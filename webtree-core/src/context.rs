use webtree_scanner::{DEFAULT_RELATIONSHIP, WebsiteNode};

const CONTENT_LIMIT: usize = 800;

/// The part of a page title before the first " - " or " | " separator.
pub fn clean_title(title: Option<&str>) -> String {
    match title {
        Some(t) if !t.is_empty() => t
            .split(" - ")
            .next()
            .unwrap_or(t)
            .split(" | ")
            .next()
            .unwrap_or(t)
            .to_string(),
        _ => "Unknown".to_string(),
    }
}

/// Render a node as a text block for the question generator.
///
/// With a `parent`, the block opens with the relationship that led to the
/// node and the text around the parent's link to it. Description and
/// content follow; title-only nodes are reduced to their topic.
pub fn node_text(node: &WebsiteNode, parent: Option<&WebsiteNode>) -> String {
    let mut parts = Vec::new();

    if let Some(parent) = parent {
        if let Some(rel) = node.relationship_cluster.as_deref().map(str::trim)
            && !rel.is_empty()
            && rel != DEFAULT_RELATIONSHIP
        {
            parts.push(format!("Category/Relationship: {}", rel));
        }
        if let Some(link) = parent.link_contexts.iter().find(|l| l.url == node.url) {
            let surrounding = link.surrounding_text.trim();
            if surrounding.chars().count() > 10 {
                parts.push(format!("Parent Context Summary: {}", surrounding.replace('\n', " ")));
            }
        }
    }

    let description = node.description_text();
    let content = node.content_text();
    if !description.is_empty() || !content.is_empty() {
        if !description.is_empty() {
            parts.push(format!("Description: {}", description));
        }
        if !content.is_empty() {
            if content.chars().count() > CONTENT_LIMIT {
                let head: String = content.chars().take(CONTENT_LIMIT).collect();
                parts.push(format!("Content: {}...", head));
            } else {
                parts.push(format!("Content: {}", content));
            }
        }
    } else if !node.title_text().is_empty() {
        parts.push(format!("General Topic Context: {}", clean_title(Some(node.title_text()))));
    } else {
        parts.push("Info: [Empty Node]".to_string());
    }

    parts.join("\n")
}

/// Nodes chosen for one question, by URL, plus their rendered text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextWindow {
    /// Up to two ancestors directly above the current node.
    pub reasoning_chain: Vec<String>,
    /// The current node first, then the sampled siblings.
    pub aggregation_pool: Vec<String>,
    pub reasoning_chain_fmt: Vec<String>,
    pub aggregation_pool_fmt: Vec<String>,
}

impl ContextWindow {
    /// Whether any pooled node offers text a question could be answered from.
    pub fn has_target_content(&self) -> bool {
        self.aggregation_pool_fmt
            .iter()
            .any(|t| t.contains("Content:") || t.contains("Description:"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use webtree_scanner::LinkContext;

    #[test]
    fn test_clean_title() {
        assert_eq!(clean_title(Some("Coffee - Wikipedia")), "Coffee");
        assert_eq!(clean_title(Some("Tea | Site")), "Tea");
        assert_eq!(clean_title(None), "Unknown");
    }

    #[test]
    fn test_node_text_with_parent_context() {
        let mut parent = WebsiteNode::new("https://e.com/", 0);
        parent.link_contexts.push(LinkContext::new(
            "https://e.com/espresso",
            "Espresso",
            "Espresso is a concentrated\ncoffee drink",
            "products/drinks",
        ));
        let mut node = WebsiteNode::from_link(&parent.link_contexts[0], 0);
        node.mark_crawled(Some("Espresso".into()), Some("A strong coffee".into()), None);

        let text = node_text(&node, Some(&parent));
        assert_eq!(
            text,
            "Category/Relationship: products/drinks\n\
             Parent Context Summary: Espresso is a concentrated coffee drink\n\
             Description: A strong coffee"
        );
    }

    #[test]
    fn test_node_text_default_relationship_omitted() {
        let parent = WebsiteNode::new("https://e.com/", 0);
        let mut node = WebsiteNode::new("https://e.com/x", 1);
        node.relationship_cluster = Some(DEFAULT_RELATIONSHIP.to_string());
        node.title = Some("Topic - Site".into());
        assert_eq!(node_text(&node, Some(&parent)), "General Topic Context: Topic");
    }

    #[test]
    fn test_node_text_truncates_long_content() {
        let mut node = WebsiteNode::new("https://e.com/", 0);
        node.content = Some("x".repeat(900));
        let text = node_text(&node, None);
        assert!(text.ends_with("..."));
        assert_eq!(text.len(), "Content: ".len() + 800 + 3);
    }

    #[test]
    fn test_empty_node() {
        let node = WebsiteNode::new("https://e.com/", 0);
        assert_eq!(node_text(&node, None), "Info: [Empty Node]");
    }
}
