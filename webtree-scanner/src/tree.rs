use crate::links::extract_domain;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;

pub const DEFAULT_RELATIONSHIP: &str = "related topics";

/// An outgoing hyperlink together with the text it was found in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkContext {
    pub url: String,
    pub anchor_text: String,
    pub surrounding_text: String,
    #[serde(default = "default_relationship", deserialize_with = "relationship_or_default")]
    pub relationship: String,
}

fn default_relationship() -> String {
    DEFAULT_RELATIONSHIP.to_string()
}

// Trees written by older tools carry `"relationship": null`.
fn relationship_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_relationship))
}

impl LinkContext {
    pub fn new(
        url: impl Into<String>,
        anchor_text: impl Into<String>,
        surrounding_text: impl Into<String>,
        relationship: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            anchor_text: anchor_text.into(),
            surrounding_text: surrounding_text.into(),
            relationship: relationship.into(),
        }
    }
}

/// One crawled (or attempted) page in the tree.
///
/// Field order matches the persisted JSON layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebsiteNode {
    pub url: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub crawled: bool,
    #[serde(default)]
    pub depth: usize,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub relationship_cluster: Option<String>,
    #[serde(default)]
    pub link_contexts: Vec<LinkContext>,
    #[serde(default)]
    pub children: Vec<WebsiteNode>,
}

impl WebsiteNode {
    pub fn new(url: impl Into<String>, depth: usize) -> Self {
        let url = url.into();
        Self {
            domain: extract_domain(&url),
            url,
            title: None,
            description: None,
            content: None,
            crawled: false,
            depth,
            error: None,
            relationship_cluster: None,
            link_contexts: Vec::new(),
            children: Vec::new(),
        }
    }

    /// A not-yet-fetched child for `link`, one level below `parent_depth`.
    pub fn from_link(link: &LinkContext, parent_depth: usize) -> Self {
        let mut node = Self::new(link.url.clone(), parent_depth + 1);
        node.relationship_cluster = Some(link.relationship.clone());
        node
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.crawled = false;
        self.error = Some(error.into());
        self.title = None;
        self.description = None;
        self.content = None;
    }

    pub fn mark_crawled(
        &mut self,
        title: Option<String>,
        description: Option<String>,
        content: Option<String>,
    ) {
        self.crawled = true;
        self.error = None;
        self.title = title;
        self.description = description;
        self.content = content;
    }

    pub fn title_text(&self) -> &str {
        self.title.as_deref().map(str::trim).unwrap_or("")
    }

    pub fn description_text(&self) -> &str {
        self.description.as_deref().map(str::trim).unwrap_or("")
    }

    pub fn content_text(&self) -> &str {
        self.content.as_deref().map(str::trim).unwrap_or("")
    }

    /// Length in characters of the trimmed content.
    pub fn content_len(&self) -> usize {
        self.content_text().chars().count()
    }

    /// Has any text to offer, or at least structure below it.
    pub fn is_valid(&self) -> bool {
        !self.title_text().is_empty()
            || !self.description_text().is_empty()
            || !self.content_text().is_empty()
            || !self.children.is_empty()
    }

    /// Description or content longer than 20 characters.
    pub fn has_substantial_content(&self) -> bool {
        self.content_len() > 20 || self.description_text().chars().count() > 20
    }

    pub fn child_urls(&self) -> HashSet<&str> {
        self.children.iter().map(|c| c.url.as_str()).collect()
    }

    pub fn find_by_url(&self, url: &str) -> Option<&WebsiteNode> {
        if self.url == url {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_by_url(url))
    }

    pub fn find_by_url_mut(&mut self, url: &str) -> Option<&mut WebsiteNode> {
        if self.url == url {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_by_url_mut(url))
    }

    /// URL path from this node down to the first node (pre-order) with `url`.
    pub fn path_to(&self, url: &str) -> Option<Vec<String>> {
        if self.url == url {
            return Some(vec![self.url.clone()]);
        }
        self.children.iter().find_map(|child| {
            child.path_to(url).map(|mut rest| {
                rest.insert(0, self.url.clone());
                rest
            })
        })
    }

    /// Follow a URL path that starts at this node.
    pub fn descend(&self, path: &[String]) -> Option<&WebsiteNode> {
        let (first, rest) = path.split_first()?;
        if &self.url != first {
            return None;
        }
        let mut node = self;
        for url in rest {
            node = node.children.iter().find(|c| &c.url == url)?;
        }
        Some(node)
    }

    pub fn descend_mut(&mut self, path: &[String]) -> Option<&mut WebsiteNode> {
        let (first, rest) = path.split_first()?;
        if &self.url != first {
            return None;
        }
        let mut node = self;
        for url in rest {
            node = node.children.iter_mut().find(|c| &c.url == url)?;
        }
        Some(node)
    }

    /// Nodes along the longest prefix of `path` that resolves from this node.
    pub fn chain(&self, path: &[String]) -> Vec<&WebsiteNode> {
        let mut chain = Vec::with_capacity(path.len());
        let Some((first, rest)) = path.split_first() else {
            return chain;
        };
        if &self.url != first {
            return chain;
        }
        let mut node = self;
        chain.push(node);
        for url in rest {
            match node.children.iter().find(|c| &c.url == url) {
                Some(child) => {
                    node = child;
                    chain.push(node);
                }
                None => break,
            }
        }
        chain
    }

    pub fn collect_urls(&self) -> HashSet<String> {
        let mut urls = HashSet::new();
        self.visit(&mut |node| {
            urls.insert(node.url.clone());
        });
        urls
    }

    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(WebsiteNode::node_count).sum::<usize>()
    }

    pub fn crawled_count(&self) -> usize {
        usize::from(self.crawled)
            + self.children.iter().map(WebsiteNode::crawled_count).sum::<usize>()
    }

    /// Deepest `depth` value in this subtree.
    pub fn max_depth(&self) -> usize {
        self.children
            .iter()
            .map(WebsiteNode::max_depth)
            .max()
            .unwrap_or(self.depth)
    }

    /// Pre-order visit of this subtree.
    pub fn visit<'a>(&'a self, f: &mut impl FnMut(&'a WebsiteNode)) {
        f(self);
        for child in &self.children {
            child.visit(f);
        }
    }
}
