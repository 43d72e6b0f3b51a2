// Position tracking, movement and on-demand growth over a stored tree

use crate::collaborators::ChatMessage;
use crate::context::{ContextWindow, clean_title, node_text};
use crate::error::Result;
use crate::store::TreeStore;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use tracing::{debug, error, info, warn};
use webtree_scanner::{PageFetcher, TreeExpander, WebsiteNode};

/// Content longer than this makes a child eligible for `advance_tree`.
const ADVANCE_MIN_CONTENT: usize = 20;
/// Stricter bar applied to children produced by a depth expansion.
const ADVANCE_MIN_CONTENT_AFTER_EXPANSION: usize = 50;
const MIN_DIFFICULTY: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Width,
    Depth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionKind {
    /// Grow below the current node.
    InsufficientDepth,
    /// Add siblings next to the current node.
    InsufficientWidth,
}

#[derive(Debug, Clone)]
pub struct NavigationConfig {
    pub depth_expansion_levels: usize,
    pub depth_expansion_max_children: usize,
    pub initial_difficulty: usize,
    pub seed: Option<u64>,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            depth_expansion_levels: 1,
            depth_expansion_max_children: 3,
            initial_difficulty: MIN_DIFFICULTY,
            seed: None,
        }
    }
}

/// Conversation histories of the two research agents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcripts {
    pub a: Vec<ChatMessage>,
    pub b: Vec<ChatMessage>,
}

/// Walks a website tree and grows it when the walk runs out of material.
///
/// The position is a path of URLs from the root, never a reference into the
/// tree. Every expansion persists the tree and reloads it, then resolves the
/// path again against the reloaded instance.
pub struct NavigationController<F: PageFetcher> {
    tree: WebsiteNode,
    store: TreeStore,
    expander: TreeExpander<F>,
    path: Vec<String>,
    difficulty_nodes: usize,
    history_snapshots: Vec<usize>,
    focus: Focus,
    transcripts: Transcripts,
    rng: StdRng,
    config: NavigationConfig,
}

impl<F: PageFetcher> NavigationController<F> {
    pub fn new(tree: WebsiteNode, store: TreeStore, expander: TreeExpander<F>, config: NavigationConfig) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let focus = *[Focus::Width, Focus::Depth]
            .choose(&mut rng)
            .unwrap_or(&Focus::Width);

        Self {
            path: vec![tree.url.clone()],
            tree,
            store,
            expander,
            difficulty_nodes: config.initial_difficulty.max(MIN_DIFFICULTY),
            history_snapshots: vec![0],
            focus,
            transcripts: Transcripts::default(),
            rng,
            config,
        }
    }

    /// Load the tree from `store` and start at its root.
    pub fn open(store: TreeStore, expander: TreeExpander<F>, config: NavigationConfig) -> Result<Self> {
        let tree = store.load()?;
        Ok(Self::new(tree, store, expander, config))
    }

    pub fn tree(&self) -> &WebsiteNode {
        &self.tree
    }

    pub fn store(&self) -> &TreeStore {
        &self.store
    }

    /// URLs from the root to the current node.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn current_node(&self) -> &WebsiteNode {
        self.tree.descend(&self.path).unwrap_or(&self.tree)
    }

    pub fn parent_node(&self) -> Option<&WebsiteNode> {
        if self.path.len() < 2 {
            return None;
        }
        self.tree.descend(&self.path[..self.path.len() - 1])
    }

    /// Number of nodes on the path, root included.
    pub fn depth_level(&self) -> usize {
        self.path.len()
    }

    pub fn root_topic(&self) -> String {
        clean_title(self.tree.title.as_deref())
    }

    pub fn difficulty_nodes(&self) -> usize {
        self.difficulty_nodes
    }

    pub fn raise_difficulty(&mut self) {
        self.difficulty_nodes += 1;
    }

    pub fn reset_difficulty(&mut self) {
        self.difficulty_nodes = MIN_DIFFICULTY;
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn set_focus(&mut self, focus: Focus) {
        self.focus = focus;
    }

    pub fn history_snapshots(&self) -> &[usize] {
        &self.history_snapshots
    }

    pub fn transcripts(&self) -> &Transcripts {
        &self.transcripts
    }

    pub fn transcripts_mut(&mut self) -> &mut Transcripts {
        &mut self.transcripts
    }

    /// Clean titles along the path, for logging.
    pub fn chain_titles(&self) -> Vec<String> {
        self.tree
            .chain(&self.path)
            .iter()
            .map(|n| clean_title(n.title.as_deref()))
            .collect()
    }

    /// Move to a random shallow node that has something to ask about.
    ///
    /// Depth 1 and below is preferred over the root. Among those, the
    /// shallowest nodes with substantial content win; without any, the
    /// shallowest structurally valid node is used.
    pub fn jump_to_random_start(&mut self) {
        let mut candidates: Vec<(Vec<String>, bool)> = Vec::new();
        let mut total = 0;
        collect_candidates(&self.tree, &mut Vec::new(), &mut candidates, &mut total);

        if candidates.is_empty() {
            warn!("No jump candidates among {} nodes, staying at root", total);
            self.path = vec![self.tree.url.clone()];
            return;
        }

        let mut pool: Vec<&(Vec<String>, bool)> = candidates.iter().filter(|(p, _)| p.len() >= 2).collect();
        if pool.is_empty() {
            warn!("Tree has no valid nodes below the root, including root");
            pool = candidates.iter().collect();
        }

        let rich: Vec<&(Vec<String>, bool)> = pool.iter().copied().filter(|(_, rich)| *rich).collect();
        let (source, label) = if rich.is_empty() {
            warn!("No content-rich nodes found, selecting shallowest structural node");
            (pool, "structural")
        } else {
            (rich, "content-rich")
        };

        let min_len = source.iter().map(|(p, _)| p.len()).min().unwrap_or(1);
        let shallowest: Vec<&(Vec<String>, bool)> = source.into_iter().filter(|(p, _)| p.len() == min_len).collect();

        if let Some((path, _)) = shallowest.choose(&mut self.rng) {
            self.path = path.clone();
        }
        info!(
            "Jumped to {} node at depth {} from {} candidates: {}",
            label,
            self.path.len() - 1,
            shallowest.len(),
            self.chain_titles().join(" -> ")
        );
    }

    /// Pick the nodes for the next question.
    ///
    /// The reasoning chain is the (up to two) ancestors right above the
    /// current node. The aggregation pool is the current node plus up to
    /// `difficulty_nodes - 1` random siblings with distinct titles.
    pub fn get_context_nodes(&mut self) -> ContextWindow {
        let len = self.path.len();
        let chain_range = match len {
            0 | 1 => 0..0,
            2 => 0..1,
            _ => len - 3..len - 1,
        };

        let mut window = ContextWindow::default();
        let nodes = self.tree.chain(&self.path);

        for idx in chain_range {
            let Some(ancestor) = nodes.get(idx) else {
                continue;
            };
            let ancestor_parent = idx.checked_sub(1).and_then(|i| nodes.get(i)).copied();
            window.reasoning_chain.push(ancestor.url.clone());
            window.reasoning_chain_fmt.push(node_text(ancestor, ancestor_parent));
        }

        let current = nodes.last().copied().unwrap_or(&self.tree);
        window.aggregation_pool.push(current.url.clone());

        let parent = nodes.len().checked_sub(2).and_then(|i| nodes.get(i)).copied();
        let Some(parent) = parent else {
            window.aggregation_pool_fmt.push(node_text(current, None));
            return window;
        };

        let mut seen_titles = vec![current.title_text().to_string()];
        let mut unique: Vec<&WebsiteNode> = Vec::new();
        for sibling in parent.children.iter().filter(|c| c.url != current.url) {
            let title = sibling.title_text();
            if (title.is_empty() || !seen_titles.iter().any(|t| t == title)) && sibling.is_valid() {
                unique.push(sibling);
                if !title.is_empty() {
                    seen_titles.push(title.to_string());
                }
            }
        }

        let needed = self.difficulty_nodes.saturating_sub(1).min(unique.len());
        let sampled: Vec<&WebsiteNode> = unique.choose_multiple(&mut self.rng, needed).copied().collect();

        window.aggregation_pool_fmt.push(node_text(current, Some(parent)));
        for sibling in sampled {
            window.aggregation_pool.push(sibling.url.clone());
            window.aggregation_pool_fmt.push(node_text(sibling, Some(parent)));
        }
        window
    }

    fn children_with_content(&self, min_chars: usize) -> Vec<String> {
        self.current_node()
            .children
            .iter()
            .filter(|c| c.content_len() > min_chars)
            .map(|c| c.url.clone())
            .collect()
    }

    /// Descend into a random child with real content.
    ///
    /// When no child qualifies, one depth expansion is attempted and the
    /// children are checked again with a stricter content bar. On failure
    /// the position is left untouched.
    pub fn advance_tree(&mut self) -> Result<bool> {
        let mut choices = self.children_with_content(ADVANCE_MIN_CONTENT);
        if choices.is_empty() {
            info!("No children with content, expanding depth");
            if self.auto_expand_tree(ExpansionKind::InsufficientDepth, 1)? {
                choices = self.children_with_content(ADVANCE_MIN_CONTENT_AFTER_EXPANSION);
            }
        }

        let Some(next) = choices.choose(&mut self.rng).cloned() else {
            warn!("Stuck at leaf, cannot descend from {}", self.current_node().url);
            return Ok(false);
        };

        self.history_snapshots.push(self.transcripts.a.len());
        self.path.push(next);
        info!(
            "Descended to '{}'",
            clean_title(self.current_node().title.as_deref())
        );
        Ok(true)
    }

    /// Move up one level, rolling the transcripts back to the last snapshot.
    pub fn backtrack(&mut self) -> bool {
        if self.path.len() <= 1 {
            return false;
        }
        info!("Backtracking to parent node");
        self.path.pop();
        if let Some(restore) = self.history_snapshots.pop() {
            self.transcripts.a.truncate(restore);
            self.transcripts.b.truncate(restore);
        }
        self.difficulty_nodes = self.difficulty_nodes.saturating_sub(1).max(MIN_DIFFICULTY);
        true
    }

    /// Widen the parent when it has fewer children than the width target.
    pub fn ensure_min_width(&mut self) -> Result<bool> {
        if self.difficulty_nodes <= 1 {
            return Ok(false);
        }
        let Some(parent) = self.parent_node() else {
            return Ok(false);
        };
        let siblings = parent.children.len();
        if siblings >= self.difficulty_nodes {
            return Ok(false);
        }
        let missing = self.difficulty_nodes - siblings;
        info!(
            "Width requirement {} exceeds {} siblings, expanding",
            self.difficulty_nodes, siblings
        );
        self.auto_expand_tree(ExpansionKind::InsufficientWidth, missing)
    }

    /// Grow the tree around the current position, persist it, reload it and
    /// re-resolve the position.
    ///
    /// Returns `Ok(true)` when nodes were added and the current node was found
    /// again in the reloaded tree. Persistence failures are returned as errors.
    pub fn auto_expand_tree(&mut self, kind: ExpansionKind, amount: usize) -> Result<bool> {
        info!("Auto-expansion triggered: {:?} (need +{})", kind, amount);

        let target_len = match kind {
            ExpansionKind::InsufficientDepth => self.path.len(),
            ExpansionKind::InsufficientWidth if self.path.len() >= 2 => self.path.len() - 1,
            ExpansionKind::InsufficientWidth => return Ok(false),
        };

        let Some(target) = self.tree.descend_mut(&self.path[..target_len]) else {
            warn!("Expansion target is not in the tree");
            return Ok(false);
        };

        let (added, _) = match kind {
            ExpansionKind::InsufficientDepth => self.expander.expand_depth(
                target,
                self.config.depth_expansion_levels,
                self.config.depth_expansion_max_children,
            ),
            ExpansionKind::InsufficientWidth => self.expander.expand_width(target, amount),
        };

        if added == 0 {
            warn!("Expansion returned 0 new nodes");
            return Ok(false);
        }
        info!("Expansion added {} nodes", added);

        self.store.save(&self.tree).inspect_err(|e| error!("Failed to persist tree: {}", e))?;
        self.tree = self.store.load().inspect_err(|e| error!("Failed to reload tree: {}", e))?;
        let (path, found) = resolve_position(&self.tree, &self.path);
        self.path = path;
        Ok(found)
    }
}

/// Re-resolve a URL path against a freshly loaded tree.
///
/// The same URL path is tried first, then the first occurrence of the last
/// URL anywhere in the tree. Failing both, the path is cut back to its longest
/// prefix that still resolves, or to the root when nothing does. The flag is
/// `false` whenever the position was lost.
pub fn resolve_position(tree: &WebsiteNode, path: &[String]) -> (Vec<String>, bool) {
    if tree.descend(path).is_some() {
        return (path.to_vec(), true);
    }

    let Some(current_url) = path.last() else {
        return (vec![tree.url.clone()], false);
    };
    if let Some(found) = tree.path_to(current_url) {
        debug!("Position re-resolved by URL search for {}", current_url);
        return (found, true);
    }

    let kept = tree.chain(path).len();
    let fallback = if kept == 0 {
        vec![tree.url.clone()]
    } else {
        path[..kept].to_vec()
    };
    error!("Lost position {} after reload, fell back to {} levels", current_url, fallback.len());
    (fallback, false)
}

fn collect_candidates(
    node: &WebsiteNode,
    path: &mut Vec<String>,
    out: &mut Vec<(Vec<String>, bool)>,
    total: &mut usize,
) {
    *total += 1;
    path.push(node.url.clone());
    if node.is_valid() {
        out.push((path.clone(), node.has_substantial_content()));
    }
    for child in &node.children {
        collect_candidates(child, path, out, total);
    }
    path.pop();
}
