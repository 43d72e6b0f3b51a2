//! Fetching, link classification and bounded crawling of web-content trees.

pub mod crawler;
pub mod error;
pub mod expander;
pub mod extract;
pub mod fetcher;
pub mod links;
pub mod tree;

pub use crawler::{ALREADY_VISITED, Crawler};
pub use error::{FetchError, Result, ScanError};
pub use expander::TreeExpander;
pub use fetcher::{HttpFetcher, MemoryFetcher, PageFetcher};
pub use links::{DomainFilter, LinkExtractor, classify};
pub use tree::{DEFAULT_RELATIONSHIP, LinkContext, WebsiteNode};
