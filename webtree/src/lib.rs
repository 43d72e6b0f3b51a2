#[path = "handlers.rs"]
pub mod handlers;

pub use handlers::{
    ExpandMode, ExpandOutcome, build_link_extractor, crawl_to_file, expand_file, expand_in_tree,
    resolve_path, validate_file,
};
