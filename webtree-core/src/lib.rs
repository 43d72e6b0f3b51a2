//! Tree persistence, navigation and round driving on top of `webtree-scanner`.

pub mod collaborators;
pub mod context;
pub mod error;
pub mod navigation;
pub mod question_log;
pub mod report;
pub mod session;
pub mod stats;
pub mod store;

pub use error::{Result, TreeError};
pub use navigation::{ExpansionKind, Focus, NavigationConfig, NavigationController, resolve_position};
pub use store::TreeStore;
