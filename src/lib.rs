//! Article sync for a feed reader: reconciles local article state with a
//! remote record zone, and renders the feed sidebar.

pub mod cloud;
pub mod config;
pub mod models;
pub mod sidebar;
pub mod storage;
pub mod sync;
pub mod util;
