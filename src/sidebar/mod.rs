//! Sidebar rows: feed name, icon, unread badge, context menu and inspector.

mod icon;
mod item;
mod menu;
mod render;
mod row;

pub use icon::{icon_client, FaviconLoader, FeedIcon, IconError, IconLoader};
pub use item::{ItemKind, SidebarItem};
pub use menu::{ContextMenu, MenuEntry};
pub use render::{inspector_lines, plain_text, render_inspector, render_menu, render_sidebar};
pub use row::{RowEvent, SidebarRow};

use crate::storage::Database;

pub const ALL_UNREAD_ID: &str = "pseudo:all-unread";
pub const STARRED_ID: &str = "pseudo:starred";

/// Items for the sidebar: the "All Unread" and "Starred" smart feeds
/// followed by every subscribed feed, alphabetically.
pub async fn load_items(db: &Database) -> anyhow::Result<Vec<SidebarItem>> {
    let total_unread = db.total_unread_count().await?;
    let starred_unread = db.starred_unread_count().await?;
    let feeds = db.get_feeds_with_unread_counts().await?;

    let mut items = Vec::with_capacity(feeds.len() + 2);
    items.push(SidebarItem::pseudo_feed(ALL_UNREAD_ID, "All Unread", total_unread));
    items.push(SidebarItem::pseudo_feed(STARRED_ID, "Starred", starred_unread));
    items.extend(feeds.into_iter().map(SidebarItem::from));
    Ok(items)
}
