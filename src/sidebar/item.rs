use crate::models::WebFeed;
use crate::storage::FeedUnread;

/// What a sidebar entry stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    /// A subscribed feed.
    WebFeed,
    /// A computed view such as "All Unread" or "Starred".
    PseudoFeed,
    Folder,
}

impl ItemKind {
    pub fn label(self) -> &'static str {
        match self {
            ItemKind::WebFeed => "Web Feed",
            ItemKind::PseudoFeed => "Smart Feed",
            ItemKind::Folder => "Folder",
        }
    }
}

/// Data behind one sidebar row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidebarItem {
    pub id: String,
    pub name: String,
    pub unread_count: i64,
    /// The feed whose icon the row shows, if any.
    pub feed: Option<WebFeed>,
    pub kind: ItemKind,
}

impl SidebarItem {
    pub fn web_feed(feed: WebFeed, unread_count: i64) -> Self {
        Self {
            id: feed.feed_id.clone(),
            name: feed.title.clone(),
            unread_count,
            feed: Some(feed),
            kind: ItemKind::WebFeed,
        }
    }

    pub fn pseudo_feed(id: impl Into<String>, name: impl Into<String>, unread_count: i64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            unread_count,
            feed: None,
            kind: ItemKind::PseudoFeed,
        }
    }

    pub fn folder(id: impl Into<String>, name: impl Into<String>, unread_count: i64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            unread_count,
            feed: None,
            kind: ItemKind::Folder,
        }
    }
}

impl From<FeedUnread> for SidebarItem {
    fn from(value: FeedUnread) -> Self {
        SidebarItem::web_feed(value.feed, value.unread_count)
    }
}
