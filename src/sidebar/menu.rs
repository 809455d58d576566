use super::item::{ItemKind, SidebarItem};

/// Entries offered by a row's context menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuEntry {
    Inspector,
    MarkAllRead,
    CopyFeedUrl,
}

impl MenuEntry {
    pub fn title(self) -> &'static str {
        match self {
            MenuEntry::Inspector => "Get Info",
            MenuEntry::MarkAllRead => "Mark All as Read",
            MenuEntry::CopyFeedUrl => "Copy Feed URL",
        }
    }
}

/// An open context menu with a highlighted entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextMenu {
    entries: Vec<MenuEntry>,
    highlighted: usize,
}

impl ContextMenu {
    /// Build the menu for `item`. `Inspector` is always present.
    pub fn for_item(item: &SidebarItem) -> Self {
        let mut entries = Vec::with_capacity(3);
        if item.unread_count > 0 {
            entries.push(MenuEntry::MarkAllRead);
        }
        if item.kind == ItemKind::WebFeed && item.feed.is_some() {
            entries.push(MenuEntry::CopyFeedUrl);
        }
        entries.push(MenuEntry::Inspector);
        Self {
            entries,
            highlighted: 0,
        }
    }

    pub fn entries(&self) -> &[MenuEntry] {
        &self.entries
    }

    pub fn highlighted(&self) -> MenuEntry {
        self.entries[self.highlighted]
    }

    pub fn highlighted_index(&self) -> usize {
        self.highlighted
    }

    /// Move the highlight, wrapping at both ends.
    pub fn move_highlight(&mut self, delta: isize) {
        let len = self.entries.len() as isize;
        self.highlighted = (self.highlighted as isize + delta).rem_euclid(len) as usize;
    }
}
