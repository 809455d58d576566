use futures::FutureExt;
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use unicode_width::UnicodeWidthChar;

use super::icon::{FeedIcon, IconLoader};
use super::item::{ItemKind, SidebarItem};
use super::menu::{ContextMenu, MenuEntry};
use crate::util::{display_width, sanitize_label, truncate_to_width};

/// Leading padding of a regular (non-compact) row.
const REGULAR_PADDING: usize = 2;
const ICON_WIDTH: usize = 1;
const ICON_GAP: usize = 1;

/// Results of background work started by a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowEvent {
    IconLoaded { item_id: String, icon: FeedIcon },
}

/// One sidebar entry: the item, its loaded icon, and its menu/inspector state.
#[derive(Debug, Clone)]
pub struct SidebarRow {
    item: SidebarItem,
    compact_spacing: bool,
    icon: Option<FeedIcon>,
    icon_requested: bool,
    menu: Option<ContextMenu>,
    inspector_presented: bool,
}

impl SidebarRow {
    /// `compact_spacing` drops the leading padding, for narrow layouts.
    pub fn new(item: SidebarItem, compact_spacing: bool) -> Self {
        Self {
            item,
            compact_spacing,
            icon: None,
            icon_requested: false,
            menu: None,
            inspector_presented: false,
        }
    }

    pub fn item(&self) -> &SidebarItem {
        &self.item
    }

    pub fn icon(&self) -> Option<&FeedIcon> {
        self.icon.as_ref()
    }

    pub fn menu(&self) -> Option<&ContextMenu> {
        self.menu.as_ref()
    }

    pub fn is_inspector_presented(&self) -> bool {
        self.inspector_presented
    }

    /// Replace the item (e.g. after unread counts change), keeping UI state.
    pub fn update_item(&mut self, item: SidebarItem) {
        if self.item.feed != item.feed {
            self.icon = None;
            self.icon_requested = false;
        }
        self.item = item;
    }

    // ========================================================================
    // Icon loading
    // ========================================================================

    /// Called when the row first becomes visible.
    ///
    /// For feed-backed rows, asks `loader` for the icon in a background task
    /// and reports it on `tx`. Nothing is sent when loading fails. Returns
    /// `None` when no request was started (no feed, already loaded, or
    /// already in flight).
    pub fn on_appear(
        &mut self,
        loader: Arc<dyn IconLoader>,
        tx: mpsc::Sender<RowEvent>,
    ) -> Option<JoinHandle<()>> {
        if self.icon.is_some() || self.icon_requested {
            return None;
        }
        let feed = self.item.feed.clone()?;
        self.icon_requested = true;

        let item_id = self.item.id.clone();
        Some(tokio::spawn(async move {
            let loaded = AssertUnwindSafe(loader.load_icon(&feed))
                .catch_unwind()
                .await;
            match loaded {
                Ok(Some(icon)) => {
                    // Receiver gone means the sidebar was torn down; nothing to update
                    let _ = tx.send(RowEvent::IconLoaded { item_id, icon }).await;
                }
                Ok(None) => {}
                Err(_) => tracing::error!(item_id = %item_id, "Icon loader panicked"),
            }
        }))
    }

    /// Apply a background result. Returns true when the row changed and
    /// should be redrawn.
    pub fn apply(&mut self, event: &RowEvent) -> bool {
        match event {
            RowEvent::IconLoaded { item_id, icon } if *item_id == self.item.id => {
                self.icon = Some(icon.clone());
                true
            }
            RowEvent::IconLoaded { .. } => false,
        }
    }

    // ========================================================================
    // Context menu and inspector
    // ========================================================================

    /// Secondary action (right click / long press): open the context menu.
    pub fn secondary_action(&mut self) -> &mut ContextMenu {
        self.menu.insert(ContextMenu::for_item(&self.item))
    }

    pub fn dismiss_menu(&mut self) {
        self.menu = None;
    }

    /// Choose `entry` from the open menu, closing it.
    ///
    /// `Inspector` toggles the inspector here; other entries are returned
    /// for the caller to carry out. Returns `None` if no menu was open or the
    /// entry is not offered.
    pub fn select(&mut self, entry: MenuEntry) -> Option<MenuEntry> {
        let menu = self.menu.take()?;
        if !menu.entries().contains(&entry) {
            self.menu = Some(menu);
            return None;
        }
        if entry == MenuEntry::Inspector {
            self.toggle_inspector();
        }
        Some(entry)
    }

    /// Choose the highlighted menu entry.
    pub fn select_highlighted(&mut self) -> Option<MenuEntry> {
        let entry = self.menu.as_ref()?.highlighted();
        self.select(entry)
    }

    pub fn toggle_inspector(&mut self) {
        self.inspector_presented = !self.inspector_presented;
    }

    pub fn dismiss_inspector(&mut self) {
        self.inspector_presented = false;
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    /// Unread badge text, present only for a positive unread count.
    pub fn badge(&self) -> Option<String> {
        (self.item.unread_count > 0).then(|| format!(" {} ", self.item.unread_count))
    }

    /// Render the row into `width` columns: padding, icon slot, name, and a
    /// right-aligned unread badge.
    pub fn line(&self, width: usize) -> Line<'static> {
        let padding = if self.compact_spacing {
            0
        } else {
            REGULAR_PADDING
        };
        let prefix = padding + ICON_WIDTH + ICON_GAP;
        // Drop the badge when the row is too narrow to hold it
        let badge = self
            .badge()
            .filter(|b| prefix + display_width(b) + 1 <= width);
        let badge_width = badge.as_deref().map_or(0, |b| display_width(b) + 1);

        let name_budget = width.saturating_sub(prefix + badge_width);
        let label = sanitize_label(&self.item.name);
        let name = truncate_to_width(&label, name_budget).into_owned();
        let fill = name_budget.saturating_sub(display_width(&name));

        let mut spans = Vec::with_capacity(6);
        if padding > 0 {
            spans.push(Span::raw(" ".repeat(padding)));
        }
        spans.push(match &self.icon {
            Some(icon) => Span::styled(
                icon.glyph.to_string(),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            None => Span::raw(" ".repeat(ICON_WIDTH)),
        });
        spans.push(Span::raw(" ".repeat(ICON_GAP)));
        spans.push(Span::styled(name, self.name_style()));
        if let Some(badge) = badge {
            spans.push(Span::raw(" ".repeat(fill + 1)));
            spans.push(Span::styled(
                badge,
                Style::default().fg(Color::Black).bg(Color::Gray),
            ));
        }
        Line::from(clip_spans(spans, width))
    }

    fn name_style(&self) -> Style {
        let style = match self.item.kind {
            ItemKind::WebFeed => Style::default(),
            ItemKind::PseudoFeed => Style::default().add_modifier(Modifier::ITALIC),
            ItemKind::Folder => Style::default().add_modifier(Modifier::BOLD),
        };
        if self.item.unread_count > 0 {
            style.add_modifier(Modifier::BOLD)
        } else {
            style
        }
    }
}

/// Cut `spans` so their combined display width is at most `width`.
fn clip_spans(spans: Vec<Span<'static>>, width: usize) -> Vec<Span<'static>> {
    let mut remaining = width;
    let mut clipped = Vec::with_capacity(spans.len());
    for span in spans {
        let span_width = display_width(&span.content);
        if span_width <= remaining {
            remaining -= span_width;
            clipped.push(span);
            continue;
        }
        let mut kept = String::new();
        for c in span.content.chars() {
            let w = UnicodeWidthChar::width(c).unwrap_or(0);
            if w > remaining {
                break;
            }
            remaining -= w;
            kept.push(c);
        }
        if !kept.is_empty() {
            clipped.push(Span::styled(kept, span.style));
        }
        break;
    }
    clipped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WebFeed;
    use async_trait::async_trait;

    struct FixedLoader(Option<FeedIcon>);

    #[async_trait]
    impl IconLoader for FixedLoader {
        async fn load_icon(&self, _feed: &WebFeed) -> Option<FeedIcon> {
            self.0.clone()
        }
    }

    fn feed_item(unread: i64) -> SidebarItem {
        SidebarItem::web_feed(
            WebFeed {
                feed_id: "f1".to_string(),
                url: "https://example.com/feed".to_string(),
                external_id: None,
                title: "Example".to_string(),
                home_page_url: None,
                icon_url: None,
            },
            unread,
        )
    }

    fn icon() -> FeedIcon {
        FeedIcon {
            glyph: 'E',
            source: "https://example.com/favicon.ico".to_string(),
        }
    }

    fn text(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_badge_only_when_unread() {
        assert_eq!(SidebarRow::new(feed_item(0), false).badge(), None);
        assert_eq!(
            SidebarRow::new(feed_item(12), false).badge().as_deref(),
            Some(" 12 ")
        );
    }

    #[test]
    fn test_line_layout_regular() {
        let row = SidebarRow::new(feed_item(3), false);
        let line = row.line(20);
        assert_eq!(text(&line), "    Example       3 ");
        assert_eq!(line.width(), 20);
    }

    #[test]
    fn test_line_layout_compact_without_badge() {
        let row = SidebarRow::new(feed_item(0), true);
        assert_eq!(text(&row.line(20)), "  Example");
    }

    #[test]
    fn test_line_truncates_long_names() {
        let mut item = feed_item(5);
        item.name = "A very long feed title indeed".to_string();
        let line = SidebarRow::new(item, false).line(20);
        assert_eq!(line.width(), 20);
        assert!(text(&line).contains('…'));
    }

    #[test]
    fn test_narrow_rows_never_exceed_width() {
        let row = SidebarRow::new(SidebarItem::pseudo_feed("unread", "All Unread", 1234), false);
        for width in 0..=12 {
            assert!(row.line(width).width() <= width, "width {width}");
        }

        // Too narrow for the badge: the name keeps what room is left
        let narrow = row.line(6);
        assert_eq!(narrow.width(), 6);
        assert!(!text(&narrow).contains("1234"));

        assert_eq!(text(&row.line(2)), "  ");
        assert!(text(&row.line(11)).ends_with(" 1234 "));
    }

    #[test]
    fn test_apply_ignores_other_items() {
        let mut row = SidebarRow::new(feed_item(0), false);
        let other = RowEvent::IconLoaded {
            item_id: "other".to_string(),
            icon: icon(),
        };
        assert!(!row.apply(&other));
        assert!(row.icon().is_none());
    }

    #[tokio::test]
    async fn test_on_appear_loads_icon_once() {
        let (tx, mut rx) = mpsc::channel(4);
        let loader: Arc<dyn IconLoader> = Arc::new(FixedLoader(Some(icon())));
        let mut row = SidebarRow::new(feed_item(1), false);

        let handle = row.on_appear(loader.clone(), tx.clone()).unwrap();
        assert!(row.on_appear(loader, tx).is_none());
        handle.await.unwrap();

        let event = rx.recv().await.unwrap();
        assert!(row.apply(&event));
        assert_eq!(row.icon(), Some(&icon()));
        assert!(text(&row.line(20)).starts_with("  E Example"));
    }

    #[tokio::test]
    async fn test_failed_icon_load_sends_nothing() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut row = SidebarRow::new(feed_item(1), false);

        row.on_appear(Arc::new(FixedLoader(None)), tx)
            .unwrap()
            .await
            .unwrap();

        // Sender dropped with the task and nothing was sent
        assert!(rx.recv().await.is_none());
        assert!(row.icon().is_none());
    }

    #[test]
    fn test_pseudo_feed_does_not_request_icon() {
        let (tx, _rx) = mpsc::channel(1);
        let mut row = SidebarRow::new(SidebarItem::pseudo_feed("unread", "All Unread", 4), false);
        assert!(row
            .on_appear(Arc::new(FixedLoader(Some(icon()))), tx)
            .is_none());
    }

    #[test]
    fn test_inspector_toggles_through_menu() {
        let mut row = SidebarRow::new(feed_item(0), false);
        assert_eq!(row.select(MenuEntry::Inspector), None);

        row.secondary_action();
        assert_eq!(row.select(MenuEntry::Inspector), Some(MenuEntry::Inspector));
        assert!(row.is_inspector_presented());
        assert!(row.menu().is_none());

        row.secondary_action();
        row.select(MenuEntry::Inspector);
        assert!(!row.is_inspector_presented());
    }

    #[test]
    fn test_select_unoffered_entry_keeps_menu_open() {
        let mut row = SidebarRow::new(SidebarItem::folder("d", "Dir", 0), false);
        row.secondary_action();
        assert_eq!(row.select(MenuEntry::MarkAllRead), None);
        assert!(row.menu().is_some());
    }

    #[test]
    fn test_update_item_resets_icon_when_feed_changes() {
        let mut row = SidebarRow::new(feed_item(1), false);
        row.apply(&RowEvent::IconLoaded {
            item_id: "f1".to_string(),
            icon: icon(),
        });

        row.update_item(feed_item(7));
        assert!(row.icon().is_some());

        let mut moved = feed_item(7);
        if let Some(feed) = moved.feed.as_mut() {
            feed.url = "https://elsewhere.example.com/feed".to_string();
        }
        row.update_item(moved);
        assert!(row.icon().is_none());
    }
}
