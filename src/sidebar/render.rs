use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
    Frame,
};

use super::item::SidebarItem;
use super::menu::ContextMenu;
use super::row::SidebarRow;

/// Render the sidebar panel. Rows are laid out to the panel's inner width.
pub fn render_sidebar(f: &mut Frame, rows: &[SidebarRow], selected: usize, focused: bool, area: Rect) {
    let inner_width = area.width.saturating_sub(2) as usize;

    let items: Vec<ListItem> = if rows.is_empty() {
        vec![ListItem::new("No feeds")]
    } else {
        rows.iter()
            .enumerate()
            .map(|(i, row)| {
                let item = ListItem::new(row.line(inner_width));
                if i == selected {
                    item.style(Style::default().bg(Color::DarkGray).fg(Color::White))
                } else {
                    item
                }
            })
            .collect()
    };

    let border_style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(" Feeds "),
    );
    f.render_widget(list, area);
}

/// Render an open context menu centered over `area`.
pub fn render_menu(f: &mut Frame, item: &SidebarItem, menu: &ContextMenu, area: Rect) {
    let lines: Vec<Line> = menu
        .entries()
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let marker = if i == menu.highlighted_index() { "> " } else { "  " };
            Line::from(format!("{marker}{}", entry.title()))
        })
        .collect();

    let overlay = overlay_rect(32, lines.len() as u16 + 2, area);
    if overlay.width < 12 || overlay.height < 3 {
        return;
    }

    f.render_widget(Clear, overlay);
    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(format!(" {} ", item.name)),
    );
    f.render_widget(paragraph, overlay);
}

/// Lines shown by the inspector for `item`.
pub fn inspector_lines(item: &SidebarItem) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(format!("Name:   {}", item.name)),
        Line::from(format!("Kind:   {}", item.kind.label())),
        Line::from(format!("Unread: {}", item.unread_count)),
    ];
    if let Some(feed) = &item.feed {
        lines.push(Line::from(format!("URL:    {}", feed.url)));
        if let Some(home) = &feed.home_page_url {
            lines.push(Line::from(format!("Home:   {home}")));
        }
        if let Some(external_id) = &feed.external_id {
            lines.push(Line::from(format!("Sync ID: {external_id}")));
        }
    }
    lines
}

pub fn render_inspector(f: &mut Frame, item: &SidebarItem, area: Rect) {
    let lines = inspector_lines(item);
    let overlay = overlay_rect(60, lines.len() as u16 + 2, area);
    if overlay.width < 20 || overlay.height < 5 {
        return;
    }

    f.render_widget(Clear, overlay);
    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Info "),
    );
    f.render_widget(paragraph, overlay);
}

/// Flatten a rendered line to its text.
pub fn plain_text(line: &Line<'_>) -> String {
    line.spans.iter().map(|span| span.content.as_ref()).collect()
}

/// A rectangle of at most `width` x `height`, centered in `area`.
fn overlay_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(2));
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WebFeed;
    use ratatui::{backend::TestBackend, Terminal};

    fn rows() -> Vec<SidebarRow> {
        vec![
            SidebarRow::new(SidebarItem::pseudo_feed("unread", "All Unread", 2), false),
            SidebarRow::new(
                SidebarItem::web_feed(
                    WebFeed {
                        feed_id: "f1".to_string(),
                        url: "https://example.com/feed".to_string(),
                        external_id: Some("ext-1".to_string()),
                        title: "Example".to_string(),
                        home_page_url: None,
                        icon_url: None,
                    },
                    0,
                ),
                false,
            ),
        ]
    }

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn test_render_sidebar_shows_rows_and_badge() {
        let mut terminal = Terminal::new(TestBackend::new(24, 6)).unwrap();
        let rows = rows();
        terminal
            .draw(|f| render_sidebar(f, &rows, 0, true, f.area()))
            .unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains("All Unread"));
        assert!(text.contains(" 2 │"));
        assert!(text.contains("Example"));
    }

    #[test]
    fn test_render_menu_marks_highlight() {
        let mut terminal = Terminal::new(TestBackend::new(40, 10)).unwrap();
        let rows = rows();
        let item = rows[0].item();
        let menu = ContextMenu::for_item(item);
        terminal
            .draw(|f| render_menu(f, item, &menu, f.area()))
            .unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains("> Mark All as Read"));
        assert!(text.contains("  Get Info"));
    }

    #[test]
    fn test_inspector_lines_include_feed_details() {
        let rows = rows();
        let text: Vec<String> = inspector_lines(rows[1].item())
            .iter()
            .map(plain_text)
            .collect();
        assert!(text.contains(&"Kind:   Web Feed".to_string()));
        assert!(text.contains(&"URL:    https://example.com/feed".to_string()));
        assert!(text.contains(&"Sync ID: ext-1".to_string()));
    }
}
