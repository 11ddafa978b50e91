#![forbid(unsafe_code)]

//! Plain-text rendering of a [`ScreenView`].

use std::fmt::Write as _;

use stockview::{CardFrame, Chevron, ImageFrame, ItemView, ScreenView};

/// Widest title column before truncation.
const TITLE_COLUMNS: usize = 40;

/// Render the whole screen, one block per rendered card.
pub fn render_screen(view: &ScreenView) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "inventory: {} records, rendered {}..{}, scroll {:.0}/{:.0}{}",
        view.total_len,
        view.rendered_range.start,
        view.rendered_range.end,
        view.scroll_offset,
        view.content_height,
        if view.fetching { " [refreshing]" } else { "" },
    );
    for item in &view.items {
        out.push_str(&render_item(item));
    }
    out
}

fn render_item(item: &ItemView) -> String {
    let card = &item.card;
    let mut out = String::new();
    let chevron = match card.chevron {
        Chevron::Down => 'v',
        Chevron::Up => '^',
    };
    let _ = writeln!(
        out,
        "{chevron} [{:>3}] @{:<6.0} {:<width$} {:>10} {}",
        item.index,
        item.top,
        title(card),
        card.date_label.as_deref().unwrap_or("-"),
        if card.is_new { "NEW" } else { "" },
        width = TITLE_COLUMNS,
    );
    let image = match &card.image {
        ImageFrame::Fallback { glyph, .. } => format!("<{glyph}>"),
        ImageFrame::Image { width, height, .. } => format!("{width:.0}x{height:.0}"),
    };
    let _ = writeln!(
        out,
        "        {} {:.0}% image {image} height {:.0}",
        card.phase.as_str(),
        card.progress * 100.0,
        card.height,
    );
    if card.visual.category_height > 0.0 && !card.categories.is_empty() {
        let _ = writeln!(out, "        {}", card.categories.join(" | "));
    }
    out
}

/// Title clipped to the current line limit.
fn title(card: &CardFrame) -> String {
    let limit = if card.title_line_limit <= 1 {
        TITLE_COLUMNS
    } else {
        TITLE_COLUMNS * usize::from(card.title_line_limit)
    };
    let count = card.title.chars().count();
    if count <= limit {
        return card.title.clone();
    }
    let mut clipped: String = card.title.chars().take(limit.saturating_sub(3)).collect();
    clipped.push_str("...");
    clipped
}
