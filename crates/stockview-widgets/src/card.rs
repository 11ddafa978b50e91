//! The inventory item card.
//!
//! One [`ItemCard`] exists per rendered record. It owns that record's
//! [`ExpansionState`] and image slot and produces a [`CardFrame`] snapshot
//! for the host to draw. Cards are recycled through
//! [`ViewPool`](crate::virtualized::ViewPool); rebinding resets all
//! per-item state, so a record scrolled out and back in starts collapsed.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use stockview_core::{DisplayRecord, RecordId};

use crate::expansion::{
    Chevron, ExpansionState, ExpansionView, HeightUpdate, Phase, TapOutcome, TitleMetrics,
    VisualFrame,
};
use crate::virtualized::Recyclable;

/// Icon shown in place of a missing image.
pub const FALLBACK_GLYPH: &str = "image-off-outline";
/// Icon of the "new" badge.
pub const NEW_BADGE_GLYPH: &str = "new-box";

/// Card sizing and transition timing.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct CardConfig {
    /// Expand and collapse duration, in milliseconds.
    pub transition_ms: u64,
    pub title: TitleMetrics,
    /// Width of the image column; height follows the aspect ratio.
    pub image_width: f32,
    /// Full card width.
    pub card_width: f32,
    /// Inner padding on every side.
    pub padding: f32,
    /// Height of the date/badge row under the title.
    pub meta_row_height: f32,
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            transition_ms: 500,
            title: TitleMetrics::default(),
            image_width: 85.0,
            card_width: 360.0,
            padding: 12.0,
            meta_row_height: 22.0,
        }
    }
}

impl CardConfig {
    #[inline]
    pub fn transition(&self) -> Duration {
        Duration::from_millis(self.transition_ms)
    }

    /// Width available to the category block beside the image.
    pub fn category_width(&self) -> f32 {
        (self.card_width - self.image_width - 3.0 * self.padding).max(0.0)
    }
}

/// Image state of one card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSlot {
    /// No image URL; the fallback glyph is drawn.
    Missing,
    /// Waiting for the size of the image.
    Pending,
    /// An aspect ratio has been published (possibly the square fallback).
    Ready,
}

/// How the image column is drawn.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageFrame {
    Fallback {
        glyph: &'static str,
        size: f32,
    },
    Image {
        uri: String,
        width: f32,
        height: f32,
    },
}

/// Everything needed to draw one card for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct CardFrame {
    pub id: RecordId,
    pub title: String,
    pub title_line_limit: u16,
    pub date_label: Option<String>,
    pub is_new: bool,
    pub phase: Phase,
    pub progress: f32,
    pub chevron: Chevron,
    pub image: ImageFrame,
    pub categories: Vec<String>,
    pub visual: VisualFrame,
    /// Estimated outer height, fed back into list offsets.
    pub height: f32,
}

/// One rendered inventory item.
#[derive(Debug, Clone)]
pub struct ItemCard {
    record: DisplayRecord,
    expansion: ExpansionState,
    image: ImageSlot,
    config: CardConfig,
}

impl ItemCard {
    pub fn new(record: DisplayRecord, config: CardConfig) -> Self {
        let image = slot_for(&record);
        Self {
            record,
            expansion: ExpansionState::new(config.transition(), config.title),
            image,
            config,
        }
    }

    #[inline]
    pub fn id(&self) -> &RecordId {
        &self.record.id
    }

    #[inline]
    pub fn record(&self) -> &DisplayRecord {
        &self.record
    }

    #[inline]
    pub fn expansion(&self) -> &ExpansionState {
        &self.expansion
    }

    #[inline]
    pub fn image_slot(&self) -> ImageSlot {
        self.image
    }

    /// URI whose size is still needed, if any.
    pub fn pending_image(&self) -> Option<&str> {
        match self.image {
            ImageSlot::Pending => self.record.image_url.as_deref(),
            ImageSlot::Missing | ImageSlot::Ready => None,
        }
    }

    pub fn tap(&mut self) -> TapOutcome {
        self.expansion.tap()
    }

    pub fn tick(&mut self, dt: Duration) -> bool {
        self.expansion.tick(dt)
    }

    #[inline]
    pub fn is_animating(&self) -> bool {
        self.expansion.phase().is_animating()
    }

    /// Publish the image aspect ratio. Only the first result for a pending
    /// image is applied.
    pub fn image_resolved(&mut self, aspect_ratio: f32) -> bool {
        if self.image != ImageSlot::Pending {
            return false;
        }
        self.expansion.set_aspect_ratio(aspect_ratio);
        self.image = ImageSlot::Ready;
        true
    }

    pub fn category_measured(&mut self, height: f32) -> HeightUpdate {
        self.expansion.report_category_height(height)
    }

    /// Outer height of the card as it would be drawn now.
    pub fn estimated_height(&self) -> f32 {
        let view = self.expansion.view();
        self.height_for(&self.image_frame(&view.frame), &view)
    }

    /// Snapshot for drawing at `now`.
    pub fn frame(&self, now: DateTime<Utc>) -> CardFrame {
        let view = self.expansion.view();
        let image = self.image_frame(&view.frame);
        let height = self.height_for(&image, &view);

        CardFrame {
            id: self.record.id.clone(),
            title: self.record.name.clone(),
            title_line_limit: view.title_line_limit,
            date_label: self.record.date_label(),
            is_new: self.record.is_recent(now),
            phase: view.phase,
            progress: view.progress,
            chevron: view.chevron,
            image,
            categories: self.record.categories.clone(),
            visual: view.frame,
            height,
        }
    }

    fn image_frame(&self, visual: &VisualFrame) -> ImageFrame {
        match self.record.image_url.as_deref() {
            None => ImageFrame::Fallback {
                glyph: FALLBACK_GLYPH,
                size: self.config.image_width,
            },
            Some(uri) => ImageFrame::Image {
                uri: uri.to_owned(),
                width: self.config.image_width,
                height: self.config.image_width / visual.image_aspect_ratio,
            },
        }
    }

    fn height_for(&self, image: &ImageFrame, view: &ExpansionView) -> f32 {
        let image_height = match image {
            ImageFrame::Fallback { size, .. } => *size,
            ImageFrame::Image { height, .. } => *height,
        };
        let title_height = view
            .frame
            .title_max_height
            .min(self.config.title.line_height * f32::from(view.title_line_limit));
        let text_height = title_height + self.config.meta_row_height + view.frame.category_height;
        image_height.max(text_height) + 2.0 * self.config.padding
    }
}

impl Recyclable for ItemCard {
    type Data = DisplayRecord;

    fn rebind(&mut self, record: DisplayRecord) {
        self.image = slot_for(&record);
        self.expansion = ExpansionState::new(self.config.transition(), self.config.title);
        self.record = record;
    }
}

fn slot_for(record: &DisplayRecord) -> ImageSlot {
    if record.image_url.is_some() {
        ImageSlot::Pending
    } else {
        ImageSlot::Missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use stockview_core::RawRecord;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap()
    }

    fn card(image: Option<&str>) -> ItemCard {
        let mut raw = RawRecord::new("r1")
            .with_name("Label printer")
            .with_posted("2024-03-01T08:00:00Z")
            .with_categories("Office, Printing");
        raw.fields.image = image.map(str::to_owned);
        ItemCard::new(DisplayRecord::from_raw(&raw), CardConfig::default())
    }

    #[test]
    fn missing_image_uses_fallback_glyph() {
        let card = card(None);
        assert_eq!(card.image_slot(), ImageSlot::Missing);
        assert_eq!(card.pending_image(), None);
        let frame = card.frame(now());
        assert_eq!(
            frame.image,
            ImageFrame::Fallback {
                glyph: FALLBACK_GLYPH,
                size: 85.0
            }
        );
    }

    #[test]
    fn image_resolution_applies_once() {
        let mut card = card(Some("file:///a.png"));
        assert_eq!(card.pending_image(), Some("file:///a.png"));
        assert!(card.image_resolved(2.0));
        assert!(!card.image_resolved(0.5));
        assert_eq!(card.expansion().resolved_aspect_ratio(), 2.0);
        assert_eq!(card.pending_image(), None);
    }

    #[test]
    fn collapsed_image_is_square() {
        let mut card = card(Some("file:///a.png"));
        card.image_resolved(2.0);
        let ImageFrame::Image { width, height, .. } = card.frame(now()).image else {
            panic!("expected image frame");
        };
        assert_eq!(width, 85.0);
        assert_eq!(height, 85.0);
    }

    #[test]
    fn expanded_image_uses_aspect_ratio() {
        let mut card = card(Some("file:///a.png"));
        card.image_resolved(2.0);
        card.tap();
        card.tick(Duration::from_millis(500));
        let ImageFrame::Image { height, .. } = card.frame(now()).image else {
            panic!("expected image frame");
        };
        assert_eq!(height, 42.5);
    }

    #[test]
    fn frame_carries_badge_and_date() {
        let frame = card(None).frame(now());
        assert!(frame.is_new);
        assert_eq!(frame.date_label.as_deref(), Some("3/1/2024"));
        assert_eq!(frame.chevron, Chevron::Down);
        assert_eq!(frame.title_line_limit, 1);
        assert_eq!(frame.categories, vec!["Office", "Printing"]);
    }

    #[test]
    fn stale_record_has_no_badge() {
        let later = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();
        assert!(!card(None).frame(later).is_new);
    }

    #[test]
    fn rebind_resets_state() {
        let mut card = card(Some("file:///a.png"));
        card.image_resolved(3.0);
        card.tap();
        card.tick(Duration::from_millis(500));
        assert_eq!(card.expansion().phase(), Phase::Expanded);

        let other = DisplayRecord::from_raw(&RawRecord::new("r2").with_posted("2024-01-01"));
        card.rebind(other);
        assert_eq!(card.id().as_str(), "r2");
        assert_eq!(card.expansion().phase(), Phase::Collapsed);
        assert_eq!(card.expansion().resolved_aspect_ratio(), 1.0);
        assert_eq!(card.image_slot(), ImageSlot::Missing);
    }

    #[test]
    fn height_grows_with_categories() {
        let mut card = card(None);
        card.category_measured(56.0);
        let collapsed = card.frame(now()).height;
        card.tap();
        card.tick(Duration::from_millis(500));
        let expanded = card.frame(now()).height;
        assert!(expanded > collapsed);
        assert_eq!(card.estimated_height(), expanded);
    }

    #[test]
    fn collapsed_card_matches_list_estimate() {
        assert_eq!(card(None).estimated_height(), 109.0);
    }
}
