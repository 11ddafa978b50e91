#![forbid(unsafe_code)]

//! The inventory list screen.
//!
//! [`InventoryScreen`] is the [`Model`] that ties the pieces together: the
//! [`SyncController`] owns the collection, the [`VirtualizedList`] decides
//! which indices are rendered, and one [`ItemCard`] per rendered record id
//! lives in a [`ViewPool`]. Fetches and image probes run as background
//! tasks and come back as [`Msg::FetchCompleted`] and [`Msg::ImageResolved`].
//!
//! Results that arrive for a card that has since been evicted, or after
//! [`Msg::Teardown`], are dropped.

use std::collections::HashSet;
use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use stockview_core::geometry::PixelSize;
use stockview_core::{Clock, DisplayRecord, Event, RecordId, SystemClock};
use stockview_widgets::{
    CardFrame, ChipFlowLayout, HeightOracle, ItemCard, Recyclable, TapOutcome, ViewPool,
    VirtualizedList,
};

use crate::config::ScreenConfig;
use crate::error::ImageError;
use crate::images::{ImageGeometryResolver, ImageSizeSource, LocalImageSource, ResolveRequest};
use crate::program::{Cmd, Model};
use crate::source::{FetchResult, InventorySource};
use crate::sync::{FetchTicket, FetchTrigger, SyncController, SyncOutcome};

/// Frame interval requested while something is moving.
pub const FRAME: Duration = Duration::from_millis(16);

/// Everything that can happen to the screen.
#[derive(Debug)]
pub enum Msg {
    /// Navigation focus gained.
    Focus,
    /// Navigation focus lost.
    Blur,
    PullToRefresh,
    Tap(RecordId),
    Tick(Duration),
    /// Scroll by a pixel delta.
    Scroll(f32),
    Resize { width: f32, height: f32 },
    FetchCompleted {
        ticket: FetchTicket,
        result: FetchResult,
    },
    ImageResolved {
        uri: String,
        result: Result<PixelSize, ImageError>,
    },
    /// The screen is being destroyed.
    Teardown,
}

impl Msg {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Focus => "focus",
            Self::Blur => "blur",
            Self::PullToRefresh => "pull_to_refresh",
            Self::Tap(_) => "tap",
            Self::Tick(_) => "tick",
            Self::Scroll(_) => "scroll",
            Self::Resize { .. } => "resize",
            Self::FetchCompleted { .. } => "fetch_completed",
            Self::ImageResolved { .. } => "image_resolved",
            Self::Teardown => "teardown",
        }
    }
}

impl From<Event> for Msg {
    fn from(event: Event) -> Self {
        match event {
            Event::Tap(id) => Self::Tap(id),
            Event::Focus(true) => Self::Focus,
            Event::Focus(false) => Self::Blur,
            Event::PullToRefresh => Self::PullToRefresh,
            Event::Scroll { delta } => Self::Scroll(delta),
            Event::Resize { width, height } => Self::Resize { width, height },
            Event::Tick(dt) => Self::Tick(dt),
        }
    }
}

/// One rendered row.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemView {
    pub index: usize,
    /// Top offset within the list content.
    pub top: f32,
    pub card: CardFrame,
}

/// Snapshot of the whole screen.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenView {
    /// Drives the refresh spinner.
    pub fetching: bool,
    pub total_len: usize,
    pub rendered_range: Range<usize>,
    pub items: Vec<ItemView>,
    pub scroll_offset: f32,
    pub content_height: f32,
}

/// The list screen model.
pub struct InventoryScreen {
    config: ScreenConfig,
    source: Arc<dyn InventorySource>,
    images: Arc<dyn ImageSizeSource>,
    clock: Arc<dyn Clock>,
    sync: SyncController,
    list: VirtualizedList,
    pool: ViewPool<ItemCard>,
    oracle: HeightOracle<ChipFlowLayout>,
    resolver: ImageGeometryResolver,
    torn_down: bool,
}

impl std::fmt::Debug for InventoryScreen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryScreen")
            .field("fetching", &self.sync.fetching())
            .field("records", &self.sync.records().len())
            .field("rendered", &self.list.rendered_range())
            .field("live_cards", &self.pool.live())
            .field("torn_down", &self.torn_down)
            .finish()
    }
}

impl InventoryScreen {
    pub fn new(config: ScreenConfig, source: Arc<dyn InventorySource>) -> Self {
        let oracle = HeightOracle::with_capacity(
            ChipFlowLayout::new(config.chips),
            config.measure_cache_capacity,
        );
        Self {
            sync: SyncController::new(config.fetch_policy),
            list: VirtualizedList::new(config.window),
            pool: ViewPool::new(),
            oracle,
            resolver: ImageGeometryResolver::new(),
            images: Arc::new(LocalImageSource::new()),
            clock: Arc::new(SystemClock),
            source,
            config,
            torn_down: false,
        }
    }

    #[must_use]
    pub fn with_images(mut self, images: Arc<dyn ImageSizeSource>) -> Self {
        self.images = images;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &ScreenConfig {
        &self.config
    }

    pub fn sync(&self) -> &SyncController {
        &self.sync
    }

    pub fn list(&self) -> &VirtualizedList {
        &self.list
    }

    pub fn pool(&self) -> &ViewPool<ItemCard> {
        &self.pool
    }

    /// The live card for `id`, if it is rendered.
    pub fn card(&self, id: &RecordId) -> Option<&ItemCard> {
        self.pool.get(id)
    }

    pub fn resolver(&self) -> &ImageGeometryResolver {
        &self.resolver
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    // -- handlers ------------------------------------------------------------

    fn start_fetch(&mut self, trigger: FetchTrigger) -> Cmd<Msg> {
        let Some(ticket) = self.sync.begin(trigger) else {
            return Cmd::none();
        };
        let source = Arc::clone(&self.source);
        Cmd::task_named("fetch", move || Msg::FetchCompleted {
            ticket,
            result: source.list_inventory(),
        })
    }

    fn on_fetch_completed(&mut self, ticket: FetchTicket, result: FetchResult) -> Cmd<Msg> {
        match self.sync.complete(ticket, result) {
            SyncOutcome::Replaced { len } => {
                self.list.set_len(len);
                let cmd = self.sync_window(true);
                self.with_frames(cmd, false)
            }
            SyncOutcome::Failed | SyncOutcome::Discarded => Cmd::none(),
        }
    }

    fn on_tap(&mut self, id: &RecordId) -> Cmd<Msg> {
        let Some(card) = self.pool.get_mut(id) else {
            tracing::trace!(record_id = %id, "tap on card that is not rendered");
            return Cmd::none();
        };
        match card.tap() {
            TapOutcome::Started(_) => Cmd::tick(FRAME),
            TapOutcome::Ignored(_) => Cmd::none(),
        }
    }

    fn on_tick(&mut self, dt: Duration) -> Cmd<Msg> {
        let mut animating = false;
        for (_, card) in self.pool.iter_mut() {
            card.tick(dt);
            animating |= card.is_animating();
        }
        let cmd = self.sync_window(false);
        self.with_frames(cmd, animating)
    }

    fn on_image_resolved(&mut self, uri: &str, result: Result<PixelSize, ImageError>) -> Cmd<Msg> {
        let (aspect_ratio, waiters) = self.resolver.finish(uri, result);
        let mut applied = 0usize;
        for id in waiters {
            let Some(card) = self.pool.get_mut(&id) else {
                tracing::trace!(record_id = %id, uri, "image result for evicted card discarded");
                continue;
            };
            if card.record().image_url.as_deref() == Some(uri) && card.image_resolved(aspect_ratio)
            {
                applied += 1;
            }
        }
        if applied == 0 {
            return Cmd::none();
        }
        self.refresh_heights();
        Cmd::none()
    }

    fn teardown(&mut self) -> Cmd<Msg> {
        self.torn_down = true;
        self.sync.detach();
        self.resolver.abandon_waiters();
        self.pool.clear();
        let stats = self.oracle.stats();
        tracing::debug!(
            measure_hits = stats.hits,
            measure_misses = stats.misses,
            "inventory screen torn down"
        );
        Cmd::none()
    }

    // -- window --------------------------------------------------------------

    /// Advance the render window one step and bring the cards in line with
    /// it: release cards that left, bind cards that entered, measure their
    /// category blocks, request image sizes, and feed heights back into the
    /// list. Returns the image probes to start.
    fn sync_window(&mut self, collection_replaced: bool) -> Cmd<Msg> {
        let range = self.list.step();
        let records = Arc::clone(self.sync.records());
        let rendered = &records[range.clone()];

        let keep: HashSet<RecordId> = rendered.iter().map(|r| r.id.clone()).collect();
        let evicted = self.pool.release_except(&keep);
        if !evicted.is_empty() {
            tracing::trace!(evicted = evicted.len(), live = self.pool.live(), "cards released");
        }

        let card_config = self.config.card;
        let width = card_config.category_width();
        let mut probes = Vec::new();
        for (index, raw) in range.zip(rendered) {
            if collection_replaced
                && let Some(card) = self.pool.get_mut(&raw.id)
            {
                let fresh = DisplayRecord::from_raw(raw);
                if card.record() != &fresh {
                    card.rebind(fresh);
                }
            }
            let card = self.pool.acquire(
                raw.id.clone(),
                || DisplayRecord::from_raw(raw),
                |record| ItemCard::new(record, card_config),
            );

            let category_height = self
                .oracle
                .measure(&raw.id, &card.record().categories, width);
            card.category_measured(category_height);

            if let Some(uri) = card.pending_image().map(str::to_owned) {
                match self.resolver.request(&uri, raw.id.clone()) {
                    ResolveRequest::Cached(aspect_ratio) => {
                        card.image_resolved(aspect_ratio);
                    }
                    ResolveRequest::Started => {
                        probes.push(probe_image(Arc::clone(&self.images), uri));
                    }
                    ResolveRequest::Joined => {}
                }
            }

            self.list.set_item_height(index, card.estimated_height());
        }
        Cmd::batch(probes)
    }

    /// Push current card heights into the list without moving the window.
    fn refresh_heights(&mut self) {
        let range = self.list.rendered_range();
        let records = Arc::clone(self.sync.records());
        for (index, raw) in range.zip(&records[self.list.rendered_range()]) {
            if let Some(card) = self.pool.get(&raw.id) {
                self.list.set_item_height(index, card.estimated_height());
            }
        }
    }

    fn window_settled(&self) -> bool {
        self.list.viewport_height() <= 0.0 || self.list.rendered_range() == self.list.target_range()
    }

    /// Add a frame request when cards are animating or the window is still
    /// converging.
    fn with_frames(&self, cmd: Cmd<Msg>, animating: bool) -> Cmd<Msg> {
        if animating || !self.window_settled() {
            Cmd::batch(vec![cmd, Cmd::tick(FRAME)])
        } else {
            cmd
        }
    }
}

fn probe_image(images: Arc<dyn ImageSizeSource>, uri: String) -> Cmd<Msg> {
    Cmd::task_named("image-size", move || {
        let result = images.resolve_size(&uri);
        Msg::ImageResolved { uri, result }
    })
}

impl Model for InventoryScreen {
    type Message = Msg;
    type View = ScreenView;

    fn update(&mut self, msg: Msg) -> Cmd<Msg> {
        if self.torn_down {
            tracing::trace!(msg = msg.kind(), "message after teardown discarded");
            return Cmd::none();
        }
        match msg {
            Msg::Focus => self.start_fetch(FetchTrigger::Activated),
            Msg::Blur => Cmd::none(),
            Msg::PullToRefresh => {
                self.resolver.forget_failures();
                self.start_fetch(FetchTrigger::PullToRefresh)
            }
            Msg::Tap(id) => self.on_tap(&id),
            Msg::Tick(dt) => self.on_tick(dt),
            Msg::Scroll(delta) => {
                self.list.scroll_by(delta);
                let cmd = self.sync_window(false);
                self.with_frames(cmd, false)
            }
            Msg::Resize { width, height } => {
                if width.is_finite() && width > 0.0 {
                    self.config.card.card_width = width;
                }
                self.list.set_viewport_height(height);
                let cmd = self.sync_window(false);
                self.with_frames(cmd, false)
            }
            Msg::FetchCompleted { ticket, result } => self.on_fetch_completed(ticket, result),
            Msg::ImageResolved { uri, result } => self.on_image_resolved(&uri, result),
            Msg::Teardown => self.teardown(),
        }
    }

    fn view(&self) -> ScreenView {
        let now = self.clock.now();
        let range = self.list.rendered_range();
        let records = self.sync.records();
        let items = range
            .clone()
            .zip(&records[range.clone()])
            .filter_map(|(index, raw)| {
                self.pool.get(&raw.id).map(|card| ItemView {
                    index,
                    top: self.list.item_offset(index),
                    card: card.frame(now),
                })
            })
            .collect();
        ScreenView {
            fetching: self.sync.fetching(),
            total_len: records.len(),
            rendered_range: range,
            items,
            scroll_offset: self.list.scroll_offset(),
            content_height: self.list.content_height(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::ProgramSimulator;
    use crate::source::StaticSource;
    use chrono::{TimeZone, Utc};
    use stockview_core::{FixedClock, RawRecord};
    use stockview_widgets::Phase;

    fn inventory(n: usize) -> Vec<RawRecord> {
        (0..n)
            .map(|i| {
                RawRecord::new(format!("r{i}"))
                    .with_name(format!("Item {i}"))
                    .with_posted("2024-03-01T00:00:00Z")
                    .with_categories("Tools, Hardware")
            })
            .collect()
    }

    fn screen(records: Vec<RawRecord>) -> ProgramSimulator<InventoryScreen> {
        let clock = FixedClock(Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap());
        let screen = InventoryScreen::new(
            ScreenConfig::default(),
            Arc::new(StaticSource::new(records)),
        )
        .with_clock(Arc::new(clock));
        let mut sim = ProgramSimulator::new(screen);
        sim.init();
        sim.send(Msg::Resize {
            width: 360.0,
            height: 800.0,
        });
        sim
    }

    fn loaded(n: usize) -> ProgramSimulator<InventoryScreen> {
        let mut sim = screen(inventory(n));
        sim.send(Msg::Focus);
        sim.run_all_tasks();
        sim
    }

    #[test]
    fn focus_fetches_and_renders() {
        let mut sim = screen(inventory(3));
        sim.send(Msg::Focus);
        assert!(sim.view().fetching);
        assert_eq!(sim.task_names(), vec![Some("fetch")]);
        sim.run_all_tasks();

        let view = sim.view();
        assert!(!view.fetching);
        assert_eq!(view.total_len, 3);
        assert_eq!(view.items.len(), 3);
        assert!(view.items.iter().all(|item| item.card.is_new));
        assert_eq!(view.items[1].top, 121.0);
    }

    #[test]
    fn every_focus_refetches() {
        let mut sim = loaded(2);
        sim.send(Msg::Blur);
        sim.send(Msg::Focus);
        assert_eq!(sim.pending_tasks(), 1);
        sim.run_all_tasks();
        assert_eq!(sim.view().total_len, 2);
    }

    #[test]
    fn tap_expands_and_settles() {
        let mut sim = loaded(2);
        let id = RecordId::new("r0");
        sim.send(Msg::Tap(id.clone()));
        assert_eq!(sim.tick_rate(), Some(FRAME));
        sim.advance_by(Duration::from_millis(250), FRAME);
        assert_eq!(sim.model().card(&id).unwrap().expansion().phase(), Phase::Expanding);

        sim.send(Msg::Tap(id.clone()));
        assert_eq!(sim.model().card(&id).unwrap().expansion().phase(), Phase::Expanding);

        sim.advance_by(Duration::from_millis(300), FRAME);
        let card = sim.model().card(&id).unwrap();
        assert_eq!(card.expansion().phase(), Phase::Expanded);
        assert!(sim.view().items[0].card.height > 109.0);
        assert!(sim.view().items[1].top > 121.0);
    }

    #[test]
    fn tick_request_stops_when_idle() {
        let mut sim = loaded(1);
        sim.send(Msg::Tap(RecordId::new("r0")));
        sim.advance_by(Duration::from_millis(600), FRAME);
        sim.advance(FRAME);
        assert_eq!(sim.tick_rate(), None);
    }

    #[test]
    fn tap_on_unrendered_card_is_ignored() {
        let mut sim = loaded(1);
        sim.send(Msg::Tap(RecordId::new("missing")));
        assert_eq!(sim.tick_rate(), None);
    }

    #[test]
    fn image_probe_is_shared_per_uri() {
        let records = vec![
            RawRecord::new("a").with_image("data:x").with_posted("2024-03-01"),
            RawRecord::new("b").with_image("data:x").with_posted("2024-03-01"),
        ];
        let mut sim = screen(records);
        sim.send(Msg::Focus);
        sim.run_next_task();
        assert_eq!(sim.task_names(), vec![Some("image-size")]);
    }

    #[test]
    fn image_result_applies_to_every_waiter() {
        let records = vec![
            RawRecord::new("a").with_image("wide.png").with_posted("2024-03-01"),
            RawRecord::new("b").with_image("wide.png").with_posted("2024-03-01"),
        ];
        let mut sim = screen(records);
        sim.send(Msg::Focus);
        sim.run_next_task();
        sim.discard_task_at(0);
        sim.send(Msg::ImageResolved {
            uri: "wide.png".into(),
            result: Ok(PixelSize::new(400, 200)),
        });
        for id in ["a", "b"] {
            let card = sim.model().card(&RecordId::new(id)).unwrap();
            assert_eq!(card.expansion().resolved_aspect_ratio(), 2.0);
        }
    }

    #[test]
    fn failed_image_falls_back_to_square() {
        let records = vec![RawRecord::new("a").with_image("https://cdn/x.png")];
        let mut sim = screen(records);
        sim.send(Msg::Focus);
        sim.run_all_tasks();
        let card = sim.model().card(&RecordId::new("a")).unwrap();
        assert_eq!(card.expansion().resolved_aspect_ratio(), 1.0);
        assert_eq!(card.pending_image(), None);
    }

    #[test]
    fn teardown_discards_late_results() {
        let mut sim = screen(inventory(3));
        sim.send(Msg::Focus);
        sim.send(Msg::Teardown);
        sim.run_all_tasks();
        let view = sim.view();
        assert_eq!(view.total_len, 0);
        assert!(!view.fetching);
        sim.send(Msg::Focus);
        assert_eq!(sim.pending_tasks(), 0);
    }

    #[test]
    fn refresh_keeps_expanded_unchanged_cards() {
        let mut sim = loaded(2);
        let id = RecordId::new("r1");
        sim.send(Msg::Tap(id.clone()));
        sim.advance_by(Duration::from_millis(500), FRAME);
        sim.send(Msg::PullToRefresh);
        sim.run_all_tasks();
        assert_eq!(sim.model().card(&id).unwrap().expansion().phase(), Phase::Expanded);
    }

    #[test]
    fn msg_from_event() {
        assert!(matches!(Msg::from(Event::Focus(true)), Msg::Focus));
        assert!(matches!(Msg::from(Event::Focus(false)), Msg::Blur));
        assert!(matches!(Msg::from(Event::Scroll { delta: 3.0 }), Msg::Scroll(d) if d == 3.0));
    }
}
