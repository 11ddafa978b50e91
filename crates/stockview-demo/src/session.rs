#![forbid(unsafe_code)]

//! One headless run of the inventory screen.
//!
//! A [`Session`] plays the navigation host: it owns the focus bus, holds
//! the screen's subscription, and pumps the program until background work
//! and animations have settled.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use stockview::{
    FocusBus, FocusSubscription, InventoryScreen, JsonFileSource, LocalImageSource, Msg, Program,
    ScreenConfig, ScreenView,
};

use crate::cli::Opts;

/// Longest wait for background tasks per step.
const TASK_TIMEOUT: Duration = Duration::from_secs(10);
/// Upper bound on frames per settle, so a stuck animation cannot hang.
const MAX_FRAMES: usize = 2_000;

pub struct Session {
    program: Program<InventoryScreen>,
    bus: FocusBus,
    subscription: Option<FocusSubscription>,
}

impl Session {
    /// Build the screen from `opts` and subscribe it to focus.
    pub fn open(opts: &Opts) -> stockview::Result<Self> {
        let mut config = ScreenConfig::load(opts.config.as_deref())?;
        config.card.card_width = opts.width;

        let base_dir = opts.inventory.parent().unwrap_or(Path::new("."));
        let screen = InventoryScreen::new(config, Arc::new(JsonFileSource::new(&opts.inventory)))
            .with_images(Arc::new(LocalImageSource::new().with_base_dir(base_dir)));

        let mut program = Program::new(screen);
        program.init();
        program.dispatch(Msg::Resize {
            width: opts.width,
            height: opts.viewport,
        });

        let bus = FocusBus::new();
        let sender = program.sender();
        let subscription = bus.subscribe(move || {
            sender.send(Msg::Focus);
        });
        tracing::info!(inventory = %opts.inventory.display(), "session opened");

        Ok(Self {
            program,
            bus,
            subscription: Some(subscription),
        })
    }

    /// Activate the screen through the navigation bus.
    pub fn focus(&mut self) {
        self.bus.emit_focus();
        self.settle();
    }

    pub fn refresh(&mut self) {
        self.program.dispatch(Msg::PullToRefresh);
        self.settle();
    }

    pub fn tap(&mut self, id: &str) {
        self.program.dispatch(Msg::Tap(id.into()));
        self.settle();
    }

    pub fn scroll(&mut self, delta: f32) {
        self.program.dispatch(Msg::Scroll(delta));
        self.settle();
    }

    /// Run tasks and frames until nothing is pending.
    pub fn settle(&mut self) {
        let mut frames = 0;
        loop {
            self.program.pump();
            if !self.program.wait_idle(TASK_TIMEOUT) {
                tracing::warn!(
                    pending = self.program.pending_tasks(),
                    "background tasks still running"
                );
            }
            let Some(dt) = self.program.tick_rate() else {
                break;
            };
            if frames >= MAX_FRAMES {
                tracing::warn!(frames, "frame limit reached");
                break;
            }
            self.program.advance(dt);
            frames += 1;
        }
        tracing::debug!(frames, "session settled");
    }

    pub fn view(&self) -> ScreenView {
        self.program.view()
    }

    /// Unsubscribe from focus and tear the screen down.
    pub fn close(&mut self) {
        self.subscription.take();
        self.program.dispatch(Msg::Teardown);
        tracing::info!("session closed");
    }

    pub fn focus_subscribers(&self) -> usize {
        self.bus.subscriber_count()
    }
}
