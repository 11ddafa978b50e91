#![forbid(unsafe_code)]

//! Structured logging tests for the fetch lifecycle.
//!
//! Fetch start and success log at `debug` with `ticket` and `in_flight`
//! fields; a failed fetch logs at `warn` with the same fields plus `error`.
//! Absorbed image failures log at `warn` with the `uri`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use stockview_core::RawRecord;
use stockview_runtime::{
    FetchError, InventoryScreen, Msg, ProgramSimulator, ScreenConfig, StaticSource, SyncController,
};
use tracing_subscriber::layer::SubscriberExt;

// ============================================================================
// Test Infrastructure
// ============================================================================

#[derive(Debug, Clone)]
struct CapturedEvent {
    level: tracing::Level,
    fields: HashMap<String, String>,
}

struct EventCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for EventCapture {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut visitor = FieldVisitor(Vec::new());
        event.record(&mut visitor);
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            fields: visitor.0.into_iter().collect(),
        });
    }
}

fn with_captured_events<F: FnOnce()>(f: F) -> Vec<CapturedEvent> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let layer = EventCapture {
        events: events.clone(),
    };
    let subscriber = tracing_subscriber::registry().with(layer);
    tracing::subscriber::with_default(subscriber, f);
    let captured = events.lock().unwrap().clone();
    captured
}

fn message(event: &CapturedEvent) -> &str {
    event.fields.get("message").map(String::as_str).unwrap_or("")
}

fn field<'a>(event: &'a CapturedEvent, name: &str) -> Option<&'a str> {
    event.fields.get(name).map(String::as_str)
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn fetch_lifecycle_logs_ticket_and_in_flight() {
    let events = with_captured_events(|| {
        let mut sync = SyncController::default();
        let a = sync.notify_activated().unwrap();
        let b = sync.on_pull_to_refresh().unwrap();
        sync.complete(a, Ok(vec![RawRecord::new("x")]));
        sync.complete(b, Err(FetchError::source_error("offline")));
    });

    let started: Vec<&CapturedEvent> = events
        .iter()
        .filter(|e| message(e) == "fetch started")
        .collect();
    assert_eq!(started.len(), 2);
    assert_eq!(field(started[1], "ticket"), Some("1"));
    assert_eq!(field(started[1], "in_flight"), Some("2"));
    assert_eq!(field(started[1], "trigger"), Some("pull_to_refresh"));

    let failed = events
        .iter()
        .find(|e| message(e).starts_with("fetch failed"))
        .expect("failure event");
    assert_eq!(failed.level, tracing::Level::WARN);
    assert_eq!(field(failed, "ticket"), Some("1"));
    assert_eq!(field(failed, "in_flight"), Some("0"));
    assert!(field(failed, "error").unwrap().contains("offline"));
}

#[test]
fn duplicate_ids_warn() {
    let events = with_captured_events(|| {
        let mut sync = SyncController::default();
        let t = sync.notify_activated().unwrap();
        sync.complete(t, Ok(vec![RawRecord::new("dup"), RawRecord::new("dup")]));
    });
    let dup: Vec<&CapturedEvent> = events
        .iter()
        .filter(|e| message(e).contains("duplicate record id"))
        .collect();
    assert_eq!(dup.len(), 1);
    assert_eq!(dup[0].level, tracing::Level::WARN);
    assert_eq!(field(dup[0], "record_id"), Some("dup"));
}

#[test]
fn image_failure_warns_with_uri() {
    let events = with_captured_events(|| {
        let records = vec![
            RawRecord::new("a")
                .with_image("ftp://host/a.png")
                .with_posted("2024-01-01"),
        ];
        let screen = InventoryScreen::new(
            ScreenConfig::default(),
            Arc::new(StaticSource::new(records)),
        );
        let mut sim = ProgramSimulator::new(screen);
        sim.send(Msg::Resize {
            width: 360.0,
            height: 640.0,
        });
        sim.send(Msg::Focus);
        sim.run_all_tasks();
    });

    let warned = events
        .iter()
        .find(|e| message(e).starts_with("image size unavailable"))
        .expect("image warning");
    assert_eq!(warned.level, tracing::Level::WARN);
    assert_eq!(field(warned, "uri"), Some("ftp://host/a.png"));
}

#[test]
fn malformed_record_warns_once_per_bind() {
    let events = with_captured_events(|| {
        let records = vec![RawRecord::new("bad").with_posted("yesterday")];
        let screen = InventoryScreen::new(
            ScreenConfig::default(),
            Arc::new(StaticSource::new(records)),
        );
        let mut sim = ProgramSimulator::new(screen);
        sim.send(Msg::Resize {
            width: 360.0,
            height: 640.0,
        });
        sim.send(Msg::Focus);
        sim.run_all_tasks();
        let view = sim.view();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].card.date_label, None);
        assert!(!view.items[0].card.is_new);
    });

    let degraded = events
        .iter()
        .filter(|e| message(e) == "rendering degraded record")
        .count();
    assert_eq!(degraded, 1);
}
