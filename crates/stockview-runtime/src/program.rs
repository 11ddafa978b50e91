#![forbid(unsafe_code)]

//! Elm-style program loop.
//!
//! A [`Model`] owns all state and changes only inside [`Model::update`].
//! Side effects are returned as [`Cmd`]s. Background tasks run on their own
//! threads and post their result message back over a channel; the loop
//! thread applies it on the next [`Program::pump`].
//!
//! # Example
//!
//! ```ignore
//! let mut program = Program::new(InventoryScreen::new(config, source));
//! program.init();
//! program.dispatch(Msg::Focus);
//! program.wait_idle(Duration::from_secs(5));
//! let view = program.view();
//! ```

use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use stockview_core::Event;
use tracing::{debug, info, warn};

/// Application state and behavior.
pub trait Model: Sized {
    /// Messages that drive state changes. Input events convert into them.
    type Message: From<Event> + Send + 'static;

    /// Snapshot handed to the host for drawing.
    type View;

    /// Startup commands.
    fn init(&mut self) -> Cmd<Self::Message> {
        Cmd::none()
    }

    /// The state transition function.
    fn update(&mut self, msg: Self::Message) -> Cmd<Self::Message>;

    /// Current view.
    fn view(&self) -> Self::View;
}

/// Metadata for background tasks.
#[derive(Debug, Clone, Default)]
pub struct TaskSpec {
    /// Task name, used for thread names and logs.
    pub name: Option<String>,
}

impl TaskSpec {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }
}

/// Side effects requested by the model.
#[derive(Default)]
pub enum Cmd<M> {
    #[default]
    None,
    /// Execute several commands in order.
    Batch(Vec<Cmd<M>>),
    /// Feed a message straight back into `update`.
    Msg(M),
    /// Request frame ticks at this interval. The host keeps ticking while
    /// the model keeps asking.
    Tick(Duration),
    /// Emit a log line.
    Log(String),
    /// Run a blocking closure off the loop thread; its return value is
    /// delivered back to `update`.
    Task(TaskSpec, Box<dyn FnOnce() -> M + Send>),
}

impl<M: std::fmt::Debug> std::fmt::Debug for Cmd<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Batch(cmds) => f.debug_tuple("Batch").field(cmds).finish(),
            Self::Msg(m) => f.debug_tuple("Msg").field(m).finish(),
            Self::Tick(d) => f.debug_tuple("Tick").field(d).finish(),
            Self::Log(s) => f.debug_tuple("Log").field(s).finish(),
            Self::Task(spec, _) => f.debug_struct("Task").field("spec", spec).finish(),
        }
    }
}

impl<M> Cmd<M> {
    #[inline]
    pub fn none() -> Self {
        Self::None
    }

    #[inline]
    pub fn msg(m: M) -> Self {
        Self::Msg(m)
    }

    #[inline]
    pub fn log(msg: impl Into<String>) -> Self {
        Self::Log(msg.into())
    }

    #[inline]
    pub fn tick(interval: Duration) -> Self {
        Self::Tick(interval)
    }

    /// Collapse a list of commands, dropping no-ops.
    pub fn batch(cmds: Vec<Self>) -> Self {
        let mut cmds: Vec<Self> = cmds.into_iter().filter(|c| !c.is_none()).collect();
        if cmds.len() > 1 {
            return Self::Batch(cmds);
        }
        cmds.pop().unwrap_or(Self::None)
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn task<F>(f: F) -> Self
    where
        F: FnOnce() -> M + Send + 'static,
    {
        Self::Task(TaskSpec::default(), Box::new(f))
    }

    pub fn task_named<F>(name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce() -> M + Send + 'static,
    {
        Self::Task(TaskSpec::named(name), Box::new(f))
    }

    /// Stable name for tracing.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Batch(_) => "Batch",
            Self::Msg(_) => "Msg",
            Self::Tick(_) => "Tick",
            Self::Log(_) => "Log",
            Self::Task(..) => "Task",
        }
    }
}

// ---------------------------------------------------------------------------
// Program
// ---------------------------------------------------------------------------

enum Envelope<M> {
    /// Result of a task spawned by this program.
    TaskDone(M),
    /// Message posted from outside the loop.
    External(M),
}

/// Handle for posting messages into a running [`Program`] from any thread.
pub struct ProgramSender<M> {
    tx: mpsc::Sender<Envelope<M>>,
}

impl<M> Clone for ProgramSender<M> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<M> ProgramSender<M> {
    /// Post a message. Returns `false` once the program is gone.
    pub fn send(&self, msg: M) -> bool {
        self.tx.send(Envelope::External(msg)).is_ok()
    }
}

/// Threaded executor for a [`Model`].
pub struct Program<M: Model> {
    model: M,
    tx: mpsc::Sender<Envelope<M::Message>>,
    rx: mpsc::Receiver<Envelope<M::Message>>,
    pending_tasks: usize,
    tick_rate: Option<Duration>,
    logs: Vec<String>,
}

impl<M: Model> Program<M> {
    pub fn new(model: M) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            model,
            tx,
            rx,
            pending_tasks: 0,
            tick_rate: None,
            logs: Vec::new(),
        }
    }

    pub fn init(&mut self) {
        let cmd = self.model.init();
        self.execute(cmd);
    }

    /// Apply a message now.
    pub fn dispatch(&mut self, msg: M::Message) {
        let cmd = self.model.update(msg);
        self.execute(cmd);
    }

    pub fn inject_event(&mut self, event: Event) {
        self.dispatch(M::Message::from(event));
    }

    /// Advance animations by `dt`. Clears the tick request; the model
    /// renews it if it still needs frames.
    pub fn advance(&mut self, dt: Duration) {
        self.tick_rate = None;
        self.inject_event(Event::Tick(dt));
    }

    /// Apply every message already waiting. Returns how many were applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(envelope) = self.rx.try_recv() {
            self.receive(envelope);
            applied += 1;
        }
        applied
    }

    /// Block until every spawned task has reported back, or `timeout`
    /// passes. Returns whether the program is idle.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        self.pump();
        while self.pending_tasks > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match self.rx.recv_timeout(remaining) {
                Ok(envelope) => self.receive(envelope),
                Err(_) => break,
            }
        }
        self.pending_tasks == 0
    }

    pub fn sender(&self) -> ProgramSender<M::Message> {
        ProgramSender {
            tx: self.tx.clone(),
        }
    }

    pub fn view(&self) -> M::View {
        self.model.view()
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    /// Tasks spawned but not yet applied.
    pub fn pending_tasks(&self) -> usize {
        self.pending_tasks
    }

    /// Requested tick interval, if the model wants frames.
    pub fn tick_rate(&self) -> Option<Duration> {
        self.tick_rate
    }

    pub fn logs(&self) -> &[String] {
        &self.logs
    }

    fn receive(&mut self, envelope: Envelope<M::Message>) {
        let msg = match envelope {
            Envelope::TaskDone(msg) => {
                self.pending_tasks = self.pending_tasks.saturating_sub(1);
                msg
            }
            Envelope::External(msg) => msg,
        };
        self.dispatch(msg);
    }

    fn execute(&mut self, cmd: Cmd<M::Message>) {
        match cmd {
            Cmd::None => {}
            Cmd::Batch(cmds) => {
                for c in cmds {
                    self.execute(c);
                }
            }
            Cmd::Msg(m) => self.dispatch(m),
            Cmd::Tick(interval) => self.tick_rate = Some(interval),
            Cmd::Log(text) => {
                info!(target: "stockview::log", "{text}");
                self.logs.push(text);
            }
            Cmd::Task(spec, f) => self.spawn(spec, f),
        }
    }

    fn spawn(&mut self, spec: TaskSpec, f: Box<dyn FnOnce() -> M::Message + Send>) {
        let name = spec.name.clone().unwrap_or_else(|| "task".to_owned());
        let tx = self.tx.clone();
        let (job_tx, job_rx) = mpsc::channel::<Box<dyn FnOnce() -> M::Message + Send>>();
        let spawned = thread::Builder::new()
            .name(format!("stockview-{name}"))
            .spawn(move || {
                if let Ok(job) = job_rx.recv() {
                    let _ = tx.send(Envelope::TaskDone(job()));
                }
            });
        match spawned {
            Ok(_) => {
                self.pending_tasks += 1;
                debug!(task = %name, pending = self.pending_tasks, "task spawned");
                if let Err(mpsc::SendError(job)) = job_tx.send(f) {
                    self.pending_tasks -= 1;
                    warn!(task = %name, "task thread exited early; running inline");
                    let msg = job();
                    self.dispatch(msg);
                }
            }
            Err(err) => {
                warn!(task = %name, error = %err, "cannot spawn task thread; running inline");
                let msg = f();
                self.dispatch(msg);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        value: i32,
    }

    #[derive(Debug)]
    enum CounterMsg {
        Add(i32),
        Slow(i32),
        Event,
    }

    impl From<Event> for CounterMsg {
        fn from(_: Event) -> Self {
            Self::Event
        }
    }

    impl Model for Counter {
        type Message = CounterMsg;
        type View = i32;

        fn update(&mut self, msg: CounterMsg) -> Cmd<CounterMsg> {
            match msg {
                CounterMsg::Add(n) => {
                    self.value += n;
                    Cmd::none()
                }
                CounterMsg::Slow(n) => Cmd::task_named("slow", move || CounterMsg::Add(n)),
                CounterMsg::Event => Cmd::batch(vec![Cmd::log("event"), Cmd::tick(Duration::from_millis(16))]),
            }
        }

        fn view(&self) -> i32 {
            self.value
        }
    }

    #[test]
    fn task_spec_carries_only_the_name() {
        let Cmd::Task(spec, _) = Cmd::<i32>::task_named("fetch", || 1) else {
            panic!("expected a task");
        };
        assert_eq!(spec.name.as_deref(), Some("fetch"));
        let Cmd::Task(spec, _) = Cmd::<i32>::task(|| 1) else {
            panic!("expected a task");
        };
        assert!(spec.name.is_none());
    }

    #[test]
    fn batch_collapses() {
        assert!(Cmd::<()>::batch(vec![]).is_none());
        assert!(Cmd::<()>::batch(vec![Cmd::none(), Cmd::none()]).is_none());
        assert_eq!(Cmd::<()>::batch(vec![Cmd::log("a"), Cmd::none()]).type_name(), "Log");
        assert_eq!(
            Cmd::<()>::batch(vec![Cmd::log("a"), Cmd::log("b")]).type_name(),
            "Batch"
        );
    }

    #[test]
    fn dispatch_updates_model() {
        let mut program = Program::new(Counter { value: 0 });
        program.init();
        program.dispatch(CounterMsg::Add(3));
        assert_eq!(program.view(), 3);
    }

    #[test]
    fn tasks_report_back() {
        let mut program = Program::new(Counter { value: 0 });
        program.dispatch(CounterMsg::Slow(2));
        program.dispatch(CounterMsg::Slow(5));
        assert!(program.wait_idle(Duration::from_secs(5)));
        assert_eq!(program.pending_tasks(), 0);
        assert_eq!(program.view(), 7);
    }

    #[test]
    fn external_sender() {
        let mut program = Program::new(Counter { value: 0 });
        let sender = program.sender();
        let handle = thread::spawn(move || sender.send(CounterMsg::Add(4)));
        assert!(handle.join().unwrap());
        program.pump();
        assert_eq!(program.view(), 4);
    }

    #[test]
    fn events_request_ticks_and_logs() {
        let mut program = Program::new(Counter { value: 0 });
        program.inject_event(Event::Focus(true));
        assert_eq!(program.tick_rate(), Some(Duration::from_millis(16)));
        assert_eq!(program.logs(), ["event"]);
        program.advance(Duration::from_millis(16));
        // The model asks again on every event.
        assert_eq!(program.tick_rate(), Some(Duration::from_millis(16)));
    }
}
