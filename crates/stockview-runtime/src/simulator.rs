#![forbid(unsafe_code)]

//! Deterministic program simulator for testing.
//!
//! `ProgramSimulator` runs a [`Model`] without threads. Background tasks
//! are queued instead of spawned, and tests decide when and in which order
//! they finish, which makes overlapping fetches and late image results easy
//! to reproduce.
//!
//! # Example
//!
//! ```ignore
//! let mut sim = ProgramSimulator::new(screen);
//! sim.send(Msg::Focus);
//! sim.send(Msg::PullToRefresh);
//! sim.run_task_at(1); // the second fetch finishes first
//! sim.run_next_task();
//! assert!(!sim.view().fetching);
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use stockview_core::Event;

use crate::program::{Cmd, Model, TaskSpec};

/// Record of a command that was executed during simulation.
#[derive(Debug, Clone, PartialEq)]
pub enum CmdRecord {
    None,
    Msg,
    Batch(usize),
    Tick(Duration),
    Log(String),
    /// Task queued; carries its name.
    Task(Option<String>),
}

type QueuedTask<M> = (TaskSpec, Box<dyn FnOnce() -> M + Send>);

/// Deterministic simulator for [`Model`] testing.
pub struct ProgramSimulator<M: Model> {
    model: M,
    tasks: VecDeque<QueuedTask<M::Message>>,
    command_log: Vec<CmdRecord>,
    tick_rate: Option<Duration>,
    logs: Vec<String>,
}

impl<M: Model> ProgramSimulator<M> {
    /// The model is not initialized until [`init`](Self::init) is called.
    pub fn new(model: M) -> Self {
        Self {
            model,
            tasks: VecDeque::new(),
            command_log: Vec::new(),
            tick_rate: None,
            logs: Vec::new(),
        }
    }

    pub fn init(&mut self) {
        let cmd = self.model.init();
        self.execute_cmd(cmd);
    }

    /// Convert each event into a message and dispatch it.
    pub fn inject_events(&mut self, events: &[Event]) {
        for event in events {
            let msg = M::Message::from(event.clone());
            let cmd = self.model.update(msg);
            self.execute_cmd(cmd);
        }
    }

    pub fn inject_event(&mut self, event: Event) {
        self.inject_events(&[event]);
    }

    pub fn send(&mut self, msg: M::Message) {
        let cmd = self.model.update(msg);
        self.execute_cmd(cmd);
    }

    /// Deliver one frame tick of `dt`.
    pub fn advance(&mut self, dt: Duration) {
        self.tick_rate = None;
        self.inject_event(Event::Tick(dt));
    }

    /// Tick in `step` increments until `total` has elapsed.
    pub fn advance_by(&mut self, total: Duration, step: Duration) {
        let step = step.max(Duration::from_millis(1));
        let mut elapsed = Duration::ZERO;
        while elapsed < total {
            let dt = step.min(total - elapsed);
            self.advance(dt);
            elapsed += dt;
        }
    }

    // -- tasks ---------------------------------------------------------------

    /// Queued tasks that have not run yet.
    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Names of queued tasks, in queue order.
    pub fn task_names(&self) -> Vec<Option<&str>> {
        self.tasks
            .iter()
            .map(|(spec, _)| spec.name.as_deref())
            .collect()
    }

    /// Run the oldest queued task and apply its result.
    pub fn run_next_task(&mut self) -> bool {
        self.run_task_at(0)
    }

    /// Run the queued task at `index` and apply its result.
    pub fn run_task_at(&mut self, index: usize) -> bool {
        let Some((_, f)) = self.tasks.remove(index) else {
            return false;
        };
        let msg = f();
        let cmd = self.model.update(msg);
        self.execute_cmd(cmd);
        true
    }

    /// Run tasks until the queue is empty, including tasks queued by the
    /// results of earlier ones. Returns how many ran.
    pub fn run_all_tasks(&mut self) -> usize {
        let mut ran = 0;
        while self.run_next_task() {
            ran += 1;
        }
        ran
    }

    /// Drop a queued task without running it.
    pub fn discard_task_at(&mut self, index: usize) -> bool {
        self.tasks.remove(index).is_some()
    }

    // -- inspection ----------------------------------------------------------

    pub fn view(&self) -> M::View {
        self.model.view()
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub fn tick_rate(&self) -> Option<Duration> {
        self.tick_rate
    }

    pub fn logs(&self) -> &[String] {
        &self.logs
    }

    pub fn command_log(&self) -> &[CmdRecord] {
        &self.command_log
    }

    pub fn clear_command_log(&mut self) {
        self.command_log.clear();
    }

    fn execute_cmd(&mut self, cmd: Cmd<M::Message>) {
        match cmd {
            Cmd::None => {
                self.command_log.push(CmdRecord::None);
            }
            Cmd::Msg(m) => {
                self.command_log.push(CmdRecord::Msg);
                let cmd = self.model.update(m);
                self.execute_cmd(cmd);
            }
            Cmd::Batch(cmds) => {
                self.command_log.push(CmdRecord::Batch(cmds.len()));
                for c in cmds {
                    self.execute_cmd(c);
                }
            }
            Cmd::Tick(interval) => {
                self.tick_rate = Some(interval);
                self.command_log.push(CmdRecord::Tick(interval));
            }
            Cmd::Log(text) => {
                self.command_log.push(CmdRecord::Log(text.clone()));
                self.logs.push(text);
            }
            Cmd::Task(spec, f) => {
                self.command_log.push(CmdRecord::Task(spec.name.clone()));
                self.tasks.push_back((spec, f));
            }
        }
    }
}
