#![forbid(unsafe_code)]

//! Runtime for the stockview inventory screen.
//!
//! An Elm-style [`Model`]/[`Cmd`] loop hosts the [`InventoryScreen`]. Slow
//! work (fetching the inventory, probing image sizes) runs as background
//! tasks whose results re-enter the loop as messages, so every state
//! transition is serialized on one thread.
//!
//! - [`program`]: `Model`, `Cmd`, and the threaded [`Program`] executor.
//! - [`simulator`]: deterministic executor with manual task scheduling.
//! - [`subscription`]: navigation focus delivery.
//! - [`source`] and [`images`]: the data source and image subsystem seams.
//! - [`sync`]: the fetch lifecycle.
//! - [`screen`]: the list screen model.

pub mod config;
pub mod error;
pub mod images;
pub mod program;
pub mod screen;
pub mod simulator;
pub mod source;
pub mod subscription;
pub mod sync;

pub use config::ScreenConfig;
pub use error::{ConfigError, FetchError, ImageError};
pub use images::{ImageGeometryResolver, ImageSizeSource, LocalImageSource, ResolveRequest};
pub use program::{Cmd, Model, Program, ProgramSender, TaskSpec};
pub use screen::{FRAME, InventoryScreen, ItemView, Msg, ScreenView};
pub use simulator::{CmdRecord, ProgramSimulator};
pub use source::{FetchResult, InventorySource, JsonFileSource, StaticSource};
pub use subscription::{FocusBus, FocusSubscription};
pub use sync::{FetchPolicy, FetchTicket, FetchTrigger, SyncController, SyncOutcome};
