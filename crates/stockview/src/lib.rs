#![forbid(unsafe_code)]

//! stockview public facade.
//!
//! Re-exports the types most hosts need from the internal crates and a
//! small prelude. The runtime (program loop, data sources, the screen
//! model) is behind the default `runtime` feature.

use std::fmt;

// --- Core re-exports -------------------------------------------------------

pub use stockview_core::{
    Clock, DisplayRecord, Event, FixedClock, InventoryCollection, InventoryRecord, ParseError,
    RECENT_WINDOW, RawFields, RawRecord, RecordId, SystemClock, is_recent, parse_record,
    split_categories,
};

// --- Widget re-exports -----------------------------------------------------

pub use stockview_widgets::{
    CardConfig, CardFrame, Chevron, ExpansionState, ImageFrame, ItemCard, Phase, TapOutcome,
    TitleMetrics, VirtualizedList, VisualFrame, WindowConfig, render,
};

// --- Runtime re-exports ----------------------------------------------------

#[cfg(feature = "runtime")]
pub use stockview_runtime::{
    Cmd, ConfigError, FetchError, FetchPolicy, FocusBus, FocusSubscription, ImageError,
    ImageSizeSource, InventoryScreen, InventorySource, ItemView, JsonFileSource,
    LocalImageSource, Model, Msg, Program, ProgramSimulator, ScreenConfig, ScreenView,
    StaticSource, SyncController,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for stockview hosts.
#[derive(Debug)]
pub enum Error {
    /// A record could not be parsed.
    Parse(ParseError),
    #[cfg(feature = "runtime")]
    Fetch(FetchError),
    #[cfg(feature = "runtime")]
    Image(ImageError),
    #[cfg(feature = "runtime")]
    Config(ConfigError),
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "{err}"),
            #[cfg(feature = "runtime")]
            Self::Fetch(err) => write!(f, "{err}"),
            #[cfg(feature = "runtime")]
            Self::Image(err) => write!(f, "{err}"),
            #[cfg(feature = "runtime")]
            Self::Config(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            #[cfg(feature = "runtime")]
            Self::Fetch(err) => Some(err),
            #[cfg(feature = "runtime")]
            Self::Image(err) => Some(err),
            #[cfg(feature = "runtime")]
            Self::Config(err) => Some(err),
            Self::Io(err) => Some(err),
        }
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Self::Parse(err)
    }
}

#[cfg(feature = "runtime")]
impl From<FetchError> for Error {
    fn from(err: FetchError) -> Self {
        Self::Fetch(err)
    }
}

#[cfg(feature = "runtime")]
impl From<ImageError> for Error {
    fn from(err: ImageError) -> Self {
        Self::Image(err)
    }
}

#[cfg(feature = "runtime")]
impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

/// Standard result type for stockview APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{DisplayRecord, Error, Event, Phase, RawRecord, RecordId, Result};

    #[cfg(feature = "runtime")]
    pub use crate::{
        Cmd, FocusBus, InventoryScreen, InventorySource, Model, Msg, Program, ScreenConfig,
        ScreenView,
    };

    pub use crate::{core, widgets};

    #[cfg(feature = "runtime")]
    pub use crate::runtime;
}

pub use stockview_core as core;
#[cfg(feature = "runtime")]
pub use stockview_runtime as runtime;
pub use stockview_widgets as widgets;
