#![forbid(unsafe_code)]

//! Image geometry resolution.
//!
//! The screen needs only an image's intrinsic aspect ratio. Sizes come from
//! an [`ImageSizeSource`] running on a task thread; the
//! [`ImageGeometryResolver`] sits on the loop side, caching results per URI
//! and making sure each distinct URI is probed at most once at a time, no
//! matter how many cards show it.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::ImageReader;
use stockview_core::RecordId;
use stockview_core::geometry::PixelSize;
use stockview_widgets::expansion::SQUARE;

use crate::error::ImageError;

/// Produces the intrinsic size of an image.
pub trait ImageSizeSource: Send + Sync {
    fn resolve_size(&self, uri: &str) -> Result<PixelSize, ImageError>;
}

impl<F> ImageSizeSource for F
where
    F: Fn(&str) -> Result<PixelSize, ImageError> + Send + Sync,
{
    fn resolve_size(&self, uri: &str) -> Result<PixelSize, ImageError> {
        self(uri)
    }
}

// ---------------------------------------------------------------------------
// LocalImageSource
// ---------------------------------------------------------------------------

/// Reads image headers from inline `data:` URIs and the local filesystem.
///
/// Accepted forms:
/// - `data:<mime>;base64,<payload>`
/// - `file:///abs/path.png`
/// - a bare path, resolved against the base directory when relative
///
/// Any other `scheme://` is [`ImageError::Unsupported`].
#[derive(Debug, Clone, Default)]
pub struct LocalImageSource {
    base_dir: Option<PathBuf>,
}

impl LocalImageSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative paths against `dir`.
    #[must_use]
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl ImageSizeSource for LocalImageSource {
    fn resolve_size(&self, uri: &str) -> Result<PixelSize, ImageError> {
        let uri = uri.trim();
        if uri.is_empty() {
            return Err(ImageError::InvalidUri(String::new()));
        }
        if let Some(rest) = uri.strip_prefix("data:") {
            return probe_bytes(&decode_data_uri(rest, uri)?);
        }
        if let Some(path) = uri.strip_prefix("file://") {
            return probe_file(Path::new(path));
        }
        if let Some((scheme, _)) = uri.split_once("://") {
            return Err(ImageError::Unsupported {
                scheme: scheme.to_ascii_lowercase(),
            });
        }
        probe_file(&self.resolve_path(uri))
    }
}

fn decode_data_uri(rest: &str, uri: &str) -> Result<Vec<u8>, ImageError> {
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| ImageError::InvalidUri(uri.to_owned()))?;
    if !meta.ends_with(";base64") {
        return Err(ImageError::InvalidUri(uri.to_owned()));
    }
    Ok(STANDARD.decode(payload.trim())?)
}

fn probe_bytes(bytes: &[u8]) -> Result<PixelSize, ImageError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(image::ImageError::from)?;
    checked(reader.into_dimensions()?)
}

fn probe_file(path: &Path) -> Result<PixelSize, ImageError> {
    let io_err = |source| ImageError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(io_err)?;
    let reader = ImageReader::new(BufReader::new(file))
        .with_guessed_format()
        .map_err(io_err)?;
    checked(reader.into_dimensions()?)
}

fn checked((width, height): (u32, u32)) -> Result<PixelSize, ImageError> {
    if width == 0 || height == 0 {
        return Err(ImageError::ZeroSize);
    }
    Ok(PixelSize::new(width, height))
}

// ---------------------------------------------------------------------------
// ImageGeometryResolver
// ---------------------------------------------------------------------------

/// Result of asking the resolver for a URI.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResolveRequest {
    /// Already known; apply it now.
    Cached(f32),
    /// First request for this URI; the caller must start a probe.
    Started,
    /// A probe is already running; the caller is notified when it finishes.
    Joined,
}

#[derive(Debug, Clone, Copy)]
struct Resolved {
    aspect_ratio: f32,
    failed: bool,
}

/// Loop-side cache of image aspect ratios keyed by URI.
#[derive(Debug, Default)]
pub struct ImageGeometryResolver {
    resolved: HashMap<String, Resolved>,
    in_flight: HashMap<String, Vec<RecordId>>,
}

impl ImageGeometryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for the aspect ratio of `uri` on behalf of `waiter`.
    pub fn request(&mut self, uri: &str, waiter: RecordId) -> ResolveRequest {
        if let Some(resolved) = self.resolved.get(uri) {
            return ResolveRequest::Cached(resolved.aspect_ratio);
        }
        match self.in_flight.get_mut(uri) {
            Some(waiters) => {
                if !waiters.contains(&waiter) {
                    waiters.push(waiter);
                }
                ResolveRequest::Joined
            }
            None => {
                tracing::trace!(uri, record_id = %waiter, "image probe started");
                self.in_flight.insert(uri.to_owned(), vec![waiter]);
                ResolveRequest::Started
            }
        }
    }

    /// Record the probe result for `uri`. Returns the aspect ratio to
    /// publish and the records waiting for it. Failures publish the square
    /// fallback.
    pub fn finish(
        &mut self,
        uri: &str,
        result: Result<PixelSize, ImageError>,
    ) -> (f32, Vec<RecordId>) {
        let waiters = self.in_flight.remove(uri).unwrap_or_default();
        let resolved = match result.and_then(|size| size.aspect_ratio().ok_or(ImageError::ZeroSize))
        {
            Ok(aspect_ratio) => {
                tracing::trace!(uri, aspect_ratio, waiters = waiters.len(), "image size resolved");
                Resolved {
                    aspect_ratio,
                    failed: false,
                }
            }
            Err(err) => {
                tracing::warn!(uri, error = %err, "image size unavailable; using square");
                Resolved {
                    aspect_ratio: SQUARE,
                    failed: true,
                }
            }
        };
        self.resolved.insert(uri.to_owned(), resolved);
        (resolved.aspect_ratio, waiters)
    }

    /// Known aspect ratio for `uri`.
    pub fn cached(&self, uri: &str) -> Option<f32> {
        self.resolved.get(uri).map(|r| r.aspect_ratio)
    }

    pub fn is_in_flight(&self, uri: &str) -> bool {
        self.in_flight.contains_key(uri)
    }

    /// Drop cached failures so the next request probes again.
    pub fn forget_failures(&mut self) {
        self.resolved.retain(|_, r| !r.failed);
    }

    /// Stop tracking waiters. Probes still running report into an empty
    /// waiter list.
    pub fn abandon_waiters(&mut self) {
        self.in_flight.clear();
    }
}
