//! Window configuration as supplied by the control surface.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::sys::geometry::Size;

pub const DEFAULT_WIDTH: i32 = 1200;
pub const DEFAULT_HEIGHT: i32 = 700;

/// Nominal chrome reserved inside a container window. The embedded content
/// rectangle is derived by subtracting these from the container size.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChromeOffsets {
    pub title_bar_height: i32,
    pub menu_sidebar_width: i32,
}

impl Default for ChromeOffsets {
    fn default() -> Self {
        Self {
            title_bar_height: 55,
            menu_sidebar_width: 60,
        }
    }
}

/// Immutable input to window creation.
///
/// `width`/`height` fall back to 1200x700 when absent. `x`/`y` are absolute
/// screen coordinates; an absent axis is centered within the work area.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    pub process_path: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub width: Option<i32>,
    #[serde(default)]
    pub height: Option<i32>,
    #[serde(default)]
    pub x: Option<i32>,
    #[serde(default)]
    pub y: Option<i32>,
    #[serde(default)]
    pub chrome: ChromeOffsets,
}

impl WindowConfig {
    pub fn new(process_path: impl Into<PathBuf>) -> Self {
        Self {
            process_path: process_path.into(),
            args: Vec::new(),
            width: None,
            height: None,
            x: None,
            y: None,
            chrome: ChromeOffsets::default(),
        }
    }

    /// The requested outer size, with defaults applied.
    pub fn size(&self) -> Size {
        Size {
            width: self.width.unwrap_or(DEFAULT_WIDTH),
            height: self.height.unwrap_or(DEFAULT_HEIGHT),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.process_path.as_os_str().is_empty() {
            return Err("process path cannot be empty".into());
        }
        validate_dimensions(self.width, self.height)
    }

    /// Apply an update on top of this configuration. Explicit fields in the
    /// delta win; everything else is carried over.
    pub fn merged(&self, delta: &ConfigDelta) -> WindowConfig {
        let mut merged = self.clone();
        if let Some(width) = delta.width {
            merged.width = Some(width);
        }
        if let Some(height) = delta.height {
            merged.height = Some(height);
        }
        if let Some(x) = delta.x {
            merged.x = Some(x);
        }
        if let Some(y) = delta.y {
            merged.y = Some(y);
        }
        merged
    }
}

/// A partial configuration carried by an update command. Only geometry is
/// updatable; the process behind a window never changes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigDelta {
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub x: Option<i32>,
    pub y: Option<i32>,
}

impl ConfigDelta {
    pub fn has_size(&self) -> bool {
        self.width.is_some() || self.height.is_some()
    }

    pub fn has_position(&self) -> bool {
        self.x.is_some() || self.y.is_some()
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_dimensions(self.width, self.height)
    }
}

fn validate_dimensions(width: Option<i32>, height: Option<i32>) -> Result<(), String> {
    if let Some(width) = width
        && width <= 0
    {
        return Err(format!("width must be positive, got {width}"));
    }
    if let Some(height) = height
        && height <= 0
    {
        return Err(format!("height must be positive, got {height}"));
    }
    Ok(())
}

/// Tuning knobs for the registry's timer-driven steps.
///
/// The defaults mirror observed platform behavior: embedding a freshly
/// created foreign window is flaky until the OS window manager catches up, so
/// show/focus calls are deferred by a short settle delay. Neither value is a
/// contract; adjust them against the target platform.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RegistrySettings {
    /// How long to wait for a container's first paint before failing the
    /// create and rolling back.
    pub container_init_timeout: Duration,
    /// Pause between embedding and the show/focus sequence.
    pub settle_delay: Duration,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            container_init_timeout: Duration::from_secs(5),
            settle_delay: Duration::from_millis(300),
        }
    }
}
