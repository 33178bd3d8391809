//! Integer window geometry and the pure layout resolver.

use serde::{Deserialize, Serialize};

use crate::common::config::WindowConfig;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            origin: Point { x, y },
            size: Size { width, height },
        }
    }
}

/// Horizontal inset of the embedded content within the container. The
/// vertical inset is the configured title-bar height.
pub const CONTENT_INSET_X: i32 = 2;

/// A container's outer rectangle and the embedded content rectangle within
/// it, as computed by [`resolve`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedLayout {
    /// Absolute screen rectangle of the container window.
    pub container: Rect,
    /// Rectangle of the embedded window, relative to the container.
    pub content: Rect,
}

/// Compute container and content rectangles for a window configuration.
///
/// Axes without an explicit position are centered within `work_area` using
/// `floor((screen - window) / 2)`, each axis independently. The content
/// rectangle excludes the declared chrome (title bar on top, menu sidebar on
/// the right) and is *not* clamped: a pathologically small requested size
/// yields a non-positive content size, which the native layer is responsible
/// for handling.
///
/// Pure and deterministic; called identically on create and update so that
/// repositioning stays consistent with the container's chrome layout.
pub fn resolve(config: &WindowConfig, work_area: Rect) -> ResolvedLayout {
    let size = config.size();
    let x = match config.x {
        Some(x) => x,
        None => work_area.origin.x + (work_area.size.width - size.width).div_euclid(2),
    };
    let y = match config.y {
        Some(y) => y,
        None => work_area.origin.y + (work_area.size.height - size.height).div_euclid(2),
    };

    let chrome = config.chrome;
    let content = Rect::new(
        CONTENT_INSET_X,
        chrome.title_bar_height,
        size.width - chrome.menu_sidebar_width,
        size.height - chrome.title_bar_height,
    );

    ResolvedLayout {
        container: Rect {
            origin: Point { x, y },
            size,
        },
        content,
    }
}
