//! The platform seam for container windows.
//!
//! A container is a lightweight borderless window created solely to host a
//! foreign process's native window. The backend implements the actual
//! windowing calls; the [`crate::actor::container`] actor drives it and owns
//! the bookkeeping.

use thiserror::Error;

use crate::sys::geometry::{Point, Rect, Size};
use crate::sys::host::ContainerHandle;

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("container window creation failed: {0}")]
    CreateFailed(String),
}

/// Notifications raised by the platform windowing layer. The backend is
/// constructed with an `actor::Sender<BackendEvent>` by the embedding
/// application and must deliver these for every container it created.
#[derive(Debug)]
pub enum BackendEvent {
    /// The container's content finished its initial load/paint. Its native
    /// handle is now stable enough to reparent a foreign window into.
    FirstPaint(ContainerHandle),
    /// The container was closed, whether by us, the user, or the OS.
    Closed(ContainerHandle),
}

/// Low-level container window operations.
///
/// Windows are created hidden; the manager shows them once the embedded
/// window has settled. Operations on unknown handles must be ignored, not
/// panic: close races with externally initiated destruction are expected.
pub trait ContainerBackend {
    fn create_window(&mut self, frame: Rect) -> Result<ContainerHandle, ContainerError>;

    fn set_position(&mut self, handle: ContainerHandle, origin: Point);

    fn set_size(&mut self, handle: ContainerHandle, size: Size);

    fn set_visible(&mut self, handle: ContainerHandle, visible: bool);

    fn focus(&mut self, handle: ContainerHandle);

    fn close(&mut self, handle: ContainerHandle);
}
