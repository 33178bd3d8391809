//! The native window host capability.
//!
//! The host performs the OS-level work of launching an external process,
//! finding its top-level window, and reparenting it into a container window.
//! This crate only coordinates; a platform implementation (Win32 `SetParent`
//! and friends, or an equivalent) lives outside it behind [`NativeWindowHost`].

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sys::geometry::Rect;

/// Opaque identifier for an embedded window, assigned by the host at embed
/// time. Unique for the lifetime of the process; never reused.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WindowId(String);

impl WindowId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Native handle of a container window, as reported by the container backend.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerHandle(u64);

impl ContainerHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContainerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "container:{:#x}", self.0)
    }
}

#[derive(Debug, Error)]
pub enum HostError {
    #[error("executable not found: {}", .0.display())]
    ExecutableNotFound(PathBuf),
    #[error("failed to launch process: {0}")]
    LaunchFailed(String),
    #[error("no embeddable window appeared for the launched process: {0}")]
    EmbedFailed(String),
    #[error("host rejected {op} for window {id}")]
    OperationRejected { op: &'static str, id: WindowId },
}

/// Parameters for embedding an external process into a container.
#[derive(Clone, Debug)]
pub struct EmbedRequest<'a> {
    pub process_path: &'a Path,
    pub args: &'a [String],
    /// Target rectangle of the embedded window, relative to the container.
    pub frame: Rect,
}

/// The OS-level embedding operations consumed by the registry.
///
/// Implementations own all native resources behind the returned ids. The
/// `bool`-returning operations report whether the host performed the call;
/// they must not panic for unknown ids. The host clamps degenerate target
/// rectangles to its platform minimum; callers pass resolver output through
/// unmodified.
pub trait NativeWindowHost {
    /// Launch the process and reparent its window into `container` at
    /// `request.frame`. Returns the id for all subsequent operations.
    fn embed(
        &mut self,
        container: ContainerHandle,
        request: EmbedRequest<'_>,
    ) -> Result<WindowId, HostError>;

    /// Move/resize the embedded window within its container.
    fn reposition(&mut self, id: &WindowId, frame: Rect) -> bool;

    fn set_visible(&mut self, id: &WindowId, visible: bool) -> bool;

    /// Release all native resources behind `id`, terminating the embedded
    /// process. Returns false if the id is unknown or teardown failed.
    fn destroy(&mut self, id: &WindowId) -> bool;

    fn list_ids(&self) -> Vec<WindowId>;

    /// Best-effort sweep of every native resource the host still tracks.
    fn cleanup_all(&mut self);
}
