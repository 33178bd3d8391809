use std::time::Duration;

use thiserror::Error;

use crate::sys::container::ContainerError;
use crate::sys::host::{HostError, WindowId};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("native window host is unavailable")]
    HostUnavailable,
    #[error("container did not finish initializing within {0:?}")]
    ContainerInitTimeout(Duration),
    #[error("window not found: {0}")]
    NotFound(WindowId),
    #[error("native window host rejected the operation: {0}")]
    Host(#[from] HostError),
    #[error("container window error: {0}")]
    Container(#[from] ContainerError),
    #[error("invalid window configuration: {0}")]
    InvalidConfig(String),
    #[error("registry shut down before the operation completed")]
    Closed,
}
