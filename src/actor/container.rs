//! The container manager actor owns one borderless container window per
//! embedded window.
//!
//! It drives a [`ContainerBackend`] on behalf of the registry, reports
//! "container ready" only after the backend has observed the container's
//! first paint, and forwards closed notifications for containers it did not
//! close itself.

use tokio_stream::StreamExt;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{Span, debug, instrument, warn};

use crate::actor::{self, registry};
use crate::common::collections::HashMap;
use crate::sys::container::{BackendEvent, ContainerBackend};
use crate::sys::geometry::{Point, Rect, Size};
use crate::sys::host::ContainerHandle;

pub type Sender = actor::Sender<Request>;
type Receiver = actor::Receiver<Request>;

#[derive(Debug)]
pub enum Request {
    /// Create a hidden container at `frame`. The registry learns the outcome
    /// through `ContainerReady`/`ContainerCreateFailed` events tagged with
    /// `token`.
    Create {
        token: registry::CreateToken,
        frame: Rect,
    },
    /// The registry gave up waiting for first paint; tear the container down
    /// whenever it materializes.
    AbandonCreate(registry::CreateToken),
    SetPosition(ContainerHandle, Point),
    SetSize(ContainerHandle, Size),
    SetVisible(ContainerHandle, bool),
    Focus(ContainerHandle),
    Close(ContainerHandle),
}

struct ContainerRecord {
    /// Present until first paint has been reported to the registry.
    pending_ready: Option<registry::CreateToken>,
}

pub struct ContainerManager {
    backend: Box<dyn ContainerBackend>,
    registry_tx: actor::Sender<registry::Event>,
    containers: HashMap<ContainerHandle, ContainerRecord>,
}

enum Incoming {
    Request((Span, Request)),
    Backend((Span, BackendEvent)),
}

impl ContainerManager {
    pub fn new(
        backend: Box<dyn ContainerBackend>,
        registry_tx: actor::Sender<registry::Event>,
    ) -> Self {
        Self {
            backend,
            registry_tx,
            containers: HashMap::default(),
        }
    }

    pub async fn run(mut self, requests_rx: Receiver, backend_rx: actor::Receiver<BackendEvent>) {
        let mut merged = StreamExt::merge(
            UnboundedReceiverStream::new(requests_rx).map(Incoming::Request),
            UnboundedReceiverStream::new(backend_rx).map(Incoming::Backend),
        );
        while let Some(incoming) = merged.next().await {
            match incoming {
                Incoming::Request((span, request)) => {
                    let _guard = span.enter();
                    self.handle_request(request);
                }
                Incoming::Backend((span, event)) => {
                    let _guard = span.enter();
                    self.handle_backend_event(event);
                }
            }
        }
    }

    #[instrument(name = "container::handle_request", skip(self))]
    pub fn handle_request(&mut self, request: Request) {
        match request {
            Request::Create { token, frame } => match self.backend.create_window(frame) {
                Ok(handle) => {
                    debug!(%handle, ?frame, "container window created, awaiting first paint");
                    self.containers
                        .insert(handle, ContainerRecord { pending_ready: Some(token) });
                }
                Err(error) => {
                    warn!(%error, "container window creation failed");
                    self.registry_tx.send(registry::Event::ContainerCreateFailed { token, error });
                }
            },
            Request::AbandonCreate(token) => {
                let stale = self
                    .containers
                    .iter()
                    .find(|(_, record)| record.pending_ready == Some(token))
                    .map(|(handle, _)| *handle);
                match stale {
                    Some(handle) => {
                        debug!(%handle, "abandoning container that never painted");
                        self.containers.remove(&handle);
                        self.backend.close(handle);
                    }
                    // Ready was already signaled; the registry disposes of
                    // the handle through the late ContainerReady event.
                    None => debug!(?token, "abandon request for already-ready container"),
                }
            }
            Request::SetPosition(handle, origin) => {
                if self.containers.contains_key(&handle) {
                    self.backend.set_position(handle, origin);
                } else {
                    warn!(%handle, "set_position for unknown container");
                }
            }
            Request::SetSize(handle, size) => {
                if self.containers.contains_key(&handle) {
                    self.backend.set_size(handle, size);
                } else {
                    warn!(%handle, "set_size for unknown container");
                }
            }
            Request::SetVisible(handle, visible) => {
                if self.containers.contains_key(&handle) {
                    self.backend.set_visible(handle, visible);
                } else {
                    warn!(%handle, "set_visible for unknown container");
                }
            }
            Request::Focus(handle) => {
                if self.containers.contains_key(&handle) {
                    self.backend.focus(handle);
                } else {
                    warn!(%handle, "focus for unknown container");
                }
            }
            Request::Close(handle) => {
                // Removing the record first suppresses the Closed event the
                // backend will raise for this close, so the registry never
                // sees a notification for a teardown it initiated.
                if self.containers.remove(&handle).is_some() {
                    self.backend.close(handle);
                } else {
                    debug!(%handle, "close for unknown container, ignoring");
                }
            }
        }
    }

    #[instrument(name = "container::handle_backend_event", skip(self))]
    pub fn handle_backend_event(&mut self, event: BackendEvent) {
        match event {
            BackendEvent::FirstPaint(handle) => {
                let Some(record) = self.containers.get_mut(&handle) else {
                    debug!(%handle, "first paint for unknown container");
                    return;
                };
                if let Some(token) = record.pending_ready.take() {
                    debug!(%handle, "container finished first paint");
                    self.registry_tx.send(registry::Event::ContainerReady { token, handle });
                }
            }
            BackendEvent::Closed(handle) => {
                // Only containers closed from outside still have a record;
                // our own closes removed it before calling the backend.
                if self.containers.remove(&handle).is_some() {
                    debug!(%handle, "container closed externally");
                    self.registry_tx.send(registry::Event::ContainerClosed(handle));
                }
            }
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> Vec<ContainerHandle> {
        self.containers.keys().copied().collect()
    }
}
