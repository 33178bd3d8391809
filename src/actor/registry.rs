//! The embedded window registry.
//!
//! The registry is the authoritative mapping from window id to live embedded
//! window. It sequences creation, update, show/hide, and teardown against the
//! container manager and the native window host so that native resources are
//! never leaked or double-destroyed, no matter how those operations race with
//! container closure.
//!
//! All state lives inside one actor task. Steps that must wait (the
//! container's first paint, the post-embed settle delay) are modeled as
//! events and timer deadlines delivered back into that task, so other windows
//! keep being serviced while one is mid-creation. Operations that arrive for
//! a window whose creation is still in flight are queued on its entry and
//! applied, in order, once creation completes.

use tokio::sync::oneshot;
use tokio_stream::StreamExt;
use tokio_util::time::delay_queue::{self, DelayQueue};
use tracing::{Span, debug, info, instrument, warn};

use crate::actor::{self, container};
use crate::common::collections::HashMap;
use crate::common::config::{ConfigDelta, RegistrySettings, WindowConfig};
use crate::sys::geometry::{self, Rect, ResolvedLayout};
use crate::sys::host::{ContainerHandle, EmbedRequest, HostError, NativeWindowHost, WindowId};

pub mod error;

pub use error::RegistryError;

pub type Sender = actor::Sender<Event>;
type Receiver = actor::Receiver<Event>;

pub type Reply<T> = oneshot::Sender<Result<T, RegistryError>>;

/// Correlates a create request with the container manager's response while
/// the window id does not exist yet.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CreateToken(u64);

impl CreateToken {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Lifecycle of an embedded window.
///
/// `Creating` covers everything up to and including the post-embed settle
/// delay; operations issued for a window in this state are queued, never
/// interleaved with the creation steps. `Destroyed` is terminal and only ever
/// observed on an entry that is about to be dropped.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    Creating,
    Ready,
    Visible,
    Hidden,
    Destroying,
    Destroyed,
}

#[derive(Debug)]
pub enum Command {
    Create {
        config: WindowConfig,
        reply: Reply<WindowId>,
    },
    Update {
        id: WindowId,
        delta: ConfigDelta,
        reply: Reply<bool>,
    },
    SetVisible {
        id: WindowId,
        visible: bool,
        reply: Reply<bool>,
    },
    Destroy {
        id: WindowId,
        reply: Reply<bool>,
    },
    List {
        reply: Reply<Vec<WindowId>>,
    },
    CleanupAll {
        reply: Reply<bool>,
    },
}

#[derive(Debug)]
pub enum Event {
    Command(Command),
    /// The container for an in-flight create finished its first paint.
    ContainerReady {
        token: CreateToken,
        handle: ContainerHandle,
    },
    ContainerCreateFailed {
        token: CreateToken,
        error: crate::sys::container::ContainerError,
    },
    /// A container was closed outside any teardown the registry initiated.
    ContainerClosed(ContainerHandle),
    ScreenParametersChanged(Rect),
}

#[derive(Debug)]
enum Deadline {
    ContainerInit(CreateToken),
    Settle(WindowId),
}

#[derive(Debug)]
enum PendingOp {
    Update { delta: ConfigDelta, reply: Reply<bool> },
    SetVisible { visible: bool, reply: Reply<bool> },
    Destroy { reply: Reply<bool> },
}

struct PendingCreate {
    config: WindowConfig,
    layout: ResolvedLayout,
    reply: Reply<WindowId>,
    timer: delay_queue::Key,
}

struct EmbeddedWindowEntry {
    /// Non-owning reference; the container manager owns the window.
    container: ContainerHandle,
    state: Lifecycle,
    /// Last successfully applied content rectangle. Updates that resolve to
    /// the same rectangle skip the native reposition.
    geometry: Rect,
    source_config: WindowConfig,
    /// Present until the settle deadline completes the create.
    create_reply: Option<Reply<WindowId>>,
    /// Operations queued while this window is `Creating` or `Ready`.
    pending: Vec<PendingOp>,
}

pub struct Registry {
    host: Option<Box<dyn NativeWindowHost>>,
    container_tx: container::Sender,
    receiver: Receiver,
    entries: HashMap<WindowId, EmbeddedWindowEntry>,
    pending_creates: HashMap<CreateToken, PendingCreate>,
    timers: DelayQueue<Deadline>,
    work_area: Rect,
    settings: RegistrySettings,
    next_token: u64,
}

enum Wake {
    Event((Span, Event)),
    Deadline(Deadline),
    Shutdown,
}

impl Registry {
    pub fn new(
        host: Option<Box<dyn NativeWindowHost>>,
        container_tx: container::Sender,
        receiver: Receiver,
        work_area: Rect,
        settings: RegistrySettings,
    ) -> Self {
        Self {
            host,
            container_tx,
            receiver,
            entries: HashMap::default(),
            pending_creates: HashMap::default(),
            timers: DelayQueue::new(),
            work_area,
            settings,
            next_token: 0,
        }
    }

    pub async fn run(mut self) {
        loop {
            let wake = tokio::select! {
                maybe = self.receiver.recv() => match maybe {
                    Some(event) => Wake::Event(event),
                    None => Wake::Shutdown,
                },
                Some(expired) = self.timers.next() => Wake::Deadline(expired.into_inner()),
            };
            match wake {
                Wake::Event((span, event)) => {
                    let _guard = span.enter();
                    self.handle_event(event);
                }
                Wake::Deadline(deadline) => self.handle_deadline(deadline),
                Wake::Shutdown => break,
            }
        }
    }

    #[instrument(name = "registry::handle_event", skip(self))]
    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Command(command) => self.handle_command(command),
            Event::ContainerReady { token, handle } => self.handle_container_ready(token, handle),
            Event::ContainerCreateFailed { token, error } => {
                let Some(pending) = self.pending_creates.remove(&token) else {
                    return;
                };
                self.timers.try_remove(&pending.timer);
                warn!(%error, "create failed before a container existed");
                let _ = pending.reply.send(Err(error.into()));
            }
            Event::ContainerClosed(handle) => self.handle_container_closed(handle),
            Event::ScreenParametersChanged(work_area) => {
                debug!(?work_area, "work area changed");
                self.work_area = work_area;
            }
        }
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Create { config, reply } => self.handle_create(config, reply),
            Command::Update { id, delta, reply } => self.handle_update(id, delta, reply),
            Command::SetVisible { id, visible, reply } => {
                self.handle_set_visible(id, visible, reply)
            }
            Command::Destroy { id, reply } => self.handle_destroy(id, reply),
            Command::List { reply } => {
                let mut ids: Vec<WindowId> = self.entries.keys().cloned().collect();
                ids.sort();
                let _ = reply.send(Ok(ids));
            }
            Command::CleanupAll { reply } => self.handle_cleanup_all(reply),
        }
    }

    fn handle_create(&mut self, config: WindowConfig, reply: Reply<WindowId>) {
        if self.host.is_none() {
            let _ = reply.send(Err(RegistryError::HostUnavailable));
            return;
        }
        if let Err(issue) = config.validate() {
            let _ = reply.send(Err(RegistryError::InvalidConfig(issue)));
            return;
        }

        let layout = geometry::resolve(&config, self.work_area);
        self.next_token += 1;
        let token = CreateToken(self.next_token);
        let timer = self
            .timers
            .insert(Deadline::ContainerInit(token), self.settings.container_init_timeout);
        debug!(?token, frame = ?layout.container, "requesting container window");
        self.container_tx.send(container::Request::Create { token, frame: layout.container });
        self.pending_creates.insert(token, PendingCreate { config, layout, reply, timer });
    }

    fn handle_container_ready(&mut self, token: CreateToken, handle: ContainerHandle) {
        let Some(pending) = self.pending_creates.remove(&token) else {
            // The create already timed out; dispose of the late container.
            debug!(?token, %handle, "container became ready after rollback");
            self.container_tx.send(container::Request::Close(handle));
            return;
        };
        self.timers.try_remove(&pending.timer);

        let Some(host) = self.host.as_mut() else {
            self.container_tx.send(container::Request::Close(handle));
            let _ = pending.reply.send(Err(RegistryError::HostUnavailable));
            return;
        };

        let embedded = host.embed(handle, EmbedRequest {
            process_path: &pending.config.process_path,
            args: &pending.config.args,
            frame: pending.layout.content,
        });
        match embedded {
            Ok(id) => {
                info!(%id, %handle, "embedded external window, settling");
                self.timers.insert(Deadline::Settle(id.clone()), self.settings.settle_delay);
                self.entries.insert(id, EmbeddedWindowEntry {
                    container: handle,
                    state: Lifecycle::Creating,
                    geometry: pending.layout.content,
                    source_config: pending.config,
                    create_reply: Some(pending.reply),
                    pending: Vec::new(),
                });
            }
            Err(error) => {
                warn!(%error, %handle, "embed failed, rolling back container");
                self.container_tx.send(container::Request::Close(handle));
                let _ = pending.reply.send(Err(error.into()));
            }
        }
    }

    fn handle_deadline(&mut self, deadline: Deadline) {
        match deadline {
            Deadline::ContainerInit(token) => {
                let Some(pending) = self.pending_creates.remove(&token) else {
                    return;
                };
                warn!(path = %pending.config.process_path.display(),
                    "container never finished initializing, rolling back");
                self.container_tx.send(container::Request::AbandonCreate(token));
                let _ = pending.reply.send(Err(RegistryError::ContainerInitTimeout(
                    self.settings.container_init_timeout,
                )));
            }
            Deadline::Settle(id) => self.finish_create(id),
        }
    }

    /// Complete a create whose settle delay elapsed: show and focus the
    /// container, report the id to the caller, then apply any operations
    /// that were queued while creation was in flight.
    fn finish_create(&mut self, id: WindowId) {
        let Some(entry) = self.entries.get_mut(&id) else {
            debug!(%id, "window disappeared before settling");
            return;
        };
        entry.state = Lifecycle::Ready;
        self.container_tx.send(container::Request::SetVisible(entry.container, true));
        self.container_tx.send(container::Request::Focus(entry.container));
        entry.state = Lifecycle::Visible;
        if let Some(reply) = entry.create_reply.take() {
            let _ = reply.send(Ok(id.clone()));
        }

        let queued = std::mem::take(&mut entry.pending);
        for op in queued {
            match op {
                PendingOp::Update { delta, reply } => self.handle_update(id.clone(), delta, reply),
                PendingOp::SetVisible { visible, reply } => {
                    self.handle_set_visible(id.clone(), visible, reply)
                }
                PendingOp::Destroy { reply } => self.handle_destroy(id.clone(), reply),
            }
        }
    }

    fn handle_update(&mut self, id: WindowId, delta: ConfigDelta, reply: Reply<bool>) {
        let Some(host) = self.host.as_mut() else {
            let _ = reply.send(Err(RegistryError::HostUnavailable));
            return;
        };
        if let Err(issue) = delta.validate() {
            let _ = reply.send(Err(RegistryError::InvalidConfig(issue)));
            return;
        }
        let Some(entry) = self.entries.get_mut(&id) else {
            let _ = reply.send(Err(RegistryError::NotFound(id)));
            return;
        };
        match entry.state {
            Lifecycle::Destroying | Lifecycle::Destroyed => {
                let _ = reply.send(Err(RegistryError::NotFound(id)));
            }
            Lifecycle::Creating | Lifecycle::Ready => {
                entry.pending.push(PendingOp::Update { delta, reply });
            }
            Lifecycle::Visible | Lifecycle::Hidden => {
                let merged = entry.source_config.merged(&delta);
                let layout = geometry::resolve(&merged, self.work_area);

                let mut applied = false;
                if layout.content != entry.geometry {
                    if !host.reposition(&id, layout.content) {
                        let _ = reply.send(Err(RegistryError::Host(
                            HostError::OperationRejected { op: "reposition", id },
                        )));
                        return;
                    }
                    entry.geometry = layout.content;
                    applied = true;
                }
                if delta.has_size() {
                    self.container_tx
                        .send(container::Request::SetSize(entry.container, layout.container.size));
                }
                if delta.has_position() {
                    self.container_tx.send(container::Request::SetPosition(
                        entry.container,
                        layout.container.origin,
                    ));
                }
                entry.source_config = merged;
                self.container_tx.send(container::Request::Focus(entry.container));
                debug!(%id, applied, "updated embedded window");
                let _ = reply.send(Ok(applied));
            }
        }
    }

    fn handle_set_visible(&mut self, id: WindowId, visible: bool, reply: Reply<bool>) {
        let Some(host) = self.host.as_mut() else {
            let _ = reply.send(Err(RegistryError::HostUnavailable));
            return;
        };
        let Some(entry) = self.entries.get_mut(&id) else {
            let _ = reply.send(Err(RegistryError::NotFound(id)));
            return;
        };
        match entry.state {
            Lifecycle::Destroying | Lifecycle::Destroyed => {
                let _ = reply.send(Err(RegistryError::NotFound(id)));
            }
            Lifecycle::Creating | Lifecycle::Ready => {
                entry.pending.push(PendingOp::SetVisible { visible, reply });
            }
            Lifecycle::Visible | Lifecycle::Hidden => {
                let target = if visible { Lifecycle::Visible } else { Lifecycle::Hidden };
                if entry.state == target {
                    let _ = reply.send(Ok(false));
                    return;
                }
                if !host.set_visible(&id, visible) {
                    let _ = reply.send(Err(RegistryError::Host(HostError::OperationRejected {
                        op: "set_visible",
                        id,
                    })));
                    return;
                }
                self.container_tx
                    .send(container::Request::SetVisible(entry.container, visible));
                if visible {
                    self.container_tx.send(container::Request::Focus(entry.container));
                }
                entry.state = target;
                debug!(%id, visible, "changed embedded window visibility");
                let _ = reply.send(Ok(true));
            }
        }
    }

    fn handle_destroy(&mut self, id: WindowId, reply: Reply<bool>) {
        match self.entries.get_mut(&id) {
            // Unknown or already destroyed: idempotent success.
            None => {
                let _ = reply.send(Ok(false));
            }
            Some(entry) => match entry.state {
                Lifecycle::Destroying | Lifecycle::Destroyed => {
                    let _ = reply.send(Ok(false));
                }
                Lifecycle::Creating | Lifecycle::Ready => {
                    entry.pending.push(PendingOp::Destroy { reply });
                }
                Lifecycle::Visible | Lifecycle::Hidden => {
                    self.destroy_entry(&id, CloseContainer::Yes);
                    let _ = reply.send(Ok(true));
                }
            },
        }
    }

    fn handle_container_closed(&mut self, handle: ContainerHandle) {
        let owner = self
            .entries
            .iter()
            .find(|(_, entry)| entry.container == handle)
            .map(|(id, entry)| (id.clone(), entry.state));
        match owner {
            None => debug!(%handle, "closed container is not tracked"),
            Some((id, Lifecycle::Destroying | Lifecycle::Destroyed)) => {
                // Teardown for this id is already underway; a second native
                // destroy here would double-free.
                debug!(%id, "ignoring container close during destroy");
            }
            Some((id, _)) => {
                info!(%id, "container closed externally, releasing embedded window");
                self.destroy_entry(&id, CloseContainer::No);
            }
        }
    }

    fn handle_cleanup_all(&mut self, reply: Reply<bool>) {
        info!(
            windows = self.entries.len(),
            in_flight = self.pending_creates.len(),
            "cleaning up all embedded windows"
        );

        for (token, pending) in std::mem::take(&mut self.pending_creates) {
            self.timers.try_remove(&pending.timer);
            self.container_tx.send(container::Request::AbandonCreate(token));
            let _ = pending.reply.send(Err(RegistryError::Closed));
        }

        let ids: Vec<WindowId> = self.entries.keys().cloned().collect();
        for id in &ids {
            self.destroy_entry(id, CloseContainer::Yes);
        }

        // Final sweep for anything the registry lost track of.
        if let Some(host) = self.host.as_mut() {
            let leftovers = host.list_ids();
            if !leftovers.is_empty() {
                warn!(count = leftovers.len(), "host still tracks windows unknown to the registry");
            }
            host.cleanup_all();
        }
        let _ = reply.send(Ok(true));
    }

    /// Remove an entry and release its native resources. The entry leaves the
    /// map before any native call is made, so reentrant notifications cannot
    /// find it and destroy it a second time. Entry removal proceeds even when
    /// the host-level destroy fails; the failure is logged, not surfaced.
    fn destroy_entry(&mut self, id: &WindowId, close_container: CloseContainer) {
        let Some(mut entry) = self.entries.remove(id) else {
            return;
        };
        entry.state = Lifecycle::Destroying;
        debug!(%id, "destroying embedded window");
        if close_container == CloseContainer::Yes {
            self.container_tx.send(container::Request::Close(entry.container));
        }
        if let Some(host) = self.host.as_mut()
            && !host.destroy(id)
        {
            warn!(%id, "native window host failed to destroy window");
        }
        entry.state = Lifecycle::Destroyed;

        if let Some(reply) = entry.create_reply.take() {
            // Creation did produce a window; report the id even though the
            // window is gone again by the time the caller sees it.
            let _ = reply.send(Ok(id.clone()));
        }
        for op in entry.pending.drain(..) {
            match op {
                PendingOp::Update { reply, .. } => {
                    let _ = reply.send(Err(RegistryError::NotFound(id.clone())));
                }
                PendingOp::SetVisible { reply, .. } => {
                    let _ = reply.send(Err(RegistryError::NotFound(id.clone())));
                }
                PendingOp::Destroy { reply } => {
                    let _ = reply.send(Ok(false));
                }
            }
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum CloseContainer {
    Yes,
    No,
}

/// The command surface handed to controllers: fire-and-await wrappers around
/// [`Command`], one per operation.
#[derive(Clone, Debug)]
pub struct RegistryHandle {
    events_tx: Sender,
}

impl RegistryHandle {
    pub fn new(events_tx: Sender) -> Self {
        Self { events_tx }
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, RegistryError> {
        let (reply, response) = oneshot::channel();
        self.events_tx
            .try_send(Event::Command(make(reply)))
            .map_err(|_| RegistryError::Closed)?;
        response.await.map_err(|_| RegistryError::Closed)?
    }

    pub async fn create(&self, config: WindowConfig) -> Result<WindowId, RegistryError> {
        self.request(|reply| Command::Create { config, reply }).await
    }

    /// Returns whether a native reposition was performed; `false` means the
    /// resolved geometry already matched.
    pub async fn update(&self, id: WindowId, delta: ConfigDelta) -> Result<bool, RegistryError> {
        self.request(|reply| Command::Update { id, delta, reply }).await
    }

    pub async fn set_visible(&self, id: WindowId, visible: bool) -> Result<bool, RegistryError> {
        self.request(|reply| Command::SetVisible { id, visible, reply }).await
    }

    /// Idempotent: destroying an unknown or already-destroyed id succeeds
    /// with `false`.
    pub async fn destroy(&self, id: WindowId) -> Result<bool, RegistryError> {
        self.request(|reply| Command::Destroy { id, reply }).await
    }

    pub async fn list(&self) -> Result<Vec<WindowId>, RegistryError> {
        self.request(|reply| Command::List { reply }).await
    }

    pub async fn cleanup_all(&self) -> Result<bool, RegistryError> {
        self.request(|reply| Command::CleanupAll { reply }).await
    }
}
