//! Host and surface as two tasks joined by one ordered channel per direction.
//!
//! Neither side shares state with the other. A driver feeds input to the
//! surface task through a [`SessionHandle`]; barriers travel the full round
//! trip (surface, host, back to surface) so the driver can wait until every
//! message caused by its input has been handled.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use super::SyncError;
use super::eol::LineEnding;
use super::host::{HostShell, HostSide};
use super::protocol::{HostMessage, SurfaceMessage};
use super::view::{InputEvent, StateStore, SurfaceSession, SurfaceView};
use crate::surface::SurfaceOptions;

/// How often the host checks its file watcher.
pub const WATCH_POLL: Duration = Duration::from_millis(250);

/// Requests for the host shell, delivered in order with surface traffic.
#[derive(Debug)]
pub enum HostCommand {
    Save,
    SetClipboard(String),
    Scroll(usize),
    Show(oneshot::Sender<HostView>),
}

/// The external document as the host sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostView {
    pub text: String,
    pub dirty: bool,
    pub eol: LineEnding,
}

/// Driver to surface task.
#[derive(Debug)]
pub enum Control {
    Input(InputEvent),
    Host(HostCommand),
    Inspect(oneshot::Sender<SurfaceView>),
    Barrier(oneshot::Sender<()>),
}

#[derive(Debug)]
enum Upstream {
    Message(SurfaceMessage),
    Command(HostCommand),
    Barrier(oneshot::Sender<()>),
}

#[derive(Debug)]
enum Downstream {
    Message(HostMessage),
    Barrier(oneshot::Sender<()>),
}

/// Channel ends owned by the surface task.
#[derive(Debug)]
pub struct SurfaceEnds {
    control: mpsc::UnboundedReceiver<Control>,
    up: mpsc::UnboundedSender<Upstream>,
    down: mpsc::UnboundedReceiver<Downstream>,
}

/// Channel ends owned by the host task.
#[derive(Debug)]
pub struct HostEnds {
    up: mpsc::UnboundedReceiver<Upstream>,
    down: mpsc::UnboundedSender<Downstream>,
}

/// Create the channels of one session.
pub fn channels() -> (SessionHandle, SurfaceEnds, HostEnds) {
    let (control_tx, control_rx) = mpsc::unbounded_channel();
    let (up_tx, up_rx) = mpsc::unbounded_channel();
    let (down_tx, down_rx) = mpsc::unbounded_channel();
    (
        SessionHandle { control: control_tx },
        SurfaceEnds {
            control: control_rx,
            up: up_tx,
            down: down_rx,
        },
        HostEnds {
            up: up_rx,
            down: down_tx,
        },
    )
}

/// The driver's end of a session. Dropping it shuts the session down.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    control: mpsc::UnboundedSender<Control>,
}

impl SessionHandle {
    fn send(&self, control: Control) -> Result<(), SyncError> {
        self.control
            .send(control)
            .map_err(|_| SyncError::ChannelClosed("surface"))
    }

    /// Wait until everything sent so far has been handled on both sides.
    ///
    /// # Errors
    /// Returns an error if either task has stopped.
    pub async fn settle(&self) -> Result<(), SyncError> {
        let (tx, rx) = oneshot::channel();
        self.send(Control::Barrier(tx))?;
        rx.await.map_err(|_| SyncError::ChannelClosed("host"))
    }

    /// Deliver `event` to the surface and settle.
    ///
    /// # Errors
    /// Returns an error if either task has stopped.
    pub async fn input(&self, event: InputEvent) -> Result<(), SyncError> {
        self.send(Control::Input(event))?;
        self.settle().await
    }

    /// Deliver `command` to the host and settle.
    ///
    /// # Errors
    /// Returns an error if either task has stopped.
    pub async fn host(&self, command: HostCommand) -> Result<(), SyncError> {
        self.send(Control::Host(command))?;
        self.settle().await
    }

    /// What the surface shows once pending traffic has settled.
    ///
    /// # Errors
    /// Returns an error if the surface is unavailable.
    pub async fn surface_view(&self) -> Result<SurfaceView, SyncError> {
        self.settle().await?;
        let (tx, rx) = oneshot::channel();
        self.send(Control::Inspect(tx))?;
        rx.await.map_err(|_| SyncError::ChannelClosed("surface"))
    }

    /// # Errors
    /// Returns an error if the host task has stopped.
    pub async fn host_view(&self) -> Result<HostView, SyncError> {
        let (tx, rx) = oneshot::channel();
        self.host(HostCommand::Show(tx)).await?;
        rx.await.map_err(|_| SyncError::ChannelClosed("host"))
    }
}

fn send_up(up: &mpsc::UnboundedSender<Upstream>, messages: Vec<SurfaceMessage>) -> Result<(), SyncError> {
    for message in messages {
        up.send(Upstream::Message(message))
            .map_err(|_| SyncError::ChannelClosed("host"))?;
    }
    Ok(())
}

fn send_down(down: &mpsc::UnboundedSender<Downstream>, messages: Vec<HostMessage>) {
    for message in messages {
        if down.send(Downstream::Message(message)).is_err() {
            tracing::debug!("surface gone, host message dropped");
            return;
        }
    }
}

/// Run the surface task until the driver hangs up.
///
/// Returns the session, or `None` when the surface failed to initialize. A
/// failed surface still answers barriers so the driver is not stranded.
///
/// # Errors
/// Returns an error if the host task stops first.
pub async fn run_surface<T: StateStore>(
    options: SurfaceOptions,
    store: T,
    ends: SurfaceEnds,
) -> Result<Option<SurfaceSession<T>>, SyncError> {
    let SurfaceEnds {
        mut control,
        up,
        mut down,
    } = ends;
    let mut session = match SurfaceSession::start(options, store) {
        Ok((session, initialized)) => {
            send_up(&up, vec![initialized])?;
            Some(session)
        }
        Err(e) => {
            tracing::error!(error = %e, "surface failed to start");
            send_up(
                &up,
                vec![SurfaceMessage::EditorInitializationError {
                    error: e.to_string(),
                }],
            )?;
            None
        }
    };

    loop {
        tokio::select! {
            biased;
            Some(message) = down.recv() => match message {
                Downstream::Message(message) => {
                    if let Some(session) = session.as_mut() {
                        send_up(&up, session.handle_host_message(message))?;
                    }
                }
                Downstream::Barrier(done) => {
                    let _ = done.send(());
                }
            },
            next = control.recv() => match next {
                None => break,
                Some(Control::Input(event)) => {
                    if let Some(session) = session.as_mut() {
                        send_up(&up, session.handle_input(event))?;
                    }
                }
                Some(Control::Host(command)) => {
                    up.send(Upstream::Command(command))
                        .map_err(|_| SyncError::ChannelClosed("host"))?;
                }
                Some(Control::Inspect(reply)) => {
                    if let Some(session) = session.as_ref() {
                        let _ = reply.send(session.view());
                    }
                }
                Some(Control::Barrier(done)) => {
                    up.send(Upstream::Barrier(done))
                        .map_err(|_| SyncError::ChannelClosed("host"))?;
                }
            },
        }
    }
    tracing::debug!("surface task finished");
    Ok(session)
}

/// Run the host task until the surface task ends.
///
/// When `host` watches its file, the watcher is polled every [`WATCH_POLL`].
pub async fn run_host<S: HostShell>(mut host: HostSide<S>, ends: HostEnds) -> HostSide<S> {
    let HostEnds { mut up, down } = ends;
    send_down(&down, host.opening_messages());
    let mut poll = tokio::time::interval(WATCH_POLL);

    loop {
        tokio::select! {
            next = up.recv() => match next {
                None => break,
                Some(Upstream::Message(message)) => {
                    let replies = host.handle(message);
                    send_down(&down, replies);
                }
                Some(Upstream::Command(command)) => {
                    let replies = run_command(&mut host, command);
                    send_down(&down, replies);
                }
                Some(Upstream::Barrier(done)) => {
                    if let Err(mpsc::error::SendError(Downstream::Barrier(done))) =
                        down.send(Downstream::Barrier(done))
                    {
                        let _ = done.send(());
                    }
                }
            },
            _ = poll.tick(), if host.is_watching() => match host.poll_watcher() {
                Ok(replies) => send_down(&down, replies),
                Err(e) => tracing::warn!(error = %e, "could not reload document"),
            },
        }
    }
    tracing::debug!("host task finished");
    host
}

fn run_command<S: HostShell>(host: &mut HostSide<S>, command: HostCommand) -> Vec<HostMessage> {
    match command {
        HostCommand::Save => match host.save() {
            Ok(replies) => replies,
            Err(e) => {
                tracing::error!(error = %e, "save failed");
                host.shell_mut().show_error(&format!("Could not save: {e}"));
                Vec::new()
            }
        },
        HostCommand::SetClipboard(text) => {
            host.shell_mut().set_clipboard(text);
            Vec::new()
        }
        HostCommand::Scroll(line) => host.scroll(line),
        HostCommand::Show(reply) => {
            let document = host.document();
            let _ = reply.send(HostView {
                text: document.text(),
                dirty: document.is_dirty(),
                eol: document.eol(),
            });
            Vec::new()
        }
    }
}
