//! TCP listener that accepts connections on a background thread.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::admission::{AdmissionGate, Permit};
use super::{ConnectionHandler, ConnectionId, LISTENER_TARGET, ListenerError};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// Shared stop request observed by the accept loop.
///
/// The flag owns the listening socket once the listener has started.
/// Triggering any clone closes that socket before returning, so later
/// connection attempts are refused straight away.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<StopState>);

#[derive(Debug, Default)]
struct StopState {
    requested: AtomicBool,
    listener: Mutex<Option<TcpListener>>,
}

impl ShutdownFlag {
    /// Requests a stop and closes the listening socket. Repeated calls have
    /// no further effect.
    pub fn trigger(&self) {
        self.0.requested.store(true, Ordering::SeqCst);
        if let Some(listener) = self.slot().take() {
            debug!(target: LISTENER_TARGET, "closing listening socket");
            drop(listener);
        }
    }

    /// Returns true once a stop was requested.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.0.requested.load(Ordering::SeqCst)
    }

    /// Hands the listening socket to the flag; it is closed at once when a
    /// stop was already requested.
    fn install(&self, listener: TcpListener) {
        let mut slot = self.slot();
        if !self.is_triggered() {
            *slot = Some(listener);
        }
    }

    /// Runs `accept` against the socket while it is still open.
    fn with_listener<T>(&self, accept: impl FnOnce(&TcpListener) -> T) -> Option<T> {
        self.slot().as_ref().map(accept)
    }

    fn slot(&self) -> MutexGuard<'_, Option<TcpListener>> {
        self.0
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Listener bound to a TCP address.
#[derive(Debug)]
pub(crate) struct SocketListener {
    listener: TcpListener,
    addr: SocketAddr,
    connection_limit: Option<usize>,
}

impl SocketListener {
    pub(crate) fn bind(host: &str, port: u16) -> Result<Self, ListenerError> {
        let listener = bind_tcp(host, port)?;
        let addr = listener
            .local_addr()
            .map_err(|source| ListenerError::LocalAddr { source })?;
        Ok(Self {
            listener,
            addr,
            connection_limit: None,
        })
    }

    /// Caps concurrently served connections; `None` removes the cap.
    pub(crate) fn with_connection_limit(mut self, limit: Option<usize>) -> Self {
        self.connection_limit = limit;
        self
    }

    pub(crate) fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub(crate) fn start(
        self,
        handler: Arc<dyn ConnectionHandler>,
        shutdown: ShutdownFlag,
    ) -> Result<ListenerHandle, ListenerError> {
        let Self {
            listener,
            addr,
            connection_limit,
        } = self;
        listener
            .set_nonblocking(true)
            .map_err(|source| ListenerError::NonBlocking { source })?;
        shutdown.install(listener);
        let gate = AdmissionGate::new(connection_limit);
        let loop_flag = shutdown.clone();
        let loop_gate = Arc::clone(&gate);
        let spawned = thread::Builder::new()
            .name(String::from("buildwire-accept"))
            .spawn(move || run_accept_loop(addr, &loop_gate, &loop_flag, &handler));
        let handle = match spawned {
            Ok(handle) => handle,
            Err(source) => {
                shutdown.trigger();
                return Err(ListenerError::ThreadSpawn { source });
            }
        };
        Ok(ListenerHandle {
            shutdown,
            gate,
            handle: Some(handle),
        })
    }
}

/// Handle to the background listener thread and the connections it admitted.
#[derive(Debug)]
pub(crate) struct ListenerHandle {
    shutdown: ShutdownFlag,
    gate: Arc<AdmissionGate>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ListenerHandle {
    /// Closes the listening socket before returning.
    pub(crate) fn shutdown(&self) {
        self.shutdown.trigger();
    }

    pub(crate) fn flag(&self) -> ShutdownFlag {
        self.shutdown.clone()
    }

    /// Waits for the accept loop to exit, then for every admitted connection
    /// to finish.
    pub(crate) fn join(mut self) -> Result<(), ListenerError> {
        if let Some(handle) = self.handle.take() {
            handle.join().map_err(|_| ListenerError::ThreadPanic)?;
        }
        let active = self.gate.active();
        if active > 0 {
            info!(target: LISTENER_TARGET, active, "waiting for connections to finish");
        }
        self.gate.wait_idle();
        Ok(())
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

fn run_accept_loop(
    addr: SocketAddr,
    gate: &Arc<AdmissionGate>,
    shutdown: &ShutdownFlag,
    handler: &Arc<dyn ConnectionHandler>,
) {
    info!(
        target: LISTENER_TARGET,
        %addr,
        max_connections = ?gate.limit(),
        "socket listener active"
    );
    let mut last_error = None::<io::ErrorKind>;
    while let Some(permit) = gate.acquire(shutdown) {
        let Some(accepted) = shutdown.with_listener(accept_connection) else {
            break;
        };
        match accepted {
            Ok(Some((stream, peer))) => {
                last_error = None;
                debug!(
                    target: LISTENER_TARGET,
                    %peer,
                    active = gate.active(),
                    "accepted connection"
                );
                spawn_connection(stream, peer, permit, handler);
            }
            Ok(None) => {
                drop(permit);
                thread::sleep(ACCEPT_BACKOFF);
            }
            Err(error) => {
                drop(permit);
                let kind = error.kind();
                if last_error != Some(kind) {
                    warn!(
                        target: LISTENER_TARGET,
                        error = %error,
                        "socket accept error"
                    );
                }
                last_error = Some(kind);
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }
    info!(target: LISTENER_TARGET, %addr, "socket listener stopped");
}

fn accept_connection(listener: &TcpListener) -> Result<Option<(TcpStream, SocketAddr)>, io::Error> {
    match listener.accept() {
        Ok((stream, peer)) => {
            stream.set_nonblocking(false)?;
            Ok(Some((stream, peer)))
        }
        Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
        Err(error) => Err(error),
    }
}

fn spawn_connection(
    stream: TcpStream,
    peer: SocketAddr,
    permit: Permit,
    handler: &Arc<dyn ConnectionHandler>,
) {
    let id = ConnectionId::next();
    let handler = Arc::clone(handler);
    let spawned = thread::Builder::new()
        .name(format!("buildwire-conn-{id}"))
        .spawn(move || {
            let _permit = permit;
            handler.handle(stream, id);
        });
    if let Err(error) = spawned {
        warn!(
            target: LISTENER_TARGET,
            connection = %id,
            %peer,
            error = %error,
            "failed to spawn connection thread"
        );
    }
}

fn bind_tcp(host: &str, port: u16) -> Result<TcpListener, ListenerError> {
    let mut addrs = (host, port)
        .to_socket_addrs()
        .map_err(|source| ListenerError::Resolve {
            host: host.to_string(),
            port,
            source,
        })?;
    let addr = addrs.next().ok_or_else(|| ListenerError::ResolveEmpty {
        host: host.to_string(),
        port,
    })?;
    TcpListener::bind(addr).map_err(|source| ListenerError::BindTcp { addr, source })
}
