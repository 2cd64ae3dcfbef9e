use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, TrySendError};
use log::{debug, error, info, warn};

use crate::transport::{Connector, DisconnectReason, LineTransport};
use crate::types::{parse_line, CalibrationKind, Command, DeviceEvent, DeviceMode};

use super::error::SessionError;
use super::state::{ConnectionState, SessionState};

/// Timeouts and sizes a session is opened with.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionOptions {
    pub handshake_timeout: Duration,
    pub calibration_timeout: Duration,
    pub read_buffer_size: usize,
    pub event_channel_capacity: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(5),
            calibration_timeout: Duration::from_secs(5),
            read_buffer_size: 1024,
            event_channel_capacity: 1024,
        }
    }
}

struct Inner {
    state: Mutex<SessionState>,
    changed: Condvar,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update<F: FnOnce(&mut SessionState)>(&self, f: F) {
        f(&mut self.lock());
        self.changed.notify_all();
    }

    fn wait_until<F>(&self, timeout: Duration, mut done: F) -> (MutexGuard<'_, SessionState>, bool)
    where
        F: FnMut(&SessionState) -> bool,
    {
        let guard = self.lock();
        let (guard, result) = self
            .changed
            .wait_timeout_while(guard, timeout, |state| !done(state))
            .unwrap_or_else(PoisonError::into_inner);
        (guard, result.timed_out())
    }
}

/// One connection to the device. The event receiver closes with it.
pub struct DeviceSession {
    transport: LineTransport,
    inner: Arc<Inner>,
    options: SessionOptions,
}

impl DeviceSession {
    /// Opens the transport, sends `INIT_CHECK` and waits for `INIT_COMPLETE`.
    pub fn connect(
        connector: &dyn Connector,
        options: SessionOptions,
    ) -> Result<(Self, Receiver<DeviceEvent>), SessionError> {
        info!("Connecting to device at {}", connector.describe());
        let transport = LineTransport::connect(connector, options.read_buffer_size)?;

        let inner = Arc::new(Inner {
            state: Mutex::new(SessionState::default()),
            changed: Condvar::new(),
        });
        let (event_tx, event_rx) = bounded(options.event_channel_capacity.max(1));

        let disconnect_inner = Arc::clone(&inner);
        transport.set_on_disconnect(move |reason: DisconnectReason| {
            disconnect_inner.update(|state| state.mark_disconnected(reason.is_error()));
        });

        let line_inner = Arc::clone(&inner);
        transport.set_on_line(move |line: String| {
            let event = parse_line(&line);
            if let DeviceEvent::Unknown(_) = event {
                debug!("Unrecognized line: {}", line);
            }
            line_inner.update(|state| state.apply(&event));

            match event_tx.try_send(event) {
                Ok(()) => {}
                Err(TrySendError::Full(event)) => {
                    warn!("Event channel full, dropping {:?}", event);
                }
                Err(TrySendError::Disconnected(_)) => {
                    debug!("Event receiver gone, line handled for state only");
                }
            }
        });

        let session = Self {
            transport,
            inner,
            options,
        };

        if !session.transport.is_connected() {
            return Err(SessionError::Disconnected);
        }

        if let Err(e) = session.send(Command::InitCheck) {
            session.transport.disconnect();
            return Err(e);
        }

        let timeout = session.options.handshake_timeout;
        let (state, timed_out) = session.inner.wait_until(timeout, |s| {
            s.initialized || s.init_rejected || s.connection.is_disconnected()
        });
        let outcome = if state.initialized {
            Ok(())
        } else if state.init_rejected {
            Err(SessionError::InitRejected)
        } else if state.connection.is_disconnected() {
            Err(SessionError::Disconnected)
        } else if timed_out {
            Err(SessionError::HandshakeTimeout(timeout))
        } else {
            Err(SessionError::Disconnected)
        };
        drop(state);

        match outcome {
            Ok(()) => {
                info!("Device initialized successfully");
                Ok((session, event_rx))
            }
            Err(e) => {
                error!("Device initialization failed: {}", e);
                session.transport.disconnect();
                Err(e)
            }
        }
    }

    /// Blocks until the device finishes, the timeout expires or the link drops.
    pub fn calibrate(&self, kind: CalibrationKind) -> Result<(), SessionError> {
        let start = {
            let mut state = self.inner.lock();
            match state.connection {
                ConnectionState::Ready => {}
                ConnectionState::Calibrating => return Err(SessionError::AlreadyCalibrating),
                ConnectionState::Disconnected | ConnectionState::DisconnectedOnError => {
                    return Err(SessionError::Disconnected)
                }
                other => return Err(SessionError::NotReady(other)),
            }
            state.connection = ConnectionState::Calibrating;
            state.requested_calibration = Some(kind);
            state.terminal_events
        };
        info!("Starting {:?} calibration", kind);

        if let Err(e) = self.send(Command::Calibrate(kind)) {
            self.inner.update(|state| {
                if state.connection == ConnectionState::Calibrating {
                    state.connection = ConnectionState::Ready;
                }
                state.requested_calibration = None;
            });
            return Err(e);
        }

        let timeout = self.options.calibration_timeout;
        let (mut state, _) = self.inner.wait_until(timeout, |s| {
            s.terminal_events > start || s.connection.is_disconnected()
        });

        if state.terminal_events > start {
            return if state.last_calibration_ok == Some(true) {
                info!("Calibration completed");
                Ok(())
            } else {
                warn!("Calibration failed");
                Err(SessionError::CalibrationFailed)
            };
        }
        if state.connection.is_disconnected() {
            return Err(SessionError::Disconnected);
        }

        error!("Calibration timeout after {:?}", timeout);
        if state.connection == ConnectionState::Calibrating {
            state.connection = ConnectionState::Ready;
        }
        state.requested_calibration = None;
        drop(state);
        self.inner.changed.notify_all();
        Err(SessionError::CalibrationTimeout(timeout))
    }

    /// Does not wait for the `MODE_*` acknowledgment.
    pub fn set_mode(&self, mode: DeviceMode) -> Result<(), SessionError> {
        {
            let mut state = self.inner.lock();
            if state.connection.is_disconnected() {
                return Err(SessionError::Disconnected);
            }
            state.requested_mode = Some(mode);
        }
        self.send(Command::SetMode(mode))?;
        info!("Requested {:?} mode", mode);
        Ok(())
    }

    pub fn send(&self, command: Command) -> Result<(), SessionError> {
        debug!("Sending {}", command.as_wire());
        self.transport.write(&command.to_bytes())?;
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().clone()
    }

    pub fn is_ready(&self) -> bool {
        self.inner.lock().connection == ConnectionState::Ready
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    pub fn endpoint(&self) -> &str {
        self.transport.description()
    }

    /// Idempotent.
    pub fn disconnect(&self) {
        self.transport.disconnect();
        self.inner.update(|state| {
            if !state.connection.is_disconnected() {
                state.mark_disconnected(false);
            }
        });
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        self.disconnect();
    }
}
