use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};

use log::{debug, error, info, trace, warn};

use super::connector::{Connector, StreamParts};
use super::error::TransportError;
use super::framer::{LineFramer, DEFAULT_MAX_LINE};

pub type LineCallback = Box<dyn FnMut(String) + Send>;
pub type DisconnectCallback = Box<dyn FnOnce(DisconnectReason) + Send>;

/// Why the reader loop stopped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisconnectReason {
    Requested,
    PeerClosed,
    ReadError(String),
    WriteError(String),
}

impl DisconnectReason {
    pub fn is_error(&self) -> bool {
        !matches!(self, DisconnectReason::Requested)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Shared {
    connected: AtomicBool,
    closing: AtomicBool,
    close_reason: Mutex<Option<DisconnectReason>>,
    writer: Mutex<Option<Box<dyn Write + Send>>>,
    closer: Mutex<Option<Box<dyn FnOnce() + Send>>>,
    on_line: Mutex<Option<LineCallback>>,
    on_disconnect: Mutex<Option<DisconnectCallback>>,
}

impl Shared {
    fn begin_close(&self, reason: DisconnectReason) {
        {
            let mut slot = lock(&self.close_reason);
            if slot.is_none() {
                *slot = Some(reason);
            }
        }
        self.closing.store(true, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        self.release_stream();
    }

    fn release_stream(&self) {
        let closer = lock(&self.closer).take();
        if let Some(close) = closer {
            close();
        }
    }

    fn deliver(&self, line: String) {
        trace!("<- {}", line);
        match lock(&self.on_line).as_mut() {
            Some(callback) => callback(line),
            None => debug!("No line handler installed, dropping: {}", line),
        }
    }

    fn finish(&self, observed: DisconnectReason) {
        let reason = lock(&self.close_reason).take().unwrap_or(observed);
        self.connected.store(false, Ordering::SeqCst);
        self.closing.store(true, Ordering::SeqCst);
        lock(&self.writer).take();
        self.release_stream();
        // Dropping the line handler drops whatever it captured (event senders).
        lock(&self.on_line).take();

        match &reason {
            DisconnectReason::Requested => info!("Transport disconnected"),
            DisconnectReason::PeerClosed => warn!("Connection closed by device"),
            DisconnectReason::ReadError(e) | DisconnectReason::WriteError(e) => {
                error!("Transport lost: {}", e)
            }
        }

        let callback = lock(&self.on_disconnect).take();
        if let Some(callback) = callback {
            callback(reason);
        }
    }
}

/// Newline-framed duplex connection with one dedicated reader thread.
pub struct LineTransport {
    shared: Arc<Shared>,
    reader: Mutex<Option<JoinHandle<()>>>,
    reader_id: Option<ThreadId>,
    description: String,
}

impl LineTransport {
    pub fn connect(connector: &dyn Connector, read_buffer_size: usize) -> Result<Self, TransportError> {
        let parts = connector.open()?;
        Self::from_parts(parts, connector.describe(), read_buffer_size)
    }

    /// Starts the reader thread over an already opened stream.
    pub fn from_parts(
        parts: StreamParts,
        description: String,
        read_buffer_size: usize,
    ) -> Result<Self, TransportError> {
        let StreamParts {
            reader,
            writer,
            closer,
        } = parts;

        let shared = Arc::new(Shared {
            connected: AtomicBool::new(true),
            closing: AtomicBool::new(false),
            close_reason: Mutex::new(None),
            writer: Mutex::new(Some(writer)),
            closer: Mutex::new(Some(closer)),
            on_line: Mutex::new(None),
            on_disconnect: Mutex::new(None),
        });

        let loop_shared = Arc::clone(&shared);
        let buffer_size = read_buffer_size.max(1);
        let handle = thread::Builder::new()
            .name("airmouse-reader".to_string())
            .spawn(move || read_loop(reader, loop_shared, buffer_size))?;

        Ok(Self {
            shared,
            reader_id: Some(handle.thread().id()),
            reader: Mutex::new(Some(handle)),
            description,
        })
    }

    /// Runs on the reader thread, once per line.
    pub fn set_on_line<F>(&self, callback: F)
    where
        F: FnMut(String) + Send + 'static,
    {
        *lock(&self.shared.on_line) = Some(Box::new(callback));
    }

    pub fn set_on_disconnect<F>(&self, callback: F)
    where
        F: FnOnce(DisconnectReason) + Send + 'static,
    {
        *lock(&self.shared.on_disconnect) = Some(Box::new(callback));
    }

    pub fn write(&self, bytes: &[u8]) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }

        let result = {
            let mut writer = lock(&self.shared.writer);
            let stream = writer.as_mut().ok_or(TransportError::NotConnected)?;
            stream.write_all(bytes).and_then(|_| stream.flush())
        };

        match result {
            Ok(()) => {
                trace!("-> {}", String::from_utf8_lossy(bytes).trim_end());
                Ok(())
            }
            Err(e) => {
                error!("Write to {} failed: {}", self.description, e);
                self.shared
                    .begin_close(DisconnectReason::WriteError(e.to_string()));
                Err(TransportError::Write(e))
            }
        }
    }

    /// Writes `line` followed by `\n`.
    pub fn write_line(&self, line: &str) -> Result<(), TransportError> {
        let mut bytes = Vec::with_capacity(line.len() + 1);
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(b'\n');
        self.write(&bytes)
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn disconnect(&self) {
        self.shared.begin_close(DisconnectReason::Requested);

        if Some(thread::current().id()) == self.reader_id {
            // Called from a line handler; the loop exits after it returns.
            return;
        }

        let handle = lock(&self.reader).take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!("Reader thread for {} panicked", self.description);
            }
        }
    }
}

impl Drop for LineTransport {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn read_loop(mut reader: Box<dyn Read + Send>, shared: Arc<Shared>, buffer_size: usize) {
    let mut framer = LineFramer::with_max_line(DEFAULT_MAX_LINE.max(buffer_size * 4));
    let mut buffer = vec![0u8; buffer_size];

    let observed = loop {
        if shared.closing.load(Ordering::SeqCst) {
            break DisconnectReason::Requested;
        }

        match reader.read(&mut buffer) {
            Ok(0) => break DisconnectReason::PeerClosed,
            Ok(n) => {
                for line in framer.push(&buffer[..n]) {
                    shared.deliver(line);
                }
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => break DisconnectReason::ReadError(e.to_string()),
        }
    };

    if framer.pending_len() > 0 {
        debug!("Discarding {} bytes of unterminated input", framer.pending_len());
    }
    shared.finish(observed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{unbounded, Receiver, Sender};
    use std::io;
    use std::time::Duration;

    /// Reader fed chunk by chunk through a channel; EOF once every sender is gone.
    struct ChannelReader {
        rx: Receiver<Vec<u8>>,
    }

    impl Read for ChannelReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.rx.recv() {
                Ok(chunk) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    Ok(n)
                }
                Err(_) => Ok(0),
            }
        }
    }

    #[derive(Clone, Default)]
    struct SharedWriter(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn pipe() -> (LineTransport, Sender<Vec<u8>>, SharedWriter, Arc<Mutex<usize>>) {
        let (tx, rx) = unbounded();
        let writer = SharedWriter::default();
        let closes = Arc::new(Mutex::new(0usize));
        let closer_tx = tx.clone();
        let close_count = Arc::clone(&closes);
        let parts = StreamParts {
            reader: Box::new(ChannelReader { rx }),
            writer: Box::new(writer.clone()),
            closer: Box::new(move || {
                *close_count.lock().unwrap() += 1;
                // An empty chunk reads as EOF and wakes the blocked reader.
                let _ = closer_tx.send(Vec::new());
            }),
        };
        let transport = LineTransport::from_parts(parts, "pipe".to_string(), 8).unwrap();
        (transport, tx, writer, closes)
    }

    #[test]
    fn delivers_lines_in_order_across_chunks() {
        let (transport, tx, _writer, _closes) = pipe();
        let (line_tx, line_rx) = unbounded();
        transport.set_on_line(move |line| {
            let _ = line_tx.send(line);
        });

        tx.send(b"MODE_CU".to_vec()).unwrap();
        tx.send(b"RSOR\r\nCURSOR,1,".to_vec()).unwrap();
        tx.send(b"2\n".to_vec()).unwrap();

        let timeout = Duration::from_secs(2);
        assert_eq!(line_rx.recv_timeout(timeout).unwrap(), "MODE_CURSOR");
        assert_eq!(line_rx.recv_timeout(timeout).unwrap(), "CURSOR,1,2");
        transport.disconnect();
    }

    #[test]
    fn writes_are_passed_through() {
        let (transport, _tx, writer, _closes) = pipe();
        transport.write_line("INIT_CHECK").unwrap();
        transport.write(b"CURSOR_MODE\n").unwrap();
        assert_eq!(&*writer.0.lock().unwrap(), b"INIT_CHECK\nCURSOR_MODE\n");
        transport.disconnect();
    }

    #[test]
    fn peer_close_stops_loop_and_reports_reason() {
        let (transport, tx, _writer, closes) = pipe();
        let (reason_tx, reason_rx) = unbounded();
        transport.set_on_disconnect(move |reason| {
            let _ = reason_tx.send(reason);
        });

        tx.send(Vec::new()).unwrap();

        let reason = reason_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(reason, DisconnectReason::PeerClosed);
        assert!(!transport.is_connected());
        assert!(matches!(
            transport.write(b"IDLE_MODE\n"),
            Err(TransportError::NotConnected)
        ));
        assert_eq!(*closes.lock().unwrap(), 1);
    }

    #[test]
    fn disconnect_is_idempotent_and_closes_once() {
        let (transport, _tx, _writer, closes) = pipe();
        let transport = Arc::new(transport);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let t = Arc::clone(&transport);
                thread::spawn(move || t.disconnect())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        transport.disconnect();

        assert!(!transport.is_connected());
        assert_eq!(*closes.lock().unwrap(), 1);
    }
}
