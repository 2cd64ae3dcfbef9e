#![allow(dead_code)]

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use airmouse::app::{InputInjector, UiListener};
use airmouse::transport::TcpEndpoint;

/// Scripted device on a loopback socket. Replies are written in small
/// chunks so the host sees lines split across reads.
pub struct FakeDevice {
    pub endpoint: TcpEndpoint,
    handle: JoinHandle<Vec<String>>,
}

impl FakeDevice {
    pub fn spawn<F>(mut respond: F) -> Self
    where
        F: FnMut(&str) -> Vec<String> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let handle = thread::spawn(move || {
            let mut received = Vec::new();
            let (stream, _) = match listener.accept() {
                Ok(conn) => conn,
                Err(_) => return received,
            };
            let mut writer = stream.try_clone().unwrap();
            let reader = BufReader::new(stream);

            for line in reader.lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(_) => break,
                };
                for reply in respond(&line) {
                    let bytes = format!("{}\r\n", reply).into_bytes();
                    for chunk in bytes.chunks(5) {
                        if writer.write_all(chunk).and_then(|_| writer.flush()).is_err() {
                            return received;
                        }
                    }
                }
                received.push(line);
            }
            received
        });

        Self {
            endpoint: TcpEndpoint::new("127.0.0.1", port).with_connect_timeout(Duration::from_secs(2)),
            handle,
        }
    }

    /// Commands the device received, once the host has closed the socket.
    pub fn received(self) -> Vec<String> {
        self.handle.join().unwrap()
    }
}

/// Replies every handshake with `INIT_COMPLETE` and ignores the rest.
pub fn handshake_only(line: &str) -> Vec<String> {
    match line {
        "INIT_CHECK" => vec!["INIT_COMPLETE".to_string()],
        _ => Vec::new(),
    }
}

pub fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Move(f64, f64),
    Action(String),
    Center,
    Progress(u8),
    Finished(bool),
    Recognized(String),
}

/// Collaborator double recording every call it receives.
#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<Call>>>);

impl Recorder {
    fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }
}

impl InputInjector for Recorder {
    fn move_pointer_by(&mut self, dx: f64, dy: f64) {
        self.push(Call::Move(dx, dy));
    }

    fn invoke_action(&mut self, label: &str) {
        self.push(Call::Action(label.to_string()));
    }

    fn center_pointer(&mut self) {
        self.push(Call::Center);
    }
}

impl UiListener for Recorder {
    fn on_calibration_progress(&mut self, percent: u8) {
        self.push(Call::Progress(percent));
    }

    fn on_calibration_finished(&mut self, success: bool) {
        self.push(Call::Finished(success));
    }

    fn on_gesture_recognized(&mut self, label: &str) {
        self.push(Call::Recognized(label.to_string()));
    }
}
