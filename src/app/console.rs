use log::{error, info, warn};

use super::router::{lock, SharedEngine, SharedFilter};
use crate::session::DeviceSession;
use crate::types::{CalibrationKind, DeviceMode};

/// One line typed on the daemon's stdin.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Mode(DeviceMode),
    Calibrate(CalibrationKind),
    Record(String),
    Stop,
    Train,
    List,
    Forget(String),
    Sensitivity(f64),
    Smoothing(f64),
    Status,
    Help,
    Quit,
}

pub const HELP: &str = "commands: cursor | gesture | idle | calibrate | calibrate-tilt | \
record <name> | stop | train | list | forget <name> | sensitivity <v> | smoothing <v> | \
status | help | quit";

impl ConsoleCommand {
    /// `None` for blank input; `Err` carries a message for the user.
    pub fn parse(line: &str) -> Option<Result<Self, String>> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        let number = |what: &str| {
            rest.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| format!("{} needs a number", what))
        };
        let name = |what: &str| {
            if rest.is_empty() {
                Err(format!("{} needs a gesture name", what))
            } else {
                Ok(rest.to_string())
            }
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "cursor" => Ok(Self::Mode(DeviceMode::Cursor)),
            "gesture" => Ok(Self::Mode(DeviceMode::Gesture)),
            "idle" => Ok(Self::Mode(DeviceMode::Idle)),
            "calibrate" => Ok(Self::Calibrate(CalibrationKind::Sensor)),
            "calibrate-tilt" => Ok(Self::Calibrate(CalibrationKind::Tilt)),
            "record" => name("record").map(Self::Record),
            "stop" => Ok(Self::Stop),
            "train" => Ok(Self::Train),
            "list" => Ok(Self::List),
            "forget" => name("forget").map(Self::Forget),
            "sensitivity" => number("sensitivity").map(Self::Sensitivity),
            "smoothing" => number("smoothing").map(Self::Smoothing),
            "status" => Ok(Self::Status),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(format!("unknown command '{}'", other)),
        };
        Some(command)
    }
}

/// Executes console commands against one session and its shared engine and
/// filter.
pub struct Controller<'a> {
    session: &'a DeviceSession,
    engine: SharedEngine,
    filter: SharedFilter,
}

impl<'a> Controller<'a> {
    pub fn new(session: &'a DeviceSession, engine: SharedEngine, filter: SharedFilter) -> Self {
        Self {
            session,
            engine,
            filter,
        }
    }

    /// Returns false once the user asked to quit.
    pub fn execute(&mut self, command: ConsoleCommand) -> bool {
        match command {
            ConsoleCommand::Mode(mode) => {
                if mode == DeviceMode::Cursor {
                    lock(&self.filter).reset();
                }
                if let Err(e) = self.session.set_mode(mode) {
                    error!("Mode change failed: {}", e);
                }
            }
            ConsoleCommand::Calibrate(kind) => match self.session.calibrate(kind) {
                Ok(()) => info!("Calibration succeeded"),
                Err(e) => error!("Calibration failed: {}", e),
            },
            ConsoleCommand::Record(name) => {
                if let Err(e) = lock(&self.engine).start_recording(&name) {
                    warn!("{}", e);
                }
            }
            ConsoleCommand::Stop => {
                let count = lock(&self.engine).stop_recording();
                info!("Recording stopped, {} samples committed", count);
            }
            ConsoleCommand::Train => {
                // Fit outside the lock so the router keeps draining events.
                let job = lock(&self.engine).training_job();
                match job.run() {
                    Ok((model, summary)) => {
                        lock(&self.engine).install_model(model);
                        info!(
                            "Model ready: {} ({} samples, {} features)",
                            summary.classes.join(", "),
                            summary.samples,
                            summary.feature_len
                        )
                    }
                    Err(e) => error!("{}", e),
                }
            }
            ConsoleCommand::List => {
                let engine = lock(&self.engine);
                let gestures = engine.gestures();
                if gestures.is_empty() {
                    info!("No gestures recorded");
                }
                for (name, samples) in gestures.iter() {
                    info!("  {} ({} samples)", name, samples.len());
                }
            }
            ConsoleCommand::Forget(name) => {
                if !lock(&self.engine).remove_gesture(&name) {
                    warn!("No gesture named '{}'", name);
                }
            }
            ConsoleCommand::Sensitivity(value) => {
                lock(&self.filter).set_sensitivity(value);
                info!("Sensitivity set to {}", value);
            }
            ConsoleCommand::Smoothing(value) => {
                let mut filter = lock(&self.filter);
                filter.set_smoothing(value);
                info!("Smoothing set to {}", filter.settings().smoothing);
            }
            ConsoleCommand::Status => {
                let state = self.session.state();
                let engine = lock(&self.engine);
                info!(
                    "{:?} at {}, mode {:?} (requested {:?}), calibration {:?}, recording {:?}, model {}",
                    state.connection,
                    self.session.endpoint(),
                    state.mode,
                    state.requested_mode,
                    state.calibration,
                    engine.recording_name(),
                    if engine.has_model() { "trained" } else { "none" }
                );
            }
            ConsoleCommand::Help => info!("{}", HELP),
            ConsoleCommand::Quit => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<ConsoleCommand, String> {
        ConsoleCommand::parse(line).unwrap()
    }

    #[test]
    fn parses_commands() {
        assert_eq!(parse("cursor"), Ok(ConsoleCommand::Mode(DeviceMode::Cursor)));
        assert_eq!(
            parse("CALIBRATE-TILT"),
            Ok(ConsoleCommand::Calibrate(CalibrationKind::Tilt))
        );
        assert_eq!(parse("record  swipe up "), Ok(ConsoleCommand::Record("swipe up".into())));
        assert_eq!(parse("smoothing 0.3"), Ok(ConsoleCommand::Smoothing(0.3)));
        assert_eq!(parse("exit"), Ok(ConsoleCommand::Quit));
        assert!(ConsoleCommand::parse("   ").is_none());
    }

    #[test]
    fn reports_bad_arguments() {
        assert!(parse("record").is_err());
        assert!(parse("sensitivity fast").is_err());
        assert!(parse("sensitivity NaN").is_err());
        assert!(parse("jump").is_err());
    }
}
