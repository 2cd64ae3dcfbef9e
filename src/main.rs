use std::io::{self, BufRead};
use std::sync::{Arc, Mutex};
use std::thread;

use crossbeam_channel::{bounded, select, unbounded};
use log::{error, info, warn};

use airmouse::app::console::HELP;
use airmouse::app::{
    ActionMap, ConsoleCommand, Controller, CooldownTracker, DispatchRouter, LogListener,
    LoggingInjector,
};
use airmouse::config::ConfigManager;
use airmouse::database::open_store;
use airmouse::gesture::GestureEngine;
use airmouse::logger;
use airmouse::motion::MotionFilter;
use airmouse::session::DeviceSession;
use airmouse::transport::TcpEndpoint;

const SCREEN_WIDTH: f64 = 1920.0;
const SCREEN_HEIGHT: f64 = 1080.0;

fn main() {
    logger::init_logger();
    info!("airmouse starting");

    if let Err(e) = run() {
        error!("airmouse failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let manager = ConfigManager::load()?;
    let config = manager.get_config().clone();

    let store = open_store(&config.storage)?;
    let mut engine = GestureEngine::new(store, Box::new(config.classifier()), config.gesture_settings());
    if engine.load_from_store() > 0 {
        if let Err(e) = engine.train() {
            warn!("Stored gestures not trained: {}", e);
        }
    }
    let engine = Arc::new(Mutex::new(engine));
    let filter = Arc::new(Mutex::new(MotionFilter::new(config.motion_settings())));

    // An optional host:port argument wins over the configured endpoint.
    let mut endpoint = config.endpoint();
    if let Some(arg) = std::env::args().nth(1) {
        match TcpEndpoint::parse(&arg) {
            Some(parsed) => endpoint = parsed.with_connect_timeout(endpoint.connect_timeout),
            None => warn!("Ignoring invalid endpoint argument '{}'", arg),
        }
    }

    let (session, events) = DeviceSession::connect(&endpoint, config.session_options())?;

    let actions = if config.actions.is_empty() {
        ActionMap::with_defaults()
    } else {
        ActionMap::new(config.actions.clone())
    };
    let cooldown = CooldownTracker::with_overrides(config.default_cooldown(), config.gesture_cooldowns());
    let mut router = DispatchRouter::new(
        Arc::clone(&filter),
        Arc::clone(&engine),
        cooldown,
        Box::new(LoggingInjector::new(actions, SCREEN_WIDTH, SCREEN_HEIGHT)),
        Box::new(LogListener),
    );
    let (done_tx, done_rx) = bounded::<()>(1);
    let router_handle = thread::Builder::new()
        .name("airmouse-router".into())
        .spawn(move || {
            router.run(&events);
            let _ = done_tx.send(());
        })?;

    // stdin blocks, so it is read on its own thread and selected against
    // the router finishing.
    let (line_tx, line_rx) = unbounded::<io::Result<String>>();
    thread::Builder::new()
        .name("airmouse-stdin".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                if line_tx.send(line).is_err() {
                    break;
                }
            }
        })?;

    info!("{}", HELP);
    let mut controller = Controller::new(&session, engine, filter);
    loop {
        select! {
            recv(line_rx) -> line => {
                let Ok(line) = line else {
                    info!("stdin closed");
                    break;
                };
                match ConsoleCommand::parse(&line?) {
                    None => {}
                    Some(Err(message)) => warn!("{}", message),
                    Some(Ok(command)) => {
                        if !controller.execute(command) {
                            break;
                        }
                    }
                }
            }
            recv(done_rx) -> _ => {
                warn!("Device connection lost");
                break;
            }
        }
    }

    session.disconnect();
    if router_handle.join().is_err() {
        error!("Dispatch router thread panicked");
    }
    info!("airmouse stopped");
    Ok(())
}
