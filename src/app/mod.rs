pub mod actions;
pub mod collaborators;
pub mod console;
pub mod cooldown;
pub mod router;

pub use actions::{Action, ActionMap, LoggingInjector};
pub use collaborators::{InputInjector, LogListener, UiListener};
pub use console::{ConsoleCommand, Controller};
pub use cooldown::CooldownTracker;
pub use router::{DispatchRouter, SharedEngine, SharedFilter};
