use std::collections::BTreeMap;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::collaborators::InputInjector;

/// What a recognized gesture should trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Key(String),
    Hotkey(Vec<String>),
    Click,
    None,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Key(key) => write!(f, "key {}", key),
            Action::Hotkey(keys) => write!(f, "hotkey {}", keys.join("+")),
            Action::Click => write!(f, "click"),
            Action::None => write!(f, "none"),
        }
    }
}

/// Gesture label to action. Unmapped labels resolve to `Action::None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionMap {
    actions: BTreeMap<String, Action>,
}

impl ActionMap {
    pub fn new(actions: BTreeMap<String, Action>) -> Self {
        Self { actions }
    }

    /// Media keys for the directional gestures, app switch on CIRCLE and
    /// undo on SHAKE.
    pub fn with_defaults() -> Self {
        let actions = [
            ("UP", Action::Key("volumeup".into())),
            ("DOWN", Action::Key("volumedown".into())),
            ("LEFT", Action::Key("prevtrack".into())),
            ("RIGHT", Action::Key("nexttrack".into())),
            ("CIRCLE", Action::Hotkey(vec!["alt".into(), "tab".into()])),
            ("SHAKE", Action::Hotkey(vec!["ctrl".into(), "z".into()])),
        ]
        .into_iter()
        .map(|(label, action)| (label.to_string(), action))
        .collect();
        Self { actions }
    }

    pub fn resolve(&self, label: &str) -> &Action {
        self.actions.get(label).unwrap_or(&Action::None)
    }

    pub fn insert(&mut self, label: impl Into<String>, action: Action) {
        self.actions.insert(label.into(), action);
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Tracks a virtual pointer clamped to the screen and logs every action
/// instead of injecting it.
#[derive(Debug)]
pub struct LoggingInjector {
    actions: ActionMap,
    screen: (f64, f64),
    position: (f64, f64),
    invoked: Vec<Action>,
}

impl LoggingInjector {
    pub fn new(actions: ActionMap, screen_width: f64, screen_height: f64) -> Self {
        Self {
            actions,
            screen: (screen_width, screen_height),
            position: (screen_width / 2.0, screen_height / 2.0),
            invoked: Vec::new(),
        }
    }

    pub fn position(&self) -> (f64, f64) {
        self.position
    }

    pub fn invoked(&self) -> &[Action] {
        &self.invoked
    }
}

impl InputInjector for LoggingInjector {
    fn move_pointer_by(&mut self, dx: f64, dy: f64) {
        let (w, h) = self.screen;
        self.position.0 = (self.position.0 + dx).clamp(0.0, (w - 1.0).max(0.0));
        self.position.1 = (self.position.1 + dy).clamp(0.0, (h - 1.0).max(0.0));
        debug!("Pointer at ({:.1}, {:.1})", self.position.0, self.position.1);
    }

    fn invoke_action(&mut self, label: &str) {
        let action = self.actions.resolve(label).clone();
        if action == Action::None {
            debug!("No action mapped for gesture '{}'", label);
            return;
        }
        info!("Gesture '{}' -> {}", label, action);
        self.invoked.push(action);
    }

    fn center_pointer(&mut self) {
        self.position = (self.screen.0 / 2.0, self.screen.1 / 2.0);
        info!("Pointer centered");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmapped_labels_resolve_to_none() {
        let map = ActionMap::with_defaults();
        assert_eq!(map.resolve("LEFT"), &Action::Key("prevtrack".into()));
        assert_eq!(map.resolve("wave"), &Action::None);
    }

    #[test]
    fn pointer_is_clamped_to_screen() {
        let mut injector = LoggingInjector::new(ActionMap::default(), 100.0, 50.0);
        assert_eq!(injector.position(), (50.0, 25.0));
        injector.move_pointer_by(-500.0, 10.0);
        assert_eq!(injector.position(), (0.0, 35.0));
        injector.move_pointer_by(1000.0, 1000.0);
        assert_eq!(injector.position(), (99.0, 49.0));
        injector.center_pointer();
        assert_eq!(injector.position(), (50.0, 25.0));
    }

    #[test]
    fn only_mapped_actions_are_invoked() {
        let mut injector = LoggingInjector::new(ActionMap::with_defaults(), 100.0, 100.0);
        injector.invoke_action("CIRCLE");
        injector.invoke_action("unknown");
        assert_eq!(
            injector.invoked(),
            &[Action::Hotkey(vec!["alt".into(), "tab".into()])]
        );
    }
}
