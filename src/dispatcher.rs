//! Thin action-routing glue (spec §4.E): turns abstract controller actions
//! into either OSK-model mutations (4.D) or direct keyboard encoding
//! (4.C), and owns the button-repeat and exit-combo timing that sits in
//! front of both.

use std::time::Duration;

use crate::input::{encode::encode_key_event, KeyCode, Modifiers};
use crate::osk::{descriptor::InternalCommand, OskMode};
use crate::Terminal;

pub const INITIAL_DELAY: Duration = Duration::from_millis(250);
pub const INTERVAL: Duration = Duration::from_millis(75);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
    Select,
    Back,
    Space,
    Tab,
    Enter,
    ScrollUp,
    ScrollDown,
    ToggleOsk,
}

/// Identifies the physical source of a button press, so a second press on
/// a different button doesn't cancel the first one's repeat, and so the
/// `Back`+`Start` exit combo can be recognized (spec §4.E "Exit combo").
/// `Start` carries no routed action of its own; it only ever participates
/// in the combo check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonSource {
    Back,
    Start,
    Other(u32),
}

struct Repeat {
    source: ButtonSource,
    action: Action,
    elapsed: Duration,
    fired_initial: bool,
}

/// Outcome of a dispatched action: an internal command the embedder must
/// act on (§3 "Commands the embedding application executes"), and whether
/// the exit combo fired.
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchOutcome {
    pub internal_command: Option<InternalCommand>,
    pub shutdown_requested: bool,
}

impl DispatchOutcome {
    fn command(cmd: InternalCommand) -> Self {
        Self {
            internal_command: Some(cmd),
            shutdown_requested: false,
        }
    }

    fn shutdown() -> Self {
        Self {
            internal_command: None,
            shutdown_requested: true,
        }
    }
}

pub struct Dispatcher {
    osk_active: bool,
    held_modifiers: Modifiers,
    held_buttons: Vec<ButtonSource>,
    repeat: Option<Repeat>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            osk_active: false,
            held_modifiers: Modifiers::empty(),
            held_buttons: Vec::new(),
            repeat: None,
        }
    }

    pub fn osk_active(&self) -> bool {
        self.osk_active
    }

    /// Tracks a physical modifier key so the *combined* set (spec §4.D/§4.E)
    /// reflects what's actually held, independent of whether the OSK is on.
    pub fn set_modifier_held(&mut self, modifier: Modifiers, held: bool) {
        if held {
            self.held_modifiers.insert(modifier);
        } else {
            self.held_modifiers.remove(modifier);
        }
    }

    /// Registers a button press. `action` is `None` for buttons (like
    /// `Start`) that exist only to participate in the exit combo.
    pub fn button_down(&mut self, source: ButtonSource, action: Option<Action>, term: &mut Terminal) -> DispatchOutcome {
        let combo = (source == ButtonSource::Back && self.held_buttons.contains(&ButtonSource::Start))
            || (source == ButtonSource::Start && self.held_buttons.contains(&ButtonSource::Back));
        if !self.held_buttons.contains(&source) {
            self.held_buttons.push(source);
        }
        if combo {
            return DispatchOutcome::shutdown();
        }

        let Some(action) = action else {
            return DispatchOutcome::default();
        };
        self.repeat = Some(Repeat {
            source,
            action,
            elapsed: Duration::ZERO,
            fired_initial: false,
        });
        self.dispatch_once(action, term)
    }

    pub fn button_up(&mut self, source: ButtonSource) {
        self.held_buttons.retain(|s| *s != source);
        if matches!(&self.repeat, Some(r) if r.source == source) {
            self.repeat = None;
        }
    }

    /// Advances the button-repeat clock by `dt` (spec §4.E "Button-repeat");
    /// the host loop supplies `dt` each frame rather than this type reading
    /// a wall clock itself.
    pub fn tick(&mut self, dt: Duration, term: &mut Terminal) -> DispatchOutcome {
        let Some(repeat) = &mut self.repeat else {
            return DispatchOutcome::default();
        };
        repeat.elapsed += dt;
        if !repeat.fired_initial {
            if repeat.elapsed < INITIAL_DELAY {
                return DispatchOutcome::default();
            }
            repeat.fired_initial = true;
            repeat.elapsed = Duration::ZERO;
            let action = repeat.action;
            return self.dispatch_once(action, term);
        }
        if repeat.elapsed < INTERVAL {
            return DispatchOutcome::default();
        }
        repeat.elapsed -= INTERVAL;
        let action = repeat.action;
        self.dispatch_once(action, term)
    }

    fn toggle_osk(&mut self, term: &mut Terminal) {
        if !self.osk_active {
            self.osk_active = true;
            term.osk.mode = OskMode::Chars;
            return;
        }
        match term.osk.mode {
            OskMode::Chars => term.osk.mode = OskMode::Special,
            OskMode::Special => {
                if term.osk.one_shot_modifiers().is_empty() {
                    self.osk_active = false;
                } else {
                    term.osk.mode = OskMode::Chars;
                }
            }
        }
    }

    fn dispatch_once(&mut self, action: Action, term: &mut Terminal) -> DispatchOutcome {
        if action == Action::ToggleOsk {
            self.toggle_osk(term);
            return DispatchOutcome::default();
        }

        if self.osk_active && !matches!(action, Action::ScrollUp | Action::ScrollDown) {
            return self.dispatch_to_osk(action, term);
        }

        match action {
            Action::ScrollUp => {
                let amount = (term.grid.rows() / 2).max(1) as isize;
                term.grid.scroll_viewport(amount);
                DispatchOutcome::default()
            }
            Action::ScrollDown => {
                term.grid.scroll_viewport(-3);
                DispatchOutcome::default()
            }
            _ => {
                let code = self.action_keycode(action);
                let modes = term.key_encode_modes();
                let bytes = encode_key_event(code, self.held_modifiers, modes);
                term.write_pty_bytes(&bytes);
                DispatchOutcome::default()
            }
        }
    }

    fn dispatch_to_osk(&mut self, action: Action, term: &mut Terminal) -> DispatchOutcome {
        term.osk.set_held_modifiers(self.held_modifiers);
        match action {
            Action::Up => {
                term.osk.nav_up();
                DispatchOutcome::default()
            }
            Action::Down => {
                term.osk.nav_down();
                DispatchOutcome::default()
            }
            Action::Left => {
                term.osk.nav_left();
                DispatchOutcome::default()
            }
            Action::Right => {
                term.osk.nav_right();
                DispatchOutcome::default()
            }
            Action::Select => {
                let (osk, write_pty, modes) = term.split_for_osk();
                match osk.select(write_pty, modes) {
                    Some(cmd) => DispatchOutcome::command(cmd),
                    None => DispatchOutcome::default(),
                }
            }
            Action::Back | Action::Space | Action::Tab | Action::Enter => {
                let code = self.action_keycode(action);
                let (osk, write_pty, modes) = term.split_for_osk();
                osk.send_fixed_key(code, write_pty, modes);
                DispatchOutcome::default()
            }
            Action::ScrollUp | Action::ScrollDown | Action::ToggleOsk => unreachable!(),
        }
    }

    fn action_keycode(&self, action: Action) -> KeyCode {
        match action {
            Action::Up => KeyCode::Up,
            Action::Down => KeyCode::Down,
            Action::Left => KeyCode::Left,
            Action::Right => KeyCode::Right,
            // No real keyboard has a "Select" key; the closest analogue
            // for a confirm/activate button is Enter.
            Action::Select => KeyCode::Enter,
            Action::Back => KeyCode::Backspace,
            Action::Space => KeyCode::Char(' '),
            Action::Tab => KeyCode::Tab,
            Action::Enter => KeyCode::Enter,
            Action::ScrollUp | Action::ScrollDown | Action::ToggleOsk => unreachable!(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn terminal() -> Terminal {
        Terminal::new(Config::new(10, 4, 0), Box::new(|_| {})).unwrap()
    }

    #[test]
    fn toggle_cycles_off_chars_special_off() {
        let mut term = terminal();
        let mut d = Dispatcher::new();
        d.button_down(ButtonSource::Other(0), Some(Action::ToggleOsk), &mut term);
        assert!(d.osk_active());
        assert_eq!(term.osk.mode, OskMode::Chars);
        d.button_down(ButtonSource::Other(0), Some(Action::ToggleOsk), &mut term);
        assert_eq!(term.osk.mode, OskMode::Special);
        d.button_down(ButtonSource::Other(0), Some(Action::ToggleOsk), &mut term);
        assert!(!d.osk_active());
    }

    #[test]
    fn toggle_reenters_chars_when_one_shot_pending() {
        let mut term = terminal();
        term.osk.toggle_one_shot(Modifiers::CTRL);
        let mut d = Dispatcher::new();
        d.button_down(ButtonSource::Other(0), Some(Action::ToggleOsk), &mut term);
        d.button_down(ButtonSource::Other(0), Some(Action::ToggleOsk), &mut term);
        assert_eq!(term.osk.mode, OskMode::Special);
        d.button_down(ButtonSource::Other(0), Some(Action::ToggleOsk), &mut term);
        assert!(d.osk_active());
        assert_eq!(term.osk.mode, OskMode::Chars);
    }

    #[test]
    fn back_plus_start_requests_shutdown() {
        let mut term = terminal();
        let mut d = Dispatcher::new();
        d.button_down(ButtonSource::Back, Some(Action::Back), &mut term);
        let outcome = d.button_down(ButtonSource::Start, None, &mut term);
        assert!(outcome.shutdown_requested);
    }

    #[test]
    fn new_button_press_cancels_prior_repeat() {
        let mut term = terminal();
        let mut d = Dispatcher::new();
        d.button_down(ButtonSource::Other(1), Some(Action::Right), &mut term);
        d.button_down(ButtonSource::Other(2), Some(Action::Left), &mut term);
        assert!(matches!(&d.repeat, Some(r) if r.source == ButtonSource::Other(2)));
    }

    #[test]
    fn repeat_fires_after_initial_delay_then_on_interval() {
        let mut term = terminal();
        let mut d = Dispatcher::new();
        d.button_down(ButtonSource::Other(1), Some(Action::Right), &mut term);
        assert!(d.tick(Duration::from_millis(100), &mut term).internal_command.is_none());
        // crosses the 250ms initial delay
        d.tick(Duration::from_millis(200), &mut term);
        assert!(d.repeat.as_ref().unwrap().fired_initial);
    }
}
