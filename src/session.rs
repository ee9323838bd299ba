//! Interactive session state owned by the tick loop.

use crate::cli::DisplayUnit;
use crate::input::InputEvent;
use crate::monitor::TickControl;

/// What the panes below the header show.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ViewMode {
    #[default]
    Plot,
    RawCounters,
    Info,
}

impl ViewMode {
    /// Switches to `target`, or back to Plot when already there.
    #[must_use]
    pub fn toggled(self, target: ViewMode) -> Self {
        if self == target {
            Self::Plot
        } else {
            target
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Plot => "PLOT",
            Self::RawCounters => "DATA",
            Self::Info => "INFO",
        }
    }
}

/// Result of applying one input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub view_mode: ViewMode,
    pub paused: bool,
    pub unit: DisplayUnit,
    /// Set by a view change; skips sampling and the sleep for one tick.
    pub fast_switch: bool,
    pub resize_pending: bool,
}

impl Session {
    pub fn new(unit: DisplayUnit) -> Self {
        Self {
            view_mode: ViewMode::Plot,
            paused: false,
            unit,
            fast_switch: false,
            resize_pending: false,
        }
    }

    pub fn apply(&mut self, event: InputEvent) -> Control {
        match event {
            InputEvent::Quit => return Control::Quit,
            InputEvent::TogglePause => self.paused = !self.paused,
            InputEvent::ToggleUnits => self.unit = self.unit.toggle(),
            InputEvent::ToggleRawCounters => self.switch_view(ViewMode::RawCounters),
            InputEvent::ToggleInfo => self.switch_view(ViewMode::Info),
            InputEvent::Resize => self.resize_pending = true,
            InputEvent::Unknown => {}
        }
        Control::Continue
    }

    fn switch_view(&mut self, target: ViewMode) {
        self.view_mode = self.view_mode.toggled(target);
        self.fast_switch = true;
    }

    pub fn tick_control(&self) -> TickControl {
        TickControl {
            paused: self.paused,
            fast_switch: self.fast_switch,
        }
    }

    /// Clears the one-tick fast switch once the tick has run.
    pub fn finish_tick(&mut self) {
        self.fast_switch = false;
    }

    /// Returns and clears the pending resize flag.
    pub fn take_resize(&mut self) -> bool {
        std::mem::take(&mut self.resize_pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_toggles_return_to_plot() {
        let mut session = Session::new(DisplayUnit::Bits);
        session.apply(InputEvent::ToggleRawCounters);
        assert_eq!(session.view_mode, ViewMode::RawCounters);
        assert!(session.fast_switch);

        session.apply(InputEvent::ToggleInfo);
        assert_eq!(session.view_mode, ViewMode::Info);

        session.apply(InputEvent::ToggleInfo);
        assert_eq!(session.view_mode, ViewMode::Plot);
    }

    #[test]
    fn test_fast_switch_lasts_one_tick() {
        let mut session = Session::new(DisplayUnit::Bits);
        session.apply(InputEvent::ToggleInfo);
        assert!(!session.tick_control().should_sample());

        session.finish_tick();
        assert!(session.tick_control().should_sample());
    }

    #[test]
    fn test_pause_and_units() {
        let mut session = Session::new(DisplayUnit::Bits);
        assert_eq!(session.apply(InputEvent::TogglePause), Control::Continue);
        assert!(session.paused);
        assert!(!session.fast_switch);
        assert!(session.tick_control().paused);

        session.apply(InputEvent::ToggleUnits);
        assert_eq!(session.unit, DisplayUnit::Bytes);
        session.apply(InputEvent::ToggleUnits);
        assert_eq!(session.unit, DisplayUnit::Bits);
    }

    #[test]
    fn test_quit_and_resize() {
        let mut session = Session::new(DisplayUnit::Bytes);
        assert_eq!(session.apply(InputEvent::Quit), Control::Quit);

        session.apply(InputEvent::Resize);
        assert!(session.take_resize());
        assert!(!session.take_resize());
    }

    #[test]
    fn test_mode_names() {
        assert_eq!(ViewMode::Plot.name(), "PLOT");
        assert_eq!(ViewMode::RawCounters.name(), "DATA");
        assert_eq!(ViewMode::Info.name(), "INFO");
    }
}
