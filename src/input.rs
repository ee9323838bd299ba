use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Quit,              // 'q', Esc or Ctrl+C
    TogglePause,       // 'p' or Space
    ToggleUnits,       // 'u' - bits/bytes
    ToggleRawCounters, // 'd' - raw counters view
    ToggleInfo,        // 'i' - GID info view
    Resize,
    Unknown,
}

impl InputEvent {
    pub fn from_key_event(key_event: KeyEvent) -> Self {
        if key_event.kind == KeyEventKind::Release {
            return Self::Unknown;
        }

        match key_event.code {
            KeyCode::Char('c') | KeyCode::Char('C')
                if key_event.modifiers.contains(KeyModifiers::CONTROL) =>
            {
                Self::Quit
            }
            KeyCode::Esc => Self::Quit,
            KeyCode::Char(c) => match c.to_ascii_lowercase() {
                'q' => Self::Quit,
                'p' | ' ' => Self::TogglePause,
                'u' => Self::ToggleUnits,
                'd' => Self::ToggleRawCounters,
                'i' => Self::ToggleInfo,
                _ => Self::Unknown,
            },
            _ => Self::Unknown,
        }
    }

    /// Maps any terminal event; resizes become [`InputEvent::Resize`].
    pub fn from_event(event: Event) -> Self {
        match event {
            Event::Key(key_event) => Self::from_key_event(key_event),
            Event::Resize(_, _) => Self::Resize,
            _ => Self::Unknown,
        }
    }
}
