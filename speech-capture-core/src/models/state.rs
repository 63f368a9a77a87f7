/// Stream session state machine.
///
/// State transitions (one cycle per take):
/// ```text
/// idle → open → active → stopped → idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Open,
    Active,
    Stopped,
}

impl StreamState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Whether `open()` may be called. A stopped session is reusable.
    pub fn can_open(&self) -> bool {
        matches!(self, Self::Idle | Self::Stopped)
    }
}

/// Where a participant session stands from the GUI's point of view.
///
/// ```text
/// awaiting_form → awaiting_selection → recording → finished
///       ↑                                              │
///       └───────────── on_recording_finished ──────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    AwaitingForm,
    /// Identity known; waiting for a language or dataset choice.
    AwaitingSelection,
    Recording,
    /// All takes captured; the caller should close the session.
    Finished,
}
