use crate::models::error::CaptureError;
use crate::models::state::StreamState;
use crate::models::take::TakeResult;

/// Event delegate for session notifications.
///
/// The presentation layer implements this to follow progress; the core never
/// touches presentation objects. Methods are called from whichever thread
/// drives the session (the worker thread in play-and-record mode), so
/// implementations should marshal to the UI thread if needed.
pub trait SessionDelegate: Send + Sync {
    /// Called when a capture stream changes state.
    fn on_state_changed(&self, state: StreamState);

    /// Called after a take and its derived files are on disk.
    fn on_take_saved(&self, result: &TakeResult);

    /// Called when an error ends a take or a loop.
    fn on_error(&self, error: &CaptureError);

    /// Called once the configured number of takes or the time budget is reached.
    fn on_session_finished(&self);
}
