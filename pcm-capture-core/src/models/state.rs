/// Capture session state machine.
///
/// State transitions:
/// ```text
/// (new) → stopped ↔ started
///            ↓         ↓
///          uninitialized (closed)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureState {
    Uninitialized,
    Stopped,
    Started,
}

impl CaptureState {
    pub fn is_started(&self) -> bool {
        matches!(self, Self::Started)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Uninitialized)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Stopped => "stopped",
            Self::Started => "started",
        }
    }
}
