use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a streaming session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Disconnected,
    Connected,
    Configuring,
    Streaming,
    Draining,
    Closed,
}

impl SessionState {
    /// Whether moving from `self` to `next` is a legal step.
    ///
    /// Any state may go straight to `Closed` (failed handshake, abort);
    /// `Closed` is terminal.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        match (self, next) {
            (Closed, _) => false,
            (_, Closed) => true,
            (Disconnected, Connected)
            | (Connected, Configuring)
            | (Configuring, Streaming)
            | (Streaming, Draining) => true,
            // End-of-stream handling can start before any audio was sent
            (Configuring, Draining) => true,
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == SessionState::Closed
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connected => "connected",
            SessionState::Configuring => "configuring",
            SessionState::Streaming => "streaming",
            SessionState::Draining => "draining",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::SessionState::*;

    #[test]
    fn test_happy_path_transitions() {
        let path = [Disconnected, Connected, Configuring, Streaming, Draining, Closed];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_closed_is_terminal() {
        assert!(Closed.is_terminal());
        for next in [Disconnected, Connected, Configuring, Streaming, Draining, Closed] {
            assert!(!Closed.can_transition_to(next));
        }
    }

    #[test]
    fn test_no_skipping_or_going_back() {
        assert!(!Connected.can_transition_to(Streaming));
        assert!(!Streaming.can_transition_to(Configuring));
        assert!(!Draining.can_transition_to(Streaming));
        assert!(!Disconnected.can_transition_to(Configuring));
    }

    #[test]
    fn test_any_state_can_close() {
        for state in [Disconnected, Connected, Configuring, Streaming, Draining] {
            assert!(state.can_transition_to(Closed));
        }
    }
}
