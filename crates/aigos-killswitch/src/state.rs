use serde::{Deserialize, Serialize};

use crate::command::Command;

/// The kill switch's lifecycle: `ACTIVE` is the initial state; `TERMINATED`
/// is absorbing and never transitions away.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum State {
    Active,
    Paused,
    Terminated,
}

impl Default for State {
    fn default() -> Self {
        State::Active
    }
}

impl State {
    pub fn should_continue(&self) -> bool {
        matches!(self, State::Active)
    }

    /// Pure state-transition function; `TERMINATED` absorbs every command.
    pub fn apply(self, command: Command) -> State {
        match self {
            State::Terminated => State::Terminated,
            _ => match command {
                Command::Pause => State::Paused,
                Command::Resume => State::Active,
                Command::Terminate => State::Terminated,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_scenario() {
        let mut state = State::default();
        assert_eq!(state, State::Active);

        state = state.apply(Command::Pause);
        assert_eq!(state, State::Paused);
        assert!(!state.should_continue());

        state = state.apply(Command::Resume);
        assert_eq!(state, State::Active);

        state = state.apply(Command::Terminate);
        assert_eq!(state, State::Terminated);

        state = state.apply(Command::Resume);
        assert_eq!(state, State::Terminated);
    }
}
