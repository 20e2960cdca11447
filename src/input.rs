//! The input-layer contract spec.md §6 describes: five boolean modifiers
//! (attractor, repellor, speed-up, slow-down, reverse) that get forwarded
//! into the solver's setters every frame. Capturing real keyboard/mouse
//! events is explicitly out of scope (spec.md §1 Non-goals) — this module
//! only defines the shape an input source must have and a couple of
//! deterministic stand-ins, the same role the windowing crate's own `Input`
//! struct plays for its (in-scope, for that crate) keyboard polling.

use crate::solver::Solver;

/// Snapshot of the five modifier flags spec.md §6 forwards to the solver
/// every frame. Mirrors the flat boolean struct the windowing layer this was
/// adapted from uses for its own key state, generalized from directional
/// keys to force modifiers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InputState {
    pub attractor: bool,
    pub repellor: bool,
    pub speed_up: bool,
    pub slow_down: bool,
    pub reverse: bool,
}

impl InputState {
    /// Applies this frame's modifier state to the solver's input-layer
    /// setters (spec.md §6).
    pub fn apply(&self, solver: &mut Solver) {
        solver.set_attractor(self.attractor);
        solver.set_repellor(self.repellor);
        solver.set_speed_up(self.speed_up);
        solver.set_slow_down(self.slow_down);
        solver.set_reverse(self.reverse);
    }
}

/// Anything that can produce one frame's worth of [`InputState`]. A real
/// windowing layer would implement this over polled keyboard state; the
/// headless driver uses [`NoInput`] or a scripted source instead.
pub trait InputSource {
    fn poll(&mut self) -> InputState;
}

/// Always reports every modifier released. What the headless driver uses
/// when no scripted input is supplied.
#[derive(Default)]
pub struct NoInput;

impl InputSource for NoInput {
    fn poll(&mut self) -> InputState {
        InputState::default()
    }
}

/// Replays a fixed sequence of [`InputState`] frames, holding the last one
/// once exhausted. Useful for demo scenes and tests that want deterministic,
/// reproducible input without depending on a real event loop.
pub struct ScriptedInput {
    frames: std::vec::IntoIter<InputState>,
    last: InputState,
}

impl ScriptedInput {
    pub fn new(frames: Vec<InputState>) -> Self {
        Self {
            frames: frames.into_iter(),
            last: InputState::default(),
        }
    }
}

impl InputSource for ScriptedInput {
    fn poll(&mut self) -> InputState {
        if let Some(frame) = self.frames.next() {
            self.last = frame;
        }
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_input_is_always_neutral() {
        let mut source = NoInput;
        assert_eq!(source.poll(), InputState::default());
        assert_eq!(source.poll(), InputState::default());
    }

    #[test]
    fn scripted_input_holds_its_last_frame() {
        let mut source = ScriptedInput::new(vec![InputState {
            attractor: true,
            ..Default::default()
        }]);
        assert!(source.poll().attractor);
        assert!(source.poll().attractor, "should hold the last frame");
    }
}
