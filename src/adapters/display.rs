//! Display refresher.
//!
//! Notifier subscriber that turns each new snapshot into a [`Screen`] and
//! hands it to a [`DisplayPort`].  Only redraws when the screen changes,
//! so back-to-back transitions that land on the same image (e.g. a reset
//! from `idle`) cost nothing.

use crate::app::ports::{DisplayPort, TransitionSink};
use crate::fsm::Phase;
use crate::fsm::context::SystemSnapshot;
use crate::sensors::BinColor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Idle,
    Processing,
    ShowTrash,
    Throw(BinColor),
    /// Confirmation with nothing pending.  Unreachable through the table.
    ThrowAny,
    Reward,
    Incorrect,
    Timeout,
    TryAgain,
}

impl Screen {
    pub fn for_state(state: &SystemSnapshot) -> Self {
        match state.phase {
            Phase::Idle => Self::Idle,
            Phase::Processing => Self::Processing,
            Phase::ShowResult => Self::ShowTrash,
            Phase::UserConfirmation => state
                .pending_classification
                .map_or(Self::ThrowAny, |c| Self::Throw(c.bin_color)),
            Phase::Reward => Self::Reward,
            Phase::Incorrect => Self::Incorrect,
            Phase::Timeout => Self::Timeout,
            Phase::Error => Self::TryAgain,
        }
    }

    /// Image asset drawn for this screen.
    pub fn image(self) -> &'static str {
        match self {
            Self::Idle => "white.png",
            Self::Processing => "processing_new.png",
            Self::ShowTrash | Self::ThrowAny => "show_trash.png",
            Self::Throw(BinColor::Blue) => "throw_blue.png",
            Self::Throw(BinColor::Yellow) => "throw_yellow.png",
            Self::Throw(BinColor::Brown) => "throw_brown.png",
            Self::Reward => "reward_received_new.png",
            Self::Incorrect => "incorrect_new.png",
            Self::Timeout => "timeout_new.png",
            Self::TryAgain => "try_again_green.png",
        }
    }
}

pub struct DisplayRefresher<D> {
    display: D,
    shown: Option<Screen>,
}

impl<D: DisplayPort> DisplayRefresher<D> {
    pub fn new(display: D) -> Self {
        Self {
            display,
            shown: None,
        }
    }

    /// Draw the screen for `state` if it differs from what is shown.
    pub fn refresh(&mut self, state: &SystemSnapshot) {
        let screen = Screen::for_state(state);
        if self.shown == Some(screen) {
            return;
        }
        self.display.render(state.phase, screen.image());
        self.shown = Some(screen);
    }

    pub fn display(&self) -> &D {
        &self.display
    }
}

impl<D: DisplayPort + Send> TransitionSink for DisplayRefresher<D> {
    fn on_transition(&mut self, _old: &SystemSnapshot, new: &SystemSnapshot) {
        self.refresh(new);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsm::context::Classification;

    #[derive(Default)]
    struct Recorder(Vec<&'static str>);

    impl DisplayPort for Recorder {
        fn render(&mut self, _phase: Phase, image: &'static str) {
            self.0.push(image);
        }
    }

    fn at(phase: Phase) -> SystemSnapshot {
        let mut s = SystemSnapshot::new();
        s.phase = phase;
        s
    }

    #[test]
    fn confirmation_shows_target_bin() {
        let mut s = at(Phase::UserConfirmation);
        s.pending_classification = Some(Classification::new(BinColor::Yellow, 0.7).unwrap());
        assert_eq!(Screen::for_state(&s).image(), "throw_yellow.png");
    }

    #[test]
    fn redraws_only_on_change() {
        let mut refresher = DisplayRefresher::new(Recorder::default());
        refresher.refresh(&at(Phase::Idle));
        refresher.refresh(&at(Phase::Idle));
        refresher.refresh(&at(Phase::Processing));
        refresher.refresh(&at(Phase::Error));
        assert_eq!(
            refresher.display().0,
            vec!["white.png", "processing_new.png", "try_again_green.png"]
        );
    }
}
