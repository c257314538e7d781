//! Banner presentation state.
//!
//! ```text
//! NotYetEvaluated --valid record--> Hidden
//! NotYetEvaluated --no valid record, after delay--> Visible
//! Visible <--toggle--> VisibleExpanded
//! Visible | VisibleExpanded --decision--> Hidden
//! ```
//!
//! `Hidden` is final for the page view.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BannerState {
    NotYetEvaluated,
    /// A valid decision exists.
    Hidden,
    /// Collapsed banner asking for a decision.
    Visible,
    /// Banner with the per-category detail view open.
    VisibleExpanded,
}

impl BannerState {
    pub fn is_visible(&self) -> bool {
        matches!(self, Self::Visible | Self::VisibleExpanded)
    }
}

impl std::fmt::Display for BannerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotYetEvaluated => write!(f, "not_yet_evaluated"),
            Self::Hidden => write!(f, "hidden"),
            Self::Visible => write!(f, "visible"),
            Self::VisibleExpanded => write!(f, "visible_expanded"),
        }
    }
}

/// Banner state machine. Each transition returns whether it applied;
/// transitions that do not apply leave the state unchanged.
#[derive(Debug, Clone)]
pub struct Banner {
    state: BannerState,
}

impl Banner {
    pub fn new() -> Self {
        Self {
            state: BannerState::NotYetEvaluated,
        }
    }

    pub fn state(&self) -> BannerState {
        self.state
    }

    pub fn is_visible(&self) -> bool {
        self.state.is_visible()
    }

    /// Stored consent is valid: never show the banner.
    pub fn mark_consented(&mut self) -> bool {
        self.transition(BannerState::NotYetEvaluated, BannerState::Hidden)
    }

    /// No valid consent: show the collapsed banner.
    pub fn reveal(&mut self) -> bool {
        self.transition(BannerState::NotYetEvaluated, BannerState::Visible)
    }

    /// Open or close the per-category details.
    pub fn toggle_details(&mut self) -> bool {
        match self.state {
            BannerState::Visible => {
                self.state = BannerState::VisibleExpanded;
                true
            }
            BannerState::VisibleExpanded => {
                self.state = BannerState::Visible;
                true
            }
            _ => false,
        }
    }

    /// A decision was made. Also cancels a pending reveal.
    pub fn resolve(&mut self) -> bool {
        match self.state {
            BannerState::NotYetEvaluated | BannerState::Visible | BannerState::VisibleExpanded => {
                self.state = BannerState::Hidden;
                true
            }
            BannerState::Hidden => false,
        }
    }

    fn transition(&mut self, from: BannerState, to: BannerState) -> bool {
        if self.state == from {
            self.state = to;
            true
        } else {
            false
        }
    }
}

impl Default for Banner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consented_page_stays_hidden() {
        let mut banner = Banner::new();
        assert_eq!(banner.state(), BannerState::NotYetEvaluated);
        assert!(banner.mark_consented());
        assert!(!banner.reveal());
        assert!(!banner.toggle_details());
        assert_eq!(banner.state(), BannerState::Hidden);
    }

    #[test]
    fn test_toggle_and_resolve() {
        let mut banner = Banner::new();
        assert!(banner.reveal());
        assert!(banner.is_visible());

        assert!(banner.toggle_details());
        assert_eq!(banner.state(), BannerState::VisibleExpanded);
        assert!(banner.is_visible());
        assert!(banner.toggle_details());
        assert_eq!(banner.state(), BannerState::Visible);

        assert!(banner.toggle_details());
        assert!(banner.resolve());
        assert_eq!(banner.state(), BannerState::Hidden);
        assert!(!banner.resolve());
    }

    #[test]
    fn test_hidden_never_reopens() {
        let mut banner = Banner::new();
        banner.reveal();
        banner.resolve();
        assert!(!banner.reveal());
        assert!(!banner.mark_consented());
        assert!(!banner.is_visible());
    }

    #[test]
    fn test_decision_before_reveal_cancels_it() {
        let mut banner = Banner::new();
        assert!(banner.resolve());
        assert!(!banner.reveal());
        assert_eq!(banner.state(), BannerState::Hidden);
    }

    #[test]
    fn test_state_serialization() {
        assert_eq!(
            serde_json::to_value(BannerState::VisibleExpanded).unwrap(),
            serde_json::json!("visible_expanded")
        );
        assert_eq!(BannerState::NotYetEvaluated.to_string(), "not_yet_evaluated");
    }
}
