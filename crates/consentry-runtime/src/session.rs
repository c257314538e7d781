//! One page view's consent session.

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use crate::banner::{Banner, BannerState};
use consentry_core::{Category, ConsentPolicy, PreferenceSet};
use consentry_protocol::{ConsentEngine, Evaluation, SaveOutcome};

/// The consent surface page markup is allowed to call.
pub struct ConsentSession {
    engine: ConsentEngine,
    banner: Mutex<Banner>,
    banner_delay: Duration,
    created: Instant,
}

impl ConsentSession {
    pub fn new(engine: ConsentEngine, policy: &ConsentPolicy) -> Self {
        Self {
            engine,
            banner: Mutex::new(Banner::new()),
            banner_delay: policy.banner_delay(),
            created: Instant::now(),
        }
    }

    pub fn engine(&self) -> &ConsentEngine {
        &self.engine
    }

    pub fn created(&self) -> Instant {
        self.created
    }

    /// Page load, synchronous half: assert the default-deny state downstream
    /// and inspect stored consent. With a valid record the stored choices are
    /// pushed as an update and the banner is hidden immediately.
    pub fn begin_load(&self) -> Evaluation {
        self.engine.bridge().push_default_denied();
        let evaluation = self.engine.evaluate();
        if evaluation.has_valid_record {
            self.engine.bridge().push_update(&evaluation.preferences);
            self.banner.lock().mark_consented();
        }
        evaluation
    }

    /// Show the banner if evaluation found no valid record and no decision
    /// has been made since.
    pub fn reveal_banner(&self) -> BannerState {
        let mut banner = self.banner.lock();
        if banner.reveal() {
            debug!("Consent banner shown");
        }
        banner.state()
    }

    /// Full page load: evaluate, then wait out the display delay before
    /// showing the banner.
    pub async fn load(&self) -> BannerState {
        let evaluation = self.begin_load();
        if evaluation.has_valid_record {
            return BannerState::Hidden;
        }
        self.reveal_after_delay().await
    }

    /// Wait out the display delay, then show the banner.
    pub async fn reveal_after_delay(&self) -> BannerState {
        if !self.banner_delay.is_zero() {
            tokio::time::sleep(self.banner_delay).await;
        }
        self.reveal_banner()
    }

    pub fn banner_state(&self) -> BannerState {
        self.banner.lock().state()
    }

    pub fn is_banner_visible(&self) -> bool {
        self.banner.lock().is_visible()
    }

    pub fn effective_preferences(&self) -> PreferenceSet {
        self.engine.effective_preferences()
    }

    pub fn has_consent(&self, category: Category) -> bool {
        self.engine.has_consent(category)
    }

    /// Open or close the per-category details. Returns the resulting state.
    pub fn toggle_details(&self) -> BannerState {
        let mut banner = self.banner.lock();
        banner.toggle_details();
        banner.state()
    }

    pub fn accept_all(&self) -> SaveOutcome {
        self.decide(|engine| engine.accept_all())
    }

    pub fn decline_all(&self) -> SaveOutcome {
        self.decide(|engine| engine.decline_all())
    }

    pub fn save_custom(&self, requested: impl Into<PreferenceSet>) -> SaveOutcome {
        let requested = requested.into();
        self.decide(move |engine| engine.save_custom(requested))
    }

    /// Withdraw consent. The banner stays as it is until the next page load.
    pub fn withdraw(&self) -> bool {
        self.engine.reset()
    }

    /// Run the engine operation first, then close the banner.
    fn decide(&self, op: impl FnOnce(&ConsentEngine) -> SaveOutcome) -> SaveOutcome {
        let mut banner = self.banner.lock();
        let outcome = op(&self.engine);
        banner.resolve();
        outcome
    }
}
