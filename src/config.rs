//! Page-level configuration: which effects run, where, and with which policy.
//!
//! Defaults reproduce the stock page. With the `serde_json` feature a JSON
//! document can override any part; missing fields keep their defaults and an
//! explicit `null` switches an effect off.

use crate::emitter::EmitterPolicy;
use crate::error::PolicyError;
use crate::presets;

/// CSS selectors of the containers each effect mounts into.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Selectors {
    pub stars: String,
    pub particles: String,
    pub confetti: String,
    pub sparkles: String,
    /// Clicks inside this element throw a confetti burst.
    pub click_area: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            stars: ".stars-background".into(),
            particles: ".particles-container".into(),
            confetti: ".falling-ribbons-container".into(),
            sparkles: ".mouse-follow-elements".into(),
            click_area: ".wishes-section".into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PageConfig {
    pub selectors: Selectors,
    pub stars: Option<EmitterPolicy>,
    pub particles: Option<EmitterPolicy>,
    pub confetti: Option<EmitterPolicy>,
    pub sparkles: Option<EmitterPolicy>,
    pub click_burst: Option<EmitterPolicy>,
    pub celebration: Option<EmitterPolicy>,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            selectors: Selectors::default(),
            stars: Some(presets::stars()),
            particles: Some(presets::floating_particles()),
            confetti: Some(presets::confetti()),
            sparkles: Some(presets::sparkles()),
            click_burst: Some(presets::click_burst()),
            celebration: Some(presets::celebration()),
        }
    }
}

impl PageConfig {
    pub fn validate(&self) -> Result<(), PolicyError> {
        [&self.stars, &self.particles, &self.confetti, &self.sparkles, &self.click_burst, &self.celebration]
            .into_iter()
            .flatten()
            .try_for_each(EmitterPolicy::validate)
    }

    #[cfg(feature = "serde_json")]
    pub fn from_json(json: &str) -> Result<Self, PolicyError> {
        let config: PageConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}
