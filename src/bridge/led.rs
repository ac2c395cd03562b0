//! Status LED pattern per application state.

use crate::bridge::AppStateKind;
use crate::config::{LED_ERROR_BLINK_MS, LED_SCAN_BLINK_MS};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LedPattern {
    Off,
    On,
    /// Toggle every `half_period_ms`.
    Blink { half_period_ms: u64 },
}

impl LedPattern {
    /// Whether the LED should be lit at `now_ms`.
    pub fn is_lit(self, now_ms: u64) -> bool {
        match self {
            LedPattern::Off => false,
            LedPattern::On => true,
            LedPattern::Blink { half_period_ms } => (now_ms / half_period_ms.max(1)) % 2 == 0,
        }
    }
}

pub const fn led_pattern(kind: AppStateKind) -> LedPattern {
    match kind {
        AppStateKind::Init => LedPattern::Off,
        AppStateKind::Scanning => LedPattern::Blink {
            half_period_ms: LED_SCAN_BLINK_MS,
        },
        AppStateKind::Connecting | AppStateKind::Connected | AppStateKind::Active => LedPattern::On,
        AppStateKind::Error => LedPattern::Blink {
            half_period_ms: LED_ERROR_BLINK_MS,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scanning_blinks_slowly() {
        let p = led_pattern(AppStateKind::Scanning);
        assert!(p.is_lit(0));
        assert!(p.is_lit(499));
        assert!(!p.is_lit(500));
        assert!(p.is_lit(1000));
    }

    #[test]
    fn error_blinks_fast() {
        let p = led_pattern(AppStateKind::Error);
        assert!(p.is_lit(50));
        assert!(!p.is_lit(150));
    }

    #[test]
    fn connected_states_are_solid() {
        for kind in [
            AppStateKind::Connecting,
            AppStateKind::Connected,
            AppStateKind::Active,
        ] {
            assert_eq!(led_pattern(kind), LedPattern::On);
        }
        assert!(!led_pattern(AppStateKind::Init).is_lit(0));
    }
}
