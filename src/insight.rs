//! Canned-insight generator
//!
//! A pure function of `(cognitive_load, event_count)`: the same inputs
//! always select the same branch. Sessions with too few events get the
//! cold-start message; otherwise the load selects one of three fixed
//! diagnostics with its confidence label and contributing factors.

use crate::types::{Insight, InsightConfidence};

/// Events required before any load-based insight is produced.
pub const MIN_EVENTS_FOR_INSIGHT: usize = 5;

/// Generate the diagnostic insight for the current metrics.
pub fn generate(cognitive_load: u8, event_count: usize) -> Insight {
    if event_count < MIN_EVENTS_FOR_INSIGHT {
        return Insight {
            text: "Awaiting further interaction signals...".to_string(),
            confidence: InsightConfidence::Pending,
            factors: vec![],
        };
    }

    if cognitive_load > 80 {
        Insight {
            text: "Sustained cognitive overload detected. Decision quality may degrade."
                .to_string(),
            confidence: InsightConfidence::High,
            factors: vec![
                "High interaction frequency".to_string(),
                "Rapid task switching".to_string(),
            ],
        }
    } else if cognitive_load > 40 {
        Insight {
            text: "Optimal engagement zone. User is processing information efficiently."
                .to_string(),
            confidence: InsightConfidence::VeryHigh,
            factors: vec![
                "Stable rhythm".to_string(),
                "Consistent response times".to_string(),
            ],
        }
    } else {
        Insight {
            text: "Low cognitive demand. Potential for boredom or distraction.".to_string(),
            confidence: InsightConfidence::Moderate,
            factors: vec![
                "Low interaction rate".to_string(),
                "Extended idle periods".to_string(),
            ],
        }
    }
}
