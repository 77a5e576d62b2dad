// src/notify/alert.rs
//! Alert tiering for newly detected records.

use super::{FeedEvent, FeedStatus, UpdateOrigin};
use crate::model::{Quake, Severity};

#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub quake: Quake,
    pub severity: Severity,
}

/// One alert per new record, strongest first (stable within a tier).
pub fn alerts_for(new_quakes: &[Quake]) -> Vec<Alert> {
    let mut out: Vec<Alert> = new_quakes
        .iter()
        .map(|q| Alert {
            quake: q.clone(),
            severity: q.severity(),
        })
        .collect();
    out.sort_by(|a, b| b.severity.cmp(&a.severity));
    out
}

/// Listener that writes updates, alerts and status changes to the log.
pub fn alert_listener() -> impl Fn(&FeedEvent) + Send + Sync + 'static {
    |event| match event {
        FeedEvent::Updated(update) => {
            tracing::info!(
                target: "notify",
                total = update.quakes.len(),
                new = update.new_quakes.len(),
                origin = ?update.origin,
                "quake set updated"
            );
            if update.origin != UpdateOrigin::Live {
                return;
            }
            for alert in alerts_for(&update.new_quakes) {
                let q = &alert.quake;
                match alert.severity {
                    Severity::Major => tracing::warn!(
                        target: "notify",
                        id = %q.id, magnitude = q.magnitude, depth = q.depth,
                        location = %q.location_translated,
                        "MAJOR earthquake"
                    ),
                    Severity::Moderate => tracing::warn!(
                        target: "notify",
                        id = %q.id, magnitude = q.magnitude, depth = q.depth,
                        location = %q.location_translated,
                        "moderate earthquake"
                    ),
                    Severity::Minor => tracing::info!(
                        target: "notify",
                        id = %q.id, magnitude = q.magnitude,
                        location = %q.location_translated,
                        "new earthquake"
                    ),
                }
            }
        }
        FeedEvent::Status(FeedStatus::Error) => {
            tracing::warn!(target: "notify", "feed update failed, will retry")
        }
        FeedEvent::Status(status) => tracing::debug!(target: "notify", ?status, "feed status"),
        FeedEvent::Degraded {
            consecutive_errors,
            cooldown,
        } => tracing::error!(
            target: "notify",
            consecutive_errors,
            cooldown_secs = cooldown.as_secs(),
            "feed updates failing repeatedly, pausing before recovery"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SourceTag;
    use chrono::Utc;

    #[test]
    fn strongest_alerts_first() {
        let now = Utc::now();
        let quakes = vec![
            Quake::new("a", now, SourceTag::Primary).with_magnitude(3.1),
            Quake::new("b", now, SourceTag::Primary).with_magnitude(7.2),
            Quake::new("c", now, SourceTag::Secondary).with_magnitude(5.5),
            Quake::new("d", now, SourceTag::Secondary).with_magnitude(4.0),
        ];
        let tiers: Vec<_> = alerts_for(&quakes)
            .into_iter()
            .map(|a| (a.quake.id, a.severity))
            .collect();
        assert_eq!(
            tiers,
            vec![
                ("b".to_string(), Severity::Major),
                ("c".to_string(), Severity::Moderate),
                ("a".to_string(), Severity::Minor),
                ("d".to_string(), Severity::Minor),
            ]
        );
    }
}
