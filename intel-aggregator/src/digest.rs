use crate::aggregator::TierGroups;
use crate::types::{HistoryEntry, Recommendation, ReportSnapshot};
use chrono::{NaiveDate, Utc};
use tracing::debug;

/// Shapes aggregator output plus the history listing into the renderer's
/// snapshot schema. Does no filtering of its own.
pub struct ReportModelBuilder {
    max_history: usize,
}

impl ReportModelBuilder {
    pub fn new(max_history: usize) -> Self {
        Self { max_history }
    }

    pub fn build(
        &self,
        date: NaiveDate,
        tiers: TierGroups,
        recommendations: Vec<Recommendation>,
        history: &[NaiveDate],
    ) -> ReportSnapshot {
        let history_index = history_index(date, history, self.max_history);
        debug!(
            "Building snapshot for {} with {} items and {} history entries",
            date,
            tiers.total(),
            history_index.len()
        );

        ReportSnapshot {
            date,
            generated_at: Utc::now(),
            groups: tiers.groups,
            counts: tiers.counts,
            recommendations,
            history_index,
        }
    }
}

/// Newest first, `current` included and flagged, at most `max_entries` long.
pub fn history_index(current: NaiveDate, history: &[NaiveDate], max_entries: usize) -> Vec<HistoryEntry> {
    let mut dates: Vec<NaiveDate> = history.to_vec();
    if !dates.contains(&current) {
        dates.push(current);
    }
    dates.sort_unstable_by(|a, b| b.cmp(a));
    dates.dedup();

    // keep the current date even when it is older than the retained window
    let mut index: Vec<HistoryEntry> = dates
        .iter()
        .take(max_entries)
        .map(|date| HistoryEntry {
            date: *date,
            is_current: *date == current,
        })
        .collect();

    if max_entries > 0 && !index.iter().any(|entry| entry.is_current) {
        index.pop();
        index.push(HistoryEntry {
            date: current,
            is_current: true,
        });
    }

    index
}
