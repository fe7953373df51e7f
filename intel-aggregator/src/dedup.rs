use crate::types::RawItem;
use std::collections::HashSet;
use tracing::{debug, info};

/// Drop every item whose identity was already seen earlier in the batch.
/// Stable: survivors keep their original order and content.
pub fn dedupe(items: Vec<RawItem>) -> Vec<RawItem> {
    let total = items.len();
    let mut seen = HashSet::with_capacity(total);

    let unique: Vec<RawItem> = items
        .into_iter()
        .filter(|item| {
            let first = seen.insert(item.identity.clone());
            if !first {
                debug!("Removing duplicate {} {}", item.source_kind, item.identity);
            }
            first
        })
        .collect();

    let removed_count = total - unique.len();
    if removed_count > 0 {
        info!("Removed {} duplicate entries", removed_count);
    }

    unique
}

