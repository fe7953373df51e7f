use crate::config::Limits;
use crate::types::{ClassifiedItem, Priority, RawItem, Recommendation};
use crate::watchlist::WatchList;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info};

const REGULATOR_VOCABULARY: &[&str] = &["sec", "cftc", "fed", "treasury"];
const EXCHANGE_VOCABULARY: &[&str] = &["coinbase", "kraken", "binance", "exchange"];
const PROJECT_VOCABULARY: &[&str] = &["foundation", "labs", "dao"];

pub const REGULATOR_CATEGORY: &str = "监管";
pub const EXCHANGE_CATEGORY: &str = "交易所";
pub const PROJECT_CATEGORY: &str = "项目方";
pub const UNKNOWN_CATEGORY: &str = "未知";

static MENTION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@(\w{3,15})").expect("valid mention regex"));

/// Items bucketed by tier, each bucket already cut to its render cap.
#[derive(Debug, Clone, Default)]
pub struct TierGroups {
    pub groups: BTreeMap<Priority, Vec<ClassifiedItem>>,
    pub counts: BTreeMap<Priority, usize>,
}

impl TierGroups {
    pub fn items(&self, priority: Priority) -> &[ClassifiedItem] {
        self.groups.get(&priority).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn count(&self, priority: Priority) -> usize {
        self.counts.get(&priority).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

/// Output of one aggregation pass
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub tiers: TierGroups,
    pub recommendations: Vec<Recommendation>,
}

pub struct Aggregator {
    limits: Limits,
    watchlist: WatchList,
}

impl Aggregator {
    pub fn new(limits: Limits, watchlist: WatchList) -> Self {
        Self { limits, watchlist }
    }

    /// Bound how many raw items of each kind get classified, keeping fetch order.
    pub fn cap_batches(&self, mut posts: Vec<RawItem>, mut articles: Vec<RawItem>) -> (Vec<RawItem>, Vec<RawItem>) {
        if posts.len() > self.limits.max_posts {
            debug!("Capping posts {} -> {}", posts.len(), self.limits.max_posts);
            posts.truncate(self.limits.max_posts);
        }
        if articles.len() > self.limits.max_articles {
            debug!("Capping articles {} -> {}", articles.len(), self.limits.max_articles);
            articles.truncate(self.limits.max_articles);
        }
        (posts, articles)
    }

    /// Bucket by tier preserving classification order, then cut each bucket to its cap.
    /// Counts describe the cut buckets.
    pub fn group<'a, I>(&self, items: I) -> TierGroups
    where
        I: IntoIterator<Item = &'a ClassifiedItem>,
    {
        let mut groups: BTreeMap<Priority, Vec<ClassifiedItem>> =
            Priority::ALL.iter().map(|p| (*p, Vec::new())).collect();

        for item in items {
            if let Some(bucket) = groups.get_mut(&item.priority) {
                bucket.push(item.clone());
            }
        }

        for (priority, bucket) in groups.iter_mut() {
            let cap = self.limits.tier_caps.cap(*priority);
            if bucket.len() > cap {
                debug!("Truncating {} bucket {} -> {}", priority, bucket.len(), cap);
                bucket.truncate(cap);
            }
        }

        let counts = groups.iter().map(|(p, bucket)| (*p, bucket.len())).collect();
        TierGroups { groups, counts }
    }

    /// Frequently mentioned handles not yet on the watch-list.
    pub fn recommend<'a, I>(&self, items: I) -> Vec<Recommendation>
    where
        I: IntoIterator<Item = &'a ClassifiedItem>,
    {
        // lowercase handle -> (first-seen spelling, item count); order of first sight kept separately
        let mut counts: HashMap<String, (String, usize)> = HashMap::new();
        let mut first_seen: Vec<String> = Vec::new();

        for item in items {
            let mut in_item: HashSet<String> = HashSet::new();
            for text in [item.item.text.as_str(), item.summary.as_str()] {
                for capture in MENTION_REGEX.captures_iter(text) {
                    let handle = &capture[1];
                    let key = handle.to_lowercase();
                    if !in_item.insert(key.clone()) {
                        continue;
                    }
                    match counts.get_mut(&key) {
                        Some((_, count)) => *count += 1,
                        None => {
                            counts.insert(key.clone(), (handle.to_string(), 1));
                            first_seen.push(key);
                        }
                    }
                }
            }
        }

        let mut candidates: Vec<(String, usize)> = first_seen
            .into_iter()
            .filter(|key| !self.watchlist.contains(key))
            .filter_map(|key| counts.remove(&key))
            .filter(|(_, count)| *count >= self.limits.min_mentions)
            .collect();

        // stable: ties keep first-seen order
        candidates.sort_by(|a, b| b.1.cmp(&a.1));
        candidates.truncate(self.limits.max_recommendations);

        let recommendations: Vec<Recommendation> = candidates
            .into_iter()
            .map(|(handle, count)| Recommendation {
                category: handle_category(&handle).to_string(),
                reason: format!("在 {} 条内容中被提及", count),
                mention_count: count,
                handle,
            })
            .collect();

        info!("Derived {} account recommendations", recommendations.len());
        recommendations
    }

    /// Group posts then articles and derive recommendations from both.
    pub fn aggregate(&self, posts: &[ClassifiedItem], articles: &[ClassifiedItem]) -> Aggregation {
        let all = || posts.iter().chain(articles.iter());
        let tiers = self.group(all());
        let recommendations = self.recommend(all());

        info!(
            "Aggregated {} items: P1={}, P2={}, P3={}",
            posts.len() + articles.len(),
            tiers.count(Priority::P1),
            tiers.count(Priority::P2),
            tiers.count(Priority::P3)
        );

        Aggregation { tiers, recommendations }
    }
}

/// Regulator, then exchange, then project vocabulary; first hit wins.
pub fn handle_category(handle: &str) -> &'static str {
    let lowered = handle.to_lowercase();
    let hit = |vocabulary: &[&str]| vocabulary.iter().any(|word| lowered.contains(word));

    if hit(REGULATOR_VOCABULARY) {
        REGULATOR_CATEGORY
    } else if hit(EXCHANGE_VOCABULARY) {
        EXCHANGE_CATEGORY
    } else if hit(PROJECT_VOCABULARY) {
        PROJECT_CATEGORY
    } else {
        UNKNOWN_CATEGORY
    }
}
