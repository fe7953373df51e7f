use crate::llm_adapter::{AnalysisProvider, ProviderAnalysis};
use crate::types::{ClassifiedItem, Priority, RawItem, SourceKind};
use crate::utils::text::truncate_chars;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};

/// Enforcement, ban and penalty vocabulary. Any hit means P1.
pub const P1_KEYWORDS: &[&str] = &[
    "sec charges",
    "sec lawsuit",
    "enforcement action",
    "ban",
    "prohibition",
    "crackdown",
    "shutdown",
    "fine",
    "penalty",
    "violation",
    "regulatory action",
    "cease and desist",
    "settlement",
    "执法",
    "禁令",
    "处罚",
    "罚款",
    "关闭",
    "违规",
];

/// Guidance, licensing and disclosure vocabulary. Only consulted when no P1 keyword hit.
pub const P2_KEYWORDS: &[&str] = &[
    "guidance",
    "proposal",
    "framework",
    "compliance",
    "licensing",
    "registration",
    "disclosure",
    "transparency",
    "oversight",
    "指南",
    "合规",
    "牌照",
    "注册",
    "披露",
];

pub const ENFORCEMENT_CATEGORY: &str = "执法行动";
pub const POLICY_CATEGORY: &str = "监管政策";
pub const OTHER_CATEGORY: &str = "其他";

pub const TITLE_MAX_CHARS: usize = 20;
pub const SUMMARY_MAX_CHARS: usize = 50;
pub const RICH_SUMMARY_MAX_CHARS: usize = 100;

/// Outcome of classifying one piece of text
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub priority: Priority,
    pub category: String,
    pub title: String,
    pub summary: String,
    pub impact: Option<String>,
    pub affected_assets: Vec<String>,
    pub action: Option<String>,
    pub analysis: String,
}

impl Classification {
    pub fn into_item(self, item: RawItem) -> ClassifiedItem {
        ClassifiedItem {
            item,
            priority: self.priority,
            category: self.category,
            title: self.title,
            summary: self.summary,
            impact: self.impact,
            affected_assets: self.affected_assets,
            action: self.action,
            analysis: self.analysis,
        }
    }
}

/// Tier for `text` by case-insensitive substring containment, P1 checked first.
pub fn priority_for(text: &str) -> Priority {
    let lowered = text.to_lowercase();

    if P1_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
        Priority::P1
    } else if P2_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
        Priority::P2
    } else {
        Priority::P3
    }
}

pub fn category_for(priority: Priority) -> &'static str {
    match priority {
        Priority::P1 => ENFORCEMENT_CATEGORY,
        Priority::P2 => POLICY_CATEGORY,
        Priority::P3 => OTHER_CATEGORY,
    }
}

/// The deterministic baseline every classification falls back to.
///
/// Title and summary are cut from the text as given, surrounding whitespace included.
pub fn classify_by_keywords(text: &str, summary_max_chars: usize) -> Classification {
    let priority = priority_for(text);

    Classification {
        priority,
        category: category_for(priority).to_string(),
        title: truncate_chars(text, TITLE_MAX_CHARS),
        summary: truncate_chars(text, summary_max_chars),
        impact: None,
        affected_assets: Vec::new(),
        action: None,
        analysis: format!("基于关键词匹配分类为 {}", priority),
    }
}

/// Overlay a provider answer on the keyword result. Blank provider fields
/// keep the keyword value.
pub fn merge_analysis(text: &str, analysis: ProviderAnalysis) -> Classification {
    let baseline = classify_by_keywords(text, RICH_SUMMARY_MAX_CHARS);

    let priority = match non_blank(analysis.priority) {
        Some(raw) => match raw.parse::<Priority>() {
            Ok(priority) => priority,
            Err(e) => {
                warn!("Provider returned {}, keeping {}", e, baseline.priority);
                baseline.priority
            }
        },
        None => baseline.priority,
    };

    // The keyword category belongs to the keyword tier; a provider that only
    // changes the tier gets the label of its own tier.
    let category = non_blank(analysis.category)
        .unwrap_or_else(|| category_for(priority).to_string());

    let affected_assets: Vec<String> = analysis
        .affected_assets
        .into_iter()
        .map(|asset| asset.trim().to_string())
        .filter(|asset| !asset.is_empty())
        .collect();

    Classification {
        priority,
        category,
        title: non_blank(analysis.title)
            .map(|title| truncate_chars(&title, TITLE_MAX_CHARS))
            .unwrap_or(baseline.title),
        summary: non_blank(analysis.summary)
            .map(|summary| truncate_chars(&summary, RICH_SUMMARY_MAX_CHARS))
            .unwrap_or(baseline.summary),
        impact: non_blank(analysis.impact),
        affected_assets,
        action: non_blank(analysis.action),
        analysis: non_blank(analysis.rationale).unwrap_or(baseline.analysis),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Keyword rules with an optional analysis provider in front of them.
/// Classification itself never fails.
#[derive(Clone, Default)]
pub struct Classifier {
    provider: Option<Arc<dyn AnalysisProvider>>,
}

impl Classifier {
    pub fn keyword_only() -> Self {
        Self { provider: None }
    }

    pub fn with_provider(provider: Arc<dyn AnalysisProvider>) -> Self {
        Self {
            provider: Some(provider),
        }
    }

    pub async fn classify(&self, text: &str, kind: SourceKind) -> Classification {
        let Some(provider) = &self.provider else {
            return classify_by_keywords(text, SUMMARY_MAX_CHARS);
        };

        match provider.analyze(text, kind).await {
            Ok(analysis) => {
                debug!("{} answered for {} text", provider.provider_name(), kind);
                merge_analysis(text, analysis)
            }
            Err(e) => {
                warn!(
                    "Analysis provider {} failed, using keyword rules: {}",
                    provider.provider_name(),
                    e
                );
                classify_by_keywords(text, SUMMARY_MAX_CHARS)
            }
        }
    }

    /// Classify a raw item; a missing timestamp becomes the current time.
    pub async fn classify_item(&self, mut item: RawItem) -> ClassifiedItem {
        if item.timestamp.is_none() {
            item.timestamp = Some(Utc::now());
        }

        let classification = self.classify(&item.text, item.source_kind).await;
        debug!(
            "Classified {} {} as {} ({})",
            item.source_kind, item.identity, classification.priority, classification.category
        );
        classification.into_item(item)
    }

    /// Classify a batch in order; output order matches input order.
    pub async fn classify_all(&self, items: Vec<RawItem>) -> Vec<ClassifiedItem> {
        let mut classified = Vec::with_capacity(items.len());
        for item in items {
            classified.push(self.classify_item(item).await);
        }
        classified
    }
}
