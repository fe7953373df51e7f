use async_trait::async_trait;
use intel_aggregator::classifier::{
    classify_by_keywords, priority_for, Classifier, ENFORCEMENT_CATEGORY, OTHER_CATEGORY,
    POLICY_CATEGORY, SUMMARY_MAX_CHARS,
};
use intel_aggregator::llm_adapter::{parse_analysis, AnalysisProvider, ProviderAnalysis};
use intel_aggregator::{IntelError, Priority, RawItem, Result, SourceKind};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use tracing::info;

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .try_init()
            .ok();
    });
}

struct FixedProvider {
    answer: ProviderAnalysis,
    calls: AtomicUsize,
}

#[async_trait]
impl AnalysisProvider for FixedProvider {
    fn provider_name(&self) -> String {
        "fixed".to_string()
    }

    async fn analyze(&self, _text: &str, _kind: SourceKind) -> Result<ProviderAnalysis> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.answer.clone())
    }
}

struct FailingProvider;

#[async_trait]
impl AnalysisProvider for FailingProvider {
    fn provider_name(&self) -> String {
        "failing".to_string()
    }

    async fn analyze(&self, _text: &str, _kind: SourceKind) -> Result<ProviderAnalysis> {
        Err(IntelError::Analysis("timed out".to_string()))
    }
}

#[tokio::test]
async fn test_keyword_scenarios() -> Result<()> {
    init_tracing();
    info!("Testing keyword classification scenarios");

    let classifier = Classifier::keyword_only();

    let enforcement = classifier
        .classify("SEC charges exchange with violation", SourceKind::Post)
        .await;
    assert_eq!(enforcement.priority, Priority::P1);
    assert_eq!(enforcement.category, ENFORCEMENT_CATEGORY);

    let policy = classifier
        .classify("New compliance guidance framework proposal", SourceKind::Article)
        .await;
    assert_eq!(policy.priority, Priority::P2);
    assert_eq!(policy.category, POLICY_CATEGORY);

    let other = classifier
        .classify("Blockchain conference recap and roadmap update", SourceKind::Post)
        .await;
    assert_eq!(other.priority, Priority::P3);
    assert_eq!(other.category, OTHER_CATEGORY);
    assert_eq!(other.analysis, "基于关键词匹配分类为 P3");

    Ok(())
}

#[test]
fn test_enforcement_wins_over_guidance() {
    init_tracing();

    assert_eq!(priority_for("New guidance issued after regulator crackdown"), Priority::P1);
    assert_eq!(priority_for("Compliance framework follows ENFORCEMENT ACTION"), Priority::P1);
    assert_eq!(priority_for("监管机构发布合规指南并宣布处罚"), Priority::P1);
    assert_eq!(priority_for("香港证监会发布虚拟资产交易平台合规指南"), Priority::P2);
    assert_eq!(priority_for("Weekly market wrap"), Priority::P3);
}

#[test]
fn test_title_and_summary_truncation() {
    init_tracing();

    let exact = "SEC crypto roundup 1";
    assert_eq!(exact.chars().count(), 20);
    let result = classify_by_keywords(exact, SUMMARY_MAX_CHARS);
    assert_eq!(result.title, exact);
    assert_eq!(result.summary, exact);

    let long = "abcdefghijklmnopqrstuvwxyz0123";
    let result = classify_by_keywords(long, SUMMARY_MAX_CHARS);
    assert_eq!(result.title, "abcdefghijklmnopqrst...");
    assert_eq!(result.summary, long);

    let longer = "x".repeat(80);
    let result = classify_by_keywords(&longer, SUMMARY_MAX_CHARS);
    assert_eq!(result.summary.chars().count(), SUMMARY_MAX_CHARS + 3);
    assert!(result.summary.ends_with("..."));

    // characters, not bytes
    let cjk = "美国证券交易委员会对某加密货币交易平台提起诉讼并寻求禁令救济";
    let result = classify_by_keywords(cjk, SUMMARY_MAX_CHARS);
    assert_eq!(result.priority, Priority::P1);
    assert_eq!(result.title, format!("{}...", cjk.chars().take(20).collect::<String>()));
    assert_eq!(result.summary, cjk);

    let verbatim = "香港证监会发布虚拟资产交易平台合规指南";
    let result = classify_by_keywords(verbatim, SUMMARY_MAX_CHARS);
    assert_eq!(result.title, verbatim);
}

#[test]
fn test_surrounding_whitespace_is_kept() {
    init_tracing();

    let padded = "  SEC update today  ";
    let result = classify_by_keywords(padded, SUMMARY_MAX_CHARS);
    assert_eq!(result.title, padded);
    assert_eq!(result.summary, padded);

    // 23 chars counting the leading spaces
    let indented = "   abcdefghijklmnopqrst";
    let result = classify_by_keywords(indented, SUMMARY_MAX_CHARS);
    assert_eq!(result.title, "   abcdefghijklmnopq...");
    assert_eq!(result.summary, indented);
}

#[tokio::test]
async fn test_provider_overrides_and_backfills() -> Result<()> {
    init_tracing();
    info!("Testing provider field merge");

    let provider = Arc::new(FixedProvider {
        answer: ProviderAnalysis {
            priority: Some("P2".to_string()),
            category: Some("  ".to_string()),
            title: Some("SEC 起诉交易所".to_string()),
            summary: None,
            impact: Some("交易所面临罚款".to_string()),
            affected_assets: vec!["BNB".to_string(), " ".to_string()],
            action: Some("评估敞口".to_string()),
            rationale: None,
        },
        calls: AtomicUsize::new(0),
    });
    let classifier = Classifier::with_provider(provider.clone());

    let text = "SEC charges exchange with violation";
    let result = classifier.classify(text, SourceKind::Post).await;

    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.priority, Priority::P2);
    assert_eq!(result.category, POLICY_CATEGORY);
    assert_eq!(result.title, "SEC 起诉交易所");
    assert_eq!(result.summary, text);
    assert_eq!(result.impact.as_deref(), Some("交易所面临罚款"));
    assert_eq!(result.affected_assets, vec!["BNB".to_string()]);
    assert_eq!(result.action.as_deref(), Some("评估敞口"));
    assert!(result.analysis.starts_with("基于关键词匹配"));

    Ok(())
}

#[tokio::test]
async fn test_blank_provider_summary_uses_longer_excerpt() -> Result<()> {
    init_tracing();

    let provider = Arc::new(FixedProvider {
        answer: ProviderAnalysis {
            priority: Some("urgent".to_string()),
            rationale: Some("Large exchange affected".to_string()),
            ..Default::default()
        },
        calls: AtomicUsize::new(0),
    });
    let classifier = Classifier::with_provider(provider);

    let text = format!("Regulator announces fine {}", "y".repeat(150));
    let result = classifier.classify(&text, SourceKind::Article).await;

    // unparseable tier keeps the keyword tier
    assert_eq!(result.priority, Priority::P1);
    assert_eq!(result.category, ENFORCEMENT_CATEGORY);
    assert_eq!(result.summary.chars().count(), 103);
    assert_eq!(result.analysis, "Large exchange affected");

    Ok(())
}

#[tokio::test]
async fn test_failing_provider_falls_back() -> Result<()> {
    init_tracing();
    info!("Testing provider failure fallback");

    let classifier = Classifier::with_provider(Arc::new(FailingProvider));
    let text = "Exchange registration deadline extended by regulator";

    let result = classifier.classify(text, SourceKind::Article).await;
    assert_eq!(result, classify_by_keywords(text, SUMMARY_MAX_CHARS));
    assert_eq!(result.priority, Priority::P2);

    Ok(())
}

#[tokio::test]
async fn test_classify_item_fills_timestamp() -> Result<()> {
    init_tracing();

    let item = RawItem {
        identity: "1869".to_string(),
        source_kind: SourceKind::Post,
        text: "CFTC settlement with trading firm".to_string(),
        author: "CFTC".to_string(),
        timestamp: None,
        url: "https://x.com/CFTC/status/1869".to_string(),
        account_category: "regulator".to_string(),
    };

    let classified = Classifier::keyword_only().classify_item(item.clone()).await;
    assert!(classified.item.timestamp.is_some());
    assert_eq!(classified.item.identity, item.identity);
    assert_eq!(classified.item.account_category, "regulator");
    assert_eq!(classified.priority, Priority::P1);

    Ok(())
}

#[test]
fn test_parse_provider_answer() {
    init_tracing();

    let fenced = "```json\n{\"priority\": \"P1\", \"category\": \"执法行动\", \"affected_assets\": [\"ETH\"]}\n```";
    let analysis = parse_analysis(fenced).expect("fenced JSON parses");
    assert_eq!(analysis.priority.as_deref(), Some("P1"));
    assert_eq!(analysis.affected_assets, vec!["ETH".to_string()]);
    assert!(analysis.title.is_none());

    assert!(parse_analysis("I think this is important").is_err());
}
