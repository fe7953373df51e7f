use async_trait::async_trait;
use chrono::NaiveDate;
use intel_aggregator::config::AppConfig;
use intel_aggregator::history::HISTORY_FILE;
use intel_aggregator::pipeline::INDEX_FILE;
use intel_aggregator::render::report_file_name;
use intel_aggregator::state::{ANALYZED_FILE, POSTS_FILE, RECOMMENDATIONS_FILE};
use intel_aggregator::traits::PullFeed;
use intel_aggregator::{
    ClassifiedItem, Classifier, HistoryTracker, IntelError, IntelPipeline, Priority, RawItem,
    Recommendation, Result, SourceKind,
};
use std::path::Path;
use std::sync::Once;
use tempfile::TempDir;
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

const WATCHLIST: &str = r#"{"accounts": [{"username": "SECGov", "category": "regulator", "priority": "high"}]}"#;

fn test_config(root: &Path) -> Result<AppConfig> {
    let watchlist_path = root.join("accounts.json");
    std::fs::write(&watchlist_path, WATCHLIST)?;

    let mut config = AppConfig::default();
    config.directories.data_dir = root.join("data");
    config.directories.output_dir = root.join("docs");
    config.directories.watchlist_path = watchlist_path;
    Ok(config)
}

fn post(id: &str, author: &str, text: &str) -> RawItem {
    RawItem {
        identity: id.to_string(),
        source_kind: SourceKind::Post,
        text: text.to_string(),
        author: author.to_string(),
        timestamp: None,
        url: format!("https://x.com/{}/status/{}", author, id),
        account_category: String::new(),
    }
}

struct StaticSource {
    kind: SourceKind,
    items: Vec<RawItem>,
}

#[async_trait]
impl PullFeed for StaticSource {
    fn source_id(&self) -> String {
        format!("static_{}", self.kind)
    }

    fn source_name(&self) -> String {
        format!("Static {}", self.kind)
    }

    fn source_kind(&self) -> SourceKind {
        self.kind
    }

    async fn pull(&mut self) -> Result<Vec<RawItem>> {
        Ok(self.items.clone())
    }
}

struct BrokenSource;

#[async_trait]
impl PullFeed for BrokenSource {
    fn source_id(&self) -> String {
        "broken".to_string()
    }

    fn source_name(&self) -> String {
        "Broken".to_string()
    }

    fn source_kind(&self) -> SourceKind {
        SourceKind::Article
    }

    async fn pull(&mut self) -> Result<Vec<RawItem>> {
        Err(IntelError::Fetch {
            url: "https://unreachable.example.com/rss".to_string(),
            reason: "connection refused".to_string(),
        })
    }
}

#[tokio::test]
async fn test_fetch_dedupes_tags_and_persists() -> Result<()> {
    init_tracing();
    info!("Testing fetch stage");

    let dir = TempDir::new()?;
    let mut pipeline = IntelPipeline::new(test_config(dir.path())?);

    pipeline.add_source(Box::new(StaticSource {
        kind: SourceKind::Post,
        items: vec![
            post("tweet-42", "SECGov", "first"),
            post("tweet-43", "someone", "other"),
            post("tweet-42", "SECGov", "second"),
        ],
    }));
    pipeline.add_source(Box::new(BrokenSource));

    let summary = pipeline.fetch().await?;
    assert_eq!(summary.posts, 2);
    assert_eq!(summary.articles, 0);
    assert_eq!(summary.failed_sources, 1);

    let stored = pipeline.state().load_posts();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].text, "first");
    assert_eq!(stored[0].account_category, "regulator");
    assert_eq!(stored[1].account_category, "");
    assert!(pipeline.state().load_articles().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_offline_run_end_to_end() -> Result<()> {
    init_tracing();
    info!("Testing offline analyze and report");

    let dir = TempDir::new()?;
    let config = test_config(dir.path())?;
    let data_dir = config.directories.data_dir.clone();
    let output_dir = config.directories.output_dir.clone();
    std::fs::create_dir_all(&data_dir)?;

    // one record without identity, one without required fields; no article batch at all
    let posts = serde_json::json!([
        {"identity": "1", "source_kind": "post", "text": "SEC charges exchange with violation, says @binance", "author": "reporter", "url": "https://x.com/reporter/status/1"},
        {"identity": "2", "source_kind": "post", "text": "New compliance guidance framework proposal from @binance", "author": "SECGov", "url": "https://x.com/SECGov/status/2"},
        {"identity": "", "source_kind": "post", "text": "orphan", "author": "x", "url": "https://x.com"},
        {"text": "missing everything"},
        {"identity": "3", "source_kind": "post", "text": "Blockchain conference recap <script>alert(1)</script> @SECGov @SECGov", "author": "fan", "url": "https://x.com/fan/status/3"},
        {"identity": "4", "source_kind": "post", "text": "Crackdown continues, cc @SECGov", "author": "fan", "url": "https://x.com/fan/status/4"}
    ]);
    std::fs::write(data_dir.join(POSTS_FILE), serde_json::to_vec(&posts)?)?;

    let mut pipeline = IntelPipeline::new(config).with_classifier(Classifier::keyword_only());
    let date = NaiveDate::from_ymd_opt(2025, 3, 14).expect("valid test date");
    let outcome = pipeline.run(date, true).await?;

    let analyzed: Vec<ClassifiedItem> =
        serde_json::from_str(&std::fs::read_to_string(data_dir.join(ANALYZED_FILE))?)?;
    let order: Vec<(&str, Priority)> = analyzed
        .iter()
        .map(|i| (i.item.identity.as_str(), i.priority))
        .collect();
    assert_eq!(
        order,
        vec![("1", Priority::P1), ("4", Priority::P1), ("2", Priority::P2), ("3", Priority::P3)]
    );
    assert!(analyzed.iter().all(|i| i.item.timestamp.is_some()));

    let recommendations: Vec<Recommendation> =
        serde_json::from_str(&std::fs::read_to_string(data_dir.join(RECOMMENDATIONS_FILE))?)?;
    assert_eq!(recommendations.len(), 1);
    assert_eq!(recommendations[0].handle, "binance");
    assert_eq!(recommendations[0].mention_count, 2);
    assert_eq!(recommendations[0].category, "交易所");

    assert_eq!(outcome.total, 4);
    assert_eq!(outcome.report_path, output_dir.join(report_file_name(date)));
    let html = std::fs::read_to_string(&outcome.report_path)?;
    assert!(html.contains("&lt;script&gt;"));
    assert!(!html.contains("<script>"));
    assert!(html.contains("@binance"));
    let index_path = outcome.index_path.expect("first report refreshes the index");
    assert_eq!(std::fs::read_to_string(&index_path)?, html);

    assert!(output_dir.join(HISTORY_FILE).exists());
    assert_eq!(HistoryTracker::open(&output_dir).list_existing(), &[date]);

    Ok(())
}

#[tokio::test]
async fn test_missing_inputs_still_produce_report() -> Result<()> {
    init_tracing();

    let dir = TempDir::new()?;
    let mut pipeline = IntelPipeline::new(test_config(dir.path())?);
    let date = NaiveDate::from_ymd_opt(2025, 1, 2).expect("valid test date");

    let outcome = pipeline.run(date, true).await?;
    assert_eq!(outcome.total, 0);

    let html = std::fs::read_to_string(&outcome.report_path)?;
    assert!(html.contains("暂无内容"));

    Ok(())
}

#[tokio::test]
async fn test_expired_reports_are_removed() -> Result<()> {
    init_tracing();
    info!("Testing history retention");

    let dir = TempDir::new()?;
    let mut config = test_config(dir.path())?;
    config.limits.max_history = 2;
    let output_dir = config.directories.output_dir.clone();

    let pipeline = IntelPipeline::new(config);
    pipeline.analyze().await?;

    let dates: Vec<NaiveDate> = (1..=3)
        .map(|d| NaiveDate::from_ymd_opt(2025, 2, d).expect("valid test date"))
        .collect();
    let mut last = None;
    for date in &dates {
        last = Some(pipeline.report(*date)?);
    }

    let last = last.expect("three reports written");
    assert_eq!(last.pruned, vec![dates[0]]);
    assert!(!output_dir.join(report_file_name(dates[0])).exists());
    assert!(output_dir.join(report_file_name(dates[1])).exists());
    assert!(output_dir.join(report_file_name(dates[2])).exists());
    assert_eq!(
        HistoryTracker::open(&output_dir).list_existing(),
        &[dates[2], dates[1]]
    );

    Ok(())
}

#[tokio::test]
async fn test_back_dated_reports() -> Result<()> {
    init_tracing();
    info!("Testing reports for past dates");

    let dir = TempDir::new()?;
    let mut config = test_config(dir.path())?;
    config.limits.max_history = 2;
    let output_dir = config.directories.output_dir.clone();

    let pipeline = IntelPipeline::new(config);
    pipeline.analyze().await?;

    let day = |d| NaiveDate::from_ymd_opt(2025, 4, d).expect("valid test date");
    pipeline.report(day(10))?;

    // inside the window: written and recorded, index keeps the newest report
    let index_before = std::fs::read_to_string(output_dir.join(INDEX_FILE))?;
    let outcome = pipeline.report(day(8))?;
    assert!(outcome.index_path.is_none());
    assert!(outcome.report_path.exists());
    assert_eq!(std::fs::read_to_string(output_dir.join(INDEX_FILE))?, index_before);
    assert_eq!(HistoryTracker::open(&output_dir).list_existing(), &[day(10), day(8)]);

    // history is full and the date predates all of it
    let result = pipeline.report(day(1));
    assert!(matches!(
        result,
        Err(IntelError::OutsideRetention { date, oldest }) if date == day(1) && oldest == day(8)
    ));
    assert!(!output_dir.join(report_file_name(day(1))).exists());
    assert_eq!(std::fs::read_to_string(output_dir.join(INDEX_FILE))?, index_before);
    assert_eq!(HistoryTracker::open(&output_dir).list_existing(), &[day(10), day(8)]);

    // re-rendering a retained date is allowed
    let outcome = pipeline.report(day(8))?;
    assert!(outcome.pruned.is_empty());

    // a newer date refreshes the index and expires the oldest report
    let outcome = pipeline.report(day(12))?;
    assert_eq!(outcome.index_path, Some(output_dir.join(INDEX_FILE)));
    assert_eq!(outcome.pruned, vec![day(8)]);
    assert!(!output_dir.join(report_file_name(day(8))).exists());

    Ok(())
}
