use crate::aggregator::Aggregator;
use crate::classifier::Classifier;
use crate::config::AppConfig;
use crate::dedup::dedupe;
use crate::digest::ReportModelBuilder;
use crate::history::HistoryTracker;
use crate::llm_adapter::ChatCompletionAnalyzer;
use crate::render::{report_file_name, HtmlRenderer};
use crate::sources::{RssFeedSource, XSearchSource};
use crate::state::{write_atomic, RunState};
use crate::traits::PullFeed;
use crate::types::{ClassifiedItem, IntelError, Priority, RawItem, Recommendation, Renderer, Result, SourceKind};
use crate::watchlist::WatchList;
use crate::Fetcher;
use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const INDEX_FILE: &str = "index.html";

#[derive(Debug, Clone, Default)]
pub struct FetchSummary {
    pub posts: usize,
    pub articles: usize,
    pub failed_sources: usize,
}

#[derive(Debug, Clone, Default)]
pub struct AnalysisOutcome {
    pub items: Vec<ClassifiedItem>,
    pub recommendations: Vec<Recommendation>,
}

impl AnalysisOutcome {
    pub fn count(&self, priority: Priority) -> usize {
        self.items.iter().filter(|item| item.priority == priority).count()
    }
}

#[derive(Debug, Clone)]
pub struct ReportOutcome {
    pub report_path: PathBuf,
    /// Set when `index.html` was refreshed, which only happens for the newest date.
    pub index_path: Option<PathBuf>,
    pub total: usize,
    pub pruned: Vec<NaiveDate>,
}

/// Fetch -> analyze -> report, each stage persisting its artifact so the
/// stages can also run separately.
pub struct IntelPipeline {
    config: Arc<AppConfig>,
    watchlist: WatchList,
    classifier: Classifier,
    state: RunState,
    renderer: Box<dyn Renderer + Send + Sync>,
    sources: Vec<Box<dyn PullFeed>>,
}

impl IntelPipeline {
    /// Build from configuration. The analysis provider is enabled only when
    /// a key is configured; failing to build it falls back to keyword rules.
    pub fn new(config: AppConfig) -> Self {
        let watchlist = WatchList::load(&config.directories.watchlist_path);

        let classifier = match ChatCompletionAnalyzer::from_config(&config.analyzer) {
            Ok(Some(analyzer)) => {
                info!("Analysis provider enabled: {}", config.analyzer.model);
                Classifier::with_provider(Arc::new(analyzer))
            }
            Ok(None) => {
                info!("No analysis provider configured, using keyword rules");
                Classifier::keyword_only()
            }
            Err(e) => {
                warn!("Could not set up analysis provider, using keyword rules: {}", e);
                Classifier::keyword_only()
            }
        };

        let state = RunState::new(config.directories.data_dir.clone());

        Self {
            config: Arc::new(config),
            watchlist,
            classifier,
            state,
            renderer: Box::new(HtmlRenderer::new()),
            sources: Vec::new(),
        }
    }

    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_watchlist(mut self, watchlist: WatchList) -> Self {
        self.watchlist = watchlist;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn add_source(&mut self, source: Box<dyn PullFeed>) {
        info!("Adding source to pipeline: {}", source.source_name());
        self.sources.push(source);
    }

    /// Register the configured search queries and RSS feeds.
    pub fn add_configured_sources(&mut self) -> Result<()> {
        let fetcher = Arc::new(Fetcher::new(self.config.fetch.clone())?);

        match self.config.x_api.api_key.clone() {
            Some(api_key) => {
                let mut x_fetch = self.config.fetch.clone();
                x_fetch.timeout_seconds = self.config.x_api.timeout_seconds;
                x_fetch.max_retries = self.config.x_api.retries;
                let x_fetcher = Arc::new(Fetcher::new(x_fetch)?);

                let queries: Vec<String> = self
                    .config
                    .search_queries
                    .iter()
                    .take(self.config.x_api.max_queries)
                    .cloned()
                    .collect();
                for query in queries {
                    self.add_source(Box::new(XSearchSource::new(
                        query,
                        api_key.clone(),
                        self.config.x_api.clone(),
                        x_fetcher.clone(),
                    )));
                }
            }
            None => warn!("TWITTER_API_KEY not set, skipping post search"),
        }

        let feeds = self.config.rss.feeds.clone();
        for url in feeds {
            self.add_source(Box::new(RssFeedSource::new(
                url,
                fetcher.clone(),
                self.config.rss.entries_per_feed,
                self.config.rss.summary_max_chars,
            )));
        }

        Ok(())
    }

    /// Attach the watch-list category of each post's author.
    pub fn tag_accounts(&self, posts: &mut [RawItem]) {
        for post in posts.iter_mut().filter(|p| p.source_kind == SourceKind::Post) {
            if let Some(account) = self.watchlist.get(&post.author) {
                post.account_category = account.category.clone();
            }
        }
    }

    /// Pull every source, dedupe each kind separately and persist both batches.
    /// A failing source is logged and skipped.
    pub async fn fetch(&mut self) -> Result<FetchSummary> {
        let mut posts = Vec::new();
        let mut articles = Vec::new();
        let mut failed_sources = 0;

        for source in self.sources.iter_mut() {
            match source.pull().await {
                Ok(items) => {
                    debug!("{} ({}) returned {} items", source.source_name(), source.source_id(), items.len());
                    match source.source_kind() {
                        SourceKind::Post => posts.extend(items),
                        SourceKind::Article => articles.extend(items),
                    }
                }
                Err(e) => {
                    failed_sources += 1;
                    warn!("Source {} failed: {}", source.source_name(), e);
                }
            }
        }

        let mut posts = dedupe(posts);
        let articles = dedupe(articles);
        self.tag_accounts(&mut posts);

        self.state.save_posts(&posts)?;
        self.state.save_articles(&articles)?;

        info!(
            "Fetch finished: {} posts, {} articles, {} failed sources",
            posts.len(),
            articles.len(),
            failed_sources
        );

        Ok(FetchSummary {
            posts: posts.len(),
            articles: articles.len(),
            failed_sources,
        })
    }

    /// Classify the persisted batches and derive recommendations.
    pub async fn analyze(&self) -> Result<AnalysisOutcome> {
        let posts = dedupe(self.state.load_posts());
        let articles = dedupe(self.state.load_articles());
        info!("Loaded {} posts, {} articles", posts.len(), articles.len());

        let aggregator = Aggregator::new(self.config.limits.clone(), self.watchlist.clone());
        let (posts, articles) = aggregator.cap_batches(posts, articles);

        let classified_posts = self.classifier.classify_all(posts).await;
        let classified_articles = self.classifier.classify_all(articles).await;

        let aggregation = aggregator.aggregate(&classified_posts, &classified_articles);

        let mut items: Vec<ClassifiedItem> = classified_posts;
        items.extend(classified_articles);
        // stable: posts before articles within a tier
        items.sort_by_key(|item| item.priority);

        self.state.save_analyzed(&items)?;
        self.state.save_recommendations(&aggregation.recommendations)?;

        Ok(AnalysisOutcome {
            items,
            recommendations: aggregation.recommendations,
        })
    }

    /// Render the persisted analysis for `date` and update the history index.
    pub fn report(&self, date: NaiveDate) -> Result<ReportOutcome> {
        let items = self.state.load_analyzed();
        let recommendations = self.state.load_recommendations();
        info!("Building report for {} from {} classified items", date, items.len());

        let aggregator = Aggregator::new(self.config.limits.clone(), self.watchlist.clone());
        let tiers = aggregator.group(&items);

        let output_dir = &self.config.directories.output_dir;
        let mut history = HistoryTracker::open(output_dir);

        let max_history = self.config.limits.max_history;
        let existing = history.list_existing();
        if !existing.contains(&date) && existing.len() >= max_history {
            if let Some(&oldest) = existing.last() {
                if date < oldest {
                    return Err(IntelError::OutsideRetention { date, oldest });
                }
            }
        }
        let is_latest = existing.first().map_or(true, |newest| date >= *newest);

        let builder = ReportModelBuilder::new(max_history);
        let snapshot = builder.build(date, tiers, recommendations, history.list_existing());
        let total = snapshot.total();

        let html = self
            .renderer
            .render(&snapshot)
            .map_err(|e| IntelError::Render(format!("{}: {:#}", date, e)))?;

        let report_path = output_dir.join(report_file_name(date));
        write_atomic(&report_path, html.as_bytes())?;

        let index_path = if is_latest {
            let path = output_dir.join(INDEX_FILE);
            write_atomic(&path, html.as_bytes())?;
            Some(path)
        } else {
            info!("{} is not the newest report, leaving {} as is", date, INDEX_FILE);
            None
        };

        history.record(date)?;
        let pruned = history.prune(max_history)?;
        for old in pruned.iter().filter(|old| **old != date) {
            let old_path = output_dir.join(report_file_name(*old));
            match std::fs::remove_file(&old_path) {
                Ok(()) => debug!("Removed expired report {}", old_path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Could not remove expired report {}: {}", old_path.display(), e),
            }
        }

        info!("Report written to {} ({} items)", report_path.display(), total);
        Ok(ReportOutcome {
            report_path,
            index_path,
            total,
            pruned,
        })
    }

    /// All three stages. `offline` skips fetching and works from the stored batches.
    pub async fn run(&mut self, date: NaiveDate, offline: bool) -> Result<ReportOutcome> {
        if offline {
            info!("Offline run, reusing stored batches");
        } else {
            if self.sources.is_empty() {
                self.add_configured_sources()?;
            }
            self.fetch().await?;
        }

        let analysis = self.analyze().await?;
        info!(
            "Analysis finished: P1={}, P2={}, P3={}, {} recommendations",
            analysis.count(Priority::P1),
            analysis.count(Priority::P2),
            analysis.count(Priority::P3),
            analysis.recommendations.len()
        );

        self.report(date)
    }
}
