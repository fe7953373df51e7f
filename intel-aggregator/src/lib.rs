pub mod types;
pub mod config;
pub mod utils;
pub mod logging;
pub mod watchlist;
pub mod traits;
pub mod fetcher;
pub mod parser;
pub mod sources;
pub mod dedup;
pub mod llm_adapter;
pub mod classifier;
pub mod aggregator;
pub mod digest;
pub mod history;
pub mod state;
pub mod render;
pub mod pipeline;

pub use types::*;
pub use config::{load_config, AppConfig};
pub use fetcher::Fetcher;
pub use parser::FeedParser;
pub use classifier::Classifier;
pub use aggregator::Aggregator;
pub use digest::ReportModelBuilder;
pub use history::HistoryTracker;
pub use render::HtmlRenderer;
pub use pipeline::IntelPipeline;
pub use watchlist::WatchList;
