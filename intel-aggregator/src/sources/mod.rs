pub mod rss_feed;
pub mod x_search;

pub use rss_feed::RssFeedSource;
pub use x_search::XSearchSource;
