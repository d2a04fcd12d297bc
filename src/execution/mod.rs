// Order execution and data collection module
pub mod bar_feed;
pub mod dispatcher;

pub use bar_feed::BarFeed;
pub use dispatcher::OrderDispatcher;
