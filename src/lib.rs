pub mod config;
pub mod error;
pub mod feed;
pub mod indicator;
pub mod model;
pub mod pipeline;
pub mod router;
pub mod sentiment;
pub mod shutdown;
pub mod sink;
