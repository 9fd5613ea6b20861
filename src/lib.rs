pub mod cli;
pub mod config;
pub mod date;
pub mod extract;
pub mod keyword;
pub mod metrics;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod source;
pub mod stats;
pub mod table;
pub mod util;
