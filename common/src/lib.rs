pub mod config;
pub mod plot;
pub mod record;
pub mod report;
pub mod results;
