pub mod card;
pub mod enriched;
pub mod raw_source;
pub mod report;
