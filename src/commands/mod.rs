pub mod holdings;
pub mod import;
pub mod report;
