// Public modules
pub mod types;
pub mod config;
pub mod parsing;
pub mod regions;
pub mod coverage;
pub mod inventory;
pub mod collector;
pub mod report;
pub mod inspector;
pub mod notifier;
pub mod pipeline;

// Re-export commonly used items
pub use types::*;
pub use config::{
    load_config, load_config_with_env, parse_settings, validate_coverage, validate_inspection, ConfigError,
    EnvironmentProvider, MockEnvironment, SystemEnvironment,
};
pub use coverage::{calculate_coverage, coverage_percentage, group_by_category, soonest_expiring, summarize_reservations};
pub use regions::region_display_name;
pub use inventory::{Ec2Inventory, InventoryError, InventoryProvider};
pub use collector::CoverageAnalyzer;
pub use report::{AggregateReport, CrossRegionSummary, RegionalExpiry};
pub use report::chat::{render_chat_summary, CoverageStatus};
pub use report::markdown::render_markdown;
pub use inspector::{inspection_message, InspectionError, OpenAiSummarizer, PrometheusInspector};
pub use notifier::MattermostNotifier;
pub use pipeline::{coverage_ready, inspection_ready, CoverageRun, Delivery, InspectionRun, RunOptions};
