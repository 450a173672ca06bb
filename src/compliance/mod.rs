//! Compliance scoring of template components.
//!
//! A component lives at `root/{type}/{category}/{name}` and is scored by
//! four checks (naming, structure, integration, performance). The
//! aggregate is their mean; see [`ComplianceLevel`] for the tiers.

pub mod checks;
pub mod schema;
pub mod scorer;
pub mod types;

pub use checks::{
    check_integration, check_naming, check_performance, check_structure, is_valid_name,
    CheckOutcome, IntegrationCheck, PerformanceCheck, SizeTier, StructureCheck, PASS_SCORE,
};
pub use schema::{load_config, parse_config, ComponentConfig, ConfigError, ConfigErrorKind};
pub use scorer::{
    discover_components, score_component, test_all, test_type, validate_naming,
    validate_structure, ComplianceLevel, ComponentTestResult, QaError, QaReport, QaRun,
    QaSummary, ScoreOptions, QA_REPORT_FILE,
};
pub use types::{Artifact, ComponentRef, ComponentType};
