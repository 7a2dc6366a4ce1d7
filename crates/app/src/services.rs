//! Application services — operator-facing use-cases for rules and
//! templates. The HTTP layer (outside this crate) delegates here.

pub mod rule_service;
pub mod template_service;

pub use rule_service::{RulePreview, RuleService, TriggerOutcome};
pub use template_service::TemplateService;
