//! Provider decision table.
//!
//! Rules are evaluated top to bottom and the first applicable one produces
//! the plan: an ordered chain of strategies to try, plus the reason to
//! report if the chain is exhausted without text.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::StrategyError;
use crate::models::receipt::{ExtractionMode, MediaKind, Provider};

/// Whether the cloud service may be called right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CloudAvailability {
    Available,
    NotConfigured,
    Disabled,
    QuotaExhausted { used: u32, limit: u32 },
}

impl CloudAvailability {
    pub fn is_available(&self) -> bool {
        matches!(self, CloudAvailability::Available)
    }
}

impl fmt::Display for CloudAvailability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloudAvailability::Available => f.write_str("cloud OCR available"),
            CloudAvailability::NotConfigured => f.write_str("cloud OCR not configured"),
            CloudAvailability::Disabled => f.write_str("cloud OCR disabled"),
            CloudAvailability::QuotaExhausted { used, limit } => {
                write!(f, "monthly cloud OCR quota reached ({}/{})", used, limit)
            }
        }
    }
}

/// The most specific reason a run produced no text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "detail")]
pub enum Blocker {
    NotConfigured,
    Disabled,
    QuotaReached { used: u32, limit: u32 },
    PdfTextUnavailable,
    LocalUnavailable,
    LocalEngineFailed(String),
    CloudFailed(String),
    /// No OCR route at all for an image; carries the cloud's reason.
    OcrUnavailable(CloudAvailability),
    FileUnreadable(String),
}

impl fmt::Display for Blocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Blocker::NotConfigured => f.write_str("cloud OCR not configured"),
            Blocker::Disabled => f.write_str("cloud OCR disabled"),
            Blocker::QuotaReached { used, limit } => {
                write!(f, "monthly cloud OCR quota reached ({}/{})", used, limit)
            }
            Blocker::PdfTextUnavailable => f.write_str("PDF text unavailable"),
            Blocker::LocalUnavailable => f.write_str("local OCR unavailable"),
            Blocker::LocalEngineFailed(msg) => write!(f, "local OCR engine failed: {}", msg),
            Blocker::CloudFailed(msg) => write!(f, "cloud OCR failed: {}", msg),
            Blocker::OcrUnavailable(cause) => write!(f, "OCR unavailable: {}", cause),
            Blocker::FileUnreadable(msg) => write!(f, "cannot read file: {}", msg),
        }
    }
}

impl From<CloudAvailability> for Blocker {
    fn from(cloud: CloudAvailability) -> Self {
        match cloud {
            CloudAvailability::Disabled => Blocker::Disabled,
            CloudAvailability::QuotaExhausted { used, limit } => Blocker::QuotaReached { used, limit },
            CloudAvailability::NotConfigured | CloudAvailability::Available => Blocker::NotConfigured,
        }
    }
}

/// One extraction strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    PdfText,
    CloudOcr,
    LocalOcr,
}

impl From<Step> for Provider {
    fn from(step: Step) -> Self {
        match step {
            Step::PdfText => Provider::PdfText,
            Step::CloudOcr => Provider::CloudOcr,
            Step::LocalOcr => Provider::LocalOcr,
        }
    }
}

/// Capabilities and request attributes the table decides on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Facts {
    pub mode: ExtractionMode,
    pub media: MediaKind,
    pub pdf_text: bool,
    pub cloud: CloudAvailability,
    pub local: bool,
}

/// Ordered strategies to try for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub steps: Vec<Step>,
    /// Reported when no step yields text and no later failure is more
    /// specific.
    pub exhausted: Blocker,
    pub reason: &'static str,
}

impl Plan {
    fn new(reason: &'static str, exhausted: Blocker) -> Self {
        Self {
            steps: Vec::new(),
            exhausted,
            reason,
        }
    }

    fn then_if(mut self, available: bool, step: Step) -> Self {
        if available {
            self.steps.push(step);
        }
        self
    }

    /// Blocker for a failed attempt of `step`.
    pub fn blocker_for(&self, step: Step, error: &StrategyError) -> Blocker {
        match (step, error) {
            (Step::CloudOcr, StrategyError::Configuration(_)) => Blocker::NotConfigured,
            (Step::CloudOcr, StrategyError::QuotaExceeded { used, limit }) => Blocker::QuotaReached {
                used: *used,
                limit: *limit,
            },
            (Step::CloudOcr, other) => Blocker::CloudFailed(other.to_string()),
            (Step::LocalOcr, other) => Blocker::LocalEngineFailed(other.to_string()),
            (Step::PdfText, _) => self.exhausted.clone(),
        }
    }
}

/// One row of the decision table.
pub struct Rule {
    pub name: &'static str,
    pub applies: fn(&Facts) -> bool,
    pub plan: fn(&Facts) -> Plan,
}

/// The decision table, in precedence order. The last rule always applies.
pub const DECISION_TABLE: &[Rule] = &[
    Rule {
        name: "force-local-pdf-text",
        applies: force_local_pdf_with_text,
        plan: plan_force_local_pdf_text,
    },
    Rule {
        name: "force-local-pdf-unsupported",
        applies: force_local_pdf,
        plan: plan_force_local_pdf_unsupported,
    },
    Rule {
        name: "force-local-image",
        applies: force_local,
        plan: plan_force_local_image,
    },
    Rule {
        name: "force-cloud",
        applies: force_cloud,
        plan: plan_force_cloud,
    },
    Rule {
        name: "auto-pdf",
        applies: is_pdf,
        plan: plan_auto_pdf,
    },
    Rule {
        name: "auto-image",
        applies: always,
        plan: plan_auto_image,
    },
];

fn force_local_pdf_with_text(f: &Facts) -> bool {
    force_local_pdf(f) && f.pdf_text
}

fn force_local_pdf(f: &Facts) -> bool {
    force_local(f) && is_pdf(f)
}

fn force_local(f: &Facts) -> bool {
    f.mode == ExtractionMode::ForceLocal
}

fn force_cloud(f: &Facts) -> bool {
    f.mode == ExtractionMode::ForceCloud
}

fn is_pdf(f: &Facts) -> bool {
    f.media == MediaKind::Pdf
}

fn always(_: &Facts) -> bool {
    true
}

fn plan_force_local_pdf_text(f: &Facts) -> Plan {
    Plan::new("local mode: reading PDF text layer", Blocker::LocalUnavailable)
        .then_if(true, Step::PdfText)
        .then_if(f.cloud.is_available(), Step::CloudOcr)
}

fn plan_force_local_pdf_unsupported(_: &Facts) -> Plan {
    Plan::new(
        "local mode: PDF text layer unavailable",
        Blocker::LocalUnavailable,
    )
}

fn plan_force_local_image(f: &Facts) -> Plan {
    Plan::new("local mode: on-device OCR", Blocker::LocalUnavailable)
        .then_if(f.local, Step::LocalOcr)
}

fn plan_force_cloud(f: &Facts) -> Plan {
    Plan::new("cloud mode: cloud OCR requested", f.cloud.into())
        .then_if(f.cloud.is_available(), Step::CloudOcr)
}

fn plan_auto_pdf(f: &Facts) -> Plan {
    Plan::new("PDF: text layer first", Blocker::PdfTextUnavailable)
        .then_if(f.pdf_text, Step::PdfText)
        .then_if(f.cloud.is_available(), Step::CloudOcr)
}

fn plan_auto_image(f: &Facts) -> Plan {
    Plan::new("image: cloud OCR first", Blocker::OcrUnavailable(f.cloud))
        .then_if(f.cloud.is_available(), Step::CloudOcr)
        .then_if(f.local, Step::LocalOcr)
}

/// Evaluate the table.
pub fn decide(facts: &Facts) -> (&'static Rule, Plan) {
    let rule = DECISION_TABLE
        .iter()
        .find(|rule| (rule.applies)(facts))
        .unwrap_or(&DECISION_TABLE[DECISION_TABLE.len() - 1]);
    (rule, (rule.plan)(facts))
}

/// Whether a failed attempt still reached the service (and so consumed
/// quota).
pub fn reached_service(error: &StrategyError) -> bool {
    matches!(error, StrategyError::EmptyResult | StrategyError::Decode(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn facts(mode: ExtractionMode, media: MediaKind) -> Facts {
        Facts {
            mode,
            media,
            pdf_text: true,
            cloud: CloudAvailability::Available,
            local: true,
        }
    }

    fn steps(f: &Facts) -> Vec<Step> {
        decide(f).1.steps
    }

    #[test]
    fn test_force_local_pdf_reads_text_then_cloud() {
        let f = facts(ExtractionMode::ForceLocal, MediaKind::Pdf);
        let (rule, plan) = decide(&f);
        assert_eq!(rule.name, "force-local-pdf-text");
        assert_eq!(plan.steps, vec![Step::PdfText, Step::CloudOcr]);
        assert_eq!(plan.exhausted, Blocker::LocalUnavailable);

        let no_cloud = Facts {
            cloud: CloudAvailability::NotConfigured,
            ..f
        };
        assert_eq!(steps(&no_cloud), vec![Step::PdfText]);
    }

    #[test]
    fn test_force_local_pdf_without_text_layer() {
        let f = Facts {
            pdf_text: false,
            ..facts(ExtractionMode::ForceLocal, MediaKind::Pdf)
        };
        let (rule, plan) = decide(&f);
        assert_eq!(rule.name, "force-local-pdf-unsupported");
        assert!(plan.steps.is_empty());
        assert_eq!(plan.exhausted, Blocker::LocalUnavailable);
    }

    #[test]
    fn test_force_local_image_never_uses_cloud() {
        let f = facts(ExtractionMode::ForceLocal, MediaKind::Image);
        assert_eq!(steps(&f), vec![Step::LocalOcr]);
        assert!(steps(&Facts { local: false, ..f }).is_empty());
    }

    #[test]
    fn test_force_cloud_has_no_fallback() {
        let f = facts(ExtractionMode::ForceCloud, MediaKind::Pdf);
        assert_eq!(steps(&f), vec![Step::CloudOcr]);

        let exhausted = Facts {
            cloud: CloudAvailability::QuotaExhausted { used: 5, limit: 5 },
            ..facts(ExtractionMode::ForceCloud, MediaKind::Image)
        };
        let (_, plan) = decide(&exhausted);
        assert!(plan.steps.is_empty());
        assert_eq!(plan.exhausted, Blocker::QuotaReached { used: 5, limit: 5 });
    }

    #[test]
    fn test_auto_pdf() {
        let f = facts(ExtractionMode::Auto, MediaKind::Pdf);
        assert_eq!(steps(&f), vec![Step::PdfText, Step::CloudOcr]);
        assert_eq!(steps(&Facts { pdf_text: false, ..f }), vec![Step::CloudOcr]);

        let (_, plan) = decide(&Facts {
            pdf_text: false,
            cloud: CloudAvailability::Disabled,
            ..f
        });
        assert!(plan.steps.is_empty());
        assert_eq!(plan.exhausted, Blocker::PdfTextUnavailable);
    }

    #[test]
    fn test_auto_image() {
        let f = facts(ExtractionMode::Auto, MediaKind::Image);
        assert_eq!(steps(&f), vec![Step::CloudOcr, Step::LocalOcr]);

        let quota_spent = Facts {
            cloud: CloudAvailability::QuotaExhausted { used: 100, limit: 100 },
            ..f
        };
        assert_eq!(steps(&quota_spent), vec![Step::LocalOcr]);

        let (_, plan) = decide(&Facts { local: false, ..quota_spent });
        assert!(plan.steps.is_empty());
        assert_eq!(
            plan.exhausted.to_string(),
            "OCR unavailable: monthly cloud OCR quota reached (100/100)"
        );
    }

    #[test]
    fn test_last_rule_always_applies() {
        assert!((DECISION_TABLE[DECISION_TABLE.len() - 1].applies)(&facts(
            ExtractionMode::Auto,
            MediaKind::Image
        )));
    }

    #[test]
    fn test_blocker_for_failures() {
        let plan = decide(&facts(ExtractionMode::Auto, MediaKind::Pdf)).1;
        assert_eq!(
            plan.blocker_for(Step::PdfText, &StrategyError::EmptyResult),
            Blocker::PdfTextUnavailable
        );
        assert_eq!(
            plan.blocker_for(Step::CloudOcr, &StrategyError::Configuration("no key".into())),
            Blocker::NotConfigured
        );
        assert_eq!(
            plan.blocker_for(Step::LocalOcr, &StrategyError::EmptyResult),
            Blocker::LocalEngineFailed("no text extracted".into())
        );
    }
}
