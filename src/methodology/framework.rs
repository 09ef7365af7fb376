//! Framework rubrics and the registry that holds them

use crate::capability::CapabilitySpec;
use crate::methodology::ValidationSeverity;
use crate::scoring::Lexicon;
use std::collections::BTreeMap;

/// One scored rubric criterion
#[derive(Debug, Clone)]
pub struct Criterion {
    /// Criterion name (e.g. `strategic_questioning`)
    pub name: String,
    /// Relative weight in the compliance score
    pub weight: f64,
    /// Whether a low score is a violation
    pub required: bool,
    /// Minimum passing score
    pub threshold: f64,
    /// Score at or above which the criterion counts as a strength
    pub strength_at: f64,
    /// Indicator phrases
    pub vocabulary: Lexicon,
    /// Hit count that maps to a full score
    pub normalizer: f64,
    /// Severity of a violation
    pub severity: ValidationSeverity,
    /// Expected behavior, reported with violations
    pub expected: String,
    /// Correction guidance, reported with violations
    pub guidance: String,
    /// Strength description
    pub strength: String,
}

impl Criterion {
    /// Create an optional criterion with default thresholds
    pub fn new(name: impl Into<String>, weight: f64) -> Self {
        let name = name.into();
        Self {
            strength: format!("Demonstrates {}", name.replace('_', " ")),
            expected: String::new(),
            guidance: String::new(),
            name,
            weight,
            required: false,
            threshold: 0.5,
            strength_at: 0.7,
            vocabulary: Lexicon::new(Vec::<String>::new()),
            normalizer: 1.0,
            severity: ValidationSeverity::Moderate,
        }
    }

    /// Mark as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set the pass threshold
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the strength threshold
    pub fn strength_at(mut self, score: f64) -> Self {
        self.strength_at = score;
        self
    }

    /// Set the indicator vocabulary and its normalizer
    pub fn vocabulary<I, S>(mut self, terms: I, normalizer: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.vocabulary = Lexicon::new(terms);
        self.normalizer = normalizer;
        self
    }

    /// Set the violation severity
    pub fn severity(mut self, severity: ValidationSeverity) -> Self {
        self.severity = severity;
        self
    }

    /// Set expected behavior and correction guidance
    pub fn guidance(mut self, expected: impl Into<String>, guidance: impl Into<String>) -> Self {
        self.expected = expected.into();
        self.guidance = guidance.into();
        self
    }

    /// Set the strength description
    pub fn strength(mut self, description: impl Into<String>) -> Self {
        self.strength = description.into();
        self
    }
}

/// A named expert framework and its rubric
#[derive(Debug, Clone)]
pub struct FrameworkRubric {
    /// Registry key (e.g. `chris_do`)
    pub id: String,
    /// Display name, matched against declared framework names
    pub name: String,
    /// Focus area
    pub focus: String,
    /// Key principles
    pub key_principles: Vec<String>,
    /// Scored criteria
    pub criteria: Vec<Criterion>,
}

impl FrameworkRubric {
    /// Create an empty rubric
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            focus: String::new(),
            key_principles: Vec::new(),
            criteria: Vec::new(),
        }
    }

    /// Set the focus area
    pub fn with_focus(mut self, focus: impl Into<String>) -> Self {
        self.focus = focus.into();
        self
    }

    /// Add key principles
    pub fn with_principles<I, S>(mut self, principles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key_principles.extend(principles.into_iter().map(Into::into));
        self
    }

    /// Add a criterion
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criteria.push(criterion);
        self
    }

    /// Sum of criterion weights
    pub fn total_weight(&self) -> f64 {
        self.criteria.iter().map(|c| c.weight).sum()
    }
}

/// Known framework rubrics
#[derive(Debug, Clone, Default)]
pub struct FrameworkRegistry {
    rubrics: BTreeMap<String, FrameworkRubric>,
}

impl FrameworkRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in rubrics
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for rubric in [chris_do(), don_norman(), becca_luna(), paula_scher()] {
            registry.register(rubric);
        }
        registry
    }

    /// Register or replace a rubric
    pub fn register(&mut self, rubric: FrameworkRubric) {
        tracing::debug!(framework = %rubric.id, criteria = rubric.criteria.len(), "Framework rubric registered");
        self.rubrics.insert(rubric.id.clone(), rubric);
    }

    /// Look up a rubric by id
    pub fn get(&self, id: &str) -> Option<&FrameworkRubric> {
        self.rubrics.get(id)
    }

    /// Rubric for a responder: its declared rubric key, else the rubric whose
    /// display name prefixes the declared framework name
    pub fn resolve(&self, spec: &CapabilitySpec) -> Option<&FrameworkRubric> {
        if let Some(rubric) = spec.framework_id.as_deref().and_then(|id| self.get(id)) {
            return Some(rubric);
        }
        let declared = spec.framework.as_deref()?.to_lowercase();
        self.rubrics
            .values()
            .find(|r| declared.starts_with(&r.name.to_lowercase()))
    }

    /// Registered ids
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.rubrics.keys().map(String::as_str)
    }

    /// Number of rubrics
    pub fn len(&self) -> usize {
        self.rubrics.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.rubrics.is_empty()
    }
}

fn chris_do() -> FrameworkRubric {
    FrameworkRubric::new("chris_do", "Chris Do")
        .with_focus("Value-based selling and strategic positioning")
        .with_principles([
            "Value-based positioning over feature-based selling",
            "Strategic questioning to uncover business outcomes",
            "Outcome-focused proposals with ROI demonstration",
            "Premium pricing justified by strategic value",
        ])
        .with_criterion(
            Criterion::new("strategic_questioning", 0.3)
                .required()
                .threshold(0.7)
                .strength_at(0.7)
                .vocabulary(
                    [
                        "what business outcomes",
                        "strategic goals",
                        "return on investment",
                        "business impact",
                        "stakeholder objectives",
                        "success metrics",
                    ],
                    3.0,
                )
                .guidance(
                    "Strategic questions focusing on business outcomes and ROI",
                    "Integrate more strategic business-focused questioning",
                )
                .strength("Strong strategic questioning approach evident"),
        )
        .with_criterion(
            Criterion::new("value_positioning", 0.25)
                .required()
                .threshold(0.6)
                .strength_at(0.8)
                .vocabulary(
                    [
                        "strategic value",
                        "business value",
                        "competitive advantage",
                        "differentiation",
                        "premium positioning",
                        "value proposition",
                    ],
                    2.0,
                )
                .guidance(
                    "Positioning anchored in strategic business value",
                    "Strengthen value proposition and strategic positioning",
                )
                .strength("Strong value positioning evident"),
        )
        .with_criterion(
            Criterion::new("outcome_focus", 0.25)
                .required()
                .threshold(0.5)
                .strength_at(0.7)
                .vocabulary(
                    [
                        "measurable outcomes",
                        "business results",
                        "roi",
                        "success metrics",
                        "performance indicators",
                        "deliverable outcomes",
                    ],
                    2.0,
                )
                .guidance(
                    "Recommendations tied to measurable business results",
                    "Tie recommendations to measurable outcomes",
                )
                .strength("Strong outcome focus demonstrated"),
        )
        .with_criterion(
            Criterion::new("premium_justification", 0.2)
                .vocabulary(
                    ["premium", "investment", "value-based pricing", "justif", "price anchoring"],
                    2.0,
                )
                .strength("Premium pricing justified by value"),
        )
}

fn don_norman() -> FrameworkRubric {
    FrameworkRubric::new("don_norman", "Don Norman")
        .with_focus("Human-centered design and usability")
        .with_principles([
            "Human-centered design approach",
            "Usability testing and user feedback integration",
            "Cognitive psychology principles in interface design",
            "Accessibility and inclusive design practices",
        ])
        .with_criterion(
            Criterion::new("user_centered_approach", 0.35)
                .required()
                .threshold(0.6)
                .strength_at(0.8)
                .vocabulary(
                    [
                        "user needs",
                        "user experience",
                        "usability",
                        "user research",
                        "user testing",
                        "human factors",
                        "user behavior",
                    ],
                    3.0,
                )
                .severity(ValidationSeverity::High)
                .guidance(
                    "Design decisions grounded in user needs and research",
                    "Start from user research and observed behavior",
                )
                .strength("Strong user-centered approach"),
        )
        .with_criterion(
            Criterion::new("usability_testing", 0.25)
                .vocabulary(
                    ["usability testing", "user feedback", "prototype", "iteration", "test with users"],
                    2.0,
                )
                .strength("Usability testing built into the process"),
        )
        .with_criterion(
            Criterion::new("cognitive_psychology", 0.25)
                .required()
                .threshold(0.5)
                .vocabulary(
                    [
                        "cognitive load",
                        "mental models",
                        "user perception",
                        "psychology",
                        "cognitive principles",
                        "human behavior",
                    ],
                    2.0,
                )
                .guidance(
                    "Interface reasoning based on cognitive principles",
                    "Account for cognitive load and mental models",
                )
                .strength("Cognitive psychology principles applied"),
        )
        .with_criterion(
            Criterion::new("accessibility", 0.15)
                .vocabulary(["accessibility", "inclusive", "wcag", "assistive"], 2.0)
                .strength("Accessibility considered"),
        )
}

fn becca_luna() -> FrameworkRubric {
    FrameworkRubric::new("becca_luna", "Becca Luna")
        .with_focus("Menu-based pricing and service packaging")
        .with_principles([
            "Menu-based pricing model structure",
            "Service packaging psychology principles",
            "Clear pricing tier differentiation",
            "Value perception optimization",
        ])
        .with_criterion(
            Criterion::new("menu_based_structure", 0.4)
                .required()
                .threshold(0.6)
                .vocabulary(["menu", "packages", "options", "a la carte", "add-on"], 2.0)
                .severity(ValidationSeverity::High)
                .guidance(
                    "Services presented as a menu of packaged options",
                    "Restructure the offer as a menu of packages",
                )
                .strength("Clear menu-based structure"),
        )
        .with_criterion(
            Criterion::new("packaging_psychology", 0.3)
                .required()
                .threshold(0.5)
                .vocabulary(["packaging", "anchor", "bundle", "decoy", "psychology"], 2.0)
                .guidance(
                    "Packages designed around buyer psychology",
                    "Use anchoring and bundling when packaging services",
                )
                .strength("Packaging psychology applied"),
        )
        .with_criterion(
            Criterion::new("tier_differentiation", 0.2)
                .required()
                .threshold(0.5)
                .vocabulary(["tier", "good better best", "differentiat", "entry level", "premium"], 2.0)
                .guidance(
                    "Clearly differentiated pricing tiers",
                    "Differentiate tiers by outcome, not only by volume",
                )
                .strength("Well differentiated pricing tiers"),
        )
        .with_criterion(
            Criterion::new("value_perception", 0.1)
                .vocabulary(["perceived value", "value perception", "value"], 1.0)
                .strength("Value perception addressed"),
        )
}

fn paula_scher() -> FrameworkRubric {
    FrameworkRubric::new("paula_scher", "Paula Scher")
        .with_focus("Systematic visual identity")
        .with_principles([
            "Systematic visual identity development",
            "Pentagram methodology application",
            "Brand expression through typography and color",
            "Cultural context integration in design",
        ])
        .with_criterion(
            Criterion::new("systematic_identity", 0.3)
                .required()
                .threshold(0.6)
                .vocabulary(
                    ["identity system", "visual identity", "systematic", "brand system", "consistency"],
                    2.0,
                )
                .guidance(
                    "Identity developed as a coherent system",
                    "Define the identity as a system of reusable elements",
                )
                .strength("Systematic identity thinking"),
        )
        .with_criterion(
            Criterion::new("pentagram_methodology", 0.25)
                .vocabulary(["pentagram", "bold", "expressive"], 1.0)
                .strength("Pentagram methodology applied"),
        )
        .with_criterion(
            Criterion::new("typography_focus", 0.25)
                .required()
                .threshold(0.5)
                .vocabulary(["typography", "typeface", "lettering", "font", "type"], 2.0)
                .guidance(
                    "Brand expressed through typography and color",
                    "Lead the identity with a typographic voice",
                )
                .strength("Typography drives the identity"),
        )
        .with_criterion(
            Criterion::new("cultural_context", 0.2)
                .vocabulary(["cultural", "culture", "community", "heritage"], 2.0)
                .strength("Cultural context integrated"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_weights_sum_to_one() {
        let registry = FrameworkRegistry::with_builtins();
        assert_eq!(registry.len(), 4);
        for id in ["chris_do", "don_norman", "becca_luna", "paula_scher"] {
            let rubric = registry.get(id).unwrap();
            assert!((rubric.total_weight() - 1.0).abs() < 1e-9, "{id}");
            assert_eq!(rubric.key_principles.len(), 4);
        }
    }

    #[test]
    fn test_resolve_by_id_then_name() {
        let registry = FrameworkRegistry::with_builtins();

        let by_id = CapabilitySpec::new("a").with_framework("Anything", Some("becca_luna"));
        assert_eq!(registry.resolve(&by_id).map(|r| r.id.as_str()), Some("becca_luna"));

        let by_name = CapabilitySpec::new("b").with_framework("Don Norman human-centered design", None);
        assert_eq!(registry.resolve(&by_name).map(|r| r.id.as_str()), Some("don_norman"));

        let unknown = CapabilitySpec::new("c").with_framework("Bespoke method", Some("bespoke"));
        assert!(registry.resolve(&unknown).is_none());
        assert!(registry.resolve(&CapabilitySpec::new("d")).is_none());
    }

    #[test]
    fn test_register_custom_rubric() {
        let mut registry = FrameworkRegistry::new();
        registry.register(
            FrameworkRubric::new("lean", "Lean")
                .with_criterion(Criterion::new("experiments", 1.0).required().vocabulary(["experiment"], 1.0)),
        );
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec!["lean"]);
        assert!(registry.get("lean").unwrap().criteria[0].required);
    }
}
