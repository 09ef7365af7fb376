//! Redundancy detection between responders

use crate::capability::CapabilitySnapshot;
use crate::request::ConsultationRequest;
use crate::types::ResponderId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Kind of detected overlap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapKind {
    /// Shared trigger phrase matching the request classification
    ExpertiseArea,
    /// Same framework family
    MethodologyFamily,
    /// Intersecting declared scope
    ScopeBoundary,
}

/// Suggested way of handling an overlap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapResolution {
    /// Consult in sequence and synthesize
    SequentialWithSynthesis,
    /// Use the overlap as a cross-check
    ConsensusValidation,
    /// Assign the area to one responder
    ClearDelegation,
}

/// A detected redundancy between two or more responders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentOverlap {
    /// Distinct responders involved, at least two
    pub responders: Vec<ResponderId>,
    /// Overlap kind
    pub kind: OverlapKind,
    /// Matched area labels
    pub areas: Vec<String>,
    /// Detection confidence
    pub confidence: f64,
    /// Suggested resolution
    pub resolution: OverlapResolution,
    /// Impact notes
    pub impact: BTreeMap<String, String>,
}

impl AgentOverlap {
    /// Build an overlap; `None` unless at least two distinct responders remain
    pub fn new(
        responders: impl IntoIterator<Item = ResponderId>,
        kind: OverlapKind,
        areas: Vec<String>,
    ) -> Option<Self> {
        let mut seen = BTreeSet::new();
        let responders: Vec<ResponderId> = responders
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .collect();
        if responders.len() < 2 {
            return None;
        }

        let (confidence, resolution, impact) = match kind {
            OverlapKind::ExpertiseArea => (
                0.8,
                OverlapResolution::SequentialWithSynthesis,
                [
                    ("coordination_complexity", "moderate"),
                    ("value_redundancy_risk", "low"),
                    ("synthesis_opportunity", "high"),
                ],
            ),
            OverlapKind::MethodologyFamily => (
                0.9,
                OverlapResolution::ConsensusValidation,
                [
                    ("methodology_consistency", "high"),
                    ("expert_authority", "preserved"),
                    ("user_clarity", "enhanced"),
                ],
            ),
            OverlapKind::ScopeBoundary => (
                0.7,
                OverlapResolution::ClearDelegation,
                [
                    ("boundary_clarity", "needs_definition"),
                    ("user_confusion_risk", "moderate"),
                    ("coordination_benefit", "high"),
                ],
            ),
        };

        Some(Self {
            responders,
            kind,
            areas,
            confidence,
            resolution,
            impact: impact
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        })
    }

    /// Whether a responder is part of this overlap
    pub fn involves(&self, id: &ResponderId) -> bool {
        self.responders.contains(id)
    }
}

/// Finds responders whose expertise, framework family or scope collide
#[derive(Debug, Clone)]
pub struct OverlapDetector {
    snapshot: Arc<CapabilitySnapshot>,
    expertise: BTreeMap<String, Vec<ResponderId>>,
    families: BTreeMap<String, Vec<ResponderId>>,
}

impl OverlapDetector {
    /// Index a capability snapshot
    pub fn new(snapshot: Arc<CapabilitySnapshot>) -> Self {
        let mut expertise: BTreeMap<String, Vec<ResponderId>> = BTreeMap::new();
        let mut families: BTreeMap<String, Vec<ResponderId>> = BTreeMap::new();

        for spec in snapshot.iter() {
            for trigger in &spec.triggers {
                let area = normalize_label(trigger);
                if !area.is_empty() {
                    expertise.entry(area).or_default().push(spec.id.clone());
                }
            }
            if let Some(family) = spec.framework_family() {
                families.entry(family.to_string()).or_default().push(spec.id.clone());
            }
        }

        Self {
            snapshot,
            expertise,
            families,
        }
    }

    /// All overlaps relevant to a request
    pub fn detect(&self, request: &ConsultationRequest) -> Vec<AgentOverlap> {
        let mut overlaps = self.expertise_overlaps(request.classification_label());
        overlaps.extend(self.methodology_overlaps());
        overlaps.extend(self.scope_overlaps());
        overlaps
    }

    /// Shared trigger phrases that appear in the classification label
    pub fn expertise_overlaps(&self, label: Option<&str>) -> Vec<AgentOverlap> {
        let Some(label) = label.map(normalize_label).filter(|l| !l.is_empty()) else {
            return Vec::new();
        };

        self.expertise
            .iter()
            .filter(|(area, _)| label.contains(area.as_str()))
            .filter_map(|(area, responders)| {
                AgentOverlap::new(responders.iter().cloned(), OverlapKind::ExpertiseArea, vec![area.clone()])
            })
            .collect()
    }

    /// Responders sharing a framework family
    pub fn methodology_overlaps(&self) -> Vec<AgentOverlap> {
        self.families
            .iter()
            .filter_map(|(family, responders)| {
                AgentOverlap::new(
                    responders.iter().cloned(),
                    OverlapKind::MethodologyFamily,
                    vec![format!("{}_methodology", family)],
                )
            })
            .collect()
    }

    /// Pairs of responders with intersecting "covers" lists
    pub fn scope_overlaps(&self) -> Vec<AgentOverlap> {
        let scopes: Vec<(&ResponderId, BTreeSet<String>)> = self
            .snapshot
            .iter()
            .map(|spec| {
                let covers = spec
                    .scope
                    .covers
                    .iter()
                    .map(|c| c.trim().to_lowercase())
                    .filter(|c| !c.is_empty())
                    .collect::<BTreeSet<_>>();
                (&spec.id, covers)
            })
            .filter(|(_, covers)| !covers.is_empty())
            .collect();

        let mut overlaps = Vec::new();
        for (i, (first, first_covers)) in scopes.iter().enumerate() {
            for (second, second_covers) in &scopes[i + 1..] {
                let shared: Vec<String> = first_covers.intersection(second_covers).cloned().collect();
                if shared.is_empty() {
                    continue;
                }
                if let Some(overlap) = AgentOverlap::new(
                    [(*first).clone(), (*second).clone()],
                    OverlapKind::ScopeBoundary,
                    shared,
                ) {
                    overlaps.push(overlap);
                }
            }
        }
        overlaps
    }
}

/// Lowercase with `_`/`-` read as spaces and runs of whitespace collapsed
fn normalize_label(text: &str) -> String {
    text.to_lowercase()
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
