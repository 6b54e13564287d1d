//! Primitive family catalog and label parsing.
//!
//! Labels are parsed once into a [`PrimitiveLabel`] (family tag plus optional
//! arity) so comparisons never re-inspect strings. Parametrized families accept
//! any suffix after the family name (`Polygon (5)`, `Complex (Line, Arc)`);
//! a numeric `(n)` suffix is kept as the arity.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::config::FamilySpec;

/// Index of a family inside its catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FamilyId(usize);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Family {
    pub name: String,
    pub parametrized: bool,
    accepts: Vec<FamilyId>,
}

/// A label that names a recognized family.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrimitiveLabel {
    pub family: FamilyId,
    pub arity: Option<u32>,
    pub raw: String,
}

/// Result of checking a ground-truth label against the catalog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LabelCheck {
    /// Missing or blank label.
    Unlabeled,
    /// Present but names no recognized family.
    Unknown(String),
    Valid(PrimitiveLabel),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("family names must not be empty")]
    EmptyName,
    #[error("family {0} is listed more than once")]
    DuplicateFamily(String),
    #[error("family {family} accepts unknown family {accepted}")]
    UnknownAccepted { family: String, accepted: String },
}

/// The configured set of recognizable primitive families.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FamilyCatalog {
    families: Vec<Family>,
    by_name: HashMap<String, FamilyId>,
    /// Parametrized families, longest name first, for prefix matching.
    prefix_order: Vec<FamilyId>,
}

fn arity_regex() -> &'static Regex {
    static ARITY: OnceLock<Regex> = OnceLock::new();
    ARITY.get_or_init(|| Regex::new(r"^\(\s*(\d+)\s*\)$").expect("arity regex must compile"))
}

impl FamilyCatalog {
    pub fn from_specs(specs: &[FamilySpec]) -> Result<Self, CatalogError> {
        let mut by_name = HashMap::with_capacity(specs.len());
        for (idx, spec) in specs.iter().enumerate() {
            let name = spec.name.trim();
            if name.is_empty() {
                return Err(CatalogError::EmptyName);
            }
            if by_name.insert(name.to_string(), FamilyId(idx)).is_some() {
                return Err(CatalogError::DuplicateFamily(name.to_string()));
            }
        }
        let mut families = Vec::with_capacity(specs.len());
        for spec in specs {
            let mut accepts = Vec::with_capacity(spec.accepts.len());
            for accepted in &spec.accepts {
                let id = by_name.get(accepted.trim()).copied().ok_or_else(|| {
                    CatalogError::UnknownAccepted {
                        family: spec.name.trim().to_string(),
                        accepted: accepted.clone(),
                    }
                })?;
                accepts.push(id);
            }
            families.push(Family {
                name: spec.name.trim().to_string(),
                parametrized: spec.parametrized,
                accepts,
            });
        }
        let mut prefix_order: Vec<FamilyId> = (0..families.len())
            .map(FamilyId)
            .filter(|id| families[id.0].parametrized)
            .collect();
        prefix_order.sort_by(|a, b| families[b.0].name.len().cmp(&families[a.0].name.len()));
        Ok(Self {
            families,
            by_name,
            prefix_order,
        })
    }

    pub fn family(&self, id: FamilyId) -> &Family {
        &self.families[id.0]
    }

    pub fn family_name(&self, id: FamilyId) -> &str {
        &self.families[id.0].name
    }

    pub fn family_named(&self, name: &str) -> Option<FamilyId> {
        self.by_name.get(name).copied()
    }

    /// Family names in configuration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.families.iter().map(|family| family.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    /// Classify an optional ground-truth label.
    pub fn check(&self, label: Option<&str>) -> LabelCheck {
        let Some(raw) = label.map(str::trim).filter(|raw| !raw.is_empty()) else {
            return LabelCheck::Unlabeled;
        };
        match self.parse(raw) {
            Some(parsed) => LabelCheck::Valid(parsed),
            None => LabelCheck::Unknown(raw.to_string()),
        }
    }

    /// Parse a label into its family, or `None` when no family matches.
    pub fn parse(&self, raw: &str) -> Option<PrimitiveLabel> {
        let raw = raw.trim();
        if let Some(&family) = self.by_name.get(raw) {
            return Some(PrimitiveLabel {
                family,
                arity: None,
                raw: raw.to_string(),
            });
        }
        for &family in &self.prefix_order {
            let name = &self.families[family.0].name;
            let Some(rest) = raw
                .strip_prefix(name.as_str())
                .and_then(|rest| rest.strip_prefix(' '))
            else {
                continue;
            };
            let arity = arity_regex()
                .captures(rest.trim())
                .and_then(|caps| caps.get(1))
                .and_then(|digits| digits.as_str().parse::<u32>().ok());
            return Some(PrimitiveLabel {
                family,
                arity,
                raw: raw.to_string(),
            });
        }
        None
    }

    /// Whether a predicted label string counts as naming `actual` correctly.
    ///
    /// Same family always matches (parametrized families ignore arity). A family
    /// that accepts another matches that family's predictions of equal arity.
    pub fn matches(&self, predicted: &str, actual: &PrimitiveLabel) -> bool {
        let Some(predicted) = self.parse(predicted) else {
            return false;
        };
        if predicted.family == actual.family {
            return true;
        }
        self.families[actual.family.0]
            .accepts
            .contains(&predicted.family)
            && predicted.arity == actual.arity
    }
}

impl Default for FamilyCatalog {
    fn default() -> Self {
        Self::from_specs(&crate::config::EvalConfig::default().families)
            .expect("built-in families form a valid catalog")
    }
}
