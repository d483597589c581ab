//! Study-design inference from an episode title.

use crate::classify::Dictionary;
use crate::tables;
use epicast_core::{Error, Result, UNDETERMINED};
use regex::{Regex, RegexBuilder};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesignInference {
    pub label: String,
    /// Set when the outbreak-bulletin override fired; callers add the epidemiology topic.
    pub outbreak_bulletin: bool,
}

#[derive(Debug, Clone)]
pub struct DesignRules {
    outbreak: Regex,
    rules: Dictionary,
}

impl DesignRules {
    pub fn builtin() -> Result<Self> {
        let outbreak = RegexBuilder::new(tables::OUTBREAK_BULLETIN)
            .case_insensitive(true)
            .build()
            .map_err(|e| Error::Config(format!("bad outbreak pattern: {e}")))?;
        Ok(Self {
            outbreak,
            rules: Dictionary::compile(tables::STUDY_DESIGNS)?,
        })
    }

    /// First matching rule wins; the outbreak-bulletin phrasing is checked before any rule.
    pub fn infer(&self, title: &str) -> DesignInference {
        if self.outbreak.is_match(title) {
            return DesignInference {
                label: tables::SURVEILLANCE_DESIGN.to_string(),
                outbreak_bulletin: true,
            };
        }
        let label = self
            .rules
            .first_match(title)
            .unwrap_or(UNDETERMINED)
            .to_string();
        DesignInference {
            label,
            outbreak_bulletin: false,
        }
    }
}
