//! Ordered pattern dictionaries and the title classifier built on them.

use crate::design::DesignRules;
use crate::tables::{self, PatternSpec};
use crate::textprep;
use epicast_core::{Error, Result, UNCLASSIFIED};
use regex::{Regex, RegexBuilder};
use serde::Serialize;

fn compile(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| Error::Config(format!("bad pattern {pattern:?}: {e}")))
}

#[derive(Debug, Clone)]
struct Rule {
    label: String,
    pattern: Regex,
    not_followed_by: Option<Regex>,
}

impl Rule {
    fn is_match(&self, text: &str) -> bool {
        let Some(guard) = &self.not_followed_by else {
            return self.pattern.is_match(text);
        };
        self.pattern
            .find_iter(text)
            .any(|m| !guard.is_match(&text[m.end()..]))
    }
}

/// An ordered (label, pattern) sequence. Iteration order is part of the contract.
#[derive(Debug, Clone)]
pub struct Dictionary {
    rules: Vec<Rule>,
}

impl Dictionary {
    pub fn compile(specs: &[PatternSpec]) -> Result<Self> {
        let mut rules = Vec::with_capacity(specs.len());
        for spec in specs {
            let not_followed_by = spec
                .not_followed_by
                .map(|g| compile(&format!("^(?:{})", regex::escape(g))))
                .transpose()?;
            rules.push(Rule {
                label: spec.label.to_string(),
                pattern: compile(spec.pattern)?,
                not_followed_by,
            });
        }
        Ok(Self { rules })
    }

    #[cfg(test)]
    fn labels(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.label.as_str())
    }

    /// Label of the first rule (in declared order) that matches.
    pub fn first_match(&self, text: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|r| r.is_match(text))
            .map(|r| r.label.as_str())
    }

    /// Every matching label, deduplicated, in declared order.
    pub fn all_matches(&self, text: &str) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for r in &self.rules {
            if !out.contains(&r.label) && r.is_match(text) {
                out.push(r.label.clone());
            }
        }
        out
    }

    fn rank(&self, label: &str) -> usize {
        self.rules
            .iter()
            .position(|r| r.label == label)
            .unwrap_or(usize::MAX)
    }

    /// Add `label` if missing, keeping the set deduplicated and in declared order.
    /// Labels unknown to the dictionary sort last.
    pub fn insert_label(&self, labels: &mut Vec<String>, label: &str) {
        if !labels.iter().any(|l| l == label) {
            labels.push(label.to_string());
        }
        labels.sort_by_key(|l| self.rank(l));
    }
}

/// Everything derived from a title without network access.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub journal: String,
    pub infection_type: String,
    pub pathogens: Vec<String>,
    pub topics: Vec<String>,
    pub tags: Vec<String>,
    pub study_design: String,
}

/// Immutable classification tables, built once per process and shared read-only.
#[derive(Debug, Clone)]
pub struct Classifier {
    journals: Dictionary,
    journal_overrides: Vec<(String, String)>,
    pathogens: Dictionary,
    topics: Dictionary,
    tags: Dictionary,
    designs: DesignRules,
}

impl Classifier {
    pub fn builtin() -> Result<Self> {
        Ok(Self {
            journals: Dictionary::compile(tables::JOURNALS)?,
            journal_overrides: tables::JOURNAL_OVERRIDES
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            pathogens: Dictionary::compile(tables::PATHOGENS)?,
            topics: Dictionary::compile(tables::TOPICS)?,
            tags: Dictionary::compile(tables::FREE_TAGS)?,
            designs: DesignRules::builtin()?,
        })
    }

    /// Journal abbreviation from the dictionary alone (no literal overrides).
    ///
    /// Falls back to the text after the last full-width separator when the whole title does not
    /// match. Only anchored patterns can differ between the two; the built-in table is unanchored,
    /// so it never needs the fallback. Empty when nothing matches.
    pub fn guess_journal(&self, text: &str) -> String {
        if let Some(j) = self.journals.first_match(text) {
            return j.to_string();
        }
        let tail = text
            .rfind(tables::JOURNAL_SEPARATORS)
            .and_then(|i| text[i..].chars().next().map(|c| &text[i + c.len_utf8()..]));
        tail.and_then(|t| self.journals.first_match(t))
            .map(str::to_string)
            .unwrap_or_default()
    }

    fn journal_override(&self, raw_title: &str) -> Option<&str> {
        self.journal_overrides
            .iter()
            .find(|(kw, _)| raw_title.contains(kw.as_str()))
            .map(|(_, label)| label.as_str())
    }

    pub fn pathogens(&self, title: &str) -> Vec<String> {
        self.pathogens.all_matches(title)
    }

    pub fn topics(&self, title: &str) -> Vec<String> {
        self.topics.all_matches(title)
    }

    pub fn tags(&self, title: &str) -> Vec<String> {
        self.tags.all_matches(title)
    }

    /// Classify one feed title. `raw_title` is the title as found in the feed.
    pub fn classify(&self, raw_title: &str) -> Classification {
        let title = textprep::normalize(raw_title);

        let mut journal = self.guess_journal(&title);
        if let Some(forced) = self.journal_override(raw_title) {
            journal = forced.to_string();
        }

        let pathogens = self.pathogens(&title);
        let mut topics = self.topics(&title);
        let tags = self.tags(&title);

        let design = self.designs.infer(&title);
        if design.outbreak_bulletin {
            self.topics
                .insert_label(&mut topics, tables::EPIDEMIOLOGY_TOPIC);
        }

        let infection_type = pathogens
            .first()
            .cloned()
            .unwrap_or_else(|| UNCLASSIFIED.to_string());

        Classification {
            journal,
            infection_type,
            pathogens,
            topics,
            tags,
            study_design: design.label,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use epicast_core::UNDETERMINED;

    fn classifier() -> Classifier {
        Classifier::builtin().expect("builtin tables compile")
    }

    #[test]
    fn covid_vaccine_cohort_scenario() {
        let c = classifier().classify("COVID-19ワクチンの有効性：前向きコホート研究 NEJM");
        assert_eq!(c.pathogens, vec!["COVID-19"]);
        assert_eq!(c.topics, vec!["ワクチン"]);
        assert_eq!(c.study_design, "前向きコホート");
        assert_eq!(c.journal, "NEJM");
        assert_eq!(c.infection_type, "COVID-19");
        assert!(c.tags.is_empty());
    }

    #[test]
    fn outbreak_bulletin_forces_surveillance_and_injects_epidemiology() {
        let c = classifier().classify("今週のデング熱流行情報とワクチン");
        assert_eq!(c.study_design, "サーベイランス");
        // Declared order: ワクチン before 疫学.
        assert_eq!(c.topics, vec!["ワクチン", "疫学"]);
    }

    #[test]
    fn outbreak_bulletin_beats_earlier_design_rules() {
        // "review" alone would give レビュー.
        let c = classifier().classify("流行情報 review");
        assert_eq!(c.study_design, "サーベイランス");
        assert!(c.topics.iter().any(|t| t == "疫学"));
    }

    #[test]
    fn epidemiology_is_not_duplicated_when_already_matched() {
        let c = classifier().classify("麻疹の流行情報と疫学 trend");
        assert_eq!(c.topics.iter().filter(|t| *t == "疫学").count(), 1);
    }

    #[test]
    fn multi_label_output_follows_declared_order_not_title_order() {
        // Title mentions MRSA before COVID; dictionary declares COVID-19 first.
        let c = classifier().classify("MRSA and COVID co-infection in the ICU");
        assert_eq!(c.pathogens, vec!["COVID-19", "MRSA"]);
        assert_eq!(c.infection_type, "COVID-19");
        assert_eq!(c.tags, vec!["耐性菌", "重症"]);
    }

    #[test]
    fn results_do_not_depend_on_call_order() {
        let cls = classifier();
        let a = cls.classify("Dengue and Zika vaccine trial");
        let _ = cls.classify("unrelated title");
        let b = cls.classify("Dengue and Zika vaccine trial");
        assert_eq!(a, b);
        assert_eq!(a.pathogens, vec!["デング", "ジカ"]);
        assert_eq!(a.topics, vec!["ワクチン"]);
        assert_eq!(a.study_design, "RCT");
    }

    #[test]
    fn unmatched_title_gets_sentinels() {
        let c = classifier().classify("番組のお知らせ");
        assert_eq!(c.infection_type, UNCLASSIFIED);
        assert_eq!(c.study_design, UNDETERMINED);
        assert_eq!(c.journal, "");
        assert!(c.pathogens.is_empty() && c.topics.is_empty() && c.tags.is_empty());
    }

    #[test]
    fn journal_guards_respect_following_text() {
        let cls = classifier();
        assert_eq!(cls.guess_journal("Lancet ID 2024"), "Lancet ID");
        assert_eq!(cls.guess_journal("from The Lancet"), "Lancet");
        assert_eq!(
            cls.guess_journal("Journal of Infection and Chemotherapy"),
            "J Infect Chemother"
        );
        assert_eq!(
            cls.guess_journal("Journal of Infection 2023"),
            "Journal of Infection"
        );
        assert_eq!(cls.guess_journal("JAMA Network Open"), "JAMA Netw Open");
    }

    #[test]
    fn journal_lookup_covers_text_after_separator() {
        let cls = classifier();
        assert_eq!(cls.guess_journal("抗菌薬の話｜Eurosurveillance"), "Eurosurveillance");
        assert_eq!(cls.guess_journal("タイトル：本文"), "");
    }

    #[test]
    fn anchored_journal_pattern_matches_only_the_tail() {
        let cls = Classifier {
            journals: Dictionary::compile(&[PatternSpec::new(
                "Eurosurveillance",
                r"^Eurosurveillance",
            )])
            .unwrap(),
            ..classifier()
        };
        assert_eq!(cls.journals.first_match("抗菌薬の話｜Eurosurveillance"), None);
        assert_eq!(cls.guess_journal("抗菌薬の話｜Eurosurveillance"), "Eurosurveillance");
        assert_eq!(cls.guess_journal("抗菌薬の話／Eurosurveillance 2024"), "Eurosurveillance");
        assert_eq!(cls.guess_journal("Eurosurveillance：抗菌薬の話"), "Eurosurveillance");
        assert_eq!(cls.guess_journal("抗菌薬の話 Eurosurveillance"), "");
    }

    #[test]
    fn literal_override_supersedes_dictionary_journal() {
        let c = classifier().classify("IDWR 第12週 インフルエンザ NEJM");
        assert_eq!(c.journal, "IDWR");
        let c = classifier().classify("WHO Disease Outbreak News: Mpox");
        assert_eq!(c.journal, "WHO DON");
        assert_eq!(c.study_design, "サーベイランス");
    }

    #[test]
    fn insert_label_keeps_declared_order_and_dedupes() {
        let topics = Dictionary::compile(tables::TOPICS).unwrap();
        let mut v = vec!["診断".to_string(), "ワクチン".to_string()];
        topics.insert_label(&mut v, "疫学");
        topics.insert_label(&mut v, "疫学");
        assert_eq!(v, vec!["ワクチン", "疫学", "診断"]);
    }

    #[test]
    fn every_builtin_table_compiles_and_labels_are_unique() {
        for specs in [
            tables::JOURNALS,
            tables::PATHOGENS,
            tables::TOPICS,
            tables::FREE_TAGS,
            tables::STUDY_DESIGNS,
        ] {
            let d = Dictionary::compile(specs).unwrap();
            let labels: Vec<&str> = d.labels().collect();
            let mut uniq = labels.clone();
            uniq.sort();
            uniq.dedup();
            assert_eq!(uniq.len(), labels.len());
        }
    }
}
