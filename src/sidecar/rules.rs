//! Sidecar rule table
//!
//! Rules are ordered; the first rule with a matching pattern classifies a
//! sibling. Patterns are regex templates with `{name}` and `{stem}` placeholders
//! that are filled with the escaped item name at match time.

use crate::error::ConfigError;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::path::Path;
use unicode_normalization::UnicodeNormalization;

/// First reader tried for a sidecar; the chain falls back from here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SidecarFormat {
    Json,
    Yaml,
    Text,
    Binary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidecarRule {
    #[serde(rename = "type")]
    pub sidecar_type: String,
    pub format: SidecarFormat,
    pub patterns: Vec<String>,
}

impl SidecarRule {
    pub fn new(sidecar_type: &str, format: SidecarFormat, patterns: &[&str]) -> Self {
        Self {
            sidecar_type: sidecar_type.to_string(),
            format,
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Built-in rules, in precedence order.
pub fn default_rules() -> Vec<SidecarRule> {
    use SidecarFormat::*;
    vec![
        SidecarRule::new(
            "metadata",
            Json,
            &[r"^{name}_meta\.json$", r"^{name}_directorymeta\.json$"],
        ),
        SidecarRule::new("info", Json, &[r"^{stem}\.info\.json$"]),
        SidecarRule::new("description", Text, &[r"^{stem}\.description$"]),
        SidecarRule::new(
            "subtitles",
            Text,
            &[r"^{stem}(\.[a-z]{2,3}(-[a-z0-9]+)?)?\.(srt|vtt|ass|ssa|sub)$"],
        ),
        SidecarRule::new(
            "thumbnail",
            Binary,
            &[r"^{stem}[._-](thumb|thumbnail|cover|poster)\.(jpe?g|png|webp)$"],
        ),
        SidecarRule::new("checksum", Text, &[r"^{name}\.(md5|sha1|sha256|sha512|sfv)$"]),
        SidecarRule::new("link", Text, &[r"^{stem}\.(url|webloc|desktop)$"]),
        SidecarRule::new("generic_metadata", Yaml, &[r"^{stem}\.ya?ml$"]),
        SidecarRule::new("generic_metadata", Json, &[r"^{stem}\.(json|nfo|xml)$"]),
    ]
}

pub(crate) fn normalize(name: &str) -> String {
    name.nfc().collect()
}

fn stem_of(name: &str) -> &str {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
}

fn render(template: &str, name: &str, stem: &str) -> String {
    let body = template
        .replace("{name}", &regex::escape(name))
        .replace("{stem}", &regex::escape(stem));
    format!("^(?:{})$", body)
}

fn compile(template: &str, name: &str, stem: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(&render(template, name, stem))
        .case_insensitive(true)
        .build()
}

/// Whether every match of `template` must begin with the item's stem.
///
/// True when the template opens with `{name}` or `{stem}`, the placeholder is
/// not made optional by the next token, and there is no alternation outside a
/// group that could bypass it.
fn leads_with_stem(template: &str) -> bool {
    let body = template.strip_prefix('^').unwrap_or(template);
    let rest = match body
        .strip_prefix("{name}")
        .or_else(|| body.strip_prefix("{stem}"))
    {
        Some(rest) => rest,
        None => return false,
    };
    if matches!(rest.chars().next(), Some('?' | '*' | '{' | '|')) {
        return false;
    }

    let mut depth = 0usize;
    let mut in_class = false;
    let mut chars = rest.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '[' if !in_class => in_class = true,
            ']' if in_class => in_class = false,
            '(' if !in_class => depth += 1,
            ')' if !in_class => depth = depth.saturating_sub(1),
            '|' if !in_class && depth == 0 => return false,
            _ => {}
        }
    }
    true
}

/// Validated, ordered rule table.
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: Vec<SidecarRule>,
    /// Every template starts with the item's stem.
    stem_led: bool,
}

impl RuleTable {
    pub fn new(rules: Vec<SidecarRule>) -> Result<Self, ConfigError> {
        for rule in &rules {
            if rule.sidecar_type.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "Sidecar rule with an empty type".to_string(),
                ));
            }
            if rule.patterns.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "Sidecar rule '{}' has no patterns",
                    rule.sidecar_type
                )));
            }
            for pattern in &rule.patterns {
                compile(pattern, "probe.ext", "probe").map_err(|e| {
                    ConfigError::SidecarPattern {
                        sidecar_type: rule.sidecar_type.clone(),
                        pattern: pattern.clone(),
                        message: e.to_string(),
                    }
                })?;
            }
        }
        let stem_led = rules
            .iter()
            .flat_map(|r| r.patterns.iter())
            .all(|p| leads_with_stem(p));
        Ok(Self { rules, stem_led })
    }

    pub fn rules(&self) -> &[SidecarRule] {
        &self.rules
    }

    pub fn get(&self, index: usize) -> Option<&SidecarRule> {
        self.rules.get(index)
    }

    /// Prefix every sidecar name of `item_name` must start with, compared
    /// ASCII case-insensitively.
    ///
    /// `None` when the table cannot guarantee one or the stem is not ASCII.
    pub fn required_prefix(&self, item_name: &str) -> Option<String> {
        if !self.stem_led {
            return None;
        }
        let name = normalize(item_name);
        let stem = stem_of(&name);
        stem.is_ascii().then(|| stem.to_ascii_lowercase())
    }

    /// Instantiate every template for one item.
    pub fn matcher(&self, item_name: &str) -> ItemMatcher {
        let name = normalize(item_name);
        let stem = stem_of(&name).to_string();
        let compiled = self
            .rules
            .iter()
            .map(|rule| {
                rule.patterns
                    .iter()
                    .filter_map(|p| match compile(p, &name, &stem) {
                        Ok(regex) => Some(regex),
                        Err(e) => {
                            tracing::debug!(pattern = %p, item = %item_name, error = %e, "Sidecar pattern skipped");
                            None
                        }
                    })
                    .collect()
            })
            .collect();
        ItemMatcher { compiled }
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        let rules = default_rules();
        let stem_led = rules
            .iter()
            .flat_map(|r| r.patterns.iter())
            .all(|p| leads_with_stem(p));
        Self { rules, stem_led }
    }
}

/// Rule patterns specialised to one item name.
#[derive(Debug)]
pub struct ItemMatcher {
    compiled: Vec<Vec<Regex>>,
}

impl ItemMatcher {
    /// Indices of every rule matching `sibling`, in table order.
    pub fn matching_rules(&self, sibling: &str) -> Vec<usize> {
        let sibling = normalize(sibling);
        self.compiled
            .iter()
            .enumerate()
            .filter(|(_, patterns)| patterns.iter().any(|re| re.is_match(&sibling)))
            .map(|(index, _)| index)
            .collect()
    }
}
