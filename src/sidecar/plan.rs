//! Claim plan for one directory listing.
//!
//! Every name in the listing is classified against its siblings. Items no
//! sibling claims are primaries; whatever a primary claims is hidden from the
//! listing. Items that claim each other in a cycle are neither, so they stay
//! visible and keep their records.
//!
//! When the rule table guarantees a stem prefix, only siblings sharing that
//! prefix are handed to the classifier, found by binary search over the sorted
//! names.

use super::{Classification, SidecarClassifier};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
pub struct ClaimPlan {
    claims: HashMap<String, Vec<Classification>>,
    hidden: HashSet<String>,
}

/// Listing names indexed for prefix lookups.
struct PrefixIndex<'a> {
    names: &'a [String],
    /// ASCII names lowercased, with their listing position, sorted.
    ascii: Vec<(String, usize)>,
    /// Positions of names with non-ASCII characters; always candidates.
    other: Vec<usize>,
}

impl<'a> PrefixIndex<'a> {
    fn new(names: &'a [String]) -> Self {
        let mut ascii = Vec::new();
        let mut other = Vec::new();
        for (position, name) in names.iter().enumerate() {
            if name.is_ascii() {
                ascii.push((name.to_ascii_lowercase(), position));
            } else {
                other.push(position);
            }
        }
        ascii.sort_unstable();
        Self {
            names,
            ascii,
            other,
        }
    }

    /// Names starting with the lowercase `prefix`, in listing order.
    fn starting_with(&self, prefix: &str) -> Vec<String> {
        let start = self.ascii.partition_point(|(name, _)| name.as_str() < prefix);
        let mut positions: Vec<usize> = self.ascii[start..]
            .iter()
            .take_while(|(name, _)| name.starts_with(prefix))
            .map(|(_, position)| *position)
            .chain(self.other.iter().copied())
            .collect();
        positions.sort_unstable();
        positions
            .into_iter()
            .map(|position| self.names[position].clone())
            .collect()
    }
}

impl ClaimPlan {
    pub fn build(classifier: &SidecarClassifier, names: &[String]) -> Self {
        let index = PrefixIndex::new(names);
        let claims: HashMap<String, Vec<Classification>> = names
            .iter()
            .map(|name| {
                let found = match classifier.rules().required_prefix(name) {
                    Some(prefix) => {
                        let candidates = index.starting_with(&prefix);
                        classifier.classify(name, &candidates)
                    }
                    None => classifier.classify(name, names),
                };
                (name.clone(), found)
            })
            .collect();

        let claimed: HashSet<&str> = claims
            .values()
            .flatten()
            .map(|c| c.sibling.as_str())
            .collect();

        let hidden = claims
            .iter()
            .filter(|(name, _)| !claimed.contains(name.as_str()))
            .flat_map(|(_, cs)| cs.iter().map(|c| c.sibling.clone()))
            .collect();

        Self { claims, hidden }
    }

    /// Whether `name` is folded into a primary and must not be emitted.
    pub fn is_hidden(&self, name: &str) -> bool {
        self.hidden.contains(name)
    }

    pub fn classifications(&self, name: &str) -> &[Classification] {
        self.claims.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn hidden_count(&self) -> usize {
        self.hidden.len()
    }
}
