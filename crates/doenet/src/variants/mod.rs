//! Variant selection.
//!
//! A document whose random points can all be counted is in unique mode: the
//! requested variant index becomes one mixed-radix number whose digits are
//! handed to the random points in document order, least significant first.
//! Any other document runs in seeded mode, where every random point draws
//! from a seed derived from its position in the tree.

pub mod count;
pub mod enumerate;
pub mod seed;

pub use seed::VariantSeed;

use crate::config::CoreConfig;
use crate::dast::DastElement;
use crate::error::{CoreError, Result};
use crate::value::parse_bool;
use serde::Serialize;

/// Digits still to be handed out while instantiating a subtree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VariantCursor {
    remaining: Option<u64>,
}

impl VariantCursor {
    pub fn unique(digits: u64) -> Self {
        Self { remaining: Some(digits) }
    }

    pub fn seeded() -> Self {
        Self { remaining: None }
    }

    pub fn remaining(&self) -> Option<u64> {
        self.remaining
    }

    /// Take the next digit of radix `count`.
    pub fn take(&mut self, count: u64) -> Option<u64> {
        let remaining = self.remaining?;
        let count = count.max(1);
        self.remaining = Some(remaining / count);
        Some(remaining % count)
    }
}

/// What a random point needs to choose its outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VariantSource {
    pub seed: VariantSeed,
    /// Set in unique mode: the outcome to decode.
    pub digit: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantInfo {
    /// 1-based index among `num_variants`.
    pub index: u64,
    pub name: String,
    pub num_variants: u64,
    pub unique: bool,
    /// Size of the enumerable outcome space, if there is one.
    pub enumerable: Option<u64>,
    pub names: Vec<String>,
    pub allowed: Vec<u64>,
    #[serde(skip)]
    pub seed: VariantSeed,
    #[serde(skip)]
    pub digits: Option<u64>,
}

impl VariantInfo {
    pub fn cursor(&self) -> VariantCursor {
        match self.digits {
            Some(digits) => VariantCursor::unique(digits),
            None => VariantCursor::seeded(),
        }
    }
}

/// `1 -> a`, `26 -> z`, `27 -> aa`.
pub fn index_to_letters(mut index: u64) -> String {
    let mut letters = Vec::new();
    while index > 0 {
        index -= 1;
        letters.push(b'a' + (index % 26) as u8);
        index /= 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

pub fn letters_to_index(letters: &str) -> Option<u64> {
    let letters = letters.trim();
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    letters.to_ascii_lowercase().bytes().try_fold(0u64, |acc, byte| {
        acc.checked_mul(26)?.checked_add(u64::from(byte - b'a') + 1)
    })
}

fn split_names(text: &str) -> Vec<String> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn plan(root: &DastElement, config: &CoreConfig) -> Result<VariantInfo> {
    let control = root.element_children().find(|child| child.is("variantControl"));
    let attribute = |name: &str| control.and_then(|control| control.literal_attribute(name));

    let enumerable = count::count_element(root);
    let flags = &config.flags;
    let unique = flags.allow_unique_variants
        && attribute("uniqueVariants").and_then(|text| parse_bool(&text)).unwrap_or(true)
        && enumerable.is_some_and(|n| (1..=flags.max_unique_variants).contains(&n));

    let requested = attribute("numVariants")
        .and_then(|text| text.trim().parse::<u64>().ok())
        .filter(|n| *n > 0);
    let num_variants = match (unique, enumerable) {
        (true, Some(n)) => requested.map_or(n, |requested| requested.min(n)),
        _ => requested.unwrap_or(flags.default_num_variants.max(1)),
    };

    let mut names = attribute("variantNames").map(|text| split_names(&text)).unwrap_or_default();
    names.truncate(num_variants as usize);
    for i in names.len() as u64..num_variants {
        names.push(index_to_letters(i + 1));
    }

    let include = attribute("variantsToInclude").map(|text| split_names(&text));
    let exclude = attribute("variantsToExclude").map(|text| split_names(&text)).unwrap_or_default();
    let listed = |list: &[String], name: &str| list.iter().any(|entry| entry.eq_ignore_ascii_case(name));
    let mut allowed = (1..=num_variants)
        .filter(|i| {
            let name = &names[(*i - 1) as usize];
            include.as_ref().is_none_or(|include| listed(include, name)) && !listed(&exclude, name)
        })
        .collect::<Vec<_>>();
    if allowed.is_empty() {
        allowed = (1..=num_variants).collect();
    }

    let index = match &config.requested_variant_name {
        Some(requested) => names
            .iter()
            .position(|name| name.eq_ignore_ascii_case(requested))
            .map(|position| position as u64 + 1)
            .filter(|index| allowed.contains(index))
            .ok_or_else(|| CoreError::UnknownVariantName(requested.clone()))?,
        None => {
            let requested = config.requested_variant_index.max(1) - 1;
            allowed[(requested % allowed.len() as u64) as usize]
        }
    };

    let digits = match (unique, enumerable) {
        (true, Some(n)) if n == num_variants => Some(index - 1),
        (true, Some(n)) => Some(((u128::from(index - 1) * u128::from(n)) / u128::from(num_variants)) as u64),
        _ => None,
    };
    let seed = attribute("seeds")
        .map(|text| split_names(&text))
        .and_then(|seeds| seeds.get((index - 1) as usize).and_then(|seed| seed.parse::<u64>().ok()))
        .map_or(VariantSeed::root(index), VariantSeed::root);

    let info = VariantInfo {
        index,
        name: names[(index - 1) as usize].clone(),
        num_variants,
        unique,
        enumerable,
        names,
        allowed,
        seed,
        digits,
    };
    log::debug!(
        "variant {} ({}) of {}, unique: {}, enumerable: {:?}",
        info.index,
        info.name,
        info.num_variants,
        info.unique,
        info.enumerable
    );
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dast::read_doenetml;

    fn plan_for(source: &str, index: u64) -> VariantInfo {
        plan(&read_doenetml(source).0, &CoreConfig::with_variant(index)).unwrap()
    }

    #[test]
    fn letters_round_trip() {
        assert_eq!(index_to_letters(1), "a");
        assert_eq!(index_to_letters(27), "aa");
        assert_eq!(letters_to_index("AB"), Some(28));
        assert_eq!(letters_to_index("a1"), None);
    }

    #[test]
    fn cursor_hands_out_least_significant_digit_first() {
        let mut cursor = VariantCursor::unique(7);
        assert_eq!(cursor.take(2), Some(1));
        assert_eq!(cursor.take(3), Some(0));
        assert_eq!(cursor.take(2), Some(1));
        assert_eq!(VariantCursor::seeded().take(5), None);
    }

    #[test]
    fn enumerable_documents_are_unique_and_wrap() {
        let source = "<select>a b c</select>";
        let first = plan_for(source, 2);
        assert!(first.unique);
        assert_eq!(first.num_variants, 3);
        assert_eq!(first.digits, Some(1));
        assert_eq!(plan_for(source, 5).digits, Some(1));
        assert_eq!(first.name, "b");
    }

    #[test]
    fn capped_and_filtered_variants() {
        let source = r#"<variantControl numVariants="2" variantsToExclude="a"/><select>a b c d</select>"#;
        let info = plan_for(source, 1);
        assert_eq!(info.allowed, vec![2]);
        assert_eq!(info.index, 2);
        assert_eq!(info.digits, Some(2));
    }

    #[test]
    fn unknown_variant_name_is_an_error() {
        let (root, _) = read_doenetml("<select>a b</select>");
        let config = CoreConfig { requested_variant_name: Some("zz".into()), ..CoreConfig::default() };
        assert!(plan(&root, &config).is_err());
        let config = CoreConfig { requested_variant_name: Some("B".into()), ..CoreConfig::default() };
        assert_eq!(plan(&root, &config).unwrap().index, 2);
    }

    #[test]
    fn sampling_documents_use_seeds() {
        let info = plan_for(r#"<sampleRandomNumbers numSamples="2"/>"#, 3);
        assert!(!info.unique);
        assert_eq!(info.num_variants, 100);
        assert_eq!(info.seed, VariantSeed::root(3));
    }
}
