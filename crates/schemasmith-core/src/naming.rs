//! Identifier synthesis for tables, columns and constraints.
//!
//! Every identifier must fit [`MAX_IDENTIFIER_LENGTH`]. Names are shrunk
//! deterministically first, so repeated calls for the same object agree, and
//! only fall back to a random body when no deterministic candidate fits or
//! every deterministic candidate is already taken.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::text::strip_prefix_ignore_case;

/// Hard ceiling on identifier length in the target schema.
pub const MAX_IDENTIFIER_LENGTH: usize = 30;

/// Default number of random candidates tried before giving up.
pub const DEFAULT_RANDOM_ATTEMPTS: usize = 8;

/// Highest number of leading characters dropped from each part while shrinking.
const MAX_SHRINK_OFFSET: usize = 14;

/// First number appended when a deterministic name collides.
const FIRST_COLLISION_SUFFIX: u32 = 2;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Answers whether an identifier is already taken in the physical schema.
pub trait NameOracle {
    /// Check whether a constraint with this name exists.
    fn constraint_exists(&self, name: &str) -> Result<bool>;

    /// Check whether a table or view with this name exists.
    fn relation_exists(&self, name: &str) -> Result<bool>;
}

/// Deterministic shrink of `<prefix>_<part1>_<part2>_<suffix>`.
///
/// Returns `None` when no candidate fits within `max_length`.
pub fn shrink(
    prefix: &str,
    part1: &str,
    part2: &str,
    suffix: &str,
    max_length: usize,
) -> Option<String> {
    let mut part1 = part1.to_string();
    let mut part2 = part2.to_string();

    let mut proposal = join_parts(prefix, &part1, &part2, suffix);
    if proposal.len() > max_length && (part1.contains('_') || part2.contains('_')) {
        part1 = part1.replace('_', "");
        part2 = part2.replace('_', "");
        proposal = join_parts(prefix, &part1, &part2, suffix);
    }

    let mut offset = 1;
    while proposal.len() > max_length && offset <= MAX_SHRINK_OFFSET {
        proposal = join_parts(
            prefix,
            drop_leading(&part1, offset),
            drop_leading(&part2, offset),
            suffix,
        );
        offset += 1;
    }

    (proposal.len() <= max_length).then_some(proposal)
}

/// Builds identifiers that fit the length limit and avoid existing names.
pub struct IdentifierSynthesizer<R = StdRng> {
    max_length: usize,
    random_attempts: usize,
    rng: R,
}

impl IdentifierSynthesizer<StdRng> {
    /// Synthesizer with an entropy-seeded generator.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Synthesizer with a fixed seed, for reproducible random fallbacks.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl Default for IdentifierSynthesizer<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> IdentifierSynthesizer<R> {
    /// Synthesizer over a caller-supplied generator.
    pub fn with_rng(rng: R) -> Self {
        Self {
            max_length: MAX_IDENTIFIER_LENGTH,
            random_attempts: DEFAULT_RANDOM_ATTEMPTS,
            rng,
        }
    }

    /// Set the identifier length ceiling.
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    /// Set how many random candidates are tried.
    pub fn with_random_attempts(mut self, attempts: usize) -> Self {
        self.random_attempts = attempts.max(1);
        self
    }

    /// The identifier length ceiling.
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Name a constraint as `<prefix>_<part1>_<part2>_<suffix>`.
    ///
    /// `prefix_` is removed from either part when present. On a collision a
    /// numeric suffix is appended to the second part once; if that is taken
    /// too, random bodies are tried against the oracle.
    pub fn constraint_name(
        &mut self,
        prefix: &str,
        part1: &str,
        part2: &str,
        suffix: &str,
        oracle: &dyn NameOracle,
    ) -> Result<String> {
        let scoped = format!("{}_", prefix);
        let part1 = strip_prefix_ignore_case(part1, &scoped).unwrap_or(part1);
        let part2 = strip_prefix_ignore_case(part2, &scoped).unwrap_or(part2);

        if let Some(name) = shrink(prefix, part1, part2, suffix, self.max_length) {
            if !oracle.constraint_exists(&name)? {
                return Ok(name);
            }
            debug!(constraint = %name, "constraint name taken, numbering");

            let numbered = format!("{}{}", part2, FIRST_COLLISION_SUFFIX);
            if let Some(name) = shrink(prefix, part1, &numbered, suffix, self.max_length) {
                if !oracle.constraint_exists(&name)? {
                    return Ok(name);
                }
            }
        }

        let base = join_parts(prefix, part1, part2, suffix);
        let limit = self.max_length;
        self.random_name(prefix, suffix, &base, limit, |name| oracle.constraint_exists(name))
    }

    /// Name the `Y`/`N` check constraint of a flag column.
    pub fn check_constraint_name(
        &mut self,
        prefix: &str,
        table: &str,
        column: &str,
        oracle: &dyn NameOracle,
    ) -> Result<String> {
        self.constraint_name(prefix, table, column, "chk", oracle)
    }

    /// Name a table or view as `<prefix>_<base>`.
    ///
    /// `reserve` characters are kept free for a suffix the caller derives
    /// from the name, such as the `_id` of the key column. The name depends
    /// on the inputs alone: one that fits is returned as is, a longer one is
    /// always truncated to the same shrunk name. Numbered and random names
    /// are tried only while `taken_by_other` reports the candidate as held by
    /// a different object, so two long names cannot truncate onto each other
    /// while repeating a request still lands on its own name.
    pub fn physical_name<F>(
        &mut self,
        prefix: &str,
        base: &str,
        reserve: usize,
        mut taken_by_other: F,
    ) -> Result<String>
    where
        F: FnMut(&str) -> Result<bool>,
    {
        let limit = self.max_length.saturating_sub(reserve);
        let name = qualified_name(prefix, base);
        if name.len() <= limit {
            return Ok(name);
        }

        let scoped = format!("{}_", prefix);
        let body = strip_prefix_ignore_case(base, &scoped).unwrap_or(base);
        let compact = body.replace('_', "");
        let room = limit.saturating_sub(prefix.len() + 1);
        if room < 2 {
            return Err(Error::IdentifierExhausted { base: name });
        }
        let truncated: String = compact.chars().take(room).collect();
        let candidate = format!("{}_{}", prefix, truncated);
        if !taken_by_other(&candidate)? {
            debug!(from = %name, to = %candidate, "table name shrunk");
            return Ok(candidate);
        }

        let head: String = compact.chars().take(room - 1).collect();
        for n in FIRST_COLLISION_SUFFIX..10 {
            let candidate = format!("{}_{}{}", prefix, head, n);
            if !taken_by_other(&candidate)? {
                return Ok(candidate);
            }
        }

        self.random_name(prefix, "", &name, limit, taken_by_other)
    }

    fn random_name<F>(
        &mut self,
        prefix: &str,
        suffix: &str,
        base: &str,
        limit: usize,
        mut exists: F,
    ) -> Result<String>
    where
        F: FnMut(&str) -> Result<bool>,
    {
        let separators = if suffix.is_empty() { 1 } else { 2 };
        let fixed = prefix.len() + suffix.len() + separators;
        if fixed >= limit {
            return Err(Error::IdentifierExhausted {
                base: base.to_string(),
            });
        }
        let length = limit - fixed;

        for attempt in 0..self.random_attempts {
            let body = self.random_string(length);
            let candidate = if suffix.is_empty() {
                format!("{}_{}", prefix, body)
            } else {
                format!("{}_{}_{}", prefix, body, suffix)
            };
            if !exists(&candidate)? {
                warn!(base = %base, name = %candidate, attempt, "fell back to random identifier");
                return Ok(candidate);
            }
        }

        Err(Error::IdentifierExhausted {
            base: base.to_string(),
        })
    }

    fn random_string(&mut self, length: usize) -> String {
        (0..length)
            .map(|_| ALPHABET[self.rng.gen_range(0..ALPHABET.len())] as char)
            .collect()
    }
}

/// Unshrunk physical name of `base` under `prefix`.
///
/// A leading `<prefix>_` on `base` is not repeated.
pub fn qualified_name(prefix: &str, base: &str) -> String {
    let scoped = format!("{}_", prefix);
    let body = strip_prefix_ignore_case(base, &scoped).unwrap_or(base);
    collapse_underscores(&format!("{}_{}", prefix, body))
}

/// Name of a column added by a module other than the table's owner.
pub fn external_name(prefix: &str, name: &str) -> String {
    format!("EM_{}_{}", prefix, name)
}

fn join_parts(prefix: &str, part1: &str, part2: &str, suffix: &str) -> String {
    collapse_underscores(&format!("{}_{}_{}_{}", prefix, part1, part2, suffix))
}

fn drop_leading(part: &str, offset: usize) -> &str {
    if part.len() > offset {
        part.char_indices()
            .nth(offset)
            .map_or(part, |(idx, _)| &part[idx..])
    } else {
        part
    }
}

fn collapse_underscores(name: &str) -> String {
    let mut out = name.to_string();
    while out.contains("__") {
        out = out.replace("__", "_");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashSet;

    #[derive(Default)]
    struct TakenNames(RefCell<HashSet<String>>);

    impl TakenNames {
        fn with(names: &[&str]) -> Self {
            Self(RefCell::new(
                names.iter().map(|n| n.to_ascii_lowercase()).collect(),
            ))
        }
    }

    impl NameOracle for TakenNames {
        fn constraint_exists(&self, name: &str) -> Result<bool> {
            Ok(self.0.borrow().contains(&name.to_ascii_lowercase()))
        }

        fn relation_exists(&self, name: &str) -> Result<bool> {
            self.constraint_exists(name)
        }
    }

    struct EverythingTaken;

    impl NameOracle for EverythingTaken {
        fn constraint_exists(&self, _name: &str) -> Result<bool> {
            Ok(true)
        }

        fn relation_exists(&self, _name: &str) -> Result<bool> {
            Ok(true)
        }
    }

    #[test]
    fn test_short_name_unchanged() {
        let mut synth = IdentifierSynthesizer::with_seed(1);
        let name = synth
            .constraint_name("TEST", "TEST_orders", "", "pk", &TakenNames::default())
            .unwrap();
        assert_eq!(name, "TEST_orders_pk");
    }

    #[test]
    fn test_long_parts_fit_and_keep_suffix() {
        let mut synth = IdentifierSynthesizer::with_seed(1);
        let name = synth
            .constraint_name(
                "COPDEVT",
                "veryveryverylongtablename",
                "anotherlongname",
                "fk",
                &TakenNames::default(),
            )
            .unwrap();
        assert!(name.len() <= MAX_IDENTIFIER_LENGTH, "{} too long", name);
        assert!(name.ends_with("_fk"));
        assert!(name.starts_with("COPDEVT_"));
    }

    #[test]
    fn test_underscores_dropped_first() {
        let name = shrink("TEST", "sales_order_line", "product_price", "fk", 30).unwrap();
        assert_eq!(name, "TEST_esorderline_ductprice_fk");

        let fits = shrink("TEST", "order_line", "tax", "fk", 30).unwrap();
        assert_eq!(fits, "TEST_order_line_tax_fk");
    }

    #[test]
    fn test_shrink_drops_leading_characters() {
        // 4 + 1 + 20 + 1 + 5 + 1 + 2 = 34, so two leading characters go.
        let name = shrink("TEST", "abcdefghijklmnopqrst", "vwxyz", "fk", 30).unwrap();
        assert_eq!(name, "TEST_cdefghijklmnopqrst_xyz_fk");
    }

    #[test]
    fn test_shrink_keeps_short_parts() {
        let name = shrink("TEST", "abcdefghijklmnopqrstuvwxyz", "ab", "fk", 30).unwrap();
        assert!(name.ends_with("_ab_fk"));
        assert!(name.len() <= 30);
    }

    #[test]
    fn test_deterministic_for_same_inputs() {
        let oracle = TakenNames::default();
        let mut a = IdentifierSynthesizer::with_seed(1);
        let mut b = IdentifierSynthesizer::with_seed(99);
        let first = a
            .constraint_name("ABC", "purchase_requisition_line", "c_bpartner", "fk", &oracle)
            .unwrap();
        let second = b
            .constraint_name("ABC", "purchase_requisition_line", "c_bpartner", "fk", &oracle)
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_collision_appends_number() {
        let oracle = TakenNames::with(&["TEST_orders_customer_fk"]);
        let mut synth = IdentifierSynthesizer::with_seed(1);
        let name = synth
            .constraint_name("TEST", "orders", "customer", "fk", &oracle)
            .unwrap();
        assert_eq!(name, "TEST_orders_customer2_fk");
    }

    #[test]
    fn test_random_fallback_only_when_shrink_fails() {
        // The suffix alone leaves no room for the deterministic parts.
        let long_suffix = "x".repeat(20);
        assert!(shrink("PFX", "abcdefghijklmnopq", "abcdefghijklmnopq", &long_suffix, 30).is_none());

        let mut synth = IdentifierSynthesizer::with_seed(7);
        let name = synth
            .constraint_name(
                "PFX",
                "abcdefghijklmnopq",
                "abcdefghijklmnopq",
                &long_suffix,
                &TakenNames::default(),
            )
            .unwrap();
        assert_eq!(name.len(), 30);
        assert!(name.starts_with("PFX_"));
        assert!(name.ends_with(&format!("_{}", long_suffix)));
    }

    #[test]
    fn test_random_fallback_exhausts() {
        let mut synth = IdentifierSynthesizer::with_seed(3).with_random_attempts(3);
        let err = synth
            .constraint_name("TEST", "orders", "customer", "fk", &EverythingTaken)
            .unwrap_err();
        assert!(matches!(err, Error::IdentifierExhausted { .. }));
    }

    #[test]
    fn test_length_invariant_over_generated_inputs() {
        let mut rng = StdRng::seed_from_u64(42);
        let oracle = TakenNames::default();
        let mut synth = IdentifierSynthesizer::with_seed(42);
        for _ in 0..500 {
            let prefix_len = rng.gen_range(2..=7);
            let prefix: String = (0..prefix_len)
                .map(|_| (b'A' + rng.gen_range(0..26)) as char)
                .collect();
            let part = |rng: &mut StdRng| -> String {
                let len = rng.gen_range(0..40);
                (0..len)
                    .map(|_| {
                        if rng.gen_bool(0.15) {
                            '_'
                        } else {
                            (b'a' + rng.gen_range(0..26)) as char
                        }
                    })
                    .collect()
            };
            let part1 = part(&mut rng);
            let part2 = part(&mut rng);
            let suffix = ["fk", "pk", "chk", "un"][rng.gen_range(0..4)];
            let name = synth
                .constraint_name(&prefix, &part1, &part2, suffix, &oracle)
                .unwrap();
            assert!(name.len() <= MAX_IDENTIFIER_LENGTH, "{} too long", name);
            assert!(name.ends_with(suffix));
        }
    }

    #[test]
    fn test_physical_name_prefixing() {
        let mut synth = IdentifierSynthesizer::with_seed(1);
        let free = |_: &str| -> Result<bool> { Ok(false) };
        assert_eq!(
            synth.physical_name("test", "my_table", 0, free).unwrap(),
            "test_my_table"
        );
        assert_eq!(
            synth.physical_name("test", "TEST_my_table", 0, free).unwrap(),
            "test_my_table"
        );
        assert_eq!(qualified_name("test", "TEST_my__table"), "test_my_table");
    }

    #[test]
    fn test_physical_name_is_stable_and_avoids_other_holders() {
        let mut synth = IdentifierSynthesizer::with_seed(1);
        let base = "customer_loyalty_program_enrollment";
        let first = synth.physical_name("abc", base, 0, |_| Ok(false)).unwrap();
        assert_eq!(first.len(), MAX_IDENTIFIER_LENGTH);
        assert!(first.starts_with("abc_customerloyalty"));

        // Repeating the request while the shrunk name exists for this same
        // table must not move to a fresh name.
        let again = synth.physical_name("abc", base, 0, |_| Ok(false)).unwrap();
        assert_eq!(again, first);

        let held = TakenNames::with(&[first.as_str()]);
        let other = synth
            .physical_name("abc", base, 0, |n| held.relation_exists(n))
            .unwrap();
        assert_ne!(other, first);
        assert!(other.len() <= MAX_IDENTIFIER_LENGTH);
        assert!(other.ends_with('2'));

        let keyed = synth.physical_name("abc", base, 3, |_| Ok(false)).unwrap();
        assert_eq!(keyed.len(), MAX_IDENTIFIER_LENGTH - 3);
    }

    #[test]
    fn test_external_name() {
        assert_eq!(external_name("ABC", "notes"), "EM_ABC_notes");
    }
}
