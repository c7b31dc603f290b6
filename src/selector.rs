//! Passage selection for a race: builds the session pool and hands out passages
//! that never repeat the one just typed.

use crate::registry::UsedTextRegistry;
use crate::store::KeyValueStore;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Shown when no passage can be selected at all
pub const FALLBACK_PASSAGE: &str =
    "The quick brown fox jumps over the lazy dog. This is a simple sentence for typing practice.";

/// Shown when a continuation cannot be built from the pool
pub const CONTINUATION_FALLBACK: &str =
    "The quick brown fox jumps over the lazy dog. This text is a fallback.";

/// Corpora smaller than this get a prefixed copy of every passage
pub const MIN_POOL_SIZE: usize = 10;

const FILLER_PHRASES: [&str; 5] = [
    "In other words, ",
    "To put it simply, ",
    "It's worth noting that ",
    "Interestingly, ",
    "Importantly, ",
];

const CONTRAST_PHRASES: [&str; 5] = [
    "In contrast, ",
    "On the other hand, ",
    "Alternatively, ",
    "Meanwhile, ",
    "Elsewhere, ",
];

const SHARED_PREFIX_CHARS: usize = 20;
const VARIANT_EXCLUSION_CHARS: usize = 30;

/// True when either text contains the other
pub fn overlaps(a: &str, b: &str) -> bool {
    a.contains(b) || b.contains(a)
}

/// True when both texts are longer than 20 chars and start with the same 20 chars
pub fn shares_prefix(a: &str, b: &str) -> bool {
    if a.chars().count() <= SHARED_PREFIX_CHARS || b.chars().count() <= SHARED_PREFIX_CHARS {
        return false;
    }
    a.chars()
        .take(SHARED_PREFIX_CHARS)
        .eq(b.chars().take(SHARED_PREFIX_CHARS))
}

/// Words of `text` in reverse order, joined by single spaces
pub fn reverse_words(text: &str) -> String {
    text.split(' ').rev().collect::<Vec<_>>().join(" ")
}

/// Shuffled pool for one session. Small corpora are padded with prefixed variants.
pub fn build_pool(raw: &[String], rng: &mut StdRng) -> Vec<String> {
    let mut pool = raw.to_vec();
    if raw.len() < MIN_POOL_SIZE {
        for text in raw {
            let filler = FILLER_PHRASES.choose(rng).copied().unwrap_or(FILLER_PHRASES[0]);
            pool.push(format!("{filler}{text}"));
        }
    }
    pool.shuffle(rng);
    pool
}

fn is_fresh(candidate: &str, previous: &str, used: &HashSet<String>, last_used: &str) -> bool {
    !used.contains(candidate)
        && candidate != last_used
        && !overlaps(candidate, previous)
        && !shares_prefix(candidate, previous)
}

/// Outcome of asking for the passage after a completed one
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Continuation {
    /// Word target already met, no passage needed
    TargetReached,
    Next(String),
    /// Pool, variants and both fallback sentences are spent for this race
    Exhausted,
}

/// Hands out passages for one race
#[derive(Debug)]
pub struct TextSelector {
    pool: Vec<String>,
    used: HashSet<String>,
    last_used: String,
    rng: StdRng,
}

impl TextSelector {
    /// Build the session pool from `raw`, pick the opening passage and record it in the
    /// installation-wide registry. Returns the selector and the opening passage.
    pub fn start(raw: &[String], store: &mut dyn KeyValueStore, mut rng: StdRng) -> (Self, String) {
        let shuffled = build_pool(raw, &mut rng);
        let mut persisted = UsedTextRegistry::load(store);

        let fresh: Vec<&String> = shuffled
            .iter()
            .filter(|text| !persisted.contains(*text))
            .collect();

        let candidates = if fresh.is_empty() && !shuffled.is_empty() {
            info!("all passages have been used before, resetting history");
            UsedTextRegistry::clear(store);
            persisted.clear();
            shuffled.iter().collect()
        } else {
            fresh
        };

        let initial = match candidates.choose(&mut rng) {
            Some(text) => (*text).clone(),
            None => {
                warn!("no passages available, using fallback");
                FALLBACK_PASSAGE.to_string()
            }
        };

        UsedTextRegistry::record(store, persisted, &initial);

        let pool: Vec<String> = shuffled
            .into_iter()
            .filter(|text| text != &initial && !overlaps(text, &initial))
            .collect();

        debug!(
            pool = pool.len(),
            "selected opening passage: {:.30}...", initial
        );

        let mut used = HashSet::new();
        used.insert(initial.clone());

        (
            Self {
                pool,
                used,
                last_used: initial.clone(),
                rng,
            },
            initial,
        )
    }

    /// Next passage after `previous` was completed
    pub fn next_passage(
        &mut self,
        previous: &str,
        cumulative_words: usize,
        target_words: usize,
    ) -> Continuation {
        if cumulative_words >= target_words {
            return Continuation::TargetReached;
        }

        let candidates: Vec<&String> = self
            .pool
            .iter()
            .filter(|text| is_fresh(text, previous, &self.used, &self.last_used))
            .collect();

        debug!(
            "{} fresh passages out of {} in pool",
            candidates.len(),
            self.pool.len()
        );

        let next = match candidates.choose(&mut self.rng) {
            Some(text) if text.as_str() == previous => {
                warn!("selected the previous passage again, reselecting");
                let others: Vec<&&String> =
                    candidates.iter().filter(|t| t.as_str() != previous).collect();
                match others.choose(&mut self.rng) {
                    Some(other) => Some((**other).clone()),
                    None => self.fallback(previous),
                }
            }
            Some(text) => Some((*text).clone()),
            None => {
                debug!("session pool exhausted, building a variant");
                self.variant(previous).or_else(|| self.fallback(previous))
            }
        };

        let Some(next) = next else {
            info!("no passage left for this race");
            return Continuation::Exhausted;
        };
        self.used.insert(next.clone());
        self.last_used = next.clone();
        debug!("next passage: {:.30}...", next);
        Continuation::Next(next)
    }

    /// Reversed-word copy of a pool passage behind a contrast phrase
    fn variant(&mut self, previous: &str) -> Option<String> {
        let head: String = previous.chars().take(VARIANT_EXCLUSION_CHARS).collect();
        let safe: Vec<&String> = self
            .pool
            .iter()
            .filter(|text| !text.contains(head.as_str()))
            .collect();
        let base = safe.choose(&mut self.rng)?;
        let reversed = reverse_words(base);

        let mut phrases = CONTRAST_PHRASES.to_vec();
        phrases.shuffle(&mut self.rng);
        phrases
            .into_iter()
            .map(|phrase| format!("{phrase}{reversed}"))
            .find(|variant| variant != previous)
    }

    /// A fallback sentence not yet typed this race
    fn fallback(&self, previous: &str) -> Option<String> {
        [CONTINUATION_FALLBACK, FALLBACK_PASSAGE]
            .into_iter()
            .find(|text| *text != previous && !self.used.contains(*text))
            .map(str::to_string)
    }

    pub fn pool(&self) -> &[String] {
        &self.pool
    }

    /// Passages handed out this session, opening passage included
    pub fn used(&self) -> &HashSet<String> {
        &self.used
    }

    /// Pool entries not handed out yet
    pub fn remaining(&self) -> usize {
        self.pool.iter().filter(|t| !self.used.contains(*t)).count()
    }
}
