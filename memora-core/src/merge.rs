use crate::{CardDraft, Enrichment};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Range;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MergeMode {
    /// Keep existing cards and add the new words after them.
    #[default]
    Add,
    /// Replace every card with blank drafts for the new words.
    Override,
}

pub fn parse_words(input: &str) -> Vec<String> {
    input.split_whitespace().map(str::to_string).collect()
}

/// Enrichment records keyed by the word the server echoed back.
#[derive(Debug, Default)]
pub struct EnrichmentIndex<'a> {
    by_word: HashMap<&'a str, &'a Enrichment>,
}

impl<'a> EnrichmentIndex<'a> {
    /// Later records for the same word replace earlier ones.
    pub fn build(records: &'a [Enrichment]) -> Self {
        let mut by_word = HashMap::with_capacity(records.len());
        for r in records {
            by_word.insert(r.word.as_str(), r);
        }
        Self { by_word }
    }

    pub fn get(&self, word: &str) -> Option<&'a Enrichment> {
        self.by_word.get(word).copied()
    }

    pub fn len(&self) -> usize {
        self.by_word.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_word.is_empty()
    }
}

fn set_if_present(slot: &mut String, value: &Option<String>) -> bool {
    match value {
        Some(v) if !v.trim().is_empty() => {
            if slot != v {
                *slot = v.clone();
                return true;
            }
            false
        }
        _ => false,
    }
}

/// Copies every non-blank suggested field onto the card. Returns the number of fields changed.
pub fn apply_enrichment(card: &mut CardDraft, record: &Enrichment) -> usize {
    [
        set_if_present(&mut card.meaning, &record.meaning),
        set_if_present(&mut card.pronounce, &record.pronunciation),
        set_if_present(&mut card.sino_vietnamese, &record.sino_vietnamese),
        set_if_present(&mut card.kind, &record.kind),
        set_if_present(&mut card.meaning_description, &record.meaning_description),
        set_if_present(&mut card.example, &record.example),
        set_if_present(&mut card.example_meaning, &record.example_meaning),
    ]
    .into_iter()
    .filter(|changed| *changed)
    .count()
}

/// Lays out the card list for a bulk operation and returns the range eligible for enrichment.
pub fn seed_cards(
    existing: &[CardDraft],
    words: &[String],
    mode: MergeMode,
) -> (Vec<CardDraft>, Range<usize>) {
    let fresh = words.iter().map(|w| CardDraft::blank(w.as_str()));
    match mode {
        MergeMode::Add => {
            let start = existing.len();
            let mut cards = existing.to_vec();
            cards.extend(fresh);
            let end = cards.len();
            (cards, start..end)
        }
        MergeMode::Override => {
            let cards: Vec<CardDraft> = fresh.collect();
            let end = cards.len();
            (cards, 0..end)
        }
    }
}

/// Applies matching records to cards inside `range`. Returns how many cards matched.
pub fn enrich_range(cards: &mut [CardDraft], range: Range<usize>, index: &EnrichmentIndex) -> usize {
    let end = range.end.min(cards.len());
    let start = range.start.min(end);
    let mut matched = 0;
    for card in &mut cards[start..end] {
        if card.word.is_empty() {
            continue;
        }
        if let Some(rec) = index.get(&card.word) {
            apply_enrichment(card, rec);
            matched += 1;
        }
    }
    matched
}

pub fn merge_cards(
    existing: &[CardDraft],
    words: &[String],
    mode: MergeMode,
    records: &[Enrichment],
) -> Vec<CardDraft> {
    let (mut cards, range) = seed_cards(existing, words, mode);
    let index = EnrichmentIndex::build(records);
    enrich_range(&mut cards, range, &index);
    cards
}
