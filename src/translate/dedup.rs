//! Insertion-ordered unique text set and the text → translation map built from it.
//! First occurrence wins; later duplicates only record their position.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Distinct texts of a request in first-seen order.
#[derive(Debug, Default)]
pub struct UniqueTexts {
    order: Vec<String>,
    index: HashMap<String, usize>,
    total: usize,
}

impl UniqueTexts {
    pub fn from_texts(texts: &[String]) -> Self {
        let mut set = Self::default();
        for text in texts {
            set.push(text);
        }
        set
    }

    fn push(&mut self, text: &str) {
        self.total += 1;
        if let Entry::Vacant(slot) = self.index.entry(text.to_string()) {
            slot.insert(self.order.len());
            self.order.push(text.to_string());
        }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Number of inputs collapsed into an earlier occurrence.
    pub fn saved(&self) -> usize {
        self.total - self.order.len()
    }

    pub fn position(&self, text: &str) -> Option<usize> {
        self.index.get(text).copied()
    }
}

/// Translations for the unique texts, addressed by source text, iterated in
/// the order the unique set defines.
#[derive(Debug)]
pub struct TranslationMap<'a> {
    unique: &'a UniqueTexts,
    slots: Vec<Option<String>>,
}

impl<'a> TranslationMap<'a> {
    pub fn new(unique: &'a UniqueTexts) -> Self {
        Self {
            unique,
            slots: vec![None; unique.len()],
        }
    }

    /// Record a translation. Texts outside the unique set are ignored.
    pub fn insert(&mut self, text: &str, translated: String) -> bool {
        match self.unique.position(text) {
            Some(pos) => {
                self.slots[pos] = Some(translated);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, text: &str) -> Option<&str> {
        self.unique
            .position(text)
            .and_then(|pos| self.slots[pos].as_deref())
    }

    /// Unique texts that have no translation yet, in first-seen order.
    pub fn missing(&self) -> Vec<String> {
        self.unique
            .as_slice()
            .iter()
            .zip(&self.slots)
            .filter(|(_, slot)| slot.is_none())
            .map(|(text, _)| text.clone())
            .collect()
    }

    pub fn filled(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Expand back to one output per input. Returns the outputs and how many
    /// positions fell back to the source text.
    pub fn reassemble(&self, texts: &[String]) -> (Vec<String>, usize) {
        let mut fallbacks = 0;
        let out = texts
            .iter()
            .map(|text| match self.get(text) {
                Some(t) => t.to_string(),
                None => {
                    fallbacks += 1;
                    text.clone()
                }
            })
            .collect();
        (out, fallbacks)
    }
}
