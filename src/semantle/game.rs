/*
 * MIT License
 *
 * Copyright (c) 2022 Joseph Sacchini
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
 * SOFTWARE.
 */

use std::collections::HashSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use super::{prelude::*, rank::*, resolver::Resolution, score::*};

///
/// One entry of a player's guess history. Hints are recorded here too (flagged with is_hint) so
/// that the hint selector never repeats a word and the progress signal can leave them out.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guess {
    pub word: String,
    pub timestamp_ms: i64,
    pub similarity: SimilarityFloat,
    /// similarity on the 0..=100 scale (see normalize_similarity)
    pub normalized_similarity: u8,
    pub rank: Rank,
    pub is_hint: bool,
}

impl Guess {
    ///
    /// Builds a Guess from a resolved word, normalizing its similarity against the challenge's
    /// (closest, furthest) bounds.
    ///
    pub fn from_resolution(
        resolution: &Resolution,
        bounds: (SimilarityFloat, SimilarityFloat),
        timestamp_ms: i64,
        is_hint: bool,
    ) -> Self {
        let (closest, furthest) = bounds;
        Self {
            word: resolution.word.clone(),
            timestamp_ms,
            similarity: resolution.similarity,
            normalized_similarity: normalize_similarity(closest, furthest, resolution.similarity),
            rank: resolution.rank,
            is_hint,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameErr {
    #[error("'{0}' was already guessed")]
    AlreadyGuessed(String),
    #[error("provided guess is not valid")]
    InvalidGuess(String),
}

///
/// The guesses (and hints) of one session, in the order they were made.
///
/// A canonical word can only be recorded once per session.
///
#[derive(Debug, Clone, Default)]
pub struct GuessHistory {
    guesses: Vec<Guess>,
    words: HashSet<String>,
}

impl GuessHistory {
    ///
    /// Add a guess to the history. The word is canonicalized first, and the guess is rejected if
    /// that canonical word is already in the history.
    ///
    pub fn record(&mut self, mut guess: Guess) -> Result<&Guess, GameErr> {
        let word = normalize_guess_word(&guess.word);
        if !is_plausible_word(&word) {
            return Err(GameErr::InvalidGuess(word));
        }

        if !self.words.insert(word.clone()) {
            return Err(GameErr::AlreadyGuessed(word));
        }

        guess.word = word;
        self.guesses.push(guess);
        Ok(&self.guesses[self.guesses.len() - 1])
    }

    /// Whether this word (in any case/spacing) is already in the history
    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(&normalize_guess_word(word))
    }

    pub fn guesses(&self) -> &[Guess] {
        &self.guesses
    }

    pub fn len(&self) -> usize {
        self.guesses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guesses.is_empty()
    }

    /// The best rank reached by any guess or hint, if any were ranked
    pub fn closest_rank(&self) -> Option<u32> {
        self.guesses.iter().filter_map(|g| g.rank.get()).min()
    }

    /// The highest normalized similarity of any real (non hint) guess
    pub fn best_normalized(&self) -> Option<u8> {
        self.guesses
            .iter()
            .filter(|g| !g.is_hint)
            .map(|g| g.normalized_similarity)
            .max()
    }

    pub fn num_hints(&self) -> usize {
        self.guesses.iter().filter(|g| g.is_hint).count()
    }

    /// See compute_progress
    pub fn progress(&self, window_size: usize) -> u8 {
        compute_progress(&self.guesses, window_size)
    }

    /// Forget every guess, as when a new challenge starts
    pub fn reset(&mut self) {
        self.guesses.clear();
        self.words.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolution(word: &str, similarity: f64, rank: Rank) -> Resolution {
        Resolution {
            word: word.to_string(),
            similarity,
            rank,
        }
    }

    #[test]
    fn test_record_rejects_repeats() {
        let mut history = GuessHistory::default();
        let apple = Guess::from_resolution(&resolution("apple", 0.5, Rank::Ranked(30)), (0.9, 0.1), 1, false);

        assert!(history.record(apple.clone()).is_ok());
        let mut shouted = apple.clone();
        shouted.word = " APPLE ".to_string();
        assert_eq!(history.record(shouted), Err(GameErr::AlreadyGuessed("apple".to_string())));
        assert_eq!(history.len(), 1);
        assert!(history.contains("Apple"));
    }

    #[test]
    fn test_record_rejects_invalid() {
        let mut history = GuessHistory::default();
        let bad = Guess::from_resolution(&resolution("42", 0.5, Rank::Unranked), (0.9, 0.1), 1, false);
        assert_eq!(history.record(bad), Err(GameErr::InvalidGuess("42".to_string())));
        assert!(history.is_empty());
    }

    #[test]
    fn test_summaries() {
        let mut history = GuessHistory::default();
        let bounds = (0.9, 0.1);
        history.record(Guess::from_resolution(&resolution("tree", 0.5, Rank::Ranked(300)), bounds, 1, false)).unwrap();
        history.record(Guess::from_resolution(&resolution("leaf", 0.8, Rank::Ranked(12)), bounds, 2, true)).unwrap();
        history.record(Guess::from_resolution(&resolution("rock", 0.0, Rank::Unranked), bounds, 3, false)).unwrap();

        assert_eq!(history.closest_rank(), Some(12));
        assert_eq!(history.best_normalized(), Some(50));
        assert_eq!(history.num_hints(), 1);
        assert_eq!(history.progress(5), 25, "mean of 50 and 0, hint left out");

        history.reset();
        assert!(history.is_empty());
        assert!(!history.contains("tree"));
    }
}
