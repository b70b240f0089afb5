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
use super::{game::*, prelude::*};

///
/// A word which may be handed out as a hint.
///
/// Hint candidates are always used as a list sorted closest-first, and a candidate's position in
/// that list is its rank: index 0 is the answer itself, index 1 the closest other word, etc.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HintCandidate {
    pub word: String,
    pub similarity: SimilarityFloat,
    pub is_hint_eligible: bool,
    pub definition: Option<String>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HintErr {
    #[error("no more hints")]
    NoHintsRemaining,
    #[error(transparent)]
    Rejected(#[from] GameErr),
}

///
/// Picks the next hint, bisecting in rank space between the player's best guess and the answer.
///
/// * With no ranked guess yet, the hint is the eligible candidate furthest from the answer (a weak
///   opening hint).
/// * Once the answer itself (rank 0) has been guessed, hints continue from the closest remaining
///   word.
/// * Otherwise the hint is the first eligible candidate at or after half of the best rank (up to
///   the best rank). Failing that, the nearest one closer than half the best rank, and as a last
///   resort the nearest one further away than the best guess.
///
/// Guess ranks are read as positions in `candidates`, and may be far past the end of the list: the
/// halfway point is taken from the real rank, then the search keeps to positions that exist. A
/// word that was already guessed (or given as a hint) is never returned.
///
pub fn select_hint<'a>(
    candidates: &'a [HintCandidate],
    previous_guesses: &[Guess],
) -> Result<&'a HintCandidate, HintErr> {
    let last = candidates.len().checked_sub(1).ok_or(HintErr::NoHintsRemaining)?;

    let guessed: HashSet<String> = previous_guesses
        .iter()
        .map(|g| normalize_guess_word(&g.word))
        .collect();
    let usable = |idx: &usize| {
        let candidate = &candidates[*idx];
        candidate.is_hint_eligible && !guessed.contains(&normalize_guess_word(&candidate.word))
    };

    // Unranked guesses never take part in this comparison
    let closest_rank = previous_guesses.iter().filter_map(|g| g.rank.get()).min();

    let found = match closest_rank {
        None => (0..=last).rev().find(usable),
        Some(0) => (1..=last).find(usable),
        Some(closest_rank) => {
            let closest_rank = closest_rank as usize;
            let target_rank = closest_rank / 2;
            // ranks may run past the end of the list, only the scans are bounded by it
            (target_rank..=closest_rank.min(last))
                .find(usable)
                .or_else(|| (0..target_rank.min(last + 1)).rev().find(usable))
                .or_else(|| (closest_rank + 1..=last).find(usable))
        }
    };

    found
        .map(|idx| &candidates[idx])
        .ok_or(HintErr::NoHintsRemaining)
}

///
/// Parses a candidate list. Each line holds "word,similarity,eligible[,definition]" where eligible
/// is 1/0 or true/false, and the lines are already sorted closest-first. Malformed lines (and the
/// header) are skipped.
///
pub fn parse_hint_candidates(text: &str) -> Vec<HintCandidate> {
    text.lines()
        .filter_map(|line| {
            let mut parts = line.splitn(4, ',');
            let word = normalize_guess_word(parts.next()?);
            let similarity = parts.next()?.trim().parse::<SimilarityFloat>().ok()?;
            let is_hint_eligible = match parts.next()?.trim() {
                "1" | "true" => true,
                "0" | "false" => false,
                _ => return None,
            };
            let definition = parts
                .next()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string);

            if !is_plausible_word(&word) {
                return None;
            }

            Some(HintCandidate {
                word,
                similarity,
                is_hint_eligible,
                definition,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantle::rank::Rank;
    use test_case::test_case;

    const ELIGIBLE: [usize; 6] = [0, 2, 4, 5, 7, 9];

    fn candidates() -> Vec<HintCandidate> {
        (0..10)
            .map(|idx| HintCandidate {
                word: format!("word{}", "x".repeat(idx)),
                similarity: 1.0 - (idx as f64 * 0.05),
                is_hint_eligible: ELIGIBLE.contains(&idx),
                definition: None,
            })
            .collect()
    }

    fn guess_at(candidates: &[HintCandidate], idx: usize) -> Guess {
        Guess {
            word: candidates[idx].word.clone(),
            timestamp_ms: 0,
            similarity: candidates[idx].similarity,
            normalized_similarity: 50,
            rank: Rank::Ranked(idx as u32),
            is_hint: false,
        }
    }

    fn unranked_guess(word: &str) -> Guess {
        Guess {
            word: word.to_string(),
            timestamp_ms: 0,
            similarity: -0.1,
            normalized_similarity: 0,
            rank: Rank::Unranked,
            is_hint: false,
        }
    }

    fn index_of(candidates: &[HintCandidate], hint: &HintCandidate) -> usize {
        candidates.iter().position(|c| c == hint).unwrap()
    }

    #[test]
    fn test_opening_hint_is_furthest() {
        let c = candidates();
        assert_eq!(index_of(&c, select_hint(&c, &[]).unwrap()), 9);
        // unranked guesses don't count as having a rank
        assert_eq!(index_of(&c, select_hint(&c, &[unranked_guess("zzz")]).unwrap()), 9);
    }

    #[test_case(&[9], 4)]
    #[test_case(&[9, 4], 2)]
    #[test_case(&[7], 4 ; "halfway rounds down to an eligible index")]
    #[test_case(&[3], 2)]
    #[test_case(&[2], 0 ; "scans back toward the answer")]
    #[test_case(&[1], 0)]
    #[test_case(&[0], 2 ; "answer guessed so continue from index 1")]
    #[test_case(&[2, 0], 4)]
    #[test_case(&[0, 2, 4, 5, 7], 9 ; "answer guessed and only the furthest remains")]
    fn test_select_hint(guessed: &[usize], expected: usize) {
        let c = candidates();
        let history: Vec<Guess> = guessed.iter().map(|idx| guess_at(&c, *idx)).collect();
        let hint = select_hint(&c, &history).expect("should have a hint");
        assert_eq!(index_of(&c, hint), expected, "history={:?}", guessed);
    }

    #[test]
    fn test_no_hints_remaining() {
        let c = candidates();
        let history: Vec<Guess> = ELIGIBLE.iter().map(|idx| guess_at(&c, *idx)).collect();
        assert_eq!(select_hint(&c, &history), Err(HintErr::NoHintsRemaining));
        assert_eq!(select_hint(&[], &[]), Err(HintErr::NoHintsRemaining));
    }

    #[test]
    fn test_last_resort_scans_past_best_guess() {
        let c = candidates();
        // everything eligible between the answer and the best guess was already used up
        let mut history: Vec<Guess> = [0, 2, 4].iter().map(|idx| unranked_guess(&c[*idx].word)).collect();
        history.push(guess_at(&c, 5));
        assert_eq!(index_of(&c, select_hint(&c, &history).unwrap()), 7);
    }

    fn ranked_guess(word: &str, rank: u32) -> Guess {
        let mut guess = unranked_guess(word);
        guess.rank = Rank::Ranked(rank);
        guess
    }

    #[test_case(5000, 9 ; "halfway point past the end scans back from the last candidate")]
    #[test_case(14, 7 ; "halfway point inside the list")]
    #[test_case(19, 9 ; "halfway point is the last candidate")]
    fn test_rank_past_end(rank: u32, expected: usize) {
        let c = candidates();
        let hint = select_hint(&c, &[ranked_guess("faraway", rank)]).unwrap();
        assert_eq!(index_of(&c, hint), expected);
    }

    #[test]
    fn test_never_repeats_a_guess() {
        let c = candidates();
        // walk a few different orders through the whole list, checking every prefix as a history
        for stride in [1, 3, 7] {
            let order: Vec<usize> = (0..10).map(|i| (i * stride) % 10).collect();
            for n in 0..=order.len() {
                let history: Vec<Guess> = order[..n].iter().map(|idx| guess_at(&c, *idx)).collect();
                if let Ok(hint) = select_hint(&c, &history) {
                    assert!(
                        history.iter().all(|g| g.word != hint.word),
                        "hint {} was already guessed (history={:?})",
                        hint.word,
                        &order[..n],
                    );
                    assert!(hint.is_hint_eligible);
                }
            }
        }
    }

    #[test]
    fn test_parse_hint_candidates() {
        let parsed = parse_hint_candidates("word,similarity,eligible,definition\nOcean,1.0,0,\nsea,0.8,1,a body of salt water\nbad,x,1\n");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].word, "ocean");
        assert!(!parsed[0].is_hint_eligible);
        assert_eq!(parsed[1].definition.as_deref(), Some("a body of salt water"));
    }
}
