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

// This file holds the constants that define how the guess engine behaves out of the box.
//
// Most of these can be overridden at runtime through EngineConfig, the values here are only the
// defaults.

use std::time::Duration;

// all similarity math is done in this type (raw similarity is cosine similarity in [-1, 1])
pub type SimilarityFloat = f64;

// the reserved shard name which holds word frequency data, used only to order preloading
pub const HINT_SHARD_NAME: &str = "_hint";

// letters ordered roughly by how many english words start with them. Used when no frequency
// reference is available, and to place letters the reference never mentions.
pub const DEFAULT_LETTER_ORDER: &str = "scpadbmtrfhgelwiounvkjqyzx";

// shards for a given challenge never change, so they can be kept for a few days
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3 * 24 * 60 * 60);

// how long a single shard fetch may take before we give up and report "not found yet"
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

// how many shard fetches the prefetch scheduler keeps in flight
pub const DEFAULT_PRELOAD_CONCURRENCY: usize = 4;

// how many of the most recent (non hint) guesses feed into the progress signal
pub const DEFAULT_PROGRESS_WINDOW: usize = 5;

// the normalized similarity scale is [0, NORMALIZED_MAX]
pub const NORMALIZED_MAX: u8 = 100;

/// Returns the letters of DEFAULT_LETTER_ORDER, in order
pub fn default_letter_order() -> impl Iterator<Item = char> {
    DEFAULT_LETTER_ORDER.chars().filter(char::is_ascii_lowercase)
}

///
/// Given some raw input, clean it up such that it might be a canonical guess word. This trims any
/// surrounding whitespace and lower-cases the text.
///
/// You should always verify that the output of this function passes is_plausible_word.
///
pub fn normalize_guess_word(raw: &str) -> String {
    raw.trim().to_lowercase()
}

///
/// Checks whether a (normalized) string is plausibly a single word: non-empty, starting with a
/// lowercase ascii letter, and made only of letters (apostrophes and hyphens are tolerated after
/// the first character).
///
pub fn is_plausible_word(word: &str) -> bool {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() => {
            chars.all(|c| c.is_ascii_lowercase() || c == '\'' || c == '-')
        }
        _ => false,
    }
}

/// The shard letter for a canonical word (the first character), if it has one
pub fn shard_letter(word: &str) -> Option<char> {
    word.chars().next().filter(char::is_ascii_lowercase)
}
