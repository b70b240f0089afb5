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
use std::str::Utf8Error;
use lazy_static::lazy_static;
use rust_embed::RustEmbed;
use rust_stemmers::{Algorithm, Stemmer};
use thiserror::Error;
use super::{data::WordFrequency, prelude::*};

// Stores static word lists which are embedded into the binary
pub const EMBED_DATA_DIRECTORY: &str = "txt_data/";
pub const STOP_WORDS_FILE_NAME: &str = "stop_words.txt";
pub const FIRST_NAMES_FILE_NAME: &str = "first_names.txt";
pub const PROFANITY_FILE_NAME: &str = "profanity.txt";
pub const PROFANITY_SUBSTRINGS_FILE_NAME: &str = "profanity_substrings.txt";

// how many words the generated hint list keeps
pub const HINT_LIST_SIZE: usize = 20000;

// a hint must be longer than this
pub const MIN_HINT_LEN: usize = 2;

// words ending with these are (usually) inflected, and the base form makes a better hint
const INFLECTED_SUFFIXES: [&str; 5] = ["ed", "ing", "s", "es", "ies"];

// every profane base word is also blocked glued onto each of these...
const PROFANITY_PREFIXES: [&str; 17] = [
    "dumb", "horse", "bull", "chicken", "jack", "ass", "mother", "dog", "pig", "dick", "cock",
    "pussy", "cunt", "butt", "cum", "jizz", "circle",
];

// ...followed by each of these...
const PROFANITY_SUFFIXES: [&str; 17] = [
    "hole", "head", "face", "wipe", "wad", "stain", "bag", "sucker", "licker", "lover", "fucker",
    "eating", "sucking", "jockey", "monkey", "breath", "brain",
];

// ...and with each of these endings
const PROFANITY_VARIATIONS: [&str; 10] = ["ing", "er", "ed", "y", "ier", "iest", "in", "ez", "es", "s"];

lazy_static! {
    pub static ref WORD_LISTS: WordLists = WordLists::read().unwrap_or_else(|err| {
        log::warn!("unable to read embedded word lists: {}", err);
        WordLists::default()
    });

    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
}

#[derive(RustEmbed)]
#[folder = "txt_data/"]
struct RawData;

/// Holds all of the data represented by the embedded text files
#[derive(Clone, Debug, Default)]
pub struct WordLists {
    /// common function words which never make useful hints ("the", "about", ...)
    pub stop_words: HashSet<String>,
    pub first_names: HashSet<String>,
    /// profane words along with their common compounds and variations
    pub profanity: HashSet<String>,
    pub profanity_substrings: Vec<String>,
}

#[derive(Error, Debug)]
pub enum LoadWordsErr {
    #[error("missing embedded file '{0}'")]
    MissingFile(&'static str),
    #[error(transparent)]
    EncodingError(#[from] Utf8Error),
}

impl WordLists {
    pub fn read() -> Result<Self, LoadWordsErr> {
        let mut profanity_substrings: Vec<String> =
            read_word_set(&retrieve_file_as_str(PROFANITY_SUBSTRINGS_FILE_NAME)?).into_iter().collect();
        profanity_substrings.sort();

        let out = Self {
            stop_words: read_word_set(&retrieve_file_as_str(STOP_WORDS_FILE_NAME)?),
            first_names: read_word_set(&retrieve_file_as_str(FIRST_NAMES_FILE_NAME)?),
            profanity: expand_profanity(&read_word_set(&retrieve_file_as_str(PROFANITY_FILE_NAME)?)),
            profanity_substrings,
        };
        log::debug!(
            "got {} stop words, {} first names, {} blocked words from data files",
            out.stop_words.len(),
            out.first_names.len(),
            out.profanity.len()
        );
        Ok(out)
    }

    pub fn is_profane(&self, word: &str) -> bool {
        self.profanity.contains(word) || self.profanity_substrings.iter().any(|s| word.contains(s.as_str()))
    }
}

fn retrieve_file_as_str(name: &'static str) -> Result<String, LoadWordsErr> {
    let f = RawData::get(name).ok_or(LoadWordsErr::MissingFile(name))?;
    Ok(std::str::from_utf8(&f.data)?.to_string())
}

/// One word per line, blank lines and '#' comments ignored
pub fn read_word_set(text: &str) -> HashSet<String> {
    text.lines()
        .map(normalize_guess_word)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect()
}

/// The base words, plus every prefix + base, base + suffix and base + variation compound
pub fn expand_profanity(base: &HashSet<String>) -> HashSet<String> {
    let mut out = base.clone();
    for word in base {
        out.extend(PROFANITY_PREFIXES.iter().map(|prefix| format!("{}{}", prefix, word)));
        out.extend(PROFANITY_SUFFIXES.iter().map(|suffix| format!("{}{}", word, suffix)));
        out.extend(PROFANITY_VARIATIONS.iter().map(|variation| format!("{}{}", word, variation)));
    }
    out
}

///
/// Decides whether a word is suitable to be handed out as a hint.
///
/// The embedded lists (stop words, first names, profanity) always apply. On top of those callers
/// can supply their own blocklist: whole words, plus substrings which disqualify any word
/// containing them.
///
#[derive(Clone, Debug, Default)]
pub struct HintFilter {
    pub blocked_words: HashSet<String>,
    pub blocked_substrings: Vec<String>,
}

impl HintFilter {
    pub fn new(blocked_words: HashSet<String>, blocked_substrings: Vec<String>) -> Self {
        Self {
            blocked_words,
            blocked_substrings,
        }
    }

    pub fn is_blocked(&self, word: &str) -> bool {
        self.blocked_words.contains(word)
            || self.blocked_substrings.iter().any(|s| word.contains(s.as_str()))
            || WORD_LISTS.is_profane(word)
    }

    pub fn is_hint_eligible(&self, word: &str) -> bool {
        let word = normalize_guess_word(word);
        word.len() > MIN_HINT_LEN
            && word.bytes().all(|b| b.is_ascii_lowercase())
            && !WORD_LISTS.stop_words.contains(&word)
            && !WORD_LISTS.first_names.contains(&word)
            && !self.is_blocked(&word)
            && is_base_form(&word)
    }
}

///
/// Whether a word is uninflected: the english snowball stemmer leaves it alone, and it doesn't
/// end like a past tense, gerund, or plural.
///
pub fn is_base_form(word: &str) -> bool {
    STEMMER.stem(word) == word && !INFLECTED_SUFFIXES.iter().any(|suffix| word.ends_with(suffix))
}

///
/// Builds a hint list: the eligible `allowed` words, most frequent first, truncated to `limit`.
///
pub fn build_hint_list(
    frequencies: &[WordFrequency],
    allowed: &HashSet<String>,
    filter: &HintFilter,
    limit: usize,
) -> Vec<WordFrequency> {
    let mut seen = HashSet::new();
    let mut out: Vec<WordFrequency> = frequencies
        .iter()
        .filter(|entry| allowed.contains(&entry.word))
        .filter(|entry| filter.is_hint_eligible(&entry.word))
        .filter(|entry| seen.insert(entry.word.clone()))
        .cloned()
        .collect();

    out.sort_by(|a, b| b.frequency.total_cmp(&a.frequency));
    out.truncate(limit);
    out
}
