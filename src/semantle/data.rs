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

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use instant::Instant;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use super::{clock::*, prelude::*, rank::*};

///
/// Identifies one partition of the similarity table: every word of one challenge which starts
/// with one letter.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShardKey {
    pub challenge_id: u32,
    pub letter: char,
}

impl ShardKey {
    pub fn new(challenge_id: u32, letter: char) -> Self {
        Self {
            challenge_id,
            letter: letter.to_ascii_lowercase(),
        }
    }

    /// The composite key used by the durable store: "{challenge_id}-{letter}"
    pub fn storage_key(&self) -> String {
        format!("{}-{}", self.challenge_id, self.letter)
    }
}

impl Display for ShardKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.challenge_id, self.letter)
    }
}

/// One row of the similarity table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupRow {
    /// lower-cased word, the key of the row within its shard
    pub word: String,
    /// raw (cosine) similarity to the answer, in [-1, 1]
    pub similarity: SimilarityFloat,
    pub rank: Rank,
}

///
/// Every row of one shard, keyed by word.
///
/// A ShardMap has no mutating methods on purpose. When a shard is refreshed a whole new ShardMap
/// replaces the old one (the cache hands them out behind an Arc).
///
#[derive(Debug, Clone, PartialEq)]
pub struct ShardMap {
    rows: HashMap<String, LookupRow>,
    loaded_at_ms: i64,
}

impl ShardMap {
    pub fn new<I>(rows: I, loaded_at_ms: i64) -> Self
    where
        I: IntoIterator<Item = LookupRow>,
    {
        Self {
            rows: rows.into_iter().map(|row| (row.word.clone(), row)).collect(),
            loaded_at_ms,
        }
    }

    /// Consumes this map, producing the same rows stamped with a new load time
    pub fn restamped(self, loaded_at_ms: i64) -> Self {
        Self {
            rows: self.rows,
            loaded_at_ms,
        }
    }

    pub fn get(&self, word: &str) -> Option<&LookupRow> {
        self.rows.get(word)
    }

    pub fn rows(&self) -> impl Iterator<Item = &LookupRow> {
        self.rows.values()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn loaded_at_ms(&self) -> i64 {
        self.loaded_at_ms
    }
}

/// One entry of the frequency reference shard
#[derive(Debug, Clone, PartialEq)]
pub struct WordFrequency {
    pub word: String,
    pub frequency: SimilarityFloat,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchErr {
    #[error("request to '{url}' failed: {reason}")]
    Request { url: String, reason: String },
    #[error("request to '{url}' returned status {status}")]
    Status { url: String, status: u16 },
    #[error("request to '{url}' timed out")]
    Timeout { url: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadShardErr {
    #[error("shard {key} is unavailable")]
    Fetch {
        key: ShardKey,
        #[source]
        source: FetchErr,
    },
    #[error("shard {0} contained no usable rows")]
    Empty(ShardKey),
}

///
/// The seam between the engine and whatever transport actually retrieves shard payloads.
///
/// Implementations must return an Err (never panic) on any failure, and should apply their own
/// timeout, since a hung fetch would otherwise hold a guess lookup forever.
///
#[async_trait]
pub trait TextSource: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchErr>;
}

/// TextSource over HTTP(S)
#[derive(Clone, Debug)]
pub struct HttpTextSource {
    client: reqwest::Client,
}

impl HttpTextSource {
    pub fn new(timeout: Duration) -> Result<Self, FetchErr> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| FetchErr::Request {
                url: String::default(),
                reason: err.to_string(),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TextSource for HttpTextSource {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchErr> {
        let wrap = |err: reqwest::Error| {
            if err.is_timeout() {
                FetchErr::Timeout { url: url.to_string() }
            } else {
                FetchErr::Request {
                    url: url.to_string(),
                    reason: err.to_string(),
                }
            }
        };

        let resp = self.client.get(url).send().await.map_err(wrap)?;
        if !resp.status().is_success() {
            return Err(FetchErr::Status {
                url: url.to_string(),
                status: resp.status().as_u16(),
            });
        }

        resp.text().await.map_err(wrap)
    }
}

///
/// Fetches and parses shards of the similarity table.
///
/// Shards live at "{base_url}/challenges/{challenge_id}/{letter}.csv" and the frequency reference
/// at "{base_url}/challenges/{challenge_id}/_hint.csv".
///
#[derive(Clone)]
pub struct ShardLoader {
    source: Arc<dyn TextSource>,
    base_url: String,
    clock: Arc<dyn Clock>,
}

impl ShardLoader {
    pub fn new(source: Arc<dyn TextSource>, base_url: &str, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            base_url: base_url.trim_end_matches('/').to_string(),
            clock,
        }
    }

    pub fn shard_url(&self, key: &ShardKey) -> String {
        self.resource_url(key.challenge_id, &key.letter.to_string())
    }

    pub fn frequency_reference_url(&self, challenge_id: u32) -> String {
        self.resource_url(challenge_id, HINT_SHARD_NAME)
    }

    fn resource_url(&self, challenge_id: u32, name: &str) -> String {
        format!("{}/challenges/{}/{}.csv", self.base_url, challenge_id, name)
    }

    ///
    /// Fetch and parse one shard. Malformed rows are dropped, but a shard which cannot be fetched,
    /// or which has no usable rows at all, is an error (the caller decides whether to retry).
    ///
    pub async fn load(&self, key: ShardKey) -> Result<ShardMap, LoadShardErr> {
        let url = self.shard_url(&key);
        let start_at = Instant::now();
        let text = self
            .source
            .fetch_text(&url)
            .await
            .map_err(|source| LoadShardErr::Fetch { key, source })?;

        let rows = parse_shard_rows(&text);
        if rows.is_empty() {
            return Err(LoadShardErr::Empty(key));
        }

        log::debug!(
            "loaded shard {} ({} rows) in {:.02}s",
            key,
            rows.len(),
            start_at.elapsed().as_secs_f64()
        );
        Ok(ShardMap::new(rows, self.clock.now_ms()))
    }

    ///
    /// Fetch the optional word frequency reference. Any failure is logged and reported as None:
    /// this data only affects preload ordering, it must never block a game.
    ///
    pub async fn load_frequency_reference(&self, challenge_id: u32) -> Option<Vec<WordFrequency>> {
        let url = self.frequency_reference_url(challenge_id);
        match self.source.fetch_text(&url).await {
            Ok(text) => {
                let out = parse_frequency_rows(&text);
                if out.is_empty() {
                    log::warn!("frequency reference for challenge {} has no rows", challenge_id);
                    None
                } else {
                    Some(out)
                }
            }
            Err(err) => {
                log::warn!("no frequency reference for challenge {}: {}", challenge_id, err);
                None
            }
        }
    }
}

///
/// Parses the text of one shard. Each line is expected to contain 3 comma separated fields:
///
/// * the word (any case, it is lower-cased here)
/// * its raw similarity (float in [-1, 1])
/// * its rank (non-negative integer where 0 is the answer itself, or blank when unranked)
///
/// A header line (or any line whose similarity isn't a number) is skipped, as is any other line
/// which doesn't fit the schema.
///
pub fn parse_shard_rows(text: &str) -> Vec<LookupRow> {
    let mut skipped = 0usize;
    let out: Vec<LookupRow> = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let row = parse_shard_row(line);
            if row.is_none() {
                skipped += 1;
            }
            row
        })
        .collect();

    // the header is always "skipped" so only complain when something else was dropped
    if skipped > 1 {
        log::debug!("skipped {} malformed shard lines", skipped);
    }

    out
}

fn parse_shard_row(line: &str) -> Option<LookupRow> {
    let mut parts = line.splitn(3, ',');

    let word = normalize_guess_word(parts.next()?);
    if word.is_empty() {
        return None;
    }

    let similarity = parts.next()?.trim().parse::<SimilarityFloat>().ok()?;
    if !similarity.is_finite() || !(-1.0..=1.0).contains(&similarity) {
        return None;
    }

    // a missing rank column is treated the same as a blank one
    let rank = match parts.next().map(str::trim) {
        None | Some("") => Rank::Unranked,
        Some(raw) => Rank::Ranked(raw.parse::<u32>().ok()?),
    };

    Some(LookupRow {
        word,
        similarity,
        rank,
    })
}

///
/// Parses the frequency reference: "word,frequency" on each line, header and malformed lines are
/// skipped.
///
pub fn parse_frequency_rows(text: &str) -> Vec<WordFrequency> {
    text.lines()
        .filter_map(|line| {
            let (word, frequency) = line.split_once(',')?;
            let word = normalize_guess_word(word);
            let frequency = frequency.trim().parse::<SimilarityFloat>().ok()?;
            if word.is_empty() || !frequency.is_finite() || frequency < 0.0 {
                return None;
            }
            Some(WordFrequency { word, frequency })
        })
        .collect()
}
