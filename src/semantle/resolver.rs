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
use std::sync::Arc;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use super::{cache::*, data::*, prelude::*, rank::*};

type InflightLoad = Shared<BoxFuture<'static, Option<Arc<ShardMap>>>>;

///
/// Gets shards into the cache, making sure that there is never more than one outstanding load
/// for the same ShardKey.
///
/// Everything which wants a shard (guess lookups and the prefetch scheduler) goes through here.
/// Without the coalescing, every keystroke on an uncached letter would start another fetch of
/// the same shard.
///
/// Cloning a ShardFetcher produces another handle to the same in-flight table.
///
#[derive(Clone)]
pub struct ShardFetcher {
    cache: ShardCache,
    loader: ShardLoader,
    inflight: Arc<Mutex<HashMap<ShardKey, InflightLoad>>>,
}

impl ShardFetcher {
    pub fn new(cache: ShardCache, loader: ShardLoader) -> Self {
        Self {
            cache,
            loader,
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn cache(&self) -> &ShardCache {
        &self.cache
    }

    pub fn loader(&self) -> &ShardLoader {
        &self.loader
    }

    /// How many distinct shards are being loaded right now
    pub fn inflight_len(&self) -> usize {
        self.inflight.lock().len()
    }

    ///
    /// Returns the shard for key, from memory if possible, otherwise from the durable tier or the
    /// network (in that order). None means the shard could not be had right now; the failure has
    /// already been logged and the next call will try again.
    ///
    pub async fn ensure(&self, key: ShardKey) -> Option<Arc<ShardMap>> {
        // memory hits never suspend
        if let Some(shard) = self.cache.get_memory(&key) {
            return Some(shard);
        }

        self.join_or_start(key).await
    }

    fn join_or_start(&self, key: ShardKey) -> InflightLoad {
        let mut inflight = self.inflight.lock();
        if let Some(existing) = inflight.get(&key) {
            log::debug!("joining in-flight load of shard {}", key);
            return existing.clone();
        }

        let this = self.clone();
        let load = async move {
            let out = this.fill(key).await;
            // this future is the only entry for key, so it's safe to just remove whatever is there
            this.inflight.lock().remove(&key);
            out
        }
        .boxed()
        .shared();

        inflight.insert(key, load.clone());
        load
    }

    async fn fill(&self, key: ShardKey) -> Option<Arc<ShardMap>> {
        if let Some(shard) = self.cache.get(&key).await {
            return Some(shard);
        }

        match self.loader.load(key).await {
            Ok(shard) => Some(self.cache.put(key, shard).await),
            Err(err) => {
                log::warn!("{}", err);
                None
            }
        }
    }
}

/// A guess which was found in the similarity table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub word: String,
    pub similarity: SimilarityFloat,
    pub rank: Rank,
}

impl From<&LookupRow> for Resolution {
    fn from(other: &LookupRow) -> Self {
        Self {
            word: other.word.clone(),
            similarity: other.similarity,
            rank: other.rank,
        }
    }
}

///
/// Turns free text guesses into rows of the current challenge's similarity table.
///
pub struct GuessResolver {
    fetcher: ShardFetcher,
    challenge_id: u32,
}

impl GuessResolver {
    pub fn new(fetcher: ShardFetcher, challenge_id: u32) -> Self {
        Self {
            fetcher,
            challenge_id,
        }
    }

    pub fn challenge_id(&self) -> u32 {
        self.challenge_id
    }

    ///
    /// Looks up a guess.
    ///
    /// None is a normal outcome, and covers all of these cases:
    ///   * the text is empty, or isn't plausibly a single word (no network work is done)
    ///   * the word isn't in the table
    ///   * the word's shard couldn't be loaded right now (a later call will retry)
    ///
    /// Callers can't (and shouldn't) tell these apart: a flaky network must look exactly like
    /// "word not recognized yet".
    ///
    pub async fn resolve(&self, raw: &str) -> Option<Resolution> {
        let word = normalize_guess_word(raw);
        if !is_plausible_word(&word) {
            log::debug!("rejected guess input {:?}", raw);
            return None;
        }

        let letter = shard_letter(&word)?;
        let shard = self.fetcher.ensure(ShardKey::new(self.challenge_id, letter)).await?;
        shard.get(&word).map(Resolution::from)
    }
}
