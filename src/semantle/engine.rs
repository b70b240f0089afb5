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

use std::sync::Arc;
use thiserror::Error;
use super::{
    cache::*, clock::*, config::*, data::*, game::*, hint::*, prefetch::*, prelude::*, rank::*,
    resolver::*, score, store::*,
};

// used to normalize when no ranked row has been loaded yet
const FALLBACK_BOUNDS: (SimilarityFloat, SimilarityFloat) = (1.0, 0.0);

#[derive(Error, Debug)]
pub enum OpenErr {
    #[error("unable to set up http client: {0}")]
    Http(#[from] FetchErr),
}

///
/// One game session's view of the lookup engine: the cache, the loader, the in-flight table, and
/// the challenge being played, bundled behind the operations the game UI needs.
///
/// Nothing here is process-global. Two Engines built from separate parts share nothing, and two
/// Engines built over the same DurableStore share only what has been persisted.
///
pub struct Engine {
    config: EngineConfig,
    fetcher: ShardFetcher,
    resolver: GuessResolver,
    prefetch: PrefetchScheduler,
    store: Arc<dyn DurableStore>,
    clock: Arc<dyn Clock>,
}

impl Engine {
    pub fn with_parts(
        config: EngineConfig,
        source: Arc<dyn TextSource>,
        store: Arc<dyn DurableStore>,
        clock: Arc<dyn Clock>,
        challenge_id: u32,
    ) -> Self {
        let cache = ShardCache::new(store.clone(), config.cache_ttl(), clock.clone());
        let loader = ShardLoader::new(source, config.base_url(), clock.clone());
        let fetcher = ShardFetcher::new(cache, loader);
        Self {
            resolver: GuessResolver::new(fetcher.clone(), challenge_id),
            prefetch: PrefetchScheduler::new(fetcher.clone()),
            fetcher,
            config,
            store,
            clock,
        }
    }

    ///
    /// Builds an Engine over HTTP and the system clock, with the durable tier in config.cache_dir
    /// (or in memory when there isn't one), and records the new session.
    ///
    pub async fn open(config: EngineConfig, challenge_id: u32) -> Result<Self, OpenErr> {
        let source = Arc::new(HttpTextSource::new(config.fetch_timeout())?);
        let store: Arc<dyn DurableStore> = match &config.cache_dir {
            Some(dir) => Arc::new(FileStore::new(dir.clone())),
            None => Arc::new(MemoryStore::default()),
        };

        let out = Self::with_parts(config, source, store, Arc::new(SystemClock), challenge_id);
        out.start_session().await;
        Ok(out)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn challenge_id(&self) -> u32 {
        self.resolver.challenge_id()
    }

    pub fn cache(&self) -> &ShardCache {
        self.fetcher.cache()
    }

    ///
    /// Points the session metadata at this Engine's challenge, returning the pointer it replaced.
    ///
    /// The memory tier of a new Engine is always empty. Shards of an older challenge are left in
    /// the durable tier to expire on their own.
    ///
    pub async fn start_session(&self) -> Option<SessionRecord> {
        let previous = match self.store.read(Table::Sessions, CURRENT_SESSION_KEY).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<SessionRecord>(&bytes) {
                Ok(record) => Some(record),
                Err(err) => {
                    log::warn!("ignoring unreadable session record: {}", err);
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                log::warn!("unable to read session record: {}", err);
                None
            }
        };

        let current = SessionRecord {
            challenge_id: self.challenge_id(),
            started_at_ms: self.clock.now_ms(),
        };
        match previous {
            Some(prev) if prev.challenge_id != current.challenge_id => log::info!(
                "starting challenge {} (previous session played {})",
                current.challenge_id,
                prev.challenge_id
            ),
            _ => log::info!("starting challenge {}", current.challenge_id),
        }

        let write = match serde_json::to_vec(&current) {
            Ok(bytes) => self.store.write(Table::Sessions, CURRENT_SESSION_KEY, bytes).await,
            Err(err) => Err(err.into()),
        };
        if let Err(err) = write {
            log::warn!("unable to record session: {}", err);
        }

        previous
    }

    /// See GuessResolver::resolve
    pub async fn resolve_guess(&self, text: &str) -> Option<Resolution> {
        self.resolver.resolve(text).await
    }

    /// See PrefetchScheduler::preload
    pub async fn preload_shards(&self, challenge_id: u32, letters: &[char], concurrency: usize) {
        self.prefetch.preload(challenge_id, letters, concurrency).await
    }

    pub fn is_shard_warm(&self, challenge_id: u32, letter: char) -> bool {
        self.cache().is_warm(&ShardKey::new(challenge_id, letter))
    }

    /// See PrefetchScheduler::preload_order
    pub async fn get_preload_order(&self, challenge_id: u32) -> Vec<char> {
        self.prefetch.preload_order(challenge_id).await
    }

    /// Preloads every shard of the current challenge, most likely letters first
    pub async fn warm_up(&self) {
        let challenge_id = self.challenge_id();
        let order = self.get_preload_order(challenge_id).await;
        self.preload_shards(challenge_id, &order, self.config.preload_concurrency())
            .await
    }

    pub fn select_hint<'a>(
        &self,
        candidates: &'a [HintCandidate],
        previous_guesses: &[Guess],
    ) -> Result<&'a HintCandidate, HintErr> {
        select_hint(candidates, previous_guesses)
    }

    pub fn normalize_similarity(
        &self,
        closest: SimilarityFloat,
        furthest: SimilarityFloat,
        target: SimilarityFloat,
    ) -> u8 {
        score::normalize_similarity(closest, furthest, target)
    }

    pub fn compute_progress(&self, guesses: &[Guess], window_size: usize) -> u8 {
        score::compute_progress(guesses, window_size)
    }

    /// compute_progress over the configured window
    pub fn progress(&self, history: &GuessHistory) -> u8 {
        history.progress(self.config.progress_window)
    }

    ///
    /// The (closest, furthest) similarity of the ranked words in the current challenge's warm
    /// shards. This widens as more shards load, so it's best read after warm_up.
    ///
    pub fn similarity_bounds(&self) -> Option<(SimilarityFloat, SimilarityFloat)> {
        let challenge_id = self.challenge_id();
        let shards: Vec<Arc<ShardMap>> = default_letter_order()
            .filter_map(|letter| self.cache().get_memory(&ShardKey::new(challenge_id, letter)))
            .collect();

        score::similarity_bounds(shards.iter().flat_map(|shard| shard.rows()))
    }

    ///
    /// Resolves a player's guess and records it in history. Ok(None) means the word isn't known
    /// (yet). A word which is already in history is rejected before any lookup happens.
    ///
    pub async fn guess(&self, history: &mut GuessHistory, text: &str) -> Result<Option<Guess>, GameErr> {
        let word = normalize_guess_word(text);
        if history.contains(&word) {
            return Err(GameErr::AlreadyGuessed(word));
        }

        let resolution = match self.resolve_guess(&word).await {
            Some(resolution) => resolution,
            None => return Ok(None),
        };
        let bounds = self.similarity_bounds().unwrap_or(FALLBACK_BOUNDS);
        let guess = Guess::from_resolution(&resolution, bounds, self.clock.now_ms(), false);
        Ok(Some(history.record(guess)?.clone()))
    }

    ///
    /// Picks the next hint from candidates (sorted closest first) and records it in history.
    ///
    pub fn take_hint(&self, history: &mut GuessHistory, candidates: &[HintCandidate]) -> Result<Guess, HintErr> {
        let idx = {
            let hint = select_hint(candidates, history.guesses())?;
            candidates
                .iter()
                .position(|c| std::ptr::eq(c, hint))
                .ok_or(HintErr::NoHintsRemaining)?
        };
        let hint = &candidates[idx];

        let resolution = Resolution {
            word: hint.word.clone(),
            similarity: hint.similarity,
            rank: Rank::Ranked(idx as u32),
        };
        let bounds = self.similarity_bounds().unwrap_or(FALLBACK_BOUNDS);
        let guess = Guess::from_resolution(&resolution, bounds, self.clock.now_ms(), true);
        log::debug!("giving hint {:?} (candidate {})", guess.word, idx);
        Ok(history.record(guess)?.clone())
    }

    /// Drops every cached shard, in memory and durably
    pub async fn clear_cache(&self) {
        self.cache().clear().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantle::testing::*;

    const DAY_MS: i64 = 24 * 60 * 60 * 1000;

    fn config() -> EngineConfig {
        EngineConfig {
            base_url: BASE_URL.to_string(),
            preload_concurrency: 2,
            progress_window: 3,
            ..EngineConfig::default()
        }
    }

    fn source() -> FakeSource {
        FakeSource::default()
            .with_shard(11, 'a', &shard_csv(&[("apple", 0.9, Some(1)), ("anvil", 0.05, None)]))
            .with_shard(11, 'b', &shard_csv(&[("banana", 0.5, Some(500)), ("bread", 0.1, Some(999))]))
            .with_shard(11, 'c', &shard_csv(&[("cherry", 0.3, Some(700))]))
            .with_frequency_reference(11, "word,frequency\ncherry,0.9\nbanana,0.5\n")
    }

    fn engine(source: &FakeSource, store: Arc<MemoryStore>, clock: Arc<ManualClock>, challenge_id: u32) -> Engine {
        Engine::with_parts(config(), Arc::new(source.clone()), store, clock, challenge_id)
    }

    #[tokio::test]
    async fn test_session_pointer() {
        let store = Arc::new(MemoryStore::default());
        let clock = Arc::new(ManualClock::new(DAY_MS));
        let source = source();

        assert_eq!(engine(&source, store.clone(), clock.clone(), 10).start_session().await, None);
        clock.advance_ms(DAY_MS);
        let previous = engine(&source, store.clone(), clock.clone(), 11).start_session().await;
        assert_eq!(previous, Some(SessionRecord { challenge_id: 10, started_at_ms: DAY_MS }));
        assert_eq!(store.len(Table::Sessions), 1);
    }

    #[tokio::test]
    async fn test_warm_up_follows_reference() {
        let source = source();
        let engine = engine(&source, Arc::new(MemoryStore::default()), Arc::new(ManualClock::new(0)), 11);

        assert_eq!(&engine.get_preload_order(11).await[..2], &['c', 'b']);
        engine.warm_up().await;
        for letter in ['a', 'b', 'c'] {
            assert!(engine.is_shard_warm(11, letter), "letter={}", letter);
        }
        assert!(!engine.is_shard_warm(11, 'z'), "missing shards are never warm");
        assert_eq!(engine.similarity_bounds(), Some((0.9, 0.1)));
    }

    #[tokio::test]
    async fn test_guess_flow() {
        let source = source();
        let engine = engine(&source, Arc::new(MemoryStore::default()), Arc::new(ManualClock::new(0)), 11);
        engine.warm_up().await;
        let mut history = GuessHistory::default();

        let banana = engine.guess(&mut history, "Banana").await.unwrap().unwrap();
        assert_eq!(banana.rank, Rank::Ranked(500));
        assert_eq!(banana.normalized_similarity, 50);

        assert_eq!(engine.guess(&mut history, "durian").await, Ok(None));
        assert_eq!(
            engine.guess(&mut history, " BANANA").await,
            Err(GameErr::AlreadyGuessed("banana".to_string()))
        );

        engine.guess(&mut history, "cherry").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(engine.progress(&history), 38, "mean of 50 and 25");
    }

    #[tokio::test]
    async fn test_take_hint() {
        let source = source();
        let engine = engine(&source, Arc::new(MemoryStore::default()), Arc::new(ManualClock::new(0)), 11);
        let candidates = parse_hint_candidates("apple,0.9,0\nbanana,0.5,1\ncherry,0.3,1\nbread,0.1,1\n");
        let mut history = GuessHistory::default();

        let first = engine.take_hint(&mut history, &candidates).unwrap();
        assert_eq!(first.word, "bread");
        assert!(first.is_hint);
        assert_eq!(first.rank, Rank::Ranked(3));

        assert_eq!(engine.take_hint(&mut history, &candidates).unwrap().word, "banana");
        assert_eq!(engine.take_hint(&mut history, &candidates).unwrap().word, "cherry");
        assert_eq!(engine.take_hint(&mut history, &candidates), Err(HintErr::NoHintsRemaining));
        assert_eq!(engine.progress(&history), 0, "hints never count as progress");
    }

    #[tokio::test]
    async fn test_clear_cache() {
        let source = source();
        let store = Arc::new(MemoryStore::default());
        let engine = engine(&source, store.clone(), Arc::new(ManualClock::new(0)), 11);
        assert!(engine.resolve_guess("apple").await.is_some());
        assert!(!store.is_empty(Table::Shards));

        engine.clear_cache().await;
        assert!(!engine.is_shard_warm(11, 'a'));
        assert!(store.is_empty(Table::Shards));
    }

    #[test]
    fn test_stateless_operations() {
        let source = source();
        let engine = engine(&source, Arc::new(MemoryStore::default()), Arc::new(ManualClock::new(0)), 11);
        assert_eq!(engine.normalize_similarity(0.8, 0.2, 0.5), 50);
        assert_eq!(engine.compute_progress(&[], 5), 0);
        assert_eq!(engine.select_hint(&[], &[]), Err(HintErr::NoHintsRemaining));
    }
}
