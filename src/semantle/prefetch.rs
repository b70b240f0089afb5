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

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use futures::stream::{self, StreamExt};
use instant::Instant;
use super::{data::*, prelude::*, resolver::*};

///
/// Warms shards ahead of the player's input.
///
/// It shares the ShardFetcher (and therefore the cache and in-flight table) with the GuessResolver,
/// so a guess that arrives while its shard is being prefetched simply waits for that load.
///
pub struct PrefetchScheduler {
    fetcher: ShardFetcher,
}

impl PrefetchScheduler {
    pub fn new(fetcher: ShardFetcher) -> Self {
        Self { fetcher }
    }

    ///
    /// Loads the shards for letters into the cache, keeping at most `concurrency` loads in flight.
    ///
    /// Letters are started in the order given. As soon as any load finishes (whether it worked or
    /// not) the next pending letter starts, so one slow shard doesn't hold up a whole batch.
    /// Letters already warm in memory are skipped without any network work, and a failed letter
    /// never stops the others.
    ///
    pub async fn preload(&self, challenge_id: u32, letters: &[char], concurrency: usize) {
        let concurrency = concurrency.max(1);
        let start_at = Instant::now();

        let mut seen = HashSet::with_capacity(letters.len());
        let mut skipped = 0usize;
        let pending: Vec<ShardKey> = letters
            .iter()
            .map(|letter| ShardKey::new(challenge_id, *letter))
            .filter(|key| key.letter.is_ascii_lowercase() && seen.insert(key.letter))
            .filter(|key| {
                let warm = self.fetcher.cache().is_warm(key);
                if warm {
                    skipped += 1;
                }
                !warm
            })
            .collect();

        let n_pending = pending.len();
        let failed = AtomicUsize::new(0);
        let failed = &failed;
        stream::iter(pending)
            .for_each_concurrent(concurrency, |key| async move {
                if self.fetcher.ensure(key).await.is_none() {
                    failed.fetch_add(1, Ordering::Relaxed);
                }
            })
            .await;

        let failed = failed.load(Ordering::Relaxed);
        log::debug!(
            "preloaded {} shards for challenge {} in {:.02}s ({} already warm, {} failed)",
            n_pending - failed,
            challenge_id,
            start_at.elapsed().as_secs_f64(),
            skipped,
            failed,
        );
    }

    ///
    /// Works out which letters to preload first for a challenge, using the challenge's frequency
    /// reference when it can be fetched and the default order otherwise.
    ///
    pub async fn preload_order(&self, challenge_id: u32) -> Vec<char> {
        let reference = self.fetcher.loader().load_frequency_reference(challenge_id).await;
        preload_order(reference.as_deref())
    }
}

///
/// Orders the alphabet by how likely a guess is to start with each letter: descending total
/// frequency of the reference words starting with that letter. Ties, and letters the reference
/// doesn't mention at all, fall back to DEFAULT_LETTER_ORDER.
///
pub fn preload_order(reference: Option<&[WordFrequency]>) -> Vec<char> {
    let mut totals: HashMap<char, SimilarityFloat> = HashMap::new();
    for entry in reference.unwrap_or_default() {
        if let Some(letter) = shard_letter(&entry.word) {
            *totals.entry(letter).or_default() += entry.frequency;
        }
    }

    // default order doubles as the tie breaker, so start from it and stable sort
    let mut out: Vec<char> = default_letter_order().collect();
    out.sort_by(|a, b| match (totals.get(a), totals.get(b)) {
        (Some(fa), Some(fb)) => fb.total_cmp(fa),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use crate::semantle::cache::*;
    use crate::semantle::clock::*;
    use crate::semantle::store::*;
    use crate::semantle::testing::*;

    const LETTERS: [char; 10] = ['a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j'];

    fn scheduler(source: &FakeSource) -> PrefetchScheduler {
        let clock = Arc::new(ManualClock::new(0));
        let cache = ShardCache::new(Arc::new(MemoryStore::default()), DEFAULT_CACHE_TTL, clock.clone());
        let loader = ShardLoader::new(Arc::new(source.clone()), BASE_URL, clock);
        PrefetchScheduler::new(ShardFetcher::new(cache, loader))
    }

    fn full_source() -> FakeSource {
        LETTERS.iter().fold(FakeSource::default(), |source, letter| {
            source.with_shard(3, *letter, &shard_csv(&[(format!("{}xyz", letter).as_str(), 0.1, None)]))
        })
    }

    #[tokio::test]
    async fn test_bounded_concurrency() {
        let source = full_source().with_delay(Duration::from_millis(10));
        let scheduler = scheduler(&source);

        scheduler.preload(3, &LETTERS, 3).await;
        assert_eq!(source.request_count(), LETTERS.len());
        assert_eq!(source.peak_in_flight(), 3, "should keep exactly 3 loads in flight, never more");
        for letter in LETTERS {
            assert!(scheduler.fetcher.cache().is_warm(&ShardKey::new(3, letter)));
        }
    }

    #[tokio::test]
    async fn test_follows_given_order() {
        let source = full_source();
        let scheduler = scheduler(&source);
        scheduler.preload(3, &['j', 'a', 'e'], 1).await;
        let requests = source.requests();
        let letters: Vec<&str> = requests.iter().map(|url| &url[url.len() - 5..url.len() - 4]).collect();
        assert_eq!(letters, vec!["j", "a", "e"]);
    }

    #[tokio::test]
    async fn test_skips_warm_letters() {
        let source = full_source();
        let scheduler = scheduler(&source);
        scheduler.preload(3, &['a', 'b'], 2).await;
        assert_eq!(source.request_count(), 2);

        scheduler.preload(3, &['a', 'b', 'b', 'c'], 2).await;
        assert_eq!(source.request_count(), 3, "only 'c' was cold");
    }

    #[tokio::test]
    async fn test_failures_do_not_abort() {
        let source = full_source();
        source.remove_payload(&format!("{}/challenges/3/b.csv", BASE_URL));
        let scheduler = scheduler(&source);

        scheduler.preload(3, &['a', 'b', 'c'], 1).await;
        assert!(scheduler.fetcher.cache().is_warm(&ShardKey::new(3, 'a')));
        assert!(!scheduler.fetcher.cache().is_warm(&ShardKey::new(3, 'b')));
        assert!(scheduler.fetcher.cache().is_warm(&ShardKey::new(3, 'c')));
    }

    #[test]
    fn test_preload_order_without_reference() {
        let expected: Vec<char> = default_letter_order().collect();
        assert_eq!(preload_order(None), expected);
    }

    #[test]
    fn test_preload_order_with_reference() {
        let reference = parse_frequency_rows("word,frequency\nzebra,0.5\nzero,0.25\nquiet,0.6\nsun,0.1\n");
        let order = preload_order(Some(reference.as_slice()));
        assert_eq!(&order[..3], &['z', 'q', 's']);
        // everything else keeps the default order
        let rest: Vec<char> = default_letter_order().filter(|c| !"zqs".contains(*c)).collect();
        assert_eq!(&order[3..], rest.as_slice());
    }

    #[tokio::test]
    async fn test_preload_order_fetches_reference() {
        let source = FakeSource::default().with_frequency_reference(3, "word,frequency\nxylophone,1.0\n");
        let order = scheduler(&source).preload_order(3).await;
        assert_eq!(order[0], 'x');
        assert_eq!(order.len(), 26);
    }
}
