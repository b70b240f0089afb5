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

// Fakes shared by the unit tests of the engine modules.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use parking_lot::Mutex;
use super::data::*;

pub const BASE_URL: &str = "https://cdn.test";

///
/// A TextSource serving canned payloads, which records every request it receives and the peak
/// number of requests it had in flight at once.
///
#[derive(Clone, Default)]
pub struct FakeSource {
    payloads: Arc<Mutex<HashMap<String, String>>>,
    requests: Arc<Mutex<Vec<String>>>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

impl FakeSource {
    pub fn with_shard(self, challenge_id: u32, letter: char, text: &str) -> Self {
        self.with_payload(&format!("{}/challenges/{}/{}.csv", BASE_URL, challenge_id, letter), text)
    }

    pub fn with_frequency_reference(self, challenge_id: u32, text: &str) -> Self {
        self.with_payload(&format!("{}/challenges/{}/_hint.csv", BASE_URL, challenge_id), text)
    }

    pub fn with_payload(self, url: &str, text: &str) -> Self {
        self.payloads.lock().insert(url.to_string(), text.to_string());
        self
    }

    /// Every fetch sleeps this long before answering, so that concurrent fetches overlap
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn remove_payload(&self, url: &str) {
        self.payloads.lock().remove(url);
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests_for(&self, url: &str) -> usize {
        self.requests.lock().iter().filter(|r| r.as_str() == url).count()
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextSource for FakeSource {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchErr> {
        self.requests.lock().push(url.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let out = self
            .payloads
            .lock()
            .get(url)
            .cloned()
            .ok_or_else(|| FetchErr::Status {
                url: url.to_string(),
                status: 404,
            });

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        out
    }
}

/// Builds a shard payload from (word, similarity, rank) triples
pub fn shard_csv(rows: &[(&str, f64, Option<u32>)]) -> String {
    let mut out = String::from("word,similarity,rank\n");
    for (word, similarity, rank) in rows {
        let rank = rank.map(|r| r.to_string()).unwrap_or_default();
        out.push_str(&format!("{},{},{}\n", word, similarity, rank));
    }
    out
}
