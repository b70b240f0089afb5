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

use super::{data::LookupRow, game::*, prelude::*};

///
/// Maps a raw similarity onto the 0..=100 display scale, where `closest` maps to 100 and
/// `furthest` maps to 0. Anything outside of that range is clamped.
///
/// When closest == furthest there is no range to scale into, so the result is all or nothing:
/// 100 when the target reaches closest, 0 otherwise.
///
pub fn normalize_similarity(
    closest: SimilarityFloat,
    furthest: SimilarityFloat,
    target: SimilarityFloat,
) -> u8 {
    if closest == furthest {
        return if target >= closest { NORMALIZED_MAX } else { 0 };
    }

    let scaled = (100.0 * (target - furthest) / (closest - furthest)).round();
    if !scaled.is_finite() {
        return 0;
    }

    scaled.clamp(0.0, NORMALIZED_MAX as SimilarityFloat) as u8
}

///
/// A smoothed "how close am I" signal: the rounded mean normalized similarity of the last
/// `window_size` guesses, ignoring hints entirely (so taking hints never inflates progress).
///
/// Returns 0 when there is nothing to average.
///
pub fn compute_progress(guesses: &[Guess], window_size: usize) -> u8 {
    let real: Vec<u8> = guesses
        .iter()
        .filter(|g| !g.is_hint)
        .map(|g| g.normalized_similarity)
        .collect();

    let window = &real[real.len().saturating_sub(window_size)..];
    if window.is_empty() {
        return 0;
    }

    let total: u32 = window.iter().map(|v| *v as u32).sum();
    (total as SimilarityFloat / window.len() as SimilarityFloat).round() as u8
}

///
/// The (closest, furthest) similarities among ranked rows, which is what normalize_similarity
/// expects to scale against. None if there are no ranked rows.
///
pub fn similarity_bounds<'a, I>(rows: I) -> Option<(SimilarityFloat, SimilarityFloat)>
where
    I: IntoIterator<Item = &'a LookupRow>,
{
    rows.into_iter()
        .filter(|row| row.rank.is_ranked())
        .map(|row| row.similarity)
        .fold(None, |bounds, s| match bounds {
            None => Some((s, s)),
            Some((closest, furthest)) => Some((closest.max(s), furthest.min(s))),
        })
}
