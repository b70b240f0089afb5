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

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

///
/// The value used for "unranked" at the serialization boundary (durable records, DTOs handed to
/// session logic). Inside the engine this never appears, Rank::Unranked is used instead.
///
pub const UNRANKED_SENTINEL: i64 = -1;

///
/// The closeness position of a word within a challenge's similarity ranking.
///
///   * Ranked(n) = the word is the n-th closest word to the answer
///   * Unranked = the word is not close enough to have a rank at all
///
/// Ordering is by closeness: a smaller rank is "less than" a larger one, and Unranked is greater
/// than every Ranked value so that sorting ascending puts the closest words first.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rank {
    Ranked(u32),
    Unranked,
}

impl Rank {
    /// Converts from the wire/storage representation, where any negative value means unranked
    pub fn from_sentinel(raw: i64) -> Self {
        match u32::try_from(raw) {
            Ok(n) => Rank::Ranked(n),
            Err(_) => Rank::Unranked,
        }
    }

    /// Converts back to the wire/storage representation
    pub fn to_sentinel(self) -> i64 {
        match self {
            Rank::Ranked(n) => n as i64,
            Rank::Unranked => UNRANKED_SENTINEL,
        }
    }

    /// Unwraps the numeric rank, if there is one
    pub fn get(self) -> Option<u32> {
        match self {
            Rank::Ranked(n) => Some(n),
            Rank::Unranked => None,
        }
    }

    pub fn is_ranked(self) -> bool {
        matches!(self, Rank::Ranked(_))
    }
}

impl Default for Rank {
    fn default() -> Self {
        Rank::Unranked
    }
}

impl From<Option<u32>> for Rank {
    fn from(other: Option<u32>) -> Self {
        other.map(Rank::Ranked).unwrap_or(Rank::Unranked)
    }
}

impl Ord for Rank {
    fn cmp(&self, other: &Self) -> Ordering {
        use Rank::*;
        match (self, other) {
            (Ranked(a), Ranked(b)) => a.cmp(b),
            (Ranked(_), Unranked) => Ordering::Less,
            (Unranked, Ranked(_)) => Ordering::Greater,
            (Unranked, Unranked) => Ordering::Equal,
        }
    }
}

impl PartialOrd for Rank {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for Rank {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Rank::Ranked(n) => write!(f, "{}", n),
            Rank::Unranked => f.write_str("unranked"),
        }
    }
}

// serialized as the plain integer sentinel, so stored records stay compatible with other readers
impl Serialize for Rank {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.to_sentinel())
    }
}

impl<'de> Deserialize<'de> for Rank {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Rank::from_sentinel(i64::deserialize(deserializer)?))
    }
}
