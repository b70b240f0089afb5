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

use std::{io::{self, Write}, fs, path::{Path, PathBuf}, collections::HashSet};
use anyhow::{bail, Context};
use instant::Instant;
use semantle_site::{LOG_LEVEL, semantle::*};

const HINT_LIST_FILE_NAME: &str = "hint_list.csv";
const USAGE: &str = "usage: gen_hint_list <frequency.csv> <allowed_words.txt> <out_dir> [blocklist.txt]";

// a blocklist line starting with this blocks every word containing the rest of the line
const SUBSTRING_MARKER: char = '*';

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("RUST_LOG", LOG_LEVEL)).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 3 || args.len() > 4 {
        bail!(USAGE);
    }

    let start_at = Instant::now();
    let frequencies = parse_frequency_rows(&read_file(&args[0])?);
    let allowed = read_word_set(&read_file(&args[1])?);
    let out_dir = PathBuf::from(&args[2]);
    let filter = match args.get(3) {
        Some(path) => read_blocklist(&read_file(path)?),
        None => HintFilter::default(),
    };
    log::info!(
        "read {} frequencies, {} allowed words, {} blocked words and {} blocked substrings",
        frequencies.len(),
        allowed.len(),
        filter.blocked_words.len(),
        filter.blocked_substrings.len(),
    );

    fs::create_dir_all(&out_dir).with_context(|| format!("creating {}", out_dir.display()))?;

    let hints = build_hint_list(&frequencies, &allowed, &filter, HINT_LIST_SIZE);
    write_frequencies(&out_dir.join(HINT_LIST_FILE_NAME), &hints)?;

    let reference = frequency_reference(&frequencies, HINT_LIST_SIZE);
    write_frequencies(&out_dir.join(format!("{}.csv", HINT_SHARD_NAME)), &reference)?;

    log::info!(
        "done! wrote {} hints and {} reference words to {} in {:.02}s",
        hints.len(),
        reference.len(),
        out_dir.display(),
        start_at.elapsed().as_secs_f64(),
    );
    Ok(())
}

fn read_file(path: impl AsRef<Path>) -> anyhow::Result<String> {
    let path = path.as_ref();
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn read_blocklist(text: &str) -> HintFilter {
    let mut out = HintFilter::default();
    for entry in read_word_set(text) {
        match entry.strip_prefix(SUBSTRING_MARKER) {
            Some(substring) if !substring.is_empty() => out.blocked_substrings.push(substring.to_string()),
            Some(_) => {}
            None => {
                out.blocked_words.insert(entry);
            }
        }
    }
    out
}

// the raw most frequent words, which is what preload ordering wants
fn frequency_reference(frequencies: &[WordFrequency], limit: usize) -> Vec<WordFrequency> {
    let mut seen = HashSet::new();
    let mut out: Vec<WordFrequency> = frequencies
        .iter()
        .filter(|entry| is_plausible_word(&entry.word) && seen.insert(entry.word.as_str()))
        .cloned()
        .collect();

    out.sort_by(|a, b| b.frequency.total_cmp(&a.frequency));
    out.truncate(limit);
    out
}

fn write_frequencies(at: &Path, entries: &[WordFrequency]) -> io::Result<()> {
    let mut out = io::BufWriter::new(fs::File::options()
        .truncate(true)
        .create(true)
        .write(true)
        .open(at)?);

    writeln!(out, "word,frequency")?;
    for entry in entries {
        writeln!(out, "{},{}", entry.word, entry.frequency)?;
    }
    out.flush()
}
