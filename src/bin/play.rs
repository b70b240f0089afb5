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

use std::fs;
use anyhow::{bail, Context};
use tokio::io::{self, AsyncBufReadExt, BufReader};
use semantle_site::{LOG_LEVEL, semantle::*};

const USAGE: &str = "usage: play <config.toml | -> <challenge_id> [hint_candidates.csv]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("RUST_LOG", LOG_LEVEL)).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 || args.len() > 3 {
        bail!(USAGE);
    }

    let config = match args[0].as_str() {
        "-" => EngineConfig::default(),
        path => EngineConfig::load(path)?,
    }
    .with_env_overrides();
    let challenge_id: u32 = args[1].parse().with_context(|| format!("bad challenge id {:?}", args[1]))?;
    let candidates = match args.get(2) {
        Some(path) => parse_hint_candidates(&fs::read_to_string(path).with_context(|| format!("reading {}", path))?),
        None => Vec::new(),
    };

    let engine = Engine::open(config, challenge_id).await?;
    engine.warm_up().await;
    println!("challenge #{} ready. type a word, 'hint', or 'quit'", challenge_id);

    let mut history = GuessHistory::default();
    let mut lines = BufReader::new(io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let made = match line.trim() {
            "" => continue,
            "quit" => break,
            "hint" => match engine.take_hint(&mut history, &candidates) {
                Ok(hint) => Some(hint),
                Err(err) => {
                    println!("{}", err);
                    None
                }
            },
            text => match engine.guess(&mut history, text).await {
                Ok(Some(guess)) => Some(guess),
                Ok(None) => {
                    println!("I don't know the word {:?}", text);
                    None
                }
                Err(err) => {
                    println!("{}", err);
                    None
                }
            },
        };

        if let Some(guess) = made {
            print_guess(&guess, &engine, &history);
            if guess.rank == Rank::Ranked(0) {
                println!("you got it in {} guesses ({} hints)", history.len(), history.num_hints());
                break;
            }
        }
    }

    Ok(())
}

fn print_guess(guess: &Guess, engine: &Engine, history: &GuessHistory) {
    println!(
        "{} #{}: {} similarity={:.2} ({}/100) rank={} progress={}",
        if guess.is_hint { "hint" } else { "guess" },
        history.len(),
        guess.word,
        guess.similarity * 100.0,
        guess.normalized_similarity,
        guess.rank,
        engine.progress(history),
    );
}
