use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

mod bot;
mod config;
mod data;
mod error;
mod model;

use bot::engine::{decide, random_input, DecisionResponse};
use bot::SituationInput;
use config::Config;
use data::DataBundle;
use model::ModelArtifact;

fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    let artifact = ModelArtifact::load(Path::new(&config.model_path))?;
    info!(
        "Model loaded: {} features from {}",
        artifact.features.len(),
        config.model_path
    );
    let bundle = DataBundle::load(Path::new(&config.data_dir), &artifact)?;

    if config.random {
        let input = random_input(&mut rand::thread_rng());
        info!("Generated random situation: {:?}", input);
        let response = decide(input, &bundle, &artifact.model)?;
        print_response(&response, config.json)?;
        return Ok(());
    }

    if let Some(path) = &config.situation {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read situation file {}", path))?;
        let input: SituationInput = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse situation file {}", path))?;
        let response = decide(input, &bundle, &artifact.model)?;
        print_response(&response, config.json)?;
        return Ok(());
    }

    println!("\n*** Hit CTRL-C to leave the program. ***\n");
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        let input = match read_situation(&mut lines)? {
            Some(input) => input,
            None => break, // stdin closed
        };
        match decide(input, &bundle, &artifact.model) {
            Ok(response) => print_response(&response, config.json)?,
            Err(e) => eprintln!("Could not evaluate situation: {}", e),
        }
        println!();
    }

    Ok(())
}

/// Prompt for the nine raw inputs. Returns `None` when stdin is exhausted.
fn read_situation<B: BufRead>(lines: &mut io::Lines<B>) -> Result<Option<SituationInput>> {
    macro_rules! ask {
        ($label:expr) => {
            match prompt(lines, $label)? {
                Some(v) => v,
                None => return Ok(None),
            }
        };
    }

    let down: i32 = ask!("Down: ");
    let yards_to_go: i32 = ask!("Yards to go: ");
    let yards_from_own_goal: i32 = ask!("Yards from own goal: ");
    let seconds_remaining: i32 = ask!("Seconds remaining in game: ");
    let score_differential: i32 = ask!("Offense's lead (can be negative): ");
    let offense_timeouts: i32 = ask!("Timeouts remaining, offense: ");
    let defense_timeouts: i32 = ask!("Timeouts remaining, defense: ");
    let point_spread: f64 = ask!("Spread for the offense (negative if favored, 0 if unknown): ");
    let dome: i32 = ask!("Is the game in a dome? 1 for yes, 0 for no: ");

    Ok(Some(SituationInput {
        down,
        yards_to_go,
        yards_from_own_goal,
        seconds_remaining,
        score_differential,
        offense_timeouts,
        defense_timeouts,
        point_spread,
        in_dome: dome != 0,
        fg_make_probability: None,
    }))
}

/// Ask until the answer parses; `None` when stdin closes.
fn prompt<B: BufRead, T: std::str::FromStr>(
    lines: &mut io::Lines<B>,
    label: &str,
) -> Result<Option<T>> {
    loop {
        print!("{}", label);
        io::stdout().flush().context("failed to flush stdout")?;
        let line = match lines.next() {
            Some(line) => line.context("failed to read stdin")?,
            None => return Ok(None),
        };
        match parse_answer(&line) {
            Some(value) => return Ok(Some(value)),
            None => eprintln!("Could not parse {:?}, try again.", line.trim()),
        }
    }
}

fn parse_answer<T: std::str::FromStr>(raw: &str) -> Option<T> {
    raw.trim().parse().ok()
}

fn print_response(response: &DecisionResponse, as_json: bool) -> Result<()> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(response)?);
        return Ok(());
    }

    let d = &response.decision;
    let p = &response.probabilities;
    println!("Recommendation: {}", d.best_play);
    println!("  pre-play win probability:   {:.3}", p.pre_play);
    println!(
        "  conversion probability:     {:.3} (breakeven punt {:.3}, kick {:.3})",
        d.conversion_probability, d.breakeven_punt, d.breakeven_fg
    );
    println!("  go-for-it expected WP:      {:.3}", d.go_for_it_ev);
    println!(
        "  field goal expected WP:     {:.3} (make probability {:.3})",
        d.field_goal_ev, d.fg_make_probability
    );
    println!("  punt WP:                    {:.3}", p.punt);
    println!(
        "  WP added by going for it:   {:+.3} vs {:?}",
        d.win_probability_added, d.kicking_option
    );
    match &d.historical {
        Some(h) => println!(
            "  coaches historically: went {:.0}%, punted {:.0}%, kicked {:.0}% (n={})",
            100.0 * h.go_for_it_rate,
            100.0 * h.punt_rate,
            100.0 * h.kick_rate,
            h.sample_size
        ),
        None => println!("  coaches historically: no comparable situations"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_answer_trims_whitespace() {
        assert_eq!(parse_answer::<i32>(" 4 \n"), Some(4));
        assert_eq!(parse_answer::<f64>("-3.5"), Some(-3.5));
    }

    #[test]
    fn parse_answer_rejects_garbage() {
        assert_eq!(parse_answer::<i32>("four"), None);
        assert_eq!(parse_answer::<i32>(""), None);
    }

    #[test]
    fn prompt_reprompts_until_parseable() {
        let input = b"garbage\n7\n" as &[u8];
        let mut lines = io::BufReader::new(input).lines();
        let value: Option<i32> = prompt(&mut lines, "").unwrap();
        assert_eq!(value, Some(7));
    }

    #[test]
    fn prompt_returns_none_on_closed_stdin() {
        let input = b"" as &[u8];
        let mut lines = io::BufReader::new(input).lines();
        let value: Option<i32> = prompt(&mut lines, "").unwrap();
        assert_eq!(value, None);
    }
}
