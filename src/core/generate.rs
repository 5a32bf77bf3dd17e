//! Random test data
//!
//! Ids and names are unique enough for one run against a shared server:
//! project ids carry the low digits of the current millisecond timestamp and
//! build type ids carry a random hex suffix.

use crate::core::models::ValidationError;
use chrono::Utc;
use rand::seq::SliceRandom;
use rand::Rng;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const ID_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789_";
const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const USERNAME_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789._-";
const PASSWORD_CHARS: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789_-!@#$%^&*";

const WORDS: &[&str] = &[
    "alpha", "amber", "anchor", "beacon", "birch", "canyon", "cedar", "comet", "delta", "ember",
    "falcon", "fjord", "garnet", "harbor", "island", "juniper", "kestrel", "lagoon", "maple",
    "meadow", "nebula", "orchid", "pebble", "quartz", "raven", "summit", "tundra", "upland",
    "velvet", "willow", "yonder", "zephyr",
];

fn pick(rng: &mut impl Rng, alphabet: &[u8]) -> char {
    alphabet[rng.gen_range(0..alphabet.len())] as char
}

fn pick_many(rng: &mut impl Rng, alphabet: &[u8], count: usize) -> String {
    (0..count).map(|_| pick(rng, alphabet)).collect()
}

fn words(rng: &mut impl Rng, min: usize, max: usize) -> Vec<&'static str> {
    let count = rng.gen_range(min..=max);
    (0..count)
        .filter_map(|_| WORDS.choose(rng).copied())
        .collect()
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Last six digits of the current Unix time in milliseconds
fn timestamp_suffix() -> String {
    format!("{:06}", Utc::now().timestamp_millis().rem_euclid(1_000_000))
}

/// Project id: a latin letter, 4-8 id characters, then a timestamp suffix
pub fn project_id() -> String {
    let mut rng = rand::thread_rng();
    let first = pick(&mut rng, LETTERS);
    let rest_len = rng.gen_range(4..=8);
    format!("{}{}{}", first, pick_many(&mut rng, ID_CHARS, rest_len), timestamp_suffix())
}

/// Project id of exactly `length` characters
pub fn project_id_with_length(length: usize) -> Result<String, ValidationError> {
    if length == 0 {
        return Err(ValidationError::Invalid {
            field: "Project ID length",
            value: length.to_string(),
            reason: "must be at least 1",
        });
    }
    let mut rng = rand::thread_rng();
    let first = pick(&mut rng, LETTERS);
    Ok(format!("{}{}", first, pick_many(&mut rng, ID_CHARS, length - 1)))
}

/// Human-readable project name with a timestamp suffix
pub fn project_name() -> String {
    let mut rng = rand::thread_rng();
    let title: Vec<String> = words(&mut rng, 1, 3).into_iter().map(title_case).collect();
    format!("{} {}", title.join(" "), timestamp_suffix())
}

/// Username of 1-20 characters starting with a lower-case letter
pub fn username() -> String {
    let length = rand::thread_rng().gen_range(1..=20);
    // length is never zero here
    username_with_length(length).unwrap_or_else(|_| "u".to_string())
}

/// Username of exactly `length` characters
pub fn username_with_length(length: usize) -> Result<String, ValidationError> {
    if length == 0 {
        return Err(ValidationError::Invalid {
            field: "Username length",
            value: length.to_string(),
            reason: "must be at least 1",
        });
    }
    let mut rng = rand::thread_rng();
    let first = pick(&mut rng, LOWER);
    Ok(format!("{}{}", first, pick_many(&mut rng, USERNAME_CHARS, length - 1)))
}

/// Password of 8-20 characters
pub fn password() -> String {
    let mut rng = rand::thread_rng();
    let length = rng.gen_range(8..=20);
    pick_many(&mut rng, PASSWORD_CHARS, length)
}

/// Build type id scoped to a project: `{project}_{name}_{8 hex}`
pub fn build_type_id(project_id: &str, name: &str) -> String {
    let slug: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}_{}", project_id, slug, &hex[..8])
}

/// Build configuration name, e.g. `Cedar_Summit`
pub fn build_type_name() -> String {
    let mut rng = rand::thread_rng();
    words(&mut rng, 2, 4)
        .into_iter()
        .map(title_case)
        .collect::<Vec<_>>()
        .join("_")
}

pub fn step_name() -> String {
    let mut rng = rand::thread_rng();
    words(&mut rng, 2, 4)
        .into_iter()
        .map(title_case)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Shell script of 1-5 `echo` lines
pub fn step_script() -> String {
    let mut rng = rand::thread_rng();
    let lines = rng.gen_range(1..=5);
    (0..lines)
        .map(|_| format!("echo {}", words(&mut rng, 2, 5).join(" ")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build parameter name such as `env.ABCD`
pub fn build_parameter_name() -> String {
    let mut rng = rand::thread_rng();
    let prefix = ["env.", "system.", "config."]
        .choose(&mut rng)
        .copied()
        .unwrap_or("env.");
    let len = rng.gen_range(3..=8);
    format!("{}{}", prefix, pick_many(&mut rng, b"ABCDEFGHIJKLMNOPQRSTUVWXYZ", len))
}

pub fn build_parameter_value() -> String {
    let mut rng = rand::thread_rng();
    let len = rng.gen_range(5..=50);
    pick_many(
        &mut rng,
        b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789_-.",
        len,
    )
}
