//! Selection over the fixed set of pre-stored sample portraits.
//!
//! The first half of the configured set holds male portraits, the second
//! half female portraits.

use sha2::{Digest, Sha256};

/// Result of the classification prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
}

pub fn gender_prompt(name: &str, description: &str) -> String {
    format!(
        "Based on the doctor's name and description, is this doctor most likely male or female?\n\
         Name: {}\n\
         Description: {}\n\
         Answer with exactly one word: male or female.",
        name.trim(),
        description.trim()
    )
}

/// Read a one-word classification out of a model reply.
///
/// Replies naming both or neither class are rejected.
pub fn parse_gender(reply: &str) -> Option<Gender> {
    let mut male = false;
    let mut female = false;
    for word in reply
        .split(|c: char| !c.is_alphabetic())
        .map(str::to_lowercase)
    {
        match word.as_str() {
            "male" | "man" => male = true,
            "female" | "woman" => female = true,
            _ => {}
        }
    }
    match (male, female) {
        (true, false) => Some(Gender::Male),
        (false, true) => Some(Gender::Female),
        _ => None,
    }
}

/// Deterministic index in `0..len` derived from the name and description.
///
/// Case and surrounding whitespace do not change the result.
pub fn hash_index(name: &str, description: &str, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let mut hasher = Sha256::new();
    hasher.update(name.trim().to_lowercase().as_bytes());
    hasher.update(b"|");
    hasher.update(description.trim().to_lowercase().as_bytes());
    let digest = hasher.finalize();
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    Some((u64::from_be_bytes(prefix) % len as u64) as usize)
}

/// The half of `samples` matching `gender`; `None` when the set is too
/// small to split.
pub fn half_for(samples: &[String], gender: Gender) -> Option<&[String]> {
    if samples.len() < 2 {
        return None;
    }
    let mid = samples.len() / 2;
    Some(match gender {
        Gender::Male => &samples[..mid],
        Gender::Female => &samples[mid..],
    })
}
