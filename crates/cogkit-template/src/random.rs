//! Deterministic randomness for templates.
//!
//! Every render carries one seed, taken from the `random_seed` context entry
//! or drawn once when the render starts. The `random` and `shuffle` filters
//! never touch a shared generator: each call seeds a private
//! [`StdRng`] from the render seed mixed with a fingerprint of the sequence it
//! was given. The same seed and the same sequence therefore always produce
//! the same result, on any thread and in any render.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use cogkit_core::error::RenderError;

use crate::context::ContextValue;
use crate::filters::{Filter, FilterState};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// FNV-1a, chosen because its output is stable across platforms and releases.
fn fnv1a(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(FNV_OFFSET, |hash, &b| (hash ^ u64::from(b)).wrapping_mul(FNV_PRIME))
}

/// Turns a `random_seed` context value into a render seed.
///
/// Integers are used as-is, everything else is hashed. Without a value a
/// fresh seed is drawn from the thread RNG.
#[allow(clippy::cast_sign_loss)]
pub fn resolve_seed(value: Option<&ContextValue>) -> u64 {
    match value {
        Some(ContextValue::Integer(i)) => *i as u64,
        Some(ContextValue::Bool(b)) => u64::from(*b),
        Some(ContextValue::String(s)) => fnv1a(s.as_bytes()),
        Some(ContextValue::Float(f)) => fnv1a(&f.to_bits().to_le_bytes()),
        Some(other) if !other.is_none_like() => fnv1a(other.to_repr().as_bytes()),
        _ => rand::random(),
    }
}

/// A stable fingerprint of a sequence's contents.
pub fn fingerprint(items: &[ContextValue]) -> u64 {
    let mut hash = fnv1a(&(items.len() as u64).to_le_bytes());
    for item in items {
        hash ^= fnv1a(item.to_repr().as_bytes());
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Builds the generator for one filter call.
pub fn rng_for(seed: u64, items: &[ContextValue]) -> StdRng {
    StdRng::seed_from_u64(seed ^ fingerprint(items))
}

/// The input of `random`/`shuffle` as a list of candidates.
///
/// Returns `Ok(None)` for undefined or none.
fn candidates(
    filter: &str,
    value: &ContextValue,
) -> Result<Option<Vec<ContextValue>>, RenderError> {
    match value {
        ContextValue::List(items) => Ok(Some(items.clone())),
        ContextValue::String(s) => {
            Ok(Some(s.chars().map(|c| ContextValue::String(c.to_string())).collect()))
        }
        ContextValue::Undefined | ContextValue::None => Ok(None),
        other => Err(RenderError::evaluation(format!(
            "{filter} expects a list or string, got {}",
            other.type_name()
        ))),
    }
}

/// `random`: picks one element of a list, or one character of a string.
pub struct RandomFilter;

impl Filter for RandomFilter {
    fn name(&self) -> &'static str {
        "random"
    }

    fn apply(
        &self,
        value: &ContextValue,
        _args: &[ContextValue],
        state: &FilterState<'_>,
    ) -> Result<ContextValue, RenderError> {
        let Some(items) = candidates(self.name(), value)? else {
            return Ok(ContextValue::Undefined);
        };
        if items.is_empty() {
            return Ok(ContextValue::Undefined);
        }
        let index = rng_for(state.seed(), &items).gen_range(0..items.len());
        Ok(items[index].clone())
    }
}

/// `shuffle`: returns the list (or string) in a seeded random order.
pub struct ShuffleFilter;

impl Filter for ShuffleFilter {
    fn name(&self) -> &'static str {
        "shuffle"
    }

    fn apply(
        &self,
        value: &ContextValue,
        _args: &[ContextValue],
        state: &FilterState<'_>,
    ) -> Result<ContextValue, RenderError> {
        let Some(mut items) = candidates(self.name(), value)? else {
            return Ok(ContextValue::Undefined);
        };
        let mut rng = rng_for(state.seed(), &items);
        items.shuffle(&mut rng);
        if let ContextValue::String(_) = value {
            let shuffled: String = items.iter().map(ContextValue::to_display_string).collect();
            return Ok(ContextValue::String(shuffled));
        }
        Ok(ContextValue::List(items))
    }
}
