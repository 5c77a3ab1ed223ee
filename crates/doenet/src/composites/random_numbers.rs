//! `<selectRandomNumbers>` and `<sampleRandomNumbers>`.
//!
//! Both draw numbers from a distribution; draw `i` always uses the seed
//! `seed.child(generation).child(i)`. A selection keeps its draws for the
//! life of the document. A sample redraws everything when a parameter of the
//! distribution changes and after `resample`, but growing the count only
//! draws the new positions. Both redraws move to the next generation of
//! seeds, so new draws are independent of the old ones.

use super::sequence::{MAX_LENGTH, SequenceKind, generate, split_list};
use super::{CompositeKind, Memory, sync_value_groups};
use crate::components::{AttributeSpec, ChildPolicy, ComponentType, StateVarSpec};
use crate::core::{ComponentIdx, Core};
use crate::diagnostics::LEVEL_VALIDATION;
use crate::value::{Value, ValueKind, format_number};
use crate::variants::VariantSeed;
use crate::variants::enumerate::decode_tuple;
use rand::Rng;
use std::f64::consts::TAU;

const ATTRIBUTES: &[AttributeSpec] = &[
    AttributeSpec::new("type", ValueKind::Text, || Value::text("uniform")),
    AttributeSpec::new("from", ValueKind::Number, || Value::Number(0.0)),
    AttributeSpec::new("to", ValueKind::Number, || Value::Number(1.0)),
    AttributeSpec::new("step", ValueKind::Number, || Value::Number(1.0)),
    AttributeSpec::new("mean", ValueKind::Number, || Value::Number(0.0)),
    AttributeSpec::new("standardDeviation", ValueKind::Number, || Value::Number(1.0)),
    AttributeSpec::new("exclude", ValueKind::Text, || Value::text("")),
    AttributeSpec::new("numSamples", ValueKind::Integer, || Value::Integer(1)),
    AttributeSpec::new("numToSelect", ValueKind::Integer, || Value::Null).renamed_from("numberToSelect"),
];

pub static SELECT_RANDOM_NUMBERS: ComponentType = ComponentType {
    name: "selectRandomNumbers",
    state_vars: &[StateVarSpec::replacements()],
    attributes: ATTRIBUTES,
    children: ChildPolicy::Deferred,
    composite: Some(CompositeKind::SelectRandomNumbers),
    ..ComponentType::BASE
};

pub static SAMPLE_RANDOM_NUMBERS: ComponentType = ComponentType {
    name: "sampleRandomNumbers",
    state_vars: &[StateVarSpec::replacements()],
    attributes: ATTRIBUTES,
    children: ChildPolicy::Deferred,
    composite: Some(CompositeKind::SampleRandomNumbers),
    actions: &["resample"],
    ..ComponentType::BASE
};

#[derive(Clone, Debug, PartialEq)]
pub enum Distribution {
    Uniform { from: f64, to: f64 },
    Gaussian { mean: f64, standard_deviation: f64 },
    /// The candidates are the sequence `from, from + step, ..., to` minus the
    /// excluded values.
    DiscreteUniform { candidates: Vec<f64> },
}

impl Distribution {
    fn sample(&self, seed: VariantSeed) -> f64 {
        let mut rng = seed.rng();
        match self {
            Distribution::Uniform { from, to } => from + (to - from) * rng.r#gen::<f64>(),
            Distribution::Gaussian { mean, standard_deviation } => {
                // Box-Muller; 1 - u keeps the logarithm finite.
                let u1: f64 = 1.0 - rng.r#gen::<f64>();
                let u2: f64 = rng.r#gen();
                mean + standard_deviation * (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
            }
            Distribution::DiscreteUniform { candidates } if candidates.is_empty() => f64::NAN,
            Distribution::DiscreteUniform { candidates } => candidates[rng.gen_range(0..candidates.len())],
        }
    }
}

#[derive(Debug, Default)]
pub struct RandomMemory {
    pub distribution: Option<Distribution>,
    pub draws: Vec<f64>,
    /// Bumped by `resample` and when a sample's distribution changes.
    pub generation: u64,
    pub warned_count: bool,
    pub warned_empty: bool,
}

fn read_distribution(core: &mut Core, idx: ComponentIdx) -> Distribution {
    let kind = core.read_attribute(idx, "type").to_text();
    let number = |core: &mut Core, name: &str| core.read_attribute(idx, name).as_number().unwrap_or(f64::NAN);
    match kind.trim().to_ascii_lowercase().as_str() {
        "gaussian" => Distribution::Gaussian {
            mean: number(core, "mean"),
            standard_deviation: number(core, "standardDeviation"),
        },
        "discreteuniform" => {
            let from = format_number(number(core, "from"));
            let to = format_number(number(core, "to"));
            let step = format_number(number(core, "step"));
            let exclude = split_list(&core.read_attribute(idx, "exclude").to_text());
            let candidates = generate(
                SequenceKind::Number,
                Some(from.as_str()),
                Some(to.as_str()),
                Some(step.as_str()),
                None,
                &exclude,
            )
            .iter()
                .filter_map(Value::as_number)
                .collect();
            Distribution::DiscreteUniform { candidates }
        }
        _ => Distribution::Uniform { from: number(core, "from"), to: number(core, "to") },
    }
}

fn read_count(core: &mut Core, idx: ComponentIdx) -> usize {
    let count = match core.read_attribute(idx, "numToSelect").as_integer() {
        Some(count) => count,
        None => core.read_attribute(idx, "numSamples").as_integer().unwrap_or(1),
    };
    usize::try_from(count).unwrap_or(0)
}

fn warn(core: &mut Core, idx: ComponentIdx, message: String) {
    let position = core.component(idx).position;
    core.diagnostics.warning(message, LEVEL_VALIDATION, position);
}

pub(crate) fn update(core: &mut Core, idx: ComponentIdx, memory: Memory, sample: bool) -> Memory {
    let mut memory = match memory {
        Memory::Random(memory) => memory,
        _ => RandomMemory::default(),
    };
    let distribution = read_distribution(core, idx);
    let requested = read_count(core, idx);
    let source = core.component(idx).variant;

    let count = requested.min(MAX_LENGTH);
    if requested > MAX_LENGTH && !memory.warned_count {
        warn(core, idx, format!("Cannot draw {requested} random numbers, drawing {MAX_LENGTH}"));
        memory.warned_count = true;
    }

    if memory.distribution.as_ref() != Some(&distribution) {
        if sample && memory.distribution.is_some() {
            memory.generation += 1;
        }
        if sample || memory.distribution.is_none() {
            memory.draws.clear();
        }
        memory.distribution = Some(distribution.clone());
    }

    if matches!(&distribution, Distribution::DiscreteUniform { candidates } if candidates.is_empty()) {
        if !memory.warned_empty {
            warn(core, idx, "Cannot draw random numbers: every candidate is excluded".to_string());
            memory.warned_empty = true;
        }
        sync_value_groups(core, idx, "number", &[]);
        return Memory::Random(memory);
    }

    if memory.draws.is_empty() && !sample {
        if let (Some(digit), Distribution::DiscreteUniform { candidates }) = (source.digit, &distribution) {
            memory.draws = decode_tuple(digit, candidates.len() as u64, count as u64)
                .into_iter()
                .filter_map(|position| candidates.get(position as usize).copied())
                .collect();
        }
    }
    let generation = source.seed.child(memory.generation);
    for i in memory.draws.len()..count {
        memory.draws.push(distribution.sample(generation.child(i as u64)));
    }

    let values = memory.draws[..count].iter().copied().map(Value::Number).collect::<Vec<_>>();
    sync_value_groups(core, idx, "number", &values);
    Memory::Random(memory)
}

/// Forget every draw of a sample so the next update redraws with fresh seeds.
pub(crate) fn resample(memory: &mut Memory) {
    if let Memory::Random(memory) = memory {
        memory.generation += 1;
        memory.draws.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draws_are_reproducible_per_seed() {
        let uniform = Distribution::Uniform { from: 2.0, to: 3.0 };
        let seed = VariantSeed::root(4).child(0).child(2);
        let value = uniform.sample(seed);
        assert_eq!(value, uniform.sample(seed));
        assert!((2.0..3.0).contains(&value));
    }

    #[test]
    fn discrete_uniform_stays_on_candidates() {
        let candidates = vec![-3.0, -1.0, 1.0, 2.0];
        let distribution = Distribution::DiscreteUniform { candidates: candidates.clone() };
        for i in 0..50 {
            assert!(candidates.contains(&distribution.sample(VariantSeed::root(i))));
        }
        assert!(Distribution::DiscreteUniform { candidates: vec![] }.sample(VariantSeed(1)).is_nan());
    }

    #[test]
    fn gaussian_draws_center_on_the_mean() {
        let gaussian = Distribution::Gaussian { mean: 10.0, standard_deviation: 2.0 };
        let draws = (0..2000).map(|i| gaussian.sample(VariantSeed::root(i))).collect::<Vec<_>>();
        let mean = draws.iter().sum::<f64>() / draws.len() as f64;
        assert!((mean - 10.0).abs() < 0.3, "mean {mean}");
    }
}
