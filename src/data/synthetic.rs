//! Synthetic vesicle counts drawn from a known transition curve.
//!
//! Useful for demos and for checking the fitter end-to-end without microscopy
//! data. At each temperature `t` we draw
//!
//! ```text
//! ps  ~ Binomial(total, clamp(f(t)/100, 0, 1))
//! mix = total − ps
//! ```
//!
//! where `f` is the sigmoid. Output is deterministic for a given seed.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Binomial;

use crate::domain::{ClassCount, CountMap, SigmoidParams, Temperature};
use crate::error::PipelineError;

/// Settings for synthetic count generation.
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub params: SigmoidParams,
    pub temperatures: Vec<f64>,
    /// Objects counted per temperature (phase-separated + mixed).
    pub objects_per_temperature: ClassCount,
    pub seed: u64,
}

/// Generated counts, in the same two-map shape the annotation step produces.
#[derive(Debug, Clone)]
pub struct SyntheticCounts {
    pub phase_separated: CountMap,
    pub mixed: CountMap,
}

pub fn simulate_counts(config: &SyntheticConfig) -> Result<SyntheticCounts, PipelineError> {
    if config.objects_per_temperature == 0 {
        return Err(PipelineError::precondition("Objects per temperature must be > 0."));
    }
    if config.temperatures.is_empty() {
        return Err(PipelineError::precondition("At least one temperature is required."));
    }
    if !config.params.is_finite() || config.params.d == 0.0 {
        return Err(PipelineError::precondition(
            "Generating curve must be finite with a non-zero decay rate.",
        ));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut phase_separated = CountMap::new();
    let mut mixed = CountMap::new();

    for &t in &config.temperatures {
        if !t.is_finite() {
            return Err(PipelineError::precondition(format!("Non-finite temperature {t}.")));
        }
        let p = (config.params.eval(t) / 100.0).clamp(0.0, 1.0);
        let binomial = Binomial::new(config.objects_per_temperature, p)
            .map_err(|e| PipelineError::precondition(format!("Binomial distribution error: {e}")))?;

        let ps: ClassCount = binomial.sample(&mut rng);
        let key = Temperature::new(t);
        *phase_separated.entry(key).or_default() += ps;
        *mixed.entry(key).or_default() += config.objects_per_temperature - ps;
    }

    Ok(SyntheticCounts {
        phase_separated,
        mixed,
    })
}
