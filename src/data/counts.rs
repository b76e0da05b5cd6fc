//! Turning per-class vesicle counts into a percentage series.
//!
//! Input comes from the annotation step as two independent mappings
//! (temperature → count), one per vesicle class. Aggregation is an explicit
//! join over the two maps: every temperature must appear in both, and each
//! temperature must have at least one counted object.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::{
    ClassCount, CountMap, PercentagePoint, PercentageSeries, Temperature, VesicleClass,
};
use crate::error::PipelineError;

/// Percentage of phase-separated objects, `100·ps / (ps + mix)`.
///
/// Returns `None` when nothing was counted.
pub fn percent_phase_separated(ps: ClassCount, mix: ClassCount) -> Option<f64> {
    let total = ps.checked_add(mix)?;
    if total == 0 {
        return None;
    }
    Some(100.0 * ps as f64 / total as f64)
}

/// Join phase-separated and mixed counts into a sorted percentage series.
pub fn aggregate(ps_counts: &CountMap, mix_counts: &CountMap) -> Result<PercentageSeries, PipelineError> {
    // Sorted so the first reported mismatch is deterministic.
    let keys: BTreeSet<Temperature> = ps_counts.keys().chain(mix_counts.keys()).copied().collect();

    let mut points = Vec::with_capacity(keys.len());
    for t in keys {
        let ps = lookup(ps_counts, t, VesicleClass::PhaseSeparated, VesicleClass::Mixed)?;
        let mix = lookup(mix_counts, t, VesicleClass::Mixed, VesicleClass::PhaseSeparated)?;

        let percentage = percent_phase_separated(ps, mix).ok_or_else(|| {
            PipelineError::domain(format!(
                "No vesicles counted at temperature {t}; percentage is undefined."
            ))
        })?;

        points.push(PercentagePoint {
            temperature: t.value(),
            percentage,
        });
    }

    PercentageSeries::new(points)
}

fn lookup(
    counts: &CountMap,
    t: Temperature,
    class: VesicleClass,
    other: VesicleClass,
) -> Result<ClassCount, PipelineError> {
    counts.get(&t).copied().ok_or_else(|| {
        PipelineError::domain(format!(
            "Temperature {t} has {} counts but no {} counts.",
            other.display_name(),
            class.display_name()
        ))
    })
}

/// Click coordinates collected on one image slice.
pub type SlicePoints = Vec<[f64; 2]>;

/// Annotations for one temperature: per image slice, the clicked objects of each class.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemperatureAnnotations {
    pub temperature: f64,
    #[serde(default)]
    pub phase_separated: Vec<SlicePoints>,
    #[serde(default)]
    pub mixed: Vec<SlicePoints>,
}

impl TemperatureAnnotations {
    /// Total clicked objects of `class` across all slices.
    pub fn count(&self, class: VesicleClass) -> ClassCount {
        let slices = match class {
            VesicleClass::PhaseSeparated => &self.phase_separated,
            VesicleClass::Mixed => &self.mixed,
        };
        slices.iter().map(|s| s.len() as ClassCount).sum()
    }
}

/// Annotated image stacks, one entry per temperature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationSet {
    pub temperatures: Vec<TemperatureAnnotations>,
}

impl AnnotationSet {
    /// Flatten annotations into the two per-class count maps.
    ///
    /// Stacks recorded at the same temperature are summed.
    pub fn counts(&self) -> (CountMap, CountMap) {
        let mut ps = CountMap::new();
        let mut mix = CountMap::new();
        for entry in &self.temperatures {
            let t = Temperature::new(entry.temperature);
            *ps.entry(t).or_default() += entry.count(VesicleClass::PhaseSeparated);
            *mix.entry(t).or_default() += entry.count(VesicleClass::Mixed);
        }
        (ps, mix)
    }

    pub fn aggregate(&self) -> Result<PercentageSeries, PipelineError> {
        let (ps, mix) = self.counts();
        aggregate(&ps, &mix)
    }
}
