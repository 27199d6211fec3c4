use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context};
use tract_onnx::prelude::*;

use crate::models::{FeatureRecord, FEATURE_COLUMNS};

/// Regression model mapping one feature record to a treatment cost.
///
/// Implementations are shared read-only between workers, so `predict` must
/// not mutate anything.
pub trait CostModel: Send + Sync {
    fn predict(&self, record: &FeatureRecord) -> anyhow::Result<f64>;
}

/// Input dtypes, column for column with `FEATURE_COLUMNS`.
const INPUT_TYPES: [DatumType; 6] = [
    DatumType::String,
    DatumType::String,
    DatumType::String,
    DatumType::I64,
    DatumType::F32,
    DatumType::F32,
];

/// ONNX export of the trained pipeline, one `[1, 1]` input per column.
pub struct OnnxCostModel {
    plan: TypedRunnableModel<TypedModel>,
    path: PathBuf,
}

impl OnnxCostModel {
    pub fn load<P: AsRef<Path>>(model_path: P) -> anyhow::Result<Self> {
        let path = model_path.as_ref();
        let mut model = tract_onnx::onnx()
            .model_for_path(path)
            .with_context(|| format!("cannot read model artifact {}", path.display()))?;

        let names = model
            .input_outlets()?
            .iter()
            .map(|outlet| model.node(outlet.node).name.clone())
            .collect::<Vec<_>>();
        check_input_names(&names)
            .with_context(|| format!("model artifact {} has the wrong schema", path.display()))?;

        for (ix, dt) in INPUT_TYPES.iter().enumerate() {
            model = model.with_input_fact(ix, InferenceFact::dt_shape(*dt, tvec!(1, 1)))?;
        }

        let plan = model
            .into_optimized()?
            .into_runnable()
            .with_context(|| format!("cannot prepare model artifact {}", path.display()))?;

        Ok(Self {
            plan,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CostModel for OnnxCostModel {
    fn predict(&self, record: &FeatureRecord) -> anyhow::Result<f64> {
        let inputs = input_tensors(record).into_iter().map(TValue::from).collect();
        let outputs = self.plan.run(inputs)?;

        let first = outputs.first().ok_or_else(|| anyhow!("model produced no outputs"))?;
        let values = first.cast_to::<f64>()?;
        values
            .as_slice::<f64>()?
            .first()
            .copied()
            .ok_or_else(|| anyhow!("model produced an empty prediction"))
    }
}

fn check_input_names(names: &[String]) -> anyhow::Result<()> {
    if names.len() != FEATURE_COLUMNS.len() {
        bail!(
            "expected {} inputs, found {}: {:?}",
            FEATURE_COLUMNS.len(),
            names.len(),
            names
        );
    }
    for (ix, (found, expected)) in names.iter().zip(FEATURE_COLUMNS.iter()).enumerate() {
        if found != expected {
            bail!("input #{} is named {:?}, expected {:?}", ix, found, expected);
        }
    }
    Ok(())
}

/// One `[1, 1]` tensor per column, in column order.
fn input_tensors(record: &FeatureRecord) -> TVec<Tensor> {
    tvec!(
        cell(record.drg_definition.clone()),
        cell(record.provider_state.clone()),
        cell(record.hospital_region.clone()),
        cell(record.total_discharges),
        cell(record.avg_covered_charges as f32),
        cell(record.avg_medicare_payments as f32),
    )
}

fn cell<T: Datum>(value: T) -> Tensor {
    Tensor::from(tract_ndarray::arr2(&[[value]]))
}
