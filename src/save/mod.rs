use crate::psatd::FieldComp;
use crate::sim::Sim;
use crate::{Config, Float};
use anyhow::{Context, Result};
use tracing::info;

/// Keeps every `stride`-th cell along both axes of an x-fastest array.
pub(crate) fn subsample(data: &[Float], size_x: usize, stride: usize) -> Vec<Float> {
    data.chunks_exact(size_x)
        .step_by(stride)
        .flat_map(|row| row.iter().step_by(stride).copied())
        .collect()
}

pub(crate) fn save_fld_spatial(name: &str, data: Vec<Float>, outdir: &str) -> Result<()> {
    npy::to_file(format!("{}/flds/{}.npy", outdir, name), data)
        .context(format!("Could not save {} data to file", name))?;
    Ok(())
}

pub(crate) fn save_output(t: u32, sim: &mut Sim, cfg: &Config) -> Result<()> {
    let output_prefix = format!("output/dat_{:05}", t / cfg.output.output_interval);
    std::fs::create_dir_all(format!("{}/flds", &output_prefix))
        .context("Unable to create output directory")?;
    info!(t, dir = %output_prefix, "saving fields");

    let stride = cfg.output.stride;
    for comp in FieldComp::ALL.iter() {
        match comp {
            FieldComp::Jx
            | FieldComp::Jy
            | FieldComp::Jz
            | FieldComp::RhoOld
            | FieldComp::RhoNew => continue,
            _ => {}
        }
        if let Some(spatial) = sim.spatial(*comp) {
            save_fld_spatial(
                comp.name(),
                subsample(&spatial, sim.size_x, stride),
                &output_prefix,
            )?;
        }
    }
    Ok(())
}
