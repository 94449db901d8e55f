//! `tread recompute`: re-sum gear totals from their runs.
//!
//! This is the repair path for totals left stale by an interrupted write.

use std::io::Write;

use clap::Args;
use serde::Serialize;
use treadlog_core::error::{RecordId, TrackError};
use treadlog_core::model::GearId;

use super::Context;
use crate::output::{distance, render};

#[derive(Args, Debug)]
pub struct RecomputeArgs {
    /// Only this gear item. Without it every gear total is checked.
    pub id: Option<GearId>,
}

#[derive(Debug, Serialize)]
struct SingleTotal {
    gear_id: GearId,
    total_distance: f64,
}

/// Execute `tread recompute [ID]`.
///
/// # Errors
///
/// Returns an error if the store fails or the gear does not exist.
pub fn run_recompute(args: &RecomputeArgs, ctx: &Context) -> anyhow::Result<()> {
    let maintainer = ctx.open()?;

    if let Some(gear_id) = args.id {
        let gear = maintainer
            .recompute_total(gear_id)
            .map_err(|err| ctx.fail(err))?
            .ok_or_else(|| ctx.fail(TrackError::NotFound(RecordId::Gear(gear_id))))?;
        let total = SingleTotal {
            gear_id: gear.id,
            total_distance: gear.total_distance,
        };
        return render(ctx.output, &total, |total, w| {
            writeln!(
                w,
                "gear {} total {}",
                total.gear_id,
                distance(total.total_distance)
            )
        });
    }

    let report = maintainer.recompute_all().map_err(|err| ctx.fail(err))?;
    render(ctx.output, &report, |report, w| {
        for fix in &report.corrections {
            writeln!(
                w,
                "gear {}: {} -> {}",
                fix.gear_id,
                distance(fix.before),
                distance(fix.after)
            )?;
        }
        writeln!(
            w,
            "checked {} gear, corrected {}",
            report.checked,
            report.corrections.len()
        )
    })
}
