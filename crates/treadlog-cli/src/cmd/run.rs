//! `tread run`: log, edit and remove runs.
//!
//! Every mutation goes through the maintainer, so the owning gear's total is
//! refreshed before the command returns. A refresh failure is reported as a
//! warning (`E3003`) and does not fail the command.

use std::io::Write;

use chrono::NaiveDateTime;
use clap::{Args, Subcommand};
use serde::Serialize;
use treadlog_core::error::{ErrorCode, RecordId, TrackError};
use treadlog_core::maintain::Mutation;
use treadlog_core::model::{GearId, NewRun, Run, RunEdit, RunId};
use treadlog_core::store::RunStore;

use super::{Context, now, parse_run_date};
use crate::output::{
    CliError, distance, pretty_kv, pretty_section, render, render_error, render_mode,
};

#[derive(Subcommand, Debug)]
pub enum RunCommand {
    /// Log a run against a gear item.
    Add(RunAddArgs),
    /// Change the date or distance of a run.
    Edit(RunEditArgs),
    /// Delete a run.
    Rm(RunIdArgs),
    /// List runs, newest first.
    List(RunListArgs),
    /// Delete every run of a gear item.
    Clear(RunGearArgs),
}

#[derive(Args, Debug)]
pub struct RunAddArgs {
    #[arg(long)]
    pub gear: GearId,

    #[arg(long)]
    pub distance: f64,

    /// When the run happened (YYYY-MM-DD[THH:MM[:SS]]). Defaults to now.
    #[arg(long, value_parser = parse_run_date)]
    pub date: Option<NaiveDateTime>,
}

#[derive(Args, Debug)]
pub struct RunEditArgs {
    pub id: RunId,

    #[arg(long)]
    pub distance: Option<f64>,

    #[arg(long, value_parser = parse_run_date)]
    pub date: Option<NaiveDateTime>,
}

#[derive(Args, Debug)]
pub struct RunIdArgs {
    pub id: RunId,
}

#[derive(Args, Debug)]
pub struct RunListArgs {
    /// Only runs of this gear item.
    #[arg(long)]
    pub gear: Option<GearId>,
}

#[derive(Args, Debug)]
pub struct RunGearArgs {
    #[arg(long)]
    pub gear: GearId,
}

/// Result of a run mutation.
#[derive(Debug, Serialize)]
pub struct RunChange<T: Serialize> {
    pub action: &'static str,
    pub value: T,
    /// Refreshed total of the owning gear; absent when it could not be refreshed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gear_total: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<CliError>,
}

impl<T: Serialize> RunChange<T> {
    fn from_mutation(
        ctx: &Context,
        action: &'static str,
        mutation: Mutation<T>,
    ) -> anyhow::Result<Self> {
        let warning = ctx.warn_if_stale(&mutation)?;
        Ok(Self {
            action,
            gear_total: mutation.total_distance(),
            value: mutation.value,
            warning,
        })
    }
}

fn write_run(w: &mut dyn Write, run: &Run) -> std::io::Result<()> {
    writeln!(
        w,
        "{}  {}  {}  {}",
        run.id,
        run.gear_id,
        run.date.format("%Y-%m-%dT%H:%M"),
        distance(run.distance)
    )
}

fn write_run_change(change: &RunChange<Run>, w: &mut dyn Write) -> std::io::Result<()> {
    write!(w, "{} ", change.action)?;
    write_run(w, &change.value)?;
    if let Some(total) = change.gear_total {
        writeln!(w, "gear {} total {}", change.value.gear_id, distance(total))?;
    }
    Ok(())
}

/// Execute a `tread run` subcommand.
///
/// # Errors
///
/// Returns an error if the store cannot be opened, a record is missing, the
/// distance is invalid, or the run could not be written.
pub fn run_run(command: &RunCommand, ctx: &Context) -> anyhow::Result<()> {
    let maintainer = ctx.open()?;

    match command {
        RunCommand::Add(args) => {
            let mutation = maintainer
                .insert_run(&NewRun {
                    gear_id: args.gear,
                    date: args.date.unwrap_or_else(now),
                    distance: args.distance,
                })
                .map_err(|err| ctx.fail(err))?;
            let change = RunChange::from_mutation(ctx, "logged", mutation)?;
            render(ctx.output, &change, write_run_change)?;
        }
        RunCommand::Edit(args) => {
            let edit = RunEdit {
                date: args.date,
                distance: args.distance,
            };
            if edit.is_empty() {
                let err = CliError::from_code(
                    ErrorCode::NothingToChange,
                    format!("run {} edit has no --distance or --date", args.id),
                );
                render_error(ctx.output, &err)?;
                anyhow::bail!("nothing to change for run {}", args.id);
            }
            let mutation = maintainer
                .update_run(args.id, &edit)
                .map_err(|err| ctx.fail(err))?;
            let change = RunChange::from_mutation(ctx, "updated", mutation)?;
            render(ctx.output, &change, write_run_change)?;
        }
        RunCommand::Rm(args) => {
            let mutation = maintainer
                .delete_run(args.id)
                .map_err(|err| ctx.fail(err))?;
            let change = RunChange::from_mutation(ctx, "removed", mutation)?;
            render(ctx.output, &change, write_run_change)?;
        }
        RunCommand::List(args) => {
            let store = maintainer.store();
            let runs = match args.gear {
                Some(gear_id) => {
                    if store
                        .get_gear(gear_id)
                        .map_err(|err| ctx.fail(err.into()))?
                        .is_none()
                    {
                        return Err(ctx.fail(TrackError::NotFound(RecordId::Gear(gear_id))));
                    }
                    store.runs_for_gear(gear_id)
                }
                None => store.all_runs(),
            }
            .map_err(|err| ctx.fail(err.into()))?;

            render_mode(
                ctx.output,
                &runs,
                |runs, w| {
                    for run in runs {
                        write_run(w, run)?;
                    }
                    Ok(())
                },
                |runs, w| {
                    pretty_section(w, &format!("{} runs", runs.len()))?;
                    for run in runs {
                        pretty_kv(
                            w,
                            &format!("#{}", run.id),
                            format!(
                                "{}  {:>8}  gear {}",
                                run.date.format("%a %Y-%m-%d %H:%M"),
                                distance(run.distance),
                                run.gear_id
                            ),
                        )?;
                    }
                    Ok(())
                },
            )?;
        }
        RunCommand::Clear(args) => {
            let mutation = maintainer
                .delete_all_runs(args.gear)
                .map_err(|err| ctx.fail(err))?;
            let change = RunChange::from_mutation(ctx, "cleared", mutation)?;
            render(ctx.output, &change, |change, w| {
                writeln!(w, "removed {} runs from gear {}", change.value, args.gear)?;
                if let Some(total) = change.gear_total {
                    writeln!(w, "gear {} total {}", args.gear, distance(total))?;
                }
                Ok(())
            })?;
        }
    }

    Ok(())
}
