//! `tread history`: weekly distance totals with empty weeks filled in.

use std::io::Write;

use chrono::NaiveDate;
use clap::Args;
use serde::Serialize;
use treadlog_core::calendar::FirstDayOfWeek;
use treadlog_core::error::{RecordId, TrackError};
use treadlog_core::history::{DescendingPolicy, Direction};
use treadlog_core::model::GearId;
use treadlog_core::store::RunStore;
use treadlog_core::view::{HistoryAction, HistoryView, reduce};
use treadlog_core::watch::RunScope;

use super::Context;
use crate::output::{distance, pretty_rule, pretty_section, render_mode};

const BAR_WIDTH: f64 = 30.0;

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Only runs of this gear item.
    #[arg(long)]
    pub gear: Option<GearId>,

    /// Newest week first.
    #[arg(long)]
    pub descending: bool,

    /// Weekday that opens a week (monday or sunday). Defaults to the config value.
    #[arg(long)]
    pub first_day: Option<FirstDayOfWeek>,

    /// How descending output treats empty weeks (reverse or omit-gap-fill).
    #[arg(long)]
    pub policy: Option<DescendingPolicy>,
}

impl HistoryArgs {
    fn actions(&self) -> Vec<HistoryAction> {
        let mut actions = Vec::new();
        if let Some(first_day) = self.first_day {
            actions.push(HistoryAction::SetFirstDay(first_day));
        }
        if let Some(policy) = self.policy {
            actions.push(HistoryAction::SetPolicy(policy));
        }
        actions.push(HistoryAction::SetDirection(Direction::from_ascending(
            !self.descending,
        )));
        actions
    }
}

#[derive(Debug, Serialize)]
struct HistoryReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    gear_id: Option<GearId>,
    #[serde(flatten)]
    view: HistoryView,
    total_distance: f64,
}

fn write_text(report: &HistoryReport, w: &mut dyn Write) -> std::io::Result<()> {
    for bucket in &report.view.buckets {
        writeln!(w, "{}  {}", bucket.week_start, distance(bucket.distance))?;
    }
    Ok(())
}

fn write_pretty(report: &HistoryReport, w: &mut dyn Write) -> std::io::Result<()> {
    let heading = report.gear_id.map_or_else(
        || "Weekly distance".to_string(),
        |gear_id| format!("Weekly distance for gear {gear_id}"),
    );
    pretty_section(w, &heading)?;

    let peak = report
        .view
        .buckets
        .iter()
        .map(|bucket| bucket.distance)
        .fold(0.0_f64, f64::max);
    for bucket in &report.view.buckets {
        writeln!(
            w,
            "{}  {:>8}  {}",
            week_label(bucket.week_start),
            distance(bucket.distance),
            bar(bucket.distance, peak)
        )?;
    }
    pretty_rule(w)?;
    writeln!(
        w,
        "{} weeks, {} total",
        report.view.buckets.len(),
        distance(report.total_distance)
    )
}

fn week_label(week_start: NaiveDate) -> String {
    week_start.format("%a %Y-%m-%d").to_string()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn bar(value: f64, peak: f64) -> String {
    if peak <= 0.0 {
        return String::new();
    }
    let cells = (value / peak * BAR_WIDTH).round().clamp(0.0, BAR_WIDTH) as usize;
    "#".repeat(cells)
}

/// Execute `tread history`.
///
/// # Errors
///
/// Returns an error if the store cannot be read, the gear does not exist, or
/// output rendering fails.
pub fn run_history(args: &HistoryArgs, ctx: &Context) -> anyhow::Result<()> {
    let maintainer = ctx.open()?;
    let store = maintainer.store();

    let scope = match args.gear {
        Some(gear_id) => {
            if store
                .get_gear(gear_id)
                .map_err(|err| ctx.fail(err.into()))?
                .is_none()
            {
                return Err(ctx.fail(TrackError::NotFound(RecordId::Gear(gear_id))));
            }
            RunScope::Gear(gear_id)
        }
        None => RunScope::All,
    };
    let runs = scope.load(store).map_err(|err| ctx.fail(err.into()))?;
    tracing::debug!(runs = runs.len(), ?scope, "loaded runs for history");

    let initial = HistoryView::new(ctx.config.history.collator(), Direction::Ascending);
    let view = args
        .actions()
        .into_iter()
        .chain(std::iter::once(HistoryAction::RunsLoaded(runs)))
        .fold(initial, reduce);

    let report = HistoryReport {
        gear_id: args.gear,
        total_distance: view.total_distance(),
        view,
    };
    render_mode(ctx.output, &report, write_text, write_pretty)
}
