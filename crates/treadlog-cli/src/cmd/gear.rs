//! `tread gear`: create, inspect and edit gear.

use std::io::{self, Write};

use chrono::{NaiveDate, NaiveDateTime};
use clap::{Args, Subcommand};
use serde::Serialize;
use treadlog_core::Maintainer;
use treadlog_core::db::SqliteStore;
use treadlog_core::error::{RecordId, TrackError};
use treadlog_core::model::{Gear, GearId, GearPatch, NewGear};
use treadlog_core::store::RunStore;

use super::{Context, now};
use crate::output::{
    CliError, Renderable, distance, pretty_kv, pretty_section, render, render_item, render_list,
};

#[derive(Subcommand, Debug)]
pub enum GearCommand {
    /// Start tracking a new item of gear.
    Add(GearAddArgs),
    /// List gear in display order.
    List(GearListArgs),
    /// Show one item of gear.
    Show(GearIdArgs),
    /// Mark gear as retired; it drops out of `gear list`.
    Retire(GearIdArgs),
    /// Bring retired gear back.
    Unretire(GearIdArgs),
    /// Change name, distances, order or expiry.
    Edit(GearEditArgs),
    /// Delete gear together with all of its runs.
    Rm(GearIdArgs),
}

#[derive(Args, Debug)]
pub struct GearAddArgs {
    #[arg(long)]
    pub name: String,

    /// Distance already on the gear before tracking started.
    #[arg(long, default_value_t = 0.0)]
    pub start_distance: f64,

    /// Expected lifetime distance; 0 means no limit. Defaults to the config value.
    #[arg(long)]
    pub max_distance: Option<f64>,

    /// Expiry date (YYYY-MM-DD).
    #[arg(long)]
    pub expires: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub struct GearListArgs {
    /// Include retired gear.
    #[arg(long)]
    pub all: bool,
}

#[derive(Args, Debug)]
pub struct GearIdArgs {
    pub id: GearId,
}

#[derive(Args, Debug)]
pub struct GearEditArgs {
    pub id: GearId,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub start_distance: Option<f64>,

    #[arg(long)]
    pub max_distance: Option<f64>,

    /// Explicit sort key.
    #[arg(long)]
    pub order: Option<f64>,

    /// New expiry date (YYYY-MM-DD).
    #[arg(long, conflicts_with = "clear_expiry")]
    pub expires: Option<NaiveDate>,

    /// Remove the expiry date.
    #[arg(long)]
    pub clear_expiry: bool,
}

impl GearEditArgs {
    fn patch(&self) -> GearPatch {
        GearPatch {
            name: self.name.clone(),
            start_distance: self.start_distance,
            max_distance: self.max_distance,
            ordering_value: self.order,
            retired: None,
            expires_on: if self.clear_expiry {
                Some(None)
            } else {
                self.expires.map(Some)
            },
        }
    }
}

/// Gear as printed by every `tread gear` subcommand.
#[derive(Debug, Serialize)]
pub struct GearView {
    pub id: GearId,
    pub name: String,
    pub start_distance: f64,
    pub total_distance: f64,
    pub max_distance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_distance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wear_fraction: Option<f64>,
    pub ordering_value: f64,
    pub retired: bool,
    pub expired: bool,
    pub created_at: NaiveDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_on: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<CliError>,
}

impl GearView {
    #[must_use]
    pub fn new(gear: Gear, today: NaiveDate) -> Self {
        Self {
            remaining_distance: gear.remaining_distance(),
            wear_fraction: gear.wear_fraction(),
            expired: gear.is_expired(today),
            id: gear.id,
            name: gear.name,
            start_distance: gear.start_distance,
            total_distance: gear.total_distance,
            max_distance: gear.max_distance,
            ordering_value: gear.ordering_value,
            retired: gear.retired,
            created_at: gear.created_at,
            expires_on: gear.expires_on,
            warning: None,
        }
    }

    fn status(&self) -> &'static str {
        match (self.retired, self.expired) {
            (true, _) => "retired",
            (false, true) => "expired",
            (false, false) => "active",
        }
    }

    fn wear(&self) -> String {
        self.wear_fraction
            .map_or_else(|| "-".to_string(), |wear| format!("{:.0}%", wear * 100.0))
    }
}

impl Renderable for GearView {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        pretty_section(w, &format!("#{} {}", self.id, self.name))?;
        pretty_kv(w, "Total", distance(self.total_distance))?;
        pretty_kv(w, "Start", distance(self.start_distance))?;
        if self.max_distance > 0.0 {
            pretty_kv(w, "Limit", distance(self.max_distance))?;
            pretty_kv(w, "Remaining", distance(self.remaining_distance.unwrap_or(0.0)))?;
            pretty_kv(w, "Wear", self.wear())?;
        }
        pretty_kv(w, "Status", self.status())?;
        if let Some(expires) = self.expires_on {
            pretty_kv(w, "Expires", expires.to_string())?;
        }
        pretty_kv(w, "Added", self.created_at.format("%Y-%m-%d").to_string())?;
        writeln!(w)
    }

    fn render_json(&self, w: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut *w, self).map_err(io::Error::other)?;
        writeln!(w)
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(
            w,
            "{}  {}  {}  {}  {}",
            self.id,
            distance(self.total_distance),
            self.wear(),
            self.status(),
            self.name
        )
    }

    fn table_headers() -> &'static [&'static str] {
        &["ID", "TOTAL", "WEAR", "STATUS", "NAME"]
    }
}

/// Execute a `tread gear` subcommand.
///
/// # Errors
///
/// Returns an error if the store cannot be opened, the gear is missing, a
/// distance is invalid, or output rendering fails.
pub fn run_gear(command: &GearCommand, ctx: &Context) -> anyhow::Result<()> {
    let maintainer = ctx.open()?;
    let today = now().date();

    match command {
        GearCommand::Add(args) => {
            let gear = maintainer
                .create_gear(&NewGear {
                    name: args.name.trim().to_string(),
                    start_distance: args.start_distance,
                    max_distance: args
                        .max_distance
                        .unwrap_or(ctx.config.gear.default_max_distance),
                    created_at: now(),
                    expires_on: args.expires,
                })
                .map_err(|err| ctx.fail(err))?;
            tracing::info!(gear_id = %gear.id, name = %gear.name, "added gear");
            render_item(&GearView::new(gear, today), ctx.output)?;
        }
        GearCommand::List(args) => {
            let views: Vec<GearView> = maintainer
                .store()
                .list_gear()
                .map_err(|err| ctx.fail(err.into()))?
                .into_iter()
                .filter(|gear| args.all || !gear.retired)
                .map(|gear| GearView::new(gear, today))
                .collect();
            render_list(&views, ctx.output)?;
        }
        GearCommand::Show(args) => {
            let gear = maintainer
                .store()
                .get_gear(args.id)
                .map_err(|err| ctx.fail(err.into()))?
                .ok_or_else(|| ctx.fail(TrackError::NotFound(RecordId::Gear(args.id))))?;
            render_item(&GearView::new(gear, today), ctx.output)?;
        }
        GearCommand::Retire(args) | GearCommand::Unretire(args) => {
            let retired = matches!(command, GearCommand::Retire(_));
            let patch = GearPatch {
                retired: Some(retired),
                ..GearPatch::default()
            };
            apply_patch(ctx, &maintainer, args.id, &patch, today)?;
        }
        GearCommand::Edit(args) => {
            apply_patch(ctx, &maintainer, args.id, &args.patch(), today)?;
        }
        GearCommand::Rm(args) => {
            let removed = maintainer
                .delete_gear(args.id)
                .map_err(|err| ctx.fail(err))?;
            tracing::info!(gear_id = %removed.id, "removed gear");
            render(ctx.output, &GearView::new(removed, today), |gear, w| {
                writeln!(w, "removed gear {} ({})", gear.id, gear.name)
            })?;
        }
    }

    Ok(())
}

fn apply_patch(
    ctx: &Context,
    maintainer: &Maintainer<SqliteStore>,
    id: GearId,
    patch: &GearPatch,
    today: NaiveDate,
) -> anyhow::Result<()> {
    let mutation = maintainer
        .update_gear(id, patch)
        .map_err(|err| ctx.fail(err))?;
    let warning = ctx.warn_if_stale(&mutation)?;
    let mut view = GearView::new(mutation.value, today);
    view.warning = warning;
    render_item(&view, ctx.output)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    fn gear(total: f64, max: f64, retired: bool) -> Gear {
        Gear {
            id: GearId(4),
            name: "Tempo".into(),
            start_distance: 0.0,
            total_distance: total,
            max_distance: max,
            ordering_value: 1.0,
            retired,
            created_at: NaiveDate::from_ymd_opt(2024, 3, 1)
                .and_then(|d| d.and_hms_opt(8, 0, 0))
                .expect("valid timestamp"),
            expires_on: None,
        }
    }

    fn table_row(view: &GearView) -> String {
        let mut buf = Vec::new();
        view.render_table(&mut buf).expect("render");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn view_includes_wear() {
        let today = NaiveDate::from_ymd_opt(2024, 4, 1).expect("valid date");
        let view = GearView::new(gear(250.0, 500.0, false), today);
        assert_eq!(view.wear_fraction, Some(0.5));
        assert_eq!(view.remaining_distance, Some(250.0));
        assert_eq!(table_row(&view), "4  250.00  50%  active  Tempo\n");
    }

    #[test]
    fn retired_gear_without_limit() {
        let today = NaiveDate::from_ymd_opt(2024, 4, 1).expect("valid date");
        let view = GearView::new(gear(12.0, 0.0, true), today);
        assert_eq!(table_row(&view), "4  12.00  -  retired  Tempo\n");
    }

    #[test]
    fn clear_expiry_patch() {
        let args = GearEditArgs {
            id: GearId(1),
            name: None,
            start_distance: None,
            max_distance: None,
            order: Some(9.5),
            expires: None,
            clear_expiry: true,
        };
        let patch = args.patch();
        assert_eq!(patch.expires_on, Some(None));
        assert_eq!(patch.ordering_value, Some(9.5));
        assert!(patch.retired.is_none());
    }
}
