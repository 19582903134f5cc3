//! Per-fuse load aggregation. Sums the estimated wattage of every device
//! reachable from a fuse and classifies the load fraction against the
//! fuse's rated capacity.

use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

use super::entities::Device;
use super::topology::FuseView;

/// Nominal line voltage in volts.
pub const VOLTAGE: u32 = 230;

/// Load fraction below 70% is safe, 70% up to 90% is a warning, 90% and
/// above is danger. Boundaries are exact: 70.0 is already a warning.
const WARNING_THRESHOLD_PERCENT: f64 = 70.0;
const DANGER_THRESHOLD_PERCENT: f64 = 90.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LoadStatus {
    Safe,
    Warning,
    Danger,
}

impl LoadStatus {
    pub fn from_percentage(load_percentage: f64) -> Self {
        if load_percentage < WARNING_THRESHOLD_PERCENT {
            LoadStatus::Safe
        } else if load_percentage < DANGER_THRESHOLD_PERCENT {
            LoadStatus::Warning
        } else {
            LoadStatus::Danger
        }
    }

    /// Indicator color used by print and export views.
    pub fn color(&self) -> &'static str {
        match self {
            LoadStatus::Safe => "#22C55E",
            LoadStatus::Warning => "#EAB308",
            LoadStatus::Danger => "#EF4444",
        }
    }
}

/// Result of a load computation. Carries no error state: every input,
/// including a fuse with no amperage or no devices, produces a defined
/// result (0% reads as safe).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadCalculation {
    pub fuse_id: Uuid,
    pub total_wattage: u32,
    pub max_wattage: u32,
    pub load_percentage: f64,
    pub status: LoadStatus,
}

fn classify(fuse_id: Uuid, total_wattage: u32, amperage: Option<u32>) -> LoadCalculation {
    let max_wattage = amperage.map_or(0, |a| a * VOLTAGE);
    let load_percentage = if max_wattage > 0 {
        (total_wattage as f64 / max_wattage as f64) * 100.0
    } else {
        0.0
    };

    LoadCalculation {
        fuse_id,
        total_wattage,
        max_wattage,
        load_percentage,
        status: LoadStatus::from_percentage(load_percentage),
    }
}

fn wattage_of<'a>(devices: impl IntoIterator<Item = &'a Device>) -> u32 {
    devices
        .into_iter()
        .map(|d| d.estimated_wattage.unwrap_or(0))
        .sum()
}

/// Aggregates the wattage of every device reachable from the fuse branch:
/// devices in directly owned sockets, devices in junction boxes (and the
/// junction boxes' own sockets - boxes do not nest), and devices hardwired
/// to the fuse. SPD fuses always total zero.
pub fn calculate_load(fuse: &FuseView) -> LoadCalculation {
    if !fuse.fuse.fuse_type.is_load_branch() {
        return classify(fuse.fuse.id, 0, fuse.fuse.amperage);
    }

    let mut total = wattage_of(fuse.sockets.iter().flat_map(|s| s.devices.iter().map(|d| &d.device)));
    for junction_box in &fuse.junction_boxes {
        total += wattage_of(junction_box.devices.iter().map(|d| &d.device));
        total += wattage_of(
            junction_box
                .sockets
                .iter()
                .flat_map(|s| s.devices.iter().map(|d| &d.device)),
        );
    }
    total += wattage_of(fuse.hardwired_devices.iter().map(|d| &d.device));

    classify(fuse.fuse.id, total, fuse.fuse.amperage)
}

/// Flat variant for call sites that already hold the reachable device set.
/// Produces the same totals as [`calculate_load`] over an equivalent
/// flattened list.
pub fn calculate_load_from_devices(
    fuse_id: Uuid,
    amperage: Option<u32>,
    devices: &[Device],
) -> LoadCalculation {
    classify(fuse_id, wattage_of(devices), amperage)
}

/// "650W" below a kilowatt, "1.8kW" above.
pub fn format_wattage(wattage: u32) -> String {
    if wattage >= 1000 {
        format!("{:.1}kW", wattage as f64 / 1000.0)
    } else {
        format!("{wattage}W")
    }
}
