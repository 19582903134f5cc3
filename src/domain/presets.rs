//! Curated equipment tables: fuse type metadata, common ratings and the
//! device palette presets offered when documenting a panel.

use serde::Serialize;

use super::entities::{CurveType, DeviceCategory, DeviceIcon, FuseType, SpdClass};

/// Display metadata for a fuse type.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FuseTypeInfo {
    pub value: FuseType,
    pub label: &'static str,
    pub description: &'static str,
    /// DIN slots the device typically occupies.
    pub default_slot_width: u8,
    pub color: &'static str,
}

pub const FUSE_TYPES: &[FuseTypeInfo] = &[
    FuseTypeInfo {
        value: FuseType::Mcb,
        label: "MCB",
        description: "Miniature Circuit Breaker",
        default_slot_width: 1,
        color: "#3B82F6",
    },
    FuseTypeInfo {
        value: FuseType::Rcbo,
        label: "RCBO",
        description: "Residual Current Breaker with Overcurrent",
        default_slot_width: 2,
        color: "#8B5CF6",
    },
    FuseTypeInfo {
        value: FuseType::Rcd,
        label: "RCD",
        description: "Residual Current Device",
        default_slot_width: 2,
        color: "#EC4899",
    },
    FuseTypeInfo {
        value: FuseType::Main,
        label: "Main",
        description: "Main Switch/Breaker",
        default_slot_width: 3,
        color: "#EF4444",
    },
    FuseTypeInfo {
        value: FuseType::Spd,
        label: "SPD",
        description: "Surge Protection Device",
        default_slot_width: 1,
        color: "#F59E0B",
    },
    FuseTypeInfo {
        value: FuseType::DinDevice,
        label: "DIN Device",
        description: "Generic DIN Rail Device",
        default_slot_width: 1,
        color: "#6B7280",
    },
];

#[derive(Debug, Clone, Serialize)]
pub struct CurveTypeInfo {
    pub value: CurveType,
    pub description: &'static str,
}

pub const CURVE_TYPES: &[CurveTypeInfo] = &[
    CurveTypeInfo { value: CurveType::B, description: "General purpose (3-5x In)" },
    CurveTypeInfo { value: CurveType::C, description: "Motor loads (5-10x In)" },
    CurveTypeInfo { value: CurveType::D, description: "High inrush (10-20x In)" },
];

/// Breaker ratings commonly stocked, in amperes.
pub const COMMON_AMPERAGES: &[u32] = &[6, 10, 13, 15, 16, 20, 25, 32, 40, 50, 63, 80, 100];

/// SPD voltage ratings in volts.
pub const SPD_VOLTAGE_RATINGS: &[u32] = &[230, 400, 480, 690];

/// SPD surge current ratings in kA.
pub const SPD_SURGE_CURRENT_RATINGS: &[u32] = &[5, 10, 15, 20, 25, 40, 50, 65, 100];

#[derive(Debug, Clone, Serialize)]
pub struct SpdClassInfo {
    pub value: SpdClass,
    pub description: &'static str,
}

pub const SPD_CLASSES: &[SpdClassInfo] = &[
    SpdClassInfo { value: SpdClass::Type1, description: "Service entrance protection" },
    SpdClassInfo { value: SpdClass::Type2, description: "Distribution board protection" },
    SpdClassInfo { value: SpdClass::Type3, description: "Equipment protection" },
];

/// How a preset device is typically connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    Socket,
    Hardwired,
    /// Either connection is common in the field.
    Flexible,
}

/// A palette entry with a typical wattage estimate.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DevicePreset {
    pub name: &'static str,
    pub icon: DeviceIcon,
    pub category: DeviceCategory,
    pub estimated_wattage: u32,
    pub connection_type: ConnectionType,
}

macro_rules! preset {
    ($name:expr, $icon:ident, $category:ident, $watts:expr, $conn:ident) => {
        DevicePreset {
            name: $name,
            icon: DeviceIcon::$icon,
            category: DeviceCategory::$category,
            estimated_wattage: $watts,
            connection_type: ConnectionType::$conn,
        }
    };
}

pub const DEVICE_PRESETS: &[DevicePreset] = &[
    // Appliances
    preset!("Dishwasher", Dishwasher, Appliance, 1800, Flexible),
    preset!("Washing Machine", WashingMachine, Appliance, 2200, Flexible),
    preset!("Tumble Dryer", Dryer, Appliance, 2500, Flexible),
    preset!("Oven", Oven, Appliance, 3500, Flexible),
    preset!("Induction Hob", Oven, Appliance, 7200, Hardwired),
    preset!("Fridge", Fridge, Appliance, 150, Socket),
    preset!("Freezer", Freezer, Appliance, 200, Socket),
    preset!("Fridge/Freezer Combo", Fridge, Appliance, 250, Socket),
    preset!("Microwave", Microwave, Appliance, 1200, Socket),
    preset!("Range Hood", Hood, Appliance, 200, Hardwired),
    // Lighting
    preset!("Ceiling Light", CeilingLight, Lighting, 60, Hardwired),
    preset!("LED Downlights", CeilingLight, Lighting, 50, Hardwired),
    preset!("Floor Lamp", Lamp, Lighting, 40, Socket),
    preset!("Table Lamp", Lamp, Lighting, 25, Socket),
    preset!("LED Strip", LedStrip, Lighting, 30, Flexible),
    preset!("Outdoor Light", OutdoorLight, Lighting, 50, Hardwired),
    preset!("Garden Lighting", OutdoorLight, Lighting, 100, Flexible),
    // Outlets
    preset!("Wall Outlet", WallOutlet, Outlet, 0, Hardwired),
    preset!("Kitchen Outlet", KitchenOutlet, Outlet, 0, Hardwired),
    preset!("Bathroom Outlet", WallOutlet, Outlet, 0, Hardwired),
    preset!("Outdoor Outlet", WallOutlet, Outlet, 0, Hardwired),
    // Heating
    preset!("Floor Heating", FloorHeating, Heating, 1500, Hardwired),
    preset!("Electric Radiator", Radiator, Heating, 1000, Flexible),
    preset!("Water Heater", WaterHeater, Heating, 2000, Flexible),
    preset!("Heat Pump", HeatPump, Heating, 1500, Flexible),
    preset!("Towel Warmer", Radiator, Heating, 100, Flexible),
    // Other
    preset!("EV Charger", EvCharger, Other, 7400, Hardwired),
    preset!("Alarm System", Alarm, Other, 50, Flexible),
    preset!("Router", Router, Other, 20, Socket),
    preset!("NAS/Server", Server, Other, 100, Socket),
    preset!("TV", Tv, Other, 150, Socket),
    preset!("Computer", Computer, Other, 300, Socket),
    preset!("Gaming PC", Computer, Other, 600, Socket),
];

/// Feed amperages offered when attaching a sub-panel.
pub const SUB_PANEL_FEED_OPTIONS: &[u32] = &[20, 30, 40, 60, 80, 100, 125, 150, 200];
