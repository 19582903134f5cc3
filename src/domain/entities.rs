use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;
use validator::{Validate, ValidationError};

// ============================================================================
// Enumerations
// ============================================================================

/// Protective device categories found on a DIN rail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum FuseType {
    /// Miniature Circuit Breaker
    Mcb,
    /// Residual Current Breaker with Overcurrent
    Rcbo,
    /// Residual Current Device
    Rcd,
    /// Main switch/breaker
    Main,
    /// Surge Protection Device - inline protection, owns no load branch
    Spd,
    /// Generic DIN rail device
    DinDevice,
}

impl FuseType {
    /// SPD fuses are inline protection only and may never own sockets,
    /// junction boxes or hardwired devices.
    pub fn is_load_branch(&self) -> bool {
        !matches!(self, FuseType::Spd)
    }
}

/// Trip curve of a breaker. Always absent on SPD fuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum CurveType {
    /// General purpose (3-5x In)
    B,
    /// Motor loads (5-10x In)
    C,
    /// High inrush (10-20x In)
    D,
}

/// SPD installation class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum SpdClass {
    /// Service entrance protection
    Type1,
    /// Distribution board protection
    Type2,
    /// Equipment protection
    Type3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeviceCategory {
    Appliance,
    Lighting,
    Outlet,
    Heating,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DeviceIcon {
    Dishwasher,
    WashingMachine,
    Oven,
    Fridge,
    Microwave,
    Dryer,
    Freezer,
    Hood,
    CeilingLight,
    Lamp,
    LedStrip,
    OutdoorLight,
    WallOutlet,
    KitchenOutlet,
    FloorHeating,
    WaterHeater,
    HeatPump,
    Radiator,
    EvCharger,
    Alarm,
    Router,
    Server,
    Tv,
    Computer,
    Generic,
}

// ============================================================================
// Entities
// ============================================================================

/// A physical room. Referenced, never owned, by sockets, junction boxes,
/// devices and fuses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: Uuid,
    pub name: String,
    /// Short code used in auto-generated labels ("KIT", "LR2"). 2-5
    /// uppercase alphanumerics when present.
    pub code: Option<String>,
    pub color: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A distribution panel. A panel with `parent_fuse_id` set is a sub-panel
/// fed from a fuse in another panel; without it the panel is a root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Panel {
    pub id: Uuid,
    pub name: String,
    pub location: Option<String>,
    pub main_breaker_amperage: Option<u32>,
    pub main_breaker_type: Option<String>,
    pub main_breaker_poles: Option<u8>,
    pub main_breaker_curve: Option<CurveType>,
    pub main_breaker_manufacturer: Option<String>,
    pub main_breaker_model: Option<String>,
    /// Fuse in the parent panel that feeds this sub-panel (1:1).
    pub parent_fuse_id: Option<Uuid>,
    /// Amperage of the feed from the parent fuse. Never exceeds the parent
    /// fuse's amperage when that amperage is defined.
    pub feed_amperage: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Panel {
    pub fn is_sub_panel(&self) -> bool {
        self.parent_fuse_id.is_some()
    }
}

/// A DIN rail row inside a panel. Deletable only when empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    pub id: Uuid,
    pub panel_id: Uuid,
    pub label: Option<String>,
    /// Ordering key, unique per panel by convention. Gaps permitted.
    pub position: i32,
    /// Capacity limit checked before assigning or moving a fuse in.
    pub max_fuses: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A breaker/fuse occupying a panel slot. The unit that owns downstream
/// load: sockets, junction boxes, hardwired devices and at most one
/// sub-panel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fuse {
    pub id: Uuid,
    pub panel_id: Uuid,
    /// None = unassigned fuse floating outside any row.
    pub row_id: Option<Uuid>,
    pub label: Option<String>,
    pub sort_order: i32,
    /// Display position. Unique-ish per row but not enforced unique.
    pub slot_number: Option<i32>,
    pub poles: u8,
    pub amperage: Option<u32>,
    #[serde(rename = "type")]
    pub fuse_type: FuseType,
    pub curve_type: Option<CurveType>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub is_active: bool,
    pub color: Option<String>,
    pub notes: Option<String>,
    pub device_url: Option<String>,
    // SPD-only ratings, mutually exclusive with breaker curve semantics.
    pub voltage_rating: Option<u32>,
    pub surge_current_rating: Option<u32>,
    pub spd_class: Option<SpdClass>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An outlet-style load point hosting zero or more devices. Owned by
/// exactly one of a fuse or a junction box.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Socket {
    pub id: Uuid,
    pub fuse_id: Option<Uuid>,
    pub junction_box_id: Option<Uuid>,
    pub label: Option<String>,
    pub sort_order: i32,
    pub room_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A branch point on a fuse that hosts sockets and hardwired devices.
/// Junction boxes do not nest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JunctionBox {
    pub id: Uuid,
    pub fuse_id: Uuid,
    pub label: Option<String>,
    pub sort_order: i32,
    pub room_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A consumer of power. At most one structural parent among socket, fuse
/// and junction box; a device with no parent is unassigned.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: Uuid,
    pub socket_id: Option<Uuid>,
    pub fuse_id: Option<Uuid>,
    pub junction_box_id: Option<Uuid>,
    pub name: String,
    pub icon: DeviceIcon,
    pub category: DeviceCategory,
    pub room_id: Option<Uuid>,
    pub estimated_wattage: Option<u32>,
    /// A hardwired device may still be parented to a socket, meaning it is
    /// physically hardwired near that socket location.
    pub is_hardwired: bool,
    pub sort_order: i32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Device {
    pub fn parent(&self) -> Option<DeviceParent> {
        match (self.socket_id, self.fuse_id, self.junction_box_id) {
            (Some(id), _, _) => Some(DeviceParent::Socket(id)),
            (_, Some(id), _) => Some(DeviceParent::Fuse(id)),
            (_, _, Some(id)) => Some(DeviceParent::JunctionBox(id)),
            _ => None,
        }
    }
}

/// The three nullable owner fields of a device collapsed to a tagged
/// variant. External shapes keep the nullable triple for compatibility;
/// validation goes through this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceParent {
    Socket(Uuid),
    Fuse(Uuid),
    JunctionBox(Uuid),
}

// ============================================================================
// Mutation inputs
// ============================================================================

/// Deserializes a field that distinguishes "absent" (leave unchanged) from
/// "null" (clear). Used on PATCH-style update inputs.
pub fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

fn valid_room_code(code: &str) -> Result<(), ValidationError> {
    let ok = (2..=5).contains(&code.len())
        && code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
    if ok {
        Ok(())
    } else {
        Err(ValidationError::new("room_code"))
    }
}

fn valid_hex_color(color: &str) -> Result<(), ValidationError> {
    let ok = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());
    if ok {
        Ok(())
    } else {
        Err(ValidationError::new("hex_color"))
    }
}

fn default_color() -> String {
    "#6B7280".to_string()
}

fn default_true() -> bool {
    true
}

fn default_icon() -> DeviceIcon {
    DeviceIcon::Generic
}

fn default_category() -> DeviceCategory {
    DeviceCategory::Other
}

fn default_max_fuses() -> u32 {
    10
}

fn default_poles() -> u8 {
    1
}

fn default_fuse_type() -> FuseType {
    FuseType::Mcb
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoom {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(custom(function = "valid_room_code"))]
    pub code: Option<String>,
    #[serde(default = "default_color")]
    #[validate(custom(function = "valid_hex_color"))]
    pub color: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoom {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub code: Option<Option<String>>,
    #[validate(custom(function = "valid_hex_color"))]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePanel {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 200))]
    pub location: Option<String>,
    #[validate(range(min = 1, max = 1000))]
    pub main_breaker_amperage: Option<u32>,
    #[validate(length(max = 50))]
    pub main_breaker_type: Option<String>,
    #[validate(range(min = 1, max = 4))]
    pub main_breaker_poles: Option<u8>,
    pub main_breaker_curve: Option<CurveType>,
    #[validate(length(max = 100))]
    pub main_breaker_manufacturer: Option<String>,
    #[validate(length(max = 100))]
    pub main_breaker_model: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePanel {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(range(min = 1, max = 1000))]
    pub main_breaker_amperage: Option<Option<u32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub main_breaker_type: Option<Option<String>>,
}

/// Input for attaching a new sub-panel to a fuse.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubPanel {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 200))]
    pub location: Option<String>,
    #[validate(range(min = 1, max = 1000))]
    pub feed_amperage: u32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRow {
    #[validate(length(max = 100))]
    pub label: Option<String>,
    pub position: Option<i32>,
    #[serde(default = "default_max_fuses")]
    #[validate(range(min = 1, max = 50))]
    pub max_fuses: u32,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRow {
    #[serde(default, deserialize_with = "double_option")]
    pub label: Option<Option<String>>,
    pub position: Option<i32>,
    #[validate(range(min = 1, max = 50))]
    pub max_fuses: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateFuse {
    pub row_id: Option<Uuid>,
    #[validate(length(max = 100))]
    pub label: Option<String>,
    pub sort_order: Option<i32>,
    #[validate(range(min = 1, max = 999))]
    pub slot_number: Option<i32>,
    #[serde(default = "default_poles")]
    #[validate(range(min = 1, max = 4))]
    pub poles: u8,
    #[validate(range(min = 1, max = 125))]
    pub amperage: Option<u32>,
    #[serde(rename = "type", default = "default_fuse_type")]
    pub fuse_type: FuseType,
    pub curve_type: Option<CurveType>,
    #[validate(length(max = 100))]
    pub manufacturer: Option<String>,
    #[validate(length(max = 100))]
    pub model: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[validate(length(max = 20))]
    pub color: Option<String>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
    #[validate(length(max = 500))]
    pub device_url: Option<String>,
    pub voltage_rating: Option<u32>,
    pub surge_current_rating: Option<u32>,
    pub spd_class: Option<SpdClass>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFuse {
    #[serde(default, deserialize_with = "double_option")]
    pub label: Option<Option<String>>,
    pub sort_order: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(range(min = 1, max = 999))]
    pub slot_number: Option<Option<i32>>,
    #[validate(range(min = 1, max = 4))]
    pub poles: Option<u8>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(range(min = 1, max = 125))]
    pub amperage: Option<Option<u32>>,
    #[serde(rename = "type")]
    pub fuse_type: Option<FuseType>,
    #[serde(default, deserialize_with = "double_option")]
    pub curve_type: Option<Option<CurveType>>,
    #[serde(default, deserialize_with = "double_option")]
    pub manufacturer: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub model: Option<Option<String>>,
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub color: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub device_url: Option<Option<String>>,
}

/// Target of a fuse move: a row (validated against its capacity) or the
/// panel's unassigned collection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveFuse {
    pub row_id: Option<Uuid>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSocket {
    #[validate(length(max = 100))]
    pub label: Option<String>,
    pub sort_order: Option<i32>,
    pub room_id: Option<Uuid>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSocket {
    #[validate(length(max = 100))]
    pub label: Option<String>,
    pub sort_order: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    pub room_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateJunctionBox {
    #[validate(length(max = 100))]
    pub label: Option<String>,
    pub sort_order: Option<i32>,
    pub room_id: Option<Uuid>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateJunctionBox {
    #[validate(length(max = 100))]
    pub label: Option<String>,
    pub sort_order: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    pub room_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateDevice {
    pub socket_id: Option<Uuid>,
    pub fuse_id: Option<Uuid>,
    pub junction_box_id: Option<Uuid>,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default = "default_icon")]
    pub icon: DeviceIcon,
    #[serde(default = "default_category")]
    pub category: DeviceCategory,
    pub room_id: Option<Uuid>,
    #[validate(range(min = 0, max = 50000))]
    pub estimated_wattage: Option<u32>,
    #[serde(default)]
    pub is_hardwired: bool,
    pub sort_order: Option<i32>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDevice {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub icon: Option<DeviceIcon>,
    pub category: Option<DeviceCategory>,
    #[serde(default, deserialize_with = "double_option")]
    pub room_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(range(min = 0, max = 50000))]
    pub estimated_wattage: Option<Option<u32>>,
    pub is_hardwired: Option<bool>,
    pub sort_order: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
}

/// Target of a device move. All refs absent means "unassign".
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveDevice {
    pub socket_id: Option<Uuid>,
    pub fuse_id: Option<Uuid>,
    pub junction_box_id: Option<Uuid>,
    pub sort_order: Option<i32>,
}
