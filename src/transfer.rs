//! Versioned export documents and best-effort import.
//!
//! Export emits the full ordered panel tree plus rooms and unassigned
//! devices. Import replays the document through the store's validated
//! mutations: every record is attempted independently, failures are
//! collected as human-readable strings and never abort the rest of the
//! document. Fresh ids are minted on import; room and fuse references are
//! remapped through translation tables built as records land.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use crate::domain::entities::{
    CreateDevice, CreateFuse, CreateJunctionBox, CreatePanel, CreateRoom, CreateRow, CreateSocket,
    CreateSubPanel, CurveType, Device, DeviceCategory, DeviceIcon, FuseType, Room, SpdClass,
};
use crate::domain::topology::{DeviceView, FuseView, JunctionBoxView, PanelView, SocketView};
use crate::store::PanelStore;

pub const EXPORT_VERSION: &str = "1.0.0";

// ============================================================================
// Document shapes
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub panels: Vec<PanelRecord>,
    pub rooms: Vec<RoomRecord>,
    #[serde(default)]
    pub unassigned_devices: Vec<DeviceRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRecord {
    /// Id in the exporting installation, used only for remapping.
    pub id: Option<Uuid>,
    pub name: String,
    pub code: Option<String>,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelRecord {
    pub id: Option<Uuid>,
    pub name: String,
    pub location: Option<String>,
    pub main_breaker_amperage: Option<u32>,
    pub main_breaker_type: Option<String>,
    /// Old id of the feeding fuse when this panel is a sub-panel.
    pub parent_fuse_id: Option<Uuid>,
    pub feed_amperage: Option<u32>,
    #[serde(default)]
    pub rows: Vec<RowRecord>,
    #[serde(default)]
    pub unassigned_fuses: Vec<FuseRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowRecord {
    pub label: Option<String>,
    pub position: i32,
    pub max_fuses: u32,
    #[serde(default)]
    pub fuses: Vec<FuseRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuseRecord {
    pub id: Option<Uuid>,
    pub label: Option<String>,
    pub sort_order: i32,
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
    pub voltage_rating: Option<u32>,
    pub surge_current_rating: Option<u32>,
    pub spd_class: Option<SpdClass>,
    #[serde(default)]
    pub sockets: Vec<SocketRecord>,
    #[serde(default)]
    pub junction_boxes: Vec<JunctionBoxRecord>,
    /// Devices hardwired directly to the fuse.
    #[serde(default)]
    pub devices: Vec<DeviceRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocketRecord {
    pub label: Option<String>,
    pub sort_order: i32,
    pub room_id: Option<Uuid>,
    pub notes: Option<String>,
    #[serde(default)]
    pub devices: Vec<DeviceRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JunctionBoxRecord {
    pub label: Option<String>,
    pub sort_order: i32,
    pub room_id: Option<Uuid>,
    pub notes: Option<String>,
    #[serde(default)]
    pub sockets: Vec<SocketRecord>,
    #[serde(default)]
    pub devices: Vec<DeviceRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    pub name: String,
    pub icon: DeviceIcon,
    pub category: DeviceCategory,
    pub room_id: Option<Uuid>,
    pub estimated_wattage: Option<u32>,
    #[serde(default)]
    pub is_hardwired: bool,
    pub sort_order: i32,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub success: bool,
    pub panels_imported: u32,
    pub fuses_imported: u32,
    pub sockets_imported: u32,
    pub devices_imported: u32,
    pub rooms_imported: u32,
    pub errors: Vec<String>,
}

// ============================================================================
// Export
// ============================================================================

fn device_record(view: &DeviceView) -> DeviceRecord {
    let device = &view.device;
    DeviceRecord {
        name: device.name.clone(),
        icon: device.icon,
        category: device.category,
        room_id: device.room_id,
        estimated_wattage: device.estimated_wattage,
        is_hardwired: device.is_hardwired,
        sort_order: device.sort_order,
        notes: device.notes.clone(),
    }
}

fn unassigned_device_record(device: &Device) -> DeviceRecord {
    DeviceRecord {
        name: device.name.clone(),
        icon: device.icon,
        category: device.category,
        room_id: device.room_id,
        estimated_wattage: device.estimated_wattage,
        is_hardwired: device.is_hardwired,
        sort_order: device.sort_order,
        notes: device.notes.clone(),
    }
}

fn socket_record(view: &SocketView) -> SocketRecord {
    SocketRecord {
        label: view.socket.label.clone(),
        sort_order: view.socket.sort_order,
        room_id: view.socket.room_id,
        notes: view.socket.notes.clone(),
        devices: view.devices.iter().map(device_record).collect(),
    }
}

fn junction_box_record(view: &JunctionBoxView) -> JunctionBoxRecord {
    JunctionBoxRecord {
        label: view.junction_box.label.clone(),
        sort_order: view.junction_box.sort_order,
        room_id: view.junction_box.room_id,
        notes: view.junction_box.notes.clone(),
        sockets: view.sockets.iter().map(socket_record).collect(),
        devices: view.devices.iter().map(device_record).collect(),
    }
}

fn fuse_record(view: &FuseView) -> FuseRecord {
    let fuse = &view.fuse;
    FuseRecord {
        id: Some(fuse.id),
        label: fuse.label.clone(),
        sort_order: fuse.sort_order,
        slot_number: fuse.slot_number,
        poles: fuse.poles,
        amperage: fuse.amperage,
        fuse_type: fuse.fuse_type,
        curve_type: fuse.curve_type,
        manufacturer: fuse.manufacturer.clone(),
        model: fuse.model.clone(),
        is_active: fuse.is_active,
        color: fuse.color.clone(),
        notes: fuse.notes.clone(),
        device_url: fuse.device_url.clone(),
        voltage_rating: fuse.voltage_rating,
        surge_current_rating: fuse.surge_current_rating,
        spd_class: fuse.spd_class,
        sockets: view.sockets.iter().map(socket_record).collect(),
        junction_boxes: view.junction_boxes.iter().map(junction_box_record).collect(),
        devices: view.hardwired_devices.iter().map(device_record).collect(),
    }
}

fn panel_record(view: &PanelView) -> PanelRecord {
    let panel = &view.panel;
    PanelRecord {
        id: Some(panel.id),
        name: panel.name.clone(),
        location: panel.location.clone(),
        main_breaker_amperage: panel.main_breaker_amperage,
        main_breaker_type: panel.main_breaker_type.clone(),
        parent_fuse_id: panel.parent_fuse_id,
        feed_amperage: panel.feed_amperage,
        rows: view
            .rows
            .iter()
            .map(|row| RowRecord {
                label: row.row.label.clone(),
                position: row.row.position,
                max_fuses: row.row.max_fuses,
                fuses: row.fuses.iter().map(fuse_record).collect(),
            })
            .collect(),
        unassigned_fuses: view.unassigned_fuses.iter().map(fuse_record).collect(),
    }
}

fn room_record(room: &Room) -> RoomRecord {
    RoomRecord {
        id: Some(room.id),
        name: room.name.clone(),
        code: room.code.clone(),
        color: room.color.clone(),
    }
}

/// Serializes the whole installation into a self-contained document.
pub fn export(store: &PanelStore) -> ExportDocument {
    let panels = store
        .panels()
        .iter()
        .filter_map(|p| store.panel_view(p.id).ok())
        .map(|view| panel_record(&view))
        .collect();

    ExportDocument {
        version: EXPORT_VERSION.to_string(),
        exported_at: Utc::now(),
        panels,
        rooms: store.rooms().iter().map(room_record).collect(),
        unassigned_devices: store
            .unassigned_devices()
            .iter()
            .map(unassigned_device_record)
            .collect(),
    }
}

// ============================================================================
// Import
// ============================================================================

struct ImportContext {
    room_map: HashMap<Uuid, Uuid>,
    fuse_map: HashMap<Uuid, Uuid>,
    result: ImportResult,
}

impl ImportContext {
    fn remap_room(&self, room_id: Option<Uuid>) -> Option<Uuid> {
        room_id.and_then(|old| self.room_map.get(&old).copied())
    }
}

fn import_device(
    store: &mut PanelStore,
    ctx: &mut ImportContext,
    record: &DeviceRecord,
    socket_id: Option<Uuid>,
    fuse_id: Option<Uuid>,
    junction_box_id: Option<Uuid>,
) {
    let input = CreateDevice {
        socket_id,
        fuse_id,
        junction_box_id,
        name: record.name.clone(),
        icon: record.icon,
        category: record.category,
        room_id: ctx.remap_room(record.room_id),
        estimated_wattage: record.estimated_wattage,
        is_hardwired: record.is_hardwired,
        sort_order: Some(record.sort_order),
        notes: record.notes.clone(),
    };
    match store.create_device(input) {
        Ok(_) => ctx.result.devices_imported += 1,
        Err(e) => ctx
            .result
            .errors
            .push(format!("failed to import device \"{}\": {e}", record.name)),
    }
}

fn import_socket(
    store: &mut PanelStore,
    ctx: &mut ImportContext,
    record: &SocketRecord,
    fuse_id: Option<Uuid>,
    junction_box_id: Option<Uuid>,
) {
    let input = CreateSocket {
        label: record.label.clone(),
        sort_order: Some(record.sort_order),
        room_id: ctx.remap_room(record.room_id),
        notes: record.notes.clone(),
    };
    let created = match (fuse_id, junction_box_id) {
        (Some(fuse_id), _) => store.create_socket_on_fuse(fuse_id, input),
        (_, Some(junction_box_id)) => store.create_socket_on_junction_box(junction_box_id, input),
        _ => return,
    };
    match created {
        Ok(socket) => {
            ctx.result.sockets_imported += 1;
            for device in &record.devices {
                import_device(store, ctx, device, Some(socket.id), None, None);
            }
        }
        Err(e) => {
            let label = record.label.as_deref().unwrap_or("unnamed");
            ctx.result
                .errors
                .push(format!("failed to import socket \"{label}\": {e}"));
        }
    }
}

fn import_fuse(
    store: &mut PanelStore,
    ctx: &mut ImportContext,
    record: &FuseRecord,
    panel_id: Uuid,
    row_id: Option<Uuid>,
) {
    let input = CreateFuse {
        row_id,
        label: record.label.clone(),
        sort_order: Some(record.sort_order),
        slot_number: record.slot_number,
        poles: record.poles,
        amperage: record.amperage,
        fuse_type: record.fuse_type,
        curve_type: record.curve_type,
        manufacturer: record.manufacturer.clone(),
        model: record.model.clone(),
        is_active: record.is_active,
        color: record.color.clone(),
        notes: record.notes.clone(),
        device_url: record.device_url.clone(),
        voltage_rating: record.voltage_rating,
        surge_current_rating: record.surge_current_rating,
        spd_class: record.spd_class,
    };

    let fuse = match store.create_fuse(panel_id, input) {
        Ok(fuse) => fuse,
        Err(e) => {
            let label = record.label.as_deref().unwrap_or("unnamed");
            ctx.result
                .errors
                .push(format!("failed to import fuse \"{label}\": {e}"));
            return;
        }
    };
    ctx.result.fuses_imported += 1;
    if let Some(old_id) = record.id {
        ctx.fuse_map.insert(old_id, fuse.id);
    }

    for socket in &record.sockets {
        import_socket(store, ctx, socket, Some(fuse.id), None);
    }
    for junction_box in &record.junction_boxes {
        let input = CreateJunctionBox {
            label: junction_box.label.clone(),
            sort_order: Some(junction_box.sort_order),
            room_id: ctx.remap_room(junction_box.room_id),
            notes: junction_box.notes.clone(),
        };
        match store.create_junction_box(fuse.id, input) {
            Ok(created) => {
                for socket in &junction_box.sockets {
                    import_socket(store, ctx, socket, None, Some(created.id));
                }
                for device in &junction_box.devices {
                    import_device(store, ctx, device, None, None, Some(created.id));
                }
            }
            Err(e) => {
                let label = junction_box.label.as_deref().unwrap_or("unnamed");
                ctx.result
                    .errors
                    .push(format!("failed to import junction box \"{label}\": {e}"));
            }
        }
    }
    for device in &record.devices {
        import_device(store, ctx, device, None, Some(fuse.id), None);
    }
}

fn import_panel(store: &mut PanelStore, ctx: &mut ImportContext, record: &PanelRecord) {
    let created = match record.parent_fuse_id {
        None => store.create_panel(CreatePanel {
            name: record.name.clone(),
            location: record.location.clone(),
            main_breaker_amperage: record.main_breaker_amperage,
            main_breaker_type: record.main_breaker_type.clone(),
            main_breaker_poles: None,
            main_breaker_curve: None,
            main_breaker_manufacturer: None,
            main_breaker_model: None,
        }),
        Some(old_fuse_id) => {
            let Some(&new_fuse_id) = ctx.fuse_map.get(&old_fuse_id) else {
                ctx.result.errors.push(format!(
                    "failed to import panel \"{}\": feeding fuse not found in document",
                    record.name
                ));
                return;
            };
            match record.feed_amperage {
                Some(feed_amperage) => store.create_sub_panel(
                    new_fuse_id,
                    CreateSubPanel {
                        name: record.name.clone(),
                        location: record.location.clone(),
                        feed_amperage,
                    },
                ),
                None => {
                    ctx.result.errors.push(format!(
                        "failed to import panel \"{}\": sub-panel without a feed amperage",
                        record.name
                    ));
                    return;
                }
            }
        }
    };

    let panel = match created {
        Ok(panel) => panel,
        Err(e) => {
            ctx.result
                .errors
                .push(format!("failed to import panel \"{}\": {e}", record.name));
            return;
        }
    };
    ctx.result.panels_imported += 1;

    for row in &record.rows {
        let input = CreateRow {
            label: row.label.clone(),
            position: Some(row.position),
            max_fuses: row.max_fuses,
        };
        match store.create_row(panel.id, input) {
            Ok(created) => {
                for fuse in &row.fuses {
                    import_fuse(store, ctx, fuse, panel.id, Some(created.id));
                }
            }
            Err(e) => ctx
                .result
                .errors
                .push(format!("failed to import a row of \"{}\": {e}", record.name)),
        }
    }
    for fuse in &record.unassigned_fuses {
        import_fuse(store, ctx, fuse, panel.id, None);
    }
}

/// Replays a document into the store. Rooms land first so their new ids
/// are available for remapping; panels are processed in dependency order
/// so a sub-panel finds its feeding fuse already imported. Every failed
/// record becomes one entry in `errors` and the rest of the document still
/// goes through.
pub fn import(store: &mut PanelStore, document: ExportDocument) -> ImportResult {
    let mut ctx = ImportContext {
        room_map: HashMap::new(),
        fuse_map: HashMap::new(),
        result: ImportResult::default(),
    };

    for room in &document.rooms {
        let input = CreateRoom {
            name: room.name.clone(),
            code: room.code.clone(),
            color: room.color.clone(),
        };
        match store.create_room(input) {
            Ok(created) => {
                if let Some(old_id) = room.id {
                    ctx.room_map.insert(old_id, created.id);
                }
                ctx.result.rooms_imported += 1;
            }
            Err(e) => ctx
                .result
                .errors
                .push(format!("failed to import room \"{}\": {e}", room.name)),
        }
    }

    // Sub-panels wait until the fuse that feeds them exists; anything
    // still unresolved after a pass with no progress has a dangling or
    // cyclic parent reference.
    let mut pending: Vec<&PanelRecord> = document.panels.iter().collect();
    loop {
        let mut deferred = Vec::new();
        let mut progressed = false;
        for record in pending {
            let resolvable = match record.parent_fuse_id {
                None => true,
                Some(old_fuse_id) => ctx.fuse_map.contains_key(&old_fuse_id),
            };
            if resolvable {
                import_panel(store, &mut ctx, record);
                progressed = true;
            } else {
                deferred.push(record);
            }
        }
        pending = deferred;
        if pending.is_empty() || !progressed {
            break;
        }
    }
    for record in pending {
        ctx.result.errors.push(format!(
            "failed to import panel \"{}\": feeding fuse not found in document",
            record.name
        ));
    }

    for device in &document.unassigned_devices {
        import_device(store, &mut ctx, device, None, None, None);
    }

    ctx.result.success = ctx.result.errors.is_empty();
    info!(
        panels = ctx.result.panels_imported,
        fuses = ctx.result.fuses_imported,
        sockets = ctx.result.sockets_imported,
        devices = ctx.result.devices_imported,
        rooms = ctx.result.rooms_imported,
        errors = ctx.result.errors.len(),
        "import finished"
    );
    ctx.result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panel_input(name: &str) -> CreatePanel {
        CreatePanel {
            name: name.into(),
            location: None,
            main_breaker_amperage: Some(63),
            main_breaker_type: Some("RCD".into()),
            main_breaker_poles: None,
            main_breaker_curve: None,
            main_breaker_manufacturer: None,
            main_breaker_model: None,
        }
    }

    fn fuse_input(row_id: Option<Uuid>) -> CreateFuse {
        CreateFuse {
            row_id,
            label: Some("Sockets".into()),
            sort_order: None,
            slot_number: Some(1),
            poles: 1,
            amperage: Some(16),
            fuse_type: FuseType::Mcb,
            curve_type: Some(CurveType::B),
            manufacturer: None,
            model: None,
            is_active: true,
            color: None,
            notes: None,
            device_url: None,
            voltage_rating: None,
            surge_current_rating: None,
            spd_class: None,
        }
    }

    fn device_record(name: &str, watts: Option<u32>) -> DeviceRecord {
        DeviceRecord {
            name: name.into(),
            icon: DeviceIcon::Generic,
            category: DeviceCategory::Appliance,
            room_id: None,
            estimated_wattage: watts,
            is_hardwired: false,
            sort_order: 0,
            notes: None,
        }
    }

    fn populated_store() -> PanelStore {
        let mut store = PanelStore::new();
        let room = store
            .create_room(CreateRoom {
                name: "Kitchen".into(),
                code: None,
                color: "#EF4444".into(),
            })
            .unwrap();
        let panel = store.create_panel(panel_input("Main")).unwrap();
        let row = store
            .create_row(panel.id, CreateRow { label: Some("Top".into()), position: None, max_fuses: 12 })
            .unwrap();
        let fuse = store.create_fuse(panel.id, fuse_input(Some(row.id))).unwrap();
        let socket = store
            .create_socket_on_fuse(fuse.id, CreateSocket {
                room_id: Some(room.id),
                ..CreateSocket::default()
            })
            .unwrap();
        store
            .create_device(CreateDevice {
                socket_id: Some(socket.id),
                fuse_id: None,
                junction_box_id: None,
                name: "Kettle".into(),
                icon: DeviceIcon::Generic,
                category: DeviceCategory::Appliance,
                room_id: Some(room.id),
                estimated_wattage: Some(2000),
                is_hardwired: false,
                sort_order: None,
                notes: None,
            })
            .unwrap();
        let junction_box = store
            .create_junction_box(fuse.id, CreateJunctionBox {
                room_id: Some(room.id),
                ..CreateJunctionBox::default()
            })
            .unwrap();
        store
            .create_socket_on_junction_box(junction_box.id, CreateSocket::default())
            .unwrap();
        store
            .create_sub_panel(fuse.id, CreateSubPanel {
                name: "Garage".into(),
                location: None,
                feed_amperage: 16,
            })
            .unwrap();
        store
            .create_device(CreateDevice {
                socket_id: None,
                name: "Spare lamp".into(),
                icon: DeviceIcon::Lamp,
                category: DeviceCategory::Lighting,
                room_id: None,
                estimated_wattage: Some(40),
                is_hardwired: false,
                sort_order: None,
                notes: None,
                fuse_id: None,
                junction_box_id: None,
            })
            .unwrap();
        store
    }

    #[test]
    fn export_then_import_rebuilds_the_installation() {
        let source = populated_store();
        let document = export(&source);
        assert_eq!(document.version, EXPORT_VERSION);
        assert_eq!(document.panels.len(), 2);
        assert_eq!(document.rooms.len(), 1);
        assert_eq!(document.unassigned_devices.len(), 1);

        let mut target = PanelStore::new();
        let result = import(&mut target, document);
        assert!(result.success, "errors: {:?}", result.errors);
        assert_eq!(result.rooms_imported, 1);
        assert_eq!(result.panels_imported, 2);
        assert_eq!(result.fuses_imported, 1);
        assert_eq!(result.sockets_imported, 2);
        assert_eq!(result.devices_imported, 2);

        // The sub-panel is reattached to the remapped fuse.
        let sub = target
            .panels()
            .into_iter()
            .find(|p| p.is_sub_panel())
            .unwrap();
        assert_eq!(target.panel_hierarchy(sub.id).unwrap().len(), 2);

        // Room references were remapped, not copied verbatim.
        let room = &target.rooms()[0];
        let view = target
            .panel_view(target.panels().into_iter().find(|p| !p.is_sub_panel()).unwrap().id)
            .unwrap();
        let socket_room = view.rows[0].fuses[0].sockets[0].socket.room_id;
        assert_eq!(socket_room, Some(room.id));
    }

    #[test]
    fn a_malformed_device_does_not_abort_the_import() {
        let devices: Vec<DeviceRecord> = (0..4)
            .map(|i| device_record(&format!("Device {i}"), Some(100)))
            .chain([device_record("", Some(100))])
            .collect();

        let document = ExportDocument {
            version: EXPORT_VERSION.into(),
            exported_at: Utc::now(),
            panels: Vec::new(),
            rooms: Vec::new(),
            unassigned_devices: devices,
        };

        let mut store = PanelStore::new();
        let result = import(&mut store, document);
        assert!(!result.success);
        assert_eq!(result.devices_imported, 4);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("failed to import device"));
    }

    #[test]
    fn a_sub_panel_without_its_feeder_is_reported() {
        let document = ExportDocument {
            version: EXPORT_VERSION.into(),
            exported_at: Utc::now(),
            panels: vec![PanelRecord {
                id: Some(Uuid::new_v4()),
                name: "Orphan".into(),
                location: None,
                main_breaker_amperage: None,
                main_breaker_type: None,
                parent_fuse_id: Some(Uuid::new_v4()),
                feed_amperage: Some(32),
                rows: Vec::new(),
                unassigned_fuses: Vec::new(),
            }],
            rooms: Vec::new(),
            unassigned_devices: Vec::new(),
        };

        let mut store = PanelStore::new();
        let result = import(&mut store, document);
        assert!(!result.success);
        assert_eq!(result.panels_imported, 0);
        assert!(result.errors[0].contains("feeding fuse not found"));
    }

    #[test]
    fn document_round_trips_through_json() {
        let document = export(&populated_store());
        let json = serde_json::to_string(&document).unwrap();
        assert!(json.contains("\"exportedAt\""));
        assert!(json.contains("\"unassignedDevices\""));
        let parsed: ExportDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.panels.len(), document.panels.len());
    }
}