//! Assembles the ordered panel tree consumed by printing, export and the
//! API, and resolves the ancestor chain of nested sub-panels.
//!
//! Ordering contract: rows by `position`; fuses by `slot_number` with
//! nulls last, tie-broken by `sort_order`; sockets, junction boxes and
//! devices by `sort_order`. Consumers sort ascending and never assume the
//! keys are contiguous.

use itertools::Itertools;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use super::entities::{Device, Fuse, JunctionBox, Panel, Room, Row, Socket};
use super::validate::EngineError;

/// Borrowed, consistent snapshot of the entity arena. The builder performs
/// no I/O; the caller supplies the maps.
#[derive(Clone, Copy)]
pub struct Snapshot<'a> {
    pub rooms: &'a HashMap<Uuid, Room>,
    pub panels: &'a HashMap<Uuid, Panel>,
    pub rows: &'a HashMap<Uuid, Row>,
    pub fuses: &'a HashMap<Uuid, Fuse>,
    pub sockets: &'a HashMap<Uuid, Socket>,
    pub junction_boxes: &'a HashMap<Uuid, JunctionBox>,
    pub devices: &'a HashMap<Uuid, Device>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceView {
    #[serde(flatten)]
    pub device: Device,
    pub room: Option<Room>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SocketView {
    #[serde(flatten)]
    pub socket: Socket,
    pub room: Option<Room>,
    pub devices: Vec<DeviceView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JunctionBoxView {
    #[serde(flatten)]
    pub junction_box: JunctionBox,
    pub room: Option<Room>,
    pub sockets: Vec<SocketView>,
    /// Devices hardwired directly into the box.
    pub devices: Vec<DeviceView>,
}

/// One panel in the ancestor chain returned by [`panel_hierarchy`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelSummary {
    pub id: Uuid,
    pub name: String,
    pub parent_fuse_id: Option<Uuid>,
    pub feed_amperage: Option<u32>,
}

impl From<&Panel> for PanelSummary {
    fn from(panel: &Panel) -> Self {
        Self {
            id: panel.id,
            name: panel.name.clone(),
            parent_fuse_id: panel.parent_fuse_id,
            feed_amperage: panel.feed_amperage,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FuseView {
    #[serde(flatten)]
    pub fuse: Fuse,
    pub sockets: Vec<SocketView>,
    pub junction_boxes: Vec<JunctionBoxView>,
    /// Devices hardwired directly to the fuse.
    pub hardwired_devices: Vec<DeviceView>,
    pub sub_panel: Option<PanelSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowView {
    #[serde(flatten)]
    pub row: Row,
    pub fuses: Vec<FuseView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelView {
    #[serde(flatten)]
    pub panel: Panel,
    pub rows: Vec<RowView>,
    /// Fuses with no row, surfaced alongside the rows rather than dropped.
    pub unassigned_fuses: Vec<FuseView>,
}

/// Sort key for fuses: slot number ascending with nulls last, then sort
/// order.
fn fuse_order(fuse: &Fuse) -> (bool, i32, i32) {
    (
        fuse.slot_number.is_none(),
        fuse.slot_number.unwrap_or(0),
        fuse.sort_order,
    )
}

fn room_of(snapshot: &Snapshot, room_id: Option<Uuid>) -> Option<Room> {
    room_id.and_then(|id| snapshot.rooms.get(&id)).cloned()
}

fn devices_of<F>(snapshot: &Snapshot, owner: F) -> Vec<DeviceView>
where
    F: Fn(&Device) -> bool,
{
    snapshot
        .devices
        .values()
        .filter(|d| owner(d))
        .sorted_by_key(|d| d.sort_order)
        .map(|d| DeviceView {
            device: d.clone(),
            room: room_of(snapshot, d.room_id),
        })
        .collect()
}

fn build_socket_view(snapshot: &Snapshot, socket: &Socket) -> SocketView {
    SocketView {
        socket: socket.clone(),
        room: room_of(snapshot, socket.room_id),
        devices: devices_of(snapshot, |d| d.socket_id == Some(socket.id)),
    }
}

fn build_junction_box_view(snapshot: &Snapshot, junction_box: &JunctionBox) -> JunctionBoxView {
    let sockets = snapshot
        .sockets
        .values()
        .filter(|s| s.junction_box_id == Some(junction_box.id))
        .sorted_by_key(|s| s.sort_order)
        .map(|s| build_socket_view(snapshot, s))
        .collect();

    JunctionBoxView {
        junction_box: junction_box.clone(),
        room: room_of(snapshot, junction_box.room_id),
        sockets,
        devices: devices_of(snapshot, |d| d.junction_box_id == Some(junction_box.id)),
    }
}

/// Builds the load branch of a single fuse. SPD fuses report empty branch
/// collections regardless of any stray data; write-time enforcement should
/// prevent such data from existing, this keeps reads consistent either way.
pub fn build_fuse_view(snapshot: &Snapshot, fuse: &Fuse) -> FuseView {
    let sub_panel = snapshot
        .panels
        .values()
        .find(|p| p.parent_fuse_id == Some(fuse.id))
        .map(PanelSummary::from);

    if !fuse.fuse_type.is_load_branch() {
        return FuseView {
            fuse: fuse.clone(),
            sockets: Vec::new(),
            junction_boxes: Vec::new(),
            hardwired_devices: Vec::new(),
            sub_panel,
        };
    }

    let sockets = snapshot
        .sockets
        .values()
        .filter(|s| s.fuse_id == Some(fuse.id))
        .sorted_by_key(|s| s.sort_order)
        .map(|s| build_socket_view(snapshot, s))
        .collect();

    let junction_boxes = snapshot
        .junction_boxes
        .values()
        .filter(|jb| jb.fuse_id == fuse.id)
        .sorted_by_key(|jb| jb.sort_order)
        .map(|jb| build_junction_box_view(snapshot, jb))
        .collect();

    FuseView {
        fuse: fuse.clone(),
        sockets,
        junction_boxes,
        hardwired_devices: devices_of(snapshot, |d| d.fuse_id == Some(fuse.id)),
        sub_panel,
    }
}

/// Assembles the full ordered tree for one panel.
pub fn build_panel_view(snapshot: &Snapshot, panel_id: Uuid) -> Result<PanelView, EngineError> {
    let panel = snapshot
        .panels
        .get(&panel_id)
        .ok_or(EngineError::not_found("panel", panel_id))?;

    let rows = snapshot
        .rows
        .values()
        .filter(|r| r.panel_id == panel_id)
        .sorted_by_key(|r| r.position)
        .map(|row| RowView {
            row: row.clone(),
            fuses: snapshot
                .fuses
                .values()
                .filter(|f| f.panel_id == panel_id && f.row_id == Some(row.id))
                .sorted_by_key(|f| fuse_order(f))
                .map(|f| build_fuse_view(snapshot, f))
                .collect(),
        })
        .collect();

    let unassigned_fuses = snapshot
        .fuses
        .values()
        .filter(|f| f.panel_id == panel_id && f.row_id.is_none())
        .sorted_by_key(|f| fuse_order(f))
        .map(|f| build_fuse_view(snapshot, f))
        .collect();

    Ok(PanelView {
        panel: panel.clone(),
        rows,
        unassigned_fuses,
    })
}

/// Resolves the ancestor chain of a panel, root first. Walks
/// `parent_fuse_id -> owning fuse -> owning panel` until a root panel is
/// reached. A panel indirectly feeding itself is corrupted data; the walk
/// keeps a visited set and fails instead of looping.
pub fn panel_hierarchy(
    snapshot: &Snapshot,
    panel_id: Uuid,
) -> Result<Vec<PanelSummary>, EngineError> {
    let mut current = snapshot
        .panels
        .get(&panel_id)
        .ok_or(EngineError::not_found("panel", panel_id))?;

    let mut chain = vec![PanelSummary::from(current)];
    let mut visited: HashSet<Uuid> = HashSet::from([current.id]);

    while let Some(parent_fuse_id) = current.parent_fuse_id {
        let fuse = snapshot
            .fuses
            .get(&parent_fuse_id)
            .ok_or(EngineError::not_found("fuse", parent_fuse_id))?;
        let parent = snapshot
            .panels
            .get(&fuse.panel_id)
            .ok_or(EngineError::not_found("panel", fuse.panel_id))?;

        if !visited.insert(parent.id) {
            return Err(EngineError::HierarchyCycle { panel_id: parent.id });
        }

        chain.push(PanelSummary::from(parent));
        current = parent;
    }

    chain.reverse();
    Ok(chain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{CurveType, DeviceCategory, DeviceIcon, FuseType};
    use chrono::Utc;

    struct Arena {
        rooms: HashMap<Uuid, Room>,
        panels: HashMap<Uuid, Panel>,
        rows: HashMap<Uuid, Row>,
        fuses: HashMap<Uuid, Fuse>,
        sockets: HashMap<Uuid, Socket>,
        junction_boxes: HashMap<Uuid, JunctionBox>,
        devices: HashMap<Uuid, Device>,
    }

    impl Arena {
        fn new() -> Self {
            Self {
                rooms: HashMap::new(),
                panels: HashMap::new(),
                rows: HashMap::new(),
                fuses: HashMap::new(),
                sockets: HashMap::new(),
                junction_boxes: HashMap::new(),
                devices: HashMap::new(),
            }
        }

        fn snapshot(&self) -> Snapshot<'_> {
            Snapshot {
                rooms: &self.rooms,
                panels: &self.panels,
                rows: &self.rows,
                fuses: &self.fuses,
                sockets: &self.sockets,
                junction_boxes: &self.junction_boxes,
                devices: &self.devices,
            }
        }

        fn add_panel(&mut self, name: &str, parent_fuse_id: Option<Uuid>) -> Uuid {
            let id = Uuid::new_v4();
            self.panels.insert(
                id,
                Panel {
                    id,
                    name: name.into(),
                    location: None,
                    main_breaker_amperage: Some(63),
                    main_breaker_type: None,
                    main_breaker_poles: None,
                    main_breaker_curve: None,
                    main_breaker_manufacturer: None,
                    main_breaker_model: None,
                    parent_fuse_id,
                    feed_amperage: parent_fuse_id.map(|_| 40),
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                },
            );
            id
        }

        fn add_row(&mut self, panel_id: Uuid, position: i32) -> Uuid {
            let id = Uuid::new_v4();
            self.rows.insert(
                id,
                Row {
                    id,
                    panel_id,
                    label: None,
                    position,
                    max_fuses: 10,
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                },
            );
            id
        }

        fn add_fuse(
            &mut self,
            panel_id: Uuid,
            row_id: Option<Uuid>,
            slot_number: Option<i32>,
            sort_order: i32,
        ) -> Uuid {
            let id = Uuid::new_v4();
            self.fuses.insert(
                id,
                Fuse {
                    id,
                    panel_id,
                    row_id,
                    label: None,
                    sort_order,
                    slot_number,
                    poles: 1,
                    amperage: Some(16),
                    fuse_type: FuseType::Mcb,
                    curve_type: Some(CurveType::C),
                    manufacturer: None,
                    model: None,
                    is_active: true,
                    color: None,
                    notes: None,
                    device_url: None,
                    voltage_rating: None,
                    surge_current_rating: None,
                    spd_class: None,
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                },
            );
            id
        }

        fn add_socket(&mut self, fuse_id: Uuid, sort_order: i32) -> Uuid {
            let id = Uuid::new_v4();
            self.sockets.insert(
                id,
                Socket {
                    id,
                    fuse_id: Some(fuse_id),
                    junction_box_id: None,
                    label: None,
                    sort_order,
                    room_id: None,
                    notes: None,
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                },
            );
            id
        }

        fn add_device(&mut self, socket_id: Uuid, watts: u32) -> Uuid {
            let id = Uuid::new_v4();
            self.devices.insert(
                id,
                Device {
                    id,
                    socket_id: Some(socket_id),
                    fuse_id: None,
                    junction_box_id: None,
                    name: "Device".into(),
                    icon: DeviceIcon::Generic,
                    category: DeviceCategory::Other,
                    room_id: None,
                    estimated_wattage: Some(watts),
                    is_hardwired: false,
                    sort_order: 0,
                    notes: None,
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                },
            );
            id
        }
    }

    #[test]
    fn rows_and_fuses_are_ordered() {
        let mut arena = Arena::new();
        let panel = arena.add_panel("Main", None);
        let row_b = arena.add_row(panel, 5);
        let row_a = arena.add_row(panel, 1);

        // Insert out of order: slot 4, no slot, slot 2.
        arena.add_fuse(panel, Some(row_a), Some(4), 0);
        arena.add_fuse(panel, Some(row_a), None, 1);
        arena.add_fuse(panel, Some(row_a), Some(2), 2);

        let view = build_panel_view(&arena.snapshot(), panel).unwrap();
        assert_eq!(view.rows.len(), 2);
        assert_eq!(view.rows[0].row.id, row_a);
        assert_eq!(view.rows[1].row.id, row_b);

        let slots: Vec<Option<i32>> =
            view.rows[0].fuses.iter().map(|f| f.fuse.slot_number).collect();
        assert_eq!(slots, vec![Some(2), Some(4), None]);
    }

    #[test]
    fn unassigned_fuses_are_surfaced_separately() {
        let mut arena = Arena::new();
        let panel = arena.add_panel("Main", None);
        let row = arena.add_row(panel, 0);
        arena.add_fuse(panel, Some(row), Some(1), 0);
        let floating = arena.add_fuse(panel, None, None, 0);

        let view = build_panel_view(&arena.snapshot(), panel).unwrap();
        assert_eq!(view.unassigned_fuses.len(), 1);
        assert_eq!(view.unassigned_fuses[0].fuse.id, floating);
    }

    #[test]
    fn ordering_tolerates_sort_order_gaps() {
        let mut arena = Arena::new();
        let panel = arena.add_panel("Main", None);
        let fuse = arena.add_fuse(panel, None, None, 0);
        arena.add_socket(fuse, 30);
        arena.add_socket(fuse, 7);
        arena.add_socket(fuse, 100);

        let view = build_panel_view(&arena.snapshot(), panel).unwrap();
        let orders: Vec<i32> = view.unassigned_fuses[0]
            .sockets
            .iter()
            .map(|s| s.socket.sort_order)
            .collect();
        assert_eq!(orders, vec![7, 30, 100]);
    }

    #[test]
    fn spd_branch_is_empty_even_with_stray_data() {
        let mut arena = Arena::new();
        let panel = arena.add_panel("Main", None);
        let fuse_id = arena.add_fuse(panel, None, Some(1), 0);
        let socket = arena.add_socket(fuse_id, 0);
        arena.add_device(socket, 2000);
        // Corrupt the fuse into an SPD after the socket was attached.
        let fuse = arena.fuses.get_mut(&fuse_id).unwrap();
        fuse.fuse_type = FuseType::Spd;
        fuse.curve_type = None;

        let view = build_panel_view(&arena.snapshot(), panel).unwrap();
        assert!(view.unassigned_fuses[0].sockets.is_empty());
        assert!(view.unassigned_fuses[0].hardwired_devices.is_empty());
    }

    #[test]
    fn hierarchy_of_three_levels_is_root_first() {
        let mut arena = Arena::new();
        let root = arena.add_panel("Root", None);
        let feeder_a = arena.add_fuse(root, None, Some(1), 0);
        let sub_a = arena.add_panel("Sub A", Some(feeder_a));
        let feeder_b = arena.add_fuse(sub_a, None, Some(1), 0);
        let sub_b = arena.add_panel("Sub B", Some(feeder_b));

        let chain = panel_hierarchy(&arena.snapshot(), sub_b).unwrap();
        assert_eq!(chain.len(), 3);
        assert_eq!(chain[0].id, root);
        assert_eq!(chain[1].id, sub_a);
        assert_eq!(chain[2].id, sub_b);
        assert_eq!(chain[0].parent_fuse_id, None);
    }

    #[test]
    fn hierarchy_walk_detects_cycles() {
        let mut arena = Arena::new();
        let a = arena.add_panel("A", None);
        let fuse_in_a = arena.add_fuse(a, None, None, 0);
        let b = arena.add_panel("B", Some(fuse_in_a));
        let fuse_in_b = arena.add_fuse(b, None, None, 0);
        // Corrupt A so it is fed from a fuse inside B.
        arena.panels.get_mut(&a).unwrap().parent_fuse_id = Some(fuse_in_b);

        let err = panel_hierarchy(&arena.snapshot(), b).unwrap_err();
        assert!(matches!(err, EngineError::HierarchyCycle { .. }));
    }
}
