//! In-memory entity arena and the validated mutation operations over it.
//!
//! Entities are kept in id-keyed maps with explicit parent references, so
//! hierarchy walks and cycle checks operate over lookups instead of live
//! object graphs. Every write goes through the capacity validator before
//! touching the maps; the store assumes it is the single consistent copy
//! of the data (the surrounding service wraps it in a lock per request).

use chrono::Utc;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;
use validator::Validate;

use crate::domain::entities::{
    CreateDevice, CreateFuse, CreateJunctionBox, CreatePanel, CreateRoom, CreateRow, CreateSocket,
    CreateSubPanel, Device, Fuse, FuseType, JunctionBox, MoveDevice, MoveFuse, Panel, Room, Row,
    Socket, UpdateDevice, UpdateFuse, UpdateJunctionBox, UpdatePanel, UpdateRoom, UpdateRow,
    UpdateSocket,
};
use crate::domain::load::{self, LoadCalculation};
use crate::domain::naming::{
    generate_junction_box_label, generate_room_code, generate_socket_label, RoomCodeTable,
};
use crate::domain::topology::{self, FuseView, PanelSummary, PanelView, Snapshot};
use crate::domain::validate::{
    validate_device_parent, validate_load_branch_owner, validate_row_capacity,
    validate_single_sub_panel, validate_sub_panel_feed, EngineError,
};

type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Clone, Default)]
pub struct PanelStore {
    naming: RoomCodeTable,
    rooms: HashMap<Uuid, Room>,
    panels: HashMap<Uuid, Panel>,
    rows: HashMap<Uuid, Row>,
    fuses: HashMap<Uuid, Fuse>,
    sockets: HashMap<Uuid, Socket>,
    junction_boxes: HashMap<Uuid, JunctionBox>,
    devices: HashMap<Uuid, Device>,
}

fn next_order(existing: impl Iterator<Item = i32>) -> i32 {
    existing.max().map_or(0, |max| max + 1)
}

fn is_blank(label: &Option<String>) -> bool {
    label.as_deref().map_or(true, |l| l.trim().is_empty())
}

impl PanelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrowed snapshot for the pure topology/load functions.
    pub fn snapshot(&self) -> Snapshot<'_> {
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

    // ------------------------------------------------------------------
    // Rooms
    // ------------------------------------------------------------------

    pub fn rooms(&self) -> Vec<Room> {
        let mut rooms: Vec<Room> = self.rooms.values().cloned().collect();
        rooms.sort_by(|a, b| a.name.cmp(&b.name));
        rooms
    }

    pub fn room(&self, id: Uuid) -> Result<Room> {
        self.rooms
            .get(&id)
            .cloned()
            .ok_or(EngineError::not_found("room", id))
    }

    pub fn create_room(&mut self, input: CreateRoom) -> Result<Room> {
        input.validate()?;
        let now = Utc::now();
        // Generated codes are only kept when they fit the 2-5 uppercase
        // alphanumeric shape; an explicit code was already validated.
        let code = input.code.or_else(|| {
            let generated = generate_room_code(&self.naming, &input.name);
            ((2..=5).contains(&generated.len())
                && generated.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()))
            .then_some(generated)
        });

        let room = Room {
            id: Uuid::new_v4(),
            name: input.name,
            code,
            color: input.color,
            created_at: now,
            updated_at: now,
        };
        debug!(room_id = %room.id, name = %room.name, "room created");
        self.rooms.insert(room.id, room.clone());
        Ok(room)
    }

    pub fn update_room(&mut self, id: Uuid, patch: UpdateRoom) -> Result<Room> {
        patch.validate()?;
        let room = self
            .rooms
            .get_mut(&id)
            .ok_or(EngineError::not_found("room", id))?;
        if let Some(name) = patch.name {
            room.name = name;
        }
        if let Some(code) = patch.code {
            room.code = code;
        }
        if let Some(color) = patch.color {
            room.color = color;
        }
        room.updated_at = Utc::now();
        Ok(room.clone())
    }

    /// Deletes a room and clears every reference to it; equipment is never
    /// cascaded with the room.
    pub fn delete_room(&mut self, id: Uuid) -> Result<()> {
        self.rooms
            .remove(&id)
            .ok_or(EngineError::not_found("room", id))?;
        for socket in self.sockets.values_mut() {
            if socket.room_id == Some(id) {
                socket.room_id = None;
            }
        }
        for junction_box in self.junction_boxes.values_mut() {
            if junction_box.room_id == Some(id) {
                junction_box.room_id = None;
            }
        }
        for device in self.devices.values_mut() {
            if device.room_id == Some(id) {
                device.room_id = None;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Panels
    // ------------------------------------------------------------------

    pub fn panels(&self) -> Vec<Panel> {
        let mut panels: Vec<Panel> = self.panels.values().cloned().collect();
        panels.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        panels
    }

    pub fn panel(&self, id: Uuid) -> Result<Panel> {
        self.panels
            .get(&id)
            .cloned()
            .ok_or(EngineError::not_found("panel", id))
    }

    pub fn create_panel(&mut self, input: CreatePanel) -> Result<Panel> {
        input.validate()?;
        let now = Utc::now();
        let panel = Panel {
            id: Uuid::new_v4(),
            name: input.name,
            location: input.location,
            main_breaker_amperage: input.main_breaker_amperage,
            main_breaker_type: input.main_breaker_type,
            main_breaker_poles: input.main_breaker_poles,
            main_breaker_curve: input.main_breaker_curve,
            main_breaker_manufacturer: input.main_breaker_manufacturer,
            main_breaker_model: input.main_breaker_model,
            parent_fuse_id: None,
            feed_amperage: None,
            created_at: now,
            updated_at: now,
        };
        debug!(panel_id = %panel.id, name = %panel.name, "panel created");
        self.panels.insert(panel.id, panel.clone());
        Ok(panel)
    }

    /// Attaches a new sub-panel to a fuse. The fuse may feed at most one
    /// sub-panel, and the feed amperage is bounded by the fuse rating.
    pub fn create_sub_panel(&mut self, fuse_id: Uuid, input: CreateSubPanel) -> Result<Panel> {
        input.validate()?;
        let fuse = self
            .fuses
            .get(&fuse_id)
            .ok_or(EngineError::not_found("fuse", fuse_id))?;
        validate_single_sub_panel(fuse, self.panels.values())?;
        validate_sub_panel_feed(fuse.amperage, input.feed_amperage)?;

        let now = Utc::now();
        let panel = Panel {
            id: Uuid::new_v4(),
            name: input.name,
            location: input.location,
            main_breaker_amperage: None,
            main_breaker_type: None,
            main_breaker_poles: None,
            main_breaker_curve: None,
            main_breaker_manufacturer: None,
            main_breaker_model: None,
            parent_fuse_id: Some(fuse_id),
            feed_amperage: Some(input.feed_amperage),
            created_at: now,
            updated_at: now,
        };
        debug!(panel_id = %panel.id, %fuse_id, feed_amperage = input.feed_amperage, "sub-panel attached");
        self.panels.insert(panel.id, panel.clone());
        Ok(panel)
    }

    pub fn update_panel(&mut self, id: Uuid, patch: UpdatePanel) -> Result<Panel> {
        patch.validate()?;
        let panel = self
            .panels
            .get_mut(&id)
            .ok_or(EngineError::not_found("panel", id))?;
        if let Some(name) = patch.name {
            panel.name = name;
        }
        if let Some(location) = patch.location {
            panel.location = location;
        }
        if let Some(amperage) = patch.main_breaker_amperage {
            panel.main_breaker_amperage = amperage;
        }
        if let Some(breaker_type) = patch.main_breaker_type {
            panel.main_breaker_type = breaker_type;
        }
        panel.updated_at = Utc::now();
        Ok(panel.clone())
    }

    /// Deletes a panel and everything it owns: rows, fuses and their
    /// branches, including nested sub-panels.
    pub fn delete_panel(&mut self, id: Uuid) -> Result<()> {
        if !self.panels.contains_key(&id) {
            return Err(EngineError::not_found("panel", id));
        }
        let fuse_ids: Vec<Uuid> = self
            .fuses
            .values()
            .filter(|f| f.panel_id == id)
            .map(|f| f.id)
            .collect();
        for fuse_id in fuse_ids {
            self.delete_fuse(fuse_id)?;
        }
        self.rows.retain(|_, r| r.panel_id != id);
        self.panels.remove(&id);
        debug!(panel_id = %id, "panel deleted");
        Ok(())
    }

    pub fn panel_view(&self, id: Uuid) -> Result<PanelView> {
        topology::build_panel_view(&self.snapshot(), id)
    }

    pub fn panel_hierarchy(&self, id: Uuid) -> Result<Vec<PanelSummary>> {
        topology::panel_hierarchy(&self.snapshot(), id)
    }

    // ------------------------------------------------------------------
    // Rows
    // ------------------------------------------------------------------

    pub fn row(&self, id: Uuid) -> Result<Row> {
        self.rows
            .get(&id)
            .cloned()
            .ok_or(EngineError::not_found("row", id))
    }

    pub fn create_row(&mut self, panel_id: Uuid, input: CreateRow) -> Result<Row> {
        input.validate()?;
        if !self.panels.contains_key(&panel_id) {
            return Err(EngineError::not_found("panel", panel_id));
        }
        let position = input.position.unwrap_or_else(|| {
            next_order(
                self.rows
                    .values()
                    .filter(|r| r.panel_id == panel_id)
                    .map(|r| r.position),
            )
        });

        let now = Utc::now();
        let row = Row {
            id: Uuid::new_v4(),
            panel_id,
            label: input.label,
            position,
            max_fuses: input.max_fuses,
            created_at: now,
            updated_at: now,
        };
        self.rows.insert(row.id, row.clone());
        Ok(row)
    }

    pub fn update_row(&mut self, id: Uuid, patch: UpdateRow) -> Result<Row> {
        patch.validate()?;
        let occupancy = self.fuses.values().filter(|f| f.row_id == Some(id)).count();
        let row = self
            .rows
            .get_mut(&id)
            .ok_or(EngineError::not_found("row", id))?;

        // Shrinking the limit below the current occupancy would leave the
        // row violating its own capacity invariant.
        if let Some(max_fuses) = patch.max_fuses {
            if occupancy > max_fuses as usize {
                return Err(EngineError::CapacityExceeded { row_id: id, max_fuses });
            }
            row.max_fuses = max_fuses;
        }
        if let Some(label) = patch.label {
            row.label = label;
        }
        if let Some(position) = patch.position {
            row.position = position;
        }
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    pub fn reorder_row(&mut self, id: Uuid, position: i32) -> Result<Row> {
        let row = self
            .rows
            .get_mut(&id)
            .ok_or(EngineError::not_found("row", id))?;
        row.position = position;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    /// Rows are deletable only when empty; fuses are never cascaded away
    /// with their row.
    pub fn delete_row(&mut self, id: Uuid) -> Result<()> {
        if !self.rows.contains_key(&id) {
            return Err(EngineError::not_found("row", id));
        }
        let fuse_count = self.fuses.values().filter(|f| f.row_id == Some(id)).count();
        if fuse_count > 0 {
            return Err(EngineError::RowNotEmpty { row_id: id, fuse_count });
        }
        self.rows.remove(&id);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Fuses
    // ------------------------------------------------------------------

    pub fn fuse(&self, id: Uuid) -> Result<Fuse> {
        self.fuses
            .get(&id)
            .cloned()
            .ok_or(EngineError::not_found("fuse", id))
    }

    pub fn fuse_view(&self, id: Uuid) -> Result<FuseView> {
        let fuse = self
            .fuses
            .get(&id)
            .ok_or(EngineError::not_found("fuse", id))?;
        Ok(topology::build_fuse_view(&self.snapshot(), fuse))
    }

    /// Aggregate load of everything wired to the fuse.
    pub fn fuse_load(&self, id: Uuid) -> Result<LoadCalculation> {
        Ok(load::calculate_load(&self.fuse_view(id)?))
    }

    fn check_spd_shape(fuse: &Fuse) -> Result<()> {
        if fuse.fuse_type == FuseType::Spd {
            if fuse.curve_type.is_some() {
                return Err(EngineError::Validation(
                    "SPD fuses carry no trip curve".into(),
                ));
            }
        } else if fuse.voltage_rating.is_some()
            || fuse.surge_current_rating.is_some()
            || fuse.spd_class.is_some()
        {
            return Err(EngineError::Validation(
                "surge ratings are only valid on SPD fuses".into(),
            ));
        }
        Ok(())
    }

    fn fuse_owns_loads(&self, fuse_id: Uuid) -> bool {
        self.sockets.values().any(|s| s.fuse_id == Some(fuse_id))
            || self.junction_boxes.values().any(|jb| jb.fuse_id == fuse_id)
            || self.devices.values().any(|d| d.fuse_id == Some(fuse_id))
    }

    pub fn create_fuse(&mut self, panel_id: Uuid, input: CreateFuse) -> Result<Fuse> {
        input.validate()?;
        if !self.panels.contains_key(&panel_id) {
            return Err(EngineError::not_found("panel", panel_id));
        }
        if let Some(row_id) = input.row_id {
            let row = self
                .rows
                .get(&row_id)
                .ok_or(EngineError::not_found("row", row_id))?;
            if row.panel_id != panel_id {
                return Err(EngineError::Validation(
                    "row belongs to a different panel".into(),
                ));
            }
            validate_row_capacity(row, self.fuses.values(), None)?;
        }

        let sort_order = input.sort_order.unwrap_or_else(|| {
            next_order(
                self.fuses
                    .values()
                    .filter(|f| f.panel_id == panel_id)
                    .map(|f| f.sort_order),
            )
        });

        let now = Utc::now();
        let fuse = Fuse {
            id: Uuid::new_v4(),
            panel_id,
            row_id: input.row_id,
            label: input.label,
            sort_order,
            slot_number: input.slot_number,
            poles: input.poles,
            amperage: input.amperage,
            fuse_type: input.fuse_type,
            curve_type: input.curve_type,
            manufacturer: input.manufacturer,
            model: input.model,
            is_active: input.is_active,
            color: input.color,
            notes: input.notes,
            device_url: input.device_url,
            voltage_rating: input.voltage_rating,
            surge_current_rating: input.surge_current_rating,
            spd_class: input.spd_class,
            created_at: now,
            updated_at: now,
        };
        Self::check_spd_shape(&fuse)?;
        debug!(fuse_id = %fuse.id, %panel_id, fuse_type = %fuse.fuse_type, "fuse created");
        self.fuses.insert(fuse.id, fuse.clone());
        Ok(fuse)
    }

    pub fn update_fuse(&mut self, id: Uuid, patch: UpdateFuse) -> Result<Fuse> {
        patch.validate()?;
        let current = self
            .fuses
            .get(&id)
            .ok_or(EngineError::not_found("fuse", id))?;

        let mut updated = current.clone();
        if let Some(label) = patch.label {
            updated.label = label;
        }
        if let Some(sort_order) = patch.sort_order {
            updated.sort_order = sort_order;
        }
        if let Some(slot_number) = patch.slot_number {
            updated.slot_number = slot_number;
        }
        if let Some(poles) = patch.poles {
            updated.poles = poles;
        }
        if let Some(amperage) = patch.amperage {
            updated.amperage = amperage;
        }
        if let Some(fuse_type) = patch.fuse_type {
            updated.fuse_type = fuse_type;
        }
        if let Some(curve_type) = patch.curve_type {
            updated.curve_type = curve_type;
        }
        if let Some(manufacturer) = patch.manufacturer {
            updated.manufacturer = manufacturer;
        }
        if let Some(model) = patch.model {
            updated.model = model;
        }
        if let Some(is_active) = patch.is_active {
            updated.is_active = is_active;
        }
        if let Some(color) = patch.color {
            updated.color = color;
        }
        if let Some(notes) = patch.notes {
            updated.notes = notes;
        }
        if let Some(device_url) = patch.device_url {
            updated.device_url = device_url;
        }

        Self::check_spd_shape(&updated)?;

        // Retyping a fuse to SPD is rejected while it still owns a branch.
        if updated.fuse_type == FuseType::Spd && self.fuse_owns_loads(id) {
            return Err(EngineError::SpdCannotOwnLoads { fuse_id: id });
        }

        // Lowering the amperage below an attached sub-panel's feed would
        // break the feed bound.
        if let Some(sub_panel) = self.panels.values().find(|p| p.parent_fuse_id == Some(id)) {
            if let Some(feed) = sub_panel.feed_amperage {
                validate_sub_panel_feed(updated.amperage, feed)?;
            }
        }

        updated.updated_at = Utc::now();
        self.fuses.insert(id, updated.clone());
        Ok(updated)
    }

    /// Moves a fuse into a row (validated against its capacity, excluding
    /// the fuse itself) or out to the panel's unassigned collection.
    pub fn move_fuse(&mut self, id: Uuid, target: MoveFuse) -> Result<Fuse> {
        let fuse = self
            .fuses
            .get(&id)
            .ok_or(EngineError::not_found("fuse", id))?;

        if let Some(row_id) = target.row_id {
            let row = self
                .rows
                .get(&row_id)
                .ok_or(EngineError::not_found("row", row_id))?;
            if row.panel_id != fuse.panel_id {
                return Err(EngineError::Validation(
                    "row belongs to a different panel".into(),
                ));
            }
            validate_row_capacity(row, self.fuses.values(), Some(id))?;
        }

        let fuse = self
            .fuses
            .get_mut(&id)
            .ok_or(EngineError::not_found("fuse", id))?;
        fuse.row_id = target.row_id;
        if let Some(sort_order) = target.sort_order {
            fuse.sort_order = sort_order;
        }
        fuse.updated_at = Utc::now();
        Ok(fuse.clone())
    }

    /// Deletes a fuse and cascades to its sockets, junction boxes,
    /// hardwired devices and any sub-panel it feeds.
    pub fn delete_fuse(&mut self, id: Uuid) -> Result<()> {
        if !self.fuses.contains_key(&id) {
            return Err(EngineError::not_found("fuse", id));
        }

        let socket_ids: Vec<Uuid> = self
            .sockets
            .values()
            .filter(|s| s.fuse_id == Some(id))
            .map(|s| s.id)
            .collect();
        for socket_id in socket_ids {
            self.delete_socket(socket_id)?;
        }

        let junction_box_ids: Vec<Uuid> = self
            .junction_boxes
            .values()
            .filter(|jb| jb.fuse_id == id)
            .map(|jb| jb.id)
            .collect();
        for junction_box_id in junction_box_ids {
            self.delete_junction_box(junction_box_id)?;
        }

        self.devices.retain(|_, d| d.fuse_id != Some(id));

        if let Some(sub_panel_id) = self
            .panels
            .values()
            .find(|p| p.parent_fuse_id == Some(id))
            .map(|p| p.id)
        {
            self.delete_panel(sub_panel_id)?;
        }

        self.fuses.remove(&id);
        debug!(fuse_id = %id, "fuse deleted");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Sockets
    // ------------------------------------------------------------------

    pub fn socket(&self, id: Uuid) -> Result<Socket> {
        self.sockets
            .get(&id)
            .cloned()
            .ok_or(EngineError::not_found("socket", id))
    }

    /// Sequence number for an auto-generated label: existing siblings of
    /// the same kind sharing the room, plus one.
    fn socket_sequence(&self, room_id: Uuid) -> u32 {
        self.sockets.values().filter(|s| s.room_id == Some(room_id)).count() as u32 + 1
    }

    fn junction_box_sequence(&self, room_id: Uuid) -> u32 {
        self.junction_boxes
            .values()
            .filter(|jb| jb.room_id == Some(room_id))
            .count() as u32
            + 1
    }

    fn auto_socket_label(&self, room_id: Uuid) -> Option<String> {
        let room = self.rooms.get(&room_id)?;
        Some(generate_socket_label(
            room.code.as_deref(),
            Some(&room.name),
            self.socket_sequence(room_id),
        ))
    }

    fn auto_junction_box_label(&self, room_id: Uuid) -> Option<String> {
        let room = self.rooms.get(&room_id)?;
        Some(generate_junction_box_label(
            room.code.as_deref(),
            Some(&room.name),
            self.junction_box_sequence(room_id),
        ))
    }

    fn insert_socket(
        &mut self,
        fuse_id: Option<Uuid>,
        junction_box_id: Option<Uuid>,
        input: CreateSocket,
    ) -> Result<Socket> {
        input.validate()?;
        let sort_order = input.sort_order.unwrap_or_else(|| {
            next_order(
                self.sockets
                    .values()
                    .filter(|s| s.fuse_id == fuse_id && s.junction_box_id == junction_box_id)
                    .map(|s| s.sort_order),
            )
        });

        // Never overwrite an explicit label; generate one only when a room
        // is assigned at creation time.
        let label = match (&input.label, input.room_id) {
            (Some(label), _) if !label.trim().is_empty() => Some(label.clone()),
            (_, Some(room_id)) => self.auto_socket_label(room_id),
            _ => input.label,
        };

        let now = Utc::now();
        let socket = Socket {
            id: Uuid::new_v4(),
            fuse_id,
            junction_box_id,
            label,
            sort_order,
            room_id: input.room_id,
            notes: input.notes,
            created_at: now,
            updated_at: now,
        };
        self.sockets.insert(socket.id, socket.clone());
        Ok(socket)
    }

    pub fn create_socket_on_fuse(&mut self, fuse_id: Uuid, input: CreateSocket) -> Result<Socket> {
        let fuse = self
            .fuses
            .get(&fuse_id)
            .ok_or(EngineError::not_found("fuse", fuse_id))?;
        validate_load_branch_owner(fuse)?;
        self.insert_socket(Some(fuse_id), None, input)
    }

    pub fn create_socket_on_junction_box(
        &mut self,
        junction_box_id: Uuid,
        input: CreateSocket,
    ) -> Result<Socket> {
        if !self.junction_boxes.contains_key(&junction_box_id) {
            return Err(EngineError::not_found("junction box", junction_box_id));
        }
        self.insert_socket(None, Some(junction_box_id), input)
    }

    pub fn update_socket(&mut self, id: Uuid, patch: UpdateSocket) -> Result<Socket> {
        patch.validate()?;
        let current = self
            .sockets
            .get(&id)
            .ok_or(EngineError::not_found("socket", id))?
            .clone();

        // Auto-label only when the label is blank, no explicit label comes
        // with the patch, and a room is being newly assigned.
        let auto_label = match (&patch.label, patch.room_id) {
            (None, Some(Some(room_id)))
                if is_blank(&current.label) && current.room_id != Some(room_id) =>
            {
                self.auto_socket_label(room_id)
            }
            _ => None,
        };

        let socket = self
            .sockets
            .get_mut(&id)
            .ok_or(EngineError::not_found("socket", id))?;
        if let Some(label) = patch.label {
            socket.label = Some(label);
        } else if let Some(label) = auto_label {
            socket.label = Some(label);
        }
        if let Some(sort_order) = patch.sort_order {
            socket.sort_order = sort_order;
        }
        if let Some(room_id) = patch.room_id {
            socket.room_id = room_id;
        }
        if let Some(notes) = patch.notes {
            socket.notes = notes;
        }
        socket.updated_at = Utc::now();
        Ok(socket.clone())
    }

    pub fn reorder_socket(&mut self, id: Uuid, sort_order: i32) -> Result<Socket> {
        let socket = self
            .sockets
            .get_mut(&id)
            .ok_or(EngineError::not_found("socket", id))?;
        socket.sort_order = sort_order;
        socket.updated_at = Utc::now();
        Ok(socket.clone())
    }

    pub fn delete_socket(&mut self, id: Uuid) -> Result<()> {
        self.sockets
            .remove(&id)
            .ok_or(EngineError::not_found("socket", id))?;
        self.devices.retain(|_, d| d.socket_id != Some(id));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Junction boxes
    // ------------------------------------------------------------------

    pub fn junction_box(&self, id: Uuid) -> Result<JunctionBox> {
        self.junction_boxes
            .get(&id)
            .cloned()
            .ok_or(EngineError::not_found("junction box", id))
    }

    pub fn create_junction_box(
        &mut self,
        fuse_id: Uuid,
        input: CreateJunctionBox,
    ) -> Result<JunctionBox> {
        input.validate()?;
        let fuse = self
            .fuses
            .get(&fuse_id)
            .ok_or(EngineError::not_found("fuse", fuse_id))?;
        validate_load_branch_owner(fuse)?;

        let sort_order = input.sort_order.unwrap_or_else(|| {
            next_order(
                self.junction_boxes
                    .values()
                    .filter(|jb| jb.fuse_id == fuse_id)
                    .map(|jb| jb.sort_order),
            )
        });

        let label = match (&input.label, input.room_id) {
            (Some(label), _) if !label.trim().is_empty() => Some(label.clone()),
            (_, Some(room_id)) => self.auto_junction_box_label(room_id),
            _ => input.label,
        };

        let now = Utc::now();
        let junction_box = JunctionBox {
            id: Uuid::new_v4(),
            fuse_id,
            label,
            sort_order,
            room_id: input.room_id,
            notes: input.notes,
            created_at: now,
            updated_at: now,
        };
        self.junction_boxes.insert(junction_box.id, junction_box.clone());
        Ok(junction_box)
    }

    pub fn update_junction_box(&mut self, id: Uuid, patch: UpdateJunctionBox) -> Result<JunctionBox> {
        patch.validate()?;
        let current = self
            .junction_boxes
            .get(&id)
            .ok_or(EngineError::not_found("junction box", id))?
            .clone();

        let auto_label = match (&patch.label, patch.room_id) {
            (None, Some(Some(room_id)))
                if is_blank(&current.label) && current.room_id != Some(room_id) =>
            {
                self.auto_junction_box_label(room_id)
            }
            _ => None,
        };

        let junction_box = self
            .junction_boxes
            .get_mut(&id)
            .ok_or(EngineError::not_found("junction box", id))?;
        if let Some(label) = patch.label {
            junction_box.label = Some(label);
        } else if let Some(label) = auto_label {
            junction_box.label = Some(label);
        }
        if let Some(sort_order) = patch.sort_order {
            junction_box.sort_order = sort_order;
        }
        if let Some(room_id) = patch.room_id {
            junction_box.room_id = room_id;
        }
        if let Some(notes) = patch.notes {
            junction_box.notes = notes;
        }
        junction_box.updated_at = Utc::now();
        Ok(junction_box.clone())
    }

    pub fn reorder_junction_box(&mut self, id: Uuid, sort_order: i32) -> Result<JunctionBox> {
        let junction_box = self
            .junction_boxes
            .get_mut(&id)
            .ok_or(EngineError::not_found("junction box", id))?;
        junction_box.sort_order = sort_order;
        junction_box.updated_at = Utc::now();
        Ok(junction_box.clone())
    }

    pub fn delete_junction_box(&mut self, id: Uuid) -> Result<()> {
        self.junction_boxes
            .remove(&id)
            .ok_or(EngineError::not_found("junction box", id))?;
        let socket_ids: Vec<Uuid> = self
            .sockets
            .values()
            .filter(|s| s.junction_box_id == Some(id))
            .map(|s| s.id)
            .collect();
        for socket_id in socket_ids {
            self.delete_socket(socket_id)?;
        }
        self.devices.retain(|_, d| d.junction_box_id != Some(id));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Devices
    // ------------------------------------------------------------------

    pub fn device(&self, id: Uuid) -> Result<Device> {
        self.devices
            .get(&id)
            .cloned()
            .ok_or(EngineError::not_found("device", id))
    }

    pub fn devices(&self) -> Vec<Device> {
        let mut devices: Vec<Device> = self.devices.values().cloned().collect();
        devices.sort_by_key(|d| d.sort_order);
        devices
    }

    pub fn unassigned_devices(&self) -> Vec<Device> {
        let mut devices: Vec<Device> = self
            .devices
            .values()
            .filter(|d| d.parent().is_none())
            .cloned()
            .collect();
        devices.sort_by(|a, b| a.name.cmp(&b.name));
        devices
    }

    fn check_device_parent(
        &self,
        socket_id: Option<Uuid>,
        fuse_id: Option<Uuid>,
        junction_box_id: Option<Uuid>,
        is_hardwired: bool,
    ) -> Result<()> {
        validate_device_parent(socket_id, fuse_id, junction_box_id, is_hardwired)?;
        if let Some(socket_id) = socket_id {
            if !self.sockets.contains_key(&socket_id) {
                return Err(EngineError::not_found("socket", socket_id));
            }
        }
        if let Some(junction_box_id) = junction_box_id {
            if !self.junction_boxes.contains_key(&junction_box_id) {
                return Err(EngineError::not_found("junction box", junction_box_id));
            }
        }
        if let Some(fuse_id) = fuse_id {
            let fuse = self
                .fuses
                .get(&fuse_id)
                .ok_or(EngineError::not_found("fuse", fuse_id))?;
            validate_load_branch_owner(fuse)?;
        }
        Ok(())
    }

    fn device_sibling_order(
        &self,
        socket_id: Option<Uuid>,
        fuse_id: Option<Uuid>,
        junction_box_id: Option<Uuid>,
    ) -> i32 {
        next_order(
            self.devices
                .values()
                .filter(|d| {
                    d.socket_id == socket_id
                        && d.fuse_id == fuse_id
                        && d.junction_box_id == junction_box_id
                })
                .map(|d| d.sort_order),
        )
    }

    pub fn create_device(&mut self, input: CreateDevice) -> Result<Device> {
        input.validate()?;
        self.check_device_parent(
            input.socket_id,
            input.fuse_id,
            input.junction_box_id,
            input.is_hardwired,
        )?;

        let sort_order = input.sort_order.unwrap_or_else(|| {
            self.device_sibling_order(input.socket_id, input.fuse_id, input.junction_box_id)
        });

        let now = Utc::now();
        let device = Device {
            id: Uuid::new_v4(),
            socket_id: input.socket_id,
            fuse_id: input.fuse_id,
            junction_box_id: input.junction_box_id,
            name: input.name,
            icon: input.icon,
            category: input.category,
            room_id: input.room_id,
            estimated_wattage: input.estimated_wattage,
            is_hardwired: input.is_hardwired,
            sort_order,
            notes: input.notes,
            created_at: now,
            updated_at: now,
        };
        debug!(device_id = %device.id, name = %device.name, "device created");
        self.devices.insert(device.id, device.clone());
        Ok(device)
    }

    pub fn update_device(&mut self, id: Uuid, patch: UpdateDevice) -> Result<Device> {
        patch.validate()?;
        let device = self
            .devices
            .get_mut(&id)
            .ok_or(EngineError::not_found("device", id))?;
        if let Some(name) = patch.name {
            device.name = name;
        }
        if let Some(icon) = patch.icon {
            device.icon = icon;
        }
        if let Some(category) = patch.category {
            device.category = category;
        }
        if let Some(room_id) = patch.room_id {
            device.room_id = room_id;
        }
        if let Some(estimated_wattage) = patch.estimated_wattage {
            device.estimated_wattage = estimated_wattage;
        }
        if let Some(is_hardwired) = patch.is_hardwired {
            device.is_hardwired = is_hardwired;
        }
        if let Some(sort_order) = patch.sort_order {
            device.sort_order = sort_order;
        }
        if let Some(notes) = patch.notes {
            device.notes = notes;
        }
        device.updated_at = Utc::now();
        Ok(device.clone())
    }

    /// Re-parents a device. All references absent means an explicit
    /// unassign; that is the only way a device loses its parent without
    /// being deleted.
    pub fn move_device(&mut self, id: Uuid, target: MoveDevice) -> Result<Device> {
        let is_hardwired = self
            .devices
            .get(&id)
            .ok_or(EngineError::not_found("device", id))?
            .is_hardwired;
        self.check_device_parent(
            target.socket_id,
            target.fuse_id,
            target.junction_box_id,
            is_hardwired,
        )?;

        let sort_order = target.sort_order.unwrap_or_else(|| {
            self.device_sibling_order(target.socket_id, target.fuse_id, target.junction_box_id)
        });

        let device = self
            .devices
            .get_mut(&id)
            .ok_or(EngineError::not_found("device", id))?;
        device.socket_id = target.socket_id;
        device.fuse_id = target.fuse_id;
        device.junction_box_id = target.junction_box_id;
        device.sort_order = sort_order;
        device.updated_at = Utc::now();
        Ok(device.clone())
    }

    pub fn unassign_device(&mut self, id: Uuid) -> Result<Device> {
        self.move_device(id, MoveDevice::default())
    }

    pub fn delete_device(&mut self, id: Uuid) -> Result<()> {
        self.devices
            .remove(&id)
            .ok_or(EngineError::not_found("device", id))?;
        Ok(())
    }
}
