//! Structural invariant checks. Every validator is a pure predicate over
//! already-fetched state and reports a typed rejection instead of silently
//! correcting the mutation.

use thiserror::Error;
use uuid::Uuid;

use super::entities::{DeviceParent, Fuse, FuseType, Panel, Row};

/// Engine failure taxonomy. All variants are local, synchronous and
/// recoverable by the caller; the engine never retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("row {row_id} is full ({max_fuses}/{max_fuses} fuses)")]
    CapacityExceeded { row_id: Uuid, max_fuses: u32 },

    #[error("device references more than one parent")]
    MultipleParents,

    #[error("sub-panel feed of {feed_amperage}A exceeds the {fuse_amperage}A source fuse")]
    FeedExceedsSource { fuse_amperage: u32, feed_amperage: u32 },

    #[error("fuse {fuse_id} already feeds a sub-panel")]
    AlreadyHasSubPanel { fuse_id: Uuid },

    #[error("SPD fuse {fuse_id} cannot own sockets, junction boxes or hardwired devices")]
    SpdCannotOwnLoads { fuse_id: Uuid },

    #[error("row {row_id} still contains {fuse_count} fuses")]
    RowNotEmpty { row_id: Uuid, fuse_count: usize },

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: Uuid },

    #[error("panel hierarchy contains a cycle at panel {panel_id}")]
    HierarchyCycle { panel_id: Uuid },

    #[error("validation failed: {0}")]
    Validation(String),
}

impl EngineError {
    pub fn not_found(kind: &'static str, id: Uuid) -> Self {
        EngineError::NotFound { kind, id }
    }
}

impl From<validator::ValidationErrors> for EngineError {
    fn from(errors: validator::ValidationErrors) -> Self {
        EngineError::Validation(errors.to_string())
    }
}

/// Checks that `row` can take one more fuse. `fuses` is the sibling set
/// currently assigned to the row; `excluding_fuse_id` removes the fuse
/// being moved so a reposition within the same row always passes.
pub fn validate_row_capacity<'a>(
    row: &Row,
    fuses: impl IntoIterator<Item = &'a Fuse>,
    excluding_fuse_id: Option<Uuid>,
) -> Result<(), EngineError> {
    let count = fuses
        .into_iter()
        .filter(|f| f.row_id == Some(row.id))
        .filter(|f| Some(f.id) != excluding_fuse_id)
        .count();

    if count >= row.max_fuses as usize {
        return Err(EngineError::CapacityExceeded {
            row_id: row.id,
            max_fuses: row.max_fuses,
        });
    }
    Ok(())
}

/// Collapses the three nullable parent references of a device into the
/// tagged `DeviceParent` variant. More than one reference set is always a
/// `MultipleParents` rejection; a hardwired device parented to a socket is
/// the documented legal combination (physically hardwired near that
/// socket), and none set means the device is unassigned.
pub fn validate_device_parent(
    socket_id: Option<Uuid>,
    fuse_id: Option<Uuid>,
    junction_box_id: Option<Uuid>,
    _is_hardwired: bool,
) -> Result<Option<DeviceParent>, EngineError> {
    match (socket_id, fuse_id, junction_box_id) {
        (Some(id), None, None) => Ok(Some(DeviceParent::Socket(id))),
        (None, Some(id), None) => Ok(Some(DeviceParent::Fuse(id))),
        (None, None, Some(id)) => Ok(Some(DeviceParent::JunctionBox(id))),
        (None, None, None) => Ok(None),
        _ => Err(EngineError::MultipleParents),
    }
}

/// A sub-panel's feed may not exceed the amperage of the fuse feeding it.
/// A source fuse with no defined amperage accepts any feed.
pub fn validate_sub_panel_feed(
    fuse_amperage: Option<u32>,
    feed_amperage: u32,
) -> Result<(), EngineError> {
    match fuse_amperage {
        Some(fuse_amperage) if feed_amperage > fuse_amperage => {
            Err(EngineError::FeedExceedsSource { fuse_amperage, feed_amperage })
        }
        _ => Ok(()),
    }
}

/// `sub_panel` is keyed by `parent_fuse_id`, a 1:1 relation: a fuse may
/// feed at most one sub-panel.
pub fn validate_single_sub_panel<'a>(
    fuse: &Fuse,
    panels: impl IntoIterator<Item = &'a Panel>,
) -> Result<(), EngineError> {
    if panels.into_iter().any(|p| p.parent_fuse_id == Some(fuse.id)) {
        return Err(EngineError::AlreadyHasSubPanel { fuse_id: fuse.id });
    }
    Ok(())
}

/// SPD fuses are inline protection only and may not own a load branch.
pub fn validate_load_branch_owner(fuse: &Fuse) -> Result<(), EngineError> {
    if fuse.fuse_type == FuseType::Spd {
        return Err(EngineError::SpdCannotOwnLoads { fuse_id: fuse.id });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn fuse(id: Uuid, row_id: Option<Uuid>) -> Fuse {
        Fuse {
            id,
            panel_id: Uuid::new_v4(),
            row_id,
            label: None,
            sort_order: 0,
            slot_number: None,
            poles: 1,
            amperage: Some(16),
            fuse_type: FuseType::Mcb,
            curve_type: Some(crate::domain::entities::CurveType::C),
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
        }
    }

    fn row(id: Uuid, max_fuses: u32) -> Row {
        Row {
            id,
            panel_id: Uuid::new_v4(),
            label: None,
            position: 0,
            max_fuses,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn full_row_rejects_a_new_fuse_but_allows_a_move_within() {
        let row = row(Uuid::new_v4(), 3);
        let occupants: Vec<Fuse> =
            (0..3).map(|_| fuse(Uuid::new_v4(), Some(row.id))).collect();

        let rejected = validate_row_capacity(&row, occupants.iter(), None);
        assert_eq!(
            rejected,
            Err(EngineError::CapacityExceeded { row_id: row.id, max_fuses: 3 })
        );

        // Moving one of the existing three within the row still fits.
        let moving = occupants[1].id;
        assert!(validate_row_capacity(&row, occupants.iter(), Some(moving)).is_ok());
    }

    #[test]
    fn row_capacity_ignores_fuses_of_other_rows() {
        let row = row(Uuid::new_v4(), 1);
        let elsewhere = [fuse(Uuid::new_v4(), Some(Uuid::new_v4())), fuse(Uuid::new_v4(), None)];
        assert!(validate_row_capacity(&row, elsewhere.iter(), None).is_ok());
    }

    #[test]
    fn hardwired_device_on_a_socket_is_legal() {
        let socket = Uuid::new_v4();
        let parent = validate_device_parent(Some(socket), None, None, true).unwrap();
        assert_eq!(parent, Some(DeviceParent::Socket(socket)));
    }

    #[test]
    fn two_parent_kinds_are_rejected() {
        let err = validate_device_parent(Some(Uuid::new_v4()), Some(Uuid::new_v4()), None, false);
        assert_eq!(err, Err(EngineError::MultipleParents));

        let err =
            validate_device_parent(Some(Uuid::new_v4()), None, Some(Uuid::new_v4()), true);
        assert_eq!(err, Err(EngineError::MultipleParents));
    }

    #[test]
    fn unparented_device_is_unassigned() {
        assert_eq!(validate_device_parent(None, None, None, false).unwrap(), None);
    }

    #[test]
    fn feed_amperage_bound() {
        assert_eq!(
            validate_sub_panel_feed(Some(40), 63),
            Err(EngineError::FeedExceedsSource { fuse_amperage: 40, feed_amperage: 63 })
        );
        assert!(validate_sub_panel_feed(Some(63), 63).is_ok());
        // Undefined source amperage accepts any feed.
        assert!(validate_sub_panel_feed(None, 63).is_ok());
    }

    #[test]
    fn second_sub_panel_on_a_fuse_is_rejected() {
        let feeder = fuse(Uuid::new_v4(), None);
        let sub_panel = Panel {
            id: Uuid::new_v4(),
            name: "Garage".into(),
            location: None,
            main_breaker_amperage: None,
            main_breaker_type: None,
            main_breaker_poles: None,
            main_breaker_curve: None,
            main_breaker_manufacturer: None,
            main_breaker_model: None,
            parent_fuse_id: Some(feeder.id),
            feed_amperage: Some(40),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert_eq!(
            validate_single_sub_panel(&feeder, [&sub_panel]),
            Err(EngineError::AlreadyHasSubPanel { fuse_id: feeder.id })
        );
        assert!(validate_single_sub_panel(&feeder, []).is_ok());
    }

    #[test]
    fn spd_cannot_own_a_load_branch() {
        let mut spd = fuse(Uuid::new_v4(), None);
        spd.fuse_type = FuseType::Spd;
        spd.curve_type = None;
        assert_eq!(
            validate_load_branch_owner(&spd),
            Err(EngineError::SpdCannotOwnLoads { fuse_id: spd.id })
        );
        assert!(validate_load_branch_owner(&fuse(Uuid::new_v4(), None)).is_ok());
    }
}
