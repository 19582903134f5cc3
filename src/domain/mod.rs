//! The panel topology and load-validation engine: entity model, naming
//! resolver, capacity validator, load calculator and topology builder.
//! Everything here is synchronous pure computation over data the caller
//! has already fetched.

pub mod entities;
pub mod load;
pub mod naming;
pub mod presets;
pub mod topology;
pub mod validate;

pub use entities::{
    CurveType, Device, DeviceCategory, DeviceIcon, DeviceParent, Fuse, FuseType, JunctionBox,
    Panel, Room, Row, Socket, SpdClass,
};
pub use load::{LoadCalculation, LoadStatus, VOLTAGE};
pub use topology::{FuseView, PanelSummary, PanelView, Snapshot};
pub use validate::EngineError;
