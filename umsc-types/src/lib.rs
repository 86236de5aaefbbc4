#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
//! Atomic identifier and reserved-resource types shared by every crate in the
//! UMSC trigger compiler: register and switch ids, the register alias store's
//! error type, and the small set of enums (comparison operators, unit
//! property kinds, end-game kinds, ...) that both the IR and the trigger
//! codec need to agree on.

mod error;
mod ids;
mod reserved;

pub use error::{AliasError, Result};
pub use ids::{
    LocationId,
    PlayerId,
    RegisterId,
    StringId,
    SwitchId,
    Word,
    CUWP_SLOT_COUNT,
    LOCATION_SLOT_COUNT,
    MAX_ADDRESSABLE_REGISTERS,
    WAV_SLOT_COUNT,
};
pub use reserved::{
    AllianceStatus,
    ConditionComparison,
    EndGameType,
    LeaderboardType,
    ModifyType,
    ReservedRegister,
    ReservedSwitch,
    UnitPropType,
    ANYWHERE_LOCATION,
};
