use crate::{LocationId, RegisterId, SwitchId};

/// Purpose-built registers the lowerer and assembler reserve for themselves
/// before any user scope starts allocating. Mirrors the layout the original
/// compiler hard-codes: an instruction counter, a handful of scratch
/// registers used by multiplication/copy lowering, and a stack pointer
/// parked far away from the scratch block so user arrays can never collide
/// with it by growing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum::EnumIter)]
#[repr(u32)]
pub enum ReservedRegister {
    /// Drives round-robin dispatch of the emitted trigger table.
    InstructionCounter = 0,
    /// Scratch slot used when copying one register's value into another.
    CopyStorage,
    /// Holds the target offset of an indirect (computed) jump.
    IndirectJumpAddress,
    /// General scratch register #0.
    Temp0,
    /// General scratch register #1.
    Temp1,
    /// General scratch register #2.
    Temp2,
    /// Left operand scratch used while lowering a constant multiplication.
    MulLeft,
    /// Right operand scratch used while lowering a constant multiplication.
    MulRight,
    /// One past the last reserved register; named registers start here.
    ReservedEnd,
}

impl ReservedRegister {
    /// Casts to the physical [`RegisterId`] this reservation occupies.
    pub const fn id(self) -> RegisterId {
        self as RegisterId
    }
}

/// Register id of the expression-evaluation stack pointer. Parked at a high
/// fixed address so it never collides with the contiguous block handed out
/// to named scopes.
pub const STACK_TOP_REGISTER: RegisterId = 0x574C;

/// Purpose-built switches reserved before user `event`s can claim any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum::EnumIter)]
#[repr(u32)]
pub enum ReservedSwitch {
    /// Held while an indivisible instruction-counter update is in flight.
    InstructionCounterMutex,
    /// Held for the duration of the `poll_events` expansion, guarding
    /// against an event body re-entering dispatch while it is already
    /// running.
    EventsMutex,
    /// Latched by the subtraction-loop comparison lowering on underflow.
    ArithmeticUnderflow,
    /// Eight switches used to seed `rnd256`-style pseudo-random draws.
    Random0,
    Random1,
    Random2,
    Random3,
    Random4,
    Random5,
    Random6,
    Random7,
    /// One switch per player slot, latched by `poll_events`' dispatch.
    Player1,
    Player2,
    Player3,
    Player4,
    Player5,
    Player6,
    Player7,
    Player8,
    /// One past the last reserved switch; named switches start here.
    ReservedEnd,
}

impl ReservedSwitch {
    /// Casts to the physical [`SwitchId`] this reservation occupies.
    pub const fn id(self) -> SwitchId {
        self as SwitchId
    }
}

/// Comparison used by a condition that measures a quantity against a
/// threshold (deaths, resources, score, ...). The numeric values match the
/// game's own trigger-condition encoding, including the gap between
/// `AtMost` and `Exactly`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
#[repr(u8)]
pub enum ConditionComparison {
    AtLeast = 0,
    AtMost = 1,
    Exactly = 10,
}

/// Unit property a `unit_prop` expression or modify action addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
pub enum UnitPropType {
    HitPoints = 0,
    ShieldPoints,
    Energy,
    ResourceAmount,
    HangarCount,
    Cloaked,
    Burrowed,
    InTransit,
    Hallucinated,
    Invincible,
}

/// Quantity a `modify_unit` action adjusts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
pub enum ModifyType {
    HitPoints,
    Energy,
    ShieldPoints,
    HangarCount,
}

/// Outcome a `set_end_game` action declares for a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
pub enum EndGameType {
    Victory = 0,
    Defeat,
    Draw,
}

/// Alliance state a `set_alliance` action establishes between two players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
pub enum AllianceStatus {
    Enemy = 0,
    Ally,
    AlliedVictory,
}

/// Kind of leaderboard a `leaderboard_*` action displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
pub enum LeaderboardType {
    ControlAtLocation = 0,
    Control,
    Greed,
    Kills,
    Points,
    Resources,
}

/// Slot index of the built-in "Anywhere" location, present in every map
/// regardless of how many user locations are declared.
pub const ANYWHERE_LOCATION: LocationId = 64;

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn reserved_registers_are_contiguous_and_disjoint() {
        let ids: Vec<RegisterId> = ReservedRegister::iter().map(ReservedRegister::id).collect();
        for (i, id) in ids.iter().enumerate() {
            assert_eq!(*id, i as RegisterId);
        }
        assert_eq!(ReservedRegister::ReservedEnd.id(), ids.len() as RegisterId - 1);
    }

    #[test]
    fn stack_top_register_is_clear_of_the_reserved_block() {
        assert!(STACK_TOP_REGISTER > ReservedRegister::ReservedEnd.id());
    }

    #[test]
    fn condition_comparison_matches_the_engine_s_own_encoding() {
        assert_eq!(ConditionComparison::AtLeast as u8, 0);
        assert_eq!(ConditionComparison::AtMost as u8, 1);
        assert_eq!(ConditionComparison::Exactly as u8, 10);
    }

    #[test]
    fn anywhere_location_is_outside_the_user_addressable_range() {
        assert!((ANYWHERE_LOCATION as usize) < LOCATION_SLOT_COUNT);
    }
}
