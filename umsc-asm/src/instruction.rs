use umsc_types::{
    AllianceStatus,
    ConditionComparison,
    EndGameType,
    LeaderboardType,
    LocationId,
    ModifyType,
    PlayerId,
    RegisterId,
    StringId,
    SwitchId,
    UnitPropType,
    Word,
};

/// A unit type, identified the way the trigger editor does: by its raw
/// StarCraft unit id (0-227).
pub type UnitId = u16;

/// The order a `order_unit` action gives a unit group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitOrder {
    Move,
    Attack,
    Patrol,
}

/// Either an immediate constant or the register holding the value at
/// runtime. Most actions that accept a "quantity" argument in source text
/// (`spawn`, `kill`, `modify_unit`, the countdown actions, ...) can take a
/// literal number or an arbitrary expression; the lowerer folds the
/// expression down to whichever register its result stack-pop landed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantity {
    /// A value known at compile time.
    Literal(Word),
    /// A value held in a register at run time.
    Register(RegisterId),
}

/// Where a [`Instruction::Jmp`] family member sends control.
///
/// Lowering emits forward jumps before their destination exists, so targets
/// start out as [`JumpTarget::Unresolved`] sentinels and are patched to
/// [`JumpTarget::Absolute`] once the destination instruction's final index
/// is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JumpTarget {
    /// Final instruction index, filled in by patch-up.
    Absolute(u32),
    /// Placeholder carrying the label that will resolve this jump.
    Unresolved(u32),
}

/// One instruction of the linear intermediate representation the lowerer
/// emits and the peephole optimizer and trigger assembler both consume.
///
/// The IR is a stack machine: `Push`/`Pop` move values between registers and
/// an implicit evaluation stack, and the arithmetic/comparison instructions
/// consume their operands from the top of that stack. This mirrors how the
/// assembler ultimately realizes every operation as a sequence of trigger
/// actions against a small set of scratch registers, so there is no benefit
/// to inventing a register-operand ISA the assembler would just have to
/// serialize back down to stack discipline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Instruction {
    /// Does nothing. Left behind by peephole elimination instead of
    /// shifting every later jump target.
    Nop,
    /// Debugger breakpoint marker; never assembled into a shipped map.
    DebugBrk,

    /// Pushes a register's value, or a literal, onto the evaluation stack.
    Push(Quantity),
    /// Pops the top of the evaluation stack into a register.
    Pop(RegisterId),
    /// Sets a register to a literal value.
    SetReg(RegisterId, Word),
    /// Increments a register by a literal amount.
    IncReg(RegisterId, Word),
    /// Decrements a register by a literal amount, saturating at zero.
    DecReg(RegisterId, Word),
    /// Copies one register's value into another.
    CopyReg { dst: RegisterId, src: RegisterId },

    /// Pops two values, pushes their sum.
    Add,
    /// Pops two values, pushes their difference (saturating at zero).
    Sub,
    /// Pops two values, pushes their product.
    Mul,
    /// Pops one value, pushes its product with a compile-time constant.
    /// Emitted instead of [`Instruction::Mul`] whenever one operand of a
    /// multiplication was a literal, so the assembler can special-case
    /// `×0`, `×1` and `×2` instead of running the general shift-add loop.
    MulConst(Word),
    /// Pushes a pseudo-random value in `0..256`, drawn from the eight
    /// reserved random switches.
    Rnd256,

    /// Displays a string to one player, or to everyone if `player` is
    /// `None`.
    DisplayMsg { text: StringId, player: Option<PlayerId> },

    /// Unconditional jump.
    Jmp(JumpTarget),
    /// Jumps if a register equals a literal.
    JmpIfEq(RegisterId, Word, JumpTarget),
    /// Jumps if a register does not equal a literal.
    JmpIfNotEq(RegisterId, Word, JumpTarget),
    /// Jumps if a register is less than a literal.
    JmpIfLess(RegisterId, Word, JumpTarget),
    /// Jumps if a register is greater than a literal.
    JmpIfGrt(RegisterId, Word, JumpTarget),
    /// Jumps if a register is less than or equal to a literal.
    JmpIfLessOrEq(RegisterId, Word, JumpTarget),
    /// Jumps if a register is greater than or equal to a literal.
    JmpIfGrtOrEq(RegisterId, Word, JumpTarget),
    /// Jumps if a switch is cleared.
    JmpIfSwNotSet(SwitchId, JumpTarget),
    /// Jumps if a switch is set.
    JmpIfSwSet(SwitchId, JumpTarget),
    /// Sets or clears a switch.
    SetSw(SwitchId, bool),

    /// Checks the fixed set of players the map declares are present;
    /// latches one reserved switch per present player. Backs the
    /// `poll_events` dispatch and `is_present()` intrinsic.
    ChkPlayers,
    /// Checks whether the listed players are all present in the game.
    IsPresent(Vec<PlayerId>),

    /// Inserts a fixed real-time delay.
    Wait { milliseconds: u32 },

    /// Spawns units of `unit_id` for `player`, a quantity given by
    /// `count`, at `location`. `props_slot` names a `UPRP` template slot to
    /// apply, if the call site supplied unit properties.
    Spawn {
        player: PlayerId,
        unit_id: UnitId,
        count: Quantity,
        location: LocationId,
        props_slot: Option<u8>,
    },
    /// Removes units of `unit_id` belonging to `player` at `location`.
    Kill { player: PlayerId, unit_id: UnitId, count: Quantity, location: LocationId },
    /// Identical to [`Instruction::Kill`] but does not count as a kill for
    /// scoring purposes.
    Remove { player: PlayerId, unit_id: UnitId, count: Quantity, location: LocationId },
    /// Moves units of `unit_id` belonging to `player` from `src` to `dst`.
    Move { player: PlayerId, unit_id: UnitId, count: Quantity, src: LocationId, dst: LocationId },
    /// Orders units of `unit_id` belonging to `player`, currently at `src`,
    /// to execute `order` toward `dst`.
    Order { player: PlayerId, unit_id: UnitId, order: UnitOrder, src: LocationId, dst: LocationId },
    /// Adjusts a unit property by `amount` for `count` matching units.
    Modify {
        player: PlayerId,
        unit_id: UnitId,
        count: Quantity,
        amount: u32,
        modify: ModifyType,
        location: LocationId,
    },
    /// Transfers ownership of units from `src_player` to `dst_player`.
    Give {
        src_player: PlayerId,
        dst_player: PlayerId,
        unit_id: UnitId,
        count: Quantity,
        location: LocationId,
    },
    /// Moves a single unit (already matched elsewhere) from `src` to `dst`.
    MoveLoc { player: PlayerId, unit_id: UnitId, src: LocationId, dst: LocationId },

    /// Ends the game for `player` with the given outcome.
    EndGame { player: PlayerId, outcome: EndGameType },
    /// Centers every player's view on a location.
    CenterView { location: LocationId },
    /// Plays the minimap ping effect at a location.
    Ping { location: LocationId },

    /// Sets a resource count.
    SetResource { player: PlayerId, resource_ore: bool, count: Quantity },
    /// Increments a resource count.
    IncResource { player: PlayerId, resource_ore: bool, count: Quantity },
    /// Decrements a resource count, saturating at zero.
    DecResource { player: PlayerId, resource_ore: bool, count: Quantity },

    /// Sets a player's score.
    SetScore { player: PlayerId, count: Quantity },
    /// Increments a player's score.
    IncScore { player: PlayerId, count: Quantity },
    /// Decrements a player's score, saturating at zero.
    DecScore { player: PlayerId, count: Quantity },

    /// Sets the countdown timer.
    SetCountdown(Quantity),
    /// Adds to the countdown timer.
    AddCountdown(Quantity),
    /// Subtracts from the countdown timer, saturating at zero.
    SubCountdown(Quantity),
    /// Pauses or, if `unpause` is set, resumes the countdown timer.
    PauseCountdown { unpause: bool },
    /// Mutes or, if `unmute` is set, unmutes unit speech.
    MuteUnitSpeech { unmute: bool },

    /// Sets a unit kill/death counter directly.
    SetDeaths { player: PlayerId, unit_id: UnitId, count: Quantity },
    /// Increments a unit kill/death counter.
    IncDeaths { player: PlayerId, unit_id: UnitId, count: Quantity },
    /// Decrements a unit kill/death counter, saturating at zero.
    DecDeaths { player: PlayerId, unit_id: UnitId, count: Quantity },

    /// Makes a unit emit a voice line for a fixed duration.
    Talk { player: PlayerId, unit_id: UnitId, time_ms: u32 },
    /// Places or removes a doodad state at a location.
    SetDoodad { player: PlayerId, unit_id: UnitId, location: LocationId, enabled: bool },
    /// Sets or clears invincibility for units at a location.
    SetInvincible { player: PlayerId, unit_id: UnitId, location: LocationId, enabled: bool },
    /// Runs an AI script for a player, optionally scoped to a location.
    AIScript { player: PlayerId, script_name: [u8; 4], location: Option<LocationId> },
    /// Sets the alliance status between two players.
    SetAlly { player: PlayerId, target_player: PlayerId, status: AllianceStatus },
    /// Sets a player's mission objectives text.
    SetObj { player: PlayerId, text: StringId },

    /// Pauses or, if `unpause` is set, resumes the game.
    PauseGame { unpause: bool },
    /// Ends the current scenario in single-player campaigns.
    NextScen { name: StringId },

    /// Displays a leaderboard tracking a quantity.
    Leaderboard { text: StringId, kind: LeaderboardType, goal: Option<u32>, location: Option<LocationId> },
    /// Shows or hides the leaderboard's computer-player rows.
    LeaderboardCpu { shown: bool },

    /// Plays a WAV file for a player.
    PlayWAV { player: Option<PlayerId>, wav: StringId, duration_ms: Option<u32> },
    /// Shows a unit transmission: speech bubble text, optional WAV, at a
    /// location, for a fixed duration.
    Transmission {
        text: StringId,
        unit_id: UnitId,
        wav: Option<StringId>,
        location: LocationId,
        time_ms: u32,
    },

    /// Begins an event block: `switch_id` latches once all of the next
    /// `condition_count` instructions evaluate true.
    Event { switch: SwitchId, condition_count: u32 },

    /// `bring` condition: is a quantity of matching units present at a
    /// location.
    BringCond {
        player: PlayerId,
        unit_id: UnitId,
        location: LocationId,
        comparison: ConditionComparison,
        quantity: u32,
    },
    /// `accum` condition: resource count comparison.
    AccumCond { player: PlayerId, resource_ore: bool, comparison: ConditionComparison, quantity: u32 },
    /// `least_resources` condition: is `player` the lowest holder of a
    /// resource.
    LeastResCond { player: PlayerId, resource_ore: bool },
    /// `most_resources` condition: is `player` the highest holder of a
    /// resource.
    MostResCond { player: PlayerId, resource_ore: bool },
    /// `highest_score` condition.
    HiScoreCond { player: PlayerId, score_kind: u8 },
    /// `lowest_score` condition.
    LowScoreCond { player: PlayerId, score_kind: u8 },
    /// `score` condition: score comparison.
    ScoreCond { player: PlayerId, score_kind: u8, comparison: ConditionComparison, quantity: u32 },
    /// `elapsed_time` condition.
    TimeCond { comparison: ConditionComparison, quantity: u32 },
    /// `commands` condition: unit-count-under-command comparison.
    CmdCond { player: PlayerId, unit_id: UnitId, comparison: ConditionComparison, quantity: u32 },
    /// `commands_least` condition.
    CmdLeastCond { player: PlayerId, unit_id: UnitId },
    /// `commands_most` condition.
    CmdMostCond { player: PlayerId, unit_id: UnitId },
    /// `kills` condition: kill-count comparison.
    KillCond { player: PlayerId, unit_id: UnitId, comparison: ConditionComparison, quantity: u32 },
    /// `kills_least` condition.
    KillLeastCond { player: PlayerId, unit_id: UnitId },
    /// `kills_most` condition.
    KillMostCond { player: PlayerId, unit_id: UnitId },
    /// `deaths` condition: death-count comparison.
    DeathCond { player: PlayerId, unit_id: UnitId, comparison: ConditionComparison, quantity: u32 },
    /// `countdown` condition: countdown timer comparison.
    CountdownCond { comparison: ConditionComparison, time_ms: u32 },
    /// `opponents` condition: remaining-opponent-count comparison.
    OpponentsCond { player: PlayerId, comparison: ConditionComparison, quantity: u32 },

    /// Begins a `unit` block of `property_count` property checks, used by
    /// the custom-unit-properties template compiler.
    Unit { property_count: u32 },
    /// One property assignment inside a `unit` block.
    UnitProp { prop: UnitPropType, value: u32 },
}

impl Instruction {
    /// True for the two instructions peephole elimination looks for:
    /// [`Instruction::Push`] and [`Instruction::Pop`]. Matching pairs with
    /// identical register ids collapse to [`Instruction::Nop`].
    pub fn as_push_pop_register(&self) -> Option<(bool, RegisterId)> {
        match self {
            Instruction::Push(Quantity::Register(r)) => Some((true, *r)),
            Instruction::Pop(r) => Some((false, *r)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_register_reports_direction_and_register() {
        let push = Instruction::Push(Quantity::Register(3));
        assert_eq!(push.as_push_pop_register(), Some((true, 3)));
    }

    #[test]
    fn pop_reports_direction_and_register() {
        let pop = Instruction::Pop(5);
        assert_eq!(pop.as_push_pop_register(), Some((false, 5)));
    }

    #[test]
    fn push_literal_is_not_a_push_pop_pair_candidate() {
        let push = Instruction::Push(Quantity::Literal(7));
        assert_eq!(push.as_push_pop_register(), None);
    }

    #[test]
    fn unrelated_instruction_is_none() {
        assert_eq!(Instruction::Nop.as_push_pop_register(), None);
        assert_eq!(Instruction::Add.as_push_pop_register(), None);
    }
}
