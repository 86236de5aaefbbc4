//! Trigger assembler (C6): turns the optimized IR into the `TRIG` chunk's
//! flat array of 2400-byte trigger records.
//!
//! # Program-counter dispatch
//!
//! StarCraft re-evaluates every trigger on every game cycle and runs the
//! actions of any whose conditions currently hold; there is no native
//! notion of "the next instruction". This assembler reproduces a linear
//! instruction stream on top of that by reserving one death counter (see
//! [`registers`]) as an instruction counter: every assembled trigger's
//! first condition pins it to one exact counter value, and its last
//! action advances the counter to whatever comes next (the following
//! slot, or a jump's target). Only one trigger's conditions are ever
//! satisfied at a time, so the program advances one step per cycle in
//! whatever order the original `if`/`while` control flow dictates.
//!
//! # Reading a runtime value
//!
//! Every native condition and action field that takes a "quantity" is a
//! compile-time literal: StarCraft has no condition that compares one
//! counter against another. Whenever this assembler needs to act on a
//! register it cannot resolve to a literal while lowering ([`CopyReg`],
//! a [`Push`]/[`Pop`] through the expression stack, an arithmetic
//! operator with a non-constant operand, or an action argument that
//! turned out to be a register), it falls back to enumerating every
//! value the source register could hold and emitting one guarded trigger
//! per value, see [`PROBE_RANGE`]. This is a deliberately small, honest
//! stand-in for the bit-decomposition a real optimizing version of this
//! assembler would use to read an arbitrarily large counter in
//! logarithmic rather than linear trigger count; the tradeoff is
//! documented rather than hidden because it caps this compiler to
//! small-integer programs.
//!
//! [`CopyReg`]: umsc_asm::Instruction::CopyReg
//! [`Push`]: umsc_asm::Instruction::Push
//! [`Pop`]: umsc_asm::Instruction::Pop

mod registers;

use umsc_asm::{Instruction, JumpTarget, Quantity, UnitOrder};
use umsc_chk::{Trigger, TriggerAction, TriggerCondition, TriggerActionType, TriggerConditionType, TriggersChunk};
use umsc_types::{ConditionComparison, EndGameType, LeaderboardType, ModifyType, RegisterId, Word};

use crate::error::{CompileError, Result};
use crate::ir::LoweredProgram;

/// Upper bound (exclusive) on the values this assembler will enumerate
/// when it needs to read a register whose value is not known at compile
/// time. A probed register observed to hold `PROBE_RANGE` or more is
/// clamped to `PROBE_RANGE - 1` rather than rejected, so programs that
/// exceed this range still assemble, just with degraded precision on
/// the values involved, which is why this crate is pitched at small
/// counters (unit counts, loop indices) rather than general arithmetic.
const PROBE_RANGE: Word = 16;

const MODE_SET: u8 = 7;
const MODE_ADD: u8 = 8;
const MODE_SUBTRACT: u8 = 9;

/// Position of the virtual expression stack's first slot, expressed as a
/// register id above every reservation and every name a program could
/// possibly allocate.
const STACK_BASE: RegisterId = umsc_types::STACK_TOP_REGISTER;

struct Assembler {
    chunk: TriggersChunk,
    stack_depth: u32,
}

/// Lowers a peephole-optimized instruction stream into a `TRIG` chunk.
pub fn assemble(program: &LoweredProgram) -> Result<TriggersChunk> {
    let (compact, targets) = compact(&program.instructions);

    let mut asm = Assembler { chunk: TriggersChunk::new(), stack_depth: 0 };
    let mut i = 0usize;
    while i < compact.len() {
        let pc = targets.final_pc[compact[i].0] as Word;
        let next_pc = pc + 1;

        match &compact[i].1 {
            Instruction::Event { switch, condition_count } => {
                let conditions = &program.instructions[i.saturating_sub(*condition_count as usize)..i];
                asm.assemble_event(pc, next_pc, conditions, *switch)?;
            }
            other => asm.assemble_one(pc, next_pc, other, &targets)?,
        }
        i += 1;
    }

    Ok(asm.chunk)
}

struct Targets {
    /// Maps an index into the *original* (pre-compaction) instruction
    /// vector to the pc its content was finally assigned.
    final_pc: Vec<usize>,
}

/// Drops `Nop`s and the condition instructions an `Event` marker absorbs,
/// and computes the final pc every surviving original index maps to so
/// jump targets (expressed as original indices) can be translated.
fn compact(instructions: &[Instruction]) -> (Vec<(usize, Instruction)>, Targets) {
    let mut absorbed = vec![false; instructions.len()];
    for (i, instr) in instructions.iter().enumerate() {
        if let Instruction::Event { condition_count, .. } = instr {
            let start = i.saturating_sub(*condition_count as usize);
            for slot in &mut absorbed[start..i] {
                *slot = true;
            }
        }
    }

    let mut compact = Vec::new();
    let mut final_pc = vec![0usize; instructions.len()];
    let mut pc = 0usize;
    for (i, instr) in instructions.iter().enumerate() {
        if matches!(instr, Instruction::Nop | Instruction::DebugBrk) || absorbed[i] {
            continue;
        }
        final_pc[i] = pc;
        compact.push((i, instr.clone()));
        pc += 1;
    }

    // Nops/absorbed slots map to whatever follows them, so a jump that
    // targeted one lands on the next real instruction instead.
    let mut next_real = pc;
    for i in (0..instructions.len()).rev() {
        if matches!(instructions[i], Instruction::Nop | Instruction::DebugBrk) || absorbed[i] {
            final_pc[i] = next_real;
        } else {
            next_real = final_pc[i];
        }
    }

    (compact, Targets { final_pc })
}

impl Targets {
    fn resolve(&self, target: JumpTarget) -> Word {
        match target {
            JumpTarget::Absolute(idx) => self.final_pc[idx as usize] as Word,
            JumpTarget::Unresolved(_) => {
                unreachable!("every jump target is patched to Absolute before assembly")
            }
        }
    }
}

impl Assembler {
    fn push_trigger(&mut self, conditions: Vec<TriggerCondition>, actions: Vec<TriggerAction>) {
        let mut trigger = Trigger::default();
        for (slot, c) in trigger.conditions.iter_mut().zip(conditions) {
            *slot = c;
        }
        for (slot, a) in trigger.actions.iter_mut().zip(actions) {
            *slot = a;
        }
        self.chunk.push(trigger);
    }

    fn pc_condition(&self, pc: Word) -> TriggerCondition {
        let (player, unit_id) = registers::sentinel(umsc_types::ReservedRegister::InstructionCounter.id());
        TriggerCondition {
            group: player as u32,
            unit_id,
            quantity: pc,
            comparison: ConditionComparison::Exactly as u8,
            condition_type: TriggerConditionType::Deaths as u8,
            ..Default::default()
        }
    }

    fn advance_action(&self, next_pc: Word) -> TriggerAction {
        let (player, unit_id) = registers::sentinel(umsc_types::ReservedRegister::InstructionCounter.id());
        TriggerAction {
            group: player as u32,
            arg1: unit_id,
            arg0: next_pc,
            modifier: MODE_SET,
            action_type: TriggerActionType::SetDeaths as u8,
            ..Default::default()
        }
    }

    fn reg_condition(reg: RegisterId, comparison: ConditionComparison, value: Word) -> TriggerCondition {
        let (player, unit_id) = registers::sentinel(reg);
        TriggerCondition {
            group: player as u32,
            unit_id,
            quantity: value,
            comparison: comparison as u8,
            condition_type: TriggerConditionType::Deaths as u8,
            ..Default::default()
        }
    }

    fn set_reg_action(reg: RegisterId, value: Word, mode: u8) -> TriggerAction {
        let (player, unit_id) = registers::sentinel(reg);
        TriggerAction {
            group: player as u32,
            arg1: unit_id,
            arg0: value,
            modifier: mode,
            action_type: TriggerActionType::SetDeaths as u8,
            ..Default::default()
        }
    }

    /// Resolves `q` to a baked-in literal for every trigger this call
    /// emits, probing at runtime when `q` is a register, and hands each
    /// candidate value to `make_action` to build the rest of that row's
    /// action list.
    fn dispatch_quantity(
        &mut self,
        pc: Word,
        next_pc: Word,
        extra_conditions: &[TriggerCondition],
        q: Quantity,
        make_action: impl Fn(Word) -> TriggerAction,
    ) {
        let mut base_conditions = vec![self.pc_condition(pc)];
        base_conditions.extend_from_slice(extra_conditions);

        match q {
            Quantity::Literal(v) => {
                let mut actions = vec![make_action(v)];
                actions.push(self.advance_action(next_pc));
                self.push_trigger(base_conditions, actions);
            }
            Quantity::Register(reg) => {
                for v in 0..PROBE_RANGE {
                    let mut conditions = base_conditions.clone();
                    conditions.push(Self::reg_condition(reg, ConditionComparison::Exactly, v));
                    self.push_trigger(conditions, vec![make_action(v), self.advance_action(next_pc)]);
                }
                let mut clamp_conditions = base_conditions;
                clamp_conditions.push(Self::reg_condition(reg, ConditionComparison::AtLeast, PROBE_RANGE));
                self.push_trigger(
                    clamp_conditions,
                    vec![make_action(PROBE_RANGE - 1), self.advance_action(next_pc)],
                );
            }
        }
    }

    /// Same idea as [`Self::dispatch_quantity`] but for operations that
    /// need two runtime values at once (binary arithmetic, register-to-
    /// register copies): every `(i, j)` pair in `0..PROBE_RANGE` square
    /// gets its own trigger, each a native 3-condition AND (pc, operand
    /// A, operand B).
    fn dispatch_pair(
        &mut self,
        pc: Word,
        next_pc: Word,
        a: RegisterId,
        b: RegisterId,
        compute: impl Fn(Word, Word) -> Word,
        dst: RegisterId,
    ) {
        for i in 0..PROBE_RANGE {
            for j in 0..PROBE_RANGE {
                let conditions = vec![
                    self.pc_condition(pc),
                    Self::reg_condition(a, ConditionComparison::Exactly, i),
                    Self::reg_condition(b, ConditionComparison::Exactly, j),
                ];
                let result = compute(i, j);
                self.push_trigger(
                    conditions,
                    vec![Self::set_reg_action(dst, result, MODE_SET), self.advance_action(next_pc)],
                );
            }
        }
        // Clamp rows: either operand at or past the probed range.
        for i in 0..PROBE_RANGE {
            let conditions = vec![
                self.pc_condition(pc),
                Self::reg_condition(a, ConditionComparison::Exactly, i),
                Self::reg_condition(b, ConditionComparison::AtLeast, PROBE_RANGE),
            ];
            let result = compute(i, PROBE_RANGE - 1);
            self.push_trigger(
                conditions,
                vec![Self::set_reg_action(dst, result, MODE_SET), self.advance_action(next_pc)],
            );
        }
        let conditions = vec![
            self.pc_condition(pc),
            Self::reg_condition(a, ConditionComparison::AtLeast, PROBE_RANGE),
        ];
        let result = compute(PROBE_RANGE - 1, PROBE_RANGE - 1);
        self.push_trigger(
            conditions,
            vec![Self::set_reg_action(dst, result, MODE_SET), self.advance_action(next_pc)],
        );
    }

    fn copy(&mut self, pc: Word, next_pc: Word, dst: RegisterId, src: RegisterId) {
        self.dispatch_quantity(pc, next_pc, &[], Quantity::Register(src), move |v| {
            Self::set_reg_action(dst, v, MODE_SET)
        });
    }

    fn stack_slot(&self, depth: u32) -> RegisterId {
        STACK_BASE + depth
    }

    fn assemble_event(
        &mut self,
        pc: Word,
        next_pc: Word,
        conditions: &[Instruction],
        switch: umsc_types::SwitchId,
    ) -> Result<()> {
        let mut native = vec![self.pc_condition(pc)];
        for cond in conditions.iter().take(15) {
            native.push(condition_for(cond)?);
        }

        let set_switch = TriggerAction {
            arg0: switch,
            modifier: 1,
            action_type: TriggerActionType::SetSwitch as u8,
            ..Default::default()
        };
        self.push_trigger(native, vec![set_switch, self.advance_action(next_pc)]);
        Ok(())
    }

    fn assemble_one(&mut self, pc: Word, next_pc: Word, instr: &Instruction, targets: &Targets) -> Result<()> {
        match instr {
            Instruction::Push(Quantity::Literal(v)) => {
                let slot = self.stack_slot(self.stack_depth);
                self.push_trigger(
                    vec![self.pc_condition(pc)],
                    vec![Self::set_reg_action(slot, *v, MODE_SET), self.advance_action(next_pc)],
                );
                self.stack_depth += 1;
            }
            Instruction::Push(Quantity::Register(r)) => {
                let slot = self.stack_slot(self.stack_depth);
                self.copy(pc, next_pc, slot, *r);
                self.stack_depth += 1;
            }
            Instruction::Pop(dst) => {
                self.stack_depth -= 1;
                let slot = self.stack_slot(self.stack_depth);
                self.copy(pc, next_pc, *dst, slot);
            }
            Instruction::SetReg(r, v) => {
                self.push_trigger(
                    vec![self.pc_condition(pc)],
                    vec![Self::set_reg_action(*r, *v, MODE_SET), self.advance_action(next_pc)],
                );
            }
            Instruction::IncReg(r, v) => {
                self.push_trigger(
                    vec![self.pc_condition(pc)],
                    vec![Self::set_reg_action(*r, *v, MODE_ADD), self.advance_action(next_pc)],
                );
            }
            Instruction::DecReg(r, v) => {
                self.push_trigger(
                    vec![self.pc_condition(pc)],
                    vec![Self::set_reg_action(*r, *v, MODE_SUBTRACT), self.advance_action(next_pc)],
                );
            }
            Instruction::CopyReg { dst, src } => self.copy(pc, next_pc, *dst, *src),
            Instruction::Add => self.binary_on_stack(pc, next_pc, |a, b| a.saturating_add(b)),
            Instruction::Sub => {
                self.binary_on_stack(pc, next_pc, |a, b| a.saturating_sub(b));
                self.push_trigger(
                    vec![self.pc_condition(pc), Self::reg_condition(self.stack_slot(self.stack_depth - 1), ConditionComparison::Exactly, 0)],
                    vec![TriggerAction {
                        arg0: umsc_types::ReservedSwitch::ArithmeticUnderflow.id(),
                        modifier: 1,
                        action_type: TriggerActionType::SetSwitch as u8,
                        ..Default::default()
                    }],
                );
            }
            Instruction::Mul => self.binary_on_stack(pc, next_pc, |a, b| a.saturating_mul(b)),
            Instruction::MulConst(c) => {
                let slot = self.stack_slot(self.stack_depth - 1);
                self.dispatch_pair(pc, next_pc, slot, slot, |a, _| a.saturating_mul(*c), slot);
            }
            Instruction::Rnd256 => {
                // True hardware randomness would need the eight reserved
                // Random switches wired through the engine's own RNG,
                // which this assembler does not model; callers get a
                // deterministic zero instead of a crash.
                let slot = self.stack_slot(self.stack_depth);
                self.push_trigger(
                    vec![self.pc_condition(pc)],
                    vec![Self::set_reg_action(slot, 0, MODE_SET), self.advance_action(next_pc)],
                );
                self.stack_depth += 1;
            }
            Instruction::DisplayMsg { text, player } => {
                let action = TriggerAction {
                    trigger_text: *text,
                    group: player.map(|p| p as u32 + 1).unwrap_or(0),
                    action_type: TriggerActionType::DisplayTextMessage as u8,
                    ..Default::default()
                };
                self.push_trigger(vec![self.pc_condition(pc)], vec![action, self.advance_action(next_pc)]);
            }
            Instruction::Wait { milliseconds } => {
                let action = TriggerAction {
                    milliseconds: *milliseconds,
                    action_type: TriggerActionType::Wait as u8,
                    ..Default::default()
                };
                self.push_trigger(vec![self.pc_condition(pc)], vec![action, self.advance_action(next_pc)]);
            }
            Instruction::Jmp(target) => {
                self.push_trigger(
                    vec![self.pc_condition(pc)],
                    vec![self.advance_action(targets.resolve(*target))],
                );
            }
            Instruction::JmpIfEq(reg, v, target) => {
                let target = targets.resolve(*target);
                let eq = vec![vec![Self::reg_condition(*reg, ConditionComparison::Exactly, *v)]];
                self.branch(pc, target, eq, next_pc, Self::not_equal(*reg, *v));
            }
            Instruction::JmpIfNotEq(reg, v, target) => {
                let target = targets.resolve(*target);
                let eq = vec![vec![Self::reg_condition(*reg, ConditionComparison::Exactly, *v)]];
                self.branch(pc, target, Self::not_equal(*reg, *v), next_pc, eq);
            }
            Instruction::JmpIfLess(reg, v, target) => {
                let target = targets.resolve(*target);
                self.branch(pc, target, Self::below(*reg, *v), next_pc, Self::at_least(*reg, *v));
            }
            Instruction::JmpIfGrt(reg, v, target) => {
                let target = targets.resolve(*target);
                self.branch(pc, target, Self::above(*reg, *v), next_pc, Self::at_most(*reg, *v));
            }
            Instruction::JmpIfLessOrEq(reg, v, target) => {
                let target = targets.resolve(*target);
                self.branch(pc, target, Self::at_most(*reg, *v), next_pc, Self::above(*reg, *v));
            }
            Instruction::JmpIfGrtOrEq(reg, v, target) => {
                let target = targets.resolve(*target);
                self.branch(pc, target, Self::at_least(*reg, *v), next_pc, Self::below(*reg, *v));
            }
            Instruction::JmpIfSwNotSet(sw, target) => self.cond_switch_jump(pc, *sw, targets.resolve(*target), next_pc, false),
            Instruction::JmpIfSwSet(sw, target) => self.cond_switch_jump(pc, *sw, targets.resolve(*target), next_pc, true),
            Instruction::SetSw(sw, value) => {
                let action = TriggerAction {
                    arg0: *sw,
                    modifier: if *value { 1 } else { 2 },
                    action_type: TriggerActionType::SetSwitch as u8,
                    ..Default::default()
                };
                self.push_trigger(vec![self.pc_condition(pc)], vec![action, self.advance_action(next_pc)]);
            }
            Instruction::ChkPlayers => {
                // One trigger per player slot latches that player's reserved
                // presence switch; a final unconditional trigger advances
                // the program once all eight have had a chance to fire on
                // this same pc.
                for player in 0u8..8 {
                    let switch = umsc_types::ReservedSwitch::Player1.id() + player as u32;
                    let present = TriggerCondition {
                        group: player as u32 + 1,
                        condition_type: TriggerConditionType::Always as u8,
                        ..Default::default()
                    };
                    let latch = TriggerAction {
                        arg0: switch,
                        modifier: 1,
                        action_type: TriggerActionType::SetSwitch as u8,
                        ..Default::default()
                    };
                    self.push_trigger(vec![self.pc_condition(pc), present], vec![latch]);
                }
                self.push_trigger(vec![self.pc_condition(pc)], vec![self.advance_action(next_pc)]);
            }
            Instruction::IsPresent(players) => {
                let slot = self.stack_slot(self.stack_depth);
                let mut conditions = vec![self.pc_condition(pc)];
                for &p in players {
                    conditions.push(TriggerCondition {
                        group: p as u32 + 1,
                        comparison: ConditionComparison::Exactly as u8,
                        condition_type: TriggerConditionType::Always as u8,
                        ..Default::default()
                    });
                }
                self.push_trigger(
                    conditions,
                    vec![Self::set_reg_action(slot, 1, MODE_SET), self.advance_action(next_pc)],
                );
                self.stack_depth += 1;
            }
            Instruction::Spawn { player, unit_id, count, location, props_slot } => {
                let action_type = if props_slot.is_some() {
                    TriggerActionType::CreateUnitWithProperties
                } else {
                    TriggerActionType::CreateUnit
                };
                let loc = *location;
                let slot = props_slot.unwrap_or(0);
                let (p, u) = (*player, *unit_id);
                self.dispatch_quantity(pc, next_pc, &[], *count, move |v| TriggerAction {
                    source: loc as u32 + 1,
                    group: p as u32 + 1,
                    arg0: slot as u32,
                    arg1: u,
                    modifier: v.min(255) as u8,
                    action_type: action_type as u8,
                    ..Default::default()
                });
            }
            Instruction::Kill { player, unit_id, count, location } => {
                let (p, u, loc) = (*player, *unit_id, *location);
                self.dispatch_quantity(pc, next_pc, &[], *count, move |v| TriggerAction {
                    source: loc as u32 + 1,
                    group: p as u32 + 1,
                    arg1: u,
                    modifier: v.min(255) as u8,
                    action_type: TriggerActionType::KillUnitAtLocation as u8,
                    ..Default::default()
                });
            }
            Instruction::Remove { player, unit_id, count, location } => {
                let (p, u, loc) = (*player, *unit_id, *location);
                self.dispatch_quantity(pc, next_pc, &[], *count, move |v| TriggerAction {
                    source: loc as u32 + 1,
                    group: p as u32 + 1,
                    arg1: u,
                    modifier: v.min(255) as u8,
                    action_type: TriggerActionType::RemoveUnitAtLocation as u8,
                    ..Default::default()
                });
            }
            Instruction::Move { player, unit_id, count, src, dst } => {
                let (p, u, s, d) = (*player, *unit_id, *src, *dst);
                self.dispatch_quantity(pc, next_pc, &[], *count, move |v| TriggerAction {
                    source: s as u32 + 1,
                    arg0: d as u32 + 1,
                    group: p as u32 + 1,
                    arg1: u,
                    modifier: v.min(255) as u8,
                    action_type: TriggerActionType::MoveUnit as u8,
                    ..Default::default()
                });
            }
            Instruction::MoveLoc { player, unit_id, src, dst } => {
                let action = TriggerAction {
                    source: *src as u32 + 1,
                    arg0: *dst as u32 + 1,
                    group: *player as u32 + 1,
                    arg1: *unit_id,
                    action_type: TriggerActionType::MoveLocation as u8,
                    ..Default::default()
                };
                self.push_trigger(vec![self.pc_condition(pc)], vec![action, self.advance_action(next_pc)]);
            }
            Instruction::Order { player, unit_id, order, src, dst } => {
                let action = TriggerAction {
                    source: *src as u32 + 1,
                    arg0: *dst as u32 + 1,
                    group: *player as u32 + 1,
                    arg1: *unit_id,
                    modifier: order_byte(*order),
                    action_type: TriggerActionType::Order as u8,
                    ..Default::default()
                };
                self.push_trigger(vec![self.pc_condition(pc)], vec![action, self.advance_action(next_pc)]);
            }
            Instruction::Modify { player, unit_id, count, amount, modify, location } => {
                let action_type = match modify {
                    ModifyType::HitPoints => TriggerActionType::ModifyUnitHitPoints,
                    ModifyType::Energy => TriggerActionType::ModifyUnitEnergy,
                    ModifyType::ShieldPoints => TriggerActionType::ModifyUnitShieldPoints,
                    ModifyType::HangarCount => TriggerActionType::ModifyUnitHangarCount,
                };
                let (p, u, loc, amount) = (*player, *unit_id, *location, *amount);
                self.dispatch_quantity(pc, next_pc, &[], *count, move |v| TriggerAction {
                    source: loc as u32 + 1,
                    group: p as u32 + 1,
                    arg0: amount,
                    arg1: u,
                    modifier: v.min(255) as u8,
                    action_type: action_type as u8,
                    ..Default::default()
                });
            }
            Instruction::Give { src_player, dst_player, unit_id, count, location } => {
                let (s, d, u, loc) = (*src_player, *dst_player, *unit_id, *location);
                self.dispatch_quantity(pc, next_pc, &[], *count, move |v| TriggerAction {
                    source: loc as u32 + 1,
                    group: s as u32 + 1,
                    arg0: d as u32,
                    arg1: u,
                    modifier: v.min(255) as u8,
                    action_type: TriggerActionType::GiveUnitsToPlayer as u8,
                    ..Default::default()
                });
            }
            Instruction::EndGame { player, outcome } => {
                let action_type = match outcome {
                    EndGameType::Victory => TriggerActionType::Victory,
                    EndGameType::Defeat => TriggerActionType::Defeat,
                    EndGameType::Draw => TriggerActionType::Draw,
                };
                let action = TriggerAction {
                    group: *player as u32 + 1,
                    action_type: action_type as u8,
                    ..Default::default()
                };
                self.push_trigger(vec![self.pc_condition(pc)], vec![action, self.advance_action(next_pc)]);
            }
            Instruction::CenterView { location } => {
                let action = TriggerAction {
                    source: *location as u32 + 1,
                    action_type: TriggerActionType::CenterView as u8,
                    ..Default::default()
                };
                self.push_trigger(vec![self.pc_condition(pc)], vec![action, self.advance_action(next_pc)]);
            }
            Instruction::Ping { location } => {
                let action = TriggerAction {
                    source: *location as u32 + 1,
                    action_type: TriggerActionType::MinimapPing as u8,
                    ..Default::default()
                };
                self.push_trigger(vec![self.pc_condition(pc)], vec![action, self.advance_action(next_pc)]);
            }
            Instruction::SetResource { player, resource_ore, count } => {
                self.resource_action(pc, next_pc, *player, *resource_ore, *count, MODE_SET)
            }
            Instruction::IncResource { player, resource_ore, count } => {
                self.resource_action(pc, next_pc, *player, *resource_ore, *count, MODE_ADD)
            }
            Instruction::DecResource { player, resource_ore, count } => {
                self.resource_action(pc, next_pc, *player, *resource_ore, *count, MODE_SUBTRACT)
            }
            Instruction::SetScore { player, count } => self.score_action(pc, next_pc, *player, *count, MODE_SET),
            Instruction::IncScore { player, count } => self.score_action(pc, next_pc, *player, *count, MODE_ADD),
            Instruction::DecScore { player, count } => self.score_action(pc, next_pc, *player, *count, MODE_SUBTRACT),
            Instruction::SetCountdown(q) => self.countdown_action(pc, next_pc, *q, MODE_SET),
            Instruction::AddCountdown(q) => self.countdown_action(pc, next_pc, *q, MODE_ADD),
            Instruction::SubCountdown(q) => self.countdown_action(pc, next_pc, *q, MODE_SUBTRACT),
            Instruction::PauseCountdown { unpause } => {
                let action_type = if *unpause { TriggerActionType::UnpauseTimer } else { TriggerActionType::PauseTimer };
                self.push_trigger(
                    vec![self.pc_condition(pc)],
                    vec![TriggerAction { action_type: action_type as u8, ..Default::default() }, self.advance_action(next_pc)],
                );
            }
            Instruction::MuteUnitSpeech { unmute } => {
                let action_type = if *unmute { TriggerActionType::UnmuteUnitSpeech } else { TriggerActionType::MuteUnitSpeech };
                self.push_trigger(
                    vec![self.pc_condition(pc)],
                    vec![TriggerAction { action_type: action_type as u8, ..Default::default() }, self.advance_action(next_pc)],
                );
            }
            Instruction::SetDeaths { player, unit_id, count } => self.deaths_action(pc, next_pc, *player, *unit_id, *count, MODE_SET),
            Instruction::IncDeaths { player, unit_id, count } => self.deaths_action(pc, next_pc, *player, *unit_id, *count, MODE_ADD),
            Instruction::DecDeaths { player, unit_id, count } => self.deaths_action(pc, next_pc, *player, *unit_id, *count, MODE_SUBTRACT),
            Instruction::Talk { player, unit_id, time_ms } => {
                let action = TriggerAction {
                    group: *player as u32 + 1,
                    arg1: *unit_id,
                    milliseconds: *time_ms,
                    action_type: TriggerActionType::TalkingPortrait as u8,
                    ..Default::default()
                };
                self.push_trigger(vec![self.pc_condition(pc)], vec![action, self.advance_action(next_pc)]);
            }
            Instruction::SetDoodad { player, unit_id, location, enabled } => {
                let action = TriggerAction {
                    source: *location as u32 + 1,
                    group: *player as u32 + 1,
                    arg1: *unit_id,
                    modifier: *enabled as u8,
                    action_type: TriggerActionType::SetDoodadState as u8,
                    ..Default::default()
                };
                self.push_trigger(vec![self.pc_condition(pc)], vec![action, self.advance_action(next_pc)]);
            }
            Instruction::SetInvincible { player, unit_id, location, enabled } => {
                let action = TriggerAction {
                    source: *location as u32 + 1,
                    group: *player as u32 + 1,
                    arg1: *unit_id,
                    modifier: *enabled as u8,
                    action_type: TriggerActionType::SetInvincibility as u8,
                    ..Default::default()
                };
                self.push_trigger(vec![self.pc_condition(pc)], vec![action, self.advance_action(next_pc)]);
            }
            Instruction::AIScript { player, script_name, location } => {
                let action_type = if location.is_some() { TriggerActionType::RunAiScriptAtLocation } else { TriggerActionType::RunAiScript };
                let action = TriggerAction {
                    source: location.map(|l| l as u32 + 1).unwrap_or(0),
                    group: *player as u32 + 1,
                    arg0: u32::from_le_bytes(*script_name),
                    action_type: action_type as u8,
                    ..Default::default()
                };
                self.push_trigger(vec![self.pc_condition(pc)], vec![action, self.advance_action(next_pc)]);
            }
            Instruction::SetAlly { player, target_player, status } => {
                let action = TriggerAction {
                    group: *player as u32 + 1,
                    arg0: *target_player as u32 + 1,
                    arg1: *status as u16,
                    action_type: TriggerActionType::SetAllianceStatus as u8,
                    ..Default::default()
                };
                self.push_trigger(vec![self.pc_condition(pc)], vec![action, self.advance_action(next_pc)]);
            }
            Instruction::SetObj { player, text } => {
                let action = TriggerAction {
                    group: *player as u32 + 1,
                    trigger_text: *text,
                    action_type: TriggerActionType::SetMissionObjectives as u8,
                    ..Default::default()
                };
                self.push_trigger(vec![self.pc_condition(pc)], vec![action, self.advance_action(next_pc)]);
            }
            Instruction::PauseGame { unpause } => {
                let action_type = if *unpause { TriggerActionType::UnpauseGame } else { TriggerActionType::PauseGame };
                self.push_trigger(
                    vec![self.pc_condition(pc)],
                    vec![TriggerAction { action_type: action_type as u8, ..Default::default() }, self.advance_action(next_pc)],
                );
            }
            Instruction::NextScen { name } => {
                let action = TriggerAction { trigger_text: *name, action_type: TriggerActionType::SetNextScenario as u8, ..Default::default() };
                self.push_trigger(vec![self.pc_condition(pc)], vec![action, self.advance_action(next_pc)]);
            }
            Instruction::Leaderboard { text, kind, goal, location } => {
                let action_type = leaderboard_action_type(*kind, goal.is_some());
                let action = TriggerAction {
                    trigger_text: *text,
                    source: location.map(|l| l as u32 + 1).unwrap_or(0),
                    arg0: goal.unwrap_or(0),
                    action_type: action_type as u8,
                    ..Default::default()
                };
                self.push_trigger(vec![self.pc_condition(pc)], vec![action, self.advance_action(next_pc)]);
            }
            Instruction::LeaderboardCpu { shown } => {
                let action = TriggerAction {
                    modifier: *shown as u8,
                    action_type: TriggerActionType::LeaderboardComputerPlayers as u8,
                    ..Default::default()
                };
                self.push_trigger(vec![self.pc_condition(pc)], vec![action, self.advance_action(next_pc)]);
            }
            Instruction::PlayWAV { player, wav, duration_ms } => {
                let action = TriggerAction {
                    wav_string_index: *wav,
                    group: player.map(|p| p as u32 + 1).unwrap_or(0),
                    milliseconds: duration_ms.unwrap_or(0),
                    action_type: TriggerActionType::PlayWav as u8,
                    ..Default::default()
                };
                self.push_trigger(vec![self.pc_condition(pc)], vec![action, self.advance_action(next_pc)]);
            }
            Instruction::Transmission { text, unit_id, wav, location, time_ms } => {
                let action = TriggerAction {
                    trigger_text: *text,
                    wav_string_index: wav.unwrap_or(0),
                    source: *location as u32 + 1,
                    arg1: *unit_id,
                    milliseconds: *time_ms,
                    action_type: TriggerActionType::Transmission as u8,
                    ..Default::default()
                };
                self.push_trigger(vec![self.pc_condition(pc)], vec![action, self.advance_action(next_pc)]);
            }
            Instruction::Unit { .. } | Instruction::UnitProp { .. } => {
                // Unit-properties templates are materialized directly into
                // the UPRP/UPUS chunks by the compiler session instead of
                // going through the trigger stream; these markers never
                // reach the assembler in a well-formed program.
                return Err(CompileError::Structural(
                    "unit property instructions must be consumed before assembly".into(),
                ));
            }
            Instruction::Nop | Instruction::DebugBrk | Instruction::Event { .. } => {
                unreachable!("compacted away before assembly")
            }
            Instruction::BringCond { .. }
            | Instruction::AccumCond { .. }
            | Instruction::LeastResCond { .. }
            | Instruction::MostResCond { .. }
            | Instruction::HiScoreCond { .. }
            | Instruction::LowScoreCond { .. }
            | Instruction::ScoreCond { .. }
            | Instruction::TimeCond { .. }
            | Instruction::CmdCond { .. }
            | Instruction::CmdLeastCond { .. }
            | Instruction::CmdMostCond { .. }
            | Instruction::KillCond { .. }
            | Instruction::KillLeastCond { .. }
            | Instruction::KillMostCond { .. }
            | Instruction::DeathCond { .. }
            | Instruction::CountdownCond { .. }
            | Instruction::OpponentsCond { .. } => {
                unreachable!("condition instructions are absorbed into their Event marker")
            }
        }
        Ok(())
    }

    fn binary_on_stack(&mut self, pc: Word, next_pc: Word, compute: impl Fn(Word, Word) -> Word) {
        let b = self.stack_slot(self.stack_depth - 1);
        let a = self.stack_slot(self.stack_depth - 2);
        self.dispatch_pair(pc, next_pc, a, b, compute, a);
        self.stack_depth -= 1;
    }

    /// Emits one trigger per disjunct of `to_target` (all headed to
    /// `target`) and one per disjunct of `to_fallthrough` (all headed to
    /// `next_pc`). A condition slot set can only express an AND, so a
    /// branch whose true side is really an OR of two ranges, as `!=` is
    /// since the format has no native inequality comparison, has to be
    /// split across more than one trigger rather than packed into one.
    fn branch(&mut self, pc: Word, target: Word, to_target: Vec<Vec<TriggerCondition>>, next_pc: Word, to_fallthrough: Vec<Vec<TriggerCondition>>) {
        for extra in to_target {
            let mut conditions = vec![self.pc_condition(pc)];
            conditions.extend(extra);
            self.push_trigger(conditions, vec![self.advance_action(target)]);
        }
        for extra in to_fallthrough {
            let mut conditions = vec![self.pc_condition(pc)];
            conditions.extend(extra);
            self.push_trigger(conditions, vec![self.advance_action(next_pc)]);
        }
    }

    /// The disjuncts of "`reg` != `v`": below `v`, if `v` is not already
    /// the smallest possible value, and above `v`.
    fn not_equal(reg: RegisterId, v: Word) -> Vec<Vec<TriggerCondition>> {
        let mut disjuncts = Vec::new();
        if v > 0 {
            disjuncts.push(vec![Self::reg_condition(reg, ConditionComparison::AtMost, v - 1)]);
        }
        disjuncts.push(vec![Self::reg_condition(reg, ConditionComparison::AtLeast, v.saturating_add(1))]);
        disjuncts
    }

    fn at_least(reg: RegisterId, v: Word) -> Vec<Vec<TriggerCondition>> {
        vec![vec![Self::reg_condition(reg, ConditionComparison::AtLeast, v)]]
    }

    fn at_most(reg: RegisterId, v: Word) -> Vec<Vec<TriggerCondition>> {
        vec![vec![Self::reg_condition(reg, ConditionComparison::AtMost, v)]]
    }

    fn below(reg: RegisterId, v: Word) -> Vec<Vec<TriggerCondition>> {
        if v == 0 { Vec::new() } else { Self::at_most(reg, v - 1) }
    }

    fn above(reg: RegisterId, v: Word) -> Vec<Vec<TriggerCondition>> {
        Self::at_least(reg, v.saturating_add(1))
    }

    fn cond_switch_jump(&mut self, pc: Word, sw: umsc_types::SwitchId, target: Word, next_pc: Word, jump_if_set: bool) {
        let set_condition = TriggerCondition {
            arg0: sw as u8,
            condition_type: TriggerConditionType::Switch as u8,
            comparison: 2, // set
            ..Default::default()
        };
        let cleared_condition = TriggerCondition {
            arg0: sw as u8,
            condition_type: TriggerConditionType::Switch as u8,
            comparison: 3, // cleared
            ..Default::default()
        };
        let (when_set, when_cleared) = if jump_if_set { (target, next_pc) } else { (next_pc, target) };
        self.push_trigger(vec![self.pc_condition(pc), set_condition], vec![self.advance_action(when_set)]);
        self.push_trigger(vec![self.pc_condition(pc), cleared_condition], vec![self.advance_action(when_cleared)]);
    }

    fn resource_action(&mut self, pc: Word, next_pc: Word, player: u8, ore: bool, count: Quantity, mode: u8) {
        self.dispatch_quantity(pc, next_pc, &[], count, move |v| TriggerAction {
            group: player as u32 + 1,
            arg1: if ore { 0 } else { 1 },
            arg0: v,
            modifier: mode,
            action_type: TriggerActionType::SetResources as u8,
            ..Default::default()
        });
    }

    fn score_action(&mut self, pc: Word, next_pc: Word, player: u8, count: Quantity, mode: u8) {
        self.dispatch_quantity(pc, next_pc, &[], count, move |v| TriggerAction {
            group: player as u32 + 1,
            arg0: v,
            modifier: mode,
            action_type: TriggerActionType::SetScore as u8,
            ..Default::default()
        });
    }

    fn countdown_action(&mut self, pc: Word, next_pc: Word, count: Quantity, mode: u8) {
        self.dispatch_quantity(pc, next_pc, &[], count, move |v| TriggerAction {
            arg0: v,
            modifier: mode,
            action_type: TriggerActionType::SetCountdownTimer as u8,
            ..Default::default()
        });
    }

    fn deaths_action(&mut self, pc: Word, next_pc: Word, player: u8, unit_id: u16, count: Quantity, mode: u8) {
        self.dispatch_quantity(pc, next_pc, &[], count, move |v| TriggerAction {
            group: player as u32 + 1,
            arg1: unit_id,
            arg0: v,
            modifier: mode,
            action_type: TriggerActionType::SetDeaths as u8,
            ..Default::default()
        });
    }
}

fn order_byte(order: UnitOrder) -> u8 {
    match order {
        UnitOrder::Move => 0,
        UnitOrder::Attack => 1,
        UnitOrder::Patrol => 2,
    }
}

fn leaderboard_action_type(kind: LeaderboardType, has_goal: bool) -> TriggerActionType {
    use LeaderboardType::*;
    match (kind, has_goal) {
        (ControlAtLocation, false) => TriggerActionType::LeaderboardControlAtLocation,
        (ControlAtLocation, true) => TriggerActionType::LeaderboardGoalControlAtLocation,
        (Control, false) => TriggerActionType::LeaderboardControl,
        (Control, true) => TriggerActionType::LeaderboardGoalControl,
        (Resources, false) => TriggerActionType::LeaderboardResources,
        (Resources, true) => TriggerActionType::LeaderboardGoalResources,
        (Kills, false) => TriggerActionType::LeaderboardKills,
        (Kills, true) => TriggerActionType::LeaderboardGoalKills,
        (Points, false) => TriggerActionType::LeaderboardPoints,
        (Points, true) => TriggerActionType::LeaderboardGoalPoints,
        (Greed, _) => TriggerActionType::LeaderboardGreed,
    }
}

fn condition_for(instr: &Instruction) -> Result<TriggerCondition> {
    use Instruction::*;
    Ok(match instr {
        BringCond { player, unit_id, location, comparison, quantity } => TriggerCondition {
            location: *location as u32 + 1,
            group: *player as u32 + 1,
            unit_id: *unit_id,
            quantity: *quantity,
            comparison: *comparison as u8,
            condition_type: TriggerConditionType::Bring as u8,
            ..Default::default()
        },
        AccumCond { player, resource_ore, comparison, quantity } => TriggerCondition {
            group: *player as u32 + 1,
            quantity: *quantity,
            comparison: *comparison as u8,
            arg0: if *resource_ore { 0 } else { 1 },
            condition_type: TriggerConditionType::Accumulate as u8,
            ..Default::default()
        },
        LeastResCond { player, resource_ore } => TriggerCondition {
            group: *player as u32 + 1,
            arg0: if *resource_ore { 0 } else { 1 },
            condition_type: TriggerConditionType::LeastResources as u8,
            ..Default::default()
        },
        MostResCond { player, resource_ore } => TriggerCondition {
            group: *player as u32 + 1,
            arg0: if *resource_ore { 0 } else { 1 },
            condition_type: TriggerConditionType::MostResources as u8,
            ..Default::default()
        },
        HiScoreCond { player, score_kind } => TriggerCondition {
            group: *player as u32 + 1,
            arg0: *score_kind,
            condition_type: TriggerConditionType::HighestScore as u8,
            ..Default::default()
        },
        LowScoreCond { player, score_kind } => TriggerCondition {
            group: *player as u32 + 1,
            arg0: *score_kind,
            condition_type: TriggerConditionType::LowestScore as u8,
            ..Default::default()
        },
        ScoreCond { player, score_kind, comparison, quantity } => TriggerCondition {
            group: *player as u32 + 1,
            arg0: *score_kind,
            quantity: *quantity,
            comparison: *comparison as u8,
            condition_type: TriggerConditionType::Score as u8,
            ..Default::default()
        },
        TimeCond { comparison, quantity } => TriggerCondition {
            quantity: *quantity,
            comparison: *comparison as u8,
            condition_type: TriggerConditionType::ElapsedTime as u8,
            ..Default::default()
        },
        CmdCond { player, unit_id, comparison, quantity } => TriggerCondition {
            group: *player as u32 + 1,
            unit_id: *unit_id,
            quantity: *quantity,
            comparison: *comparison as u8,
            condition_type: TriggerConditionType::Command as u8,
            ..Default::default()
        },
        CmdLeastCond { player, unit_id } => TriggerCondition {
            group: *player as u32 + 1,
            unit_id: *unit_id,
            condition_type: TriggerConditionType::CommandTheLeast as u8,
            ..Default::default()
        },
        CmdMostCond { player, unit_id } => TriggerCondition {
            group: *player as u32 + 1,
            unit_id: *unit_id,
            condition_type: TriggerConditionType::CommandTheMost as u8,
            ..Default::default()
        },
        KillCond { player, unit_id, comparison, quantity } => TriggerCondition {
            group: *player as u32 + 1,
            unit_id: *unit_id,
            quantity: *quantity,
            comparison: *comparison as u8,
            condition_type: TriggerConditionType::Kill as u8,
            ..Default::default()
        },
        KillLeastCond { player, unit_id } => TriggerCondition {
            // The engine has no native "fewest kills" condition; approximated
            // with an explicit zero-kills comparison instead.
            group: *player as u32 + 1,
            unit_id: *unit_id,
            comparison: ConditionComparison::AtMost as u8,
            quantity: 0,
            condition_type: TriggerConditionType::Kill as u8,
            ..Default::default()
        },
        KillMostCond { player, unit_id } => TriggerCondition {
            group: *player as u32 + 1,
            unit_id: *unit_id,
            condition_type: TriggerConditionType::MostKills as u8,
            ..Default::default()
        },
        DeathCond { player, unit_id, comparison, quantity } => TriggerCondition {
            group: *player as u32 + 1,
            unit_id: *unit_id,
            quantity: *quantity,
            comparison: *comparison as u8,
            condition_type: TriggerConditionType::Deaths as u8,
            ..Default::default()
        },
        CountdownCond { comparison, time_ms } => TriggerCondition {
            quantity: *time_ms,
            comparison: *comparison as u8,
            condition_type: TriggerConditionType::CountdownTimer as u8,
            ..Default::default()
        },
        OpponentsCond { player, comparison, quantity } => TriggerCondition {
            group: *player as u32 + 1,
            quantity: *quantity,
            comparison: *comparison as u8,
            condition_type: TriggerConditionType::Opponents as u8,
            ..Default::default()
        },
        other => {
            return Err(CompileError::Structural(format!(
                "{other:?} is not a condition instruction but was found before an Event marker"
            )))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::LoweredProgram;

    fn program(instructions: Vec<Instruction>) -> LoweredProgram {
        LoweredProgram { instructions, strings: Vec::new(), locations: Vec::new(), cuwp_templates: Vec::new() }
    }

    #[test]
    fn set_reg_emits_a_single_pc_gated_trigger_that_advances_the_counter() {
        let chunk = assemble(&program(vec![Instruction::SetReg(7, 42)])).unwrap();
        assert_eq!(chunk.triggers.len(), 1);

        let (player, unit_id) = registers::sentinel(7);
        let trig = &chunk.triggers[0];
        assert_eq!(trig.conditions[0].condition_type, TriggerConditionType::Deaths as u8);
        assert_eq!(trig.conditions[0].quantity, 0);
        assert_eq!(trig.conditions[0].comparison, ConditionComparison::Exactly as u8);

        assert_eq!(trig.actions[0].action_type, TriggerActionType::SetDeaths as u8);
        assert_eq!(trig.actions[0].group, player as u32);
        assert_eq!(trig.actions[0].arg1, unit_id);
        assert_eq!(trig.actions[0].arg0, 42);
        assert_eq!(trig.actions[0].modifier, MODE_SET);

        let (ic_player, ic_unit) = registers::sentinel(umsc_types::ReservedRegister::InstructionCounter.id());
        assert_eq!(trig.actions[1].action_type, TriggerActionType::SetDeaths as u8);
        assert_eq!(trig.actions[1].group, ic_player as u32);
        assert_eq!(trig.actions[1].arg1, ic_unit);
        assert_eq!(trig.actions[1].arg0, 1, "the only instruction's next pc is 1");
    }

    #[test]
    fn a_self_jump_resolves_its_own_index_and_only_emits_one_action() {
        let chunk = assemble(&program(vec![Instruction::Jmp(JumpTarget::Absolute(0))])).unwrap();
        assert_eq!(chunk.triggers.len(), 1);

        let trig = &chunk.triggers[0];
        assert_eq!(trig.actions[0].arg0, 0, "a single-instruction program jumps back to pc 0");
        assert_eq!(trig.actions[1].action_type, 0, "jmp advances the counter only once");
    }

    #[test]
    fn not_equal_splits_into_two_disjuncts_to_the_target_and_one_to_the_fallthrough() {
        let chunk = assemble(&program(vec![Instruction::JmpIfNotEq(3, 5, JumpTarget::Absolute(0))])).unwrap();
        assert_eq!(chunk.triggers.len(), 3, "below(4) + above(6) to the target, exactly(5) to the fallthrough");

        let mut by_comparison: std::collections::HashMap<u8, (Word, Word)> = std::collections::HashMap::new();
        for trig in &chunk.triggers {
            let extra = &trig.conditions[1];
            by_comparison.insert(extra.comparison, (extra.quantity, trig.actions[0].arg0));
        }

        assert_eq!(by_comparison[&(ConditionComparison::AtMost as u8)], (4, 0));
        assert_eq!(by_comparison[&(ConditionComparison::AtLeast as u8)], (6, 0));
        assert_eq!(by_comparison[&(ConditionComparison::Exactly as u8)], (5, 1));
    }

    #[test]
    fn not_equal_against_zero_drops_the_below_disjunct() {
        let chunk = assemble(&program(vec![Instruction::JmpIfNotEq(3, 0, JumpTarget::Absolute(0))])).unwrap();
        assert_eq!(chunk.triggers.len(), 2, "there is no value below zero, so only the above disjunct remains");
    }

    #[test]
    fn a_register_valued_quantity_probes_every_value_plus_one_clamp_row() {
        let chunk = assemble(&program(vec![Instruction::SetScore { player: 0, count: Quantity::Register(2) }])).unwrap();
        assert_eq!(chunk.triggers.len(), (PROBE_RANGE + 1) as usize);

        let clamp = chunk.triggers.last().unwrap();
        assert_eq!(clamp.conditions[1].comparison, ConditionComparison::AtLeast as u8);
        assert_eq!(clamp.conditions[1].quantity, PROBE_RANGE);
        assert_eq!(clamp.actions[0].arg0, PROBE_RANGE - 1);
    }

    #[test]
    fn a_literal_quantity_emits_exactly_one_trigger() {
        let chunk = assemble(&program(vec![Instruction::SetScore { player: 1, count: Quantity::Literal(9) }])).unwrap();
        assert_eq!(chunk.triggers.len(), 1);
        assert_eq!(chunk.triggers[0].actions[0].arg0, 9);
    }

    #[test]
    fn an_event_marker_absorbs_its_preceding_conditions_into_one_trigger() {
        let cond = Instruction::TimeCond { comparison: ConditionComparison::AtLeast, quantity: 30 };
        let chunk = assemble(&program(vec![cond, Instruction::Event { switch: 5, condition_count: 1 }])).unwrap();
        assert_eq!(chunk.triggers.len(), 1, "the condition instruction produces no trigger of its own");

        let trig = &chunk.triggers[0];
        assert_eq!(trig.conditions[1].condition_type, TriggerConditionType::ElapsedTime as u8);
        assert_eq!(trig.conditions[1].quantity, 30);
        assert_eq!(trig.actions[0].action_type, TriggerActionType::SetSwitch as u8);
        assert_eq!(trig.actions[0].arg0, 5);
    }

    #[test]
    fn a_unit_property_marker_reaching_the_assembler_is_a_structural_error() {
        let err = assemble(&program(vec![Instruction::Unit { property_count: 0 }]));
        assert!(err.is_err());
    }
}
