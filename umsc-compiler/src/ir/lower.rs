//! AST-to-IR lowering (C3).
//!
//! Three passes, matching the order the original compiler commits
//! storage before it emits a single instruction: global variables and
//! unit-property templates get their registers and template slots first,
//! then every `event` block's conditions and actions are lowered, and
//! finally (implicitly, via inlining, see below) function bodies are
//! lowered at their call sites rather than as standalone subroutines.
//!
//! This crate does not emit call/return instructions: every user-defined
//! function is inlined at each call site, copying argument values into
//! the callee's own register scope before its body is lowered in place.
//! A register-machine "function" with no stack frame has nothing to gain
//! from a real call, inlining sidesteps needing a return-address
//! register and keeps recursion (which the source language does not
//! support) from ever being a question the assembler has to answer.

use umsc_asm::{Instruction, JumpTarget, Quantity, UnitOrder};
use umsc_types::{ReservedRegister, Word};

use crate::ast::{Ast, BinaryOp, Node, RegisterAliasStore, Scope};
use crate::error::{CompileError, Result};
use crate::ir::intrinsics;

/// One function declaration, captured for inlining at its call sites.
#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub params: Vec<String>,
    pub body: Vec<Node>,
}

/// Output of lowering: the flat instruction stream plus the string table
/// the assembler will need to intern into the `STR ` chunk.
pub struct LoweredProgram {
    pub instructions: Vec<Instruction>,
    pub strings: Vec<String>,
    pub locations: Vec<String>,
    pub cuwp_templates: Vec<Vec<(umsc_types::UnitPropType, u32)>>,
}

pub struct Lowerer<'a> {
    ast: &'a Ast,
    functions: std::collections::HashMap<String, FunctionDef>,
    aliases: RegisterAliasStore,
    strings: Vec<String>,
    locations: Vec<String>,
    cuwp_templates: Vec<Vec<(umsc_types::UnitPropType, u32)>>,
    instructions: Vec<Instruction>,
    inline_depth: u32,
    /// Switch id and action body of every top-level `event`, captured by
    /// Phase B for the `poll_events` expansion to inline later. An event's
    /// conditions and switch are committed immediately in Phase B; its body
    /// is only lowered once something actually polls it.
    events: Vec<(u32, Vec<Node>)>,
}

const MAX_INLINE_DEPTH: u32 = 64;

/// Restores `inline_depth` when an inline expansion's frame ends, success
/// or error alike, so a caller that catches one event's lowering failure
/// and moves on to the next does not find the depth counter permanently
/// incremented from the failed branch.
struct InlineDepthGuard<'a, 'b>(&'b mut Lowerer<'a>);

impl<'a, 'b> Drop for InlineDepthGuard<'a, 'b> {
    fn drop(&mut self) {
        self.0.inline_depth -= 1;
    }
}

impl<'a> Lowerer<'a> {
    pub fn new(ast: &'a Ast) -> Self {
        let functions = ast
            .functions()
            .map(|(name, params, body)| {
                (name.to_string(), FunctionDef { params: params.to_vec(), body: body.to_vec() })
            })
            .collect();

        Self {
            ast,
            functions,
            aliases: RegisterAliasStore::new(),
            strings: Vec::new(),
            locations: Vec::new(),
            cuwp_templates: Vec::new(),
            instructions: Vec::new(),
            inline_depth: 0,
            events: Vec::new(),
        }
    }

    pub fn lower(mut self) -> Result<LoweredProgram> {
        for (name, count) in self.ast.global_variables() {
            for i in 0..count.max(1) {
                let key = if count <= 1 { name.to_string() } else { format!("{name}#{i}") };
                self.aliases.allocate(&Scope::Global, &key)?;
            }
        }

        for (conditions, actions) in self.ast.events() {
            self.lower_event(conditions, actions)?;
        }

        let main = self
            .functions
            .get("main")
            .cloned()
            .ok_or_else(|| CompileError::Semantic("a \"main\" function must exist".into()))?;
        if !main.params.is_empty() {
            return Err(CompileError::Semantic("\"main\" must not declare parameters".into()));
        }

        self.push(Instruction::ChkPlayers);
        let main_start = self.here();
        let main_scope = Scope::Function("main".to_string());
        for stmt in &main.body {
            self.lower_statement(stmt, &main_scope)?;
        }
        if !matches!(self.instructions.last(), Some(Instruction::Jmp(_))) {
            self.push(Instruction::Jmp(JumpTarget::Absolute(main_start)));
        }

        Ok(LoweredProgram {
            instructions: self.instructions,
            strings: self.strings,
            locations: self.locations,
            cuwp_templates: self.cuwp_templates,
        })
    }

    fn push(&mut self, instr: Instruction) -> u32 {
        self.instructions.push(instr);
        (self.instructions.len() - 1) as u32
    }

    fn here(&self) -> u32 {
        self.instructions.len() as u32
    }

    /// Interns `s`, reserving index 0 as an always-empty placeholder the
    /// first time this is called. Every instruction field that carries an
    /// optional string treats 0 as "no text" (`Transmission`'s `wav` field
    /// among others), so a real string can never be allowed to land on
    /// that index the way the `STR ` chunk itself reserves its own slot 0.
    fn intern(&mut self, s: &str) -> u32 {
        if self.strings.is_empty() {
            self.strings.push(String::new());
        }
        if let Some(id) = self.strings.iter().position(|existing| existing == s) {
            return id as u32;
        }
        self.strings.push(s.to_string());
        (self.strings.len() - 1) as u32
    }

    /// Resolves a source-level location name to its physical slot,
    /// assigning the next free slot on first use. `"Anywhere"` always
    /// resolves to the fixed built-in slot rather than consuming one.
    pub(crate) fn resolve_location(&mut self, name: &str) -> Result<u8> {
        if name.eq_ignore_ascii_case("anywhere") {
            return Ok(umsc_types::ANYWHERE_LOCATION);
        }
        if let Some(id) = self.locations.iter().position(|existing| existing == name) {
            return Ok(id as u8);
        }
        if self.locations.len() >= umsc_types::LOCATION_SLOT_COUNT - 1 {
            return Err(CompileError::Capacity(format!(
                "no location slots left to declare \"{name}\""
            )));
        }
        self.locations.push(name.to_string());
        Ok((self.locations.len() - 1) as u8)
    }

    fn lower_event(&mut self, conditions: &[Node], actions: &[Node]) -> Result<()> {
        let switch = self.aliases.allocate(&Scope::Global, &format!("__event_switch_{}", self.here()))?;

        for cond in conditions {
            self.lower_condition(cond)?;
        }
        self.push(Instruction::Event { switch, condition_count: conditions.len() as u32 });

        self.events.push((switch, actions.to_vec()));
        Ok(())
    }

    /// Inline-expands `poll_events`: latch the events mutex, then for each
    /// declared event guard its inlined body behind `JmpIfSwNotSet` on the
    /// event's own switch and clear that switch once the body runs, then
    /// release the mutex. A script whose `main` never calls `poll_events`
    /// simply never dispatches its declared events.
    fn lower_poll_events(&mut self) -> Result<()> {
        let mutex = umsc_types::ReservedSwitch::EventsMutex.id();
        self.push(Instruction::SetSw(mutex, true));

        let events = self.events.clone();
        for (switch, actions) in events {
            let skip_idx = self.push(Instruction::JmpIfSwNotSet(switch, JumpTarget::Unresolved(0)));

            let scope = Scope::Function(format!("__event_body_{switch}"));
            for action in &actions {
                self.lower_statement(action, &scope)?;
            }
            self.push(Instruction::SetSw(switch, false));

            let after = self.here();
            self.patch(skip_idx, JumpTarget::Absolute(after));
        }

        self.push(Instruction::SetSw(mutex, false));
        Ok(())
    }

    fn lower_condition(&mut self, cond: &Node) -> Result<()> {
        let Node::EventCondition { name, args } = cond else {
            return Err(CompileError::Structural("event condition node of unexpected kind".into()));
        };
        intrinsics::lower_condition(self, name, args)
    }

    fn lower_statement(&mut self, node: &Node, scope: &Scope) -> Result<()> {
        match node {
            Node::Block(items) => {
                for item in items {
                    self.lower_statement(item, scope)?;
                }
                Ok(())
            }
            Node::VariableDeclaration { name, value } => {
                let q = self.lower_expr(value, scope)?;
                let reg = self.aliases.allocate(scope, name)?;
                self.assign_register(reg, q);
                Ok(())
            }
            Node::Assignment { target, index: None, value } => {
                let q = self.lower_expr(value, scope)?;
                let reg = self.resolve_register(scope, target)?;
                self.assign_register(reg, q);
                Ok(())
            }
            Node::Assignment { target, index: Some(index), value } => {
                let Node::Number(i) = index.as_ref() else {
                    return Err(CompileError::Semantic(format!(
                        "array index into \"{target}\" must be a compile-time constant"
                    )));
                };
                let q = self.lower_expr(value, scope)?;
                let reg = self.aliases.get(scope, &format!("{target}#{i}"))?;
                self.assign_register(reg, q);
                Ok(())
            }
            Node::If { condition, then_branch, else_branch } => {
                let cond_reg = self.lower_to_register(condition, scope, ReservedRegister::Temp0.id())?;
                let jmp_idx = self.push(Instruction::JmpIfEq(cond_reg, 0, JumpTarget::Unresolved(0)));

                for stmt in then_branch {
                    self.lower_statement(stmt, scope)?;
                }

                if else_branch.is_empty() {
                    let after = self.here();
                    self.patch(jmp_idx, JumpTarget::Absolute(after));
                } else {
                    let skip_else_idx = self.push(Instruction::Jmp(JumpTarget::Unresolved(0)));
                    let else_start = self.here();
                    self.patch(jmp_idx, JumpTarget::Absolute(else_start));

                    for stmt in else_branch {
                        self.lower_statement(stmt, scope)?;
                    }
                    let after = self.here();
                    self.patch(skip_else_idx, JumpTarget::Absolute(after));
                }
                Ok(())
            }
            Node::While { condition, body } => {
                let loop_start = self.here();
                let cond_reg = self.lower_to_register(condition, scope, ReservedRegister::Temp0.id())?;
                let exit_idx = self.push(Instruction::JmpIfEq(cond_reg, 0, JumpTarget::Unresolved(0)));

                for stmt in body {
                    self.lower_statement(stmt, scope)?;
                }
                self.push(Instruction::Jmp(JumpTarget::Absolute(loop_start)));

                let after = self.here();
                self.patch(exit_idx, JumpTarget::Absolute(after));
                Ok(())
            }
            Node::FunctionCall { name, args } => self.lower_call(name, args, scope).map(|_| ()),
            other => Err(CompileError::Structural(format!("{other:?} is not a statement"))),
        }
    }

    fn patch(&mut self, index: u32, target: JumpTarget) {
        let slot = &mut self.instructions[index as usize];
        *slot = match slot {
            Instruction::Jmp(_) => Instruction::Jmp(target),
            Instruction::JmpIfEq(r, w, _) => Instruction::JmpIfEq(*r, *w, target),
            Instruction::JmpIfNotEq(r, w, _) => Instruction::JmpIfNotEq(*r, *w, target),
            Instruction::JmpIfLess(r, w, _) => Instruction::JmpIfLess(*r, *w, target),
            Instruction::JmpIfGrt(r, w, _) => Instruction::JmpIfGrt(*r, *w, target),
            Instruction::JmpIfLessOrEq(r, w, _) => Instruction::JmpIfLessOrEq(*r, *w, target),
            Instruction::JmpIfGrtOrEq(r, w, _) => Instruction::JmpIfGrtOrEq(*r, *w, target),
            Instruction::JmpIfSwNotSet(s, _) => Instruction::JmpIfSwNotSet(*s, target),
            Instruction::JmpIfSwSet(s, _) => Instruction::JmpIfSwSet(*s, target),
            other => unreachable!("patch() called on non-jump instruction {other:?}"),
        };
    }

    fn assign_register(&mut self, reg: u32, q: Quantity) {
        match q {
            Quantity::Literal(v) => {
                self.push(Instruction::SetReg(reg, v));
            }
            Quantity::Register(src) if src == reg => {}
            Quantity::Register(src) => {
                self.push(Instruction::CopyReg { dst: reg, src });
            }
        }
    }

    /// Lowers an expression and guarantees the result lands in a concrete
    /// register, materializing a literal into `scratch` when necessary.
    pub(crate) fn lower_to_register(&mut self, node: &Node, scope: &Scope, scratch: u32) -> Result<u32> {
        match self.lower_expr(node, scope)? {
            Quantity::Register(r) => Ok(r),
            Quantity::Literal(v) => {
                self.push(Instruction::SetReg(scratch, v));
                Ok(scratch)
            }
        }
    }

    pub(crate) fn lower_expr(&mut self, node: &Node, scope: &Scope) -> Result<Quantity> {
        match node {
            Node::Number(n) => Ok(Quantity::Literal(*n as Word)),
            Node::Identifier { name, index: None } => {
                Ok(Quantity::Register(self.resolve_register(scope, name)?))
            }
            Node::Identifier { name, index: Some(index) } => {
                let Node::Number(i) = index.as_ref() else {
                    return Err(CompileError::Semantic(format!(
                        "array index into \"{name}\" must be a compile-time constant"
                    )));
                };
                Ok(Quantity::Register(self.aliases.get(scope, &format!("{name}#{i}"))?))
            }
            Node::Binary { op, lhs, rhs } => self.lower_binary(*op, lhs, rhs, scope),
            Node::Not(inner) => {
                let reg = self.lower_to_register(inner, scope, ReservedRegister::Temp0.id())?;
                let result = ReservedRegister::Temp1.id();
                self.push(Instruction::SetReg(result, 1));
                let skip = self.push(Instruction::JmpIfEq(reg, 0, JumpTarget::Unresolved(0)));
                self.push(Instruction::SetReg(result, 0));
                let after = self.here();
                self.patch(skip, JumpTarget::Absolute(after));
                Ok(Quantity::Register(result))
            }
            Node::FunctionCall { name, args } => {
                self.lower_call(name, args, scope)?.ok_or_else(|| {
                    CompileError::Semantic(format!("\"{name}\" does not return a value"))
                })
            }
            other => Err(CompileError::Structural(format!("{other:?} is not an expression"))),
        }
    }

    fn lower_binary(&mut self, op: BinaryOp, lhs: &Node, rhs: &Node, scope: &Scope) -> Result<Quantity> {
        use BinaryOp::*;

        if matches!(op, Equals | NotEquals | LessThan | LessThanOrEquals | GreaterThan | GreaterThanOrEquals) {
            return self.lower_comparison(op, lhs, rhs, scope).map(Quantity::Register);
        }
        if matches!(op, And | Or) {
            return self.lower_logical(op, lhs, rhs, scope).map(Quantity::Register);
        }

        if op == Divide {
            return self.lower_divide(lhs, rhs, scope);
        }

        let lq = self.lower_expr(lhs, scope)?;
        let rq = self.lower_expr(rhs, scope)?;

        if let (Quantity::Literal(a), Quantity::Literal(b)) = (lq, rq) {
            let folded = match op {
                Add => a.wrapping_add(b),
                Subtract => a.saturating_sub(b),
                Multiply => a.wrapping_mul(b),
                _ => unreachable!(),
            };
            return Ok(Quantity::Literal(folded));
        }

        if op == Multiply {
            if let Quantity::Literal(c) = rq {
                self.push(Instruction::Push(lq));
                self.push(Instruction::MulConst(c));
                let result = ReservedRegister::MulLeft.id();
                self.push(Instruction::Pop(result));
                return Ok(Quantity::Register(result));
            }
            if let Quantity::Literal(c) = lq {
                self.push(Instruction::Push(rq));
                self.push(Instruction::MulConst(c));
                let result = ReservedRegister::MulLeft.id();
                self.push(Instruction::Pop(result));
                return Ok(Quantity::Register(result));
            }
        }

        self.push(Instruction::Push(lq));
        self.push(Instruction::Push(rq));
        self.push(match op {
            Add => Instruction::Add,
            Subtract => Instruction::Sub,
            Multiply => Instruction::Mul,
            _ => unreachable!(),
        });
        let result = ReservedRegister::Temp2.id();
        self.push(Instruction::Pop(result));
        Ok(Quantity::Register(result))
    }

    /// Division has no native trigger primitive: the quotient register is
    /// open-coded as a countdown-subtraction loop, decrementing a running
    /// remainder by the divisor and incrementing the quotient once per
    /// iteration until the remainder can no longer absorb another divisor
    /// (noted upstream as suboptimal, kept for behavioral fidelity). A
    /// literal dividend and divisor still fold at lowering time; a zero
    /// divisor skips the loop entirely and leaves the quotient at zero
    /// rather than looping forever.
    fn lower_divide(&mut self, lhs: &Node, rhs: &Node, scope: &Scope) -> Result<Quantity> {
        let lq = self.lower_expr(lhs, scope)?;
        let rq = self.lower_expr(rhs, scope)?;

        if let (Quantity::Literal(a), Quantity::Literal(b)) = (lq, rq) {
            return Ok(Quantity::Literal(if b != 0 { a / b } else { 0 }));
        }

        let remaining = ReservedRegister::MulRight.id();
        self.assign_register(remaining, lq);
        let divisor = ReservedRegister::Temp1.id();
        self.assign_register(divisor, rq);
        let quotient = ReservedRegister::MulLeft.id();
        self.push(Instruction::SetReg(quotient, 0));

        let skip_loop = self.push(Instruction::JmpIfEq(divisor, 0, JumpTarget::Unresolved(0)));

        let loop_start = self.here();
        let remainder_too_small = ReservedRegister::Temp2.id();
        self.diff_underflows(remaining, divisor, remainder_too_small)?;
        let exit_idx = self.push(Instruction::JmpIfNotEq(remainder_too_small, 0, JumpTarget::Unresolved(0)));

        self.push(Instruction::Push(Quantity::Register(remaining)));
        self.push(Instruction::Push(Quantity::Register(divisor)));
        self.push(Instruction::Sub);
        self.push(Instruction::Pop(remaining));
        self.push(Instruction::IncReg(quotient, 1));
        self.push(Instruction::Jmp(JumpTarget::Absolute(loop_start)));

        let after = self.here();
        self.patch(exit_idx, JumpTarget::Absolute(after));
        self.patch(skip_loop, JumpTarget::Absolute(after));

        Ok(Quantity::Register(quotient))
    }

    /// Short-circuiting `&&`/`||`: the right operand is only evaluated
    /// when the left one cannot already decide the result.
    fn lower_logical(&mut self, op: BinaryOp, lhs: &Node, rhs: &Node, scope: &Scope) -> Result<u32> {
        let result = ReservedRegister::Temp1.id();
        let left = self.lower_to_register(lhs, scope, ReservedRegister::Temp0.id())?;

        let (short_circuit_on_zero, short_circuit_value) =
            if op == BinaryOp::And { (true, 0) } else { (false, 1) };

        self.push(Instruction::SetReg(result, short_circuit_value));
        let skip_idx = if short_circuit_on_zero {
            self.push(Instruction::JmpIfEq(left, 0, JumpTarget::Unresolved(0)))
        } else {
            self.push(Instruction::JmpIfNotEq(left, 0, JumpTarget::Unresolved(0)))
        };

        let right = self.lower_to_register(rhs, scope, ReservedRegister::Temp0.id())?;
        self.push(Instruction::CopyReg { dst: result, src: right });

        let after = self.here();
        self.patch(skip_idx, JumpTarget::Absolute(after));
        Ok(result)
    }

    /// Comparisons take the fast path (a single literal-comparing jump)
    /// whenever one side is a compile-time constant, and fall back to the
    /// subtraction/underflow idiom when both sides are only known at
    /// runtime, the trigger format's own conditions can only ever
    /// compare a counter against a literal, never two counters directly.
    fn lower_comparison(&mut self, op: BinaryOp, lhs: &Node, rhs: &Node, scope: &Scope) -> Result<u32> {
        let lq = self.lower_expr(lhs, scope)?;
        let rq = self.lower_expr(rhs, scope)?;

        match (lq, rq) {
            (Quantity::Register(reg), Quantity::Literal(lit)) => Ok(self.literal_cmp(op, reg, lit)),
            (Quantity::Literal(lit), Quantity::Register(reg)) => {
                Ok(self.literal_cmp(flip(op), reg, lit))
            }
            (Quantity::Literal(a), Quantity::Literal(b)) => {
                let result = ReservedRegister::Temp1.id();
                let value = if compare_literals(op, a, b) { 1 } else { 0 };
                self.push(Instruction::SetReg(result, value));
                Ok(result)
            }
            (Quantity::Register(lreg), Quantity::Register(rreg)) => {
                self.runtime_cmp(op, lreg, rreg)
            }
        }
    }

    fn literal_cmp(&mut self, op: BinaryOp, reg: u32, lit: Word) -> u32 {
        let result = ReservedRegister::Temp1.id();
        self.push(Instruction::SetReg(result, 1));

        let skip_idx = self.push(match op {
            BinaryOp::Equals => Instruction::JmpIfNotEq(reg, lit, JumpTarget::Unresolved(0)),
            BinaryOp::NotEquals => Instruction::JmpIfEq(reg, lit, JumpTarget::Unresolved(0)),
            BinaryOp::LessThan => Instruction::JmpIfGrtOrEq(reg, lit, JumpTarget::Unresolved(0)),
            BinaryOp::LessThanOrEquals => Instruction::JmpIfGrt(reg, lit, JumpTarget::Unresolved(0)),
            BinaryOp::GreaterThan => Instruction::JmpIfLessOrEq(reg, lit, JumpTarget::Unresolved(0)),
            BinaryOp::GreaterThanOrEquals => Instruction::JmpIfLess(reg, lit, JumpTarget::Unresolved(0)),
            _ => unreachable!(),
        });
        self.push(Instruction::SetReg(result, 0));
        let after = self.here();
        self.patch(skip_idx, JumpTarget::Absolute(after));
        result
    }

    fn runtime_cmp(&mut self, op: BinaryOp, lreg: u32, rreg: u32) -> Result<u32> {
        let less = ReservedRegister::Temp2.id();
        self.diff_underflows(lreg, rreg, less)?;

        match op {
            BinaryOp::LessThan => Ok(less),
            BinaryOp::GreaterThanOrEquals => Ok(self.negate(less)),
            BinaryOp::GreaterThan => {
                let greater = ReservedRegister::Temp2.id();
                self.diff_underflows(rreg, lreg, greater)?;
                Ok(greater)
            }
            BinaryOp::LessThanOrEquals => {
                let greater = ReservedRegister::Temp2.id();
                self.diff_underflows(rreg, lreg, greater)?;
                Ok(self.negate(greater))
            }
            BinaryOp::Equals => {
                let lt = self.runtime_cmp(BinaryOp::LessThan, lreg, rreg)?;
                let gt = self.runtime_cmp(BinaryOp::GreaterThan, lreg, rreg)?;
                Ok(self.nor(lt, gt))
            }
            BinaryOp::NotEquals => {
                let eq = self.runtime_cmp(BinaryOp::Equals, lreg, rreg)?;
                Ok(self.negate(eq))
            }
            _ => unreachable!(),
        }
    }

    /// `dst <- 1` if `a - b` underflows (i.e. `a < b`), else `0`. Relies
    /// on the assembler latching [`umsc_types::ReservedSwitch::ArithmeticUnderflow`]
    /// whenever a [`Instruction::Sub`] saturates instead of producing a
    /// true difference.
    fn diff_underflows(&mut self, a: u32, b: u32, dst: u32) -> Result<()> {
        self.push(Instruction::Push(Quantity::Register(a)));
        self.push(Instruction::Push(Quantity::Register(b)));
        self.push(Instruction::Sub);
        let scratch = ReservedRegister::Temp0.id();
        self.push(Instruction::Pop(scratch));

        let underflow = umsc_types::ReservedSwitch::ArithmeticUnderflow.id();
        self.push(Instruction::SetReg(dst, 0));
        let skip = self.push(Instruction::JmpIfSwNotSet(underflow, JumpTarget::Unresolved(0)));
        self.push(Instruction::SetReg(dst, 1));
        let after = self.here();
        self.patch(skip, JumpTarget::Absolute(after));
        Ok(())
    }

    fn negate(&mut self, reg: u32) -> u32 {
        let result = ReservedRegister::Temp1.id();
        self.push(Instruction::SetReg(result, 1));
        let skip = self.push(Instruction::JmpIfEq(reg, 0, JumpTarget::Unresolved(0)));
        self.push(Instruction::SetReg(result, 0));
        let after = self.here();
        self.patch(skip, JumpTarget::Absolute(after));
        result
    }

    fn nor(&mut self, a: u32, b: u32) -> u32 {
        let either = self.lower_logical_registers(a, b, true);
        self.negate(either)
    }

    fn lower_logical_registers(&mut self, a: u32, b: u32, is_or: bool) -> u32 {
        let result = ReservedRegister::Temp1.id();
        let short_value = if is_or { 1 } else { 0 };
        self.push(Instruction::SetReg(result, short_value));
        let skip = if is_or {
            self.push(Instruction::JmpIfNotEq(a, 0, JumpTarget::Unresolved(0)))
        } else {
            self.push(Instruction::JmpIfEq(a, 0, JumpTarget::Unresolved(0)))
        };
        self.push(Instruction::CopyReg { dst: result, src: b });
        let after = self.here();
        self.patch(skip, JumpTarget::Absolute(after));
        result
    }

    /// Lowers a call, inlining user-defined functions and dispatching
    /// built-ins to [`intrinsics`]. Returns the callee's result register,
    /// if it produces a value (`rnd256`, `is_present`, and user functions
    /// whose last statement is an expression all do; most actions don't).
    fn lower_call(&mut self, name: &str, args: &[Node], scope: &Scope) -> Result<Option<Quantity>> {
        if name == "poll_events" {
            if !args.is_empty() {
                return Err(CompileError::Semantic("\"poll_events\" takes no arguments".into()));
            }
            self.lower_poll_events()?;
            return Ok(None);
        }
        if let Some(def) = self.functions.get(name).cloned() {
            return self.inline_call(name, &def, args, scope).map(Some);
        }
        intrinsics::lower_call(self, name, args, scope)
    }

    fn inline_call(&mut self, name: &str, def: &FunctionDef, args: &[Node], caller_scope: &Scope) -> Result<Quantity> {
        if self.inline_depth >= MAX_INLINE_DEPTH {
            return Err(CompileError::Semantic(format!(
                "\"{name}\" recurses or inlines too deeply (the source language has no call stack to unwind one)"
            )));
        }
        if args.len() != def.params.len() {
            return Err(CompileError::Semantic(format!(
                "\"{name}\" expects {} argument(s), got {}",
                def.params.len(),
                args.len()
            )));
        }

        let callee_scope = Scope::Function(format!("{name}#{}", self.inline_depth));
        self.inline_depth += 1;
        let guard = InlineDepthGuard(self);

        for (param, arg) in def.params.iter().zip(args) {
            let value = guard.0.lower_expr(arg, caller_scope)?;
            let reg = guard.0.aliases.allocate(&callee_scope, param)?;
            guard.0.assign_register(reg, value);
        }

        let mut result = Quantity::Literal(0);
        for stmt in &def.body {
            if let Node::FunctionCall { .. } | Node::Number(_) | Node::Identifier { .. } | Node::Binary { .. } = stmt {
                result = guard.0.lower_expr(stmt, &callee_scope)?;
            } else {
                guard.0.lower_statement(stmt, &callee_scope)?;
            }
        }

        Ok(result)
    }

    pub(crate) fn intern_string(&mut self, s: &str) -> u32 {
        self.intern(s)
    }

    pub(crate) fn emit(&mut self, instr: Instruction) -> u32 {
        self.push(instr)
    }

    pub(crate) fn here_index(&self) -> u32 {
        self.here()
    }

    pub(crate) fn patch_jump(&mut self, index: u32, target: JumpTarget) {
        self.patch(index, target)
    }

    /// Resolves an identifier to a register: a declared name through the
    /// alias store first, falling back to the `r<digits>` raw-register
    /// escape hatch only once alias resolution fails, so a declared name
    /// that happens to read like `r3` still goes through the store.
    pub(crate) fn resolve_register(&mut self, scope: &Scope, name: &str) -> Result<u32> {
        match self.aliases.get(scope, name) {
            Ok(id) => Ok(id),
            Err(err) => raw_register(name).ok_or_else(|| err.into()),
        }
    }

    /// Registers a `unit { ... }` properties template and returns its
    /// `UPRP`/`UPUS` slot, or an error once the fixed 64-slot table is
    /// full.
    pub(crate) fn alloc_cuwp(&mut self, props: Vec<(umsc_types::UnitPropType, u32)>) -> Result<u8> {
        if self.cuwp_templates.len() >= umsc_types::CUWP_SLOT_COUNT {
            return Err(CompileError::Capacity("no custom unit property slots left".into()));
        }
        self.cuwp_templates.push(props);
        Ok((self.cuwp_templates.len() - 1) as u8)
    }

    pub(crate) fn unit_order_from_name(name: &str) -> Option<UnitOrder> {
        match name {
            "move" => Some(UnitOrder::Move),
            "attack" => Some(UnitOrder::Attack),
            "patrol" => Some(UnitOrder::Patrol),
            _ => None,
        }
    }
}

/// Parses `r<digits>` into the raw register id it names, e.g. `r12` -> 12.
/// Anything else, including a bare `r` with no digits, is not a raw
/// register reference.
fn raw_register(name: &str) -> Option<u32> {
    let digits = name.strip_prefix('r')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn flip(op: BinaryOp) -> BinaryOp {
    use BinaryOp::*;
    match op {
        LessThan => GreaterThan,
        GreaterThan => LessThan,
        LessThanOrEquals => GreaterThanOrEquals,
        GreaterThanOrEquals => LessThanOrEquals,
        other => other,
    }
}

fn compare_literals(op: BinaryOp, a: Word, b: Word) -> bool {
    use BinaryOp::*;
    match op {
        Equals => a == b,
        NotEquals => a != b,
        LessThan => a < b,
        LessThanOrEquals => a <= b,
        GreaterThan => a > b,
        GreaterThanOrEquals => a >= b,
        _ => unreachable!(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Ast;

    #[test]
    fn first_interned_string_is_not_local_id_zero() {
        let ast = Ast::new(vec![]);
        let mut lowerer = Lowerer::new(&ast);
        let id = lowerer.intern_string("hello");
        assert_ne!(id, 0, "a real string must never collide with the reserved empty slot 0");
        assert_eq!(lowerer.intern_string(""), 0);
    }

    #[test]
    fn interning_the_same_string_twice_returns_the_same_id() {
        let ast = Ast::new(vec![]);
        let mut lowerer = Lowerer::new(&ast);
        let a = lowerer.intern_string("victory");
        let b = lowerer.intern_string("victory");
        assert_eq!(a, b);
    }

    #[test]
    fn anywhere_resolves_to_the_fixed_slot_without_growing_the_table() {
        let ast = Ast::new(vec![]);
        let mut lowerer = Lowerer::new(&ast);
        assert_eq!(lowerer.resolve_location("Anywhere").unwrap(), umsc_types::ANYWHERE_LOCATION);
        assert_eq!(lowerer.resolve_location("anywhere").unwrap(), umsc_types::ANYWHERE_LOCATION);
        assert!(lowerer.locations.is_empty());
    }

    #[test]
    fn resolving_the_same_named_location_twice_reuses_the_slot() {
        let ast = Ast::new(vec![]);
        let mut lowerer = Lowerer::new(&ast);
        let a = lowerer.resolve_location("Main Base").unwrap();
        let b = lowerer.resolve_location("Main Base").unwrap();
        assert_eq!(a, b);
        assert_eq!(lowerer.locations.len(), 1);
    }

    fn main_fn(body: Vec<Node>) -> Node {
        Node::FunctionDeclaration { name: "main".into(), params: vec![], body }
    }

    #[test]
    fn lowering_without_a_main_function_is_a_semantic_error() {
        let ast = Ast::new(vec![Node::GlobalVariableDeclaration { name: "arr".into(), count: 3 }]);
        let err = Lowerer::new(&ast).lower().unwrap_err();
        assert!(matches!(err, CompileError::Semantic(_)));
    }

    #[test]
    fn global_variable_array_allocates_one_register_per_element() {
        let ast = Ast::new(vec![
            Node::GlobalVariableDeclaration { name: "arr".into(), count: 3 },
            main_fn(vec![]),
        ]);
        let program = Lowerer::new(&ast).lower().unwrap();
        // Just the Phase C scaffold: a check-players instruction and the
        // tick-loop jump back to main's (empty) start.
        assert_eq!(program.instructions.len(), 2);
        assert!(matches!(program.instructions[0], Instruction::ChkPlayers));
        assert!(matches!(program.instructions[1], Instruction::Jmp(_)));
    }

    #[test]
    fn main_s_own_trailing_jump_is_not_duplicated() {
        let ast = Ast::new(vec![main_fn(vec![Node::call("poll_events", vec![])])]);
        let program = Lowerer::new(&ast).lower().unwrap();
        // poll_events with no declared events expands to just the mutex
        // set/clear; main's last instruction still isn't a jump, so one
        // gets appended.
        assert!(matches!(program.instructions.last(), Some(Instruction::Jmp(_))));
    }

    #[test]
    fn an_event_with_a_bring_condition_is_dispatched_by_poll_events() {
        let ast = Ast::new(vec![
            Node::EventDeclaration {
                conditions: vec![Node::EventCondition {
                    name: "bring".into(),
                    args: vec![
                        Node::Number(0),
                        Node::Number(0),
                        Node::Str("Anywhere".into()),
                        Node::Str("at_least".into()),
                        Node::Number(1),
                    ],
                }],
                actions: vec![Node::call("print", vec![Node::Str("hi".into())])],
            },
            main_fn(vec![Node::call("poll_events", vec![])]),
        ]);

        let program = Lowerer::new(&ast).lower().unwrap();
        assert!(program.instructions.iter().any(|i| matches!(i, Instruction::Event { .. })));
        assert!(program.instructions.iter().any(|i| matches!(i, Instruction::DisplayMsg { text, .. } if *text != 0)));
        assert!(program.instructions.iter().any(|i| matches!(i, Instruction::SetSw(s, _) if *s == umsc_types::ReservedSwitch::EventsMutex.id())));
    }

    #[test]
    fn an_event_s_body_does_not_lower_until_something_polls_it() {
        let ast = Ast::new(vec![
            Node::EventDeclaration {
                conditions: vec![],
                actions: vec![Node::call("print", vec![Node::Str("never runs".into())])],
            },
            main_fn(vec![]),
        ]);

        let program = Lowerer::new(&ast).lower().unwrap();
        assert!(!program.instructions.iter().any(|i| matches!(i, Instruction::DisplayMsg { .. })));
    }

    #[test]
    fn if_without_an_else_patches_its_jump_to_an_absolute_target_past_the_body() {
        let ast = Ast::new(vec![main_fn(vec![Node::If {
            condition: Box::new(Node::Number(1)),
            then_branch: vec![Node::call("wait", vec![Node::Number(1)])],
            else_branch: vec![],
        }])]);

        let program = Lowerer::new(&ast).lower().unwrap();
        let jump = program
            .instructions
            .iter()
            .find_map(|i| match i {
                Instruction::JmpIfEq(_, _, JumpTarget::Absolute(t)) => Some(*t),
                _ => None,
            })
            .expect("the if's condition jump should have been patched to an absolute target");
        assert!((jump as usize) <= program.instructions.len());
    }

    #[test]
    fn inlining_a_function_copies_arguments_into_a_fresh_callee_scope() {
        let ast = Ast::new(vec![
            Node::FunctionDeclaration {
                name: "double".into(),
                params: vec!["x".into()],
                body: vec![Node::binary(BinaryOp::Add, Node::Identifier { name: "x".into(), index: None }, Node::Identifier { name: "x".into(), index: None })],
            },
            main_fn(vec![Node::VariableDeclaration {
                name: "result".into(),
                value: Box::new(Node::call("double", vec![Node::Number(21)])),
            }]),
        ]);

        let program = Lowerer::new(&ast).lower().unwrap();
        assert!(program.instructions.iter().any(|i| matches!(i, Instruction::Add)));
    }

    #[test]
    fn recursive_inlining_past_the_depth_bound_is_a_semantic_error() {
        let ast = Ast::new(vec![
            Node::FunctionDeclaration {
                name: "loopy".into(),
                params: vec![],
                body: vec![Node::FunctionCall { name: "loopy".into(), args: vec![] }],
            },
            main_fn(vec![Node::FunctionCall { name: "loopy".into(), args: vec![] }]),
        ]);

        let err = Lowerer::new(&ast).lower().unwrap_err();
        assert!(matches!(err, CompileError::Semantic(_)));
    }

    #[test]
    fn wrong_argument_count_to_a_user_function_is_a_semantic_error() {
        let ast = Ast::new(vec![
            Node::FunctionDeclaration { name: "needs_one".into(), params: vec!["x".into()], body: vec![] },
            main_fn(vec![Node::FunctionCall { name: "needs_one".into(), args: vec![] }]),
        ]);

        let err = Lowerer::new(&ast).lower().unwrap_err();
        assert!(matches!(err, CompileError::Semantic(_)));
    }

    #[test]
    fn an_inline_error_does_not_leave_the_depth_counter_incremented() {
        let ast = Ast::new(vec![
            Node::FunctionDeclaration { name: "needs_one".into(), params: vec!["x".into()], body: vec![] },
            main_fn(vec![
                Node::FunctionCall { name: "needs_one".into(), args: vec![] },
                Node::VariableDeclaration { name: "after_error".into(), value: Box::new(Node::Number(1)) },
            ]),
        ]);

        // The first call fails (wrong argument count); lowering aborts
        // there since it is not resumable, but a Lowerer instance reused
        // across independent roots must not see inline_depth left
        // incremented by the failed frame.
        let mut lowerer = Lowerer::new(&ast);
        assert_eq!(lowerer.inline_depth, 0);
        let _ = lowerer.lower_call("needs_one", &[], &Scope::Function("main".into()));
        assert_eq!(lowerer.inline_depth, 0);
    }

    #[test]
    fn an_identifier_matching_r_digits_resolves_to_the_raw_register_once_no_alias_exists() {
        let ast = Ast::new(vec![]);
        let mut lowerer = Lowerer::new(&ast);
        let reg = lowerer.resolve_register(&Scope::Global, "r42").unwrap();
        assert_eq!(reg, 42);
    }

    #[test]
    fn a_declared_name_that_looks_like_r_digits_still_resolves_through_the_alias_store() {
        let ast = Ast::new(vec![]);
        let mut lowerer = Lowerer::new(&ast);
        let allocated = lowerer.aliases.allocate(&Scope::Global, "r3").unwrap();
        let resolved = lowerer.resolve_register(&Scope::Global, "r3").unwrap();
        assert_eq!(allocated, resolved);
    }

    #[test]
    fn an_undeclared_non_r_digits_identifier_is_still_a_semantic_error() {
        let ast = Ast::new(vec![]);
        let mut lowerer = Lowerer::new(&ast);
        let err = lowerer.resolve_register(&Scope::Global, "nope").unwrap_err();
        assert!(matches!(err, CompileError::Semantic(_)));
    }

    #[test]
    fn division_lowers_to_a_countdown_subtraction_loop_with_a_zero_divisor_guard() {
        let ast = Ast::new(vec![
            Node::GlobalVariableDeclaration { name: "a".into(), count: 1 },
            Node::GlobalVariableDeclaration { name: "b".into(), count: 1 },
            main_fn(vec![Node::VariableDeclaration {
                name: "q".into(),
                value: Box::new(Node::binary(
                    BinaryOp::Divide,
                    Node::Identifier { name: "a".into(), index: None },
                    Node::Identifier { name: "b".into(), index: None },
                )),
            }]),
        ]);

        let program = Lowerer::new(&ast).lower().unwrap();
        assert!(program.instructions.iter().any(|i| matches!(i, Instruction::Sub)));
        assert!(program.instructions.iter().any(|i| matches!(i, Instruction::IncReg(_, 1))));
        // a self-targeting backward jump is the loop body's repeat edge.
        assert!(program.instructions.iter().enumerate().any(|(idx, i)| matches!(
            i,
            Instruction::Jmp(JumpTarget::Absolute(t)) if (*t as usize) < idx
        )));
    }

    #[test]
    fn dividing_by_a_literal_still_folds_at_lowering_time() {
        let ast = Ast::new(vec![main_fn(vec![Node::VariableDeclaration {
            name: "q".into(),
            value: Box::new(Node::binary(BinaryOp::Divide, Node::Number(10), Node::Number(3))),
        }])]);
        let program = Lowerer::new(&ast).lower().unwrap();
        assert!(program.instructions.iter().any(|i| matches!(i, Instruction::SetReg(_, 3))));
        assert!(!program.instructions.iter().any(|i| matches!(i, Instruction::Sub)));
    }
}
