//! IR to x86-64 Lowering
//!
//! This module translates the compacted IR into AT&T assembly, one basic
//! block at a time.
//!
//! # Pipeline
//!
//! ```text
//! IR block → collect variables → liveness → coloring → x86-64 instructions
//! ```
//!
//! Colored variables are loaded into their register on first use and stay
//! there until a synchronization point writes them back; uncolored variables
//! are addressed in memory directly. Synchronization points are block
//! entries, labels, control transfers and the pointer instructions.

use crate::backend::ir::{BinaryOp, FunctionInfo, Instr, InstrKind, Label, UnaryOp, Value, Variable};
use crate::backend::regalloc::{
    BlockFinder, Coloring, GraphColoringAllocator, collect_variables, compute_liveness,
};
use crate::backend::x86_64::frame::Frame;
use crate::backend::x86_64::instr::{AluOp, Condition, MemOperand, Operand, X86Instr};
use crate::backend::x86_64::regs::X86Reg;
use crate::backend::x86_64::residency::Residency;
use crate::common::types::StorageClass;
use crate::config::Config;
use crate::error::{CompileError, Result};
use std::collections::HashSet;
use std::ops::Range;
use tracing::{debug, trace};

/// Emit assembly for a whole compacted program
pub fn generate(instrs: &[Instr], functions: &[FunctionInfo], config: &Config) -> Result<String> {
    CodeGenerator::new(instrs, functions, config).generate()
}

/// Code generation context
pub struct CodeGenerator<'a> {
    instrs: &'a [Instr],
    functions: &'a [FunctionInfo],
    config: &'a Config,
    allocator: GraphColoringAllocator,
    /// Coloring of the block being emitted
    coloring: Coloring,
    residency: Residency,
    /// Frames of the functions entered and not yet left for good
    frames: Vec<Frame>,
    instructions: Vec<X86Instr>,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(instrs: &'a [Instr], functions: &'a [FunctionInfo], config: &'a Config) -> Self {
        Self {
            instrs,
            functions,
            config,
            allocator: GraphColoringAllocator::new(config),
            coloring: Coloring::empty(),
            residency: Residency::new(),
            frames: Vec::new(),
            instructions: Vec::new(),
        }
    }

    pub fn generate(mut self) -> Result<String> {
        let blocks = BlockFinder::new(self.instrs);
        let prefix = blocks.global_prefix_len();

        self.emit_data(prefix)?;
        self.directive(".text");
        self.directive(".globl main");

        for range in blocks {
            self.lower_block(range)?;
        }

        Ok(self.render())
    }

    fn render(&self) -> String {
        let mut out = String::new();
        for instr in &self.instructions {
            if !instr.is_flush_left() {
                out.push_str("    ");
            }
            out.push_str(&instr.to_string());
            out.push('\n');
        }
        out
    }

    // ========================================================================
    // Emission helpers
    // ========================================================================

    fn emit(&mut self, instr: X86Instr) {
        self.instructions.push(instr);
    }

    fn directive(&mut self, text: impl Into<String>) {
        self.emit(X86Instr::Directive { text: text.into() });
    }

    fn comment(&mut self, text: impl Into<String>) {
        self.emit(X86Instr::Comment { text: text.into() });
    }

    fn mov(&mut self, src: impl Into<Operand>, dst: impl Into<Operand>) {
        self.emit(X86Instr::mov(src, dst));
    }

    /// One `.quad` per global initializer
    fn emit_data(&mut self, prefix: usize) -> Result<()> {
        self.directive(".data");
        for instr in &self.instrs[..prefix] {
            match &instr.kind {
                InstrKind::Copy {
                    dst,
                    src: Value::Lit(value),
                } => {
                    self.instructions.push(X86Instr::Directive {
                        text: format!("{}: .quad {}", dst, value),
                    });
                }
                other => {
                    return Err(CompileError::unresolved(other, "global initializer"));
                }
            }
        }
        Ok(())
    }

    // ========================================================================
    // Blocks
    // ========================================================================

    fn lower_block(&mut self, range: Range<usize>) -> Result<()> {
        let instrs = self.instrs;
        let vars = collect_variables(instrs, range.clone());
        let intervals = compute_liveness(&vars, instrs, range.clone());
        let coloring = self
            .allocator
            .allocate(instrs, range.clone(), &vars, &intervals);

        debug!(
            start = range.start,
            end = range.end,
            nodes = vars.len(),
            colors = coloring.colors_used(),
            strategy = ?coloring.strategy,
            "allocated block"
        );

        self.spill_all()?;
        self.coloring = coloring;

        if self.config.print_blocks {
            self.comment("<bb>");
        }

        for index in range {
            self.lower_instruction(&instrs[index], index)?;
        }

        Ok(())
    }

    /// Lower a single IR instruction
    fn lower_instruction(&mut self, instr: &Instr, index: usize) -> Result<()> {
        if self.config.verbose_asm {
            for line in instr.to_string().lines() {
                self.comment(line);
            }
        }
        trace!(ir = %instr, "lowering");

        if let Some(label) = &instr.label {
            self.spill_all()?;
            self.emit(X86Instr::Label {
                name: label.asm_name(),
            });
            if let Label::Function(name) = label {
                self.emit_prologue(name, index)?;
            }
        }

        match &instr.kind {
            InstrKind::Nop => {}

            InstrKind::Copy { dst, src } => self.lower_copy(dst, src)?,

            InstrKind::Unary {
                result,
                op,
                operand,
            } => self.lower_unary(result, *op, operand)?,

            InstrKind::Binary {
                result,
                op,
                left,
                right,
            } => match op {
                BinaryOp::Div | BinaryOp::Mod => self.lower_divide(result, *op, left, right)?,
                op if op.is_comparison() => self.lower_compare(result, *op, left, right)?,
                op => self.lower_arith(result, *op, left, right)?,
            },

            InstrKind::Goto { target } => {
                self.spill_all()?;
                self.emit(X86Instr::Jmp {
                    target: target.asm_name(),
                });
            }

            InstrKind::CondJump { cond, target } => self.lower_cond_jump(cond, target)?,

            InstrKind::Call {
                result,
                callee,
                args,
            } => self.lower_call(callee, args, Some(result))?,

            InstrKind::ProcCall { callee, args } => self.lower_call(callee, args, None)?,

            InstrKind::Return { value, is_last } => self.lower_return(value.as_ref(), *is_last)?,

            InstrKind::AssignRef { dst, src } => {
                self.spill_all()?;
                let addr = self.memory(src)?;
                let target = self.define(dst)?;
                let work = target.unwrap_or(X86Reg::SCRATCH);
                self.emit(X86Instr::Lea {
                    src: addr,
                    dst: work,
                });
                self.deliver(work, target, dst)?;
            }

            InstrKind::AssignDeref { dst, src } => {
                self.spill_all()?;
                let pointer = self.in_memory(src)?;
                self.mov(pointer, X86Reg::SCRATCH);
                let target = self.define(dst)?;
                let work = target.unwrap_or(X86Reg::SCRATCH);
                self.mov(MemOperand::Indirect(X86Reg::SCRATCH), work);
                self.deliver(work, target, dst)?;
            }

            InstrKind::DerefAssign { dst, src } => {
                let value = self.operand(src)?;
                self.spill_all()?;
                let pointer = self.memory(dst)?;
                self.mov(pointer, X86Reg::SCRATCH);
                let through = MemOperand::Indirect(X86Reg::SCRATCH);
                match value {
                    Operand::Mem(mem) => {
                        self.emit(X86Instr::Push {
                            src: Operand::Mem(mem),
                        });
                        self.emit(X86Instr::Pop {
                            dst: Operand::Mem(through),
                        });
                    }
                    value => self.mov(value, through),
                }
            }
        }

        Ok(())
    }

    // ========================================================================
    // Operands and residency
    // ========================================================================

    /// Memory home of a variable
    fn memory(&self, var: &Variable) -> Result<MemOperand> {
        if var.is_global() {
            return Ok(MemOperand::Static(var.to_string()));
        }

        let frame = self
            .frames
            .last()
            .ok_or_else(|| CompileError::unresolved(var, "no enclosing function frame"))?;
        frame.offset(var).map(MemOperand::Frame).ok_or_else(|| {
            CompileError::unresolved(var, format!("no slot in the frame of `{}`", frame.function))
        })
    }

    /// Register colored for `var` in this block, `None` when it stays in memory
    fn register(&self, var: &Variable) -> Result<Option<X86Reg>> {
        if !self.coloring.contains(var) {
            return Err(CompileError::unresolved(var, "not in the block coloring"));
        }
        Ok(self.coloring.register(var))
    }

    /// Store the occupant of `reg` and forget it
    fn write_back(&mut self, reg: X86Reg) -> Result<()> {
        if let Some(var) = self.residency.evict(reg) {
            let mem = self.memory(&var)?;
            self.mov(reg, mem);
        }
        Ok(())
    }

    /// Store every occupant; register contents are left as they are
    fn spill_all(&mut self) -> Result<()> {
        for (reg, var) in self.residency.drain() {
            let mem = self.memory(&var)?;
            self.mov(reg, mem);
        }
        Ok(())
    }

    /// Make `var` readable: its register once loaded, or its memory home
    fn ensure(&mut self, var: &Variable) -> Result<Operand> {
        let Some(reg) = self.register(var)? else {
            return Ok(Operand::Mem(self.memory(var)?));
        };

        if !self.residency.holds(reg, var) {
            self.write_back(reg)?;
            let mem = self.memory(var)?;
            self.mov(mem, reg);
            self.residency.set(reg, var.clone());
        }
        Ok(Operand::Reg(reg))
    }

    /// Claim `var`'s register for a value about to be written
    fn define(&mut self, var: &Variable) -> Result<Option<X86Reg>> {
        let Some(reg) = self.register(var)? else {
            return Ok(None);
        };

        if !self.residency.holds(reg, var) {
            self.write_back(reg)?;
            self.residency.set(reg, var.clone());
        }
        Ok(Some(reg))
    }

    fn operand(&mut self, value: &Value) -> Result<Operand> {
        match value {
            Value::Lit(v) => Ok(Operand::Imm(*v)),
            Value::Var(var) => self.ensure(var),
        }
    }

    /// A value read straight from memory, valid after `spill_all`
    fn in_memory(&self, value: &Value) -> Result<Operand> {
        match value {
            Value::Lit(v) => Ok(Operand::Imm(*v)),
            Value::Var(var) => Ok(Operand::Mem(self.memory(var)?)),
        }
    }

    /// Move a result computed in `work` to where `result` lives
    fn deliver(&mut self, work: X86Reg, target: Option<X86Reg>, result: &Variable) -> Result<()> {
        match target {
            Some(reg) if reg == work => {}
            Some(reg) => self.mov(work, reg),
            None => {
                let mem = self.memory(result)?;
                self.mov(work, mem);
            }
        }
        Ok(())
    }

    // ========================================================================
    // Operand-class templates
    // ========================================================================

    fn lower_copy(&mut self, dst: &Variable, src: &Value) -> Result<()> {
        let src = self.operand(src)?;

        match self.define(dst)? {
            Some(reg) => {
                if !src.is_reg(reg) {
                    self.mov(src, reg);
                }
            }
            None => {
                let mem = self.memory(dst)?;
                if src.as_reg().is_some() || src.fits_imm32() {
                    self.mov(src, mem);
                } else {
                    self.mov(src, X86Reg::SCRATCH);
                    self.mov(X86Reg::SCRATCH, mem);
                }
            }
        }
        Ok(())
    }

    fn lower_unary(&mut self, result: &Variable, op: UnaryOp, operand: &Value) -> Result<()> {
        let src = self.operand(operand)?;
        let target = self.define(result)?;
        let work = target.unwrap_or(X86Reg::SCRATCH);

        match op {
            UnaryOp::LogicalNot => {
                match src {
                    Operand::Reg(reg) => self.emit(X86Instr::Test {
                        src: reg.into(),
                        dst: reg.into(),
                    }),
                    Operand::Mem(mem) => self.emit(X86Instr::Cmp {
                        src: Operand::Imm(0),
                        dst: mem.into(),
                    }),
                    imm @ Operand::Imm(_) => {
                        self.mov(imm, work);
                        self.emit(X86Instr::Test {
                            src: work.into(),
                            dst: work.into(),
                        });
                    }
                }
                self.emit(X86Instr::Set {
                    cond: Condition::E,
                    dst: work,
                });
                self.emit(X86Instr::Movzbq {
                    src: work,
                    dst: work,
                });
            }
            UnaryOp::Negate | UnaryOp::BitNot | UnaryOp::Cast => {
                if !src.is_reg(work) {
                    self.mov(src, work);
                }
                match op {
                    UnaryOp::Negate => self.emit(X86Instr::Neg { dst: work.into() }),
                    UnaryOp::BitNot => self.emit(X86Instr::Not { dst: work.into() }),
                    _ => {}
                }
            }
        }

        self.deliver(work, target, result)
    }

    /// add, sub, imul, and, or, xor
    fn lower_arith(
        &mut self,
        result: &Variable,
        op: BinaryOp,
        left: &Value,
        right: &Value,
    ) -> Result<()> {
        let alu = match op {
            BinaryOp::Add => AluOp::Add,
            BinaryOp::Sub => AluOp::Sub,
            BinaryOp::Mul => AluOp::Imul,
            BinaryOp::And => AluOp::And,
            BinaryOp::Or => AluOp::Or,
            BinaryOp::Xor => AluOp::Xor,
            other => {
                return Err(CompileError::unresolved(
                    result,
                    format!("`{}` is not an arithmetic operator", other),
                ));
            }
        };

        let left = self.operand(left)?;
        let right = self.operand(right)?;
        let target = self.define(result)?;

        // Writing the result register first would clobber a right operand
        // that shares it
        let work = match target {
            Some(reg) if !right.is_reg(reg) => reg,
            _ => X86Reg::SCRATCH,
        };

        if !left.is_reg(work) {
            self.mov(left, work);
        }
        self.emit(X86Instr::alu(alu, right, work));
        self.deliver(work, target, result)
    }

    fn lower_divide(
        &mut self,
        result: &Variable,
        op: BinaryOp,
        left: &Value,
        right: &Value,
    ) -> Result<()> {
        let left = self.operand(left)?;
        let right = self.operand(right)?;

        self.write_back(X86Reg::Rax)?;
        self.write_back(X86Reg::Rdx)?;

        self.mov(right, X86Reg::SCRATCH);
        if !left.is_reg(X86Reg::Rax) {
            self.mov(left, X86Reg::Rax);
        }
        self.emit(X86Instr::Cqto);
        self.emit(X86Instr::Idiv {
            src: X86Reg::SCRATCH.into(),
        });

        let source = if op == BinaryOp::Mod {
            X86Reg::Rdx
        } else {
            X86Reg::Rax
        };
        let target = self.define(result)?;
        self.deliver(source, target, result)
    }

    fn lower_compare(
        &mut self,
        result: &Variable,
        op: BinaryOp,
        left: &Value,
        right: &Value,
    ) -> Result<()> {
        let mut cond = match op {
            BinaryOp::Lt => Condition::L,
            BinaryOp::Gt => Condition::G,
            BinaryOp::Le => Condition::Le,
            BinaryOp::Ge => Condition::Ge,
            BinaryOp::Eq => Condition::E,
            _ => Condition::Ne,
        };

        let left = self.operand(left)?;
        let right = self.operand(right)?;
        let target = self.define(result)?;
        let work = target.unwrap_or(X86Reg::SCRATCH);

        match (left, right) {
            (left @ Operand::Reg(_), right) => self.emit(X86Instr::Cmp {
                src: right,
                dst: left,
            }),
            (left, right @ Operand::Reg(_)) => {
                self.emit(X86Instr::Cmp {
                    src: left,
                    dst: right,
                });
                cond = cond.mirror();
            }
            (left, right) => {
                self.mov(left, X86Reg::SCRATCH);
                self.emit(X86Instr::Cmp {
                    src: right,
                    dst: X86Reg::SCRATCH.into(),
                });
            }
        }

        self.emit(X86Instr::Set { cond, dst: work });
        self.emit(X86Instr::Movzbq {
            src: work,
            dst: work,
        });
        self.deliver(work, target, result)
    }

    fn lower_cond_jump(&mut self, cond: &Value, target: &Label) -> Result<()> {
        let var = match cond {
            Value::Lit(v) => {
                self.spill_all()?;
                if *v != 0 {
                    self.emit(X86Instr::Jmp {
                        target: target.asm_name(),
                    });
                }
                return Ok(());
            }
            Value::Var(var) => var,
        };

        let tested = self.ensure(var)?;
        self.spill_all()?;
        match tested {
            Operand::Reg(reg) => self.emit(X86Instr::Test {
                src: reg.into(),
                dst: reg.into(),
            }),
            other => self.emit(X86Instr::Cmp {
                src: Operand::Imm(0),
                dst: other,
            }),
        }
        self.emit(X86Instr::Jcc {
            cond: Condition::Ne,
            target: target.asm_name(),
        });
        Ok(())
    }

    // ========================================================================
    // Calls and frames
    // ========================================================================

    fn lower_call(&mut self, callee: &str, args: &[Value], result: Option<&Variable>) -> Result<()> {
        self.spill_all()?;

        let split = args.len().min(X86Reg::ARG_REGS.len());
        let (in_registers, on_stack) = args.split_at(split);
        let pad = on_stack.len() % 2;

        if pad == 1 {
            self.emit(X86Instr::alu(AluOp::Sub, Operand::Imm(8), X86Reg::STACK_PTR));
        }

        for arg in on_stack.iter().rev() {
            let src = self.in_memory(arg)?;
            if let Operand::Imm(_) = src
                && !src.fits_imm32()
            {
                self.mov(src, X86Reg::SCRATCH);
                self.emit(X86Instr::Push {
                    src: X86Reg::SCRATCH.into(),
                });
            } else {
                self.emit(X86Instr::Push { src });
            }
        }

        for (arg, &reg) in in_registers.iter().zip(X86Reg::ARG_REGS) {
            let src = self.in_memory(arg)?;
            self.mov(src, reg);
        }

        self.emit(X86Instr::Call {
            target: callee.to_string(),
        });

        let cleanup = 8 * (on_stack.len() + pad) as i64;
        if cleanup > 0 {
            self.emit(X86Instr::alu(AluOp::Add, Operand::Imm(cleanup), X86Reg::STACK_PTR));
        }

        if let Some(result) = result {
            let target = self.define(result)?;
            self.deliver(X86Reg::RETURN_REG, target, result)?;
        }
        Ok(())
    }

    /// Local variables of the function whose label sits at `entry`
    fn function_locals(&self, entry: usize) -> Vec<Variable> {
        let mut seen = HashSet::new();
        let mut locals = Vec::new();

        for instr in &self.instrs[entry + 1..] {
            if matches!(instr.label, Some(Label::Function(_))) {
                break;
            }
            for var in instr.mentioned_variables() {
                if var.storage == StorageClass::Local && seen.insert(var) {
                    locals.push(var.clone());
                }
            }
        }

        locals
    }

    /// Emit function prologue
    fn emit_prologue(&mut self, name: &str, entry: usize) -> Result<()> {
        let info = self
            .functions
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| CompileError::unresolved(name, "function table"))?;
        let frame = Frame::build(name, &info.params, self.function_locals(entry));

        debug!(
            function = name,
            slots = frame.allocated_slots(),
            bytes = frame.allocated_bytes(),
            "frame laid out"
        );

        self.emit(X86Instr::Push {
            src: X86Reg::BASE_PTR.into(),
        });
        self.mov(X86Reg::STACK_PTR, X86Reg::BASE_PTR);
        for &reg in X86Reg::SAVED_IN_PROLOGUE {
            self.emit(X86Instr::Push { src: reg.into() });
        }
        self.emit(X86Instr::alu(
            AluOp::Sub,
            Operand::Imm(frame.allocated_bytes()),
            X86Reg::STACK_PTR,
        ));

        let incoming: Vec<(X86Reg, MemOperand)> = frame
            .register_args()
            .filter_map(|(reg, var)| frame.offset(var).map(|off| (reg, MemOperand::Frame(off))))
            .collect();
        for (reg, slot) in incoming {
            self.mov(reg, slot);
        }

        self.frames.push(frame);
        Ok(())
    }

    /// Emit function epilogue
    fn lower_return(&mut self, value: Option<&Value>, is_last: bool) -> Result<()> {
        let value = value.map(|v| self.operand(v)).transpose()?;
        self.spill_all()?;

        if let Some(value) = value
            && !value.is_reg(X86Reg::RETURN_REG)
        {
            self.mov(value, X86Reg::RETURN_REG);
        }

        let bytes = self
            .frames
            .last()
            .map(Frame::allocated_bytes)
            .ok_or_else(|| CompileError::unresolved("return", "no enclosing function frame"))?;
        self.emit(X86Instr::alu(AluOp::Add, Operand::Imm(bytes), X86Reg::STACK_PTR));

        // Restore callee-saved registers (in reverse order)
        for &reg in X86Reg::SAVED_IN_PROLOGUE.iter().rev() {
            self.emit(X86Instr::Pop { dst: reg.into() });
        }
        self.emit(X86Instr::Pop {
            dst: X86Reg::BASE_PTR.into(),
        });
        self.emit(X86Instr::Ret);

        if is_last {
            self.frames.pop();
        }
        Ok(())
    }
}
