// SPDX-License-Identifier: GPL-2.0-only

//
// Function body code generation
//

use super::frame::{self,Frame,Label,Slot};
use super::nasm::{self,Reg,Strings,Width,loc_str,reg_str,PARAMS};
use crate::ast::*;
use crate::error::GenError;
use crate::Flags;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::trace;

/// One line of function output, labels stay structured until rendering
#[derive(Clone,Debug,PartialEq)]
pub enum Line {
    Label(Label),
    Jump(&'static str, Label),
    Insn(String),
    // Resolved once the frame size is known
    Epilogue,
}

fn not_implemented(what: impl Into<String>) -> GenError {
    GenError::NotImplemented(what.into())
}

// Every path through the statement ends in a return
fn always_returns(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Return(_) => true,
        Stmt::Block(block) => block.body.iter().any(always_returns),
        Stmt::If(stmt) => if_returns(stmt),
        _ => false,
    }
}

fn if_returns(stmt: &IfStatement) -> bool {
    let consequent = stmt.consequent.body.iter().any(always_returns);
    let alternate = match &stmt.alternate {
        Some(Alternate::Block(block)) => block.body.iter().any(always_returns),
        Some(Alternate::If(inner)) => if_returns(inner),
        None => false,
    };
    if stmt.condition.is_constant() {
        return match stmt.condition.evaluate().and_then(|lit| lit.is_zero()) {
            Ok(false) => consequent,
            Ok(true) => alternate,
            Err(_) => false,
        };
    }
    consequent && alternate
}

fn width(ty: &Type) -> Result<Width, GenError> {
    Width::from_size(ty.size())
        .ok_or_else(|| not_implemented(format!("values of type '{}'", ty)))
}

//
// Memory operands
//

#[derive(Clone,Debug,PartialEq)]
enum Place {
    // [rbp-offset]
    Local(usize),
    // [rel name+offset]
    Global(Rc<str>, usize),
}

impl Place {
    fn address(&self) -> String {
        match self {
            Place::Local(offset) => format!("[rbp-{}]", offset),
            Place::Global(name, 0) => format!("[rel {}]", name),
            Place::Global(name, offset) => format!("[rel {}+{}]", name, offset),
        }
    }

    fn operand(&self, width: Width) -> String {
        format!("{} {}", loc_str(width), self.address())
    }

    fn member(self, offset: usize) -> Place {
        match self {
            Place::Local(base) => Place::Local(base - offset),
            Place::Global(name, base) => Place::Global(name, base + offset),
        }
    }
}

// Right hand operand of an arithmetic instruction
enum Operand {
    Imm(i64),
    Mem(String),
    Reg(&'static str),
}

impl Operand {
    fn text(&self) -> String {
        match self {
            Operand::Imm(val) => val.to_string(),
            Operand::Mem(mem) => mem.clone(),
            Operand::Reg(reg) => reg.to_string(),
        }
    }
}

// In-place increment or decrement, a bool stays 0 or 1
fn step(op: UnaryOp, place: &Place, ty: &Type) -> Result<String, GenError> {
    if ty.is_floating() {
        return Err(not_implemented("floating point increments"));
    }
    let mem = place.operand(width(ty)?);
    Ok(match (op, ty) {
        (UnaryOp::Incr, Type::Bool) => format!("mov {}, 1", mem),
        (UnaryOp::Decr, Type::Bool) => format!("xor {}, 1", mem),
        (UnaryOp::Incr, _) => format!("add {}, 1", mem),
        _ => format!("sub {}, 1", mem),
    })
}

fn setcc(op: BinaryOp) -> Option<&'static str> {
    match op {
        BinaryOp::Lt => Some("setl"),
        BinaryOp::Gt => Some("setg"),
        BinaryOp::Le => Some("setle"),
        BinaryOp::Ge => Some("setge"),
        BinaryOp::Eq => Some("sete"),
        BinaryOp::Ne => Some("setne"),
        _ => None,
    }
}

/// Alias runs of adjacent labels to the last one and drop jumps to the next line
pub fn merge_labels(lines: Vec<Line>) -> Vec<Line> {
    let mut alias = HashMap::new();
    let mut run: Vec<Label> = Vec::new();
    for line in &lines {
        if let Line::Label(label) = line {
            for prev in run.drain(..) {
                alias.insert(prev, *label);
            }
            run.push(*label);
        } else {
            run.clear();
        }
    }
    // Chains resolve to their final label
    let resolve = |mut label: Label| {
        while let Some(next) = alias.get(&label) {
            label = *next;
        }
        label
    };

    let mut merged: Vec<Line> = Vec::with_capacity(lines.len());
    for line in lines {
        match line {
            Line::Label(label) if alias.contains_key(&label) => (),
            Line::Jump(op, label) => merged.push(Line::Jump(op, resolve(label))),
            line => merged.push(line),
        }
    }

    let mut result = Vec::with_capacity(merged.len());
    let mut iter = merged.into_iter().peekable();
    while let Some(line) = iter.next() {
        if let Line::Jump(op, target) = &line {
            if *op == "jmp" && iter.peek() == Some(&Line::Label(*target)) {
                continue;
            }
        }
        result.push(line);
    }
    result
}

//
// Code generator for one function, nested blocks share its frame
//

pub struct BlockGen<'a> {
    program: &'a Program,
    globals: &'a HashMap<Rc<str>, Type>,
    strings: &'a mut Strings,
    flags: &'a Flags,
    frame: Frame,
    lines: Vec<Line>,
    return_type: Type,
}

impl<'a> BlockGen<'a> {
    pub fn new(program: &'a Program,
               globals: &'a HashMap<Rc<str>, Type>,
               strings: &'a mut Strings,
               flags: &'a Flags) -> BlockGen<'a> {
        BlockGen {
            program: program,
            globals: globals,
            strings: strings,
            flags: flags,
            frame: Frame::new(),
            lines: Vec::new(),
            return_type: Type::Void,
        }
    }

    fn insn(&mut self, text: impl Into<String>) {
        self.lines.push(Line::Insn(text.into()));
    }

    fn label(&mut self, label: Label) {
        self.lines.push(Line::Label(label));
    }

    fn jump(&mut self, op: &'static str, label: Label) {
        self.lines.push(Line::Jump(op, label));
    }

    fn push_rax(&mut self) {
        self.insn("push rax");
        self.frame.push();
    }

    fn pop_rax(&mut self) {
        self.insn("pop rax");
        self.frame.pop();
    }

    //
    // Name resolution
    //

    fn variable(&self, name: &Rc<str>) -> Result<(Place, Type), GenError> {
        if let Some(slot) = self.frame.lookup(name) {
            return Ok((Place::Local(slot.offset), slot.ty.clone()));
        }
        if let Some(ty) = self.globals.get(name) {
            return Ok((Place::Global(name.clone(), 0), ty.clone()));
        }
        Err(GenError::Undeclared(name.clone()))
    }

    fn member(&self, mem: &MemberExpression) -> Result<(Place, Type), GenError> {
        match mem.accessor {
            Accessor::Dot => (),
            Accessor::Arrow => return Err(not_implemented("member access through a pointer")),
            Accessor::Scope => return Err(not_implemented("static member access")),
        }
        let (place, ty) = self.variable(&mem.object.name)?;
        let aggregate = match ty {
            Type::Named(name) => name,
            ty => return Err(GenError::NotReachable(format!("member access on '{}'", ty))),
        };
        let layout = frame::layout(self.program, &aggregate)?;
        let member = layout.member(&mem.member.name)
            .ok_or_else(|| GenError::NotReachable(format!("no member '{}' in '{}'", mem.member.name, aggregate)))?;
        Ok((place.member(member.offset), member.ty.clone()))
    }

    fn place(&self, expr: &Expr) -> Result<Option<(Place, Type)>, GenError> {
        match expr {
            Expr::Ident(ident) => self.variable(&ident.name).map(Some),
            Expr::Member(mem) => self.member(mem).map(Some),
            _ => Ok(None),
        }
    }

    fn target(&self, expr: &Expr) -> Result<(Place, Type), GenError> {
        self.place(expr)?
            .ok_or_else(|| GenError::NotReachable("assignment to a non-lvalue".into()))
    }

    fn type_of(&self, expr: &Expr) -> Result<Type, GenError> {
        if expr.is_constant() {
            return Ok(expr.evaluate()?.ty);
        }
        match expr {
            Expr::Number(lit) => Ok(lit.ty.clone()),
            Expr::Str(_) => Ok(Type::Str),
            Expr::Ident(_) | Expr::Member(_) => Ok(self.target(expr)?.1),
            Expr::Binary(bin) if bin.op.is_assignment() => self.type_of(&bin.lhs),
            Expr::Binary(bin) if bin.op.is_comparison() => Ok(Type::Bool),
            Expr::Binary(bin) => Ok(Type::promote(&self.type_of(&bin.lhs)?, &self.type_of(&bin.rhs)?)),
            Expr::Unary(un) => match un.op {
                UnaryOp::Not => Ok(Type::Bool),
                UnaryOp::Plus | UnaryOp::Minus => Ok(Type::promote(&self.type_of(&un.operand)?, &Type::Int)),
                UnaryOp::Incr | UnaryOp::Decr => self.type_of(&un.operand),
            },
        }
    }

    //
    // Value materialization
    //

    /// Load a value from memory into reg, extending or testing it for the destination type
    fn load_into(&mut self, reg: Reg, place: &Place, from: &Type, to: &Type) -> Result<(), GenError> {
        let (src, dst) = (width(from)?, width(to)?);
        if from.is_floating() || to.is_floating() {
            if from != to {
                return Err(not_implemented(format!("conversion from '{}' to '{}'", from, to)));
            }
            self.insn(format!("mov {}, {}", reg_str(dst, reg), place.operand(dst)));
            return Ok(());
        }

        if *to == Type::Bool && *from != Type::Bool {
            self.insn(format!("cmp {}, 0", place.operand(src)));
            self.insn(format!("setne {}", reg_str(Width::Byte, reg)));
        } else if dst <= src {
            // Narrowing reads the low bytes
            self.insn(format!("mov {}, {}", reg_str(dst, reg), place.operand(dst)));
        } else if (dst as usize) == (src as usize) + 1 {
            // Growing by one byte is a plain mov into a cleared register
            self.insn(format!("xor {}, {}", reg_str(Width::DWord, reg), reg_str(Width::DWord, reg)));
            self.insn(format!("mov {}, {}", reg_str(src, reg), place.operand(src)));
        } else if src == Width::DWord && reg == Reg::Rax && from.is_signed() {
            self.insn(format!("mov eax, {}", place.operand(src)));
            self.insn("cdqe");
        } else if src == Width::DWord && from.is_signed() {
            // cdqe only extends rax
            self.insn(format!("movsxd {}, {}", reg_str(dst, reg), place.operand(src)));
        } else {
            let op = if from.is_signed() { "movsx" } else { "movzx" };
            self.insn(format!("{} {}, {}", op, reg_str(dst, reg), place.operand(src)));
        }
        Ok(())
    }

    /// Convert the value in rax between types
    fn convert(&mut self, from: &Type, to: &Type) -> Result<(), GenError> {
        if from == to {
            return Ok(());
        }
        if from.is_floating() || to.is_floating() {
            return Err(not_implemented(format!("conversion from '{}' to '{}'", from, to)));
        }
        let (src, dst) = (width(from)?, width(to)?);
        if *to == Type::Bool {
            self.insn(format!("cmp {}, 0", reg_str(src, Reg::Rax)));
            self.insn("setne al");
        } else if dst <= src {
            // Narrower registers alias the low bytes
        } else if (dst as usize) == (src as usize) + 1 {
            // One byte of growth zero fills like the load path
            self.insn("and eax, 0xff");
        } else if src == Width::DWord && dst == Width::QWord && from.is_signed() {
            self.insn("cdqe");
        } else {
            let op = if from.is_signed() { "movsx" } else { "movzx" };
            self.insn(format!("{} {}, {}", op, reg_str(dst, Reg::Rax), reg_str(src, Reg::Rax)));
        }
        Ok(())
    }

    fn store_rax(&mut self, place: &Place, from: &Type, to: &Type) -> Result<(), GenError> {
        self.convert(from, to)?;
        let dst = width(to)?;
        self.insn(format!("mov {}, {}", place.operand(dst), reg_str(dst, Reg::Rax)));
        Ok(())
    }

    fn store_literal(&mut self, place: &Place, lit: &NumberLiteral, to: &Type) -> Result<(), GenError> {
        match to {
            Type::Float => {
                let real = nasm::real(lit)?;
                self.insn(format!("mov {}, __float32__({})", place.operand(Width::DWord), real));
            },
            Type::Double => {
                let real = nasm::real(lit)?;
                self.insn(format!("mov rax, __float64__({})", real));
                self.insn(format!("mov {}, rax", place.operand(Width::QWord)));
            },
            Type::Str | Type::Named(_) | Type::Void => {
                return Err(not_implemented(format!("numeric value stored as '{}'", to)));
            },
            _ => {
                if lit.ty.is_floating() {
                    return Err(not_implemented(format!("conversion from '{}' to '{}'", lit.ty, to)));
                }
                let dst = width(to)?;
                let val = nasm::immediate(lit, to)?;
                if dst == Width::QWord && i32::try_from(val).is_err() {
                    self.insn(format!("mov rax, {}", val));
                    self.insn(format!("mov {}, rax", place.operand(dst)));
                } else {
                    self.insn(format!("mov {}, {}", place.operand(dst), val));
                }
            },
        }
        Ok(())
    }

    /// Store the value of an expression into memory of type `to`
    fn store_value(&mut self, place: &Place, to: &Type, expr: &Expr) -> Result<(), GenError> {
        if expr.is_constant() {
            let lit = expr.evaluate()?;
            return self.store_literal(place, &lit, to);
        }
        if let Some((src, from)) = self.place(expr)? {
            self.load_into(Reg::Rax, &src, &from, to)?;
            let dst = width(to)?;
            self.insn(format!("mov {}, {}", place.operand(dst), reg_str(dst, Reg::Rax)));
            return Ok(());
        }
        let from = self.eval(expr)?;
        self.store_rax(place, &from, to)
    }

    //
    // Expressions, results are left in rax
    //

    fn eval_to(&mut self, expr: &Expr, ty: &Type) -> Result<(), GenError> {
        if !expr.is_constant() {
            if let Some((place, from)) = self.place(expr)? {
                return self.load_into(Reg::Rax, &place, &from, ty);
            }
        }
        let from = self.eval(expr)?;
        self.convert(&from, ty)
    }

    // Right hand side of an arithmetic instruction on type ty
    fn operand(&mut self, expr: &Expr, ty: &Type) -> Result<Operand, GenError> {
        let w = width(ty)?;
        if expr.is_constant() {
            let lit = expr.evaluate()?;
            if lit.ty.is_floating() {
                return Err(not_implemented("floating point arithmetic"));
            }
            let val = nasm::immediate(&lit, ty)?;
            if i32::try_from(val).is_ok() {
                return Ok(Operand::Imm(val));
            }
            self.insn(format!("mov rcx, {}", val));
            return Ok(Operand::Reg(reg_str(w, Reg::Rcx)));
        }
        if let Some((place, from)) = self.place(expr)? {
            if from.is_floating() {
                return Err(not_implemented("floating point arithmetic"));
            }
            if width(&from)? == w {
                return Ok(Operand::Mem(place.operand(w)));
            }
            self.load_into(Reg::Rcx, &place, &from, ty)?;
            return Ok(Operand::Reg(reg_str(w, Reg::Rcx)));
        }
        self.push_rax();
        self.eval_to(expr, ty)?;
        self.insn(format!("mov {}, {}", reg_str(w, Reg::Rcx), reg_str(w, Reg::Rax)));
        self.pop_rax();
        Ok(Operand::Reg(reg_str(w, Reg::Rcx)))
    }

    fn eval_arith(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Result<Type, GenError> {
        let (lt, rt) = (self.type_of(lhs)?, self.type_of(rhs)?);
        if lt == Type::Str || rt == Type::Str {
            return Err(not_implemented("string arithmetic"));
        }
        let ty = Type::promote(&lt, &rt);
        if ty.is_floating() {
            return Err(not_implemented("floating point arithmetic"));
        }
        let w = width(&ty)?;
        self.eval_to(lhs, &ty)?;
        let mut operand = self.operand(rhs, &ty)?;
        let acc = reg_str(w, Reg::Rax);

        if let Some(set) = setcc(op) {
            self.insn(format!("cmp {}, {}", acc, operand.text()));
            self.insn(format!("{} al", set));
            return Ok(Type::Bool);
        }
        match op {
            BinaryOp::Add => self.insn(format!("add {}, {}", acc, operand.text())),
            BinaryOp::Sub => self.insn(format!("sub {}, {}", acc, operand.text())),
            BinaryOp::Mul => self.insn(format!("imul {}, {}", acc, operand.text())),
            BinaryOp::Div => {
                // idiv takes no immediate
                if let Operand::Imm(val) = operand {
                    self.insn(format!("mov {}, {}", reg_str(w, Reg::Rcx), val));
                    operand = Operand::Reg(reg_str(w, Reg::Rcx));
                }
                self.insn(if w == Width::QWord { "cqo" } else { "cdq" });
                self.insn(format!("idiv {}", operand.text()));
            },
            op => return Err(GenError::NotReachable(format!("{:?} is not arithmetic", op))),
        }
        Ok(ty)
    }

    fn eval_unary(&mut self, un: &UnaryExpression) -> Result<Type, GenError> {
        match un.op {
            UnaryOp::Plus | UnaryOp::Minus => {
                let ty = Type::promote(&self.type_of(&un.operand)?, &Type::Int);
                if ty.is_floating() {
                    return Err(not_implemented("floating point arithmetic"));
                }
                self.eval_to(&un.operand, &ty)?;
                if un.op == UnaryOp::Minus {
                    self.insn(format!("neg {}", reg_str(width(&ty)?, Reg::Rax)));
                }
                Ok(ty)
            },
            UnaryOp::Not => {
                let ty = self.eval(&un.operand)?;
                self.insn(format!("cmp {}, 0", reg_str(width(&ty)?, Reg::Rax)));
                self.insn("sete al");
                Ok(Type::Bool)
            },
            UnaryOp::Incr | UnaryOp::Decr => {
                let (place, ty) = self.target(&un.operand)?;
                let w = width(&ty)?;
                let load = format!("mov {}, {}", reg_str(w, Reg::Rax), place.operand(w));
                let update = step(un.op, &place, &ty)?;
                match un.fixity {
                    Fixity::Prefix => {
                        self.insn(update);
                        self.insn(load);
                    },
                    Fixity::Postfix => {
                        self.insn(load);
                        self.insn(update);
                    },
                }
                Ok(ty)
            },
        }
    }

    fn eval(&mut self, expr: &Expr) -> Result<Type, GenError> {
        if expr.is_constant() {
            let lit = expr.evaluate()?;
            if lit.ty.is_floating() {
                return Err(not_implemented("floating point values in registers"));
            }
            let val = nasm::immediate(&lit, &lit.ty)?;
            self.insn(format!("mov {}, {}", reg_str(width(&lit.ty)?, Reg::Rax), val));
            return Ok(lit.ty);
        }
        match expr {
            Expr::Str(lit) => {
                let label = self.strings.intern(&lit.value);
                self.insn(format!("lea rax, [rel {}]", label));
                Ok(Type::Str)
            },
            Expr::Ident(_) | Expr::Member(_) => {
                let (place, ty) = self.target(expr)?;
                if ty.is_floating() {
                    return Err(not_implemented("floating point values in registers"));
                }
                self.load_into(Reg::Rax, &place, &ty, &ty)?;
                Ok(ty)
            },
            Expr::Binary(bin) if bin.op.is_assignment() => {
                let (place, ty) = self.target(&bin.lhs)?;
                self.assign(bin)?;
                self.load_into(Reg::Rax, &place, &ty, &ty)?;
                Ok(ty)
            },
            Expr::Binary(bin) => self.eval_arith(bin.op, &bin.lhs, &bin.rhs),
            Expr::Unary(un) => self.eval_unary(un),
            Expr::Number(_) => Err(GenError::NotReachable("literal is constant".into())),
        }
    }

    fn assign(&mut self, bin: &BinaryExpression) -> Result<(), GenError> {
        let (place, ty) = self.target(&bin.lhs)?;
        match bin.op.compound_base() {
            // Load-modify-store
            Some(base) => {
                let result = self.eval_arith(base, &bin.lhs, &bin.rhs)?;
                self.store_rax(&place, &result, &ty)
            },
            None => self.store_value(&place, &ty, &bin.rhs),
        }
    }

    // Evaluate for side effects only
    fn effect(&mut self, expr: &Expr) -> Result<(), GenError> {
        match expr {
            Expr::Binary(bin) if bin.op.is_assignment() => self.assign(bin),
            Expr::Unary(un) if matches!(un.op, UnaryOp::Incr | UnaryOp::Decr) => {
                let (place, ty) = self.target(&un.operand)?;
                let update = step(un.op, &place, &ty)?;
                self.insn(update);
                Ok(())
            },
            expr => self.eval(expr).map(|_| ()),
        }
    }

    // Compare a condition against zero
    fn test(&mut self, cond: &Expr) -> Result<(), GenError> {
        if let Some((place, ty)) = self.place(cond)? {
            if ty.is_floating() {
                return Err(not_implemented("floating point conditions"));
            }
            self.insn(format!("cmp {}, 0", place.operand(width(&ty)?)));
            return Ok(());
        }
        let ty = self.eval(cond)?;
        self.insn(format!("cmp {}, 0", reg_str(width(&ty)?, Reg::Rax)));
        Ok(())
    }

    //
    // Statements
    //

    fn gen_block(&mut self, block: &BlockStatement) -> Result<(), GenError> {
        self.frame.push_scope();
        let result = block.body.iter().try_for_each(|stmt| self.gen_stmt(stmt));
        self.frame.pop_scope();
        result
    }

    fn ends_in_epilogue(&self) -> bool {
        matches!(self.lines.last(), Some(Line::Epilogue))
    }

    fn gen_if(&mut self, stmt: &IfStatement, end: Option<Label>) -> Result<(), GenError> {
        // Literal conditions only generate the taken arm
        if stmt.condition.is_constant() {
            let taken = !stmt.condition.evaluate()?.is_zero()?;
            return match (&stmt.alternate, taken) {
                (_, true) => self.gen_block(&stmt.consequent),
                (Some(Alternate::Block(block)), false) => self.gen_block(block),
                (Some(Alternate::If(inner)), false) => self.gen_if(inner, end),
                (None, false) => Ok(()),
            };
        }

        // An else-if chain shares the end label of the outermost if
        let owns_end = end.is_none();
        let end = end.unwrap_or_else(|| self.frame.next_label());

        match &stmt.alternate {
            None => {
                self.test(&stmt.condition)?;
                self.jump("je", end);
                self.gen_block(&stmt.consequent)?;
            },
            Some(alternate) => {
                let other = self.frame.next_label();
                self.test(&stmt.condition)?;
                self.jump("je", other);
                self.gen_block(&stmt.consequent)?;
                if !self.ends_in_epilogue() {
                    self.jump("jmp", end);
                }
                self.label(other);
                match alternate {
                    Alternate::Block(block) => self.gen_block(block)?,
                    Alternate::If(inner) => self.gen_if(inner, Some(end))?,
                }
            },
        }

        // Nothing falls through to the end of an if where every arm returns
        if owns_end && !if_returns(stmt) {
            self.label(end);
        }
        Ok(())
    }

    // Test at the bottom, entered through a jump to the test
    fn gen_while(&mut self, stmt: &WhileStatement) -> Result<(), GenError> {
        let always = if stmt.condition.is_constant() {
            if stmt.condition.evaluate()?.is_zero()? {
                return Ok(());
            }
            true
        } else {
            false
        };

        let body = self.frame.next_label();
        let cond = self.frame.next_label();
        self.jump("jmp", cond);
        self.label(body);
        self.gen_block(&stmt.body)?;
        self.label(cond);
        if always {
            self.jump("jmp", body);
        } else {
            self.test(&stmt.condition)?;
            self.jump("jne", body);
        }
        Ok(())
    }

    fn gen_return(&mut self, stmt: &ReturnStatement) -> Result<(), GenError> {
        if let Some(value) = &stmt.value {
            let ty = self.return_type.clone();
            if ty == Type::Void {
                return Err(GenError::NotReachable("value returned from a void function".into()));
            }
            if ty.is_floating() {
                return Err(not_implemented("floating point return values"));
            }
            self.eval_to(value, &ty)?;
        }
        self.lines.push(Line::Epilogue);
        Ok(())
    }

    fn gen_variable(&mut self, decl: &VariableDeclaration) -> Result<(), GenError> {
        let (size, align) = frame::size_align(self.program, &decl.ty)?;
        let offset = self.frame.alloc(size, align);
        if let Some(init) = &decl.init {
            if let Type::Named(_) = decl.ty {
                return Err(not_implemented("aggregate initializers"));
            }
            self.store_value(&Place::Local(offset), &decl.ty, init)?;
        }
        trace!(name = %decl.name, offset, "allocated local");
        // Bound after the initializer, which still sees any shadowed name
        self.frame.bind(decl.name.clone(), Slot { offset: offset, ty: decl.ty.clone() });
        Ok(())
    }

    fn gen_stmt(&mut self, stmt: &Stmt) -> Result<(), GenError> {
        match stmt {
            Stmt::Block(block) => self.gen_block(block),
            Stmt::If(stmt) => self.gen_if(stmt, None),
            Stmt::While(stmt) => self.gen_while(stmt),
            Stmt::Return(stmt) => self.gen_return(stmt),
            Stmt::Variable(decl) => self.gen_variable(decl),
            Stmt::Expr(expr) => self.effect(expr),
            Stmt::Function(_) | Stmt::Struct(_) => {
                Err(GenError::NotReachable("nested declaration".into()))
            },
        }
    }

    //
    // Whole function
    //

    fn spill_params(&mut self, params: &[VariableDeclaration]) -> Result<(), GenError> {
        if params.len() > PARAMS.len() {
            return Err(not_implemented("more than six parameters"));
        }
        for (param, reg) in params.iter().zip(PARAMS) {
            if param.ty.is_floating() || matches!(param.ty, Type::Named(_)) {
                return Err(not_implemented(format!("parameters of type '{}'", param.ty)));
            }
            let w = width(&param.ty)?;
            let offset = self.frame.alloc(w as usize, w as usize);
            self.insn(format!("mov {}, {}", Place::Local(offset).operand(w), reg_str(w, reg)));
            self.frame.bind(param.name.clone(), Slot { offset: offset, ty: param.ty.clone() });
        }
        Ok(())
    }

    pub fn function(mut self, decl: &FunctionDeclaration) -> Result<Vec<Line>, GenError> {
        self.return_type = decl.return_type.clone();
        self.spill_params(&decl.params)?;
        for stmt in &decl.body.body {
            self.gen_stmt(stmt)?;
        }
        if !decl.body.body.iter().any(always_returns) {
            self.insn("xor eax, eax");
            self.lines.push(Line::Epilogue);
        }
        debug_assert_eq!(self.frame.sp(), 0);
        Ok(self.finalize())
    }

    fn finalize(self) -> Vec<Line> {
        let reserve = !self.frame.uses_red_zone(self.flags.mno_red_zone) && self.frame.frame_size() > 0;
        trace!(bp = self.frame.bp(), reserve, "frame layout");

        let mut out = vec![
            Line::Insn("push rbp".into()),
            Line::Insn("mov rbp, rsp".into()),
        ];
        if reserve {
            out.push(Line::Insn(format!("sub rsp, {}", self.frame.frame_size())));
        }
        for line in merge_labels(self.lines) {
            match line {
                Line::Epilogue => {
                    out.push(Line::Insn(if reserve { "leave" } else { "pop rbp" }.into()));
                    out.push(Line::Insn("ret".into()));
                },
                line => out.push(line),
            }
        }
        out
    }
}
