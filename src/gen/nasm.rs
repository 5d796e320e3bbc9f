// SPDX-License-Identifier: GPL-2.0-only

//
// NASM output: operand tables, data sections and program assembly
//

use super::block::{BlockGen,Line};
use super::frame;
use crate::ast::{Expr,NumberLiteral,Program,Stmt,Type,VariableDeclaration};
use crate::error::GenError;
use crate::Flags;
use std::collections::HashMap;
use std::fmt::{Display,Formatter};
use std::rc::Rc;
use tracing::debug;

//
// Operation widths supported by x86
//

#[derive(Clone,Copy,Debug,PartialEq,Eq,PartialOrd,Ord)]
pub enum Width {
    Byte    = 1,
    Word    = 2,
    DWord   = 4,
    QWord   = 8,
}

impl Width {
    pub fn from_size(size: usize) -> Option<Width> {
        match size {
            1 => Some(Width::Byte),
            2 => Some(Width::Word),
            4 => Some(Width::DWord),
            8 => Some(Width::QWord),
            _ => None,
        }
    }
}

pub fn loc_str(width: Width) -> &'static str {
    match width {
        Width::Byte => "BYTE",
        Width::Word => "WORD",
        Width::DWord => "DWORD",
        Width::QWord => "QWORD",
    }
}

fn data_str(width: Width) -> &'static str {
    match width {
        Width::Byte => "db",
        Width::Word => "dw",
        Width::DWord => "dd",
        Width::QWord => "dq",
    }
}

fn res_str(width: Width) -> &'static str {
    match width {
        Width::Byte => "resb",
        Width::Word => "resw",
        Width::DWord => "resd",
        Width::QWord => "resq",
    }
}

#[derive(Clone,Copy,Debug,PartialEq,Eq,Hash)]
pub enum Reg {
    Rax = 0,
    Rcx = 1,
    Rdx = 2,
    Rsi = 3,
    Rdi = 4,
    R8  = 5,
    R9  = 6,
}

//
// Register parameter order
//

pub const PARAMS: [Reg; 6] = [ Reg::Rdi, Reg::Rsi, Reg::Rdx, Reg::Rcx, Reg::R8, Reg::R9 ];

pub fn reg_str(width: Width, reg: Reg) -> &'static str {
    match width {
        Width::Byte
            => ["al", "cl", "dl", "sil", "dil", "r8b", "r9b"][reg as usize],
        Width::Word
            => ["ax", "cx", "dx", "si", "di", "r8w", "r9w"][reg as usize],
        Width::DWord
            => ["eax", "ecx", "edx", "esi", "edi", "r8d", "r9d"][reg as usize],
        Width::QWord
            => ["rax", "rcx", "rdx", "rsi", "rdi", "r8", "r9"][reg as usize],
    }
}

//
// Immediate values
//

/// Integer immediate of a literal, wrapped to the destination type
pub fn immediate(lit: &NumberLiteral, ty: &Type) -> Result<i64, GenError> {
    let val = lit.as_i64()?;
    Ok(match ty {
        Type::Bool => (val != 0) as i64,
        ty => match ty.size() {
            1 => val as i8 as i64,
            2 => val as i16 as i64,
            4 => val as i32 as i64,
            _ => val,
        },
    })
}

/// Floating point spelling NASM accepts
pub fn real(lit: &NumberLiteral) -> Result<String, GenError> {
    let val = if lit.ty.is_floating() {
        lit.value.parse::<f64>().ok()
    } else {
        lit.value.parse::<i64>().ok().map(|v| v as f64)
    };
    val.map(|v| format!("{:?}", v))
        .ok_or_else(|| GenError::NotReachable(format!("malformed literal '{}'", lit.value)))
}

//
// String literal pool
//

#[derive(Debug,Default)]
pub struct Strings {
    count: usize,
    data: Vec<String>,
}

impl Strings {
    pub fn intern(&mut self, value: &str) -> Rc<str> {
        let name = format!("__str{}", self.count);
        self.count += 1;
        let mut line = format!("{}: db ", name);
        for byte in value.bytes() {
            line.push_str(&format!("0x{:02x}, ", byte));
        }
        line.push('0');
        self.data.push(line);
        name.into()
    }
}

//
// Generated program
//

#[derive(Clone,Debug,Default,PartialEq)]
pub struct Assembly {
    pub bss: Vec<String>,
    pub data: Vec<String>,
    pub functions: Vec<(Rc<str>, Vec<Line>)>,
}

const START: [&str; 5] = [
    "xor rbp, rbp",
    "call main",
    "mov edi, eax",
    "mov eax, 60",
    "syscall",
];

fn push_line(out: &mut String, indent: &str, text: &str) {
    out.push_str(indent);
    out.push_str(text);
    out.push('\n');
}

impl Assembly {
    pub fn is_empty(&self) -> bool {
        self.bss.is_empty() && self.data.is_empty() && self.functions.is_empty()
    }

    /// Render as NASM source, formatted output indents instructions
    pub fn render(&self, format: bool) -> String {
        let mut out = String::new();
        if self.is_empty() {
            return out;
        }
        let indent = if format { "    " } else { "" };

        push_line(&mut out, "", "global _start");
        push_line(&mut out, "", "section .bss");
        for line in &self.bss {
            push_line(&mut out, "", line);
        }
        push_line(&mut out, "", "section .data");
        for line in &self.data {
            push_line(&mut out, "", line);
        }
        push_line(&mut out, "", "section .text");
        push_line(&mut out, "", "_start:");
        for insn in START {
            push_line(&mut out, indent, insn);
        }

        for (name, lines) in &self.functions {
            out.push('\n');
            push_line(&mut out, "", &format!("{}:", name));
            for line in lines {
                match line {
                    Line::Label(label) => push_line(&mut out, "", &format!("{}:", label)),
                    Line::Jump(op, label) => push_line(&mut out, indent, &format!("{} {}", op, label)),
                    Line::Insn(text) => push_line(&mut out, indent, text),
                    Line::Epilogue => {
                        push_line(&mut out, indent, "leave");
                        push_line(&mut out, indent, "ret");
                    },
                }
            }
        }
        out
    }
}

impl Display for Assembly {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> std::fmt::Result {
        write!(fmt, "{}", self.render(true))
    }
}

//
// Globals
//

fn gen_global(program: &Program, var: &VariableDeclaration, asm: &mut Assembly, strings: &mut Strings)
        -> Result<(), GenError> {
    let (size, _) = frame::size_align(program, &var.ty)?;
    let width = match (&var.ty, Width::from_size(size)) {
        (Type::Named(_), _) | (_, None) => {
            if var.init.is_some() {
                return Err(GenError::NotImplemented("aggregate initializers".into()));
            }
            asm.bss.push(format!("{}: resb {}", var.name, size));
            return Ok(());
        },
        (_, Some(width)) => width,
    };

    match &var.init {
        None => asm.bss.push(format!("{}: {} 1", var.name, res_str(width))),
        Some(Expr::Str(lit)) if var.ty == Type::Str => {
            let label = strings.intern(&lit.value);
            asm.data.push(format!("{}: dq {}", var.name, label));
        },
        Some(init) if init.is_constant() => {
            let lit = init.evaluate()?;
            let value = if var.ty.is_floating() {
                real(&lit)?
            } else {
                immediate(&lit, &var.ty)?.to_string()
            };
            asm.data.push(format!("{}: {} {}", var.name, data_str(width), value));
        },
        Some(_) => return Err(GenError::NotImplemented("non-constant global initializer".into())),
    }
    Ok(())
}

/// Generate the whole program, an empty program produces no output
pub fn generate(program: &Program, flags: &Flags) -> Result<Assembly, GenError> {
    let mut asm = Assembly::default();
    if program.body.is_empty() {
        debug!("empty program, nothing to generate");
        return Ok(asm);
    }
    if program.find_function("main").is_none() {
        return Err(GenError::NoEntryPoint);
    }

    let mut strings = Strings::default();
    let mut globals = HashMap::new();
    for var in program.globals() {
        gen_global(program, var, &mut asm, &mut strings)?;
        globals.insert(var.name.clone(), var.ty.clone());
    }

    for stmt in &program.body {
        match stmt {
            Stmt::Function(decl) => {
                let lines = BlockGen::new(program, &globals, &mut strings, flags).function(decl)?;
                debug!(name = %decl.name, lines = lines.len(), "generated function");
                asm.functions.push((decl.name.clone(), lines));
            },
            Stmt::Struct(decl) => {
                for method in &decl.methods {
                    debug!(aggregate = %decl.name, method = %method.name, "skipping method");
                }
            },
            _ => (),
        }
    }

    asm.data.append(&mut strings.data);
    Ok(asm)
}
