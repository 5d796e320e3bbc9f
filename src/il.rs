// SPDX-License-Identifier: GPL-2.0-only

//
// Typed intermediate language of basic blocks
//

use crate::ast;
use std::collections::{HashMap,HashSet};
use std::fmt::{Display,Formatter};
use std::rc::Rc;

#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub enum Ty {
    I1,
    I8,
    I16,
    I32,
    I64,
    Float,
    Double,
    Ptr,
    Void,
}

impl Ty {
    /// IL type of a primitive AST type, aggregates have none
    pub fn from_ast(ty: &ast::Type) -> Option<Ty> {
        match ty {
            ast::Type::Void   => Some(Ty::Void),
            ast::Type::Bool   => Some(Ty::I1),
            ast::Type::Char   => Some(Ty::I8),
            ast::Type::Short  => Some(Ty::I16),
            ast::Type::Int    => Some(Ty::I32),
            ast::Type::Long   => Some(Ty::I64),
            ast::Type::Float  => Some(Ty::Float),
            ast::Type::Double => Some(Ty::Double),
            ast::Type::Str    => Some(Ty::Ptr),
            ast::Type::Named(_) => None,
        }
    }

    pub fn size(self) -> usize {
        match self {
            Ty::I1     => 1,
            Ty::I8     => 1,
            Ty::I16    => 2,
            Ty::I32    => 4,
            Ty::I64    => 8,
            Ty::Float  => 4,
            Ty::Double => 8,
            Ty::Ptr    => 8,
            Ty::Void   => 0,
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(self, Ty::I1 | Ty::I8 | Ty::I16 | Ty::I32 | Ty::I64)
    }

    pub fn is_floating(self) -> bool {
        matches!(self, Ty::Float | Ty::Double)
    }

    pub fn bits(self) -> usize {
        match self {
            Ty::I1 => 1,
            ty => ty.size() * 8,
        }
    }
}

impl Display for Ty {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Ty::I1     => write!(fmt, "i1"),
            Ty::I8     => write!(fmt, "i8"),
            Ty::I16    => write!(fmt, "i16"),
            Ty::I32    => write!(fmt, "i32"),
            Ty::I64    => write!(fmt, "i64"),
            Ty::Float  => write!(fmt, "float"),
            Ty::Double => write!(fmt, "double"),
            Ty::Ptr    => write!(fmt, "ptr"),
            Ty::Void   => write!(fmt, "void"),
        }
    }
}

#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub enum Visibility {
    Local,
    Global,
}

#[derive(Clone,Debug,PartialEq)]
pub enum Attribute {
    Align(usize),
}

impl Display for Attribute {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Attribute::Align(align) => write!(fmt, "align {}", align),
        }
    }
}

/// Signed integer comparison predicates
#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub enum Predicate {
    Eq,
    Ne,
    Slt,
    Sgt,
    Sle,
    Sge,
}

impl Predicate {
    pub fn from_op(op: ast::BinaryOp) -> Option<Predicate> {
        match op {
            ast::BinaryOp::Eq => Some(Predicate::Eq),
            ast::BinaryOp::Ne => Some(Predicate::Ne),
            ast::BinaryOp::Lt => Some(Predicate::Slt),
            ast::BinaryOp::Gt => Some(Predicate::Sgt),
            ast::BinaryOp::Le => Some(Predicate::Sle),
            ast::BinaryOp::Ge => Some(Predicate::Sge),
            _ => None,
        }
    }
}

impl Display for Predicate {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Predicate::Eq  => write!(fmt, "eq"),
            Predicate::Ne  => write!(fmt, "ne"),
            Predicate::Slt => write!(fmt, "slt"),
            Predicate::Sgt => write!(fmt, "sgt"),
            Predicate::Sle => write!(fmt, "sle"),
            Predicate::Sge => write!(fmt, "sge"),
        }
    }
}

#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub enum CastOp {
    Trunc,
    SExt,
    ZExt,
}

impl Display for CastOp {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CastOp::Trunc => write!(fmt, "trunc"),
            CastOp::SExt  => write!(fmt, "sext"),
            CastOp::ZExt  => write!(fmt, "zext"),
        }
    }
}

//
// Values and the instructions producing them
//

#[derive(Clone,Debug,PartialEq)]
pub enum Value {
    Constant { ty: Ty, value: String },
    Variable(Rc<Variable>),
    // Incoming function parameter
    Argument { ty: Ty, name: Rc<str> },
}

impl Value {
    pub fn constant(ty: Ty, value: impl Into<String>) -> Value {
        Value::Constant { ty: ty, value: value.into() }
    }

    pub fn ty(&self) -> Ty {
        match self {
            Value::Constant { ty, .. } => *ty,
            Value::Variable(var) => var.ty(),
            Value::Argument { ty, .. } => *ty,
        }
    }
}

impl Display for Value {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Constant { ty: Ty::I1, value } => {
                write!(fmt, "{}", if value == "0" { "false" } else { "true" })
            },
            Value::Constant { value, .. } => write!(fmt, "{}", value),
            Value::Variable(var) => write!(fmt, "{}", var.reference()),
            Value::Argument { name, .. } => write!(fmt, "%{}", name),
        }
    }
}

#[derive(Clone,Debug,PartialEq)]
pub enum Allocation {
    Alloca { ty: Ty },
    Load { ty: Ty, source: Rc<Variable> },
    Add { ty: Ty, lhs: Value, rhs: Value },
    Sub { ty: Ty, lhs: Value, rhs: Value },
    Mul { ty: Ty, lhs: Value, rhs: Value },
    SDiv { ty: Ty, lhs: Value, rhs: Value },
    ICmp { pred: Predicate, lhs: Value, rhs: Value },
    Cast { op: CastOp, value: Value, ty: Ty },
}

impl Display for Allocation {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Allocation::Alloca { ty } => write!(fmt, "alloca {}", ty),
            Allocation::Load { ty, source } => write!(fmt, "load {}, ptr {}", ty, source.reference()),
            Allocation::Add { ty, lhs, rhs } => write!(fmt, "add nsw {} {}, {}", ty, lhs, rhs),
            Allocation::Sub { ty, lhs, rhs } => write!(fmt, "sub nsw {} {}, {}", ty, lhs, rhs),
            Allocation::Mul { ty, lhs, rhs } => write!(fmt, "mul nsw {} {}, {}", ty, lhs, rhs),
            Allocation::SDiv { ty, lhs, rhs } => write!(fmt, "sdiv {} {}, {}", ty, lhs, rhs),
            Allocation::ICmp { pred, lhs, rhs } => {
                write!(fmt, "icmp {} {} {}, {}", pred, lhs.ty(), lhs, rhs)
            },
            Allocation::Cast { op, value, ty } => {
                write!(fmt, "{} {} {} to {}", op, value.ty(), value, ty)
            },
        }
    }
}

/// A named or numbered value, stack slots are variables too
#[derive(Clone,Debug,PartialEq)]
pub struct Variable {
    pub name: Rc<str>,
    pub visibility: Visibility,
    pub attributes: Vec<Attribute>,
    pub allocation: Allocation,
    pub temporary: bool,
}

impl Variable {
    /// Type of the value the variable holds (stack slots are pointers)
    pub fn ty(&self) -> Ty {
        match &self.allocation {
            Allocation::Alloca { .. } => Ty::Ptr,
            Allocation::Load { ty, .. } |
            Allocation::Add { ty, .. } |
            Allocation::Sub { ty, .. } |
            Allocation::Mul { ty, .. } |
            Allocation::SDiv { ty, .. } |
            Allocation::Cast { ty, .. } => *ty,
            Allocation::ICmp { .. } => Ty::I1,
        }
    }

    /// Type stored in a stack slot
    pub fn slot_ty(&self) -> Option<Ty> {
        match &self.allocation {
            Allocation::Alloca { ty } => Some(*ty),
            _ => None,
        }
    }

    pub fn align(&self) -> Option<usize> {
        self.attributes.iter().find_map(|attr| match attr {
            Attribute::Align(align) => Some(*align),
        })
    }

    pub fn reference(&self) -> String {
        match self.visibility {
            Visibility::Local => format!("%{}", self.name),
            Visibility::Global => format!("@{}", self.name),
        }
    }
}

#[derive(Clone,Debug,PartialEq)]
pub enum Branch {
    Unconditional(Rc<str>),
    Conditional { cond: Value, then: Rc<str>, otherwise: Rc<str> },
}

#[derive(Clone,Debug,PartialEq)]
pub enum Body {
    Return(Option<Value>),
    VariableDef(Rc<Variable>),
    Store { value: Value, target: Rc<Variable> },
    Branch(Branch),
}

impl Body {
    pub fn is_terminator(&self) -> bool {
        matches!(self, Body::Return(_) | Body::Branch(_))
    }
}

impl Display for Body {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Body::Return(Some(value)) => write!(fmt, "ret {} {}", value.ty(), value),
            Body::Return(None) => write!(fmt, "ret void"),
            Body::VariableDef(var) => {
                write!(fmt, "{} = {}", var.reference(), var.allocation)?;
                for attr in &var.attributes {
                    write!(fmt, ", {}", attr)?;
                }
                Ok(())
            },
            Body::Store { value, target } => {
                write!(fmt, "store {} {}, ptr {}", value.ty(), value, target.reference())?;
                if let Some(align) = target.align() {
                    write!(fmt, ", align {}", align)?;
                }
                Ok(())
            },
            Body::Branch(Branch::Unconditional(label)) => write!(fmt, "br label %{}", label),
            Body::Branch(Branch::Conditional { cond, then, otherwise }) => {
                write!(fmt, "br i1 {}, label %{}, label %{}", cond, then, otherwise)
            },
        }
    }
}

/// Basic block: a label followed by straight-line code and one terminator
#[derive(Clone,Debug,PartialEq)]
pub struct LogicalBlock {
    pub label: Rc<str>,
    pub body: Vec<Body>,
}

impl LogicalBlock {
    pub fn new(label: Rc<str>) -> LogicalBlock {
        LogicalBlock { label: label, body: Vec::new() }
    }

    pub fn terminated(&self) -> bool {
        self.body.last().map_or(false, Body::is_terminator)
    }

    pub fn returned(&self) -> bool {
        matches!(self.body.last(), Some(Body::Return(_)))
    }
}

#[derive(Clone,Debug,PartialEq)]
pub struct Function {
    pub name: Rc<str>,
    pub return_type: Ty,
    pub params: Vec<(Rc<str>, Ty)>,
    pub blocks: Vec<LogicalBlock>,
    // Counter for numbered temporaries
    unnamed: usize,
    // Counters for repeated labels and variable names
    named: HashMap<String, usize>,
    // Every name handed out so far, arguments included
    taken: HashSet<Rc<str>>,
}

impl Function {
    pub fn new(name: Rc<str>, return_type: Ty, params: Vec<(Rc<str>, Ty)>) -> Function {
        let mut func = Function {
            name: name,
            return_type: return_type,
            params: params,
            blocks: Vec::new(),
            unnamed: 0,
            named: HashMap::new(),
            taken: HashSet::new(),
        };
        for (param, _) in &func.params {
            func.taken.insert(param.clone());
        }
        let entry = func.unique_name("entry");
        func.blocks.push(LogicalBlock::new(entry));
        func
    }

    pub fn next_unnamed(&mut self) -> Rc<str> {
        let name = self.unnamed.to_string();
        self.unnamed += 1;
        name.into()
    }

    /// Function-unique name, repeats get the first free numeric suffix
    pub fn unique_name(&mut self, base: &str) -> Rc<str> {
        loop {
            let count = self.named.entry(base.to_string()).or_insert(0);
            let name: Rc<str> = if *count == 0 {
                base.into()
            } else {
                format!("{}{}", base, count).into()
            };
            *count += 1;
            // A suffixed name can spell another identifier (a + 1 == a1)
            if self.taken.insert(name.clone()) {
                return name;
            }
        }
    }

    pub fn current_block(&self) -> Option<&LogicalBlock> {
        self.blocks.last()
    }

    pub fn current_block_mut(&mut self) -> &mut LogicalBlock {
        if self.blocks.is_empty() {
            let entry = self.unique_name("entry");
            self.blocks.push(LogicalBlock::new(entry));
        }
        let last = self.blocks.len() - 1;
        &mut self.blocks[last]
    }

    pub fn append_block(&mut self, label: Rc<str>) {
        self.blocks.push(LogicalBlock::new(label));
    }
}

impl Display for Function {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> std::fmt::Result {
        write!(fmt, "define {} @{}(", self.return_type, self.name)?;
        for (i, (name, ty)) in self.params.iter().enumerate() {
            if i > 0 {
                write!(fmt, ", ")?;
            }
            write!(fmt, "{} %{}", ty, name)?;
        }
        writeln!(fmt, ") {{")?;
        for (i, block) in self.blocks.iter().enumerate() {
            if i > 0 {
                writeln!(fmt)?;
            }
            writeln!(fmt, "{}:", block.label)?;
            for body in &block.body {
                writeln!(fmt, "  {}", body)?;
            }
        }
        writeln!(fmt, "}}")
    }
}

/// Global variable with an optional constant initializer
#[derive(Clone,Debug,PartialEq)]
pub struct Global {
    pub var: Rc<Variable>,
    pub init: Option<Value>,
}

impl Display for Global {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> std::fmt::Result {
        let ty = self.var.slot_ty().unwrap_or(Ty::Void);
        match &self.init {
            Some(init) => write!(fmt, "{} = global {} {}", self.var.reference(), ty, init)?,
            None => write!(fmt, "{} = global {} zeroinitializer", self.var.reference(), ty)?,
        }
        if let Some(align) = self.var.align() {
            write!(fmt, ", align {}", align)?;
        }
        Ok(())
    }
}

#[derive(Clone,Debug,Default,PartialEq)]
pub struct Module {
    pub globals: Vec<Global>,
    pub functions: Vec<Function>,
}

impl Display for Module {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> std::fmt::Result {
        for global in &self.globals {
            writeln!(fmt, "{}", global)?;
        }
        for (i, func) in self.functions.iter().enumerate() {
            if i > 0 || !self.globals.is_empty() {
                writeln!(fmt)?;
            }
            write!(fmt, "{}", func)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(name: &str, ty: Ty) -> Rc<Variable> {
        Rc::new(Variable {
            name: name.into(),
            visibility: Visibility::Local,
            attributes: vec![Attribute::Align(ty.size())],
            allocation: Allocation::Alloca { ty: ty },
            temporary: false,
        })
    }

    #[test]
    fn unique_names() {
        let mut func = Function::new("main".into(), Ty::I32, Vec::new());
        assert_eq!(&*func.blocks[0].label, "entry");
        assert_eq!(&*func.unique_name("if.then"), "if.then");
        assert_eq!(&*func.unique_name("if.then"), "if.then1");
        assert_eq!(&*func.unique_name("if.end"), "if.end");
        assert_eq!(&*func.next_unnamed(), "0");
        assert_eq!(&*func.next_unnamed(), "1");
    }

    #[test]
    fn suffixed_names_skip_real_identifiers() {
        let mut func = Function::new("f".into(), Ty::I32, vec![("x".into(), Ty::I32)]);
        assert_eq!(&*func.unique_name("a"), "a");
        assert_eq!(&*func.unique_name("a"), "a1");
        assert_eq!(&*func.unique_name("a1"), "a11");
        assert_eq!(&*func.unique_name("a"), "a2");
        // Arguments already own their name
        assert_eq!(&*func.unique_name("x"), "x1");
    }

    #[test]
    fn display_instructions() {
        let a = slot("a", Ty::I32);
        let load = Rc::new(Variable {
            name: "0".into(),
            visibility: Visibility::Local,
            attributes: vec![Attribute::Align(4)],
            allocation: Allocation::Load { ty: Ty::I32, source: a.clone() },
            temporary: true,
        });
        let add = Allocation::Add {
            ty: Ty::I32,
            lhs: Value::Variable(load.clone()),
            rhs: Value::constant(Ty::I32, "10"),
        };
        assert_eq!(Body::VariableDef(a.clone()).to_string(), "%a = alloca i32, align 4");
        assert_eq!(Body::Store { value: Value::constant(Ty::I32, "10"), target: a.clone() }.to_string(),
            "store i32 10, ptr %a, align 4");
        assert_eq!(Body::VariableDef(load.clone()).to_string(), "%0 = load i32, ptr %a, align 4");
        assert_eq!(add.to_string(), "add nsw i32 %0, 10");
        assert_eq!(Body::Return(Some(Value::constant(Ty::I32, "0"))).to_string(), "ret i32 0");

        let cmp = Allocation::ICmp {
            pred: Predicate::Slt,
            lhs: Value::Variable(load),
            rhs: Value::constant(Ty::I32, "3"),
        };
        assert_eq!(cmp.to_string(), "icmp slt i32 %0, 3");
    }

    #[test]
    fn terminated_blocks() {
        let mut block = LogicalBlock::new("entry".into());
        assert!(!block.terminated());
        block.body.push(Body::Branch(Branch::Unconditional("if.end".into())));
        assert!(block.terminated());
        assert!(!block.returned());
    }
}
