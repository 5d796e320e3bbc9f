// SPDX-License-Identifier: GPL-2.0-only

//
// Abstract syntax tree elements
//

use crate::error::EvalError;
use crate::lex::{Position,TokenKind};
use std::fmt::{Display,Formatter};
use std::rc::Rc;

//
// Type system
//

#[derive(Clone,Debug,PartialEq,Eq,Hash)]
pub enum Type {
    Void,
    Bool,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Str,
    // Reference to a struct or class declaration
    Named(Rc<str>),
}

impl Type {
    pub fn from_token(kind: TokenKind) -> Option<Type> {
        match kind {
            TokenKind::Void   => Some(Type::Void),
            TokenKind::Bool   => Some(Type::Bool),
            TokenKind::Char   => Some(Type::Char),
            TokenKind::Short  => Some(Type::Short),
            TokenKind::Int    => Some(Type::Int),
            TokenKind::Long   => Some(Type::Long),
            TokenKind::Float  => Some(Type::Float),
            TokenKind::Double => Some(Type::Double),
            TokenKind::String => Some(Type::Str),
            // Literal tokens carry their type in the kind
            TokenKind::IntLiteral    => Some(Type::Int),
            TokenKind::FloatLiteral  => Some(Type::Float),
            TokenKind::DoubleLiteral => Some(Type::Double),
            TokenKind::BoolLiteral   => Some(Type::Bool),
            TokenKind::CharLiteral   => Some(Type::Char),
            TokenKind::StringLiteral => Some(Type::Str),
            _ => None,
        }
    }

    /// Byte size of primitive types, aggregates are sized by their layout
    pub fn size(&self) -> usize {
        match self {
            Type::Void   => 0,
            Type::Bool   => 1,
            Type::Char   => 1,
            Type::Short  => 2,
            Type::Int    => 4,
            Type::Long   => 8,
            Type::Float  => 4,
            Type::Double => 8,
            Type::Str    => 8,
            Type::Named(_) => 0,
        }
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, Type::Char | Type::Short | Type::Int | Type::Long)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Type::Bool | Type::Char | Type::Short | Type::Int | Type::Long)
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, Type::Float | Type::Double)
    }

    /// Common type of an arithmetic operation (integers promote to int)
    pub fn promote(a: &Type, b: &Type) -> Type {
        if *a == Type::Double || *b == Type::Double {
            Type::Double
        } else if *a == Type::Float || *b == Type::Float {
            Type::Float
        } else if *a == Type::Long || *b == Type::Long {
            Type::Long
        } else {
            Type::Int
        }
    }
}

impl Display for Type {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Void   => write!(fmt, "void"),
            Type::Bool   => write!(fmt, "bool"),
            Type::Char   => write!(fmt, "char"),
            Type::Short  => write!(fmt, "short"),
            Type::Int    => write!(fmt, "int"),
            Type::Long   => write!(fmt, "long"),
            Type::Float  => write!(fmt, "float"),
            Type::Double => write!(fmt, "double"),
            Type::Str    => write!(fmt, "string"),
            Type::Named(name) => write!(fmt, "{}", name),
        }
    }
}

/// Where a declaration is visible from
#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub enum Access {
    Global,
    Scoped,
    Public,
    Protected,
    Private,
}

//
// Expressions
//

#[derive(Clone,Debug,PartialEq)]
pub struct Identifier {
    pub name: Rc<str>,
    // Can this identifier appear on the left of an assignment?
    pub assignable: bool,
    pub pos: Position,
}

#[derive(Clone,Debug,PartialEq)]
pub struct NumberLiteral {
    pub ty: Type,
    pub value: String,
    pub pos: Position,
}

#[derive(Clone,Debug,PartialEq)]
pub struct StringLiteral {
    pub value: String,
    pub len: usize,
    pub pos: Position,
}

#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub enum BinaryOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
}

impl BinaryOp {
    pub fn from_token(kind: TokenKind) -> Option<BinaryOp> {
        match kind {
            TokenKind::Assign    => Some(BinaryOp::Assign),
            TokenKind::AddAssign => Some(BinaryOp::AddAssign),
            TokenKind::SubAssign => Some(BinaryOp::SubAssign),
            TokenKind::MulAssign => Some(BinaryOp::MulAssign),
            TokenKind::DivAssign => Some(BinaryOp::DivAssign),
            TokenKind::Add       => Some(BinaryOp::Add),
            TokenKind::Sub       => Some(BinaryOp::Sub),
            TokenKind::Mul       => Some(BinaryOp::Mul),
            TokenKind::Div       => Some(BinaryOp::Div),
            TokenKind::Lt        => Some(BinaryOp::Lt),
            TokenKind::Gt        => Some(BinaryOp::Gt),
            TokenKind::Le        => Some(BinaryOp::Le),
            TokenKind::Ge        => Some(BinaryOp::Ge),
            TokenKind::Eq        => Some(BinaryOp::Eq),
            TokenKind::Ne        => Some(BinaryOp::Ne),
            _ => None,
        }
    }

    /// Binding strength, higher binds tighter
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Assign | BinaryOp::AddAssign | BinaryOp::SubAssign |
            BinaryOp::MulAssign | BinaryOp::DivAssign => 1,
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le |
            BinaryOp::Ge | BinaryOp::Eq | BinaryOp::Ne => 10,
            BinaryOp::Add | BinaryOp::Sub => 20,
            BinaryOp::Mul | BinaryOp::Div => 30,
        }
    }

    pub fn is_right_assoc(self) -> bool {
        self.is_assignment()
    }

    pub fn is_assignment(self) -> bool {
        matches!(self,
            BinaryOp::Assign | BinaryOp::AddAssign | BinaryOp::SubAssign |
            BinaryOp::MulAssign | BinaryOp::DivAssign)
    }

    pub fn is_comparison(self) -> bool {
        self.precedence() == 10
    }

    /// Arithmetic operation performed by a compound assignment
    pub fn compound_base(self) -> Option<BinaryOp> {
        match self {
            BinaryOp::AddAssign => Some(BinaryOp::Add),
            BinaryOp::SubAssign => Some(BinaryOp::Sub),
            BinaryOp::MulAssign => Some(BinaryOp::Mul),
            BinaryOp::DivAssign => Some(BinaryOp::Div),
            _ => None,
        }
    }
}

#[derive(Clone,Debug,PartialEq)]
pub struct BinaryExpression {
    pub lhs: Box<Expr>,
    pub op: BinaryOp,
    pub rhs: Box<Expr>,
    // Both sides are literals (or a constant sub-expression and a literal)
    pub constant: bool,
    // Both sides name the same identifier
    pub operands_match: bool,
    pub pos: Position,
}

impl BinaryExpression {
    pub fn new(lhs: Expr, op: BinaryOp, rhs: Expr, pos: Position) -> BinaryExpression {
        let constant = !op.is_assignment() && match (&lhs, &rhs) {
            (Expr::Number(_), Expr::Number(_)) => true,
            (Expr::Binary(inner), Expr::Number(_)) |
            (Expr::Number(_), Expr::Binary(inner)) => inner.constant,
            _ => false,
        };
        let operands_match = match (&lhs, &rhs) {
            (Expr::Ident(a), Expr::Ident(b)) => a.name == b.name,
            _ => false,
        };
        BinaryExpression {
            lhs: Box::new(lhs),
            op: op,
            rhs: Box::new(rhs),
            constant: constant,
            operands_match: operands_match,
            pos: pos,
        }
    }

    /// Fold a constant expression into a literal
    pub fn evaluate(&self) -> Result<NumberLiteral, EvalError> {
        if !self.constant {
            return Err(EvalError::NotConstant);
        }
        let lhs = self.lhs.evaluate()?;
        let rhs = self.rhs.evaluate()?;
        fold(self.op, &lhs, &rhs, self.pos)
    }
}

#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
    Incr,
    Decr,
}

#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub enum Fixity {
    Prefix,
    Postfix,
}

#[derive(Clone,Debug,PartialEq)]
pub struct UnaryExpression {
    pub op: UnaryOp,
    pub fixity: Fixity,
    pub operand: Box<Expr>,
    pub pos: Position,
}

#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub enum Accessor {
    Dot,    // .
    Arrow,  // ->
    Scope,  // ::
}

#[derive(Clone,Debug,PartialEq)]
pub struct MemberExpression {
    pub object: Identifier,
    pub accessor: Accessor,
    pub member: Identifier,
    pub pos: Position,
}

#[derive(Clone,Debug,PartialEq)]
pub enum Expr {
    Ident(Identifier),
    Number(NumberLiteral),
    Str(StringLiteral),
    Binary(BinaryExpression),
    Unary(UnaryExpression),
    Member(MemberExpression),
}

impl Expr {
    pub fn pos(&self) -> Position {
        match self {
            Expr::Ident(ident) => ident.pos,
            Expr::Number(lit) => lit.pos,
            Expr::Str(lit) => lit.pos,
            Expr::Binary(bin) => bin.pos,
            Expr::Unary(un) => un.pos,
            Expr::Member(mem) => mem.pos,
        }
    }

    /// Is this a literal or a fully constant binary expression?
    pub fn is_constant(&self) -> bool {
        match self {
            Expr::Number(_) => true,
            Expr::Binary(bin) => bin.constant,
            _ => false,
        }
    }

    /// Fold into a literal, only succeeds for constant expressions
    pub fn evaluate(&self) -> Result<NumberLiteral, EvalError> {
        match self {
            Expr::Number(lit) => Ok(lit.clone()),
            Expr::Binary(bin) => bin.evaluate(),
            Expr::Unary(un) if matches!(un.op, UnaryOp::Plus | UnaryOp::Minus | UnaryOp::Not) => {
                let lit = un.operand.evaluate()?;
                match un.op {
                    UnaryOp::Plus => Ok(lit),
                    UnaryOp::Minus => negate(&lit),
                    _ => {
                        let truth = !lit.is_zero()?;
                        Ok(NumberLiteral::boolean(!truth, un.pos))
                    },
                }
            },
            _ => Err(EvalError::NotConstant),
        }
    }
}

//
// Constant folding
//

// Numeric value of a literal
#[derive(Clone,Copy,Debug,PartialEq)]
enum Num {
    Int(i64),
    Real(f64),
}

impl NumberLiteral {
    pub fn new(ty: Type, value: impl Into<String>, pos: Position) -> NumberLiteral {
        NumberLiteral { ty: ty, value: value.into(), pos: pos }
    }

    pub fn boolean(value: bool, pos: Position) -> NumberLiteral {
        NumberLiteral::new(Type::Bool, if value { "1" } else { "0" }, pos)
    }

    fn num(&self) -> Result<Num, EvalError> {
        if self.ty.is_floating() {
            self.value.parse::<f64>()
                .map(Num::Real)
                .map_err(|_| EvalError::Malformed(self.value.clone()))
        } else {
            self.value.parse::<i64>()
                .map(Num::Int)
                .map_err(|_| EvalError::Malformed(self.value.clone()))
        }
    }

    /// Integer value of the literal (floating values are truncated)
    pub fn as_i64(&self) -> Result<i64, EvalError> {
        match self.num()? {
            Num::Int(val) => Ok(val),
            Num::Real(val) => Ok(val as i64),
        }
    }

    pub fn is_zero(&self) -> Result<bool, EvalError> {
        match self.num()? {
            Num::Int(val) => Ok(val == 0),
            Num::Real(val) => Ok(val == 0.0),
        }
    }
}

// Integer literal type that can hold a folded value
fn int_type(val: i64, ty: Type) -> Type {
    if ty == Type::Long || i32::try_from(val).is_err() {
        Type::Long
    } else {
        Type::Int
    }
}

fn real_text(ty: &Type, val: f64) -> String {
    if *ty == Type::Float {
        format!("{:?}", val as f32)
    } else {
        format!("{:?}", val)
    }
}

fn negate(lit: &NumberLiteral) -> Result<NumberLiteral, EvalError> {
    match lit.num()? {
        Num::Int(val) => {
            let val = val.checked_neg().ok_or(EvalError::Overflow)?;
            let ty = int_type(val, Type::promote(&lit.ty, &Type::Int));
            Ok(NumberLiteral::new(ty, val.to_string(), lit.pos))
        },
        Num::Real(val) => Ok(NumberLiteral::new(lit.ty.clone(), real_text(&lit.ty, -val), lit.pos)),
    }
}

fn fold(op: BinaryOp, lhs: &NumberLiteral, rhs: &NumberLiteral, pos: Position)
        -> Result<NumberLiteral, EvalError> {
    let ty = Type::promote(&lhs.ty, &rhs.ty);
    let (a, b) = (lhs.num()?, rhs.num()?);

    if ty.is_floating() {
        let real = |n: Num| match n { Num::Int(v) => v as f64, Num::Real(v) => v };
        let (a, b) = (real(a), real(b));
        let val = match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => {
                if b == 0.0 {
                    return Err(EvalError::DivisionByZero);
                }
                a / b
            },
            BinaryOp::Lt => return Ok(NumberLiteral::boolean(a < b, pos)),
            BinaryOp::Gt => return Ok(NumberLiteral::boolean(a > b, pos)),
            BinaryOp::Le => return Ok(NumberLiteral::boolean(a <= b, pos)),
            BinaryOp::Ge => return Ok(NumberLiteral::boolean(a >= b, pos)),
            BinaryOp::Eq => return Ok(NumberLiteral::boolean(a == b, pos)),
            BinaryOp::Ne => return Ok(NumberLiteral::boolean(a != b, pos)),
            _ => return Err(EvalError::NotConstant),
        };
        return Ok(NumberLiteral::new(ty.clone(), real_text(&ty, val), pos));
    }

    let int = |n: Num| match n { Num::Int(v) => v, Num::Real(v) => v as i64 };
    let (a, b) = (int(a), int(b));
    let val = match op {
        BinaryOp::Add => a.checked_add(b).ok_or(EvalError::Overflow)?,
        BinaryOp::Sub => a.checked_sub(b).ok_or(EvalError::Overflow)?,
        BinaryOp::Mul => a.checked_mul(b).ok_or(EvalError::Overflow)?,
        BinaryOp::Div => {
            if b == 0 {
                return Err(EvalError::DivisionByZero);
            }
            a.checked_div(b).ok_or(EvalError::Overflow)?
        },
        BinaryOp::Lt => return Ok(NumberLiteral::boolean(a < b, pos)),
        BinaryOp::Gt => return Ok(NumberLiteral::boolean(a > b, pos)),
        BinaryOp::Le => return Ok(NumberLiteral::boolean(a <= b, pos)),
        BinaryOp::Ge => return Ok(NumberLiteral::boolean(a >= b, pos)),
        BinaryOp::Eq => return Ok(NumberLiteral::boolean(a == b, pos)),
        BinaryOp::Ne => return Ok(NumberLiteral::boolean(a != b, pos)),
        _ => return Err(EvalError::NotConstant),
    };
    Ok(NumberLiteral::new(int_type(val, ty), val.to_string(), pos))
}

//
// Statements and declarations
//

#[derive(Clone,Debug,PartialEq)]
pub struct VariableDeclaration {
    pub ty: Type,
    pub name: Rc<str>,
    pub init: Option<Expr>,
    pub access: Access,
    pub pos: Position,
}

#[derive(Clone,Debug,PartialEq,Default)]
pub struct BlockStatement {
    pub body: Vec<Stmt>,
}

#[derive(Clone,Debug,PartialEq)]
pub enum Alternate {
    Block(BlockStatement),
    If(Box<IfStatement>),
}

#[derive(Clone,Debug,PartialEq)]
pub struct IfStatement {
    pub condition: Expr,
    pub consequent: BlockStatement,
    pub alternate: Option<Alternate>,
    pub pos: Position,
}

impl IfStatement {
    pub fn new(condition: Expr, consequent: BlockStatement, pos: Position) -> IfStatement {
        IfStatement {
            condition: condition,
            consequent: consequent,
            alternate: None,
            pos: pos,
        }
    }

    pub fn set_alternate(&mut self, alternate: Alternate) {
        self.alternate = Some(alternate);
    }
}

#[derive(Clone,Debug,PartialEq)]
pub struct WhileStatement {
    pub condition: Expr,
    pub body: BlockStatement,
    pub pos: Position,
}

#[derive(Clone,Debug,PartialEq)]
pub struct ReturnStatement {
    pub value: Option<Expr>,
    pub pos: Position,
}

#[derive(Clone,Debug,PartialEq)]
pub struct FunctionDeclaration {
    pub return_type: Type,
    pub name: Rc<str>,
    // Parameters, a present initializer is the default value
    pub params: Vec<VariableDeclaration>,
    pub body: BlockStatement,
    pub access: Access,
    pub pos: Position,
}

#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub enum AggregateKind {
    Struct,
    Class,
}

#[derive(Clone,Debug,PartialEq)]
pub struct StructDeclaration {
    pub kind: AggregateKind,
    pub name: Rc<str>,
    pub members: Vec<VariableDeclaration>,
    pub methods: Vec<FunctionDeclaration>,
    pub pos: Position,
}

impl StructDeclaration {
    pub fn member(&self, name: &str) -> Option<&VariableDeclaration> {
        self.members.iter().find(|m| &*m.name == name)
    }
}

#[derive(Clone,Debug,PartialEq)]
pub enum Stmt {
    Block(BlockStatement),
    If(IfStatement),
    While(WhileStatement),
    Return(ReturnStatement),
    Variable(VariableDeclaration),
    Function(FunctionDeclaration),
    Struct(StructDeclaration),
    Expr(Expr),
}

#[derive(Clone,Debug,PartialEq,Default)]
pub struct Program {
    pub body: Vec<Stmt>,
}

impl Program {
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDeclaration> {
        self.body.iter().filter_map(|stmt| match stmt {
            Stmt::Function(func) => Some(func),
            _ => None,
        })
    }

    pub fn globals(&self) -> impl Iterator<Item = &VariableDeclaration> {
        self.body.iter().filter_map(|stmt| match stmt {
            Stmt::Variable(var) => Some(var),
            _ => None,
        })
    }

    /// Find a struct or class declaration of the given kind
    pub fn aggregate(&self, kind: AggregateKind, name: &str) -> Option<&StructDeclaration> {
        self.body.iter().find_map(|stmt| match stmt {
            Stmt::Struct(decl) if decl.kind == kind && &*decl.name == name => Some(decl),
            _ => None,
        })
    }

    pub fn find_function(&self, name: &str) -> Option<&FunctionDeclaration> {
        self.functions().find(|f| &*f.name == name)
    }
}
