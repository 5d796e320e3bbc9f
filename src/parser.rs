// SPDX-License-Identifier: GPL-2.0-only

//
// Recursive descent parser with precedence climbing for expressions
//

use crate::ast::*;
use crate::error::{Diagnostic,Diagnostics,ParseError};
use crate::lex::{Position,Token,TokenKind};
use crate::symtab::{SymTab,Symbol};
use crate::util::PeekIter;
use std::rc::Rc;
use tracing::{debug,trace};

pub struct Parser<'d> {
    // Token stream with a small lookahead window
    tokens: PeekIter<std::vec::IntoIter<Token>, 2>,
    // Position of the last consumed token (used for errors at end of file)
    last: Position,
    // Scope-keyed declarations
    symtab: SymTab,
    // Program being built, top-level aggregates are resolved from here
    program: Program,
    // Name and return type of the function being parsed
    function: Option<(Rc<str>, Type)>,
    diagnostics: &'d mut Diagnostics,
}

impl<'d> Parser<'d> {
    pub fn new(tokens: Vec<Token>, diagnostics: &'d mut Diagnostics) -> Parser<'d> {
        Parser {
            tokens: PeekIter::new(tokens.into_iter()),
            last: Position { line: 1, column: 1, offset: 0 },
            symtab: SymTab::new(),
            program: Program::default(),
            function: None,
            diagnostics: diagnostics,
        }
    }

    //
    // Token helpers
    //

    fn peek(&mut self, i: usize) -> Option<TokenKind> {
        self.tokens.peek(i).map(|t| t.kind)
    }

    fn peek_pos(&mut self) -> Position {
        let last = self.last;
        self.tokens.peek(0).map(|t| t.pos).unwrap_or(last)
    }

    fn next_token(&mut self, expected: &str) -> Result<Token, ParseError> {
        match self.tokens.next() {
            Some(tok) => {
                self.last = tok.pos;
                Ok(tok)
            },
            None => Err(ParseError::UnexpectedEof {
                expected: expected.into(),
                pos: self.last,
            }),
        }
    }

    fn want(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        let expected = kind.to_string();
        let tok = self.next_token(&expected)?;
        if tok.kind == kind {
            Ok(tok)
        } else {
            Err(unexpected(&expected, &tok))
        }
    }

    // Consume the lookahead token
    fn bump(&mut self) -> Option<Token> {
        let tok = self.tokens.next()?;
        self.last = tok.pos;
        Some(tok)
    }

    fn maybe_want(&mut self, kind: TokenKind) -> bool {
        if self.peek(0) == Some(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn want_ident(&mut self) -> Result<(Rc<str>, Position), ParseError> {
        let tok = self.next_token("identifier")?;
        match tok.kind {
            TokenKind::Ident => Ok((tok.text().into(), tok.pos)),
            _ => Err(unexpected("identifier", &tok)),
        }
    }

    fn note(&mut self, diag: Diagnostic) {
        self.diagnostics.push(diag);
    }

    //
    // Types
    //

    fn at_type(&mut self) -> bool {
        match self.peek(0) {
            Some(kind) if kind.is_type() => true,
            // A named type is an identifier followed by another identifier
            Some(TokenKind::Ident) => self.peek(1) == Some(TokenKind::Ident),
            _ => false,
        }
    }

    fn want_type(&mut self) -> Result<Type, ParseError> {
        let tok = self.next_token("type name")?;
        if let Some(ty) = Type::from_token(tok.kind).filter(|_| tok.kind.is_type()) {
            return Ok(ty);
        }
        if tok.kind == TokenKind::Ident {
            let name: Rc<str> = tok.text().into();
            if self.program.aggregate(AggregateKind::Struct, &name).is_some() ||
                    self.program.aggregate(AggregateKind::Class, &name).is_some() {
                return Ok(Type::Named(name));
            }
            return Err(ParseError::UnknownType { name: name, pos: tok.pos });
        }
        Err(unexpected("type name", &tok))
    }

    fn declare(&mut self, name: &Rc<str>, ty: &Type, pos: Position) -> Result<(), ParseError> {
        let symbol = Symbol { ty: ty.clone(), pos: pos };
        match self.symtab.insert(name.clone(), symbol) {
            Ok(()) => Ok(()),
            Err(original) => Err(ParseError::Redefinition {
                name: name.clone(),
                pos: pos,
                original: original.pos,
            }),
        }
    }

    //
    // Expressions
    //

    fn peek_binary_op(&mut self) -> Option<BinaryOp> {
        self.peek(0).and_then(BinaryOp::from_token)
    }

    /// Precedence climbing: consume operators binding at least as tight as floor
    fn parse_binary_operation(&mut self, mut lhs: Expr, floor: u8) -> Result<Expr, ParseError> {
        while let Some(op) = self.peek_binary_op() {
            if op.precedence() < floor {
                break;
            }
            let op_pos = self.peek_pos();
            self.bump();

            let mut rhs = self.parse_term()?;
            while let Some(next) = self.peek_binary_op() {
                if next.precedence() > op.precedence() {
                    rhs = self.parse_binary_operation(rhs, op.precedence() + 1)?;
                } else if next.is_right_assoc() && next.precedence() == op.precedence() {
                    rhs = self.parse_binary_operation(rhs, op.precedence())?;
                } else {
                    break;
                }
            }

            if op.is_assignment() && !is_assignable(&lhs) {
                return Err(ParseError::NotAssignable { pos: lhs.pos() });
            }
            lhs = Expr::Binary(BinaryExpression::new(lhs, op, rhs, op_pos));
        }
        Ok(lhs)
    }

    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        let lhs = self.parse_term()?;
        self.parse_binary_operation(lhs, 0)
    }

    fn parse_member(&mut self, object: Identifier, base: Type) -> Result<Expr, ParseError> {
        let tok = self.next_token("member access")?;
        let accessor = match tok.kind {
            TokenKind::Dot   => Accessor::Dot,
            TokenKind::Arrow => Accessor::Arrow,
            TokenKind::Scope => Accessor::Scope,
            _ => return Err(unexpected("member access", &tok)),
        };
        let (member, member_pos) = self.want_ident()?;

        let aggregate = match &base {
            Type::Named(name) => name.clone(),
            _ => return Err(ParseError::NotAStructure { name: object.name, pos: object.pos }),
        };
        let decl = self.program.aggregate(AggregateKind::Struct, &aggregate)
            .or_else(|| self.program.aggregate(AggregateKind::Class, &aggregate));
        match decl {
            Some(decl) if decl.member(&member).is_some() => (),
            Some(_) => return Err(ParseError::NoMember {
                member: member,
                aggregate: aggregate,
                pos: member_pos,
            }),
            None => return Err(ParseError::UnknownType { name: aggregate, pos: object.pos }),
        }

        let pos = object.pos;
        Ok(Expr::Member(MemberExpression {
            object: object,
            accessor: accessor,
            member: Identifier { name: member, assignable: false, pos: member_pos },
            pos: pos,
        }))
    }

    fn parse_identifier(&mut self, name: Rc<str>, pos: Position) -> Result<Expr, ParseError> {
        let ident = Identifier { name: name.clone(), assignable: true, pos: pos };
        let is_member = matches!(self.peek(0),
            Some(TokenKind::Dot | TokenKind::Arrow | TokenKind::Scope));

        let found = self.symtab.lookup(&name).map(|symbol| symbol.ty.clone());
        let names_aggregate = self.program.aggregate(AggregateKind::Struct, &name).is_some() ||
            self.program.aggregate(AggregateKind::Class, &name).is_some();
        let base = match found {
            Some(ty) => ty,
            // Class::member names the aggregate itself
            None if names_aggregate && self.peek(0) == Some(TokenKind::Scope) => {
                Type::Named(name.clone())
            },
            None => return Err(ParseError::Undeclared { name: name, pos: pos }),
        };

        if is_member {
            self.parse_member(ident, base)
        } else {
            Ok(Expr::Ident(ident))
        }
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_primary()?;

        // Postfix increment/decrement
        let op = match self.peek(0) {
            Some(TokenKind::Incr) => UnaryOp::Incr,
            Some(TokenKind::Decr) => UnaryOp::Decr,
            _ => return Ok(expr),
        };
        if !is_assignable(&expr) {
            return Err(ParseError::NotAssignable { pos: expr.pos() });
        }
        let op_pos = self.peek_pos();
        self.bump();
        Ok(Expr::Unary(UnaryExpression {
            op: op,
            fixity: Fixity::Postfix,
            operand: Box::new(expr),
            pos: op_pos,
        }))
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let tok = self.next_token("expression")?;
        match tok.kind {
            TokenKind::IntLiteral | TokenKind::FloatLiteral | TokenKind::DoubleLiteral |
            TokenKind::BoolLiteral | TokenKind::CharLiteral => {
                let ty = Type::from_token(tok.kind).unwrap_or(Type::Int);
                Ok(Expr::Number(NumberLiteral::new(ty, tok.text(), tok.pos)))
            },
            TokenKind::StringLiteral => {
                let value = tok.text().to_string();
                Ok(Expr::Str(StringLiteral { len: value.len(), value: value, pos: tok.pos }))
            },
            TokenKind::Ident => self.parse_identifier(tok.text().into(), tok.pos),
            TokenKind::LParen => {
                let expr = self.parse_expression()?;
                self.want(TokenKind::RParen)?;
                Ok(expr)
            },
            TokenKind::Sub => {
                let operand = self.parse_term()?;
                // Negative literals are folded right away
                if let Expr::Number(lit) = &operand {
                    let folded = Expr::Unary(UnaryExpression {
                        op: UnaryOp::Minus,
                        fixity: Fixity::Prefix,
                        operand: Box::new(Expr::Number(lit.clone())),
                        pos: tok.pos,
                    }).evaluate().map_err(|reason| ParseError::Constant { reason: reason, pos: tok.pos })?;
                    return Ok(Expr::Number(NumberLiteral { pos: tok.pos, ..folded }));
                }
                Ok(unary(UnaryOp::Minus, operand, tok.pos))
            },
            TokenKind::Add => {
                let operand = self.parse_term()?;
                Ok(unary(UnaryOp::Plus, operand, tok.pos))
            },
            TokenKind::Excl => {
                let operand = self.parse_term()?;
                Ok(unary(UnaryOp::Not, operand, tok.pos))
            },
            TokenKind::Incr | TokenKind::Decr => {
                let operand = self.parse_term()?;
                if !is_assignable(&operand) {
                    return Err(ParseError::NotAssignable { pos: operand.pos() });
                }
                let op = if tok.kind == TokenKind::Incr { UnaryOp::Incr } else { UnaryOp::Decr };
                Ok(unary(op, operand, tok.pos))
            },
            _ => Err(unexpected("expression", &tok)),
        }
    }

    //
    // Statements
    //

    // Emit a note for conditions that fold to a constant
    fn analyze_condition(&mut self, cond: &Expr) -> Result<(), ParseError> {
        if !cond.is_constant() {
            return Ok(());
        }
        let lit = cond.evaluate()
            .map_err(|reason| ParseError::Constant { reason: reason, pos: cond.pos() })?;
        let zero = lit.is_zero()
            .map_err(|reason| ParseError::Constant { reason: reason, pos: cond.pos() })?;
        let message = if zero {
            "condition is always false"
        } else {
            "condition is always true"
        };
        self.note(Diagnostic::note(cond.pos(), message));
        Ok(())
    }

    fn parse_condition(&mut self) -> Result<Expr, ParseError> {
        self.want(TokenKind::LParen)?;
        let cond = self.parse_expression()?;
        self.want(TokenKind::RParen)?;
        self.analyze_condition(&cond)?;
        Ok(cond)
    }

    // Statements up to the closing curly, the opening one is already consumed
    fn parse_block_body(&mut self) -> Result<BlockStatement, ParseError> {
        let mut block = BlockStatement::default();
        while !self.maybe_want(TokenKind::RCurly) {
            if self.peek(0).is_none() {
                return Err(ParseError::UnexpectedEof {
                    expected: TokenKind::RCurly.to_string(),
                    pos: self.last,
                });
            }
            block.body.push(self.parse_statement()?);
        }
        Ok(block)
    }

    // Either a curly block or a single statement, in its own scope
    fn parse_scoped(&mut self, name: &str) -> Result<BlockStatement, ParseError> {
        self.symtab.push_scope(name);
        let block = if self.maybe_want(TokenKind::LCurly) {
            self.parse_block_body()
        } else {
            self.parse_statement().map(|stmt| BlockStatement { body: vec![stmt] })
        };
        self.symtab.pop_scope();
        block
    }

    fn parse_if(&mut self, pos: Position) -> Result<IfStatement, ParseError> {
        let cond = self.parse_condition()?;
        let consequent = self.parse_scoped("if")?;
        let mut stmt = IfStatement::new(cond, consequent, pos);

        if self.peek(0) == Some(TokenKind::Else) {
            self.next_token("'else'")?;
            if self.peek(0) == Some(TokenKind::If) {
                let if_pos = self.next_token("'if'")?.pos;
                stmt.set_alternate(Alternate::If(Box::new(self.parse_if(if_pos)?)));
            } else {
                stmt.set_alternate(Alternate::Block(self.parse_scoped("else")?));
            }
        }
        Ok(stmt)
    }

    fn parse_variable(&mut self, ty: Type, name: Rc<str>, pos: Position, access: Access)
            -> Result<VariableDeclaration, ParseError> {
        let mut init = None;
        if self.maybe_want(TokenKind::Assign) {
            let expr = self.parse_expression()?;
            self.check_narrowing(&ty, &expr)?;
            init = Some(expr);
        }
        self.want(TokenKind::Semicolon)?;
        self.declare(&name, &ty, pos)?;
        trace!(%name, %ty, "variable declaration");
        Ok(VariableDeclaration { ty: ty, name: name, init: init, access: access, pos: pos })
    }

    fn check_narrowing(&mut self, ty: &Type, init: &Expr) -> Result<(), ParseError> {
        if !init.is_constant() || matches!(ty, Type::Named(_) | Type::Str) {
            return Ok(());
        }
        let lit = init.evaluate()
            .map_err(|reason| ParseError::Constant { reason: reason, pos: init.pos() })?;
        if lit.ty.size() > ty.size() {
            self.note(Diagnostic::warning(init.pos(),
                format!("narrowing conversion from '{}' to '{}'", lit.ty, ty)));
        }
        Ok(())
    }

    fn parse_params(&mut self) -> Result<Vec<VariableDeclaration>, ParseError> {
        let mut params: Vec<VariableDeclaration> = Vec::new();
        self.want(TokenKind::LParen)?;
        while !self.maybe_want(TokenKind::RParen) {
            let ty = self.want_type()?;
            let (name, pos) = self.want_ident()?;
            let mut init = None;
            if self.maybe_want(TokenKind::Assign) {
                let expr = self.parse_expression()?;
                self.check_narrowing(&ty, &expr)?;
                init = Some(expr);
            } else if params.iter().any(|p| p.init.is_some()) {
                // Defaults are only allowed as a suffix
                return Err(ParseError::MissingDefault { name: name, pos: pos });
            }
            self.declare(&name, &ty, pos)?;
            params.push(VariableDeclaration {
                ty: ty,
                name: name,
                init: init,
                access: Access::Scoped,
                pos: pos,
            });
            if !self.maybe_want(TokenKind::Comma) {
                self.want(TokenKind::RParen)?;
                break;
            }
        }
        Ok(params)
    }

    fn parse_function(&mut self, return_type: Type, name: Rc<str>, pos: Position, access: Access)
            -> Result<FunctionDeclaration, ParseError> {
        self.declare(&name, &return_type, pos)?;
        self.symtab.push_scope(&name);
        let outer = self.function.replace((name.clone(), return_type.clone()));
        let params = self.parse_params();
        let body = params.and_then(|params| {
            self.want(TokenKind::LCurly)?;
            Ok((params, self.parse_block_body()?))
        });
        self.function = outer;
        self.symtab.pop_scope();
        let (params, body) = body?;

        debug!(%name, params = params.len(), statements = body.body.len(), "parsed function");
        Ok(FunctionDeclaration {
            return_type: return_type,
            name: name,
            params: params,
            body: body,
            access: access,
            pos: pos,
        })
    }

    // A void function returns nothing, every other function returns a value
    fn check_return(&self, has_value: bool, pos: Position) -> Result<(), ParseError> {
        match &self.function {
            Some((_, Type::Void)) if has_value => Err(ParseError::ReturnValueInVoid { pos: pos }),
            Some((name, ty)) if *ty != Type::Void && !has_value => {
                Err(ParseError::MissingReturnValue { name: name.clone(), pos: pos })
            },
            _ => Ok(()),
        }
    }

    fn parse_struct(&mut self, kind: AggregateKind) -> Result<StructDeclaration, ParseError> {
        let (name, pos) = self.want_ident()?;
        let existing = self.program.aggregate(AggregateKind::Struct, &name)
            .or_else(|| self.program.aggregate(AggregateKind::Class, &name))
            .map(|decl| decl.pos);
        if let Some(original) = existing {
            return Err(ParseError::Redefinition { name: name, pos: pos, original: original });
        }

        let access = match kind {
            AggregateKind::Struct => Access::Public,
            AggregateKind::Class => Access::Private,
        };
        let mut decl = StructDeclaration {
            kind: kind,
            name: name.clone(),
            members: Vec::new(),
            methods: Vec::new(),
            pos: pos,
        };

        self.want(TokenKind::LCurly)?;
        self.symtab.push_scope(&name);
        let result = self.parse_struct_body(&mut decl, access);
        self.symtab.pop_scope();
        result?;
        self.maybe_want(TokenKind::Semicolon);

        debug!(%name, members = decl.members.len(), methods = decl.methods.len(), "parsed aggregate");
        Ok(decl)
    }

    fn parse_struct_body(&mut self, decl: &mut StructDeclaration, mut access: Access)
            -> Result<(), ParseError> {
        while !self.maybe_want(TokenKind::RCurly) {
            // Access mode labels switch the mode for what follows
            let mode = match self.peek(0) {
                Some(TokenKind::Public)    => Some(Access::Public),
                Some(TokenKind::Protected) => Some(Access::Protected),
                Some(TokenKind::Private)   => Some(Access::Private),
                _ => None,
            };
            if let Some(mode) = mode {
                self.bump();
                self.want(TokenKind::Colon)?;
                access = mode;
                continue;
            }

            let ty = self.want_type()?;
            let (member, member_pos) = self.want_ident()?;
            if self.peek(0) == Some(TokenKind::LParen) {
                let method = self.parse_function(ty, member, member_pos, access)?;
                decl.methods.push(method);
            } else {
                let var = self.parse_variable(ty, member, member_pos, access)?;
                decl.members.push(var);
            }
        }
        Ok(())
    }

    fn parse_declaration(&mut self, access: Access) -> Result<Stmt, ParseError> {
        let ty = self.want_type()?;
        let (name, pos) = self.want_ident()?;
        match self.peek(0) {
            Some(TokenKind::LParen) if access == Access::Global => {
                Ok(Stmt::Function(self.parse_function(ty, name, pos, access)?))
            },
            Some(TokenKind::Assign | TokenKind::Semicolon) => {
                Ok(Stmt::Variable(self.parse_variable(ty, name, pos, access)?))
            },
            _ => {
                let tok = self.next_token("';' or '='")?;
                Err(unexpected("';' or '='", &tok))
            },
        }
    }

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        if self.at_type() {
            return self.parse_declaration(Access::Scoped);
        }
        match self.peek(0) {
            Some(TokenKind::LCurly) => {
                self.next_token("'{'")?;
                self.symtab.push_scope("block");
                let block = self.parse_block_body();
                self.symtab.pop_scope();
                Ok(Stmt::Block(block?))
            },
            Some(TokenKind::Return) => {
                let pos = self.next_token("'return'")?.pos;
                let value = if self.peek(0) == Some(TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.want(TokenKind::Semicolon)?;
                self.check_return(value.is_some(), pos)?;
                Ok(Stmt::Return(ReturnStatement { value: value, pos: pos }))
            },
            Some(TokenKind::If) => {
                let pos = self.next_token("'if'")?.pos;
                Ok(Stmt::If(self.parse_if(pos)?))
            },
            Some(TokenKind::While) => {
                let pos = self.next_token("'while'")?.pos;
                let cond = self.parse_condition()?;
                let body = self.parse_scoped("while")?;
                Ok(Stmt::While(WhileStatement { condition: cond, body: body, pos: pos }))
            },
            Some(TokenKind::Else) => {
                let pos = self.next_token("'else'")?.pos;
                Err(ParseError::ElseWithoutIf { pos: pos })
            },
            _ => {
                let expr = self.parse_expression()?;
                self.want(TokenKind::Semicolon)?;
                Ok(Stmt::Expr(expr))
            },
        }
    }

    fn parse_top_level(&mut self) -> Result<Stmt, ParseError> {
        match self.peek(0) {
            Some(TokenKind::Struct) => {
                self.next_token("'struct'")?;
                Ok(Stmt::Struct(self.parse_struct(AggregateKind::Struct)?))
            },
            Some(TokenKind::Class) => {
                self.next_token("'class'")?;
                Ok(Stmt::Struct(self.parse_struct(AggregateKind::Class)?))
            },
            Some(TokenKind::Else) => {
                let pos = self.next_token("'else'")?.pos;
                Err(ParseError::ElseWithoutIf { pos: pos })
            },
            _ if self.at_type() => self.parse_declaration(Access::Global),
            _ => {
                let tok = self.next_token("declaration")?;
                Err(unexpected("declaration", &tok))
            },
        }
    }

    /// Build the whole program, the first error aborts the parse
    pub fn parse(mut self) -> Result<Program, ParseError> {
        while self.peek(0).is_some() {
            let stmt = self.parse_top_level()?;
            self.program.body.push(stmt);
        }
        debug!(declarations = self.program.body.len(), "parsed program");
        Ok(self.program)
    }
}

fn unexpected(expected: &str, found: &Token) -> ParseError {
    ParseError::UnexpectedToken {
        expected: expected.into(),
        found: found.to_string(),
        pos: found.pos,
    }
}

fn unary(op: UnaryOp, operand: Expr, pos: Position) -> Expr {
    Expr::Unary(UnaryExpression {
        op: op,
        fixity: Fixity::Prefix,
        operand: Box::new(operand),
        pos: pos,
    })
}

fn is_assignable(expr: &Expr) -> bool {
    match expr {
        Expr::Ident(ident) => ident.assignable,
        Expr::Member(_) => true,
        _ => false,
    }
}

/// Parse a token stream into a program
pub fn parse(tokens: Vec<Token>, diagnostics: &mut Diagnostics) -> Result<Program, ParseError> {
    Parser::new(tokens, diagnostics).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Severity;
    use crate::lex::tokenize;

    fn parse_src(source: &str) -> (Result<Program, ParseError>, Diagnostics) {
        let mut diags = Diagnostics::new(false);
        let (tokens, lex_diags) = tokenize(source);
        diags.extend(lex_diags);
        let program = parse(tokens, &mut diags);
        (program, diags)
    }

    fn program(source: &str) -> Program {
        match parse_src(source).0 {
            Ok(program) => program,
            Err(err) => panic!("parse failed: {}", err),
        }
    }

    // Expression of the first statement in main
    fn main_expr(source: &str) -> Expr {
        let prog = program(source);
        let main = prog.find_function("main").unwrap();
        match main.body.body.last() {
            Some(Stmt::Expr(expr)) => expr.clone(),
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    // Render an expression tree with explicit grouping
    fn shape(expr: &Expr) -> String {
        match expr {
            Expr::Ident(ident) => ident.name.to_string(),
            Expr::Number(lit) => lit.value.clone(),
            Expr::Binary(bin) => {
                let op = match bin.op {
                    BinaryOp::Add => "+", BinaryOp::Sub => "-", BinaryOp::Mul => "*",
                    BinaryOp::Div => "/", BinaryOp::Lt => "<", BinaryOp::Gt => ">",
                    BinaryOp::Assign => "=", BinaryOp::AddAssign => "+=",
                    _ => "?",
                };
                format!("({} {} {})", shape(&bin.lhs), op, shape(&bin.rhs))
            },
            Expr::Unary(un) => format!("(u{:?} {})", un.op, shape(&un.operand)),
            _ => "?".into(),
        }
    }

    const DECLS: &str = "int main() { int a; int b; int c; int d; ";

    #[test]
    fn precedence_and_associativity() {
        let cases = [
            ("a + b * c;", "(a + (b * c))"),
            ("a * b + c;", "((a * b) + c)"),
            ("a - b - c;", "((a - b) - c)"),
            ("a + b * c - d;", "((a + (b * c)) - d)"),
            ("a < b + c;", "(a < (b + c))"),
            ("a = b = c + d;", "(a = (b = (c + d)))"),
            ("a += (b + c) * d;", "(a += ((b + c) * d))"),
            ("a * -3;", "(a * -3)"),
        ];
        for (src, expected) in cases {
            let expr = main_expr(&format!("{}{} }}", DECLS, src));
            assert_eq!(shape(&expr), expected, "{}", src);
        }
    }

    #[test]
    fn function_and_variable_disambiguation() {
        let prog = program("int g = 3; int main() { return g; }");
        assert!(matches!(prog.body[0], Stmt::Variable(_)));
        assert!(matches!(prog.body[1], Stmt::Function(_)));
        if let Stmt::Variable(var) = &prog.body[0] {
            assert_eq!(var.access, Access::Global);
        }
    }

    #[test]
    fn redefinition_names_original() {
        let (result, _) = parse_src("int main() {\n  int a;\n  int a;\n}");
        match result {
            Err(ParseError::Redefinition { name, pos, original }) => {
                assert_eq!(&*name, "a");
                assert_eq!((pos.line, original.line), (3, 2));
            },
            other => panic!("expected redefinition, got {:?}", other),
        }
    }

    #[test]
    fn shadowing_in_nested_block() {
        assert!(parse_src("int main() { int a; { int a; } }").0.is_ok());
    }

    #[test]
    fn undeclared_identifier() {
        let (result, _) = parse_src("int main() { a = 1; }");
        assert!(matches!(result, Err(ParseError::Undeclared { ref name, .. }) if &**name == "a"));
    }

    #[test]
    fn missing_default_argument() {
        let (result, _) = parse_src("int f(int a, int b = 2, int c) { return a; }");
        assert!(matches!(result, Err(ParseError::MissingDefault { ref name, .. }) if &**name == "c"));
        assert!(parse_src("int f(int a, int b = 2, int c = 3) { return a; }").0.is_ok());
    }

    #[test]
    fn return_matches_function_type() {
        let (result, _) = parse_src("void f() { return 1; } int main() {}");
        assert!(matches!(result, Err(ParseError::ReturnValueInVoid { .. })));
        let (result, _) = parse_src("int f() { return; }");
        assert!(matches!(result, Err(ParseError::MissingReturnValue { ref name, .. }) if &**name == "f"));
        let (result, _) = parse_src("struct S { void m() { return 2; } }; int main() {}");
        assert!(matches!(result, Err(ParseError::ReturnValueInVoid { .. })));
        assert!(parse_src("void f() { return; } int main() { return 0; }").0.is_ok());
    }

    #[test]
    fn else_without_if() {
        let (result, _) = parse_src("int main() { else { } }");
        assert!(matches!(result, Err(ParseError::ElseWithoutIf { .. })));
    }

    #[test]
    fn else_if_chains_as_alternate() {
        let prog = program("int main() { int a; if (a) { a = 1; } else if (a < 2) { a = 2; } else { a = 3; } }");
        let main = prog.find_function("main").unwrap();
        match &main.body.body[1] {
            Stmt::If(stmt) => match &stmt.alternate {
                Some(Alternate::If(inner)) => {
                    assert!(matches!(inner.alternate, Some(Alternate::Block(_))));
                },
                other => panic!("expected else-if, got {:?}", other),
            },
            other => panic!("expected if, got {:?}", other),
        }
    }

    #[test]
    fn narrowing_warning() {
        let (result, diags) = parse_src("int main() { char c = 300; long l = 1; }");
        assert!(result.is_ok());
        let warnings: Vec<_> = diags.iter().filter(|d| d.severity == Severity::Warning).collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].message, "narrowing conversion from 'int' to 'char'");
    }

    #[test]
    fn narrowing_escalates_with_werror() {
        let mut diags = Diagnostics::new(true);
        let (tokens, _) = tokenize("int main() { bool b = 10; }");
        assert!(parse(tokens, &mut diags).is_ok());
        assert_eq!(diags.error_count(), 1);
    }

    #[test]
    fn constant_condition_notes() {
        let (_, diags) = parse_src("int main() { if (1) { } if (2 - 2) { } while (1 < 2) { } }");
        let notes: Vec<_> = diags.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(notes, vec![
            "condition is always true",
            "condition is always false",
            "condition is always true",
        ]);
    }

    #[test]
    fn member_resolution() {
        let src = "struct Point { int x; int y; };
                   int main() { Point p; p.x = 1; return p.y; }";
        assert!(parse_src(src).0.is_ok());

        let missing = "struct Point { int x; };
                       int main() { Point p; return p.z; }";
        match parse_src(missing).0 {
            Err(ParseError::NoMember { member, aggregate, pos }) => {
                assert_eq!((&*member, &*aggregate), ("z", "Point"));
                assert_eq!(pos.line, 2);
            },
            other => panic!("expected missing member, got {:?}", other),
        }

        let scalar = "int main() { int p; return p.x; }";
        assert!(matches!(parse_src(scalar).0, Err(ParseError::NotAStructure { .. })));
    }

    #[test]
    fn class_access_modes() {
        let prog = program("class Counter { int count; public: int step; int get() { return count; } };");
        match &prog.body[0] {
            Stmt::Struct(decl) => {
                assert_eq!(decl.kind, AggregateKind::Class);
                assert_eq!(decl.members[0].access, Access::Private);
                assert_eq!(decl.members[1].access, Access::Public);
                assert_eq!(decl.methods[0].access, Access::Public);
            },
            other => panic!("expected class, got {:?}", other),
        }
    }

    #[test]
    fn literal_is_not_assignable() {
        assert!(matches!(parse_src("int main() { 5 = 3; }").0, Err(ParseError::NotAssignable { .. })));
        assert!(matches!(parse_src("int main() { int a; (a + 1)++; }").0,
            Err(ParseError::NotAssignable { .. })));
    }

    #[test]
    fn unexpected_end_of_file() {
        assert!(matches!(parse_src("int main() { int a = 1;").0, Err(ParseError::UnexpectedEof { .. })));
    }

    #[test]
    fn empty_program() {
        let (result, diags) = parse_src("");
        assert_eq!(result, Ok(Program::default()));
        assert!(diags.is_empty());
    }
}
