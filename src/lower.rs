// SPDX-License-Identifier: GPL-2.0-only

//
// AST to IL lowering
//

use crate::ast::{self,Alternate,BinaryOp,Expr,Stmt,UnaryOp,Fixity};
use crate::error::LowerError;
use crate::il::*;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug,trace};

fn not_implemented(what: impl Into<String>) -> LowerError {
    LowerError::NotImplemented(what.into())
}

fn slot_type(ty: &ast::Type) -> Result<Ty, LowerError> {
    match Ty::from_ast(ty) {
        Some(Ty::Void) => Err(LowerError::NotReachable("storage of type void".into())),
        Some(ty) => Ok(ty),
        None => Err(not_implemented(format!("storage of aggregate type '{}'", ty))),
    }
}

// Constant re-typed for a destination, integers wrap to the destination width
fn retype_constant(value: &str, from: Ty, to: Ty) -> Result<Value, LowerError> {
    if from == to {
        return Ok(Value::constant(to, value));
    }
    if to.is_floating() {
        let real = value.parse::<f64>()
            .map_err(|_| LowerError::NotReachable(format!("malformed constant '{}'", value)))?;
        return Ok(Value::constant(to, format!("{:?}", real)));
    }
    let int = if from.is_floating() {
        value.parse::<f64>().map(|v| v as i64).ok()
    } else {
        value.parse::<i64>().ok()
    };
    let int = int.ok_or_else(|| LowerError::NotReachable(format!("malformed constant '{}'", value)))?;
    let wrapped = match to {
        Ty::I1  => (int != 0) as i64,
        Ty::I8  => int as i8 as i64,
        Ty::I16 => int as i16 as i64,
        Ty::I32 => int as i32 as i64,
        _ => int,
    };
    Ok(Value::constant(to, wrapped.to_string()))
}

//
// Lower a function body into basic blocks
//

pub struct FuncLower<'a> {
    func: Function,
    // Identifier to storage mapping, innermost scope last
    scopes: Vec<HashMap<Rc<str>, Rc<Variable>>>,
    // Storage of global variables
    globals: &'a HashMap<Rc<str>, Rc<Variable>>,
}

impl<'a> FuncLower<'a> {
    pub fn new(decl: &ast::FunctionDeclaration, globals: &'a HashMap<Rc<str>, Rc<Variable>>)
            -> Result<Self, LowerError> {
        let return_type = Ty::from_ast(&decl.return_type)
            .ok_or_else(|| not_implemented("aggregate return types"))?;
        let mut params = Vec::new();
        for param in &decl.params {
            params.push((param.name.clone(), slot_type(&param.ty)?));
        }
        Ok(FuncLower {
            func: Function::new(decl.name.clone(), return_type, params),
            scopes: vec![HashMap::new()],
            globals: globals,
        })
    }

    fn lookup(&self, name: &Rc<str>) -> Result<Rc<Variable>, LowerError> {
        self.scopes.iter().rev()
            .find_map(|scope| scope.get(name))
            .or_else(|| self.globals.get(name))
            .cloned()
            .ok_or_else(|| LowerError::UnknownIdentifier(name.clone()))
    }

    fn slot_ty(var: &Variable) -> Result<Ty, LowerError> {
        var.slot_ty().ok_or_else(|| LowerError::NotReachable(format!("'{}' is not a stack slot", var.name)))
    }

    //
    // Emission helpers
    //

    fn emit(&mut self, body: Body) {
        // Code following a terminator gets a block of its own
        if self.func.current_block().map_or(false, LogicalBlock::terminated) {
            let label = self.func.unique_name("unreachable");
            self.func.append_block(label);
        }
        self.func.current_block_mut().body.push(body);
    }

    fn temporary(&mut self, allocation: Allocation) -> Value {
        let attributes = match &allocation {
            Allocation::Load { ty, .. } => vec![Attribute::Align(ty.size())],
            _ => Vec::new(),
        };
        let var = Rc::new(Variable {
            name: self.func.next_unnamed(),
            visibility: Visibility::Local,
            attributes: attributes,
            allocation: allocation,
            temporary: true,
        });
        self.emit(Body::VariableDef(var.clone()));
        Value::Variable(var)
    }

    fn alloca(&mut self, name: &str, ty: Ty) -> Rc<Variable> {
        let var = Rc::new(Variable {
            name: self.func.unique_name(name),
            visibility: Visibility::Local,
            attributes: vec![Attribute::Align(ty.size())],
            allocation: Allocation::Alloca { ty: ty },
            temporary: false,
        });
        self.emit(Body::VariableDef(var.clone()));
        var
    }

    fn load(&mut self, var: &Rc<Variable>) -> Result<Value, LowerError> {
        let ty = Self::slot_ty(var)?;
        Ok(self.temporary(Allocation::Load { ty: ty, source: var.clone() }))
    }

    fn store(&mut self, value: Value, target: &Rc<Variable>) -> Result<Value, LowerError> {
        let value = self.convert(value, Self::slot_ty(target)?)?;
        self.emit(Body::Store { value: value.clone(), target: target.clone() });
        Ok(value)
    }

    // Branch to a label unless the block already ended
    fn branch_to(&mut self, label: &Rc<str>) {
        if !self.func.current_block().map_or(false, LogicalBlock::terminated) {
            self.emit(Body::Branch(Branch::Unconditional(label.clone())));
        }
    }

    /// Convert a value to another type with trunc/sext/zext
    fn convert(&mut self, value: Value, ty: Ty) -> Result<Value, LowerError> {
        let from = value.ty();
        if from == ty {
            return Ok(value);
        }
        if let Value::Constant { value, .. } = &value {
            return retype_constant(value, from, ty);
        }
        if from.is_floating() || ty.is_floating() {
            return Err(not_implemented(format!("conversion from {} to {}", from, ty)));
        }
        if ty == Ty::I1 {
            return Ok(self.temporary(Allocation::ICmp {
                pred: Predicate::Ne,
                rhs: Value::constant(from, "0"),
                lhs: value,
            }));
        }
        let op = if ty.bits() < from.bits() {
            CastOp::Trunc
        } else if from == Ty::I1 {
            CastOp::ZExt
        } else {
            CastOp::SExt
        };
        Ok(self.temporary(Allocation::Cast { op: op, value: value, ty: ty }))
    }

    //
    // Expressions
    //

    // Common type of two arithmetic operands, booleans promote to i32
    fn arith_type(lhs: Ty, rhs: Ty) -> Ty {
        let widest = if lhs.size() >= rhs.size() { lhs } else { rhs };
        match widest {
            Ty::I1 | Ty::I8 | Ty::I16 => Ty::I32,
            ty => ty,
        }
    }

    fn arith(&mut self, op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, LowerError> {
        let ty = Self::arith_type(lhs.ty(), rhs.ty());
        if ty.is_floating() {
            return Err(not_implemented("floating point arithmetic"));
        }
        if ty == Ty::Ptr {
            return Err(not_implemented("pointer arithmetic"));
        }
        let lhs = self.convert(lhs, ty)?;
        let rhs = self.convert(rhs, ty)?;

        let allocation = if let Some(pred) = Predicate::from_op(op) {
            Allocation::ICmp { pred: pred, lhs: lhs, rhs: rhs }
        } else {
            match op {
                BinaryOp::Add => Allocation::Add { ty: ty, lhs: lhs, rhs: rhs },
                BinaryOp::Sub => Allocation::Sub { ty: ty, lhs: lhs, rhs: rhs },
                BinaryOp::Mul => Allocation::Mul { ty: ty, lhs: lhs, rhs: rhs },
                BinaryOp::Div => Allocation::SDiv { ty: ty, lhs: lhs, rhs: rhs },
                op => return Err(LowerError::NotReachable(format!("{:?} is not arithmetic", op))),
            }
        };
        Ok(self.temporary(allocation))
    }

    fn target(&self, expr: &Expr) -> Result<Rc<Variable>, LowerError> {
        match expr {
            Expr::Ident(ident) => self.lookup(&ident.name),
            Expr::Member(_) => Err(not_implemented("member assignment")),
            _ => Err(LowerError::NotReachable("assignment to a non-lvalue".into())),
        }
    }

    fn lower_binary(&mut self, bin: &ast::BinaryExpression) -> Result<Value, LowerError> {
        if bin.constant {
            let lit = bin.evaluate()?;
            return self.lower_literal(&lit);
        }

        if bin.op == BinaryOp::Assign {
            let target = self.target(&bin.lhs)?;
            let value = self.lower_expr(&bin.rhs)?;
            return self.store(value, &target);
        }

        // Load-modify-store
        if let Some(base) = bin.op.compound_base() {
            let target = self.target(&bin.lhs)?;
            let current = self.load(&target)?;
            let rhs = if bin.operands_match {
                current.clone()
            } else {
                self.lower_expr(&bin.rhs)?
            };
            let result = self.arith(base, current, rhs)?;
            return self.store(result, &target);
        }

        let lhs = self.lower_expr(&bin.lhs)?;
        let rhs = if bin.operands_match {
            lhs.clone()
        } else {
            self.lower_expr(&bin.rhs)?
        };
        self.arith(bin.op, lhs, rhs)
    }

    fn lower_unary(&mut self, un: &ast::UnaryExpression) -> Result<Value, LowerError> {
        match un.op {
            UnaryOp::Plus | UnaryOp::Minus => {
                let operand = self.lower_expr(&un.operand)?;
                let zero = Value::constant(operand.ty(), "0");
                let op = if un.op == UnaryOp::Plus { BinaryOp::Add } else { BinaryOp::Sub };
                self.arith(op, zero, operand)
            },
            UnaryOp::Not => {
                let operand = self.lower_expr(&un.operand)?;
                Ok(self.temporary(Allocation::ICmp {
                    pred: Predicate::Eq,
                    rhs: Value::constant(operand.ty(), "0"),
                    lhs: operand,
                }))
            },
            UnaryOp::Incr | UnaryOp::Decr => {
                let target = match &*un.operand {
                    Expr::Ident(ident) => self.lookup(&ident.name)?,
                    _ => return Err(not_implemented("increment of a non-identifier")),
                };
                let old = self.load(&target)?;
                let one = Value::constant(old.ty(), "1");
                let op = if un.op == UnaryOp::Incr { BinaryOp::Add } else { BinaryOp::Sub };
                let new = self.arith(op, old.clone(), one)?;
                let new = self.store(new, &target)?;
                match un.fixity {
                    Fixity::Prefix => Ok(new),
                    Fixity::Postfix => Ok(old),
                }
            },
        }
    }

    fn lower_literal(&mut self, lit: &ast::NumberLiteral) -> Result<Value, LowerError> {
        let ty = Ty::from_ast(&lit.ty)
            .ok_or_else(|| LowerError::NotReachable("literal of aggregate type".into()))?;
        Ok(Value::constant(ty, lit.value.clone()))
    }

    pub fn lower_expr(&mut self, expr: &Expr) -> Result<Value, LowerError> {
        match expr {
            Expr::Number(lit) => self.lower_literal(lit),
            Expr::Ident(ident) => {
                let var = self.lookup(&ident.name)?;
                self.load(&var)
            },
            Expr::Binary(bin) => self.lower_binary(bin),
            Expr::Unary(un) => self.lower_unary(un),
            Expr::Str(_) => Err(not_implemented("string literals")),
            Expr::Member(_) => Err(not_implemented("member expressions")),
        }
    }

    fn lower_condition(&mut self, expr: &Expr) -> Result<Value, LowerError> {
        let value = self.lower_expr(expr)?;
        self.convert(value, Ty::I1)
    }

    //
    // Statements
    //

    fn lower_block(&mut self, block: &ast::BlockStatement) -> Result<(), LowerError> {
        self.scopes.push(HashMap::new());
        let result = block.body.iter().try_for_each(|stmt| self.lower_stmt(stmt));
        self.scopes.pop();
        result
    }

    fn lower_alternate(&mut self, alternate: &Alternate) -> Result<(), LowerError> {
        match alternate {
            Alternate::Block(block) => self.lower_block(block),
            Alternate::If(stmt) => self.lower_if(stmt),
        }
    }

    fn lower_if(&mut self, stmt: &ast::IfStatement) -> Result<(), LowerError> {
        // Literal conditions only lower the taken arm
        if stmt.condition.is_constant() {
            let taken = !stmt.condition.evaluate()?.is_zero()?;
            trace!(taken, "constant if condition");
            return match (&stmt.alternate, taken) {
                (_, true) => self.lower_block(&stmt.consequent),
                (Some(alternate), false) => self.lower_alternate(alternate),
                (None, false) => Ok(()),
            };
        }

        let cond = self.lower_condition(&stmt.condition)?;
        let then_label = self.func.unique_name("if.then");
        let else_label = stmt.alternate.as_ref().map(|_| self.func.unique_name("if.else"));
        let end_label = self.func.unique_name("if.end");

        self.emit(Body::Branch(Branch::Conditional {
            cond: cond,
            then: then_label.clone(),
            otherwise: else_label.clone().unwrap_or_else(|| end_label.clone()),
        }));

        self.func.append_block(then_label);
        self.lower_block(&stmt.consequent)?;
        self.branch_to(&end_label);

        if let (Some(alternate), Some(else_label)) = (&stmt.alternate, else_label) {
            self.func.append_block(else_label);
            self.lower_alternate(alternate)?;
            self.branch_to(&end_label);
        }

        self.func.append_block(end_label);
        Ok(())
    }

    fn lower_while(&mut self, stmt: &ast::WhileStatement) -> Result<(), LowerError> {
        if stmt.condition.is_constant() && stmt.condition.evaluate()?.is_zero()? {
            return Ok(());
        }

        let cond_label = self.func.unique_name("while.cond");
        let body_label = self.func.unique_name("while.body");
        let end_label = self.func.unique_name("while.end");

        self.branch_to(&cond_label);
        self.func.append_block(cond_label.clone());
        let cond = self.lower_condition(&stmt.condition)?;
        self.emit(Body::Branch(Branch::Conditional {
            cond: cond,
            then: body_label.clone(),
            otherwise: end_label.clone(),
        }));

        self.func.append_block(body_label);
        self.lower_block(&stmt.body)?;
        self.branch_to(&cond_label);

        self.func.append_block(end_label);
        Ok(())
    }

    fn lower_return(&mut self, stmt: &ast::ReturnStatement) -> Result<(), LowerError> {
        let value = match &stmt.value {
            Some(expr) => {
                let value = self.lower_expr(expr)?;
                Some(self.convert(value, self.func.return_type)?)
            },
            None => None,
        };
        // Additional return points get their own block
        if self.func.current_block().map_or(false, LogicalBlock::returned) {
            let label = self.func.unique_name("return");
            self.func.append_block(label);
        }
        self.emit(Body::Return(value));
        Ok(())
    }

    fn lower_variable(&mut self, decl: &ast::VariableDeclaration) -> Result<(), LowerError> {
        let ty = slot_type(&decl.ty)?;
        let var = self.alloca(&decl.name, ty);
        if let Some(init) = &decl.init {
            let value = self.lower_expr(init)?;
            self.store(value, &var)?;
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(decl.name.clone(), var);
        }
        Ok(())
    }

    fn lower_stmt(&mut self, stmt: &Stmt) -> Result<(), LowerError> {
        match stmt {
            Stmt::Block(block) => self.lower_block(block),
            Stmt::If(stmt) => self.lower_if(stmt),
            Stmt::While(stmt) => self.lower_while(stmt),
            Stmt::Return(stmt) => self.lower_return(stmt),
            Stmt::Variable(decl) => self.lower_variable(decl),
            Stmt::Expr(expr) => self.lower_expr(expr).map(|_| ()),
            Stmt::Function(_) | Stmt::Struct(_) => {
                Err(LowerError::NotReachable("nested declaration".into()))
            },
        }
    }

    pub fn lower(mut self, decl: &ast::FunctionDeclaration) -> Result<Function, LowerError> {
        // Spill parameters into stack slots
        for param in &decl.params {
            let ty = slot_type(&param.ty)?;
            let slot = self.alloca(&format!("{}.addr", param.name), ty);
            self.emit(Body::Store {
                value: Value::Argument { ty: ty, name: param.name.clone() },
                target: slot.clone(),
            });
            if let Some(scope) = self.scopes.last_mut() {
                scope.insert(param.name.clone(), slot);
            }
        }

        // Body shares the parameter scope
        for stmt in &decl.body.body {
            self.lower_stmt(stmt)?;
        }

        if !self.func.current_block().map_or(false, LogicalBlock::terminated) {
            let value = match self.func.return_type {
                Ty::Void => None,
                ty => Some(Value::constant(ty, if ty.is_floating() { "0.0" } else { "0" })),
            };
            self.emit(Body::Return(value));
        }

        debug!(name = %self.func.name, blocks = self.func.blocks.len(), "lowered function");
        Ok(self.func)
    }
}

fn lower_global(decl: &ast::VariableDeclaration) -> Result<Global, LowerError> {
    let ty = slot_type(&decl.ty)?;
    let init = match &decl.init {
        Some(expr) if expr.is_constant() => {
            let lit = expr.evaluate()?;
            let from = Ty::from_ast(&lit.ty)
                .ok_or_else(|| LowerError::NotReachable("literal of aggregate type".into()))?;
            Some(retype_constant(&lit.value, from, ty)?)
        },
        Some(_) => return Err(not_implemented("non-constant global initializer")),
        None => None,
    };
    let var = Rc::new(Variable {
        name: decl.name.clone(),
        visibility: Visibility::Global,
        attributes: vec![Attribute::Align(ty.size())],
        allocation: Allocation::Alloca { ty: ty },
        temporary: false,
    });
    Ok(Global { var: var, init: init })
}

/// Lower a single function of a program
pub fn lower_function(program: &ast::Program, decl: &ast::FunctionDeclaration)
        -> Result<Function, LowerError> {
    let mut globals = HashMap::new();
    for var in program.globals() {
        globals.insert(var.name.clone(), lower_global(var)?.var);
    }
    FuncLower::new(decl, &globals)?.lower(decl)
}

/// Lower every global and function of a program
pub fn lower_program(program: &ast::Program) -> Result<Module, LowerError> {
    let mut module = Module::default();
    let mut globals = HashMap::new();
    for var in program.globals() {
        let global = lower_global(var)?;
        globals.insert(var.name.clone(), global.var.clone());
        module.globals.push(global);
    }
    for decl in program.functions() {
        module.functions.push(FuncLower::new(decl, &globals)?.lower(decl)?);
    }
    Ok(module)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Diagnostics;
    use crate::lex::tokenize;
    use crate::parser::parse;

    fn lower_main(source: &str) -> Function {
        let (tokens, _) = tokenize(source);
        let mut diags = Diagnostics::new(false);
        let program = parse(tokens, &mut diags).unwrap();
        let main = program.find_function("main").unwrap();
        lower_function(&program, main).unwrap()
    }

    fn lines(block: &LogicalBlock) -> Vec<String> {
        block.body.iter().map(|body| body.to_string()).collect()
    }

    #[test]
    fn arithmetic() {
        let func = lower_main("int main() { int a = 10; int b = a + 10; }");
        assert_eq!(func.blocks.len(), 1);
        assert_eq!(lines(&func.blocks[0]), vec![
            "%a = alloca i32, align 4",
            "store i32 10, ptr %a, align 4",
            "%b = alloca i32, align 4",
            "%0 = load i32, ptr %a, align 4",
            "%1 = add nsw i32 %0, 10",
            "store i32 %1, ptr %b, align 4",
            "ret i32 0",
        ]);
    }

    #[test]
    fn constant_subexpressions_fold() {
        let func = lower_main("int main() { return 2 * 3 + 4; }");
        assert_eq!(lines(&func.blocks[0]), vec!["ret i32 10"]);
    }

    #[test]
    fn compound_assignment_is_load_modify_store() {
        let func = lower_main("int main() { int a = 1; a += 2; return a; }");
        assert_eq!(lines(&func.blocks[0])[2..5], [
            "%0 = load i32, ptr %a, align 4",
            "%1 = add nsw i32 %0, 2",
            "store i32 %1, ptr %a, align 4",
        ]);
    }

    #[test]
    fn if_else_blocks() {
        let func = lower_main("int main() { int a = 1; if (a < 2) { a = 3; } else { a = 4; } return a; }");
        let labels: Vec<&str> = func.blocks.iter().map(|b| &*b.label).collect();
        assert_eq!(labels, vec!["entry", "if.then", "if.else", "if.end"]);
        assert_eq!(lines(&func.blocks[0]).last().map(String::as_str),
            Some("br i1 %1, label %if.then, label %if.else"));
        assert_eq!(lines(&func.blocks[1]).last().map(String::as_str), Some("br label %if.end"));
        assert_eq!(lines(&func.blocks[2]).last().map(String::as_str), Some("br label %if.end"));
    }

    #[test]
    fn else_if_nests_inside_else_block() {
        let func = lower_main("int main() { int a; if (a < 1) { a = 1; } else if (a < 2) { a = 2; } else { a = 3; } return a; }");
        let labels: Vec<&str> = func.blocks.iter().map(|b| &*b.label).collect();
        assert_eq!(labels, vec!["entry", "if.then", "if.else", "if.then1", "if.else1", "if.end1", "if.end"]);
        let last = |i: usize| lines(&func.blocks[i]).last().cloned().unwrap();
        assert_eq!(last(1), "br label %if.end");
        assert!(last(2).ends_with("label %if.then1, label %if.else1"), "{}", last(2));
        assert_eq!(last(3), "br label %if.end1");
        assert_eq!(last(4), "br label %if.end1");
        // The inner join falls through to the outer one
        assert_eq!(lines(&func.blocks[5]), vec!["br label %if.end"]);
        assert!(last(6).starts_with("ret i32"));
    }

    #[test]
    fn repeated_labels_are_suffixed() {
        let func = lower_main("int main() { int a; if (a) { a = 1; } if (a) { a = 2; } }");
        let labels: Vec<&str> = func.blocks.iter().map(|b| &*b.label).collect();
        assert_eq!(labels, vec!["entry", "if.then", "if.end", "if.then1", "if.end1"]);
    }

    #[test]
    fn literal_condition_is_not_branched() {
        let func = lower_main("int main() { int a; if (1) { a = 1; } else { a = 2; } }");
        assert_eq!(func.blocks.len(), 1);
        assert!(lines(&func.blocks[0]).contains(&"store i32 1, ptr %a, align 4".to_string()));
        assert!(!lines(&func.blocks[0]).contains(&"store i32 2, ptr %a, align 4".to_string()));
    }

    #[test]
    fn multiple_returns() {
        let func = lower_main("int main() { return 1; return 2; }");
        let labels: Vec<&str> = func.blocks.iter().map(|b| &*b.label).collect();
        assert_eq!(labels, vec!["entry", "return"]);
        assert_eq!(lines(&func.blocks[1]), vec!["ret i32 2"]);
    }

    #[test]
    fn no_branch_after_return() {
        let func = lower_main("int main() { int a; if (a) { return 1; } return 0; }");
        assert_eq!(lines(&func.blocks[1]), vec!["ret i32 1"]);
    }

    #[test]
    fn while_loop() {
        let func = lower_main("int main() { int i = 0; while (i < 10) { i++; } return i; }");
        let labels: Vec<&str> = func.blocks.iter().map(|b| &*b.label).collect();
        assert_eq!(labels, vec!["entry", "while.cond", "while.body", "while.end"]);
        assert_eq!(lines(&func.blocks[2]).last().map(String::as_str), Some("br label %while.cond"));
    }

    #[test]
    fn widening_and_boolean_conversion() {
        let func = lower_main("int main() { char c = 1; long l = c; bool b = l; }");
        let body = lines(&func.blocks[0]);
        assert!(body.contains(&"%1 = sext i8 %0 to i64".to_string()));
        assert!(body.contains(&"%3 = icmp ne i64 %2, 0".to_string()));
    }

    #[test]
    fn parameters_are_spilled() {
        let (tokens, _) = tokenize("int add(int x, int y) { return x + y; }");
        let program = parse(tokens, &mut Diagnostics::new(false)).unwrap();
        let func = lower_function(&program, program.find_function("add").unwrap()).unwrap();
        assert_eq!(lines(&func.blocks[0])[..2], [
            "%x.addr = alloca i32, align 4",
            "store i32 %x, ptr %x.addr, align 4",
        ]);
    }

    #[test]
    fn member_expressions_are_not_implemented() {
        let (tokens, _) = tokenize("struct P { int x; }; int main() { P p; return 0; }");
        let program = parse(tokens, &mut Diagnostics::new(false)).unwrap();
        let err = lower_function(&program, program.find_function("main").unwrap()).unwrap_err();
        assert!(matches!(err, LowerError::NotImplemented(_)));
    }
}
