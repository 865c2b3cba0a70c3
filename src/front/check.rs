//! Semantic checking: duplicate names, undefined references, signature and
//! arity mismatches, missing definitions, `break`/`continue` outside a loop,
//! and indexing a non-array. `middle::lower` only ever sees a `CheckedProgram`
//! — the type system enforces spec.md §4.2.7's "lowering assumes a checked
//! AST" invariant.

use thiserror::Error;

use crate::common::{Id, Map};

use super::ast::*;

#[derive(Debug, Error)]
pub enum CheckError {
    #[error("identifier '{0}' is already declared in this scope")]
    DuplicateName(Id),
    #[error("use of undeclared identifier '{0}'")]
    UnknownIdentifier(Id),
    #[error("call to undeclared function '{0}'")]
    UnknownFunction(Id),
    #[error("redeclaration of function '{0}' does not match its previous signature")]
    SignatureMismatch(Id),
    #[error("redefinition of function '{0}'")]
    Redefinition(Id),
    #[error("function '{name}' expects {expected} argument(s), found {given}")]
    ArityMismatch { name: Id, expected: usize, given: usize },
    #[error("'break' statement not within a loop")]
    BreakOutsideLoop,
    #[error("'continue' statement not within a loop")]
    ContinueOutsideLoop,
    #[error("'{0}' is not an array and cannot be indexed")]
    NotAnArray(Id),
    #[error("initializer for global '{0}' is not a compile-time constant")]
    NonConstantInitializer(Id),
}

/// Marker wrapping a `Program` that has passed [`check`]. The only way to
/// build one is through a successful check, so `middle::lower` can require
/// it as an argument type instead of re-validating.
pub struct CheckedProgram(Program);

impl CheckedProgram {
    pub fn program(&self) -> &Program {
        &self.0
    }

    pub fn into_inner(self) -> Program {
        self.0
    }
}

#[derive(Clone)]
struct Sig {
    params: Vec<Type>,
    defined: bool,
}

/// A checked variable binding: just enough to know whether `name` is an
/// array (and may be indexed) or a scalar.
#[derive(Clone, Copy)]
struct Binding {
    is_array: bool,
}

struct Checker {
    functions: Map<Id, Sig>,
    scopes: Vec<Map<Id, Binding>>,
    loop_depth: u32,
}

pub fn check(program: Program) -> Result<CheckedProgram, CheckError> {
    let mut c = Checker {
        functions: Map::new(),
        scopes: vec![Map::new()],
        loop_depth: 0,
    };
    for item in &program.items {
        c.check_item(item)?;
    }
    Ok(CheckedProgram(program))
}

impl Checker {
    fn declare(&mut self, name: Id, is_array: bool) -> Result<(), CheckError> {
        let scope = self.scopes.last_mut().expect("scope stack is never empty");
        if scope.contains_key(&name) {
            return Err(CheckError::DuplicateName(name));
        }
        scope.insert(name, Binding { is_array });
        Ok(())
    }

    fn lookup(&self, name: Id) -> Option<Binding> {
        self.scopes.iter().rev().find_map(|s| s.get(&name).copied())
    }

    fn check_item(&mut self, item: &Item) -> Result<(), CheckError> {
        match item {
            Item::Function(f) => self.check_function(f),
            Item::Declaration(d) => {
                self.declare(d.var.name, d.var.is_array())?;
                if let Some(init) = &d.init {
                    self.check_expr(init)?;
                    if !d.var.is_array() && init.const_eval().is_none() {
                        return Err(CheckError::NonConstantInitializer(d.var.name));
                    }
                }
                Ok(())
            }
        }
    }

    fn check_function(&mut self, f: &Function) -> Result<(), CheckError> {
        let params: Vec<Type> = f.params.iter().map(|p| p.ty).collect();
        let already_defined = if let Some(existing) = self.functions.get(&f.name) {
            if existing.params != params {
                return Err(CheckError::SignatureMismatch(f.name));
            }
            if f.body.is_some() && existing.defined {
                return Err(CheckError::Redefinition(f.name));
            }
            existing.defined
        } else {
            false
        };
        self.functions.insert(f.name, Sig { params, defined: f.body.is_some() || already_defined });

        let Some(body) = &f.body else { return Ok(()) };

        self.scopes.push(Map::new());
        for p in &f.params {
            self.declare(p.name, !p.dims.is_empty())?;
        }
        self.check_block(body)?;
        self.scopes.pop();
        Ok(())
    }

    fn check_block(&mut self, block: &Block) -> Result<(), CheckError> {
        self.scopes.push(Map::new());
        for item in &block.0 {
            match item {
                BlockItem::Decl(d) => {
                    self.declare(d.var.name, d.var.is_array())?;
                    if let Some(init) = &d.init {
                        self.check_expr(init)?;
                    }
                }
                BlockItem::Stmt(s) => self.check_stmt(s)?,
            }
        }
        self.scopes.pop();
        Ok(())
    }

    fn check_stmt(&mut self, stmt: &Stmt) -> Result<(), CheckError> {
        match stmt {
            Stmt::Return(e) | Stmt::Expr(e) => {
                if let Some(e) = e {
                    self.check_expr(e)?;
                }
                Ok(())
            }
            Stmt::If { cond, then_branch, else_branch } => {
                self.check_expr(cond)?;
                self.check_stmt(then_branch)?;
                if let Some(e) = else_branch {
                    self.check_stmt(e)?;
                }
                Ok(())
            }
            Stmt::Block(b) => self.check_block(b),
            Stmt::While { cond, body } => {
                self.check_expr(cond)?;
                self.loop_depth += 1;
                let r = self.check_stmt(body);
                self.loop_depth -= 1;
                r
            }
            Stmt::DoWhile { body, cond } => {
                self.loop_depth += 1;
                let r = self.check_stmt(body);
                self.loop_depth -= 1;
                r?;
                self.check_expr(cond)
            }
            Stmt::ForExpr { init, cond, update, body } => {
                if let Some(e) = init {
                    self.check_expr(e)?;
                }
                if let Some(e) = cond {
                    self.check_expr(e)?;
                }
                if let Some(e) = update {
                    self.check_expr(e)?;
                }
                self.loop_depth += 1;
                let r = self.check_stmt(body);
                self.loop_depth -= 1;
                r
            }
            Stmt::ForDecl { init, cond, update, body } => {
                self.scopes.push(Map::new());
                self.declare(init.var.name, init.var.is_array())?;
                if let Some(e) = &init.init {
                    self.check_expr(e)?;
                }
                if let Some(e) = cond {
                    self.check_expr(e)?;
                }
                if let Some(e) = update {
                    self.check_expr(e)?;
                }
                self.loop_depth += 1;
                let r = self.check_stmt(body);
                self.loop_depth -= 1;
                self.scopes.pop();
                r
            }
            Stmt::Break => {
                if self.loop_depth == 0 {
                    Err(CheckError::BreakOutsideLoop)
                } else {
                    Ok(())
                }
            }
            Stmt::Continue => {
                if self.loop_depth == 0 {
                    Err(CheckError::ContinueOutsideLoop)
                } else {
                    Ok(())
                }
            }
        }
    }

    fn check_expr(&mut self, expr: &Expr) -> Result<(), CheckError> {
        match expr {
            Expr::Int(_) => Ok(()),
            Expr::Var(name) => {
                self.lookup(*name).ok_or(CheckError::UnknownIdentifier(*name))?;
                Ok(())
            }
            Expr::Unary { rhs, .. } => self.check_expr(rhs),
            Expr::Binary { lhs, rhs, .. } => {
                self.check_expr(lhs)?;
                self.check_expr(rhs)
            }
            Expr::Assign { lhs, rhs } => {
                self.check_expr(lhs)?;
                self.check_expr(rhs)
            }
            Expr::Call { func, args } => {
                let sig = self.functions.get(func).ok_or(CheckError::UnknownFunction(*func))?;
                if sig.params.len() != args.len() {
                    return Err(CheckError::ArityMismatch {
                        name: *func,
                        expected: sig.params.len(),
                        given: args.len(),
                    });
                }
                for a in args {
                    self.check_expr(a)?;
                }
                Ok(())
            }
            Expr::Index { array, indices } => {
                let binding = self.lookup(*array).ok_or(CheckError::UnknownIdentifier(*array))?;
                if !binding.is_array {
                    return Err(CheckError::NotAnArray(*array));
                }
                for i in indices {
                    self.check_expr(i)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::front::parse;

    fn check_src(src: &str) -> Result<CheckedProgram, CheckError> {
        check(parse(src).unwrap())
    }

    #[test]
    fn accepts_fib() {
        assert!(check_src(
            "int fib(int n){if(n<2)return n; return fib(n-1)+fib(n-2);} int main(){return fib(10);}"
        )
        .is_ok());
    }

    #[test]
    fn rejects_duplicate_name_in_same_scope() {
        let err = check_src("int main(){int x=1; int x=2; return x;}").unwrap_err();
        assert!(matches!(err, CheckError::DuplicateName(_)));
    }

    #[test]
    fn allows_shadowing_in_nested_scope() {
        assert!(check_src("int main(){int x=1; { int x=2; } return x;}").is_ok());
    }

    #[test]
    fn rejects_unknown_identifier() {
        let err = check_src("int main(){return y;}").unwrap_err();
        assert!(matches!(err, CheckError::UnknownIdentifier(_)));
    }

    #[test]
    fn rejects_break_outside_loop() {
        let err = check_src("int main(){break; return 0;}").unwrap_err();
        assert!(matches!(err, CheckError::BreakOutsideLoop));
    }

    #[test]
    fn accepts_break_inside_nested_block_in_loop() {
        assert!(check_src("int main(){while(1){{break;}} return 0;}").is_ok());
    }

    #[test]
    fn rejects_indexing_a_scalar() {
        let err = check_src("int main(){int x=0; return x[0];}").unwrap_err();
        assert!(matches!(err, CheckError::NotAnArray(_)));
    }

    #[test]
    fn rejects_call_arity_mismatch() {
        let err = check_src("int f(int a){return a;} int main(){return f(1,2);}").unwrap_err();
        assert!(matches!(err, CheckError::ArityMismatch { .. }));
    }

    #[test]
    fn rejects_function_redefinition() {
        let err = check_src("int f(){return 0;} int f(){return 1;}").unwrap_err();
        assert!(matches!(err, CheckError::Redefinition(_)));
    }

    #[test]
    fn allows_forward_declaration_then_definition() {
        assert!(check_src("int f(int a); int main(){return f(1);} int f(int a){return a;}").is_ok());
    }

    #[test]
    fn rejects_non_constant_global_initializer() {
        let err = check_src("int x=1; int y=x; int main(){return y;}").unwrap_err();
        assert!(matches!(err, CheckError::NonConstantInitializer(_)));
    }

    #[test]
    fn accepts_negative_constant_global_initializer() {
        assert!(check_src("int x=-1; int main(){return x;}").is_ok());
    }
}
