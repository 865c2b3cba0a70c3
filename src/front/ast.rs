//! The abstract syntax tree.
//!
//! Unlike the grammar's nested Primary/Postfix/Unary/.../Expression chain,
//! expressions here are a single recursive sum type; precedence is enforced
//! by the parser rather than by the shape of the tree (see spec.md §9,
//! "Multiple AST node kinds").

use crate::common::Id;

#[derive(Debug)]
pub struct Program {
    pub items: Vec<Item>,
}

#[derive(Debug)]
pub enum Item {
    Function(Function),
    Declaration(Declaration),
}

/// `int`-valued base type. The language has no other scalar type, but the
/// field exists so a future extension has somewhere to live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    Int,
}

#[derive(Debug, Clone)]
pub struct Variable {
    pub ty: Type,
    pub name: Id,
    /// Empty for a scalar; one entry per array dimension otherwise.
    pub dims: Vec<u32>,
}

impl Variable {
    pub fn is_array(&self) -> bool {
        !self.dims.is_empty()
    }

    /// Total element count across all dimensions.
    pub fn element_count(&self) -> u32 {
        self.dims.iter().product::<u32>().max(1)
    }

    pub fn total_bytes(&self) -> u32 {
        self.element_count() * 4
    }
}

#[derive(Debug)]
pub struct Declaration {
    pub var: Variable,
    /// Only ever `Some` for scalar globals/locals; the checker rejects an
    /// initializer on an array declaration.
    pub init: Option<Expr>,
}

#[derive(Debug)]
pub struct Param {
    pub ty: Type,
    pub name: Id,
    pub dims: Vec<u32>,
}

#[derive(Debug)]
pub struct Function {
    pub ret_type: Type,
    pub name: Id,
    pub params: Vec<Param>,
    /// `None` for a declaration without a body.
    pub body: Option<Block>,
}

#[derive(Debug)]
pub struct Block(pub Vec<BlockItem>);

#[derive(Debug)]
pub enum BlockItem {
    Stmt(Stmt),
    Decl(Declaration),
}

#[derive(Debug)]
pub enum Stmt {
    Return(Option<Expr>),
    Expr(Option<Expr>),
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    Block(Block),
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        cond: Expr,
    },
    ForExpr {
        init: Option<Expr>,
        cond: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },
    ForDecl {
        init: Declaration,
        cond: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },
    Break,
    Continue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    BitNot,
    LogNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    LogAnd,
    LogOr,
}

#[derive(Debug)]
pub enum Expr {
    Int(i64),
    Var(Id),
    Unary {
        op: UnOp,
        rhs: Box<Expr>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Assign {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        func: Id,
        args: Vec<Expr>,
    },
    Index {
        array: Id,
        indices: Vec<Expr>,
    },
}

impl Expr {
    /// Folds the subset of expressions a global initializer is allowed to
    /// be: integer literals and `+`/`-`/`~`/`!` applied to one. `None` means
    /// the expression isn't a compile-time constant.
    pub fn const_eval(&self) -> Option<i64> {
        match self {
            Expr::Int(v) => Some(*v),
            Expr::Unary { op, rhs } => {
                let r = rhs.const_eval()?;
                Some(match op {
                    UnOp::Neg => -r,
                    UnOp::BitNot => !r,
                    UnOp::LogNot => (r == 0) as i64,
                })
            }
            _ => None,
        }
    }
}
