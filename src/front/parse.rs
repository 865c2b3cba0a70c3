//! The parser.

use std::fmt::Debug;

use derive_more::derive::Display;

use super::ast::*;
use super::lex::*;

#[derive(Display)]
#[display("Parse error: {}", self.0)]
pub struct ParseError(String);

impl Debug for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

impl std::error::Error for ParseError {}

pub fn parse(input: &str) -> Result<Program, ParseError> {
    let tokens = Lexer::new(input)
        .tokenize()
        .map_err(|e| ParseError(e.to_string()))?;
    let mut p = Parser { tokens, pos: 0 };
    let prog = p.program()?;
    p.expect_end()?;
    Ok(prog)
}

struct Parser<'src> {
    tokens: Vec<Token<'src>>,
    pos: usize,
}

impl<'src> Parser<'src> {
    fn peek(&self) -> Option<Token<'src>> {
        self.tokens.get(self.pos).copied()
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn bump(&mut self) -> Option<Token<'src>> {
        let t = self.peek();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn error(&self, msg: impl Into<String>) -> ParseError {
        let msg = msg.into();
        match self.peek() {
            Some(t) => ParseError(format!("{msg} (found {t} at byte {})", t.pos)),
            None => ParseError(format!("{msg} (found end of input)")),
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token<'src>, ParseError> {
        match self.peek() {
            Some(t) if t.kind == kind => {
                self.pos += 1;
                Ok(t)
            }
            _ => Err(self.error(format!("expected '{kind}'"))),
        }
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.peek_kind() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_end(&self) -> Result<(), ParseError> {
        if self.pos == self.tokens.len() {
            Ok(())
        } else {
            Err(self.error("expected end of input"))
        }
    }

    fn ident(&mut self) -> Result<crate::common::Id, ParseError> {
        let t = self.expect(TokenKind::Id)?;
        Ok(crate::common::Id::new(t.text.to_string()))
    }

    // program := (function | declaration)*
    fn program(&mut self) -> Result<Program, ParseError> {
        let mut items = Vec::new();
        while self.peek().is_some() {
            items.push(self.item()?);
        }
        Ok(Program { items })
    }

    // item := 'int' id ( '(' params ')' (block | ';') | array_suffix ('=' expr)? ';' )
    fn item(&mut self) -> Result<Item, ParseError> {
        self.expect(TokenKind::Int)?;
        let name = self.ident()?;
        if self.peek_kind() == Some(TokenKind::LParen) {
            let params = self.param_list()?;
            if self.eat(TokenKind::Semi) {
                return Ok(Item::Function(Function {
                    ret_type: Type::Int,
                    name,
                    params,
                    body: None,
                }));
            }
            let body = self.block()?;
            return Ok(Item::Function(Function {
                ret_type: Type::Int,
                name,
                params,
                body: Some(body),
            }));
        }
        let dims = self.array_suffix()?;
        let init = if self.eat(TokenKind::Assign) {
            Some(self.expr()?)
        } else {
            None
        };
        self.expect(TokenKind::Semi)?;
        Ok(Item::Declaration(Declaration {
            var: Variable { ty: Type::Int, name, dims },
            init,
        }))
    }

    fn array_suffix(&mut self) -> Result<Vec<u32>, ParseError> {
        let mut dims = Vec::new();
        while self.eat(TokenKind::LBracket) {
            let t = self.expect(TokenKind::Num)?;
            let n: u32 = t
                .text
                .parse()
                .map_err(|_| self.error("array dimension must fit in u32"))?;
            self.expect(TokenKind::RBracket)?;
            dims.push(n);
        }
        Ok(dims)
    }

    fn param_list(&mut self) -> Result<Vec<Param>, ParseError> {
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if self.peek_kind() != Some(TokenKind::RParen) {
            loop {
                self.expect(TokenKind::Int)?;
                let name = self.ident()?;
                let dims = self.array_suffix()?;
                params.push(Param { ty: Type::Int, name, dims });
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(params)
    }

    fn block(&mut self) -> Result<Block, ParseError> {
        self.expect(TokenKind::LBrace)?;
        let mut items = Vec::new();
        while self.peek_kind() != Some(TokenKind::RBrace) {
            items.push(self.block_item()?);
        }
        self.expect(TokenKind::RBrace)?;
        Ok(Block(items))
    }

    fn block_item(&mut self) -> Result<BlockItem, ParseError> {
        if self.peek_kind() == Some(TokenKind::Int) {
            Ok(BlockItem::Decl(self.declaration()?))
        } else {
            Ok(BlockItem::Stmt(self.stmt()?))
        }
    }

    // declaration := 'int' id array_suffix ('=' expr)? ';'
    fn declaration(&mut self) -> Result<Declaration, ParseError> {
        let decl = self.declaration_no_semi()?;
        self.expect(TokenKind::Semi)?;
        Ok(decl)
    }

    // declaration without a trailing ';', used in the for(decl;...) form
    fn declaration_no_semi(&mut self) -> Result<Declaration, ParseError> {
        self.expect(TokenKind::Int)?;
        let name = self.ident()?;
        let dims = self.array_suffix()?;
        let init = if self.eat(TokenKind::Assign) {
            Some(self.expr()?)
        } else {
            None
        };
        Ok(Declaration {
            var: Variable { ty: Type::Int, name, dims },
            init,
        })
    }

    fn stmt(&mut self) -> Result<Stmt, ParseError> {
        match self.peek_kind() {
            Some(TokenKind::Return) => {
                self.bump();
                let e = if self.peek_kind() != Some(TokenKind::Semi) {
                    Some(self.expr()?)
                } else {
                    None
                };
                self.expect(TokenKind::Semi)?;
                Ok(Stmt::Return(e))
            }
            Some(TokenKind::LBrace) => Ok(Stmt::Block(self.block()?)),
            Some(TokenKind::If) => {
                self.bump();
                self.expect(TokenKind::LParen)?;
                let cond = self.expr()?;
                self.expect(TokenKind::RParen)?;
                let then_branch = Box::new(self.stmt()?);
                let else_branch = if self.eat(TokenKind::Else) {
                    Some(Box::new(self.stmt()?))
                } else {
                    None
                };
                Ok(Stmt::If { cond, then_branch, else_branch })
            }
            Some(TokenKind::While) => {
                self.bump();
                self.expect(TokenKind::LParen)?;
                let cond = self.expr()?;
                self.expect(TokenKind::RParen)?;
                let body = Box::new(self.stmt()?);
                Ok(Stmt::While { cond, body })
            }
            Some(TokenKind::Do) => {
                self.bump();
                let body = Box::new(self.stmt()?);
                self.expect(TokenKind::While)?;
                self.expect(TokenKind::LParen)?;
                let cond = self.expr()?;
                self.expect(TokenKind::RParen)?;
                self.expect(TokenKind::Semi)?;
                Ok(Stmt::DoWhile { body, cond })
            }
            Some(TokenKind::For) => self.for_stmt(),
            Some(TokenKind::Break) => {
                self.bump();
                self.expect(TokenKind::Semi)?;
                Ok(Stmt::Break)
            }
            Some(TokenKind::Continue) => {
                self.bump();
                self.expect(TokenKind::Semi)?;
                Ok(Stmt::Continue)
            }
            Some(TokenKind::Semi) => {
                self.bump();
                Ok(Stmt::Expr(None))
            }
            _ => {
                let e = self.expr()?;
                self.expect(TokenKind::Semi)?;
                Ok(Stmt::Expr(Some(e)))
            }
        }
    }

    // for '(' (decl | expr? ';') expr? ';' expr? ')' stmt
    fn for_stmt(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::For)?;
        self.expect(TokenKind::LParen)?;
        if self.peek_kind() == Some(TokenKind::Int) {
            let init = self.declaration_no_semi()?;
            self.expect(TokenKind::Semi)?;
            let cond = if self.peek_kind() != Some(TokenKind::Semi) {
                Some(self.expr()?)
            } else {
                None
            };
            self.expect(TokenKind::Semi)?;
            let update = if self.peek_kind() != Some(TokenKind::RParen) {
                Some(self.expr()?)
            } else {
                None
            };
            self.expect(TokenKind::RParen)?;
            let body = Box::new(self.stmt()?);
            Ok(Stmt::ForDecl { init, cond, update, body })
        } else {
            let init = if self.peek_kind() != Some(TokenKind::Semi) {
                Some(self.expr()?)
            } else {
                None
            };
            self.expect(TokenKind::Semi)?;
            let cond = if self.peek_kind() != Some(TokenKind::Semi) {
                Some(self.expr()?)
            } else {
                None
            };
            self.expect(TokenKind::Semi)?;
            let update = if self.peek_kind() != Some(TokenKind::RParen) {
                Some(self.expr()?)
            } else {
                None
            };
            self.expect(TokenKind::RParen)?;
            let body = Box::new(self.stmt()?);
            Ok(Stmt::ForExpr { init, cond, update, body })
        }
    }

    // expr := assignment
    fn expr(&mut self) -> Result<Expr, ParseError> {
        self.assignment()
    }

    // assignment := logical_or ('=' assignment)?
    //
    // We parse a full binary-operator chain first, then reinterpret it as an
    // l-value if an '=' follows. This matches the grammar's restriction that
    // only certain postfix forms are valid assignment targets while keeping
    // the precedence climb in one function.
    fn assignment(&mut self) -> Result<Expr, ParseError> {
        let lhs = self.binary(0)?;
        if self.eat(TokenKind::Assign) {
            self.check_lvalue(&lhs)?;
            let rhs = self.assignment()?;
            Ok(Expr::Assign { lhs: Box::new(lhs), rhs: Box::new(rhs) })
        } else {
            Ok(lhs)
        }
    }

    fn check_lvalue(&self, e: &Expr) -> Result<(), ParseError> {
        match e {
            Expr::Var(_) | Expr::Index { .. } => Ok(()),
            _ => Err(self.error("left-hand side of assignment must be a variable or array element")),
        }
    }

    fn binop_of(kind: TokenKind) -> Option<(BinOp, u8)> {
        use TokenKind::*;
        Some(match kind {
            OrOr => (BinOp::LogOr, 1),
            AndAnd => (BinOp::LogAnd, 2),
            EqEq => (BinOp::Eq, 3),
            NotEq => (BinOp::Ne, 3),
            Lt => (BinOp::Lt, 4),
            Gt => (BinOp::Gt, 4),
            Le => (BinOp::Le, 4),
            Ge => (BinOp::Ge, 4),
            Plus => (BinOp::Add, 5),
            Minus => (BinOp::Sub, 5),
            Star => (BinOp::Mul, 6),
            Slash => (BinOp::Div, 6),
            Percent => (BinOp::Rem, 6),
            _ => return None,
        })
    }

    // Precedence-climbing binary operator parser; `min_bp` is the minimum
    // binding power an operator must have to be consumed at this level.
    fn binary(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        let mut lhs = self.unary()?;
        while let Some(kind) = self.peek_kind() {
            let Some((op, bp)) = Self::binop_of(kind) else { break };
            if bp < min_bp {
                break;
            }
            self.bump();
            let rhs = self.binary(bp + 1)?;
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    // unary := ('-' | '~' | '!') unary | postfix
    fn unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek_kind() {
            Some(TokenKind::Minus) => Some(UnOp::Neg),
            Some(TokenKind::Tilde) => Some(UnOp::BitNot),
            Some(TokenKind::Bang) => Some(UnOp::LogNot),
            _ => None,
        };
        if let Some(op) = op {
            self.bump();
            let rhs = self.unary()?;
            Ok(Expr::Unary { op, rhs: Box::new(rhs) })
        } else {
            self.postfix()
        }
    }

    // postfix := primary | id '(' args ')' | id ('[' expr ']')+
    fn postfix(&mut self) -> Result<Expr, ParseError> {
        if self.peek_kind() == Some(TokenKind::Id) {
            let save = self.pos;
            let name = self.ident()?;
            match self.peek_kind() {
                Some(TokenKind::LParen) => {
                    self.bump();
                    let mut args = Vec::new();
                    if self.peek_kind() != Some(TokenKind::RParen) {
                        loop {
                            args.push(self.expr()?);
                            if !self.eat(TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(TokenKind::RParen)?;
                    return Ok(Expr::Call { func: name, args });
                }
                Some(TokenKind::LBracket) => {
                    let mut indices = Vec::new();
                    while self.eat(TokenKind::LBracket) {
                        indices.push(self.expr()?);
                        self.expect(TokenKind::RBracket)?;
                    }
                    return Ok(Expr::Index { array: name, indices });
                }
                _ => {
                    self.pos = save;
                }
            }
        }
        self.primary()
    }

    // primary := num | id | '(' expr ')'
    fn primary(&mut self) -> Result<Expr, ParseError> {
        match self.peek_kind() {
            Some(TokenKind::Num) => {
                let t = self.bump().unwrap();
                let v: i64 = t.text.parse().map_err(|_| self.error("malformed integer literal"))?;
                Ok(Expr::Int(v))
            }
            Some(TokenKind::Id) => {
                let name = self.ident()?;
                Ok(Expr::Var(name))
            }
            Some(TokenKind::LParen) => {
                self.bump();
                let e = self.expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(e)
            }
            _ => Err(self.error("expected an expression")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_main_returning_constant() {
        let prog = parse("int main() { return 42; }").unwrap();
        assert_eq!(prog.items.len(), 1);
    }

    #[test]
    fn parses_array_declaration_and_indexing() {
        let prog = parse("int main() { int a[3]; a[0] = 1; return a[0]; }").unwrap();
        match &prog.items[0] {
            Item::Function(f) => assert_eq!(f.body.as_ref().unwrap().0.len(), 3),
            _ => panic!("expected a function"),
        }
    }

    #[test]
    fn honors_operator_precedence() {
        // 1 + 2 * 3 should parse as 1 + (2 * 3)
        let prog = parse("int main() { return 1 + 2 * 3; }").unwrap();
        let Item::Function(f) = &prog.items[0] else { panic!() };
        let Stmt::Return(Some(Expr::Binary { op: BinOp::Add, rhs, .. })) = &f.body.as_ref().unwrap().0[0]
        else {
            panic!("expected a return of a top-level addition")
        };
        assert!(matches!(**rhs, Expr::Binary { op: BinOp::Mul, .. }));
    }

    #[test]
    fn rejects_assignment_to_non_lvalue() {
        assert!(parse("int main() { 1 + 1 = 2; return 0; }").is_err());
    }

    #[test]
    fn parses_both_for_forms() {
        assert!(parse("int main() { for (int i = 0; i < 3; i = i + 1) ; return 0; }").is_ok());
        assert!(parse("int i; int main() { for (i = 0; i < 3; i = i + 1) ; return 0; }").is_ok());
    }
}
