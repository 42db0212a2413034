//! Recursive-descent parser (§4.3): token stream to AST.
//!
//! The parser never type-checks (§2: "rejects grammar violations; does
//! not type-check"). Two bookkeeping jobs ride along with the grammar:
//! depth counting against `MaxExprDepth`/`MaxTypeExprDepth`/`MaxBodyDepth`,
//! and collecting every `While` node reachable from a function body so
//! the post-parse pass (`resolve::resolve_jumps`) can bind `break`/
//! `continue` to their target without a second tree walk.

use num_bigint::BigInt;
use toposafe_ast::*;
use toposafe_base::Span;
use toposafe_base::Symbol;
use toposafe_lexer::{Keyword, Operator, Punct, Token, TokenKind, TokenMap};

use crate::error::{ParseError, Result};

const MAX_EXPR_DEPTH: usize = 255;
const MAX_TYPE_DEPTH: usize = 63;
const MAX_BODY_DEPTH: usize = 255;

/// Nesting-depth ceilings for expressions, types, and statement bodies
/// (§4.3). `toposafe-driver`'s `CompileOptions` overrides these per
/// compilation; every other caller gets the §4.3 defaults via
/// `DepthLimits::default()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthLimits {
    pub max_expr_depth: usize,
    pub max_type_depth: usize,
    pub max_body_depth: usize,
}

impl Default for DepthLimits {
    fn default() -> Self {
        DepthLimits {
            max_expr_depth: MAX_EXPR_DEPTH,
            max_type_depth: MAX_TYPE_DEPTH,
            max_body_depth: MAX_BODY_DEPTH,
        }
    }
}

pub struct Parser<'t, 'a> {
    tokens: &'t [Token],
    pos: usize,
    arena: &'a AstArena,
    map: &'t TokenMap,
    limits: DepthLimits,
    expr_depth: usize,
    type_depth: usize,
    body_depth: usize,
}

pub fn parse_file<'a>(
    tokens: &[Token],
    map: &TokenMap,
    arena: &'a AstArena,
    file_name: &str,
) -> Result<File<'a>> {
    parse_file_with_limits(tokens, map, arena, file_name, DepthLimits::default())
}

pub fn parse_file_with_limits<'a>(
    tokens: &[Token],
    map: &TokenMap,
    arena: &'a AstArena,
    file_name: &str,
    limits: DepthLimits,
) -> Result<File<'a>> {
    let mut p = Parser {
        tokens,
        pos: 0,
        arena,
        map,
        limits,
        expr_depth: 0,
        type_depth: 0,
        body_depth: 0,
    };
    p.parse_file(file_name)
}

impl<'t, 'a> Parser<'t, 'a> {
    fn cur(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn cur_span(&self) -> Span {
        self.cur().span
    }

    fn at_eof(&self) -> bool {
        matches!(self.cur().kind, TokenKind::Eof)
    }

    fn bump(&mut self) -> Token {
        let tok = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn describe(&self, tok: &Token) -> String {
        match &tok.kind {
            TokenKind::Identifier => format!("identifier '{}'", self.map.resolve(tok.lexeme)),
            TokenKind::Keyword(k) => format!("keyword '{}'", k.text()),
            TokenKind::IntLiteral(n) => format!("integer literal '{n}'"),
            TokenKind::StringLiteral(_) => "string literal".to_string(),
            TokenKind::Operator(op) => format!("'{}'", op.text()),
            TokenKind::Punct(p) => format!("'{}'", p.text()),
            TokenKind::DocComment(_) => "doc comment".to_string(),
            TokenKind::Eof => "end of file".to_string(),
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found: self.describe(self.cur()),
            span: self.cur_span(),
        }
    }

    fn skip_semis(&mut self) {
        while matches!(self.cur().kind, TokenKind::Punct(Punct::Semicolon)) {
            self.bump();
        }
    }

    fn eat_punct(&mut self, p: Punct) -> bool {
        if matches!(&self.cur().kind, TokenKind::Punct(x) if *x == p) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, p: Punct) -> Result<Span> {
        if let TokenKind::Punct(x) = self.cur().kind {
            if x == p {
                let span = self.cur_span();
                self.bump();
                return Ok(span);
            }
        }
        Err(ParseError::MissingDelimiter {
            delimiter: p.text(),
            span: self.cur_span(),
        })
    }

    fn eat_keyword(&mut self, k: Keyword) -> bool {
        if matches!(&self.cur().kind, TokenKind::Keyword(x) if *x == k) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, k: Keyword) -> Result<Span> {
        if matches!(&self.cur().kind, TokenKind::Keyword(x) if *x == k) {
            let span = self.cur_span();
            self.bump();
            Ok(span)
        } else {
            Err(self.unexpected(&format!("'{}'", k.text())))
        }
    }

    fn eat_operator(&mut self, op: Operator) -> bool {
        if matches!(&self.cur().kind, TokenKind::Operator(x) if *x == op) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect_ident(&mut self) -> Result<(Symbol, Span)> {
        if matches!(self.cur().kind, TokenKind::Identifier) {
            let tok = self.bump();
            Ok((tok.lexeme, tok.span))
        } else {
            Err(self.unexpected("identifier"))
        }
    }

    fn expect_string(&mut self) -> Result<(Symbol, Span)> {
        if let TokenKind::StringLiteral(content) = self.cur().kind {
            let span = self.cur_span();
            self.bump();
            Ok((content, span))
        } else {
            Err(self.unexpected("string literal"))
        }
    }

    // ------------------------------------------------------------------
    // File
    // ------------------------------------------------------------------

    fn parse_file(&mut self, file_name: &str) -> Result<File<'a>> {
        self.skip_semis();
        let mut uses = Vec::new();
        while matches!(self.cur().kind, TokenKind::Keyword(Keyword::Use)) {
            uses.push(self.parse_use()?);
            self.skip_semis();
        }

        let package_id = if matches!(self.cur().kind, TokenKind::Keyword(Keyword::PackageId)) {
            Some(self.parse_package_id()?)
        } else {
            None
        };
        self.skip_semis();

        let mut structs = Vec::new();
        let mut consts = Vec::new();
        let mut statuses = Vec::new();
        let mut funcs = Vec::new();

        while !self.at_eof() {
            let public = self.parse_visibility()?;
            match self.cur().kind {
                TokenKind::Keyword(Keyword::Func) => {
                    funcs.push(&*self.arena.alloc(self.parse_func(public)?));
                }
                TokenKind::Keyword(Keyword::Struct) => {
                    structs.push(&*self.arena.alloc(self.parse_struct(public)?));
                }
                TokenKind::Keyword(Keyword::Const) => {
                    consts.push(&*self.arena.alloc(self.parse_const(public)?));
                }
                TokenKind::Keyword(Keyword::Status) => {
                    statuses.push(&*self.arena.alloc(self.parse_status(public)?));
                }
                _ => return Err(self.unexpected("'func', 'struct', 'const', or 'status'")),
            }
            self.skip_semis();
        }

        Ok(File {
            name: file_name.to_string(),
            package_id,
            uses: self.arena.alloc_slice(uses),
            structs,
            consts: self.arena.alloc_slice(consts),
            statuses: self.arena.alloc_slice(statuses),
            funcs: self.arena.alloc_slice(funcs),
        })
    }

    fn parse_visibility(&mut self) -> Result<bool> {
        if self.eat_keyword(Keyword::Pub) {
            Ok(true)
        } else if self.eat_keyword(Keyword::Pri) {
            Ok(false)
        } else {
            Err(self.unexpected("'pub' or 'pri'"))
        }
    }

    fn parse_use(&mut self) -> Result<Use> {
        let start = self.expect_keyword(Keyword::Use)?;
        let (path, path_span) = self.expect_string()?;
        Ok(Use { path, span: start.merge(path_span) })
    }

    fn parse_package_id(&mut self) -> Result<PackageId> {
        let start = self.expect_keyword(Keyword::PackageId)?;
        let (hex, hex_span) = self.expect_string()?;
        Ok(PackageId { hex, span: start.merge(hex_span) })
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    fn parse_func(&mut self, public: bool) -> Result<Func<'a>> {
        let start = self.expect_keyword(Keyword::Func)?;
        let (first, _) = self.expect_ident()?;
        let (receiver, name) = if self.eat_punct(Punct::Dot) {
            let (second, _) = self.expect_ident()?;
            (Some(first), second)
        } else {
            (None, first)
        };

        let mut impure = false;
        let mut suspendible = false;
        if self.eat_operator(Operator::Bang) {
            impure = true;
        } else if self.eat_operator(Operator::Question) {
            suspendible = true;
        }
        if matches!(self.cur().kind, TokenKind::Operator(Operator::Bang) | TokenKind::Operator(Operator::Question))
        {
            return Err(ParseError::MultiplePurityMarkers { span: self.cur_span() });
        }

        self.expect_punct(Punct::LParen)?;
        let in_params = self.parse_field_list(Punct::RParen)?;

        let out_params: Vec<Field<'a>> = if self.eat_punct(Punct::LParen) {
            self.parse_field_list(Punct::RParen)?
        } else {
            Vec::new()
        };

        let (pre, post) = self.parse_assertion_header(&[AssertKind::Pre, AssertKind::Post])?;

        self.expect_punct(Punct::LBrace)?;
        let mut loops = Vec::new();
        let body = self.parse_block_stmts(&mut loops)?;
        let end = self.expect_punct(Punct::RBrace)?;

        Ok(Func {
            public,
            impure,
            suspendible,
            receiver,
            name,
            in_params: self.arena.alloc_slice(in_params),
            out_params: self.arena.alloc_slice(out_params),
            pre: self.arena.alloc_slice(pre),
            post: self.arena.alloc_slice(post),
            body: self.arena.alloc_slice(body),
            resumable_vars: std::cell::RefCell::new(Vec::new()),
            proved: std::cell::Cell::new(false),
            span: start.merge(end),
        })
    }

    /// Parses `, pre P, inv I, post Q` headers attached to `func`/`while`
    /// (§4.3: "multiple assertions must appear in the fixed order pre,
    /// inv, post"). `allowed` lists which kinds this caller accepts, in
    /// required order (`func` omits `inv`; `while` accepts all three but
    /// buckets separately via `parse_while`).
    fn parse_assertion_header(
        &mut self,
        allowed: &[AssertKind],
    ) -> Result<(Vec<Assert<'a>>, Vec<Assert<'a>>)> {
        let mut pre = Vec::new();
        let mut post = Vec::new();
        let mut last_rank: i32 = -1;
        while matches!(self.cur().kind, TokenKind::Punct(Punct::Comma)) {
            self.bump();
            let kind = self.parse_assert_kind()?;
            if !allowed.contains(&kind) {
                return Err(ParseError::AssertionOutOfOrder { span: self.cur_span() });
            }
            let rank = allowed.iter().position(|k| *k == kind).unwrap() as i32;
            if rank < last_rank {
                return Err(ParseError::AssertionOutOfOrder { span: self.cur_span() });
            }
            last_rank = rank;
            let a = self.parse_assert_body(kind)?;
            match kind {
                AssertKind::Pre => pre.push(a),
                AssertKind::Post => post.push(a),
                _ => unreachable!("inv excluded from func header"),
            }
        }
        Ok((pre, post))
    }

    fn parse_assert_kind(&mut self) -> Result<AssertKind> {
        if self.eat_keyword(Keyword::Pre) {
            Ok(AssertKind::Pre)
        } else if self.eat_keyword(Keyword::Inv) {
            Ok(AssertKind::Inv)
        } else if self.eat_keyword(Keyword::Post) {
            Ok(AssertKind::Post)
        } else {
            Err(self.unexpected("'pre', 'inv', or 'post'"))
        }
    }

    /// Parses the `E [via "rule"(sub: x, ...)]` tail common to every
    /// assertion form (§4.3).
    fn parse_assert_body(&mut self, kind: AssertKind) -> Result<Assert<'a>> {
        let start = self.cur_span();
        let expr = self.parse_expr()?;
        let via = if self.eat_keyword(Keyword::Via) {
            Some(&*self.arena.alloc(self.parse_via()?))
        } else {
            None
        };
        Ok(Assert { kind, expr, via, span: start.merge(expr.span) })
    }

    fn parse_via(&mut self) -> Result<Via<'a>> {
        let start = self.cur_span();
        let (rule, _) = self.expect_string()?;
        self.expect_punct(Punct::LParen)?;
        let mut subs = Vec::new();
        if !matches!(self.cur().kind, TokenKind::Punct(Punct::RParen)) {
            loop {
                let (meta_var, _) = self.expect_ident()?;
                self.expect_punct(Punct::Colon)?;
                let value = self.parse_expr()?;
                subs.push(ViaSub { meta_var, value });
                if !self.eat_punct(Punct::Comma) {
                    break;
                }
            }
        }
        let end = self.expect_punct(Punct::RParen)?;
        Ok(Via { rule, subs: self.arena.alloc_slice(subs), span: start.merge(end) })
    }

    fn parse_field_list(&mut self, close: Punct) -> Result<Vec<Field<'a>>> {
        let mut fields = Vec::new();
        if matches!(&self.cur().kind, TokenKind::Punct(p) if *p == close) {
            self.bump();
            return Ok(fields);
        }
        loop {
            let (name, name_span) = self.expect_ident()?;
            let ty = self.parse_type()?;
            fields.push(Field { name, ty, span: name_span.merge(ty.span) });
            if !self.eat_punct(Punct::Comma) {
                break;
            }
            if matches!(&self.cur().kind, TokenKind::Punct(p) if *p == close) {
                break;
            }
        }
        self.expect_punct(close)?;
        Ok(fields)
    }

    fn parse_struct(&mut self, public: bool) -> Result<Struct<'a>> {
        let start = self.expect_keyword(Keyword::Struct)?;
        let (name, _) = self.expect_ident()?;
        let suspendible = self.eat_operator(Operator::Question);
        self.expect_punct(Punct::LBrace)?;
        let mut fields = Vec::new();
        loop {
            self.skip_semis();
            if matches!(self.cur().kind, TokenKind::Punct(Punct::RBrace)) {
                break;
            }
            let (name, name_span) = self.expect_ident()?;
            let ty = self.parse_type()?;
            fields.push(Field { name, ty, span: name_span.merge(ty.span) });
            if !self.eat_punct(Punct::Comma) {
                self.skip_semis();
            }
        }
        let end = self.expect_punct(Punct::RBrace)?;
        Ok(Struct {
            public,
            name,
            fields: self.arena.alloc_slice(fields),
            suspendible,
            span: start.merge(end),
        })
    }

    fn parse_const(&mut self, public: bool) -> Result<Const<'a>> {
        let start = self.expect_keyword(Keyword::Const)?;
        let (name, _) = self.expect_ident()?;
        let ty = self.parse_type()?;
        if !self.eat_operator(Operator::Eq) {
            return Err(self.unexpected("'='"));
        }
        let value = self.parse_expr()?;
        Ok(Const { public, name, ty, value, span: start.merge(value.span) })
    }

    fn parse_status(&mut self, public: bool) -> Result<Status> {
        let start = self.expect_keyword(Keyword::Status)?;
        let (name, name_span) = self.expect_ident()?;
        Ok(Status { public, name, span: start.merge(name_span) })
    }

    // ------------------------------------------------------------------
    // Types (§3.3, §4.3 "types read left-to-right")
    // ------------------------------------------------------------------

    fn parse_type(&mut self) -> Result<&'a TypeExpr<'a>> {
        self.type_depth += 1;
        if self.type_depth > self.limits.max_type_depth {
            return Err(ParseError::TypeExprDepthExceeded { span: self.cur_span() });
        }
        let result = self.parse_type_inner();
        self.type_depth -= 1;
        result
    }

    fn parse_type_inner(&mut self) -> Result<&'a TypeExpr<'a>> {
        let start = self.cur_span();
        let base = match self.cur().kind {
            TokenKind::Keyword(Keyword::Ptr) => {
                self.bump();
                let inner = self.parse_type()?;
                TypeExpr::new(start.merge(inner.span), TypeKind::Ptr(inner))
            }
            TokenKind::Keyword(Keyword::Nptr) => {
                self.bump();
                let inner = self.parse_type()?;
                TypeExpr::new(start.merge(inner.span), TypeKind::Nptr(inner))
            }
            TokenKind::Keyword(Keyword::Slice) => {
                self.bump();
                let inner = self.parse_type()?;
                TypeExpr::new(start.merge(inner.span), TypeKind::Slice(inner))
            }
            TokenKind::Keyword(Keyword::Array) => {
                self.bump();
                self.expect_punct(Punct::LBracket)?;
                let size = self.parse_expr()?;
                self.expect_punct(Punct::RBracket)?;
                let elem = self.parse_type()?;
                TypeExpr::new(start.merge(elem.span), TypeKind::Array { size, elem })
            }
            TokenKind::Keyword(Keyword::Reader) => {
                self.bump();
                let kind = self.parse_stream_kind()?;
                TypeExpr::new(start, TypeKind::Reader(kind))
            }
            TokenKind::Keyword(Keyword::Writer) => {
                self.bump();
                let kind = self.parse_stream_kind()?;
                TypeExpr::new(start, TypeKind::Writer(kind))
            }
            TokenKind::Keyword(k) if k.is_base_type() => {
                self.bump();
                TypeExpr::new(start, TypeKind::Base(keyword_to_base(k)))
            }
            TokenKind::Keyword(Keyword::Bool) => {
                self.bump();
                TypeExpr::new(start, TypeKind::Base(BaseType::Bool))
            }
            TokenKind::Keyword(Keyword::Status) => {
                self.bump();
                TypeExpr::new(start, TypeKind::Base(BaseType::Status))
            }
            TokenKind::Identifier => {
                let (name, span) = self.expect_ident()?;
                TypeExpr::new(span, TypeKind::Struct(name))
            }
            _ => return Err(self.unexpected("a type")),
        };
        let base = self.arena.alloc(base);

        if matches!(self.cur().kind, TokenKind::Punct(Punct::LBracket)) {
            self.bump();
            let lo = if matches!(self.cur().kind, TokenKind::Operator(Operator::Range))
                || matches!(self.cur().kind, TokenKind::Operator(Operator::RangeEq))
            {
                None
            } else {
                Some(self.parse_expr()?)
            };
            if !self.eat_operator(Operator::RangeEq) {
                return Err(self.unexpected("'..='"));
            }
            let hi = if matches!(self.cur().kind, TokenKind::Punct(Punct::RBracket)) {
                None
            } else {
                Some(self.parse_expr()?)
            };
            let end = self.expect_punct(Punct::RBracket)?;
            return Ok(self
                .arena
                .alloc(TypeExpr::new(start.merge(end), TypeKind::Refined { base, lo, hi })));
        }
        Ok(base)
    }

    fn parse_stream_kind(&mut self) -> Result<StreamKind> {
        if self.eat_punct(Punct::LBracket) {
            let (name, _) = self.expect_ident()?;
            self.expect_punct(Punct::RBracket)?;
            if self.map.resolve(name) == "token" {
                Ok(StreamKind::Tokens)
            } else {
                Ok(StreamKind::Bytes)
            }
        } else {
            Ok(StreamKind::Bytes)
        }
    }

    // ------------------------------------------------------------------
    // Statements (§3.2, §4.3)
    // ------------------------------------------------------------------

    fn parse_block_stmts(&mut self, loops: &mut Vec<&'a While<'a>>) -> Result<Vec<Stmt<'a>>> {
        self.body_depth += 1;
        if self.body_depth > self.limits.max_body_depth {
            return Err(ParseError::BodyDepthExceeded { span: self.cur_span() });
        }
        let mut stmts = Vec::new();
        self.skip_semis();
        while !matches!(self.cur().kind, TokenKind::Punct(Punct::RBrace)) {
            stmts.push(self.parse_stmt(loops)?);
            self.skip_semis();
        }
        self.body_depth -= 1;
        Ok(stmts)
    }

    fn parse_stmt(&mut self, loops: &mut Vec<&'a While<'a>>) -> Result<Stmt<'a>> {
        let start = self.cur_span();
        match self.cur().kind {
            TokenKind::Keyword(Keyword::Var) => self.parse_var_stmt(),
            TokenKind::Keyword(Keyword::If) => {
                let if_node = self.parse_if(loops)?;
                let span = if_node.span;
                Ok(Stmt::new(span, StmtKind::If(if_node)))
            }
            TokenKind::Keyword(Keyword::While) => {
                let w = self.parse_while(loops)?;
                let span = w.span;
                Ok(Stmt::new(span, StmtKind::While(w)))
            }
            TokenKind::Keyword(Keyword::Break) => self.parse_jump(JumpKind::Break),
            TokenKind::Keyword(Keyword::Continue) => self.parse_jump(JumpKind::Continue),
            TokenKind::Keyword(Keyword::Return) => self.parse_return(),
            TokenKind::Keyword(Keyword::Assert) => {
                self.bump();
                let a = self.parse_assert_body(AssertKind::Assert)?;
                Ok(Stmt::new(start.merge(a.span), StmtKind::Assert(a)))
            }
            TokenKind::Keyword(Keyword::Io) => self.parse_io_bind(loops),
            _ => self.parse_expr_or_assign_stmt(),
        }
    }

    fn parse_var_stmt(&mut self) -> Result<Stmt<'a>> {
        let start = self.expect_keyword(Keyword::Var)?;
        let (name, _) = self.expect_ident()?;
        let ty = self.parse_type()?;
        let init = if self.eat_operator(Operator::Eq) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        let end = init.map(|e| e.span).unwrap_or(ty.span);
        Ok(Stmt::new(
            start.merge(end),
            StmtKind::Var(Var { name, ty, init, span: start.merge(end) }),
        ))
    }

    fn parse_io_bind(&mut self, loops: &mut Vec<&'a While<'a>>) -> Result<Stmt<'a>> {
        let start = self.expect_keyword(Keyword::Io)?;
        let (alias, _) = self.expect_ident()?;
        self.eat_punct(Punct::Colon);
        if !self.eat_operator(Operator::Eq) {
            return Err(self.unexpected("'='"));
        }
        let value = self.parse_expr()?;
        self.expect_punct(Punct::LBrace)?;
        let body = self.parse_block_stmts(loops)?;
        let end = self.expect_punct(Punct::RBrace)?;
        Ok(Stmt::new(
            start.merge(end),
            StmtKind::IOBind(IOBind {
                alias,
                value,
                body: self.arena.alloc_slice(body),
                span: start.merge(end),
            }),
        ))
    }

    fn parse_if(&mut self, loops: &mut Vec<&'a While<'a>>) -> Result<If<'a>> {
        let start = self.expect_keyword(Keyword::If)?;
        let cond = self.parse_expr()?;
        self.expect_punct(Punct::LBrace)?;
        let then_branch = self.parse_block_stmts(loops)?;
        let mut end = self.expect_punct(Punct::RBrace)?;
        let else_branch = if self.eat_keyword(Keyword::Else) {
            if matches!(self.cur().kind, TokenKind::Keyword(Keyword::If)) {
                let inner = self.parse_if(loops)?;
                end = inner.span;
                Some(ElseBranch::ElseIf(self.arena.alloc(inner)))
            } else {
                self.expect_punct(Punct::LBrace)?;
                let block = self.parse_block_stmts(loops)?;
                end = self.expect_punct(Punct::RBrace)?;
                Some(ElseBranch::Block(self.arena.alloc_slice(block)))
            }
        } else {
            None
        };
        Ok(If {
            cond,
            then_branch: self.arena.alloc_slice(then_branch),
            else_branch,
            span: start.merge(end),
        })
    }

    fn parse_while(&mut self, loops: &mut Vec<&'a While<'a>>) -> Result<&'a While<'a>> {
        let start = self.expect_keyword(Keyword::While)?;
        let label = if self.eat_punct(Punct::Colon) {
            Some(self.expect_ident()?.0)
        } else {
            None
        };
        let cond = self.parse_expr()?;

        let mut pre = Vec::new();
        let mut inv = Vec::new();
        let mut post = Vec::new();
        let mut last_rank = -1i32;
        let order = [AssertKind::Pre, AssertKind::Inv, AssertKind::Post];
        while self.eat_punct(Punct::Comma) {
            let kind = self.parse_assert_kind()?;
            let rank = order.iter().position(|k| *k == kind).unwrap() as i32;
            if rank < last_rank {
                return Err(ParseError::AssertionOutOfOrder { span: self.cur_span() });
            }
            last_rank = rank;
            let a = self.parse_assert_body(kind)?;
            match kind {
                AssertKind::Pre => pre.push(a),
                AssertKind::Inv => inv.push(a),
                AssertKind::Post => post.push(a),
                AssertKind::Assert => unreachable!(),
            }
        }

        self.expect_punct(Punct::LBrace)?;
        let body = self.parse_block_stmts(loops)?;
        let end = self.expect_punct(Punct::RBrace)?;

        let w = self.arena.alloc(While {
            label,
            cond,
            pre: self.arena.alloc_slice(pre),
            inv: self.arena.alloc_slice(inv),
            post: self.arena.alloc_slice(post),
            body: self.arena.alloc_slice(body),
            has_break: std::cell::Cell::new(false),
            has_continue: std::cell::Cell::new(false),
            span: start.merge(end),
        });
        loops.push(w);
        Ok(w)
    }

    fn parse_jump(&mut self, kind: JumpKind) -> Result<Stmt<'a>> {
        let start = self.cur_span();
        self.bump();
        let label = if self.eat_punct(Punct::Colon) {
            Some(self.expect_ident()?.0)
        } else {
            None
        };
        Ok(Stmt::new(
            start,
            StmtKind::Jump(Jump { kind, label, target: std::cell::Cell::new(None), span: start }),
        ))
    }

    fn parse_return(&mut self) -> Result<Stmt<'a>> {
        let start = self.expect_keyword(Keyword::Return)?;
        let mut end = start;
        let value = if self.can_start_expr() {
            let e = self.parse_expr()?;
            end = e.span;
            Some(e)
        } else {
            None
        };
        let status = if self.eat_punct(Punct::Colon) {
            let (name, span) = self.expect_ident()?;
            end = span;
            Some(name)
        } else {
            None
        };
        Ok(Stmt::new(start.merge(end), StmtKind::Return(Return { value, status, span: start.merge(end) })))
    }

    fn can_start_expr(&self) -> bool {
        !matches!(
            self.cur().kind,
            TokenKind::Punct(Punct::Semicolon)
                | TokenKind::Punct(Punct::RBrace)
                | TokenKind::Punct(Punct::Colon)
                | TokenKind::Eof
        )
    }

    fn parse_expr_or_assign_stmt(&mut self) -> Result<Stmt<'a>> {
        let start = self.cur_span();
        let lhs = self.parse_expr()?;
        if let Some(op) = self.try_parse_assign_op() {
            let rhs = self.parse_expr()?;
            let span = start.merge(rhs.span);
            return Ok(Stmt::new(
                span,
                StmtKind::Assign(Assign { target: lhs, op, value: rhs, span }),
            ));
        }
        Ok(Stmt::new(start.merge(lhs.span), StmtKind::Expr(lhs)))
    }

    fn try_parse_assign_op(&mut self) -> Option<AssignOp> {
        let op = match self.cur().kind {
            TokenKind::Operator(Operator::Eq) => AssignOp::Assign,
            TokenKind::Operator(Operator::PlusEq) => AssignOp::AddEq,
            TokenKind::Operator(Operator::MinusEq) => AssignOp::SubEq,
            TokenKind::Operator(Operator::StarEq) => AssignOp::MulEq,
            TokenKind::Operator(Operator::SlashEq) => AssignOp::DivEq,
            TokenKind::Operator(Operator::PercentEq) => AssignOp::RemEq,
            TokenKind::Operator(Operator::AmpEq) => AssignOp::AndEq,
            TokenKind::Operator(Operator::PipeEq) => AssignOp::OrEq,
            TokenKind::Operator(Operator::CaretEq) => AssignOp::XorEq,
            TokenKind::Operator(Operator::ShlEq) => AssignOp::ShlEq,
            TokenKind::Operator(Operator::ShrEq) => AssignOp::ShrEq,
            _ => return None,
        };
        self.bump();
        Some(op)
    }

    // ------------------------------------------------------------------
    // Expressions (§4.3: flat precedence, associative chains)
    // ------------------------------------------------------------------

    fn parse_expr(&mut self) -> Result<&'a Expr<'a>> {
        self.expr_depth += 1;
        if self.expr_depth > self.limits.max_expr_depth {
            return Err(ParseError::ExprDepthExceeded { span: self.cur_span() });
        }
        let result = self.parse_expr_inner();
        self.expr_depth -= 1;
        result
    }

    fn parse_expr_inner(&mut self) -> Result<&'a Expr<'a>> {
        let first = self.parse_operand()?;

        if let Some(assoc) = self.peek_assoc_op() {
            let start = first.span;
            let mut operands = vec![first];
            while self.peek_assoc_op() == Some(assoc) {
                self.bump();
                operands.push(self.parse_operand()?);
            }
            // A different associative/binary operator immediately
            // following without parens is the flat-precedence violation
            // `a * b + c` (§4.3).
            if self.peek_assoc_op().is_some() || self.peek_binary_op().is_some() {
                return Err(ParseError::AmbiguousPrecedence { span: self.cur_span() });
            }
            let span = start.merge(operands.last().unwrap().span);
            return Ok(self
                .arena
                .alloc(Expr::new(span, ExprKind::Associative(assoc, self.arena.alloc_slice(operands)))));
        }

        if let Some(op) = self.peek_binary_op() {
            self.bump();
            let rhs = self.parse_operand()?;
            if self.peek_assoc_op().is_some() || self.peek_binary_op().is_some() {
                return Err(ParseError::AmbiguousPrecedence { span: self.cur_span() });
            }
            let span = first.span.merge(rhs.span);
            return Ok(self.arena.alloc(Expr::new(span, ExprKind::Binary(op, first, rhs))));
        }

        Ok(first)
    }

    fn peek_assoc_op(&self) -> Option<AssocOp> {
        match self.cur().kind {
            TokenKind::Operator(Operator::Plus) => Some(AssocOp::Add),
            TokenKind::Operator(Operator::Star) => Some(AssocOp::Mul),
            TokenKind::Operator(Operator::Amp) => Some(AssocOp::BitAnd),
            TokenKind::Operator(Operator::Pipe) => Some(AssocOp::BitOr),
            TokenKind::Operator(Operator::Caret) => Some(AssocOp::BitXor),
            TokenKind::Keyword(Keyword::And) => Some(AssocOp::LogAnd),
            TokenKind::Keyword(Keyword::Or) => Some(AssocOp::LogOr),
            _ => None,
        }
    }

    fn peek_binary_op(&self) -> Option<BinaryOp> {
        match self.cur().kind {
            TokenKind::Operator(Operator::Minus) => Some(BinaryOp::Sub),
            TokenKind::Operator(Operator::Slash) => Some(BinaryOp::Div),
            TokenKind::Operator(Operator::Percent) => Some(BinaryOp::Rem),
            TokenKind::Operator(Operator::Shl) => Some(BinaryOp::Shl),
            TokenKind::Operator(Operator::Shr) => Some(BinaryOp::Shr),
            TokenKind::Operator(Operator::EqEq) => Some(BinaryOp::Eq),
            TokenKind::Operator(Operator::NotEq) => Some(BinaryOp::Ne),
            TokenKind::Operator(Operator::Lt) => Some(BinaryOp::Lt),
            TokenKind::Operator(Operator::LtEq) => Some(BinaryOp::Le),
            TokenKind::Operator(Operator::Gt) => Some(BinaryOp::Gt),
            TokenKind::Operator(Operator::GtEq) => Some(BinaryOp::Ge),
            _ => None,
        }
    }

    /// Parses one unary-prefixed operand. Unary `+`/`-`/`not` are only
    /// ever consulted here, at the start of an operand — by construction
    /// this already implements §4.3's disambiguation rule ("previous
    /// token ... otherwise unary"), since a `+`/`-` found after a
    /// complete operand is handled by `parse_expr_inner`'s
    /// associative/binary loop instead.
    fn parse_operand(&mut self) -> Result<&'a Expr<'a>> {
        let start = self.cur_span();
        if self.eat_keyword(Keyword::Not) {
            let operand = self.parse_operand()?;
            let span = start.merge(operand.span);
            return Ok(self.arena.alloc(Expr::new(span, ExprKind::Unary(UnaryOp::Not, operand))));
        }
        if self.eat_operator(Operator::Minus) {
            let operand = self.parse_operand()?;
            let span = start.merge(operand.span);
            return Ok(self.arena.alloc(Expr::new(span, ExprKind::Unary(UnaryOp::Neg, operand))));
        }
        if self.eat_operator(Operator::Plus) {
            let operand = self.parse_operand()?;
            let span = start.merge(operand.span);
            return Ok(self.arena.alloc(Expr::new(span, ExprKind::Unary(UnaryOp::Pos, operand))));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<&'a Expr<'a>> {
        let mut e = self.parse_primary()?;
        loop {
            match self.cur().kind {
                TokenKind::Punct(Punct::LParen) => {
                    e = self.parse_call(e, false)?;
                }
                TokenKind::Operator(Operator::Question)
                    if matches!(
                        self.tokens.get(self.pos + 1).map(|t| &t.kind),
                        Some(TokenKind::Punct(Punct::LParen))
                    ) =>
                {
                    self.bump();
                    e = self.parse_call(e, true)?;
                }
                TokenKind::Punct(Punct::LBracket) => {
                    e = self.parse_index_or_slice(e)?;
                }
                TokenKind::Punct(Punct::Dot) => {
                    self.bump();
                    let (field, span) = self.expect_ident()?;
                    let full = e.span.merge(span);
                    // `pkg.name` (a package-qualified global) and
                    // `value.field` (a struct field selector) share the
                    // same surface syntax; a bare identifier immediately
                    // followed by one dot is ambiguous until name
                    // resolution, so the parser always builds `Qualified`
                    // here and the type checker reinterprets it as a
                    // selector when the base does not name a package
                    // alias (§4.4.1). Any further dot is unambiguously a
                    // field selector, since packages do not nest.
                    e = match &e.kind {
                        ExprKind::Ident(base) => {
                            self.arena.alloc(Expr::new(full, ExprKind::Qualified(*base, field)))
                        }
                        _ => self.arena.alloc(Expr::new(full, ExprKind::Selector { base: e, field })),
                    };
                }
                TokenKind::Keyword(Keyword::As) => {
                    self.bump();
                    let ty = self.parse_type()?;
                    let span = e.span.merge(ty.span);
                    e = self.arena.alloc(Expr::new(span, ExprKind::Cast { operand: e, ty }));
                }
                _ => break,
            }
        }
        Ok(e)
    }

    fn parse_call(&mut self, callee: &'a Expr<'a>, coroutine: bool) -> Result<&'a Expr<'a>> {
        self.expect_punct(Punct::LParen)?;
        let mut args = Vec::new();
        if !matches!(self.cur().kind, TokenKind::Punct(Punct::RParen)) {
            loop {
                let arg_start = self.cur_span();
                if !matches!(self.cur().kind, TokenKind::Identifier) {
                    return Err(ParseError::PositionalArgument { span: arg_start });
                }
                let (name, _) = self.expect_ident()?;
                if !self.eat_punct(Punct::Colon) {
                    return Err(ParseError::PositionalArgument { span: arg_start });
                }
                let value = self.parse_expr()?;
                args.push(Arg { name, value, span: arg_start.merge(value.span) });
                if !self.eat_punct(Punct::Comma) {
                    break;
                }
            }
        }
        let end = self.expect_punct(Punct::RParen)?;
        let span = callee.span.merge(end);
        Ok(self.arena.alloc(Expr::new(
            span,
            ExprKind::Call { callee, args: self.arena.alloc_slice(args), coroutine },
        )))
    }

    fn parse_index_or_slice(&mut self, base: &'a Expr<'a>) -> Result<&'a Expr<'a>> {
        self.expect_punct(Punct::LBracket)?;
        if self.eat_operator(Operator::RangeEq) {
            let hi = if matches!(self.cur().kind, TokenKind::Punct(Punct::RBracket)) {
                None
            } else {
                Some(self.parse_expr()?)
            };
            let end = self.expect_punct(Punct::RBracket)?;
            let span = base.span.merge(end);
            return Ok(self
                .arena
                .alloc(Expr::new(span, ExprKind::Slice { base, lo: None, hi })));
        }
        let first = self.parse_expr()?;
        if self.eat_operator(Operator::RangeEq) {
            let hi = if matches!(self.cur().kind, TokenKind::Punct(Punct::RBracket)) {
                None
            } else {
                Some(self.parse_expr()?)
            };
            let end = self.expect_punct(Punct::RBracket)?;
            let span = base.span.merge(end);
            return Ok(self.arena.alloc(Expr::new(
                span,
                ExprKind::Slice { base, lo: Some(first), hi },
            )));
        }
        let end = self.expect_punct(Punct::RBracket)?;
        let span = base.span.merge(end);
        Ok(self.arena.alloc(Expr::new(span, ExprKind::Index { base, index: first })))
    }

    fn parse_primary(&mut self) -> Result<&'a Expr<'a>> {
        let start = self.cur_span();
        match self.cur().kind.clone() {
            TokenKind::IntLiteral(n) => {
                self.bump();
                Ok(self.arena.alloc(Expr::new(start, ExprKind::IntLiteral(n))))
            }
            TokenKind::Identifier => {
                let tok = self.bump();
                if let Some(b) = self.map.bool_literal(tok.lexeme) {
                    return Ok(self.arena.alloc(Expr::new(start, ExprKind::BoolLiteral(b))));
                }
                Ok(self.arena.alloc(Expr::new(start, ExprKind::Ident(tok.lexeme))))
            }
            TokenKind::Punct(Punct::LParen) => {
                self.bump();
                let inner = self.parse_expr()?;
                self.expect_punct(Punct::RParen)?;
                Ok(inner)
            }
            _ => Err(self.unexpected("an expression")),
        }
    }
}

fn keyword_to_base(k: Keyword) -> BaseType {
    match k {
        Keyword::U8 => BaseType::U8,
        Keyword::U16 => BaseType::U16,
        Keyword::U32 => BaseType::U32,
        Keyword::U64 => BaseType::U64,
        Keyword::I8 => BaseType::I8,
        Keyword::I16 => BaseType::I16,
        Keyword::I32 => BaseType::I32,
        Keyword::I64 => BaseType::I64,
        _ => unreachable!("keyword_to_base called on non-base-type keyword"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toposafe_lexer::lex;

    fn parse(src: &str) -> Result<(File<'static>, TokenMap)> {
        let (tokens, map) = lex(src).expect("lex ok");
        let arena: &'static AstArena = Box::leak(Box::new(AstArena::new()));
        let file = parse_file(&tokens, &map, arena, "test.dsl")?;
        Ok((file, map))
    }

    #[test]
    fn parses_scenario_a_trivial_proof() {
        let src = r#"
            pri func t.f() {
                var x u8 = 3
                assert x < 10
                x += 1
            }
        "#;
        let (file, _map) = parse(src).expect("parses");
        assert_eq!(file.funcs.len(), 1);
        assert_eq!(file.funcs[0].body.len(), 3);
    }

    #[test]
    fn rejects_flat_precedence_violation() {
        let src = r#"
            pri func t.f() {
                var x u32 = a * b + c
            }
        "#;
        let err = parse(src).unwrap_err();
        assert!(matches!(err, ParseError::AmbiguousPrecedence { .. }));
    }

    #[test]
    fn accepts_parenthesized_mixed_operators() {
        let src = r#"
            pri func t.f() {
                var x u32 = (a * b) + c
            }
        "#;
        parse(src).expect("parses");
    }

    #[test]
    fn associative_chain_is_one_node() {
        let src = r#"
            pri func t.f() {
                var x u32 = a + b + c + d
            }
        "#;
        let (file, _map) = parse(src).expect("parses");
        let body = file.funcs[0].body;
        match &body[0].kind {
            StmtKind::Var(v) => match &v.init.unwrap().kind {
                ExprKind::Associative(AssocOp::Add, operands) => {
                    assert_eq!(operands.len(), 4);
                }
                other => panic!("expected associative node, got {other:?}"),
            },
            other => panic!("expected var stmt, got {other:?}"),
        }
    }

    #[test]
    fn rejects_positional_call_argument() {
        let src = r#"
            pri func t.f() {
                var x u32 = f(1)
            }
        "#;
        let err = parse(src).unwrap_err();
        assert!(matches!(err, ParseError::PositionalArgument { .. }));
    }

    #[test]
    fn parses_named_call_argument() {
        let src = r#"
            pri func t.f() {
                var x u32 = f(a: 1, b: 2)
            }
        "#;
        parse(src).expect("parses");
    }

    #[test]
    fn parses_while_with_inv_and_post() {
        let src = r#"
            pri func t.f() {
                var i u32 = 0
                while i < 10, inv i <= 10, post i == 10 {
                    i += 1
                }
            }
        "#;
        let (file, _map) = parse(src).expect("parses");
        let body = file.funcs[0].body;
        match &body[1].kind {
            StmtKind::While(w) => {
                assert_eq!(w.inv.len(), 1);
                assert_eq!(w.post.len(), 1);
            }
            other => panic!("expected while stmt, got {other:?}"),
        }
    }

    #[test]
    fn parses_via_rule_with_substitution() {
        let src = r#"
            pri func t.f(a u32, b u32, c u32) {
                assert a < c
                assert c <= b
                assert a < b via "a < b: a < c; c <= b"(c: c)
            }
        "#;
        let (file, _map) = parse(src).expect("parses");
        let body = file.funcs[0].body;
        match &body[2].kind {
            StmtKind::Assert(a) => assert!(a.via.is_some()),
            other => panic!("expected assert stmt, got {other:?}"),
        }
    }

    #[test]
    fn refinement_type_one_sided_parses() {
        let src = r#"
            pri func t.f() {
                var x u32[0 ..=] = 3
            }
        "#;
        parse(src).expect("parses");
    }

    #[test]
    fn array_and_ptr_types_parse_left_to_right() {
        let src = r#"
            pri func t.f(p ptr array[4] u8) {
            }
        "#;
        let (file, _map) = parse(src).expect("parses");
        match &file.funcs[0].in_params[0].ty.kind {
            TypeKind::Ptr(inner) => {
                assert!(matches!(inner.kind, TypeKind::Array { .. }));
            }
            other => panic!("expected ptr type, got {other:?}"),
        }
    }
}
