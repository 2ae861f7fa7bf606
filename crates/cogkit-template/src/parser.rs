//! Template parser.
//!
//! Converts a stream of lexer [`Token`]s into a tree of [`Node`]s that can be
//! rendered by the engine. Statement markers are matched up into nested
//! blocks; the inside of every marker is parsed into an [`Expr`] tree with
//! the usual precedence rules (lowest first):
//!
//! 1. inline conditional `a if cond else b`
//! 2. `or`
//! 3. `and`
//! 4. `not`
//! 5. comparisons and `in` / `not in`
//! 6. `~`
//! 7. `+` `-`
//! 8. `*` `/` `//` `%`
//! 9. unary `-` `+`
//! 10. postfix: `.name`, `[key]`, `(args)`, `| filter(args)`
//!
//! Unknown filters are rejected here, so a compiled template never fails on
//! a missing filter at render time.

use cogkit_core::error::{RenderError, SourceLocation};

use crate::ast::{BinaryOp, CompareOp, Expr, Node};
use crate::context::ContextValue;
use crate::filters::FilterRegistry;
use crate::lexer::{snippet, tokenize_expression, ExprToken, ExprTokenKind, Token, TokenKind};

/// Words with a meaning in expressions; they cannot name variables.
const KEYWORDS: [&str; 6] = ["and", "or", "not", "in", "if", "else"];

/// Statement keywords that only make sense inside an enclosing block.
const CONTINUATION_TAGS: [&str; 4] = ["elif", "else", "endif", "endfor"];

/// Maximum nesting of `if`/`for` blocks.
pub const MAX_BLOCK_DEPTH: usize = 64;

/// Maximum depth of an expression tree, counting brackets, prefix
/// operators, and chained binary operators, lookups and filters.
pub const MAX_EXPR_DEPTH: usize = 64;

/// Parses a list of tokens into the nodes of a template.
///
/// # Errors
///
/// Returns a syntax error for unknown statements, unbalanced blocks, invalid
/// expressions, and unknown filters.
pub fn parse(
    source: &str,
    tokens: &[Token],
    filters: &FilterRegistry,
) -> Result<Vec<Node>, RenderError> {
    let mut parser = ParserState {
        source,
        tokens,
        pos: 0,
        depth: 0,
        filters,
    };
    parser.parse_nodes(&[])
}

/// Parses a standalone expression found at `source[start..end]`.
///
/// # Errors
///
/// Returns a syntax error if the text is empty or not a single valid
/// expression.
pub fn parse_expression(
    source: &str,
    start: usize,
    end: usize,
    filters: &FilterRegistry,
) -> Result<Expr, RenderError> {
    let mut parser = ExprParser::new(source, start, end, filters)?;
    if parser.tokens.is_empty() {
        return Err(parser.error_at_start("Empty expression"));
    }
    let expr = parser.parse_expression()?;
    parser.expect_end()?;
    Ok(expr)
}

struct ParserState<'a> {
    source: &'a str,
    tokens: &'a [Token],
    pos: usize,
    /// Number of enclosing `if`/`for` blocks.
    depth: usize,
    filters: &'a FilterRegistry,
}

impl<'a> ParserState<'a> {
    /// Parses nodes until EOF or a block tag named in `end_tags`.
    ///
    /// The terminating tag is left unconsumed for the caller.
    fn parse_nodes(&mut self, end_tags: &[&str]) -> Result<Vec<Node>, RenderError> {
        let tokens = self.tokens;
        let mut nodes = Vec::new();

        while let Some(token) = tokens.get(self.pos) {
            match &token.kind {
                TokenKind::Text(text) => {
                    nodes.push(Node::Text(text.clone()));
                    self.pos += 1;
                }
                TokenKind::Comment => {
                    self.pos += 1;
                }
                TokenKind::Variable { expr, expr_offset } => {
                    if expr.is_empty() {
                        return Err(self.error_at(token, "Empty expression"));
                    }
                    let expr = parse_expression(
                        self.source,
                        *expr_offset,
                        expr_offset + expr.len(),
                        self.filters,
                    )?;
                    nodes.push(Node::Output(expr));
                    self.pos += 1;
                }
                TokenKind::Block { tag, args, args_offset } => {
                    if end_tags.contains(&tag.as_str()) {
                        break;
                    }
                    let node = match tag.as_str() {
                        "if" => self.nested(token, |p| p.parse_if(token, args, *args_offset))?,
                        "for" => self.nested(token, |p| p.parse_for(token, args, *args_offset))?,
                        "set" => self.parse_set(token, args, *args_offset)?,
                        "" => return Err(self.error_at(token, "Empty statement")),
                        t if CONTINUATION_TAGS.contains(&t) => {
                            return Err(self.unexpected_continuation(token, t));
                        }
                        other => {
                            let message = format!("Unknown statement '{other}'");
                            return Err(self.error_at(token, message));
                        }
                    };
                    nodes.push(node);
                }
            }
        }

        Ok(nodes)
    }

    /// Runs a block parser one nesting level deeper.
    fn nested(
        &mut self,
        opener: &Token,
        parse_block: impl FnOnce(&mut Self) -> Result<Node, RenderError>,
    ) -> Result<Node, RenderError> {
        if self.depth >= MAX_BLOCK_DEPTH {
            return Err(self.error_at(
                opener,
                format!("Blocks are nested too deeply (limit is {MAX_BLOCK_DEPTH})"),
            ));
        }
        self.depth += 1;
        let node = parse_block(self);
        self.depth -= 1;
        node
    }

    fn parse_if(
        &mut self,
        opener: &'a Token,
        args: &str,
        args_offset: usize,
    ) -> Result<Node, RenderError> {
        let condition = self.statement_expression(opener, "if", args, args_offset)?;
        self.pos += 1;

        let mut branches = vec![(condition, self.parse_nodes(&["elif", "else", "endif"])?)];
        let mut otherwise = Vec::new();

        loop {
            let Some((token, tag, args, args_offset)) = self.current_block() else {
                return Err(self.unclosed(opener, "if", "endif"));
            };
            match tag {
                "elif" => {
                    let condition = self.statement_expression(token, "elif", args, args_offset)?;
                    self.pos += 1;
                    let body = self.parse_nodes(&["elif", "else", "endif"])?;
                    branches.push((condition, body));
                }
                "else" => {
                    self.expect_no_args(token, tag, args)?;
                    self.pos += 1;
                    otherwise = self.parse_nodes(&["endif"])?;
                    self.finish_block(opener, "if", "endif")?;
                    break;
                }
                _ => {
                    self.finish_block(opener, "if", "endif")?;
                    break;
                }
            }
        }

        Ok(Node::If { branches, otherwise })
    }

    fn parse_for(
        &mut self,
        opener: &'a Token,
        args: &str,
        args_offset: usize,
    ) -> Result<Node, RenderError> {
        if args.is_empty() {
            return Err(self.error_at(opener, "'for' requires 'NAME in EXPRESSION'"));
        }
        let end = args_offset + args.len();
        let mut parser = ExprParser::new(self.source, args_offset, end, self.filters)?;
        let target = parser.expect_target()?;
        parser.expect_keyword("in")?;
        let iterable = parser.parse_expression()?;
        parser.expect_end()?;
        self.pos += 1;

        let body = self.parse_nodes(&["else", "endfor"])?;
        let mut otherwise = Vec::new();
        if let Some((token, "else", args, _)) = self.current_block() {
            self.expect_no_args(token, "else", args)?;
            self.pos += 1;
            otherwise = self.parse_nodes(&["endfor"])?;
        }
        self.finish_block(opener, "for", "endfor")?;

        Ok(Node::For {
            target,
            iterable,
            body,
            otherwise,
        })
    }

    fn parse_set(
        &mut self,
        opener: &'a Token,
        args: &str,
        args_offset: usize,
    ) -> Result<Node, RenderError> {
        if args.is_empty() {
            return Err(self.error_at(opener, "'set' requires 'NAME = EXPRESSION'"));
        }
        let end = args_offset + args.len();
        let mut parser = ExprParser::new(self.source, args_offset, end, self.filters)?;
        let name = parser.expect_target()?;
        parser.expect_op("=")?;
        let value = parser.parse_expression()?;
        parser.expect_end()?;
        self.pos += 1;
        Ok(Node::Set { name, value })
    }

    /// Parses the argument text of an `if`/`elif` marker.
    fn statement_expression(
        &self,
        token: &Token,
        tag: &str,
        args: &str,
        args_offset: usize,
    ) -> Result<Expr, RenderError> {
        if args.is_empty() {
            return Err(self.error_at(token, format!("'{tag}' requires a condition")));
        }
        parse_expression(self.source, args_offset, args_offset + args.len(), self.filters)
    }

    /// Returns the block tag at the current position, if any.
    fn current_block(&self) -> Option<(&'a Token, &'a str, &'a str, usize)> {
        let tokens = self.tokens;
        let token = tokens.get(self.pos)?;
        match &token.kind {
            TokenKind::Block {
                tag,
                args,
                args_offset,
            } => Some((token, tag.as_str(), args.as_str(), *args_offset)),
            _ => None,
        }
    }

    /// Consumes the closing tag of a block opened by `opener`.
    fn finish_block(
        &mut self,
        opener: &Token,
        name: &str,
        end_tag: &str,
    ) -> Result<(), RenderError> {
        match self.current_block() {
            Some((token, tag, args, _)) if tag == end_tag => {
                self.expect_no_args(token, tag, args)?;
                self.pos += 1;
                Ok(())
            }
            _ => Err(self.unclosed(opener, name, end_tag)),
        }
    }

    fn expect_no_args(&self, token: &Token, tag: &str, args: &str) -> Result<(), RenderError> {
        if args.is_empty() {
            Ok(())
        } else {
            Err(self.error_at(token, format!("'{tag}' takes no arguments")))
        }
    }

    fn unclosed(&self, opener: &Token, name: &str, end_tag: &str) -> RenderError {
        self.error_at(
            opener,
            format!("Unclosed '{name}' block: expected '{{% {end_tag} %}}'"),
        )
    }

    fn unexpected_continuation(&self, token: &Token, tag: &str) -> RenderError {
        let opener = match tag {
            "endfor" => "'for'",
            "else" => "'if' or 'for'",
            _ => "'if'",
        };
        self.error_at(token, format!("Unexpected '{tag}' without a matching {opener}"))
    }

    fn error_at(&self, token: &Token, message: impl Into<String>) -> RenderError {
        let fragment = snippet(&self.source[token.start..token.end]);
        RenderError::syntax(
            message,
            SourceLocation::from_offset(self.source, token.start, fragment),
        )
    }
}

// ── Expressions ─────────────────────────────────────────────────────

struct ExprParser<'a> {
    source: &'a str,
    tokens: Vec<ExprToken>,
    pos: usize,
    start: usize,
    end: usize,
    /// Upper bound on the depth of the node being built.
    depth: usize,
    filters: &'a FilterRegistry,
}

impl<'a> ExprParser<'a> {
    fn new(
        source: &'a str,
        start: usize,
        end: usize,
        filters: &'a FilterRegistry,
    ) -> Result<Self, RenderError> {
        Ok(Self {
            source,
            tokens: tokenize_expression(source, start, end)?,
            pos: 0,
            start,
            end,
            depth: 0,
            filters,
        })
    }

    // ── Token helpers ──

    fn peek(&self) -> Option<&ExprToken> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self, ahead: usize) -> Option<&ExprTokenKind> {
        self.tokens.get(self.pos + ahead).map(|t| &t.kind)
    }

    fn at_op(&self, op: &str) -> bool {
        matches!(self.peek_kind(0), Some(ExprTokenKind::Op(o)) if *o == op)
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek_kind(0), Some(ExprTokenKind::Name(n)) if n == keyword)
    }

    fn eat_op(&mut self, op: &str) -> bool {
        let found = self.at_op(op);
        if found {
            self.pos += 1;
        }
        found
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        let found = self.at_keyword(keyword);
        if found {
            self.pos += 1;
        }
        found
    }

    fn expect_op(&mut self, op: &str) -> Result<(), RenderError> {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(self.error_here(&format!("Expected '{op}'")))
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), RenderError> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.error_here(&format!("Expected '{keyword}'")))
        }
    }

    fn expect_end(&self) -> Result<(), RenderError> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(self.error_at(token, format!("Unexpected '{}'", self.text(token)))),
        }
    }

    /// Consumes a plain name usable as an assignment or loop target.
    fn expect_target(&mut self) -> Result<String, RenderError> {
        match self.peek().map(|t| &t.kind) {
            Some(ExprTokenKind::Name(name)) if !is_reserved(name) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.error_here("Expected a variable name")),
        }
    }

    fn text(&self, token: &ExprToken) -> &'a str {
        &self.source[token.start..token.end]
    }

    fn error_at(&self, token: &ExprToken, message: impl Into<String>) -> RenderError {
        RenderError::syntax(
            message,
            SourceLocation::from_offset(self.source, token.start, self.text(token)),
        )
    }

    fn error_at_start(&self, message: &str) -> RenderError {
        let fragment = snippet(&self.source[self.start..self.end]);
        RenderError::syntax(
            message,
            SourceLocation::from_offset(self.source, self.start, fragment),
        )
    }

    /// Reports a problem at the current token, or at the end of the text.
    fn error_here(&self, message: &str) -> RenderError {
        match self.peek() {
            Some(token) => {
                self.error_at(token, format!("{message}, found '{}'", self.text(token)))
            }
            None => RenderError::syntax(
                format!("{message}, found end of expression"),
                SourceLocation::from_offset(
                    self.source,
                    self.end,
                    snippet(&self.source[self.start..self.end]),
                ),
            ),
        }
    }

    // ── Depth accounting ──

    /// Goes one level deeper, failing past [`MAX_EXPR_DEPTH`].
    fn descend(&mut self) -> Result<(), RenderError> {
        if self.depth >= MAX_EXPR_DEPTH {
            return Err(self.error_here(&format!(
                "Expression is nested too deeply (limit is {MAX_EXPR_DEPTH})"
            )));
        }
        self.depth += 1;
        Ok(())
    }

    /// Wraps the result of `parse` one level deeper.
    fn deeper(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<Expr, RenderError>,
    ) -> Result<Expr, RenderError> {
        self.descend()?;
        let expr = parse(self);
        self.depth -= 1;
        expr
    }

    // ── Grammar ──

    fn parse_expression(&mut self) -> Result<Expr, RenderError> {
        self.deeper(Self::parse_conditional)
    }

    fn parse_conditional(&mut self) -> Result<Expr, RenderError> {
        let then = self.parse_or()?;
        if !self.eat_keyword("if") {
            return Ok(then);
        }
        let condition = self.parse_or()?;
        let otherwise = if self.eat_keyword("else") {
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };
        Ok(Expr::Conditional {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise,
        })
    }

    fn parse_or(&mut self) -> Result<Expr, RenderError> {
        let depth = self.depth;
        let mut left = self.parse_and()?;
        while self.eat_keyword("or") {
            self.descend()?;
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        self.depth = depth;
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, RenderError> {
        let depth = self.depth;
        let mut left = self.parse_not()?;
        while self.eat_keyword("and") {
            self.descend()?;
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        self.depth = depth;
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, RenderError> {
        if self.eat_keyword("not") {
            let operand = self.deeper(Self::parse_not)?;
            return Ok(Expr::Not(Box::new(operand)));
        }
        self.parse_compare()
    }

    fn parse_compare(&mut self) -> Result<Expr, RenderError> {
        let depth = self.depth;
        let mut left = self.parse_concat()?;
        loop {
            let (op, width) = match self.peek_kind(0) {
                Some(ExprTokenKind::Op("==")) => (CompareOp::Eq, 1),
                Some(ExprTokenKind::Op("!=")) => (CompareOp::Ne, 1),
                Some(ExprTokenKind::Op("<")) => (CompareOp::Lt, 1),
                Some(ExprTokenKind::Op("<=")) => (CompareOp::Le, 1),
                Some(ExprTokenKind::Op(">")) => (CompareOp::Gt, 1),
                Some(ExprTokenKind::Op(">=")) => (CompareOp::Ge, 1),
                Some(ExprTokenKind::Name(n)) if n == "in" => (CompareOp::In, 1),
                Some(ExprTokenKind::Name(n)) if n == "not" && self.next_is_in() => {
                    (CompareOp::NotIn, 2)
                }
                _ => break,
            };
            self.pos += width;
            self.descend()?;
            let right = self.parse_concat()?;
            left = Expr::Compare(op, Box::new(left), Box::new(right));
        }
        self.depth = depth;
        Ok(left)
    }

    fn next_is_in(&self) -> bool {
        matches!(self.peek_kind(1), Some(ExprTokenKind::Name(m)) if m == "in")
    }

    fn parse_concat(&mut self) -> Result<Expr, RenderError> {
        let depth = self.depth;
        let mut left = self.parse_additive()?;
        while self.eat_op("~") {
            self.descend()?;
            let right = self.parse_additive()?;
            left = Expr::Binary(BinaryOp::Concat, Box::new(left), Box::new(right));
        }
        self.depth = depth;
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, RenderError> {
        let depth = self.depth;
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_kind(0) {
                Some(ExprTokenKind::Op("+")) => BinaryOp::Add,
                Some(ExprTokenKind::Op("-")) => BinaryOp::Sub,
                _ => break,
            };
            self.pos += 1;
            self.descend()?;
            let right = self.parse_multiplicative()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        self.depth = depth;
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, RenderError> {
        let depth = self.depth;
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_kind(0) {
                Some(ExprTokenKind::Op("*")) => BinaryOp::Mul,
                Some(ExprTokenKind::Op("/")) => BinaryOp::Div,
                Some(ExprTokenKind::Op("//")) => BinaryOp::FloorDiv,
                Some(ExprTokenKind::Op("%")) => BinaryOp::Mod,
                _ => break,
            };
            self.pos += 1;
            self.descend()?;
            let right = self.parse_unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        self.depth = depth;
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, RenderError> {
        if self.eat_op("-") {
            let operand = self.deeper(Self::parse_unary)?;
            return Ok(Expr::Neg(Box::new(operand)));
        }
        if self.eat_op("+") {
            let operand = self.deeper(Self::parse_unary)?;
            return Ok(Expr::Pos(Box::new(operand)));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, RenderError> {
        let depth = self.depth;
        let mut expr = self.parse_primary()?;
        loop {
            if self.at_postfix() {
                self.descend()?;
            }
            if self.eat_op(".") {
                let token = self.peek().cloned();
                expr = match token.map(|t| t.kind) {
                    Some(ExprTokenKind::Name(name)) => Expr::Attr(Box::new(expr), name),
                    Some(ExprTokenKind::Int(index)) => {
                        let index = Expr::Literal(ContextValue::Integer(index));
                        Expr::Item(Box::new(expr), Box::new(index))
                    }
                    _ => return Err(self.error_here("Expected an attribute name after '.'")),
                };
                self.pos += 1;
            } else if self.eat_op("[") {
                let key = self.parse_expression()?;
                self.expect_op("]")?;
                expr = Expr::Item(Box::new(expr), Box::new(key));
            } else if self.eat_op("(") {
                let args = self.parse_arguments(")")?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else if self.eat_op("|") {
                let Some(token) = self.peek().cloned() else {
                    return Err(self.error_here("Expected a filter name after '|'"));
                };
                let ExprTokenKind::Name(name) = &token.kind else {
                    return Err(self.error_here("Expected a filter name after '|'"));
                };
                if !self.filters.contains(name) {
                    return Err(self.error_at(&token, format!("Unknown filter '{name}'")));
                }
                self.pos += 1;
                let args = if self.eat_op("(") {
                    self.parse_arguments(")")?
                } else {
                    Vec::new()
                };
                expr = Expr::Filter {
                    value: Box::new(expr),
                    name: name.clone(),
                    args,
                };
            } else {
                self.depth = depth;
                return Ok(expr);
            }
        }
    }

    fn at_postfix(&self) -> bool {
        self.at_op(".") || self.at_op("[") || self.at_op("(") || self.at_op("|")
    }

    /// Parses a comma-separated list up to and including `close`.
    fn parse_arguments(&mut self, close: &str) -> Result<Vec<Expr>, RenderError> {
        let mut args = Vec::new();
        while !self.eat_op(close) {
            if !args.is_empty() {
                self.expect_op(",")?;
                if self.eat_op(close) {
                    break;
                }
            }
            args.push(self.parse_expression()?);
        }
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr, RenderError> {
        let Some(token) = self.peek().cloned() else {
            return Err(self.error_here("Expected an expression"));
        };
        let expr = match &token.kind {
            ExprTokenKind::Str(s) => Expr::Literal(ContextValue::String(s.clone())),
            ExprTokenKind::Int(n) => Expr::Literal(ContextValue::Integer(*n)),
            ExprTokenKind::Float(f) => Expr::Literal(ContextValue::Float(*f)),
            ExprTokenKind::Name(name) => match name.as_str() {
                "true" | "True" => Expr::Literal(ContextValue::Bool(true)),
                "false" | "False" => Expr::Literal(ContextValue::Bool(false)),
                "none" | "None" => Expr::Literal(ContextValue::None),
                n if KEYWORDS.contains(&n) => {
                    return Err(self.error_at(&token, format!("Unexpected '{n}'")));
                }
                _ => Expr::Name(name.clone()),
            },
            ExprTokenKind::Op("(") => {
                self.pos += 1;
                let inner = self.parse_expression()?;
                self.expect_op(")")?;
                return Ok(inner);
            }
            ExprTokenKind::Op("[") => {
                self.pos += 1;
                return Ok(Expr::List(self.parse_arguments("]")?));
            }
            ExprTokenKind::Op(op) => {
                return Err(self.error_at(&token, format!("Unexpected '{op}'")));
            }
        };
        self.pos += 1;
        Ok(expr)
    }
}

fn is_reserved(name: &str) -> bool {
    KEYWORDS.contains(&name)
        || matches!(name, "true" | "True" | "false" | "False" | "none" | "None")
}
