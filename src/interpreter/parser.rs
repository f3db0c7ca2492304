use super::ast::{
    CallExpr, ComponentDecl, Expr, InstanceDecl, Item, LetStmt, Literal, MethodDef, MethodParam,
    Override, ParamDecl, Program, Span, Stmt, TypeTag,
};
use crate::outcome::Duration;
use crate::runtime::error::{SyntaxError, SyntaxResult};

/// Parse DSL source text into a [`Program`].
pub fn parse_program(source: &str) -> SyntaxResult<Program> {
    let mut parser = Parser::new(source);
    let mut items = Vec::new();
    loop {
        parser.skip_ws();
        if parser.eof() {
            break;
        }
        items.push(parser.parse_item()?);
    }
    Ok(Program::new(source, items))
}

struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    index: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            index: 0,
        }
    }

    fn eof(&self) -> bool {
        self.index >= self.bytes.len()
    }

    fn current(&self) -> Option<u8> {
        self.bytes.get(self.index).copied()
    }

    fn peek_char(&self) -> Option<u8> {
        self.bytes.get(self.index + 1).copied()
    }

    fn advance(&mut self) {
        if self.index < self.bytes.len() {
            self.index += 1;
        }
    }

    /// Skip whitespace and `//` comments.
    fn skip_ws(&mut self) {
        loop {
            while let Some(ch) = self.current() {
                if ch.is_ascii_whitespace() {
                    self.advance();
                } else {
                    break;
                }
            }
            if self.current() == Some(b'/') && self.peek_char() == Some(b'/') {
                while let Some(ch) = self.current() {
                    self.advance();
                    if ch == b'\n' {
                        break;
                    }
                }
                continue;
            }
            break;
        }
    }

    fn eat(&mut self, ch: u8) -> bool {
        self.skip_ws();
        if self.current() == Some(ch) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, ch: u8) -> SyntaxResult<()> {
        if self.eat(ch) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", ch as char)))
        }
    }

    /// The identifier at the cursor, without consuming it.
    fn peek_ident(&mut self) -> Option<&'a str> {
        self.skip_ws();
        let start = self.index;
        match self.bytes.get(start) {
            Some(ch) if is_ident_start(*ch) => {}
            _ => return None,
        }
        let mut end = start + 1;
        while self.bytes.get(end).copied().is_some_and(is_ident_char) {
            end += 1;
        }
        let src = self.src;
        Some(&src[start..end])
    }

    fn parse_ident(&mut self, what: &str) -> SyntaxResult<(String, Span)> {
        match self.peek_ident() {
            Some(text) => {
                let start = self.index;
                self.index += text.len();
                Ok((text.to_string(), self.span_from(start)))
            }
            None => Err(self.error(&format!("expected {}", what))),
        }
    }

    fn keyword(&mut self, word: &str) -> SyntaxResult<usize> {
        self.skip_ws();
        let start = self.index;
        match self.peek_ident() {
            Some(text) if text == word => {
                self.index += text.len();
                Ok(start)
            }
            _ => Err(self.error(&format!("expected '{}'", word))),
        }
    }

    fn parse_item(&mut self) -> SyntaxResult<Item> {
        match self.peek_ident() {
            Some("component") => Ok(Item::Component(self.parse_component()?)),
            _ => Ok(Item::Stmt(self.parse_stmt()?)),
        }
    }

    fn parse_stmt(&mut self) -> SyntaxResult<Stmt> {
        let stmt = match self.peek_ident() {
            Some("instance") => Stmt::Instance(self.parse_instance()?),
            Some("let") => Stmt::Let(self.parse_let()?),
            Some("component") => return Err(self.error("component declarations must be top level")),
            _ => Stmt::Expr(self.parse_expr()?),
        };
        self.eat(b';');
        Ok(stmt)
    }

    fn parse_component(&mut self) -> SyntaxResult<ComponentDecl> {
        let start = self.keyword("component")?;
        let (name, _) = self.parse_ident("component name")?;
        self.expect(b'{')?;

        let mut params = Vec::new();
        let mut methods = Vec::new();
        loop {
            if self.eat(b'}') {
                break;
            }
            if self.eof() {
                return Err(self.error("unterminated component declaration"));
            }
            match self.peek_ident() {
                Some("param") => params.push(self.parse_param()?),
                Some("method") => methods.push(self.parse_method()?),
                _ => return Err(self.error("expected 'param' or 'method'")),
            }
        }

        Ok(ComponentDecl {
            name,
            params,
            methods,
            span: self.span_from(start),
        })
    }

    fn parse_type(&mut self) -> SyntaxResult<TypeTag> {
        let (text, _) = self.parse_ident("type name")?;
        TypeTag::from_keyword(&text).ok_or_else(|| self.error(&format!("unknown type: {}", text)))
    }

    fn parse_param(&mut self) -> SyntaxResult<ParamDecl> {
        let start = self.keyword("param")?;
        let (name, _) = self.parse_ident("parameter name")?;
        self.expect(b':')?;
        let ty = self.parse_type()?;
        let default = if self.eat(b'=') {
            Some(self.parse_literal()?)
        } else {
            None
        };
        let span = self.span_from(start);
        self.eat(b';');
        Ok(ParamDecl {
            name,
            ty,
            default,
            span,
        })
    }

    fn parse_method(&mut self) -> SyntaxResult<MethodDef> {
        let start = self.keyword("method")?;
        let (name, _) = self.parse_ident("method name")?;
        self.expect(b'(')?;
        let mut params = Vec::new();
        if !self.eat(b')') {
            loop {
                let (param, _) = self.parse_ident("parameter name")?;
                self.expect(b':')?;
                let ty = self.parse_type()?;
                params.push(MethodParam { name: param, ty });
                if self.eat(b',') {
                    continue;
                }
                self.expect(b')')?;
                break;
            }
        }

        self.expect(b'{')?;
        let mut body = Vec::new();
        loop {
            if self.eat(b'}') {
                break;
            }
            if self.eof() {
                return Err(self.error("unterminated method body"));
            }
            body.push(self.parse_stmt()?);
        }

        Ok(MethodDef {
            name,
            params,
            body,
            span: self.span_from(start),
        })
    }

    fn parse_instance(&mut self) -> SyntaxResult<InstanceDecl> {
        let start = self.keyword("instance")?;
        let (name, _) = self.parse_ident("instance name")?;
        self.expect(b':')?;
        let (type_name, _) = self.parse_ident("component type")?;
        self.expect(b'{')?;

        let mut overrides = Vec::new();
        loop {
            if self.eat(b'}') {
                break;
            }
            if self.eof() {
                return Err(self.error("unterminated instance declaration"));
            }
            let (param, span) = self.parse_ident("parameter name")?;
            self.expect(b'=')?;
            let value = self.parse_expr()?;
            overrides.push(Override {
                name: param,
                value,
                span: Span::new(span.start, self.index, span.line, span.column),
            });
            self.eat(b',');
        }

        Ok(InstanceDecl {
            name,
            type_name,
            overrides,
            span: self.span_from(start),
        })
    }

    fn parse_let(&mut self) -> SyntaxResult<LetStmt> {
        let start = self.keyword("let")?;
        let (name, _) = self.parse_ident("binding name")?;
        self.expect(b'=')?;
        let value = self.parse_expr()?;
        Ok(LetStmt {
            name,
            value,
            span: self.span_from(start),
        })
    }

    fn parse_expr(&mut self) -> SyntaxResult<Expr> {
        self.skip_ws();
        let start = self.index;
        let mut expr = match self.current() {
            None => return Err(self.error("unexpected end of input")),
            Some(b'"') | Some(b'-') | Some(b'0'..=b'9') => Expr::Literal {
                value: self.parse_literal()?,
                span: self.span_from(start),
            },
            Some(ch) if is_ident_start(ch) => {
                let (name, span) = self.parse_ident("identifier")?;
                match name.as_str() {
                    "true" => Expr::Literal {
                        value: Literal::Bool(true),
                        span,
                    },
                    "false" => Expr::Literal {
                        value: Literal::Bool(false),
                        span,
                    },
                    _ => Expr::Identifier { name, span },
                }
            }
            Some(_) => return Err(self.error("unexpected character")),
        };

        while self.eat(b'.') {
            let (method, _) = self.parse_ident("method name")?;
            self.expect(b'(')?;
            let mut args = Vec::new();
            if !self.eat(b')') {
                loop {
                    args.push(self.parse_expr()?);
                    if self.eat(b',') {
                        continue;
                    }
                    self.expect(b')')?;
                    break;
                }
            }
            expr = Expr::Call(CallExpr {
                receiver: Box::new(expr),
                method,
                args,
                span: self.span_from(start),
            });
        }

        Ok(expr)
    }

    fn parse_literal(&mut self) -> SyntaxResult<Literal> {
        self.skip_ws();
        match self.current() {
            Some(b'"') => self.parse_string(),
            Some(b'-') | Some(b'0'..=b'9') => self.parse_number(),
            _ => match self.peek_ident() {
                Some("true") => {
                    self.index += 4;
                    Ok(Literal::Bool(true))
                }
                Some("false") => {
                    self.index += 5;
                    Ok(Literal::Bool(false))
                }
                _ => Err(self.error("expected literal")),
            },
        }
    }

    fn parse_string(&mut self) -> SyntaxResult<Literal> {
        // consume opening quote
        self.advance();
        let mut buf = Vec::new();
        while let Some(ch) = self.current() {
            self.advance();
            match ch {
                b'"' => {
                    let text = String::from_utf8(buf)
                        .map_err(|_| self.error("invalid UTF-8 in string literal"))?;
                    return Ok(Literal::String(text));
                }
                b'\\' => {
                    let escaped = self
                        .current()
                        .ok_or_else(|| self.error("incomplete escape"))?;
                    self.advance();
                    let value = match escaped {
                        b'"' => b'"',
                        b'\\' => b'\\',
                        b'n' => b'\n',
                        b'r' => b'\r',
                        b't' => b'\t',
                        other => {
                            return Err(self.error(&format!("unknown escape: \\{}", other as char)));
                        }
                    };
                    buf.push(value);
                }
                _ => buf.push(ch),
            }
        }
        Err(self.error("unterminated string literal"))
    }

    fn parse_number(&mut self) -> SyntaxResult<Literal> {
        let start = self.index;
        if self.current() == Some(b'-') {
            self.advance();
        }
        let mut has_digit = false;
        while let Some(ch) = self.current() {
            if ch.is_ascii_digit() {
                has_digit = true;
                self.advance();
            } else {
                break;
            }
        }
        if !has_digit {
            return Err(self.error("expected digits"));
        }

        let mut is_float = false;
        if self.current() == Some(b'.') && self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.advance();
            while self.current().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        let src = self.src;
        let text = &src[start..self.index];

        let unit_start = self.index;
        while self.current().is_some_and(|c| c.is_ascii_alphabetic()) {
            self.advance();
        }
        let unit = &src[unit_start..self.index];
        if !unit.is_empty() {
            let magnitude: f64 = text
                .parse()
                .map_err(|_| self.error("invalid duration literal"))?;
            let duration = match unit {
                "ns" => Duration::nanos(magnitude),
                "us" => Duration::micros(magnitude),
                "ms" => Duration::millis(magnitude),
                "s" => Duration::seconds(magnitude),
                other => return Err(self.error(&format!("unknown duration unit: {}", other))),
            };
            return Ok(Literal::Duration(duration));
        }

        if is_float {
            text.parse::<f64>()
                .map(Literal::Float)
                .map_err(|_| self.error("invalid float literal"))
        } else {
            text.parse::<i64>()
                .map(Literal::Int)
                .map_err(|_| self.error("invalid integer literal"))
        }
    }

    fn position(&self, offset: usize) -> (usize, usize) {
        let before = &self.bytes[..offset.min(self.bytes.len())];
        let line = before.iter().filter(|&&b| b == b'\n').count() + 1;
        let line_start = before
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |pos| pos + 1);
        (line, offset - line_start + 1)
    }

    fn span_from(&self, start: usize) -> Span {
        let (line, column) = self.position(start);
        Span::new(start, self.index, line, column)
    }

    fn error(&self, message: &str) -> SyntaxError {
        let (line, column) = self.position(self.index);
        SyntaxError {
            message: message.to_string(),
            line,
            column,
        }
    }
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn is_ident_char(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_'
}
