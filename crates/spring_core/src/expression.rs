//! Expression parsing for forcing literals and rendered solution text.
//!
//! One tokenizer accepts both the plain syntax typed into the form
//! (`2*cos(3*t)`) and the rendered-math syntax returned by the solver
//! (`\left(C_{1} + C_{2} t\right) e^{- \frac{1}{2} t}`). The parsed tree is
//! then expanded into a sum of [`Monomial`]s, each of the shape
//! `k · t^n · e^{a t} · {sin|cos}(ω t) · symbols`, which is what the
//! closed-form templates are made of.

use std::collections::BTreeSet;
use std::f64::consts::{E, PI};

/// Name of the independent variable in every expression we read.
pub const TIME_VAR: &str = "t";

// --- AST & Parser ---

/// Abstract Syntax Tree nodes for expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Variable(String),
    Binary(Box<Expr>, char, Box<Expr>), // char is operator +, -, *, /, ^
    Unary(char, Box<Expr>),             // only '-'
    Call(String, Box<Expr>),            // sin, cos, tan, exp, sqrt
    /// A rendered-math command we cannot evaluate, e.g. `\Gamma`.
    Unsupported(String),
}

/// Parses a string expression into an AST.
pub fn parse(input: &str) -> Result<Expr, String> {
    let tokens = tokenize(input);
    if tokens.is_empty() {
        return Err("Empty expression".to_string());
    }
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_expression()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(format!("Unexpected trailing token {:?}", token)),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Identifier(String),
    Function(String),
    Command(String),
    Frac,
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
    LBrace,
    RBrace,
}

const FUNCTIONS: [&str; 5] = ["sin", "cos", "tan", "exp", "sqrt"];

/// Rendered-math commands that only affect spacing or delimiter sizing.
const IGNORED_COMMANDS: [&str; 7] = ["left", "right", "quad", "qquad", "displaystyle", "big", "Big"];

fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c.is_ascii_digit() || c == '.' {
            let mut num_str = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_ascii_digit() || d == '.' {
                    num_str.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Number(num_str.parse().unwrap_or(0.0)));
        } else if c == '\\' {
            chars.next();
            let mut command = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_ascii_alphabetic() {
                    command.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            if command.is_empty() {
                // Escaped spacing such as `\,` or `\!`.
                chars.next();
                continue;
            }
            match command.as_str() {
                "frac" | "dfrac" | "tfrac" => tokens.push(Token::Frac),
                "cdot" | "times" => tokens.push(Token::Star),
                "pi" => tokens.push(Token::Number(PI)),
                name if FUNCTIONS.contains(&name) => tokens.push(Token::Function(name.to_string())),
                name if IGNORED_COMMANDS.contains(&name) => {}
                other => tokens.push(Token::Command(other.to_string())),
            }
        } else if c.is_alphabetic() {
            let mut word = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_alphabetic() {
                    word.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            push_word(&mut tokens, &word);
            // Digits glued to a symbol are its index: `C1` is the constant C1.
            if let Some(Token::Identifier(name)) = tokens.last_mut() {
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() {
                        name.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
            }
        } else if c == '_' {
            chars.next();
            let subscript = read_subscript(&mut chars);
            if let Some(Token::Identifier(name)) = tokens.last_mut() {
                name.push_str(&subscript);
            }
        } else {
            chars.next();
            match c {
                '+' => tokens.push(Token::Plus),
                '-' | '−' => tokens.push(Token::Minus),
                '*' => {
                    if chars.peek() == Some(&'*') {
                        chars.next();
                        tokens.push(Token::Caret);
                    } else {
                        tokens.push(Token::Star);
                    }
                }
                '·' => tokens.push(Token::Star),
                '/' => tokens.push(Token::Slash),
                '^' => tokens.push(Token::Caret),
                '(' | '[' => tokens.push(Token::LParen),
                ')' | ']' => tokens.push(Token::RParen),
                '{' => tokens.push(Token::LBrace),
                '}' => tokens.push(Token::RBrace),
                _ => {} // Ignore unknown
            }
        }
    }
    tokens
}

/// Plain-text words are function names or constants when they match one,
/// otherwise a product of single-letter symbols (`xt` is `x·t`).
fn push_word(tokens: &mut Vec<Token>, word: &str) {
    if FUNCTIONS.contains(&word) {
        tokens.push(Token::Function(word.to_string()));
    } else if word == "pi" {
        tokens.push(Token::Number(PI));
    } else {
        for letter in word.chars() {
            tokens.push(Token::Identifier(letter.to_string()));
        }
    }
}

fn read_subscript(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut subscript = String::new();
    if chars.peek() == Some(&'{') {
        chars.next();
        for d in chars.by_ref() {
            if d == '}' {
                break;
            }
            if d.is_alphanumeric() {
                subscript.push(d);
            }
        }
    } else if let Some(&d) = chars.peek() {
        if d.is_alphanumeric() {
            subscript.push(d);
            chars.next();
        }
    }
    subscript
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).cloned()
    }

    fn consume(&mut self) -> Option<Token> {
        if self.pos < self.tokens.len() {
            let t = self.tokens[self.pos].clone();
            self.pos += 1;
            Some(t)
        } else {
            None
        }
    }

    fn parse_expression(&mut self) -> Result<Expr, String> {
        self.parse_term()
    }

    fn parse_term(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_factor_op()?;

        while let Some(token) = self.peek() {
            match token {
                Token::Plus => {
                    self.consume();
                    let right = self.parse_factor_op()?;
                    left = Expr::Binary(Box::new(left), '+', Box::new(right));
                }
                Token::Minus => {
                    self.consume();
                    let right = self.parse_factor_op()?;
                    left = Expr::Binary(Box::new(left), '-', Box::new(right));
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn parse_factor_op(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_power()?;

        while let Some(token) = self.peek() {
            match token {
                Token::Star => {
                    self.consume();
                    let right = self.parse_power()?;
                    left = Expr::Binary(Box::new(left), '*', Box::new(right));
                }
                Token::Slash => {
                    self.consume();
                    let right = self.parse_power()?;
                    left = Expr::Binary(Box::new(left), '/', Box::new(right));
                }
                // Juxtaposition is multiplication in rendered math: `2 t`, `C_{1} e^{-t}`.
                Token::Number(_)
                | Token::Identifier(_)
                | Token::Function(_)
                | Token::Command(_)
                | Token::Frac
                | Token::LParen
                | Token::LBrace => {
                    let right = self.parse_power()?;
                    left = Expr::Binary(Box::new(left), '*', Box::new(right));
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn parse_power(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_unary()?;

        while let Some(Token::Caret) = self.peek() {
            self.consume();
            let right = self.parse_unary()?;
            left = match left {
                Expr::Variable(ref name) if name == "e" => Expr::Call("exp".to_string(), Box::new(right)),
                _ => Expr::Binary(Box::new(left), '^', Box::new(right)),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, String> {
        match self.peek() {
            Some(Token::Minus) => {
                self.consume();
                let expr = self.parse_unary()?;
                Ok(Expr::Unary('-', Box::new(expr)))
            }
            Some(Token::Plus) => {
                self.consume();
                self.parse_unary()
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_group(&mut self) -> Result<Expr, String> {
        match self.consume() {
            Some(Token::LBrace) => {
                let expr = self.parse_expression()?;
                self.expect(Token::RBrace, "'}'")?;
                Ok(expr)
            }
            Some(Token::LParen) => {
                let expr = self.parse_expression()?;
                self.expect(Token::RParen, "')'")?;
                Ok(expr)
            }
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Identifier(name)) => Ok(Expr::Variable(name)),
            _ => Err("Expected a group".to_string()),
        }
    }

    fn expect(&mut self, token: Token, label: &str) -> Result<(), String> {
        if self.consume() == Some(token) {
            Ok(())
        } else {
            Err(format!("Expected {}", label))
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, String> {
        match self.peek() {
            Some(Token::LBrace) | Some(Token::LParen) => return self.parse_group(),
            _ => {}
        }
        match self.consume() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Identifier(name)) => Ok(Expr::Variable(name)),
            Some(Token::Command(name)) => Ok(Expr::Unsupported(name)),
            Some(Token::Function(name)) => {
                let arg = match self.peek() {
                    Some(Token::LParen) | Some(Token::LBrace) => self.parse_group()?,
                    _ => self.parse_power()?,
                };
                Ok(Expr::Call(name, Box::new(arg)))
            }
            Some(Token::Frac) => {
                let numerator = self.parse_group()?;
                let denominator = self.parse_group()?;
                Ok(Expr::Binary(Box::new(numerator), '/', Box::new(denominator)))
            }
            _ => Err("Unexpected token".to_string()),
        }
    }
}

// --- Evaluation helpers ---

impl Expr {
    /// Value of an expression with no free symbols (`e` counts as Euler's number).
    pub fn constant_value(&self) -> Option<f64> {
        match self.linear_in(TIME_VAR) {
            Some((slope, intercept)) if slope == 0.0 => Some(intercept),
            _ => None,
        }
    }

    /// Reads the expression as `slope·var + intercept`, e.g. the argument of
    /// `\sin{\left(\frac{3}{2} t + 1\right)}`. Returns `None` when it is not
    /// affine in `var` or mentions any other symbol.
    pub fn linear_in(&self, var: &str) -> Option<(f64, f64)> {
        match self {
            Expr::Number(n) => Some((0.0, *n)),
            Expr::Variable(name) if name == var => Some((1.0, 0.0)),
            Expr::Variable(name) if name == "e" => Some((0.0, E)),
            Expr::Variable(_) | Expr::Unsupported(_) => None,
            Expr::Unary(_, inner) => inner.linear_in(var).map(|(a, b)| (-a, -b)),
            Expr::Binary(left, op, right) => {
                let (a1, b1) = left.linear_in(var)?;
                let (a2, b2) = right.linear_in(var)?;
                match op {
                    '+' => Some((a1 + a2, b1 + b2)),
                    '-' => Some((a1 - a2, b1 - b2)),
                    '*' if a1 == 0.0 => Some((b1 * a2, b1 * b2)),
                    '*' if a2 == 0.0 => Some((a1 * b2, b1 * b2)),
                    '/' if a2 == 0.0 && b2 != 0.0 => Some((a1 / b2, b1 / b2)),
                    '^' if a1 == 0.0 && a2 == 0.0 => Some((0.0, b1.powf(b2))),
                    _ => None,
                }
            }
            Expr::Call(name, arg) => {
                let (a, b) = arg.linear_in(var)?;
                if a != 0.0 {
                    return None;
                }
                let value = match name.as_str() {
                    "sin" => b.sin(),
                    "cos" => b.cos(),
                    "tan" => b.tan(),
                    "exp" => b.exp(),
                    "sqrt" => b.sqrt(),
                    _ => return None,
                };
                value.is_finite().then_some((0.0, value))
            }
        }
    }
}

// --- Monomial expansion ---

/// A pure oscillation factor with non-negative angular frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Oscillation {
    Cos(f64),
    Sin(f64),
}

impl Oscillation {
    pub fn frequency(&self) -> f64 {
        match *self {
            Oscillation::Cos(w) | Oscillation::Sin(w) => w,
        }
    }
}

/// One product term `coefficient · t^t_power · e^{rate·t} · oscillation · symbols`.
#[derive(Debug, Clone, PartialEq)]
pub struct Monomial {
    pub coefficient: f64,
    /// Exponent slope; a decaying term has `rate < 0`.
    pub rate: f64,
    pub t_power: i32,
    pub oscillation: Option<Oscillation>,
    /// Free symbols multiplied into the term (unresolved constants).
    pub symbols: BTreeSet<String>,
}

impl Monomial {
    pub fn constant(value: f64) -> Self {
        Self {
            coefficient: value,
            rate: 0.0,
            t_power: 0,
            oscillation: None,
            symbols: BTreeSet::new(),
        }
    }

    fn symbol(name: &str) -> Self {
        let mut m = Self::constant(1.0);
        m.symbols.insert(name.to_string());
        m
    }

    fn oscillating(coefficient: f64, oscillation: Oscillation) -> Self {
        Self {
            oscillation: Some(oscillation),
            ..Self::constant(coefficient)
        }
    }

    pub fn is_constant(&self) -> bool {
        self.rate == 0.0 && self.t_power == 0 && self.oscillation.is_none()
    }

    fn mul(&self, other: &Monomial) -> Result<Monomial, String> {
        let oscillation = match (self.oscillation, other.oscillation) {
            (Some(_), Some(_)) => {
                return Err("Products of oscillating factors are not supported".to_string())
            }
            (a, b) => a.or(b),
        };
        Ok(Monomial {
            coefficient: self.coefficient * other.coefficient,
            rate: self.rate + other.rate,
            t_power: self.t_power + other.t_power,
            oscillation,
            symbols: self.symbols.union(&other.symbols).cloned().collect(),
        })
    }

    fn reciprocal(&self) -> Result<Monomial, String> {
        if self.oscillation.is_some() || !self.symbols.is_empty() {
            return Err("Cannot divide by an oscillating or symbolic factor".to_string());
        }
        if self.coefficient == 0.0 {
            return Err("Division by zero".to_string());
        }
        Ok(Monomial {
            coefficient: 1.0 / self.coefficient,
            rate: -self.rate,
            t_power: -self.t_power,
            oscillation: None,
            symbols: BTreeSet::new(),
        })
    }

    fn negated(mut self) -> Self {
        self.coefficient = -self.coefficient;
        self
    }
}

const MAX_EXPANDED_POWER: u32 = 8;

/// Expands an expression in `t` into a sum of monomials.
pub fn expand(expr: &Expr) -> Result<Vec<Monomial>, String> {
    let terms = match expr {
        Expr::Number(n) => vec![Monomial::constant(*n)],
        Expr::Variable(name) if name == TIME_VAR => vec![Monomial {
            t_power: 1,
            ..Monomial::constant(1.0)
        }],
        Expr::Variable(name) if name == "e" => vec![Monomial::constant(E)],
        Expr::Variable(name) => vec![Monomial::symbol(name)],
        Expr::Unary(_, inner) => expand(inner)?.into_iter().map(Monomial::negated).collect(),
        Expr::Binary(left, op, right) => match op {
            '+' => {
                let mut terms = expand(left)?;
                terms.extend(expand(right)?);
                terms
            }
            '-' => {
                let mut terms = expand(left)?;
                terms.extend(expand(right)?.into_iter().map(Monomial::negated));
                terms
            }
            '*' => multiply(&expand(left)?, &expand(right)?)?,
            '/' => {
                let denominator = expand(right)?;
                if denominator.len() != 1 {
                    return Err("Cannot divide by a sum".to_string());
                }
                let reciprocal = denominator[0].reciprocal()?;
                multiply(&expand(left)?, &[reciprocal])?
            }
            '^' => expand_power(left, right)?,
            _ => return Err(format!("Unknown binary operator: {}", op)),
        },
        Expr::Call(name, arg) => expand_call(name, arg)?,
        Expr::Unsupported(command) => return Err(format!("Unsupported command \\{}", command)),
    };
    Ok(terms
        .into_iter()
        .filter(|m| m.coefficient != 0.0)
        .collect())
}

fn multiply(left: &[Monomial], right: &[Monomial]) -> Result<Vec<Monomial>, String> {
    let mut out = Vec::with_capacity(left.len() * right.len());
    for a in left {
        for b in right {
            out.push(a.mul(b)?);
        }
    }
    Ok(out)
}

/// Expands an expression term by term, dropping the summands that cannot be
/// expanded instead of failing as a whole. Returns the expanded terms and
/// the reason each dropped summand was rejected.
pub fn expand_lenient(expr: &Expr) -> (Vec<Monomial>, Vec<String>) {
    let mut rejected = Vec::new();
    let terms = expand_summands(expr, &mut rejected)
        .into_iter()
        .filter(|m| m.coefficient != 0.0)
        .collect();
    (terms, rejected)
}

fn expand_summands(expr: &Expr, rejected: &mut Vec<String>) -> Vec<Monomial> {
    match expr {
        Expr::Binary(left, '+', right) => {
            let mut terms = expand_summands(left, rejected);
            terms.extend(expand_summands(right, rejected));
            terms
        }
        Expr::Binary(left, '-', right) => {
            let mut terms = expand_summands(left, rejected);
            terms.extend(expand_summands(right, rejected).into_iter().map(Monomial::negated));
            terms
        }
        Expr::Unary(_, inner) => expand_summands(inner, rejected)
            .into_iter()
            .map(Monomial::negated)
            .collect(),
        // `(C1 cos(2t) + C2 sin(2t)) e^{-t}` keeps every product that works.
        Expr::Binary(left, '*', right) => {
            let left = expand_summands(left, rejected);
            let right = expand_summands(right, rejected);
            let mut out = Vec::with_capacity(left.len() * right.len());
            for a in &left {
                for b in &right {
                    match a.mul(b) {
                        Ok(product) => out.push(product),
                        Err(reason) => rejected.push(reason),
                    }
                }
            }
            out
        }
        _ => expand(expr).unwrap_or_else(|reason| {
            rejected.push(reason);
            Vec::new()
        }),
    }
}

fn expand_power(base: &Expr, exponent: &Expr) -> Result<Vec<Monomial>, String> {
    let exponent = exponent
        .constant_value()
        .ok_or_else(|| "Exponent must be constant".to_string())?;
    if let Some(base) = base.constant_value() {
        return Ok(vec![Monomial::constant(base.powf(exponent))]);
    }
    if exponent < 0.0 || exponent.fract() != 0.0 || exponent > MAX_EXPANDED_POWER as f64 {
        return Err(format!("Unsupported power {}", exponent));
    }
    let base = expand(base)?;
    let mut result = vec![Monomial::constant(1.0)];
    for _ in 0..exponent as u32 {
        result = multiply(&result, &base)?;
    }
    Ok(result)
}

fn expand_call(name: &str, arg: &Expr) -> Result<Vec<Monomial>, String> {
    let (slope, phase) = arg
        .linear_in(TIME_VAR)
        .ok_or_else(|| format!("Argument of {} is not linear in t", name))?;
    let terms = match name {
        "exp" => vec![Monomial {
            rate: slope,
            ..Monomial::constant(phase.exp())
        }],
        "tan" | "sqrt" if slope == 0.0 => {
            let value = if name == "tan" { phase.tan() } else { phase.sqrt() };
            if !value.is_finite() {
                return Err(format!("{}({}) is not finite", name, phase));
            }
            vec![Monomial::constant(value)]
        }
        "sin" | "cos" if slope == 0.0 => {
            let value = if name == "sin" { phase.sin() } else { phase.cos() };
            vec![Monomial::constant(value)]
        }
        // sin(wt + p) = cos(p) sin(wt) + sin(p) cos(wt); sin(-wt) = -sin(wt).
        "sin" => {
            let sign = slope.signum();
            let w = slope.abs();
            vec![
                Monomial::oscillating(sign * phase.cos(), Oscillation::Sin(w)),
                Monomial::oscillating(phase.sin(), Oscillation::Cos(w)),
            ]
        }
        // cos(wt + p) = cos(p) cos(wt) - sin(p) sin(wt); cos is even.
        "cos" => {
            let sign = slope.signum();
            let w = slope.abs();
            vec![
                Monomial::oscillating(phase.cos(), Oscillation::Cos(w)),
                Monomial::oscillating(-sign * phase.sin(), Oscillation::Sin(w)),
            ]
        }
        _ => return Err(format!("Unsupported function: {}", name)),
    };
    Ok(terms)
}

/// True when `name` is an integration-constant placeholder such as `C1` or `c2`.
pub fn is_placeholder(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some('C') | Some('c'))
        && name.len() > 1
        && chars.all(|c| c.is_ascii_digit())
}

/// Scans raw text for `C1`, `C_1`, `C_{2}`, `c1`, ... without parsing it.
pub fn find_placeholders(text: &str) -> BTreeSet<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut found = BTreeSet::new();
    for (i, &c) in chars.iter().enumerate() {
        if c != 'C' && c != 'c' {
            continue;
        }
        if i > 0 && (chars[i - 1].is_alphabetic() || chars[i - 1] == '\\') {
            continue;
        }
        let mut j = i + 1;
        if chars.get(j) == Some(&'_') {
            j += 1;
            if chars.get(j) == Some(&'{') {
                j += 1;
            }
        }
        if let Some(&d) = chars.get(j) {
            if d == '1' || d == '2' {
                found.insert(format!("C{}", d));
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand_str(input: &str) -> Vec<Monomial> {
        let expr = parse(input).expect("expression should parse");
        expand(&expr).expect("expression should expand")
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn parses_plain_forcing_literal() {
        let expr = parse("2*cos(3*t)").expect("parse");
        assert_eq!(
            expr,
            Expr::Binary(
                Box::new(Expr::Number(2.0)),
                '*',
                Box::new(Expr::Call(
                    "cos".to_string(),
                    Box::new(Expr::Binary(
                        Box::new(Expr::Number(3.0)),
                        '*',
                        Box::new(Expr::Variable("t".to_string()))
                    ))
                ))
            )
        );
    }

    #[test]
    fn parses_rendered_exponential_and_fraction() {
        let terms = expand_str(r"e^{- \frac{1}{2} t} \sin{\left(\frac{3}{2} t \right)}");
        assert_eq!(terms.len(), 1);
        assert!(approx(terms[0].rate, -0.5));
        assert_eq!(terms[0].oscillation, Some(Oscillation::Sin(1.5)));
        assert!(approx(terms[0].coefficient, 1.0));
    }

    #[test]
    fn subscripts_form_placeholder_names() {
        let terms = expand_str(r"C_{1} \cos{\left(2 t \right)} + C_2 \sin(2t) + c1");
        let names: Vec<String> = terms
            .iter()
            .flat_map(|m| m.symbols.iter().cloned())
            .collect();
        assert_eq!(names, vec!["C1", "C2", "c1"]);
        assert!(names.iter().all(|n| is_placeholder(n)));
    }

    #[test]
    fn distributes_linear_factor_over_exponential() {
        let terms = expand_str(r"\left(2 t + 1\right) e^{- 3 t}");
        assert_eq!(terms.len(), 2);
        assert!(terms.iter().all(|m| approx(m.rate, -3.0)));
        let linear = terms.iter().find(|m| m.t_power == 1).expect("t term");
        let constant = terms.iter().find(|m| m.t_power == 0).expect("constant term");
        assert!(approx(linear.coefficient, 2.0));
        assert!(approx(constant.coefficient, 1.0));
    }

    #[test]
    fn phase_shift_splits_into_sin_and_cos() {
        let terms = expand_str("sin(2*t + pi/2)");
        let cos = terms
            .iter()
            .find(|m| matches!(m.oscillation, Some(Oscillation::Cos(_))))
            .expect("cos part");
        assert!(approx(cos.coefficient, 1.0));
        assert!(terms
            .iter()
            .filter(|m| matches!(m.oscillation, Some(Oscillation::Sin(_))))
            .all(|m| m.coefficient.abs() < 1e-12));
    }

    #[test]
    fn negative_frequency_is_normalized() {
        let terms = expand_str("sin(-2t)");
        assert_eq!(terms.len(), 1);
        assert_eq!(terms[0].oscillation, Some(Oscillation::Sin(2.0)));
        assert!(approx(terms[0].coefficient, -1.0));
    }

    #[test]
    fn linear_reading_rejects_symbolic_rates() {
        let expr = parse(r"- \alpha t").expect("parse");
        assert_eq!(expr.linear_in(TIME_VAR), None);
        let err = expand(&parse(r"e^{- \alpha t}").expect("parse"))
            .expect_err("symbolic rate should not expand");
        assert!(err.contains("not linear"), "unexpected error: {err}");
    }

    #[test]
    fn rejects_products_of_oscillations() {
        let expr = parse("sin(t)*cos(t)").expect("parse");
        assert!(expand(&expr).is_err());
    }

    #[test]
    fn parse_reports_unbalanced_groups() {
        assert!(parse("e^{-t").is_err());
        assert!(parse("").is_err());
    }

    #[test]
    fn square_roots_evaluate_inside_arguments() {
        let terms = expand_str(r"e^{- \frac{t}{2}} \sin{\left(\frac{\sqrt{15} t}{2} \right)}");
        assert_eq!(terms.len(), 1);
        assert!(approx(terms[0].rate, -0.5));
        assert_eq!(terms[0].oscillation, Some(Oscillation::Sin(15.0_f64.sqrt() / 2.0)));

        let terms = expand_str(r"\sqrt{2} e^{- 0.5 t}");
        assert!(approx(terms[0].coefficient, 2.0_f64.sqrt()));
        assert!(terms[0].symbols.is_empty());
    }

    #[test]
    fn unknown_commands_are_not_symbols() {
        let expr = parse(r"\Gamma t").expect("parse");
        let err = expand(&expr).expect_err("unknown command should not expand");
        assert!(err.contains("Gamma"), "unexpected error: {err}");
    }

    #[test]
    fn lenient_expansion_drops_only_bad_summands() {
        let expr = parse(r"e^{-0.5 t} \sin(2 t) + \Gamma t - 3 \cos(t) \sin(t)").expect("parse");
        assert!(expand(&expr).is_err());
        let (terms, rejected) = expand_lenient(&expr);
        assert_eq!(rejected.len(), 2);
        assert_eq!(terms.len(), 1);
        assert!(approx(terms[0].rate, -0.5));
        assert_eq!(terms[0].oscillation, Some(Oscillation::Sin(2.0)));
    }

    #[test]
    fn lenient_expansion_distributes_over_grouped_sums() {
        let expr = parse(r"\left(C_{1} \cos{\left(2 t \right)} + \Gamma\right) e^{- t}").expect("parse");
        let (terms, rejected) = expand_lenient(&expr);
        assert_eq!(rejected.len(), 1);
        assert_eq!(terms.len(), 1);
        assert!(approx(terms[0].rate, -1.0));
        assert!(terms[0].symbols.contains("C1"));
    }

    #[test]
    fn raw_scan_finds_placeholders_but_not_frac() {
        let found = find_placeholders(r"C_{1} e^{-t} + \frac{1}{2} c_2 t");
        assert_eq!(
            found.into_iter().collect::<Vec<_>>(),
            vec!["C1".to_string(), "C2".to_string()]
        );
        assert!(find_placeholders(r"\cos{\left(t\right)} + \frac{1}{3}").is_empty());
    }
}
