use crate::error::ExpressionError;
use crate::point::Point;
use crate::traits::{ReferenceSolution, Scalar, VectorField};
use std::collections::HashMap;

/// OpCodes for the Stack-based Virtual Machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OpCode {
    /// Pushes a constant `f64` value onto the stack.
    LoadConst(f64),
    /// Pushes the value of a variable (by slot) onto the stack.
    /// Slots follow the order variables were declared (e.g., 0=x, 1=y).
    LoadVar(usize),
    /// Pushes the value of a parameter (by index) onto the stack.
    LoadParam(usize),
    /// Pops top two values (b, a), pushes (a + b).
    Add,
    /// Pops top two values (b, a), pushes (a - b).
    Sub,
    /// Pops top two values (b, a), pushes (a * b).
    Mul,
    /// Pops top two values (b, a), pushes (a / b).
    Div,
    /// Pops top two values (b, a), pushes (a ^ b).
    Pow,
    Neg,
    Sin,
    Cos,
    Tan,
    Exp,
    Ln,
    Sqrt,
    Abs,
}

impl OpCode {
    /// Net change of the stack height after executing this op.
    fn stack_effect(self) -> isize {
        match self {
            OpCode::LoadConst(_) | OpCode::LoadVar(_) | OpCode::LoadParam(_) => 1,
            OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div | OpCode::Pow => -1,
            _ => 0,
        }
    }

    fn function(name: &str) -> Option<OpCode> {
        match name {
            "sin" => Some(OpCode::Sin),
            "cos" => Some(OpCode::Cos),
            "tan" => Some(OpCode::Tan),
            "exp" => Some(OpCode::Exp),
            "ln" => Some(OpCode::Ln),
            "sqrt" => Some(OpCode::Sqrt),
            "abs" => Some(OpCode::Abs),
            _ => None,
        }
    }
}

/// Represents a compiled sequence of operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bytecode {
    pub ops: Vec<OpCode>,
    /// Deepest stack the ops reach.
    pub max_depth: usize,
}

/// Stack-based Virtual Machine for evaluating equations.
///
/// The VM is stateless; `execute` takes all necessary context and returns the
/// value left on top of the stack.
pub struct VM;

impl VM {
    pub fn execute<T: Scalar>(
        bytecode: &Bytecode,
        vars: &[T],
        params: &[T],
        stack: &mut Vec<T>,
    ) -> T {
        stack.clear();

        for op in &bytecode.ops {
            match *op {
                OpCode::LoadConst(val) => stack.push(T::lit(val)),
                OpCode::LoadVar(idx) => stack.push(vars.get(idx).copied().unwrap_or_else(T::nan)),
                OpCode::LoadParam(idx) => {
                    stack.push(params.get(idx).copied().unwrap_or_else(T::nan))
                }
                OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div | OpCode::Pow => {
                    let b = pop(stack);
                    let a = pop(stack);
                    stack.push(match op {
                        OpCode::Add => a + b,
                        OpCode::Sub => a - b,
                        OpCode::Mul => a * b,
                        OpCode::Div => a / b,
                        _ => a.powf(b),
                    });
                }
                unary => {
                    let a = pop(stack);
                    stack.push(match unary {
                        OpCode::Neg => -a,
                        OpCode::Sin => a.sin(),
                        OpCode::Cos => a.cos(),
                        OpCode::Tan => a.tan(),
                        OpCode::Exp => a.exp(),
                        OpCode::Ln => a.ln(),
                        OpCode::Sqrt => a.sqrt(),
                        _ => a.abs(),
                    });
                }
            }
        }

        pop(stack)
    }
}

/// Compiled bytecode never underflows; NaN marks a malformed program.
fn pop<T: Scalar>(stack: &mut Vec<T>) -> T {
    stack.pop().unwrap_or_else(T::nan)
}

// --- AST & Parser ---

/// Abstract Syntax Tree nodes for expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Variable(String),
    Binary(Box<Expr>, char, Box<Expr>), // char is operator +, -, *, /, ^
    Neg(Box<Expr>),
    Call(String, Box<Expr>),
}

/// Compiles an AST (`Expr`) into `Bytecode`.
/// Resolves variable and parameter names to indices; `pi` and `e` are
/// constants unless shadowed.
pub struct Compiler {
    pub var_map: HashMap<String, usize>,
    pub param_map: HashMap<String, usize>,
}

impl Compiler {
    pub fn new<S: AsRef<str>>(var_names: &[S], param_names: &[S]) -> Self {
        let index = |names: &[S]| {
            names
                .iter()
                .enumerate()
                .map(|(i, name)| (name.as_ref().to_string(), i))
                .collect::<HashMap<_, _>>()
        };
        Self {
            var_map: index(var_names),
            param_map: index(param_names),
        }
    }

    pub fn compile(&self, expr: &Expr) -> Result<Bytecode, ExpressionError> {
        let mut ops = Vec::new();
        self.compile_recursive(expr, &mut ops)?;

        let mut depth = 0isize;
        let mut max_depth = 0isize;
        for op in &ops {
            depth += op.stack_effect();
            max_depth = max_depth.max(depth);
        }

        Ok(Bytecode {
            ops,
            max_depth: max_depth as usize,
        })
    }

    fn compile_recursive(&self, expr: &Expr, ops: &mut Vec<OpCode>) -> Result<(), ExpressionError> {
        match expr {
            Expr::Number(n) => ops.push(OpCode::LoadConst(*n)),
            Expr::Variable(name) => {
                if let Some(&idx) = self.var_map.get(name) {
                    ops.push(OpCode::LoadVar(idx));
                } else if let Some(&idx) = self.param_map.get(name) {
                    ops.push(OpCode::LoadParam(idx));
                } else if name == "pi" {
                    ops.push(OpCode::LoadConst(std::f64::consts::PI));
                } else if name == "e" {
                    ops.push(OpCode::LoadConst(std::f64::consts::E));
                } else {
                    return Err(ExpressionError::UnknownSymbol(name.clone()));
                }
            }
            Expr::Binary(left, op, right) => {
                self.compile_recursive(left, ops)?;
                self.compile_recursive(right, ops)?;
                ops.push(match op {
                    '+' => OpCode::Add,
                    '-' => OpCode::Sub,
                    '*' => OpCode::Mul,
                    '/' => OpCode::Div,
                    _ => OpCode::Pow,
                });
            }
            Expr::Neg(operand) => {
                self.compile_recursive(operand, ops)?;
                ops.push(OpCode::Neg);
            }
            Expr::Call(func, arg) => {
                let code = OpCode::function(func)
                    .ok_or_else(|| ExpressionError::UnknownFunction(func.clone()))?;
                self.compile_recursive(arg, ops)?;
                ops.push(code);
            }
        }
        Ok(())
    }
}

/// Parses a string expression into an AST.
///
/// Grammar, loosest binding first: `+ -`, `* /`, unary `-`, `^`
/// (right-associative), then numbers, names, calls and parentheses.
pub fn parse(input: &str) -> Result<Expr, ExpressionError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_sum()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(ExpressionError::UnexpectedToken(format!("{token:?}"))),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Identifier(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, ExpressionError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c.is_ascii_digit() || c == '.' {
            let mut literal = String::new();
            while let Some(&(_, d)) = chars.peek() {
                let exponent_sign = (d == '+' || d == '-') && literal.ends_with(|ch| ch == 'e' || ch == 'E');
                if d.is_ascii_digit() || d == '.' || d == 'e' || d == 'E' || exponent_sign {
                    literal.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            let value = literal
                .parse()
                .map_err(|_| ExpressionError::InvalidNumber(literal.clone()))?;
            tokens.push(Token::Number(value));
        } else if c.is_alphabetic() || c == '_' {
            let mut ident = String::new();
            while let Some(&(_, d)) = chars.peek() {
                if d.is_alphanumeric() || d == '_' {
                    ident.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Identifier(ident));
        } else {
            tokens.push(match c {
                '+' => Token::Plus,
                '-' => Token::Minus,
                '*' => Token::Star,
                '/' => Token::Slash,
                '^' => Token::Caret,
                '(' => Token::LParen,
                ')' => Token::RParen,
                _ => return Err(ExpressionError::UnexpectedChar(c, offset)),
            });
            chars.next();
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn consume(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn parse_sum(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.parse_product()?;
        while let Some(op) = match self.peek() {
            Some(Token::Plus) => Some('+'),
            Some(Token::Minus) => Some('-'),
            _ => None,
        } {
            self.consume();
            let right = self.parse_product()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_product(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.parse_unary()?;
        while let Some(op) = match self.peek() {
            Some(Token::Star) => Some('*'),
            Some(Token::Slash) => Some('/'),
            _ => None,
        } {
            self.consume();
            let right = self.parse_unary()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ExpressionError> {
        if let Some(Token::Minus) = self.peek() {
            self.consume();
            let operand = self.parse_unary()?;
            return Ok(Expr::Neg(Box::new(operand)));
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> Result<Expr, ExpressionError> {
        let base = self.parse_primary()?;
        if let Some(Token::Caret) = self.peek() {
            self.consume();
            // Right-associative; the exponent may carry its own sign.
            let exponent = self.parse_unary()?;
            return Ok(Expr::Binary(Box::new(base), '^', Box::new(exponent)));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> Result<Expr, ExpressionError> {
        match self.consume() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Identifier(name)) => {
                if let Some(Token::LParen) = self.peek() {
                    self.consume();
                    let arg = self.parse_sum()?;
                    self.expect_rparen()?;
                    Ok(Expr::Call(name, Box::new(arg)))
                } else {
                    Ok(Expr::Variable(name))
                }
            }
            Some(Token::LParen) => {
                let expr = self.parse_sum()?;
                self.expect_rparen()?;
                Ok(expr)
            }
            Some(token) => Err(ExpressionError::UnexpectedToken(format!("{token:?}"))),
            None => Err(ExpressionError::UnexpectedEnd),
        }
    }

    fn expect_rparen(&mut self) -> Result<(), ExpressionError> {
        match self.consume() {
            Some(Token::RParen) => Ok(()),
            _ => Err(ExpressionError::UnclosedParen),
        }
    }
}

fn compile_with(
    expression: &str,
    var_names: &[&str],
    param_names: &[String],
    params: &[f64],
) -> Result<Bytecode, ExpressionError> {
    if param_names.len() != params.len() {
        return Err(ExpressionError::ParamMismatch {
            names: param_names.len(),
            values: params.len(),
        });
    }
    let names: Vec<&str> = param_names.iter().map(String::as_str).collect();
    let parsed = parse(expression)?;
    Compiler::new(var_names, names.as_slice()).compile(&parsed)
}

/// A vector field f(x, y) defined by a text expression over `x`, `y` and
/// named parameters.
///
/// Evaluation allocates its own stack per call, so a field can be shared
/// across threads.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionField {
    source: String,
    code: Bytecode,
    params: Vec<f64>,
}

impl ExpressionField {
    pub fn new(
        expression: &str,
        param_names: &[String],
        params: &[f64],
    ) -> Result<Self, ExpressionError> {
        let code = compile_with(expression, &["x", "y"], param_names, params)?;
        Ok(Self {
            source: expression.to_string(),
            code,
            params: params.to_vec(),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl VectorField<f64> for ExpressionField {
    fn slope(&self, point: Point) -> f64 {
        let mut stack = Vec::with_capacity(self.code.max_depth);
        VM::execute(&self.code, &[point.x, point.y], &self.params, &mut stack)
    }
}

/// A reference solution y(x) defined by a text expression over `x` and named
/// parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionSolution {
    source: String,
    code: Bytecode,
    params: Vec<f64>,
}

impl ExpressionSolution {
    pub fn new(
        expression: &str,
        param_names: &[String],
        params: &[f64],
    ) -> Result<Self, ExpressionError> {
        let code = compile_with(expression, &["x"], param_names, params)?;
        Ok(Self {
            source: expression.to_string(),
            code,
            params: params.to_vec(),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl ReferenceSolution<f64> for ExpressionSolution {
    fn value(&self, x: f64) -> f64 {
        let mut stack = Vec::with_capacity(self.code.max_depth);
        VM::execute(&self.code, &[x], &self.params, &mut stack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(expression: &str, x: f64, y: f64) -> f64 {
        let field = ExpressionField::new(expression, &[], &[]).expect("compile");
        field.slope(Point::new(x, y))
    }

    #[test]
    fn precedence_follows_usual_rules() {
        assert_eq!(eval("1 + 2 * 3", 0.0, 0.0), 7.0);
        assert_eq!(eval("(1 + 2) * 3", 0.0, 0.0), 9.0);
        assert_eq!(eval("-x^2", 3.0, 0.0), -9.0);
        assert_eq!(eval("2^3^2", 0.0, 0.0), 512.0);
        assert_eq!(eval("x^-1", 4.0, 0.0), 0.25);
        assert_eq!(eval("8 / 4 / 2", 0.0, 0.0), 1.0);
        assert_eq!(eval("1.5e2 + 25E-2", 0.0, 0.0), 150.25);
    }

    #[test]
    fn cubic_field_matches_closed_form() {
        let field = ExpressionField::new("x^3*y^3 - x*y", &[], &[]).expect("compile");
        let (x, y): (f64, f64) = (1.5, 0.75);
        let expected = x.powf(3.0) * y.powf(3.0) - x * y;
        assert_eq!(field.slope(Point::new(x, y)), expected);
    }

    #[test]
    fn reference_solution_uses_functions() {
        let solution = ExpressionSolution::new("1/sqrt(x^2+1)", &[], &[]).expect("compile");
        assert!((solution.value(0.0) - 1.0).abs() < 1e-15);
        assert!((solution.value(3.0) - 1.0 / 10f64.sqrt()).abs() < 1e-15);
    }

    #[test]
    fn parameters_and_constants_resolve() {
        let field = ExpressionField::new(
            "a*sin(pi*x) + b*y",
            &["a".to_string(), "b".to_string()],
            &[2.0, -1.0],
        )
        .expect("compile");
        let value = field.slope(Point::new(0.5, 3.0));
        assert!((value - (2.0 - 3.0)).abs() < 1e-12);
    }

    #[test]
    fn bad_expressions_are_errors() {
        let cases = [
            ("x + z", "unknown variable or parameter: z"),
            ("foo(x)", "unknown function: foo"),
            ("(x + 1", "expected ')'"),
            ("x +", "unexpected end"),
            ("x $ y", "unexpected character '$'"),
            ("x y", "unexpected token"),
            ("1.2.3", "invalid number"),
        ];
        for (expression, needle) in cases {
            let err = ExpressionField::new(expression, &[], &[]).expect_err(expression);
            let message = format!("{err}");
            assert!(
                message.contains(needle),
                "expected error to contain \"{needle}\", got \"{message}\""
            );
        }
    }

    #[test]
    fn parameter_lengths_must_match() {
        let err = ExpressionSolution::new("a*x", &["a".to_string()], &[]).expect_err("mismatch");
        assert_eq!(err, ExpressionError::ParamMismatch { names: 1, values: 0 });
    }

    #[test]
    fn compiled_depth_bounds_the_stack() {
        let parsed = parse("x*(y+(x*(y+1)))").expect("parse");
        let code = Compiler::new(&["x", "y"], &[]).compile(&parsed).expect("compile");
        assert_eq!(code.max_depth, 5);
    }

    #[test]
    fn expression_field_is_shareable_across_threads() {
        fn assert_sync<T: Send + Sync>() {}
        assert_sync::<ExpressionField>();
        assert_sync::<ExpressionSolution>();
    }
}
