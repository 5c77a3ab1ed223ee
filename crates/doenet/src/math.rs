//! Opaque math value.
//!
//! The engine never does symbolic math. A `MathExpr` only needs to be parsed
//! from authored text, compared, printed and serialized as a math-expressions
//! style tree (`["+", "x", 1]`).

use chumsky::{pratt::*, prelude::*};
use serde_json::json;
use std::fmt;
use std::sync::Arc;

const BLANK: &str = "\u{ff3f}";

const FUNCTIONS: &[&str] = &[
    "f", "g", "sin", "cos", "tan", "sec", "csc", "cot", "arcsin", "arccos", "arctan", "exp",
    "ln", "log", "sqrt", "abs",
];

const NAMED_SYMBOLS: &[&str] = &[
    "pi", "theta", "alpha", "beta", "gamma", "delta", "lambda", "mu", "sigma", "phi", "omega",
    "infinity",
];

#[derive(Clone, Debug, PartialEq)]
pub enum MathTree {
    Number(f64),
    Symbol(Arc<str>),
    Operator { op: Arc<str>, operands: Vec<MathTree> },
    Blank,
}

impl MathTree {
    fn operator(op: &str, operands: Vec<MathTree>) -> Self {
        MathTree::Operator { op: op.into(), operands }
    }

    fn op_name(&self) -> Option<&str> {
        match self {
            MathTree::Operator { op, .. } => Some(op),
            _ => None,
        }
    }

    fn negate(self) -> Self {
        match self {
            MathTree::Number(n) => MathTree::Number(-n),
            other => MathTree::operator("-", vec![other]),
        }
    }

    /// Flattening constructor for the associative operators.
    fn associative(op: &str, left: MathTree, right: MathTree) -> Self {
        let mut operands = Vec::new();
        for side in [left, right] {
            match side {
                MathTree::Operator { op: inner, operands: nested } if inner.as_ref() == op => {
                    operands.extend(nested)
                }
                other => operands.push(other),
            }
        }
        MathTree::operator(op, operands)
    }

    fn product(mut factors: Vec<MathTree>) -> Self {
        if factors.len() == 1 {
            return factors.remove(0);
        }
        factors
            .into_iter()
            .reduce(|left, right| MathTree::associative("*", left, right))
            .unwrap_or(MathTree::Blank)
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            MathTree::Number(n) => crate::value::number_to_json(*n),
            MathTree::Symbol(name) => json!(name.as_ref()),
            MathTree::Operator { op, operands } => {
                let mut items = vec![json!(op.as_ref())];
                items.extend(operands.iter().map(MathTree::to_json));
                serde_json::Value::Array(items)
            }
            MathTree::Blank => json!(BLANK),
        }
    }

    fn evaluate(&self) -> Option<f64> {
        match self {
            MathTree::Number(n) => Some(*n),
            MathTree::Symbol(name) => match name.as_ref() {
                "pi" => Some(std::f64::consts::PI),
                "e" => Some(std::f64::consts::E),
                "infinity" => Some(f64::INFINITY),
                _ => None,
            },
            MathTree::Blank => None,
            MathTree::Operator { op, operands } if op.as_ref() == "apply" => {
                match operands.as_slice() {
                    [MathTree::Symbol(function), argument] => {
                        apply_function(function, argument.evaluate()?)
                    }
                    _ => None,
                }
            }
            MathTree::Operator { op, operands } => {
                let values = operands.iter().map(MathTree::evaluate).collect::<Option<Vec<_>>>()?;
                match (op.as_ref(), values.as_slice()) {
                    ("+", values) => Some(values.iter().sum()),
                    ("*", values) => Some(values.iter().product()),
                    ("-", [value]) => Some(-value),
                    ("/", [numerator, denominator]) => Some(numerator / denominator),
                    ("^", [base, exponent]) => Some(base.powf(*exponent)),
                    _ => None,
                }
            }
        }
    }

    /// Operands of `+` and `*` are compared as multisets.
    fn normalized(&self) -> MathTree {
        match self {
            MathTree::Operator { op, operands } => {
                let mut operands = operands.iter().map(MathTree::normalized).collect::<Vec<_>>();
                if matches!(op.as_ref(), "+" | "*") {
                    operands.sort_by_key(|operand| operand.to_string());
                }
                MathTree::Operator { op: op.clone(), operands }
            }
            other => other.clone(),
        }
    }

    fn precedence(&self) -> u8 {
        match self.op_name() {
            Some("+") => 1,
            Some("*") | Some("/") | Some("-") => 2,
            Some("^") => 3,
            _ => 4,
        }
    }

    fn write_operand(&self, f: &mut fmt::Formatter, parent: u8) -> fmt::Result {
        if self.precedence() < parent {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

fn apply_function(name: &str, x: f64) -> Option<f64> {
    Some(match name {
        "sin" => x.sin(),
        "cos" => x.cos(),
        "tan" => x.tan(),
        "exp" => x.exp(),
        "ln" | "log" => x.ln(),
        "sqrt" => x.sqrt(),
        "abs" => x.abs(),
        "arcsin" => x.asin(),
        "arccos" => x.acos(),
        "arctan" => x.atan(),
        _ => return None,
    })
}

impl fmt::Display for MathTree {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MathTree::Number(n) => write!(f, "{}", crate::value::format_number(*n)),
            MathTree::Symbol(name) => write!(f, "{name}"),
            MathTree::Blank => write!(f, "{BLANK}"),
            MathTree::Operator { op, operands } => match (op.as_ref(), operands.as_slice()) {
                ("+", [first, rest @ ..]) => {
                    first.write_operand(f, 1)?;
                    for term in rest {
                        match term {
                            MathTree::Operator { op, operands } if op.as_ref() == "-" => {
                                write!(f, " - ")?;
                                for operand in operands {
                                    operand.write_operand(f, 2)?;
                                }
                            }
                            MathTree::Number(n) if *n < 0.0 => {
                                write!(f, " - {}", crate::value::format_number(-n))?
                            }
                            other => {
                                write!(f, " + ")?;
                                other.write_operand(f, 1)?;
                            }
                        }
                    }
                    Ok(())
                }
                ("*", factors) => {
                    for (index, factor) in factors.iter().enumerate() {
                        if index > 0 {
                            write!(f, " ")?;
                        }
                        factor.write_operand(f, 3)?;
                    }
                    Ok(())
                }
                ("-", [operand]) => {
                    write!(f, "-")?;
                    operand.write_operand(f, 3)
                }
                ("/", [numerator, denominator]) => {
                    numerator.write_operand(f, 3)?;
                    write!(f, "/")?;
                    denominator.write_operand(f, 4)
                }
                ("^", [base, exponent]) => {
                    base.write_operand(f, 4)?;
                    write!(f, "^")?;
                    match exponent {
                        MathTree::Number(n) if *n >= 0.0 => write!(f, "{exponent}"),
                        MathTree::Symbol(_) => write!(f, "{exponent}"),
                        _ => write!(f, "({exponent})"),
                    }
                }
                ("apply", [function, argument]) => match argument {
                    MathTree::Operator { op, .. } if op.as_ref() == "tuple" => {
                        write!(f, "{function}{argument}")
                    }
                    _ => write!(f, "{function}({argument})"),
                },
                ("tuple", items) => {
                    write!(f, "(")?;
                    for (index, item) in items.iter().enumerate() {
                        if index > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{item}")?;
                    }
                    write!(f, ")")
                }
                (op, operands) => {
                    write!(f, "{op}(")?;
                    for (index, operand) in operands.iter().enumerate() {
                        if index > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{operand}")?;
                    }
                    write!(f, ")")
                }
            },
        }
    }
}

/// Splits an identifier run into single-letter factors unless it is a known name.
fn word(letters: &str, digits: Option<&str>, arguments: Option<MathTree>) -> MathTree {
    if let Some(arguments) = arguments {
        if digits.is_none() && FUNCTIONS.contains(&letters) {
            return MathTree::operator("apply", vec![MathTree::Symbol(letters.into()), arguments]);
        }
        let mut factors = symbols(letters, digits);
        factors.push(arguments);
        return MathTree::product(factors);
    }
    MathTree::product(symbols(letters, digits))
}

fn symbols(letters: &str, digits: Option<&str>) -> Vec<MathTree> {
    let mut factors = if NAMED_SYMBOLS.contains(&letters) || FUNCTIONS.contains(&letters) {
        vec![letters.to_string()]
    } else {
        letters.chars().map(String::from).collect()
    };
    if let (Some(digits), Some(last)) = (digits, factors.last_mut()) {
        last.push_str(digits);
    }
    factors.into_iter().map(|name| MathTree::Symbol(name.into())).collect()
}

fn parser<'src>() -> impl Parser<'src, &'src str, MathTree, extra::Err<Rich<'src, char>>> {
    recursive(|expression| {
        let number = text::int(10)
            .then(just('.').then(text::digits(10)).or_not())
            .to_slice()
            .or(just('.').then(text::digits(10)).to_slice())
            .from_str::<f64>()
            .unwrapped()
            .map(MathTree::Number);

        let group = expression
            .clone()
            .separated_by(just(',').padded())
            .at_least(1)
            .collect::<Vec<MathTree>>()
            .delimited_by(just('(').padded(), just(')').padded())
            .map(|mut items: Vec<MathTree>| {
                if items.len() == 1 {
                    items.remove(0)
                } else {
                    MathTree::operator("tuple", items)
                }
            });

        let identifier = any()
            .filter(char::is_ascii_alphabetic)
            .repeated()
            .at_least(1)
            .to_slice()
            .then(text::digits(10).to_slice().or_not())
            .then(group.clone().or_not())
            .map(|((letters, digits), arguments)| word(letters, digits, arguments));

        let primary = choice((number, identifier, group)).padded();

        let power = recursive(|power| {
            let exponent = just('-')
                .padded()
                .or_not()
                .then(power)
                .map(|(minus, exponent): (Option<char>, MathTree)| {
                    if minus.is_some() { exponent.negate() } else { exponent }
                });
            primary
                .clone()
                .then(just('^').padded().ignore_then(exponent).or_not())
                .map(|(base, exponent)| match exponent {
                    Some(exponent) => MathTree::operator("^", vec![base, exponent]),
                    None => base,
                })
        });

        let juxtaposed = power
            .repeated()
            .at_least(1)
            .collect::<Vec<MathTree>>()
            .map(MathTree::product);

        juxtaposed.pratt((
            prefix(3, just('-').padded(), |_, operand: MathTree, _| operand.negate()),
            infix(left(1), just('+').padded(), |l, _, r, _| {
                MathTree::associative("+", l, r)
            }),
            infix(left(1), just('-').padded(), |l, _, r: MathTree, _| {
                MathTree::associative("+", l, r.negate())
            }),
            infix(left(2), just('*').padded(), |l, _, r, _| {
                MathTree::associative("*", l, r)
            }),
            infix(left(2), just('/').padded(), |l, _, r, _| {
                MathTree::operator("/", vec![l, r])
            }),
        ))
    })
}

#[derive(Clone, Debug, PartialEq)]
pub struct MathExpr {
    tree: MathTree,
}

impl MathExpr {
    pub fn blank() -> Self {
        Self { tree: MathTree::Blank }
    }

    pub fn number(value: f64) -> Self {
        Self { tree: MathTree::Number(value) }
    }

    pub fn symbol(name: &str) -> Self {
        Self { tree: MathTree::Symbol(name.into()) }
    }

    /// Parse authored math text. Whitespace-only text is the blank expression.
    pub fn parse(text: &str) -> Result<Self, String> {
        if text.trim().is_empty() {
            return Ok(Self::blank());
        }
        let (output, errors) = parser().then_ignore(end()).parse(text).into_output_errors();
        match output {
            Some(tree) if errors.is_empty() => Ok(Self { tree }),
            _ => Err(errors
                .first()
                .map(|error| error.to_string())
                .unwrap_or_else(|| format!("Invalid math '{text}'"))),
        }
    }

    pub fn tree(&self) -> &MathTree {
        &self.tree
    }

    pub fn is_blank(&self) -> bool {
        self.tree == MathTree::Blank
    }

    pub fn to_json(&self) -> serde_json::Value {
        self.tree.to_json()
    }

    pub fn evaluate_to_number(&self) -> Option<f64> {
        self.tree.evaluate()
    }

    /// Equality used when grading: numeric when both sides evaluate, otherwise
    /// structural modulo reordering of sums and products.
    pub fn equivalent(&self, other: &MathExpr) -> bool {
        match (self.evaluate_to_number(), other.evaluate_to_number()) {
            (Some(a), Some(b)) => (a - b).abs() <= 1e-10 * a.abs().max(b.abs()).max(1.0),
            _ => self.tree.normalized() == other.tree.normalized(),
        }
    }
}

impl fmt::Display for MathExpr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(text: &str) -> serde_json::Value {
        MathExpr::parse(text).unwrap().to_json()
    }

    #[test]
    fn parses_sums_as_flat_trees() {
        assert_eq!(tree("x+1"), json!(["+", "x", 1]));
        assert_eq!(tree("x - y + 2"), json!(["+", "x", ["-", "y"], 2]));
    }

    #[test]
    fn parses_implicit_multiplication_and_powers() {
        assert_eq!(tree("2x^2"), json!(["*", 2, ["^", "x", 2]]));
        assert_eq!(tree("-x^2"), json!(["-", ["^", "x", 2]]));
        assert_eq!(tree("x^-2"), json!(["^", "x", -2]));
        assert_eq!(tree("xy"), json!(["*", "x", "y"]));
    }

    #[test]
    fn parses_function_application() {
        assert_eq!(tree("sin(x)"), json!(["apply", "sin", "x"]));
        assert_eq!(tree("x(y+1)"), json!(["*", "x", ["+", "y", 1]]));
    }

    #[test]
    fn blank_and_invalid_input() {
        assert!(MathExpr::parse("  ").unwrap().is_blank());
        assert!(MathExpr::parse("x+").is_err());
    }

    #[test]
    fn prints_readable_text() {
        assert_eq!(MathExpr::parse("x+1").unwrap().to_string(), "x + 1");
        assert_eq!(MathExpr::parse("x-y").unwrap().to_string(), "x - y");
        assert_eq!(MathExpr::parse("2x").unwrap().to_string(), "2 x");
        assert_eq!(MathExpr::parse("(x+1)^2").unwrap().to_string(), "(x + 1)^2");
    }

    #[test]
    fn equivalence_is_numeric_or_reordered() {
        let a = MathExpr::parse("1+2").unwrap();
        let b = MathExpr::parse("3").unwrap();
        assert!(a.equivalent(&b));
        let c = MathExpr::parse("y+x").unwrap();
        let d = MathExpr::parse("x+y").unwrap();
        assert!(c.equivalent(&d));
        assert!(!c.equivalent(&a));
    }
}
