use crate::constants::{CALCULATOR_ALLOWED, CALCULATOR_MAX_DEPTH};
use crate::registry::{tool_fn, ToolDefinition, ToolRegistry};
use crate::tool_schema::{FieldType, InputSchema};
use crate::types::Result;
use serde_json::Value;

pub fn register(registry: &mut ToolRegistry) -> Result<()> {
    let definition = ToolDefinition::new(
        "calculator",
        "Evaluates a mathematical expression and returns the result. Supports basic arithmetic operations (+, -, *, /).",
        InputSchema::new()
            .required("expression", FieldType::String)
            .describe("The mathematical expression to be solved. Example: '5 * (10 + 2)'"),
    );

    registry.register(
        definition,
        tool_fn(|params| async move {
            let expression = params
                .get("expression")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            tracing::debug!("[🔧] calculator: {}", expression);
            let value = calculate(&expression)?;
            Ok(Value::String(format!(
                "The result of \"{}\" is {}.",
                expression.trim(),
                value
            )))
        }),
    )
}

/// Evaluates `+ - * /` with parentheses and unary minus. Anything else is rejected
/// before parsing.
pub fn calculate(expression: &str) -> std::result::Result<f64, String> {
    if let Some(bad) = expression.chars().find(|c| !CALCULATOR_ALLOWED.contains(*c)) {
        return Err(format!(
            "Invalid character '{}' in expression. Only numbers and + - * / ( ) are allowed.",
            bad
        ));
    }

    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        return Err("Expression is empty".to_string());
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expression()?;
    if parser.pos != parser.tokens.len() {
        return Err(format!("Unexpected token at position {}", parser.pos + 1));
    }
    if !value.is_finite() {
        return Err("Result is not a finite number".to_string());
    }
    Ok(value)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(f64),
    Op(char),
    LParen,
    RParen,
}

fn tokenize(input: &str) -> std::result::Result<Vec<Token>, String> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '+' | '-' | '*' | '/' => {
                tokens.push(Token::Op(c));
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            _ => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                let n = literal
                    .parse::<f64>()
                    .map_err(|_| format!("Invalid number '{}'", literal))?;
                tokens.push(Token::Num(n));
            }
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    // Current factor nesting; bounded so input can't exhaust the stack.
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.peek();
        self.pos += 1;
        t
    }

    // expression := term (('+' | '-') term)*
    fn expression(&mut self) -> std::result::Result<f64, String> {
        let mut value = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    // term := factor (('*' | '/') factor)*
    fn term(&mut self) -> std::result::Result<f64, String> {
        let mut value = self.factor()?;
        while let Some(Token::Op(op @ ('*' | '/'))) = self.peek() {
            self.pos += 1;
            let rhs = self.factor()?;
            if op == '*' {
                value *= rhs;
            } else {
                if rhs == 0.0 {
                    return Err("Division by zero".to_string());
                }
                value /= rhs;
            }
        }
        Ok(value)
    }

    fn factor(&mut self) -> std::result::Result<f64, String> {
        self.depth += 1;
        if self.depth > CALCULATOR_MAX_DEPTH {
            return Err("Expression nested too deeply".to_string());
        }
        let value = self.primary();
        self.depth -= 1;
        value
    }

    // factor := ('-' | '+') factor | number | '(' expression ')'
    fn primary(&mut self) -> std::result::Result<f64, String> {
        match self.next() {
            Some(Token::Op('-')) => Ok(-self.factor()?),
            Some(Token::Op('+')) => self.factor(),
            Some(Token::Num(n)) => Ok(n),
            Some(Token::LParen) => {
                let value = self.expression()?;
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err("Missing closing parenthesis".to_string()),
                }
            }
            Some(t) => Err(format!("Unexpected token {:?}", t)),
            None => Err("Unexpected end of expression".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_and_parentheses() {
        assert_eq!(calculate("2 + 3 * 4").unwrap(), 14.0);
        assert_eq!(calculate("5 * (10 + 2)").unwrap(), 60.0);
        assert_eq!(calculate("-(3 - 5) * 2").unwrap(), 4.0);
        assert_eq!(calculate("10 / 4").unwrap(), 2.5);
        assert_eq!(calculate("1.5 + .5").unwrap(), 2.0);
    }

    #[test]
    fn test_rejections() {
        assert!(calculate("2 ^ 3").unwrap_err().contains("Invalid character '^'"));
        assert!(calculate("process.exit()").is_err());
        assert_eq!(calculate("1 / 0").unwrap_err(), "Division by zero");
        assert!(calculate("(1 + 2").is_err());
        assert!(calculate("1 2").is_err());
        assert!(calculate("1..2").is_err());
        assert!(calculate("   ").is_err());
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let unary = format!("{}1", "-".repeat(20_000));
        assert_eq!(calculate(&unary).unwrap_err(), "Expression nested too deeply");

        let parens = "(".repeat(20_000);
        assert_eq!(calculate(&parens).unwrap_err(), "Expression nested too deeply");

        let ok = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(calculate(&ok).unwrap(), 1.0);
        assert_eq!(calculate("--1").unwrap(), 1.0);
    }

    #[tokio::test]
    async fn test_registered_tool_formats_result() {
        let mut registry = ToolRegistry::new();
        register(&mut registry).unwrap();
        let result = registry
            .invoke("calculator", &serde_json::json!({ "expression": "100 / 8" }))
            .await;
        assert!(result.success);
        assert_eq!(
            result.data,
            Some(Value::String("The result of \"100 / 8\" is 12.5.".into()))
        );

        let failed = registry
            .invoke("calculator", &serde_json::json!({ "expression": "7 / 0" }))
            .await;
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("Division by zero"));

        let nested = format!("{}1", "-".repeat(20_000));
        let deep = registry
            .invoke("calculator", &serde_json::json!({ "expression": nested }))
            .await;
        assert!(!deep.success);
        assert_eq!(deep.error.as_deref(), Some("Expression nested too deeply"));
    }
}
