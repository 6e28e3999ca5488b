use crate::types::Message;

/// Compiled form of a client-class test expression. Option names are
/// resolved to codes at configuration time; evaluation never parses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Eq(Operand, Vec<u8>),
    Ne(Operand, Vec<u8>),
    Exists(u8),
    NotExists(u8),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// The option's value.
    Option(u8),
    /// A byte slice of the option's value: code, start, length.
    Substring(u8, usize, usize),
}

impl Operand {
    fn bytes(&self, message: &Message) -> Option<Vec<u8>> {
        match self {
            Operand::Option(code) => message.get_option(*code).map(|o| o.text_value()),
            Operand::Substring(code, start, len) => {
                let value = message.get_option(*code)?.text_value();
                let start = (*start).min(value.len());
                let end = start.saturating_add(*len).min(value.len());
                Some(value[start..end].to_vec())
            }
        }
    }
}

impl Expr {
    /// Evaluate against a packet. A comparison whose option is absent
    /// never matches, in either polarity.
    pub fn matches(&self, message: &Message) -> bool {
        match self {
            Expr::Or(a, b) => a.matches(message) || b.matches(message),
            Expr::And(a, b) => a.matches(message) && b.matches(message),
            Expr::Eq(operand, literal) => {
                operand.bytes(message).is_some_and(|b| b == *literal)
            }
            Expr::Ne(operand, literal) => {
                operand.bytes(message).is_some_and(|b| b != *literal)
            }
            Expr::Exists(code) => message.get_option(*code).is_some(),
            Expr::NotExists(code) => message.get_option(*code).is_none(),
        }
    }
}
