use crate::error::FilterError;
use crate::shaping::fields::lookup;
use serde_json::Value;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOp {
    Contains,
    Eq,
    Ne,
    Gt,
    Lt,
    /// Any other operator. Matches no item.
    Unknown(String),
}

impl From<&str> for FilterOp {
    /// Operator names are case-sensitive: `GT` is not `gt`.
    fn from(s: &str) -> Self {
        match s {
            "contains" => Self::Contains,
            "eq" => Self::Eq,
            "ne" => Self::Ne,
            "gt" => Self::Gt,
            "lt" => Self::Lt,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// A parsed `field:op:value` directive. The value may itself contain colons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterExpr {
    pub field: String,
    pub op: FilterOp,
    pub value: String,
}

impl FromStr for FilterExpr {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let (Some(field), Some(op), Some(value)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(FilterError::Shape(s.to_string()));
        };
        let field = field.trim();
        if field.is_empty() {
            return Err(FilterError::Shape(s.to_string()));
        }

        Ok(Self {
            field: field.to_string(),
            op: FilterOp::from(op),
            value: value.to_string(),
        })
    }
}

impl FilterExpr {
    /// Keep the items whose field matches. Non-objects and items where the
    /// field is missing or null are dropped.
    pub fn apply(&self, items: Vec<Value>) -> Vec<Value> {
        items.into_iter().filter(|item| self.matches(item)).collect()
    }

    pub fn matches(&self, item: &Value) -> bool {
        let Value::Object(obj) = item else {
            return false;
        };
        let Some(field) = lookup(obj, &self.field) else {
            return false;
        };
        let text = display_value(field);

        match &self.op {
            FilterOp::Contains => text.to_lowercase().contains(&self.value.to_lowercase()),
            FilterOp::Eq => text.to_lowercase() == self.value.to_lowercase(),
            FilterOp::Ne => text.to_lowercase() != self.value.to_lowercase(),
            FilterOp::Gt => compare(&text, &self.value).is_some_and(|(a, b)| a > b),
            FilterOp::Lt => compare(&text, &self.value).is_some_and(|(a, b)| a < b),
            FilterOp::Unknown(_) => false,
        }
    }
}

/// Strings render bare, everything else as compact JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn compare(field: &str, literal: &str) -> Option<(f64, f64)> {
    let a = field.trim().parse::<f64>().ok()?;
    let b = literal.trim().parse::<f64>().ok()?;
    Some((a, b))
}
