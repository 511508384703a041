//! Shell constructor rewriting
//!
//! Command bodies copied from the interactive shell carry constructor calls that
//! are not JSON. They are rewritten to their extended JSON equivalents before parsing:
//!
//! | Shell syntax               | Extended JSON                                   |
//! |----------------------------|-------------------------------------------------|
//! | `ObjectId("h")`            | `{"$oid": "h"}`                                 |
//! | `NumberLong("n")`          | `{"$numberLong": "n"}`                          |
//! | `NumberInt(n)`             | `n`                                             |
//! | `NumberDecimal("d")`       | `{"$numberDecimal": "d"}`                       |
//! | `new Date("…")`, `ISODate("…")`, `Date("…")` | `{"$date": {"$numberLong": "<millis>"}}` |
//!
//! Text inside string literals is never touched. Constructor arguments may be
//! single- or double-quoted.

use bson::oid::ObjectId;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

use crate::error::{ConnectorError, Result};

/// Rewrite shell constructors in `body` to extended JSON
///
/// Input without constructors is returned unchanged.
pub fn rewrite(body: &str) -> Result<String> {
    let mut scanner = Scanner { src: body, pos: 0 };
    let mut out = String::with_capacity(body.len());

    while let Some(c) = scanner.peek() {
        if c == '"' {
            out.push_str(scanner.string_literal());
        } else if is_ident_start(c) {
            let start = scanner.pos;
            let ident = scanner.identifier();

            let constructor = if ident == "new" {
                let after_new = scanner.pos;
                scanner.skip_whitespace();
                if scanner.peek().is_some_and(is_ident_start) && scanner.identifier() == "Date" {
                    Some(Constructor::Date)
                } else {
                    scanner.pos = after_new;
                    None
                }
            } else {
                Constructor::parse(ident)
            };

            let Some(constructor) = constructor else {
                out.push_str(&body[start..scanner.pos]);
                continue;
            };

            let after_name = scanner.pos;
            scanner.skip_whitespace();
            if scanner.peek() == Some('(') {
                let argument = scanner.call_argument(constructor.name())?;
                out.push_str(&constructor.expand(argument)?);
            } else {
                // Bare identifier, not a call
                scanner.pos = after_name;
                out.push_str(&body[start..scanner.pos]);
            }
        } else {
            out.push(c);
            scanner.pos += c.len_utf8();
        }
    }

    Ok(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Constructor {
    ObjectId,
    NumberLong,
    NumberInt,
    NumberDecimal,
    Date,
}

/// Constructor argument as written
#[derive(Debug, PartialEq, Eq)]
enum Argument {
    None,
    Text(String),
    Number(String),
}

impl Constructor {
    fn parse(ident: &str) -> Option<Self> {
        match ident {
            "ObjectId" => Some(Self::ObjectId),
            "NumberLong" => Some(Self::NumberLong),
            "NumberInt" => Some(Self::NumberInt),
            "NumberDecimal" => Some(Self::NumberDecimal),
            "ISODate" | "Date" => Some(Self::Date),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::ObjectId => "ObjectId",
            Self::NumberLong => "NumberLong",
            Self::NumberInt => "NumberInt",
            Self::NumberDecimal => "NumberDecimal",
            Self::Date => "Date",
        }
    }

    fn expand(self, argument: Argument) -> Result<String> {
        match (self, argument) {
            (Self::ObjectId, Argument::Text(hex)) => Ok(wrapper("$oid", &hex)),
            (Self::ObjectId, Argument::None) => Ok(wrapper("$oid", &ObjectId::new().to_hex())),

            (Self::NumberLong, Argument::Text(digits) | Argument::Number(digits)) => {
                let digits = integer_literal(self, &digits)?;
                Ok(wrapper("$numberLong", digits))
            }
            (Self::NumberInt, Argument::Text(digits) | Argument::Number(digits)) => {
                let digits = integer_literal(self, &digits)?;
                digits.parse::<i32>().map_err(|_| {
                    ConnectorError::malformed_command(format!("NumberInt({digits}) is out of range"))
                })?;
                Ok(digits.to_string())
            }
            (Self::NumberLong, Argument::None) => Ok(wrapper("$numberLong", "0")),
            (Self::NumberInt, Argument::None) => Ok("0".to_string()),

            (Self::NumberDecimal, Argument::Text(text) | Argument::Number(text)) => {
                Ok(wrapper("$numberDecimal", text.trim()))
            }

            (Self::Date, Argument::Text(text)) => Ok(date_wrapper(parse_date_millis(&text)?)),
            (Self::Date, Argument::Number(text)) => {
                let millis = text.parse::<i64>().map_err(|_| {
                    ConnectorError::malformed_command(format!("Invalid date milliseconds: {text}"))
                })?;
                Ok(date_wrapper(millis))
            }
            (Self::Date, Argument::None) => Ok(date_wrapper(Utc::now().timestamp_millis())),

            (constructor, argument) => Err(ConnectorError::malformed_command(format!(
                "Unsupported argument for {}: {argument:?}",
                constructor.name()
            ))),
        }
    }
}

fn wrapper(key: &str, payload: &str) -> String {
    format!("{{{}: {}}}", json_string(key), json_string(payload))
}

fn date_wrapper(millis: i64) -> String {
    format!("{{\"$date\": {}}}", wrapper("$numberLong", &millis.to_string()))
}

fn json_string(text: &str) -> String {
    Value::String(text.to_string()).to_string()
}

fn integer_literal(constructor: Constructor, text: &str) -> Result<&str> {
    let text = text.trim();
    let digits = text.strip_prefix('-').unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ConnectorError::malformed_command(format!(
            "{}({text}) requires an integer",
            constructor.name()
        )));
    }
    Ok(text)
}

/// Milliseconds since the epoch for an RFC 3339 timestamp, a naive timestamp
/// (taken as UTC) or a bare date (midnight UTC)
fn parse_date_millis(text: &str) -> Result<i64> {
    let text = text.trim();

    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Ok(instant.timestamp_millis());
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(Utc.from_utc_datetime(&naive).timestamp_millis());
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| Utc.from_utc_datetime(&midnight).timestamp_millis())
        .ok_or_else(|| ConnectorError::malformed_command(format!("Invalid date: {text:?}")))
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

struct Scanner<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek().filter(|c| c.is_whitespace()) {
            self.pos += c.len_utf8();
        }
    }

    fn identifier(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek().filter(|c| is_ident_continue(*c)) {
            self.pos += c.len_utf8();
        }
        &self.src[start..self.pos]
    }

    /// Consume a quoted literal including its quotes; unterminated literals run
    /// to the end of input
    fn quoted(&mut self, quote: char) -> &'a str {
        let start = self.pos;
        self.pos += quote.len_utf8();
        let mut escaped = false;

        while let Some(c) = self.peek() {
            self.pos += c.len_utf8();
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == quote {
                break;
            }
        }

        &self.src[start..self.pos]
    }

    fn string_literal(&mut self) -> &'a str {
        self.quoted('"')
    }

    /// Parse `( [argument] )` following a constructor name
    fn call_argument(&mut self, name: &str) -> Result<Argument> {
        self.pos += 1;
        self.skip_whitespace();

        let argument = match self.peek() {
            Some(')') => Argument::None,
            Some('"') => {
                let literal = self.quoted('"');
                let text: String = serde_json::from_str(literal).map_err(|e| {
                    ConnectorError::malformed_command(format!("Invalid string in {name}(): {e}"))
                })?;
                Argument::Text(text)
            }
            Some('\'') => Argument::Text(unescape_single_quoted(self.quoted('\''))),
            Some(c) if c == '-' || c == '+' || c.is_ascii_digit() => {
                let start = self.pos;
                while let Some(c) = self
                    .peek()
                    .filter(|c| c.is_ascii_digit() || matches!(*c, '-' | '+' | '.' | 'e' | 'E'))
                {
                    self.pos += c.len_utf8();
                }
                let number = &self.src[start..self.pos];
                Argument::Number(number.strip_prefix('+').unwrap_or(number).to_string())
            }
            _ => {
                return Err(ConnectorError::malformed_command(format!(
                    "Unsupported argument in {name}() at offset {}",
                    self.pos
                )))
            }
        };

        self.skip_whitespace();
        if self.peek() != Some(')') {
            return Err(ConnectorError::malformed_command(format!(
                "Expected ')' to close {name}() at offset {}",
                self.pos
            )));
        }
        self.pos += 1;

        Ok(argument)
    }
}

fn unescape_single_quoted(literal: &str) -> String {
    let inner = literal.strip_prefix('\'').unwrap_or(literal);
    let inner = inner.strip_suffix('\'').unwrap_or(inner);

    let mut text = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                text.push(next);
            }
        } else {
            text.push(c);
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_json_is_unchanged() {
        let body = r#"{"find": "users", "filter": {"age": {"$gt": 3}}, "limit": 1e3}"#;
        assert_eq!(rewrite(body).unwrap(), body);
    }

    #[test]
    fn test_object_id() {
        assert_eq!(
            rewrite(r#"{"_id": ObjectId("507f191e810c19729de860ea")}"#).unwrap(),
            r#"{"_id": {"$oid": "507f191e810c19729de860ea"}}"#
        );
        assert_eq!(
            rewrite(r#"{"_id": ObjectId('507f191e810c19729de860ea')}"#).unwrap(),
            r#"{"_id": {"$oid": "507f191e810c19729de860ea"}}"#
        );
    }

    #[test]
    fn test_generated_object_id() {
        let rewritten = rewrite(r#"{"_id": ObjectId()}"#).unwrap();
        let value: Value = serde_json::from_str(&rewritten).unwrap();
        assert_eq!(value["_id"]["$oid"].as_str().unwrap().len(), 24);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(rewrite(r#"{"a": NumberLong("12")}"#).unwrap(), r#"{"a": {"$numberLong": "12"}}"#);
        assert_eq!(rewrite(r#"{"a": NumberLong(-12)}"#).unwrap(), r#"{"a": {"$numberLong": "-12"}}"#);
        assert_eq!(rewrite(r#"{"a": NumberInt(7)}"#).unwrap(), r#"{"a": 7}"#);
        assert_eq!(
            rewrite(r#"{"a": NumberDecimal("1.10")}"#).unwrap(),
            r#"{"a": {"$numberDecimal": "1.10"}}"#
        );
    }

    #[test]
    fn test_invalid_numbers() {
        assert!(rewrite(r#"{"a": NumberLong("1.5")}"#).is_err());
        assert!(rewrite(r#"{"a": NumberInt(99999999999)}"#).is_err());
    }

    #[test]
    fn test_dates() {
        let expected = r#"{"d": {"$date": {"$numberLong": "1561939200000"}}}"#;
        assert_eq!(rewrite(r#"{"d": new Date("2019-07-01")}"#).unwrap(), expected);
        assert_eq!(rewrite(r#"{"d": ISODate("2019-07-01T00:00:00Z")}"#).unwrap(), expected);
        assert_eq!(rewrite(r#"{"d": Date("2019-07-01T00:00:00")}"#).unwrap(), expected);
        assert_eq!(rewrite(r#"{"d": new Date(1561939200000)}"#).unwrap(), expected);
        assert_eq!(
            rewrite(r#"{"d": ISODate("2019-07-01T02:00:00+02:00")}"#).unwrap(),
            expected
        );
    }

    #[test]
    fn test_invalid_date() {
        let err = rewrite(r#"{"d": new Date("yesterday")}"#).unwrap_err();
        assert_eq!(err.error_code(), "MALFORMED_COMMAND");
    }

    #[test]
    fn test_string_contents_are_untouched() {
        let body = r#"{"note": "ObjectId(\"x\") and new Date(\"y\")", "n": NumberInt(1)}"#;
        assert_eq!(
            rewrite(body).unwrap(),
            r#"{"note": "ObjectId(\"x\") and new Date(\"y\")", "n": 1}"#
        );
    }

    #[test]
    fn test_bare_identifiers_pass_through() {
        assert_eq!(rewrite(r#"{"a": true, "b": null}"#).unwrap(), r#"{"a": true, "b": null}"#);
        assert_eq!(rewrite("newer").unwrap(), "newer");
        assert_eq!(rewrite("new Thing").unwrap(), "new Thing");
        assert_eq!(rewrite("Date").unwrap(), "Date");
    }

    #[test]
    fn test_unclosed_call() {
        let err = rewrite(r#"{"_id": ObjectId("abc""#).unwrap_err();
        assert_eq!(err.error_code(), "MALFORMED_COMMAND");
    }

    #[test]
    fn test_escaped_single_quotes() {
        assert_eq!(
            rewrite(r"{'x': NumberDecimal('2\'')}").unwrap(),
            r#"{'x': {"$numberDecimal": "2'"}}"#
        );
    }
}
