//! RFC 4515 filter strings: parsing and matching against entries.
//!
//! Matching follows common directory server behaviour: attribute names and
//! string values compare case-insensitively, values that both parse as
//! numbers compare numerically, and a multi-valued attribute matches when any
//! of its values does. An absent attribute fails every assertion, so only a
//! surrounding `!` can turn it into a match.

use crate::error::ConnectorError;
use grammar::ldap;
use model::{core::value::Value, records::record::Record};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq)]
pub enum LdapFilter {
    And(Vec<LdapFilter>),
    Or(Vec<LdapFilter>),
    Not(Box<LdapFilter>),
    Present(String),
    Equal(String, String),
    GreaterOrEqual(String, String),
    LessOrEqual(String, String),
    Substring {
        attribute: String,
        initial: Option<String>,
        any: Vec<String>,
        last: Option<String>,
    },
}

impl LdapFilter {
    pub fn parse(text: &str) -> Result<Self, ConnectorError> {
        let mut parser = Parser {
            source: text,
            bytes: text.trim().as_bytes(),
            pos: 0,
        };
        let filter = parser.filter()?;
        if parser.pos != parser.bytes.len() {
            return Err(parser.error("trailing characters after the filter"));
        }
        Ok(filter)
    }

    pub fn matches(&self, entry: &Record) -> bool {
        match self {
            LdapFilter::And(filters) => filters.iter().all(|f| f.matches(entry)),
            LdapFilter::Or(filters) => filters.iter().any(|f| f.matches(entry)),
            LdapFilter::Not(inner) => !inner.matches(entry),
            LdapFilter::Present(attribute) => !values(entry, attribute).is_empty(),
            LdapFilter::Equal(attribute, expected) => values(entry, attribute)
                .iter()
                .any(|value| compare(value, expected) == Some(Ordering::Equal)),
            LdapFilter::GreaterOrEqual(attribute, bound) => values(entry, attribute)
                .iter()
                .any(|value| compare(value, bound).is_some_and(Ordering::is_ge)),
            LdapFilter::LessOrEqual(attribute, bound) => values(entry, attribute)
                .iter()
                .any(|value| compare(value, bound).is_some_and(Ordering::is_le)),
            LdapFilter::Substring {
                attribute,
                initial,
                any,
                last,
            } => values(entry, attribute).iter().any(|value| {
                substring_matches(
                    &ldap::value_text(value).to_lowercase(),
                    initial.as_deref(),
                    any,
                    last.as_deref(),
                )
            }),
        }
    }
}

fn values(entry: &Record, attribute: &str) -> Vec<Value> {
    entry
        .get_value(attribute)
        .into_collection()
        .into_iter()
        .filter(|value| !value.is_null())
        .collect()
}

fn compare(value: &Value, assertion: &str) -> Option<Ordering> {
    let text = ldap::value_text(value);
    match (text.trim().parse::<f64>(), assertion.trim().parse::<f64>()) {
        (Ok(a), Ok(b)) => a.partial_cmp(&b),
        _ => Some(text.to_lowercase().cmp(&assertion.to_lowercase())),
    }
}

fn substring_matches(
    text: &str,
    initial: Option<&str>,
    any: &[String],
    last: Option<&str>,
) -> bool {
    let mut rest = text;
    if let Some(initial) = initial {
        match rest.strip_prefix(initial.to_lowercase().as_str()) {
            Some(tail) => rest = tail,
            None => return false,
        }
    }
    for part in any {
        let part = part.to_lowercase();
        match rest.find(&part) {
            Some(at) => rest = &rest[at + part.len()..],
            None => return false,
        }
    }
    match last {
        Some(last) => rest.ends_with(&last.to_lowercase()),
        None => true,
    }
}

struct Parser<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, message: &str) -> ConnectorError {
        ConnectorError::filter_syntax(self.source, format!("{message} at offset {}", self.pos))
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn expect(&mut self, byte: u8) -> Result<(), ConnectorError> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", byte as char)))
        }
    }

    fn filter(&mut self) -> Result<LdapFilter, ConnectorError> {
        self.expect(b'(')?;
        let filter = match self.peek() {
            Some(b'&') => {
                self.pos += 1;
                LdapFilter::And(self.filter_list()?)
            }
            Some(b'|') => {
                self.pos += 1;
                LdapFilter::Or(self.filter_list()?)
            }
            Some(b'!') => {
                self.pos += 1;
                LdapFilter::Not(Box::new(self.filter()?))
            }
            Some(_) => self.item()?,
            None => return Err(self.error("unexpected end of filter")),
        };
        self.expect(b')')?;
        Ok(filter)
    }

    fn filter_list(&mut self) -> Result<Vec<LdapFilter>, ConnectorError> {
        let mut filters = Vec::new();
        while self.peek() == Some(b'(') {
            filters.push(self.filter()?);
        }
        if filters.is_empty() {
            return Err(self.error("empty filter list"));
        }
        Ok(filters)
    }

    fn item(&mut self) -> Result<LdapFilter, ConnectorError> {
        let start = self.pos;
        while let Some(byte) = self.peek() {
            if matches!(byte, b'=' | b'>' | b'<' | b'~' | b'(' | b')') {
                break;
            }
            self.pos += 1;
        }
        let attribute = self.slice(start).trim().to_string();
        if attribute.is_empty() {
            return Err(self.error("missing attribute description"));
        }

        let op = match self.peek() {
            Some(b'=') => b'=',
            Some(op @ (b'>' | b'<')) => {
                self.pos += 1;
                op
            }
            Some(b'~') => return Err(self.error("approximate matching is not supported")),
            _ => return Err(self.error("expected a filter operator")),
        };
        self.expect(b'=')?;

        let start = self.pos;
        while let Some(byte) = self.peek() {
            if byte == b')' || byte == b'(' {
                break;
            }
            self.pos += 1;
        }
        let raw = self.slice(start).to_string();

        match op {
            b'>' => Ok(LdapFilter::GreaterOrEqual(attribute, self.unescape(&raw)?)),
            b'<' => Ok(LdapFilter::LessOrEqual(attribute, self.unescape(&raw)?)),
            _ if raw == "*" => Ok(LdapFilter::Present(attribute)),
            _ if raw.contains('*') => self.substring(attribute, &raw),
            _ => Ok(LdapFilter::Equal(attribute, self.unescape(&raw)?)),
        }
    }

    fn substring(&self, attribute: String, raw: &str) -> Result<LdapFilter, ConnectorError> {
        let parts = raw.split('*').collect::<Vec<_>>();
        let non_empty = |part: &&str| !part.is_empty();

        let initial = parts
            .first()
            .copied()
            .filter(non_empty)
            .map(|p| self.unescape(p))
            .transpose()?;
        let last = parts
            .last()
            .copied()
            .filter(non_empty)
            .map(|p| self.unescape(p))
            .transpose()?;
        let any = parts[1..parts.len() - 1]
            .iter()
            .copied()
            .filter(non_empty)
            .map(|p| self.unescape(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(LdapFilter::Substring {
            attribute,
            initial,
            any,
            last,
        })
    }

    fn unescape(&self, raw: &str) -> Result<String, ConnectorError> {
        ldap::unescape_value(raw)
            .map_err(|message| ConnectorError::filter_syntax(self.source, message))
    }

    fn slice(&self, start: usize) -> &str {
        // Operators and parentheses are ASCII, so these are char boundaries
        std::str::from_utf8(&self.bytes[start..self.pos]).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> Record {
        Record::new()
            .with("objectClass", "person")
            .with("cn", "Ann Smith")
            .with("age", 25)
            .with("mail", Value::Collection(vec!["ann@a.org".into(), "a.smith@b.org".into()]))
            .with("active", true)
    }

    fn matches(filter: &str) -> bool {
        LdapFilter::parse(filter).unwrap().matches(&entry())
    }

    #[test]
    fn test_parse_nested() {
        let filter = LdapFilter::parse("(&(age>=18)(!(cn=bob))(|(a=*)(b=x*y*z)))").unwrap();
        assert_eq!(
            filter,
            LdapFilter::And(vec![
                LdapFilter::GreaterOrEqual("age".into(), "18".into()),
                LdapFilter::Not(Box::new(LdapFilter::Equal("cn".into(), "bob".into()))),
                LdapFilter::Or(vec![
                    LdapFilter::Present("a".into()),
                    LdapFilter::Substring {
                        attribute: "b".into(),
                        initial: Some("x".into()),
                        any: vec!["y".into()],
                        last: Some("z".into()),
                    },
                ]),
            ])
        );
    }

    #[test]
    fn test_parse_errors() {
        for bad in ["", "(cn=a", "cn=a", "(&)", "(cn~=a)", "(=a)", "(cn=a))", r"(cn=\2)"] {
            assert!(LdapFilter::parse(bad).is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn test_equality_is_case_insensitive() {
        assert!(matches("(cn=ann smith)"));
        assert!(matches("(CN=Ann Smith)"));
        assert!(!matches("(cn=ann)"));
        assert!(matches("(active=TRUE)"));
    }

    #[test]
    fn test_ordering_is_numeric_for_numbers() {
        assert!(matches("(age>=25)"));
        assert!(matches("(age<=100)"));
        assert!(!matches("(age>=100)"));
        assert!(!matches("(!(age>=25))"));
    }

    #[test]
    fn test_multi_valued_and_substrings() {
        assert!(matches("(mail=a.smith@b.org)"));
        assert!(matches("(mail=*@b.org)"));
        assert!(matches("(cn=ann*)"));
        assert!(matches("(cn=*n*m*)"));
        assert!(!matches("(cn=*bob*)"));
    }

    #[test]
    fn test_absent_attributes() {
        assert!(!matches("(phone=*)"));
        assert!(!matches("(phone=1)"));
        assert!(matches("(!(phone=1))"));
        assert!(matches("(objectClass=*)"));
        assert!(!matches("(!(objectClass=*))"));
    }

    #[test]
    fn test_escaped_values() {
        let record = Record::new().with("cn", "a*(b)");
        let filter = LdapFilter::parse(&format!("(cn={})", ldap::escape_value("a*(b)"))).unwrap();
        assert!(filter.matches(&record));
    }
}
