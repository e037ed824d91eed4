// src/notify/message.rs
// =============================================================================
// Transport-neutral email types.
//
// Mailbox parsing accepts the two forms people write in config files:
//   jane@example.com
//   Jane Doe <jane@example.com>
// Addresses are not validated beyond being non-empty; deliverability is the
// mail service's problem.
// =============================================================================

use anyhow::{anyhow, Result};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailbox {
    pub email: String,
    pub name: Option<String>,
}

impl Mailbox {
    pub fn new(email: impl Into<String>, name: Option<String>) -> Self {
        Self {
            email: email.into(),
            name,
        }
    }

    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(anyhow!("empty mailbox"));
        }

        // "Name <email>" form
        if let Some(open) = input.find('<') {
            let close = input
                .rfind('>')
                .filter(|close| *close > open)
                .ok_or_else(|| anyhow!("unterminated '<' in mailbox '{}'", input))?;

            let email = input[open + 1..close].trim();
            if email.is_empty() {
                return Err(anyhow!("mailbox '{}' has no address", input));
            }
            let name = input[..open].trim().trim_matches('"').trim();
            let name = (!name.is_empty()).then(|| name.to_string());

            return Ok(Self::new(email, name));
        }

        Ok(Self::new(input, None))
    }

    // Parses a comma-separated list, ignoring empty entries. Commas inside
    // a quoted display name or inside <...> do not separate entries.
    pub fn parse_list(input: &str) -> Result<Vec<Self>> {
        split_entries(input)
            .into_iter()
            .filter(|entry| !entry.trim().is_empty())
            .map(Self::parse)
            .collect()
    }
}

fn split_entries(input: &str) -> Vec<&str> {
    let mut entries = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut in_angle = false;

    for (i, c) in input.char_indices() {
        match c {
            '"' if !in_angle => in_quotes = !in_quotes,
            '<' if !in_quotes => in_angle = true,
            '>' if !in_quotes => in_angle = false,
            ',' if !in_quotes && !in_angle => {
                entries.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    entries.push(&input[start..]);
    entries
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} <{}>", name, self.email),
            None => write!(f, "{}", self.email),
        }
    }
}

/// One outgoing email, ready for any transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub from: Mailbox,
    pub to: Vec<Mailbox>,
    pub subject: String,
    pub text_part: String,
    pub html_part: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_address() {
        let mailbox = Mailbox::parse("  jane@example.com ").unwrap();
        assert_eq!(mailbox, Mailbox::new("jane@example.com", None));
    }

    #[test]
    fn test_parse_named_address() {
        let mailbox = Mailbox::parse("\"Jane Doe\" <jane@example.com>").unwrap();
        assert_eq!(mailbox.email, "jane@example.com");
        assert_eq!(mailbox.name.as_deref(), Some("Jane Doe"));
        assert_eq!(mailbox.to_string(), "Jane Doe <jane@example.com>");
    }

    #[test]
    fn test_parse_list() {
        let list = Mailbox::parse_list("a@example.com, Bee <b@example.com>,").unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[1].name.as_deref(), Some("Bee"));
    }

    #[test]
    fn test_parse_list_keeps_commas_inside_quotes() {
        let list = Mailbox::parse_list("\"Doe, Jane\" <jane@example.com>").unwrap();
        assert_eq!(list, vec![Mailbox::new("jane@example.com", Some("Doe, Jane".to_string()))]);

        let list =
            Mailbox::parse_list("\"Ops, Team\" <ops@example.com>, b@example.com").unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].name.as_deref(), Some("Ops, Team"));
        assert_eq!(list[1].email, "b@example.com");
    }

    #[test]
    fn test_parse_rejects_broken_input() {
        assert!(Mailbox::parse("").is_err());
        assert!(Mailbox::parse("Jane <jane@example.com").is_err());
        assert!(Mailbox::parse("Jane <>").is_err());
    }
}
