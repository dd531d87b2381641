//! CSV contact parser for connection exports.
//!
//! Line oriented: the first non-blank line is the header, every later non-blank
//! line is one contact. Headers are matched by keyword, so "First Name",
//! "first_name" and "FIRST NAME" all land in the same field. Quoted fields may
//! contain commas; quoted fields spanning several lines are not supported.

use uuid::Uuid;

use crate::models::connection::NewConnection;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ParsedContact {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub company: String,
    pub position: String,
    pub location: String,
    pub connected_on: String,
    pub url: String,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ParsedCsv {
    pub contacts: Vec<ParsedContact>,
    /// Header cells that matched no known field, as written in the file.
    pub ignored_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
enum Column {
    FirstName,
    LastName,
    Email,
    Company,
    Position,
    Location,
    ConnectedOn,
    Url,
    Ignored,
}

/// First matching rule wins.
fn classify(header: &str) -> Column {
    let has = |needle: &str| header.contains(needle);
    if has("first") && has("name") {
        Column::FirstName
    } else if has("last") && has("name") {
        Column::LastName
    } else if has("email") {
        Column::Email
    } else if has("company") {
        Column::Company
    } else if has("position") || has("title") {
        Column::Position
    } else if has("location") || has("city") || has("state") {
        Column::Location
    } else if has("connect") && has("on") {
        Column::ConnectedOn
    } else if has("url") || has("profile") {
        Column::Url
    } else {
        Column::Ignored
    }
}

pub fn parse_contacts_csv(text: &str) -> ParsedCsv {
    let mut lines = text
        .trim_start_matches('\u{feff}')
        .lines()
        .filter(|l| !l.trim().is_empty());

    let Some(header_line) = lines.next() else {
        return ParsedCsv::default();
    };
    let headers = split_fields(header_line);
    let columns: Vec<Column> = headers
        .iter()
        .map(|h| classify(&h.to_lowercase()))
        .collect();
    let ignored_columns = headers
        .iter()
        .zip(&columns)
        .filter(|(header, column)| **column == Column::Ignored && !header.is_empty())
        .map(|(header, _)| header.clone())
        .collect();

    let contacts = lines
        .map(|line| {
            let values = split_fields(line);
            let mut contact = ParsedContact::default();
            for (i, column) in columns.iter().enumerate() {
                let value = values.get(i).cloned().unwrap_or_default();
                match column {
                    Column::FirstName => contact.first_name = value,
                    Column::LastName => contact.last_name = value,
                    Column::Email => contact.email = value,
                    Column::Company => contact.company = value,
                    Column::Position => contact.position = value,
                    Column::Location => contact.location = value,
                    Column::ConnectedOn => contact.connected_on = value,
                    Column::Url => contact.url = value,
                    Column::Ignored => {}
                }
            }
            contact
        })
        .collect();

    ParsedCsv {
        contacts,
        ignored_columns,
    }
}

/// Splits one line on commas outside double quotes. `""` inside quotes is a literal quote.
/// Values are trimmed.
fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    fields.push(current.trim().to_string());
    fields
}

impl ParsedContact {
    /// Converts to an insert row. Contacts without any name are dropped.
    pub fn into_new_connection(self, user_id: Uuid) -> Option<NewConnection> {
        if self.first_name.is_empty() && self.last_name.is_empty() {
            return None;
        }
        Some(NewConnection {
            user_id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: non_empty(self.email),
            company: non_empty(self.company),
            position: non_empty(self.position),
            location: non_empty(self.location),
            connected_on: non_empty(self.connected_on),
            url: non_empty(self.url),
        })
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = "\
First Name,Last Name,URL,Email Address,Company,Position,Connected On
Ada,Lovelace,https://example.com/in/ada,ada@example.com,Analytical Engines,Mathematician,10 Dec 2023

Grace,Hopper,,,\"Navy, United States\",Rear Admiral,01 Jan 2024
";

    #[test]
    fn test_maps_export_headers() {
        let parsed = parse_contacts_csv(EXPORT);
        assert!(parsed.ignored_columns.is_empty());
        let contacts = parsed.contacts;
        assert_eq!(contacts.len(), 2);

        let ada = &contacts[0];
        assert_eq!(ada.first_name, "Ada");
        assert_eq!(ada.last_name, "Lovelace");
        assert_eq!(ada.url, "https://example.com/in/ada");
        assert_eq!(ada.email, "ada@example.com");
        assert_eq!(ada.company, "Analytical Engines");
        assert_eq!(ada.position, "Mathematician");
        assert_eq!(ada.connected_on, "10 Dec 2023");
    }

    #[test]
    fn test_quoted_field_keeps_comma() {
        let contacts = parse_contacts_csv(EXPORT).contacts;
        assert_eq!(contacts[1].company, "Navy, United States");
        assert_eq!(contacts[1].email, "");
    }

    #[test]
    fn test_alternate_headers_and_ignored_columns() {
        let csv = "first_name,LAST NAME,Job Title,City,Profile,Notes,Tags\r\nAlan,Turing,Researcher,Manchester,https://x,met at conf,ai\r\n";
        let parsed = parse_contacts_csv(csv);
        assert_eq!(parsed.contacts.len(), 1);
        let alan = &parsed.contacts[0];
        assert_eq!(alan.position, "Researcher");
        assert_eq!(alan.location, "Manchester");
        assert_eq!(alan.url, "https://x");
        assert_eq!(parsed.ignored_columns, vec!["Notes", "Tags"]);
    }

    #[test]
    fn test_short_rows_fill_with_empty() {
        let contacts = parse_contacts_csv("First Name,Last Name,Company\nLinus,\n").contacts;
        assert_eq!(contacts[0].first_name, "Linus");
        assert_eq!(contacts[0].company, "");
    }

    #[test]
    fn test_escaped_quotes() {
        assert_eq!(
            split_fields(r#"a,"say ""hi""",c"#),
            vec!["a", "say \"hi\"", "c"]
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse_contacts_csv(""), ParsedCsv::default());
        assert_eq!(parse_contacts_csv("\n\n"), ParsedCsv::default());
        assert!(parse_contacts_csv("First Name,Last Name\n").contacts.is_empty());
    }

    #[test]
    fn test_into_new_connection() {
        let user_id = Uuid::new_v4();
        let contacts = parse_contacts_csv(EXPORT).contacts;
        let row = contacts[1].clone().into_new_connection(user_id).unwrap();
        assert_eq!(row.user_id, user_id);
        assert_eq!(row.email, None);
        assert_eq!(row.company.as_deref(), Some("Navy, United States"));

        assert!(ParsedContact::default().into_new_connection(user_id).is_none());
    }
}
