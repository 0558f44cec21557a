//-
// Copyright (c) 2024, Jason Lingle
//
// This file is part of Mailbridge.
//
// Mailbridge is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Mailbridge is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for
// more details.
//
// You should have received a copy of the GNU General Public License along with
// Mailbridge. If not, see <http://www.gnu.org/licenses/>.

//! Extraction of `<input>` fields from a login page.
//!
//! This is regex-based and intentionally shallow: only double-quoted
//! attributes are understood, and anything that does not look like an input
//! tag is skipped.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref INPUT_TAG: Regex = Regex::new(r"(?i)<input\s([^>]*)>").unwrap();
    static ref ATTRIBUTE: Regex = Regex::new(r#"(\w+)="([^"]*)""#).unwrap();
}

/// Attributes of one input field, other than `name`.
pub type Attributes = BTreeMap<String, String>;

/// Find all named `<input>` tags in `html`.
///
/// The result maps each field's `name` attribute to its remaining attributes.
/// Tags without a non-empty name are skipped. If several tags share a name,
/// the last one wins.
pub fn parse_inputs(html: &str) -> BTreeMap<String, Attributes> {
    let mut inputs = BTreeMap::new();
    for tag in INPUT_TAG.captures_iter(html) {
        let mut name = None;
        let mut attributes = Attributes::new();
        for attr in ATTRIBUTE.captures_iter(&tag[1]) {
            if "name" == &attr[1] {
                name = Some(attr[2].to_owned());
            } else {
                attributes.insert(attr[1].to_owned(), attr[2].to_owned());
            }
        }

        match name {
            Some(name) if !name.is_empty() => {
                inputs.insert(name, attributes);
            }
            _ => (),
        }
    }

    inputs
}

/// The input fields of a scraped page.
///
/// This is the only view the login state machine has of the webmail
/// server's markup.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoginFormFields(BTreeMap<String, Attributes>);

impl LoginFormFields {
    pub fn scrape(html: &str) -> Self {
        LoginFormFields(parse_inputs(html))
    }

    /// The `value` of the named field, or `""` if there is no such field or
    /// it has no value.
    pub fn value(&self, name: &str) -> &str {
        self.0
            .get(name)
            .and_then(|attrs| attrs.get("value"))
            .map_or("", |v| &**v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the page presents a user name and password prompt.
    pub fn has_login_form(&self) -> bool {
        self.contains("_user") && self.contains("_pass")
    }
}
