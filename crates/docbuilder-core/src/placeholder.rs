//! `{{TOKEN}}` substitution in section content and titles.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use shared_types::Client;

lazy_static! {
    static ref TOKEN: Regex = Regex::new(r"\{\{([A-Z_]+)\}\}").expect("valid regex");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Placeholder {
    ClientName,
    ClientAddress,
    Date,
    ExpiryDate,
}

impl Placeholder {
    pub const ALL: [Placeholder; 4] = [
        Self::ClientName,
        Self::ClientAddress,
        Self::Date,
        Self::ExpiryDate,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::ClientName => "CLIENT_NAME",
            Self::ClientAddress => "CLIENT_ADDRESS",
            Self::Date => "DATE",
            Self::ExpiryDate => "EXPIRY_DATE",
        }
    }

    pub fn token(&self) -> String {
        format!("{{{{{}}}}}", self.name())
    }

    fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }
}

/// Values to substitute. `None` leaves the token in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaceholderContext {
    pub client_name: Option<String>,
    pub client_address: Option<String>,
    pub date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
}

impl PlaceholderContext {
    pub fn for_client(client: &Client, date: NaiveDate, expiry_date: Option<NaiveDate>) -> Self {
        Self {
            client_name: Some(client.company_name.clone()),
            client_address: client.address.clone().filter(|a| !a.trim().is_empty()),
            date: Some(date),
            expiry_date,
        }
    }

    fn value(&self, placeholder: Placeholder) -> Option<String> {
        match placeholder {
            Placeholder::ClientName => self.client_name.clone(),
            Placeholder::ClientAddress => self.client_address.clone(),
            Placeholder::Date => self.date.map(long_date),
            Placeholder::ExpiryDate => self.expiry_date.map(long_date),
        }
    }
}

/// "March 4, 2026"
pub fn long_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

/// Replace every known token that has a value. Unknown tokens, tokens without
/// a value and all other text are copied unchanged.
pub fn expand(content: &str, ctx: &PlaceholderContext) -> String {
    TOKEN
        .replace_all(content, |caps: &Captures| {
            Placeholder::parse(&caps[1])
                .and_then(|p| ctx.value(p))
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Known tokens still present in `content`, in first-seen order.
pub fn tokens_in(content: &str) -> Vec<Placeholder> {
    let mut found = Vec::new();
    for caps in TOKEN.captures_iter(content) {
        if let Some(p) = Placeholder::parse(&caps[1]) {
            if !found.contains(&p) {
                found.push(p);
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> PlaceholderContext {
        PlaceholderContext {
            client_name: Some("Maple Bakery".into()),
            client_address: Some("12 King St W, Toronto".into()),
            date: NaiveDate::from_ymd_opt(2026, 3, 4),
            expiry_date: None,
        }
    }

    #[test]
    fn expands_known_tokens() {
        let out = expand("<p>For {{CLIENT_NAME}} at {{CLIENT_ADDRESS}}, {{DATE}}</p>", &ctx());
        assert_eq!(
            out,
            "<p>For Maple Bakery at 12 King St W, Toronto, March 4, 2026</p>"
        );
    }

    #[test]
    fn missing_values_and_unknown_tokens_untouched() {
        let out = expand("Valid until {{EXPIRY_DATE}}. {{PROJECT}} {{ CLIENT_NAME }}", &ctx());
        assert_eq!(out, "Valid until {{EXPIRY_DATE}}. {{PROJECT}} {{ CLIENT_NAME }}");
        assert_eq!(tokens_in(&out), vec![Placeholder::ExpiryDate]);
    }

    #[test]
    fn repeated_tokens_all_replaced() {
        let out = expand("{{CLIENT_NAME}}/{{CLIENT_NAME}}", &ctx());
        assert_eq!(out, "Maple Bakery/Maple Bakery");
    }

    #[test]
    fn token_rendering() {
        assert_eq!(Placeholder::Date.token(), "{{DATE}}");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn context() -> impl Strategy<Value = PlaceholderContext> {
        (
            proptest::option::of("[A-Za-z &.,]{1,20}"),
            proptest::option::of("[A-Za-z0-9 ,]{1,30}"),
            proptest::option::of(0u32..3000),
        )
            .prop_map(|(name, address, days)| PlaceholderContext {
                client_name: name,
                client_address: address,
                date: days.and_then(|d| {
                    NaiveDate::from_ymd_opt(2024, 1, 1)
                        .and_then(|base| base.checked_add_days(chrono::Days::new(d as u64)))
                }),
                expiry_date: None,
            })
    }

    proptest! {
        /// Property: strings without braces are returned unchanged
        #[test]
        fn token_free_strings_unchanged(s in "[^{}]*", ctx in context()) {
            prop_assert_eq!(expand(&s, &ctx), s);
        }

        /// Property: expanding twice equals expanding once
        #[test]
        fn expansion_is_idempotent(
            parts in prop::collection::vec(
                prop_oneof![
                    "[a-z <>/]{0,10}",
                    Just("{{CLIENT_NAME}}".to_string()),
                    Just("{{CLIENT_ADDRESS}}".to_string()),
                    Just("{{DATE}}".to_string()),
                    Just("{{EXPIRY_DATE}}".to_string()),
                    Just("{{OTHER}}".to_string()),
                ],
                0..12,
            ),
            ctx in context(),
        ) {
            let content = parts.concat();
            let once = expand(&content, &ctx);
            prop_assert_eq!(expand(&once, &ctx), once);
        }
    }
}
