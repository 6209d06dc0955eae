//! Search filter algebra.
//!
//! A [`Filter`] renders to an RFC 4515 string for a live server and can also
//! be evaluated against an [`Entry`] for in-memory directories.

use serde::{Deserialize, Serialize};

use crate::entry::{values_match, Entry};

/// Filter for searching directory entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Filter {
    /// Match entries where attribute equals value.
    Equals { attribute: String, value: String },

    /// Match entries where attribute exists (has any value).
    Present { attribute: String },

    /// Logical AND of multiple filters.
    And { filters: Vec<Filter> },

    /// Logical OR of multiple filters.
    Or { filters: Vec<Filter> },

    /// Logical NOT of a filter.
    Not { filter: Box<Filter> },
}

impl Filter {
    /// Create an equals filter.
    pub fn eq(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Equals {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Create a present (attribute exists) filter.
    pub fn present(attribute: impl Into<String>) -> Self {
        Filter::Present {
            attribute: attribute.into(),
        }
    }

    /// `(objectClass=*)`, matches every entry.
    pub fn any() -> Self {
        Filter::present("objectClass")
    }

    /// Create an AND filter.
    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And { filters }
    }

    /// Create an OR filter.
    pub fn or(filters: Vec<Filter>) -> Self {
        Filter::Or { filters }
    }

    /// Create a NOT filter (negation).
    pub fn negate(filter: Filter) -> Self {
        Filter::Not {
            filter: Box::new(filter),
        }
    }

    /// Render as an LDAP filter string.
    pub fn to_ldap_string(&self) -> String {
        match self {
            Filter::And { filters } => {
                let inner: Vec<String> = filters.iter().map(Filter::to_ldap_string).collect();
                format!("(&{})", inner.join(""))
            }
            Filter::Or { filters } => {
                let inner: Vec<String> = filters.iter().map(Filter::to_ldap_string).collect();
                format!("(|{})", inner.join(""))
            }
            Filter::Not { filter } => format!("(!{})", filter.to_ldap_string()),
            Filter::Equals { attribute, value } => {
                format!("({}={})", attribute, escape_filter_value(value))
            }
            Filter::Present { attribute } => format!("({}=*)", attribute),
        }
    }

    /// Evaluate the filter against an entry.
    pub fn matches(&self, entry: &Entry) -> bool {
        match self {
            Filter::And { filters } => filters.iter().all(|f| f.matches(entry)),
            Filter::Or { filters } => filters.iter().any(|f| f.matches(entry)),
            Filter::Not { filter } => !filter.matches(entry),
            Filter::Equals { attribute, value } => entry
                .values(attribute)
                .iter()
                .any(|v| values_match(v, value)),
            Filter::Present { attribute } => entry.has(attribute),
        }
    }
}

/// Escape special characters in a filter assertion value per RFC 4515.
pub fn escape_filter_value(value: &str) -> String {
    value
        .replace('\\', "\\5c")
        .replace('*', "\\2a")
        .replace('(', "\\28")
        .replace(')', "\\29")
        .replace('\0', "\\00")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_to_ldap_string() {
        let filter = Filter::and(vec![
            Filter::eq("objectClass", "inetOrgPerson"),
            Filter::negate(Filter::eq("employeeType", "disabled")),
        ]);
        assert_eq!(
            filter.to_ldap_string(),
            "(&(objectClass=inetOrgPerson)(!(employeeType=disabled)))"
        );
        assert_eq!(Filter::any().to_ldap_string(), "(objectClass=*)");
    }

    #[test]
    fn test_filter_value_escaping() {
        assert_eq!(
            Filter::eq("cn", "a*(b)\\").to_ldap_string(),
            "(cn=a\\2a\\28b\\29\\5c)"
        );
    }

    #[test]
    fn test_filter_matches_entry() {
        let entry = Entry::new("cn=jean.dupont,ou=accounts,dc=example,dc=org")
            .with("objectClass", ["inetOrgPerson"])
            .with("employeeNumber", ["42"]);

        assert!(Filter::eq("employeenumber", "42").matches(&entry));
        assert!(!Filter::eq("employeeNumber", "43").matches(&entry));
        assert!(Filter::any().matches(&entry));
        assert!(Filter::or(vec![
            Filter::eq("employeeNumber", "1"),
            Filter::eq("objectClass", "INETORGPERSON"),
        ])
        .matches(&entry));
        assert!(Filter::negate(Filter::present("employeeType")).matches(&entry));
    }

    #[test]
    fn test_filter_matches_dn_values() {
        let group = Entry::new("cn=proj,ou=projects,dc=example,dc=org").with(
            "member",
            ["cn=Jean.Dupont, ou=accounts,dc=example,dc=org"],
        );
        assert!(
            Filter::eq("member", "cn=jean.dupont,ou=accounts,dc=example,dc=org").matches(&group)
        );
    }
}
