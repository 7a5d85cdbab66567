//! Opaque URI-shaped identifiers.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

/// An immutable, URI-shaped opaque name: categories, attribute ids, data-type
/// ids, function ids, status codes, policy ids. Equality is value equality;
/// no structural parsing is performed beyond [`Identifier::is_absolute_uri`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    pub fn new(id: impl Into<String>) -> Self {
        Identifier(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the name carries a URI scheme prefix, e.g. `https:` or `urn:`.
    /// Policy references with absolute-URI ids may be resolved through the
    /// document loader when the in-memory index misses.
    pub fn is_absolute_uri(&self) -> bool {
        match self.0.split_once(':') {
            Some((scheme, rest)) if !scheme.is_empty() && !rest.is_empty() => {
                let mut chars = scheme.chars();
                chars.next().is_some_and(|c| c.is_ascii_alphabetic())
                    && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
            }
            _ => false,
        }
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Identifier {
    fn from(v: &str) -> Self {
        Identifier(v.to_string())
    }
}

impl From<String> for Identifier {
    fn from(v: String) -> Self {
        Identifier(v)
    }
}

/// Well-known XACML 3.0 identifiers: data types, attribute categories, and
/// status codes. Function and combining-algorithm URNs live next to their
/// registries.
pub mod ids {
    pub const DT_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
    pub const DT_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
    pub const DT_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
    pub const DT_DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
    pub const DT_TIME: &str = "http://www.w3.org/2001/XMLSchema#time";
    pub const DT_DATE: &str = "http://www.w3.org/2001/XMLSchema#date";
    pub const DT_DATE_TIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";
    pub const DT_DAY_TIME_DURATION: &str = "http://www.w3.org/2001/XMLSchema#dayTimeDuration";
    pub const DT_YEAR_MONTH_DURATION: &str = "http://www.w3.org/2001/XMLSchema#yearMonthDuration";
    pub const DT_ANY_URI: &str = "http://www.w3.org/2001/XMLSchema#anyURI";
    pub const DT_HEX_BINARY: &str = "http://www.w3.org/2001/XMLSchema#hexBinary";
    pub const DT_BASE64_BINARY: &str = "http://www.w3.org/2001/XMLSchema#base64Binary";
    pub const DT_X500_NAME: &str = "urn:oasis:names:tc:xacml:1.0:data-type:x500Name";
    pub const DT_RFC822_NAME: &str = "urn:oasis:names:tc:xacml:1.0:data-type:rfc822Name";
    pub const DT_IP_ADDRESS: &str = "urn:oasis:names:tc:xacml:2.0:data-type:ipAddress";
    pub const DT_DNS_NAME: &str = "urn:oasis:names:tc:xacml:2.0:data-type:dnsName";

    pub const CATEGORY_SUBJECT: &str =
        "urn:oasis:names:tc:xacml:1.0:subject-category:access-subject";
    pub const CATEGORY_RESOURCE: &str =
        "urn:oasis:names:tc:xacml:3.0:attribute-category:resource";
    pub const CATEGORY_ACTION: &str = "urn:oasis:names:tc:xacml:3.0:attribute-category:action";
    pub const CATEGORY_ENVIRONMENT: &str =
        "urn:oasis:names:tc:xacml:3.0:attribute-category:environment";

    pub const STATUS_OK: &str = "urn:oasis:names:tc:xacml:1.0:status:ok";
    pub const STATUS_MISSING_ATTRIBUTE: &str =
        "urn:oasis:names:tc:xacml:1.0:status:missing-attribute";
    pub const STATUS_SYNTAX_ERROR: &str = "urn:oasis:names:tc:xacml:1.0:status:syntax-error";
    pub const STATUS_PROCESSING_ERROR: &str =
        "urn:oasis:names:tc:xacml:1.0:status:processing-error";
}
