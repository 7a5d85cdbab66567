//! Data model types: identifiers, typed values, bags, statuses, decisions,
//! versions, and the request/response surface.

mod attribute;
mod attribute_value;
mod bag;
mod decision;
mod identifier;
mod request;
mod response;
mod status;
mod version;

pub use attribute::Attribute;
pub use attribute_value::{
    AttributeValue, DayTimeDuration, Rfc822Name, Value, X500Name, YearMonthDuration,
};
pub use bag::Bag;
pub use decision::{Decision, Effect, ExtendedIndeterminate};
pub use identifier::{Identifier, ids};
pub use request::{Request, RequestAttributes};
pub use response::{Advice, AttributeAssignment, Obligation, PolicyIdentifier, Response};
pub use status::{MissingAttributeDetail, Status, StatusCode, StatusDetail};
pub use version::{IdReferenceMatch, Version, VersionMatch};
