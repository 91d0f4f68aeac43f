//! Web-form enquiry types and validation rules.

use postroom_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

/// A validated web-form enquiry.
///
/// Every field is required; validation is presence-only by design. Field
/// content is forwarded verbatim to the operator notification email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enquiry {
    name: NonEmptyString,
    email: NonEmptyString,
    phone: NonEmptyString,
    address: NonEmptyString,
    kind: NonEmptyString,
    message: NonEmptyString,
}

impl Enquiry {
    /// Creates a validated enquiry from raw form values.
    ///
    /// Fails with a field-specific validation error when any value is empty
    /// or whitespace-only.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
        address: impl Into<String>,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> AppResult<Self> {
        Ok(Self {
            name: required("name", name)?,
            email: required("email", email)?,
            phone: required("phone", phone)?,
            address: required("address", address)?,
            kind: required("type", kind)?,
            message: required("message", message)?,
        })
    }

    /// Returns the sender name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the sender email address.
    #[must_use]
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    /// Returns the sender phone number.
    #[must_use]
    pub fn phone(&self) -> &str {
        self.phone.as_str()
    }

    /// Returns the sender postal address.
    #[must_use]
    pub fn address(&self) -> &str {
        self.address.as_str()
    }

    /// Returns the enquiry type selected on the form.
    #[must_use]
    pub fn kind(&self) -> &str {
        self.kind.as_str()
    }

    /// Returns the free-text enquiry message.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}

fn required(field: &str, value: impl Into<String>) -> AppResult<NonEmptyString> {
    NonEmptyString::new(value).map_err(|_| AppError::Validation(format!("{field} is required")))
}

/// Best-effort client identity derived from untrusted proxy headers.
///
/// Built from the first and last entries of a comma-separated forwarded
/// address list, joined by a space, or from the raw socket address when no
/// forwarded header is present. Header values are attacker-controlled, so
/// this is a throttling key, not an authentication signal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientIdentity(NonEmptyString);

impl ClientIdentity {
    /// Derives a client identity from a forwarded-address header value,
    /// falling back to the socket address.
    ///
    /// A single-entry forwarded list yields the same address twice; that
    /// duplication is kept for parity with the pre-existing key format.
    /// An empty or whitespace-only header value counts as absent.
    pub fn derive(forwarded: Option<&str>, socket_address: &str) -> AppResult<Self> {
        let forwarded = forwarded.map(str::trim).filter(|list| !list.is_empty());

        let value = match forwarded {
            Some(list) => {
                let entries: Vec<&str> = list.split(',').map(str::trim).collect();
                match (entries.first(), entries.last()) {
                    (Some(first), Some(last)) => format!("{first} {last}"),
                    _ => String::new(),
                }
            }
            None => socket_address.to_owned(),
        };

        NonEmptyString::new(value)
            .map(Self)
            .map_err(|_| AppError::Validation("client identity is required".to_owned()))
    }

    /// Returns the identity as a rate-limit key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for ClientIdentity {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}
