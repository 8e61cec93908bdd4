//! Subject identity of a certificate signing request.
//!
//! The caller supplies every field; nothing is defaulted. Field limits follow
//! the RFC 5280 upper bounds.

use crate::error::CsrError;
use const_oid::ObjectIdentifier;
use der::{asn1::SetOfVec, Any, Tag};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use x509_cert::{
    attr::AttributeTypeAndValue,
    name::{Name, RdnSequence, RelativeDistinguishedName},
};

pub(crate) const CN: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");
const C: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.6");
const L: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.7");
const ST: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.8");
const O: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.10");
const OU: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.11");

// RFC 5280 upper bounds
const UB_COMMON_NAME: usize = 64;
const UB_ORGANIZATION_NAME: usize = 64;
const UB_STATE_OR_LOCALITY_NAME: usize = 128;

static COMMON_NAME_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_\-. @]+$").unwrap());
static ORGANIZATION_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_\-. ]+$").unwrap());
static DNS_NAME_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9\-.]+$").unwrap());
static COUNTRY_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{2}$").unwrap());

/// Distinguished-name fields and requested DNS names of a CSR subject
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectIdentity {
    #[serde(default)]
    pub common_name: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub organizational_unit: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub locality: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dns_names: Vec<String>,
}

impl SubjectIdentity {
    pub fn new<S: Into<String>>(common_name: S) -> Self {
        SubjectIdentity {
            common_name: Some(common_name.into()),
            ..Default::default()
        }
    }

    pub fn with_organization<S: Into<String>>(mut self, organization: S) -> Self {
        self.organization = Some(organization.into());
        self
    }

    pub fn with_country<S: Into<String>>(mut self, country: S) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn with_dns_name<S: Into<String>>(mut self, dns_name: S) -> Self {
        self.dns_names.push(dns_name.into());
        self
    }

    /// Checks every present field and returns the common name
    pub fn validate(&self) -> Result<&str, CsrError> {
        let common_name = match self.common_name.as_deref() {
            Some(cn) => cn,
            None => return Err(CsrError::invalid_subject("commonName", "is required")),
        };
        validate_common_name(common_name)
            .map_err(|reason| CsrError::invalid_subject("commonName", reason))?;

        if let Some(organization) = &self.organization {
            validate_organization_name(organization)
                .map_err(|reason| CsrError::invalid_subject("organization", reason))?;
        }
        if let Some(unit) = &self.organizational_unit {
            validate_organization_name(unit)
                .map_err(|reason| CsrError::invalid_subject("organizationalUnit", reason))?;
        }
        if let Some(country) = &self.country {
            if !COUNTRY_CODE.is_match(country) {
                return Err(CsrError::invalid_subject(
                    "country",
                    "must be a two-letter uppercase country code",
                ));
            }
        }
        if let Some(state) = &self.state {
            validate_free_text(state, UB_STATE_OR_LOCALITY_NAME)
                .map_err(|reason| CsrError::invalid_subject("state", reason))?;
        }
        if let Some(locality) = &self.locality {
            validate_free_text(locality, UB_STATE_OR_LOCALITY_NAME)
                .map_err(|reason| CsrError::invalid_subject("locality", reason))?;
        }
        for dns_name in &self.dns_names {
            validate_dns_name(dns_name).map_err(|reason| {
                CsrError::invalid_subject("dnsNames", format!("'{}' {}", dns_name, reason))
            })?;
        }

        Ok(common_name)
    }

    /// Validates the subject and encodes it as an X.501 name, CN first
    pub fn to_name(&self) -> Result<Name, CsrError> {
        let common_name = self.validate()?;

        let mut rdns = vec![rdn(CN, Tag::Utf8String, common_name)?];
        let optional = [
            (O, Tag::Utf8String, &self.organization),
            (OU, Tag::Utf8String, &self.organizational_unit),
            (C, Tag::PrintableString, &self.country),
            (ST, Tag::Utf8String, &self.state),
            (L, Tag::Utf8String, &self.locality),
        ];
        for (oid, tag, value) in optional.iter() {
            if let Some(value) = value {
                rdns.push(rdn(*oid, *tag, value)?);
            }
        }

        Ok(RdnSequence(rdns))
    }
}

fn rdn(
    oid: ObjectIdentifier,
    tag: Tag,
    value: &str,
) -> Result<RelativeDistinguishedName, CsrError> {
    let value = Any::new(tag, value.as_bytes())
        .map_err(|e| CsrError::internal("encoding subject attribute", e))?;
    let set = SetOfVec::try_from(vec![AttributeTypeAndValue { oid, value }])
        .map_err(|e| CsrError::internal("encoding subject attribute", e))?;
    Ok(RelativeDistinguishedName(set))
}

/// Returns the common name recorded in an encoded name, if any
pub(crate) fn common_name_of(name: &Name) -> Option<String> {
    name.0
        .iter()
        .flat_map(|rdn| rdn.0.iter())
        .find(|attr| attr.oid == CN)
        .and_then(|attr| std::str::from_utf8(attr.value.value()).ok())
        .map(str::to_owned)
}

fn validate_spacing(value: &str) -> Result<(), &'static str> {
    if value.is_empty() {
        return Err("cannot be empty");
    }
    if value.starts_with(' ') {
        return Err("cannot start with a space");
    }
    if value.ends_with(' ') {
        return Err("cannot end with a space");
    }
    if value.contains("  ") {
        return Err("should not have repeating spaces");
    }
    Ok(())
}

fn validate_common_name(common_name: &str) -> Result<(), &'static str> {
    validate_spacing(common_name)?;
    if common_name.len() > UB_COMMON_NAME {
        return Err("is longer than 64 characters");
    }
    let rest = common_name.strip_prefix("*.").unwrap_or(common_name);
    if rest.is_empty() {
        return Err("wildcard must be followed by a name");
    }
    if !COMMON_NAME_CHARS.is_match(rest) {
        return Err("contains invalid characters");
    }
    Ok(())
}

fn validate_organization_name(name: &str) -> Result<(), &'static str> {
    validate_spacing(name)?;
    if name.len() < 2 {
        return Err("must be at least two characters long");
    }
    if name.len() > UB_ORGANIZATION_NAME {
        return Err("is longer than 64 characters");
    }
    if name.chars().all(|c| c.is_ascii_digit()) {
        return Err("should not be full numbers");
    }
    if !ORGANIZATION_CHARS.is_match(name) {
        return Err("contains invalid characters");
    }
    Ok(())
}

fn validate_free_text(value: &str, max_len: usize) -> Result<(), &'static str> {
    if value.trim().is_empty() {
        return Err("cannot be empty");
    }
    if value.trim() != value {
        return Err("must not have leading or trailing spaces");
    }
    if value.chars().count() > max_len {
        return Err("is too long");
    }
    if value.chars().any(char::is_control) {
        return Err("contains control characters");
    }
    Ok(())
}

fn validate_dns_name(dns_name: &str) -> Result<(), &'static str> {
    let name = dns_name.strip_prefix("*.").unwrap_or(dns_name);
    if name.is_empty() {
        return Err("cannot be empty");
    }
    if name.starts_with('-') || name.starts_with('.') || name.ends_with('-') || name.ends_with('.')
    {
        return Err("cannot start or end with '-' or '.'");
    }
    if name.contains("..") {
        return Err("cannot have repeating '.'");
    }
    if !DNS_NAME_CHARS.is_match(name) {
        return Err("contains invalid characters");
    }
    match name.rsplit('.').next() {
        Some(tld) if tld.len() >= 2 => Ok(()),
        _ => Err("last label must be at least two characters"),
    }
}
