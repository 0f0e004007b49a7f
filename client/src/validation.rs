//! # Form Validation
//!
//! Checks that run before a request is built. Failures are collected per
//! field so a view can show each message next to its input, and nothing
//! is sent until every field passes.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::types::{RegistrationProfile, TransferRequest};

/// Longest description the payment service accepts.
pub const MAX_DESCRIPTION_LENGTH: usize = 1000;

/// Shortest password the user service accepts.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Shortest accepted first/last name, after trimming.
pub const MIN_NAME_LENGTH: usize = 2;

// ---------------------------------------------------------------------------
// Error Collection
// ---------------------------------------------------------------------------

/// Field name → message. Ordered so rendering is stable.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: BTreeMap<String, String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an error for `field`. The first error per field wins.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `Ok(value)` if nothing was recorded, otherwise `Err(self)`.
    pub fn into_result<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.fields {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Field Rules
// ---------------------------------------------------------------------------

/// `local@domain.tld` with no whitespace and exactly one `@`.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

pub fn is_valid_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LENGTH
}

pub fn is_valid_name(name: &str) -> bool {
    name.trim().chars().count() >= MIN_NAME_LENGTH
}

/// Optional international number: `+?[1-9][0-9]{0,15}` once spaces are
/// removed. Empty means "not provided" and passes.
pub fn is_valid_phone(phone: &str) -> bool {
    let compact: String = phone.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return true;
    }
    let digits = compact.strip_prefix('+').unwrap_or(&compact);
    let mut chars = digits.chars();
    match chars.next() {
        Some(c) if ('1'..='9').contains(&c) => {}
        _ => return false,
    }
    digits.len() <= 16 && chars.all(|c| c.is_ascii_digit())
}

/// Parses a user-typed amount exactly. No float round-trip.
pub fn parse_amount(input: &str) -> Result<Decimal, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err("Amount is required".to_string());
    }
    let amount =
        Decimal::from_str(trimmed).map_err(|_| "Please enter a valid amount".to_string())?;
    if amount <= Decimal::ZERO {
        return Err("Amount must be greater than 0".to_string());
    }
    Ok(amount)
}

fn check_email(errors: &mut ValidationErrors, email: &str) {
    if email.is_empty() {
        errors.add("email", "Email is required");
    } else if !is_valid_email(email) {
        errors.add("email", "Please enter a valid email address");
    }
}

fn check_password(errors: &mut ValidationErrors, password: &str) {
    if password.is_empty() {
        errors.add("password", "Password is required");
    } else if !is_valid_password(password) {
        errors.add(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LENGTH} characters long"),
        );
    }
}

fn check_name(errors: &mut ValidationErrors, field: &str, label: &str, value: &str) {
    if value.trim().is_empty() {
        errors.add(field, format!("{label} is required"));
    } else if !is_valid_name(value) {
        errors.add(
            field,
            format!("{label} must be at least {MIN_NAME_LENGTH} characters long"),
        );
    }
}

// ---------------------------------------------------------------------------
// Forms
// ---------------------------------------------------------------------------

/// Validates login credentials.
pub fn validate_login(email: &str, password: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check_email(&mut errors, email);
    check_password(&mut errors, password);
    errors.into_result(())
}

/// Validates a registration form.
pub fn validate_registration(profile: &RegistrationProfile) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check_email(&mut errors, &profile.email);
    check_password(&mut errors, &profile.password);
    check_name(&mut errors, "firstName", "First name", &profile.first_name);
    check_name(&mut errors, "lastName", "Last name", &profile.last_name);
    if let Some(phone) = &profile.phone {
        if !is_valid_phone(phone) {
            errors.add("phone", "Please enter a valid phone number");
        }
    }
    errors.into_result(())
}

/// Raw transfer form input, as typed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransferForm {
    pub recipient: String,
    pub amount: String,
    pub description: String,
}

impl TransferForm {
    /// Validates the form against the cached balance and builds the
    /// request body.
    ///
    /// The balance check is a courtesy; the payment service makes the real
    /// decision.
    pub fn validate(&self, available: Decimal) -> Result<TransferRequest, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let recipient = self.recipient.trim();

        if recipient.is_empty() {
            errors.add("recipient", "Please fill in all required fields");
        } else if !is_valid_email(recipient) {
            errors.add("recipient", "Please enter a valid email address");
        }

        let amount = match parse_amount(&self.amount) {
            Ok(a) if a > available => {
                errors.add("amount", "Insufficient balance");
                None
            }
            Ok(a) => Some(a),
            Err(msg) => {
                errors.add("amount", msg);
                None
            }
        };

        let description = self.description.trim();
        if description.chars().count() > MAX_DESCRIPTION_LENGTH {
            errors.add(
                "description",
                format!("Description must not exceed {MAX_DESCRIPTION_LENGTH} characters"),
            );
        }

        match amount {
            Some(amount) if errors.is_empty() => Ok(TransferRequest {
                to_email: recipient.to_string(),
                amount,
                description: (!description.is_empty()).then(|| description.to_string()),
            }),
            _ => Err(errors),
        }
    }
}
