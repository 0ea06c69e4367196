//! # Validation Module
//!
//! Request validation that runs before any SQL is sent.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Request handler                                              │
//! │  └── Deserialization (types, required JSON fields)                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  └── Field rules (non-empty, ranges, formats)                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK (stock >= 0)                                     │
//! │  ├── UNIQUE (phone, email, username)                                   │
//! │  └── Foreign keys                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use netshop_core::validation::{validate_name, validate_quantity};
//!
//! validate_name("name", "Linen shirt", 200).unwrap();
//! assert!(validate_quantity(0).is_err());
//! ```

use crate::error::ValidationError;
use crate::types::{CreateCustomer, CreateFile, CreateOrder, CreateProduct, CreateVariant};
use crate::{MAX_ITEM_QUANTITY, MAX_ORDER_ITEMS, MAX_PRICE_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required, length-bounded text field.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most `max` characters
pub fn validate_name(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates an email address (shape only, no deliverability check).
///
/// ```rust
/// use netshop_core::validation::validate_email;
///
/// assert!(validate_email("ada@example.com").is_ok());
/// assert!(validate_email("ada.example.com").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<()> {
    validate_name("email", email, 254)?;

    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: reason.to_string(),
    };

    let (local, domain) = email
        .trim()
        .split_once('@')
        .ok_or_else(|| invalid("must contain '@'"))?;

    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(invalid("must look like name@domain.tld"));
    }

    Ok(())
}

/// Validates a phone number: digits plus `+`, spaces, dashes and parentheses.
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    validate_name("phone", phone, 32)?;

    let ok = phone
        .trim()
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')'));
    if !ok || !phone.chars().any(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must contain only digits, '+', spaces, dashes and parentheses".to_string(),
        });
    }

    Ok(())
}

/// Validates optional person metadata, which must be a JSON document.
pub fn validate_metadata(metadata: Option<&str>) -> ValidationResult<()> {
    if let Some(raw) = metadata {
        serde_json::from_str::<serde_json::Value>(raw).map_err(|e| {
            ValidationError::InvalidFormat {
                field: "metadata".to_string(),
                reason: e.to_string(),
            }
        })?;
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates an order-line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in cents. Zero is allowed.
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    if cents > MAX_PRICE_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Validates a stored entity id.
pub fn validate_id(field: &str, id: i64) -> ValidationResult<()> {
    if id <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Request Validators
// =============================================================================

/// Validates an order request before the transaction is opened.
pub fn validate_create_order(request: &CreateOrder) -> ValidationResult<()> {
    validate_id("customer_id", request.customer_id)?;

    let delivery = &request.delivery;
    validate_name("delivery.address", &delivery.address, 255)?;
    validate_name("delivery.zipcode", &delivery.zipcode, 20)?;
    validate_name("delivery.city", &delivery.city, 100)?;
    validate_name("delivery.country", &delivery.country, 100)?;

    if request.items.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if request.items.len() > MAX_ORDER_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_ORDER_ITEMS as i64,
        });
    }

    for line in &request.items {
        validate_id("variant_id", line.variant_id)?;
        validate_quantity(line.quantity)?;
    }

    Ok(())
}

/// Validates a single variant definition.
pub fn validate_create_variant(variant: &CreateVariant) -> ValidationResult<()> {
    validate_id("size_id", variant.size_id)?;
    validate_id("color_id", variant.color_id)?;
    validate_price_cents("price", variant.price_cents)?;

    if variant.stock < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "stock".to_string(),
        });
    }

    Ok(())
}

/// Validates a product with its variants.
pub fn validate_create_product(product: &CreateProduct) -> ValidationResult<()> {
    validate_name("name", &product.name, 200)?;
    validate_id("category_id", product.category_id)?;
    validate_id("employee_id", product.employee_id)?;
    validate_price_cents("base_price", product.base_price_cents)?;

    product
        .variants
        .iter()
        .try_for_each(validate_create_variant)
}

/// Validates a customer sign-up.
pub fn validate_create_customer(customer: &CreateCustomer) -> ValidationResult<()> {
    validate_name("username", &customer.username, 64)?;
    validate_name("password_hash", &customer.password_hash, 512)?;

    let person = &customer.person;
    validate_name("first_name", &person.first_name, 100)?;
    validate_name("last_name", &person.last_name, 100)?;
    validate_phone(&person.phone)?;
    validate_email(&person.email)?;
    validate_metadata(person.metadata.as_deref())
}

/// Validates stored-file metadata.
pub fn validate_create_file(file: &CreateFile) -> ValidationResult<()> {
    validate_name("filename", &file.filename, 255)?;
    validate_name("filetype", &file.filetype, 100)?;
    validate_name("path", &file.path, 1024)?;

    if file.width < 0 || file.height < 0 || file.size_bytes < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "dimensions".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
