//! Business operations over the store, one service per resource.

use validator::ValidationErrors;

use crate::errors::{field_errors, FieldErrors, ServiceError};

pub mod appointments;
pub mod breeds;
pub mod cat_orders;
pub mod cats;
pub mod commodities;
pub mod commodity_orders;
pub mod line_items;
pub mod purchase_orders;
pub mod users;

/// One page of a listing plus the number of rows across all pages.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}

/// Runs several validations and reports all of their field errors together.
pub(crate) fn validate_all(
    results: impl IntoIterator<Item = Result<(), ValidationErrors>>,
) -> Result<(), ServiceError> {
    let mut fields = FieldErrors::new();
    for errors in results.into_iter().filter_map(Result::err) {
        for (field, messages) in field_errors(&errors) {
            fields.entry(field).or_default().extend(messages);
        }
    }
    if fields.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::InvalidFields(fields))
    }
}

pub(crate) fn invalid_field(field: &str, message: String) -> ServiceError {
    ServiceError::InvalidFields(FieldErrors::from([(field.to_string(), vec![message])]))
}

pub(crate) fn not_found(what: &str, id: impl std::fmt::Display) -> ServiceError {
    ServiceError::NotFound(format!("{what} {id} not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use validator::Validate;

    #[derive(Validate)]
    struct Visit {
        #[validate(length(min = 1, message = "required"))]
        customer_name: String,
    }

    #[test]
    fn field_errors_from_every_check_are_combined() {
        let header = Visit {
            customer_name: String::new(),
        }
        .validate();
        let items = crate::entities::line_item::validate_line_items(&[]);

        let err = validate_all([header, items]).unwrap_err();
        assert_matches!(err, ServiceError::InvalidFields(fields) => {
            assert_eq!(fields["customer_name"], vec!["required"]);
            assert_eq!(fields["items"].len(), 1);
        });
    }

    #[test]
    fn passing_checks_are_ok() {
        assert!(validate_all([Ok(()), Ok(())]).is_ok());
    }
}
