//! Field rules shared by the entities and the services.
//!
//! Length rules live on the entity models as `validator` attributes; this module holds the
//! rules that need code.

use chrono::{Local, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use std::borrow::Cow;
use validator::ValidationError;

pub mod display;

pub use display::UnknownEnumValue;

lazy_static! {
    /// Mainland mobile numbers: exactly eleven digits.
    pub static ref PHONE_NUMBER: Regex =
        Regex::new(r"^[0-9]{11}$").expect("phone number pattern is valid");
}

/// Messages describing everything wrong with a birthday, empty when it is acceptable.
pub fn birthday_messages(birthday: Option<NaiveDate>, today: NaiveDate) -> Vec<String> {
    let mut messages = Vec::new();
    match birthday {
        None => messages.push("Birthday is required".to_string()),
        Some(date) if date > today => {
            messages.push(format!("Birthday {date} is later than today ({today})"));
        }
        Some(_) => {}
    }
    messages
}

/// `validator` hook for cat birthdays, checked against the local calendar date.
pub fn validate_birthday(birthday: &NaiveDate) -> Result<(), ValidationError> {
    let today = Local::now().date_naive();
    match birthday_messages(Some(*birthday), today).into_iter().next() {
        None => Ok(()),
        Some(message) => Err(error_with_message("birthday_in_future", message)),
    }
}

pub fn validate_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(error_with_message(
            "amount_negative",
            "Amount cannot be negative".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn error_with_message(code: &'static str, message: String) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Owned(message));
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 8).unwrap()
    }

    #[rstest]
    #[case::today(0)]
    #[case::yesterday(-1)]
    #[case::years_ago(-3650)]
    fn birthday_up_to_today_has_no_messages(#[case] offset_days: i64) {
        let birthday = today() + Duration::days(offset_days);
        assert!(birthday_messages(Some(birthday), today()).is_empty());
    }

    #[rstest]
    #[case::tomorrow(1)]
    #[case::next_year(366)]
    fn future_birthday_is_reported(#[case] offset_days: i64) {
        let birthday = today() + Duration::days(offset_days);
        let messages = birthday_messages(Some(birthday), today());
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("later than today"));
    }

    #[test]
    fn missing_birthday_is_reported() {
        assert_eq!(birthday_messages(None, today()), vec!["Birthday is required"]);
    }

    #[test]
    fn validator_hook_uses_the_local_date() {
        let local_today = Local::now().date_naive();
        assert!(validate_birthday(&local_today).is_ok());

        let err = validate_birthday(&(local_today + Duration::days(1))).unwrap_err();
        assert_eq!(err.code, "birthday_in_future");
        assert!(err.message.is_some());
    }

    #[test]
    fn phone_numbers_need_eleven_digits() {
        assert!(PHONE_NUMBER.is_match("13423232323"));
        assert!(!PHONE_NUMBER.is_match("1342323232"));
        assert!(!PHONE_NUMBER.is_match("134232323234"));
        assert!(!PHONE_NUMBER.is_match("1342323-323"));
    }

    #[test]
    fn amounts_cannot_be_negative() {
        assert!(validate_amount(&dec!(0)).is_ok());
        assert!(validate_amount(&dec!(2999.00)).is_ok());
        assert!(validate_amount(&dec!(-0.01)).is_err());
    }
}
