//! SQL query implementations, one module per aggregate.
//!
//! Every function takes a `&mut PgConnection`, so the same queries run
//! against a pooled connection or inside a transaction. Rows decode through
//! chrono (sqlx's timestamp mapping) and convert to `time` types at this
//! boundary; the rest of the workspace never sees chrono.

pub mod chats;
pub mod consent;
pub mod feedback;
pub mod messages;
pub mod patients;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use time::OffsetDateTime;
use uuid::Uuid;

use carebridge_core::Party;
use carebridge_storage::StorageError;

/// Converts chrono DateTime to time OffsetDateTime.
pub(crate) fn chrono_to_time(dt: DateTime<Utc>) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(dt.timestamp()).unwrap_or(OffsetDateTime::UNIX_EPOCH)
        + time::Duration::nanoseconds(i64::from(dt.timestamp_subsec_nanos()))
}

/// Converts a chrono NaiveDate to a time Date.
pub(crate) fn chrono_date_to_time(date: NaiveDate) -> time::Date {
    let month = time::Month::try_from(date.month() as u8).unwrap_or(time::Month::January);
    time::Date::from_calendar_date(date.year(), month, date.day() as u8)
        .unwrap_or(time::Date::MIN)
}

/// Converts a time Date to a chrono NaiveDate for binding.
pub(crate) fn time_date_to_chrono(date: time::Date) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), u32::from(u8::from(date.month())), u32::from(date.day()))
        .unwrap_or_default()
}

/// Rebuilds a `Party` from the nullable clinic/doctor column pair.
///
/// The schema's CHECK constraint guarantees exactly one side is set; a row
/// violating that is corrupt data, not caller error.
pub(crate) fn party_from_columns(
    clinic_id: Option<Uuid>,
    doctor_id: Option<Uuid>,
) -> Result<Party, StorageError> {
    match (clinic_id, doctor_id) {
        (Some(id), None) => Ok(Party::Clinic(id)),
        (None, Some(id)) => Ok(Party::Doctor(id)),
        _ => Err(StorageError::internal(
            "participant row violates the clinic/doctor exclusivity constraint",
        )),
    }
}

/// Splits a `Party` into the nullable clinic/doctor column pair.
pub(crate) fn party_to_columns(party: Party) -> (Option<Uuid>, Option<Uuid>) {
    match party {
        Party::Clinic(id) => (Some(id), None),
        Party::Doctor(id) => (None, Some(id)),
    }
}

/// Parses a text column through `FromStr`, reporting corrupt data as an
/// internal error.
pub(crate) fn parse_column<T>(value: &str, column: &str) -> Result<T, StorageError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| StorageError::internal(format!("corrupt {column} column: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_party_column_round_trip() {
        let id = Uuid::new_v4();
        let (clinic, doctor) = party_to_columns(Party::Doctor(id));
        assert_eq!(party_from_columns(clinic, doctor).unwrap(), Party::Doctor(id));

        let (clinic, doctor) = party_to_columns(Party::Clinic(id));
        assert_eq!(party_from_columns(clinic, doctor).unwrap(), Party::Clinic(id));
    }

    #[test]
    fn test_party_rejects_corrupt_rows() {
        assert!(party_from_columns(None, None).is_err());
        assert!(party_from_columns(Some(Uuid::new_v4()), Some(Uuid::new_v4())).is_err());
    }

    #[test]
    fn test_date_round_trip() {
        let date = time::Date::from_calendar_date(1987, time::Month::March, 14).unwrap();
        assert_eq!(chrono_date_to_time(time_date_to_chrono(date)), date);
    }

    #[test]
    fn test_parse_column() {
        let status: carebridge_core::PatientStatus = parse_column("active", "status").unwrap();
        assert_eq!(status, carebridge_core::PatientStatus::Active);

        let err =
            parse_column::<carebridge_core::PatientStatus>("archived", "status").unwrap_err();
        assert!(matches!(err, StorageError::Internal { .. }));
    }
}
