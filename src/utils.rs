use crate::Error;

/// The fixed 4 decimal place encoding used to key time samples.
///
/// ```
/// assert_eq!(tin_archive::timestamp_key(1.0), "1.0000");
/// assert_eq!(tin_archive::timestamp_key(1577836800.123456), "1577836800.1235");
/// ```
pub fn timestamp_key(timestamp: f64) -> String {
    format!("{timestamp:.4}")
}

/// shortest representation of a float that parses back to the same value
pub(crate) fn format_float(value: f64) -> String {
    let mut buffer = ryu::Buffer::new();
    buffer.format(value).to_string()
}

/// seconds since the unix epoch, with sub-second resolution
pub(crate) fn now_timestamp() -> f64 {
    let now = chrono::Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) * 1e-6
}

/// uids are used as file stems and as container group names
pub(crate) fn check_uid(uid: &str) -> Result<(), Error> {
    let invalid = uid.is_empty()
        || uid == "."
        || uid == ".."
        || uid.contains(|c| c == '/' || c == '\\' || c == '\0');

    if invalid {
        Err(Error::InvalidUid(uid.into()))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_to_four_places() {
        assert_eq!(timestamp_key(0.00004), "0.0000");
        assert_eq!(timestamp_key(12.34567), "12.3457");
        assert_eq!(timestamp_key(-3.5), "-3.5000");
    }

    #[test]
    fn uid_rules() {
        assert!(check_uid("tin-01").is_ok());
        assert!(check_uid("with space").is_ok());
        assert!(check_uid("").is_err());
        assert!(check_uid("..").is_err());
        assert!(check_uid("a/b").is_err());
        assert!(check_uid("a\\b").is_err());
    }

    #[test]
    fn float_formatting_round_trips() {
        let value = 1577836800.123456;
        let text = format_float(value);
        assert_eq!(text.parse::<f64>().unwrap(), value);
        assert_eq!(format_float(1.0), "1.0");
    }
}
