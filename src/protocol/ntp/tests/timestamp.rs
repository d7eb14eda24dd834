use std::time::{Duration, UNIX_EPOCH};

use crate::protocol::ntp::{
    CodecError, NTP_DELTA, NtpShort, NtpTimestamp, join_fixed, ntp_to_system_time, split_fixed,
    system_to_ntp_time,
};

#[test]
fn test_ntp_delta_matches_epoch_gap() {
    // 1900-01-01 to 1970-01-01
    assert_eq!(NTP_DELTA, 2_208_988_800);
}

#[test]
fn test_split_fixed_positive() {
    assert_eq!(split_fixed(1.5, 32), (1, 0x8000_0000));
    assert_eq!(split_fixed(3.25, 16), (3, 0x4000));
    assert_eq!(split_fixed(7.0, 32), (7, 0));
}

#[test]
fn test_split_fixed_negative_truncates_toward_zero() {
    // Integer part truncates, fraction is taken from the magnitude
    assert_eq!(split_fixed(-1.25, 16), (-1, 0x4000));
    assert_eq!(split_fixed(-0.5, 32), (0, 0x8000_0000));
}

#[test]
fn test_split_fixed_saturates_fraction() {
    let (integer, fraction) = split_fixed(0.999_999_999_999_999_9, 32);
    assert_eq!(integer, 0);
    assert!(fraction <= u64::from(u32::MAX));

    let (_, fraction) = split_fixed(0.999_999_999_999_999_9, 16);
    assert!(fraction <= u64::from(u16::MAX));
}

#[test]
fn test_join_fixed() {
    assert!((join_fixed(1, 0x8000_0000, 32) - 1.5).abs() < f64::EPSILON);
    assert!((join_fixed(3, 0x4000, 16) - 3.25).abs() < f64::EPSILON);
    assert!((join_fixed(10, 0, 16) - 10.0).abs() < f64::EPSILON);
}

#[test]
fn test_epoch_shift_roundtrip() {
    let unix = 1_700_000_000.25;
    let ntp = system_to_ntp_time(unix);
    assert!((ntp - unix - 2_208_988_800.0).abs() < 1e-6);
    assert!((ntp_to_system_time(ntp) - unix).abs() < 1e-6);
}

#[test]
fn test_timestamp_from_secs() {
    let ts = NtpTimestamp::from_secs_f64(1000.5).unwrap();
    assert_eq!(ts.seconds, 1000);
    assert_eq!(ts.fraction, 0x8000_0000);
    assert!((ts.as_secs_f64() - 1000.5).abs() < f64::EPSILON);
}

#[test]
fn test_timestamp_from_secs_out_of_range() {
    assert!(matches!(
        NtpTimestamp::from_secs_f64(-1.0),
        Err(CodecError::ValueOutOfRange { .. })
    ));
    assert!(NtpTimestamp::from_secs_f64(4_294_967_296.0).is_err());
    assert!(NtpTimestamp::from_secs_f64(f64::NAN).is_err());
    assert!(NtpTimestamp::from_secs_f64(f64::INFINITY).is_err());
    assert!(NtpTimestamp::from_secs_f64(4_294_967_295.5).is_ok());
}

#[test]
fn test_timestamp_bits() {
    let ts = NtpTimestamp::new(0x1234_5678, 0x9ABC_DEF0);
    assert_eq!(ts.to_bits(), 0x1234_5678_9ABC_DEF0);
    assert_eq!(NtpTimestamp::from_bits(ts.to_bits()), ts);
}

#[test]
fn test_timestamp_from_unix_epoch() {
    let ts = NtpTimestamp::from_system_time(UNIX_EPOCH);
    assert_eq!(u64::from(ts.seconds), NTP_DELTA);
    assert_eq!(ts.fraction, 0);
    assert!(ts.to_system_secs_f64().abs() < f64::EPSILON);

    let half = NtpTimestamp::from_system_time(UNIX_EPOCH + Duration::from_millis(500));
    assert_eq!(half.fraction, 0x8000_0000);
}

#[test]
fn test_timestamp_now() {
    let ts = NtpTimestamp::now();

    // Should be somewhere reasonable (after 2020)
    assert!(ts.seconds > 3_786_825_600); // 2020-01-01 in NTP time
}

#[test]
fn test_timestamp_diff() {
    let a = NtpTimestamp::from_secs_f64(1000.0).unwrap();
    let b = NtpTimestamp::from_secs_f64(1000.5).unwrap();

    assert!((b.diff_secs(&a) - 0.5).abs() < 1e-9);
    assert!((a.diff_secs(&b) + 0.5).abs() < 1e-9);
    assert!(a.diff_secs(&a).abs() < f64::EPSILON);
}

#[test]
fn test_short_from_secs() {
    let short = NtpShort::from_secs_f64(1.5).unwrap();
    assert_eq!(short.seconds, 1);
    assert_eq!(short.fraction, 0x8000);
    assert_eq!(short.to_bits(), 0x0001_8000);
    assert_eq!(NtpShort::from_bits(0x0001_8000), short);
    assert!((short.as_secs_f64() - 1.5).abs() < f64::EPSILON);
}

#[test]
fn test_short_out_of_range() {
    assert!(NtpShort::from_secs_f64(65_536.0).is_err());
    assert!(NtpShort::from_secs_f64(-0.1).is_err());
    assert!(NtpShort::from_secs_f64(65_535.999).is_ok());
}
