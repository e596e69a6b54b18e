mod common;

use campustap::core::identity::{Decoded, IdentityDecoder};
use campustap::db::students;
use chrono::NaiveDate;
use common::{CODE, STUDENT, seeded, student};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
}

#[test]
fn test_valid_code_resolves_student() {
    let db = seeded();
    let decoder = IdentityDecoder::new("SCH").unwrap();

    match decoder.decode_and_resolve(&db.pool.conn, CODE, today()).unwrap() {
        Decoded::Student(s) => assert_eq!(s.id, STUDENT),
        Decoded::Invalid(reason) => panic!("expected student, got invalid: {reason}"),
    }
}

#[test]
fn test_code_is_trimmed_and_case_insensitive() {
    let db = seeded();
    let decoder = IdentityDecoder::new("sch").unwrap();

    let decoded = decoder
        .decode_and_resolve(&db.pool.conn, "  sch-2026-000001-0001 \n", today())
        .unwrap();
    assert!(matches!(decoded, Decoded::Student(_)));
}

#[test]
fn test_structural_failures_are_invalid() {
    let decoder = IdentityDecoder::new("SCH").unwrap();

    for bad in [
        "",
        "SCH-2026-000001",
        "SCH-2026-00001-0001",
        "SCH-2026-000001-001",
        "XYZ-2026-000001-0001",
        "SCH2026-000001-0001",
        "SCH-2026-000001-0001-9",
        "SCH-20a6-000001-0001",
        "000001",
    ] {
        assert!(
            decoder.parse(bad, today()).is_err(),
            "'{bad}' should be rejected"
        );
    }
}

#[test]
fn test_only_ascii_digits_are_accepted() {
    let decoder = IdentityDecoder::new("SCH").unwrap();

    // Arabic-Indic and full-width digits in the serial
    for bad in [
        "SCH-2026-\u{0660}\u{0660}\u{0660}\u{0660}\u{0660}\u{0661}-0001",
        "SCH-2026-000001-\u{FF10}\u{FF10}\u{FF10}\u{FF11}",
    ] {
        let err = decoder.parse(bad, today()).unwrap_err();
        assert!(err.contains("does not match"), "'{bad}': {err}");
    }
}

#[test]
fn test_year_window_is_plus_minus_one() {
    let decoder = IdentityDecoder::new("SCH").unwrap();

    assert!(decoder.parse("SCH-2025-000001-0001", today()).is_ok());
    assert!(decoder.parse("SCH-2027-000001-0001", today()).is_ok());
    assert!(decoder.parse("SCH-2024-000001-0001", today()).is_err());
    assert!(decoder.parse("SCH-2028-000001-0001", today()).is_err());
}

#[test]
fn test_invalid_structure_never_touches_storage() {
    let db = seeded();
    // Drop the lookup table: a structural failure must still come back as Invalid.
    db.pool.conn.execute_batch("DROP TABLE issued_ids;").unwrap();
    let decoder = IdentityDecoder::new("SCH").unwrap();

    let decoded = decoder
        .decode_and_resolve(&db.pool.conn, "SCH-1999-000001-0001", today())
        .unwrap();
    assert!(matches!(decoded, Decoded::Invalid(_)));
}

#[test]
fn test_inactive_or_unknown_code_is_invalid() {
    let db = seeded();
    let conn = &db.pool.conn;
    students::insert_student(conn, &student("S-002", "7", None, None)).unwrap();
    students::issue_code(conn, "SCH-2026-000002-0001", "S-002", false).unwrap();
    let decoder = IdentityDecoder::new("SCH").unwrap();

    let inactive = decoder
        .decode_and_resolve(conn, "SCH-2026-000002-0001", today())
        .unwrap();
    assert!(matches!(inactive, Decoded::Invalid(ref r) if r.contains("inactive")));

    let unknown = decoder
        .decode_and_resolve(conn, "SCH-2026-999999-0001", today())
        .unwrap();
    assert!(matches!(unknown, Decoded::Invalid(_)));
}

#[test]
fn test_prefix_is_escaped() {
    let decoder = IdentityDecoder::new("A.B").unwrap();

    assert!(decoder.parse("A.B-2026-000001-0001", today()).is_ok());
    assert!(decoder.parse("AXB-2026-000001-0001", today()).is_err());
    assert_eq!(
        decoder.canonical(&decoder.parse("a.b-2026-000001-0001", today()).unwrap()),
        "A.B-2026-000001-0001"
    );
}
