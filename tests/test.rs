use assert_matches::assert_matches;

use rwtf::result::{Error, Result};
use rwtf::{
    write_track, FieldType, MetadataEntry, Row, Schema, SchemaField, Section, TrackReader,
    TrackType, Value,
};

fn row(pairs: &[(&str, Value)]) -> Row {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

#[test]
fn empty_track_fixture() -> Result<()> {
    let bytes = write_track(0, &[], &[])?;

    let mut expected = Vec::new();
    // header body + CRC, metadata table, data table, all computed by the
    // codec itself elsewhere (see unit-test fixtures in header.rs/crc.rs);
    // here we only assert the trailing empty-table bytes the spec calls out.
    expected.extend_from_slice(&[0x00, 0x40, 0xBF]); // empty metadata table
    expected.extend_from_slice(&[0x00, 0x40, 0xBF]); // empty data table
    assert_eq!(&bytes[bytes.len() - 6..], &expected[..]);

    let reader = TrackReader::new(&bytes)?;
    assert_eq!(reader.file_version(), 1);
    assert!(reader.metadata().is_empty());
    assert_eq!(reader.section_count(), 0);
    Ok(())
}

#[test]
fn roundtrip_standard_section() -> Result<()> {
    let schema = Schema::new(vec![
        SchemaField::new("a", FieldType::I64)?,
        SchemaField::new("name", FieldType::String)?,
    ])?;
    let rows = vec![
        row(&[("a", Value::I64(0)), ("name", Value::String("RWGPS".into()))]),
        row(&[]), // entirely absent row
        row(&[("a", Value::I64(40))]),
    ];

    let metadata = vec![
        MetadataEntry::TrackType { kind: TrackType::Route, id: 7 },
        MetadataEntry::CreatedAt(1_700_000_000),
    ];
    let section = Section::standard(schema, rows);
    let bytes = write_track(3, &metadata, &[section])?;

    let reader = TrackReader::new(&bytes)?;
    assert_eq!(reader.creator_version(), 3);
    assert_eq!(reader.metadata(), metadata.as_slice());
    assert_eq!(reader.section_count(), 1);
    assert_eq!(reader.section_rows(0)?, 3);

    let decoded = reader.section_data(0, None, None)?;
    assert_eq!(decoded[0]["a"], Value::I64(0));
    assert_eq!(decoded[0]["name"], Value::String("RWGPS".into()));
    assert!(decoded[1].is_empty());
    assert_eq!(decoded[2]["a"], Value::I64(40));
    assert!(!decoded[2].contains_key("name"));
    Ok(())
}

#[test]
fn schema_trim_drops_all_absent_fields() -> Result<()> {
    let schema = Schema::new(vec![
        SchemaField::new("kept", FieldType::I64)?,
        SchemaField::new("never_used", FieldType::Bool)?,
    ])?;
    let rows = vec![row(&[("kept", Value::I64(1))])];
    let bytes = write_track(0, &[], &[Section::standard(schema, rows)])?;

    let reader = TrackReader::new(&bytes)?;
    let stored = reader.section_schema(0)?;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored.fields()[0].name.as_slice(), b"kept");
    Ok(())
}

#[test]
fn presence_identity_law() -> Result<()> {
    let schema = Schema::new(vec![SchemaField::new("a", FieldType::Bool)?])?;
    let rows = vec![
        row(&[("a", Value::Bool(true))]),
        row(&[]),
        row(&[("a", Value::Null)]),
    ];
    let bytes = write_track(0, &[], &[Section::standard(schema, rows)])?;

    let reader = TrackReader::new(&bytes)?;
    let decoded = reader.section_data(0, None, None)?;
    assert!(decoded[0].contains_key("a"));
    assert!(!decoded[1].contains_key("a"));
    assert!(!decoded[2].contains_key("a"));
    Ok(())
}

#[test]
fn encrypted_section_requires_exact_key() -> Result<()> {
    let schema = Schema::new(vec![SchemaField::new("a", FieldType::I64)?])?;
    let rows = vec![row(&[("a", Value::I64(42))])];
    let key = b"01234567890123456789012345678901";
    let section = Section::encrypted(schema, rows, key)?;
    let bytes = write_track(0, &[], &[section])?;

    let reader = TrackReader::new(&bytes)?;
    assert_matches!(reader.section_encoding(0)?, rwtf::SectionEncoding::Encrypted);

    let decoded = reader.section_data(0, Some(key), None)?;
    assert_eq!(decoded[0]["a"], Value::I64(42));

    let wrong_key = b"11111111111111111111111111111111";
    assert_matches!(reader.section_data(0, Some(wrong_key), None), Err(Error::DecryptFail));
    assert_matches!(reader.section_data(0, None, None), Err(Error::DecryptFail));
    Ok(())
}

#[test]
fn wrong_key_length_rejects_at_construction() -> Result<()> {
    let schema = Schema::new(vec![SchemaField::new("a", FieldType::I64)?])?;
    let result = Section::encrypted(schema, vec![], b"too-short");
    assert_matches!(result, Err(Error::OutOfRange(_)));
    Ok(())
}

#[test]
fn crc_sensitivity_flips_to_crc_mismatch() -> Result<()> {
    let schema = Schema::new(vec![SchemaField::new("a", FieldType::I64)?])?;
    let rows = vec![row(&[("a", Value::I64(1))])];
    let mut bytes = write_track(0, &[], &[Section::standard(schema, rows)])?;

    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    assert_matches!(TrackReader::new(&bytes), Err(Error::CrcMismatch { .. }));
    Ok(())
}

#[test]
fn truncated_file_is_rejected_not_a_panic() -> Result<()> {
    let bytes = write_track(0, &[], &[])?;
    assert_matches!(TrackReader::new(&bytes[..10]), Err(Error::TruncatedInput));
    Ok(())
}

#[test]
fn section_index_out_of_range() -> Result<()> {
    let bytes = write_track(0, &[], &[])?;
    let reader = TrackReader::new(&bytes)?;
    assert_matches!(reader.section_data(0, None, None), Err(Error::SectionIndex { index: 0, len: 0 }));
    Ok(())
}

#[test]
fn unknown_column_name_returns_none() -> Result<()> {
    let schema = Schema::new(vec![SchemaField::new("a", FieldType::I64)?])?;
    let rows = vec![row(&[("a", Value::I64(1))])];
    let bytes = write_track(0, &[], &[Section::standard(schema, rows)])?;

    let reader = TrackReader::new(&bytes)?;
    assert_eq!(reader.section_column(0, b"missing", None)?, None);
    let present = reader.section_column(0, b"a", None)?.unwrap();
    assert_eq!(present, vec![Some(Value::I64(1))]);
    Ok(())
}

#[test]
fn u64_column_roundtrips() -> Result<()> {
    let schema = Schema::new(vec![SchemaField::new("a", FieldType::U64)?])?;
    let rows = vec![
        row(&[("a", Value::U64(0))]),
        row(&[]),
        row(&[("a", Value::U64(u64::MAX))]),
    ];
    let bytes = write_track(0, &[], &[Section::standard(schema, rows)])?;

    let reader = TrackReader::new(&bytes)?;
    let decoded = reader.section_data(0, None, None)?;
    assert_eq!(decoded[0]["a"], Value::U64(0));
    assert!(!decoded[1].contains_key("a"));
    assert_eq!(decoded[2]["a"], Value::U64(u64::MAX));
    Ok(())
}

#[test]
fn f64_column_roundtrips_with_scale() -> Result<()> {
    let schema = Schema::new(vec![SchemaField::new_f64("a", 7)?])?;
    let rows = vec![
        row(&[("a", Value::F64(0.0003))]),
        row(&[]),
        row(&[("a", Value::F64(-27.2))]),
        row(&[("a", Value::F64(f64::NAN))]), // non-finite: dropped, not an error
    ];
    let bytes = write_track(0, &[], &[Section::standard(schema, rows)])?;

    let reader = TrackReader::new(&bytes)?;
    let decoded = reader.section_data(0, None, None)?;
    match decoded[0]["a"] {
        Value::F64(v) => assert!((v - 0.0003).abs() < 1e-9),
        ref other => panic!("expected F64, got {other:?}"),
    }
    assert!(!decoded[1].contains_key("a"));
    match decoded[2]["a"] {
        Value::F64(v) => assert!((v - (-27.2)).abs() < 1e-9),
        ref other => panic!("expected F64, got {other:?}"),
    }
    assert!(!decoded[3].contains_key("a"));
    Ok(())
}

#[test]
fn bool_array_column_roundtrips() -> Result<()> {
    let schema = Schema::new(vec![SchemaField::new("flags", FieldType::BoolArray)?])?;
    let rows = vec![
        row(&[("flags", Value::BoolArray(vec![true, false, true]))]),
        row(&[]),
        row(&[("flags", Value::BoolArray(vec![]))]),
    ];
    let bytes = write_track(0, &[], &[Section::standard(schema, rows)])?;

    let reader = TrackReader::new(&bytes)?;
    let decoded = reader.section_data(0, None, None)?;
    assert_eq!(decoded[0]["flags"], Value::BoolArray(vec![true, false, true]));
    assert!(!decoded[1].contains_key("flags"));
    assert_eq!(decoded[2]["flags"], Value::BoolArray(vec![]));
    Ok(())
}

#[test]
fn byte_array_column_roundtrips() -> Result<()> {
    let schema = Schema::new(vec![SchemaField::new("blob", FieldType::ByteArray)?])?;
    let rows = vec![
        row(&[("blob", Value::Bytes(vec![0xDE, 0xAD, 0xBE, 0xEF]))]),
        row(&[]),
        row(&[("blob", Value::Bytes(vec![]))]),
    ];
    let bytes = write_track(0, &[], &[Section::standard(schema, rows)])?;

    let reader = TrackReader::new(&bytes)?;
    let decoded = reader.section_data(0, None, None)?;
    assert_eq!(decoded[0]["blob"], Value::Bytes(vec![0xDE, 0xAD, 0xBE, 0xEF]));
    assert!(!decoded[1].contains_key("blob"));
    assert_eq!(decoded[2]["blob"], Value::Bytes(vec![]));
    Ok(())
}

#[test]
fn overflowing_value_is_silently_dropped_not_a_write_error() -> Result<()> {
    let schema = Schema::new(vec![SchemaField::new("a", FieldType::U64)?])?;
    let rows = vec![row(&[("a", Value::I64(-1))])]; // negative can't coerce to U64
    let bytes = write_track(0, &[], &[Section::standard(schema, rows)])?;

    let reader = TrackReader::new(&bytes)?;
    let decoded = reader.section_data(0, None, None)?;
    assert!(!decoded[0].contains_key("a"));
    Ok(())
}
