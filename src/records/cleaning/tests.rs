use super::*;
use crate::records::read_table;
use chrono::{Datelike, Timelike};

const HEADER: &str = "chunk_text,source_url,tags,fighter_a,fighter_b,outcome,method,stats_json,extras_json,published_date,accessed_date\n";

fn table_from(rows: &str) -> Table {
    read_table(format!("{HEADER}{rows}").as_bytes()).expect("should read table")
}

#[test]
fn extracts_fields_from_json_columns() {
    let table = table_from(
        r#""Dhant wins by TKO",https://example.com/mfn17,mfn;title,Rabindra Dhant,Chungreng Koren,Win,KO/TKO,"{""fighter_a_record_at_fight"": ""8-1-0"", ""fighter_b_record_at_fight"": ""7-1-0""}","{""fighter_a_age_at_fight_years"": 26, ""fighter_b_height_cm"": ""173""}",2025-08-02,2025-08-10
"#,
    );

    let records = clean_records(&table);
    assert_eq!(records.len(), 1);

    let record = &records[0];
    assert_eq!(record.chunk_text.as_deref(), Some("Dhant wins by TKO"));
    assert_eq!(record.fighter_a_record_at_fight.as_deref(), Some("8-1-0"));
    assert_eq!(record.fighter_b_record_at_fight.as_deref(), Some("7-1-0"));
    assert_eq!(record.fighter_a_age, Some(26.0));
    assert_eq!(record.fighter_b_age, None);
    assert_eq!(record.fighter_a_height_cm, None);
    assert_eq!(record.fighter_b_height_cm, Some(173.0));
    assert_eq!(record.published_day().as_deref(), Some("2025-08-02"));
    assert!(record.accessed_date.is_some());
}

#[test]
fn malformed_json_and_dates_degrade() {
    let table = table_from(
        "Some text,https://example.com,,X,Y,Loss,Decision,{broken,,not a date,\n",
    );

    let record = &clean_records(&table)[0];
    assert!(record.stats.is_empty());
    assert!(record.extras.is_empty());
    assert_eq!(record.fighter_a_record_at_fight, None);
    assert_eq!(record.fighter_a_age, None);
    assert_eq!(record.published_date, None);
    assert_eq!(record.accessed_date, None);
    assert_eq!(record.tags, None);
}

#[test]
fn missing_columns_are_absent_not_errors() {
    let table = read_table("chunk_text\nonly text\n".as_bytes()).expect("should read table");
    let record = &clean_records(&table)[0];
    assert_eq!(record.chunk_text.as_deref(), Some("only text"));
    assert_eq!(record.source_url, None);
    assert!(record.stats.is_empty());
}

#[test]
fn parse_date_formats() {
    let date = parse_date(Some("2025-08-02T14:30:00Z")).expect("rfc3339");
    assert_eq!((date.year(), date.month(), date.day()), (2025, 8, 2));
    assert_eq!(date.hour(), 14);

    let date = parse_date(Some("2025-08-02 09:15:00")).expect("datetime");
    assert_eq!(date.minute(), 15);

    let date = parse_date(Some("August 2, 2025")).expect("long month");
    assert_eq!((date.month(), date.day()), (8, 2));

    let date = parse_date(Some("30/11/1998")).expect("day first");
    assert_eq!((date.year(), date.month(), date.day()), (1998, 11, 30));

    assert_eq!(parse_date(Some("")), None);
    assert_eq!(parse_date(Some("yesterday")), None);
    assert_eq!(parse_date(Some("2025-13-45")), None);
    assert_eq!(parse_date(None), None);
}

#[test]
fn field_helpers_ignore_non_scalars() {
    let map = crate::records::safe_parse(Some(
        r#"{"nested": {"a": 1}, "list": [1], "null": null, "blank": " ", "num": 5, "text_num": "abc"}"#,
    ));
    assert_eq!(text_field(&map, "nested"), None);
    assert_eq!(text_field(&map, "list"), None);
    assert_eq!(text_field(&map, "null"), None);
    assert_eq!(text_field(&map, "blank"), None);
    assert_eq!(text_field(&map, "num").as_deref(), Some("5"));
    assert_eq!(numeric_field(&map, "text_num"), None);
    assert_eq!(numeric_field(&map, "num"), Some(5.0));
    assert_eq!(numeric_field(&map, "absent"), None);
}

#[test]
fn normalize_dates_rewrites_canonically() {
    let mut table = table_from(
        "a,,,,,,,,,2025-08-02,\"August 10, 2025\"\nb,,,,,,,,,not a date,2025-08-10 09:15\n",
    );
    normalize_dates(&mut table);

    let dates: Vec<_> = table
        .records()
        .map(|record| (record.get("published_date"), record.get("accessed_date")))
        .collect();
    assert_eq!(
        dates,
        [
            (Some("2025-08-02 00:00:00"), Some("2025-08-10 00:00:00")),
            (None, Some("2025-08-10 09:15:00")),
        ]
    );

    let records = clean_records(&table);
    assert_eq!(records[0].published_day().as_deref(), Some("2025-08-02"));
    assert_eq!(records[1].accessed_date.map(|d| d.hour()), Some(9));
}
