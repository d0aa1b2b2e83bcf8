//! Tests for the processing engine
//!
//! Builds small AERMOD output files in memory and runs them through
//! [`PostProcessor`](super::PostProcessor).

pub mod basic_processing;

use chrono::{NaiveDate, NaiveDateTime, Timelike};

/// Six documentation lines plus the title and separator lines of a section
pub fn section_header(result_type: &str, result_form: &str, group: &str, receptors: usize) -> String {
    [
        "* AERMOD ( 19191):  test run".to_string(),
        "* MODELING OPTIONS USED:  RegDFAULT CONC ELEV".to_string(),
        "*         MODEL OPTIONS".to_string(),
        format!(
            "*         POST/PLOT FILE OF {} {} VALUES FOR SOURCE GROUP: {}",
            result_form, result_type, group
        ),
        format!("*         FOR A TOTAL OF {:5} RECEPTORS.", receptors),
        "*         FORMAT: (3(1X,F13.5),3(1X,F8.2),3X,A5,2X,A8,2X,I8.8,2X,A8)".to_string(),
        "*         X             Y      AVERAGE CONC    ZELEV    ZHILL    ZFLAG    AVE     GRP       DATE     NET ID".to_string(),
        "* ____________  ____________  ____________   ______   ______   ______  ______  ________  ________  ________".to_string(),
    ]
    .join("\n")
        + "\n"
}

/// One `post` row; `stamp` is the on-disk YYMMDDHH text
pub fn post_row(x: f64, y: f64, conc: f64, zflag: f64, stamp: &str) -> String {
    format!(
        " {:13.5} {:13.5} {:13.5} {:8.2} {:8.2} {:8.2}   {:<5}  {:<8}  {:>8}  {:<8}\n",
        x, y, conc, 0.0, 0.0, zflag, "1-HR", "ALL", stamp, "NET1"
    )
}

/// One `grf` row
pub fn grf_row(x: f64, y: f64, conc: f64, zflag: f64) -> String {
    format!(
        " {:13.5} {:13.5} {:13.5} {:8.2} {:8.2} {:8.2}   {:<5}  {:<8} {:>9}  {:<8}\n",
        x, y, conc, 0.0, 0.0, zflag, "1-HR", "ALL", 5, "NET1"
    )
}

/// On-disk stamp for a clock time (hours are written 01-24)
pub fn stamp_for(time: NaiveDateTime) -> String {
    format!("{}{:02}", time.format("%y%m%d"), time.hour() + 1)
}

pub fn at(year: i32, month: u32, day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

/// An hourly `post` section with one block per entry of `hours`, the
/// concentration of receptor `r` in block `h` given by `conc(h, r)`
pub fn hourly_section(
    receptors: &[(f64, f64, f64)],
    hours: &[NaiveDateTime],
    conc: impl Fn(usize, usize) -> f64,
) -> String {
    let mut text = section_header("1-HR", "CONCURRENT", "ALL", receptors.len());
    for (h, &time) in hours.iter().enumerate() {
        let stamp = stamp_for(time);
        for (r, &(x, y, z)) in receptors.iter().enumerate() {
            text.push_str(&post_row(x, y, conc(h, r), z, &stamp));
        }
    }
    text
}

#[test]
fn test_fixture_rows_match_schema_width() {
    use crate::schema::Schema;
    let post = post_row(1.0, 2.0, 3.0, 0.0, "19010101");
    let grf = grf_row(1.0, 2.0, 3.0, 0.0);
    assert_eq!(post.trim_end_matches('\n').len(), Schema::post().line_width());
    assert_eq!(grf.trim_end_matches('\n').len(), Schema::grf().line_width());
}

#[test]
fn test_stamp_for_uses_hour_24() {
    assert_eq!(stamp_for(at(2019, 1, 1, 0)), "19010101");
    assert_eq!(stamp_for(at(2019, 1, 1, 23)), "19010124");
    assert_eq!(stamp_for(at(2019, 12, 31, 23)), "19123124");
}
