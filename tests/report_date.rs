use labtab::date::{
    date_from_file_name, date_from_text, detect_date, pivot_two_digit_year, DateSource,
};
use time::macros::date;

#[test]
fn day_first_date_in_text() {
    let (d, src) = detect_date("Ημερομηνία: 05/03/2021\nPLT 245", "whatever.pdf");
    assert_eq!(d, Some(date!(2021 - 03 - 05)));
    assert_eq!(src, DateSource::Text);
}

#[test]
fn two_digit_year() {
    assert_eq!(date_from_text("Date 5/3/21"), Some(date!(2021 - 03 - 05)));
    assert_eq!(date_from_text("05/03/99"), Some(date!(1999 - 03 - 05)));
}

#[test]
fn two_digit_years_stay_within_fifty_years() {
    assert_eq!(pivot_two_digit_year(21, 2026), 2021);
    assert_eq!(pivot_two_digit_year(75, 2026), 2075);
    assert_eq!(pivot_two_digit_year(76, 2026), 1976);
    assert_eq!(pivot_two_digit_year(99, 2026), 1999);
    assert_eq!(pivot_two_digit_year(10, 2080), 2110);
    assert_eq!(pivot_two_digit_year(30, 2080), 2030);
    assert_eq!(pivot_two_digit_year(29, 2080), 2129);
}

#[test]
fn month_first_when_day_first_is_impossible() {
    assert_eq!(date_from_text("12/25/2021"), Some(date!(2021 - 12 - 25)));
    assert_eq!(date_from_text("13/25/2021"), None);
}

#[test]
fn file_name_yymmdd() {
    assert_eq!(date_from_file_name("labs_210305.pdf"), Some(date!(2021 - 03 - 05)));
    assert_eq!(date_from_file_name("labs_20210305.pdf"), None);
    assert_eq!(date_from_file_name("labs.pdf"), None);
}

#[test]
fn invalid_text_date_falls_back_to_file_name() {
    let (d, src) = detect_date("31/02/2021", "cbc_210305.pdf");
    assert_eq!(d, Some(date!(2021 - 03 - 05)));
    assert_eq!(src, DateSource::FileName);
}

#[test]
fn no_date_anywhere() {
    assert_eq!(detect_date("PLT 245", "cbc.pdf"), (None, DateSource::None));
}
