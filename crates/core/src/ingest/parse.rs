use crate::domain::severity::SeverityLevel;
use crate::ingest::error::ScrapeError;
use crate::ingest::types::{PublishedLevels, RawReport, RawSeriesEntry};
use crate::time::austin;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;

// Elements scanned for "Cedar: Very high" style summary lines.
const LEVEL_SCAN_SELECTOR: &str =
    "h1, h2, h3, h4, h5, h6, p, li, dt, dd, div, span, strong, b, em, label";

// Longer texts are containers, not a single summary line.
const MAX_LEVEL_TEXT_LEN: usize = 80;
const MAX_LEVEL_WORDS: usize = 3;
// "Mountain Cedar", "Ashe juniper cedar".
const MAX_NAME_QUALIFIERS: usize = 2;

const FULL_DATE_FORMATS: &[&str] = &[
    "%m/%d/%y",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%b %d, %Y",
    "%b %d %Y",
    "%b. %d, %Y",
    "%d %B %Y",
];

const YEARLESS_DATE_FORMATS: &[&str] = &["%m/%d", "%B %d", "%b %d", "%b. %d"];

const MISSING_MARKERS: &[&str] = &["-", "--", "—", "–", "n/a", "na", "none", "no data", "*"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Allergen {
    Cedar = 0,
    Elm = 1,
    Mold = 2,
}

impl Allergen {
    const ALL: [Allergen; 3] = [Allergen::Cedar, Allergen::Elm, Allergen::Mold];

    fn name(self) -> &'static str {
        match self {
            Allergen::Cedar => "cedar",
            Allergen::Elm => "elm",
            Allergen::Mold => "mold",
        }
    }
}

/// Parses the upstream report markup into per-allergen series.
///
/// Data tables are located by their header text (a date column plus allergen-named columns),
/// or, for one-allergen tables, by a caption/preceding heading naming the allergen. Rows whose
/// date or counts cannot be read are skipped and counted. Fails when no data table is found or
/// the cedar series comes out empty.
pub fn parse_report(html: &str, fetched_at: DateTime<Utc>) -> Result<RawReport, ScrapeError> {
    let document = Html::parse_document(html);
    let reference = austin::local_date(fetched_at);

    let table_sel = selector("table")?;
    let row_sel = selector("tr")?;
    let cell_sel = selector("th, td")?;
    let caption_sel = selector("caption")?;

    let mut series: [BTreeMap<NaiveDate, u32>; 3] = Default::default();
    let mut skipped_rows: usize = 0;
    let mut tables_used: usize = 0;

    for table in document.select(&table_sel) {
        let grid = TableGrid::read(table, &row_sel, &cell_sel, &caption_sel);
        let Some(layout) = grid.layout() else {
            continue;
        };
        tables_used += 1;

        for row in &grid.rows[layout.header_row + 1..] {
            match layout.read_row(row, reference) {
                RowOutcome::Parsed(date, counts) => {
                    for (allergen, count) in counts {
                        series[allergen as usize].entry(date).or_insert(count);
                    }
                }
                RowOutcome::Blank => {}
                RowOutcome::Skipped(reason) => {
                    skipped_rows += 1;
                    tracing::debug!(reason, row = ?row, "skipping report row");
                }
            }
        }
    }

    if tables_used == 0 {
        return Err(ScrapeError::parse(
            "table",
            "no table with a date column and a known allergen column",
        ));
    }

    let [cedar, elm, mold] = series.map(|m| {
        m.into_iter()
            .map(|(date, count)| RawSeriesEntry { date, count })
            .collect::<Vec<_>>()
    });

    let Some(report_date) = cedar.last().map(|e| e.date) else {
        return Err(ScrapeError::parse(
            "cedar",
            format!("no cedar rows could be parsed ({skipped_rows} rows skipped)"),
        ));
    };

    if skipped_rows > 0 {
        tracing::warn!(skipped_rows, tables_used, "report rows skipped during parse");
    }

    let levels = parse_levels(&document)?;

    Ok(RawReport {
        cedar,
        elm,
        mold,
        levels,
        report_date,
        fetched_at,
        skipped_rows,
    })
}

fn selector(css: &'static str) -> Result<Selector, ScrapeError> {
    Selector::parse(css).map_err(|e| ScrapeError::parse("selector", format!("{css}: {e}")))
}

struct TableGrid {
    /// Caption, naming attributes, and the preceding heading, used to name one-allergen tables.
    label: String,
    rows: Vec<Vec<String>>,
}

impl TableGrid {
    fn read(
        table: ElementRef<'_>,
        row_sel: &Selector,
        cell_sel: &Selector,
        caption_sel: &Selector,
    ) -> Self {
        let mut label = String::new();
        for attr in ["data-allergen", "aria-label", "summary", "title", "id"] {
            if let Some(v) = table.value().attr(attr) {
                label.push_str(v);
                label.push(' ');
            }
        }
        if let Some(caption) = table.select(caption_sel).next() {
            label.push_str(&element_text(caption));
            label.push(' ');
        }
        if let Some(prev) = table.prev_siblings().find_map(ElementRef::wrap) {
            if matches!(prev.value().name(), "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "p") {
                label.push_str(&element_text(prev));
            }
        }

        let rows = table
            .select(row_sel)
            .map(|tr| tr.select(cell_sel).map(element_text).collect::<Vec<_>>())
            .collect();

        Self {
            label: label.to_lowercase(),
            rows,
        }
    }

    fn layout(&self) -> Option<TableLayout> {
        for (idx, row) in self.rows.iter().enumerate() {
            let Some(date_col) = row.iter().position(|c| c.to_lowercase().contains("date")) else {
                continue;
            };

            let mut columns: Vec<(Allergen, usize)> = Allergen::ALL
                .into_iter()
                .filter_map(|a| {
                    row.iter()
                        .enumerate()
                        .position(|(i, c)| i != date_col && c.to_lowercase().contains(a.name()))
                        .map(|col| (a, col))
                })
                .collect();

            if columns.is_empty() {
                let allergen = Allergen::ALL
                    .into_iter()
                    .find(|a| self.label.contains(a.name()))?;
                let count_col = row
                    .iter()
                    .enumerate()
                    .find(|(i, c)| {
                        let lower = c.to_lowercase();
                        *i != date_col
                            && ["count", "grains", "pollen", "spores"]
                                .iter()
                                .any(|w| lower.contains(w))
                    })
                    .map(|(i, _)| i)
                    .or_else(|| (0..row.len()).find(|i| *i != date_col))?;
                columns.push((allergen, count_col));
            }

            return Some(TableLayout {
                header_row: idx,
                date_col,
                columns,
            });
        }
        None
    }
}

struct TableLayout {
    header_row: usize,
    date_col: usize,
    columns: Vec<(Allergen, usize)>,
}

enum RowOutcome {
    Parsed(NaiveDate, Vec<(Allergen, u32)>),
    Blank,
    Skipped(&'static str),
}

impl TableLayout {
    fn read_row(&self, row: &[String], reference: NaiveDate) -> RowOutcome {
        if row.iter().all(|c| c.is_empty()) {
            return RowOutcome::Blank;
        }
        let Some(date_text) = row.get(self.date_col) else {
            return RowOutcome::Skipped("missing date cell");
        };
        let Some(date) = parse_date(date_text, reference) else {
            return RowOutcome::Skipped("unparsable date");
        };

        let mut counts = Vec::with_capacity(self.columns.len());
        for (allergen, col) in &self.columns {
            match row.get(*col).map(|c| parse_count(c)) {
                Some(CountCell::Value(n)) => counts.push((*allergen, n)),
                Some(CountCell::Missing) | None => {}
                Some(CountCell::Invalid) => return RowOutcome::Skipped("non-numeric count"),
            }
        }
        RowOutcome::Parsed(date, counts)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum CountCell {
    Value(u32),
    Missing,
    Invalid,
}

fn parse_count(text: &str) -> CountCell {
    let t = text.trim();
    if t.is_empty() || MISSING_MARKERS.contains(&t.to_lowercase().as_str()) {
        return CountCell::Missing;
    }

    // "1,234 gr/m³" -> 1234
    let token = t.split_whitespace().next().unwrap_or(t);
    let digits: String = token.chars().filter(|c| *c != ',').collect();
    if let Ok(n) = digits.parse::<u32>() {
        return CountCell::Value(n);
    }
    match digits.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 && v <= f64::from(u32::MAX) => {
            CountCell::Value(v.round() as u32)
        }
        _ => CountCell::Invalid,
    }
}

/// Reads a report date. Dates without a year take the year of `reference`, rolled back one
/// year when that would land in the future (a January report listing December days).
fn parse_date(text: &str, reference: NaiveDate) -> Option<NaiveDate> {
    let cleaned = text.trim().trim_end_matches(['.', ':']);
    if cleaned.is_empty() {
        return None;
    }

    // Second candidate drops a leading weekday ("Mon 1/5", "Monday, January 5, 2026").
    let without_weekday = cleaned
        .split_once(' ')
        .map(|(_, rest)| rest.trim())
        .filter(|rest| !rest.is_empty());

    std::iter::once(cleaned)
        .chain(without_weekday)
        .find_map(|candidate| {
            parse_full_date(candidate).or_else(|| parse_yearless_date(candidate, reference))
        })
}

fn parse_full_date(text: &str) -> Option<NaiveDate> {
    // ISO dates, possibly with a time suffix.
    let iso_like = text.len() >= 10 && text.as_bytes()[..4].iter().all(u8::is_ascii_digit);
    if iso_like {
        if let Ok((date, _)) = NaiveDate::parse_and_remainder(text, "%Y-%m-%d") {
            return Some(date);
        }
    }
    FULL_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

fn parse_yearless_date(text: &str, reference: NaiveDate) -> Option<NaiveDate> {
    let with_year = format!("{text} {}", reference.year());
    let date = YEARLESS_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&with_year, &format!("{fmt} %Y")).ok())?;

    if date > reference + Duration::days(1) {
        date.with_year(date.year() - 1)
    } else {
        Some(date)
    }
}

#[derive(Default)]
struct LevelSlot {
    recognized: Option<String>,
    tentative: Option<String>,
}

fn parse_levels(document: &Html) -> Result<PublishedLevels, ScrapeError> {
    let scan = selector(LEVEL_SCAN_SELECTOR)?;
    let mut slots: [LevelSlot; 3] = Default::default();

    for element in document.select(&scan) {
        if inside_table(element) {
            continue;
        }
        let text = element_text(element);
        if text.is_empty() || text.len() > MAX_LEVEL_TEXT_LEN {
            continue;
        }

        for allergen in Allergen::ALL {
            let slot = &mut slots[allergen as usize];
            if slot.recognized.is_some() {
                continue;
            }
            let Some((label, separated)) = level_after_name(&text, allergen.name()) else {
                continue;
            };
            if SeverityLevel::from_published(&label).is_some() {
                slot.recognized = Some(label);
            } else if separated && slot.tentative.is_none() {
                slot.tentative = Some(label);
            }
        }
    }

    let [cedar, elm, mold] =
        slots.map(|s| s.recognized.or(s.tentative).unwrap_or_default());
    Ok(PublishedLevels { cedar, elm, mold })
}

/// For `"Cedar pollen: Very high (1,250)"` and name `cedar` returns `("Very high", true)`.
/// The name may carry up to two qualifier words in front ("Mountain Cedar: High").
/// The flag tells whether an explicit separator followed the name.
fn level_after_name(text: &str, name: &str) -> Option<(String, bool)> {
    // ASCII lowercasing keeps byte offsets aligned with `text`.
    let lower = text.to_ascii_lowercase();
    lower.match_indices(name).find_map(|(start, _)| {
        let before = &text[..start];
        if before.chars().next_back().is_some_and(char::is_alphanumeric) {
            return None;
        }
        let qualifiers: Vec<&str> = before.split_whitespace().collect();
        if qualifiers.len() > MAX_NAME_QUALIFIERS
            || !qualifiers.iter().all(|w| w.chars().all(char::is_alphabetic))
        {
            return None;
        }
        label_after(&text[start + name.len()..])
    })
}

fn label_after(tail: &str) -> Option<(String, bool)> {
    if tail.chars().next().is_some_and(char::is_alphanumeric) {
        return None;
    }
    let mut rest = tail.trim_start();

    'filler: loop {
        for word in ["pollen", "levels", "level", "count"] {
            let Some(prefix) = rest.get(..word.len()) else {
                continue;
            };
            let boundary = rest[word.len()..]
                .chars()
                .next()
                .map_or(true, |c| !c.is_alphanumeric());
            if prefix.eq_ignore_ascii_case(word) && boundary {
                rest = rest[word.len()..].trim_start();
                continue 'filler;
            }
        }
        break;
    }

    let after_sep = rest.trim_start_matches([':', '-', '–', '—', '|', '=']);
    let separated = after_sep.len() != rest.len();
    let value = after_sep
        .split(['(', ',', '.', ';', '|'])
        .next()
        .unwrap_or("")
        .trim();

    let words = value.split_whitespace().count();
    if words == 0 || words > MAX_LEVEL_WORDS || !value.chars().any(char::is_alphabetic) {
        return None;
    }
    Some((value.to_string(), separated))
}

fn inside_table(element: ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| a.value().name() == "table")
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn fetched() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 8, 15, 30, 0).unwrap()
    }

    const COMBINED_REPORT: &str = r#"
        <html><body>
          <div class="allergy-summary">
            <h2>Today's allergy report</h2>
            <ul>
              <li><strong>Cedar:</strong> Very high</li>
              <li><strong>Elm:</strong> Low</li>
              <li><strong>Mold:</strong> Medium</li>
            </ul>
          </div>
          <table class="pollen-history">
            <thead><tr><th>Date</th><th>Mountain Cedar</th><th>Elm</th><th>Mold</th></tr></thead>
            <tbody>
              <tr><td>01/07/2026</td><td>1,250</td><td>12</td><td>340</td></tr>
              <tr><td>01/05/2026</td><td>820</td><td>8</td><td>410</td></tr>
              <tr><td>01/06/2026</td><td>n/a</td><td>10</td><td>380</td></tr>
              <tr><td>Jan 8, 2026</td><td>2,400</td><td>&mdash;</td><td>290</td></tr>
            </tbody>
          </table>
        </body></html>"#;

    #[test]
    fn parses_combined_table_sorted_by_date() {
        let report = parse_report(COMBINED_REPORT, fetched()).unwrap();

        let cedar: Vec<_> = report.cedar.iter().map(|e| (e.date, e.count)).collect();
        assert_eq!(
            cedar,
            vec![
                (d(2026, 1, 5), 820),
                (d(2026, 1, 7), 1250),
                (d(2026, 1, 8), 2400)
            ]
        );
        assert_eq!(report.elm.len(), 3);
        assert_eq!(report.mold.len(), 4);
        assert_eq!(report.report_date, d(2026, 1, 8));
        assert_eq!(report.fetched_at, fetched());
        assert_eq!(report.skipped_rows, 0);
    }

    #[test]
    fn reads_published_levels_from_summary() {
        let report = parse_report(COMBINED_REPORT, fetched()).unwrap();
        assert_eq!(report.levels.cedar, "Very high");
        assert_eq!(report.levels.elm, "Low");
        assert_eq!(report.levels.mold, "Medium");
    }

    #[test]
    fn malformed_rows_are_skipped_and_counted() {
        let html = r#"
            <table>
              <tr><th>Date</th><th>Cedar</th></tr>
              <tr><td>2026-01-06</td><td>300</td></tr>
              <tr><td>2026-01-07</td><td>heavy</td></tr>
              <tr><td>sometime</td><td>500</td></tr>
              <tr><td colspan="2">Counts provided by the Allergy &amp; Asthma Center</td></tr>
              <tr><td></td><td></td></tr>
              <tr><td>2026-01-08</td><td>650</td></tr>
            </table>"#;

        let report = parse_report(html, fetched()).unwrap();
        assert_eq!(report.cedar.len(), 2);
        assert_eq!(report.skipped_rows, 3);
        assert_eq!(report.levels, PublishedLevels::default());
    }

    #[test]
    fn per_allergen_tables_are_named_by_heading_or_caption() {
        let html = r#"
            <section>
              <h3>Mountain Cedar</h3>
              <table>
                <tr><th>Date</th><th>Grains per cubic meter</th></tr>
                <tr><td>Mon 1/5</td><td>300</td></tr>
                <tr><td>Tue 1/6</td><td>450</td></tr>
              </table>
              <table data-allergen="mold">
                <caption>Mold spores</caption>
                <tr><th>Date</th><th>Count</th></tr>
                <tr><td>1/6</td><td>2,100</td></tr>
              </table>
              <p>Cedar pollen level: High</p>
            </section>"#;

        let report = parse_report(html, fetched()).unwrap();
        assert_eq!(
            report.cedar,
            vec![
                RawSeriesEntry { date: d(2026, 1, 5), count: 300 },
                RawSeriesEntry { date: d(2026, 1, 6), count: 450 },
            ]
        );
        assert_eq!(report.mold.len(), 1);
        assert!(report.elm.is_empty());
        assert_eq!(report.levels.cedar, "High");
    }

    #[test]
    fn missing_table_is_a_parse_error() {
        let err = parse_report("<html><body><p>Cedar: High</p></body></html>", fetched())
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Parse { stage: "table", .. }));
    }

    #[test]
    fn empty_cedar_series_is_a_parse_error() {
        let html = r#"
            <table>
              <tr><th>Date</th><th>Cedar</th><th>Elm</th></tr>
              <tr><td>2026-01-07</td><td>--</td><td>12</td></tr>
            </table>"#;
        let err = parse_report(html, fetched()).unwrap_err();
        assert!(matches!(err, ScrapeError::Parse { stage: "cedar", .. }));
    }

    #[test]
    fn yearless_dates_roll_back_across_new_year() {
        let reference = d(2026, 1, 3);
        assert_eq!(parse_date("12/30", reference), Some(d(2025, 12, 30)));
        assert_eq!(parse_date("1/2", reference), Some(d(2026, 1, 2)));
        assert_eq!(parse_date("January 3", reference), Some(d(2026, 1, 3)));
    }

    #[test]
    fn full_dates_in_common_formats() {
        let reference = d(2026, 1, 8);
        assert_eq!(parse_date("2026-01-07", reference), Some(d(2026, 1, 7)));
        assert_eq!(parse_date("2026-01-07T06:00:00Z", reference), Some(d(2026, 1, 7)));
        assert_eq!(parse_date("1/7/26", reference), Some(d(2026, 1, 7)));
        assert_eq!(parse_date("01/07/2026", reference), Some(d(2026, 1, 7)));
        assert_eq!(parse_date("Wednesday, January 7, 2026", reference), Some(d(2026, 1, 7)));
        assert_eq!(parse_date("Jan. 7, 2026", reference), Some(d(2026, 1, 7)));
        assert_eq!(parse_date("soon", reference), None);
    }

    #[test]
    fn count_cells() {
        assert_eq!(parse_count("1,234"), CountCell::Value(1234));
        assert_eq!(parse_count("1,234 gr/m³"), CountCell::Value(1234));
        assert_eq!(parse_count("12.6"), CountCell::Value(13));
        assert_eq!(parse_count(" — "), CountCell::Missing);
        assert_eq!(parse_count("N/A"), CountCell::Missing);
        assert_eq!(parse_count("-5"), CountCell::Invalid);
        assert_eq!(parse_count("high"), CountCell::Invalid);
    }

    #[test]
    fn level_labels_need_a_name_prefix() {
        assert_eq!(
            level_after_name("Cedar pollen: Very high (1,250 gr/m3)", "cedar"),
            Some(("Very high".to_string(), true))
        );
        assert_eq!(
            level_after_name("Elm - Low", "elm"),
            Some(("Low".to_string(), true))
        );
        assert_eq!(
            level_after_name("Cedar fever season begins", "cedar"),
            Some(("fever season begins".to_string(), false))
        );
        assert_eq!(level_after_name("Cedar: 1,250", "cedar"), None);
        assert_eq!(level_after_name("Elmwood Park", "elm"), None);
    }

    #[test]
    fn level_labels_allow_qualified_names() {
        assert_eq!(
            level_after_name("Mountain Cedar: Very high", "cedar"),
            Some(("Very high".to_string(), true))
        );
        assert_eq!(
            level_after_name("Ashe juniper cedar - Severe", "cedar"),
            Some(("Severe".to_string(), true))
        );
        assert_eq!(level_after_name("Today's allergy report Cedar: High", "cedar"), None);
        assert_eq!(level_after_name("Red Elmwood: Low", "elm"), None);
    }

    #[test]
    fn qualified_summary_label_is_published_level() {
        let html = r#"
            <ul><li>Mountain Cedar: Very high</li></ul>
            <table>
              <tr><th>Date</th><th>Mountain Cedar</th></tr>
              <tr><td>01/07/2026</td><td>1,250</td></tr>
            </table>"#;

        let report = parse_report(html, fetched()).unwrap();
        assert_eq!(report.levels.cedar, "Very high");
        assert_eq!(report.cedar.last().map(|e| e.count), Some(1250));
    }
}
