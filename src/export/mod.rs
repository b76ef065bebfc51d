mod csv;
mod filter;
mod listing;
mod source;

use std::collections::BTreeSet;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::{Error, Result};

pub use self::csv::{write_pairs, HEADER};
pub use filter::{parse_date, ExportFilter};
pub use listing::{list_values, Dimension, ValueSource, DEFAULT_LISTING_LIMIT};
pub use source::{ExportStats, PairSource, PgEventSource, UaIpPair};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    pub rows_written: usize,
}

/// Pairs for `filter`, deduplicated and sorted by byte order independent of the
/// database collation
async fn fetch_pairs<S>(source: &mut S, filter: &ExportFilter) -> Result<BTreeSet<UaIpPair>>
where
    S: PairSource + ?Sized,
{
    Ok(source.distinct_pairs(filter).await?.into_iter().collect())
}

/// Fetch the distinct pairs for `filter` and write them as CSV
pub async fn export_pairs<S, W>(source: &mut S, filter: &ExportFilter, writer: &mut W) -> Result<ExportSummary>
where
    S: PairSource + ?Sized,
    W: Write,
{
    let pairs = fetch_pairs(source, filter).await?;
    let rows_written = write_pairs(writer, &pairs)?;
    tracing::info!(rows = rows_written, "exported pairs");
    Ok(ExportSummary { rows_written })
}

/// [`export_pairs`] into `path`, replacing it only once every row has been written.
///
/// The query runs before the file is touched. Rows go to a temporary file in the
/// same directory which is then renamed over `path`, so a failed export leaves any
/// previous file intact.
pub async fn export_to_file<S>(source: &mut S, filter: &ExportFilter, path: &Path) -> Result<ExportSummary>
where
    S: PairSource + ?Sized,
{
    let pairs = fetch_pairs(source, filter).await?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    let rows_written = {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        write_pairs(&mut writer, &pairs)?
    };
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;

    tracing::info!(rows = rows_written, path = %path.display(), "exported pairs");
    Ok(ExportSummary { rows_written })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;

    #[derive(Clone)]
    struct Event {
        date: &'static str,
        event_type: &'static str,
        advertiser: &'static str,
        external_user_id: Option<&'static str>,
        converted_amount: Option<f64>,
        user_agent: &'static str,
        ip_address: &'static str,
    }

    fn event(date: &'static str, user_agent: &'static str, ip_address: &'static str) -> Event {
        Event {
            date,
            event_type: "ftd",
            advertiser: "2",
            external_user_id: Some("u1"),
            converted_amount: None,
            user_agent,
            ip_address,
        }
    }

    /// Applies the export predicate to in-memory rows without DISTINCT or ORDER BY
    struct MemorySource {
        events: Vec<Event>,
    }

    impl MemorySource {
        fn selected<'a>(&'a self, filter: &'a ExportFilter) -> impl Iterator<Item = &'a Event> + 'a {
            self.events.iter().filter(move |e| {
                let date = parse_date(e.date).unwrap();
                // NULL amounts never satisfy a comparison
                let above_min = filter
                    .min_deposit()
                    .map_or(true, |min| e.converted_amount.is_some_and(|a| a >= min));
                let below_max = filter
                    .max_deposit()
                    .map_or(true, |max| e.converted_amount.is_some_and(|a| a <= max));
                e.external_user_id.is_some()
                    && date >= filter.start()
                    && date < filter.end_exclusive()
                    && filter.event_types().iter().any(|t| t == e.event_type)
                    && filter.advertisers().iter().any(|a| a == e.advertiser)
                    && above_min
                    && below_max
                    && !e.user_agent.is_empty()
                    && !e.ip_address.is_empty()
            })
        }
    }

    #[async_trait]
    impl PairSource for MemorySource {
        async fn distinct_pairs(&mut self, filter: &ExportFilter) -> Result<Vec<UaIpPair>> {
            Ok(self
                .selected(filter)
                .map(|e| UaIpPair::new(e.user_agent, e.ip_address))
                .collect())
        }

        async fn stats(&mut self, filter: &ExportFilter) -> Result<ExportStats> {
            let selected: Vec<_> = self.selected(filter).collect();
            let users: BTreeSet<_> = selected.iter().map(|e| e.external_user_id).collect();
            let pairs: BTreeSet<_> = selected.iter().map(|e| (e.user_agent, e.ip_address)).collect();
            Ok(ExportStats {
                total_events: selected.len() as i64,
                unique_users: users.len() as i64,
                unique_pairs: pairs.len() as i64,
            })
        }
    }

    /// Source whose queries always fail, as with a dropped connection
    struct BrokenSource;

    #[async_trait]
    impl PairSource for BrokenSource {
        async fn distinct_pairs(&mut self, _filter: &ExportFilter) -> Result<Vec<UaIpPair>> {
            Err(Error::Io(std::io::Error::other("connection reset")))
        }

        async fn stats(&mut self, _filter: &ExportFilter) -> Result<ExportStats> {
            Err(Error::Io(std::io::Error::other("connection reset")))
        }
    }

    fn window() -> ExportFilter {
        ExportFilter::new(
            NaiveDate::from_ymd_opt(2026, 1, 9).unwrap(),
            NaiveDate::from_ymd_opt(2026, 2, 9).unwrap(),
            ["ftd"],
            ["2"],
        )
        .unwrap()
    }

    async fn export_to_string<S: PairSource>(source: &mut S, filter: &ExportFilter) -> String {
        let mut out = Vec::new();
        export_pairs(source, filter, &mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn test_duplicates_written_once_and_sorted() {
        let mut source = MemorySource {
            events: vec![
                event("2026-01-20", "Safari", "10.0.0.9"),
                event("2026-01-10", "Chrome", "10.0.0.2"),
                event("2026-01-11", "Safari", "10.0.0.9"),
                event("2026-01-12", "Chrome", "10.0.0.1"),
                event("2026-01-13", "Chrome", "10.0.0.2"),
            ],
        };
        let mut out = Vec::new();

        let summary = export_pairs(&mut source, &window(), &mut out).await.unwrap();

        assert_eq!(summary.rows_written, 3);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "user_agent,ip_address\r\n\
             Chrome,10.0.0.1\r\n\
             Chrome,10.0.0.2\r\n\
             Safari,10.0.0.9\r\n"
        );
    }

    #[tokio::test]
    async fn test_window_end_day_is_inclusive() {
        let mut source = MemorySource {
            events: vec![
                event("2026-01-08", "Before", "10.0.0.1"),
                event("2026-01-09", "First", "10.0.0.1"),
                event("2026-02-09", "Last", "10.0.0.1"),
                event("2026-02-10", "After", "10.0.0.1"),
            ],
        };

        let text = export_to_string(&mut source, &window()).await;

        assert!(text.contains("First,"));
        assert!(text.contains("Last,"));
        assert!(!text.contains("Before,"));
        assert!(!text.contains("After,"));
    }

    #[tokio::test]
    async fn test_multiple_event_types_and_advertisers() {
        let mut source = MemorySource {
            events: vec![
                event("2026-01-10", "FtdCrore", "10.0.0.1"),
                Event {
                    event_type: "deposit",
                    advertiser: "4rabet",
                    ..event("2026-01-10", "Deposit4rabet", "10.0.0.2")
                },
                Event {
                    event_type: "regfinished",
                    ..event("2026-01-10", "Registration", "10.0.0.3")
                },
            ],
        };
        let filter = ExportFilter::new(
            window().start(),
            window().end(),
            ["ftd", "deposit"],
            ["2", "4rabet"],
        )
        .unwrap();

        let text = export_to_string(&mut source, &filter).await;

        assert!(text.contains("FtdCrore,"));
        assert!(text.contains("Deposit4rabet,"));
        assert!(!text.contains("Registration,"));
    }

    #[tokio::test]
    async fn test_deposit_range_excludes_out_of_range_and_missing_amounts() {
        let mut source = MemorySource {
            events: vec![
                Event {
                    converted_amount: Some(5.0),
                    ..event("2026-01-10", "Small", "10.0.0.1")
                },
                Event {
                    converted_amount: Some(25.0),
                    ..event("2026-01-10", "Medium", "10.0.0.2")
                },
                Event {
                    converted_amount: Some(500.0),
                    ..event("2026-01-10", "Large", "10.0.0.3")
                },
                event("2026-01-10", "Unknown", "10.0.0.4"),
            ],
        };
        let filter = window().with_deposit_range(Some(10.0), Some(100.0)).unwrap();

        let text = export_to_string(&mut source, &filter).await;

        assert_eq!(text, "user_agent,ip_address\r\nMedium,10.0.0.2\r\n");
    }

    #[tokio::test]
    async fn test_stats_over_window() {
        let mut source = MemorySource {
            events: vec![
                event("2026-01-10", "Chrome", "10.0.0.2"),
                event("2026-01-13", "Chrome", "10.0.0.2"),
                Event {
                    external_user_id: Some("u2"),
                    ..event("2026-01-14", "Safari", "10.0.0.9")
                },
                Event {
                    external_user_id: None,
                    ..event("2026-01-14", "Edge", "10.0.0.3")
                },
                Event {
                    advertiser: "7",
                    ..event("2026-01-14", "Edge", "10.0.0.4")
                },
            ],
        };

        let stats = source.stats(&window()).await.unwrap();

        assert_eq!(
            stats,
            ExportStats {
                total_events: 3,
                unique_users: 2,
                unique_pairs: 2,
            }
        );
    }

    #[tokio::test]
    async fn test_export_to_file_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pairs.csv");
        std::fs::write(&path, "stale contents that are longer than the export\n").unwrap();
        let mut source = MemorySource {
            events: vec![event("2026-01-10", "curl/8.0", "10.0.0.1")],
        };

        let summary = export_to_file(&mut source, &window(), &path).await.unwrap();

        assert_eq!(summary.rows_written, 1);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "user_agent,ip_address\r\ncurl/8.0,10.0.0.1\r\n"
        );
    }

    #[tokio::test]
    async fn test_failed_query_keeps_previous_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pairs.csv");
        let previous = "user_agent,ip_address\r\nprevious,export\r\n";
        std::fs::write(&path, previous).unwrap();

        let result = export_to_file(&mut BrokenSource, &window(), &path).await;

        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), previous);
        let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_query_creates_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pairs.csv");

        assert!(export_to_file(&mut BrokenSource, &window(), &path).await.is_err());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_export_to_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("pairs.csv");
        let mut source = MemorySource { events: Vec::new() };

        let err = export_to_file(&mut source, &window(), &path).await.unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
