//! CSV output writer
//!
//! Nested fields are flattened: trends become `trend_*` columns, gender shares become
//! `male`/`female`, and the monthly history is left out.

use csv::Writer;
use serde::Serialize;
use std::io::Write;
use tracing::{debug, info};

use super::{OutputError, OutputResult, OutputWriter, RecordsWriter};
use crate::transform::{DomainKeyword, KeywordOverview, KeywordSuggestion};

/// Flush every this many rows
const FLUSH_EVERY: u64 = 1000;

/// Records with a flat CSV representation
pub trait ToCsvRow {
    /// Row type; its field names become the header
    type Row: Serialize;

    /// Flatten one record
    fn to_row(&self) -> Self::Row;
}

/// CSV row for a keyword suggestion
#[derive(Debug, Serialize)]
pub struct SuggestionRow {
    id: usize,
    keyword: String,
    location_code: u32,
    language_code: String,
    search_volume: u64,
    cpc: f64,
    ppc: f64,
    ppc_level: String,
    low_top_page_bid: Option<f64>,
    high_top_page_bid: Option<f64>,
    keyword_difficulty: Option<u32>,
    search_intent: Option<String>,
    trend_monthly: i64,
    trend_quarterly: i64,
    trend_yearly: i64,
    trend_direction: String,
    seasonality_score: f64,
    growth_rate: i64,
    avg_backlinks: Option<f64>,
    avg_referring_domains: Option<f64>,
}

impl ToCsvRow for KeywordSuggestion {
    type Row = SuggestionRow;

    fn to_row(&self) -> SuggestionRow {
        SuggestionRow {
            id: self.id,
            keyword: self.keyword.clone(),
            location_code: self.location_code,
            language_code: self.language_code.clone(),
            search_volume: self.search_volume,
            cpc: self.cpc,
            ppc: self.ppc,
            ppc_level: self.ppc_level.clone(),
            low_top_page_bid: self.low_top_page_bid,
            high_top_page_bid: self.high_top_page_bid,
            keyword_difficulty: self.keyword_difficulty,
            search_intent: self.search_intent.clone(),
            trend_monthly: self.search_volume_trend.monthly,
            trend_quarterly: self.search_volume_trend.quarterly,
            trend_yearly: self.search_volume_trend.yearly,
            trend_direction: self.trend_analysis.direction.to_string(),
            seasonality_score: self.trend_analysis.seasonality_score,
            growth_rate: self.trend_analysis.growth_rate,
            avg_backlinks: self.avg_backlinks_data.map(|b| b.backlinks),
            avg_referring_domains: self.avg_backlinks_data.map(|b| b.referring_domains),
        }
    }
}

/// CSV row for a keyword overview
#[derive(Debug, Serialize)]
pub struct OverviewRow {
    keyword: String,
    location_code: u32,
    language_code: String,
    search_volume: u64,
    cpc: f64,
    ppc: f64,
    ppc_level: String,
    keyword_difficulty: Option<u32>,
    search_intent: Option<String>,
    trend_monthly: i64,
    trend_quarterly: i64,
    trend_yearly: i64,
    trend_direction: String,
    seasonality_score: f64,
    male: Option<f64>,
    female: Option<f64>,
}

impl ToCsvRow for KeywordOverview {
    type Row = OverviewRow;

    fn to_row(&self) -> OverviewRow {
        OverviewRow {
            keyword: self.keyword.clone(),
            location_code: self.location_code,
            language_code: self.language_code.clone(),
            search_volume: self.search_volume,
            cpc: self.cpc,
            ppc: self.ppc,
            ppc_level: self.ppc_level.clone(),
            keyword_difficulty: self.keyword_difficulty,
            search_intent: self.search_intent.clone(),
            trend_monthly: self.search_volume_trend.monthly,
            trend_quarterly: self.search_volume_trend.quarterly,
            trend_yearly: self.search_volume_trend.yearly,
            trend_direction: self.trend_analysis.direction.to_string(),
            seasonality_score: self.trend_analysis.seasonality_score,
            male: self.gender_distribution.map(|g| g.male),
            female: self.gender_distribution.map(|g| g.female),
        }
    }
}

/// CSV row for a domain keyword
#[derive(Debug, Serialize)]
pub struct DomainKeywordRow {
    keyword: String,
    search_volume: u64,
    cpc: f64,
    competition: f64,
    competition_level: String,
    intent: String,
    trend_monthly: i64,
    trend_quarterly: i64,
    trend_yearly: i64,
}

impl ToCsvRow for DomainKeyword {
    type Row = DomainKeywordRow;

    fn to_row(&self) -> DomainKeywordRow {
        DomainKeywordRow {
            keyword: self.keyword.clone(),
            search_volume: self.search_volume,
            cpc: self.cpc,
            competition: self.competition,
            competition_level: self.competition_level.to_string(),
            intent: self.intent.to_string(),
            trend_monthly: self.search_volume_trend.monthly,
            trend_quarterly: self.search_volume_trend.quarterly,
            trend_yearly: self.search_volume_trend.yearly,
        }
    }
}

/// Single-row account balance
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BalanceRow {
    /// Remaining balance, empty when unknown
    pub balance: Option<f64>,
}

impl ToCsvRow for BalanceRow {
    type Row = BalanceRow;

    fn to_row(&self) -> BalanceRow {
        *self
    }
}

/// CSV writer over any destination
pub struct CsvRecordsWriter<W: Write> {
    writer: Writer<W>,
    rows_written: u64,
}

impl<W: Write> CsvRecordsWriter<W> {
    /// Writer emitting a header before the first row
    pub fn new(out: W) -> Self {
        debug!("CSV writer created (headers will be written on first serialize)");
        Self {
            writer: Writer::from_writer(out),
            rows_written: 0,
        }
    }

    /// Rows written so far
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }
}

impl<W: Write, R: ToCsvRow> RecordsWriter<R> for CsvRecordsWriter<W> {
    fn write_record(&mut self, record: &R) -> OutputResult<()> {
        self.writer
            .serialize(record.to_row())
            .map_err(|e| OutputError::CsvError(format!("Failed to write row: {}", e)))?;

        self.rows_written += 1;
        if self.rows_written % FLUSH_EVERY == 0 {
            OutputWriter::flush(self)?;
            debug!("Progress: {} rows written", self.rows_written);
        }
        Ok(())
    }
}

impl<W: Write> OutputWriter for CsvRecordsWriter<W> {
    fn flush(&mut self) -> OutputResult<()> {
        self.writer
            .flush()
            .map_err(|e| OutputError::FlushError(format!("Failed to flush: {}", e)))
    }

    fn close(mut self) -> OutputResult<()> {
        OutputWriter::flush(&mut self)?;
        let rows = self.rows_written;
        let mut out = self
            .writer
            .into_inner()
            .map_err(|e| OutputError::IoError(format!("Failed to get inner writer: {}", e)))?;
        out.flush()
            .map_err(|e| OutputError::FlushError(format!("Failed to flush: {}", e)))?;

        info!("CSV writer closed: {} rows written", rows);
        Ok(())
    }
}

/// Write `records` as CSV to `out`
pub fn write_csv<R: ToCsvRow, W: Write>(records: &[R], out: W) -> OutputResult<u64> {
    let mut writer = CsvRecordsWriter::new(out);
    writer.write_records(records)?;
    let rows = writer.rows_written();
    writer.close()?;
    Ok(rows)
}
