//! Append-only curve output. Rows are written as they are produced so a long sweep can be
//! tailed while it runs.

use crate::engine::TrialRecord;
use crate::error::SinkError;
use alloy::primitives::U256;
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::Path;

const LIQUIDATION_COLUMNS: [&str; 15] = [
    "tradeSize",
    "maxOut",
    "liquidations",
    "popcountBefore",
    "popcountAfter",
    "bitmapBefore",
    "bitmapAfter",
    "bitmapXor",
    "reserveABefore",
    "reserveBBefore",
    "reserveAAfter",
    "reserveBAfter",
    "midPriceWad",
    "execPriceWad",
    "slippageBps",
];

const PRICE_IMPACT_COLUMNS: [&str; 5] = [
    "amountIn",
    "amountOut",
    "priceInPerOut",
    "reserve0",
    "reserve1",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CurveLayout {
    /// Full per-trial record: bitmaps, reserves and prices.
    #[default]
    Liquidation,
    /// Trade size against realized price plus the reserves after the trade.
    PriceImpact,
}

impl CurveLayout {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "liquidation" | "liquidations" => Some(Self::Liquidation),
            "price_impact" | "price-impact" | "priceimpact" => Some(Self::PriceImpact),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Liquidation => "liquidation",
            Self::PriceImpact => "price_impact",
        }
    }

    pub fn header(self) -> &'static [&'static str] {
        match self {
            Self::Liquidation => &LIQUIDATION_COLUMNS,
            Self::PriceImpact => &PRICE_IMPACT_COLUMNS,
        }
    }

    /// Base-10 fields in header order.
    pub fn row(self, record: &TrialRecord) -> Vec<String> {
        let dec = |value: U256| value.to_string();
        match self {
            Self::Liquidation => vec![
                dec(record.trade_size),
                dec(record.max_out),
                record.liquidations.to_string(),
                record.popcount_before.to_string(),
                record.popcount_after.to_string(),
                dec(record.bitmap_before),
                dec(record.bitmap_after),
                dec(record.bitmap_xor),
                dec(record.reserves_before.reserve_a),
                dec(record.reserves_before.reserve_b),
                dec(record.reserves_after.reserve_a),
                dec(record.reserves_after.reserve_b),
                dec(record.mid_price_wad),
                dec(record.exec_price_wad),
                dec(record.slippage_bps),
            ],
            Self::PriceImpact => vec![
                dec(record.trade_size),
                dec(record.max_out),
                dec(record.exec_price_wad),
                dec(record.reserves_after.reserve_a),
                dec(record.reserves_after.reserve_b),
            ],
        }
    }
}

pub trait CurveSink {
    fn append(&mut self, record: &TrialRecord) -> Result<(), SinkError>;

    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// CSV writer. The header goes out at construction, so an empty sweep still yields a valid file.
pub struct CsvCurveSink<W: io::Write> {
    writer: csv::Writer<W>,
    layout: CurveLayout,
    rows: usize,
}

impl CsvCurveSink<BufWriter<File>> {
    /// Create (or truncate) `path`, making parent directories as needed.
    pub fn create(path: impl AsRef<Path>, layout: CurveLayout) -> Result<Self, SinkError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        Self::new(BufWriter::new(file), layout)
    }
}

impl<W: io::Write> CsvCurveSink<W> {
    pub fn new(inner: W, layout: CurveLayout) -> Result<Self, SinkError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(inner);
        writer.write_record(layout.header())?;
        Ok(Self {
            writer,
            layout,
            rows: 0,
        })
    }

    pub fn layout(&self) -> CurveLayout {
        self.layout
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Flush and hand back the underlying writer.
    pub fn into_inner(self) -> Result<W, SinkError> {
        self.writer
            .into_inner()
            .map_err(|err| SinkError::Io(err.into_error()))
    }
}

impl<W: io::Write> CurveSink for CsvCurveSink<W> {
    fn append(&mut self, record: &TrialRecord) -> Result<(), SinkError> {
        self.writer.write_record(self.layout.row(record))?;
        self.rows += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Keeps records in memory; used by tests and callers that post-process the curve themselves.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<TrialRecord>,
}

impl CurveSink for MemorySink {
    fn append(&mut self, record: &TrialRecord) -> Result<(), SinkError> {
        self.records.push(record.clone());
        Ok(())
    }
}
