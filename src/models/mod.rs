use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::error::{Error, Result};

/// Financial statement categories served by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Section {
    Income,
    CashFlow,
    BalanceSheet,
    Metrics,
    Growth,
}

/// Static metadata attached to every section
#[derive(Debug)]
pub struct SectionInfo {
    /// Name used inside cache file names
    pub cache_name: &'static str,
    /// Human readable label
    pub label: &'static str,
    /// Label as it appears, already escaped, in the provider query string
    pub query_label: &'static str,
}

static INCOME: SectionInfo = SectionInfo {
    cache_name: "INCOME",
    label: "Income Statement",
    query_label: "Income%20Statement",
};
static CASH_FLOW: SectionInfo = SectionInfo {
    cache_name: "CASH_FLOW",
    label: "Cash Flow",
    query_label: "Cash%20Flow",
};
static BALANCE_SHEET: SectionInfo = SectionInfo {
    cache_name: "BALANCE_SHEET",
    label: "Balance Sheet",
    query_label: "Balance%20Sheet",
};
static METRICS: SectionInfo = SectionInfo {
    cache_name: "METRICS",
    label: "Metrics",
    query_label: "Metrics",
};
static GROWTH: SectionInfo = SectionInfo {
    cache_name: "GROWTH",
    label: "Growth",
    query_label: "Growth",
};

impl Section {
    pub const ALL: [Section; 5] = [
        Section::Income,
        Section::BalanceSheet,
        Section::CashFlow,
        Section::Metrics,
        Section::Growth,
    ];

    pub fn info(self) -> &'static SectionInfo {
        match self {
            Section::Income => &INCOME,
            Section::CashFlow => &CASH_FLOW,
            Section::BalanceSheet => &BALANCE_SHEET,
            Section::Metrics => &METRICS,
            Section::Growth => &GROWTH,
        }
    }

    pub fn cache_name(self) -> &'static str {
        self.info().cache_name
    }

    pub fn query_label(self) -> &'static str {
        self.info().query_label
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.info().label)
    }
}

/// Indicators reduced from a single statement row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    SalesGrowth,
    Roic,
    EpsGrowth,
    FcfGrowth,
    BvpsGrowth,
}

/// Where a field lives in the provider's spreadsheet layout
#[derive(Debug)]
pub struct FieldSpec {
    pub name: &'static str,
    pub section: Section,
    pub title: &'static str,
}

static FIELD_TABLE: [FieldSpec; 5] = [
    FieldSpec {
        name: "Sales Growth",
        section: Section::Income,
        title: "Revenue Growth",
    },
    FieldSpec {
        name: "ROIC",
        section: Section::Metrics,
        title: "ROIC",
    },
    FieldSpec {
        name: "EPS Growth",
        section: Section::Growth,
        title: "EPS Growth",
    },
    FieldSpec {
        name: "FCF Growth",
        section: Section::Growth,
        title: "Free Cash Flow growth",
    },
    FieldSpec {
        name: "BVPS Growth",
        section: Section::Growth,
        title: "Book Value per Share Growth",
    },
];

impl Field {
    pub const ALL: [Field; 5] = [
        Field::SalesGrowth,
        Field::Roic,
        Field::EpsGrowth,
        Field::FcfGrowth,
        Field::BvpsGrowth,
    ];

    pub fn spec(self) -> &'static FieldSpec {
        &FIELD_TABLE[self as usize]
    }

    pub fn section(self) -> Section {
        self.spec().section
    }

    pub fn title(self) -> &'static str {
        self.spec().title
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.spec().name)
    }
}

/// A single spreadsheet cell
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    /// Classify raw text: blank is empty, numeric text is a number.
    /// Other text is kept as given so titles compare exactly.
    pub fn from_text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Cell::Empty
        } else if let Ok(value) = trimmed.parse::<f64>() {
            Cell::Number(value)
        } else {
            Cell::Text(raw.to_string())
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// One parsed statement section, addressable by 1-based (row, column)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawStatement {
    rows: Vec<Vec<Cell>>,
}

impl RawStatement {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    pub fn max_row(&self) -> usize {
        self.rows.len()
    }

    pub fn max_column(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Cell at 1-based coordinates; anything outside the populated area is empty
    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        static EMPTY: Cell = Cell::Empty;

        if row == 0 || column == 0 {
            return &EMPTY;
        }
        self.rows
            .get(row - 1)
            .and_then(|cells| cells.get(column - 1))
            .unwrap_or(&EMPTY)
    }

    /// Titles held in column 1, one per row
    pub fn titles(&self) -> impl Iterator<Item = &Cell> + '_ {
        (1..=self.max_row()).map(move |row| self.cell(row, 1))
    }
}

/// All five statement sections of one company
#[derive(Debug, Clone, PartialEq)]
pub struct CompanyStatements {
    pub ticker: String,
    pub income: RawStatement,
    pub balance_sheet: RawStatement,
    pub cash_flow: RawStatement,
    pub metrics: RawStatement,
    pub growth: RawStatement,
}

impl CompanyStatements {
    /// Assemble from per-section results; every section must be present
    pub fn assemble<I>(ticker: &str, sections: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Section, RawStatement)>,
    {
        let mut slots: [Option<RawStatement>; 5] = Default::default();
        for (section, statement) in sections {
            slots[section as usize] = Some(statement);
        }
        let [income, cash_flow, balance_sheet, metrics, growth] = slots;

        let missing = |section: Section| Error::IncompleteStatements {
            ticker: ticker.to_string(),
            section,
        };

        Ok(Self {
            ticker: ticker.to_string(),
            income: income.ok_or_else(|| missing(Section::Income))?,
            balance_sheet: balance_sheet.ok_or_else(|| missing(Section::BalanceSheet))?,
            cash_flow: cash_flow.ok_or_else(|| missing(Section::CashFlow))?,
            metrics: metrics.ok_or_else(|| missing(Section::Metrics))?,
            growth: growth.ok_or_else(|| missing(Section::Growth))?,
        })
    }

    pub fn section(&self, section: Section) -> &RawStatement {
        match section {
            Section::Income => &self.income,
            Section::CashFlow => &self.cash_flow,
            Section::BalanceSheet => &self.balance_sheet,
            Section::Metrics => &self.metrics,
            Section::Growth => &self.growth,
        }
    }
}

/// 10, 5 and 1 year averages of one field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Indicator {
    pub field: Field,
    pub year10: f64,
    pub year5: f64,
    pub year1: f64,
}

/// Configuration for the application
#[derive(Debug, Clone)]
pub struct Config {
    pub cache_dir: PathBuf,
    pub provider_url: String,
    pub request_timeout: Duration,
    pub max_concurrent_tickers: usize,
    pub rate_limit_per_minute: u32,
    pub retry_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            provider_url: "https://stockrow.com".to_string(),
            request_timeout: Duration::from_secs(30),
            max_concurrent_tickers: 4,
            rate_limit_per_minute: 120,
            retry_attempts: 3,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        let defaults = Config::default();
        Config {
            cache_dir: std::env::var("RULE1_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            provider_url: std::env::var("RULE1_PROVIDER_URL").unwrap_or(defaults.provider_url),
            request_timeout: Duration::from_secs(env_number(
                "RULE1_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )),
            max_concurrent_tickers: env_number(
                "RULE1_MAX_CONCURRENT_TICKERS",
                defaults.max_concurrent_tickers,
            )
            .max(1),
            rate_limit_per_minute: env_number(
                "RULE1_RATE_LIMIT_PER_MINUTE",
                defaults.rate_limit_per_minute,
            ),
            retry_attempts: env_number("RULE1_RETRY_ATTEMPTS", defaults.retry_attempts).max(1),
        }
    }
}

/// `~/.local/share/rule1/cache` on Linux, the platform equivalent elsewhere
pub fn default_cache_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rule1")
        .join("cache")
}

fn env_number<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + fmt::Display + Copy,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring malformed {}={:?}, using {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
