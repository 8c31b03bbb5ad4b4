//! Row rendering and the display surface seam
//!
//! `TradeRow::from_event` does the only formatting the core owns: the
//! native amount divided by 10^9 and both caps to two decimals, name and
//! symbol cut to their column width with the full text kept for
//! inspection. `Surface` is what the session renders onto and measures.

use types::numeric::format_fixed2;
use types::trade::TradeEvent;

/// Marker appended to truncated text.
pub const ELLIPSIS: char = '…';

/// Column titles, in display order.
pub const HEADER: [&str; 5] = ["Name", "Symbol", "SOL", "Market-Cap", "USD-Cap"];

/// Column widths for the text columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnWidths {
    pub name: usize,
    pub symbol: usize,
}

impl Default for ColumnWidths {
    fn default() -> Self {
        Self { name: 24, symbol: 10 }
    }
}

/// One visible row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeRow {
    pub name: String,
    pub symbol: String,
    pub sol: String,
    pub market_cap: String,
    pub usd_market_cap: String,
    /// Untruncated name, shown on inspection.
    pub name_full: String,
    /// Untruncated symbol, shown on inspection.
    pub symbol_full: String,
}

impl TradeRow {
    pub fn from_event(event: &TradeEvent, widths: ColumnWidths) -> Self {
        Self {
            name: truncate(event.name(), widths.name),
            symbol: truncate(event.symbol(), widths.symbol),
            sol: event.sol_amount().format_display(),
            market_cap: format_fixed2(event.market_cap()),
            usd_market_cap: format_fixed2(event.usd_market_cap()),
            name_full: event.name().to_string(),
            symbol_full: event.symbol().to_string(),
        }
    }

    pub fn is_truncated(&self) -> bool {
        self.name != self.name_full || self.symbol != self.symbol_full
    }
}

/// Map buffered events (newest first) to rows in the same order.
pub fn render_rows<'a>(
    events: impl IntoIterator<Item = &'a TradeEvent>,
    widths: ColumnWidths,
) -> Vec<TradeRow> {
    events
        .into_iter()
        .map(|e| TradeRow::from_event(e, widths))
        .collect()
}

/// Cut `text` to at most `width` characters, ending in `…` when cut.
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(width - 1).collect();
    out.push(ELLIPSIS);
    out
}

/// Format the header and rows as aligned plain-text lines.
pub fn render_lines(rows: &[TradeRow], widths: ColumnWidths) -> Vec<String> {
    let sol_w = column_width(HEADER[2], rows.iter().map(|r| r.sol.as_str()));
    let cap_w = column_width(HEADER[3], rows.iter().map(|r| r.market_cap.as_str()));
    let usd_w = column_width(HEADER[4], rows.iter().map(|r| r.usd_market_cap.as_str()));
    let name_w = widths.name.max(HEADER[0].len());
    let symbol_w = widths.symbol.max(HEADER[1].len());

    let line = |cols: [&str; 5]| {
        format!(
            "{:<name_w$} | {:<symbol_w$} | {:>sol_w$} | {:>cap_w$} | {:>usd_w$}",
            cols[0], cols[1], cols[2], cols[3], cols[4],
        )
    };

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(line(HEADER));
    for row in rows {
        lines.push(line([
            row.name.as_str(),
            row.symbol.as_str(),
            row.sol.as_str(),
            row.market_cap.as_str(),
            row.usd_market_cap.as_str(),
        ]));
    }
    lines
}

fn column_width<'a>(title: &str, values: impl Iterator<Item = &'a str>) -> usize {
    values
        .map(|v| v.chars().count())
        .max()
        .unwrap_or(0)
        .max(title.len())
}

/// A scrollable display the session renders onto.
///
/// Offsets and extents share one unit (pixels, terminal rows, ...). Offset
/// 0 is the newest-item edge.
pub trait Surface {
    /// Replace the visible rows and lay them out.
    fn render(&mut self, rows: &[TradeRow]);

    /// Total scrollable content length after the last layout, or `None`
    /// while nothing can be measured.
    fn content_extent(&self) -> Option<f64>;

    fn scroll_offset(&self) -> f64;

    fn set_scroll_offset(&mut self, offset: f64);
}

/// Headless surface with a fixed header and uniform row height.
#[derive(Debug, Clone)]
pub struct FixedRowSurface {
    header_height: f64,
    row_height: f64,
    rows: Vec<TradeRow>,
    laid_out: bool,
    offset: f64,
}

impl FixedRowSurface {
    pub fn new(header_height: f64, row_height: f64) -> Self {
        Self {
            header_height,
            row_height,
            rows: Vec::new(),
            laid_out: false,
            offset: 0.0,
        }
    }

    pub fn rows(&self) -> &[TradeRow] {
        &self.rows
    }

    /// Row under a given index, for inspection of truncated cells.
    pub fn inspect(&self, index: usize) -> Option<(&str, &str)> {
        self.rows
            .get(index)
            .map(|r| (r.name_full.as_str(), r.symbol_full.as_str()))
    }
}

impl Surface for FixedRowSurface {
    fn render(&mut self, rows: &[TradeRow]) {
        self.rows = rows.to_vec();
        self.laid_out = true;
    }

    fn content_extent(&self) -> Option<f64> {
        if !self.laid_out {
            return None;
        }
        Some(self.header_height + self.row_height * self.rows.len() as f64)
    }

    fn scroll_offset(&self) -> f64 {
        self.offset
    }

    fn set_scroll_offset(&mut self, offset: f64) {
        self.offset = offset;
    }
}
