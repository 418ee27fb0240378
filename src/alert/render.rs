//! Alert message rendering
//!
//! Turns a confirmed signal into the Telegram-HTML message body: a headline
//! with the drop (or line move), the fixture, and a fixed-width preview of
//! the recent history rows, newest first.

use crate::classify::{BetSide, MarketKind};
use crate::ingest::EventSummary;
use crate::series::MarketTables;
use crate::signal::Signal;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

/// Most recent history rows shown in the preview block
const PREVIEW_ROWS: usize = 18;

#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Headline shown at the top of every message
    pub title: String,
    /// Base URL for the dashboard link appended to messages
    pub public_base_url: Option<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            title: "ODDS RADAR".to_string(),
            public_base_url: None,
        }
    }
}

pub struct Renderer {
    config: RenderConfig,
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn market_label(kind: MarketKind, side: BetSide) -> &'static str {
    match (kind, side) {
        (MarketKind::Total, BetSide::Over) => "Total Over",
        (MarketKind::Total, _) => "Total Under",
        (MarketKind::Handicap, BetSide::Home) => "Handicap Home",
        (MarketKind::Handicap, _) => "Handicap Away",
        (MarketKind::Outcome, BetSide::Home) => "1X2 Home",
        (MarketKind::Outcome, BetSide::Draw) => "1X2 Draw",
        (MarketKind::Outcome, _) => "1X2 Away",
        (MarketKind::Other, _) => "Market",
    }
}

fn fmt_line(line: Decimal) -> String {
    line.normalize().to_string()
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Headline describing the move. Line shifts are never phrased as a
    /// percentage drop: the old and new prices belong to different bets, so
    /// the implied-probability delta is shown instead.
    fn headline(&self, signal: &Signal) -> String {
        let label = market_label(signal.kind, signal.side);
        if signal.is_line_change() {
            let old_line = signal.old_line.map(fmt_line).unwrap_or_default();
            let new_line = signal.new_line.map(fmt_line).unwrap_or_default();
            let gain_pp = signal.probability_gain() * dec!(100);
            format!(
                "{label} move ({:.2}@{old_line} -> {:.2}@{new_line}) | dP {:.1}p",
                signal.old_price, signal.new_price, gain_pp
            )
        } else {
            format!(
                "{label} drop ({:.2} -> {:.2}) - {:.1}%",
                signal.old_price, signal.new_price, signal.drop_pct
            )
        }
    }

    fn preview(&self, signal: &Signal, tables: &MarketTables) -> String {
        struct Row {
            line: Option<Decimal>,
            prices: BTreeMap<BetSide, Decimal>,
        }

        let Some(by_side) = tables.by_kind(signal.kind) else {
            return String::new();
        };

        let mut rows: BTreeMap<DateTime<Utc>, Row> = BTreeMap::new();
        for (side, series) in by_side {
            for point in series.points() {
                let row = rows.entry(point.observed_at).or_insert_with(|| Row {
                    line: point.line,
                    prices: BTreeMap::new(),
                });
                row.line = row.line.or(point.line);
                row.prices.insert(*side, point.price);
            }
        }

        let sides: &[BetSide] = match signal.kind {
            MarketKind::Outcome => &[BetSide::Home, BetSide::Draw, BetSide::Away],
            MarketKind::Handicap => &[BetSide::Home, BetSide::Away],
            _ => &[BetSide::Over, BetSide::Under],
        };

        let header = match signal.kind {
            MarketKind::Outcome => "Time  |    1 |    X |    2".to_string(),
            MarketKind::Handicap => "Time  | Line | Home | Away".to_string(),
            _ => "Time  | Line | Over | Under".to_string(),
        };

        let mut lines = vec![header];
        for (observed_at, row) in rows.iter().rev().take(PREVIEW_ROWS) {
            let time = observed_at.format("%H:%M");
            let mut cells = vec![format!("{time}")];
            if signal.kind.has_line() {
                let line = row.line.map(fmt_line).unwrap_or_else(|| "-".to_string());
                cells.push(format!("{line:>4}"));
            }
            for side in sides {
                match row.prices.get(side) {
                    Some(price) => cells.push(format!("{price:>4.2}")),
                    None => cells.push("   -".to_string()),
                }
            }
            lines.push(cells.join(" | "));
        }
        lines.join("\n")
    }

    /// Full message body in Telegram HTML.
    pub fn build_message(
        &self,
        event: &EventSummary,
        signal: &Signal,
        tables: &MarketTables,
    ) -> String {
        let mut parts: Vec<String> = Vec::new();
        parts.push(format!("<b>{}</b>", html_escape(&self.config.title)));
        parts.push("· Prematch".to_string());
        parts.push(String::new());
        parts.push(format!("· {}", html_escape(&self.headline(signal))));
        parts.push(String::new());

        if let Some(league) = &event.league {
            parts.push(html_escape(league));
        }
        parts.push(format!("<b>{}</b>", html_escape(&event.fixture_name())));
        if let Some(start) = event.start_time {
            parts.push(start.format("%Y-%m-%d %H:%M").to_string());
        }

        let preview = self.preview(signal, tables);
        if !preview.is_empty() {
            parts.push(String::new());
            parts.push(format!("<pre>{}</pre>", html_escape(&preview)));
        }

        if let Some(base) = &self.config.public_base_url {
            parts.push(String::new());
            parts.push(format!(
                "{}/#/dashboard/event/{}",
                base.trim_end_matches('/'),
                event.event_id
            ));
        }

        parts.join("\n")
    }
}
