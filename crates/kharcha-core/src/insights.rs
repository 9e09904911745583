//! Derived read-side insights and post-sync alerts
//!
//! Pure SQL over the store, no model involvement: month-over-month
//! movement, category trends, merchant recurrence, the post-sync
//! alert pass, and a flat set of suggestion rules.

use chrono::{Datelike, Duration, Months, NaiveDate};
use rusqlite::params;
use serde::Serialize;

use crate::config::AlertsConfig;
use crate::db::Database;
use crate::error::Result;

/// Spending total for one month, with movement vs the month before
#[derive(Debug, Clone, Serialize)]
pub struct MonthlyChange {
    /// YYYY-MM
    pub month: String,
    pub total: f64,
    /// None for the first month on record
    pub change_percent: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryTrend {
    pub category: String,
    pub current_total: f64,
    pub previous_total: f64,
    /// None when the previous month had no spend in the category
    pub change_percent: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Weekly,
    Monthly,
    Occasional,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Occasional => "occasional",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MerchantRecurrence {
    pub merchant: String,
    pub total: f64,
    pub average: f64,
    pub count: i64,
    pub frequency: Frequency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    SpendingSpike,
    NewCategory,
    LargeTransaction,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SpendingSpike => "spending_spike",
            Self::NewCategory => "new_category",
            Self::LargeTransaction => "large_transaction",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub category: Option<String>,
    pub merchant: Option<String>,
    pub amount: f64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
    pub rule: &'static str,
    pub message: String,
}

pub struct InsightsEngine<'a> {
    db: &'a Database,
    config: &'a AlertsConfig,
}

impl<'a> InsightsEngine<'a> {
    pub fn new(db: &'a Database, config: &'a AlertsConfig) -> Self {
        Self { db, config }
    }

    /// Debit totals per month; percent change for each month after the
    /// first.
    pub fn month_over_month(&self) -> Result<Vec<MonthlyChange>> {
        let conn = self.db.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT strftime('%Y-%m', date) AS month, SUM(amount)
            FROM transactions
            WHERE direction = 'debit'
            GROUP BY month
            ORDER BY month
            "#,
        )?;

        let totals: Vec<(String, f64)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut out = Vec::with_capacity(totals.len());
        let mut previous: Option<f64> = None;
        for (month, total) in totals {
            let change_percent = previous
                .filter(|p| *p > 0.0)
                .map(|p| (total - p) / p * 100.0);
            out.push(MonthlyChange {
                month,
                total,
                change_percent,
            });
            previous = Some(total);
        }
        Ok(out)
    }

    /// Current vs previous month per category, sorted by absolute
    /// percent change (categories new this month sort last).
    pub fn category_trend(&self, today: NaiveDate) -> Result<Vec<CategoryTrend>> {
        let current = today.format("%Y-%m").to_string();
        let previous = today
            .checked_sub_months(Months::new(1))
            .unwrap_or(today)
            .format("%Y-%m")
            .to_string();

        let conn = self.db.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT COALESCE(category, 'Other'), strftime('%Y-%m', date) AS month, SUM(amount)
            FROM transactions
            WHERE direction = 'debit' AND strftime('%Y-%m', date) IN (?, ?)
            GROUP BY 1, 2
            "#,
        )?;

        let rows: Vec<(String, String, f64)> = stmt
            .query_map(params![current, previous], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut by_category: std::collections::BTreeMap<String, (f64, f64)> =
            std::collections::BTreeMap::new();
        for (category, month, total) in rows {
            let entry = by_category.entry(category).or_insert((0.0, 0.0));
            if month == current {
                entry.0 = total;
            } else {
                entry.1 = total;
            }
        }

        let mut trends: Vec<CategoryTrend> = by_category
            .into_iter()
            .map(|(category, (current_total, previous_total))| CategoryTrend {
                category,
                current_total,
                previous_total,
                change_percent: (previous_total > 0.0)
                    .then(|| (current_total - previous_total) / previous_total * 100.0),
            })
            .collect();

        trends.sort_by(|a, b| {
            let ka = a.change_percent.map(f64::abs).unwrap_or(-1.0);
            let kb = b.change_percent.map(f64::abs).unwrap_or(-1.0);
            kb.partial_cmp(&ka).unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(trends)
    }

    /// Merchants seen at least twice, with a frequency label from the
    /// mean gap between first and last occurrence.
    pub fn merchant_recurrence(&self) -> Result<Vec<MerchantRecurrence>> {
        let conn = self.db.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT merchant, SUM(amount), AVG(amount), COUNT(*),
                   (julianday(MAX(date)) - julianday(MIN(date))) / (COUNT(*) - 1)
            FROM transactions
            WHERE direction = 'debit'
            GROUP BY merchant
            HAVING COUNT(*) >= 2
            ORDER BY SUM(amount) DESC
            "#,
        )?;

        let recurrences = stmt
            .query_map([], |row| {
                let mean_gap: f64 = row.get(4)?;
                let frequency = if mean_gap <= 10.0 {
                    Frequency::Weekly
                } else if mean_gap <= 45.0 {
                    Frequency::Monthly
                } else {
                    Frequency::Occasional
                };
                Ok(MerchantRecurrence {
                    merchant: row.get(0)?,
                    total: row.get(1)?,
                    average: row.get(2)?,
                    count: row.get(3)?,
                    frequency,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(recurrences)
    }

    /// The post-sync alert pass: current ISO week (Monday-starting)
    /// against the mean of the trailing four weeks per category, plus
    /// large single debits since the week start.
    pub fn post_sync_alerts(&self, today: NaiveDate) -> Result<Vec<Alert>> {
        let week_start = today - Duration::days(today.weekday().num_days_from_monday() as i64);
        let trailing_start = week_start - Duration::days(28);

        let conn = self.db.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT COALESCE(category, 'Other') AS cat,
                   SUM(CASE WHEN date >= ? THEN amount ELSE 0 END) AS current_week,
                   SUM(CASE WHEN date >= ? AND date < ? THEN amount ELSE 0 END) / 4.0 AS weekly_avg
            FROM transactions
            WHERE direction = 'debit' AND date >= ?
            GROUP BY cat
            "#,
        )?;

        let week_start_s = week_start.to_string();
        let trailing_start_s = trailing_start.to_string();
        let rows: Vec<(String, f64, f64)> = stmt
            .query_map(
                params![week_start_s, trailing_start_s, week_start_s, trailing_start_s],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut alerts = Vec::new();
        for (category, current, avg) in rows {
            if avg > 0.0 && current > avg * self.config.spike_threshold {
                let percent = ((current - avg) / avg * 100.0).round() as i64;
                alerts.push(Alert {
                    kind: AlertKind::SpendingSpike,
                    message: format!(
                        "{} spending this week ({:.2}) is {}% above your 4-week average ({:.2})",
                        category, current, percent, avg
                    ),
                    category: Some(category),
                    merchant: None,
                    amount: current,
                });
            } else if avg == 0.0 && current > 0.0 {
                alerts.push(Alert {
                    kind: AlertKind::NewCategory,
                    message: format!(
                        "First {} spending in over a month: {:.2} this week",
                        category, current
                    ),
                    category: Some(category),
                    merchant: None,
                    amount: current,
                });
            }
        }

        let mut stmt = conn.prepare(
            r#"
            SELECT merchant, amount, COALESCE(category, 'Other')
            FROM transactions
            WHERE direction = 'debit' AND amount >= ? AND date >= ?
            ORDER BY amount DESC
            "#,
        )?;
        let large: Vec<(String, f64, String)> = stmt
            .query_map(
                params![self.config.large_transaction_amount, week_start_s],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for (merchant, amount, category) in large {
            alerts.push(Alert {
                kind: AlertKind::LargeTransaction,
                message: format!("Large debit: {:.2} to {}", amount, merchant),
                category: Some(category),
                merchant: Some(merchant),
                amount,
            });
        }

        Ok(alerts)
    }

    /// Flat, composable suggestion rules over the derived views
    pub fn suggestions(&self, today: NaiveDate) -> Result<Vec<Suggestion>> {
        let mut suggestions = Vec::new();

        // Category spiking month over month
        for trend in self.category_trend(today)? {
            if trend.change_percent.map(|c| c > 50.0).unwrap_or(false)
                && trend.current_total > 500.0
            {
                suggestions.push(Suggestion {
                    rule: "category_spike",
                    message: format!(
                        "{} is up {:.0}% this month ({:.2} vs {:.2}); worth a look",
                        trend.category,
                        trend.change_percent.unwrap_or(0.0),
                        trend.current_total,
                        trend.previous_total
                    ),
                });
            }
        }

        let recurrences = self.merchant_recurrence()?;

        // Expensive weekly habit
        for r in &recurrences {
            if r.frequency == Frequency::Weekly && r.total > 2000.0 {
                suggestions.push(Suggestion {
                    rule: "weekly_recurrence",
                    message: format!(
                        "You pay {} about weekly, {:.2} so far; a subscription or habit to review",
                        r.merchant, r.total
                    ),
                });
            }
        }

        // One merchant dominating tracked spend
        let tracked_total: f64 = recurrences.iter().map(|r| r.total).sum();
        if let Some(top) = recurrences.first() {
            if tracked_total > 0.0 && top.total > tracked_total * 0.3 {
                suggestions.push(Suggestion {
                    rule: "merchant_concentration",
                    message: format!(
                        "{} accounts for {:.0}% of your repeat-merchant spending",
                        top.merchant,
                        top.total / tracked_total * 100.0
                    ),
                });
            }
        }

        // A month that fell sharply from a meaningful base
        let months = self.month_over_month()?;
        for window in months.windows(2) {
            let (prev, cur) = (&window[0], &window[1]);
            if prev.total > 1000.0 && cur.change_percent.map(|c| c < -30.0).unwrap_or(false) {
                suggestions.push(Suggestion {
                    rule: "spending_drop",
                    message: format!(
                        "Spending fell {:.0}% in {} (from {:.2}); nice work if intentional",
                        cur.change_percent.unwrap_or(0.0).abs(),
                        cur.month,
                        prev.total
                    ),
                });
            }
        }

        Ok(suggestions)
    }
}
