//! The closed category set
//!
//! Ten labels; `Other` is reserved for true non-fits. The set (and the
//! one-line purpose descriptions handed to the model) can be overridden
//! via `categories.list` / `categories.descriptions` in config.

/// Fallback label when classification fails or nothing fits
pub const OTHER: &str = "Other";

/// A category label with the one-line description shown to the model
#[derive(Debug, Clone, Copy)]
pub struct CategoryDef {
    pub name: &'static str,
    pub description: &'static str,
}

/// The default 10-label set
pub fn default_categories() -> &'static [CategoryDef] {
    &[
        CategoryDef {
            name: "Food",
            description: "Restaurants, food delivery, groceries, cafes",
        },
        CategoryDef {
            name: "Transport",
            description: "Cabs, fuel, metro/bus/train tickets, tolls, parking",
        },
        CategoryDef {
            name: "Shopping",
            description: "Online and offline retail purchases, apparel, electronics",
        },
        CategoryDef {
            name: "Bills",
            description: "Utilities, phone/internet, rent, insurance premiums",
        },
        CategoryDef {
            name: "Entertainment",
            description: "Streaming, movies, games, events, subscriptions for leisure",
        },
        CategoryDef {
            name: "Health",
            description: "Pharmacies, hospitals, diagnostics, fitness",
        },
        CategoryDef {
            name: "Education",
            description: "Courses, books, school/college fees, exam fees",
        },
        CategoryDef {
            name: "Investment",
            description: "Mutual funds, SIPs, stocks, deposits, gold",
        },
        CategoryDef {
            name: "Transfer",
            description: "Peer-to-peer transfers, self transfers between accounts",
        },
        CategoryDef {
            name: OTHER,
            description: "Anything that does not fit the categories above",
        },
    ]
}

/// Case-insensitive lookup of a label within a configured set.
///
/// Returns the canonical casing from the set, or None when the label
/// is not part of it.
pub fn validate<'a>(label: &str, set: &'a [String]) -> Option<&'a str> {
    let wanted = label.trim();
    set.iter()
        .find(|c| c.eq_ignore_ascii_case(wanted))
        .map(|c| c.as_str())
}
