use regex::{Captures, Regex};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::LazyLock;

use super::normalize::{clean, normalize};

// Runs on normalized (lowercase) text, so "K" arrives as "k"
static PRICE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"price:\s*\$([0-9][0-9,]*(?:\.[0-9]+)?)(k?)").expect("price pattern is valid")
});

static SELLER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)seller:\s*(.+)").expect("seller pattern is valid"));

static SALE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(\S+)\s+bought your\s+(.+?)\s+for\s+\$([0-9][0-9,]*(?:\.[0-9]+)?)(k?)")
        .expect("sale pattern is valid")
});

/// Parse the amount part of a price: `"1,234.5"` with optional `"k"` → 1234500.
///
/// Returns `None` for anything that isn't a non-negative whole number of
/// dollars once the multiplier is applied.
pub fn parse_amount(digits: &str, suffix: &str) -> Option<u64> {
    let number = Decimal::from_str(&digits.replace(',', "")).ok()?;
    let multiplier = if suffix.eq_ignore_ascii_case("k") {
        Decimal::from(1000)
    } else {
        Decimal::ONE
    };
    (number * multiplier).trunc().to_u64()
}

fn amount_from(caps: &Captures<'_>, digits: usize, suffix: usize) -> Option<u64> {
    let suffix = caps.get(suffix).map_or("", |m| m.as_str());
    parse_amount(caps.get(digits)?.as_str(), suffix)
}

/// Price from a lore line like `"§7Price: §6$9.9K"`. `None` if the line has no price.
pub fn parse_price(line: &str) -> Option<u64> {
    let normalized = normalize(line);
    let caps = PRICE.captures(&normalized)?;
    amount_from(&caps, 1, 2)
}

/// Seller name from a lore line like `"Seller: Notch"`, case preserved.
pub fn parse_seller(line: &str) -> Option<String> {
    let cleaned = clean(line);
    let caps = SELLER.captures(&cleaned)?;
    let name = caps.get(1)?.as_str().trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// A "somebody bought your X" chat notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sale {
    pub buyer: String,
    pub item: String,
    pub price: u64,
}

/// Parse `"<buyer> bought your <item> for $<price>"`.
pub fn parse_sale(line: &str) -> Option<Sale> {
    let cleaned = clean(line);
    let caps = SALE.captures(&cleaned)?;
    Some(Sale {
        buyer: caps.get(1)?.as_str().to_string(),
        item: caps.get(2)?.as_str().trim().to_string(),
        price: amount_from(&caps, 3, 4)?,
    })
}
