//! Header-row resolution for agent workbooks.
//!
//! The collection agent emits one sheet per product with a header row in
//! its own vocabulary. Required columns are resolved by exact name;
//! optional columns by a fixed ordered alias table, then a prefix
//! heuristic, else treated as absent.

use std::collections::HashMap;

use calamine::{Data, DataType};

use super::error::ExtractError;

/// Required header names, exactly as the agent writes them.
pub const REQUIRED_HEADERS: [&str; 7] = [
    "日期",
    "Buybox价格($)",
    "价格($)",
    "Prime价格($)",
    "Coupon价格($)",
    "Coupon折扣",
    "子体销量",
];

const FBA_PRICE_ALIASES: [&str; 4] = ["FBA价格($)", "FBA价格", "FBA Price($)", "FBA Price"];
const FBM_PRICE_ALIASES: [&str; 4] = ["FBM价格($)", "FBM价格", "FBM Price($)", "FBM Price"];
const STRIKETHROUGH_ALIASES: [&str; 4] = ["划线价格($)", "划线价格", "List价格($)", "List Price($)"];
const RANK_ALIASES: [&str; 2] = ["BSR排名", "BSR Rank"];
const RATING_ALIASES: [&str; 2] = ["评分", "Rating"];
const RATING_COUNT_ALIASES: [&str; 3] = ["评分数", "Rating Count", "Review Count"];
const SELLER_COUNT_ALIASES: [&str; 2] = ["卖家数", "Seller Count"];

/// Category-rank variant columns are named "BSR[<category>]".
pub const CATEGORY_RANK_PREFIX: &str = "BSR[";

/// Resolved cell indices for one sheet's columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnIndex {
    pub date: usize,
    pub buybox_price: usize,
    pub price: usize,
    pub prime_price: usize,
    pub coupon_price: usize,
    pub coupon_discount: usize,
    pub child_sales: usize,
    pub fba_price: Option<usize>,
    pub fbm_price: Option<usize>,
    pub strikethrough_price: Option<usize>,
    pub rank: Option<usize>,
    pub category_rank_variant: Option<usize>,
    pub rating: Option<usize>,
    pub rating_count: Option<usize>,
    pub seller_count: Option<usize>,
}

impl ColumnIndex {
    /// Resolve a header row into column indices. Fails only when a
    /// required column is missing.
    pub fn resolve(header_row: &[Data], file: &str) -> Result<Self, ExtractError> {
        let map = header_map(header_row);

        let missing: Vec<&str> = REQUIRED_HEADERS
            .iter()
            .copied()
            .filter(|name| !map.contains_key(*name))
            .collect();
        if !missing.is_empty() {
            return Err(ExtractError::missing_columns(file, &missing));
        }

        Ok(Self {
            date: map[REQUIRED_HEADERS[0]],
            buybox_price: map[REQUIRED_HEADERS[1]],
            price: map[REQUIRED_HEADERS[2]],
            prime_price: map[REQUIRED_HEADERS[3]],
            coupon_price: map[REQUIRED_HEADERS[4]],
            coupon_discount: map[REQUIRED_HEADERS[5]],
            child_sales: map[REQUIRED_HEADERS[6]],
            fba_price: find_optional(&map, &FBA_PRICE_ALIASES, None),
            fbm_price: find_optional(&map, &FBM_PRICE_ALIASES, None),
            strikethrough_price: find_optional(&map, &STRIKETHROUGH_ALIASES, None),
            rank: find_optional(&map, &RANK_ALIASES, None),
            category_rank_variant: find_optional(&map, &[], Some(CATEGORY_RANK_PREFIX)),
            rating: find_optional(&map, &RATING_ALIASES, None),
            rating_count: find_optional(&map, &RATING_COUNT_ALIASES, None),
            seller_count: find_optional(&map, &SELLER_COUNT_ALIASES, None),
        })
    }
}

fn header_map(header_row: &[Data]) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (idx, cell) in header_row.iter().enumerate() {
        if let Some(name) = cell.as_string() {
            let name = name.trim().to_string();
            if !name.is_empty() {
                // First occurrence wins on duplicate headers.
                map.entry(name).or_insert(idx);
            }
        }
    }
    map
}

/// Try each alias in order, then a prefix match, else absent.
fn find_optional(
    map: &HashMap<String, usize>,
    aliases: &[&str],
    prefix: Option<&str>,
) -> Option<usize> {
    for alias in aliases {
        if let Some(idx) = map.get(*alias) {
            return Some(*idx);
        }
    }
    if let Some(prefix) = prefix {
        for (name, idx) in map {
            if name.starts_with(prefix) {
                return Some(*idx);
            }
        }
    }
    None
}
