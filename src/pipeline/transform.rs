use crate::domain::{PriceCategory, Product, RawRecord, RejectReason};
use once_cell::sync::Lazy;
use regex::Regex;

/// Source column names for the fixed catalog schema.
pub mod columns {
    pub const PRODUCT_ID: &str = "ProductID";
    pub const NAME: &str = "ProductName";
    pub const BRAND: &str = "ProductBrand";
    pub const GENDER: &str = "Gender";
    pub const PRICE: &str = "Price (INR)";
    pub const RATING: &str = "Rating";
    pub const NUM_IMAGES: &str = "NumImages";
    pub const DESCRIPTION: &str = "Description";
    pub const PRIMARY_COLOR: &str = "PrimaryColor";
}

/// Columns that must exist in the header row. Optional columns may be absent
/// entirely, in which case their defaults apply to every row.
pub const REQUIRED_COLUMNS: &[&str] = &[columns::PRODUCT_ID, columns::NAME, columns::PRICE];

static SPECIAL_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9\s]").expect("static regex parses"));
static WHITESPACE_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("static regex parses"));

/// Strips special characters and collapses whitespace runs, then trims.
fn clean_text(text: &str) -> String {
    let stripped = SPECIAL_CHARS.replace_all(text, "");
    WHITESPACE_RUNS.replace_all(&stripped, " ").trim().to_string()
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Drops the brand from the front of the product name when present, so
/// "Nike Air Max" under brand "Nike" catalogs as "Air Max".
fn strip_brand_prefix<'a>(name: &'a str, brand: &str) -> &'a str {
    if brand.is_empty() {
        return name;
    }
    match name.get(..brand.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(brand) => name[brand.len()..].trim_start(),
        _ => name,
    }
}

fn required_text(raw: &RawRecord, column: &'static str) -> Result<String, RejectReason> {
    match raw.get(column).map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(RejectReason::MissingField(column)),
    }
}

fn optional_text(raw: &RawRecord, column: &str) -> String {
    raw.get(column).map(str::trim).unwrap_or_default().to_string()
}

fn required_f64(raw: &RawRecord, column: &'static str) -> Result<f64, RejectReason> {
    let text = required_text(raw, column)?;
    parse_f64(&text, column)
}

/// Optional numeric field: absent or empty takes the default, but a value
/// that is present and unparsable still rejects the record.
fn optional_f64(raw: &RawRecord, column: &'static str, default: f64) -> Result<f64, RejectReason> {
    match raw.get(column).map(str::trim) {
        None | Some("") => Ok(default),
        Some(text) => parse_f64(text, column),
    }
}

fn optional_i32(raw: &RawRecord, column: &'static str, default: i32) -> Result<i32, RejectReason> {
    let text = match raw.get(column).map(str::trim) {
        None | Some("") => return Ok(default),
        Some(text) => text,
    };
    let reject = || RejectReason::UnparsableNumber {
        field: column,
        value: text.to_string(),
    };
    let value: i32 = text.parse().map_err(|_| reject())?;
    // A negative count is junk data, same as a negative price.
    if value < 0 {
        return Err(reject());
    }
    Ok(value)
}

fn parse_f64(text: &str, column: &'static str) -> Result<f64, RejectReason> {
    let reject = || RejectReason::UnparsableNumber {
        field: column,
        value: text.to_string(),
    };
    let value: f64 = text.parse().map_err(|_| reject())?;
    // NaN, infinities and negative prices/ratings are junk data, not values.
    if !value.is_finite() || value < 0.0 {
        return Err(reject());
    }
    Ok(value)
}

/// Maps one raw row to a normalized product, or a reason it was dropped.
///
/// Rejections are per-record: the caller counts them and moves on. The run
/// only fails on structural problems upstream of this function.
pub fn normalize(raw: &RawRecord) -> Result<Product, RejectReason> {
    let product_id = required_text(raw, columns::PRODUCT_ID)?;
    let name_raw = required_text(raw, columns::NAME)?;
    let price = required_f64(raw, columns::PRICE)?;
    let rating = optional_f64(raw, columns::RATING, 0.0)?;
    let num_images = optional_i32(raw, columns::NUM_IMAGES, 0)?;

    let brand_raw = optional_text(raw, columns::BRAND);
    let brand = clean_text(&title_case(&brand_raw));
    let name = clean_text(&strip_brand_prefix(&name_raw, &brand_raw).to_lowercase());
    if name.is_empty() {
        // Cleaning can hollow out a name that was only punctuation.
        return Err(RejectReason::MissingField(columns::NAME));
    }

    let primary_color = match optional_text(raw, columns::PRIMARY_COLOR).to_lowercase() {
        color if color.is_empty() => "unknown".to_string(),
        color => color,
    };

    Ok(Product {
        product_id,
        name,
        brand,
        gender: optional_text(raw, columns::GENDER).to_lowercase(),
        price,
        rating,
        num_images,
        description: clean_text(&optional_text(raw, columns::DESCRIPTION)),
        primary_color,
        price_category: None,
    })
}

/// Linear-interpolated quantile over an ascending-sorted slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    sorted[lower] + (position - lower as f64) * (sorted[upper] - sorted[lower])
}

/// Tags every product Low/Medium/High against the 0.33 and 0.66 price
/// quantiles of this run. Fewer than two products leaves the tags unset since
/// a distribution of one price has no meaningful tiers.
pub fn categorize_prices(products: &mut [Product]) {
    if products.len() < 2 {
        return;
    }

    let mut prices: Vec<f64> = products.iter().map(|p| p.price).collect();
    prices.sort_by(|a, b| a.partial_cmp(b).expect("prices are validated finite"));

    let low_threshold = quantile(&prices, 0.33);
    let high_threshold = quantile(&prices, 0.66);

    for product in products {
        product.price_category = Some(if product.price <= low_threshold {
            PriceCategory::Low
        } else if product.price <= high_threshold {
            PriceCategory::Medium
        } else {
            PriceCategory::High
        });
    }
}
