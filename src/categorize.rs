//! Keyword fallback classifier.
//!
//! The pipeline normally trusts the category resolved upstream; this module
//! is the deterministic fallback for transactions that arrive unclassified.
//! Priority: merchant keywords > ATM/cash detection > small-UPI heuristic >
//! misc.

use crate::schema::ExpenseCategory;

const MERCHANT_KEYWORDS: &[(ExpenseCategory, &[&str])] = &[
    (
        ExpenseCategory::Fuel,
        &["hpcl", "bpcl", "ioc", "indianoil", "petrol", "diesel", "fuel"],
    ),
    (
        ExpenseCategory::Food,
        &["zomato", "swiggy", "restaurant", "hotel", "dining", "food", "dominos"],
    ),
    (
        ExpenseCategory::Shopping,
        &["amazon", "flipkart", "myntra", "store", "bazaar", "mall"],
    ),
    (
        ExpenseCategory::Travel,
        &["ola", "uber", "rapido", "irctc", "meru"],
    ),
    (
        ExpenseCategory::Phone,
        &["jio", "airtel", "vi", "vodafone", "recharge"],
    ),
    (
        ExpenseCategory::Rent,
        &["rent", "lease", "emi", "mortgage"],
    ),
];

const INCOME_KEYWORDS: &[&str] = &[
    "payout",
    "settlement",
    "earning",
    "bonus",
    "incentive",
    "salary",
];

/// Small UPI debits with no merchant match are overwhelmingly food spends.
const SMALL_UPI_FOOD_LIMIT: f64 = 250.0;

/// Lowercase and strip everything outside `[a-z0-9 @-/]`, collapsing runs of
/// whitespace, so keyword matching is insensitive to bank formatting noise.
pub fn normalize_narration(narration: &str) -> String {
    let lowered = narration.to_lowercase();
    let cleaned: String = lowered
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '@' | '-' | '/') {
                c
            } else {
                ' '
            }
        })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Bucket an expense narration into the fixed taxonomy.
/// `amount` is the absolute transaction magnitude.
pub fn categorize_expense(narration: &str, amount: f64) -> ExpenseCategory {
    let narr = normalize_narration(narration);

    for (category, keywords) in MERCHANT_KEYWORDS {
        if keywords.iter().any(|k| narr.contains(k)) {
            return *category;
        }
    }

    if narr.contains("atm") || narr.contains("cash") {
        return ExpenseCategory::Cash;
    }

    if narr.contains("upi") && amount <= SMALL_UPI_FOOD_LIMIT {
        return ExpenseCategory::Food;
    }

    ExpenseCategory::Misc
}

/// Income detection fallback for histories without upstream classification.
pub fn looks_like_income(narration: &str) -> bool {
    let narr = normalize_narration(narration);
    INCOME_KEYWORDS.iter().any(|k| narr.contains(k))
}
