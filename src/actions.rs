//! Action Recommender: turns a [`FinancialInsight`] into a small set of
//! rule-driven action cards, each carrying display hints and a validity
//! window so a client can schedule and expire them.

use crate::schema::{
    ActionCard, CardType, FinancialInsight, Priority, RiskLevel, SavingsConsistency,
};
use chrono::{Days, NaiveDate};
use log::debug;

const URGENT_SHORTFALL_DAYS: u32 = 3;
const LOW_SAVINGS_RATE_PCT: f64 = 10.0;
const GOOD_SAVINGS_RATE_PCT: f64 = 15.0;
const TOP_CATEGORY_INCOME_SHARE_PCT: f64 = 30.0;
const UNNECESSARY_SPEND_FLOOR: f64 = 1000.0;
const LOW_BALANCE_DAY_LIMIT: u32 = 5;

fn add_days(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_add_days(Days::new(days)).unwrap_or(date)
}

/// Generate the card set for one insight snapshot. Cards come back sorted
/// urgent-first; the set may be empty for an unremarkable month.
pub fn generate_action_cards(insight: &FinancialInsight, today: NaiveDate) -> Vec<ActionCard> {
    let mut cards = Vec::new();

    if let Some(card) = shortfall_card(insight, today) {
        cards.push(card);
    }
    if let Some(card) = savings_card(insight, today) {
        cards.push(card);
    }
    if let Some(card) = top_category_card(insight, today) {
        cards.push(card);
    }
    if let Some(card) = delay_purchase_card(insight, today) {
        cards.push(card);
    }
    if let Some(card) = milestone_card(insight, today) {
        cards.push(card);
    }
    if let Some(card) = emergency_card(insight, today) {
        cards.push(card);
    }

    cards.sort_by_key(|c| std::cmp::Reverse(c.priority.rank()));
    debug!("generated {} action cards for {}", cards.len(), today);
    cards
}

/// Predicted deficit inside the forecast horizon.
fn shortfall_card(insight: &FinancialInsight, today: NaiveDate) -> Option<ActionCard> {
    if insight.predicted_shortfall_days == 0 {
        return None;
    }
    let deficit_date = insight.next_low_balance_date?;
    if deficit_date < today {
        return None;
    }
    let days_until = (deficit_date - today).num_days() as u32;
    let urgent = days_until <= URGENT_SHORTFALL_DAYS;

    Some(ActionCard {
        card_type: CardType::EmergencyAlert,
        priority: if urgent { Priority::Urgent } else { Priority::High },
        category: "risk".to_string(),
        title: "Low Balance Alert".to_string(),
        message: format!(
            "Your balance may run short in {} days. Expected shortfall around Rs.{:.0}.",
            days_until, insight.predicted_shortfall_amount
        ),
        message_hindi: Some(format!(
            "{} दिनों में बैलेंस कम हो सकता है। लगभग ₹{:.0} की कमी का अनुमान है।",
            days_until, insight.predicted_shortfall_amount
        )),
        icon: "⚠️".to_string(),
        color: "red".to_string(),
        action_type: "prepare_emergency".to_string(),
        action_amount: Some(insight.predicted_shortfall_amount),
        action_category: None,
        action_description: Some("Arrange funds before the shortfall window".to_string()),
        expected_savings: Some(insight.predicted_shortfall_amount),
        expected_impact_days: Some(days_until),
        impact_description: Some(format!(
            "Covers the predicted gap on {}",
            deficit_date
        )),
        valid_from: today,
        valid_until: add_days(today, u64::from(days_until.max(1))),
        is_urgent: urgent,
        days_until_impact: Some(days_until),
    })
}

/// Nudge toward a small daily saving when the rate is below target.
fn savings_card(insight: &FinancialInsight, today: NaiveDate) -> Option<ActionCard> {
    if insight.savings_rate >= LOW_SAVINGS_RATE_PCT || insight.avg_daily_income <= 0.0 {
        return None;
    }
    let amount = insight.recommended_daily_savings;

    Some(ActionCard {
        card_type: CardType::SaveNow,
        priority: if insight.savings_rate <= 0.0 {
            Priority::High
        } else {
            Priority::Medium
        },
        category: "savings".to_string(),
        title: "Start a Daily Savings Habit".to_string(),
        message: format!(
            "Save just Rs.{:.0} daily to build your safety net.",
            amount
        ),
        message_hindi: Some(format!(
            "रोज़ सिर्फ ₹{:.0} बचाएं, सुरक्षित भविष्य पाएं।",
            amount
        )),
        icon: "💰".to_string(),
        color: "green".to_string(),
        action_type: "save_amount".to_string(),
        action_amount: Some(amount),
        action_category: None,
        action_description: Some("Set aside this amount every day".to_string()),
        expected_savings: Some(amount * 30.0),
        expected_impact_days: Some(30),
        impact_description: Some(format!(
            "Rs.{:.0} saved in a month at this pace",
            amount * 30.0
        )),
        valid_from: today,
        valid_until: add_days(today, 7),
        is_urgent: false,
        days_until_impact: None,
    })
}

/// The top expense category is eating too large a share of income.
fn top_category_card(insight: &FinancialInsight, today: NaiveDate) -> Option<ActionCard> {
    let category = insight.top_expense_category?;
    if insight.avg_daily_income <= 0.0 {
        return None;
    }
    let monthly_income = insight.avg_daily_income * 30.0;
    let income_share = insight.top_expense_category_amount / monthly_income * 100.0;
    if income_share <= TOP_CATEGORY_INCOME_SHARE_PCT {
        return None;
    }
    let target_cut = insight.top_expense_category_amount * 0.2;

    Some(ActionCard {
        card_type: CardType::ReduceExpense,
        priority: Priority::Medium,
        category: "expense".to_string(),
        title: format!("Trim Your {} Spending", category),
        message: format!(
            "{} took {:.0}% of your income. Cutting 20% frees Rs.{:.0}.",
            category, income_share, target_cut
        ),
        message_hindi: Some(format!(
            "{} पर खर्च आय का {:.0}% है। 20% कम करके ₹{:.0} बचाएं।",
            category, income_share, target_cut
        )),
        icon: "🎯".to_string(),
        color: "yellow".to_string(),
        action_type: "reduce_category_spend".to_string(),
        action_amount: Some(target_cut),
        action_category: Some(category),
        action_description: Some(format!("Reduce {} spend by 20%", category)),
        expected_savings: Some(target_cut),
        expected_impact_days: Some(30),
        impact_description: None,
        valid_from: today,
        valid_until: add_days(today, 30),
        is_urgent: false,
        days_until_impact: None,
    })
}

/// Large discretionary purchases worth deferring.
fn delay_purchase_card(insight: &FinancialInsight, today: NaiveDate) -> Option<ActionCard> {
    if insight.unnecessary_spending_amount <= UNNECESSARY_SPEND_FLOOR {
        return None;
    }
    let amount = insight.unnecessary_spending_amount;

    Some(ActionCard {
        card_type: CardType::DelayPurchase,
        priority: Priority::Medium,
        category: "expense".to_string(),
        title: "Delay Big Purchases".to_string(),
        message: format!(
            "Rs.{:.0} went to large discretionary buys this month. Skipping half saves Rs.{:.0}.",
            amount,
            amount * 0.5
        ),
        message_hindi: Some(format!(
            "बड़ी गैर-ज़रूरी खरीदारी पर ₹{:.0} खर्च हुए। आधी टालकर ₹{:.0} बचाएं।",
            amount,
            amount * 0.5
        )),
        icon: "🛑".to_string(),
        color: "orange".to_string(),
        action_type: "skip_purchase".to_string(),
        action_amount: Some(amount),
        action_category: None,
        action_description: Some("Defer non-essential high-value purchases".to_string()),
        expected_savings: Some(amount * 0.5),
        expected_impact_days: Some(30),
        impact_description: None,
        valid_from: today,
        valid_until: add_days(today, 30),
        is_urgent: false,
        days_until_impact: None,
    })
}

/// Positive reinforcement when the month went well.
fn milestone_card(insight: &FinancialInsight, today: NaiveDate) -> Option<ActionCard> {
    if insight.savings_rate > GOOD_SAVINGS_RATE_PCT {
        return Some(ActionCard {
            card_type: CardType::MilestoneAchieved,
            priority: Priority::Low,
            category: "goal".to_string(),
            title: "Great Savings Month".to_string(),
            message: format!(
                "You saved {:.1}% of your income. Keep the habit going!",
                insight.savings_rate
            ),
            message_hindi: Some(format!(
                "आपने आय का {:.1}% बचाया। ऐसे ही जारी रखें!",
                insight.savings_rate
            )),
            icon: "🎉".to_string(),
            color: "green".to_string(),
            action_type: "continue_habit".to_string(),
            action_amount: None,
            action_category: None,
            action_description: None,
            expected_savings: None,
            expected_impact_days: None,
            impact_description: None,
            valid_from: today,
            valid_until: add_days(today, 7),
            is_urgent: false,
            days_until_impact: None,
        });
    }

    if insight.savings_consistency == SavingsConsistency::Often {
        return Some(ActionCard {
            card_type: CardType::MilestoneAchieved,
            priority: Priority::Low,
            category: "goal".to_string(),
            title: "Almost There".to_string(),
            message: "You saved on most days. A few more and it becomes a streak.".to_string(),
            message_hindi: Some(
                "आपने ज़्यादातर दिनों में बचत की। थोड़ी और नियमितता से आदत बन जाएगी।".to_string(),
            ),
            icon: "👍".to_string(),
            color: "blue".to_string(),
            action_type: "improve_consistency".to_string(),
            action_amount: None,
            action_category: None,
            action_description: None,
            expected_savings: None,
            expected_impact_days: None,
            impact_description: None,
            valid_from: today,
            valid_until: add_days(today, 7),
            is_urgent: false,
            days_until_impact: None,
        });
    }

    None
}

/// Balance-driven alerts, independent of the forecast.
fn emergency_card(insight: &FinancialInsight, today: NaiveDate) -> Option<ActionCard> {
    if insight.cash_crunch_risk == RiskLevel::Critical {
        return Some(ActionCard {
            card_type: CardType::EmergencyAlert,
            priority: Priority::Urgent,
            category: "risk".to_string(),
            title: "Critical Balance Warning".to_string(),
            message: format!(
                "Your balance dropped to Rs.{:.0}. Review spending immediately.",
                insight.lowest_balance
            ),
            message_hindi: Some(format!(
                "बैलेंस ₹{:.0} तक गिर गया। तुरंत खर्च की समीक्षा करें।",
                insight.lowest_balance
            )),
            icon: "🚨".to_string(),
            color: "red".to_string(),
            action_type: "emergency_review".to_string(),
            action_amount: None,
            action_category: None,
            action_description: Some("Pause non-essential spending today".to_string()),
            expected_savings: None,
            expected_impact_days: None,
            impact_description: None,
            valid_from: today,
            valid_until: add_days(today, 3),
            is_urgent: true,
            days_until_impact: None,
        });
    }

    if insight.days_with_low_balance > LOW_BALANCE_DAY_LIMIT {
        return Some(ActionCard {
            card_type: CardType::EmergencyAlert,
            priority: Priority::High,
            category: "risk".to_string(),
            title: "Build a Balance Buffer".to_string(),
            message: format!(
                "Your balance was low on {} days this month. A small buffer prevents surprises.",
                insight.days_with_low_balance
            ),
            message_hindi: Some(format!(
                "इस महीने {} दिन बैलेंस कम रहा। छोटा बफर बनाकर रखें।",
                insight.days_with_low_balance
            )),
            icon: "⚠️".to_string(),
            color: "red".to_string(),
            action_type: "build_buffer".to_string(),
            action_amount: Some(insight.recommended_emergency_fund),
            action_category: None,
            action_description: Some("Work toward a one-month emergency buffer".to_string()),
            expected_savings: None,
            expected_impact_days: None,
            impact_description: None,
            valid_from: today,
            valid_until: add_days(today, 7),
            is_urgent: false,
            days_until_impact: None,
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insight::tests_support::blank_insight;
    use crate::schema::ExpenseCategory;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn test_good_month_yields_milestone_only() {
        let mut insight = blank_insight();
        insight.savings_rate = 25.0;
        insight.predicted_shortfall_days = 0;
        insight.next_low_balance_date = None;

        let cards = generate_action_cards(&insight, today());
        assert!(cards
            .iter()
            .any(|c| c.card_type == CardType::MilestoneAchieved));
        assert!(!cards
            .iter()
            .any(|c| c.card_type == CardType::EmergencyAlert));
        assert!(!cards.iter().any(|c| c.card_type == CardType::SaveNow));
    }

    #[test]
    fn test_imminent_shortfall_is_urgent() {
        let mut insight = blank_insight();
        insight.predicted_shortfall_days = 4;
        insight.predicted_shortfall_amount = 850.0;
        insight.next_low_balance_date = Some(today().checked_add_days(Days::new(2)).unwrap());

        let cards = generate_action_cards(&insight, today());
        let alert = cards
            .iter()
            .find(|c| c.action_type == "prepare_emergency")
            .unwrap();
        assert_eq!(alert.priority, Priority::Urgent);
        assert!(alert.is_urgent);
        assert_eq!(alert.days_until_impact, Some(2));
        assert_eq!(alert.valid_until, today().checked_add_days(Days::new(2)).unwrap());
        // urgent cards sort first
        assert_eq!(cards[0].action_type, "prepare_emergency");
    }

    #[test]
    fn test_distant_shortfall_is_high_not_urgent() {
        let mut insight = blank_insight();
        insight.predicted_shortfall_days = 2;
        insight.next_low_balance_date = Some(today().checked_add_days(Days::new(10)).unwrap());

        let cards = generate_action_cards(&insight, today());
        let alert = cards
            .iter()
            .find(|c| c.action_type == "prepare_emergency")
            .unwrap();
        assert_eq!(alert.priority, Priority::High);
        assert!(!alert.is_urgent);
    }

    #[test]
    fn test_low_savings_rate_prompts_save_card() {
        let mut insight = blank_insight();
        insight.savings_rate = 4.0;
        insight.recommended_daily_savings = 100.0;

        let cards = generate_action_cards(&insight, today());
        let card = cards
            .iter()
            .find(|c| c.card_type == CardType::SaveNow)
            .unwrap();
        assert_eq!(card.priority, Priority::Medium);
        assert_eq!(card.action_amount, Some(100.0));
        assert_eq!(card.expected_savings, Some(3000.0));
        assert!(card.message_hindi.is_some());
    }

    #[test]
    fn test_zero_savings_rate_escalates_priority() {
        let mut insight = blank_insight();
        insight.savings_rate = 0.0;

        let cards = generate_action_cards(&insight, today());
        let card = cards
            .iter()
            .find(|c| c.card_type == CardType::SaveNow)
            .unwrap();
        assert_eq!(card.priority, Priority::High);
    }

    #[test]
    fn test_dominant_category_triggers_reduce_card() {
        let mut insight = blank_insight();
        insight.avg_daily_income = 1000.0;
        insight.top_expense_category = Some(ExpenseCategory::Food);
        // 12000 over a 30000 monthly income = 40% share
        insight.top_expense_category_amount = 12_000.0;

        let cards = generate_action_cards(&insight, today());
        let card = cards
            .iter()
            .find(|c| c.card_type == CardType::ReduceExpense)
            .unwrap();
        assert_eq!(card.action_category, Some(ExpenseCategory::Food));
        assert_eq!(card.action_amount, Some(2400.0));
    }

    #[test]
    fn test_modest_category_share_no_reduce_card() {
        let mut insight = blank_insight();
        insight.avg_daily_income = 1000.0;
        insight.top_expense_category = Some(ExpenseCategory::Food);
        insight.top_expense_category_amount = 6000.0; // 20% share

        let cards = generate_action_cards(&insight, today());
        assert!(!cards.iter().any(|c| c.card_type == CardType::ReduceExpense));
    }

    #[test]
    fn test_unnecessary_spend_triggers_delay_card() {
        let mut insight = blank_insight();
        insight.unnecessary_spending_amount = 4000.0;

        let cards = generate_action_cards(&insight, today());
        let card = cards
            .iter()
            .find(|c| c.card_type == CardType::DelayPurchase)
            .unwrap();
        assert_eq!(card.expected_savings, Some(2000.0));
    }

    #[test]
    fn test_critical_crunch_emergency_card() {
        let mut insight = blank_insight();
        insight.cash_crunch_risk = RiskLevel::Critical;
        insight.lowest_balance = 120.0;

        let cards = generate_action_cards(&insight, today());
        let card = cards
            .iter()
            .find(|c| c.action_type == "emergency_review")
            .unwrap();
        assert_eq!(card.priority, Priority::Urgent);
        assert!(card.is_urgent);
        assert_eq!(card.valid_until, today().checked_add_days(Days::new(3)).unwrap());
    }

    #[test]
    fn test_chronic_low_balance_buffer_card() {
        let mut insight = blank_insight();
        insight.cash_crunch_risk = RiskLevel::High;
        insight.days_with_low_balance = 9;

        let cards = generate_action_cards(&insight, today());
        let card = cards
            .iter()
            .find(|c| c.action_type == "build_buffer")
            .unwrap();
        assert_eq!(card.priority, Priority::High);
        assert!(!card.is_urgent);
    }

    #[test]
    fn test_often_consistency_gets_encouragement() {
        let mut insight = blank_insight();
        insight.savings_rate = 12.0;
        insight.savings_consistency = SavingsConsistency::Often;

        let cards = generate_action_cards(&insight, today());
        let card = cards
            .iter()
            .find(|c| c.card_type == CardType::MilestoneAchieved)
            .unwrap();
        assert_eq!(card.action_type, "improve_consistency");
    }

    #[test]
    fn test_stale_deficit_date_skips_card() {
        let mut insight = blank_insight();
        insight.predicted_shortfall_days = 1;
        insight.next_low_balance_date = Some(NaiveDate::from_ymd_opt(2024, 5, 20).unwrap());

        let cards = generate_action_cards(&insight, today());
        assert!(!cards.iter().any(|c| c.action_type == "prepare_emergency"));
    }
}
