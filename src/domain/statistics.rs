use std::collections::HashMap;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;

use super::order::{DishType, OrderStatus, PaymentMethod};

pub const DEFAULT_RANGE_DAYS: i64 = 30;
pub const TOP_DISHES: usize = 10;
pub const MAX_RANGE_DAYS: i64 = 366;

/// An order as seen by the statistics page.
#[derive(Debug, Clone)]
pub struct OrderFact{
    pub status: OrderStatus,
    pub total_amount: i64,
    pub payment_method: PaymentMethod,
    pub customer_name: Option<String>,
    pub order_time: NaiveDateTime
}

/// A line of a completed order, joined with its dish.
#[derive(Debug, Clone)]
pub struct ItemFact{
    pub dish_name: String,
    pub dish_type: DishType,
    pub quantity: i32,
    pub price: i32
}

#[derive(Debug, Serialize, PartialEq)]
pub struct DailyPoint{
    pub date: NaiveDate,
    pub revenue: i64,
    pub orders: usize
}

#[derive(Debug, Serialize, PartialEq)]
pub struct TopDish{
    pub name: String,
    pub quantity_sold: i64,
    pub revenue: i64,
    pub percentage: f64
}

#[derive(Debug, Serialize, PartialEq)]
pub struct RecurringCustomer{
    pub name: String,
    pub order_count: usize,
    pub total_spent: i64,
    pub last_visit: NaiveDateTime
}

#[derive(Debug, Serialize, Default, PartialEq)]
pub struct Breakdown{
    pub salty: i64,
    pub sweet: i64,
    pub drink: i64
}

#[derive(Debug, Serialize, Default, PartialEq)]
pub struct PaymentBreakdown{
    pub cash: usize,
    pub card: usize,
    pub online: usize
}

#[derive(Debug, Serialize)]
pub struct StatsReport{
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub orders_count: usize,
    pub revenue: i64,
    pub avg_order_value: i64,
    pub reservations_count: i64,
    pub occupancy_rate: i32,
    pub daily: Vec<DailyPoint>,
    pub revenue_by_dish_type: Breakdown,
    pub payment_methods: PaymentBreakdown,
    pub top_dishes: Vec<TopDish>,
    pub recurring_customers: Vec<RecurringCustomer>
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("the report covers at most {} days", MAX_RANGE_DAYS)]
pub struct RangeTooLong;

// Requested bounds, falling back to the last 30 days
pub fn resolve_range(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    today: NaiveDate
) -> Result<(NaiveDate, NaiveDate), RangeTooLong>{
    let end = to.unwrap_or(today);
    let start = from.unwrap_or_else(|| {
        end.checked_sub_signed(Duration::days(DEFAULT_RANGE_DAYS)).unwrap_or(NaiveDate::MIN)
    });
    let (start, end) = if start > end { (end, start) } else { (start, end) };

    if (end - start).num_days() >= MAX_RANGE_DAYS {
        return Err(RangeTooLong)
    }

    Ok((start, end))
}

/// Average party size over capacity, as a whole percentage capped at 100.
pub fn occupancy_rate(party_sizes: &[i32], capacity: i32) -> i32{
    if party_sizes.is_empty() || capacity <= 0 {
        return 0
    }

    let total: i64 = party_sizes.iter().map(|g| *g as i64).sum();
    let average = total as f64 / party_sizes.len() as f64;
    let rate = (average / capacity as f64 * 100.0) as i32;

    rate.min(100)
}

pub fn top_dishes(items: &[ItemFact]) -> Vec<TopDish>{
    let mut by_name: HashMap<&str, (i64, i64)> = HashMap::new();

    for item in items {
        let entry = by_name.entry(item.dish_name.as_str()).or_default();
        entry.0 += item.quantity as i64;
        entry.1 += item.quantity as i64 * item.price as i64;
    }

    let mut ranked: Vec<(&str, i64, i64)> = by_name.into_iter()
        .map(|(name, (quantity, revenue))| (name, quantity, revenue))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.truncate(TOP_DISHES);

    let total_revenue: i64 = ranked.iter().map(|r| r.2).sum();

    ranked.into_iter()
        .map(|(name, quantity_sold, revenue)| {
            let percentage = if total_revenue > 0 {
                (revenue as f64 / total_revenue as f64 * 1000.0).round() / 10.0
            } else {
                0.0
            };

            TopDish{
                name: name.to_string(),
                quantity_sold,
                revenue,
                percentage
            }
        })
        .collect()
}

fn recurring_customers(orders: &[OrderFact]) -> Vec<RecurringCustomer>{
    let mut by_name: HashMap<&str, RecurringCustomer> = HashMap::new();

    for order in orders {
        let Some(name) = order.customer_name.as_deref().filter(|n| !n.trim().is_empty()) else {
            continue
        };

        let entry = by_name.entry(name).or_insert_with(|| RecurringCustomer{
            name: name.to_string(),
            order_count: 0,
            total_spent: 0,
            last_visit: order.order_time
        });
        entry.order_count += 1;
        entry.total_spent += order.total_amount;
        entry.last_visit = entry.last_visit.max(order.order_time);
    }

    let mut customers: Vec<RecurringCustomer> = by_name.into_values()
        .filter(|c| c.order_count > 1)
        .collect();
    customers.sort_by(|a, b| b.order_count.cmp(&a.order_count).then_with(|| a.name.cmp(&b.name)));
    customers.truncate(10);
    customers
}

/// Builds the statistics page for one restaurant.
///
/// `orders` are the orders placed in `[start, end]`, `items` the lines of the
/// completed ones among them.
pub fn build_report(
    start: NaiveDate,
    end: NaiveDate,
    orders: &[OrderFact],
    items: &[ItemFact],
    reservations_count: i64,
    occupancy_rate: i32
) -> StatsReport{
    let revenue: i64 = orders.iter()
        .filter(|o| o.status.is_completed())
        .map(|o| o.total_amount)
        .sum();

    let avg_order_value = if orders.is_empty() {
        0
    } else {
        revenue / orders.len() as i64
    };

    let mut daily = Vec::new();
    for day in start.iter_days().take_while(|day| *day <= end) {
        let on_day = orders.iter().filter(|o| o.order_time.date() == day);
        daily.push(DailyPoint{
            date: day,
            revenue: on_day.clone()
                .filter(|o| o.status.is_completed())
                .map(|o| o.total_amount)
                .sum(),
            orders: on_day.count()
        });
    }

    let mut by_type = Breakdown::default();
    for item in items {
        let amount = item.price as i64 * item.quantity as i64;
        match item.dish_type {
            DishType::Salty => by_type.salty += amount,
            DishType::Sweet => by_type.sweet += amount,
            DishType::Drink => by_type.drink += amount
        }
    }

    let mut payments = PaymentBreakdown::default();
    for order in orders {
        match order.payment_method {
            PaymentMethod::Cash => payments.cash += 1,
            PaymentMethod::Card => payments.card += 1,
            PaymentMethod::Online => payments.online += 1
        }
    }

    StatsReport{
        start_date: start,
        end_date: end,
        orders_count: orders.len(),
        revenue,
        avg_order_value,
        reservations_count,
        occupancy_rate,
        daily,
        revenue_by_dish_type: by_type,
        payment_methods: payments,
        top_dishes: top_dishes(items),
        recurring_customers: recurring_customers(orders)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn order(status: OrderStatus, total: i64, customer: &str, at: &str) -> OrderFact {
        OrderFact{
            status,
            total_amount: total,
            payment_method: PaymentMethod::Cash,
            customer_name: Some(customer.to_string()),
            order_time: NaiveDateTime::parse_from_str(at, "%Y-%m-%d %H:%M").unwrap()
        }
    }

    fn item(name: &str, quantity: i32, price: i32) -> ItemFact {
        ItemFact{
            dish_name: name.to_string(),
            dish_type: DishType::Salty,
            quantity,
            price
        }
    }

    #[test]
    fn occupancy_is_capped_at_one_hundred(){
        assert_eq!(occupancy_rate(&[4, 6], 10), 50);
        assert_eq!(occupancy_rate(&[30], 10), 100);
        assert_eq!(occupancy_rate(&[], 10), 0);
        assert_eq!(occupancy_rate(&[4], 0), 0);
    }

    #[test]
    fn default_range_is_last_thirty_days(){
        let (start, end) = resolve_range(None, None, day("2024-06-30")).unwrap();
        assert_eq!(start, day("2024-05-31"));
        assert_eq!(end, day("2024-06-30"));
    }

    #[test]
    fn inverted_range_is_swapped(){
        let (start, end) = resolve_range(Some(day("2024-06-10")), Some(day("2024-06-01")), day("2024-06-30")).unwrap();
        assert_eq!((start, end), (day("2024-06-01"), day("2024-06-10")));
    }

    #[test]
    fn range_is_limited_to_a_year(){
        assert_eq!(
            resolve_range(Some(day("2024-01-01")), Some(day("2024-12-31")), day("2024-12-31")),
            Ok((day("2024-01-01"), day("2024-12-31")))
        );
        assert_eq!(
            resolve_range(Some(day("2024-01-01")), Some(day("2025-01-01")), day("2024-12-31")),
            Err(RangeTooLong)
        );
        assert_eq!(
            resolve_range(Some(NaiveDate::MIN), Some(NaiveDate::MAX), day("2024-12-31")),
            Err(RangeTooLong)
        );
        assert_eq!(resolve_range(Some(day("2000-01-01")), None, day("2024-12-31")), Err(RangeTooLong));
    }

    #[test]
    fn revenue_counts_only_delivered_and_paid(){
        let orders = vec![
            order(OrderStatus::Delivered, 1000, "Amine", "2024-06-01 12:00"),
            order(OrderStatus::Paid, 2000, "Amine", "2024-06-02 12:00"),
            order(OrderStatus::New, 5000, "Sara", "2024-06-02 13:00")
        ];

        let report = build_report(day("2024-06-01"), day("2024-06-03"), &orders, &[], 4, 20);

        assert_eq!(report.revenue, 3000);
        assert_eq!(report.orders_count, 3);
        assert_eq!(report.avg_order_value, 1000);
        assert_eq!(report.daily.len(), 3);
        assert_eq!(report.daily[1], DailyPoint{ date: day("2024-06-02"), revenue: 2000, orders: 2 });
        assert_eq!(report.payment_methods.cash, 3);
        assert_eq!(report.recurring_customers.len(), 1);
        assert_eq!(report.recurring_customers[0].total_spent, 3000);
    }

    #[test]
    fn top_dishes_rank_by_quantity_with_revenue_share(){
        let items = vec![
            item("Tajine", 2, 1099),
            item("Harira", 5, 599),
            item("Tajine", 1, 1099),
        ];

        let top = top_dishes(&items);

        assert_eq!(top[0].name, "Harira");
        assert_eq!(top[0].quantity_sold, 5);
        assert_eq!(top[1].revenue, 3297);
        let share: f64 = top.iter().map(|d| d.percentage).sum();
        assert!((share - 100.0).abs() < 0.2);
    }

    #[test]
    fn only_ten_dishes_are_ranked(){
        let items: Vec<ItemFact> = (0..15)
            .map(|i| item(&format!("dish {}", i), i + 1, 599))
            .collect();
        assert_eq!(top_dishes(&items).len(), TOP_DISHES);
    }
}
