use anyhow::Context;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use diesel::{dsl::count_star, ExpressionMethods, QueryDsl, RunQueryDsl};
use uuid::Uuid;

use crate::{
    domain::{
        order::{completed_statuses, DishType, OrderStatus, PaymentMethod},
        reservation::ReservationStatus,
        statistics::{build_report, occupancy_rate, ItemFact, OrderFact, StatsReport, DEFAULT_RANGE_DAYS}
    },
    schema::{dishes, order_items, orders, reservations, restaurants},
    telemetry::spawn_blocking_with_tracing,
    utils::{BusinessClock, DbConnection}
};

/// Loads the facts of one restaurant for `[start, end]` (local dates) and
/// builds its statistics report.
#[tracing::instrument(
    "Computing restaurant statistics",
    skip(conn, clock)
)]
pub async fn get_statistics(
    mut conn: DbConnection,
    restaurant_id: Uuid,
    start: NaiveDate,
    end: NaiveDate,
    clock: BusinessClock
) -> Result<StatsReport, anyhow::Error>{
    spawn_blocking_with_tracing(move || -> Result<StatsReport, anyhow::Error> {
        let (from, _) = clock.day_bounds(start);
        let (_, until) = clock.day_bounds(end);

        let rows: Vec<(String, i64, String, Option<String>, DateTime<Utc>)> = orders::table
            .filter(orders::restaurant_id.eq(restaurant_id))
            .filter(orders::order_time.ge(from))
            .filter(orders::order_time.lt(until))
            .select((
                orders::status,
                orders::total_amount,
                orders::payment_method,
                orders::customer_name,
                orders::order_time
            ))
            .load(&mut conn)
            .context("Failed to load orders")?;

        let order_facts: Vec<OrderFact> = rows.into_iter()
            .filter_map(|(status, total_amount, payment_method, customer_name, order_time)| {
                Some(OrderFact{
                    status: OrderStatus::parse(&status)?,
                    total_amount,
                    payment_method: PaymentMethod::parse(&payment_method).unwrap_or_default(),
                    customer_name,
                    order_time: clock.local(order_time)
                })
            })
            .collect();

        let item_rows: Vec<(String, String, i32, i32)> = order_items::table
            .inner_join(orders::table)
            .inner_join(dishes::table)
            .filter(orders::restaurant_id.eq(restaurant_id))
            .filter(orders::order_time.ge(from))
            .filter(orders::order_time.lt(until))
            .filter(orders::status.eq_any(completed_statuses()))
            .select((dishes::name, dishes::dish_type, order_items::quantity, order_items::price))
            .load(&mut conn)
            .context("Failed to load order items")?;

        let item_facts: Vec<ItemFact> = item_rows.into_iter()
            .filter_map(|(dish_name, dish_type, quantity, price)| {
                Some(ItemFact{
                    dish_name,
                    dish_type: DishType::parse(&dish_type)?,
                    quantity,
                    price
                })
            })
            .collect();

        let reservations_count = reservations::table
            .filter(reservations::restaurant_id.eq(restaurant_id))
            .filter(reservations::reservation_date.ge(start))
            .filter(reservations::reservation_date.le(end))
            .select(count_star())
            .first::<i64>(&mut conn)
            .context("Failed to count reservations")?;

        // Occupancy always looks at the last 30 days, whatever the range
        let today = clock.today();
        let party_sizes: Vec<i32> = reservations::table
            .filter(reservations::restaurant_id.eq(restaurant_id))
            .filter(reservations::reservation_date.ge(today - Duration::days(DEFAULT_RANGE_DAYS)))
            .filter(reservations::reservation_date.le(today))
            .filter(reservations::status.eq_any([
                ReservationStatus::Confirmed.as_str(),
                ReservationStatus::Completed.as_str()
            ]))
            .select(reservations::guests)
            .load(&mut conn)
            .context("Failed to load party sizes")?;

        let capacity = restaurants::table
            .find(restaurant_id)
            .select(restaurants::capacity)
            .first::<i32>(&mut conn)
            .context("Failed to get restaurant capacity")?;

        Ok(build_report(
            start,
            end,
            &order_facts,
            &item_facts,
            reservations_count,
            occupancy_rate(&party_sizes, capacity)
        ))
    })
    .await
    .context("Failed due to threadpool error")?
}
