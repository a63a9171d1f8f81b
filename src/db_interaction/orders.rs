use std::{error::Error, fmt::Debug};

use anyhow::Context;
use chrono::{DateTime, Utc};
use diesel::{Connection, ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl, SelectableHelper};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    domain::order::{
        check_quantity, check_status_change, combined_quantity, kitchen_statuses, merge_line, order_total, OrderStatus,
        PaymentMethod, PriceTier, PricedLine, QuantityOutOfRange, StatusChangeRejection, ORDER_CODE_LENGTH
    },
    models::{Order, OrderItemModel, Reservation},
    schema::{dishes, order_items, orders, reservations},
    telemetry::spawn_blocking_with_tracing,
    utils::{error_fmt_chain, generate_code, is_unique_violation, DbConnection}
};

// Errors associated with creating and editing orders
#[derive(Error)]
pub enum OrderError{
    #[error("Tokio threadpool error occured")]
    ThreadpoolError(#[from] tokio::task::JoinError),
    #[error("Failed to run query")]
    RunQueryError(#[source] diesel::result::Error),
    #[error("order not found")]
    OrderNotFound,
    #[error("order item not found")]
    ItemNotFound,
    #[error("dish {0} is not on this restaurant's menu")]
    UnknownDish(Uuid),
    #[error("reservation {0} is not at this restaurant")]
    UnknownReservation(Uuid),
    #[error("an order needs at least one item")]
    EmptyOrder,
    #[error(transparent)]
    InvalidQuantity(#[from] QuantityOutOfRange),
    #[error(transparent)]
    StatusRejected(#[from] StatusChangeRejection),
    #[error("order code already in use, please retry")]
    CodeCollision
}

impl From<diesel::result::Error> for OrderError {
    fn from(e: diesel::result::Error) -> Self {
        if is_unique_violation(&e) {
            OrderError::CodeCollision
        } else {
            OrderError::RunQueryError(e)
        }
    }
}

impl Debug for OrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct OrderLineForm{
    pub dish_id: Uuid,
    pub quantity: i32,
    #[serde(default)]
    pub notes: String
}

#[derive(Deserialize, Debug)]
pub struct CreateOrderForm{
    pub table_number: Option<String>,
    pub customer_name: Option<String>,
    pub reservation_id: Option<Uuid>,
    #[serde(default)]
    pub is_takeaway: bool,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub special_instructions: String,
    pub items: Vec<OrderLineForm>
}

#[derive(Serialize, Debug)]
pub struct OrderLine{
    #[serde(flatten)]
    pub item: OrderItemModel,
    pub dish_name: String
}

#[derive(Serialize, Debug)]
pub struct OrderWithItems{
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderLine>
}

// Current price of a dish on this restaurant's menu, in cents
fn menu_price(conn: &mut DbConnection, restaurant_id: Uuid, dish_id: Uuid) -> Result<i32, OrderError>{
    let tier = dishes::table
        .filter(dishes::dish_id.eq(dish_id))
        .filter(dishes::restaurant_id.eq(restaurant_id))
        .select(dishes::price_range)
        .first::<String>(conn)
        .optional()?
        .ok_or(OrderError::UnknownDish(dish_id))?;

    Ok(PriceTier::parse(&tier).map(|t| t.price_cents()).unwrap_or(0))
}

fn lock_order(conn: &mut DbConnection, restaurant_id: Uuid, order_id: Uuid) -> Result<Order, OrderError>{
    orders::table
        .filter(orders::order_id.eq(order_id))
        .filter(orders::restaurant_id.eq(restaurant_id))
        .select(Order::as_select())
        .for_update()
        .first::<Order>(conn)
        .optional()?
        .ok_or(OrderError::OrderNotFound)
}

/// Recomputes `total_amount` from the order's lines and stores it.
pub fn recompute_total(conn: &mut DbConnection, order_id: Uuid) -> diesel::QueryResult<i64>{
    let lines: Vec<PricedLine> = order_items::table
        .filter(order_items::order_id.eq(order_id))
        .select((order_items::price, order_items::quantity))
        .load::<(i32, i32)>(conn)?
        .into_iter()
        .map(|(price, quantity)| PricedLine{ price, quantity })
        .collect();

    let total = order_total(&lines);

    diesel::update(orders::table.find(order_id))
        .set(orders::total_amount.eq(total))
        .execute(conn)?;

    Ok(total)
}

pub fn load_order_with_items(conn: &mut DbConnection, order: Order) -> diesel::QueryResult<OrderWithItems>{
    let items = order_items::table
        .inner_join(dishes::table)
        .filter(order_items::order_id.eq(order.order_id))
        .select((OrderItemModel::as_select(), dishes::name))
        .load::<(OrderItemModel, String)>(conn)?
        .into_iter()
        .map(|(item, dish_name)| OrderLine{ item, dish_name })
        .collect();

    Ok(OrderWithItems{ order, items })
}

#[tracing::instrument(
    "Creating order",
    skip(conn, form),
    fields(items = form.items.len())
)]
pub async fn create_order(
    mut conn: DbConnection,
    restaurant_id: Uuid,
    form: CreateOrderForm
) -> Result<OrderWithItems, OrderError>{
    if form.items.is_empty() {
        return Err(OrderError::EmptyOrder)
    }
    for line in &form.items {
        check_quantity(line.quantity)?;
    }

    let res = spawn_blocking_with_tracing(move || {
        conn.transaction::<OrderWithItems, OrderError, _>(|conn| {
            let mut customer_name = form.customer_name.filter(|n| !n.trim().is_empty());
            let mut user_id = None;

            if let Some(reservation_id) = form.reservation_id {
                let reservation = reservations::table
                    .filter(reservations::reservation_id.eq(reservation_id))
                    .filter(reservations::restaurant_id.eq(restaurant_id))
                    .select(Reservation::as_select())
                    .first::<Reservation>(conn)
                    .optional()?
                    .ok_or(OrderError::UnknownReservation(reservation_id))?;

                customer_name = customer_name.or(Some(reservation.name));
                user_id = reservation.user_id;
            }

            let mut lines: Vec<(Uuid, PricedLine)> = Vec::new();
            let mut notes: Vec<(Uuid, String)> = Vec::new();
            for line in &form.items {
                let price = menu_price(conn, restaurant_id, line.dish_id)?;
                merge_line(&mut lines, line.dish_id, price, line.quantity)?;
                if !line.notes.trim().is_empty() {
                    notes.push((line.dish_id, line.notes.trim().to_string()));
                }
            }

            let order = Order{
                order_id: Uuid::new_v4(),
                restaurant_id,
                user_id,
                reservation_id: form.reservation_id,
                table_number: form.table_number.filter(|t| !t.trim().is_empty()),
                customer_name,
                status: OrderStatus::New.as_str().to_string(),
                total_amount: 0,
                payment_method: form.payment_method.as_str().to_string(),
                is_takeaway: form.is_takeaway,
                order_time: Utc::now(),
                delivery_time: None,
                special_instructions: form.special_instructions,
                order_code: generate_code(ORDER_CODE_LENGTH)
            };

            diesel::insert_into(orders::table)
                .values(&order)
                .execute(conn)?;

            for (dish_id, line) in lines {
                let line_notes = notes.iter()
                    .filter(|(id, _)| *id == dish_id)
                    .map(|(_, n)| n.as_str())
                    .collect::<Vec<_>>()
                    .join("; ");

                diesel::insert_into(order_items::table)
                    .values(&OrderItemModel{
                        order_item_id: Uuid::new_v4(),
                        order_id: order.order_id,
                        dish_id,
                        quantity: line.quantity,
                        price: line.price,
                        notes: line_notes
                    })
                    .execute(conn)?;
            }

            let total = recompute_total(conn, order.order_id)?;
            let order = Order{ total_amount: total, ..order };

            Ok(load_order_with_items(conn, order)?)
        })
    })
    .await??;

    Ok(res)
}

/// Adds a dish to an order. A dish already on the order gets its quantity
/// increased and keeps the price it was first added at.
#[tracing::instrument(
    "Adding item to order",
    skip(conn, line)
)]
pub async fn add_order_item(
    mut conn: DbConnection,
    restaurant_id: Uuid,
    order_id: Uuid,
    line: OrderLineForm
) -> Result<OrderWithItems, OrderError>{
    check_quantity(line.quantity)?;

    let res = spawn_blocking_with_tracing(move || {
        conn.transaction::<OrderWithItems, OrderError, _>(|conn| {
            let order = lock_order(conn, restaurant_id, order_id)?;
            if let Some(status) = OrderStatus::parse(&order.status).filter(|s| s.is_locked()) {
                return Err(StatusChangeRejection::Locked(status.as_str()).into())
            }

            let price = menu_price(conn, restaurant_id, line.dish_id)?;

            let existing = order_items::table
                .filter(order_items::order_id.eq(order_id))
                .filter(order_items::dish_id.eq(line.dish_id))
                .select(OrderItemModel::as_select())
                .first::<OrderItemModel>(conn)
                .optional()?;

            match existing {
                Some(item) => {
                    let quantity = combined_quantity(item.quantity, line.quantity)?;
                    diesel::update(order_items::table.find(item.order_item_id))
                        .set(order_items::quantity.eq(quantity))
                        .execute(conn)?;
                },
                None => {
                    diesel::insert_into(order_items::table)
                        .values(&OrderItemModel{
                            order_item_id: Uuid::new_v4(),
                            order_id,
                            dish_id: line.dish_id,
                            quantity: line.quantity,
                            price,
                            notes: line.notes.trim().to_string()
                        })
                        .execute(conn)?;
                }
            }

            let total = recompute_total(conn, order_id)?;
            Ok(load_order_with_items(conn, Order{ total_amount: total, ..order })?)
        })
    })
    .await??;

    Ok(res)
}

#[tracing::instrument(
    "Removing item from order",
    skip(conn)
)]
pub async fn remove_order_item(
    mut conn: DbConnection,
    restaurant_id: Uuid,
    order_id: Uuid,
    order_item_id: Uuid
) -> Result<OrderWithItems, OrderError>{
    let res = spawn_blocking_with_tracing(move || {
        conn.transaction::<OrderWithItems, OrderError, _>(|conn| {
            let order = lock_order(conn, restaurant_id, order_id)?;
            if let Some(status) = OrderStatus::parse(&order.status).filter(|s| s.is_locked()) {
                return Err(StatusChangeRejection::Locked(status.as_str()).into())
            }

            let deleted = diesel::delete(
                    order_items::table
                        .filter(order_items::order_item_id.eq(order_item_id))
                        .filter(order_items::order_id.eq(order_id))
                )
                .execute(conn)?;

            if deleted == 0 {
                return Err(OrderError::ItemNotFound)
            }

            let total = recompute_total(conn, order_id)?;
            Ok(load_order_with_items(conn, Order{ total_amount: total, ..order })?)
        })
    })
    .await??;

    Ok(res)
}

#[tracing::instrument(
    "Updating order status",
    skip(conn)
)]
pub async fn update_order_status(
    mut conn: DbConnection,
    restaurant_id: Uuid,
    order_id: Uuid,
    next: OrderStatus
) -> Result<Order, OrderError>{
    let res = spawn_blocking_with_tracing(move || {
        conn.transaction::<Order, OrderError, _>(|conn| {
            let mut order = lock_order(conn, restaurant_id, order_id)?;

            // Unknown stored statuses are treated as fresh orders
            let current = OrderStatus::parse(&order.status).unwrap_or(OrderStatus::New);
            check_status_change(current, next)?;

            order.status = next.as_str().to_string();
            if next == OrderStatus::Delivered {
                order.delivery_time = Some(Utc::now());
            }

            diesel::update(orders::table.find(order_id))
                .set((
                    orders::status.eq(&order.status),
                    orders::delivery_time.eq(order.delivery_time)
                ))
                .execute(conn)?;

            Ok(order)
        })
    })
    .await??;

    Ok(res)
}

#[tracing::instrument(
    "Listing orders of restaurant",
    skip(conn)
)]
pub async fn list_orders(
    mut conn: DbConnection,
    restaurant_id: Uuid,
    status: Option<OrderStatus>
) -> Result<Vec<Order>, anyhow::Error>{
    spawn_blocking_with_tracing(move || {
        let mut query = orders::table
            .filter(orders::restaurant_id.eq(restaurant_id))
            .select(Order::as_select())
            .into_boxed();

        if let Some(status) = status {
            query = query.filter(orders::status.eq(status.as_str()));
        }

        query
            .order(orders::order_time.desc())
            .load::<Order>(&mut conn)
            .context("Failed to load orders")
    })
    .await
    .context("Failed due to threadpool error")?
}

#[tracing::instrument(
    "Getting order detail",
    skip(conn)
)]
pub async fn get_order_detail(
    mut conn: DbConnection,
    restaurant_id: Uuid,
    order_id: Uuid
) -> Result<Option<OrderWithItems>, anyhow::Error>{
    spawn_blocking_with_tracing(move || -> Result<Option<OrderWithItems>, anyhow::Error> {
        let order = orders::table
            .filter(orders::order_id.eq(order_id))
            .filter(orders::restaurant_id.eq(restaurant_id))
            .select(Order::as_select())
            .first::<Order>(&mut conn)
            .optional()
            .context("Failed to get order")?;

        match order {
            Some(order) => Ok(Some(
                load_order_with_items(&mut conn, order).context("Failed to load order items")?
            )),
            None => Ok(None)
        }
    })
    .await
    .context("Failed due to threadpool error")?
}

#[derive(Serialize, Debug)]
pub struct KitchenBoard{
    pub new_orders: Vec<OrderWithItems>,
    pub preparing_orders: Vec<OrderWithItems>,
    pub ready_orders: Vec<OrderWithItems>,
    pub takeaway_orders: Vec<Order>,
    pub today_orders: i64,
    pub today_revenue: i64
}

/// Orders the kitchen is working on. Ready orders and the daily figures
/// cover the business day `[day_start, day_end)`.
#[tracing::instrument(
    "Loading kitchen board",
    skip(conn)
)]
pub async fn get_kitchen_board(
    mut conn: DbConnection,
    restaurant_id: Uuid,
    day_start: DateTime<Utc>,
    day_end: DateTime<Utc>
) -> Result<KitchenBoard, anyhow::Error>{
    spawn_blocking_with_tracing(move || -> Result<KitchenBoard, anyhow::Error> {
        let active = orders::table
            .filter(orders::restaurant_id.eq(restaurant_id))
            .filter(orders::status.eq_any(kitchen_statuses()))
            .order(orders::order_time.asc())
            .select(Order::as_select())
            .load::<Order>(&mut conn)
            .context("Failed to load active orders")?;

        let mut board = KitchenBoard{
            new_orders: Vec::new(),
            preparing_orders: Vec::new(),
            ready_orders: Vec::new(),
            takeaway_orders: active.iter().filter(|o| o.is_takeaway).cloned().collect(),
            today_orders: 0,
            today_revenue: 0
        };

        for order in active {
            let status = OrderStatus::parse(&order.status);
            let placed_today = order.order_time >= day_start && order.order_time < day_end;
            let with_items = load_order_with_items(&mut conn, order)
                .context("Failed to load order items")?;

            match status {
                Some(OrderStatus::New) => board.new_orders.push(with_items),
                Some(OrderStatus::Preparing) => board.preparing_orders.push(with_items),
                Some(OrderStatus::Ready) if placed_today => board.ready_orders.push(with_items),
                _ => {}
            }
        }

        let today: Vec<(String, i64)> = orders::table
            .filter(orders::restaurant_id.eq(restaurant_id))
            .filter(orders::order_time.ge(day_start))
            .filter(orders::order_time.lt(day_end))
            .select((orders::status, orders::total_amount))
            .load(&mut conn)
            .context("Failed to load today's orders")?;

        board.today_orders = today.len() as i64;
        board.today_revenue = today.iter()
            .filter(|(status, _)| OrderStatus::parse(status).map(|s| s.is_completed()).unwrap_or(false))
            .map(|(_, amount)| amount)
            .sum();

        Ok(board)
    })
    .await
    .context("Failed due to threadpool error")?
}
