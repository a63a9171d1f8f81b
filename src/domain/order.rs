use serde::{Deserialize, Serialize};

pub const ORDER_CODE_LENGTH: usize = 6;

/// Largest quantity a single order line may hold.
pub const MAX_LINE_QUANTITY: i32 = 999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus{
    New,
    Preparing,
    Ready,
    Delivered,
    Cancelled,
    Paid
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::New,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Paid
    ];

    pub fn as_str(&self) -> &'static str{
        match self {
            OrderStatus::New => "new",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Paid => "paid"
        }
    }

    pub fn parse(value: &str) -> Option<Self>{
        match value {
            "new" => Some(OrderStatus::New),
            "preparing" => Some(OrderStatus::Preparing),
            "ready" => Some(OrderStatus::Ready),
            "delivered" => Some(OrderStatus::Delivered),
            "cancelled" => Some(OrderStatus::Cancelled),
            "paid" => Some(OrderStatus::Paid),
            _ => None
        }
    }

    // Orders that count toward revenue
    pub fn is_completed(&self) -> bool{
        matches!(self, OrderStatus::Delivered | OrderStatus::Paid)
    }

    pub fn can_cancel(&self) -> bool{
        !matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Paid)
    }

    pub fn is_locked(&self) -> bool{
        matches!(self, OrderStatus::Cancelled | OrderStatus::Paid)
    }

    pub fn is_in_kitchen(&self) -> bool{
        matches!(self, OrderStatus::New | OrderStatus::Preparing | OrderStatus::Ready)
    }
}

pub fn completed_statuses() -> [&'static str; 2]{
    [OrderStatus::Delivered.as_str(), OrderStatus::Paid.as_str()]
}

// Column values of the orders shown on the kitchen board
pub fn kitchen_statuses() -> Vec<&'static str>{
    OrderStatus::ALL.iter()
        .filter(|status| status.is_in_kitchen())
        .map(|status| status.as_str())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatusChangeRejection{
    #[error("order is {0} and can no longer change")]
    Locked(&'static str),
    #[error("order is {0} and can no longer be cancelled")]
    NotCancellable(&'static str)
}

pub fn check_status_change(current: OrderStatus, next: OrderStatus) -> Result<(), StatusChangeRejection>{
    if current.is_locked() {
        return Err(StatusChangeRejection::Locked(current.as_str()))
    }

    if next == OrderStatus::Cancelled && !current.can_cancel() {
        return Err(StatusChangeRejection::NotCancellable(current.as_str()))
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod{
    #[default]
    Cash,
    Card,
    Online
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str{
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Online => "online"
        }
    }

    pub fn parse(value: &str) -> Option<Self>{
        match value {
            "cash" => Some(PaymentMethod::Cash),
            "card" => Some(PaymentMethod::Card),
            "online" => Some(PaymentMethod::Online),
            _ => None
        }
    }
}

/// Price tier of a dish. Tiers map to fixed prices in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceTier{
    L,
    M,
    H
}

impl PriceTier {
    pub fn as_str(&self) -> &'static str{
        match self {
            PriceTier::L => "L",
            PriceTier::M => "M",
            PriceTier::H => "H"
        }
    }

    pub fn parse(value: &str) -> Option<Self>{
        match value {
            "L" => Some(PriceTier::L),
            "M" => Some(PriceTier::M),
            "H" => Some(PriceTier::H),
            _ => None
        }
    }

    pub fn price_cents(&self) -> i32{
        match self {
            PriceTier::L => 599,
            PriceTier::M => 1099,
            PriceTier::H => 1599
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DishType{
    Sweet,
    Salty,
    Drink
}

impl DishType {
    pub fn as_str(&self) -> &'static str{
        match self {
            DishType::Sweet => "sweet",
            DishType::Salty => "salty",
            DishType::Drink => "drink"
        }
    }

    pub fn parse(value: &str) -> Option<Self>{
        match value {
            "sweet" => Some(DishType::Sweet),
            "salty" => Some(DishType::Salty),
            "drink" => Some(DishType::Drink),
            _ => None
        }
    }
}

// A priced line of an order: unit price in cents and quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedLine{
    pub price: i32,
    pub quantity: i32
}

pub fn order_total(lines: &[PricedLine]) -> i64{
    lines.iter()
        .map(|line| line.price as i64 * line.quantity as i64)
        .sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("quantity must be between 1 and {}", MAX_LINE_QUANTITY)]
pub struct QuantityOutOfRange;

pub fn check_quantity(quantity: i32) -> Result<i32, QuantityOutOfRange>{
    if (1..=MAX_LINE_QUANTITY).contains(&quantity) {
        Ok(quantity)
    } else {
        Err(QuantityOutOfRange)
    }
}

/// Quantity of a line after adding `extra` to it.
pub fn combined_quantity(current: i32, extra: i32) -> Result<i32, QuantityOutOfRange>{
    current.checked_add(extra)
        .ok_or(QuantityOutOfRange)
        .and_then(check_quantity)
}

/// Adds `quantity` of a dish to the lines, merging into an existing line for
/// the same dish. The unit price of a merged line keeps its original snapshot.
/// Lines are left untouched when the merged quantity would leave the allowed range.
pub fn merge_line<K: PartialEq + Copy>(
    lines: &mut Vec<(K, PricedLine)>,
    dish: K,
    price: i32,
    quantity: i32
) -> Result<(), QuantityOutOfRange>{
    match lines.iter_mut().find(|(key, _)| *key == dish) {
        Some((_, line)) => line.quantity = combined_quantity(line.quantity, quantity)?,
        None => lines.push((dish, PricedLine{ price, quantity: check_quantity(quantity)? }))
    }
    Ok(())
}

pub fn format_cents(cents: i64) -> String{
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.abs();
    format!("{}{}.{:02}", sign, cents / 100, cents % 100)
}
