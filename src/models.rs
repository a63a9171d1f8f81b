use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use diesel::prelude::{AsChangeset, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::{
    categories, cities, dishes, order_items, orders, reservations, restaurant_accounts,
    restaurant_admin_notes, restaurant_drafts, restaurant_status_history, restaurants,
    subscription_plans, subscriptions, user_profiles, users
};

#[derive(Queryable, Selectable, Insertable, Serialize, Clone, Debug)]
#[diesel(table_name = users)]
pub struct User{
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>
}

#[derive(Queryable, Selectable, Insertable, AsChangeset, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = user_profiles, primary_key(user_id), treat_none_as_null = true)]
pub struct UserProfile{
    pub user_id: Uuid,
    pub bio: String,
    pub phone: Option<String>,
    pub is_vegetarian: bool,
    pub is_vegan: bool,
    pub updated_at: DateTime<Utc>
}

#[derive(Queryable, Selectable, Insertable, Serialize, Clone, Debug)]
#[diesel(table_name = cities)]
pub struct City{
    pub city_id: Uuid,
    pub name: String,
    pub description: String,
    pub population: i32,
    pub is_active: bool
}

#[derive(Queryable, Selectable, Insertable, Serialize, Clone, Debug)]
#[diesel(table_name = restaurants)]
pub struct Restaurant{
    pub restaurant_id: Uuid,
    pub name: String,
    pub city_id: Uuid,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub website: String,
    pub description: String,
    pub capacity: i32,
    pub is_open: bool,
    pub created_at: DateTime<Utc>
}

#[derive(Queryable, Selectable, Insertable, Serialize, Clone, Debug)]
#[diesel(table_name = categories)]
pub struct Category{
    pub category_id: Uuid,
    pub restaurant_id: Uuid,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>
}

#[derive(Queryable, Selectable, Insertable, Serialize, Clone, Debug)]
#[diesel(table_name = dishes)]
pub struct Dish{
    pub dish_id: Uuid,
    pub name: String,
    pub description: String,
    pub price_range: String,
    pub dish_type: String,
    pub is_vegetarian: bool,
    pub is_vegan: bool,
    pub ingredients: Option<String>,
    pub city_id: Option<Uuid>,
    pub restaurant_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub origin: String,
    pub created_at: DateTime<Utc>
}

#[derive(Queryable, Selectable, Insertable, Serialize, Clone, Debug)]
#[diesel(table_name = reservations)]
pub struct Reservation{
    pub reservation_id: Uuid,
    pub restaurant_id: Uuid,
    pub user_id: Option<Uuid>,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub reservation_date: NaiveDate,
    pub reservation_time: NaiveTime,
    pub guests: i32,
    pub status: String,
    pub notes: String,
    pub confirmation_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>
}

#[derive(Queryable, Selectable, Insertable, Serialize, Clone, Debug)]
#[diesel(table_name = restaurant_accounts)]
pub struct RestaurantAccount{
    pub account_id: Uuid,
    pub user_id: Uuid,
    pub restaurant_id: Uuid,
    pub status: String,
    pub is_active: bool,
    pub pending_approval: bool,
    pub rejection_reason: Option<String>,
    pub sanction_reason: Option<String>,
    pub ban_reason: Option<String>,
    pub status_changed_at: Option<DateTime<Utc>>,
    pub status_changed_by: Option<Uuid>,
    pub account_type: String,
    pub created_at: DateTime<Utc>
}

#[derive(Queryable, Selectable, Insertable, Serialize, Clone, Debug)]
#[diesel(table_name = restaurant_status_history)]
pub struct StatusHistoryEntry{
    pub history_id: Uuid,
    pub account_id: Uuid,
    pub changed_by: Uuid,
    pub old_status: String,
    pub new_status: String,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>
}

#[derive(Queryable, Selectable, Insertable, Serialize, Clone, Debug)]
#[diesel(table_name = restaurant_admin_notes)]
pub struct AdminNote{
    pub note_id: Uuid,
    pub account_id: Uuid,
    pub admin_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>
}

#[derive(Queryable, Selectable, Insertable, Serialize, Clone, Debug)]
#[diesel(table_name = orders)]
pub struct Order{
    pub order_id: Uuid,
    pub restaurant_id: Uuid,
    pub user_id: Option<Uuid>,
    pub reservation_id: Option<Uuid>,
    pub table_number: Option<String>,
    pub customer_name: Option<String>,
    pub status: String,
    pub total_amount: i64,
    pub payment_method: String,
    pub is_takeaway: bool,
    pub order_time: DateTime<Utc>,
    pub delivery_time: Option<DateTime<Utc>>,
    pub special_instructions: String,
    pub order_code: String
}

#[derive(Queryable, Selectable, Insertable, Serialize, Clone, Debug)]
#[diesel(table_name = order_items)]
pub struct OrderItemModel{
    pub order_item_id: Uuid,
    pub order_id: Uuid,
    pub dish_id: Uuid,
    pub quantity: i32,
    pub price: i32,
    pub notes: String
}

#[derive(Queryable, Selectable, Insertable, Serialize, Clone, Debug)]
#[diesel(table_name = restaurant_drafts)]
pub struct RestaurantDraft{
    pub draft_id: Uuid,
    pub name: String,
    pub city_id: Uuid,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub website: String,
    pub description: String,
    pub capacity: i32,
    pub owner_first_name: String,
    pub owner_last_name: String,
    pub owner_email: String,
    pub owner_phone: String,
    pub owner_id_card: String,
    pub business_registration: String,
    pub food_safety_certificate: String,
    pub tax_document: Option<String>,
    pub main_image: String,
    pub interior_image: String,
    pub menu_sample: String,
    pub status: String,
    pub admin_notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>
}

#[derive(Queryable, Selectable, Insertable, Serialize, Clone, Debug)]
#[diesel(table_name = subscription_plans)]
pub struct SubscriptionPlan{
    pub plan_id: Uuid,
    pub name: String,
    pub plan_type: String,
    pub price_monthly: i32,
    pub price_yearly: i32,
    pub description: String,
    pub is_active: bool,
    pub is_featured: bool,
    pub max_listings: i32,
    pub discount_percent: i32
}

#[derive(Queryable, Selectable, Insertable, Serialize, Clone, Debug)]
#[diesel(table_name = subscriptions)]
pub struct Subscription{
    pub subscription_id: Uuid,
    pub plan_id: Uuid,
    pub user_id: Option<Uuid>,
    pub account_id: Option<Uuid>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: String,
    pub is_auto_renew: bool,
    pub notes: String
}
