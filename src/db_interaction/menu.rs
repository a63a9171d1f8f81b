use std::{error::Error, fmt::Debug};

use anyhow::Context;
use chrono::Utc;
use diesel::{Connection, ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl, SelectableHelper};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    domain::order::{DishType, PriceTier},
    models::{Category, Dish},
    schema::{categories, dishes, restaurants},
    telemetry::spawn_blocking_with_tracing,
    utils::{error_fmt_chain, DbConnection}
};

// Errors shared by the menu mutations of an owner
#[derive(Error)]
pub enum MenuError{
    #[error("Tokio threadpool error occured")]
    ThreadpoolError(#[from] tokio::task::JoinError),
    #[error("Failed to run query")]
    RunQueryError(#[from] diesel::result::Error),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0} belongs to another restaurant")]
    NotOwner(&'static str),
    #[error("{field}: {message}")]
    Invalid{ field: &'static str, message: String }
}

impl Debug for MenuError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

#[derive(Serialize)]
pub struct Menu{
    pub categories: Vec<Category>,
    pub dishes: Vec<Dish>
}

#[tracing::instrument(
    "Loading menu of restaurant",
    skip(conn)
)]
pub async fn get_menu(
    mut conn: DbConnection,
    restaurant_id: Uuid
) -> Result<Menu, anyhow::Error>{
    spawn_blocking_with_tracing(move || -> Result<Menu, anyhow::Error> {
        let categories = categories::table
            .filter(categories::restaurant_id.eq(restaurant_id))
            .order(categories::name.asc())
            .select(Category::as_select())
            .load::<Category>(&mut conn)
            .context("Failed to load categories")?;

        let dishes = dishes::table
            .filter(dishes::restaurant_id.eq(restaurant_id))
            .order(dishes::name.asc())
            .select(Dish::as_select())
            .load::<Dish>(&mut conn)
            .context("Failed to load dishes")?;

        Ok(Menu{ categories, dishes })
    })
    .await
    .context("Failed due to threadpool error")?
}

#[derive(Deserialize, Debug)]
pub struct CategoryForm{
    pub name: String,
    #[serde(default)]
    pub description: String
}

impl CategoryForm {
    fn validate(&self) -> Result<(), MenuError>{
        if self.name.trim().is_empty() {
            return Err(MenuError::Invalid{ field: "name", message: "This field is required".to_string() })
        }
        Ok(())
    }
}

fn owned_category(conn: &mut DbConnection, restaurant_id: Uuid, category_id: Uuid) -> Result<Category, MenuError>{
    let category = categories::table
        .find(category_id)
        .select(Category::as_select())
        .first::<Category>(conn)
        .optional()?
        .ok_or(MenuError::NotFound("category"))?;

    if category.restaurant_id != restaurant_id {
        return Err(MenuError::NotOwner("category"))
    }
    Ok(category)
}

#[tracing::instrument(
    "Creating category",
    skip(conn)
)]
pub async fn create_category(
    mut conn: DbConnection,
    restaurant_id: Uuid,
    form: CategoryForm
) -> Result<Category, MenuError>{
    form.validate()?;

    let category = Category{
        category_id: Uuid::new_v4(),
        restaurant_id,
        name: form.name.trim().to_string(),
        description: form.description,
        created_at: Utc::now()
    };

    let res = spawn_blocking_with_tracing(move || {
        diesel::insert_into(categories::table)
            .values(&category)
            .execute(&mut conn)?;

        Ok::<_, MenuError>(category)
    })
    .await??;

    Ok(res)
}

#[tracing::instrument(
    "Updating category",
    skip(conn)
)]
pub async fn update_category(
    mut conn: DbConnection,
    restaurant_id: Uuid,
    category_id: Uuid,
    form: CategoryForm
) -> Result<Category, MenuError>{
    form.validate()?;

    let res = spawn_blocking_with_tracing(move || {
        conn.transaction::<Category, MenuError, _>(|conn| {
            let mut category = owned_category(conn, restaurant_id, category_id)?;
            category.name = form.name.trim().to_string();
            category.description = form.description;

            diesel::update(categories::table.find(category_id))
                .set((
                    categories::name.eq(&category.name),
                    categories::description.eq(&category.description)
                ))
                .execute(conn)?;

            Ok(category)
        })
    })
    .await??;

    Ok(res)
}

/// Deletes a category. Its dishes stay on the menu without a category.
#[tracing::instrument(
    "Deleting category",
    skip(conn)
)]
pub async fn delete_category(
    mut conn: DbConnection,
    restaurant_id: Uuid,
    category_id: Uuid
) -> Result<(), MenuError>{
    spawn_blocking_with_tracing(move || {
        conn.transaction::<(), MenuError, _>(|conn| {
            owned_category(conn, restaurant_id, category_id)?;

            diesel::update(dishes::table.filter(dishes::category_id.eq(category_id)))
                .set(dishes::category_id.eq(None::<Uuid>))
                .execute(conn)?;

            diesel::delete(categories::table.find(category_id))
                .execute(conn)?;

            Ok(())
        })
    })
    .await?
}

#[derive(Deserialize, Debug)]
pub struct DishForm{
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price_range: PriceTier,
    pub dish_type: DishType,
    #[serde(default)]
    pub is_vegetarian: bool,
    #[serde(default)]
    pub is_vegan: bool,
    pub ingredients: Option<String>,
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub origin: String
}

impl DishForm {
    fn validate(&self) -> Result<(), MenuError>{
        if self.name.trim().is_empty() {
            return Err(MenuError::Invalid{ field: "name", message: "This field is required".to_string() })
        }
        Ok(())
    }
}

// A category given with a dish must belong to the same restaurant
fn check_dish_category(conn: &mut DbConnection, restaurant_id: Uuid, category_id: Option<Uuid>) -> Result<(), MenuError>{
    if let Some(category_id) = category_id {
        owned_category(conn, restaurant_id, category_id)?;
    }
    Ok(())
}

fn owned_dish(conn: &mut DbConnection, restaurant_id: Uuid, dish_id: Uuid) -> Result<Dish, MenuError>{
    let dish = dishes::table
        .find(dish_id)
        .select(Dish::as_select())
        .first::<Dish>(conn)
        .optional()?
        .ok_or(MenuError::NotFound("dish"))?;

    if dish.restaurant_id != Some(restaurant_id) {
        return Err(MenuError::NotOwner("dish"))
    }
    Ok(dish)
}

#[tracing::instrument(
    "Creating dish",
    skip(conn)
)]
pub async fn create_dish(
    mut conn: DbConnection,
    restaurant_id: Uuid,
    form: DishForm
) -> Result<Dish, MenuError>{
    form.validate()?;

    let res = spawn_blocking_with_tracing(move || {
        conn.transaction::<Dish, MenuError, _>(|conn| {
            check_dish_category(conn, restaurant_id, form.category_id)?;

            // Dishes of a restaurant are listed under its city
            let city_id = restaurants::table
                .find(restaurant_id)
                .select(restaurants::city_id)
                .first::<Uuid>(conn)
                .optional()?
                .ok_or(MenuError::NotFound("restaurant"))?;

            let dish = Dish{
                dish_id: Uuid::new_v4(),
                name: form.name.trim().to_string(),
                description: form.description,
                price_range: form.price_range.as_str().to_string(),
                dish_type: form.dish_type.as_str().to_string(),
                is_vegetarian: form.is_vegetarian || form.is_vegan,
                is_vegan: form.is_vegan,
                ingredients: form.ingredients,
                city_id: Some(city_id),
                restaurant_id: Some(restaurant_id),
                category_id: form.category_id,
                origin: form.origin,
                created_at: Utc::now()
            };

            diesel::insert_into(dishes::table)
                .values(&dish)
                .execute(conn)?;

            Ok(dish)
        })
    })
    .await??;

    Ok(res)
}

#[tracing::instrument(
    "Updating dish",
    skip(conn)
)]
pub async fn update_dish(
    mut conn: DbConnection,
    restaurant_id: Uuid,
    dish_id: Uuid,
    form: DishForm
) -> Result<Dish, MenuError>{
    form.validate()?;

    let res = spawn_blocking_with_tracing(move || {
        conn.transaction::<Dish, MenuError, _>(|conn| {
            let mut dish = owned_dish(conn, restaurant_id, dish_id)?;
            check_dish_category(conn, restaurant_id, form.category_id)?;

            dish.name = form.name.trim().to_string();
            dish.description = form.description;
            dish.price_range = form.price_range.as_str().to_string();
            dish.dish_type = form.dish_type.as_str().to_string();
            dish.is_vegetarian = form.is_vegetarian || form.is_vegan;
            dish.is_vegan = form.is_vegan;
            dish.ingredients = form.ingredients;
            dish.category_id = form.category_id;
            dish.origin = form.origin;

            diesel::update(dishes::table.find(dish_id))
                .set((
                    dishes::name.eq(&dish.name),
                    dishes::description.eq(&dish.description),
                    dishes::price_range.eq(&dish.price_range),
                    dishes::dish_type.eq(&dish.dish_type),
                    dishes::is_vegetarian.eq(dish.is_vegetarian),
                    dishes::is_vegan.eq(dish.is_vegan),
                    dishes::ingredients.eq(&dish.ingredients),
                    dishes::category_id.eq(dish.category_id),
                    dishes::origin.eq(&dish.origin)
                ))
                .execute(conn)?;

            Ok(dish)
        })
    })
    .await??;

    Ok(res)
}

#[tracing::instrument(
    "Deleting dish",
    skip(conn)
)]
pub async fn delete_dish(
    mut conn: DbConnection,
    restaurant_id: Uuid,
    dish_id: Uuid
) -> Result<(), MenuError>{
    spawn_blocking_with_tracing(move || {
        conn.transaction::<(), MenuError, _>(|conn| {
            owned_dish(conn, restaurant_id, dish_id)?;

            diesel::delete(dishes::table.find(dish_id))
                .execute(conn)?;

            Ok(())
        })
    })
    .await?
}
