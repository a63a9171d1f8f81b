use anyhow::Context;
use diesel::{BoolExpressionMethods, ExpressionMethods, OptionalExtension, PgTextExpressionMethods, QueryDsl, RunQueryDsl, SelectableHelper};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    domain::order::PriceTier,
    models::{Category, City, Dish, Restaurant},
    schema::{categories, cities, dishes, restaurants},
    telemetry::spawn_blocking_with_tracing,
    utils::DbConnection
};

// ILIKE pattern matching `term` anywhere, with its wildcards escaped
pub fn like_pattern(term: &str) -> String{
    format!("%{}%", term.trim().replace('%', "\\%").replace('_', "\\_"))
}

#[tracing::instrument(
    "Listing cities",
    skip(conn)
)]
pub async fn list_cities(mut conn: DbConnection) -> Result<Vec<City>, anyhow::Error>{
    spawn_blocking_with_tracing(move || {
        cities::table
            .filter(cities::is_active.eq(true))
            .order(cities::name.asc())
            .select(City::as_select())
            .load::<City>(&mut conn)
            .context("Failed to load cities")
    })
    .await
    .context("Failed due to threadpool error")?
}

#[derive(Deserialize, Debug, Default)]
pub struct RestaurantFilter{
    pub city: Option<Uuid>,
    pub is_open: Option<bool>,
    pub q: Option<String>
}

#[tracing::instrument(
    "Listing restaurants",
    skip(conn)
)]
pub async fn list_restaurants(
    mut conn: DbConnection,
    filter: RestaurantFilter
) -> Result<Vec<Restaurant>, anyhow::Error>{
    spawn_blocking_with_tracing(move || {
        let mut query = restaurants::table
            .select(Restaurant::as_select())
            .into_boxed();

        if let Some(city_id) = filter.city {
            query = query.filter(restaurants::city_id.eq(city_id));
        }
        if let Some(is_open) = filter.is_open {
            query = query.filter(restaurants::is_open.eq(is_open));
        }
        if let Some(q) = filter.q.as_deref().filter(|q| !q.trim().is_empty()) {
            query = query.filter(restaurants::name.ilike(like_pattern(q)));
        }

        query
            .order(restaurants::name.asc())
            .load::<Restaurant>(&mut conn)
            .context("Failed to load restaurants")
    })
    .await
    .context("Failed due to threadpool error")?
}

#[derive(Serialize)]
pub struct MenuSection{
    pub category: Option<Category>,
    pub dishes: Vec<Dish>
}

#[derive(Serialize)]
pub struct RestaurantDetail{
    pub restaurant: Restaurant,
    pub city: City,
    pub menu: Vec<MenuSection>
}

// Groups dishes under their category, uncategorized ones last
pub fn group_menu(categories: Vec<Category>, dishes: Vec<Dish>) -> Vec<MenuSection>{
    let mut sections: Vec<MenuSection> = categories.into_iter()
        .map(|category| MenuSection{ category: Some(category), dishes: Vec::new() })
        .collect();
    let mut uncategorized = Vec::new();

    for dish in dishes {
        let section = sections.iter_mut().find(|s| {
            s.category.as_ref().map(|c| c.category_id) == dish.category_id && dish.category_id.is_some()
        });
        match section {
            Some(section) => section.dishes.push(dish),
            None => uncategorized.push(dish)
        }
    }

    if !uncategorized.is_empty() {
        sections.push(MenuSection{ category: None, dishes: uncategorized });
    }
    sections
}

#[tracing::instrument(
    "Getting restaurant detail",
    skip(conn)
)]
pub async fn get_restaurant_detail(
    mut conn: DbConnection,
    restaurant_id: Uuid
) -> Result<Option<RestaurantDetail>, anyhow::Error>{
    spawn_blocking_with_tracing(move || -> Result<Option<RestaurantDetail>, anyhow::Error> {
        let found = restaurants::table
            .inner_join(cities::table)
            .filter(restaurants::restaurant_id.eq(restaurant_id))
            .select((Restaurant::as_select(), City::as_select()))
            .first::<(Restaurant, City)>(&mut conn)
            .optional()
            .context("Failed to get restaurant")?;

        let Some((restaurant, city)) = found else {
            return Ok(None)
        };

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

        Ok(Some(RestaurantDetail{
            restaurant,
            city,
            menu: group_menu(categories, dishes)
        }))
    })
    .await
    .context("Failed due to threadpool error")?
}

#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DishSort{
    #[default]
    Name,
    PriceAsc,
    PriceDesc
}

fn tier_price(dish: &Dish) -> i32{
    PriceTier::parse(&dish.price_range)
        .map(|tier| tier.price_cents())
        .unwrap_or(0)
}

// Price tiers are letters, so price ordering happens here rather than in SQL
pub fn sort_dishes(dishes: &mut [Dish], sort: DishSort){
    match sort {
        DishSort::Name => dishes.sort_by(|a, b| a.name.cmp(&b.name)),
        DishSort::PriceAsc => dishes.sort_by(|a, b| tier_price(a).cmp(&tier_price(b)).then_with(|| a.name.cmp(&b.name))),
        DishSort::PriceDesc => dishes.sort_by(|a, b| tier_price(b).cmp(&tier_price(a)).then_with(|| a.name.cmp(&b.name)))
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct DishFilter{
    pub city: Option<Uuid>,
    #[serde(default)]
    pub sort: DishSort
}

#[tracing::instrument(
    "Listing dishes",
    skip(conn)
)]
pub async fn list_dishes(
    mut conn: DbConnection,
    filter: DishFilter
) -> Result<Vec<Dish>, anyhow::Error>{
    let mut dishes = spawn_blocking_with_tracing(move || {
        let mut query = dishes::table
            .select(Dish::as_select())
            .into_boxed();

        if let Some(city_id) = filter.city {
            query = query.filter(dishes::city_id.eq(city_id));
        }

        query
            .load::<Dish>(&mut conn)
            .context("Failed to load dishes")
    })
    .await
    .context("Failed due to threadpool error")??;

    sort_dishes(&mut dishes, filter.sort);
    Ok(dishes)
}

#[derive(Serialize)]
pub struct DishDetail{
    pub dish: Dish,
    pub restaurant: Option<Restaurant>,
    pub city: Option<City>
}

#[tracing::instrument(
    "Getting dish detail",
    skip(conn)
)]
pub async fn get_dish_detail(
    mut conn: DbConnection,
    dish_id: Uuid
) -> Result<Option<DishDetail>, anyhow::Error>{
    spawn_blocking_with_tracing(move || -> Result<Option<DishDetail>, anyhow::Error> {
        let dish = dishes::table
            .find(dish_id)
            .select(Dish::as_select())
            .first::<Dish>(&mut conn)
            .optional()
            .context("Failed to get dish")?;

        let Some(dish) = dish else {
            return Ok(None)
        };

        let restaurant = match dish.restaurant_id {
            Some(id) => restaurants::table
                .find(id)
                .select(Restaurant::as_select())
                .first::<Restaurant>(&mut conn)
                .optional()
                .context("Failed to get restaurant of dish")?,
            None => None
        };

        let city = match dish.city_id {
            Some(id) => cities::table
                .find(id)
                .select(City::as_select())
                .first::<City>(&mut conn)
                .optional()
                .context("Failed to get city of dish")?,
            None => None
        };

        Ok(Some(DishDetail{ dish, restaurant, city }))
    })
    .await
    .context("Failed due to threadpool error")?
}

#[derive(Serialize)]
pub struct SearchResults{
    pub query: String,
    pub dishes: Vec<Dish>,
    pub restaurants: Vec<Restaurant>
}

#[tracing::instrument(
    "Searching catalogue",
    skip(conn)
)]
pub async fn search(
    mut conn: DbConnection,
    q: String
) -> Result<SearchResults, anyhow::Error>{
    let q = q.trim().to_string();
    if q.is_empty() {
        return Ok(SearchResults{ query: q, dishes: Vec::new(), restaurants: Vec::new() })
    }

    spawn_blocking_with_tracing(move || -> Result<SearchResults, anyhow::Error> {
        let pattern = like_pattern(&q);

        let dishes = dishes::table
            .filter(
                dishes::name.ilike(&pattern)
                    .or(dishes::description.ilike(&pattern))
                    .or(dishes::ingredients.ilike(&pattern))
            )
            .order(dishes::name.asc())
            .select(Dish::as_select())
            .load::<Dish>(&mut conn)
            .context("Failed to search dishes")?;

        let restaurants = restaurants::table
            .inner_join(cities::table)
            .filter(
                restaurants::name.ilike(&pattern)
                    .or(restaurants::description.ilike(&pattern))
                    .or(cities::name.ilike(&pattern))
            )
            .order(restaurants::name.asc())
            .select(Restaurant::as_select())
            .load::<Restaurant>(&mut conn)
            .context("Failed to search restaurants")?;

        Ok(SearchResults{ query: q, dishes, restaurants })
    })
    .await
    .context("Failed due to threadpool error")?
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    fn dish(name: &str, tier: &str, category_id: Option<Uuid>) -> Dish {
        Dish{
            dish_id: Uuid::new_v4(),
            name: name.to_string(),
            description: String::new(),
            price_range: tier.to_string(),
            dish_type: "salty".to_string(),
            is_vegetarian: false,
            is_vegan: false,
            ingredients: None,
            city_id: None,
            restaurant_id: None,
            category_id,
            origin: String::new(),
            created_at: Utc::now()
        }
    }

    #[test]
    fn price_sort_follows_tier_prices_not_letters(){
        let mut dishes = vec![dish("Tagine", "H", None), dish("Harira", "L", None), dish("Couscous", "M", None)];

        sort_dishes(&mut dishes, DishSort::PriceAsc);
        let names: Vec<_> = dishes.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["Harira", "Couscous", "Tagine"]);

        sort_dishes(&mut dishes, DishSort::PriceDesc);
        assert_eq!(dishes[0].name, "Tagine");
    }

    #[test]
    fn uncategorized_dishes_form_a_trailing_section(){
        let category = Category{
            category_id: Uuid::new_v4(),
            restaurant_id: Uuid::new_v4(),
            name: "Starters".to_string(),
            description: String::new(),
            created_at: Utc::now()
        };
        let menu = group_menu(
            vec![category.clone()],
            vec![dish("Harira", "L", Some(category.category_id)), dish("Mint tea", "L", None)]
        );

        assert_eq!(menu.len(), 2);
        assert_eq!(menu[0].dishes.len(), 1);
        assert!(menu[1].category.is_none());
        assert_eq!(menu[1].dishes[0].name, "Mint tea");
    }

    #[test]
    fn like_pattern_escapes_wildcards(){
        assert_eq!(like_pattern(" 100%_ "), "%100\\%\\_%");
    }
}
