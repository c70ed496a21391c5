use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use crate::schema::{ingredients, recipe_ingredients, recipes};

#[derive(Debug, Clone, PartialEq, Insertable)]
#[table_name = "recipes"]
pub struct NewRecipe {
    pub author: String,
    pub title: String,
    pub cook_time_minutes: i32,
    pub prep_time_minutes: i32,
    pub total_time_minutes: i32,
    pub description: String,
    pub footnotes: String,
    // raw list as scraped, kept for display
    pub ingredients: String,
    pub instructions: String,
    pub rating_stars: BigDecimal,
    pub review_count: i32,
    pub time_scraped: NaiveDate,
    pub url: String,
    pub photo_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable)]
pub struct Ingredient {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Insertable)]
#[table_name = "ingredients"]
pub(crate) struct NewIngredient<'a> {
    pub name: &'a str,
}

// pair <recipe, ingredient>, no attributes of its own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Insertable)]
#[table_name = "recipe_ingredients"]
pub struct RecipeIngredient {
    pub recipe_id: i32,
    pub ingredient_id: i32,
}
