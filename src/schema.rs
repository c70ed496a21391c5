table! {
    recipes (id) {
        id -> Int4,
        author -> Varchar,
        title -> Varchar,
        cook_time_minutes -> Int4,
        prep_time_minutes -> Int4,
        total_time_minutes -> Int4,
        description -> Text,
        error -> Bool,
        footnotes -> Text,
        ingredients -> Text,
        instructions -> Text,
        rating_stars -> Numeric,
        review_count -> Int4,
        time_scraped -> Date,
        url -> Varchar,
        photo_url -> Varchar,
    }
}

table! {
    ingredients (id) {
        id -> Int4,
        name -> Varchar,
    }
}

table! {
    recipe_ingredients (recipe_id, ingredient_id) {
        recipe_id -> Int4,
        ingredient_id -> Int4,
    }
}

joinable!(recipe_ingredients -> recipes (recipe_id));
joinable!(recipe_ingredients -> ingredients (ingredient_id));

allow_tables_to_appear_in_same_query!(recipes, ingredients, recipe_ingredients);
