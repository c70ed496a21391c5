use diesel::connection::TransactionManager;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Unsigned};

use crate::models::{Ingredient, NewIngredient, NewRecipe, RecipeIngredient};
use crate::schema::{ingredients, recipe_ingredients, recipes};
use crate::store::{Session, StoreError, StoreResult};

no_arg_sql_function!(last_insert_id, Unsigned<BigInt>);

pub(crate) fn find_recipe_id_by_url(url: &str, conn: &MysqlConnection) -> QueryResult<Option<i32>> {
    recipes::table
        .filter(recipes::url.eq(url))
        .select(recipes::id)
        .first(conn) //url is unique so there is at most one
        .optional()
}

pub(crate) fn find_ingredient_by_name(
    name: &str,
    conn: &MysqlConnection,
) -> QueryResult<Option<Ingredient>> {
    ingredients::table
        .filter(ingredients::name.eq(name))
        .first::<Ingredient>(conn)
        .optional()
}

pub(crate) fn insert_recipe(recipe: &NewRecipe, conn: &MysqlConnection) -> StoreResult<i32> {
    diesel::insert_into(recipes::table)
        .values(recipe)
        .execute(conn)?;
    generated_id(conn)
}

pub(crate) fn insert_ingredient(name: &str, conn: &MysqlConnection) -> StoreResult<Ingredient> {
    diesel::insert_into(ingredients::table)
        .values(&NewIngredient { name })
        .execute(conn)?;
    Ok(Ingredient {
        id: generated_id(conn)?,
        name: name.to_string(),
    })
}

pub(crate) fn insert_recipe_ingredient(
    link: &RecipeIngredient,
    conn: &MysqlConnection,
) -> QueryResult<usize> {
    diesel::insert_into(recipe_ingredients::table)
        .values(link)
        .execute(conn)
}

// LAST_INSERT_ID() is per connection, so this is safe inside an open transaction
fn generated_id(conn: &MysqlConnection) -> StoreResult<i32> {
    let id: u64 = diesel::select(last_insert_id).get_result(conn)?;
    i32::try_from(id).map_err(|_| StoreError::IdOutOfRange(id))
}

// scopes go through diesel's transaction manager, so a nested begin is a SAVEPOINT
pub struct DieselSession<'a> {
    conn: &'a MysqlConnection,
}

impl<'a> DieselSession<'a> {
    pub fn new(conn: &'a MysqlConnection) -> Self {
        DieselSession { conn }
    }
}

impl Session for DieselSession<'_> {
    fn begin(&mut self) -> StoreResult<()> {
        self.conn.transaction_manager().begin_transaction(self.conn)?;
        Ok(())
    }

    fn commit(&mut self) -> StoreResult<()> {
        if self.depth() == 0 {
            return Err(StoreError::NoTransaction);
        }
        self.conn.transaction_manager().commit_transaction(self.conn)?;
        Ok(())
    }

    fn rollback(&mut self) -> StoreResult<()> {
        if self.depth() == 0 {
            return Err(StoreError::NoTransaction);
        }
        self.conn
            .transaction_manager()
            .rollback_transaction(self.conn)?;
        Ok(())
    }

    fn depth(&self) -> u32 {
        TransactionManager::<MysqlConnection>::get_transaction_depth(
            self.conn.transaction_manager(),
        )
    }

    fn find_recipe_id_by_url(&mut self, url: &str) -> StoreResult<Option<i32>> {
        Ok(find_recipe_id_by_url(url, self.conn)?)
    }

    fn insert_recipe(&mut self, recipe: &NewRecipe) -> StoreResult<i32> {
        insert_recipe(recipe, self.conn)
    }

    fn find_ingredient_by_name(&mut self, name: &str) -> StoreResult<Option<Ingredient>> {
        Ok(find_ingredient_by_name(name, self.conn)?)
    }

    fn insert_ingredient(&mut self, name: &str) -> StoreResult<Ingredient> {
        insert_ingredient(name, self.conn)
    }

    fn link_ingredient(&mut self, recipe_id: i32, ingredient_id: i32) -> StoreResult<()> {
        let link = RecipeIngredient {
            recipe_id,
            ingredient_id,
        };
        insert_recipe_ingredient(&link, self.conn)?;
        Ok(())
    }
}
