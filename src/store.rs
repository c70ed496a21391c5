use thiserror::Error;

use crate::models::{Ingredient, NewRecipe};

#[cfg(test)]
pub(crate) mod memory;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("duplicate {entity} for key '{key}'")]
    Duplicate { entity: &'static str, key: String },

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("generated id {0} is out of range for the id column")]
    IdOutOfRange(u64),

    #[error("no transaction is open")]
    NoTransaction,
}

// begin nests: the first opens a transaction, later ones open savepoints.
// commit and rollback act on the innermost scope.
pub trait Session {
    fn begin(&mut self) -> StoreResult<()>;

    fn commit(&mut self) -> StoreResult<()>;

    fn rollback(&mut self) -> StoreResult<()>;

    fn depth(&self) -> u32;

    fn find_recipe_id_by_url(&mut self, url: &str) -> StoreResult<Option<i32>>;

    // flush: returns the generated id without committing
    fn insert_recipe(&mut self, recipe: &NewRecipe) -> StoreResult<i32>;

    fn find_ingredient_by_name(&mut self, name: &str) -> StoreResult<Option<Ingredient>>;

    fn insert_ingredient(&mut self, name: &str) -> StoreResult<Ingredient>;

    fn link_ingredient(&mut self, recipe_id: i32, ingredient_id: i32) -> StoreResult<()>;

    fn rollback_all(&mut self) -> StoreResult<()> {
        while self.depth() > 0 {
            self.rollback()?;
        }
        Ok(())
    }
}
