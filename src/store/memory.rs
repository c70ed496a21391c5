use std::collections::HashSet;

use crate::models::{Ingredient, NewRecipe, RecipeIngredient};
use crate::store::{Session, StoreError, StoreResult};

#[derive(Debug, Clone, Default)]
struct Tables {
    recipes: Vec<(i32, NewRecipe)>,
    ingredients: Vec<Ingredient>,
    links: Vec<RecipeIngredient>,
}

// ids survive rollbacks, like AUTO_INCREMENT
#[derive(Debug, Default)]
pub(crate) struct MemorySession {
    committed: Tables,
    working: Tables,
    scopes: Vec<Tables>,
    next_recipe_id: i32,
    next_ingredient_id: i32,
    commit_sizes: Vec<usize>,
    failing_ingredients: HashSet<String>,
    fail_next_commit: bool,
    fail_rollbacks: bool,
}

impl MemorySession {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fail_ingredient(&mut self, name: &str) {
        self.failing_ingredients.insert(name.to_string());
    }

    // the transaction stays open, as after a failed COMMIT
    pub(crate) fn fail_next_commit(&mut self) {
        self.fail_next_commit = true;
    }

    pub(crate) fn fail_rollbacks(&mut self) {
        self.fail_rollbacks = true;
    }

    pub(crate) fn commit_sizes(&self) -> &[usize] {
        &self.commit_sizes
    }

    pub(crate) fn recipes(&self) -> Vec<&NewRecipe> {
        self.committed.recipes.iter().map(|(_, r)| r).collect()
    }

    pub(crate) fn recipe(&self, url: &str) -> Option<&NewRecipe> {
        self.committed
            .recipes
            .iter()
            .find(|(_, r)| r.url == url)
            .map(|(_, r)| r)
    }

    pub(crate) fn ingredient_names(&self) -> Vec<&str> {
        self.committed
            .ingredients
            .iter()
            .map(|i| i.name.as_str())
            .collect()
    }

    pub(crate) fn links(&self) -> &[RecipeIngredient] {
        &self.committed.links
    }

    pub(crate) fn ingredients_of(&self, url: &str) -> Vec<&str> {
        let recipe_id = match self.committed.recipes.iter().find(|(_, r)| r.url == url) {
            Some((id, _)) => *id,
            None => return Vec::new(),
        };
        let mut names: Vec<&str> = self
            .committed
            .links
            .iter()
            .filter(|l| l.recipe_id == recipe_id)
            .filter_map(|l| {
                self.committed
                    .ingredients
                    .iter()
                    .find(|i| i.id == l.ingredient_id)
                    .map(|i| i.name.as_str())
            })
            .collect();
        names.sort_unstable();
        names
    }

    fn autocommit(&mut self) {
        if self.scopes.is_empty() {
            self.committed = self.working.clone();
        }
    }
}

impl Session for MemorySession {
    fn begin(&mut self) -> StoreResult<()> {
        self.scopes.push(self.working.clone());
        Ok(())
    }

    fn commit(&mut self) -> StoreResult<()> {
        if self.scopes.len() == 1 && self.fail_next_commit {
            self.fail_next_commit = false;
            return Err(StoreError::Constraint("commit refused".to_string()));
        }
        self.scopes.pop().ok_or(StoreError::NoTransaction)?;
        if self.scopes.is_empty() {
            let written = self.working.recipes.len() - self.committed.recipes.len();
            self.commit_sizes.push(written);
            self.committed = self.working.clone();
        }
        Ok(())
    }

    fn rollback(&mut self) -> StoreResult<()> {
        if self.fail_rollbacks {
            return Err(StoreError::Constraint("rollback refused".to_string()));
        }
        self.working = self.scopes.pop().ok_or(StoreError::NoTransaction)?;
        Ok(())
    }

    fn depth(&self) -> u32 {
        self.scopes.len() as u32
    }

    fn find_recipe_id_by_url(&mut self, url: &str) -> StoreResult<Option<i32>> {
        Ok(self
            .working
            .recipes
            .iter()
            .find(|(_, r)| r.url == url)
            .map(|(id, _)| *id))
    }

    fn insert_recipe(&mut self, recipe: &NewRecipe) -> StoreResult<i32> {
        if self.working.recipes.iter().any(|(_, r)| r.url == recipe.url) {
            return Err(StoreError::Duplicate {
                entity: "recipe",
                key: recipe.url.clone(),
            });
        }
        self.next_recipe_id += 1;
        let id = self.next_recipe_id;
        self.working.recipes.push((id, recipe.clone()));
        self.autocommit();
        Ok(id)
    }

    fn find_ingredient_by_name(&mut self, name: &str) -> StoreResult<Option<Ingredient>> {
        Ok(self
            .working
            .ingredients
            .iter()
            .find(|i| i.name == name)
            .cloned())
    }

    fn insert_ingredient(&mut self, name: &str) -> StoreResult<Ingredient> {
        if self.failing_ingredients.contains(name) {
            return Err(StoreError::Constraint(format!("rejected ingredient '{name}'")));
        }
        if self.working.ingredients.iter().any(|i| i.name == name) {
            return Err(StoreError::Duplicate {
                entity: "ingredient",
                key: name.to_string(),
            });
        }
        self.next_ingredient_id += 1;
        let ingredient = Ingredient {
            id: self.next_ingredient_id,
            name: name.to_string(),
        };
        self.working.ingredients.push(ingredient.clone());
        self.autocommit();
        Ok(ingredient)
    }

    fn link_ingredient(&mut self, recipe_id: i32, ingredient_id: i32) -> StoreResult<()> {
        let link = RecipeIngredient {
            recipe_id,
            ingredient_id,
        };
        if self.working.links.contains(&link) {
            return Err(StoreError::Duplicate {
                entity: "recipe_ingredient",
                key: format!("{recipe_id}/{ingredient_id}"),
            });
        }
        if !self.working.recipes.iter().any(|(id, _)| *id == recipe_id)
            || !self.working.ingredients.iter().any(|i| i.id == ingredient_id)
        {
            return Err(StoreError::Constraint(format!(
                "foreign key violation for {recipe_id}/{ingredient_id}"
            )));
        }
        self.working.links.push(link);
        self.autocommit();
        Ok(())
    }
}
