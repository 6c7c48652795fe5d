//! # Recipe Catalog
//!
//! All recipes, loaded in bulk from a `Recipes/` directory of TOML files
//! and looked up by [`RecipeId`].
//!
//! ## Validation
//!
//! 1. **Unique ids** across every file
//! 2. **Sane values**: `max_stack >= 1`, `build_time >= 0`, non-negative offer weights
//! 3. **References resolve**: dependencies and weapon ammo recipes name known recipes
//! 4. **No cycles**: the dependency graph is a DAG (Kahn's algorithm)

use serde::Deserialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{EconomyError, EconomyResult};
use crate::recipe::{Recipe, RecipeId};

/// Logical directory, relative to the data root, holding recipe files.
pub const RECIPE_DIR: &str = "Recipes";

#[derive(Deserialize)]
struct RecipeFile {
    #[serde(default, rename = "recipe")]
    recipes: Vec<Recipe>,
}

/// Validated, immutable recipe set.
#[derive(Clone, Debug, Default)]
pub struct RecipeCatalog {
    recipes: Vec<Recipe>,
    index: HashMap<RecipeId, usize>,
}

impl RecipeCatalog {
    /// Builds and validates a catalog.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateRecipe`, `InvalidRecipe`, `RecipeNotFound` for a
    /// dangling reference, or `CycleDetected`.
    pub fn new(recipes: Vec<Recipe>) -> EconomyResult<Self> {
        let mut index = HashMap::with_capacity(recipes.len());
        for (i, recipe) in recipes.iter().enumerate() {
            if index.insert(recipe.id, i).is_some() {
                return Err(EconomyError::DuplicateRecipe(recipe.id));
            }
        }

        let catalog = Self { recipes, index };
        for recipe in &catalog.recipes {
            catalog.validate_recipe(recipe)?;
        }
        if !catalog.validate_no_cycles() {
            let cycle = catalog.find_cycle().unwrap_or_default();
            return Err(EconomyError::CycleDetected(cycle));
        }

        tracing::debug!("Recipe catalog validated: {} recipes", catalog.len());
        Ok(catalog)
    }

    fn validate_recipe(&self, recipe: &Recipe) -> EconomyResult<()> {
        let invalid = |reason: &str| EconomyError::InvalidRecipe {
            id: recipe.id,
            reason: reason.to_string(),
        };

        if recipe.max_stack == 0 {
            return Err(invalid("max_stack must be at least 1"));
        }
        if recipe.build_time.is_nan() || recipe.build_time < 0.0 {
            return Err(invalid("build_time must be non-negative"));
        }
        if recipe.offer_weight.is_nan() || recipe.offer_weight < 0.0 {
            return Err(invalid("offer_weight must be non-negative"));
        }
        for dependency in &recipe.dependencies {
            if *dependency == recipe.id {
                return Err(invalid("recipe depends on itself"));
            }
            if !self.index.contains_key(dependency) {
                return Err(EconomyError::RecipeNotFound(*dependency));
            }
        }
        if let Some(ammo) = recipe.ammo_recipe() {
            if !self.index.contains_key(&ammo) {
                return Err(EconomyError::RecipeNotFound(ammo));
            }
        }
        Ok(())
    }

    /// Parses one `[[recipe]]` file.
    ///
    /// # Errors
    ///
    /// Returns `Parse` on malformed TOML, or any validation error.
    pub fn from_toml_str(text: &str) -> EconomyResult<Self> {
        Self::new(parse_recipes(text, "<inline>")?)
    }

    /// Loads every `*.toml` file in a directory, in file-name order.
    ///
    /// # Errors
    ///
    /// Returns `Io` when the directory or a file cannot be read, or any
    /// parse/validation error.
    pub fn load_dir(dir: impl AsRef<Path>) -> EconomyResult<Self> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|e| EconomyError::io(dir, &e))?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        files.sort();

        let mut recipes = Vec::new();
        for path in &files {
            let text = std::fs::read_to_string(path).map_err(|e| EconomyError::io(path, &e))?;
            recipes.extend(parse_recipes(&text, &path.display().to_string())?);
        }

        tracing::info!(
            "Loaded {} recipes from {} files in {}",
            recipes.len(),
            files.len(),
            dir.display()
        );
        Self::new(recipes)
    }

    /// Looks up a recipe.
    #[inline]
    #[must_use]
    pub fn get(&self, id: &RecipeId) -> Option<&Recipe> {
        self.index.get(id).map(|&i| &self.recipes[i])
    }

    /// True when the id is known.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &RecipeId) -> bool {
        self.index.contains_key(id)
    }

    /// Iterates recipes in load order.
    pub fn iter(&self) -> impl Iterator<Item = &Recipe> {
        self.recipes.iter()
    }

    /// Finds a recipe by display name.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&Recipe> {
        self.recipes.iter().find(|r| r.name == name)
    }

    /// Number of recipes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    /// True when the catalog holds no recipes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    /// Checks the dependency graph is acyclic.
    ///
    /// Edges run from a dependency to each recipe that needs it; a full
    /// topological sort means no cycles.
    #[must_use]
    pub fn validate_no_cycles(&self) -> bool {
        let mut in_degree: HashMap<RecipeId, usize> =
            self.recipes.iter().map(|r| (r.id, 0)).collect();
        let mut dependents: HashMap<RecipeId, Vec<RecipeId>> = HashMap::new();

        for recipe in &self.recipes {
            for dependency in &recipe.dependencies {
                dependents.entry(*dependency).or_default().push(recipe.id);
                *in_degree.entry(recipe.id).or_insert(0) += 1;
            }
        }

        let mut queue: VecDeque<RecipeId> = in_degree
            .iter()
            .filter(|(_, &deg)| deg == 0)
            .map(|(&id, _)| id)
            .collect();

        let mut sorted_count = 0;
        while let Some(id) = queue.pop_front() {
            sorted_count += 1;
            for next in dependents.get(&id).into_iter().flatten() {
                if let Some(deg) = in_degree.get_mut(next) {
                    *deg -= 1;
                    if *deg == 0 {
                        queue.push_back(*next);
                    }
                }
            }
        }

        sorted_count == self.recipes.len()
    }

    /// Returns one dependency cycle, first id repeated at the end.
    #[must_use]
    pub fn find_cycle(&self) -> Option<Vec<RecipeId>> {
        let mut visited = HashSet::new();
        let mut on_stack = HashSet::new();
        let mut path = Vec::new();

        for recipe in &self.recipes {
            if !visited.contains(&recipe.id) {
                if let Some(cycle) = self.dfs_find_cycle(recipe.id, &mut visited, &mut on_stack, &mut path) {
                    return Some(cycle);
                }
            }
        }
        None
    }

    fn dfs_find_cycle(
        &self,
        id: RecipeId,
        visited: &mut HashSet<RecipeId>,
        on_stack: &mut HashSet<RecipeId>,
        path: &mut Vec<RecipeId>,
    ) -> Option<Vec<RecipeId>> {
        visited.insert(id);
        on_stack.insert(id);
        path.push(id);

        if let Some(recipe) = self.get(&id) {
            for &dependency in &recipe.dependencies {
                if !visited.contains(&dependency) {
                    if let Some(cycle) = self.dfs_find_cycle(dependency, visited, on_stack, path) {
                        return Some(cycle);
                    }
                } else if on_stack.contains(&dependency) {
                    let start = path.iter().position(|&p| p == dependency).unwrap_or(0);
                    let mut cycle = path[start..].to_vec();
                    cycle.push(dependency);
                    return Some(cycle);
                }
            }
        }

        path.pop();
        on_stack.remove(&id);
        None
    }
}

fn parse_recipes(text: &str, source_name: &str) -> EconomyResult<Vec<Recipe>> {
    let file: RecipeFile = toml::from_str(text).map_err(|e| EconomyError::Parse {
        source_name: source_name.to_string(),
        message: e.to_string(),
    })?;
    Ok(file.recipes)
}

/// Loads the catalog from a data root on first use and shares it afterwards.
#[derive(Debug)]
pub struct RecipeLibrary {
    root: PathBuf,
    loaded: Option<Arc<RecipeCatalog>>,
}

impl RecipeLibrary {
    /// Creates a library over `<root>/Recipes`. Nothing is read yet.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            loaded: None,
        }
    }

    /// Directory the recipes are read from.
    #[must_use]
    pub fn recipe_dir(&self) -> PathBuf {
        self.root.join(RECIPE_DIR)
    }

    /// Returns the catalog, loading it on the first call.
    ///
    /// # Errors
    ///
    /// Any error from [`RecipeCatalog::load_dir`]. A failed load is retried
    /// on the next call.
    pub fn catalog(&mut self) -> EconomyResult<Arc<RecipeCatalog>> {
        if let Some(catalog) = &self.loaded {
            return Ok(Arc::clone(catalog));
        }
        let catalog = Arc::new(RecipeCatalog::load_dir(self.recipe_dir())?);
        self.loaded = Some(Arc::clone(&catalog));
        Ok(catalog)
    }

    /// True once the catalog has been loaded.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }
}
