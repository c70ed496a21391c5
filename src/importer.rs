use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::models::NewRecipe;
use crate::record::{self, Record, RecordError};
use crate::store::{Session, StoreError};

pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_DIRECTORY: &str = "data/recipes_json";
// only files from this scrape source are imported
pub const DEFAULT_FILE_FILTER: &str = "allrecipes-recipes-fixed_filtered";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOptions {
    pub batch_size: usize,
    pub file_filter: String,
}

impl Default for ImportOptions {
    fn default() -> Self {
        ImportOptions {
            batch_size: DEFAULT_BATCH_SIZE,
            file_filter: DEFAULT_FILE_FILTER.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub errors: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("batch size must be at least 1")]
    InvalidBatchSize,

    #[error("cannot read directory {}: {source}", .path.display())]
    ReadDir { path: PathBuf, source: io::Error },

    #[error("cannot read {}: {source}", .path.display())]
    ReadFile { path: PathBuf, source: io::Error },

    #[error("malformed JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("{} must hold a recipe object or a list of them", .path.display())]
    Shape { path: PathBuf },

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Resolves `directory` against `app_root` unless it is already absolute.
pub fn resolve_directory(directory: &Path, app_root: &Path) -> PathBuf {
    if directory.is_absolute() {
        directory.to_path_buf()
    } else {
        app_root.join(directory)
    }
}

/// Imports every matching file under `directory` through `session`.
///
/// Never fails: per-record and per-file problems are counted in `errors`, and
/// anything that stops the run early is reported in `error_message` next to the
/// totals reached so far.
pub fn import<S>(session: &mut S, directory: &Path, options: &ImportOptions) -> ImportReport
where
    S: Session + ?Sized,
{
    let scraped_on = chrono::Local::now().date_naive();
    let mut importer = Importer::new(session, options, scraped_on);

    match importer.run(directory) {
        Ok(()) => {
            log::info!(
                "Import completed. Total imported: {}, Total errors: {}",
                importer.report.imported,
                importer.report.errors
            );
        }
        Err(err) => {
            log::error!("Fatal error during import: {}", err);
            if let Err(rollback_err) = importer.session.rollback_all() {
                log::error!("rollback after fatal error failed: {}", rollback_err);
            }
            importer.report.error_message = Some(err.to_string());
        }
    }
    importer.report
}

// cleared at every commit; later batches find earlier ingredients through the store
#[derive(Debug, Default)]
struct Batch {
    pending: usize,
    ingredients: HashMap<String, i32>,
}

impl Batch {
    fn clear(&mut self) {
        self.pending = 0;
        self.ingredients.clear();
    }
}

struct Importer<'a, S: ?Sized> {
    session: &'a mut S,
    options: &'a ImportOptions,
    scraped_on: NaiveDate,
    batch: Batch,
    report: ImportReport,
}

impl<'a, S: Session + ?Sized> Importer<'a, S> {
    fn new(session: &'a mut S, options: &'a ImportOptions, scraped_on: NaiveDate) -> Self {
        Importer {
            session,
            options,
            scraped_on,
            batch: Batch::default(),
            report: ImportReport::default(),
        }
    }

    fn run(&mut self, directory: &Path) -> Result<(), ImportError> {
        if self.options.batch_size == 0 {
            return Err(ImportError::InvalidBatchSize);
        }

        for path in candidate_files(directory, &self.options.file_filter)? {
            log::info!("Processing file: {}", path.display());
            if let Err(err) = self.import_file(&path) {
                log::warn!("Error processing file {}: {}", path.display(), err);
                self.batch.clear();
                // a connection that cannot roll back is not safe to keep using
                self.session.rollback_all()?;
                self.report.errors += 1;
            }
        }
        Ok(())
    }

    fn import_file(&mut self, path: &Path) -> Result<(), ImportError> {
        let records = load_records(path)?;
        log::info!("Found {} recipes in {}", records.len(), path.display());

        for (idx, value) in records.iter().enumerate() {
            let record = match value.as_object() {
                Some(record) => record,
                None => {
                    log::debug!("Skipping non-object recipe #{}: {}", idx + 1, value);
                    continue;
                }
            };
            let url = match record::record_url(record) {
                Some(url) => url,
                None => {
                    log::debug!("Skipping recipe #{} without url", idx + 1);
                    continue;
                }
            };
            self.import_record(record, url)?;
        }

        if self.batch.pending > 0 {
            self.commit_batch()?;
        } else if self.session.depth() > 0 {
            // only failed records since the last commit
            self.session.rollback_all()?;
            self.batch.clear();
        }
        Ok(())
    }

    // record failures are counted here, Err means the batch transaction is broken
    fn import_record(&mut self, record: &Record, url: &str) -> Result<(), ImportError> {
        let title = record::record_title(record);

        match self.session.find_recipe_id_by_url(url) {
            Ok(Some(_)) => {
                log::debug!("Recipe already exists: {}", title);
                return Ok(());
            }
            Ok(None) => {}
            Err(err) => {
                log::warn!("Error looking up recipe \"{}\": {}", title, err);
                self.report.errors += 1;
                return Ok(());
            }
        }

        let recipe = match NewRecipe::from_record(record, self.scraped_on) {
            Ok(recipe) => recipe,
            Err(err) => {
                log::warn!("Error creating recipe \"{}\": {}", title, err);
                self.report.errors += 1;
                return Ok(());
            }
        };

        if self.session.depth() == 0 {
            self.session.begin()?;
        }
        self.session.begin()?;

        let mut created = Vec::new();
        match self.stage(&recipe, record, &mut created) {
            Ok(recipe_id) => {
                self.session.commit()?;
                self.batch.pending += 1;
                log::debug!("Recipe \"{}\" staged with id {}", title, recipe_id);
            }
            Err(err) => {
                log::warn!("Error importing recipe \"{}\": {}", title, err);
                self.session.rollback()?;
                // rolled back with the savepoint, so the cache must forget them too
                for name in created {
                    self.batch.ingredients.remove(&name);
                }
                self.report.errors += 1;
                return Ok(());
            }
        }

        if self.batch.pending >= self.options.batch_size {
            self.commit_batch()?;
        }
        Ok(())
    }

    fn stage(
        &mut self,
        recipe: &NewRecipe,
        record: &Record,
        created: &mut Vec<String>,
    ) -> Result<i32, ImportError> {
        let recipe_id = self.session.insert_recipe(recipe)?;

        let mut attached = HashSet::new();
        for name in record::ingredient_names(record) {
            let ingredient_id = self.resolve_ingredient(name, created)?;
            if attached.insert(ingredient_id) {
                self.session.link_ingredient(recipe_id, ingredient_id)?;
            } else {
                log::debug!("Skipping duplicate ingredient '{}'", name);
            }
        }
        Ok(recipe_id)
    }

    fn resolve_ingredient(
        &mut self,
        name: &str,
        created: &mut Vec<String>,
    ) -> Result<i32, ImportError> {
        if let Some(&id) = self.batch.ingredients.get(name) {
            return Ok(id);
        }
        record::check_ingredient_name(name)?;

        let ingredient = match self.session.find_ingredient_by_name(name)? {
            Some(existing) => existing,
            None => {
                let ingredient = self.session.insert_ingredient(name)?;
                log::debug!("Created ingredient '{}' with id {}", name, ingredient.id);
                created.push(name.to_string());
                ingredient
            }
        };
        self.batch.ingredients.insert(name.to_string(), ingredient.id);
        Ok(ingredient.id)
    }

    fn commit_batch(&mut self) -> Result<(), ImportError> {
        log::info!("Committing batch of {} recipes...", self.batch.pending);
        self.session.commit()?;
        self.report.imported += self.batch.pending;
        self.batch.clear();
        Ok(())
    }
}

fn candidate_files(directory: &Path, file_filter: &str) -> Result<Vec<PathBuf>, ImportError> {
    let read_dir_err = |source| ImportError::ReadDir {
        path: directory.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(directory).map_err(read_dir_err)? {
        let entry = entry.map_err(read_dir_err)?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.ends_with(".json") && name.contains(file_filter) {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

fn load_records(path: &Path) -> Result<Vec<Value>, ImportError> {
    let contents = fs::read_to_string(path).map_err(|source| ImportError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let data: Value = serde_json::from_str(&contents).map_err(|source| ImportError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    match data {
        Value::Array(records) => Ok(records),
        record @ Value::Object(_) => Ok(vec![record]),
        _ => Err(ImportError::Shape {
            path: path.to_path_buf(),
        }),
    }
}
