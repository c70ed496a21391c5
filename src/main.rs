use std::path::{Path, PathBuf};

use actix_web::{get, middleware, post, web, App, Error, HttpResponse, HttpServer};
use clap::{Parser, Subcommand};
use diesel::prelude::*;
use serde::Deserialize;

use sabersabor::db::{self, DbPool};
use sabersabor::importer::{
    self, resolve_directory, ImportOptions, DEFAULT_BATCH_SIZE, DEFAULT_DIRECTORY,
    DEFAULT_FILE_FILTER,
};
use sabersabor::DieselSession;

#[derive(Parser, Debug)]
#[command(name = "sabersabor", about = "Recipe catalog and JSON importer")]
struct Cli {
    /// MySQL connection string.
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Base for relative import directories.
    #[arg(long, env = "APP_ROOT", default_value = ".")]
    app_root: PathBuf,

    /// Substring a JSON file name must contain to be imported.
    #[arg(long, env = "IMPORT_FILE_FILTER", default_value = DEFAULT_FILE_FILTER)]
    file_filter: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Clear existing data and create new tables
    InitDb,
    /// Import recipes from JSON files in the specified directory
    ImportRecipes {
        #[arg(default_value = DEFAULT_DIRECTORY)]
        directory: PathBuf,

        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
    },
    /// Serve the web application
    Serve {
        #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:8080")]
        bind: String,
    },
}

struct Settings {
    app_root: PathBuf,
    file_filter: String,
}

#[derive(Debug, Deserialize)]
struct ImportRequest {
    directory: Option<String>,
    batch_size: Option<usize>,
}

#[get("/hello")]
async fn hello() -> HttpResponse {
    HttpResponse::Ok().body("Hello World")
}

#[post("/apis/import")]
async fn import_recipes(
    body: web::Json<ImportRequest>,
    settings: web::Data<Settings>,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, Error> {
    let request = body.into_inner();
    let report = web::block(move || {
        let conn = pool.get()?;
        let directory = request.directory.as_deref().unwrap_or(DEFAULT_DIRECTORY);
        let directory = resolve_directory(Path::new(directory), &settings.app_root);
        let options = ImportOptions {
            batch_size: request.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
            file_filter: settings.file_filter.clone(),
        };
        let mut session = DieselSession::new(&conn);
        Ok::<_, diesel::r2d2::PoolError>(importer::import(&mut session, &directory, &options))
    })
    .await?
    .map_err(actix_web::error::ErrorInternalServerError)?;
    Ok(HttpResponse::Ok().json(report))
}

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cli = Cli::parse();
    let settings = Settings {
        app_root: cli.app_root,
        file_filter: cli.file_filter,
    };

    match cli.command {
        Command::InitDb => {
            let conn = MysqlConnection::establish(&cli.database_url)?;
            db::init_db(&conn)?;
            println!("Initialized database");
        }
        Command::ImportRecipes {
            directory,
            batch_size,
        } => {
            println!("Importing recipes from {}", directory.display());
            let conn = MysqlConnection::establish(&cli.database_url)?;
            let options = ImportOptions {
                batch_size,
                file_filter: settings.file_filter,
            };
            let directory = resolve_directory(&directory, &settings.app_root);
            let report = importer::import(&mut DieselSession::new(&conn), &directory, &options);
            println!(
                "Import completed. Imported: {}, Errors: {}",
                report.imported, report.errors
            );
            if let Some(message) = report.error_message {
                return Err(message.into());
            }
        }
        Command::Serve { bind } => {
            let pool = db::build_pool(&cli.database_url)?;
            let settings = web::Data::new(settings);

            log::info!("starting HTTP server at http://{}", bind);

            HttpServer::new(move || {
                App::new()
                    .app_data(web::Data::new(pool.clone()))
                    .app_data(settings.clone())
                    .wrap(middleware::Logger::default())
                    .service(hello)
                    .service(import_recipes)
            })
            .bind(bind)?
            .run()
            .await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test as web_test;

    #[actix_web::test]
    async fn hello_says_hello_world() {
        let app = web_test::init_service(App::new().service(hello)).await;
        let req = web_test::TestRequest::get().uri("/hello").to_request();
        let body = web_test::call_and_read_body(&app, req).await;
        assert_eq!(&body[..], b"Hello World");
    }

    #[test]
    fn import_command_defaults() {
        let cli = Cli::try_parse_from([
            "sabersabor",
            "--database-url",
            "mysql://localhost/sabersabor",
            "import-recipes",
        ])
        .unwrap();
        assert_eq!(
            cli.command,
            Command::ImportRecipes {
                directory: PathBuf::from("data/recipes_json"),
                batch_size: 100,
            }
        );
    }

    #[test]
    fn import_command_takes_directory_and_batch_size() {
        let cli = Cli::try_parse_from([
            "sabersabor",
            "--database-url",
            "mysql://localhost/sabersabor",
            "import-recipes",
            "/data/json",
            "--batch-size",
            "25",
        ])
        .unwrap();
        assert_eq!(
            cli.command,
            Command::ImportRecipes {
                directory: PathBuf::from("/data/json"),
                batch_size: 25,
            }
        );
    }
}
