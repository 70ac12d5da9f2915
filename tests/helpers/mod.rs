#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use mealsync::{
    AppState,
    config::{Config, DatabaseConfig, JwtConfig, ObservabilityConfig, ServerConfig},
    db::Pools,
};
use mealsync_mealplan::{SqliteStore, SyncOptions};
use serde_json::Value;
use temp_dir::TempDir;
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub config: Config,
    pub store: SqliteStore,
    pub pools: Pools,
    _dir: TempDir,
}

pub fn create_test_config(url: String) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database: DatabaseConfig {
            url,
            max_connections: 2,
        },
        jwt: JwtConfig {
            secret: "test_secret_key_minimum_32_characters_long".to_string(),
            expiration_days: 1,
            issuer: "mealsync".to_string(),
            audience: "mealsync".to_string(),
        },
        observability: ObservabilityConfig {
            log_level: "warn".to_string(),
            format: None,
        },
        sync: SyncOptions::default(),
    }
}

/// Router over a migrated database in a temporary directory.
pub async fn setup_test_app() -> anyhow::Result<TestApp> {
    let dir = TempDir::new()?;
    let url = format!("sqlite:{}", dir.child("db.sqlite3").to_str().unwrap());
    let config = create_test_config(url);

    let pools = Pools::connect(&config.database).await?;
    mealsync_db::migrate(&pools.write).await?;

    let store = SqliteStore::new(pools.read.clone(), pools.write.clone());
    let router = mealsync::router(AppState {
        config: config.clone(),
        store: store.clone(),
        pool: pools.read.clone(),
    });

    Ok(TestApp {
        router,
        config,
        store,
        pools,
        _dir: dir,
    })
}

impl TestApp {
    pub fn token(&self, sub: &str) -> String {
        mealsync::auth::generate_token(&self.config.jwt, sub).unwrap()
    }

    /// Sends a request as `owner`, anonymous when `None`.
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        owner: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(owner) = owner {
            builder = builder.header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.token(owner)),
            );
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, json)
    }
}
