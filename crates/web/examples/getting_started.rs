//! Run with an optional config file:
//!
//! ```sh
//! cargo run --example getting_started -- crates/web/examples/cosine.toml
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use cosine::extract::Inject;
use cosine::{Config, Dispatcher, Logger, RequestContext, Router, Server, handler_fn, handlers};
use http::HeaderMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct User {
    name: String,
    zip: String,
}

/// Shared store, handed to every request by the `store` middleware.
#[derive(Debug, Clone, Default)]
struct Store(Arc<RwLock<HashMap<i64, User>>>);

#[derive(Debug, Clone, Default)]
struct Token(Option<String>);

fn store(store: Store) -> impl Fn(&mut RequestContext) {
    move |ctx: &mut RequestContext| {
        ctx.map(store.clone());
    }
}

// curl -v -H 'x-token: secret' http://127.0.0.1:8080/api/users/1
fn read_token(ctx: &mut RequestContext, headers: HeaderMap) {
    let token = headers.get("x-token").and_then(|value| value.to_str().ok()).map(str::to_owned);
    ctx.map(Token(token));
}

fn require_token(ctx: &mut RequestContext, Inject(token): Inject<Token>) {
    if token.0.as_deref() != Some("secret") {
        ctx.envelope_mut().set_forbidden();
    }
}

fn list_users(ctx: &mut RequestContext, Inject(store): Inject<Store>) {
    let users: Vec<User> = store.0.read().values().cloned().collect();
    ctx.envelope_mut().set_data(users);
}

fn show_user(ctx: &mut RequestContext, Inject(store): Inject<Store>, logger: Logger) {
    if ctx.envelope().code() != 200 {
        return;
    }

    let id = ctx.param_as_i64("id");
    let user = store.0.read().get(&id).cloned();
    match user {
        Some(user) => ctx.envelope_mut().set_data(user),
        None => {
            logger.warn(format!("user {id} not found"));
            ctx.envelope_mut().set_exception(404, format!("user {id} not found"));
        }
    }
}

// curl -v -H 'x-token: secret' -d '{"name":"hello","zip":"world"}' http://127.0.0.1:8080/api/users/1
fn save_user(ctx: &mut RequestContext, Inject(store): Inject<Store>, body: Bytes) {
    if ctx.envelope().code() != 200 {
        return;
    }

    match serde_json::from_slice::<User>(&body) {
        Ok(user) => {
            store.0.write().insert(ctx.param_as_i64("id"), user.clone());
            ctx.envelope_mut().set_data(user);
        }
        Err(e) => ctx.envelope_mut().set_exception(400, e.to_string()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let logger = Logger::from_config(&config.log)?;

    let router = Router::builder()
        .group("/api", |api| {
            api.get("/users", handler_fn(list_users))
                .get("/users/:id", handlers![handler_fn(require_token), handler_fn(show_user)])
                .post("/users/:id", handlers![handler_fn(require_token), handler_fn(save_user)])
        })
        .build()?;

    let dispatcher = Dispatcher::builder()
        .router(router)
        .middleware(handler_fn(store(Store::default())))
        .middleware(handler_fn(read_token))
        .logger(logger)
        .build()?;

    Server::builder().config(config.server).dispatcher(dispatcher).build()?.start().await?;
    Ok(())
}
