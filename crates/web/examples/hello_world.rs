use cosine::{Dispatcher, RequestContext, Router, Server, handler_fn};

fn hello_world(ctx: &mut RequestContext) {
    ctx.envelope_mut().set_data("hello world");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let router = Router::builder().get("/", handler_fn(hello_world)).build()?;
    let dispatcher = Dispatcher::builder().router(router).build()?;

    Server::builder().dispatcher(dispatcher).build()?.start().await?;
    Ok(())
}
