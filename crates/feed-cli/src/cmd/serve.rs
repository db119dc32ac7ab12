use crate::context::{block_on, Context};
use std::path::PathBuf;

pub fn run(ctx: &Context, port: Option<u16>, seed: Option<PathBuf>) -> anyhow::Result<()> {
    let port = port.unwrap_or(ctx.config.server.port);
    let seed = seed.or_else(|| ctx.config.server.seed.clone());
    let state = feed_server::load_state(seed.as_deref())?;
    let state = state.with_page_size(ctx.config.incidents.page_size);
    block_on(feed_server::serve(state, port))?
}
