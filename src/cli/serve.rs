//! plank serve: run the HTTP API until interrupted.

use std::net::SocketAddr;

use crate::cli::GlobalOptions;
use crate::context::Context;
use crate::error::{Error, Result};

pub fn run(bind: Option<String>, globals: GlobalOptions) -> Result<()> {
    let ctx = Context::open(globals.root.as_deref())?;
    let addr: SocketAddr = match bind.as_deref() {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|err| Error::InvalidArgument(format!("invalid --bind '{raw}': {err}")))?,
        None => ctx.config.server.bind_addr()?,
    };

    if !globals.quiet && !globals.json {
        eprintln!("plank serving {} on http://{addr}", ctx.root().display());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| Error::OperationFailed(format!("failed to start runtime: {err}")))?;
    runtime
        .block_on(crate::server::start_server(ctx, addr))
        .map_err(|err| Error::OperationFailed(format!("server error: {err:#}")))
}
