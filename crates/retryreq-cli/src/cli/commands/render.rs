//! `retryreq render` – print a request as it appears in rejection logs.

use anyhow::Result;
use retryreq_core::request::{render_for_diagnostics, Request};

pub async fn run_render(payload: Vec<u8>) -> Result<()> {
    println!("{}", render_for_diagnostics(&Request::Raw(payload)));
    Ok(())
}
