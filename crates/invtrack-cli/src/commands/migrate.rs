//! Migrate command - apply the embedded database migrations.

use console::style;

use super::Context;

pub async fn run(ctx: &Context) -> anyhow::Result<()> {
    let store = ctx.pg_store().await?;
    store.migrate().await?;
    println!("{} Database is up to date", style("✓").green());
    Ok(())
}
