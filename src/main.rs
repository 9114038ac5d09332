use anyhow::Result;

mod app;
mod logging;

fn main() -> Result<()> {
    let args = lazy_migrate::cli::parse();
    app::run(args)
}
