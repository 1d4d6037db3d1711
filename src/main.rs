use anyhow::Result;

fn main() -> Result<()> {
    ged::app::run()
}
