pub fn run() -> anyhow::Result<()> {
    println!("playlog {}", env!("CARGO_PKG_VERSION"));
    println!("Steam playtime collector and session inference");
    Ok(())
}
