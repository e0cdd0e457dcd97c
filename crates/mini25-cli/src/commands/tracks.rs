use mini25_core::{Config, CATALOG};

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    for (id, track) in CATALOG.iter().enumerate() {
        let marker = if id == config.player.default_track { '*' } else { ' ' };
        println!("{marker} {id:>2}  {}", track.name);
    }
    Ok(())
}
