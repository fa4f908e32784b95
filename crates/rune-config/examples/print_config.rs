/// Example program to print the effective configuration as TOML
///
/// Run with: cargo run -p rune-config --example print_config

fn main() {
    let config = match rune_config::RuneConfig::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    println!("=== Rune Shapes Configuration ===\n");
    match toml::to_string_pretty(&config) {
        Ok(text) => println!("{text}"),
        Err(err) => eprintln!("failed to render config: {err}"),
    }
}
