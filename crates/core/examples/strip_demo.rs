//! Example: build a channel strip from TOML and print its response
//!
//! Run with: cargo run --package parametrix-core --example strip_demo

use parametrix_core::domain::{ChannelStrip, StripConfig};

const CONFIG: &str = r#"
bypass_fade_ms = 30.0

[engine]
sample_rate = 48000.0
channels = 2

[params]
hpfFreq = 80.0
lfGain = 4.0
lmfFreq = 400.0
lmfGain = -3.0
lmfQ = 1.4
hfGain = 2.5
"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("parametrix_core=debug,info")
        .init();

    let config = StripConfig::from_toml_str(CONFIG)?;
    let mut strip = ChannelStrip::new(&config);

    // Let the smoothers settle on the configured values
    let mut buffer = vec![vec![0.0_f32; 512]; 2];
    for _ in 0..100 {
        strip.process(&config.params, &mut buffer);
    }

    println!("=== Parametrix response ===\n");
    for freq in [30.0, 80.0, 200.0, 400.0, 1000.0, 4000.0, 10000.0, 16000.0] {
        println!("{:>8.0} Hz  {:>+7.2} dB", freq, strip.engine().magnitude_db(freq));
    }

    println!(
        "\nCoefficient build passes: {}",
        strip.engine().scheduler().build_passes()
    );

    Ok(())
}
