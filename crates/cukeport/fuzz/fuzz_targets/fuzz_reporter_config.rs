#![no_main]

//! Fuzz target for reporter configuration files
//!
//! Arbitrary text must either parse into a configuration or fail with an
//! error, and a parsed configuration must validate without panicking.

use libfuzzer_sys::fuzz_target;

use cukeport::ReporterConfig;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(config) = ReporterConfig::from_json(text) {
        let _ = config.validate(false);
        let _ = config.validate(true);
        let settings = config.launch_settings();
        assert!(settings.attributes.len() <= config.tags.len());
    }
});
