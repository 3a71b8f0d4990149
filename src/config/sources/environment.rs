//! Environment source: LEAP__SECTION__KEY, e.g. LEAP__PIPELINE__ATTEMPT_BUDGET=3

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;

pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix("LEAP")
            .separator("__")
            .try_parsing(true),
    )
}
