//! CLI command implementations

pub mod catalog;
pub mod collect;
pub mod error;

pub use catalog::CatalogArgs;
pub use collect::{Cli, CollectArgs, Commands};
pub use error::CliError;

use crate::provider::{create_provider, ProviderKind};
use crate::config::Config;

/// Print the supported providers and their request limits.
pub fn print_providers(config: &Config) {
    for kind in ProviderKind::ALL {
        match create_provider(kind, config) {
            Ok(provider) => {
                let limits = provider.limits();
                println!(
                    "{:<8} max span {} days, rate policy {:?}",
                    kind,
                    limits.max_span.num_days(),
                    limits.rate_policy,
                );
            }
            Err(e) => {
                println!("{kind:<8} unavailable: {e}");
            }
        }
    }
}
