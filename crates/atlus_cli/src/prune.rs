//! `atlus prune`: evict expired cache entries.

use atlus_cache::CacheStore;
use atlus_config::AtlusConfig;

use crate::GlobalArgs;

/// Runs the `atlus prune` command.
pub fn run(global: &GlobalArgs, config: &AtlusConfig) -> Result<i32, Box<dyn std::error::Error>> {
    let store = CacheStore::open(&config.cache.root, config.cache.expiration());
    let evicted = store.prune_expired()?;
    if !global.quiet {
        eprintln!(
            "    Pruned {evicted} expired entr{} from {}",
            if evicted == 1 { "y" } else { "ies" },
            config.cache.root.display()
        );
    }
    Ok(0)
}
