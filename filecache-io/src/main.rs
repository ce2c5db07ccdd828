use std::sync::Arc;
use std::time::Duration;

use filecache::builder::Builder;
use filecache::cache::FileCache;
use filecache::file::{FileFactory, FileHandle};
use filecache::handle::Handle;
use filecache::limits::CacheSettings;

/// Reads the first bytes of the given file through the cache.
fn read_head(cache: &Arc<FileCache<FileHandle>>, location: &str) -> anyhow::Result<usize> {
    let file = cache.acquire(&FileFactory, location)?;

    let mut buffer = [0; 4096];
    let result = file.read_at(0, &mut buffer);

    // Hands the file back to the cache, even if reading failed...
    file.close()?;

    result
}

fn main() -> anyhow::Result<()> {
    // Build a platform and enable all features...
    let platform = Builder::new().enable_all().build()?;

    // Setup the cache for plain files...
    let cache = platform.create_cache::<FileHandle>("files", CacheSettings::default());

    // Read each file twice, the second pass is served by the cache...
    for pass in 1..=2 {
        for location in std::env::args().skip(1) {
            match read_head(&cache, &location) {
                Ok(bytes) => log::info!("Pass {}: Read {} bytes from {}", pass, bytes, location),
                Err(error) => log::error!("Pass {}: {:#}", pass, error),
            }
        }
    }

    log::info!("Cache report:\n{}", cache.report());

    while platform.is_running() {
        std::thread::sleep(Duration::from_millis(500));
    }

    Ok(())
}
