/*!
 * fmalloc - Demo Entry Point
 *
 * Brings up the private ("pkg") and shared ("shm") pools the way a server
 * would at start-up, runs a short allocation exercise and dumps the pool
 * state.
 */

use miette::{IntoDiagnostic, Result};
use tracing::info;

use fmalloc::memory::{heap_region, MemoryPool};
use fmalloc::{init_tracing, pool_free, pool_malloc, pool_realloc, select_backend, MemConfig};

fn exercise(pool: &mut MemoryPool) -> Result<()> {
    let mut live = Vec::new();
    for size in [24usize, 100, 1000, 4096, 20_000] {
        let address = pool_malloc!(pool, size)?;
        pool.payload_mut(address)?[..size].fill(0xa5);
        live.push(address);
    }

    live[1] = pool_realloc!(pool, live[1], 3000)?;
    live[3] = pool_realloc!(pool, live[3], 64)?;

    for address in live.drain(..).step_by(2) {
        pool_free!(pool, address)?;
    }

    info!(
        pool = pool.kind(),
        used = pool.info().used,
        "Allocation exercise finished"
    );
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();

    let config = MemConfig::from_env()?;
    let backend = select_backend(config.allocator)?;
    info!(
        allocator = %backend,
        pkg_size = config.pkg_size,
        shm_size = config.shm_size,
        "Memory configuration loaded"
    );

    let mut pkg = MemoryPool::new("pkg", "M", heap_region(config.pkg_size), "pkg")?;
    let mut shm = MemoryPool::new("shm", "m", heap_region(config.shm_size), "shm")?;

    pkg.set_large_limit(config.large_limit);
    shm.set_large_limit(config.large_limit);

    exercise(&mut pkg)?;
    exercise(&mut shm)?;

    for pool in [&pkg, &shm] {
        let info = serde_json::to_string_pretty(&pool.info()).into_diagnostic()?;
        println!("{}: {}", pool.name(), info);
        pool.status();
    }

    Ok(())
}
