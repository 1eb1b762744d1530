/*!
 * Pool Tests
 * Backend selection, OOM diagnostics and the allocation macros
 */

use fmalloc::memory::{
    heap_region, oom_message, oom_nostats_message, select_backend, selected_backend, Allocator,
    CallSite, MemInfo, MemStat, MemoryBackend, MemoryError, MemoryPool, MemoryResult,
    StatusReport,
};
use fmalloc::{pool_free, pool_malloc, pool_realloc};
use pretty_assertions::assert_eq;
use serial_test::serial;
use std::process::Command;

/// Set in the re-executed test binary to name the scenario it must run
const FATAL_CHILD: &str = "FMALLOC_FATAL_CHILD";
const SURVIVED: &str = "continued after fatal pool operation";

/// Re-run this test binary on a single test with the child marker set
fn run_child(test: &str) -> std::process::Output {
    Command::new(std::env::current_exe().unwrap())
        .args([test, "--exact", "--nocapture", "--test-threads=1"])
        .env(FATAL_CHILD, test)
        .output()
        .unwrap()
}

fn in_child(test: &str) -> bool {
    std::env::var(FATAL_CHILD).is_ok_and(|v| v == test)
}

fn assert_child_aborted(test: &str) {
    let output = run_child(test);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!output.status.success(), "child exited cleanly: {stdout}");
    assert!(!stdout.contains(SURVIVED), "child kept running: {stdout}");
}

fn debug_pool() -> MemoryPool {
    MemoryPool::with_backend(MemoryBackend::FMallocDbg, "shm", "m", heap_region(4096), "shm")
        .unwrap()
}

#[test]
fn test_double_free_aborts_the_process() {
    const NAME: &str = "pool_test::test_double_free_aborts_the_process";
    if in_child(NAME) {
        let mut pool = debug_pool();
        let a = pool_malloc!(pool, 8).unwrap();
        pool_malloc!(pool, 8).unwrap();
        pool_free!(pool, a).unwrap();
        let _ = pool_free!(pool, a);
        println!("{SURVIVED}");
        return;
    }
    assert_child_aborted(NAME);
}

#[test]
fn test_realloc_of_freed_address_aborts_the_process() {
    const NAME: &str = "pool_test::test_realloc_of_freed_address_aborts_the_process";
    if in_child(NAME) {
        let mut pool = debug_pool();
        let a = pool_malloc!(pool, 8).unwrap();
        pool_malloc!(pool, 8).unwrap();
        pool_free!(pool, a).unwrap();
        let _ = pool_realloc!(pool, a, 64);
        println!("{SURVIVED}");
        return;
    }
    assert_child_aborted(NAME);
}

#[test]
fn test_release_double_free_is_recoverable() {
    let mut pool =
        MemoryPool::with_backend(MemoryBackend::FMalloc, "pkg", "M", heap_region(4096), "pkg")
            .unwrap();
    let a = pool_malloc!(pool, 8).unwrap();
    pool_malloc!(pool, 8).unwrap();
    pool_free!(pool, a).unwrap();
    assert!(matches!(pool_free!(pool, a), Err(MemoryError::InvalidAddress { .. })));
}

/// Backend wrapper that reports no statistics
struct NoStats(Box<dyn Allocator>);

impl Allocator for NoStats {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn backend(&self) -> MemoryBackend {
        self.0.backend()
    }

    fn allocate(&mut self, size: usize, site: CallSite) -> MemoryResult<usize> {
        self.0.allocate(size, site)
    }

    fn reallocate(&mut self, address: usize, size: usize, site: CallSite) -> MemoryResult<usize> {
        self.0.reallocate(address, size, site)
    }

    fn deallocate(&mut self, address: usize, site: CallSite) -> MemoryResult<()> {
        self.0.deallocate(address, site)
    }

    fn info(&self) -> MemInfo {
        self.0.info()
    }

    fn status(&self) -> StatusReport {
        self.0.status()
    }

    fn set_large_limit(&mut self, limit: usize) {
        self.0.set_large_limit(limit)
    }

    fn has_stats(&self) -> bool {
        false
    }

    fn payload(&self, address: usize) -> MemoryResult<&[u8]> {
        self.0.payload(address)
    }

    fn payload_mut(&mut self, address: usize) -> MemoryResult<&mut [u8]> {
        self.0.payload_mut(address)
    }
}

#[test]
fn test_nostats_backend_uses_short_oom_message() {
    let inner = MemoryBackend::FMalloc.create(heap_region(4096), "pkg").unwrap();
    let mut pool = MemoryPool::from_allocator("pkg", "M", Box::new(NoStats(inner)));
    assert!(!pool.has_stats());
    assert!(matches!(
        pool_malloc!(pool, 5000),
        Err(MemoryError::OutOfMemory { .. })
    ));
    assert_eq!(pool.oom_diagnostic(5000), oom_nostats_message("pkg", 5000, "M"));
}

#[test]
fn test_pool_large_limit() {
    let mut pool =
        MemoryPool::with_backend(MemoryBackend::FMalloc, "shm", "m", heap_region(65536), "shm")
            .unwrap();
    pool.set_large_limit(1024);
    pool_malloc!(pool, 4096).unwrap();
    pool_malloc!(pool, 512).unwrap();
    assert_eq!(pool.info().large_space, 4096);
    assert_eq!(pool.info().large_limit, 1024);
}

#[test]
#[serial]
fn test_backend_is_selected_once() {
    assert!(matches!(
        select_backend(MemoryBackend::HpMalloc),
        Err(MemoryError::BackendUnavailable(_))
    ));

    assert_eq!(select_backend(MemoryBackend::FMalloc).unwrap(), MemoryBackend::FMalloc);
    assert_eq!(selected_backend(), MemoryBackend::FMalloc);
    assert_eq!(select_backend(MemoryBackend::FMalloc).unwrap(), MemoryBackend::FMalloc);
    assert_eq!(
        select_backend(MemoryBackend::FMallocDbg).unwrap_err(),
        MemoryError::BackendAlreadySelected {
            selected: "F_MALLOC".into(),
            requested: "F_MALLOC_DBG".into(),
        }
    );

    let pool = MemoryPool::new("pkg", "M", heap_region(65536), "pkg").unwrap();
    assert_eq!(pool.backend(), MemoryBackend::FMalloc);
}

#[test]
fn test_oom_message_wording() {
    let mut pool =
        MemoryPool::with_backend(MemoryBackend::FMalloc, "shm", "m", heap_region(4096), "shm")
            .unwrap();
    pool_malloc!(pool, 1000).unwrap();
    let left = pool.get_stat(MemStat::Free);
    assert!(pool_malloc!(pool, 5000).is_err());
    assert_eq!(
        pool.oom_diagnostic(5000),
        format!(
            "not enough free shm memory ({left} bytes left, need 5000), \
             please increase the \"-m\" command line parameter!"
        )
    );
    assert_eq!(pool.oom_diagnostic(5000), oom_message("shm", left, 5000, "m"));
}

#[test]
fn test_nostats_wording() {
    assert_eq!(
        oom_nostats_message("pkg", 5000, "M"),
        "not enough free pkg memory (need 5000), please increase the \"-M\" command line parameter!"
    );
}

#[test]
fn test_unavailable_backend_pool() {
    let region = heap_region(4096);
    let err = MemoryPool::with_backend(MemoryBackend::QMallocDbg, "pkg", "M", region, "pkg")
        .unwrap_err();
    assert_eq!(err, MemoryError::BackendUnavailable("Q_MALLOC_DBG".into()));
}

#[test]
fn test_pool_round_trip_through_trait_object() {
    let backend: Box<dyn Allocator> =
        MemoryBackend::FMallocDbg.create(heap_region(65536), "shm").unwrap();
    let mut pool = MemoryPool::from_allocator("shm", "m", backend);

    let a = pool_malloc!(pool, 100).unwrap();
    pool.payload_mut(a).unwrap()[..5].copy_from_slice(b"hello");
    let a = pool_realloc!(pool, a, 20_000).unwrap();
    assert_eq!(&pool.payload(a).unwrap()[..5], b"hello");
    pool_free!(pool, a).unwrap();

    let info = pool.info();
    assert_eq!(info.used, 0);
    assert_eq!(info.total_frags, 0);
    assert!(pool.has_stats());
    assert!(!pool.site_report(4).is_empty());
}
