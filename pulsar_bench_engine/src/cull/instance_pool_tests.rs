use super::*;

#[test]
fn test_acquire_release_recycles() {
    let pool = CullInstancePool::new();
    let a = pool.acquire();
    let b = pool.acquire();
    assert_eq!((a, b), (0, 1));
    assert_eq!(pool.live_instances(), 2);

    pool.release(a);
    assert_eq!(pool.live_instances(), 1);
    assert_eq!(pool.acquire(), a);
}

#[test]
fn test_pool_allows_exactly_the_limit() {
    let pool = CullInstancePool::new();
    let ids: Vec<u32> = (0..MAX_CULL_INSTANCES).map(|_| pool.acquire()).collect();
    assert_eq!(pool.live_instances(), MAX_CULL_INSTANCES);
    assert!(ids.iter().all(|&id| (id as usize) < MAX_CULL_INSTANCES));
    for id in ids {
        pool.release(id);
    }
    assert_eq!(pool.live_instances(), 0);
}

#[test]
#[should_panic(expected = "cull instance pool exhausted")]
fn test_pool_overflow_panics() {
    let pool = CullInstancePool::new();
    for _ in 0..=MAX_CULL_INSTANCES {
        pool.acquire();
    }
}

#[test]
fn test_clones_share_the_pool() {
    let pool = CullInstancePool::new();
    let clone = pool.clone();
    let _id = pool.acquire();
    assert_eq!(clone.live_instances(), 1);
}
