//! Concurrent access tests for the asset directory backends.

use std::sync::{Arc, Barrier};
use std::thread;

use blokhouse_core::{AssetRecord, DiscoveredHost};
use blokhouse_directory::{AssetDirectory, AssetStore, FileDirectory, Upsert};

const THREADS: usize = 8;

fn host(mac: &str, ip: &str) -> DiscoveredHost {
    DiscoveredHost::new(Some("nas1"), ip, Some(mac))
}

/// Every thread upserts the same MAC at the same moment; exactly one wins
/// the create and the rest see the record it made.
fn racing_upserts_create_once(store: Arc<dyn AssetStore>) {
    let barrier = Arc::new(Barrier::new(THREADS));

    let outcomes: Vec<Upsert> = (0..THREADS)
        .map(|_| {
            let store = store.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                store
                    .upsert_discovered(&host("AA:BB:CC:DD:EE:FF", "10.0.0.5"))
                    .unwrap()
            })
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|h| h.join().unwrap())
        .collect();

    let created = outcomes
        .iter()
        .filter(|o| matches!(o, Upsert::Created(_)))
        .count();
    assert_eq!(created, 1);
    assert_eq!(store.len(), 1);

    let id = store.find_by_mac("AA:BB:CC:DD:EE:FF").unwrap().id;
    assert!(outcomes.iter().all(|o| o.record().id == id));
}

#[test]
fn memory_directory_racing_upserts_create_once() {
    racing_upserts_create_once(Arc::new(AssetDirectory::new()));
}

#[test]
fn file_directory_racing_upserts_create_once() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileDirectory::open(dir.path().join("assets.json")).unwrap();
    racing_upserts_create_once(Arc::new(store));
}

#[test]
fn readers_and_writers_interleave() {
    let store = Arc::new(AssetDirectory::new());
    let per_thread = 50;

    let writers: Vec<_> = (0..THREADS)
        .map(|t| {
            let store = store.clone();
            thread::spawn(move || {
                for i in 0..per_thread {
                    let record = AssetRecord::new(format!("host-{t}-{i}"), format!("10.{t}.0.{i}"));
                    store.create(record.clone()).unwrap();
                    assert_eq!(store.get(record.id).unwrap(), record);
                    if i % 2 == 0 {
                        store.delete(record.id).unwrap();
                    }
                }
            })
        })
        .collect();

    let reader = {
        let store = store.clone();
        thread::spawn(move || {
            for _ in 0..200 {
                for record in store.list() {
                    assert!(record.name.starts_with("host-"));
                }
            }
        })
    };

    for w in writers {
        w.join().unwrap();
    }
    reader.join().unwrap();

    assert_eq!(store.len(), THREADS * per_thread / 2);
}

#[test]
fn distinct_macs_do_not_collide() {
    let store = Arc::new(AssetDirectory::new());

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let store = store.clone();
            thread::spawn(move || {
                let mac = format!("AA:BB:CC:DD:EE:{t:02X}");
                for _ in 0..10 {
                    store
                        .upsert_discovered(&host(&mac, &format!("10.0.0.{t}")))
                        .unwrap();
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(store.len(), THREADS);
}
