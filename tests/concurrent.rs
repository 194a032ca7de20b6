//! Multi-threaded scenarios for the BitMap and the ReadOptimizedMap.

use std::sync::atomic::{AtomicBool, Ordering};

use readswap::bitmap::BitMap;
use readswap::map::{Keyed, ReadOptimizedMap};

#[derive(Debug)]
struct KeyValue {
    key: String,
    value: String,
}

impl KeyValue {
    fn new(key: String, value: String) -> Self { KeyValue { key, value } }
}

impl Keyed for KeyValue {
    type Key = String;

    fn key(&self) -> &String { &self.key }
}

fn init_logger() {
    let _ = env_logger::try_init();
}

fn filled(number: usize) -> ReadOptimizedMap<KeyValue> {
    (0..number)
        .map(|i| KeyValue::new(format!("key{}", i), format!("value {}", i)))
        .collect()
}

#[test]
fn concurrent_read() {
    const KEYS: usize = 2048;
    const THREADS: usize = 16;

    init_logger();

    let map = filled(KEYS);

    crossbeam_utils::thread::scope(|scope| {
        for t in 0..THREADS {
            let map = &map;
            scope.spawn(move |_| {
                for j in 0..5000 {
                    let num = (101 * t + j + 13) % (KEYS + 2);
                    let item = map.get(format!("key{}", num).as_str());

                    if num >= KEYS {
                        assert!(item.is_none());
                    } else {
                        assert_eq!(format!("value {}", num), item.unwrap().value);
                    }
                }
            });
        }
    }).unwrap();
}

#[test]
fn concurrent_write() {
    const KEYS: usize = 2048;
    const THREADS: usize = 32;

    init_logger();

    let map = filled(KEYS);

    crossbeam_utils::thread::scope(|scope| {
        for t in 0..THREADS {
            let map = &map;
            scope.spawn(move |_| {
                for _ in 0..4 {
                    for j in 0..1000 {
                        let num = (101 * t + j + 13) % (KEYS + 2);
                        let item = map.get(format!("key{}", num).as_str());

                        if num >= KEYS {
                            assert!(item.is_none());
                            continue;
                        }

                        let value = &item.unwrap().value;
                        assert!(
                            *value == format!("value {}", num) || *value == format!("value {}-new", num),
                            "{}",
                            value
                        );
                    }

                    map.set(KeyValue::new(format!("key{}", t), format!("value {}-new", t)));
                }
            });
        }
    }).unwrap();

    for t in 0..THREADS {
        assert_eq!(format!("value {}-new", t), map.get(format!("key{}", t).as_str()).unwrap().value);
    }
    assert_eq!(KEYS, map.len());
}

#[test]
fn concurrent_insert_remove_disjoint() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 200;

    init_logger();

    let map = ReadOptimizedMap::new();
    let done = AtomicBool::new(false);

    crossbeam_utils::thread::scope(|scope| {
        //  Readers: every snapshot is sorted, and every item complete.
        for _ in 0..2 {
            let (map, done) = (&map, &done);
            scope.spawn(move |_| {
                while !done.load(Ordering::Acquire) {
                    let snapshot = map.get_all();
                    let keys: Vec<String> = snapshot.iter().map(|kv: std::sync::Arc<KeyValue>| {
                        assert_eq!(kv.key.replace("key", "value"), kv.value);
                        kv.key.clone()
                    }).collect();

                    assert!(keys.windows(2).all(|w| w[0] < w[1]));
                }
            });
        }

        let writers: Vec<_> = (0..THREADS).map(|t| {
            let map = &map;
            scope.spawn(move |_| {
                for i in 0..PER_THREAD {
                    let key = format!("key{}-{}", t, i);
                    map.set(KeyValue::new(key.clone(), key.replace("key", "value")));
                }
                for i in (0..PER_THREAD).step_by(2) {
                    let removed = map.remove(format!("key{}-{}", t, i).as_str());
                    assert!(removed.is_some());
                }
            })
        }).collect();

        for writer in writers {
            writer.join().unwrap();
        }

        done.store(true, Ordering::Release);
    }).unwrap();

    assert_eq!(THREADS * PER_THREAD / 2, map.len());

    for t in 0..THREADS {
        for i in 0..PER_THREAD {
            let present = map.contains_key(format!("key{}-{}", t, i).as_str());
            assert_eq!(i % 2 == 1, present);
        }
    }
}

#[test]
fn concurrent_same_key() {
    const ROUNDS: usize = 200;

    init_logger();

    for _ in 0..ROUNDS {
        let map = ReadOptimizedMap::new();
        map.set(KeyValue::new("k".to_string(), "prior".to_string()));

        crossbeam_utils::thread::scope(|scope| {
            for value in ["first", "second"] {
                let map = &map;
                scope.spawn(move |_| {
                    map.set(KeyValue::new("k".to_string(), value.to_string()));
                });
            }

            let map = &map;
            scope.spawn(move |_| {
                for _ in 0..10 {
                    let value = map.get("k").unwrap().value.clone();
                    assert!(["prior", "first", "second"].contains(&value.as_str()), "{}", value);
                }
            });
        }).unwrap();

        let value = map.get("k").unwrap().value.clone();
        assert!(value == "first" || value == "second", "{}", value);
        assert_eq!(1, map.len());
    }
}

#[test]
fn concurrent_set_with_insertions() {
    const THREADS: usize = 4;
    const ROUNDS: usize = 500;

    init_logger();

    let map = ReadOptimizedMap::new();
    for t in 0..THREADS {
        map.set(KeyValue::new(format!("hot{}", t), "0".to_string()));
    }

    crossbeam_utils::thread::scope(|scope| {
        //  Replacers of existing keys.
        for t in 0..THREADS {
            let map = &map;
            scope.spawn(move |_| {
                for round in 1..=ROUNDS {
                    let previous = map.set(KeyValue::new(format!("hot{}", t), round.to_string()));
                    assert_eq!((round - 1).to_string(), previous.unwrap().value);
                }
            });
        }

        //  Structural changes, forcing replacers to check for concurrent changes.
        let map = &map;
        scope.spawn(move |_| {
            for i in 0..ROUNDS {
                map.set(KeyValue::new(format!("cold{}", i), String::new()));
            }
        });
    }).unwrap();

    for t in 0..THREADS {
        assert_eq!(ROUNDS.to_string(), map.get(format!("hot{}", t).as_str()).unwrap().value);
    }
    assert_eq!(THREADS + ROUNDS, map.len());
}

#[test]
fn concurrent_set_remove_same_key() {
    const SETTERS: usize = 3;
    const REMOVERS: usize = 2;
    const ROUNDS: usize = 300;

    init_logger();

    let map = ReadOptimizedMap::new();
    map.set(KeyValue::new("k".to_string(), "initial".to_string()));

    //  Every item written is displaced exactly once, by a later set or by a removal, or is still present at the end.
    let displaced: Vec<String> = crossbeam_utils::thread::scope(|scope| {
        let setters: Vec<_> = (0..SETTERS).map(|t| {
            let map = &map;
            scope.spawn(move |_| {
                (0..ROUNDS)
                    .filter_map(|i| map.set(KeyValue::new("k".to_string(), format!("{}-{}", t, i))))
                    .map(|previous| previous.value.clone())
                    .collect::<Vec<_>>()
            })
        }).collect();

        let removers: Vec<_> = (0..REMOVERS).map(|_| {
            let map = &map;
            scope.spawn(move |_| {
                (0..ROUNDS)
                    .filter_map(|_| map.remove("k"))
                    .map(|removed| removed.value.clone())
                    .collect::<Vec<_>>()
            })
        }).collect();

        setters.into_iter().chain(removers).flat_map(|handle| handle.join().unwrap()).collect()
    }).unwrap();

    let mut accounted = displaced;
    accounted.extend(map.get("k").map(|item| item.value.clone()));
    accounted.sort();

    let mut written: Vec<String> = (0..SETTERS)
        .flat_map(|t| (0..ROUNDS).map(move |i| format!("{}-{}", t, i)))
        .collect();
    written.push("initial".to_string());
    written.sort();

    assert_eq!(written, accounted);
    assert!(map.len() <= 1);
}

#[test]
fn bitmap_concurrent_growth() {
    const THREADS: usize = 8;
    const BITS: usize = 5000;

    init_logger();

    let bitmap = BitMap::new();

    crossbeam_utils::thread::scope(|scope| {
        for t in 0..THREADS {
            let bitmap = &bitmap;
            scope.spawn(move |_| {
                for i in (t..BITS).step_by(THREADS) {
                    bitmap.set(i, true);
                }
            });
        }

        let bitmap = &bitmap;
        scope.spawn(move |_| {
            for _ in 0..1000 {
                assert!(bitmap.count() <= BITS);
                assert!(bitmap.count_until(BITS) <= BITS);
            }
        });
    }).unwrap();

    assert_eq!(BITS, bitmap.count());
    assert_eq!(BITS, bitmap.count_until(BITS));
    assert!((0..BITS).all(|i| bitmap.get(i)));
}
