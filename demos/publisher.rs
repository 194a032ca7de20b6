//! A simple snapshot publisher example.
//!
//! In this example, there are two threads:
//! -   A Producer thread will intermittently set an item in the ReadOptimizedMap.
//! -   A Consumer thread will intermittently receive a Snapshot of the map.
//!
//! When the Consumer thread receives a Snapshot of the map, it compares it with the snapshot it holds, if any, and
//! prints the keys that were not present in the snapshot it had.

use std::sync::{mpsc, Arc};
use std::{thread, time};

use readswap::map::{Keyed, MapSnapshot, ReadOptimizedMap};

#[derive(Debug)]
struct Reading {
    sensor: String,
    celsius: i32,
}

impl Keyed for Reading {
    type Key = String;

    fn key(&self) -> &String { &self.sensor }
}

fn main() {
    const NUMBER_SENSORS: usize = 5;
    const NUMBER_READINGS: usize = 12;
    const PACE_TIME: time::Duration = time::Duration::from_millis(100);

    env_logger::init();

    let map = ReadOptimizedMap::new();

    crossbeam_utils::thread::scope(|scope| {
        let (sender, receiver) = mpsc::channel::<Arc<MapSnapshot<Reading>>>();

        //  Consumer
        scope.spawn(move |_| {
            let mut current: Option<Arc<MapSnapshot<Reading>>> = None;

            while let Ok(new) = receiver.recv() {
                for reading in new.iter() {
                    let known = current.as_ref().is_some_and(|c| c.contains_key(reading.key()));

                    if !known {
                        println!("Consumer saw new sensor {}: {}", reading.sensor, reading.celsius);
                    }
                }
                current = Some(new);
            }

            if let Some(current) = current {
                println!("Consumer final snapshot: {:?}", current);

                assert_eq!(NUMBER_SENSORS, current.len());
            }
        });

        //  Producer
        for i in 0..NUMBER_READINGS {
            let reading = Reading { sensor: format!("sensor-{}", i % NUMBER_SENSORS), celsius: 15 + i as i32 };

            if let Some(previous) = map.set(reading) {
                println!("Producer replaced {:?}", previous);
            }

            sender.send(map.get_all()).unwrap();

            thread::sleep(PACE_TIME);
        }
    }).unwrap();
}
