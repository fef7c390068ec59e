//! Minimal Sub0Pub example
//!
//! Dua subscriber mengakumulasi `u32`; tiga kali `publish(3141)` = 9423 di masing-masing.
//!
//! ```text
//! RUST_LOG=sub0pub=trace cargo run --example minimal
//! ```

use std::cell::Cell;
use std::rc::Rc;

use sub0pub::core::{publish, Publisher, Publishes, Registry, Subscribe};
use tracing_subscriber::EnvFilter;

/// Subscriber yang menjumlahkan semua nilai yang diterima
struct Accumulator {
    name: &'static str,
    total: Cell<u32>,
}

impl Subscribe<u32> for Accumulator {
    fn receive(&self, data: &u32) {
        self.total.set(self.total.get() + data);
    }
}

impl Subscribe<f32> for Accumulator {
    fn receive(&self, data: &f32) {
        println!("{} got temperature {data:.1}", self.name);
    }

    // Hanya suhu di atas nol
    fn accepts(&self, data: &f32) -> bool {
        *data > 0.0
    }
}

/// Producer dengan dua capability publish
struct Station {
    counts: Publisher<u32>,
    temperature: Publisher<f32>,
}

impl Publishes<u32> for Station {
    fn publisher(&self) -> &Publisher<u32> {
        &self.counts
    }
}

impl Publishes<f32> for Station {
    fn publisher(&self) -> &Publisher<f32> {
        &self.temperature
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .init();

    let registry = Registry::new();

    let a = Rc::new(Accumulator {
        name: "A",
        total: Cell::new(0),
    });
    let b = Rc::new(Accumulator {
        name: "B",
        total: Cell::new(0),
    });

    // Satu objek boleh subscribe ke beberapa tipe
    let _subs = (
        registry.subscribe::<u32, _>(Rc::clone(&a))?,
        registry.subscribe::<u32, _>(Rc::clone(&b))?,
        registry.subscribe::<f32, _>(Rc::clone(&a))?,
    );

    let station = Station {
        counts: registry.publisher(),
        temperature: registry.publisher(),
    };

    for _ in 0..3 {
        publish(&station, &3141u32);
    }
    publish(&station, &-4.0f32);
    publish(&station, &21.5f32);

    println!("A total = {}", a.total.get());
    println!("B total = {}", b.total.get());
    tracing::info!(brokers = registry.broker_count(), "done");
    Ok(())
}
