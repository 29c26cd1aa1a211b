//! Cycle-accurate latency of registry operations using rdtscp.
//!
//! Measures edit_priority and exec_top under a steady-state workload where
//! the registry holds a fixed number of live keys and every served key is
//! added back.
//!
//! Run with:
//!   cargo build --release -p nexus-registry --example perf_exec_top_cycles
//!   taskset -c 0 ./target/release/examples/perf_exec_top_cycles

use hdrhistogram::Histogram;
use nexus_registry::{Compaction, Registry, RegistryBuilder};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;

const LIVE: u64 = 10_000;
const OPS: usize = 1_000_000;

#[inline(always)]
fn rdtscp() -> u64 {
    #[cfg(target_arch = "x86_64")]
    unsafe {
        let mut aux: u32 = 0;
        std::arch::x86_64::__rdtscp(&mut aux)
    }
    #[cfg(not(target_arch = "x86_64"))]
    {
        panic!("rdtscp only supported on x86_64");
    }
}

fn print_stats(name: &str, hist: &Histogram<u64>) {
    println!("{}", name);
    println!("  min:  {:>6} cycles", hist.min());
    println!("  p50:  {:>6} cycles", hist.value_at_quantile(0.50));
    println!("  p99:  {:>6} cycles", hist.value_at_quantile(0.99));
    println!("  p999: {:>6} cycles", hist.value_at_quantile(0.999));
    println!("  max:  {:>6} cycles", hist.max());
    println!("  avg:  {:>6.0} cycles", hist.mean());
}

fn run(compaction: Compaction) -> (Histogram<u64>, Histogram<u64>) {
    let mut reg: Registry<u64, u64, u64> = RegistryBuilder::default()
        .capacity(LIVE as usize)
        .compaction(compaction)
        .build()
        .unwrap();
    let mut rng = StdRng::seed_from_u64(7);
    let mut edit_hist = Histogram::<u64>::new(3).unwrap();
    let mut exec_hist = Histogram::<u64>::new(3).unwrap();

    for key in 0..LIVE {
        reg.add(key, rng.gen_range(0..1_000_000), key).unwrap();
    }

    // Warmup
    for _ in 0..10_000 {
        let key = rng.gen_range(0..LIVE);
        black_box(reg.edit_priority(&key, rng.gen_range(0..1_000_000)).ok());
    }

    for _ in 0..OPS {
        if rng.gen_ratio(3, 4) {
            let key = rng.gen_range(0..LIVE);
            let priority = rng.gen_range(0..1_000_000);
            let start = rdtscp();
            black_box(reg.edit_priority(&key, priority).ok());
            let end = rdtscp();
            let _ = edit_hist.record(end.wrapping_sub(start));
        } else {
            let start = rdtscp();
            let top = black_box(reg.exec_top());
            let end = rdtscp();
            let _ = exec_hist.record(end.wrapping_sub(start));

            if let Ok(top) = top {
                reg.add(top.key, rng.gen_range(0..1_000_000), top.attributes)
                    .unwrap();
            }
        }
    }

    let stats = reg.stats();
    println!(
        "  live: {}  queued: {}  discarded: {}",
        stats.live, stats.queued, stats.discarded
    );
    (edit_hist, exec_hist)
}

fn main() {
    println!("Registry<u64, u64, u64> ({} live keys, {} ops)", LIVE, OPS);
    println!("================================================");

    for (name, compaction) in [
        ("no compaction", Compaction::Disabled),
        ("default compaction", Compaction::default()),
    ] {
        println!("\n{}", name);
        let (edit, exec) = run(compaction);
        print_stats("edit_priority", &edit);
        print_stats("exec_top", &exec);
    }
}
