//! Long-running lifecycle stress test for the Lumen engine host.
//!
//! Runs hundreds of create/profile/init/dispatch/destroy cycles against the
//! mock backend, checking after every batch of cycles that no engine handle
//! and no event thread outlived its cycle.
//!
//! Usage:
//!   cargo run --bin cycle_stress -- [--cycles N]

use lumen_core::{EngineHost, HostOptions};
use lumen_runtime::{AppContext, MockBackend, MockProbe};
use lumen_schema::{FatalPolicy, BUILTIN_PROFILES};
use std::fs;
use std::sync::Arc;
use std::time::{Duration, Instant};

struct Timings {
    create: Duration,
    init: Duration,
    dispatch: Duration,
    destroy: Duration,
}

/// Threads in this process, or `None` where /proc is unavailable.
fn thread_count() -> Option<usize> {
    fs::read_dir("/proc/self/task").ok().map(Iterator::count)
}

fn run_cycle(host: &EngineHost, cycle: usize, timings: &mut Timings) -> Result<(), String> {
    let ctx = AppContext::default();
    let profile = i64::try_from(cycle % BUILTIN_PROFILES.len()).unwrap_or_default();

    let t0 = Instant::now();
    host.create(&ctx)
        .map_err(|e| format!("cycle {cycle}: CREATE FAILED: {e}"))?;
    host.apply_profile(profile)
        .map_err(|e| format!("cycle {cycle}: PROFILE FAILED: {e}"))?;
    timings.create += t0.elapsed();

    let t0 = Instant::now();
    host.init()
        .map_err(|e| format!("cycle {cycle}: INIT FAILED: {e}"))?;
    timings.init += t0.elapsed();

    let t0 = Instant::now();
    host.dispatch(&["loadfile", "stress.mkv"])
        .map_err(|e| format!("cycle {cycle}: DISPATCH FAILED: {e}"))?;
    host.dispatch(&["seek", "10", "absolute"])
        .map_err(|e| format!("cycle {cycle}: DISPATCH FAILED: {e}"))?;
    timings.dispatch += t0.elapsed();

    let t0 = Instant::now();
    host.destroy()
        .map_err(|e| format!("cycle {cycle}: DESTROY FAILED: {e}"))?;
    timings.destroy += t0.elapsed();
    Ok(())
}

fn check_health(probe: &MockProbe, baseline_threads: Option<usize>, cycle: usize) -> u64 {
    let mut failures = 0u64;
    let live = probe.live_handles();
    if live > 0 {
        eprintln!("  cycle {cycle}: HANDLE LEAK: {live} live handles after destroy");
        failures += 1;
    }
    if let (Some(before), Some(now)) = (baseline_threads, thread_count()) {
        if now > before {
            eprintln!("  cycle {cycle}: THREAD LEAK: {} extra threads", now - before);
            failures += 1;
        }
    }
    failures
}

fn avg_ms(total: Duration, cycles: usize) -> f64 {
    total.as_secs_f64() * 1000.0 / cycles.max(1) as f64
}

fn print_report(cycles: usize, failures: u64, timings: &Timings, probe: &MockProbe) {
    println!();
    println!("============================================");
    println!("Results: {cycles} cycles, {failures} failures");
    println!(
        "  create:   {:.3}s total, {:.3}ms avg",
        timings.create.as_secs_f64(),
        avg_ms(timings.create, cycles)
    );
    println!(
        "  init:     {:.3}s total, {:.3}ms avg",
        timings.init.as_secs_f64(),
        avg_ms(timings.init, cycles)
    );
    println!(
        "  dispatch: {:.3}s total, {:.3}ms avg",
        timings.dispatch.as_secs_f64(),
        avg_ms(timings.dispatch, cycles)
    );
    println!(
        "  destroy:  {:.3}s total, {:.3}ms avg",
        timings.destroy.as_secs_f64(),
        avg_ms(timings.destroy, cycles)
    );
    println!("  handles created: {}", probe.creates());
    println!("  handles terminated: {}", probe.terminations());
    println!("  handles live: {}", probe.live_handles());

    if failures > 0 || probe.live_handles() > 0 {
        eprintln!("\nSTRESS TEST FAILED");
        std::process::exit(1);
    } else {
        println!("\nSTRESS TEST PASSED");
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let cycles: usize = args
        .iter()
        .position(|a| a == "--cycles")
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
        .unwrap_or(500);

    println!("Lumen lifecycle stress test: {cycles} cycles");
    println!("============================================");

    let probe = Arc::new(MockProbe::new());
    let options = HostOptions {
        fatal_policy: FatalPolicy::Return,
        ..HostOptions::default()
    };
    let host = EngineHost::new(Box::new(MockBackend::with_probe(Arc::clone(&probe))), options);
    let baseline_threads = thread_count();

    let mut timings = Timings {
        create: Duration::ZERO,
        init: Duration::ZERO,
        dispatch: Duration::ZERO,
        destroy: Duration::ZERO,
    };
    let mut failures = 0u64;
    let started = Instant::now();

    for cycle in 1..=cycles {
        if let Err(msg) = run_cycle(&host, cycle, &mut timings) {
            eprintln!("  {msg}");
            failures += 1;
            let _ = host.destroy();
            continue;
        }
        if cycle.is_multiple_of(50) {
            failures += check_health(&probe, baseline_threads, cycle);
        }
        if cycle.is_multiple_of(100) {
            println!(
                "  cycle {cycle}/{cycles}: {:.1}s elapsed, {failures} failures",
                started.elapsed().as_secs_f64()
            );
        }
    }

    print_report(cycles, failures, &timings, &probe);
}
