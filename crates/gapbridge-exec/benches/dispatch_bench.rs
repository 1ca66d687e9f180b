// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for command dispatch, result delivery, and wire
// encoding in the gapbridge-exec crate.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use serde_json::json;

use gapbridge_core::types::{CallbackStatus, Command, CommandResult};
use gapbridge_exec::{Callback, CommandProxy, Dispatcher, NativeReply, WireFormat};

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Benchmark an exec whose handler answers inline, including delivery to the
/// success callback and removal of the table entry.
fn bench_exec_immediate(c: &mut Criterion) {
    let proxy = CommandProxy::new();
    proxy.add("Echo", "echo", |cmd| {
        Ok(NativeReply::Immediate(CommandResult::ok(cmd.args[0].clone())))
    });
    let dispatcher = Dispatcher::new(Box::new(proxy), Some(0));
    let ok = Callback::new(|args| {
        black_box(args);
    });

    c.bench_function("exec_immediate", |b| {
        b.iter(|| {
            let outcome = dispatcher
                .exec(Some(ok.clone()), None, "Echo", "echo", vec![json!("ping")])
                .expect("exec failed");
            black_box(outcome);
        });
    });
}

/// Benchmark a deferred exec followed by a later result delivery, the path
/// every asynchronous native call takes.
fn bench_exec_then_deliver(c: &mut Criterion) {
    let proxy = CommandProxy::new();
    proxy.add("Net", "fetch", |_| Ok(NativeReply::Pending));
    let dispatcher = Dispatcher::new(Box::new(proxy), Some(0));
    let ok = Callback::new(|args| {
        black_box(args);
    });

    c.bench_function("exec_then_deliver", |b| {
        b.iter(|| {
            let outcome = dispatcher
                .exec(Some(ok.clone()), None, "Net", "fetch", vec![])
                .expect("exec failed");
            if let gapbridge_core::types::ExecOutcome::Pending(id) = outcome {
                dispatcher.callback_from_native(
                    &id,
                    true,
                    CallbackStatus::Ok,
                    &[json!({"bytes": 1024})],
                    false,
                );
            }
        });
    });
}

/// Benchmark each wire encoding on a typical geolocation command.
fn bench_wire_encode(c: &mut Criterion) {
    let command = Command {
        service: "Geolocation".into(),
        action: "getLocation".into(),
        callback_id: "Geolocation1234567".into(),
        args: vec![json!(true), json!({"maximumAge": 3000, "timeout": 5000})],
    };

    let mut group = c.benchmark_group("wire_encode");
    for (label, format) in [
        ("json", WireFormat::Json),
        ("slash", WireFormat::Slash),
        ("gap_url", WireFormat::GapUrl),
    ] {
        group.bench_function(label, |b| {
            b.iter(|| {
                let encoded = format.encode(black_box(&command)).expect("encode failed");
                black_box(encoded);
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_exec_immediate,
    bench_exec_then_deliver,
    bench_wire_encode
);
criterion_main!(benches);
