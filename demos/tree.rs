//! # Example: Supervision tree walkthrough
//!
//! Builds a small tree, runs a few units on the tokio substrate and shows:
//! - priority ceilings capping new units
//! - a daemon group destroying itself when its last unit exits
//! - an unhandled failure reaching the fallback
//! - graceful shutdown on Ctrl-C (or after a short timer)
//!
//! Run with: `cargo run --example tree --features logging`

use std::sync::Arc;
use std::time::Duration;

use groupvisor::{
    Failure, Group, LogWriter, Subscribe, TaskFn, TaskRef, Tree, TreeConfig, Unit, UnitContext,
};

/// Ticks until interrupted, honoring suspend requests.
fn ticker(label: &'static str, every_ms: u64) -> TaskRef {
    TaskFn::arc(move |ctx: UnitContext| async move {
        let mut n = 0u32;
        while !ctx.is_interrupted() {
            ctx.checkpoint().await;
            n += 1;
            println!("[{label}] tick {n}");
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(every_ms)) => {}
                _ = ctx.interrupted() => {}
            }
        }
        println!("[{label}] interrupted after {n} ticks");
        Ok::<(), Failure>(())
    })
}

/// One-shot job that optionally fails.
fn job(work_ms: u64, fail: bool) -> TaskRef {
    TaskFn::arc(move |ctx: UnitContext| async move {
        tokio::time::sleep(Duration::from_millis(work_ms)).await;
        if fail {
            return Err(Failure::error(format!("{} gave up", ctx.unit().name())));
        }
        Ok(())
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cfg = TreeConfig {
        grace: Duration::from_secs(2),
        ..TreeConfig::default()
    };
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let tree = Tree::builder(cfg).with_subscribers(subs).build();

    let web = Group::create(tree.root(), "web")?;
    let batch = Group::create(tree.root(), "batch")?;
    batch.set_daemon(true)?;
    batch.set_priority_ceiling(4)?;

    Unit::builder(&web).name("http-1").body(ticker("http-1", 300)).build()?.start()?;
    Unit::builder(&web).name("http-2").body(ticker("http-2", 450)).build()?.start()?;

    let job_ok = Unit::builder(&batch).name("job-ok").body(job(400, false)).build()?;
    let job_bad = Unit::builder(&batch).name("job-bad").body(job(600, true)).build()?;
    println!("batch units run at priority {}", job_ok.priority());
    job_ok.start()?;
    job_bad.start()?;

    tokio::time::sleep(Duration::from_millis(100)).await;
    println!("{}", tree.list());

    web.suspend()?;
    tokio::time::sleep(Duration::from_millis(700)).await;
    web.resume()?;
    println!("batch destroyed: {}", batch.is_destroyed());

    tokio::select! {
        res = tree.run_until_signal() => res?,
        _ = tokio::time::sleep(Duration::from_secs(2)) => {
            tree.shutdown(Duration::from_secs(2)).await?;
        }
    }
    Ok(())
}
