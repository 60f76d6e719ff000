// src/cli/keys.rs — Key pool management

use std::sync::Arc;

use crate::infra::store::ProjectStore;
use crate::provider::pool::SharedPool;

pub fn run_add(store: Arc<dyn ProjectStore>, keys: &[String]) -> anyhow::Result<()> {
    let pool = SharedPool::load(store)?;
    let mut added = 0;
    for key in keys {
        if pool.add(key.clone())? {
            added += 1;
        }
    }
    println!(
        "added {} key(s), pool now holds {} (cursor at {})",
        added,
        pool.len(),
        pool.cursor() + 1
    );
    Ok(())
}

pub fn run_list(store: Arc<dyn ProjectStore>) -> anyhow::Result<()> {
    let pool = SharedPool::load(store)?;
    if pool.is_empty() {
        println!("no keys configured; add one with `panelforge keys add <key>`");
        return Ok(());
    }
    println!("{} key(s), cursor at {}", pool.len(), pool.cursor() + 1);
    Ok(())
}
