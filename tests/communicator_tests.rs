use ncdist::algs::gather::{dgather, hgather};
use ncdist::prelude::*;
use std::collections::BTreeMap;

#[test]
fn gather_of_uneven_parts() {
    let out = spawn_world(3, |comm| {
        let part: Vec<u32> = (0..comm.rank() as u32 * 2).collect();
        comm.gather(&part, 0).unwrap()
    });
    let parts = out[0].as_ref().unwrap();
    assert_eq!(parts.len(), 3);
    assert_eq!(hgather(parts), vec![0, 1, 0, 1, 2, 3]);
}

#[test]
fn broadcast_large_payload() {
    let out = spawn_world(4, |comm| {
        let payload: Vec<u64> = (0..10_000).collect();
        let got: Vec<u64> = comm
            .broadcast((comm.rank() == 3).then_some(&payload), 3)
            .unwrap();
        got.len()
    });
    assert_eq!(out, vec![10_000; 4]);
}

#[test]
fn gathered_maps_merge_in_rank_order() {
    let out = spawn_world(2, |comm| {
        let mut m = BTreeMap::new();
        m.insert("shared".to_string(), comm.rank());
        m.insert(format!("rank{}", comm.rank()), comm.rank());
        comm.gather(&m, 0).unwrap()
    });
    let merged = dgather(out[0].clone().unwrap());
    assert_eq!(merged.get("shared"), Some(&1));
    assert_eq!(merged.len(), 3);
}

#[test]
fn invalid_root_is_rejected_locally() {
    let out = spawn_world(2, |comm| comm.gather(&0u8, 2));
    for r in out {
        assert_eq!(r, Err(DistError::InvalidRoot { root: 2, size: 2 }));
    }
}

#[test]
fn barrier_then_collective() {
    let out = spawn_world(3, |comm| {
        comm.barrier();
        let sum: Option<Vec<usize>> = comm.gather(&comm.rank(), 0).unwrap();
        comm.barrier();
        sum.map(|v| v.into_iter().sum::<usize>())
    });
    assert_eq!(out, vec![Some(3), None, None]);
}
