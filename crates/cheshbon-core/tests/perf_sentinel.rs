//! Performance sentinels.
//!
//! These guard against accidental complexity blow-ups in the diff and path
//! machinery. Caps can be raised for slow CI machines via
//! `CHESHBON_MAX_DIFF_MS` / `CHESHBON_MAX_PATHS_MS`; the overrides affect
//! these tests only, never the analysis semantics.

use std::time::Instant;

use serde_json::json;

use cheshbon_core::prelude::*;

fn cap_ms(var: &str, default_ms: u64) -> u64 {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default_ms)
}

fn chain_spec(len: usize, root_params: serde_json::Value) -> MappingSpec {
    let mut derived = vec![DerivedVariable {
        id: NodeId::parse("d:ROOT").unwrap(),
        name: "ROOT".to_string(),
        ty: "string".to_string(),
        inputs: vec![],
        transform_ref: None,
        params: root_params,
    }];
    let mut prev = "d:ROOT".to_string();
    for i in 0..len {
        let id = format!("d:N{i:04}");
        derived.push(DerivedVariable {
            id: NodeId::parse(&id).unwrap(),
            name: id[2..].to_string(),
            ty: "string".to_string(),
            inputs: vec![NodeId::parse(&prev).unwrap()],
            transform_ref: None,
            params: json!({}),
        });
        prev = id;
    }
    MappingSpec {
        schema_version: "0.7".to_string(),
        sources: vec![],
        derived,
        constraints: vec![],
    }
}

#[test]
fn diff_of_long_chain_stays_fast() {
    let v1 = chain_spec(500, json!({"v": 1}));
    let v2 = chain_spec(500, json!({"v": 2}));

    let started = Instant::now();
    let outcome = diff(&DiffRequest::new(&v1, &v2)).unwrap();
    let elapsed = started.elapsed().as_millis() as u64;

    assert_eq!(outcome.impact.impacted.len(), 501);
    assert!(
        elapsed <= cap_ms("CHESHBON_MAX_DIFF_MS", 2_000),
        "core diff took {elapsed}ms"
    );
}

#[test]
fn path_enumeration_is_bounded_on_dense_graphs() {
    // A ladder graph has exponentially many simple paths; the enumeration
    // cap must keep this cheap.
    let mut derived = vec![DerivedVariable {
        id: NodeId::parse("d:ROOT").unwrap(),
        name: "ROOT".to_string(),
        ty: "string".to_string(),
        inputs: vec![],
        transform_ref: None,
        params: json!({"v": 1}),
    }];
    let mut prev = vec!["d:ROOT".to_string()];
    for i in 0..12 {
        let left = format!("d:L{i:02}");
        let right = format!("d:R{i:02}");
        for id in [&left, &right] {
            derived.push(DerivedVariable {
                id: NodeId::parse(id).unwrap(),
                name: id[2..].to_string(),
                ty: "string".to_string(),
                inputs: prev.iter().map(|p| NodeId::parse(p).unwrap()).collect(),
                transform_ref: None,
                params: json!({}),
            });
        }
        prev = vec![left, right];
    }
    let v1 = MappingSpec {
        schema_version: "0.7".to_string(),
        sources: vec![],
        derived,
        constraints: vec![],
    };
    let mut v2 = v1.clone();
    v2.derived[0].params = json!({"v": 2});

    let mut request = DiffRequest::new(&v1, &v2);
    request.detail = DetailLevel::Full;

    let started = Instant::now();
    let outcome = diff(&request).unwrap();
    let elapsed = started.elapsed().as_millis() as u64;

    let last = NodeId::parse("d:L11").unwrap();
    assert!(outcome.impact.alt_path_counts[&last] <= 9);
    assert!(
        elapsed <= cap_ms("CHESHBON_MAX_PATHS_MS", 5_000),
        "path enumeration took {elapsed}ms"
    );
}
