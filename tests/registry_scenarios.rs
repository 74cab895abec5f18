//! End-to-end registry scenarios over the bundled protocol schemas

use indoc::indoc;
use std::sync::Arc;
use subgraph_schemas::{
    bundled_source, bundled_sources, parse, DiagnosticKind, Diagnostics, FieldKey, SchemaRegistry,
    SchemaSource,
};

const UNISWAP: &str = include_str!("fixtures/uniswap.graphql");

fn balancer() -> String {
    bundled_source("balancer").unwrap().sdl
}

fn kinds(diags: &Diagnostics) -> Vec<DiagnosticKind> {
    diags.all().iter().map(|d| d.kind).collect()
}

/// Renames `PoolToken.poolId` to `pool`, leaving `Pool.tokens @derivedFrom(field: "poolId")` as is
fn rename_pool_token_back_reference(sdl: &str) -> String {
    let mut in_pool_token = false;
    sdl.lines()
        .map(|line| {
            let trimmed = line.trim();
            if trimmed.starts_with("type ") {
                in_pool_token = trimmed.starts_with("type PoolToken ");
            }
            if in_pool_token && trimmed.starts_with("poolId: Pool!") {
                line.replacen("poolId", "pool", 1)
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn test_uniswap_registers_cleanly() {
    let registry = SchemaRegistry::new();
    let registration = registry.register("uniswap", UNISWAP).unwrap();
    assert!(!registration.warnings.has_errors());

    let graph = registry.get("uniswap").unwrap();
    assert_eq!(
        graph.type_names().collect::<Vec<_>>(),
        vec!["Swap", "Token", "LiquidityPool", "DexAmmProtocol"]
    );
    assert!(graph.get("Swap").unwrap().immutable);
    assert_eq!(graph.derived_from("Swap", "pool"), &[FieldKey::new("LiquidityPool", "swaps")]);
    assert_eq!(
        graph.derived_from("LiquidityPool", "protocol"),
        &[FieldKey::new("DexAmmProtocol", "pools")]
    );
}

#[test]
fn test_renamed_back_reference_is_rejected() {
    let registry = SchemaRegistry::new();
    registry.register("balancer", &balancer()).unwrap();
    let before = registry.get("balancer").unwrap();

    let broken = rename_pool_token_back_reference(&balancer());
    assert_ne!(broken, balancer());

    let diags = registry.register("balancer", &broken).unwrap_err();
    assert_eq!(kinds(&diags), vec![DiagnosticKind::DanglingDerivedFrom]);
    assert_eq!(diags.all()[0].path, "Pool.tokens");
    assert_eq!(diags.all()[0].suggestion.as_deref(), Some("pool"));

    assert!(Arc::ptr_eq(&before, &registry.get("balancer").unwrap()));
}

#[test]
fn test_invalid_second_registration_keeps_first() {
    let registry = SchemaRegistry::new();
    registry.register("uniswap", UNISWAP).unwrap();
    let first = registry.get("uniswap").unwrap();

    let invalid = UNISWAP.replace("type Token @entity {", "type Tokens @entity {");
    assert!(registry.register("uniswap", &invalid).is_err());

    let current = registry.get("uniswap").unwrap();
    assert_eq!(*current, *first);
    assert_eq!(registry.list(), vec!["uniswap"]);
}

#[test]
fn test_register_all_in_memory_sources() {
    let registry = SchemaRegistry::new();
    let outcomes = registry.register_all(vec![
        SchemaSource::new("uniswap", UNISWAP),
        SchemaSource::new("broken", "type Pool @entity { id: ID! token: Tokn! }"),
    ]);

    assert!(outcomes[0].1.is_ok());
    let diags = outcomes[1].1.as_ref().unwrap_err();
    assert_eq!(kinds(diags), vec![DiagnosticKind::UnknownType]);
    assert_eq!(registry.list(), vec!["uniswap"]);
}

#[test]
fn test_registration_is_idempotent() {
    let registry = SchemaRegistry::new();
    let first = registry.register("decentraland", &bundled_source("decentraland").unwrap().sdl).unwrap();
    let second = registry.register("decentraland", &bundled_source("decentraland").unwrap().sdl).unwrap();

    assert_eq!(first.graph, second.graph);
    assert_eq!(first.warnings, second.warnings);
    assert!(second.unchanged);
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_reformatted_document_builds_equal_graph() {
    let registry = SchemaRegistry::new();
    let original = registry.register("a", UNISWAP).unwrap();
    let reformatted = parse(UNISWAP).unwrap().to_string();
    let reprinted = registry.register("b", &reformatted).unwrap();
    assert_eq!(original.graph, reprinted.graph);
}

#[test]
fn test_bundled_schemas() {
    let registry = SchemaRegistry::new();
    let outcomes = registry.register_all(bundled_sources());
    let ids: Vec<&str> = outcomes.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["aave", "balancer", "decentraland", "uniswap"]);

    for (id, outcome) in &outcomes {
        match id.as_str() {
            "balancer" | "decentraland" => assert!(outcome.is_ok(), "{} rejected", id),
            _ => {
                let diags = outcome.as_ref().unwrap_err();
                assert!(
                    diags.all().iter().all(|d| d.kind == DiagnosticKind::UnknownType),
                    "{}: {}",
                    id,
                    diags
                );
            }
        }
    }
    assert_eq!(registry.list(), vec!["balancer", "decentraland"]);
}

#[test]
fn test_bundled_uniswap_reports_missing_declarations() {
    let diags = SchemaRegistry::new()
        .register("uniswap", &bundled_source("uniswap").unwrap().sdl)
        .unwrap_err();
    let paths: Vec<&str> = diags.all().iter().map(|d| d.path.as_str()).collect();
    assert!(paths.contains(&"DexAmmProtocol"));
    assert!(paths.contains(&"LiquidityPool.positions"));
    assert!(paths.contains(&"LiquidityPool.liquidityTokenType"));
    assert!(paths.contains(&"DexAmmProtocol.type"));
}

#[test]
fn test_aave_reports_every_unknown_type() {
    let diags = SchemaRegistry::new()
        .register("aave", &bundled_source("aave").unwrap().sdl)
        .unwrap_err();
    let paths: Vec<&str> = diags.all().iter().map(|d| d.path.as_str()).collect();
    for expected in ["Pool.reserves", "UserTransaction.action", "Supply.referrer", "User.eModeCategoryId"] {
        assert!(paths.contains(&expected), "missing {}", expected);
    }
}

#[test]
fn test_removing_referenced_type_yields_unknown_type() {
    let without_pool_token = balancer().replace("type PoolToken @entity {", "type Removed @entity {");
    let diags = SchemaRegistry::new()
        .register("balancer", &without_pool_token)
        .unwrap_err();
    assert!(diags.of_kind(DiagnosticKind::UnknownType).any(|d| d.path == "Pool.tokens"));
}

#[test]
fn test_enums_are_not_shared_across_documents() {
    let registry = SchemaRegistry::new();
    registry
        .register("decentraland", &bundled_source("decentraland").unwrap().sdl)
        .unwrap();

    let diags = registry
        .register("market", "type Listing @entity { id: ID! category: Category! }")
        .unwrap_err();
    assert_eq!(kinds(&diags), vec![DiagnosticKind::UnknownType]);
}

#[test]
fn test_interface_conformance() {
    let interface = indoc! {r#"
        interface Protocol {
          id: ID!
          name: String
          pools: [Pool!]!
        }

        type Pool @entity {
          id: ID!
        }
    "#};

    let conforming = format!("{}\ntype Dex implements Protocol @entity {{ id: ID! name: String! pools: [Pool!]! }}", interface);
    assert!(SchemaRegistry::new().register("dex", &conforming).is_ok());

    let missing = format!("{}\ntype Dex implements Protocol @entity {{ id: ID! pools: [Pool!]! }}", interface);
    let diags = SchemaRegistry::new().register("dex", &missing).unwrap_err();
    assert_eq!(kinds(&diags), vec![DiagnosticKind::InterfaceFieldMissing]);
    assert_eq!(diags.all()[0].path, "Dex.name");
}
