#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use holo_splits::coordination::{manifest_key, CACHE_VERSION_KEY};
use holo_splits::{PlannerConfig, PlannerServices, SplitPlanner, StaticCluster, TableKey};

pub const ORDERED_DIR: &str = "hdfs://nn/warehouse/tpch/orders/ordered";
pub const COMPACT_DIR: &str = "hdfs://nn/warehouse/tpch/orders/compact";
pub const PROJECTION_DIR: &str = "hdfs://nn/warehouse/tpch/orders/proj_key_date";

/// Layout with two ordered files, one compact file of ten row groups and one
/// projection directory holding `o_orderkey,o_orderdate`.
pub const ORDERS_FIXTURE: &str = r#"{
    "tables": {
        "tpch.orders": [{
            "version": 3,
            "ordered": {
                "columnOrder": ["o_orderkey", "o_custkey", "o_orderdate", "o_totalprice"]
            },
            "orderedPaths": [{ "id": 1, "uri": "hdfs://nn/warehouse/tpch/orders/ordered" }],
            "compactPaths": [{ "id": 2, "uri": "hdfs://nn/warehouse/tpch/orders/compact" }],
            "projectionPaths": {
                "7": { "id": 7, "uri": "hdfs://nn/warehouse/tpch/orders/proj_key_date" }
            },
            "splits": {
                "numRowGroupInFile": 10,
                "splitPatterns": [
                    { "accessedColumns": [0, 1, 2], "numRowGroupInSplit": 8 },
                    { "accessedColumns": [0, 2], "numRowGroupInSplit": 4 },
                    { "accessedColumns": [0, 1, 2, 3], "numRowGroupInSplit": 2 }
                ]
            },
            "projections": {
                "projectionPatterns": [{ "accessedColumns": [0, 2], "pathIds": [7] }]
            },
            "compact": {
                "columnChunkOrder": ["0:0", "0:2", "0:1", "0:3"],
                "cacheBorder": 2
            }
        }]
    },
    "directories": {
        "1": ["ordered_0.pxl", "ordered_1.pxl"],
        "2": ["compact_0.pxl"],
        "7": ["proj_0.pxl"]
    },
    "files": {
        "hdfs://nn/warehouse/tpch/orders/ordered/ordered_0.pxl": { "length": 1000, "hosts": ["dn1", "dn2"] },
        "hdfs://nn/warehouse/tpch/orders/ordered/ordered_1.pxl": { "length": 1100, "hosts": ["dn2", "dn3"] },
        "hdfs://nn/warehouse/tpch/orders/compact/compact_0.pxl": { "length": 5000, "hosts": ["dn3", "dn1"] },
        "hdfs://nn/warehouse/tpch/orders/proj_key_date/proj_0.pxl": { "length": 700, "hosts": ["dn4"] }
    }
}"#;

pub fn orders_table() -> TableKey {
    TableKey::new("tpch", "orders")
}

pub fn orders_cluster() -> Result<StaticCluster> {
    StaticCluster::from_json(ORDERS_FIXTURE)
}

/// Publishes a cache version whose single manifest lists `files` on `node`.
pub fn publish_cache(cluster: &mut StaticCluster, version: &str, node: &str, files: &[&str]) {
    cluster.cache_kv.insert(CACHE_VERSION_KEY, version);
    cluster
        .cache_kv
        .insert(manifest_key(version, node), files.join(";"));
}

pub fn cache_config() -> PlannerConfig {
    PlannerConfig {
        cache_enabled: true,
        cache_schema: Some("TPCH".to_string()),
        cache_table: Some("Orders".to_string()),
        ..PlannerConfig::default()
    }
}

pub fn planner_for(cluster: StaticCluster, config: PlannerConfig) -> SplitPlanner {
    SplitPlanner::new(config, PlannerServices::from_cluster(Arc::new(cluster)))
}
